//! Footer bar rendering.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;

/// Render the footer bar with keyboard shortcuts.
pub fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let refresh_ms = app.refresh_rate.as_millis();
    let key = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let footer = Line::from(vec![
        Span::styled(" ?", key),
        Span::raw(":Help "),
        Span::styled("Tab", key),
        Span::raw(":Device "),
        Span::styled("j/k", key),
        Span::raw(":Scroll "),
        Span::styled("r", key),
        Span::raw(":Refresh "),
        Span::styled("+/-", key),
        Span::raw(format!(":{}ms ", refresh_ms)),
        Span::styled(
            "q",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw(":Quit"),
    ]);

    frame.render_widget(Paragraph::new(footer), area);
}
