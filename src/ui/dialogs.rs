//! Dialog rendering (help, status).

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::layout::centered_rect;
use crate::app::App;

/// Render the status bar: the last build error, else the latest message.
pub fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let (label, msg, color) = if let Some(ref err) = app.last_error {
        (" ERROR: ", err.as_str(), Color::Red)
    } else if let Some((msg, _)) = &app.status_message {
        (" STATUS: ", msg.as_str(), Color::Yellow)
    } else {
        return;
    };

    let status = Line::from(vec![
        Span::styled(
            label,
            Style::default()
                .fg(Color::Black)
                .bg(color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {} ", msg), Style::default().fg(color)),
    ]);
    frame.render_widget(Paragraph::new(status), area);
}

/// Render the help dialog.
pub fn render_help(frame: &mut Frame, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let help_text = vec![
        Line::from(vec![
            Span::styled(
                "nvdash",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" - GPU telemetry dashboard"),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled("Navigation:", bold)]),
        Line::from("  Tab/→        Next GPU"),
        Line::from("  S-Tab/←      Previous GPU"),
        Line::from("  j/↓          Move process selection down"),
        Line::from("  k/↑          Move process selection up"),
        Line::from(""),
        Line::from(vec![Span::styled("Sampling:", bold)]),
        Line::from("  r            Refresh now"),
        Line::from("  +/-          Shorter/longer refresh period"),
        Line::from(""),
        Line::from(vec![Span::styled("Other:", bold)]),
        Line::from("  ?/F1         Show this help"),
        Line::from("  q/Esc        Quit"),
        Line::from(""),
        Line::from("Missing sensors and failed reads are shown as \"unknown\"."),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().fg(Color::DarkGray),
        )]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    let help_area = centered_rect(60, 70, area);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
