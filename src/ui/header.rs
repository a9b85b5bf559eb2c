//! Header bar rendering.

use chrono::Local;
use nvdash::units::UNKNOWN;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;

/// Render the header bar with driver info and the clock.
pub fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let now = Local::now();

    let (driver, count, sampled) = match app.snapshot {
        Some(ref s) => (
            s.driver_version
                .value()
                .cloned()
                .unwrap_or_else(|| UNKNOWN.to_string()),
            s.device_count.to_string(),
            s.taken_at
                .with_timezone(&Local)
                .format("%H:%M:%S")
                .to_string(),
        ),
        None => (UNKNOWN.to_string(), "-".into(), "-".into()),
    };

    let header = Line::from(vec![
        Span::styled(
            "nvdash",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(format!("Driver: {}", driver), Style::default().fg(Color::Green)),
        Span::raw(" | "),
        Span::styled(format!("GPUs: {}", count), Style::default().fg(Color::Blue)),
        Span::raw(" | "),
        Span::styled(
            format!("Sampled {} ({} ms)", sampled, app.last_build.as_millis()),
            Style::default().fg(Color::Magenta),
        ),
        Span::raw(" | "),
        Span::styled(
            now.format("%Y-%m-%d %H:%M:%S").to_string(),
            Style::default().fg(Color::White),
        ),
    ]);

    frame.render_widget(Paragraph::new(header), area);
}
