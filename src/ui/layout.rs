//! Main layout and UI coordination.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::charts::render_charts;
use super::devices::{card_height, render_device_cards};
use super::dialogs::{render_help, render_status};
use super::footer::render_footer;
use super::header::render_header;
use super::processes::render_processes;
use crate::app::App;

/// Main UI rendering function.
pub fn render_ui(frame: &mut Frame, app: &mut App) {
    if app.show_help {
        render_help(frame, frame.area());
        return;
    }

    // Main layout - add extra row for status message if present
    let has_status = app.status_message.is_some() || app.last_error.is_some();
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(if has_status {
            vec![
                Constraint::Length(1), // Header
                Constraint::Min(0),    // Content
                Constraint::Length(1), // Status
                Constraint::Length(1), // Footer
            ]
        } else {
            vec![
                Constraint::Length(1), // Header
                Constraint::Min(0),    // Content
                Constraint::Length(1), // Footer
            ]
        })
        .split(frame.area());

    render_header(frame, main_chunks[0], app);

    if has_status {
        render_status(frame, main_chunks[2], app);
        render_footer(frame, main_chunks[3], app);
    } else {
        render_footer(frame, main_chunks[2], app);
    }

    let device_count = app.snapshot.as_ref().map_or(0, |s| s.devices.len());
    if device_count == 0 {
        render_no_devices(frame, main_chunks[1], app);
        return;
    }

    let content = main_chunks[1];
    let show_charts = content.height >= 24;
    let cards_height = (card_height(content.height) * device_count as u16).min(content.height / 2);

    let mut constraints = Vec::new();
    if show_charts {
        constraints.push(Constraint::Length(12));
    }
    constraints.push(Constraint::Length(cards_height));
    constraints.push(Constraint::Min(4));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(content);

    let mut idx = 0;
    if show_charts {
        render_charts(frame, chunks[idx], app);
        idx += 1;
    }
    render_device_cards(frame, chunks[idx], app);
    render_processes(frame, chunks[idx + 1], app);
}

/// Render the "no devices" panel.
fn render_no_devices(frame: &mut Frame, area: Rect, app: &App) {
    let reason = if app.snapshot.is_none() {
        "No snapshot has been taken yet"
    } else {
        "The driver reports no GPU devices"
    };

    let text = vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            "No NVIDIA GPU Detected",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from(format!("  {}", reason)),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title("GPUs")
        .border_style(Style::default().fg(Color::DarkGray));

    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

/// Create a centered rectangle for dialogs.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
