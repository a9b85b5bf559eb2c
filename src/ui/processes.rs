//! Process table for the selected device.

use nvdash::units::{format_local_time, format_optional_bytes};
use ratatui::{
    layout::{Constraint, Margin, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table},
    Frame,
};

use crate::app::App;
use crate::utils::{truncate_string, usage_color};

/// Render the process table of the selected device.
pub fn render_processes(frame: &mut Frame, area: Rect, app: &mut App) {
    let Some(device) = app.selected() else {
        return;
    };

    let header = Row::new(vec![
        "PID", "USER", "STATUS", "CPU%", "MEM%", "GPU_MEM", "THR", "CPUS", "STARTED", "NAME",
        "COMMAND",
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = device
        .processes
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(p.pid.to_string()),
                Cell::from(p.username.clone()).style(Style::default().fg(Color::Cyan)),
                Cell::from(p.status.as_str()),
                Cell::from(format!("{:.1}", p.cpu_percent))
                    .style(Style::default().fg(usage_color(p.cpu_percent as f64))),
                Cell::from(format!("{:.1}", p.memory_percent))
                    .style(Style::default().fg(usage_color(p.memory_percent as f64))),
                Cell::from(format_optional_bytes(p.used_gpu_memory_bytes)),
                Cell::from(p.num_threads.to_string()),
                Cell::from(p.cpu_affinity_count.to_string()),
                Cell::from(format_local_time(p.create_time)),
                Cell::from(p.name.clone()).style(Style::default().fg(Color::Green)),
                Cell::from(truncate_string(&p.cmdline, 60)),
            ])
        })
        .collect();

    let count = rows.len();
    let title = format!(
        "GPU {} Processes ({}) - {}",
        device.id, count, device.name
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(11),
            Constraint::Length(4),
            Constraint::Length(5),
            Constraint::Length(19),
            Constraint::Length(15),
            Constraint::Min(20),
        ],
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Cyan)),
    )
    .header(header)
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    frame.render_stateful_widget(table, area, &mut app.process_state);

    // Scrollbar
    if count > (area.height as usize).saturating_sub(3) {
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));

        let mut scrollbar_state =
            ScrollbarState::new(count).position(app.process_state.selected().unwrap_or(0));

        frame.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}
