//! Per-device bar charts: free memory, used memory, temperature, fan speed.

use nvdash::units::DeviceReadout;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders},
    Frame,
};

use crate::app::App;

/// Render the four charts in a 2x2 grid.
pub fn render_charts(frame: &mut Frame, area: Rect, app: &App) {
    let Some(ref snapshot) = app.snapshot else {
        return;
    };
    let readouts: Vec<DeviceReadout> = snapshot.devices.iter().map(DeviceReadout::from).collect();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let memory_max = readouts
        .iter()
        .filter_map(|r| r.total_mib)
        .fold(0.0_f64, f64::max)
        .round() as u64;

    render_chart(
        frame,
        top[0],
        "Free memory (MiB)",
        Color::Green,
        memory_max,
        readouts.iter().map(|r| (r.id, r.free_mib.map(|v| v.round() as u64))),
    );
    render_chart(
        frame,
        top[1],
        "Used memory (MiB)",
        Color::Magenta,
        memory_max,
        readouts.iter().map(|r| (r.id, r.used_mib.map(|v| v.round() as u64))),
    );
    render_chart(
        frame,
        bottom[0],
        "Temperature (°C)",
        Color::Yellow,
        100,
        readouts
            .iter()
            .map(|r| (r.id, r.temperature_celsius.map(u64::from))),
    );
    render_chart(
        frame,
        bottom[1],
        "Fan speed (%)",
        Color::Cyan,
        100,
        readouts
            .iter()
            .map(|r| (r.id, r.fan_speed_percent.map(u64::from))),
    );
}

/// Draw one chart. Devices with no value get no bar and are listed as
/// unknown in the title.
fn render_chart(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    color: Color,
    max: u64,
    values: impl Iterator<Item = (u32, Option<u64>)>,
) {
    let mut bars = Vec::new();
    let mut unknown = Vec::new();
    for (id, value) in values {
        match value {
            Some(v) => bars.push(
                Bar::default()
                    .value(v)
                    .label(Line::from(format!("GPU{}", id)))
                    .style(Style::default().fg(color)),
            ),
            None => unknown.push(format!("GPU{}", id)),
        }
    }

    let title = if unknown.is_empty() {
        title.to_string()
    } else {
        format!("{} | unknown: {}", title, unknown.join(", "))
    };

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(BarGroup::default().bars(&bars))
        .bar_width(6)
        .bar_gap(2)
        .max(max.max(1));

    frame.render_widget(chart, area);
}
