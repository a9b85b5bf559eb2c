//! GPU device cards.

use nvdash::units::{
    format_bytes, format_fan_speed, format_power, format_power_state, format_temperature,
    memory_used_percent, UNKNOWN,
};
use nvdash::DeviceSample;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::utils::{create_bar, temp_color, usage_color};

/// Card height for the available vertical space.
pub fn card_height(available: u16) -> u16 {
    if available < 20 {
        1
    } else {
        4
    }
}

/// Render one card per device, as many as fit.
pub fn render_device_cards(frame: &mut Frame, area: Rect, app: &App) {
    let Some(ref snapshot) = app.snapshot else {
        return;
    };

    let count = snapshot.devices.len() as u16;
    let height = if area.height >= 4 * count { 4 } else { 1 };
    let fits = (area.height / height).max(1) as usize;
    let shown = snapshot.devices.len().min(fits);
    if shown == 0 {
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(height); shown])
        .split(area);

    for (i, device) in snapshot.devices.iter().take(shown).enumerate() {
        let selected = i == app.selected_device;
        render_device_card(frame, chunks[i], device, selected);
    }
}

/// Render a single device card.
fn render_device_card(frame: &mut Frame, area: Rect, device: &DeviceSample, selected: bool) {
    let mem_pct = device.memory.value().and_then(memory_used_percent);
    let temperature = device.temperature_celsius.get();

    let memory_text = match device.memory.value() {
        Some(m) => format!(
            "{} / {}",
            format_bytes(m.used_bytes),
            format_bytes(m.total_bytes)
        ),
        None => UNKNOWN.to_string(),
    };
    let pct_text = mem_pct
        .map(|p| format!("{:3.0}%", p))
        .unwrap_or_else(|| "  ?%".into());

    let stats = vec![
        Span::styled("Temp: ", Style::default().fg(Color::Yellow)),
        Span::styled(
            format_temperature(&device.temperature_celsius),
            Style::default().fg(temp_color(temperature)),
        ),
        Span::raw("  "),
        Span::styled("Fan: ", Style::default().fg(Color::Yellow)),
        Span::raw(format_fan_speed(&device.fan_speed_percent)),
        Span::raw("  "),
        Span::styled("Power: ", Style::default().fg(Color::Yellow)),
        Span::raw(format_power(&device.power_usage_milliwatts)),
        Span::raw("  "),
        Span::styled("Procs: ", Style::default().fg(Color::Yellow)),
        Span::raw(device.processes.len().to_string()),
    ];

    if area.height <= 1 {
        let mut spans = vec![
            Span::styled(
                format!("GPU{} ", device.id),
                Style::default().fg(if selected { Color::Cyan } else { Color::Gray }),
            ),
            Span::styled(
                create_bar(mem_pct, 10),
                Style::default().fg(usage_color(mem_pct.unwrap_or(0.0))),
            ),
            Span::raw(format!(" {} ", pct_text)),
        ];
        spans.extend(stats);
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
        return;
    }

    let title = format!(
        "GPU {} - {} [{}]",
        device.id,
        device.name,
        format_power_state(&device.power_state)
    );

    let lines = vec![
        Line::from(vec![
            Span::styled("MEM  ", Style::default().fg(Color::Magenta)),
            Span::styled(
                create_bar(mem_pct, 20),
                Style::default().fg(usage_color(mem_pct.unwrap_or(0.0))),
            ),
            Span::raw(format!(" {}  {}", pct_text, memory_text)),
        ]),
        Line::from(stats),
    ];

    let border_style = if selected {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
