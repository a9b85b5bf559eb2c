//! Utility functions for formatting and display.

use ratatui::style::Color;

/// Get a color based on usage percentage.
pub fn usage_color(pct: f64) -> Color {
    if pct >= 90.0 {
        Color::Red
    } else if pct >= 70.0 {
        Color::Yellow
    } else if pct >= 50.0 {
        Color::Cyan
    } else {
        Color::Green
    }
}

/// Get a color based on temperature, gray when unknown.
pub fn temp_color(temp: Option<u32>) -> Color {
    match temp {
        None => Color::DarkGray,
        Some(t) if t >= 85 => Color::Red,
        Some(t) if t >= 70 => Color::Yellow,
        Some(t) if t >= 50 => Color::Cyan,
        Some(_) => Color::Green,
    }
}

/// Create a text-based progress bar. An unknown value draws an empty track.
pub fn create_bar(pct: Option<f64>, width: usize) -> String {
    let filled = pct
        .map(|p| ((p.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize)
        .unwrap_or(0);
    let empty = width.saturating_sub(filled);
    let track = if pct.is_some() { "░" } else { "·" };
    format!("[{}{}]", "█".repeat(filled), track.repeat(empty))
}

/// Truncate a string to a maximum number of characters with ellipsis.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
