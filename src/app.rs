//! Application state and core logic.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyModifiers};
use log::warn;
use nvdash::{DeviceSample, Snapshot, SnapshotSource};
use ratatui::widgets::TableState;

use crate::config::{MAX_REFRESH, MIN_REFRESH, REFRESH_STEP};

/// Main application state.
pub struct App {
    source: Box<dyn SnapshotSource>,

    // Latest data
    pub snapshot: Option<Snapshot>,
    pub last_error: Option<String>,
    pub last_build: Duration,

    // UI state
    pub running: bool,
    pub show_help: bool,
    pub selected_device: usize,
    pub process_state: TableState,
    pub refresh_requested: bool,

    // Settings
    pub refresh_rate: Duration,

    // Status message (shown briefly after actions)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App and take the first snapshot.
    pub fn new(source: Box<dyn SnapshotSource>, refresh_rate: Duration) -> Self {
        let mut app = Self {
            source,
            snapshot: None,
            last_error: None,
            last_build: Duration::ZERO,
            running: true,
            show_help: false,
            selected_device: 0,
            process_state: TableState::default(),
            refresh_requested: false,
            refresh_rate: refresh_rate.clamp(MIN_REFRESH, MAX_REFRESH),
            status_message: None,
        };
        app.process_state.select(Some(0));
        app.refresh();
        app
    }

    /// Build a new snapshot.
    ///
    /// A failed build keeps the previous snapshot on screen. Returns `true`
    /// when the build took longer than the refresh period.
    pub fn refresh(&mut self) -> bool {
        self.refresh_requested = false;
        let started = Instant::now();

        match self.source.build() {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                self.last_error = None;
            }
            Err(err) => {
                warn!("snapshot failed: {}", err);
                self.last_error = Some(err.to_string());
            }
        }

        self.last_build = started.elapsed();
        self.clamp_selection();

        let overran = self.last_build > self.refresh_rate;
        if overran {
            warn!(
                "delayed sample: build took {} ms, longer than the {} ms refresh period; skipping the missed tick",
                self.last_build.as_millis(),
                self.refresh_rate.as_millis()
            );
            self.set_status(format!(
                "Delayed sample: build took {} ms",
                self.last_build.as_millis()
            ));
        }
        overran
    }

    /// Device whose processes are listed.
    pub fn selected(&self) -> Option<&DeviceSample> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.devices.get(self.selected_device))
    }

    fn device_count(&self) -> usize {
        self.snapshot.as_ref().map_or(0, |s| s.devices.len())
    }

    fn clamp_selection(&mut self) {
        let count = self.device_count();
        if self.selected_device >= count {
            self.selected_device = count.saturating_sub(1);
        }
        let procs = self.selected().map_or(0, |d| d.processes.len());
        let row = self.process_state.selected().unwrap_or(0);
        self.process_state
            .select(Some(row.min(procs.saturating_sub(1))));
    }

    /// Handle keyboard input.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if self.show_help {
            self.show_help = false;
            return;
        }

        if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
            self.running = false;
            return;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('?') | KeyCode::F(1) => self.show_help = true,
            KeyCode::Tab | KeyCode::Right => self.cycle_device(1),
            KeyCode::BackTab | KeyCode::Left => self.cycle_device(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Char('r') => self.refresh_requested = true,
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.refresh_rate = self
                    .refresh_rate
                    .saturating_sub(REFRESH_STEP)
                    .max(MIN_REFRESH);
            }
            KeyCode::Char('-') => {
                self.refresh_rate = (self.refresh_rate + REFRESH_STEP).min(MAX_REFRESH);
            }
            _ => {}
        }
    }

    fn cycle_device(&mut self, delta: i32) {
        let count = self.device_count();
        if count == 0 {
            return;
        }
        let next = (self.selected_device as i64 + delta as i64).rem_euclid(count as i64);
        self.selected_device = next as usize;
        self.process_state.select(Some(0));
    }

    /// Move the process selection by a delta.
    fn move_selection(&mut self, delta: i32) {
        let len = self.selected().map_or(0, |d| d.processes.len());
        if len == 0 {
            return;
        }

        let current = self.process_state.selected().unwrap_or(0);
        let new = if delta > 0 {
            (current + delta as usize).min(len - 1)
        } else {
            current.saturating_sub((-delta) as usize)
        };
        self.process_state.select(Some(new));
    }

    /// Set a status message to display briefly.
    pub fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Clear expired status message.
    pub fn clear_old_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
            }
        }
    }
}
