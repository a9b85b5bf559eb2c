mod app;
mod config;
mod report;
mod ui;
mod utils;

use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::warn;
use ratatui::{backend::CrosstermBackend, Terminal};

use app::App;
use config::{init_logging, Cli};
use report::render_report;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref(), !cli.once)?;

    let mut builder = nvdash::host_builder(cli.cpu_sample_interval())
        .context("Failed to initialize the NVIDIA driver (is NVML installed?)")?;

    let result = if cli.once {
        print_once(&mut builder, cli.json)
    } else {
        run_dashboard(Box::new(builder), cli.refresh_interval())
    };

    if let Err(err) = nvdash::shutdown_driver() {
        warn!("{}", err);
    }

    result
}

fn print_once(builder: &mut nvdash::HostSnapshotBuilder, json: bool) -> Result<()> {
    let snapshot = builder.build().context("Failed to build snapshot")?;
    if json {
        let out = serde_json::to_string_pretty(&snapshot).context("Failed to encode snapshot")?;
        println!("{}", out);
    } else {
        print!("{}", render_report(&snapshot));
    }
    Ok(())
}

fn run_dashboard(source: Box<dyn nvdash::SnapshotSource>, refresh_rate: Duration) -> Result<()> {
    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let mut app = App::new(source, refresh_rate);

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

/// Draw, wait for input until the next tick, rebuild.
///
/// Builds run on this thread, so a new one never starts before the previous
/// one has finished and been drawn. The tick clock restarts after each build,
/// which drops any ticks missed by a slow build.
fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();

    while app.running {
        app.clear_old_status();
        terminal.draw(|f| ui::render_ui(f, app))?;

        let timeout = app
            .refresh_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_millis(0));

        if event::poll(timeout).context("Failed to poll events")? {
            if let Event::Key(key) = event::read().context("Failed to read event")? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code, key.modifiers);
                }
            }
        }

        if app.refresh_requested || last_tick.elapsed() >= app.refresh_rate {
            app.refresh();
            last_tick = Instant::now();
        }
    }

    Ok(())
}
