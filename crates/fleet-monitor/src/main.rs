mod config;
mod logging;
mod state;
mod sync;
mod theme;
mod ui;

use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use fleet_client::{HttpSource, SimulationSource};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use state::{Command, ViewState};
use std::io;
use std::time::{Duration, Instant};
use sync::{SyncDriver, SyncEvent, SyncSettings};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

const UI_TICK_MS: u64 = 250;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config();
    let _log_guard = logging::init_logging(&config);

    let source = HttpSource::new(&config.api_url, config.bot_feed)
        .with_context(|| format!("invalid --api-url {}", config.api_url))?;
    info!(
        event = "startup",
        api_url = %source.base_url(),
        bot_feed = %source.bot_feed(),
        poll_ms = config.poll_interval.as_millis() as u64
    );
    let settings = SyncSettings {
        poll_interval: config.poll_interval,
        auto_tick_interval: config.auto_tick_interval,
    };
    let mut app = ViewState::new(config.log_capacity, config.toast_ttl);

    let mut terminal = setup_terminal().context("terminal setup failed")?;
    let (mut driver, mut sync_rx) = SyncDriver::spawn(source, settings);
    let result = run_app(&mut terminal, &mut app, &mut driver, &mut sync_rx).await;
    driver.shutdown();
    app.tear_down();
    restore_terminal(&mut terminal)?;
    info!(event = "shutdown");

    if let Err(err) = result {
        eprintln!("fleet-monitor: {err}");
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app<S: SimulationSource>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut ViewState,
    driver: &mut SyncDriver<S>,
    sync_rx: &mut mpsc::Receiver<SyncEvent>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut ui_ticker = tokio::time::interval(Duration::from_millis(UI_TICK_MS));
    ui_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        app.prune_toast(Instant::now());
        terminal.draw(|frame| ui::render(frame, app))?;

        tokio::select! {
            _ = ui_ticker.tick() => {}
            Some(event) = sync_rx.recv() => {
                app.apply(event, Instant::now());
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        match app.handle_key(key, Instant::now()) {
                            Some(Command::Quit) => break,
                            Some(Command::Dispatch(request)) => driver.dispatch(request),
                            Some(Command::AutoAdvance(enabled)) => driver.set_auto_advance(enabled),
                            None => {}
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => warn!(event = "input_error", error = %err),
                    None => break,
                }
            }
        }
    }
    Ok(())
}
