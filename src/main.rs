mod action;
mod api;
mod app;
mod config;
mod error;
mod flow;
mod modal;
mod tui;
mod types;
mod ui;

use std::fs::OpenOptions;
use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::action::Action;
use crate::api::{DashboardApi, HttpApi};
use crate::app::App;
use crate::config::{Config, API_URL_ENV};
use crate::tui::{Event, EventHandler};

/// Browse open pull requests and request tests on them
#[derive(Parser, Debug)]
#[command(name = "testreq", version, about)]
struct Cli {
    /// Backend base URL, e.g. http://localhost:8000 (overrides config and TESTREQ_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Path to a config file (default: <config dir>/testreq/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs here instead of <cache dir>/testreq/testreq.log
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(cli.log_file.clone());

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    }
    .with_overrides(cli.api_url.clone(), std::env::var(API_URL_ENV).ok())
    .validate()?;

    tracing::info!(api = %config.api.base_url, "starting");

    let api: Arc<dyn DashboardApi> = Arc::new(HttpApi::new(config.api.base_url.clone())?);

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let result = run(api, &config).await;

    tui::restore()?;

    result
}

/// Log to a file so output does not land on the alternate screen.
/// Falls back to stderr when no file can be opened.
fn init_logging(log_file: Option<PathBuf>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    match open_log_file(log_file) {
        Some(file) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .init(),
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn open_log_file(path: Option<PathBuf>) -> Option<std::fs::File> {
    let path = path.or_else(|| Some(dirs::cache_dir()?.join("testreq").join("testreq.log")))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

async fn run(api: Arc<dyn DashboardApi>, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut terminal = tui::init()?;

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut app = App::new(api, action_tx.clone(), config.ui.show_test_badges);
    let size = terminal.size()?;
    app.update(Action::Resize(size.width, size.height));

    let tick_rate = Duration::from_millis(config.ui.tick_rate_ms);
    let render_rate = Duration::from_millis(16); // ~60fps
    let mut events = EventHandler::new(tick_rate, render_rate);

    loop {
        tokio::select! {
            Some(event) = events.next() => {
                if event.is_quit() {
                    break;
                }

                match event {
                    Event::Render => {
                        terminal.draw(|frame| ui::render(frame, &app))?;
                    }
                    _ => {
                        let action = app.handle_event(event);
                        if !matches!(action, Action::None) {
                            action_tx.send(action)?;
                        }
                    }
                }
            }
            Some(action) = action_rx.recv() => {
                app.update(action);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
