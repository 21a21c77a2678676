mod app;
mod board;
mod config;
mod events;
mod ui;
mod usage;
mod youtrack;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use config::Config;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use youtrack::YouTrackClient;

/// Terminal agile board for YouTrack
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file (default: ~/.config/youboard/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log file (default: youboard.log in the cache dir)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("youboard")
        .join("youboard.log")
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_path = args.log_file.clone().unwrap_or_else(default_log_path);
    if let Err(e) = init_logging(&log_path) {
        eprintln!("Warning: {e:#}. Logging disabled.");
    }

    let config = Config::load(args.config.as_deref())?;

    if !config.server.is_configured() {
        eprintln!("No YouTrack server configured. Create ~/.config/youboard/config.toml with:");
        eprintln!();
        eprintln!("  [server]");
        eprintln!("  url = \"https://example.youtrack.cloud\"");
        eprintln!("  token = \"perm:...\"");
        eprintln!();
        eprintln!("The token can also be set with {}.", config::TOKEN_ENV);
        std::process::exit(1);
    }

    let client = YouTrackClient::new(&config.server, config.settings.api_timeout)?;
    tracing::info!(server = %client.base_url(), "starting");

    // Setup panic hook for clean terminal restore
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, Some(client));
    let res = events::run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %format!("{err:#}"), "exited with error");
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }

    Ok(())
}
