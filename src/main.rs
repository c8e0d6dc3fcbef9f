// ABOUTME: Main entry point for the ctf-console TUI

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::{io, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::mpsc;

use ctf_console::api::ApiClient;
use ctf_console::app::{AppState, EventHandler, Toast};
use ctf_console::components::layout;
use ctf_console::config::Config;
use ctf_console::models::ContainerInfo;
use ctf_console::terminal::TerminalBridge;

#[derive(Parser)]
#[command(name = "ctf-console", about = "Operator console for a CTF platform")]
struct Args {
    /// Backend origin, e.g. https://ctf.example
    #[arg(long)]
    server: Option<String>,
    /// Bearer token for the backend API
    #[arg(long)]
    token: Option<String>,
    /// Path to a config file (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Tracing filter, e.g. ctf_console=debug
    #[arg(long)]
    log_filter: Option<String>,
}

enum AppMessage {
    Containers(Vec<ContainerInfo>),
    RefreshFailed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(server) = args.server {
        config.server_url = server;
    }
    if let Some(token) = args.token {
        config.token = Some(token);
    }
    if let Some(filter) = args.log_filter {
        config.log_filter = filter;
    }

    setup_logging(&config.log_filter)?;
    setup_panic_handler();

    let (client, api_errors) = ApiClient::new(config.server_url.clone(), config.token.clone());
    let client = Arc::new(client);
    let bridge = TerminalBridge::new(config.ws_base(), config.bridge_config());
    let mut state = AppState::default();

    run_tui(&mut state, &client, &bridge, api_errors).await
}

async fn run_tui(
    state: &mut AppState,
    client: &Arc<ApiClient>,
    bridge: &TerminalBridge,
    mut api_errors: mpsc::UnboundedReceiver<String>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<AppMessage>();
    let tick_rate = Duration::from_millis(50);

    let result = loop {
        // Container refresh runs off the UI loop; the result comes back as
        // a message. Failures reach the toast line via the global channel.
        if state.refresh_requested && !state.loading {
            state.refresh_requested = false;
            state.loading = true;
            let client = client.clone();
            let msg_tx = msg_tx.clone();
            tokio::spawn(async move {
                let message = match client.list_containers().await {
                    Ok(containers) => AppMessage::Containers(containers),
                    Err(_) => AppMessage::RefreshFailed,
                };
                let _ = msg_tx.send(message);
            });
        }

        while let Ok(message) = msg_rx.try_recv() {
            state.loading = false;
            match message {
                AppMessage::Containers(containers) => {
                    state.containers = containers;
                    if state.selected_row.is_none() && !state.container_rows().is_empty() {
                        state.selected_row = Some(0);
                    }
                }
                AppMessage::RefreshFailed => {}
            }
        }
        while let Ok(message) = api_errors.try_recv() {
            state.push_toast(Toast::error(message));
        }

        for window in &mut state.windows {
            window.surface.drain();
        }
        state.prune_expired_toasts();

        let size = terminal.size()?;
        state.screen = (size.width, size.height);

        if let Err(e) = terminal.draw(|frame| layout::render(frame, state)) {
            break Err(e.into());
        }

        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(app_event) = EventHandler::handle_key_event(key, state) {
                        EventHandler::process_event(app_event, state, bridge);
                    }
                }
                Event::Resize(width, height) => {
                    state.screen = (width, height);
                }
                _ => {}
            }
        }

        if state.should_quit {
            // Orderly shutdown for every open session; the driver tasks
            // handle the exit notice and grace period themselves.
            for window in &state.windows {
                window.handle.close();
            }
            break Ok(());
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn setup_logging(filter: &str) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let log_dir = directories::ProjectDirs::from("", "", "ctf-console")
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log dir {}", log_dir.display()))?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("ctf-console.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Restore the terminal before the default panic output so a crash does
/// not leave the shell in raw mode.
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        default_hook(info);
    }));
}
