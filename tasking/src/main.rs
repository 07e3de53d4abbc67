//! `tasking`: pick Tasking Manager tasks from the terminal.
//!
//! Shows a project's tasks as a list and a map, keeps their status fresh by
//! polling the activity feed, and locks tasks for mapping or validation.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/tasking/config.toml`).
//!
//! ```bash
//! # Offline demo grid
//! cargo run --bin tasking -- --offline
//!
//! # Against a backend
//! cargo run --bin tasking -- --base-url https://tasks.example.org/api/v2/ \
//!     --token "$TOKEN" --project 42
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use tasking::api::TaskingApi;
use tasking::api::http::HttpApi;
use tasking::api::memory::InMemoryApi;
use tasking::app::App;
use tasking::config::{CliArgs, ClientConfig};
use tasking::controller::TaskSelectionController;
use tasking::session::Session;
use tasking::sync::{self, SyncCommand, SyncEvent};
use tasking::ui;
use tasking_proto::project::{Project, UserDetails};
use tasking_proto::task::ProjectId;

/// Project id of the built-in demo grid.
const DEMO_PROJECT: ProjectId = ProjectId::new(1);

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; ratatui owns the terminal.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(offline = config.is_offline(), "tasking starting");

    if config.is_offline() {
        let api = Arc::new(InMemoryApi::demo(UserDetails::mapper(1, "demo")));
        run(api, None, DEMO_PROJECT, &config, false).await
    } else {
        let Some(project_id) = config.project_id else {
            return Err(io::Error::other("no project given (use --project or [api] project_id)"));
        };
        let base_url = config.base_url.as_deref().unwrap_or_default();
        let api = HttpApi::new(base_url, config.token.clone(), config.request_timeout)
            .map_err(io::Error::other)?;
        run(Arc::new(api), config.token.clone(), project_id, &config, true).await
    }
}

/// Resolves the user, sets up the terminal and runs the event loop.
async fn run<A: TaskingApi + 'static>(
    api: Arc<A>,
    token: Option<String>,
    project_id: ProjectId,
    config: &ClientConfig,
    online: bool,
) -> io::Result<()> {
    let user = api.fetch_current_user().await.map_err(|e| {
        tracing::error!(error = %e, "could not resolve the current user");
        io::Error::other(format!("could not resolve the current user: {e}"))
    })?;
    tracing::info!(user = %user.username, %project_id, "session started");

    let controller = TaskSelectionController::new(
        Project::new(project_id, ""),
        Session::new(user, token),
        config.to_controller_config(),
    );
    let app = App::new(controller)
        .with_timestamp_format(&config.timestamp_format)
        .with_online(online);

    let (cmd_tx, evt_rx) = sync::spawn_sync(api, config.to_sync_config(project_id));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app, &cmd_tx, evt_rx, config);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("tasking exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("tasking.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main application loop.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    cmd_tx: &mpsc::Sender<SyncCommand>,
    mut evt_rx: mpsc::Receiver<SyncEvent>,
    config: &ClientConfig,
) -> io::Result<()> {
    loop {
        // Step 1: Draw the UI frame.
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Step 2: Drain all pending SyncEvents (non-blocking).
        while let Ok(event) = evt_rx.try_recv() {
            app.apply_sync_event(event);
        }

        // Step 3: Poll for terminal input events.
        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if let Some(cmd) = app.handle_key_event(key) {
                match cmd_tx.try_send(cmd) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        app.push_message("Busy, try again".to_string());
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        app.push_message("Sync stopped".to_string());
                    }
                }
            }
        }

        if app.should_quit {
            let _ = cmd_tx.try_send(SyncCommand::Shutdown);
            return Ok(());
        }
    }
}
