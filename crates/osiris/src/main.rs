mod app;
mod launch;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::{Dashboard, KeyAction};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use launch::SessionRequest;
use osiris_core::config::{default_config_path, default_log_path};
use osiris_core::logging::{spawn_heartbeat, HEARTBEAT_INTERVAL};
use osiris_core::{
    ui_channel, Config, HttpMonitoringApi, LogSink, RefreshCoordinator, RefreshTrigger,
    RenderScheduler, SharedState, TracingLogSink, UiQueue,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::{self, OpenOptions},
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing_subscriber::EnvFilter;

type Tui = Terminal<CrosstermBackend<io::Stdout>>;
type Coordinator = RefreshCoordinator<Dashboard>;

#[derive(Debug, Parser)]
#[command(name = "osiris", about = "Terminal incident console for New Relic hosts")]
struct Args {
    /// Config file (default: ~/.osiris/config)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Append diagnostics to ~/.osiris/debug.log
    #[arg(long)]
    debug: bool,
}

enum LoopExit {
    Quit,
    Launch(SessionRequest),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug)?;

    let config_path = args.config.unwrap_or_else(default_config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    tracing::info!(
        path = %config_path.display(),
        interval_secs = config.refresh_interval_secs,
        credentials = config.has_credentials(),
        "config loaded"
    );

    let log: Arc<dyn LogSink> = Arc::new(TracingLogSink);
    let api = Arc::new(HttpMonitoringApi::new(&config)?);
    let state = SharedState::default();
    let (submitter, mut queue) = ui_channel::<Dashboard>();
    let coordinator = Arc::new(RefreshCoordinator::new(
        api,
        config.clone(),
        state.clone(),
        RenderScheduler::new(submitter),
        Arc::clone(&log),
    ));

    let heartbeat = spawn_heartbeat(Arc::clone(&log), HEARTBEAT_INTERVAL);
    let timer = Arc::clone(&coordinator).spawn_timer(config.refresh_interval());

    let mut terminal = setup_terminal()?;
    let mut dashboard = Dashboard::new(state);
    let result = run_app(&mut terminal, &mut dashboard, &mut queue, &coordinator, log.as_ref()).await;
    restore_terminal(&mut terminal)?;
    timer.abort();
    heartbeat.abort();

    if let Err(err) = result {
        eprintln!("osiris: {err}");
    }

    Ok(())
}

fn init_logging(debug: bool) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let log_file = std::env::var_os("OSIRIS_LOG_FILE")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| debug.then(default_log_path));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn resume_terminal(terminal: &mut Tui) -> Result<()> {
    enable_raw_mode()?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    terminal.clear()?;
    Ok(())
}

async fn run_app(
    terminal: &mut Tui,
    dashboard: &mut Dashboard,
    queue: &mut UiQueue<Dashboard>,
    coordinator: &Arc<Coordinator>,
    log: &dyn LogSink,
) -> Result<()> {
    loop {
        match drive_ui(terminal, dashboard, queue, coordinator).await? {
            LoopExit::Quit => return Ok(()),
            LoopExit::Launch(request) => {
                restore_terminal(terminal)?;
                launch::run_session(&request, log).await;
                resume_terminal(terminal)?;
                coordinator.request_render();
            }
        }
    }
}

/// Owns the crossterm event stream for one stretch of interactive use; it
/// is dropped before a remote session takes over stdin.
async fn drive_ui(
    terminal: &mut Tui,
    dashboard: &mut Dashboard,
    queue: &mut UiQueue<Dashboard>,
    coordinator: &Arc<Coordinator>,
) -> Result<LoopExit> {
    let mut events = EventStream::new();
    let mut clock = tokio::time::interval(Duration::from_secs(1));

    loop {
        terminal.draw(|f| ui::render(f, dashboard))?;

        tokio::select! {
            task = queue.recv() => match task {
                Some(task) => {
                    task(&mut *dashboard);
                    queue.drain(&mut *dashboard);
                }
                None => return Ok(LoopExit::Quit),
            },
            _ = clock.tick() => {}
            event = events.next() => match event {
                Some(Ok(Event::Key(key)))
                    if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) =>
                {
                    match dashboard.handle_key(key) {
                        KeyAction::None => {}
                        KeyAction::Quit => return Ok(LoopExit::Quit),
                        KeyAction::Refresh => {
                            let coordinator = Arc::clone(coordinator);
                            tokio::spawn(async move {
                                coordinator.refresh(RefreshTrigger::Manual).await;
                            });
                        }
                        KeyAction::Launch(request) => return Ok(LoopExit::Launch(request)),
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => return Ok(LoopExit::Quit),
            },
        }
    }
}
