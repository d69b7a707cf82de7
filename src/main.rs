use bw::api::{BulletinApi, HttpApi};
use bw::app::{ActiveOverlay, AppState};
use bw::cli::Cli;
use bw::clipboard::SystemClipboard;
use bw::dispatch::Dispatcher;
use bw::events::{AppEvent, EventHandler};
use bw::input::{self, Action, InputContext, OverlayMode};
use bw::notify;
use bw::poller::Poller;
use bw::tui;

use chrono::Local;
use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const PAGE_LINES: usize = 20;

fn setup_logging(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .map_err(|e| eyre!("Failed to create log directory {dir:?}: {e}"))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| eyre!("Failed to open log file {path:?}: {e}"))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    tracing::info!("bw v{} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    if let Some(path) = &args.log_file {
        setup_logging(path)?;
    }

    let http = HttpApi::new(&args.url)?;
    tracing::info!(url = http.base_url(), "using bulletin API");
    let api: Arc<dyn BulletinApi> = Arc::new(http);

    let mut state = AppState::new(args.url.clone(), args.download_dir.clone());
    state.poll_interval = args.interval.max(1);
    state.desktop_notify = !args.no_notify;

    // Setup terminal with panic hook
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, SetTitle("bw"))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut events = EventHandler::new(Duration::from_millis(100));
    let tx = events.sender();

    let mut poller = Poller::new(
        Arc::clone(&api),
        state.store.seq_counter(),
        tx.clone(),
        Duration::from_secs(state.poll_interval),
    );
    let dispatcher = Dispatcher::new(api, Arc::new(SystemClipboard), tx, args.download_dir);

    poller.start();

    let result = run_app(&mut terminal, &mut state, &mut events, &mut poller, &dispatcher).await;

    events.stop();
    poller.stop();
    state.dispose();

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, SetTitle(""))?;
    terminal.show_cursor()?;

    result
}

/// Visible height of the log overlay for the current terminal size.
fn log_overlay_height(terminal: &Terminal<CrosstermBackend<io::Stdout>>) -> usize {
    match terminal.size() {
        Ok(size) => tui::log_overlay::visible_height(Rect::new(0, 0, size.width, size.height)),
        Err(e) => {
            tracing::warn!("terminal size query failed: {e}");
            PAGE_LINES
        }
    }
}

fn input_context(state: &AppState) -> InputContext {
    InputContext {
        has_error: state.error.is_some(),
        is_loading: state.is_loading(),
        overlay: match state.overlay {
            ActiveOverlay::None => OverlayMode::None,
            ActiveOverlay::Log(_) => OverlayMode::Log,
            ActiveOverlay::Confirm(_) => OverlayMode::Confirm,
        },
        picking_product: state.picking_product,
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    events: &mut EventHandler,
    poller: &mut Poller,
    dispatcher: &Dispatcher,
) -> Result<()> {
    loop {
        terminal.draw(|f| tui::render::render(f, state))?;

        state.prune_notifications();
        state.prune_error();

        let Some(event) = events.next().await else {
            return Ok(());
        };

        match event {
            AppEvent::Key(key) => match input::map_key(key, &input_context(state)) {
                Action::Quit => state.should_quit = true,
                Action::DismissError => state.clear_error(),
                Action::MoveUp => state.move_cursor_up(),
                Action::MoveDown => state.move_cursor_down(),
                Action::QuickSelect(n) => state.quick_select(n),
                Action::Refresh => poller.refresh(),
                Action::Rerun => dispatcher.request_rerun(state),
                Action::Confirm => dispatcher.confirm(state, true),
                Action::Cancel => dispatcher.confirm(state, false),
                Action::ViewLog => dispatcher.view_log(state),
                Action::BeginDownload => match state.selected_card().map(|c| c.products.len()) {
                    Some(1) => dispatcher.download(state, 0),
                    Some(n) if n > 1 => state.picking_product = true,
                    _ => {}
                },
                Action::DownloadProduct(index) => {
                    state.picking_product = false;
                    dispatcher.download(state, index);
                }
                Action::CancelPick => state.picking_product = false,
                Action::CopyCommand => dispatcher.copy_command(state),
                Action::CloseOverlay => state.close_log_overlay(),
                Action::ScrollUp => state.scroll_log_up(1),
                Action::ScrollDown => state.scroll_log_down(1, log_overlay_height(terminal)),
                Action::PageUp => state.scroll_log_up(PAGE_LINES),
                Action::PageDown => state.scroll_log_down(PAGE_LINES, log_overlay_height(terminal)),
                Action::ScrollToTop => state.scroll_log_to_top(),
                Action::ScrollToBottom => state.scroll_log_to_bottom(log_overlay_height(terminal)),
                Action::Export(filter) => dispatcher.export_log(state, filter),
                Action::None => {}
            },
            AppEvent::Tick => {
                state.advance_spinner();
                let due = dispatcher.expire(state, Instant::now());
                for _ in 0..due {
                    poller.refresh();
                }
            }
            AppEvent::PollStarted { seq } => state.poll_started(seq),
            AppEvent::PollResult { seq, result } => {
                let notable = state.apply_poll(seq, result, Local::now());
                if state.desktop_notify {
                    for bulletin in &notable {
                        notify::send_desktop(bulletin);
                    }
                }
            }
            AppEvent::LogResult {
                bulletin_id,
                result,
            } => dispatcher.on_log_result(state, &bulletin_id, result),
            AppEvent::ActionFinished { control, outcome } => {
                dispatcher.on_finished(state, &control, outcome, Instant::now());
            }
            AppEvent::Error(e) => {
                tracing::error!("{e}");
                state.set_error(e);
            }
        }

        if state.should_quit {
            return Ok(());
        }
    }
}
