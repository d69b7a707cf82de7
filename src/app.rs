use crate::actions::ActionBoard;
use crate::api::ApiError;
use crate::diff;
use crate::log::{LogDocument, LogLine};
use crate::store::{BulletinStore, ReconcileOutcome};
use crate::view::{self, CardRow, CardViewModel};
use chrono::{DateTime, Local};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;

// Polling
pub const POLL_INTERVAL_SECS: u64 = 30;

// Action feedback durations (milliseconds)
pub const RERUN_FEEDBACK_MS: u64 = 2000;
pub const DOWNLOAD_FEEDBACK_MS: u64 = 2000;
pub const COPY_FEEDBACK_MS: u64 = 1500;

// UI constants
pub const NOTIFICATION_TTL_SECS: u64 = 5;
pub const SPINNER_FRAME_COUNT: usize = 10;
pub const QUICK_SELECT_MAX: usize = 9;
pub const NARROW_WIDTH_THRESHOLD: u16 = 60;
pub const ERROR_TTL_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulletinStatus {
    Success,
    Ok,
    Warning,
    Warn,
    Failed,
    Error,
    Critical,
    Pending,
    NoRecentRun,
    SshError,
    SystemError,
    #[serde(other)]
    Unknown,
}

impl BulletinStatus {
    pub fn label(self) -> &'static str {
        match self {
            BulletinStatus::Success => "SUCCESS",
            BulletinStatus::Ok => "OK",
            BulletinStatus::Warning => "WARNING",
            BulletinStatus::Warn => "WARN",
            BulletinStatus::Failed => "FAILED",
            BulletinStatus::Error => "ERROR",
            BulletinStatus::Critical => "CRITICAL",
            BulletinStatus::Pending => "PENDING",
            BulletinStatus::NoRecentRun => "NO RECENT RUN",
            BulletinStatus::SshError => "SSH ERROR",
            BulletinStatus::SystemError => "SYSTEM ERROR",
            BulletinStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, BulletinStatus::Success | BulletinStatus::Ok)
    }

    pub fn is_warning(self) -> bool {
        matches!(self, BulletinStatus::Warning | BulletinStatus::Warn)
    }

    /// The job ran and did not succeed.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            BulletinStatus::Failed | BulletinStatus::Error | BulletinStatus::Critical
        )
    }

    /// The backend cannot reach the host that runs the job.
    pub fn is_backend_fault(self) -> bool {
        matches!(self, BulletinStatus::SshError | BulletinStatus::SystemError)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ProductInfo {
    pub name: String,
    pub available: bool,
    #[serde(default)]
    pub remote_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct BulletinSummary {
    pub id: String,
    pub name: String,
    pub status: BulletinStatus,
    #[serde(default)]
    pub last_run: String,
    #[serde(default)]
    pub has_warnings: bool,
    #[serde(default)]
    pub product_info: Vec<ProductInfo>,
    #[serde(default)]
    pub access_command: Option<String>,
    #[serde(default)]
    pub rerun_disabled: bool,
}

/// Reduces a server- or user-supplied name to a single safe path component.
pub fn safe_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() || c == ':' { '_' } else { c })
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "download".to_string()
    } else {
        cleaned
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub bulletin_id: Option<String>,
    pub message: String,
    pub timestamp: Instant,
}

pub enum LogContent {
    Loading,
    Loaded {
        document: LogDocument,
        lines: Vec<LogLine>,
    },
}

pub struct LogOverlay {
    pub bulletin_id: String,
    pub title: String,
    pub content: LogContent,
    pub scroll: usize,
}

impl LogOverlay {
    pub fn document(&self) -> Option<&LogDocument> {
        match &self.content {
            LogContent::Loading => None,
            LogContent::Loaded { document, .. } => Some(document),
        }
    }

    pub fn line_count(&self) -> usize {
        match &self.content {
            LogContent::Loading => 0,
            LogContent::Loaded { lines, .. } => lines.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    Rerun(String),
}

pub struct ConfirmOverlay {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

pub enum ActiveOverlay {
    None,
    Log(LogOverlay),
    Confirm(ConfirmOverlay),
}

/// Immutable configuration set at startup.
pub struct AppConfig {
    pub base_url: String,
    pub download_dir: PathBuf,
}

pub struct AppState {
    pub config: AppConfig,

    // Bulletin data
    pub store: BulletinStore,
    pub cards: Vec<CardRow>,
    pub previous_snapshot: HashMap<String, (BulletinStatus, u64)>,
    pub poll_count: u64,

    // Navigation
    pub cursor: usize,
    /// `d` was pressed on a card with several products; the next digit picks one.
    pub picking_product: bool,

    // Per-control feedback
    pub actions: ActionBoard,

    // Polling
    pub poll_interval: u64,

    // Transient UI
    pub notifications: Vec<Notification>,
    pub error: Option<(String, Instant)>,
    pub spinner_frame: usize,
    /// Sequence numbers of list fetches that have started but not reported back.
    pub polls_in_flight: HashSet<u64>,
    pub should_quit: bool,

    // Active overlay (mutually exclusive)
    pub overlay: ActiveOverlay,

    // Desktop notifications
    pub desktop_notify: bool,
}

impl AppState {
    pub fn new(base_url: String, download_dir: PathBuf) -> Self {
        let store = BulletinStore::new();
        let cards = view::render_store(&store);
        Self {
            config: AppConfig {
                base_url,
                download_dir,
            },
            store,
            cards,
            previous_snapshot: HashMap::new(),
            poll_count: 0,
            cursor: 0,
            picking_product: false,
            actions: ActionBoard::new(),
            poll_interval: POLL_INTERVAL_SECS,
            notifications: Vec::new(),
            error: None,
            spinner_frame: 0,
            polls_in_flight: HashSet::new(),
            should_quit: false,
            overlay: ActiveOverlay::None,
            desktop_notify: true,
        }
    }

    /// Re-projects the store into cards and keeps the cursor on a valid card.
    pub fn rebuild_cards(&mut self) {
        self.cards = view::render_store(&self.store);
        let count = self.card_count();
        if count == 0 {
            self.cursor = 0;
        } else if self.cursor >= count {
            self.cursor = count - 1;
        }
    }

    /// Runs a finished fetch through the store and re-renders. Returns the
    /// bulletins whose status change deserves a desktop notification.
    pub fn apply_poll(
        &mut self,
        seq: u64,
        result: Result<Vec<BulletinSummary>, ApiError>,
        at: DateTime<Local>,
    ) -> Vec<BulletinSummary> {
        self.polls_in_flight.remove(&seq);
        let notable = match result {
            Ok(list) => match self.store.reconcile(seq, list, at) {
                ReconcileOutcome::Applied => {
                    let current = self.store.current();
                    diff::detect_changes(self, &current)
                }
                ReconcileOutcome::Stale => Vec::new(),
            },
            Err(e) => {
                self.store.record_failure(seq, e.to_string(), at);
                Vec::new()
            }
        };
        self.rebuild_cards();
        notable
    }

    pub fn card_count(&self) -> usize {
        self.cards
            .iter()
            .filter(|c| matches!(c, CardRow::Card(_)))
            .count()
    }

    pub fn selected_card(&self) -> Option<&CardViewModel> {
        self.cards
            .iter()
            .filter_map(|c| match c {
                CardRow::Card(card) => Some(card),
                CardRow::Placeholder(_) => None,
            })
            .nth(self.cursor)
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_cursor_down(&mut self) {
        let count = self.card_count();
        if count > 0 && self.cursor < count - 1 {
            self.cursor += 1;
        }
    }

    pub fn quick_select(&mut self, n: usize) {
        if n >= 1 && n <= self.card_count() {
            self.cursor = n - 1;
        }
    }

    pub fn prune_notifications(&mut self) {
        let now = Instant::now();
        self.notifications
            .retain(|n| now.duration_since(n.timestamp).as_secs() < NOTIFICATION_TTL_SECS);
    }

    pub fn add_notification(&mut self, bulletin_id: Option<String>, message: String) {
        self.notifications.push(Notification {
            bulletin_id,
            message,
            timestamp: Instant::now(),
        });
    }

    pub fn is_loading(&self) -> bool {
        !self.polls_in_flight.is_empty()
    }

    pub fn poll_started(&mut self, seq: u64) {
        self.polls_in_flight.insert(seq);
    }

    pub fn advance_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAME_COUNT;
    }

    pub fn set_error(&mut self, msg: String) {
        self.error = Some((msg, Instant::now()));
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn prune_error(&mut self) {
        if let Some((_, ts)) = &self.error {
            if ts.elapsed().as_secs() >= ERROR_TTL_SECS {
                self.error = None;
            }
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|(msg, _)| msg.as_str())
    }

    pub fn close_overlay(&mut self) {
        self.overlay = ActiveOverlay::None;
    }

    // --- Log overlay methods ---

    pub fn has_log_overlay(&self) -> bool {
        matches!(self.overlay, ActiveOverlay::Log(_))
    }

    /// Opens the viewer for `bulletin_id`, discarding whatever log was shown before.
    pub fn open_log_loading(&mut self, bulletin_id: String, title: String) {
        self.overlay = ActiveOverlay::Log(LogOverlay {
            bulletin_id,
            title,
            content: LogContent::Loading,
            scroll: 0,
        });
    }

    /// Fills the open viewer. Returns `false` (and drops the document) when the
    /// viewer was closed or now shows another bulletin.
    pub fn show_log(&mut self, document: LogDocument) -> bool {
        match self.overlay {
            ActiveOverlay::Log(ref mut overlay) if overlay.bulletin_id == document.bulletin_id => {
                overlay.title.clone_from(&document.name);
                let lines = document.lines();
                overlay.content = LogContent::Loaded { document, lines };
                overlay.scroll = 0;
                true
            }
            _ => false,
        }
    }

    pub fn close_log_overlay(&mut self) {
        if matches!(self.overlay, ActiveOverlay::Log(_)) {
            self.overlay = ActiveOverlay::None;
        }
    }

    pub fn log_overlay_ref(&self) -> Option<&LogOverlay> {
        if let ActiveOverlay::Log(ref overlay) = self.overlay {
            Some(overlay)
        } else {
            None
        }
    }

    pub fn scroll_log_up(&mut self, amount: usize) {
        if let ActiveOverlay::Log(ref mut overlay) = self.overlay {
            overlay.scroll = overlay.scroll.saturating_sub(amount);
        }
    }

    pub fn scroll_log_down(&mut self, amount: usize, visible_height: usize) {
        if let ActiveOverlay::Log(ref mut overlay) = self.overlay {
            let max_scroll = overlay.line_count().saturating_sub(visible_height);
            overlay.scroll = (overlay.scroll + amount).min(max_scroll);
        }
    }

    pub fn scroll_log_to_top(&mut self) {
        if let ActiveOverlay::Log(ref mut overlay) = self.overlay {
            overlay.scroll = 0;
        }
    }

    pub fn scroll_log_to_bottom(&mut self, visible_height: usize) {
        if let ActiveOverlay::Log(ref mut overlay) = self.overlay {
            overlay.scroll = overlay.line_count().saturating_sub(visible_height);
        }
    }

    // --- Confirm overlay methods ---

    pub fn has_confirm_overlay(&self) -> bool {
        matches!(self.overlay, ActiveOverlay::Confirm(_))
    }

    pub fn confirm_action(&self) -> Option<ConfirmAction> {
        if let ActiveOverlay::Confirm(ref overlay) = self.overlay {
            Some(overlay.action.clone())
        } else {
            None
        }
    }

    pub fn open_confirm_overlay(&mut self, title: String, message: String, action: ConfirmAction) {
        self.overlay = ActiveOverlay::Confirm(ConfirmOverlay {
            title,
            message,
            action,
        });
    }

    pub fn close_confirm_overlay(&mut self) {
        if matches!(self.overlay, ActiveOverlay::Confirm(_)) {
            self.overlay = ActiveOverlay::None;
        }
    }

    /// Drops every pending feedback deadline and overlay; used on exit.
    pub fn dispose(&mut self) {
        self.actions.clear();
        self.overlay = ActiveOverlay::None;
        self.notifications.clear();
    }
}
