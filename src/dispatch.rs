//! User-triggered actions on the selected card.
//!
//! Every network or clipboard call runs in a spawned task and reports back with
//! [`AppEvent::ActionFinished`] or [`AppEvent::LogResult`]. State changes happen
//! only here, on the UI loop, so a control can never be entered twice.

use crate::actions::{ActionKind, ActionOutcome, ControlId};
use crate::api::{ApiError, BulletinApi};
use crate::app::{AppState, ConfirmAction};
use crate::clipboard::Clipboard;
use crate::events::AppEvent;
use crate::log::{self, LogDocument, LogFilter};
use crate::view;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

pub struct Dispatcher {
    api: Arc<dyn BulletinApi>,
    clipboard: Arc<dyn Clipboard>,
    tx: mpsc::UnboundedSender<AppEvent>,
    download_dir: PathBuf,
}

impl Dispatcher {
    pub fn new(
        api: Arc<dyn BulletinApi>,
        clipboard: Arc<dyn Clipboard>,
        tx: mpsc::UnboundedSender<AppEvent>,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            api,
            clipboard,
            tx,
            download_dir,
        }
    }

    /// Asks for confirmation before a rerun. Disabled or busy controls are inert.
    pub fn request_rerun(&self, state: &mut AppState) {
        let Some(card) = state.selected_card() else {
            return;
        };
        if card.rerun_disabled {
            tracing::debug!(id = %card.id, "rerun disabled");
            return;
        }
        let control = ControlId::new(card.id.clone(), ActionKind::Rerun);
        if !state.actions.is_idle(&control) {
            return;
        }
        let title = "Re-run bulletin".to_string();
        let message = format!("Re-run '{}' now?", card.name);
        let action = ConfirmAction::Rerun(card.id.clone());
        state.open_confirm_overlay(title, message, action);
    }

    /// Resolves the confirm overlay. Declining makes no call and changes nothing else.
    pub fn confirm(&self, state: &mut AppState, accepted: bool) {
        let Some(action) = state.confirm_action() else {
            return;
        };
        state.close_confirm_overlay();
        if !accepted {
            return;
        }
        match action {
            ConfirmAction::Rerun(id) => self.rerun(state, id),
        }
    }

    fn rerun(&self, state: &mut AppState, id: String) {
        // The list may have changed while the prompt was open.
        let Some(bulletin) = state.store.get(&id) else {
            return;
        };
        if view::rerun_disabled(bulletin) {
            return;
        }
        let control = ControlId::new(id.clone(), ActionKind::Rerun);
        if !state.actions.begin(&control) {
            return;
        }
        tracing::info!(%id, "rerun requested");
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = match api.rerun(&id).await {
                Ok(receipt) => ActionOutcome::Done(receipt.message),
                Err(e) => ActionOutcome::Failed(format!("Re-run failed: {e}")),
            };
            let _ = tx.send(AppEvent::ActionFinished { control, outcome });
        });
    }

    /// Downloads product `index` of the selected card into the download directory.
    pub fn download(&self, state: &mut AppState, index: usize) {
        let Some(card) = state.selected_card() else {
            return;
        };
        let id = card.id.clone();
        let Some(product) = card.product(index) else {
            return;
        };
        if !product.available {
            let msg = format!("{} is not available yet", product.name);
            state.add_notification(Some(id), msg);
            return;
        }
        let control = ControlId::new(id.clone(), ActionKind::Download(index));
        if !state.actions.begin(&control) {
            return;
        }
        tracing::info!(%id, index, "download requested");
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let dir = self.download_dir.clone();
        tokio::spawn(async move {
            let outcome = match download_to(api.as_ref(), &id, index, dir).await {
                Ok(path) => ActionOutcome::Done(format!("Saved {}", path.display())),
                Err(e) => ActionOutcome::Failed(format!("Download failed: {e}")),
            };
            let _ = tx.send(AppEvent::ActionFinished { control, outcome });
        });
    }

    pub fn copy_command(&self, state: &mut AppState) {
        let Some(card) = state.selected_card() else {
            return;
        };
        let Some(command) = card.access_command.clone() else {
            return;
        };
        let control = ControlId::new(card.id.clone(), ActionKind::CopyCommand);
        if !state.actions.begin(&control) {
            return;
        }
        let clipboard = Arc::clone(&self.clipboard);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = match clipboard.copy(&command).await {
                Ok(()) => ActionOutcome::Done("Command copied to clipboard".to_string()),
                Err(e) => ActionOutcome::Failed(format!("Copy failed: {e}")),
            };
            let _ = tx.send(AppEvent::ActionFinished { control, outcome });
        });
    }

    /// Moves a finished control into its feedback state.
    pub fn on_finished(
        &self,
        state: &mut AppState,
        control: &ControlId,
        outcome: ActionOutcome,
        now: Instant,
    ) {
        let ok = matches!(outcome, ActionOutcome::Done(_));
        if !state.actions.finish(control, ok, now) {
            tracing::debug!(?control, "finish for a control that was not pending");
            return;
        }
        match outcome {
            ActionOutcome::Done(msg) => {
                tracing::info!(id = %control.bulletin_id, kind = ?control.kind, "{msg}");
                state.add_notification(Some(control.bulletin_id.clone()), msg);
            }
            ActionOutcome::Failed(msg) => {
                tracing::warn!(id = %control.bulletin_id, kind = ?control.kind, "{msg}");
                state.set_error(msg);
            }
        }
    }

    /// Reverts controls whose feedback elapsed. Returns how many fresh polls are due.
    pub fn expire(&self, state: &mut AppState, now: Instant) -> usize {
        state
            .actions
            .expire(now)
            .iter()
            .filter(|control| control.kind.resyncs())
            .count()
    }

    /// Opens the log viewer in its loading state and fetches the full log.
    pub fn view_log(&self, state: &mut AppState) {
        let Some(card) = state.selected_card() else {
            return;
        };
        let id = card.id.clone();
        let title = card.name.clone();
        state.open_log_loading(id.clone(), title);
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.fetch_full_log(&id).await;
            let _ = tx.send(AppEvent::LogResult {
                bulletin_id: id,
                result,
            });
        });
    }

    pub fn on_log_result(
        &self,
        state: &mut AppState,
        bulletin_id: &str,
        result: Result<LogDocument, ApiError>,
    ) {
        let waiting = state
            .log_overlay_ref()
            .is_some_and(|o| o.bulletin_id == bulletin_id);
        match result {
            Ok(document) => {
                if !state.show_log(document) {
                    tracing::debug!(bulletin_id, "discarding log for a closed viewer");
                }
            }
            Err(e) if waiting => {
                tracing::warn!(bulletin_id, "log fetch failed: {e}");
                state.close_log_overlay();
                state.set_error(format!("Failed to load log: {e}"));
            }
            Err(e) => tracing::debug!(bulletin_id, "ignoring log error for a closed viewer: {e}"),
        }
    }

    /// Writes the filtered lines of the open log to the download directory.
    pub fn export_log(&self, state: &mut AppState, filter: LogFilter) {
        let document = state.log_overlay_ref().and_then(|o| o.document());
        let bulletin_id = document.map(|d| d.bulletin_id.clone());
        let saved = log::export(document, filter, Local::now().date_naive())
            .and_then(|export| log::save_export(&self.download_dir, &export));
        match saved {
            Ok(path) => {
                tracing::info!(path = %path.display(), %filter, "log exported");
                state.add_notification(bulletin_id, format!("Exported {}", path.display()));
            }
            Err(e) => {
                tracing::warn!(%filter, "log export failed: {e}");
                state.set_error(e.to_string());
            }
        }
    }
}

async fn download_to(
    api: &dyn BulletinApi,
    id: &str,
    index: usize,
    dir: PathBuf,
) -> color_eyre::Result<PathBuf> {
    let download = api.download_product(id, index).await?;
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(&download.file_name);
    tokio::fs::write(&path, &download.bytes).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionState;
    use crate::api::{ProductDownload, RerunReceipt};
    use crate::app::{BulletinStatus, BulletinSummary, ProductInfo};
    use crate::store::ReconcileOutcome;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeApi {
        reruns: AtomicUsize,
        downloads: AtomicUsize,
        logs: AtomicUsize,
        rerun_error: Option<ApiError>,
    }

    #[async_trait]
    impl BulletinApi for FakeApi {
        async fn list_bulletins(&self) -> Result<Vec<BulletinSummary>, ApiError> {
            Ok(Vec::new())
        }

        async fn rerun(&self, id: &str) -> Result<RerunReceipt, ApiError> {
            self.reruns.fetch_add(1, Ordering::SeqCst);
            match &self.rerun_error {
                Some(e) => Err(e.clone()),
                None => Ok(RerunReceipt {
                    message: format!("Bulletin '{id}' re-run command sent successfully."),
                }),
            }
        }

        async fn fetch_full_log(&self, id: &str) -> Result<LogDocument, ApiError> {
            self.logs.fetch_add(1, Ordering::SeqCst);
            Ok(LogDocument::new(
                id.to_string(),
                id.to_string(),
                r#"<span class="log-error">E1</span>"#.to_string(),
            ))
        }

        async fn download_product(
            &self,
            id: &str,
            index: usize,
        ) -> Result<ProductDownload, ApiError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            Ok(ProductDownload {
                file_name: format!("product_{id}_{index}.pdf"),
                bytes: b"%PDF".to_vec(),
            })
        }
    }

    #[derive(Default)]
    struct FakeClipboard {
        copied: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Clipboard for FakeClipboard {
        async fn copy(&self, text: &str) -> color_eyre::Result<()> {
            self.copied.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn bulletin(id: &str, status: BulletinStatus) -> BulletinSummary {
        BulletinSummary {
            id: id.to_string(),
            name: format!("{id} name"),
            status,
            last_run: "2024-09-05 06:12:44".to_string(),
            has_warnings: false,
            product_info: vec![
                ProductInfo {
                    name: "PDF".to_string(),
                    available: true,
                    remote_path: Some("/out/a.pdf".to_string()),
                },
                ProductInfo {
                    name: "Map".to_string(),
                    available: false,
                    remote_path: None,
                },
            ],
            access_command: Some("ssh bqrm@host".to_string()),
            rerun_disabled: false,
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bw-dispatch-{tag}-{}", std::process::id()))
    }

    struct Harness {
        state: AppState,
        api: Arc<FakeApi>,
        clipboard: Arc<FakeClipboard>,
        dispatcher: Dispatcher,
        rx: mpsc::UnboundedReceiver<AppEvent>,
    }

    fn harness_with(api: FakeApi, bulletins: Vec<BulletinSummary>, dir: PathBuf) -> Harness {
        let mut state = AppState::new("http://localhost:5000".to_string(), dir.clone());
        let seq = state.store.next_seq();
        assert_eq!(
            state.store.reconcile(seq, bulletins, Local::now()),
            ReconcileOutcome::Applied
        );
        state.rebuild_cards();
        let api = Arc::new(api);
        let clipboard = Arc::new(FakeClipboard::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(api.clone(), clipboard.clone(), tx, dir);
        Harness {
            state,
            api,
            clipboard,
            dispatcher,
            rx,
        }
    }

    fn harness(bulletins: Vec<BulletinSummary>) -> Harness {
        harness_with(FakeApi::default(), bulletins, temp_dir("default"))
    }

    async fn next_finished(
        rx: &mut mpsc::UnboundedReceiver<AppEvent>,
    ) -> (ControlId, ActionOutcome) {
        match rx.recv().await {
            Some(AppEvent::ActionFinished { control, outcome }) => (control, outcome),
            other => panic!("expected action result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn declining_rerun_makes_no_call() {
        let mut h = harness(vec![bulletin("a", BulletinStatus::Failed)]);
        h.dispatcher.request_rerun(&mut h.state);
        assert!(h.state.has_confirm_overlay());

        h.dispatcher.confirm(&mut h.state, false);
        assert!(!h.state.has_confirm_overlay());
        tokio::task::yield_now().await;
        assert_eq!(h.api.reruns.load(Ordering::SeqCst), 0);
        assert!(h.state.actions.is_idle(&ControlId::new("a", ActionKind::Rerun)));
        assert!(h.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_status_can_still_rerun() {
        let mut h = harness(vec![bulletin("a", BulletinStatus::Failed)]);
        h.dispatcher.request_rerun(&mut h.state);
        h.dispatcher.confirm(&mut h.state, true);
        let control = ControlId::new("a", ActionKind::Rerun);
        assert_eq!(h.state.actions.state(&control), ActionState::Pending);

        let (finished, outcome) = next_finished(&mut h.rx).await;
        assert_eq!(finished, control);
        assert_eq!(h.api.reruns.load(Ordering::SeqCst), 1);
        h.dispatcher
            .on_finished(&mut h.state, &finished, outcome, Instant::now());
        assert_eq!(h.state.actions.label(&control), "Re-run sent");
    }

    #[tokio::test]
    async fn backend_fault_disables_rerun() {
        let mut h = harness(vec![bulletin("a", BulletinStatus::SshError)]);
        h.dispatcher.request_rerun(&mut h.state);
        assert!(!h.state.has_confirm_overlay());
    }

    #[tokio::test]
    async fn rerun_success_triggers_exactly_one_repoll_after_feedback() {
        let mut h = harness(vec![bulletin("a", BulletinStatus::Success)]);
        h.dispatcher.request_rerun(&mut h.state);
        h.dispatcher.confirm(&mut h.state, true);
        let (control, outcome) = next_finished(&mut h.rx).await;
        let t0 = Instant::now();
        h.dispatcher.on_finished(&mut h.state, &control, outcome, t0);

        assert_eq!(
            h.dispatcher
                .expire(&mut h.state, t0 + Duration::from_millis(1999)),
            0
        );
        assert_eq!(
            h.dispatcher
                .expire(&mut h.state, t0 + Duration::from_millis(2000)),
            1
        );
        assert_eq!(
            h.dispatcher.expire(&mut h.state, t0 + Duration::from_secs(10)),
            0
        );
        assert!(h.state.actions.is_idle(&control));
    }

    #[tokio::test]
    async fn rerun_business_failure_shows_error_and_reverts() {
        let api = FakeApi {
            rerun_error: Some(ApiError::Business {
                message: "Failed to send re-run command for 'a'.".to_string(),
            }),
            ..FakeApi::default()
        };
        let mut h = harness_with(api, vec![bulletin("a", BulletinStatus::Failed)], temp_dir("biz"));
        h.dispatcher.request_rerun(&mut h.state);
        h.dispatcher.confirm(&mut h.state, true);
        let (control, outcome) = next_finished(&mut h.rx).await;
        let t0 = Instant::now();
        h.dispatcher.on_finished(&mut h.state, &control, outcome, t0);

        assert_eq!(h.state.actions.label(&control), "Failed");
        assert!(h
            .state
            .error_message()
            .unwrap()
            .contains("Failed to send re-run command"));
        assert_eq!(
            h.dispatcher
                .expire(&mut h.state, t0 + Duration::from_millis(2000)),
            1
        );
        assert!(h.state.actions.is_idle(&control));
    }

    #[tokio::test]
    async fn download_ignores_reentry_while_pending() {
        let dir = temp_dir("reentry");
        let list = vec![bulletin("a", BulletinStatus::Success)];
        let mut h = harness_with(FakeApi::default(), list, dir.clone());
        h.dispatcher.download(&mut h.state, 0);
        h.dispatcher.download(&mut h.state, 0);

        let (control, outcome) = next_finished(&mut h.rx).await;
        assert_eq!(control.kind, ActionKind::Download(0));
        assert!(matches!(outcome, ActionOutcome::Done(_)));
        assert_eq!(h.api.downloads.load(Ordering::SeqCst), 1);
        assert_eq!(
            std::fs::read(dir.join("product_a_0.pdf")).unwrap(),
            b"%PDF".to_vec()
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unavailable_product_is_not_requested() {
        let mut h = harness(vec![bulletin("a", BulletinStatus::Success)]);
        h.dispatcher.download(&mut h.state, 1);
        tokio::task::yield_now().await;
        assert_eq!(h.api.downloads.load(Ordering::SeqCst), 0);
        assert!(h
            .state
            .actions
            .is_idle(&ControlId::new("a", ActionKind::Download(1))));
        assert_eq!(h.state.notifications.len(), 1);
    }

    #[tokio::test]
    async fn copy_command_uses_clipboard() {
        let mut h = harness(vec![bulletin("a", BulletinStatus::Success)]);
        h.dispatcher.copy_command(&mut h.state);
        let (control, outcome) = next_finished(&mut h.rx).await;
        let t0 = Instant::now();
        h.dispatcher.on_finished(&mut h.state, &control, outcome, t0);

        assert_eq!(*h.clipboard.copied.lock().unwrap(), vec!["ssh bqrm@host"]);
        assert_eq!(h.state.actions.label(&control), "Copied!");
        assert_eq!(
            h.dispatcher
                .expire(&mut h.state, t0 + Duration::from_millis(1500)),
            0
        );
        assert!(h.state.actions.is_idle(&control));
    }

    #[tokio::test]
    async fn copy_without_command_is_inert() {
        let mut b = bulletin("a", BulletinStatus::Success);
        b.access_command = None;
        let mut h = harness(vec![b]);
        h.dispatcher.copy_command(&mut h.state);
        assert!(h
            .state
            .actions
            .is_idle(&ControlId::new("a", ActionKind::CopyCommand)));
    }

    #[tokio::test]
    async fn view_log_loads_into_open_viewer() {
        let mut h = harness(vec![bulletin("a", BulletinStatus::Success)]);
        h.dispatcher.view_log(&mut h.state);
        assert!(h.state.log_overlay_ref().unwrap().document().is_none());

        match h.rx.recv().await {
            Some(AppEvent::LogResult { bulletin_id, result }) => {
                h.dispatcher
                    .on_log_result(&mut h.state, &bulletin_id, result);
            }
            other => panic!("expected log result, got {other:?}"),
        }
        assert!(h.state.log_overlay_ref().unwrap().document().is_some());
        assert_eq!(h.api.logs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn log_error_closes_viewer() {
        let mut h = harness(vec![bulletin("a", BulletinStatus::Success)]);
        h.state.open_log_loading("a".to_string(), "a".to_string());
        h.dispatcher.on_log_result(
            &mut h.state,
            "a",
            Err(ApiError::Api {
                status: 404,
                message: "Bulletin not found".to_string(),
            }),
        );
        assert!(!h.state.has_log_overlay());
        assert!(h.state.error_message().unwrap().contains("Bulletin not found"));
    }

    #[tokio::test]
    async fn export_before_load_is_not_ready() {
        let mut h = harness(vec![bulletin("a", BulletinStatus::Success)]);
        h.state.open_log_loading("a".to_string(), "a".to_string());
        h.dispatcher.export_log(&mut h.state, LogFilter::Errors);
        assert_eq!(h.state.error_message(), Some("Log is not loaded yet"));
    }

    #[tokio::test]
    async fn export_writes_matching_lines() {
        let dir = temp_dir("export");
        let list = vec![bulletin("a", BulletinStatus::Success)];
        let mut h = harness_with(FakeApi::default(), list, dir.clone());
        h.state.open_log_loading("a".to_string(), "a".to_string());
        h.state.show_log(LogDocument::new(
            "a".to_string(),
            "sonelgaz".to_string(),
            r#"<span class="log-error">E1</span>plain<span class="log-warning">W1</span>"#
                .to_string(),
        ));

        h.dispatcher.export_log(&mut h.state, LogFilter::Critical);
        assert_eq!(h.state.error_message(), Some("No critical found in this log"));

        h.state.clear_error();
        h.dispatcher.export_log(&mut h.state, LogFilter::Warnings);
        assert!(h.state.error_message().is_none());
        let name = format!("sonelgaz_warnings_log_{}.log", Local::now().format("%Y-%m-%d"));
        assert_eq!(std::fs::read_to_string(dir.join(name)).unwrap(), "W1");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
