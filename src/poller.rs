//! Periodic bulletin polling.
//!
//! One background task fetches the list immediately and then on every interval
//! tick. [`Poller::refresh`] spawns an extra one-off fetch and leaves the timer's
//! phase untouched. Each fetch draws a sequence number and announces it with
//! [`AppEvent::PollStarted`] before the request goes out; the UI
//! loop hands that number to the store, which drops results older than the last
//! one it applied. Failures are reported and the loop carries on; there is no
//! retry and no backoff.

use crate::api::BulletinApi;
use crate::events::AppEvent;
use crate::store::SeqCounter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

pub struct Poller {
    api: Arc<dyn BulletinApi>,
    seq: SeqCounter,
    tx: mpsc::UnboundedSender<AppEvent>,
    interval: Duration,
    task: Option<JoinHandle<()>>,
    extra: Vec<JoinHandle<()>>,
}

impl Poller {
    pub fn new(
        api: Arc<dyn BulletinApi>,
        seq: SeqCounter,
        tx: mpsc::UnboundedSender<AppEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            seq,
            tx,
            interval,
            task: None,
            extra: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Starts the periodic loop. Calling it again while running does nothing.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let api = Arc::clone(&self.api);
        let seq = self.seq.clone();
        let tx = self.tx.clone();
        let period = self.interval.max(Duration::from_secs(1));
        tracing::info!(interval_secs = period.as_secs(), "poller started");

        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // The first tick completes immediately.
                ticker.tick().await;
                if !poll_once(api.as_ref(), &seq, &tx).await {
                    return;
                }
            }
        }));
    }

    /// One extra fetch right now, concurrent with the periodic loop.
    pub fn refresh(&mut self) {
        self.extra.retain(|handle| !handle.is_finished());
        let api = Arc::clone(&self.api);
        let seq = self.seq.clone();
        let tx = self.tx.clone();
        self.extra.push(tokio::spawn(async move {
            poll_once(api.as_ref(), &seq, &tx).await;
        }));
    }

    /// Cancels the periodic loop and any in-flight refreshes.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("poller stopped");
        }
        for handle in self.extra.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fetches the list once and reports it. Returns `false` once the receiver is gone.
pub async fn poll_once(
    api: &dyn BulletinApi,
    seq: &SeqCounter,
    tx: &mpsc::UnboundedSender<AppEvent>,
) -> bool {
    let seq = seq.next();
    if tx.send(AppEvent::PollStarted { seq }).is_err() {
        return false;
    }
    let result = api.list_bulletins().await;
    match &result {
        Ok(list) => tracing::debug!(seq, count = list.len(), "poll finished"),
        Err(e) => tracing::warn!(seq, "poll failed: {e}"),
    }
    tx.send(AppEvent::PollResult { seq, result }).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ProductDownload, RerunReceipt};
    use crate::app::BulletinSummary;
    use crate::log::LogDocument;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[derive(Default)]
    struct CountingApi {
        lists: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl BulletinApi for CountingApi {
        async fn list_bulletins(&self) -> Result<Vec<BulletinSummary>, ApiError> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ApiError::Network("connection refused".to_string()))
            } else {
                Ok(Vec::new())
            }
        }

        async fn rerun(&self, _id: &str) -> Result<RerunReceipt, ApiError> {
            unreachable!("poller never reruns")
        }

        async fn fetch_full_log(&self, _id: &str) -> Result<LogDocument, ApiError> {
            unreachable!("poller never fetches logs")
        }

        async fn download_product(
            &self,
            _id: &str,
            _index: usize,
        ) -> Result<ProductDownload, ApiError> {
            unreachable!("poller never downloads")
        }
    }

    fn poller(api: Arc<CountingApi>) -> (Poller, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let poller = Poller::new(api, SeqCounter::default(), tx, Duration::from_secs(30));
        (poller, rx)
    }

    /// Next poll result, skipping the start markers.
    async fn next_result(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> AppEvent {
        loop {
            match rx.recv().await {
                Some(AppEvent::PollStarted { .. }) => {}
                Some(event) => return event,
                None => panic!("channel closed"),
            }
        }
    }

    async fn next_seq(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> u64 {
        match next_result(rx).await {
            AppEvent::PollResult { seq, .. } => seq,
            other => panic!("expected poll result, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_polls_immediately_then_every_interval() {
        let api = Arc::new(CountingApi::default());
        let (mut poller, mut rx) = poller(Arc::clone(&api));
        let t0 = Instant::now();
        poller.start();

        assert_eq!(next_seq(&mut rx).await, 1);
        assert_eq!(t0.elapsed(), Duration::ZERO);

        assert_eq!(next_seq(&mut rx).await, 2);
        assert_eq!(t0.elapsed(), Duration::from_secs(30));
        assert_eq!(api.lists.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_keeps_timer_phase() {
        let api = Arc::new(CountingApi::default());
        let (mut poller, mut rx) = poller(api);
        let t0 = Instant::now();
        poller.start();
        assert_eq!(next_seq(&mut rx).await, 1);

        time::advance(Duration::from_secs(10)).await;
        poller.refresh();
        assert_eq!(next_seq(&mut rx).await, 2);
        assert_eq!(t0.elapsed(), Duration::from_secs(10));

        assert_eq!(next_seq(&mut rx).await, 3);
        assert_eq!(t0.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_stop_the_loop() {
        let api = Arc::new(CountingApi {
            fail: true,
            ..CountingApi::default()
        });
        let (mut poller, mut rx) = poller(api);
        poller.start();
        for _ in 0..3 {
            match next_result(&mut rx).await {
                AppEvent::PollResult { result, .. } => assert!(result.is_err()),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_future_polls() {
        let api = Arc::new(CountingApi::default());
        let (mut poller, mut rx) = poller(Arc::clone(&api));
        poller.start();
        next_seq(&mut rx).await;
        poller.stop();
        assert!(!poller.is_running());

        let waited = time::timeout(Duration::from_secs(120), rx.recv()).await;
        assert!(waited.is_err());
        assert_eq!(api.lists.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_runs_one_loop() {
        let api = Arc::new(CountingApi::default());
        let (mut poller, mut rx) = poller(Arc::clone(&api));
        poller.start();
        poller.start();
        next_seq(&mut rx).await;
        let waited = time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(waited.is_err());
        assert_eq!(api.lists.load(Ordering::SeqCst), 1);
    }
}
