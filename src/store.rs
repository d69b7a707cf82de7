//! Latest bulletin snapshot plus the "last updated" marker.
//!
//! Every fetch draws a sequence number when it starts. A completed fetch is
//! applied only if its number is newer than the last applied one, so a slow
//! manual refresh can no longer overwrite a faster, later periodic poll.

use crate::app::BulletinSummary;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastUpdated {
    pub time: DateTime<Local>,
    pub is_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    Stale,
}

/// Hands out fetch sequence numbers; shared with the poller's tasks.
#[derive(Debug, Clone, Default)]
pub struct SeqCounter(Arc<AtomicU64>);

impl SeqCounter {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Debug, Default)]
pub struct BulletinStore {
    snapshot: Arc<Vec<BulletinSummary>>,
    loaded: bool,
    applied_seq: u64,
    last_updated: Option<LastUpdated>,
    last_error: Option<String>,
    seq: SeqCounter,
}

impl BulletinStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seq_counter(&self) -> SeqCounter {
        self.seq.clone()
    }

    pub fn next_seq(&self) -> u64 {
        self.seq.next()
    }

    /// Replaces the snapshot in one step. Duplicate ids keep their first occurrence.
    pub fn reconcile(
        &mut self,
        seq: u64,
        list: Vec<BulletinSummary>,
        at: DateTime<Local>,
    ) -> ReconcileOutcome {
        if seq <= self.applied_seq {
            tracing::warn!(seq, applied = self.applied_seq, "dropping stale bulletin list");
            return ReconcileOutcome::Stale;
        }
        let mut seen = HashSet::new();
        let mut deduped = Vec::with_capacity(list.len());
        for bulletin in list {
            if seen.insert(bulletin.id.clone()) {
                deduped.push(bulletin);
            } else {
                tracing::warn!(id = %bulletin.id, "duplicate bulletin id in payload");
            }
        }
        tracing::info!(seq, count = deduped.len(), "bulletin snapshot applied");
        self.snapshot = Arc::new(deduped);
        self.loaded = true;
        self.applied_seq = seq;
        self.last_updated = Some(LastUpdated {
            time: at,
            is_error: false,
        });
        self.last_error = None;
        ReconcileOutcome::Applied
    }

    /// Marks the list as unknown. The previous snapshot is kept but no longer shown.
    pub fn record_failure(
        &mut self,
        seq: u64,
        message: String,
        at: DateTime<Local>,
    ) -> ReconcileOutcome {
        if seq <= self.applied_seq {
            tracing::warn!(seq, applied = self.applied_seq, "dropping stale poll failure");
            return ReconcileOutcome::Stale;
        }
        self.applied_seq = seq;
        self.last_updated = Some(LastUpdated {
            time: at,
            is_error: true,
        });
        self.last_error = Some(message);
        ReconcileOutcome::Applied
    }

    pub fn current(&self) -> Arc<Vec<BulletinSummary>> {
        Arc::clone(&self.snapshot)
    }

    pub fn get(&self, id: &str) -> Option<&BulletinSummary> {
        self.snapshot.iter().find(|b| b.id == id)
    }

    /// `true` once any fetch has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn last_updated(&self) -> Option<LastUpdated> {
        self.last_updated
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
