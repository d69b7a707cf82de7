//! Per-control feedback state: `Idle → Pending → Success|Failed → Idle`.
//!
//! Terminal states carry a deadline instead of a timer task; the UI loop calls
//! [`ActionBoard::expire`] on every tick, so dropping the board cancels every
//! outstanding reset.

use crate::app::{COPY_FEEDBACK_MS, DOWNLOAD_FEEDBACK_MS, RERUN_FEEDBACK_MS};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Rerun,
    Download(usize),
    CopyCommand,
}

impl ActionKind {
    pub fn feedback_duration(self) -> Duration {
        Duration::from_millis(match self {
            ActionKind::Rerun => RERUN_FEEDBACK_MS,
            ActionKind::Download(_) => DOWNLOAD_FEEDBACK_MS,
            ActionKind::CopyCommand => COPY_FEEDBACK_MS,
        })
    }

    /// Whether reverting to idle should trigger a fresh poll.
    pub fn resyncs(self) -> bool {
        matches!(self, ActionKind::Rerun | ActionKind::Download(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlId {
    pub bulletin_id: String,
    pub kind: ActionKind,
}

impl ControlId {
    pub fn new(bulletin_id: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            bulletin_id: bulletin_id.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Idle,
    Pending,
    Success { until: Instant },
    Failed { until: Instant },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Done(String),
    Failed(String),
}

#[derive(Debug, Default)]
pub struct ActionBoard {
    states: HashMap<ControlId, ActionState>,
}

impl ActionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, id: &ControlId) -> ActionState {
        self.states.get(id).copied().unwrap_or(ActionState::Idle)
    }

    pub fn is_idle(&self, id: &ControlId) -> bool {
        self.state(id) == ActionState::Idle
    }

    pub fn any_pending(&self) -> bool {
        self.states.values().any(|s| *s == ActionState::Pending)
    }

    /// Idle → Pending. Returns `false` (and changes nothing) for any other state.
    pub fn begin(&mut self, id: &ControlId) -> bool {
        if !self.is_idle(id) {
            return false;
        }
        self.states.insert(id.clone(), ActionState::Pending);
        true
    }

    /// Pending → Success/Failed with a reset deadline. Ignored unless Pending.
    pub fn finish(&mut self, id: &ControlId, ok: bool, now: Instant) -> bool {
        let Some(state) = self.states.get_mut(id) else {
            return false;
        };
        if *state != ActionState::Pending {
            return false;
        }
        let until = now + id.kind.feedback_duration();
        *state = if ok {
            ActionState::Success { until }
        } else {
            ActionState::Failed { until }
        };
        true
    }

    /// Reverts every terminal state whose deadline has passed; returns those controls.
    pub fn expire(&mut self, now: Instant) -> Vec<ControlId> {
        let expired: Vec<ControlId> = self
            .states
            .iter()
            .filter(|(_, state)| match state {
                ActionState::Success { until } | ActionState::Failed { until } => now >= *until,
                ActionState::Idle | ActionState::Pending => false,
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.states.remove(id);
        }
        expired
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn label(&self, id: &ControlId) -> &'static str {
        match (id.kind, self.state(id)) {
            (ActionKind::Rerun, ActionState::Idle) => "Re-run",
            (ActionKind::Rerun, ActionState::Pending) => "Re-running…",
            (ActionKind::Rerun, ActionState::Success { .. }) => "Re-run sent",
            (ActionKind::Download(_), ActionState::Idle) => "Download",
            (ActionKind::Download(_), ActionState::Pending) => "Downloading…",
            (ActionKind::Download(_), ActionState::Success { .. }) => "Saved",
            (ActionKind::CopyCommand, ActionState::Idle) => "Copy command",
            (ActionKind::CopyCommand, ActionState::Pending) => "Copying…",
            (ActionKind::CopyCommand, ActionState::Success { .. }) => "Copied!",
            (_, ActionState::Failed { .. }) => "Failed",
        }
    }
}
