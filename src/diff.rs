use crate::app::{AppState, BulletinStatus, BulletinSummary};
use crate::notify;

/// Maximum number of polls a bulletin can be absent before being evicted from the snapshot.
const SNAPSHOT_EVICTION_POLLS: u64 = 10;

/// Pushes a footer notification for every status change since the previous
/// applied poll. Returns the bulletins whose change deserves a desktop alert.
pub fn detect_changes(state: &mut AppState, new_list: &[BulletinSummary]) -> Vec<BulletinSummary> {
    state.poll_count += 1;
    let current_poll = state.poll_count;
    let mut notable = Vec::new();

    for bulletin in new_list {
        if let Some(&(old_status, _)) = state.previous_snapshot.get(&bulletin.id) {
            if old_status != bulletin.status {
                let status = bulletin.status;
                let msg = if status == BulletinStatus::Critical {
                    format!("{} is critical", bulletin.name)
                } else if status.is_success() {
                    format!("{} succeeded", bulletin.name)
                } else if status.is_failure() {
                    format!("{} failed", bulletin.name)
                } else if status.is_warning() {
                    format!("{} finished with warnings", bulletin.name)
                } else {
                    format!("{} is now {}", bulletin.name, status.label())
                };
                state.add_notification(Some(bulletin.id.clone()), msg);
                if notify::is_notable(old_status, bulletin.status) {
                    notable.push(bulletin.clone());
                }
            }
        }
    }

    for bulletin in new_list {
        state
            .previous_snapshot
            .insert(bulletin.id.clone(), (bulletin.status, current_poll));
    }

    state.previous_snapshot.retain(|_, (_, last_seen)| {
        current_poll.saturating_sub(*last_seen) <= SNAPSHOT_EVICTION_POLLS
    });

    notable
}
