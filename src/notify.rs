use crate::app::{BulletinStatus, BulletinSummary};

/// Whether a status change is worth a desktop notification.
pub fn is_notable(old: BulletinStatus, new: BulletinStatus) -> bool {
    old != new && (new.is_failure() || new.is_success())
}

#[cfg(feature = "desktop-notify")]
pub fn send_desktop(bulletin: &BulletinSummary) {
    use notify_rust::{Notification, Urgency};

    let (summary, icon, urgency) = match bulletin.status {
        BulletinStatus::Success | BulletinStatus::Ok => {
            ("Bulletin succeeded", "dialog-information", Urgency::Normal)
        }
        BulletinStatus::Critical => ("Bulletin critical", "dialog-error", Urgency::Critical),
        BulletinStatus::Failed | BulletinStatus::Error => {
            ("Bulletin failed", "dialog-error", Urgency::Critical)
        }
        _ => ("Bulletin changed", "dialog-information", Urgency::Normal),
    };

    let body = if bulletin.last_run.is_empty() {
        bulletin.name.clone()
    } else {
        format!("{} ({})", bulletin.name, bulletin.last_run)
    };

    if let Err(e) = Notification::new()
        .summary(summary)
        .body(&body)
        .icon(icon)
        .urgency(urgency)
        .show()
    {
        tracing::debug!("desktop notification failed: {e}");
    }
}

#[cfg(not(feature = "desktop-notify"))]
pub fn send_desktop(_bulletin: &BulletinSummary) {}
