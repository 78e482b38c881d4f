//! Notification sink.
//!
//! The coordinator and the post-submission runner report outcomes through
//! this trait; the UI shell decides how they are rendered (snackbar, toast).

use forms_types::{Notification, NotificationKind};

/// Where user-facing notifications go.
pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: Notification);
}

/// Sink that routes notifications through `tracing`, for headless hosts.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn show(&self, notification: Notification) {
        let subtitle = notification.subtitle.as_deref().unwrap_or_default();
        match notification.kind {
            NotificationKind::Success => {
                tracing::info!(title = %notification.title, %subtitle, "notification")
            }
            NotificationKind::Warning => {
                tracing::warn!(title = %notification.title, %subtitle, "notification")
            }
            NotificationKind::Error => {
                tracing::error!(title = %notification.title, %subtitle, "notification")
            }
        }
    }
}
