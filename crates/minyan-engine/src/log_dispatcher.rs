//! Notification dispatcher that writes notifications to the log.
//!
//! Stands in for a push transport when the engine runs headless.

use async_trait::async_trait;
use tracing::info;

use minyan_core::{LocalNotification, NotificationDispatcher, ServiceError};

/// Logs every notification at `info` and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send_local(&self, notification: LocalNotification) -> Result<(), ServiceError> {
        let event_id = notification.data.get("eventId").map_or("-", String::as_str);
        info!(
            title = %notification.title,
            body = %notification.body,
            event_id = %event_id,
            "local notification"
        );
        Ok(())
    }
}
