use async_trait::async_trait;
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Category every alarm notification is registered under; the platform
/// adapter attaches the snooze action to it.
pub const ALARM_CATEGORY_ID: &str = "AlarmNotification";
/// Action id for the snooze button on a presented alarm.
pub const SNOOZE_ACTION_ID: &str = "snooze";

pub const ALARM_TITLE: &str = "Alarm";
pub const ALARM_BODY: &str = "Beep! Beep!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Undetermined,
    Authorized,
    Denied,
    Provisional,
}

/// One-shot trigger. Seconds are dropped when it is built: alarms fire on
/// the minute, matching the calendar-component precision of platform
/// notification schedulers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerSpec {
    pub fire_at: NaiveDateTime,
}

impl TriggerSpec {
    pub fn once_at(when: NaiveDateTime) -> Self {
        let fire_at = when
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(when);
        Self { fire_at }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub default_sound: bool,
    pub category_id: String,
}

impl NotificationContent {
    /// The fixed content every alarm notification carries.
    pub fn alarm() -> Self {
        Self {
            title: ALARM_TITLE.to_string(),
            body: ALARM_BODY.to_string(),
            default_sound: true,
            category_id: ALARM_CATEGORY_ID.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The service refused the registration.
    #[error("notification registration rejected: {0}")]
    Rejected(String),

    /// The service could not be reached.
    #[error("notification service unavailable: {0}")]
    Unavailable(String),
}

/// Platform notification adapters implement this trait. Registration is
/// one-shot (no repeat); cancellation is fire-and-forget.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn authorization_status(&self) -> AuthorizationStatus;

    /// Prompt for permission; the returned flag is the user's answer.
    async fn request_authorization(&self) -> bool;

    async fn register(
        &self,
        id: &str,
        trigger: TriggerSpec,
        content: NotificationContent,
    ) -> Result<(), NotifyError>;

    /// Drop any pending registrations for the given ids.
    fn cancel(&self, ids: &[String]);
}
