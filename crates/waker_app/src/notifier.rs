//! In-process notification center for the desktop build.
//!
//! Stands in for the platform notification service: each registration
//! spawns a tokio timer task that reports back over a channel when the
//! notification is due. Authorization is a settable cell so the desktop
//! app exercises the same grant/deny policy as a real platform adapter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use waker_core::notifications::{
    AuthorizationStatus, NotificationContent, NotificationService, NotifyError, TriggerSpec,
};

/// What the notifier reports back to the app shell.
#[derive(Debug, Clone)]
pub enum NotifierEvent {
    /// A registered notification reached its fire time and is about to show.
    WillPresent {
        id: String,
        content: NotificationContent,
    },
    /// The user picked an action on a presented notification.
    ActionInvoked { action_id: String },
}

pub struct TimerNotifier {
    authorization: Mutex<AuthorizationStatus>,
    pending: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    events_tx: mpsc::UnboundedSender<NotifierEvent>,
}

impl TimerNotifier {
    /// The notifier and the receiving end of its event stream.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<NotifierEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let notifier = Arc::new(Self {
            authorization: Mutex::new(AuthorizationStatus::Undetermined),
            pending: Arc::new(Mutex::new(HashMap::new())),
            events_tx,
        });
        (notifier, events_rx)
    }

    pub fn set_authorization(&self, status: AuthorizationStatus) {
        *self.authorization.lock() = status;
    }

    /// Called by the UI when the user presses an action button on a
    /// presented notification.
    pub fn invoke_action(&self, action_id: &str) {
        let _ = self.events_tx.send(NotifierEvent::ActionInvoked {
            action_id: action_id.to_string(),
        });
    }
}

#[async_trait]
impl NotificationService for TimerNotifier {
    async fn authorization_status(&self) -> AuthorizationStatus {
        *self.authorization.lock()
    }

    async fn request_authorization(&self) -> bool {
        // No permission prompt on desktop: the first request grants, a
        // previously denied state stays denied.
        let mut authorization = self.authorization.lock();
        if *authorization == AuthorizationStatus::Undetermined {
            *authorization = AuthorizationStatus::Authorized;
        }
        *authorization == AuthorizationStatus::Authorized
    }

    async fn register(
        &self,
        id: &str,
        trigger: TriggerSpec,
        content: NotificationContent,
    ) -> Result<(), NotifyError> {
        // Past-due triggers fire immediately.
        let delay = (trigger.fire_at - Local::now().naive_local())
            .to_std()
            .unwrap_or_default();
        info!(id, fire_at = %trigger.fire_at, "registering one-shot notification");

        let events_tx = self.events_tx.clone();
        let pending = Arc::clone(&self.pending);
        let task_id = id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pending.lock().remove(&task_id);
            let _ = events_tx.send(NotifierEvent::WillPresent {
                id: task_id,
                content,
            });
        });

        if let Some(previous) = self.pending.lock().insert(id.to_string(), handle) {
            previous.abort();
        }
        Ok(())
    }

    fn cancel(&self, ids: &[String]) {
        let mut pending = self.pending.lock();
        for id in ids {
            if let Some(handle) = pending.remove(id) {
                debug!(id = %id, "cancelling pending notification");
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test(start_paused = true)]
    async fn registered_notification_fires_after_its_delay() {
        let (notifier, mut events) = TimerNotifier::new();
        let fire_at = Local::now().naive_local() + Duration::minutes(2);
        notifier
            .register("a1", TriggerSpec::once_at(fire_at), NotificationContent::alarm())
            .await
            .expect("register");

        tokio::time::advance(std::time::Duration::from_secs(180)).await;

        match events.recv().await {
            Some(NotifierEvent::WillPresent { id, content }) => {
                assert_eq!(id, "a1");
                assert_eq!(content.title, "Alarm");
            }
            other => panic!("expected WillPresent, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_notification_never_fires() {
        let (notifier, mut events) = TimerNotifier::new();
        let fire_at = Local::now().naive_local() + Duration::minutes(2);
        notifier
            .register("a1", TriggerSpec::once_at(fire_at), NotificationContent::alarm())
            .await
            .expect("register");

        notifier.cancel(&["a1".to_string()]);
        tokio::time::advance(std::time::Duration::from_secs(600)).await;
        tokio::task::yield_now().await;

        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn first_authorization_request_grants() {
        let (notifier, _events) = TimerNotifier::new();
        assert_eq!(
            notifier.authorization_status().await,
            AuthorizationStatus::Undetermined
        );
        assert!(notifier.request_authorization().await);
        assert_eq!(
            notifier.authorization_status().await,
            AuthorizationStatus::Authorized
        );
    }

    #[tokio::test]
    async fn denied_authorization_stays_denied() {
        let (notifier, _events) = TimerNotifier::new();
        notifier.set_authorization(AuthorizationStatus::Denied);
        assert!(!notifier.request_authorization().await);
        assert_eq!(
            notifier.authorization_status().await,
            AuthorizationStatus::Denied
        );
    }

    #[tokio::test]
    async fn invoked_actions_reach_the_event_stream() {
        let (notifier, mut events) = TimerNotifier::new();
        notifier.invoke_action("snooze");
        match events.recv().await {
            Some(NotifierEvent::ActionInvoked { action_id }) => assert_eq!(action_id, "snooze"),
            other => panic!("expected ActionInvoked, got {other:?}"),
        }
    }
}
