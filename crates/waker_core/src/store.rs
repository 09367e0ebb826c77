use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::notifications::{
    AuthorizationStatus, NotificationContent, NotificationService, TriggerSpec,
};
use crate::record::AlarmRecord;

/// Subscribers only ever learn "the slot changed" and re-read it, so a
/// lagged receiver coalesces harmlessly.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Single authority for the one alarm slot the process tracks.
///
/// The slot is a JSON file at an injected path: absent (missing,
/// unreadable, or undecodable) means no alarm is scheduled. Every write or
/// delete fires a payload-less change event. Scheduling itself is delegated
/// to the injected [`NotificationService`].
pub struct AlarmStore {
    slot_path: PathBuf,
    service: Arc<dyn NotificationService>,
    changed_tx: broadcast::Sender<()>,
}

impl AlarmStore {
    pub fn new(slot_path: impl Into<PathBuf>, service: Arc<dyn NotificationService>) -> Self {
        let (changed_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            slot_path: slot_path.into(),
            service,
            changed_tx,
        }
    }

    pub fn slot_path(&self) -> &Path {
        &self.slot_path
    }

    /// Change events for the slot, delivered after the write completes.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changed_tx.subscribe()
    }

    /// Resolve notification authorization: an undetermined status is
    /// settled by asking once, an authorized one is a yes, anything else
    /// is a no. No retries.
    pub async fn request_authorization(&self) -> bool {
        match self.service.authorization_status().await {
            AuthorizationStatus::Undetermined => self.service.request_authorization().await,
            AuthorizationStatus::Authorized => true,
            status => {
                debug!(?status, "notifications not authorized");
                false
            }
        }
    }

    /// Register `record` with the notification service and, on success,
    /// make it the current alarm. Returns false when authorization is
    /// refused or registration fails; the slot is untouched in both cases.
    pub async fn schedule(&self, record: &AlarmRecord) -> bool {
        if !self.request_authorization().await {
            return false;
        }

        let trigger = TriggerSpec::once_at(record.trigger_at);
        if let Err(err) = self
            .service
            .register(record.id(), trigger, NotificationContent::alarm())
            .await
        {
            warn!(%err, id = record.id(), "failed to register alarm notification");
            return false;
        }

        self.write_slot(Some(record));
        true
    }

    /// Cancel the pending registration for `record` and release the slot.
    ///
    /// The slot is cleared only when it is empty or holds the same id;
    /// unscheduling a stale record leaves an unrelated active alarm alone.
    pub fn unschedule(&self, record: &AlarmRecord) {
        self.service.cancel(&[record.id().to_string()]);
        match self.current_alarm() {
            Some(current) if current.id() != record.id() => {
                warn!(
                    requested = record.id(),
                    active = current.id(),
                    "unschedule id does not match the active alarm; slot kept"
                );
            }
            _ => self.write_slot(None),
        }
    }

    /// Unconditionally empty the slot. Wired to the moment a notification
    /// is about to present, after which the alarm is spent.
    pub fn clear(&self) {
        self.write_slot(None);
    }

    /// The currently scheduled alarm, if any. A missing, unreadable, or
    /// undecodable slot file all read as "no alarm".
    pub fn current_alarm(&self) -> Option<AlarmRecord> {
        let bytes = fs::read(&self.slot_path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(err) => {
                debug!(%err, path = %self.slot_path.display(), "slot file undecodable");
                None
            }
        }
    }

    // Persistence failures degrade to the absent slot on the next read;
    // they are logged but never surfaced.
    fn write_slot(&self, record: Option<&AlarmRecord>) {
        match record {
            Some(record) => {
                let bytes = match serde_json::to_vec(record) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        debug!(%err, "failed to encode alarm record");
                        return;
                    }
                };
                if let Err(err) = fs::write(&self.slot_path, bytes) {
                    debug!(%err, path = %self.slot_path.display(), "failed to write slot file");
                }
            }
            None => {
                if let Err(err) = fs::remove_file(&self.slot_path) {
                    debug!(%err, path = %self.slot_path.display(), "failed to remove slot file");
                }
            }
        }
        let _ = self.changed_tx.send(());
    }
}
