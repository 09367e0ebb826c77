use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delay applied when the user snoozes a presented alarm.
pub const SNOOZE_MINUTES: i64 = 9;

/// One alarm request: an opaque identifier plus the wall-clock time it
/// should fire at. The id doubles as the notification-service request
/// identifier so the registration can later be cancelled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlarmRecord {
    id: String,
    pub trigger_at: NaiveDateTime,
}

impl AlarmRecord {
    /// Build a record, generating a fresh unique id when none is supplied.
    pub fn new(id: Option<String>, trigger_at: NaiveDateTime) -> Self {
        Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            trigger_at,
        }
    }

    /// Fresh record firing [`SNOOZE_MINUTES`] after `now`.
    pub fn snooze_from(now: NaiveDateTime) -> Self {
        Self::new(None, now + Duration::minutes(SNOOZE_MINUTES))
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 23)
            .unwrap()
            .and_hms_opt(7, 30, 45)
            .unwrap()
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = AlarmRecord::new(None, sample_time());
        let b = AlarmRecord::new(None, sample_time());
        assert!(!a.id().is_empty());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn supplied_id_is_kept() {
        let record = AlarmRecord::new(Some("a1".into()), sample_time());
        assert_eq!(record.id(), "a1");
    }

    #[test]
    fn json_round_trip_preserves_both_fields() {
        let record = AlarmRecord::new(Some("a1".into()), sample_time());
        let encoded = serde_json::to_string(&record).expect("encode");
        let decoded: AlarmRecord = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, record);
        assert_eq!(decoded.id(), "a1");
        assert_eq!(decoded.trigger_at, sample_time());
    }

    #[test]
    fn snooze_fires_nine_minutes_out_with_a_fresh_id() {
        let now = sample_time();
        let record = AlarmRecord::snooze_from(now);
        assert_eq!(record.trigger_at - now, Duration::minutes(9));
        assert!(!record.id().is_empty());
    }

    #[test]
    fn past_trigger_times_are_accepted() {
        let record = AlarmRecord::new(None, NaiveDateTime::MIN);
        assert_eq!(record.trigger_at, NaiveDateTime::MIN);
    }
}
