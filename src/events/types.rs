//! Integration event names and the versioned webhook envelope.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const EVENT_VERSION: &str = "1.0";
pub const EVENT_PRODUCER: &str = "fcfs-booking";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    ClaimConfirmed,
    ClaimCancelled,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::ClaimConfirmed => "claim.confirmed",
            EventName::ClaimCancelled => "claim.cancelled",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Envelope shared by every outgoing event. `id` is the globally unique
/// outbox event id; receivers deduplicate on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: String,
    pub version: String,
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub producer: String,
    pub data: ClaimEventData,
}

impl EventEnvelope {
    pub fn new(name: EventName, event_id: impl Into<String>, data: ClaimEventData) -> Self {
        Self {
            event: name.as_str().to_string(),
            version: EVENT_VERSION.to_string(),
            id: event_id.into(),
            occurred_at: Utc::now(),
            producer: EVENT_PRODUCER.to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimEventData {
    pub dw_project_id: Option<String>,
    pub job_post: JobPostRef,
    pub slot: SlotRef,
    pub claim: ClaimRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel: Option<CancelRef>,
    pub tenant_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPostRef {
    pub id: Uuid,
    pub work_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotRef {
    pub slot_id: Uuid,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRef {
    pub claim_id: Uuid,
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRef {
    pub cancel_reason: String,
    pub cancelled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data(cancel: Option<CancelRef>) -> ClaimEventData {
        ClaimEventData {
            dw_project_id: Some("DW-1042".to_string()),
            job_post: JobPostRef {
                id: Uuid::new_v4(),
                work_date: NaiveDate::from_ymd_opt(2024, 11, 5).unwrap(),
            },
            slot: SlotRef {
                slot_id: Uuid::new_v4(),
                status: "claimed".to_string(),
            },
            claim: ClaimRef {
                claim_id: Uuid::new_v4(),
                company_id: Uuid::new_v4(),
                user_id: None,
                claimed_at: Utc::now(),
            },
            cancel,
            tenant_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_event_name_as_str() {
        assert_eq!(EventName::ClaimConfirmed.as_str(), "claim.confirmed");
        assert_eq!(EventName::ClaimCancelled.as_str(), "claim.cancelled");
    }

    #[test]
    fn test_confirmed_envelope_shape() {
        let envelope = EventEnvelope::new(EventName::ClaimConfirmed, "evt-1", sample_data(None));
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["event"], "claim.confirmed");
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["id"], "evt-1");
        assert_eq!(json["producer"], "fcfs-booking");
        assert_eq!(json["data"]["job_post"]["work_date"], "2024-11-05");
        assert_eq!(json["data"]["slot"]["status"], "claimed");
        assert!(json["data"].get("cancel").is_none());
    }

    #[test]
    fn test_cancelled_envelope_carries_cancel_block() {
        let mut data = sample_data(Some(CancelRef {
            cancel_reason: "weather".to_string(),
            cancelled_at: Utc::now(),
        }));
        data.slot.status = "cancelled".to_string();

        let envelope = EventEnvelope::new(EventName::ClaimCancelled, "evt-2", data);
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["event"], "claim.cancelled");
        assert_eq!(json["data"]["slot"]["status"], "cancelled");
        assert_eq!(json["data"]["cancel"]["cancel_reason"], "weather");
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = EventEnvelope::new(EventName::ClaimConfirmed, "evt-3", sample_data(None));
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "evt-3");
        assert_eq!(parsed.event, "claim.confirmed");
    }
}
