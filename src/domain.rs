//! Closed enums for the slot state machine and reference values.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Claimed,
    Cancelled,
    Completed,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Claimed => "claimed",
            SlotStatus::Cancelled => "cancelled",
            SlotStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(SlotStatus::Available),
            "claimed" => Some(SlotStatus::Claimed),
            "cancelled" => Some(SlotStatus::Cancelled),
            "completed" => Some(SlotStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    NoShow,
    Weather,
    ClientChange,
    MaterialDelay,
    Other,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::NoShow => "no_show",
            CancelReason::Weather => "weather",
            CancelReason::ClientChange => "client_change",
            CancelReason::MaterialDelay => "material_delay",
            CancelReason::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no_show" => Some(CancelReason::NoShow),
            "weather" => Some(CancelReason::Weather),
            "client_change" => Some(CancelReason::ClientChange),
            "material_delay" => Some(CancelReason::MaterialDelay),
            "other" => Some(CancelReason::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMode {
    Standalone,
    Dandori,
}

impl IntegrationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationMode::Standalone => "standalone",
            IntegrationMode::Dandori => "dandori",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standalone" => Some(IntegrationMode::Standalone),
            "dandori" => Some(IntegrationMode::Dandori),
            _ => None,
        }
    }
}

impl std::fmt::Display for IntegrationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Sent => "sent",
            OutboxStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OutboxStatus::Pending),
            "sent" => Some(OutboxStatus::Sent),
            "failed" => Some(OutboxStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_status_round_trip() {
        for status in [
            SlotStatus::Available,
            SlotStatus::Claimed,
            SlotStatus::Cancelled,
            SlotStatus::Completed,
        ] {
            assert_eq!(SlotStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SlotStatus::parse("open"), None);
    }

    #[test]
    fn test_cancel_reason_round_trip() {
        for reason in [
            CancelReason::NoShow,
            CancelReason::Weather,
            CancelReason::ClientChange,
            CancelReason::MaterialDelay,
            CancelReason::Other,
        ] {
            assert_eq!(CancelReason::parse(reason.as_str()), Some(reason));
        }
        assert_eq!(CancelReason::parse("rain"), None);
    }

    #[test]
    fn test_cancel_reason_serde() {
        let json = serde_json::to_string(&CancelReason::ClientChange).unwrap();
        assert_eq!(json, "\"client_change\"");
        let parsed: CancelReason = serde_json::from_str("\"no_show\"").unwrap();
        assert_eq!(parsed, CancelReason::NoShow);
    }

    #[test]
    fn test_integration_mode_parse() {
        assert_eq!(
            IntegrationMode::parse("dandori"),
            Some(IntegrationMode::Dandori)
        );
        assert_eq!(
            IntegrationMode::parse("standalone"),
            Some(IntegrationMode::Standalone)
        );
        assert_eq!(IntegrationMode::parse("hybrid"), None);
    }

    #[test]
    fn test_outbox_status_display() {
        assert_eq!(format!("{}", OutboxStatus::Pending), "pending");
        assert_eq!(format!("{}", OutboxStatus::Sent), "sent");
        assert_eq!(format!("{}", OutboxStatus::Failed), "failed");
    }
}
