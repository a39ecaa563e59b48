use serde::{Deserialize, Serialize};

use crate::arena::{ArenaStatus, SnapshotProvider};
use crate::error::WireError;
use crate::hub::Topic;

/// Outbound display message. Every variant is a full replacement for the
/// previous message of the same type, never a delta.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayMessage {
    Status(ArenaStatus),
    Reload,
}

#[derive(Serialize)]
struct OutboundEnvelope<'a> {
    #[serde(rename = "type")]
    message_type: Topic,
    payload: Option<&'a ArenaStatus>,
}

#[derive(Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    message_type: Topic,
    #[serde(default)]
    payload: Option<ArenaStatus>,
}

impl DisplayMessage {
    /// Build the message a notification on `topic` turns into, fetching a
    /// fresh snapshot when the topic carries one.
    pub fn for_topic(topic: Topic, provider: &dyn SnapshotProvider) -> Self {
        match topic {
            Topic::Status => DisplayMessage::Status(provider.current_state()),
            Topic::Reload => DisplayMessage::Reload,
        }
    }

    pub fn topic(&self) -> Topic {
        match self {
            DisplayMessage::Status(_) => Topic::Status,
            DisplayMessage::Reload => Topic::Reload,
        }
    }

    pub fn message_type(&self) -> &'static str {
        self.topic().as_str()
    }

    pub fn payload(&self) -> Option<&ArenaStatus> {
        match self {
            DisplayMessage::Status(status) => Some(status),
            DisplayMessage::Reload => None,
        }
    }

    /// Encode as `{"type": ..., "payload": ...}`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&OutboundEnvelope {
            message_type: self.topic(),
            payload: self.payload(),
        })
    }

    pub fn from_json(text: &str) -> Result<Self, WireError> {
        let envelope: InboundEnvelope = serde_json::from_str(text)?;
        match envelope.message_type {
            Topic::Status => envelope
                .payload
                .map(DisplayMessage::Status)
                .ok_or(WireError::MissingPayload(Topic::Status)),
            Topic::Reload => Ok(DisplayMessage::Reload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{AllianceStation, MatchState};

    struct Fixed(ArenaStatus);

    impl SnapshotProvider for Fixed {
        fn current_state(&self) -> ArenaStatus {
            self.0.clone()
        }
    }

    #[test]
    fn reload_has_null_payload() {
        let json: serde_json::Value =
            serde_json::from_str(&DisplayMessage::Reload.to_json().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "reload", "payload": null}));
    }

    #[test]
    fn status_carries_full_snapshot() {
        let mut status = ArenaStatus::default();
        status.match_state = MatchState::TeleopPeriod;
        let message = DisplayMessage::for_topic(Topic::Status, &Fixed(status.clone()));

        let json: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["payload"]["match_state"], "teleop_period");
        assert_eq!(json["payload"]["stations"].as_object().unwrap().len(), 6);
    }

    #[test]
    fn decode_recovers_status() {
        let mut status = ArenaStatus::default();
        status.station_mut(AllianceStation::R2).team = Some(148);
        let text = DisplayMessage::Status(status.clone()).to_json().unwrap();

        assert_eq!(
            DisplayMessage::from_json(&text).unwrap(),
            DisplayMessage::Status(status)
        );
    }

    #[test]
    fn decode_rejects_status_without_payload() {
        let err = DisplayMessage::from_json(r#"{"type":"status","payload":null}"#).unwrap_err();
        assert!(matches!(err, WireError::MissingPayload(Topic::Status)));
    }

    #[test]
    fn decode_rejects_unknown_type() {
        assert!(DisplayMessage::from_json(r#"{"type":"scores","payload":null}"#).is_err());
    }
}
