//! Signaling wire messages
//!
//! Messages are serialized as JSON text frames. Ordering within a room is
//! preserved end to end; the negotiation protocol relies on it (an Answer
//! is meaningless before the matching Offer has been observed).

use serde::{Deserialize, Serialize};

use crate::Result;

/// Payload of a signaling message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalPayload {
    /// Sender entered the room's signaling channel
    Join,
    /// Sender left the room's signaling channel
    Leave,
    /// SDP offer from the negotiation initiator
    Offer {
        /// SDP offer string
        sdp: String,
    },
    /// SDP answer from the accepting side
    Answer {
        /// SDP answer string
        sdp: String,
    },
    /// Trickled ICE candidate
    IceCandidate {
        /// ICE candidate string
        candidate: String,
    },
}

/// A signaling message scoped to one room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingMessage {
    /// Room the message belongs to
    pub room_id: String,

    /// Participant that sent the message
    pub sender_id: String,

    /// Message payload
    #[serde(flatten)]
    pub payload: SignalPayload,
}

impl SignalingMessage {
    /// Create a join presence message
    pub fn join(room_id: impl Into<String>, sender_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            sender_id: sender_id.into(),
            payload: SignalPayload::Join,
        }
    }

    /// Create a leave presence message
    pub fn leave(room_id: impl Into<String>, sender_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            sender_id: sender_id.into(),
            payload: SignalPayload::Leave,
        }
    }

    /// Create an offer message
    pub fn offer(
        room_id: impl Into<String>,
        sender_id: impl Into<String>,
        sdp: impl Into<String>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            sender_id: sender_id.into(),
            payload: SignalPayload::Offer { sdp: sdp.into() },
        }
    }

    /// Create an answer message
    pub fn answer(
        room_id: impl Into<String>,
        sender_id: impl Into<String>,
        sdp: impl Into<String>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            sender_id: sender_id.into(),
            payload: SignalPayload::Answer { sdp: sdp.into() },
        }
    }

    /// Create a trickled ICE candidate message
    pub fn ice_candidate(
        room_id: impl Into<String>,
        sender_id: impl Into<String>,
        candidate: impl Into<String>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            sender_id: sender_id.into(),
            payload: SignalPayload::IceCandidate {
                candidate: candidate.into(),
            },
        }
    }

    /// Get the message kind for logging
    pub fn kind(&self) -> &'static str {
        match self.payload {
            SignalPayload::Join => "join",
            SignalPayload::Leave => "leave",
            SignalPayload::Offer { .. } => "offer",
            SignalPayload::Answer { .. } => "answer",
            SignalPayload::IceCandidate { .. } => "ice_candidate",
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from a JSON text frame
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kinds() {
        assert_eq!(SignalingMessage::join("room", "a").kind(), "join");
        assert_eq!(SignalingMessage::leave("room", "a").kind(), "leave");
        assert_eq!(SignalingMessage::offer("room", "a", "v=0").kind(), "offer");
        assert_eq!(SignalingMessage::answer("room", "a", "v=0").kind(), "answer");
        assert_eq!(
            SignalingMessage::ice_candidate("room", "a", "candidate:1").kind(),
            "ice_candidate"
        );
    }

    #[test]
    fn test_json_round_trip() {
        let msg = SignalingMessage::offer("room-7", "alice", "v=0\r\ns=-\r\n");
        let json = msg.to_json().unwrap();
        let parsed = SignalingMessage::from_json(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_wire_format_is_tagged() {
        let json = SignalingMessage::join("room-7", "alice").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "join");
        assert_eq!(value["room_id"], "room-7");
        assert_eq!(value["sender_id"], "alice");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SignalingMessage::from_json("not json").is_err());
        assert!(SignalingMessage::from_json(r#"{"type":"warp"}"#).is_err());
    }
}
