//! Signaling protocol and channel for room-scoped call negotiation
//!
//! The channel relays presence (join/leave) and negotiation payloads
//! (SDP offers/answers, ICE candidates) between the participants of one
//! room, preserving send order.

pub mod channel;
pub mod protocol;

pub use channel::SignalingChannel;
pub use protocol::{SignalPayload, SignalingMessage};
