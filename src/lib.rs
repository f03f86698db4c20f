//! Room-scoped call session orchestration
//!
//! This crate is the engineering core of an in-app calling feature: it
//! establishes a signaling connection scoped to a chat room, negotiates a
//! two-party media session (offer/answer/ICE exchange), tracks room
//! membership and connection health as an explicit state machine, and
//! exposes mute/speaker/ring controls with client-side rate limiting.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  Presentation layer                                  │
//! │  ↓ commands            ↑ snapshots + events          │
//! │  SessionController (single control task)             │
//! │  ├─ SignalingChannel (room-scoped duplex, in order)  │
//! │  ├─ ConnectionStateMachine (ICE health, terminal     │
//! │  │   Failed/Closed)                                  │
//! │  ├─ ParticipantRoster (Join/Leave presence)          │
//! │  ├─ BeckonLimiter (client-side ring cooldown)        │
//! │  └─ MediaEngine (adapter contract, external stack)   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The media engine itself (capture, codecs, low-level ICE/DTLS) is an
//! external collaborator behind the [`MediaEngine`] trait. Failures on the
//! signaling or media path are never surfaced as error values to the
//! presentation layer; they collapse into the connection state reaching
//! `Failed` or `Disconnected`, followed by a fixed 1-second auto-dismiss.
//!
//! # Example
//!
//! ```ignore
//! use roomcall::{CallConfig, LocalIdentity, SessionController};
//!
//! let controller = SessionController::join(
//!     CallConfig::default(),
//!     LocalIdentity::new("user-42"),
//!     "room-7",
//!     engine,
//!     ring,
//!     None,
//! )
//! .await?;
//!
//! // The Connect button dispatches to offer() or answer() depending on
//! // whether a remote offer has been observed.
//! controller.connect();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod identity;
pub mod media;
pub mod session;
pub mod signaling;

pub use config::CallConfig;
pub use error::{Error, Result};
pub use identity::{DisplayNameResolver, LocalIdentity, RingDispatcher};
pub use media::{IceConnectionState, MediaEngine, MediaEngineEvent};
pub use session::{
    BeckonLimiter, CallSnapshot, ConnectionState, ConnectionStateMachine, DismissReason,
    ParticipantRoster, SessionController, SessionEvent,
};
pub use signaling::{SignalPayload, SignalingChannel, SignalingMessage};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
