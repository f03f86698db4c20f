//! Media engine adapter contract
//!
//! The native real-time media stack (audio capture, codecs, low-level
//! ICE/DTLS) lives outside this crate. The session core drives it through
//! the [`MediaEngine`] trait and reacts to the events it emits; codec,
//! transport, and encryption internals never cross this boundary.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

/// Raw ICE connectivity states as reported by the media engine.
///
/// These are the engine's own vocabulary. The session layer maps them into
/// its connection state machine, which is stricter: for example the engine
/// may report a Disconnected → Connected recovery, but the session does not
/// follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    /// No checks started yet
    New,
    /// Connectivity checks in progress
    Checking,
    /// A usable candidate pair was found
    Connected,
    /// Checks finished, final candidate pair selected
    Completed,
    /// Connectivity was lost
    Disconnected,
    /// All checks failed
    Failed,
    /// The engine was shut down
    Closed,
}

/// Events emitted by the media engine on its own execution context.
///
/// The session controller marshals these onto its single control task
/// before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEngineEvent {
    /// A locally gathered ICE candidate, ready to trickle to the remote peer
    IceCandidate(String),
    /// The engine's ICE connection state changed
    IceConnectionState(IceConnectionState),
}

impl MediaEngineEvent {
    /// Get the event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::IceCandidate(_) => "ice_candidate",
            Self::IceConnectionState(_) => "ice_connection_state",
        }
    }
}

/// Contract the native media stack must expose to the session core.
///
/// One engine instance belongs to exactly one call session and is torn down
/// (via [`MediaEngine::close`]) before the session is discarded.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Create a local SDP offer
    async fn create_offer(&self) -> Result<String>;

    /// Create a local SDP answer to the previously applied remote offer
    async fn create_answer(&self) -> Result<String>;

    /// Apply the local session description
    async fn set_local_description(&self, sdp: String) -> Result<()>;

    /// Apply the remote session description
    async fn set_remote_description(&self, sdp: String) -> Result<()>;

    /// Apply a remote ICE candidate. Callers guarantee the remote
    /// description has been set first.
    async fn add_ice_candidate(&self, candidate: String) -> Result<()>;

    /// Mute or unmute the local audio capture
    async fn set_muted(&self, muted: bool) -> Result<()>;

    /// Switch the audio route between earpiece and speaker
    async fn set_speaker(&self, speaker_on: bool) -> Result<()>;

    /// Tear down the engine and release all media resources
    async fn close(&self) -> Result<()>;

    /// Take the engine's event receiver.
    ///
    /// Returns `Some` exactly once; the session controller is the only
    /// consumer.
    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<MediaEngineEvent>>;
}
