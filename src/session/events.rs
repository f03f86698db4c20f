//! Observable session state and events
//!
//! The presentation layer observes the session through two channels scoped
//! to the session's lifetime: a watch holding the latest [`CallSnapshot`],
//! and a stream of discrete [`SessionEvent`]s. Both die with the session;
//! there is no global notification bus.

use super::state::ConnectionState;

/// Snapshot of everything the presentation layer may read.
///
/// Read-only to all consumers; only the session controller produces new
/// snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSnapshot {
    /// Room the session is scoped to
    pub room_id: String,

    /// Local participant id
    pub local_participant_id: String,

    /// Participants present in the signaling channel, in join order
    pub roster: Vec<String>,

    /// Media-path connectivity state
    pub connection_state: ConnectionState,

    /// Whether a local session description has been created and applied
    pub has_local_sdp: bool,

    /// Whether a remote session description has been received
    pub has_remote_sdp: bool,

    /// Local microphone mute flag (requested intent)
    pub muted: bool,

    /// Speaker audio route flag (requested intent)
    pub speaker_on: bool,

    /// Whether the signaling channel is delivering events
    pub signaling_connected: bool,

    /// Seconds the media path has been up; frozen when the session
    /// collapses
    pub connected_secs: u64,

    /// Remaining beckon cooldown in whole seconds
    pub beckon_cooldown_remaining: u64,
}

impl CallSnapshot {
    /// Snapshot for a freshly created session
    pub(crate) fn initial(room_id: &str, local_id: &str, signaling_connected: bool) -> Self {
        Self {
            room_id: room_id.to_string(),
            local_participant_id: local_id.to_string(),
            roster: vec![local_id.to_string()],
            connection_state: ConnectionState::New,
            has_local_sdp: false,
            has_remote_sdp: false,
            muted: false,
            speaker_on: false,
            signaling_connected,
            connected_secs: 0,
            beckon_cooldown_remaining: 0,
        }
    }

    /// Whether the Connect action is currently available.
    ///
    /// Disabled while alone in the room, while signaling is down, or once
    /// the media path has left its pre-negotiation states.
    pub fn can_connect(&self) -> bool {
        self.roster.len() > 1
            && self.signaling_connected
            && !self.has_local_sdp
            && !self.connection_state.is_terminal()
    }
}

/// Why the call view is being dismissed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    /// Local user hung up
    HungUp,
    /// The media path failed
    MediaFailed,
    /// The media path disconnected and no recovery is attempted
    MediaDisconnected,
}

/// Discrete events emitted to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The connection state machine applied a transition
    StateChanged(ConnectionState),

    /// Room membership changed; carries the roster in join order
    RosterChanged(Vec<String>),

    /// The call view should close. Emitted at most once per session,
    /// after the 1-second collapse delay or immediately on hangup.
    Dismissed(DismissReason),
}

impl SessionEvent {
    /// Get the event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::StateChanged(_) => "state_changed",
            Self::RosterChanged(_) => "roster_changed",
            Self::Dismissed(_) => "dismissed",
        }
    }
}
