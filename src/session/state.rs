//! Connection state machine
//!
//! Tracks media-path connectivity as observed through the engine's ICE
//! callbacks plus the explicit local hangup. The machine is a pure state
//! container: it enforces the legal transition table and nothing else.
//! Failed and Closed are terminal; Disconnected is treated as effectively
//! terminal for the UI (no recovery back to Connected is followed).

use tracing::debug;

/// Media session connectivity state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial state, negotiation not yet begun
    New,
    /// Negotiation begun, connectivity checks running
    Checking,
    /// A usable media path was established
    Connected,
    /// Connectivity checks finished on a final candidate pair
    Completed,
    /// The media path was lost; the session collapses to exit
    Disconnected,
    /// Negotiation or connectivity failed; terminal
    Failed,
    /// Torn down by local hangup or engine shutdown; terminal
    Closed,
}

impl ConnectionState {
    /// Whether no further transitions may originate here
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }

    /// Whether entering this state collapses the session (timers stopped,
    /// call view auto-dismissed)
    pub fn collapses_session(&self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Disconnected)
    }

    /// Stable lowercase name for logging and state labels
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::New => "new",
            ConnectionState::Checking => "checking",
            ConnectionState::Connected => "connected",
            ConnectionState::Completed => "completed",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        }
    }
}

/// Pure state container enforcing the legal transition table
#[derive(Debug)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
}

impl ConnectionStateMachine {
    /// Create a machine in the initial state
    pub fn new() -> Self {
        Self {
            state: ConnectionState::New,
        }
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether `next` is a legal transition from the current state
    pub fn can_transition(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        if self.state == next {
            return false;
        }

        // Local hangup closes from anywhere that is not already terminal
        if next == Closed {
            return !self.state.is_terminal();
        }

        match self.state {
            New => matches!(next, Checking),
            Checking => matches!(next, Connected | Completed | Failed),
            Connected => matches!(next, Completed | Disconnected),
            Completed => matches!(next, Disconnected),
            // Recovery back to Connected is an observable raw ICE event,
            // but this layer never follows it
            Disconnected => matches!(next, Failed),
            Failed | Closed => false,
        }
    }

    /// Apply a transition.
    ///
    /// Illegal transitions are rejected and logged; the current state is
    /// kept. Returns whether the transition was applied.
    pub fn transition(&mut self, next: ConnectionState) -> bool {
        if !self.can_transition(next) {
            debug!(
                "Rejecting connection state transition {} -> {}",
                self.state.as_str(),
                next.as_str()
            );
            return false;
        }

        debug!(
            "Connection state transition {} -> {}",
            self.state.as_str(),
            next.as_str()
        );
        self.state = next;
        true
    }
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
