//! Identity and collaborator contracts
//!
//! The local participant id is injected at session construction rather than
//! read from any process-wide session storage; everything downstream (roster
//! membership, offerer tie-breaks, ring dispatch) derives from it.

use async_trait::async_trait;

/// Identity of the local participant for one call session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    participant_id: String,
}

impl LocalIdentity {
    /// Create an identity from the signed-in user's participant id
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
        }
    }

    /// Get the participant id
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }
}

/// Maps participant ids to display names. Read-only; lookups have no side
/// effects on the call session.
#[async_trait]
pub trait DisplayNameResolver: Send + Sync {
    /// Resolve a display name, or `None` when the id is unknown
    async fn display_name(&self, participant_id: &str) -> Option<String>;
}

/// Dispatches a "ring" push notification to another participant.
///
/// Fire-and-forget: no delivery or acknowledgment is ever observed by the
/// call session.
#[async_trait]
pub trait RingDispatcher: Send + Sync {
    /// Ask the notification service to ring `target_id` on behalf of
    /// `sender_id`
    async fn ring(&self, sender_id: &str, target_id: &str);
}
