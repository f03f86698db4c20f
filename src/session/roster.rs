//! Room membership roster
//!
//! Tracks which participants are present in the room's signaling channel.
//! Updated strictly from Join/Leave presence messages: a participant can be
//! in the roster without being connected on the media path, and vice versa
//! during teardown.

use tracing::debug;

/// Ordered set of participant ids present in a room
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantRoster {
    participants: Vec<String>,
}

impl ParticipantRoster {
    /// Create an empty roster
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a participant joining.
    ///
    /// Join order is preserved; duplicate joins are ignored. Returns
    /// whether the roster changed.
    pub fn join(&mut self, participant_id: impl Into<String>) -> bool {
        let participant_id = participant_id.into();

        if self.participants.contains(&participant_id) {
            debug!("Ignoring duplicate join for {}", participant_id);
            return false;
        }

        debug!("Participant {} joined", participant_id);
        self.participants.push(participant_id);
        true
    }

    /// Record a participant leaving. Returns whether the roster changed.
    pub fn leave(&mut self, participant_id: &str) -> bool {
        if let Some(pos) = self.participants.iter().position(|p| p == participant_id) {
            debug!("Participant {} left", participant_id);
            self.participants.remove(pos);
            return true;
        }

        false
    }

    /// Whether a participant is present
    pub fn contains(&self, participant_id: &str) -> bool {
        self.participants.iter().any(|p| p == participant_id)
    }

    /// Number of participants present, local included
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the roster is empty
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participant ids in join order
    pub fn ids(&self) -> &[String] {
        &self.participants
    }

    /// The first participant other than `local_id`, i.e. the remote party
    /// of a two-party call
    pub fn remote_of(&self, local_id: &str) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.as_str() != local_id)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_preserves_order() {
        let mut roster = ParticipantRoster::new();
        assert!(roster.join("alice"));
        assert!(roster.join("bob"));
        assert!(roster.join("carol"));

        assert_eq!(roster.ids(), ["alice", "bob", "carol"]);
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn test_duplicate_join_ignored() {
        let mut roster = ParticipantRoster::new();
        assert!(roster.join("alice"));
        assert!(!roster.join("alice"));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_leave_removes_only_that_participant() {
        let mut roster = ParticipantRoster::new();
        roster.join("alice");
        roster.join("bob");

        assert!(roster.leave("alice"));
        assert!(!roster.leave("alice"));
        assert_eq!(roster.ids(), ["bob"]);
    }

    #[test]
    fn test_remote_of_skips_local() {
        let mut roster = ParticipantRoster::new();
        roster.join("alice");
        assert_eq!(roster.remote_of("alice"), None);

        roster.join("bob");
        assert_eq!(roster.remote_of("alice"), Some("bob"));
        assert_eq!(roster.remote_of("bob"), Some("alice"));
    }
}
