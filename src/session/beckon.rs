//! Client-side rate limiter for the "beckon" ring action
//!
//! Purely local: nothing here is persisted or synchronized with any
//! server-side limiter. The limiter lives and dies with its call session.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Cooldown gate for ringing the other participant
#[derive(Debug)]
pub struct BeckonLimiter {
    /// Cooldown window started by each successful fire
    cooldown: Duration,

    /// When the limiter last fired, if a cooldown is running
    fired_at: Option<Instant>,
}

impl BeckonLimiter {
    /// Create a limiter with the given cooldown window
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            fired_at: None,
        }
    }

    /// Attempt to fire the ring action.
    ///
    /// Returns `true` and starts the cooldown when allowed. While the
    /// cooldown is active this is a no-op with no side effects.
    pub fn fire(&mut self) -> bool {
        if self.is_cooling_down() {
            debug!(
                "Beckon suppressed, {}s of cooldown remaining",
                self.remaining_secs()
            );
            return false;
        }

        self.fired_at = Some(Instant::now());
        true
    }

    /// Whether a cooldown window is currently active
    pub fn is_cooling_down(&self) -> bool {
        match self.fired_at {
            Some(fired_at) => fired_at.elapsed() < self.cooldown,
            None => false,
        }
    }

    /// Remaining cooldown in whole seconds, rounded up.
    ///
    /// Monotonically decreases to 0 over the window; the UI renders it as
    /// the ring button's countdown.
    pub fn remaining_secs(&self) -> u64 {
        let Some(fired_at) = self.fired_at else {
            return 0;
        };

        let elapsed = fired_at.elapsed();
        if elapsed >= self.cooldown {
            return 0;
        }

        let remaining = self.cooldown - elapsed;
        // Round up so the countdown only shows 0 once firing is allowed
        remaining
            .as_secs()
            .saturating_add(u64::from(remaining.subsec_nanos() > 0))
    }

    /// Stop the limiter, clearing any running cooldown.
    ///
    /// Called when the session collapses; a fresh session starts from a
    /// clean limiter anyway.
    pub fn stop(&mut self) {
        self.fired_at = None;
    }
}
