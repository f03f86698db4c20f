//! Configuration types for call sessions

use serde::{Deserialize, Serialize};

/// Main configuration for a call session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConfig {
    /// WebSocket signaling relay URL (ws:// or wss://)
    pub signaling_url: String,

    /// Beckon ("ring the other participant") cooldown in seconds
    /// (default: 10)
    pub beckon_cooldown_secs: u64,

    /// Delay before the call view auto-dismisses after the media path
    /// reaches Failed or Disconnected, in milliseconds (default: 1000)
    pub dismiss_delay_ms: u64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://localhost:8080".to_string(),
            beckon_cooldown_secs: 10,
            dismiss_delay_ms: 1000,
        }
    }
}

impl CallConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `signaling_url` is not a WebSocket URL
    /// - `beckon_cooldown_secs` is zero or longer than 300 seconds
    /// - `dismiss_delay_ms` is not in range 100-10000
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if !self.signaling_url.starts_with("ws://") && !self.signaling_url.starts_with("wss://") {
            return Err(Error::InvalidConfig(format!(
                "signaling_url must start with ws:// or wss://, got {}",
                self.signaling_url
            )));
        }

        if self.beckon_cooldown_secs == 0 || self.beckon_cooldown_secs > 300 {
            return Err(Error::InvalidConfig(format!(
                "beckon_cooldown_secs must be in range 1-300, got {}",
                self.beckon_cooldown_secs
            )));
        }

        if self.dismiss_delay_ms < 100 || self.dismiss_delay_ms > 10_000 {
            return Err(Error::InvalidConfig(format!(
                "dismiss_delay_ms must be in range 100-10000, got {}",
                self.dismiss_delay_ms
            )));
        }

        Ok(())
    }
}
