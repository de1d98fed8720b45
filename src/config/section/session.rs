//! `[session]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [session]
//! settle_delay_ms = 300         # quiet period before a preview compile
//! autosave_interval_secs = 60   # quiet period before an autosave
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Editor session timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period after the last edit before the preview is recompiled.
    pub settle_delay_ms: u64,

    /// Quiet period after the last edit before a dirty buffer is autosaved.
    pub autosave_interval_secs: u64,
}

impl SessionConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: crate::scheduler::DEBOUNCE_MS,
            autosave_interval_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::test_parse_config;

    #[test]
    fn test_session_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.session.settle_delay(), Duration::from_millis(300));
        assert_eq!(config.session.autosave_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_session_config_partial_override() {
        let config = test_parse_config("[session]\nsettle_delay_ms = 150");
        assert_eq!(config.session.settle_delay_ms, 150);
        assert_eq!(config.session.autosave_interval_secs, 60);
    }
}
