//! `[engine]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [engine]
//! init_timeout_ms = 5000      # how long callers wait for the engine to come up
//! font_dirs = ["fonts"]       # extra font directories, relative to the project root
//! ```
//!
//! The fonts bundled with typst are always loaded.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Typst engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on waiting for engine readiness.
    pub init_timeout_ms: u64,

    /// Additional font directories (searched recursively).
    pub font_dirs: Vec<PathBuf>,
}

impl EngineConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            init_timeout_ms: 5000,
            font_dirs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::test_parse_config;

    #[test]
    fn test_engine_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.engine.init_timeout_ms, 5000);
        assert!(config.engine.font_dirs.is_empty());
    }

    #[test]
    fn test_engine_font_dirs() {
        let config = test_parse_config("[engine]\nfont_dirs = [\"fonts\", \"/usr/share/fonts\"]");
        assert_eq!(
            config.engine.font_dirs,
            vec![PathBuf::from("fonts"), PathBuf::from("/usr/share/fonts")]
        );
    }
}
