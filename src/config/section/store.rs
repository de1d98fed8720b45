//! `[store]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [store]
//! root = ".vitae"               # filesystem store, relative to the project root
//! signed_url_ttl_secs = 3600    # lifetime of links from `vitae link`
//! signing_key = "change me"     # key for signed links
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Filesystem store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub signed_url_ttl_secs: u64,
    pub signing_key: String,
}

impl StoreConfig {
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".vitae"),
            signed_url_ttl_secs: 3600,
            signing_key: "vitae-local".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::test_parse_config;

    #[test]
    fn test_store_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.store.root, PathBuf::from(".vitae"));
        assert_eq!(config.store.signed_url_ttl_secs, 3600);
    }

    #[test]
    fn test_store_config_override() {
        let config = test_parse_config("[store]\nroot = \"/srv/vitae\"\nsigning_key = \"k\"");
        assert_eq!(config.store.root, PathBuf::from("/srv/vitae"));
        assert_eq!(config.store.signing_key, "k");
    }
}
