//! `[preview]` section configuration.
//!
//! ```toml
//! [preview]
//! output = "preview"   # page-1.svg, page-2.svg, ... land here
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Preview output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub output: PathBuf,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("preview"),
        }
    }
}
