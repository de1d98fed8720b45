//! `[user]` section configuration.
//!
//! The CLI has no sign-in flow; it acts as the user named here.
//! `--user` and `--email` override both fields.
//!
//! ```toml
//! [user]
//! id = "alice"
//! email = "alice@example.com"
//! ```

use serde::{Deserialize, Serialize};

/// Identity the CLI acts as.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub id: String,
    pub email: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: "local".to_string(),
            email: "local@localhost".to_string(),
        }
    }
}
