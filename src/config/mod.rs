//! Configuration management for `vitae.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── engine     # [engine]
//! │   ├── preview    # [preview]
//! │   ├── session    # [session]
//! │   ├── store      # [store]
//! │   └── user       # [user]
//! ├── types/         # ConfigError, ConfigDiagnostics
//! └── mod.rs         # VitaeConfig (this file)
//! ```
//!
//! A missing `vitae.toml` is not an error: every section has defaults and
//! the current directory becomes the project root.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{EngineConfig, PreviewConfig, SessionConfig, StoreConfig, UserConfig};
pub use types::{ConfigDiagnostics, ConfigError};

use crate::{cli::Cli, log};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing vitae.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitaeConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub preview: PreviewConfig,

    #[serde(default)]
    pub user: UserConfig,
}

impl VitaeConfig {
    /// Load configuration for the given CLI invocation.
    ///
    /// Searches upward from cwd for the config file. The project root is the
    /// config file's parent directory, or cwd when no file exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cwd, &cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = path;
                config
            }
            None => {
                crate::debug!("config"; "{} not found, using defaults", cli.config.display());
                Self {
                    config_path: cwd.join(&cli.config),
                    root: cwd,
                    ..Self::default()
                }
            }
        };

        config.apply_cli(cli);
        config.normalize_paths();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.user.id, cli.user.as_ref());
        Self::update_option(&mut self.user.email, cli.email.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve relative paths against the project root.
    fn normalize_paths(&mut self) {
        self.store.root = self.root_join(&self.store.root);
        self.preview.output = self.root_join(&self.preview.output);
        self.engine.font_dirs = self
            .engine
            .font_dirs
            .iter()
            .map(|dir| self.root.join(dir))
            .collect();
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration, collecting every problem before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        if self.session.settle_delay_ms == 0 {
            diag.error_with_hint(
                "session.settle_delay_ms",
                "must be greater than 0",
                "300 matches typing pauses well",
            );
        }
        if self.session.autosave_interval_secs == 0 {
            diag.error("session.autosave_interval_secs", "must be greater than 0");
        }
        if self.engine.init_timeout_ms == 0 {
            diag.error("engine.init_timeout_ms", "must be greater than 0");
        }
        if self.user.id.trim().is_empty() {
            diag.error_with_hint("user.id", "must not be empty", "pass --user <id>");
        }
        if self.store.signing_key.is_empty() {
            diag.error("store.signing_key", "must not be empty");
        }

        diag.into_result()
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config from a TOML snippet.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> VitaeConfig {
    let (parsed, ignored) = VitaeConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
