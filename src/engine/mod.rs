//! Typesetting engine access.
//!
//! # Module Structure
//!
//! ```text
//! engine/
//! ├── gateway.rs    # CompilerGateway: lazy, memoized, shared engine handle
//! ├── typeset/      # Typst backend (World, fonts, diagnostics)
//! └── mod.rs        # Engine / Compiler traits, Artifact, errors
//! ```
//!
//! `Engine` is the synchronous backend contract. `Compiler` is what the
//! scheduler talks to: an async submit that hides engine startup.

mod gateway;
#[cfg(test)]
pub mod testing;
pub mod typeset;

pub use gateway::{CompilerGateway, EngineFactory, GatewayStatus};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// What a compile is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Vector preview only.
    Preview,
    /// Vector preview plus PDF, from the same engine run.
    Publish,
}

/// Output of one successful compile.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Merged vector output of every page, carrying a `viewBox`.
    pub svg: String,
    /// Present for `ExportKind::Publish`.
    pub pdf: Option<Vec<u8>>,
    /// Formatted warnings.
    pub warnings: Vec<String>,
}

/// The engine rejected the source.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CompileError {
    /// Headline (first error).
    pub message: String,
    /// Every error, formatted with its location.
    pub diagnostics: Vec<String>,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            diagnostics: Vec::new(),
        }
    }

    /// All diagnostics as one block, falling back to the headline.
    pub fn detail(&self) -> String {
        if self.diagnostics.is_empty() {
            self.message.clone()
        } else {
            self.diagnostics.join("\n")
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("engine is not ready")]
    NotReady,

    #[error("engine failed to initialize: {0}")]
    InitFailed(String),

    #[error("engine did not become ready within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl EngineError {
    /// The engine itself is missing, as opposed to rejecting one source.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, Self::Compile(_))
    }
}

/// A typesetting backend. Calls may block; callers run them off the runtime.
pub trait Engine: Send + Sync {
    fn compile(&self, source: &str, kind: ExportKind) -> Result<Artifact, CompileError>;
}

/// Async compile entry point used by the scheduler.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile `source`, bringing the engine up first if needed.
    async fn submit(&self, source: Arc<str>, kind: ExportKind) -> Result<Artifact, EngineError>;

    /// Clear a recorded initialization failure and try again.
    async fn retry(&self) -> Result<(), EngineError>;
}
