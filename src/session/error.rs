//! Session error taxonomy.

use thiserror::Error;

use crate::engine::EngineError;
use crate::store::{ProjectId, StoreError};

/// Fatal to the session; no retry is offered.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("project {0} not found")]
    NotFound(ProjectId),

    #[error("no access to project {0}")]
    AccessDenied(ProjectId),

    #[error("could not load project")]
    Store(#[source] StoreError),
}

/// Reported to the user; the buffer stays dirty unless noted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// The source was written; only the timestamp update failed.
    #[error("saved, but updating project metadata failed: {0}")]
    MetadataUpdateFailed(String),

    #[error("project is read-only")]
    ReadOnly,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
