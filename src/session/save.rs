//! The save pipeline, run as a task off the session loop.
//!
//! ```text
//! fresh Publish compile ─► remote version check ─► write source
//!                                   │                   │
//!                                   ▼                   ▼
//!                               Conflict       write PDF + thumbnail (best effort)
//!                                                       │
//!                                                       ▼
//!                                               touch updated_at (best effort)
//! ```
//!
//! A failed compile never blocks the save; it only skips the artifacts.

use chrono::Utc;

use super::conflict::{self, Conflict, VersionMarker};
use super::error::SaveError;
use super::messages::SaveReport;
use crate::engine::{Artifact, ExportKind};
use crate::layout::paginate;
use crate::log;
use crate::scheduler::{SchedulerHandle, Snapshot};
use crate::store::{Backend, Project, ProjectId, ProjectUpdate, SaveOptions};

/// Storage keys of one project.
#[derive(Debug, Clone)]
pub struct SaveTarget {
    pub id: ProjectId,
    pub typ_path: String,
    pub pdf_path: String,
    pub thumbnail_path: Option<String>,
}

impl SaveTarget {
    pub fn of(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            typ_path: project.typ_path.clone(),
            pdf_path: project.pdf_path(),
            thumbnail_path: project.thumbnail_path.clone(),
        }
    }
}

#[derive(Debug)]
pub enum SaveResult {
    Saved(SaveReport),
    Conflict(Conflict),
    Failed(SaveError),
}

pub struct SaveJob {
    pub snapshot: Snapshot,
    pub target: SaveTarget,
    pub marker: VersionMarker,
    /// Skip the version check (conflict resolved as "keep local").
    pub force: bool,
    pub backend: Backend,
    pub scheduler: SchedulerHandle,
}

impl SaveJob {
    pub async fn run(self) -> SaveResult {
        let artifact = self.fresh_compile().await;

        if !self.force {
            match self.check_remote().await {
                Ok(None) => {}
                Ok(Some(conflict)) => return SaveResult::Conflict(conflict),
                Err(e) => return SaveResult::Failed(e),
            }
        }

        if let Err(e) = self
            .backend
            .files
            .save_file(
                &self.target.typ_path,
                self.snapshot.text.as_bytes(),
                SaveOptions::UPSERT,
            )
            .await
        {
            return SaveResult::Failed(SaveError::UploadFailed(e.to_string()));
        }

        let artifacts_stored = match &artifact {
            Some(artifact) => self.store_artifacts(artifact).await,
            None => false,
        };

        let saved_at = Utc::now();
        let (marker, warning) = match self
            .backend
            .projects
            .update_project(&self.target.id, ProjectUpdate::touch(saved_at))
            .await
        {
            Ok(project) => (Some(VersionMarker::of(&project)), None),
            Err(e) => {
                log!("save"; "source saved, metadata update failed: {}", e);
                (None, Some(SaveError::MetadataUpdateFailed(e.to_string())))
            }
        };

        SaveResult::Saved(SaveReport {
            snapshot: self.snapshot.id,
            saved_at,
            artifacts_stored,
            marker,
            warning,
        })
    }

    /// Compile exactly the text being saved, bypassing the debounce.
    async fn fresh_compile(&self) -> Option<Artifact> {
        if self.snapshot.is_blank() {
            return None;
        }
        match self
            .scheduler
            .compile_now(self.snapshot.clone(), ExportKind::Publish)
            .await
        {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                log!("save"; "compile failed, saving source only: {}", e);
                None
            }
        }
    }

    async fn check_remote(&self) -> Result<Option<Conflict>, SaveError> {
        match self.backend.projects.get_project(&self.target.id).await {
            Ok(Some(current)) => Ok(conflict::detect(self.marker, &current)),
            Ok(None) => Err(SaveError::UploadFailed(format!(
                "project {} no longer exists",
                self.target.id
            ))),
            Err(e) => Err(SaveError::UploadFailed(format!(
                "could not check remote version: {e}"
            ))),
        }
    }

    /// PDF plus first-page thumbnail. Failures are logged, not fatal.
    async fn store_artifacts(&self, artifact: &Artifact) -> bool {
        let files = &self.backend.files;
        let mut stored = true;

        if let Some(pdf) = &artifact.pdf
            && let Err(e) = files
                .save_file(&self.target.pdf_path, pdf, SaveOptions::UPSERT)
                .await
        {
            log!("save"; "could not store pdf: {}", e);
            stored = false;
        }

        if let Some(thumb_path) = &self.target.thumbnail_path {
            let first_page = paginate(&artifact.svg)
                .ok()
                .and_then(|p| p.pages.into_iter().next());
            match first_page {
                Some(page) => {
                    if let Err(e) = files
                        .save_file(thumb_path, page.svg.as_bytes(), SaveOptions::UPSERT)
                        .await
                    {
                        log!("save"; "could not store thumbnail: {}", e);
                        stored = false;
                    }
                }
                None => {
                    log!("save"; "compiled output has no pages, thumbnail skipped");
                    stored = false;
                }
            }
        }

        stored
    }
}
