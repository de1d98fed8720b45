//! Document session: one open project in the editor.
//!
//! # Module Structure
//!
//! ```text
//! session/
//! ├── actor       # SessionActor select loop (owns all state)
//! ├── autosave    # AutosaveTimer
//! ├── conflict    # VersionMarker, Conflict, Resolution
//! ├── error       # LoadError, SaveError, SessionError
//! ├── messages    # SessionMsg and command outcomes
//! ├── permission  # Permissions resolution
//! ├── save        # SaveJob pipeline
//! └── state       # SessionView, Preview, StalenessGate
//! ```
//!
//! [`open`] loads the project, spawns a [`CompileScheduler`] and the session
//! actor, and returns a cloneable [`SessionHandle`]. The handle sends
//! commands; the UI observes state through [`SessionHandle::subscribe`].

mod actor;
mod autosave;
mod conflict;
mod error;
mod messages;
mod permission;
mod save;
mod state;


pub use conflict::{Conflict, Resolution, VersionMarker};
pub use error::{LoadError, SaveError, SessionError};
pub use messages::{
    LeaveChoice, LeaveOutcome, ResolveOutcome, SaveOutcome, SaveReport, SkipReason,
};
pub use permission::Permissions;
pub use state::{Notice, NoticeLevel, Phase, Preview, SessionView};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};

use self::actor::{ActorParts, SessionActor, load_source};
use self::autosave::AutosaveTimer;
use self::messages::{Reply, SessionMsg};
use crate::config::SessionConfig;
use crate::engine::Compiler;
use crate::log;
use crate::scheduler::{CompileScheduler, DEBOUNCE_MS};
use crate::store::{Backend, ProjectId};

/// Session timing.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub settle_delay: Duration,
    pub autosave_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(DEBOUNCE_MS),
            autosave_interval: Duration::from_secs(60),
        }
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            settle_delay: config.settle_delay(),
            autosave_interval: config.autosave_interval(),
        }
    }
}

/// Open `project_id` for the signed-in user.
///
/// Fails with [`LoadError::NotFound`] or [`LoadError::AccessDenied`]; both
/// are final. On success the first compile is already queued when the
/// source is not blank.
pub async fn open(
    project_id: ProjectId,
    backend: Backend,
    compiler: Arc<dyn Compiler>,
    options: SessionOptions,
) -> Result<SessionHandle, LoadError> {
    let user = backend
        .identity
        .current_user()
        .ok_or_else(|| LoadError::AccessDenied(project_id.clone()))?;

    let project = backend
        .projects
        .get_project(&project_id)
        .await
        .map_err(LoadError::Store)?
        .ok_or_else(|| LoadError::NotFound(project_id.clone()))?;

    let permissions = permission::load_permissions(&backend, &project, &user)
        .await
        .map_err(LoadError::Store)?
        .ok_or_else(|| LoadError::AccessDenied(project_id.clone()))?;

    let text = load_source(&backend, &project).await?;

    log!(
        "session";
        "opened {} ({})",
        project.title,
        if permissions.can_edit { "editable" } else { "read-only" }
    );

    let (view_tx, view_rx) = watch::channel(state::SessionView::loading(project_id));
    let (scheduler, events) = CompileScheduler::spawn(compiler.clone(), options.settle_delay);
    let (tx, rx) = mpsc::unbounded_channel();

    let actor = SessionActor::new(ActorParts {
        rx,
        events,
        view: view_tx,
        scheduler,
        compiler,
        backend,
        project,
        permissions,
        buffer: Arc::from(text),
        autosave: AutosaveTimer::new(options.autosave_interval),
    });
    actor.start();
    tokio::spawn(actor.run());

    Ok(SessionHandle { tx, view: view_rx })
}

/// Command side of an open session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionMsg>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// Latest published state.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Replace the buffer. Ignored for read-only sessions.
    pub fn edit(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.tx
            .send(SessionMsg::Edit(text.into()))
            .map_err(|_| SessionError::Closed)
    }

    pub async fn save(&self) -> Result<SaveOutcome, SessionError> {
        self.request(SessionMsg::Save).await
    }

    /// Compile the current buffer for publishing and return the PDF.
    pub async fn export_pdf(&self) -> Result<Vec<u8>, SessionError> {
        self.request(SessionMsg::ExportPdf).await
    }

    pub async fn resolve_conflict(
        &self,
        resolution: Resolution,
    ) -> Result<ResolveOutcome, SessionError> {
        self.request(|reply| SessionMsg::ResolveConflict(resolution, reply))
            .await
    }

    /// Ask to leave; a dirty session answers [`LeaveOutcome::NeedsDecision`].
    pub async fn leave(&self) -> Result<LeaveOutcome, SessionError> {
        self.request(|reply| SessionMsg::Leave(None, reply)).await
    }

    pub async fn leave_with(&self, choice: LeaveChoice) -> Result<LeaveOutcome, SessionError> {
        self.request(|reply| SessionMsg::Leave(Some(choice), reply))
            .await
    }

    /// Restart the engine and recompile the current buffer.
    pub async fn retry_engine(&self) -> Result<(), SessionError> {
        self.request(SessionMsg::RetryEngine).await
    }

    /// Resolve once the session has closed.
    pub async fn closed(&self) {
        let mut view = self.view.clone();
        let _ = view.wait_for(|v| v.phase == Phase::Closed).await;
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> SessionMsg) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }
}
