//! The session loop.
//!
//! One task owns the buffer and every piece of mutable session state.
//! Commands, compile events, the running save and the autosave timer are
//! multiplexed with a biased `select!`; after each wakeup the current
//! [`SessionView`] is published on a watch channel.
//!
//! ```text
//! SessionHandle ──► SessionMsg ──┐
//! CompileScheduler ► CompileEvent├─► SessionActor ──► watch<SessionView>
//! SaveJob ───────► SaveResult ───┤
//! AutosaveTimer ─► deadline ─────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

use super::autosave::AutosaveTimer;
use super::conflict::{Conflict, Resolution, VersionMarker};
use super::error::{LoadError, SaveError, SessionError};
use super::messages::{
    LeaveChoice, LeaveOutcome, Reply, ResolveOutcome, SaveOutcome, SaveReport, SessionMsg,
    SkipReason,
};
use super::permission::Permissions;
use super::save::{SaveJob, SaveResult, SaveTarget};
use super::state::{Notice, Phase, Preview, SessionView, StalenessGate};
use crate::engine::{CompileError, Compiler, EngineError, ExportKind};
use crate::layout::paginate;
use crate::scheduler::{CompileEvent, SchedulerHandle, Snapshot, SnapshotId, sleep_until_opt};
use crate::store::{Backend, Project, StoreError};
use crate::{debug, log};

/// Someone waiting on the running save.
enum SaveWaiter {
    Save(Reply<SaveOutcome>),
    Resolve(Reply<ResolveOutcome>),
    Leave(Reply<LeaveOutcome>),
}

struct SaveTask {
    handle: JoinHandle<SaveResult>,
    waiters: Vec<SaveWaiter>,
}

/// Everything the loop needs at startup.
pub(super) struct ActorParts {
    pub rx: mpsc::UnboundedReceiver<SessionMsg>,
    pub events: mpsc::UnboundedReceiver<CompileEvent>,
    pub view: watch::Sender<SessionView>,
    pub scheduler: SchedulerHandle,
    pub compiler: Arc<dyn Compiler>,
    pub backend: Backend,
    pub project: Project,
    pub permissions: Permissions,
    pub buffer: Arc<str>,
    pub autosave: AutosaveTimer,
}

pub(super) struct SessionActor {
    rx: mpsc::UnboundedReceiver<SessionMsg>,
    events: mpsc::UnboundedReceiver<CompileEvent>,
    view: watch::Sender<SessionView>,
    scheduler: SchedulerHandle,
    compiler: Arc<dyn Compiler>,
    backend: Backend,

    project: Project,
    target: SaveTarget,
    permissions: Permissions,
    marker: VersionMarker,

    buffer: Arc<str>,
    snapshot: SnapshotId,
    dirty: bool,
    gate: StalenessGate,

    compiling: bool,
    preview: Preview,
    preview_snapshot: Option<SnapshotId>,
    warnings: Vec<String>,

    save: Option<SaveTask>,
    autosave: AutosaveTimer,
    last_saved_at: Option<DateTime<Utc>>,
    conflict: Option<Conflict>,
    notice: Option<Notice>,
    closed: bool,
}

impl SessionActor {
    pub fn new(parts: ActorParts) -> Self {
        let snapshot = SnapshotId::default().next();
        let preview = if parts.buffer.trim().is_empty() {
            Preview::Empty
        } else {
            Preview::Pending
        };

        Self {
            rx: parts.rx,
            events: parts.events,
            view: parts.view,
            scheduler: parts.scheduler,
            compiler: parts.compiler,
            backend: parts.backend,
            target: SaveTarget::of(&parts.project),
            marker: VersionMarker::of(&parts.project),
            project: parts.project,
            permissions: parts.permissions,
            buffer: parts.buffer,
            snapshot,
            dirty: false,
            gate: StalenessGate::new(snapshot),
            compiling: false,
            preview,
            preview_snapshot: None,
            warnings: Vec::new(),
            save: None,
            autosave: parts.autosave,
            last_saved_at: None,
            conflict: None,
            notice: None,
            closed: false,
        }
    }

    fn current(&self) -> Snapshot {
        Snapshot::new(self.snapshot, self.buffer.clone())
    }

    /// Publish the loaded state and queue the first compile of a non-blank
    /// buffer.
    pub fn start(&self) {
        self.publish();
        let snapshot = self.current();
        if !snapshot.is_blank() {
            self.scheduler.schedule_now(snapshot, ExportKind::Preview);
        }
    }

    pub async fn run(mut self) {
        loop {
            let autosave_deadline = self.autosave.deadline();

            tokio::select! {
                biased;

                msg = self.rx.recv() => match msg {
                    Some(msg) => self.handle(msg).await,
                    None => self.close(),
                },

                Some(event) = self.events.recv() => self.on_compile_event(event),

                joined = wait_save(&mut self.save) => {
                    if let Some(task) = self.save.take() {
                        self.on_save_done(task, joined);
                    }
                }

                _ = sleep_until_opt(autosave_deadline) => self.on_autosave_due(),
            }

            self.publish();
            if self.closed {
                break;
            }
        }
    }

    async fn handle(&mut self, msg: SessionMsg) {
        match msg {
            SessionMsg::Edit(text) => self.on_edit(text),
            SessionMsg::Save(reply) => self.request_save(SaveWaiter::Save(reply)),
            SessionMsg::ExportPdf(reply) => self.export_pdf(reply),
            SessionMsg::ResolveConflict(resolution, reply) => {
                self.resolve_conflict(resolution, reply).await;
            }
            SessionMsg::Leave(choice, reply) => self.leave(choice, reply),
            SessionMsg::RetryEngine(reply) => self.retry_engine(reply),
        }
    }

    // ========================================================================
    // editing and preview
    // ========================================================================

    fn on_edit(&mut self, text: String) {
        if !self.permissions.can_edit {
            debug!("session"; "read-only, edit ignored");
            return;
        }
        if *self.buffer == *text {
            return;
        }

        self.buffer = Arc::from(text);
        self.snapshot = self.snapshot.next();
        self.gate.advance(self.snapshot);
        self.dirty = true;
        self.autosave.arm(Instant::now());
        self.scheduler.notify_change(self.current());
    }

    fn on_compile_event(&mut self, event: CompileEvent) {
        match event {
            CompileEvent::Started { .. } => self.compiling = true,
            CompileEvent::Finished {
                snapshot, result, ..
            } => {
                self.compiling = false;
                if !self.gate.accept(snapshot) {
                    debug!("compile"; "dropping stale result for {} (latest {})", snapshot, self.snapshot);
                    return;
                }
                self.preview_snapshot = Some(snapshot);
                self.preview = match result {
                    Ok(artifact) => {
                        self.warnings = artifact.warnings;
                        match paginate(&artifact.svg) {
                            Ok(pages) => Preview::Pages(Arc::new(pages)),
                            Err(e) => Preview::Error(CompileError::new(e.to_string())),
                        }
                    }
                    Err(EngineError::Compile(e)) => {
                        self.warnings.clear();
                        Preview::Error(e)
                    }
                    Err(e) => Preview::Unavailable(e),
                };
            }
            CompileEvent::Empty { snapshot } => {
                if self.gate.accept(snapshot) {
                    self.preview_snapshot = Some(snapshot);
                    self.preview = Preview::Empty;
                    self.warnings.clear();
                }
            }
        }
    }

    fn export_pdf(&self, reply: Reply<Vec<u8>>) {
        let scheduler = self.scheduler.clone();
        let snapshot = self.current();
        tokio::spawn(async move {
            let result = scheduler
                .compile_now(snapshot, ExportKind::Publish)
                .await
                .map_err(SessionError::from)
                .and_then(|artifact| {
                    artifact.pdf.ok_or_else(|| {
                        EngineError::from(CompileError::new("engine produced no pdf")).into()
                    })
                });
            let _ = reply.send(result);
        });
    }

    fn retry_engine(&self, reply: Reply<()>) {
        let compiler = self.compiler.clone();
        let scheduler = self.scheduler.clone();
        let snapshot = self.current();
        tokio::spawn(async move {
            let result = compiler.retry().await;
            if result.is_ok() && !snapshot.is_blank() {
                scheduler.schedule_now(snapshot, ExportKind::Preview);
            }
            let _ = reply.send(result.map_err(SessionError::from));
        });
    }

    // ========================================================================
    // saving
    // ========================================================================

    fn request_save(&mut self, waiter: SaveWaiter) {
        if !self.permissions.can_edit {
            waiter.fail(SaveError::ReadOnly);
            return;
        }

        if let Some(task) = &mut self.save {
            match waiter {
                SaveWaiter::Save(reply) => {
                    debug!("save"; "save already running, request dropped");
                    let _ = reply.send(Ok(SaveOutcome::Skipped(SkipReason::InProgress)));
                }
                waiter => task.waiters.push(waiter),
            }
            return;
        }

        if let Some(conflict) = self.conflict {
            waiter.conflict(conflict);
            return;
        }

        self.start_save(false, vec![waiter]);
    }

    fn start_save(&mut self, force: bool, waiters: Vec<SaveWaiter>) {
        let job = SaveJob {
            snapshot: self.current(),
            target: self.target.clone(),
            marker: self.marker,
            force,
            backend: self.backend.clone(),
            scheduler: self.scheduler.clone(),
        };
        debug!("save"; "saving {} as {}", self.snapshot, self.target.typ_path);
        self.autosave.disarm();
        self.save = Some(SaveTask {
            handle: tokio::spawn(job.run()),
            waiters,
        });
    }

    fn on_autosave_due(&mut self) {
        if !self.autosave.fire(Instant::now()) {
            return;
        }

        let skip = if !self.dirty {
            Some(SkipReason::Clean)
        } else if self.save.is_some() {
            Some(SkipReason::InProgress)
        } else if self.conflict.is_some() {
            Some(SkipReason::ConflictPending)
        } else if self.buffer.trim().is_empty() {
            Some(SkipReason::Empty)
        } else {
            None
        };

        match skip {
            Some(reason) => debug!("save"; "autosave skipped: {:?}", reason),
            None if self.permissions.can_edit => self.start_save(false, Vec::new()),
            None => {}
        }
    }

    fn on_save_done(&mut self, task: SaveTask, joined: Result<SaveResult, JoinError>) {
        let result = joined.unwrap_or_else(|e| {
            SaveResult::Failed(SaveError::UploadFailed(format!("save task failed: {e}")))
        });

        match result {
            SaveResult::Saved(report) => self.on_saved(task.waiters, report),
            SaveResult::Conflict(conflict) => {
                log!("save"; "{} changed elsewhere since it was opened", self.project.title);
                self.conflict = Some(conflict);
                self.notice = Some(Notice::warning(format!(
                    "remote copy changed at {}; keep your version or reload",
                    conflict.remote
                )));
                for waiter in task.waiters {
                    waiter.conflict(conflict);
                }
            }
            SaveResult::Failed(e) => {
                log!("error"; "save failed: {}", e);
                self.notice = Some(Notice::error(e.to_string()));
                for waiter in task.waiters {
                    waiter.fail(e.clone());
                }
            }
        }

        if self.dirty && !self.closed && self.conflict.is_none() && !self.autosave.is_armed() {
            self.autosave.arm(Instant::now());
        }
    }

    fn on_saved(&mut self, waiters: Vec<SaveWaiter>, report: SaveReport) {
        if let Some(marker) = report.marker {
            self.marker = marker;
        }
        self.last_saved_at = Some(report.saved_at);

        // edits made while the save ran are still unsaved; a failed metadata
        // update is retried by the next save
        if report.snapshot == self.snapshot && report.warning.is_none() {
            self.dirty = false;
        }

        self.notice = Some(match &report.warning {
            Some(warning) => Notice::warning(warning.to_string()),
            None => Notice::info(format!(
                "saved at {}",
                report.saved_at.with_timezone(&Local).format("%H:%M:%S")
            )),
        });
        log!("save"; "{} saved ({})", self.project.title, report.snapshot);

        let mut pending_leave = Vec::new();
        for waiter in waiters {
            match waiter {
                SaveWaiter::Save(reply) => {
                    let _ = reply.send(Ok(SaveOutcome::Saved(report.clone())));
                }
                SaveWaiter::Resolve(reply) => {
                    let _ = reply.send(Ok(ResolveOutcome::Overwrote(report.clone())));
                }
                SaveWaiter::Leave(reply) if self.dirty => {
                    pending_leave.push(SaveWaiter::Leave(reply));
                }
                SaveWaiter::Leave(reply) => {
                    self.close();
                    let _ = reply.send(Ok(LeaveOutcome::Left));
                }
            }
        }

        if !pending_leave.is_empty() && !self.closed {
            self.start_save(false, pending_leave);
        }
    }

    // ========================================================================
    // conflicts
    // ========================================================================

    async fn resolve_conflict(&mut self, resolution: Resolution, reply: Reply<ResolveOutcome>) {
        if self.conflict.is_none() {
            let _ = reply.send(Ok(ResolveOutcome::NoConflict));
            return;
        }

        match resolution {
            Resolution::KeepLocal => {
                log!("save"; "overwriting remote copy of {}", self.project.title);
                self.conflict = None;
                self.start_save(true, vec![SaveWaiter::Resolve(reply)]);
            }
            Resolution::DiscardLocal => match self.reload().await {
                Ok(()) => {
                    self.conflict = None;
                    self.notice = Some(Notice::info("reloaded remote copy"));
                    let _ = reply.send(Ok(ResolveOutcome::Reloaded));
                }
                Err(e) => {
                    self.notice = Some(Notice::error(e.to_string()));
                    let _ = reply.send(Err(e.into()));
                }
            },
        }
    }

    /// Replace the buffer with the stored copy.
    async fn reload(&mut self) -> Result<(), LoadError> {
        let project = self
            .backend
            .projects
            .get_project(&self.project.id)
            .await
            .map_err(LoadError::Store)?
            .ok_or_else(|| LoadError::NotFound(self.project.id.clone()))?;
        let text = load_source(&self.backend, &project).await?;

        self.marker = VersionMarker::of(&project);
        self.target = SaveTarget::of(&project);
        self.project = project;

        self.buffer = Arc::from(text);
        self.snapshot = self.snapshot.next();
        self.gate.advance(self.snapshot);
        self.dirty = false;
        self.autosave.disarm();

        let snapshot = self.current();
        if snapshot.is_blank() {
            self.scheduler.notify_change(snapshot);
        } else {
            self.scheduler.schedule_now(snapshot, ExportKind::Preview);
        }
        Ok(())
    }

    // ========================================================================
    // leaving
    // ========================================================================

    fn leave(&mut self, choice: Option<LeaveChoice>, reply: Reply<LeaveOutcome>) {
        let outcome = match choice {
            None | Some(LeaveChoice::Save) if !self.dirty => LeaveOutcome::Left,
            None => LeaveOutcome::NeedsDecision,
            Some(LeaveChoice::Cancel) => LeaveOutcome::Stayed,
            Some(LeaveChoice::Discard) => {
                log!("session"; "discarding unsaved changes to {}", self.project.title);
                LeaveOutcome::Left
            }
            Some(LeaveChoice::Save) => {
                self.request_save(SaveWaiter::Leave(reply));
                return;
            }
        };

        if outcome == LeaveOutcome::Left {
            self.close();
        }
        let _ = reply.send(Ok(outcome));
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.autosave.disarm();
        self.scheduler.shutdown();
        debug!("session"; "closed {}", self.project.id);
    }

    fn phase(&self) -> Phase {
        if self.closed {
            Phase::Closed
        } else if self.conflict.is_some() {
            Phase::Conflict
        } else if self.save.is_some() {
            Phase::Saving
        } else if self.dirty {
            Phase::Editing
        } else {
            Phase::Ready
        }
    }

    fn publish(&self) {
        self.view.send_replace(self.to_view());
    }

    fn to_view(&self) -> SessionView {
        SessionView {
            project_id: self.project.id.clone(),
            title: self.project.title.clone(),
            typ_path: self.project.typ_path.clone(),
            permissions: self.permissions,
            phase: self.phase(),
            buffer: self.buffer.clone(),
            snapshot: self.snapshot,
            dirty: self.dirty,
            compiling: self.compiling,
            saving: self.save.is_some(),
            preview: self.preview.clone(),
            preview_snapshot: self.preview_snapshot,
            warnings: self.warnings.clone(),
            last_saved_at: self.last_saved_at,
            conflict: self.conflict,
            notice: self.notice.clone(),
        }
    }
}

impl SaveWaiter {
    fn fail(self, error: SaveError) {
        match self {
            Self::Save(reply) => {
                let _ = reply.send(Err(error.into()));
            }
            Self::Resolve(reply) => {
                let _ = reply.send(Err(error.into()));
            }
            Self::Leave(reply) => {
                let _ = reply.send(Ok(LeaveOutcome::SaveFailed(error)));
            }
        }
    }

    fn conflict(self, conflict: Conflict) {
        match self {
            Self::Save(reply) => {
                let _ = reply.send(Ok(SaveOutcome::Conflict(conflict)));
            }
            Self::Resolve(reply) => {
                let _ = reply.send(Err(SaveError::UploadFailed(format!(
                    "remote changed again at {}",
                    conflict.remote
                ))
                .into()));
            }
            Self::Leave(reply) => {
                let _ = reply.send(Ok(LeaveOutcome::Conflict(conflict)));
            }
        }
    }
}

async fn wait_save(task: &mut Option<SaveTask>) -> Result<SaveResult, JoinError> {
    match task {
        Some(task) => (&mut task.handle).await,
        None => std::future::pending().await,
    }
}

/// Read a project's source; a missing file is an empty document.
pub(super) async fn load_source(backend: &Backend, project: &Project) -> Result<String, LoadError> {
    match backend.files.load_text(&project.typ_path).await {
        Ok(text) => Ok(text),
        Err(StoreError::NotFound(_)) => Ok(String::new()),
        Err(e) => Err(LoadError::Store(e)),
    }
}
