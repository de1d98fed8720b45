//! Debounced compile scheduler.
//!
//! Turns a high-frequency stream of buffer changes into a low-frequency
//! stream of compiles:
//!
//! ```text
//! Changed(snapshot) ──► Debouncer (latest only) ──settled──┐
//! Immediate(snapshot) ─────────────────────────────────────┼──► one in-flight compile
//!                                                          │          │
//!                                   CompileEvent::Finished ◄──────────┘
//! ```
//!
//! - At most one compile runs at a time. When it finishes, the freshest
//!   settled snapshot runs next; everything in between was replaced.
//! - Immediate requests (save, export) skip the settle delay and run before
//!   any debounced snapshot. A debounced snapshot not newer than the
//!   immediate one is dropped.
//! - A blank snapshot clears the countdown and reports `Empty` at once,
//!   without touching the engine.
//!
//! Results are tagged with their snapshot id. Whether a result is still
//! current is the consumer's call.

mod debouncer;
mod snapshot;
#[cfg(test)]
mod tests;

pub use debouncer::DEBOUNCE_MS;
pub use snapshot::{Snapshot, SnapshotId};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

use self::debouncer::Debouncer;
use crate::debug;
use crate::engine::{Artifact, CompileError, Compiler, EngineError, ExportKind};

pub type CompileResult = Result<Artifact, EngineError>;

pub enum SchedulerMsg {
    Changed(Snapshot),
    Immediate {
        snapshot: Snapshot,
        kind: ExportKind,
        reply: oneshot::Sender<CompileResult>,
    },
    Shutdown,
}

/// Events delivered to the owning session.
#[derive(Debug)]
pub enum CompileEvent {
    Started {
        snapshot: SnapshotId,
        kind: ExportKind,
    },
    Finished {
        snapshot: SnapshotId,
        kind: ExportKind,
        result: CompileResult,
    },
    /// The buffer became blank; nothing to show.
    Empty { snapshot: SnapshotId },
}

struct ImmediateRequest {
    snapshot: Snapshot,
    kind: ExportKind,
    reply: oneshot::Sender<CompileResult>,
}

struct InFlight {
    snapshot: SnapshotId,
    kind: ExportKind,
    reply: Option<oneshot::Sender<CompileResult>>,
    handle: JoinHandle<CompileResult>,
}

pub struct CompileScheduler {
    rx: mpsc::UnboundedReceiver<SchedulerMsg>,
    events: mpsc::UnboundedSender<CompileEvent>,
    compiler: Arc<dyn Compiler>,
    debouncer: Debouncer,
    immediate: VecDeque<ImmediateRequest>,
    in_flight: Option<InFlight>,
}

impl CompileScheduler {
    /// Spawn the scheduler loop on the current runtime.
    pub fn spawn(
        compiler: Arc<dyn Compiler>,
        settle: Duration,
    ) -> (SchedulerHandle, mpsc::UnboundedReceiver<CompileEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            rx,
            events,
            compiler,
            debouncer: Debouncer::new(settle),
            immediate: VecDeque::new(),
            in_flight: None,
        };
        tokio::spawn(scheduler.run());
        (SchedulerHandle { tx }, events_rx)
    }

    async fn run(mut self) {
        loop {
            if self.in_flight.is_none() && self.start_next().is_err() {
                break;
            }

            let deadline = self.debouncer.deadline();
            let idle = self.in_flight.is_none();

            tokio::select! {
                biased;

                msg = self.rx.recv() => match msg {
                    Some(SchedulerMsg::Shutdown) | None => break,
                    Some(msg) => if self.handle(msg).is_err() { break },
                },

                joined = wait_job(&mut self.in_flight) => {
                    if let Some(job) = self.in_flight.take()
                        && self.finish(job, joined).is_err()
                    {
                        break;
                    }
                }

                _ = sleep_until_opt(deadline), if idle => {}
            }
        }

        if let Some(job) = self.in_flight.take() {
            // engine calls are not preemptible; the result is just dropped
            debug!("compile"; "shutting down with {} in flight", job.snapshot);
        }
    }

    fn handle(&mut self, msg: SchedulerMsg) -> Result<(), ()> {
        match msg {
            SchedulerMsg::Changed(snapshot) if snapshot.is_blank() => {
                self.debouncer.clear();
                self.emit(CompileEvent::Empty {
                    snapshot: snapshot.id,
                })
            }
            SchedulerMsg::Changed(snapshot) => {
                self.debouncer.push(snapshot, Instant::now());
                Ok(())
            }
            SchedulerMsg::Immediate {
                snapshot,
                kind,
                reply,
            } => {
                self.debouncer.discard_through(snapshot.id);
                if snapshot.is_blank() {
                    let _ = reply.send(Err(CompileError::new("document is empty").into()));
                    return self.emit(CompileEvent::Empty {
                        snapshot: snapshot.id,
                    });
                }
                self.immediate.push_back(ImmediateRequest {
                    snapshot,
                    kind,
                    reply,
                });
                Ok(())
            }
            SchedulerMsg::Shutdown => Ok(()),
        }
    }

    /// Launch the next compile: immediate requests first, then a settled
    /// debounced snapshot.
    fn start_next(&mut self) -> Result<(), ()> {
        if let Some(req) = self.immediate.pop_front() {
            return self.launch(req.snapshot, req.kind, Some(req.reply));
        }
        if let Some(snapshot) = self.debouncer.take_if_settled(Instant::now()) {
            return self.launch(snapshot, ExportKind::Preview, None);
        }
        Ok(())
    }

    fn launch(
        &mut self,
        snapshot: Snapshot,
        kind: ExportKind,
        reply: Option<oneshot::Sender<CompileResult>>,
    ) -> Result<(), ()> {
        debug!("compile"; "start {} ({:?})", snapshot.id, kind);
        let compiler = self.compiler.clone();
        let text = snapshot.text.clone();
        let handle = tokio::spawn(async move { compiler.submit(text, kind).await });

        self.in_flight = Some(InFlight {
            snapshot: snapshot.id,
            kind,
            reply,
            handle,
        });
        self.emit(CompileEvent::Started {
            snapshot: snapshot.id,
            kind,
        })
    }

    fn finish(&mut self, job: InFlight, joined: Result<CompileResult, JoinError>) -> Result<(), ()> {
        let result = joined.unwrap_or_else(|e| {
            Err(CompileError::new(format!("compile task failed: {e}")).into())
        });
        debug!(
            "compile";
            "finish {} ({:?}): {}",
            job.snapshot,
            job.kind,
            if result.is_ok() { "ok" } else { "failed" }
        );

        if let Some(reply) = job.reply {
            let _ = reply.send(result.clone());
        }
        self.emit(CompileEvent::Finished {
            snapshot: job.snapshot,
            kind: job.kind,
            result,
        })
    }

    /// Fails only when the session is gone.
    fn emit(&self, event: CompileEvent) -> Result<(), ()> {
        self.events.send(event).map_err(|_| ())
    }
}

async fn wait_job(job: &mut Option<InFlight>) -> Result<CompileResult, JoinError> {
    match job {
        Some(job) => (&mut job.handle).await,
        None => std::future::pending().await,
    }
}

/// Sleep until `deadline`, or forever when there is none.
pub async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Sending side of the scheduler, owned by the session.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<SchedulerMsg>,
}

impl SchedulerHandle {
    pub fn notify_change(&self, snapshot: Snapshot) {
        let _ = self.tx.send(SchedulerMsg::Changed(snapshot));
    }

    /// Compile `snapshot` without waiting for the settle period.
    pub async fn compile_now(&self, snapshot: Snapshot, kind: ExportKind) -> CompileResult {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SchedulerMsg::Immediate {
                snapshot,
                kind,
                reply,
            })
            .map_err(|_| EngineError::NotReady)?;
        rx.await.unwrap_or(Err(EngineError::NotReady))
    }

    /// Queue an immediate compile whose result only arrives as an event.
    pub fn schedule_now(&self, snapshot: Snapshot, kind: ExportKind) {
        let (reply, _) = oneshot::channel();
        let _ = self.tx.send(SchedulerMsg::Immediate {
            snapshot,
            kind,
            reply,
        });
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(SchedulerMsg::Shutdown);
    }
}
