//! Process-wide handle to the typesetting engine.
//!
//! The engine is expensive to start (font loading), so it is created lazily
//! on first use and shared by every session. Startup happens exactly once:
//! concurrent callers all wait on the same attempt. A failed attempt is
//! recorded and reported to every waiter until `retry()` clears it.
//!
//! ```text
//! Idle ──initialize()──► Initializing ──► Ready(engine)
//!  ▲                                  └──► Failed(msg) ──retry()──┐
//!  └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::{Artifact, CompileError, Compiler, Engine, EngineError, ExportKind};
use crate::{debug, log};

/// Builds the engine. Runs on a blocking thread.
pub type EngineFactory = Arc<dyn Fn() -> Result<Arc<dyn Engine>, String> + Send + Sync>;

#[derive(Clone)]
enum GatewayState {
    Idle,
    Initializing,
    Ready(Arc<dyn Engine>),
    Failed(String),
}

/// Observable engine lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    Idle,
    Initializing,
    Ready,
    Failed(String),
}

struct GatewayInner {
    factory: EngineFactory,
    state: watch::Sender<GatewayState>,
    init_timeout: Duration,
}

/// Cheap to clone; all clones share one engine.
#[derive(Clone)]
pub struct CompilerGateway {
    inner: Arc<GatewayInner>,
}

impl CompilerGateway {
    pub fn new(factory: EngineFactory, init_timeout: Duration) -> Self {
        let (state, _) = watch::channel(GatewayState::Idle);
        Self {
            inner: Arc::new(GatewayInner {
                factory,
                state,
                init_timeout,
            }),
        }
    }

    pub fn status(&self) -> GatewayStatus {
        match &*self.inner.state.borrow() {
            GatewayState::Idle => GatewayStatus::Idle,
            GatewayState::Initializing => GatewayStatus::Initializing,
            GatewayState::Ready(_) => GatewayStatus::Ready,
            GatewayState::Failed(msg) => GatewayStatus::Failed(msg.clone()),
        }
    }

    /// Start the engine if nobody has, then wait for the outcome.
    ///
    /// Waiting is bounded by the init timeout. Timing out does not abort the
    /// startup itself; a later call may still observe it succeed.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        let start = self.inner.state.send_if_modified(|state| {
            if matches!(state, GatewayState::Idle) {
                *state = GatewayState::Initializing;
                true
            } else {
                false
            }
        });

        if start {
            self.spawn_init();
        }

        self.wait_ready().await.map(|_| ())
    }

    fn spawn_init(&self) {
        log!("engine"; "starting typesetting engine");
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let factory = inner.factory.clone();
            let started = tokio::time::Instant::now();
            let next = match tokio::task::spawn_blocking(move || factory()).await {
                Ok(Ok(engine)) => {
                    log!("engine"; "ready in {:?}", started.elapsed());
                    GatewayState::Ready(engine)
                }
                Ok(Err(msg)) => {
                    log!("error"; "engine failed to start: {}", msg);
                    GatewayState::Failed(msg)
                }
                Err(e) => {
                    log!("error"; "engine startup panicked: {}", e);
                    GatewayState::Failed(format!("startup panicked: {e}"))
                }
            };
            inner.state.send_replace(next);
        });
    }

    async fn wait_ready(&self) -> Result<Arc<dyn Engine>, EngineError> {
        let mut rx = self.inner.state.subscribe();
        let settled = tokio::time::timeout(
            self.inner.init_timeout,
            rx.wait_for(|state| !matches!(state, GatewayState::Initializing)),
        )
        .await;

        match settled {
            Err(_) => Err(EngineError::Timeout(self.inner.init_timeout)),
            Ok(Err(_)) => Err(EngineError::NotReady),
            Ok(Ok(state)) => match &*state {
                GatewayState::Ready(engine) => Ok(engine.clone()),
                GatewayState::Failed(msg) => Err(EngineError::InitFailed(msg.clone())),
                GatewayState::Idle | GatewayState::Initializing => Err(EngineError::NotReady),
            },
        }
    }

    /// Forget a failed startup so the next `initialize()` tries again.
    pub fn reset(&self) -> bool {
        self.inner.state.send_if_modified(|state| {
            if matches!(state, GatewayState::Failed(_)) {
                *state = GatewayState::Idle;
                true
            } else {
                false
            }
        })
    }

    /// Compile on a ready engine. Never starts the engine.
    pub async fn compile(
        &self,
        source: Arc<str>,
        kind: ExportKind,
    ) -> Result<Artifact, EngineError> {
        let engine = match &*self.inner.state.borrow() {
            GatewayState::Ready(engine) => engine.clone(),
            _ => return Err(EngineError::NotReady),
        };

        let started = tokio::time::Instant::now();
        let result = tokio::task::spawn_blocking(move || engine.compile(&source, kind))
            .await
            .map_err(|e| CompileError::new(format!("engine panicked: {e}")))?;
        debug!("engine"; "{:?} compile took {:?}", kind, started.elapsed());
        Ok(result?)
    }
}

#[async_trait]
impl Compiler for CompilerGateway {
    async fn submit(&self, source: Arc<str>, kind: ExportKind) -> Result<Artifact, EngineError> {
        self.initialize().await?;
        self.compile(source, kind).await
    }

    async fn retry(&self) -> Result<(), EngineError> {
        if self.reset() {
            log!("engine"; "retrying engine startup");
        }
        self.initialize().await
    }
}
