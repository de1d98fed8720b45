//! Scriptable `Compiler` for scheduler and session tests.
//!
//! Compiles complete after a tokio sleep, so tests with paused time control
//! exactly when results land.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Artifact, CompileError, Compiler, EngineError, ExportKind};
use crate::store::memory::Journal;

pub const FAKE_WIDTH: f64 = 595.28;

pub struct FakeCompiler {
    calls: Mutex<Vec<(String, ExportKind)>>,
    delay: Mutex<Duration>,
    /// Sources containing the marker take the given time instead.
    slow: Mutex<Vec<(String, Duration)>>,
    height: Mutex<f64>,
    unavailable: AtomicBool,
    active: AtomicUsize,
    max_active: AtomicUsize,
    retries: AtomicUsize,
    journal: Option<Journal>,
}

impl FakeCompiler {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(delay, None))
    }

    pub fn with_journal(delay: Duration, journal: Journal) -> Arc<Self> {
        Arc::new(Self::build(delay, Some(journal)))
    }

    fn build(delay: Duration, journal: Option<Journal>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            delay: Mutex::new(delay),
            slow: Mutex::new(Vec::new()),
            height: Mutex::new(841.89),
            unavailable: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            retries: AtomicUsize::new(0),
            journal,
        }
    }

    pub fn slow_when(&self, marker: &str, delay: Duration) {
        self.slow.lock().push((marker.to_string(), delay));
    }

    /// Total height of the produced canvas.
    pub fn set_height(&self, height: f64) {
        *self.height.lock() = height;
    }

    /// Simulate an engine that failed to start.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, ExportKind)> {
        self.calls.lock().clone()
    }

    pub fn sources(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Highest number of compiles ever running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn retry_count(&self) -> usize {
        self.retries.load(Ordering::SeqCst)
    }

    fn delay_for(&self, source: &str) -> Duration {
        self.slow
            .lock()
            .iter()
            .find(|(marker, _)| source.contains(marker.as_str()))
            .map_or(*self.delay.lock(), |(_, d)| *d)
    }
}

/// Fake vector output: one canvas of the given height.
pub fn fake_svg(height: f64, body: &str) -> String {
    format!(
        r#"<svg class="typst-doc" viewBox="0 0 {FAKE_WIDTH} {height}" width="{FAKE_WIDTH}pt" height="{height}pt" xmlns="http://www.w3.org/2000/svg"><text>{body}</text></svg>"#
    )
}

#[async_trait]
impl Compiler for FakeCompiler {
    async fn submit(&self, source: Arc<str>, kind: ExportKind) -> Result<Artifact, EngineError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EngineError::InitFailed("fonts missing".into()));
        }

        self.calls.lock().push((source.to_string(), kind));
        if let Some(journal) = &self.journal {
            journal.lock().push(format!("compile {kind:?}"));
        }

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        tokio::time::sleep(self.delay_for(&source)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if source.contains("#error") {
            return Err(CompileError {
                message: "unknown variable: error".into(),
                diagnostics: vec!["error: unknown variable: error\n  --> main.typ:1:2".into()],
            }
            .into());
        }

        let height = *self.height.lock();
        Ok(Artifact {
            svg: fake_svg(height, &source.len().to_string()),
            pdf: (kind == ExportKind::Publish).then(|| b"%PDF-1.7 fake".to_vec()),
            warnings: Vec::new(),
        })
    }

    async fn retry(&self) -> Result<(), EngineError> {
        self.retries.fetch_add(1, Ordering::SeqCst);
        self.set_unavailable(false);
        Ok(())
    }
}
