//! Working-file watcher.
//!
//! The buffer is mirrored into a plain `.typ` file so any editor can be used.
//! The parent directory is watched (editors often save by rename) and each
//! content change of the file is read and forwarded as a whole new buffer.
//! Identical text is dropped by the session, so our own writes are harmless.

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::{debug, log};

pub struct SourceWatcher {
    /// Watcher handle (must be kept alive)
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<String>,
}

impl SourceWatcher {
    pub fn spawn(path: &Path) -> notify::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let target = path.to_path_buf();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) if touches(&event, &target) => match std::fs::read_to_string(&target) {
                    Ok(text) => {
                        let _ = tx.send(text);
                    }
                    // mid-rename; the next event carries the content
                    Err(e) => debug!("watch"; "read {} failed: {}", target.display(), e),
                },
                Ok(_) => {}
                Err(e) => log!("watch"; "notify error: {}", e),
            }
        })?;

        let dir = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// A create or content modification of `target`.
fn touches(event: &notify::Event, target: &Path) -> bool {
    let relevant = match event.kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    };
    relevant
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some() && p.file_name() == target.file_name())
}
