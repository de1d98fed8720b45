//! Process-wide shutdown state.
//!
//! The Ctrl+C handler runs on its own thread. It flips `SHUTDOWN` and wakes
//! the interactive edit loop through `SHUTDOWN_NOTIFY`, which treats it
//! like a `:q` (leave, prompting when the buffer is dirty).

use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Wakes async waiters on Ctrl+C. `notify_one` stores a permit, so a
/// signal that arrives while nobody is waiting is not lost.
static SHUTDOWN_NOTIFY: LazyLock<Notify> = LazyLock::new(Notify::new);

/// Setup the global Ctrl+C handler. Call once at program start.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);
        SHUTDOWN_NOTIFY.notify_one();
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering; a late observation only costs one more loop turn.
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Wait until Ctrl+C is pressed.
pub async fn shutdown_requested() {
    SHUTDOWN_NOTIFY.notified().await;
    SHUTDOWN.store(false, Ordering::SeqCst);
}
