//! Logging utilities with colored output and a session status block.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro, only printed with `--verbose`
//! - `SessionStatus` for the overwrite-in-place status block of `vitae edit`
//!
//! # Example
//!
//! ```ignore
//! log!("save"; "saved {} at {}", project, time);
//! debug!("compile"; "dropping stale result for #{}", snapshot);
//!
//! status_success("preview: 2 pages (A4)");
//! status_error("compile failed", "error: unclosed delimiter\n  --> main.typ:3:1");
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "edit" | "session" => prefix.bright_blue().bold().to_string(),
        "save" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Session Status (single block with overwrite)
// ============================================================================

/// Current local time formatted as HH:MM:SS
fn now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Status block for the interactive edit loop
///
/// Each message replaces the previous one so the terminal shows only the
/// latest preview state: ✓ for a fresh preview, ✗ for a compile error,
/// ⚠ for warnings.
pub struct SessionStatus {
    /// Lines of previous output to clear
    last_lines: usize,
}

static SESSION_STATUS: LazyLock<Mutex<SessionStatus>> =
    LazyLock::new(|| Mutex::new(SessionStatus::new()));

impl SessionStatus {
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// Display success message (✓ prefix, green).
    pub fn success(&mut self, message: &str) {
        self.display(format!("{}", "✓".green()), message);
    }

    /// Display error message (✗ prefix, red) with optional detail.
    pub fn error(&mut self, summary: &str, detail: &str) {
        let message = if detail.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}\n{detail}")
        };
        self.display(format!("{}", "✗".red()), &message);
    }

    /// Display warning message (⚠ prefix, yellow).
    pub fn warning(&mut self, detail: &str) {
        self.display(format!("{}", "⚠".yellow()), detail);
    }

    fn display(&mut self, symbol: String, message: &str) {
        let mut stdout = stdout().lock();

        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(stdout, cursor::MoveUp(lines)).ok();
            execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", now()).dimmed().to_string();
        writeln!(stdout, "{timestamp} {symbol} {message}").ok();
        stdout.flush().ok();

        self.last_lines = line_count(message);
    }

    /// Forget the previous block so the next message is appended below
    /// instead of overwriting (used after interleaved command output).
    pub fn detach(&mut self) {
        self.last_lines = 0;
    }
}

fn line_count(message: &str) -> usize {
    message.matches('\n').count() + 1
}

/// Global session status: success
pub fn status_success(message: &str) {
    SESSION_STATUS.lock().success(message);
}

/// Global session status: error
pub fn status_error(summary: &str, detail: &str) {
    SESSION_STATUS.lock().error(summary, detail);
}

/// Global session status: warning
pub fn status_warning(detail: &str) {
    SESSION_STATUS.lock().warning(detail);
}

/// Global session status: stop overwriting the last block
pub fn status_detach() {
    SESSION_STATUS.lock().detach();
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_new() {
        let status = SessionStatus::new();
        assert_eq!(status.last_lines, 0);
    }

    #[test]
    fn test_line_count_single() {
        assert_eq!(line_count("preview: 1 page (Letter)"), 1);
    }

    #[test]
    fn test_line_count_compile_error() {
        let message = format!(
            "{}\n{}",
            "compile failed", "error: unknown variable: foo\n  --> main.typ:3:2"
        );
        assert_eq!(line_count(&message), 3);
    }

    #[test]
    fn test_detach_resets_overwrite() {
        let mut status = SessionStatus::new();
        status.last_lines = 4;
        status.detach();
        assert_eq!(status.last_lines, 0);
    }

    #[test]
    fn test_verbose_toggle() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }
}
