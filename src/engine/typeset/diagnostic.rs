//! Diagnostic formatting.
//!
//! ```text
//! error: unclosed delimiter
//!   --> main.typ:3:14
//! ```

use typst::World;
use typst::diag::{Severity, SourceDiagnostic};

pub fn format_diagnostic(world: &dyn World, diag: &SourceDiagnostic) -> String {
    let label = match diag.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    let mut out = format!("{label}: {}", diag.message);
    if let Some((path, line, column)) = locate(world, diag) {
        out.push_str(&format!("\n  --> {path}:{line}:{column}"));
    }
    out
}

pub fn has_errors(diags: &[SourceDiagnostic]) -> bool {
    diags.iter().any(|d| d.severity == Severity::Error)
}

/// 1-based line and column of the diagnostic's span.
fn locate(world: &dyn World, diag: &SourceDiagnostic) -> Option<(String, usize, usize)> {
    let id = diag.span.id()?;
    let source = world.source(id).ok()?;
    let range = source.range(diag.span)?;
    let (line, column) = line_column(source.text(), range.start);
    let path = id.vpath().as_rootless_path().display().to_string();
    Some((path, line, column))
}

fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = text.get(..offset).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
