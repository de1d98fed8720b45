//! Typst backend for the `Engine` contract.
//!
//! - `library`: shared standard library
//! - `font`: embedded fonts plus configured directories
//! - `world`: single-file in-memory `World`
//! - `diagnostic`: `error: ... --> main.typ:L:C` formatting

mod diagnostic;
mod font;
mod library;
mod world;

use std::path::PathBuf;
use std::sync::Arc;

use typst::layout::{Abs, PagedDocument};
use typst_pdf::PdfOptions;

use self::diagnostic::{format_diagnostic, has_errors};
use self::font::{FontSet, load_fonts};
use self::world::SourceWorld;
use super::{Artifact, CompileError, Engine, EngineFactory, ExportKind};
use crate::debug;

pub struct TypstEngine {
    fonts: FontSet,
}

impl TypstEngine {
    /// Load fonts and warm the standard library. Slow; call off the runtime.
    pub fn load(font_dirs: &[PathBuf]) -> Result<Self, String> {
        let fonts = load_fonts(font_dirs)?;
        debug!("engine"; "loaded {} fonts", fonts.len());
        std::sync::LazyLock::force(&library::GLOBAL_LIBRARY);
        Ok(Self { fonts })
    }

    /// Factory for `CompilerGateway`.
    pub fn factory(font_dirs: Vec<PathBuf>) -> EngineFactory {
        Arc::new(move || {
            let engine = Self::load(&font_dirs)?;
            Ok(Arc::new(engine) as Arc<dyn Engine>)
        })
    }
}

impl Engine for TypstEngine {
    fn compile(&self, source: &str, kind: ExportKind) -> Result<Artifact, CompileError> {
        let world = SourceWorld::new(&self.fonts, source);
        let compiled = typst::compile::<PagedDocument>(&world);

        let warnings: Vec<String> = compiled
            .warnings
            .iter()
            .map(|w| format_diagnostic(&world, w))
            .collect();

        let document = compiled.output.map_err(|errors| to_compile_error(&world, &errors))?;

        let svg = typst_svg::svg_merged(&document, Abs::zero());
        let pdf = match kind {
            ExportKind::Preview => None,
            ExportKind::Publish => Some(
                typst_pdf::pdf(&document, &PdfOptions::default())
                    .map_err(|errors| to_compile_error(&world, &errors))?,
            ),
        };

        Ok(Artifact { svg, pdf, warnings })
    }
}

fn to_compile_error(
    world: &SourceWorld<'_>,
    diags: &[typst::diag::SourceDiagnostic],
) -> CompileError {
    let errors: Vec<_> = if has_errors(diags) {
        diags
            .iter()
            .filter(|d| d.severity == typst::diag::Severity::Error)
            .collect()
    } else {
        diags.iter().collect()
    };

    let message = errors
        .first()
        .map(|d| d.message.to_string())
        .unwrap_or_else(|| "compilation failed".to_string());
    let diagnostics = errors.iter().map(|d| format_diagnostic(world, d)).collect();

    CompileError {
        message,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    static ENGINE: LazyLock<TypstEngine> =
        LazyLock::new(|| TypstEngine::load(&[]).expect("embedded fonts"));

    #[test]
    fn test_preview_has_viewbox_and_no_pdf() {
        let artifact = ENGINE
            .compile("= Jane Doe\nSoftware engineer", ExportKind::Preview)
            .unwrap();
        assert!(artifact.svg.contains("viewBox"));
        assert!(artifact.pdf.is_none());
    }

    #[test]
    fn test_publish_produces_pdf() {
        let artifact = ENGINE.compile("= Jane Doe", ExportKind::Publish).unwrap();
        let pdf = artifact.pdf.unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_syntax_error_is_located() {
        let err = ENGINE
            .compile("= Title\n#let x = (", ExportKind::Preview)
            .unwrap_err();
        let detail = err.detail();
        assert!(detail.starts_with("error:"), "{detail}");
        assert!(detail.contains("main.typ:2:"), "{detail}");
    }

    #[test]
    fn test_unknown_variable() {
        let err = ENGINE.compile("#nosuchthing", ExportKind::Preview).unwrap_err();
        assert!(err.message.contains("nosuchthing"), "{}", err.message);
    }
}
