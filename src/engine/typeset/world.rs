//! A `World` over one in-memory source.
//!
//! The editor compiles a single buffer with no imports from disk, so the
//! world exposes exactly one file: `/main.typ`.

use std::sync::LazyLock;

use chrono::Datelike;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, World};

use super::font::FontSet;
use super::library::GLOBAL_LIBRARY;

pub static MAIN_ID: LazyLock<FileId> =
    LazyLock::new(|| FileId::new(None, VirtualPath::new("main.typ")));

pub struct SourceWorld<'a> {
    fonts: &'a FontSet,
    main: Source,
}

impl<'a> SourceWorld<'a> {
    pub fn new(fonts: &'a FontSet, text: &str) -> Self {
        Self {
            fonts,
            main: Source::new(*MAIN_ID, text.to_string()),
        }
    }
}

impl World for SourceWorld<'_> {
    fn library(&self) -> &LazyHash<Library> {
        &GLOBAL_LIBRARY
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.fonts.book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(not_found(id))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        if id == self.main.id() {
            Ok(Bytes::from_string(self.main.text().to_string()))
        } else {
            Err(not_found(id))
        }
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.fonts.get(index).cloned()
    }

    fn today(&self, offset: Option<i64>) -> Option<Datetime> {
        let now = chrono::Utc::now();
        let date = match offset {
            Some(hours) => (now + chrono::Duration::hours(hours)).date_naive(),
            None => chrono::Local::now().date_naive(),
        };
        Datetime::from_ymd(
            date.year(),
            u8::try_from(date.month()).ok()?,
            u8::try_from(date.day()).ok()?,
        )
    }
}

fn not_found(id: FileId) -> FileError {
    FileError::NotFound(id.vpath().as_rootless_path().to_path_buf())
}
