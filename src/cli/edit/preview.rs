//! Preview output: page files on disk plus the terminal status block.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::layout::Pagination;
use crate::log;
use crate::logger::{status_detach, status_error, status_success, status_warning};
use crate::scheduler::SnapshotId;
use crate::session::{Notice, NoticeLevel, Phase, Preview, SessionView};

fn page_file(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("page-{}.svg", index + 1))
}

/// Writes `page-N.svg` files, removing pages left over from a longer
/// previous render.
pub struct PageWriter {
    dir: PathBuf,
    written: usize,
}

impl PageWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, written: 0 }
    }

    pub fn write(&mut self, pagination: &Pagination) -> Result<()> {
        for fragment in &pagination.pages {
            let path = page_file(&self.dir, fragment.slice.index);
            fs::write(&path, &fragment.svg)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        for index in pagination.page_count()..self.written {
            let _ = fs::remove_file(page_file(&self.dir, index));
        }
        self.written = pagination.page_count();
        Ok(())
    }
}

/// Renders view changes once each.
pub struct StatusRenderer {
    pages: PageWriter,
    preview: Option<SnapshotId>,
    notice: Option<Notice>,
    phase: Phase,
}

impl StatusRenderer {
    pub fn new(pages: PageWriter) -> Self {
        Self {
            pages,
            preview: None,
            notice: None,
            phase: Phase::Loading,
        }
    }

    pub fn update(&mut self, view: &SessionView) -> Result<()> {
        if view.notice != self.notice {
            self.notice.clone_from(&view.notice);
            if let Some(notice) = &view.notice {
                show_notice(notice);
            }
        }

        if view.phase != self.phase {
            self.phase = view.phase;
            if view.phase == Phase::Conflict
                && let Some(conflict) = view.conflict
            {
                log!("conflict"; "remote copy changed at {} (yours: {})", conflict.remote, conflict.local);
                log!("conflict"; ":keep overwrites it, :reload discards your changes");
                status_detach();
            }
        }

        if view.preview_snapshot != self.preview {
            self.preview = view.preview_snapshot;
            self.show_preview(view)?;
        }
        Ok(())
    }

    fn show_preview(&mut self, view: &SessionView) -> Result<()> {
        match &view.preview {
            Preview::Pages(pagination) => {
                self.pages.write(pagination)?;
                let count = pagination.page_count();
                let summary = format!(
                    "preview: {} {} ({})",
                    count,
                    if count == 1 { "page" } else { "pages" },
                    pagination.paper_name()
                );
                if view.warnings.is_empty() {
                    status_success(&summary);
                } else {
                    status_warning(&format!("{summary}\n{}", view.warnings.join("\n")));
                }
            }
            Preview::Error(error) => status_error("compile failed", &error.detail()),
            Preview::Unavailable(error) => {
                status_error("preview unavailable", &format!("{error}; :r to retry"));
            }
            Preview::Empty => status_success("preview: empty document"),
            Preview::Pending => {}
        }
        Ok(())
    }
}

fn show_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Info => log!("save"; "{}", notice.message),
        NoticeLevel::Warning => log!("warning"; "{}", notice.message),
        NoticeLevel::Error => log!("error"; "{}", notice.message),
    }
    status_detach();
}
