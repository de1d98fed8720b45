//! Split one tall canvas into paper-sized pages.

use super::LayoutError;
use super::paper::{CANDIDATES, MIN_LAST_PAGE_FILL, Paper, SINGLE_PAGE_TOLERANCE};
use super::viewbox::{RootTag, ViewBox, num, set_attribute};

/// How many pages, and how tall each is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFit {
    pub pages: usize,
    pub page_height: f64,
    /// `None` for the two-page fallback.
    pub paper: Option<Paper>,
}

/// Pick a page count and height for a canvas of `total_height` points.
///
/// 1. Fits on one page of a candidate (with tolerance): one page.
/// 2. Splits over a candidate with a reasonably full last page.
/// 3. Otherwise two equal halves.
pub fn fit_pages(total_height: f64) -> PageFit {
    if let Some(paper) = CANDIDATES
        .iter()
        .find(|p| total_height <= p.height * SINGLE_PAGE_TOLERANCE)
    {
        return PageFit {
            pages: 1,
            page_height: paper.height,
            paper: Some(*paper),
        };
    }

    for paper in CANDIDATES {
        let pages = (total_height / paper.height).ceil();
        let last_page = total_height - (pages - 1.0) * paper.height;
        if last_page >= MIN_LAST_PAGE_FILL * paper.height {
            return PageFit {
                // finite and >= 2 here
                pages: pages as usize,
                page_height: paper.height,
                paper: Some(paper),
            };
        }
    }

    PageFit {
        pages: 2,
        page_height: total_height / 2.0,
        paper: None,
    }
}

/// One page window over the source canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSlice {
    pub index: usize,
    /// Offset from the top of the canvas.
    pub y_start: f64,
    /// Height rendered for this page.
    pub height: f64,
}

/// Consecutive windows of `fit.page_height`; the last one takes whatever
/// remains, so the windows always cover the whole canvas.
pub fn plan(total_height: f64, fit: &PageFit) -> Vec<PageSlice> {
    (0..fit.pages)
        .map(|index| {
            let y_start = index as f64 * fit.page_height;
            let height = if index + 1 == fit.pages {
                total_height - y_start
            } else {
                fit.page_height
            };
            PageSlice {
                index,
                y_start,
                height,
            }
        })
        .collect()
}

/// A standalone page: the full vector content clipped by its `viewBox`.
#[derive(Debug, Clone)]
pub struct PageFragment {
    pub slice: PageSlice,
    pub svg: String,
}

#[derive(Debug, Clone)]
pub struct Pagination {
    pub fit: PageFit,
    pub pages: Vec<PageFragment>,
}

impl Pagination {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// `Letter`, `A4`, `Legal`, or `adaptive`.
    pub fn paper_name(&self) -> &'static str {
        self.fit.paper.map_or("adaptive", |p| p.name)
    }
}

/// Paginate compiled vector output.
pub fn paginate(svg: &str) -> Result<Pagination, LayoutError> {
    let root = RootTag::find(svg)?;
    let view_box = root.view_box;
    let fit = fit_pages(view_box.height);

    let pages = plan(view_box.height, &fit)
        .into_iter()
        .map(|slice| PageFragment {
            svg: render_page(&root, &slice),
            slice,
        })
        .collect();

    Ok(Pagination { fit, pages })
}

fn render_page(root: &RootTag<'_>, slice: &PageSlice) -> String {
    let view_box = ViewBox {
        y: root.view_box.y + slice.y_start,
        height: slice.height,
        ..root.view_box
    };
    let tag = set_attribute(root.tag(), "viewBox", &view_box.to_string());
    let tag = set_attribute(&tag, "width", &format!("{}pt", num(view_box.width)));
    let tag = set_attribute(&tag, "height", &format!("{}pt", num(view_box.height)));
    root.with_tag(&tag)
}
