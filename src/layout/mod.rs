//! Pagination of compiled vector output.
//!
//! The engine produces one continuous canvas. For on-screen paging it is
//! cut into windows matching a common paper size:
//!
//! ```text
//! viewBox (x, y, w, H) ──fit_pages(H)──► PageFit { pages, page_height }
//!                       ──plan()──────► [PageSlice]
//!                       ──paginate()──► [PageFragment] (same content, clipped viewBox)
//! ```
//!
//! Everything here is a pure function of the input.

mod paginate;
mod paper;
mod viewbox;

pub use paginate::{PageFit, PageFragment, PageSlice, Pagination, fit_pages, paginate, plan};
pub use paper::Paper;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LayoutError {
    #[error("compiled output has no root <svg> element")]
    MissingRoot,

    #[error("root <svg> element has no viewBox")]
    MissingViewBox,

    #[error("invalid viewBox `{0}`")]
    InvalidViewBox(String),
}
