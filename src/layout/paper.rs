//! Candidate paper heights, in points.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paper {
    pub name: &'static str,
    pub height: f64,
}

pub const LETTER: Paper = Paper {
    name: "Letter",
    height: 792.0,
};

pub const A4: Paper = Paper {
    name: "A4",
    height: 841.89,
};

pub const LEGAL: Paper = Paper {
    name: "Legal",
    height: 1008.0,
};

/// Checked in this order; first match wins.
pub const CANDIDATES: [Paper; 3] = [LETTER, A4, LEGAL];

/// A document up to 20% taller than a page still counts as one page.
pub const SINGLE_PAGE_TOLERANCE: f64 = 1.2;

/// The last page of a multi-page split must be at least 30% full.
pub const MIN_LAST_PAGE_FILL: f64 = 0.3;
