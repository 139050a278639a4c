//! # Document Model
//!
//! The input representation for the layout engine. A table document is a
//! table definition plus the page it is being laid out onto and the knobs
//! that steer row balancing and page splitting.
//!
//! Everything here deserializes from JSON with camelCase field names and
//! sensible defaults, so the smallest useful document is just a table with
//! columns and cells.

pub mod table;

pub use table::*;

use serde::{Deserialize, Serialize};

/// A complete table document ready for layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDocument {
    /// The table to lay out.
    pub table: Table,

    /// Page the table flows into. Defaults to A4 with ~0.75in margins.
    #[serde(default)]
    pub page: PageConfig,

    /// Balancing and splitting behaviour.
    #[serde(default)]
    pub config: LayoutConfig,

    /// Width offered to the table. Defaults to the page content width.
    #[serde(default)]
    pub available_width: Option<f64>,
}

impl TableDocument {
    /// The width the table is resolved against when its width isn't locked.
    pub fn available_width(&self) -> f64 {
        self.available_width
            .unwrap_or_else(|| self.page.content_width())
    }
}

/// Whether content of a given kind may be divided across a page boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitPolicy {
    /// Move the whole unit to the next page rather than breaking it.
    KeepTogether,
    /// Render what fits and carry the remainder forward.
    Split,
}

/// Configuration for row balancing and page splitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Policy for groups of rows joined by a row span.
    #[serde(default = "default_span_policy")]
    pub span_policy: SplitPolicy,

    /// Policy for plain rows that don't belong to a span group.
    #[serde(default = "default_row_policy")]
    pub row_policy: SplitPolicy,

    /// Try a fresh page before splitting a row that doesn't fit.
    #[serde(default = "default_true")]
    pub split_late: bool,

    /// Height tolerance used for every comparison, in points.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Cap on span reconciliation sweeps.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            span_policy: default_span_policy(),
            row_policy: default_row_policy(),
            split_late: true,
            epsilon: default_epsilon(),
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_span_policy() -> SplitPolicy {
    SplitPolicy::KeepTogether
}

fn default_row_policy() -> SplitPolicy {
    SplitPolicy::Split
}

fn default_epsilon() -> f64 {
    0.01
}

fn default_max_iterations() -> usize {
    64
}

fn default_true() -> bool {
    true
}

/// Configuration for a page: size and margins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    /// Page size. Defaults to A4.
    #[serde(default = "PageSize::default")]
    pub size: PageSize,

    /// Page margins in points (1/72 inch).
    #[serde(default = "default_margin")]
    pub margin: Edges,

    /// Space already used at the top of the first page (a running header,
    /// the paragraph the table follows, ...).
    #[serde(default)]
    pub first_page_offset: f64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin: default_margin(),
            first_page_offset: 0.0,
        }
    }
}

fn default_margin() -> Edges {
    Edges::uniform(54.0) // ~0.75 inch
}

impl PageConfig {
    pub fn content_width(&self) -> f64 {
        let (w, _) = self.size.dimensions();
        w - self.margin.horizontal()
    }

    pub fn content_height(&self) -> f64 {
        let (_, h) = self.size.dimensions();
        h - self.margin.vertical()
    }
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Edge values (top, right, bottom, left) used for margins and cell padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub right: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}
