//! # Tabula
//!
//! A page-native table layout engine for document writers.
//!
//! Tables in PDF and RTF output tend to break in the same places: a cell
//! spanning three rows overflows because the rows were sized without it, or
//! the rows under it stretch unevenly, or a page break lands in the middle of
//! a span and the writer has no idea how much of the cell is left.
//!
//! Tabula computes the geometry a writer needs before anything is painted:
//! absolute column widths, row heights that honour every row span, and the
//! page slices the table falls into, with repeated headers and footers and a
//! description of every cell cut by a break.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/API)
//!       ↓
//!   [model]    : Table definition: columns, cells, spans, page, config
//!       ↓
//!   [layout]   : Column widths → balanced rows → page slices
//!       ↓
//!   TableLayout (serializable)
//! ```

pub mod error;
pub mod layout;
pub mod model;
pub mod text;

#[cfg(feature = "wasm")]
pub mod wasm;

use error::TableError;
use layout::{LayoutEngine, TableLayout};
use model::TableDocument;

/// Lay out a table document.
///
/// This is the primary entry point: widths are resolved against the
/// document's available width (or the page content width) and the table is
/// split across pages of the document's page size.
pub fn layout(document: &TableDocument) -> Result<TableLayout, TableError> {
    let engine = LayoutEngine::with_config(document.config.clone());
    engine.layout(&document.table, document.available_width(), &document.page)
}

/// Lay out a table document described as JSON.
pub fn layout_json(json: &str) -> Result<TableLayout, TableError> {
    let document: TableDocument = serde_json::from_str(json)?;
    layout(&document)
}

/// Lay out a JSON table document and return the layout as pretty JSON.
pub fn layout_json_to_string(json: &str) -> Result<String, TableError> {
    let result = layout_json(json)?;
    serde_json::to_string_pretty(&result).map_err(TableError::from)
}
