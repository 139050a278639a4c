//! Structured error types for the table layout engine.
//!
//! Every variant except `Parse` is a configuration error: the table definition
//! itself is wrong and the call that noticed it is aborted. Oddities that can
//! be laid out anyway (placeholder rows, rows taller than a page) are not
//! errors; they surface as [`crate::layout::LayoutWarning`]s.

use thiserror::Error;

use crate::model::TableId;

/// The unified error type returned by all public Tabula API functions.
#[derive(Debug, Error)]
pub enum TableError {
    /// A cell was added to a table it (transitively) contains.
    #[error("cannot add a cell containing table {table} to that same table (self-reference)")]
    SelfReference { table: TableId },

    /// A cell declared a column or row span below one.
    #[error("cell {cell} has an invalid span (colSpan {col_span}, rowSpan {row_span}); both must be at least 1")]
    InvalidSpan {
        cell: usize,
        col_span: u32,
        row_span: u32,
    },

    /// A cell spans more columns than the table has.
    #[error("cell {cell} spans {col_span} columns but the table only has {columns}")]
    ColumnSpanTooWide {
        cell: usize,
        col_span: u32,
        columns: usize,
    },

    /// A cell declared a negative or non-finite minimum height.
    #[error("cell {cell} has an invalid minimum height {height}")]
    InvalidMinimumHeight { cell: usize, height: f64 },

    /// The table was declared without columns.
    #[error("a table needs at least one column")]
    NoColumns,

    /// Relative widths must be finite, non-negative and sum to a positive value.
    #[error("invalid relative column widths {widths:?}: they must be non-negative and sum to a positive value")]
    InvalidColumnWidths { widths: Vec<f64> },

    /// A width list did not match the table's column count.
    #[error("expected {expected} column widths, got {got}")]
    ColumnCountMismatch { expected: usize, got: usize },

    /// The resolved total width of the table is zero or negative.
    #[error("table width must be positive, got {width}")]
    NonPositiveWidth { width: f64 },

    /// The page geometry offered no vertical space.
    #[error("available height on page {page} must be positive, got {height}")]
    NonPositivePageHeight { page: usize, height: f64 },

    /// JSON input failed to parse as a valid table document.
    #[error("failed to parse table document: {source}{}", format_hint(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl TableError {
    /// Whether this error is about the table definition rather than the input text.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, TableError::Parse { .. })
    }
}

impl From<serde_json::Error> for TableError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the table document schema. Check field names, spans and column widths.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        TableError::Parse { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_hint() {
        let err: TableError = serde_json::from_str::<serde_json::Value>("{ \"a\": 1,, }")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.contains("Hint: Check for trailing commas"), "{msg}");
        assert!(!err.is_configuration());
    }

    #[test]
    fn configuration_errors_name_the_cell() {
        let err = TableError::InvalidSpan {
            cell: 4,
            col_span: 0,
            row_span: 1,
        };
        assert!(err.is_configuration());
        assert!(err.to_string().contains("cell 4"));
    }
}
