//! # Tables and Cells
//!
//! The builder-side representation of a table. Cells are appended one at a
//! time and placed into the grid immediately; widths and heights are only
//! resolved later, at layout time.
//!
//! A table can be built in code:
//!
//! ```
//! use tabula::model::{Cell, Table};
//!
//! let mut table = Table::new(vec![1.0, 2.0]).unwrap();
//! table.add_cell(Cell::text("spans two rows").with_row_span(2)).unwrap();
//! table.add_cell(Cell::text("first")).unwrap();
//! table.add_cell(Cell::text("second")).unwrap();
//! assert_eq!(table.row_count(), 2);
//! ```
//!
//! or deserialized from JSON through [`TableDef`].

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::Edges;
use crate::error::TableError;
use crate::layout::grid::{CellGrid, CellId, PlacedCell, RowSlot};

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a table. Clones share it: a clone is the same logical table,
/// which is what the self-reference guard relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TableId(u64);

impl TableId {
    fn next() -> Self {
        TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Text styling that matters for measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Line height as a multiple of the font size.
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    /// Average advance of one character as a fraction of the font size.
    #[serde(default = "default_char_width")]
    pub char_width: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            line_height: default_line_height(),
            char_width: default_char_width(),
        }
    }
}

impl TextStyle {
    /// Height of one line in points.
    pub fn line_pitch(&self) -> f64 {
        self.font_size * self.line_height
    }
}

fn default_font_size() -> f64 {
    12.0
}

fn default_line_height() -> f64 {
    1.2
}

fn default_char_width() -> f64 {
    0.5
}

/// What a cell holds. Opaque to the layout engine except through the
/// content measurer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    /// Nothing; measures as zero height.
    #[default]
    Empty,
    /// A paragraph of text. Explicit newlines force line breaks.
    Text {
        content: String,
        #[serde(default)]
        style: TextStyle,
    },
    /// Fixed-height content (images, rules, pre-measured blocks).
    Spacer { height: f64 },
    /// A nested table laid out at the cell's inner width.
    Table { table: Box<Table> },
}

impl Content {
    /// Whether this content is, or transitively contains, the given table.
    pub fn contains_table(&self, id: TableId) -> bool {
        match self {
            Content::Table { table } => {
                table.id == id
                    || table
                        .grid
                        .cells()
                        .iter()
                        .any(|placed| placed.cell.content.contains_table(id))
            }
            _ => false,
        }
    }
}

fn default_one() -> u32 {
    1
}

/// A single cell. Spans default to 1, the minimum height to 0.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    #[serde(default)]
    pub content: Content,
    #[serde(default = "default_one")]
    pub col_span: u32,
    #[serde(default = "default_one")]
    pub row_span: u32,
    /// Floor on the row (single-row cells) or the summed span (spanning cells).
    #[serde(default)]
    pub minimum_height: f64,
    #[serde(default)]
    pub padding: Edges,
}

impl Cell {
    pub fn new(content: Content) -> Self {
        Self {
            content,
            col_span: 1,
            row_span: 1,
            minimum_height: 0.0,
            padding: Edges::default(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Content::Empty)
    }

    /// A text cell with the default text style.
    pub fn text(content: &str) -> Self {
        Self::new(Content::Text {
            content: content.to_string(),
            style: TextStyle::default(),
        })
    }

    pub fn styled_text(content: &str, style: TextStyle) -> Self {
        Self::new(Content::Text {
            content: content.to_string(),
            style,
        })
    }

    pub fn spacer(height: f64) -> Self {
        Self::new(Content::Spacer { height })
    }

    /// A cell wrapping a nested table.
    pub fn table(table: Table) -> Self {
        Self::new(Content::Table {
            table: Box::new(table),
        })
    }

    pub fn with_col_span(mut self, span: u32) -> Self {
        self.col_span = span;
        self
    }

    pub fn with_row_span(mut self, span: u32) -> Self {
        self.row_span = span;
        self
    }

    pub fn with_minimum_height(mut self, height: f64) -> Self {
        self.minimum_height = height;
        self
    }

    pub fn with_padding(mut self, padding: Edges) -> Self {
        self.padding = padding;
        self
    }
}

/// How column widths are declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnWidths {
    /// Proportions of the table width.
    Relative(Vec<f64>),
    /// Widths in points. Fixes the total width to their sum and locks it.
    Absolute(Vec<f64>),
}

/// A table under construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "TableDef")]
pub struct Table {
    id: TableId,
    relative_widths: Vec<f64>,
    total_width: Option<f64>,
    locked_width: bool,
    width_percentage: f64,
    header_rows: usize,
    footer_rows: usize,
    skip_first_header: bool,
    skip_last_footer: bool,
    keep_together: bool,
    extend_last_row: bool,
    extend_final_row: bool,
    grid: CellGrid,
}

fn validate_relative(widths: &[f64]) -> Result<(), TableError> {
    if widths.is_empty() {
        return Err(TableError::NoColumns);
    }
    let valid = widths.iter().all(|w| w.is_finite() && *w >= 0.0);
    if !valid || widths.iter().sum::<f64>() <= 0.0 {
        return Err(TableError::InvalidColumnWidths {
            widths: widths.to_vec(),
        });
    }
    Ok(())
}

impl Table {
    /// Create a table with the given relative column widths.
    pub fn new(relative_widths: Vec<f64>) -> Result<Self, TableError> {
        validate_relative(&relative_widths)?;
        let columns = relative_widths.len();
        Ok(Self {
            id: TableId::next(),
            relative_widths,
            total_width: None,
            locked_width: false,
            width_percentage: 100.0,
            header_rows: 0,
            footer_rows: 0,
            skip_first_header: false,
            skip_last_footer: false,
            keep_together: false,
            extend_last_row: false,
            extend_final_row: false,
            grid: CellGrid::new(columns),
        })
    }

    /// Create a table with `columns` equal columns.
    pub fn with_columns(columns: usize) -> Result<Self, TableError> {
        Self::new(vec![1.0; columns])
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    /// Append a cell at the next free grid slot.
    ///
    /// Fails when a span is below 1, when the column span is wider than the
    /// table, or when the cell contains this very table.
    pub fn add_cell(&mut self, cell: Cell) -> Result<CellId, TableError> {
        let index = self.grid.next_id().0;

        if cell.col_span < 1 || cell.row_span < 1 {
            return Err(TableError::InvalidSpan {
                cell: index,
                col_span: cell.col_span,
                row_span: cell.row_span,
            });
        }
        if cell.col_span as usize > self.columns() {
            return Err(TableError::ColumnSpanTooWide {
                cell: index,
                col_span: cell.col_span,
                columns: self.columns(),
            });
        }
        if !cell.minimum_height.is_finite() || cell.minimum_height < 0.0 {
            return Err(TableError::InvalidMinimumHeight {
                cell: index,
                height: cell.minimum_height,
            });
        }
        if cell.content.contains_table(self.id) {
            return Err(TableError::SelfReference { table: self.id });
        }

        let requested = cell.col_span as usize;
        let placement = self.grid.place(cell);
        if placement.col_span < requested {
            log::warn!(
                "cell {} at row {}, column {}: column span {} clamped to {}",
                placement.id,
                placement.row,
                placement.column,
                requested,
                placement.col_span
            );
        }
        Ok(placement.id)
    }

    /// Append a text cell with the default style.
    pub fn add_text(&mut self, content: &str) -> Result<CellId, TableError> {
        self.add_cell(Cell::text(content))
    }

    /// Close the current row; the next cell starts a new row.
    pub fn complete_row(&mut self) {
        self.grid.complete_row();
    }

    /// Close the current row and insert an empty placeholder row.
    /// Returns the placeholder's row index.
    pub fn push_placeholder_row(&mut self) -> usize {
        self.grid.push_placeholder_row()
    }

    pub fn set_column_widths(&mut self, widths: ColumnWidths) -> Result<(), TableError> {
        let (values, absolute) = match widths {
            ColumnWidths::Relative(v) => (v, false),
            ColumnWidths::Absolute(v) => (v, true),
        };
        if values.len() != self.columns() {
            return Err(TableError::ColumnCountMismatch {
                expected: self.columns(),
                got: values.len(),
            });
        }
        validate_relative(&values)?;
        if absolute {
            self.total_width = Some(values.iter().sum());
            self.locked_width = true;
        }
        self.relative_widths = values;
        Ok(())
    }

    pub fn set_total_width(&mut self, width: f64) {
        self.total_width = Some(width);
    }

    /// Use the total width as-is instead of deriving it from the available width.
    pub fn set_locked_width(&mut self, locked: bool) {
        self.locked_width = locked;
    }

    pub fn set_width_percentage(&mut self, percentage: f64) {
        self.width_percentage = percentage;
    }

    pub fn set_header_rows(&mut self, rows: usize) {
        self.header_rows = rows;
    }

    pub fn set_footer_rows(&mut self, rows: usize) {
        self.footer_rows = rows;
    }

    pub fn set_skip_first_header(&mut self, skip: bool) {
        self.skip_first_header = skip;
    }

    pub fn set_skip_last_footer(&mut self, skip: bool) {
        self.skip_last_footer = skip;
    }

    /// Start the table on the next page when it does not fit on the current
    /// one but would fit whole on the next.
    pub fn set_keep_together(&mut self, keep: bool) {
        self.keep_together = keep;
    }

    /// Stretch the last body row of a slice down to the page's bottom:
    /// `extend_last_rows` on slices the table continues from, `extend_final_row`
    /// on the slice that ends it.
    pub fn set_extend_last_row(&mut self, extend_last_rows: bool, extend_final_row: bool) {
        self.extend_last_row = extend_last_rows;
        self.extend_final_row = extend_final_row;
    }

    pub fn columns(&self) -> usize {
        self.relative_widths.len()
    }

    pub fn relative_widths(&self) -> &[f64] {
        &self.relative_widths
    }

    pub fn total_width(&self) -> Option<f64> {
        self.total_width
    }

    pub fn is_locked_width(&self) -> bool {
        self.locked_width
    }

    pub fn width_percentage(&self) -> f64 {
        self.width_percentage
    }

    pub fn header_rows(&self) -> usize {
        self.header_rows
    }

    pub fn footer_rows(&self) -> usize {
        self.footer_rows
    }

    pub fn skip_first_header(&self) -> bool {
        self.skip_first_header
    }

    pub fn skip_last_footer(&self) -> bool {
        self.skip_last_footer
    }

    pub fn keep_together(&self) -> bool {
        self.keep_together
    }

    pub fn extend_last_row(&self) -> bool {
        self.extend_last_row
    }

    pub fn extend_final_row(&self) -> bool {
        self.extend_final_row
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    pub fn rows(&self) -> &[RowSlot] {
        self.grid.rows()
    }

    pub fn row_count(&self) -> usize {
        self.grid.rows().len()
    }

    /// The placed cell for `id`, or `None` when `id` belongs to another table.
    pub fn cell(&self, id: CellId) -> Option<&PlacedCell> {
        self.grid.cell(id)
    }

    pub(crate) fn placed(&self, id: CellId) -> &PlacedCell {
        self.grid.placed(id)
    }

    pub fn cells(&self) -> &[PlacedCell] {
        self.grid.cells()
    }
}

/// One entry of a serialized table, in insertion order.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TableItem {
    Cell(Cell),
    CompleteRow,
    PlaceholderRow,
}

/// Serialized form of a [`Table`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDef {
    pub columns: ColumnWidths,
    #[serde(default)]
    pub total_width: Option<f64>,
    #[serde(default)]
    pub locked_width: bool,
    #[serde(default = "default_percentage")]
    pub width_percentage: f64,
    #[serde(default)]
    pub header_rows: usize,
    #[serde(default)]
    pub footer_rows: usize,
    #[serde(default)]
    pub skip_first_header: bool,
    #[serde(default)]
    pub skip_last_footer: bool,
    #[serde(default)]
    pub keep_together: bool,
    #[serde(default)]
    pub extend_last_row: bool,
    #[serde(default)]
    pub extend_final_row: bool,
    #[serde(default)]
    pub items: Vec<TableItem>,
}

fn default_percentage() -> f64 {
    100.0
}

impl TryFrom<TableDef> for Table {
    type Error = TableError;

    fn try_from(def: TableDef) -> Result<Self, Self::Error> {
        let columns = match &def.columns {
            ColumnWidths::Relative(v) | ColumnWidths::Absolute(v) => v.len(),
        };
        let mut table = Table::with_columns(columns)?;
        table.set_column_widths(def.columns)?;
        if let Some(w) = def.total_width {
            table.set_total_width(w);
        }
        if def.locked_width {
            table.set_locked_width(true);
        }
        table.set_width_percentage(def.width_percentage);
        table.set_header_rows(def.header_rows);
        table.set_footer_rows(def.footer_rows);
        table.set_skip_first_header(def.skip_first_header);
        table.set_skip_last_footer(def.skip_last_footer);
        table.set_keep_together(def.keep_together);
        table.set_extend_last_row(def.extend_last_row, def.extend_final_row);

        for item in def.items {
            match item {
                TableItem::Cell(cell) => {
                    table.add_cell(cell)?;
                }
                TableItem::CompleteRow => table.complete_row(),
                TableItem::PlaceholderRow => {
                    table.push_placeholder_row();
                }
            }
        }
        Ok(table)
    }
}
