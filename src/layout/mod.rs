//! # Table Layout Engine
//!
//! A table is laid out in three steps, each page-aware from the start:
//!
//! 1. Resolve absolute column widths from the relative proportions
//!    ([`columns`]).
//! 2. Balance row heights: every cell fits its row, every row-spanning cell
//!    fits the rows it spans ([`balance`]).
//! 3. Split the balanced rows into page-sized slices, repeating headers and
//!    footers and carrying cut spans forward ([`page_break`]).
//!
//! Layout never mutates the table. The engine is generic over the content
//! measurer so a writer with real font metrics can plug its own in.

pub mod balance;
pub mod columns;
pub mod grid;
pub mod measure;
pub mod page_break;

use serde::Serialize;

use crate::error::TableError;
use crate::model::{LayoutConfig, Table};

pub use balance::{BalancedRows, RowHeightBalancer};
pub use grid::CellId;
pub use measure::{ContentMeasurer, FnMeasurer, Measure};
pub use page_break::{
    CarryOver, PageGeometry, PageSplitter, RowRemainder, SpanRemainder, SplitResult, SplitState,
};

/// A recovered anomaly. Layout carries on; the warning is logged and
/// returned alongside the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayoutWarning {
    /// A placeholder row was laid out at zero height.
    PlaceholderRow { row: usize },
    /// Span reconciliation hit the sweep cap before settling.
    IterationCapExceeded { iterations: usize },
    /// A cell's column span was narrowed to the free run at placement.
    ColumnSpanClamped {
        cell: CellId,
        requested: usize,
        placed: usize,
    },
    /// More header and footer rows were declared than the table has.
    HeaderFooterClamped {
        header_rows: usize,
        footer_rows: usize,
        rows: usize,
    },
    /// The repeated header and footer left no room for body rows.
    HeaderFooterTooTall {
        page: usize,
        height: f64,
        available: f64,
    },
    /// A row taller than a whole page.
    OversizedRow {
        row: usize,
        height: f64,
        available: f64,
    },
    /// A keep-together span group taller than a whole page.
    OversizedSpanGroup {
        start: usize,
        end: usize,
        height: f64,
        available: f64,
    },
}

impl std::fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutWarning::PlaceholderRow { row } => {
                write!(f, "row {row} is a placeholder, laid out at zero height")
            }
            LayoutWarning::IterationCapExceeded { iterations } => write!(
                f,
                "row spans did not settle after {iterations} sweeps, using last heights"
            ),
            LayoutWarning::ColumnSpanClamped {
                cell,
                requested,
                placed,
            } => write!(f, "cell {cell}: column span {requested} clamped to {placed}"),
            LayoutWarning::HeaderFooterClamped {
                header_rows,
                footer_rows,
                rows,
            } => write!(
                f,
                "header/footer clamped to {header_rows}/{footer_rows} rows for a {rows}-row table"
            ),
            LayoutWarning::HeaderFooterTooTall {
                page,
                height,
                available,
            } => write!(
                f,
                "page {page}: header and footer ({height:.2}pt) leave no room in {available:.2}pt, dropped"
            ),
            LayoutWarning::OversizedRow {
                row,
                height,
                available,
            } => write!(
                f,
                "row {row} ({height:.2}pt) is taller than the page ({available:.2}pt)"
            ),
            LayoutWarning::OversizedSpanGroup {
                start,
                end,
                height,
                available,
            } => write!(
                f,
                "rows {start}..{end} ({height:.2}pt) can't be kept together on a {available:.2}pt page, splitting"
            ),
        }
    }
}

/// Log a warning and keep it for the caller.
pub(crate) fn report(warnings: &mut Vec<LayoutWarning>, warning: LayoutWarning) {
    log::warn!("{}", warning);
    warnings.push(warning);
}

/// The complete layout of one table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableLayout {
    pub column_widths: Vec<f64>,
    /// Left edge of each column, measured from the table's left edge.
    pub column_offsets: Vec<f64>,
    pub row_heights: Vec<f64>,
    pub total_height: f64,
    /// Span reconciliation sweeps performed while balancing.
    pub iterations: usize,
    pub pages: Vec<SplitResult>,
    /// Every warning raised, in order.
    pub warnings: Vec<LayoutWarning>,
}

pub struct LayoutEngine<M: Measure = ContentMeasurer> {
    measurer: M,
    config: LayoutConfig,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            measurer: ContentMeasurer::with_config(config.clone()),
            config,
        }
    }
}

impl<M: Measure> LayoutEngine<M> {
    /// Lay out with a custom content measurer.
    pub fn with_measurer(measurer: M, config: LayoutConfig) -> Self {
        Self { measurer, config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn resolve_column_widths(&self, table: &Table, available_width: f64) -> Result<Vec<f64>, TableError> {
        columns::resolve_column_widths(table, available_width)
    }

    pub fn balance_row_heights(&self, table: &Table, column_widths: &[f64]) -> Result<BalancedRows, TableError> {
        RowHeightBalancer::new(&self.measurer, &self.config).balance(table, column_widths)
    }

    /// Build a splitter over already balanced rows. Build it once per layout
    /// and call [`PageSplitter::split_for_page`] page by page; it holds the
    /// prefix sums and span groups every slice reuses.
    pub fn splitter<'a>(&'a self, table: &'a Table, balanced: &'a BalancedRows) -> PageSplitter<'a> {
        PageSplitter::new(table, balanced, &self.config)
    }

    /// Resolve widths, balance rows and split across the pages of `geometry`.
    pub fn layout<G: PageGeometry + ?Sized>(
        &self,
        table: &Table,
        available_width: f64,
        geometry: &G,
    ) -> Result<TableLayout, TableError> {
        let column_widths = self.resolve_column_widths(table, available_width)?;
        let balanced = self.balance_row_heights(table, &column_widths)?;
        let pages = self.splitter(table, &balanced).paginate(geometry)?;

        let mut warnings = clamped_spans(table);
        warnings.extend(balanced.warnings.iter().cloned());
        for page in &pages {
            warnings.extend(page.warnings.iter().cloned());
        }

        log::debug!(
            "table {}: {} rows, {:.2}pt tall, {} page(s), {} warning(s)",
            table.id(),
            balanced.heights.len(),
            balanced.total_height(),
            pages.len(),
            warnings.len()
        );

        let column_offsets = (0..column_widths.len())
            .map(|col| grid::column_x_offset(col, &column_widths))
            .collect();

        Ok(TableLayout {
            column_offsets,
            total_height: balanced.total_height(),
            column_widths,
            row_heights: balanced.heights,
            iterations: balanced.iterations,
            pages,
            warnings,
        })
    }
}

/// Cells whose column span was narrowed at placement. Already logged when
/// the cell was added.
fn clamped_spans(table: &Table) -> Vec<LayoutWarning> {
    table
        .cells()
        .iter()
        .enumerate()
        .filter(|(_, placed)| placed.col_span < placed.cell.col_span as usize)
        .map(|(i, placed)| LayoutWarning::ColumnSpanClamped {
            cell: CellId(i),
            requested: placed.cell.col_span as usize,
            placed: placed.col_span,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, Content};

    #[test]
    fn layout_reports_every_phase() {
        let mut table = Table::new(vec![1.0, 1.0]).unwrap();
        table.add_cell(Cell::spacer(30.0).with_row_span(2)).unwrap();
        table.add_cell(Cell::spacer(5.0)).unwrap();
        table.add_cell(Cell::spacer(5.0)).unwrap();
        table.add_cell(Cell::spacer(40.0)).unwrap();
        table.add_cell(Cell::spacer(40.0)).unwrap();

        let layout = LayoutEngine::new().layout(&table, 200.0, &100.0).unwrap();
        assert_eq!(layout.column_widths, vec![100.0, 100.0]);
        assert_eq!(layout.column_offsets, vec![0.0, 100.0]);
        assert_eq!(layout.row_heights.len(), 3);
        assert!((layout.row_heights[0] - 15.0).abs() < 0.01);
        assert!((layout.row_heights[1] - 15.0).abs() < 0.01);
        assert!((layout.total_height - 70.0).abs() < 0.01);
        assert_eq!(layout.pages.len(), 1);
        assert!(layout.warnings.is_empty());
    }

    #[test]
    fn one_splitter_serves_every_page() {
        let mut table = Table::with_columns(1).unwrap();
        for _ in 0..5 {
            table.add_cell(Cell::spacer(40.0)).unwrap();
        }
        let engine = LayoutEngine::new();
        let widths = engine.resolve_column_widths(&table, 100.0).unwrap();
        let balanced = engine.balance_row_heights(&table, &widths).unwrap();
        let splitter = engine.splitter(&table, &balanced);

        let mut state = SplitState::default();
        let mut ranges = Vec::new();
        loop {
            let slice = splitter.split_for_page(&state, 100.0).unwrap();
            ranges.push(slice.rows.clone());
            if slice.is_last {
                break;
            }
            state = slice.next_state();
        }
        assert_eq!(ranges, vec![0..2, 2..4, 4..5]);
    }

    #[test]
    fn custom_measurer() {
        let mut table = Table::with_columns(2).unwrap();
        table.add_cell(Cell::empty()).unwrap();
        table.add_cell(Cell::empty()).unwrap();
        let engine = LayoutEngine::with_measurer(
            FnMeasurer(|_: &Content, w: f64| 1000.0 / w),
            LayoutConfig::default(),
        );
        let layout = engine.layout(&table, 100.0, &500.0).unwrap();
        assert!((layout.row_heights[0] - 20.0).abs() < 0.01);
    }

    #[test]
    fn clamped_column_span_is_reported() {
        let mut table = Table::with_columns(3).unwrap();
        table.add_cell(Cell::empty().with_row_span(2)).unwrap();
        table.add_cell(Cell::empty()).unwrap();
        table.add_cell(Cell::empty()).unwrap();
        // Row 1 column 0 is claimed; a span of 3 only gets columns 1..3.
        table.add_cell(Cell::empty().with_col_span(3)).unwrap();
        let layout = LayoutEngine::new().layout(&table, 300.0, &100.0).unwrap();
        assert!(layout.warnings.contains(&LayoutWarning::ColumnSpanClamped {
            cell: CellId(3),
            requested: 3,
            placed: 2,
        }));
    }

    #[test]
    fn warning_messages_name_the_row() {
        let warning = LayoutWarning::OversizedRow {
            row: 7,
            height: 900.0,
            available: 700.0,
        };
        assert!(warning.to_string().contains("row 7"));
    }
}
