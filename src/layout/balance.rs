//! # Row Height Balancing
//!
//! Computes the height of every row so that:
//!
//! 1. each single-row cell fits in its row,
//! 2. each row-spanning cell fits in the sum of the rows it spans,
//! 3. every cell's minimum height is honoured (on its row, or on its span).
//!
//! Pass 1 sets each row to the tallest single-row cell it holds. Pass 2 walks
//! the spanning cells and, when the rows under a span are too short in
//! total, spreads the deficit over them by raising the shortest rows first.
//! Rows end up equal unless one of them already needs more on its own, in
//! which case that row keeps its height and the rest share the remainder.
//! Pass 2 repeats until no span is short (overlapping spans can interact),
//! bounded by `max_iterations`.

use serde::Serialize;

use super::grid::{span_width, CellId, PlacedCell, RowSlot};
use super::measure::{Measure, MeasureCache};
use super::{report, LayoutWarning};
use crate::error::TableError;
use crate::model::{LayoutConfig, Table};

/// Balanced row heights for one table at one set of column widths.
#[derive(Debug, Clone, Serialize)]
pub struct BalancedRows {
    /// Height of each row, placeholders included (as zero).
    pub heights: Vec<f64>,
    /// Height each cell needs, indexed by [`CellId`].
    pub required: Vec<f64>,
    /// Span reconciliation sweeps performed.
    pub iterations: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<LayoutWarning>,
}

impl BalancedRows {
    pub fn total_height(&self) -> f64 {
        self.heights.iter().sum()
    }

    /// Summed height of rows `start..end`.
    pub fn span_height(&self, start: usize, end: usize) -> f64 {
        let end = end.min(self.heights.len());
        if start >= end {
            return 0.0;
        }
        self.heights[start..end].iter().sum()
    }

    pub fn required_height(&self, cell: CellId) -> f64 {
        self.required.get(cell.0).copied().unwrap_or(0.0)
    }
}

/// Balances row heights using a content measurer.
///
/// Measurements are cached per (cell, width) for the lifetime of the balancer,
/// so one balancer should be used for one layout pass.
pub struct RowHeightBalancer<'a, M: Measure + ?Sized> {
    measurer: &'a M,
    config: &'a LayoutConfig,
    cache: MeasureCache,
}

impl<'a, M: Measure + ?Sized> RowHeightBalancer<'a, M> {
    pub fn new(measurer: &'a M, config: &'a LayoutConfig) -> Self {
        Self {
            measurer,
            config,
            cache: MeasureCache::new(),
        }
    }

    /// Height a cell needs at the given column widths: content plus padding,
    /// floored by its minimum height.
    pub fn required_height(&self, id: CellId, placed: &PlacedCell, column_widths: &[f64]) -> f64 {
        let cell = &placed.cell;
        let width = span_width(placed.column, placed.col_end(), column_widths);
        let inner_width = (width - cell.padding.horizontal()).max(0.0);
        let content = self
            .cache
            .get_or_measure(self.measurer, id, &cell.content, inner_width);
        (content + cell.padding.vertical()).max(cell.minimum_height)
    }

    /// Number of distinct measurements taken so far.
    pub fn measurements(&self) -> usize {
        self.cache.misses()
    }

    pub fn balance(&self, table: &Table, column_widths: &[f64]) -> Result<BalancedRows, TableError> {
        if column_widths.len() != table.columns() {
            return Err(TableError::ColumnCountMismatch {
                expected: table.columns(),
                got: column_widths.len(),
            });
        }

        let rows = table.rows();
        let mut warnings = Vec::new();

        let required: Vec<f64> = table
            .cells()
            .iter()
            .enumerate()
            .map(|(i, placed)| self.required_height(CellId(i), placed, column_widths))
            .collect();

        // Pass 1: single-row floor
        let mut heights = vec![0.0_f64; rows.len()];
        for (r, slot) in rows.iter().enumerate() {
            match slot {
                RowSlot::Empty => {
                    report(&mut warnings, LayoutWarning::PlaceholderRow { row: r });
                }
                RowSlot::Populated(row) => {
                    for (_, id) in row.origin_cells() {
                        if table.placed(id).row_span == 1 {
                            heights[r] = heights[r].max(required[id.0]);
                        }
                    }
                }
            }
        }

        // Pass 2: span reconciliation, to a fixed point
        let spans: Vec<CellId> = table.grid().spanning_cells().map(|(id, _)| id).collect();
        let eps = self.config.epsilon;
        let max_iterations = self.config.max_iterations.max(1);
        let mut targets: Vec<usize> = Vec::new();
        let mut iterations = 0;

        loop {
            iterations += 1;
            let mut changed = false;

            for &id in &spans {
                let deficit = shortfall(table, &heights, &required, id);
                if deficit <= eps {
                    continue;
                }
                let placed = table.placed(id);
                let end = placed.row_end().min(rows.len());

                // Placeholder rows stay at zero height.
                targets.clear();
                targets.extend((placed.row..end).filter(|r| !rows[*r].is_empty()));
                log::trace!(
                    "cell {} spanning rows {}..{}: distributing {:.3}pt over {} rows",
                    id,
                    placed.row,
                    end,
                    deficit,
                    targets.len()
                );
                distribute_deficit(&mut heights, &targets, deficit);
                changed = true;
            }

            if !changed {
                break;
            }
            if iterations >= max_iterations {
                // The last sweep may have settled everything; only warn if not.
                let unsettled = spans
                    .iter()
                    .any(|&id| shortfall(table, &heights, &required, id) > eps);
                if unsettled {
                    report(
                        &mut warnings,
                        LayoutWarning::IterationCapExceeded { iterations },
                    );
                }
                break;
            }
        }

        log::debug!(
            "balanced {} rows ({} spanning cells) in {} sweep(s)",
            rows.len(),
            spans.len(),
            iterations
        );

        Ok(BalancedRows {
            heights,
            required,
            iterations,
            warnings,
        })
    }
}

/// How far the rows under a spanning cell fall short of what it needs.
fn shortfall(table: &Table, heights: &[f64], required: &[f64], id: CellId) -> f64 {
    let placed = table.placed(id);
    let end = placed.row_end().min(heights.len());
    let current: f64 = heights[placed.row..end].iter().sum();
    required[id.0] - current
}

/// Raise the rows listed in `rows` so that together they gain `deficit`.
///
/// The shortest rows are raised first, all to a common level, so rows with
/// the least content of their own absorb the most. A row already above that
/// level is left alone.
pub fn distribute_deficit(heights: &mut [f64], rows: &[usize], deficit: f64) {
    if rows.is_empty() || deficit <= 0.0 {
        return;
    }

    let mut order = rows.to_vec();
    order.sort_by(|a, b| heights[*a].total_cmp(&heights[*b]));

    let mut filled = 0.0;
    let mut count = 0;
    let mut level = 0.0;
    while count < order.len() {
        filled += heights[order[count]];
        count += 1;
        level = (deficit + filled) / count as f64;
        if count == order.len() || level <= heights[order[count]] {
            break;
        }
    }

    for &r in &order[..count] {
        heights[r] = heights[r].max(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::measure::{ContentMeasurer, FnMeasurer};
    use crate::model::{Cell, Content};

    fn balance(table: &Table, widths: &[f64]) -> BalancedRows {
        let measurer = ContentMeasurer::new();
        let config = LayoutConfig::default();
        RowHeightBalancer::new(&measurer, &config)
            .balance(table, widths)
            .unwrap()
    }

    #[test]
    fn test_distribute_even() {
        let mut heights = vec![0.0, 0.0, 0.0];
        distribute_deficit(&mut heights, &[0, 1, 2], 30.0);
        for h in &heights {
            assert!((h - 10.0).abs() < 0.01);
        }
    }

    #[test]
    fn test_distribute_fills_shortest_first() {
        let mut heights = vec![5.0, 0.0, 20.0];
        distribute_deficit(&mut heights, &[0, 1, 2], 25.0);
        // Level 15: row 0 gains 10, row 1 gains 15, row 2 untouched.
        assert!((heights[0] - 15.0).abs() < 0.01);
        assert!((heights[1] - 15.0).abs() < 0.01);
        assert!((heights[2] - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_distribute_subset_of_rows() {
        let mut heights = vec![1.0, 2.0, 3.0, 4.0];
        distribute_deficit(&mut heights, &[1, 3], 6.0);
        assert!((heights[0] - 1.0).abs() < 0.01);
        assert!((heights[1] - 6.0).abs() < 0.01);
        assert!((heights[2] - 3.0).abs() < 0.01);
        assert!((heights[3] - 6.0).abs() < 0.01);
    }

    #[test]
    fn single_row_floor() {
        let mut table = Table::with_columns(3).unwrap();
        table.add_cell(Cell::spacer(10.0)).unwrap();
        table.add_cell(Cell::spacer(25.0)).unwrap();
        table.add_cell(Cell::empty().with_minimum_height(18.0)).unwrap();
        let rows = balance(&table, &[100.0, 100.0, 100.0]);
        assert_eq!(rows.heights.len(), 1);
        assert!((rows.heights[0] - 25.0).abs() < 0.01);
    }

    #[test]
    fn span_over_empty_rows_is_even() {
        let mut table = Table::with_columns(2).unwrap();
        table.add_cell(Cell::spacer(90.0).with_row_span(3)).unwrap();
        let rows = balance(&table, &[100.0, 100.0]);
        assert_eq!(rows.heights.len(), 3);
        for h in &rows.heights {
            assert!((h - 30.0).abs() < 0.01);
        }
    }

    #[test]
    fn span_minimum_height_is_a_floor_on_the_sum() {
        let mut table = Table::with_columns(2).unwrap();
        table
            .add_cell(Cell::empty().with_row_span(2).with_minimum_height(50.0))
            .unwrap();
        table.add_cell(Cell::spacer(10.0)).unwrap();
        table.add_cell(Cell::spacer(10.0)).unwrap();
        let rows = balance(&table, &[100.0, 100.0]);
        assert!((rows.span_height(0, 2) - 50.0).abs() < 0.01);
        assert!((rows.heights[0] - rows.heights[1]).abs() < 0.01);
    }

    #[test]
    fn overlapping_spans_reach_fixed_point() {
        // Column 0: span rows 0..2 needing 60. Column 1: span rows 1..3 needing 90.
        let mut table = Table::with_columns(2).unwrap();
        table.add_cell(Cell::spacer(60.0).with_row_span(2)).unwrap();
        table.add_cell(Cell::spacer(10.0)).unwrap();
        table.add_cell(Cell::spacer(90.0).with_row_span(2)).unwrap();
        table.add_cell(Cell::spacer(10.0)).unwrap();
        let rows = balance(&table, &[100.0, 100.0]);

        assert!(rows.span_height(0, 2) + 0.01 >= 60.0);
        assert!(rows.span_height(1, 3) + 0.01 >= 90.0);
        assert!(rows.heights.iter().all(|h| *h >= 10.0 - 0.01));
    }

    #[test]
    fn placeholder_row_is_zero_and_warned() {
        let mut table = Table::with_columns(1).unwrap();
        table.add_cell(Cell::spacer(12.0)).unwrap();
        table.push_placeholder_row();
        table.add_cell(Cell::spacer(14.0)).unwrap();
        let rows = balance(&table, &[100.0]);
        assert_eq!(rows.heights.len(), 3);
        assert!((rows.heights[0] - 12.0).abs() < 0.01);
        assert_eq!(rows.heights[1], 0.0);
        assert!((rows.heights[2] - 14.0).abs() < 0.01);
        assert_eq!(rows.warnings, vec![LayoutWarning::PlaceholderRow { row: 1 }]);
    }

    #[test]
    fn padding_and_colspan_width_reach_measurer() {
        let mut table = Table::new(vec![1.0, 1.0, 2.0]).unwrap();
        table
            .add_cell(
                Cell::empty()
                    .with_col_span(2)
                    .with_padding(crate::model::Edges::symmetric(3.0, 5.0)),
            )
            .unwrap();
        let measurer = FnMeasurer(|_: &Content, w: f64| w / 10.0);
        let config = LayoutConfig::default();
        let balancer = RowHeightBalancer::new(&measurer, &config);
        let rows = balancer.balance(&table, &[50.0, 50.0, 100.0]).unwrap();
        // Width 100 minus 10 horizontal padding = 90 -> 9, plus 6 vertical padding.
        assert!((rows.heights[0] - 15.0).abs() < 0.01);
    }

    #[test]
    fn measurements_are_cached_across_sweeps() {
        let mut table = Table::with_columns(2).unwrap();
        table.add_cell(Cell::spacer(60.0).with_row_span(2)).unwrap();
        table.add_cell(Cell::spacer(10.0)).unwrap();
        table.add_cell(Cell::spacer(90.0).with_row_span(2)).unwrap();
        table.add_cell(Cell::spacer(10.0)).unwrap();
        let measurer = ContentMeasurer::new();
        let config = LayoutConfig::default();
        let balancer = RowHeightBalancer::new(&measurer, &config);
        balancer.balance(&table, &[100.0, 100.0]).unwrap();
        balancer.balance(&table, &[100.0, 100.0]).unwrap();
        assert_eq!(balancer.measurements(), 4);
    }

    #[test]
    fn settled_at_the_cap_is_not_a_warning() {
        let mut table = Table::with_columns(2).unwrap();
        table.add_cell(Cell::spacer(60.0).with_row_span(2)).unwrap();
        let measurer = ContentMeasurer::new();
        let config = LayoutConfig {
            max_iterations: 1,
            ..LayoutConfig::default()
        };
        let rows = RowHeightBalancer::new(&measurer, &config)
            .balance(&table, &[100.0, 100.0])
            .unwrap();
        assert_eq!(rows.iterations, 1);
        assert!(rows.warnings.is_empty(), "{:?}", rows.warnings);
        assert!((rows.total_height() - 60.0).abs() < 0.01);
    }

    #[test]
    fn overlapping_spans_settle_within_a_one_sweep_cap() {
        let mut table = Table::with_columns(2).unwrap();
        table.add_cell(Cell::spacer(60.0).with_row_span(2)).unwrap();
        table.add_cell(Cell::spacer(10.0)).unwrap();
        table.add_cell(Cell::spacer(90.0).with_row_span(2)).unwrap();
        table.add_cell(Cell::spacer(10.0)).unwrap();
        let measurer = ContentMeasurer::new();
        let config = LayoutConfig {
            max_iterations: 1,
            ..LayoutConfig::default()
        };
        let rows = RowHeightBalancer::new(&measurer, &config)
            .balance(&table, &[100.0, 100.0])
            .unwrap();
        assert_eq!(rows.iterations, 1);
        assert!(!rows
            .warnings
            .iter()
            .any(|w| matches!(w, LayoutWarning::IterationCapExceeded { .. })));
        assert!(rows.span_height(0, 2) + 0.01 >= 60.0);
        assert!(rows.span_height(1, 3) + 0.01 >= 90.0);
    }

    #[test]
    fn mismatched_widths_rejected() {
        let table = Table::with_columns(2).unwrap();
        let measurer = ContentMeasurer::new();
        let config = LayoutConfig::default();
        let err = RowHeightBalancer::new(&measurer, &config)
            .balance(&table, &[100.0])
            .unwrap_err();
        assert!(matches!(err, TableError::ColumnCountMismatch { .. }));
    }
}
