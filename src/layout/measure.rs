//! # Content Measurement
//!
//! The layout engine never looks inside cell content. It asks a [`Measure`]
//! implementation how tall the content is at a given width, and trusts the
//! answer to be stable for the duration of one layout pass.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::layout::balance::RowHeightBalancer;
use crate::layout::columns::resolve_column_widths;
use crate::layout::grid::CellId;
use crate::model::{Content, LayoutConfig};
use crate::text::TextLayout;

/// Converts cell content plus an available width into a required height.
///
/// Implementations must be deterministic for a given (content, width) pair;
/// the balancer may ask more than once.
pub trait Measure {
    fn measure(&self, content: &Content, available_width: f64) -> f64;
}

impl<M: Measure + ?Sized> Measure for &M {
    fn measure(&self, content: &Content, available_width: f64) -> f64 {
        (**self).measure(content, available_width)
    }
}

/// Adapts a closure into a [`Measure`].
pub struct FnMeasurer<F>(pub F);

impl<F> Measure for FnMeasurer<F>
where
    F: Fn(&Content, f64) -> f64,
{
    fn measure(&self, content: &Content, available_width: f64) -> f64 {
        (self.0)(content, available_width)
    }
}

/// The built-in measurer: text via [`TextLayout`], spacers by their
/// declared height, nested tables by balancing them at the given width.
pub struct ContentMeasurer {
    text_layout: TextLayout,
    config: LayoutConfig,
}

impl Default for ContentMeasurer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentMeasurer {
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    /// Use `config` when balancing nested tables.
    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            text_layout: TextLayout::new(),
            config,
        }
    }
}

impl Measure for ContentMeasurer {
    fn measure(&self, content: &Content, available_width: f64) -> f64 {
        match content {
            Content::Empty => 0.0,
            Content::Text { content, style } => {
                self.text_layout
                    .measure_height(content, available_width.max(0.0), style)
            }
            Content::Spacer { height } => height.max(0.0),
            Content::Table { table } => {
                let widths = match resolve_column_widths(table, available_width) {
                    Ok(w) => w,
                    Err(e) => {
                        log::warn!("nested table {} not measured: {}", table.id(), e);
                        return 0.0;
                    }
                };
                let balancer = RowHeightBalancer::new(self, &self.config);
                match balancer.balance(table, &widths) {
                    Ok(balanced) => balanced.total_height(),
                    Err(e) => {
                        log::warn!("nested table {} not measured: {}", table.id(), e);
                        0.0
                    }
                }
            }
        }
    }
}

/// Memoized measurements for one layout pass, keyed by cell and width.
#[derive(Default)]
pub struct MeasureCache {
    entries: RefCell<HashMap<(CellId, u64), f64>>,
    misses: RefCell<usize>,
}

impl MeasureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the cached height for `cell` at `width`, or measure and cache it.
    pub fn get_or_measure<M: Measure + ?Sized>(
        &self,
        measurer: &M,
        cell: CellId,
        content: &Content,
        width: f64,
    ) -> f64 {
        let key = (cell, width.to_bits());
        if let Some(h) = self.entries.borrow().get(&key) {
            return *h;
        }
        let h = measurer.measure(content, width);
        *self.misses.borrow_mut() += 1;
        self.entries.borrow_mut().insert(key, h);
        h
    }

    /// How many times the measurer was actually invoked.
    pub fn misses(&self) -> usize {
        *self.misses.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, Table, TextStyle};
    use std::cell::Cell as StdCell;

    #[test]
    fn spacer_and_empty() {
        let m = ContentMeasurer::new();
        assert_eq!(m.measure(&Content::Empty, 100.0), 0.0);
        assert_eq!(m.measure(&Content::Spacer { height: 25.0 }, 100.0), 25.0);
        assert_eq!(m.measure(&Content::Spacer { height: -3.0 }, 100.0), 0.0);
    }

    #[test]
    fn text_lines_times_pitch() {
        let m = ContentMeasurer::new();
        let content = Content::Text {
            content: "one\ntwo".to_string(),
            style: TextStyle::default(),
        };
        assert!((m.measure(&content, 200.0) - 28.8).abs() < 0.001);
    }

    #[test]
    fn nested_table_sums_rows() {
        let mut inner = Table::with_columns(2).unwrap();
        inner.add_cell(Cell::spacer(10.0)).unwrap();
        inner.add_cell(Cell::spacer(30.0)).unwrap();
        inner.add_cell(Cell::spacer(5.0)).unwrap();
        let content = Content::Table {
            table: Box::new(inner),
        };
        let m = ContentMeasurer::new();
        assert!((m.measure(&content, 100.0) - 35.0).abs() < 0.001);
    }

    #[test]
    fn nested_table_without_width_measures_zero() {
        let inner = Table::with_columns(1).unwrap();
        let content = Content::Table {
            table: Box::new(inner),
        };
        assert_eq!(ContentMeasurer::new().measure(&content, 0.0), 0.0);
    }

    #[test]
    fn cache_measures_once_per_width() {
        let calls = StdCell::new(0);
        let m = FnMeasurer(|_: &Content, w: f64| {
            calls.set(calls.get() + 1);
            w / 10.0
        });
        let cache = MeasureCache::new();
        let content = Content::Empty;
        assert_eq!(cache.get_or_measure(&m, CellId(0), &content, 100.0), 10.0);
        assert_eq!(cache.get_or_measure(&m, CellId(0), &content, 100.0), 10.0);
        assert_eq!(cache.get_or_measure(&m, CellId(0), &content, 50.0), 5.0);
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.misses(), 2);
    }
}
