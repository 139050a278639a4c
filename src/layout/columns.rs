//! # Column Widths
//!
//! Turns a table's relative column proportions into absolute widths.
//!
//! The total comes from one of two places: a locked width the author fixed
//! on the table, or the width the caller offers at layout time (scaled by the
//! table's width percentage). Either way the proportions split the total:
//! `width[i] = total * relative[i] / sum(relative)`.

use crate::error::TableError;
use crate::model::Table;

/// The total width a table will occupy when offered `available_width`.
pub fn resolve_total_width(table: &Table, available_width: f64) -> Result<f64, TableError> {
    let total = if table.is_locked_width() {
        table.total_width().unwrap_or(0.0)
    } else {
        available_width * table.width_percentage() / 100.0
    };

    if !total.is_finite() || total <= 0.0 {
        return Err(TableError::NonPositiveWidth { width: total });
    }
    Ok(total)
}

/// Resolve absolute column widths for `table` when offered `available_width`.
///
/// Fails before anything is measured when the resolved total isn't positive.
pub fn resolve_column_widths(table: &Table, available_width: f64) -> Result<Vec<f64>, TableError> {
    let total = resolve_total_width(table, available_width)?;
    let widths = distribute(table.relative_widths(), total)?;
    log::debug!(
        "resolved {} columns over {:.2}pt (locked: {})",
        widths.len(),
        total,
        table.is_locked_width()
    );
    Ok(widths)
}

/// Split `total` across columns in proportion to `relative`.
pub fn distribute(relative: &[f64], total: f64) -> Result<Vec<f64>, TableError> {
    let sum: f64 = relative.iter().sum();
    if relative.is_empty() || !sum.is_finite() || sum <= 0.0 {
        return Err(TableError::InvalidColumnWidths {
            widths: relative.to_vec(),
        });
    }
    Ok(relative.iter().map(|r| total * r / sum).collect())
}
