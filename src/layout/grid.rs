//! # Cell Grid
//!
//! Places cells into a row × column occupancy grid as they are added to a
//! table. Cells fill the grid left-to-right, top-to-bottom, skipping slots
//! already claimed by a row span from above or a column span earlier in the
//! same row.
//!
//! Cells live in an arena addressed by [`CellId`]. The row a cell starts in
//! holds an `Origin` slot for it; every other slot the cell covers holds a
//! non-owning `Spanned` back-reference, so height propagation can find the
//! cell from any row it touches without the cell being owned twice.

use serde::Serialize;

use crate::model::Cell;

/// Index of a placed cell in its table's arena. Only the grid hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellId(pub(crate) usize);

impl CellId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cell together with where it landed in the grid.
#[derive(Debug, Clone)]
pub struct PlacedCell {
    pub cell: Cell,
    /// Origin row (0-based).
    pub row: usize,
    /// Origin column (0-based).
    pub column: usize,
    /// Effective column span after clamping to the free run.
    pub col_span: usize,
    /// Effective row span (grows when a placeholder row is inserted inside it).
    pub row_span: usize,
}

impl PlacedCell {
    /// Exclusive end of the covered rows.
    pub fn row_end(&self) -> usize {
        self.row + self.row_span
    }

    /// Exclusive end of the covered columns.
    pub fn col_end(&self) -> usize {
        self.column + self.col_span
    }

    pub fn covers_row(&self, row: usize) -> bool {
        row >= self.row && row < self.row_end()
    }
}

/// What occupies one (row, column) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Free,
    /// The cell starts here and is owned by this row.
    Origin(CellId),
    /// Covered by a span owned by another slot.
    Spanned(CellId),
}

impl Slot {
    pub fn is_free(&self) -> bool {
        matches!(self, Slot::Free)
    }

    pub fn cell(&self) -> Option<CellId> {
        match self {
            Slot::Free => None,
            Slot::Origin(id) | Slot::Spanned(id) => Some(*id),
        }
    }
}

/// One populated row of the grid.
#[derive(Debug, Clone)]
pub struct Row {
    slots: Vec<Slot>,
}

impl Row {
    fn new(columns: usize) -> Self {
        Self {
            slots: vec![Slot::Free; columns],
        }
    }

    pub fn slot(&self, column: usize) -> Slot {
        self.slots.get(column).copied().unwrap_or(Slot::Free)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Cells that start in this row, with their origin column.
    pub fn origin_cells(&self) -> impl Iterator<Item = (usize, CellId)> + '_ {
        self.slots.iter().enumerate().filter_map(|(c, s)| match s {
            Slot::Origin(id) => Some((c, *id)),
            _ => None,
        })
    }
}

/// A position in the row sequence: a real row, or a hole.
#[derive(Debug, Clone)]
pub enum RowSlot {
    Populated(Row),
    /// Placeholder with no cells. Laid out as a zero-height row.
    Empty,
}

impl RowSlot {
    pub fn as_row(&self) -> Option<&Row> {
        match self {
            RowSlot::Populated(row) => Some(row),
            RowSlot::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RowSlot::Empty)
    }
}

/// Outcome of placing a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub id: CellId,
    pub row: usize,
    pub column: usize,
    /// Column span actually granted; less than requested when clamped.
    pub col_span: usize,
}

/// Where the next cell will be tried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cursor {
    row: usize,
    column: usize,
}

/// Row × column occupancy grid plus the cell arena.
#[derive(Debug, Clone)]
pub struct CellGrid {
    columns: usize,
    cells: Vec<PlacedCell>,
    rows: Vec<RowSlot>,
    cursor: Cursor,
}

impl CellGrid {
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            cells: Vec::new(),
            rows: Vec::new(),
            cursor: Cursor::default(),
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> &[RowSlot] {
        &self.rows
    }

    pub fn cells(&self) -> &[PlacedCell] {
        &self.cells
    }

    /// The placed cell for `id`, or `None` for an id from another grid.
    pub fn cell(&self, id: CellId) -> Option<&PlacedCell> {
        self.cells.get(id.0)
    }

    /// The placed cell for an id this grid handed out.
    pub(crate) fn placed(&self, id: CellId) -> &PlacedCell {
        &self.cells[id.0]
    }

    /// Id the next placed cell will receive.
    pub fn next_id(&self) -> CellId {
        CellId(self.cells.len())
    }

    /// Whether a slot is unavailable for new cells. Placeholder rows count as
    /// fully claimed so nothing is ever placed into a hole.
    fn is_claimed(&self, row: usize, column: usize) -> bool {
        match self.rows.get(row) {
            Some(RowSlot::Populated(r)) => !r.slot(column).is_free(),
            Some(RowSlot::Empty) => true,
            None => false,
        }
    }

    /// Advance the cursor past claimed slots, wrapping to the next row.
    fn skip_claimed(&mut self) {
        loop {
            while self.cursor.column < self.columns
                && self.is_claimed(self.cursor.row, self.cursor.column)
            {
                self.cursor.column += 1;
            }
            if self.cursor.column < self.columns {
                return;
            }
            self.cursor.row += 1;
            self.cursor.column = 0;
        }
    }

    fn ensure_rows(&mut self, count: usize) {
        while self.rows.len() < count {
            self.rows.push(RowSlot::Populated(Row::new(self.columns)));
        }
    }

    /// Place a cell at the next free slot. Spans must already be validated
    /// (`col_span` between 1 and the column count, `row_span` at least 1).
    pub fn place(&mut self, cell: Cell) -> Placement {
        self.skip_claimed();
        let Cursor { row, column } = self.cursor;

        let requested = cell.col_span as usize;
        let mut col_span = 0;
        while col_span < requested
            && column + col_span < self.columns
            && !self.is_claimed(row, column + col_span)
        {
            col_span += 1;
        }
        let row_span = cell.row_span as usize;

        let id = CellId(self.cells.len());
        self.ensure_rows(row + row_span);
        for r in row..row + row_span {
            if let RowSlot::Populated(target) = &mut self.rows[r] {
                for c in column..column + col_span {
                    target.slots[c] = if r == row && c == column {
                        Slot::Origin(id)
                    } else {
                        Slot::Spanned(id)
                    };
                }
            }
        }

        self.cells.push(PlacedCell {
            cell,
            row,
            column,
            col_span,
            row_span,
        });
        self.cursor.column = column + col_span;

        Placement {
            id,
            row,
            column,
            col_span,
        }
    }

    /// Close the current row; the next cell starts a new one.
    pub fn complete_row(&mut self) {
        if self.cursor.column > 0 {
            self.cursor.row += 1;
            self.cursor.column = 0;
        }
    }

    /// Close the current row and insert a placeholder row at the cursor.
    ///
    /// When the position already holds rows created by a span from above, the
    /// placeholder is inserted before them and every span crossing the
    /// insertion point grows by one so it still reaches its last row.
    /// Returns the index of the placeholder.
    pub fn push_placeholder_row(&mut self) -> usize {
        self.complete_row();
        let at = self.cursor.row;

        if at >= self.rows.len() {
            self.ensure_rows(at);
            self.rows.push(RowSlot::Empty);
        } else {
            self.rows.insert(at, RowSlot::Empty);
            for placed in &mut self.cells {
                if placed.row >= at {
                    placed.row += 1;
                } else if placed.row_end() > at {
                    placed.row_span += 1;
                }
            }
        }

        self.cursor.row = at + 1;
        self.cursor.column = 0;
        at
    }

    /// Cells whose span covers more than one row, in placement order.
    pub fn spanning_cells(&self) -> impl Iterator<Item = (CellId, &PlacedCell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, p)| p.row_span > 1)
            .map(|(i, p)| (CellId(i), p))
    }
}

/// Compute the width of a multi-column span.
pub fn span_width(col_start: usize, col_end: usize, col_widths: &[f64]) -> f64 {
    (col_start..col_end)
        .map(|c| col_widths.get(c).copied().unwrap_or(0.0))
        .sum()
}

/// Compute the x-offset of a column.
pub fn column_x_offset(col: usize, col_widths: &[f64]) -> f64 {
    col_widths.iter().take(col).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(col_span: u32, row_span: u32) -> Cell {
        Cell::text("x").with_col_span(col_span).with_row_span(row_span)
    }

    #[test]
    fn test_place_items_row_major() {
        let mut grid = CellGrid::new(3);
        let placed: Vec<_> = (0..6).map(|_| grid.place(cell(1, 1))).collect();

        assert_eq!((placed[0].row, placed[0].column), (0, 0));
        assert_eq!((placed[2].row, placed[2].column), (0, 2));
        assert_eq!((placed[3].row, placed[3].column), (1, 0));
        assert_eq!((placed[5].row, placed[5].column), (1, 2));
        assert_eq!(grid.rows().len(), 2);
    }

    #[test]
    fn test_rowspan_claims_slots_below() {
        let mut grid = CellGrid::new(2);
        let span = grid.place(cell(1, 3));
        let a = grid.place(cell(1, 1));
        let b = grid.place(cell(1, 1));
        let c = grid.place(cell(1, 1));

        assert_eq!((span.row, span.column), (0, 0));
        assert_eq!((a.row, a.column), (0, 1));
        assert_eq!((b.row, b.column), (1, 1));
        assert_eq!((c.row, c.column), (2, 1));

        let row1 = grid.rows()[1].as_row().unwrap();
        assert_eq!(row1.slot(0), Slot::Spanned(span.id));
        assert_eq!(row1.slot(1), Slot::Origin(b.id));
    }

    #[test]
    fn test_colspan_origin_and_spanned() {
        let mut grid = CellGrid::new(3);
        let wide = grid.place(cell(2, 1));
        let next = grid.place(cell(1, 1));

        let row0 = grid.rows()[0].as_row().unwrap();
        assert_eq!(row0.slot(0), Slot::Origin(wide.id));
        assert_eq!(row0.slot(1), Slot::Spanned(wide.id));
        assert_eq!(next.column, 2);
        assert_eq!(row0.origin_cells().count(), 2);
    }

    #[test]
    fn test_colspan_clamped_by_claimed_slot() {
        let mut grid = CellGrid::new(3);
        grid.place(cell(1, 1));
        grid.place(cell(1, 2)); // claims (1, 1)
        grid.place(cell(1, 1));
        // Row 1: column 0 is free, column 1 claimed from above.
        let clamped = grid.place(cell(3, 1));
        assert_eq!((clamped.row, clamped.column), (1, 0));
        assert_eq!(clamped.col_span, 1);
    }

    #[test]
    fn test_span_past_last_row_creates_rows_lazily() {
        let mut grid = CellGrid::new(1);
        grid.place(cell(1, 4));
        assert_eq!(grid.rows().len(), 4);
        assert!(grid.rows()[3].as_row().unwrap().slot(0) != Slot::Free);

        // Column fully claimed for rows 1..4, so the next cell lands in row 4.
        let next = grid.place(cell(1, 1));
        assert_eq!(next.row, 4);
    }

    #[test]
    fn test_complete_row_moves_cursor() {
        let mut grid = CellGrid::new(3);
        grid.place(cell(1, 1));
        grid.complete_row();
        let next = grid.place(cell(1, 1));
        assert_eq!((next.row, next.column), (1, 0));

        // A second complete_row on a fresh row is a no-op.
        grid.complete_row();
        grid.complete_row();
        let after = grid.place(cell(1, 1));
        assert_eq!(after.row, 2);
    }

    #[test]
    fn test_placeholder_row_appended() {
        let mut grid = CellGrid::new(2);
        grid.place(cell(1, 1));
        let hole = grid.push_placeholder_row();
        assert_eq!(hole, 1);
        assert!(grid.rows()[1].is_empty());

        let next = grid.place(cell(1, 1));
        assert_eq!(next.row, 2);
    }

    #[test]
    fn test_placeholder_inside_span_extends_span() {
        let mut grid = CellGrid::new(2);
        let span = grid.place(cell(1, 3));
        grid.place(cell(1, 1));
        // Cursor is at row 1, which already exists because of the span.
        let hole = grid.push_placeholder_row();
        assert_eq!(hole, 1);

        let placed = grid.cell(span.id).unwrap();
        assert_eq!(placed.row_span, 4);
        assert!(grid.rows()[1].is_empty());
        assert_eq!(grid.rows().len(), 4);

        // The next cell goes beside the span in the first real row after the hole.
        let next = grid.place(cell(1, 1));
        assert_eq!((next.row, next.column), (2, 1));
    }

    #[test]
    fn test_span_width() {
        let widths = vec![100.0, 200.0, 150.0];
        assert!((span_width(0, 1, &widths) - 100.0).abs() < 0.001);
        assert!((span_width(0, 2, &widths) - 300.0).abs() < 0.001);
        assert!((span_width(1, 3, &widths) - 350.0).abs() < 0.001);
    }

    #[test]
    fn test_column_x_offset() {
        let widths = vec![100.0, 200.0, 150.0];
        assert!((column_x_offset(0, &widths) - 0.0).abs() < 0.001);
        assert!((column_x_offset(2, &widths) - 300.0).abs() < 0.001);
    }
}
