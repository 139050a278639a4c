//! # Page Splitting
//!
//! Slices a balanced table into page-sized pieces.
//!
//! Each slice repeats the header rows at the top and the footer rows at the
//! bottom, and fills the space between with body rows. Rows joined by row
//! spans form a group; a group is kept on one page when possible
//! ([`SplitPolicy::KeepTogether`]) or cut between its rows
//! ([`SplitPolicy::Split`]), in which case each spanning cell that crosses the
//! cut is described by a [`SpanRemainder`] so the writer can continue it on
//! the next page.
//!
//! Every call makes progress: a row or group too tall for an empty page is
//! split or emitted clipped, with a warning, rather than moved forever.

use std::ops::Range;

use serde::Serialize;

use super::balance::BalancedRows;
use super::grid::CellId;
use super::{report, LayoutWarning};
use crate::error::TableError;
use crate::model::{LayoutConfig, PageConfig, SplitPolicy, Table};

/// Vertical space available to the table on each page.
pub trait PageGeometry {
    fn available_height(&self, page_index: usize) -> f64;
}

/// The same height on every page.
impl PageGeometry for f64 {
    fn available_height(&self, _page_index: usize) -> f64 {
        *self
    }
}

/// One height per page; the last one repeats.
impl PageGeometry for [f64] {
    fn available_height(&self, page_index: usize) -> f64 {
        self.get(page_index).or(self.last()).copied().unwrap_or(0.0)
    }
}

impl PageGeometry for Vec<f64> {
    fn available_height(&self, page_index: usize) -> f64 {
        self.as_slice().available_height(page_index)
    }
}

impl PageGeometry for PageConfig {
    fn available_height(&self, page_index: usize) -> f64 {
        let height = self.content_height();
        if page_index == 0 {
            height - self.first_page_offset
        } else {
            height
        }
    }
}

/// What to do with the next unit of rows on the current page.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakDecision {
    /// The whole unit fits.
    Place,
    /// Leave the unit for the next page.
    MoveToNextPage,
    /// Place the first rows of the unit here and continue on the next page.
    Split {
        /// How many whole rows of the unit fit on the current page.
        rows_on_current_page: usize,
    },
}

/// Given the remaining space on a page and the heights of a unit's rows,
/// decide how to break.
///
/// A `KeepTogether` unit is only split when nothing else is on the page,
/// since moving it would not help.
pub fn decide_break(
    remaining_height: f64,
    row_heights: &[f64],
    policy: SplitPolicy,
    page_has_content: bool,
) -> BreakDecision {
    let total: f64 = row_heights.iter().sum();
    if total <= remaining_height {
        return BreakDecision::Place;
    }

    if policy == SplitPolicy::KeepTogether && page_has_content {
        return BreakDecision::MoveToNextPage;
    }

    let mut running = 0.0;
    let mut fit_count = 0;
    for &h in row_heights {
        if running + h > remaining_height {
            break;
        }
        running += h;
        fit_count += 1;
    }

    BreakDecision::Split {
        rows_on_current_page: fit_count,
    }
}

/// A plain row cut by a page break.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowRemainder {
    pub row: usize,
    /// Height of the row already placed on earlier pages.
    pub consumed: f64,
    pub remaining: f64,
}

/// A spanning cell cut by a page break.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanRemainder {
    pub cell: CellId,
    /// First row of the next slice the cell still covers.
    pub resume_row: usize,
    pub remaining_row_span: usize,
    /// Height of the cell already placed on earlier pages.
    pub consumed: f64,
    /// Content height still to place: required height minus `consumed`.
    pub remaining: f64,
}

/// Everything cut by a page break.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CarryOver {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<RowRemainder>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<SpanRemainder>,
}

impl CarryOver {
    pub fn is_empty(&self) -> bool {
        self.row.is_none() && self.spans.is_empty()
    }
}

/// Where the next slice starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitState {
    pub page: usize,
    pub next_row: usize,
    pub carry: Option<CarryOver>,
}

/// One page's worth of the table.
#[derive(Debug, Clone, Serialize)]
pub struct SplitResult {
    pub page: usize,
    /// Header rows repeated at the top of this slice.
    pub header_rows: Range<usize>,
    /// Body rows on this slice. A row split across pages appears on both.
    pub rows: Range<usize>,
    /// Footer rows repeated at the bottom of this slice.
    pub footer_rows: Range<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carried_in: Option<CarryOver>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carry_over: Option<CarryOver>,
    /// Height used by body rows.
    pub body_height: f64,
    /// Height used by the whole slice, header and footer included.
    pub height: f64,
    /// Height added to the last body row so it reaches the bottom of the
    /// page. Included in `body_height`.
    #[serde(skip_serializing_if = "is_zero")]
    pub last_row_extension: f64,
    pub is_last: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<LayoutWarning>,
    #[serde(skip)]
    resume_row: usize,
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

impl SplitResult {
    /// The state the next slice starts from.
    pub fn next_state(&self) -> SplitState {
        SplitState {
            page: self.page + 1,
            next_row: self.resume_row,
            carry: self.carry_over.clone(),
        }
    }
}

/// Splits one balanced table across pages.
pub struct PageSplitter<'a> {
    table: &'a Table,
    balanced: &'a BalancedRows,
    config: &'a LayoutConfig,
    header: Range<usize>,
    footer: Range<usize>,
    body: Range<usize>,
    /// `prefix[i]` is the height of rows `0..i`.
    prefix: Vec<f64>,
    /// End (exclusive) of the span group containing each row.
    group_end: Vec<usize>,
    /// Spanning cells, by origin row.
    spans: Vec<CellId>,
    setup_warnings: Vec<LayoutWarning>,
}

impl<'a> PageSplitter<'a> {
    pub fn new(table: &'a Table, balanced: &'a BalancedRows, config: &'a LayoutConfig) -> Self {
        let heights = &balanced.heights;
        let n = heights.len();
        let mut setup_warnings = Vec::new();

        let header_rows = table.header_rows().min(n);
        let footer_rows = table.footer_rows().min(n - header_rows);
        if header_rows != table.header_rows() || footer_rows != table.footer_rows() {
            report(
                &mut setup_warnings,
                LayoutWarning::HeaderFooterClamped {
                    header_rows,
                    footer_rows,
                    rows: n,
                },
            );
        }

        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(0.0);
        let mut running = 0.0;
        for h in heights {
            running += h;
            prefix.push(running);
        }

        let mut spans: Vec<CellId> = table.grid().spanning_cells().map(|(id, _)| id).collect();
        spans.sort_by_key(|id| table.placed(*id).row);

        Self {
            table,
            balanced,
            config,
            header: 0..header_rows,
            footer: n - footer_rows..n,
            body: header_rows..n - footer_rows,
            prefix,
            group_end: span_groups(table, n),
            spans,
            setup_warnings,
        }
    }

    fn height_of(&self, rows: &Range<usize>) -> f64 {
        self.prefix[rows.end] - self.prefix[rows.start]
    }

    /// Spanning cells that cover `row` and have started before the cut at
    /// (`row`, `offset`).
    fn spans_cut(&self, row: usize, offset: f64) -> Vec<SpanRemainder> {
        let eps = self.config.epsilon;
        let started = self
            .spans
            .partition_point(|id| self.table.placed(*id).row <= row);
        self.spans[..started]
            .iter()
            .filter_map(|&id| {
                let placed = self.table.placed(id);
                if !placed.covers_row(row) || (placed.row == row && offset <= eps) {
                    return None;
                }
                let end = placed.row_end().min(self.prefix.len() - 1);
                let consumed = self.prefix[row] - self.prefix[placed.row] + offset;
                Some(SpanRemainder {
                    cell: id,
                    resume_row: row,
                    remaining_row_span: end - row,
                    consumed,
                    remaining: (self.balanced.required_height(id) - consumed).max(0.0),
                })
            })
            .collect()
    }

    /// Height of the whole table on a page after the first, as one slice.
    fn whole_height(&self) -> f64 {
        let footer = if self.table.skip_last_footer() {
            0.0
        } else {
            self.height_of(&self.footer)
        };
        self.height_of(&self.header) + self.height_of(&self.body) + footer
    }

    /// Room for body rows on a page after the first of `available` height.
    fn body_budget(&self, available: f64) -> f64 {
        if !available.is_finite() || available <= 0.0 {
            return 0.0;
        }
        let budget = available - self.height_of(&self.header) - self.height_of(&self.footer);
        if budget <= self.config.epsilon {
            available
        } else {
            budget
        }
    }

    /// An empty slice: the table continues from `row` on the next page.
    fn deferred(
        &self,
        state: &SplitState,
        row: usize,
        carried_in: Option<CarryOver>,
        warnings: Vec<LayoutWarning>,
    ) -> SplitResult {
        log::debug!("page {}: nothing placed, row {} moves to the next page", state.page, row);
        SplitResult {
            page: state.page,
            header_rows: 0..0,
            rows: row..row,
            footer_rows: self.footer.end..self.footer.end,
            carry_over: carried_in.clone(),
            carried_in,
            body_height: 0.0,
            height: 0.0,
            last_row_extension: 0.0,
            is_last: false,
            warnings,
            resume_row: row,
        }
    }

    /// Lay out the slice for `state.page`, given `available` height on it.
    ///
    /// Pages after this one are taken to be as tall as this one; use
    /// [`split_for_page_before`](Self::split_for_page_before) when they are
    /// not.
    pub fn split_for_page(&self, state: &SplitState, available: f64) -> Result<SplitResult, TableError> {
        self.split_for_page_before(state, available, available)
    }

    /// Lay out the slice for `state.page` when the page after it offers
    /// `next_available`. A keep-together group (or the whole table, with
    /// [`Table::keep_together`]) that does not fit here but fits there is
    /// left for the next page, and this slice comes back empty.
    pub fn split_for_page_before(
        &self,
        state: &SplitState,
        available: f64,
        next_available: f64,
    ) -> Result<SplitResult, TableError> {
        if !available.is_finite() || available <= 0.0 {
            return Err(TableError::NonPositivePageHeight {
                page: state.page,
                height: available,
            });
        }

        let eps = self.config.epsilon;
        let heights = &self.balanced.heights;
        let mut warnings = if state.page == 0 {
            self.setup_warnings.clone()
        } else {
            Vec::new()
        };

        let carried_in = state.carry.clone().filter(|c| !c.is_empty());
        let carried_row = carried_in.as_ref().and_then(|c| c.row.clone());
        let start = match &carried_row {
            Some(rem) => rem.row,
            None => state.next_row.max(self.body.start),
        };
        let after_carried = carried_row.as_ref().map_or(start, |rem| rem.row + 1);

        let mut header = if state.page == 0 && self.table.skip_first_header() {
            0..0
        } else {
            self.header.clone()
        };
        let header_height = self.height_of(&header);
        let body_left = carried_row.as_ref().map_or(0.0, |rem| rem.remaining)
            + self.height_of(&(after_carried.min(self.body.end)..self.body.end));
        let has_body = carried_row.is_some() || start < self.body.end;

        let mut footer = self.footer.clone();
        if self.table.skip_last_footer() && header_height + body_left <= available + eps {
            footer = self.footer.end..self.footer.end;
        }

        let at_start = carried_in.is_none() && start == self.body.start;
        if at_start && has_body && self.table.keep_together() {
            let here = header_height + body_left + self.height_of(&footer);
            if here > available + eps && self.whole_height() <= next_available + eps {
                return Ok(self.deferred(state, start, carried_in, warnings));
            }
        }

        let mut budget = available - header_height - self.height_of(&footer);
        if has_body && budget <= eps && !(header.is_empty() && footer.is_empty()) {
            report(
                &mut warnings,
                LayoutWarning::HeaderFooterTooTall {
                    page: state.page,
                    height: available - budget,
                    available,
                },
            );
            header = 0..0;
            footer = self.footer.end..self.footer.end;
            budget = available;
        }

        let mut used = 0.0;
        let mut placed_any = false;
        let mut carry_over: Option<CarryOver> = None;
        let mut r = after_carried;

        if let Some(rem) = &carried_row {
            if rem.remaining <= budget + eps || budget <= eps {
                used += rem.remaining;
                placed_any = true;
            } else {
                let consumed = rem.consumed + budget;
                carry_over = Some(CarryOver {
                    row: Some(RowRemainder {
                        row: rem.row,
                        consumed,
                        remaining: rem.remaining - budget,
                    }),
                    spans: self.spans_cut(rem.row, consumed),
                });
                used = budget;
            }
        }

        while carry_over.is_none() && r < self.body.end {
            let end = self.group_end[r].clamp(r + 1, self.body.end);
            let unit = &heights[r..end];
            let grouped = end - r > 1;
            let policy = if grouped {
                self.config.span_policy
            } else {
                self.config.row_policy
            };

            if !placed_any && policy == SplitPolicy::KeepTogether {
                let unit_height = self.height_of(&(r..end));
                if unit_height > budget + eps && unit_height <= self.body_budget(next_available) + eps {
                    return Ok(self.deferred(state, r, carried_in, warnings));
                }
            }

            match decide_break(budget - used + eps, unit, policy, placed_any) {
                BreakDecision::Place => {
                    used += self.height_of(&(r..end));
                    placed_any = true;
                    r = end;
                }
                BreakDecision::MoveToNextPage => break,
                BreakDecision::Split {
                    rows_on_current_page: 0,
                } => {
                    if placed_any
                        && (self.config.split_late || self.config.row_policy == SplitPolicy::KeepTogether)
                    {
                        break;
                    }
                    if !placed_any {
                        if grouped && policy == SplitPolicy::KeepTogether {
                            report(
                                &mut warnings,
                                LayoutWarning::OversizedSpanGroup {
                                    start: r,
                                    end,
                                    height: self.height_of(&(r..end)),
                                    available: budget,
                                },
                            );
                        }
                        report(
                            &mut warnings,
                            LayoutWarning::OversizedRow {
                                row: r,
                                height: heights[r],
                                available: budget,
                            },
                        );
                    }

                    let room = budget - used;
                    if self.config.row_policy == SplitPolicy::Split && room > eps {
                        carry_over = Some(CarryOver {
                            row: Some(RowRemainder {
                                row: r,
                                consumed: room,
                                remaining: heights[r] - room,
                            }),
                            spans: self.spans_cut(r, room),
                        });
                        used += room;
                        r += 1;
                    } else if !placed_any {
                        // Emitted alone and clipped.
                        used += heights[r];
                        placed_any = true;
                        r += 1;
                        let spans = self.spans_cut(r, 0.0);
                        if !spans.is_empty() && r < self.body.end {
                            carry_over = Some(CarryOver { row: None, spans });
                        }
                    }
                    break;
                }
                BreakDecision::Split {
                    rows_on_current_page: fit,
                } => {
                    if !placed_any && policy == SplitPolicy::KeepTogether {
                        report(
                            &mut warnings,
                            LayoutWarning::OversizedSpanGroup {
                                start: r,
                                end,
                                height: self.height_of(&(r..end)),
                                available: budget,
                            },
                        );
                    }
                    used += self.height_of(&(r..r + fit));
                    placed_any = true;
                    r += fit;
                    carry_over = Some(CarryOver {
                        row: None,
                        spans: self.spans_cut(r, 0.0),
                    });
                    break;
                }
            }
        }

        let resume_row = carry_over
            .as_ref()
            .and_then(|c| c.row.as_ref())
            .map_or(r, |rem| rem.row);
        let is_last = carry_over.is_none() && r >= self.body.end;
        if is_last && self.table.skip_last_footer() {
            footer = self.footer.end..self.footer.end;
        }
        let extend = if is_last {
            self.table.extend_final_row()
        } else {
            self.table.extend_last_row()
        };
        let last_row_extension = if extend && r > start {
            (available - self.height_of(&header) - used - self.height_of(&footer)).max(0.0)
        } else {
            0.0
        };
        let used = used + last_row_extension;
        let height = self.height_of(&header) + used + self.height_of(&footer);

        log::debug!(
            "page {}: rows {}..{} ({:.2}pt of {:.2}pt){}",
            state.page,
            start,
            r,
            height,
            available,
            if is_last { ", last" } else { "" }
        );

        Ok(SplitResult {
            page: state.page,
            header_rows: header,
            rows: start..r,
            footer_rows: footer,
            carried_in,
            carry_over,
            body_height: used,
            height,
            last_row_extension,
            is_last,
            warnings,
            resume_row,
        })
    }

    /// Split the whole table, one slice per page, until the last row is placed.
    pub fn paginate<G: PageGeometry + ?Sized>(&self, geometry: &G) -> Result<Vec<SplitResult>, TableError> {
        let mut state = SplitState::default();
        let mut slices = Vec::new();
        loop {
            let slice = self.split_for_page_before(
                &state,
                geometry.available_height(state.page),
                geometry.available_height(state.page + 1),
            )?;
            let done = slice.is_last;
            state = slice.next_state();
            slices.push(slice);
            if done {
                break;
            }
        }
        log::debug!("table {} split into {} page(s)", self.table.id(), slices.len());
        Ok(slices)
    }
}

/// For each row, the end (exclusive) of the maximal run of rows joined to it
/// by row spans.
fn span_groups(table: &Table, rows: usize) -> Vec<usize> {
    let mut reach: Vec<usize> = (1..=rows).collect();
    for (_, placed) in table.grid().spanning_cells() {
        if placed.row < rows {
            reach[placed.row] = reach[placed.row].max(placed.row_end().min(rows));
        }
    }

    let mut group_end = vec![0; rows];
    let mut i = 0;
    while i < rows {
        let mut end = reach[i];
        let mut j = i + 1;
        while j < end {
            end = end.max(reach[j]);
            j += 1;
        }
        for slot in &mut group_end[i..end] {
            *slot = end;
        }
        i = end;
    }
    group_end
}
