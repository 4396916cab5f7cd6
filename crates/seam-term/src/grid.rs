//! Terminal grid: 2-D cell matrix with scrollback history.
//!
//! The grid is the primary data model for a pane's screen. Rows are
//! allocated lazily and may be shorter than the grid width; trailing cells
//! are implicitly blank. All operations clamp out-of-range coordinates
//! silently so the screen writer above never has to bounds-check.
//!
//! Scrollback policy: only a scroll-up over the *full* screen region feeds
//! retired rows into history. Partial-region scrolls discard them.

use crate::cell::{Cell, Color};
use crate::scrollback::Scrollback;

/// One grid row: lazily sized cell storage plus the soft-wrap bit.
///
/// The `wrapped` flag records that this row is a soft-wrap continuation of
/// the previous row (set by the screen writer on auto-wrap); reflow
/// consults only this bit when merging logical lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<Cell>,
    wrapped: bool,
}

impl Row {
    /// A fresh, fully blank row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from explicit cells.
    #[must_use]
    pub fn from_cells(cells: Vec<Cell>, wrapped: bool) -> Self {
        Self { cells, wrapped }
    }

    /// The allocated cells (may be shorter than the grid width).
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of allocated cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cells are allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether this row is a soft-wrap continuation of the previous row.
    #[must_use]
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }

    /// Set the soft-wrap continuation bit.
    pub fn set_wrapped(&mut self, wrapped: bool) {
        self.wrapped = wrapped;
    }

    /// The cell at `x`, or a blank if beyond the allocated span.
    #[must_use]
    pub fn get(&self, x: u16) -> Cell {
        self.cells.get(x as usize).copied().unwrap_or_default()
    }

    /// Mutable access to the cell at `x`, extending with blanks as needed.
    pub fn get_mut_extending(&mut self, x: u16) -> &mut Cell {
        let x = x as usize;
        if x >= self.cells.len() {
            self.cells.resize(x + 1, Cell::default());
        }
        &mut self.cells[x]
    }

    /// Drop trailing cells that are blank with default attributes.
    pub fn trim_trailing_blanks(&mut self) {
        while self.cells.last().is_some_and(Cell::is_blank) {
            self.cells.pop();
        }
    }

    /// Whether every cell is blank with default attributes.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }
}

/// Dense 2-D character cell buffer with a scrollback ring.
#[derive(Debug, Clone)]
pub struct Grid {
    sx: u16,
    sy: u16,
    /// Exactly `sy` rows; individual rows may be allocated short.
    rows: Vec<Row>,
    history: Scrollback,
}

impl Grid {
    /// Create a blank grid of `sx` columns by `sy` rows with up to
    /// `history_limit` rows of scrollback.
    #[must_use]
    pub fn new(sx: u16, sy: u16, history_limit: usize) -> Self {
        let sx = sx.max(1);
        let sy = sy.max(1);
        Self {
            sx,
            sy,
            rows: vec![Row::new(); sy as usize],
            history: Scrollback::new(history_limit),
        }
    }

    /// Grid width in columns.
    #[must_use]
    pub fn sx(&self) -> u16 {
        self.sx
    }

    /// Visible height in rows.
    #[must_use]
    pub fn sy(&self) -> u16 {
        self.sy
    }

    /// Number of rows currently held in scrollback.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The scrollback ring.
    #[must_use]
    pub fn history(&self) -> &Scrollback {
        &self.history
    }

    /// Change the scrollback capacity, evicting the oldest rows if shrinking.
    pub fn set_history_limit(&mut self, limit: usize) {
        self.history.set_capacity(limit);
    }

    /// Clear the scrollback ring.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// The visible row at `y`, or `None` out of range.
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&Row> {
        self.rows.get(y as usize)
    }

    /// Set the soft-wrap continuation bit on row `y`.
    pub fn set_row_wrapped(&mut self, y: u16, wrapped: bool) {
        if let Some(row) = self.rows.get_mut(y as usize) {
            row.set_wrapped(wrapped);
        }
    }

    /// Mutable access to the cell at `(x, y)`, allocating lazily.
    ///
    /// Unlike [`set_cell`](Self::set_cell) this performs no wide-pair
    /// fixup; callers use it for in-place edits that keep the pair intact
    /// (combining-mark append).
    pub fn cell_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if x >= self.sx || y >= self.sy {
            return None;
        }
        Some(self.rows[y as usize].get_mut_extending(x))
    }

    /// Read the cell at `(x, y)`. Out-of-range reads return a blank.
    #[must_use]
    pub fn get_cell(&self, x: u16, y: u16) -> Cell {
        if x >= self.sx {
            return Cell::default();
        }
        self.rows
            .get(y as usize)
            .map(|row| row.get(x))
            .unwrap_or_default()
    }

    /// Write `cell` at `(x, y)`, clamping out-of-range coordinates.
    ///
    /// Maintains the wide-cell invariant: overwriting either half of an
    /// existing wide pair erases the orphaned half.
    pub fn set_cell(&mut self, x: u16, y: u16, cell: Cell) {
        let x = x.min(self.sx.saturating_sub(1));
        let y = y.min(self.sy.saturating_sub(1));
        self.fix_wide_overlap(x, y);
        *self.rows[y as usize].get_mut_extending(x) = cell;
    }

    /// Erase either half of a wide pair that the write at `(x, y)` would orphan.
    fn fix_wide_overlap(&mut self, x: u16, y: u16) {
        let old = self.get_cell(x, y);
        if old.is_wide() && x + 1 < self.sx {
            let next = self.get_cell(x + 1, y);
            if next.is_wide_continuation() {
                self.rows[y as usize]
                    .get_mut_extending(x + 1)
                    .erase(Color::Default);
            }
        }
        if old.is_wide_continuation() && x > 0 {
            let prev = self.get_cell(x - 1, y);
            if prev.is_wide() {
                self.rows[y as usize]
                    .get_mut_extending(x - 1)
                    .erase(Color::Default);
            }
        }
    }

    /// Erase `n` cells starting at `(x, y)` with background `bg`.
    pub fn clear_cells(&mut self, x: u16, y: u16, n: u16, bg: Color) {
        if y >= self.sy || x >= self.sx || n == 0 {
            return;
        }
        let end = x.saturating_add(n).min(self.sx);
        self.fix_wide_overlap(x, y);
        if end < self.sx {
            self.fix_wide_overlap(end - 1, y);
        }
        let row = &mut self.rows[y as usize];
        if end as usize > row.len() && bg == Color::Default {
            // Erasing into the unallocated span with default background is
            // a no-op beyond the allocated cells.
            let stop = (row.len() as u16).max(x);
            for cx in x..stop {
                row.get_mut_extending(cx).erase(bg);
            }
        } else {
            for cx in x..end {
                row.get_mut_extending(cx).erase(bg);
            }
        }
        row.trim_trailing_blanks();
    }

    /// Erase `n` whole rows starting at row `y`.
    pub fn clear_lines(&mut self, y: u16, n: u16, bg: Color) {
        if y >= self.sy || n == 0 {
            return;
        }
        let end = y.saturating_add(n).min(self.sy);
        for cy in y..end {
            let row = &mut self.rows[cy as usize];
            *row = Row::new();
            if bg != Color::Default {
                for cx in 0..self.sx {
                    row.get_mut_extending(cx).erase(bg);
                }
            }
        }
    }

    /// Scroll rows `[top, bot]` up by `n`, filling vacated rows with `bg`.
    ///
    /// When the region is the full screen, the retired rows feed into
    /// scrollback; partial-region scrolls discard them.
    pub fn scroll_region_up(&mut self, top: u16, bot: u16, n: u16, bg: Color) {
        let (top, bot) = match self.clamp_region(top, bot) {
            Some(r) => r,
            None => return,
        };
        let span = bot - top + 1;
        let n = n.min(span);
        if n == 0 {
            return;
        }
        let full_screen = top == 0 && bot == self.sy - 1;
        for _ in 0..n {
            let mut retired = std::mem::take(&mut self.rows[top as usize]);
            if full_screen {
                retired.trim_trailing_blanks();
                let _ = self.history.push_row(retired);
            }
            self.rows[top as usize..=bot as usize].rotate_left(1);
            self.fill_row(bot, bg);
        }
    }

    /// Scroll rows `[top, bot]` down by `n`, filling vacated rows with `bg`.
    ///
    /// Scrolling down never touches scrollback; rows pushed off the bottom
    /// of the region are discarded.
    pub fn scroll_region_down(&mut self, top: u16, bot: u16, n: u16, bg: Color) {
        let (top, bot) = match self.clamp_region(top, bot) {
            Some(r) => r,
            None => return,
        };
        let span = bot - top + 1;
        let n = n.min(span);
        if n == 0 {
            return;
        }
        for _ in 0..n {
            self.rows[top as usize..=bot as usize].rotate_right(1);
            self.fill_row(top, bg);
        }
    }

    /// Copy `n` rows starting at `src_y` over the rows starting at `dst_y`.
    ///
    /// Overlapping ranges behave like `memmove`. Out-of-range spans clamp.
    pub fn move_lines(&mut self, dst_y: u16, src_y: u16, n: u16) {
        if n == 0 || dst_y == src_y {
            return;
        }
        let n = n
            .min(self.sy.saturating_sub(dst_y))
            .min(self.sy.saturating_sub(src_y));
        if n == 0 {
            return;
        }
        let copied: Vec<Row> =
            self.rows[src_y as usize..(src_y + n) as usize].to_vec();
        self.rows[dst_y as usize..(dst_y + n) as usize].clone_from_slice(&copied);
    }

    /// Insert `n` blank cells at `(x, y)`, shifting the rest of the row right.
    ///
    /// Cells pushed past the grid width are dropped (ICH semantics).
    pub fn insert_cells(&mut self, x: u16, y: u16, n: u16, bg: Color) {
        if y >= self.sy || x >= self.sx || n == 0 {
            return;
        }
        self.fix_wide_overlap(x, y);
        let row = &mut self.rows[y as usize];
        if (x as usize) >= row.len() {
            return;
        }
        let mut blank = Cell::default();
        blank.erase(bg);
        for _ in 0..n {
            row.cells.insert(x as usize, blank);
        }
        row.cells.truncate(self.sx as usize);
        row.trim_trailing_blanks();
    }

    /// Delete `n` cells at `(x, y)`, shifting the rest of the row left and
    /// filling vacated cells with `bg` (DCH semantics).
    pub fn delete_cells(&mut self, x: u16, y: u16, n: u16, bg: Color) {
        if y >= self.sy || x >= self.sx || n == 0 {
            return;
        }
        self.fix_wide_overlap(x, y);
        let row = &mut self.rows[y as usize];
        let len = row.len();
        if x as usize >= len {
            return;
        }
        let n = (n as usize).min(len - x as usize);
        row.cells.drain(x as usize..x as usize + n);
        if bg != Color::Default {
            let start = row.len() as u16;
            for cx in start..self.sx {
                row.get_mut_extending(cx).erase(bg);
            }
        }
        row.trim_trailing_blanks();
    }

    /// Render the cells of row `y` from `x0` for `len` columns as a string.
    ///
    /// Wide-continuation padding contributes nothing; unallocated cells
    /// contribute spaces.
    #[must_use]
    pub fn view_row_as_string(&self, y: u16, x0: u16, len: u16) -> String {
        let mut out = String::new();
        let Some(row) = self.rows.get(y as usize) else {
            return out;
        };
        let end = x0.saturating_add(len).min(self.sx);
        for x in x0..end {
            let cell = row.get(x);
            if cell.is_wide_continuation() {
                continue;
            }
            out.push_str(cell.glyph().as_str());
        }
        out
    }

    /// Resize to `new_sx` × `new_sy`, reflowing soft-wrapped lines across
    /// the width change. Returns the cursor translated to the new layout.
    ///
    /// Both the visible screen and the scrollback reflow; the `wrapped` bit
    /// is the only wrap evidence consulted.
    pub fn resize(&mut self, new_sx: u16, new_sy: u16, cursor: (u16, u16)) -> (u16, u16) {
        let new_sx = new_sx.max(1);
        let new_sy = new_sy.max(1);
        if new_sx == self.sx && new_sy == self.sy {
            return (cursor.0.min(new_sx - 1), cursor.1.min(new_sy - 1));
        }

        let (cx, cy) = (cursor.0.min(self.sx - 1), cursor.1.min(self.sy - 1));

        // Flatten history + visible rows, remembering where the cursor row
        // lands and dropping blank rows trailing below it.
        let mut flat: Vec<Row> = self.history.drain_all();
        let cursor_flat = flat.len() + cy as usize;
        flat.extend(self.rows.drain(..));
        while flat.len() > cursor_flat + 1
            && flat.last().is_some_and(|r| r.is_blank() && !r.wrapped())
        {
            flat.pop();
        }

        // Merge soft-wrapped runs into logical lines; track the cursor as
        // (logical line index, cell offset within the line). The offset is
        // exact because it is taken before each merge append.
        let mut logical: Vec<Vec<Cell>> = Vec::new();
        let mut cursor_line = 0usize;
        let mut cursor_off = 0usize;
        for (i, row) in flat.into_iter().enumerate() {
            let mut cells = row.cells;
            if row.wrapped && !logical.is_empty() {
                let logical_len = logical.len();
                let last = logical.last_mut().unwrap();
                if i == cursor_flat {
                    cursor_line = logical_len - 1;
                    cursor_off = last.len() + cx as usize;
                }
                last.append(&mut cells);
            } else {
                if i == cursor_flat {
                    cursor_line = logical.len();
                    cursor_off = cx as usize;
                }
                logical.push(cells);
            }
        }

        // Re-wrap every logical line at the new width, avoiding a wide lead
        // in the final column.
        let mut rows: Vec<Row> = Vec::new();
        let mut new_cursor_flat = 0usize;
        let mut new_cursor_x = 0u16;
        for (li, cells) in logical.iter().enumerate() {
            let start_row = rows.len();
            rewrap_line(cells, new_sx, &mut rows);
            if li == cursor_line {
                let (dr, dx) = offset_to_rowcol(cells, cursor_off, new_sx);
                new_cursor_flat = start_row + dr;
                new_cursor_x = dx;
            }
        }
        if rows.is_empty() {
            rows.push(Row::new());
        }

        // Distribute: the last `new_sy` rows stay visible, the rest retire
        // into scrollback (oldest first). Pad short content at the bottom.
        let total = rows.len();
        let visible_start = total.saturating_sub(new_sy as usize);
        let mut iter = rows.into_iter();
        for _ in 0..visible_start {
            let _ = self.history.push_row(iter.next().unwrap());
        }
        let mut visible: Vec<Row> = iter.collect();
        visible.resize(new_sy as usize, Row::new());

        self.sx = new_sx;
        self.sy = new_sy;
        self.rows = visible;

        let new_cy = new_cursor_flat.saturating_sub(visible_start) as u16;
        (
            new_cursor_x.min(new_sx - 1),
            new_cy.min(new_sy - 1),
        )
    }

    fn clamp_region(&self, top: u16, bot: u16) -> Option<(u16, u16)> {
        let top = top.min(self.sy.saturating_sub(1));
        let bot = bot.min(self.sy.saturating_sub(1));
        if top > bot { None } else { Some((top, bot)) }
    }

    fn fill_row(&mut self, y: u16, bg: Color) {
        let row = &mut self.rows[y as usize];
        *row = Row::new();
        if bg != Color::Default {
            for cx in 0..self.sx {
                row.get_mut_extending(cx).erase(bg);
            }
        }
    }
}

/// Re-wrap one logical line's cells at `width`, appending rows.
fn rewrap_line(cells: &[Cell], width: u16, rows: &mut Vec<Row>) {
    if cells.is_empty() {
        rows.push(Row::new());
        return;
    }
    let width = width.max(1) as usize;
    let mut current: Vec<Cell> = Vec::new();
    let mut first = true;
    let mut used = 0usize;
    for cell in cells {
        let w = if cell.is_wide_continuation() {
            0
        } else {
            cell.width().max(1) as usize
        };
        // A wide lead must not start in the final column.
        let overflow = used + w > width || (cell.is_wide() && used + 2 > width);
        if overflow && !current.is_empty() {
            let mut row = Row::from_cells(std::mem::take(&mut current), !first);
            row.trim_trailing_blanks();
            rows.push(row);
            first = false;
            used = 0;
        }
        current.push(*cell);
        used += w;
    }
    let mut row = Row::from_cells(current, !first);
    row.trim_trailing_blanks();
    rows.push(row);
}

/// Translate a cell offset within a logical line into (row delta, column)
/// after re-wrapping at `width`.
fn offset_to_rowcol(cells: &[Cell], offset: usize, width: u16) -> (usize, u16) {
    let width = width.max(1) as usize;
    let mut row = 0usize;
    let mut col = 0usize;
    for i in 0..offset {
        // Offsets past the allocated cells walk over implicit blanks so a
        // cursor sitting beyond the text keeps its column.
        let (w, wide) = match cells.get(i) {
            Some(c) if c.is_wide_continuation() => (0usize, false),
            Some(c) => (c.width().max(1) as usize, c.is_wide()),
            None => (1, false),
        };
        if col + w > width || (wide && col + 2 > width) {
            row += 1;
            col = 0;
        }
        col += w;
        if col >= width {
            row += 1;
            col = 0;
        }
    }
    (row, col.min(width - 1) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Attrs, Glyph};

    fn put_str(grid: &mut Grid, x: u16, y: u16, s: &str) {
        for (i, ch) in s.chars().enumerate() {
            grid.set_cell(x + i as u16, y, Cell::new(ch));
        }
    }

    #[test]
    fn get_out_of_range_is_blank() {
        let grid = Grid::new(10, 4, 0);
        assert!(grid.get_cell(50, 50).is_blank());
    }

    #[test]
    fn set_cell_clamps() {
        let mut grid = Grid::new(10, 4, 0);
        grid.set_cell(100, 100, Cell::new('x'));
        assert_eq!(grid.get_cell(9, 3).glyph().as_str(), "x");
    }

    #[test]
    fn rows_allocate_lazily() {
        let mut grid = Grid::new(80, 24, 0);
        assert_eq!(grid.row(5).unwrap().len(), 0);
        grid.set_cell(3, 5, Cell::new('a'));
        assert_eq!(grid.row(5).unwrap().len(), 4);
    }

    #[test]
    fn full_screen_scroll_feeds_history() {
        let mut grid = Grid::new(10, 3, 100);
        put_str(&mut grid, 0, 0, "top");
        grid.scroll_region_up(0, 2, 1, Color::Default);
        assert_eq!(grid.history_len(), 1);
        assert_eq!(grid.view_row_as_string(0, 0, 10), "");
    }

    #[test]
    fn partial_region_scroll_skips_history() {
        let mut grid = Grid::new(10, 4, 100);
        put_str(&mut grid, 0, 1, "mid");
        grid.scroll_region_up(1, 2, 1, Color::Default);
        assert_eq!(grid.history_len(), 0);
        assert_eq!(grid.view_row_as_string(1, 0, 10), "");
    }

    #[test]
    fn scroll_down_discards() {
        let mut grid = Grid::new(10, 3, 100);
        put_str(&mut grid, 0, 2, "bottom");
        grid.scroll_region_down(0, 2, 1, Color::Default);
        assert_eq!(grid.history_len(), 0);
        assert_eq!(grid.view_row_as_string(2, 0, 10), "");
        assert_eq!(grid.view_row_as_string(0, 0, 10), "");
    }

    #[test]
    fn history_respects_limit() {
        let mut grid = Grid::new(10, 2, 3);
        for i in 0..10 {
            put_str(&mut grid, 0, 0, &format!("l{i}"));
            grid.scroll_region_up(0, 1, 1, Color::Default);
        }
        assert_eq!(grid.history_len(), 3);
    }

    #[test]
    fn overwriting_wide_lead_erases_continuation() {
        let mut grid = Grid::new(10, 2, 0);
        let (lead, cont) = Cell::wide(Glyph::from_char('中'), Attrs::default());
        grid.set_cell(2, 0, lead);
        grid.set_cell(3, 0, cont);
        grid.set_cell(2, 0, Cell::new('x'));
        assert!(!grid.get_cell(3, 0).is_wide_continuation());
    }

    #[test]
    fn overwriting_continuation_erases_lead() {
        let mut grid = Grid::new(10, 2, 0);
        let (lead, cont) = Cell::wide(Glyph::from_char('中'), Attrs::default());
        grid.set_cell(2, 0, lead);
        grid.set_cell(3, 0, cont);
        grid.set_cell(3, 0, Cell::new('y'));
        assert!(!grid.get_cell(2, 0).is_wide());
        assert_eq!(grid.get_cell(2, 0).glyph().as_str(), " ");
    }

    #[test]
    fn insert_cells_shifts_right() {
        let mut grid = Grid::new(6, 1, 0);
        put_str(&mut grid, 0, 0, "abcdef");
        grid.insert_cells(1, 0, 2, Color::Default);
        assert_eq!(grid.view_row_as_string(0, 0, 6), "a  bcd");
    }

    #[test]
    fn delete_cells_shifts_left() {
        let mut grid = Grid::new(6, 1, 0);
        put_str(&mut grid, 0, 0, "abcdef");
        grid.delete_cells(1, 0, 2, Color::Default);
        assert_eq!(grid.view_row_as_string(0, 0, 6), "adef");
    }

    #[test]
    fn move_lines_copies() {
        let mut grid = Grid::new(6, 4, 0);
        put_str(&mut grid, 0, 0, "one");
        put_str(&mut grid, 0, 1, "two");
        grid.move_lines(2, 0, 2);
        assert_eq!(grid.view_row_as_string(2, 0, 6), "one");
        assert_eq!(grid.view_row_as_string(3, 0, 6), "two");
    }

    #[test]
    fn reflow_merges_wrapped_lines() {
        let mut grid = Grid::new(4, 3, 10);
        put_str(&mut grid, 0, 0, "abcd");
        put_str(&mut grid, 0, 1, "ef");
        grid.rows[1].set_wrapped(true);
        let cursor = grid.resize(8, 3, (2, 1));
        assert_eq!(grid.view_row_as_string(0, 0, 8), "abcdef");
        // Cursor was at offset 4+2=6 in the logical line -> (6, 0).
        assert_eq!(cursor, (6, 0));
    }

    #[test]
    fn reflow_splits_at_narrower_width() {
        let mut grid = Grid::new(8, 3, 10);
        put_str(&mut grid, 0, 0, "abcdef");
        let _ = grid.resize(4, 3, (0, 0));
        assert_eq!(grid.view_row_as_string(0, 0, 4), "abcd");
        assert_eq!(grid.view_row_as_string(1, 0, 4), "ef");
        assert!(grid.row(1).unwrap().wrapped());
    }

    #[test]
    fn reflow_preserves_attributes() {
        let mut grid = Grid::new(8, 2, 10);
        let mut cell = Cell::new('z');
        cell.attrs.fg = Color::Rgb(1, 2, 3);
        grid.set_cell(0, 0, cell);
        let _ = grid.resize(4, 2, (0, 0));
        assert_eq!(grid.get_cell(0, 0).attrs.fg, Color::Rgb(1, 2, 3));
    }

    #[test]
    fn shrink_height_retires_rows_to_history() {
        let mut grid = Grid::new(8, 4, 10);
        for y in 0..4 {
            put_str(&mut grid, 0, y, &format!("row{y}"));
        }
        let cursor = grid.resize(8, 2, (0, 3));
        assert_eq!(grid.history_len(), 2);
        assert_eq!(grid.view_row_as_string(0, 0, 8), "row2");
        assert_eq!(grid.view_row_as_string(1, 0, 8), "row3");
        assert_eq!(cursor, (0, 1));
    }

    #[test]
    fn resize_same_size_is_identity() {
        let mut grid = Grid::new(8, 4, 10);
        put_str(&mut grid, 0, 0, "keep");
        let cursor = grid.resize(8, 4, (1, 1));
        assert_eq!(cursor, (1, 1));
        assert_eq!(grid.view_row_as_string(0, 0, 8), "keep");
    }
}
