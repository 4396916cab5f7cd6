//! Frame buffer: the composed picture of one client's terminal.
//!
//! The server blits each visible pane's grid at its layout offset, draws
//! the borders between panes, and writes the status line; the presenter
//! then diffs this frame against the client's last-known screen.

use seam_term::{Attrs, Cell, Glyph, Grid};
use unicode_segmentation::UnicodeSegmentation;

/// Box-drawing glyphs used for pane borders.
///
/// Stored as Unicode; the presenter maps them to ACS or ASCII when the
/// client terminal is not UTF-8.
pub const BORDER_HORIZONTAL: char = '─';
pub const BORDER_VERTICAL: char = '│';
pub const BORDER_CROSS: char = '┼';
pub const BORDER_TEE_LEFT: char = '├';
pub const BORDER_TEE_RIGHT: char = '┤';
pub const BORDER_TEE_DOWN: char = '┬';
pub const BORDER_TEE_UP: char = '┴';

/// A dense `width` × `height` cell matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    /// Create a blank frame.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cells: vec![Cell::default(); width as usize * height as usize],
        }
    }

    /// Frame width in columns.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Frame height in rows.
    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// The cell at `(x, y)`; out-of-range reads return a blank.
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Cell {
        if x >= self.width || y >= self.height {
            return Cell::default();
        }
        self.cells[self.index(x, y)]
    }

    /// Write the cell at `(x, y)`; out-of-range writes are dropped.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.index(x, y);
        self.cells[idx] = cell;
    }

    /// One full row of cells.
    #[must_use]
    pub fn row(&self, y: u16) -> &[Cell] {
        let start = y as usize * self.width as usize;
        &self.cells[start..start + self.width as usize]
    }

    /// Copy the visible portion of a grid to `(ox, oy)`, clipped to
    /// `w` × `h`.
    pub fn blit_grid(&mut self, grid: &Grid, ox: u16, oy: u16, w: u16, h: u16) {
        let w = w.min(grid.sx());
        let h = h.min(grid.sy());
        for y in 0..h {
            let fy = oy + y;
            if fy >= self.height {
                break;
            }
            for x in 0..w {
                let fx = ox + x;
                if fx >= self.width {
                    break;
                }
                self.set(fx, fy, grid.get_cell(x, y));
            }
        }
    }

    /// Write a string at `(x, y)`, truncating at `max_width` columns.
    ///
    /// Segments into grapheme clusters so combining marks stay attached
    /// to their base cell. Returns the number of columns consumed.
    pub fn put_str(&mut self, x: u16, y: u16, s: &str, attrs: Attrs, max_width: u16) -> u16 {
        let mut used = 0u16;
        for cluster in s.graphemes(true) {
            let glyph = Glyph::from_grapheme(cluster);
            let w = u16::from(glyph.width());
            if w == 0 {
                continue;
            }
            if used + w > max_width || x + used >= self.width {
                break;
            }
            if w == 2 {
                let (lead, cont) = Cell::wide(glyph, attrs);
                self.set(x + used, y, lead);
                self.set(x + used + 1, y, cont);
            } else {
                self.set(x + used, y, Cell::with_attrs(glyph, attrs));
            }
            used += w;
        }
        used
    }

    /// Fill a horizontal run with one character.
    pub fn fill_h(&mut self, x: u16, y: u16, len: u16, ch: char, attrs: Attrs) {
        for i in 0..len {
            self.set(x + i, y, Cell::with_attrs(Glyph::from_char(ch), attrs));
        }
    }

    /// Fill a vertical run with one character.
    pub fn fill_v(&mut self, x: u16, y: u16, len: u16, ch: char, attrs: Attrs) {
        for i in 0..len {
            self.set(x, y + i, Cell::with_attrs(Glyph::from_char(ch), attrs));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seam_term::{Parser, Screen};

    #[test]
    fn blank_frame_is_spaces() {
        let frame = FrameBuffer::new(4, 2);
        assert!(frame.get(3, 1).is_blank());
        assert!(frame.get(10, 10).is_blank());
    }

    #[test]
    fn blit_copies_at_offset() {
        let mut screen = Screen::new(10, 4, 0);
        let mut parser = Parser::new();
        parser.feed(b"hi", &mut screen);

        let mut frame = FrameBuffer::new(20, 10);
        frame.blit_grid(screen.grid(), 5, 3, 10, 4);
        assert_eq!(frame.get(5, 3).glyph().as_str(), "h");
        assert_eq!(frame.get(6, 3).glyph().as_str(), "i");
    }

    #[test]
    fn blit_clips_to_frame() {
        let mut screen = Screen::new(10, 4, 0);
        let mut parser = Parser::new();
        parser.feed(b"wide", &mut screen);
        let mut frame = FrameBuffer::new(6, 2);
        frame.blit_grid(screen.grid(), 4, 0, 10, 4);
        assert_eq!(frame.get(4, 0).glyph().as_str(), "w");
        assert_eq!(frame.get(5, 0).glyph().as_str(), "i");
        // The rest fell off the edge.
    }

    #[test]
    fn put_str_truncates() {
        let mut frame = FrameBuffer::new(10, 2);
        let used = frame.put_str(0, 0, "hello world", Attrs::default(), 5);
        assert_eq!(used, 5);
        assert_eq!(frame.get(4, 0).glyph().as_str(), "o");
        assert!(frame.get(5, 0).is_blank());
    }

    #[test]
    fn put_str_handles_wide() {
        let mut frame = FrameBuffer::new(10, 1);
        let used = frame.put_str(0, 0, "a中b", Attrs::default(), 10);
        assert_eq!(used, 4);
        assert!(frame.get(1, 0).is_wide());
        assert!(frame.get(2, 0).is_wide_continuation());
    }

    #[test]
    fn fills_draw_lines() {
        let mut frame = FrameBuffer::new(5, 5);
        frame.fill_h(0, 2, 5, BORDER_HORIZONTAL, Attrs::default());
        frame.fill_v(2, 0, 5, BORDER_VERTICAL, Attrs::default());
        assert_eq!(frame.get(0, 2).glyph().as_str(), "─");
        assert_eq!(frame.get(2, 0).glyph().as_str(), "│");
    }
}
