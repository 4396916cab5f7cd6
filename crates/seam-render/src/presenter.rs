//! Per-client presentation: diff the composed frame against the client's
//! last-known screen and emit the smallest escape sequence that bridges
//! the two.
//!
//! Technique, per row: skip rows whose cells are equal; inside a changed
//! row trim the longest unchanged run at both ends, position the cursor
//! once, and emit the middle with attribute-run accumulation so identical
//! SGR state never repeats.

use seam_term::{Attrs, Cell};

use crate::ansi::{emit_attrs, emit_cup};
use crate::buffer::FrameBuffer;
use crate::caps::{Cap, TermCaps};

/// Map a box-drawing border glyph to its ACS letter (ESC ( 0 alphabet).
fn acs_letter(ch: char) -> Option<u8> {
    Some(match ch {
        '─' => b'q',
        '│' => b'x',
        '┼' => b'n',
        '├' => b't',
        '┤' => b'u',
        '┬' => b'w',
        '┴' => b'v',
        '┌' => b'l',
        '┐' => b'k',
        '└' => b'm',
        '┘' => b'j',
        _ => return None,
    })
}

/// ASCII stand-ins when neither UTF-8 nor ACS is available.
fn ascii_fallback(ch: char) -> Option<u8> {
    Some(match ch {
        '─' => b'-',
        '│' => b'|',
        '┼' | '├' | '┤' | '┬' | '┴' | '┌' | '┐' | '└' | '┘' => b'+',
        _ => return None,
    })
}

/// Tracks one client terminal's last-rendered content and emission state.
#[derive(Debug)]
pub struct Presenter {
    last: FrameBuffer,
    /// False until the first present (or after a resize): forces a full
    /// clear + redraw because the real screen content is unknown.
    known: bool,
    attrs: Attrs,
    cursor: (u16, u16),
    cursor_visible: bool,
    in_acs: bool,
}

impl Presenter {
    /// Create a presenter for a client of the given size.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            last: FrameBuffer::new(width, height),
            known: false,
            attrs: Attrs::default(),
            cursor: (0, 0),
            cursor_visible: true,
            in_acs: false,
        }
    }

    /// Note a client resize; the next present redraws from scratch.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.last = FrameBuffer::new(width, height);
        self.known = false;
    }

    /// Invalidate the last-known screen (client asked for a full redraw).
    pub fn invalidate(&mut self) {
        self.known = false;
    }

    /// The last frame presented, byte-for-byte (for attach restoration
    /// checks and tests).
    #[must_use]
    pub fn last_frame(&self) -> &FrameBuffer {
        &self.last
    }

    /// Diff `frame` against the last-known screen and append the bridging
    /// escape output to `out`. `cursor` is the desired final cursor
    /// position, `cursor_visible` its visibility.
    pub fn present(
        &mut self,
        frame: &FrameBuffer,
        cursor: (u16, u16),
        cursor_visible: bool,
        caps: &TermCaps,
        out: &mut Vec<u8>,
    ) {
        if frame.width() != self.last.width() || frame.height() != self.last.height() {
            self.resize(frame.width(), frame.height());
        }

        // Hide the cursor while painting so partial rows never flash it.
        if self.cursor_visible {
            self.emit_cap_or(out, caps, Cap::Civis, "\x1b[?25l");
            self.cursor_visible = false;
        }

        if !self.known {
            emit_attrs(out, caps, self.attrs, Attrs::default());
            self.attrs = Attrs::default();
            emit_cup(out, caps, 0, 0);
            self.emit_cap_or(out, caps, Cap::Ed, "\x1b[J");
            for y in 0..frame.height() {
                self.emit_row_range(frame, y, 0, frame.width(), caps, out);
            }
            self.known = true;
        } else {
            for y in 0..frame.height() {
                let (old_row, new_row) = (self.last.row(y), frame.row(y));
                if old_row == new_row {
                    continue;
                }
                // Trim the longest unchanged runs at both ends.
                let mut first = 0u16;
                while (first as usize) < new_row.len()
                    && old_row[first as usize] == new_row[first as usize]
                {
                    first += 1;
                }
                let mut last = new_row.len() as u16;
                while last > first && old_row[last as usize - 1] == new_row[last as usize - 1] {
                    last -= 1;
                }
                // Never split a wide pair at the run edges.
                if first > 0 && new_row[first as usize].is_wide_continuation() {
                    first -= 1;
                }
                if (last as usize) < new_row.len()
                    && new_row[last as usize].is_wide_continuation()
                {
                    last += 1;
                }
                self.emit_row_range(frame, y, first, last, caps, out);
            }
        }

        self.leave_acs(out, caps);
        emit_cup(out, caps, cursor.0, cursor.1);
        self.cursor = cursor;
        if cursor_visible {
            self.emit_cap_or(out, caps, Cap::Cnorm, "\x1b[?25h");
        }
        self.cursor_visible = cursor_visible;
        self.last = frame.clone();
    }

    /// Emit cells `[x0, x1)` of row `y`, updating emission state.
    fn emit_row_range(
        &mut self,
        frame: &FrameBuffer,
        y: u16,
        x0: u16,
        x1: u16,
        caps: &TermCaps,
        out: &mut Vec<u8>,
    ) {
        if x0 >= x1 {
            return;
        }
        emit_cup(out, caps, x0, y);
        let mut x = x0;
        while x < x1 {
            let cell = frame.get(x, y);
            if cell.is_wide_continuation() {
                x += 1;
                continue;
            }
            if cell.attrs != self.attrs {
                // Attribute changes close an ACS run first: SGR inside the
                // alternate charset confuses some terminals.
                self.leave_acs(out, caps);
                emit_attrs(out, caps, self.attrs, cell.attrs);
                self.attrs = cell.attrs;
            }
            self.emit_glyph(&cell, caps, out);
            x += cell.width().max(1) as u16;
        }
        self.cursor = (x1.min(frame.width() - 1), y);
    }

    fn emit_glyph(&mut self, cell: &Cell, caps: &TermCaps, out: &mut Vec<u8>) {
        let text = cell.glyph().as_str();
        if caps.utf8 {
            self.leave_acs(out, caps);
            out.extend_from_slice(text.as_bytes());
            return;
        }
        // Non-UTF-8 client: borders go through ACS, other non-ASCII
        // content degrades to underscores.
        let ch = text.chars().next().unwrap_or(' ');
        if ch.is_ascii() {
            self.leave_acs(out, caps);
            out.push(ch as u8);
        } else if let Some(letter) = acs_letter(ch) {
            if caps.get(Cap::Smacs).is_some() {
                self.enter_acs(out, caps);
                out.push(letter);
            } else {
                out.push(ascii_fallback(ch).unwrap_or(b'+'));
            }
        } else {
            self.leave_acs(out, caps);
            for _ in 0..cell.width().max(1) {
                out.push(b'_');
            }
        }
    }

    fn enter_acs(&mut self, out: &mut Vec<u8>, caps: &TermCaps) {
        if !self.in_acs {
            self.emit_cap_or(out, caps, Cap::Smacs, "\x1b(0");
            self.in_acs = true;
        }
    }

    fn leave_acs(&mut self, out: &mut Vec<u8>, caps: &TermCaps) {
        if self.in_acs {
            self.emit_cap_or(out, caps, Cap::Rmacs, "\x1b(B");
            self.in_acs = false;
        }
    }

    fn emit_cap_or(&self, out: &mut Vec<u8>, caps: &TermCaps, cap: Cap, fallback: &str) {
        match caps.get(cap) {
            Some(s) => out.extend_from_slice(s.as_bytes()),
            None => out.extend_from_slice(fallback.as_bytes()),
        }
    }
}
