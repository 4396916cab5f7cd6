//! Screen: logical terminal state over a grid.
//!
//! Consumes parser events and applies them under the current cursor and
//! attribute state. Owns the pieces the grid does not: saved cursor, tab
//! stops, scroll region, mode flags, the alternate screen, and the title.
//!
//! Replies that terminals synthesise (DSR, DA, OSC colour queries) are
//! queued in a response buffer for the owner to write back to the child;
//! out-of-band happenings (bell, title change, clipboard writes) are queued
//! as [`ScreenEvent`]s.

use bitflags::bitflags;

use crate::cell::{AttrFlags, Attrs, Cell, Color, Glyph};
use crate::grid::Grid;
use crate::parser::{Params, Perform};

bitflags! {
    /// Terminal mode flags (SM/RM and DECSET/DECRST).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modes: u32 {
        /// IRM: insert rather than overwrite.
        const INSERT          = 1 << 0;
        /// DECAWM: wrap at the right margin.
        const AUTO_WRAP       = 1 << 1;
        /// DECOM: cursor addressing relative to the scroll region.
        const ORIGIN          = 1 << 2;
        /// DECCKM: application cursor keys.
        const APP_CURSOR      = 1 << 3;
        /// DECKPAM: application keypad.
        const APP_KEYPAD      = 1 << 4;
        /// DECTCEM: cursor visible.
        const CURSOR_VISIBLE  = 1 << 5;
        /// Mode 2004: bracketed paste.
        const BRACKETED_PASTE = 1 << 6;
        /// Mode 1004: focus reporting.
        const FOCUS_REPORT    = 1 << 7;
        /// Mode 1000: mouse presses.
        const MOUSE_STANDARD  = 1 << 8;
        /// Mode 1002: presses + drag.
        const MOUSE_BUTTON    = 1 << 9;
        /// Mode 1003: all motion.
        const MOUSE_ALL       = 1 << 10;
        /// Mode 1005: UTF-8 mouse coordinates.
        const MOUSE_UTF8      = 1 << 11;
        /// Mode 1006: SGR mouse encoding.
        const MOUSE_SGR       = 1 << 12;
        /// Mode 1015: urxvt mouse encoding.
        const MOUSE_URXVT     = 1 << 13;
        /// Currently on the alternate screen.
        const ALT_SCREEN      = 1 << 14;
    }
}

/// Out-of-band happenings surfaced to the pane owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    /// BEL was executed.
    Bell,
    /// The title changed (OSC 0/1/2).
    TitleChanged,
    /// OSC 52: set the clipboard. Payload is still base64.
    ClipboardSet(Vec<u8>),
}

/// Saved cursor state for DECSC/DECRC, kept per screen.
#[derive(Debug, Clone, Copy, Default)]
struct SavedCursor {
    cx: u16,
    cy: u16,
    attrs: Attrs,
    origin: bool,
    pending_wrap: bool,
}

/// Logical terminal: a grid plus emulator state.
#[derive(Debug)]
pub struct Screen {
    grid: Grid,
    /// The inactive companion grid; swapped in O(1) on mode 47/1047/1049.
    other_grid: Grid,
    cx: u16,
    cy: u16,
    pending_wrap: bool,
    attrs: Attrs,
    saved: SavedCursor,
    saved_other: SavedCursor,
    tabs: Vec<bool>,
    region_top: u16,
    region_bot: u16,
    modes: Modes,
    title: String,
    /// Last printed glyph, for REP.
    last_glyph: Option<Glyph>,
    responses: Vec<u8>,
    events: Vec<ScreenEvent>,
}

fn default_tabs(sx: u16) -> Vec<bool> {
    (0..sx).map(|x| x % 8 == 0 && x != 0).collect()
}

impl Screen {
    /// Create a screen of `sx` × `sy` with `history_limit` rows of scrollback.
    #[must_use]
    pub fn new(sx: u16, sy: u16, history_limit: usize) -> Self {
        let sx = sx.max(1);
        let sy = sy.max(1);
        Self {
            grid: Grid::new(sx, sy, history_limit),
            other_grid: Grid::new(sx, sy, 0),
            cx: 0,
            cy: 0,
            pending_wrap: false,
            attrs: Attrs::default(),
            saved: SavedCursor::default(),
            saved_other: SavedCursor::default(),
            tabs: default_tabs(sx),
            region_top: 0,
            region_bot: sy - 1,
            modes: Modes::AUTO_WRAP | Modes::CURSOR_VISIBLE,
            title: String::new(),
            last_glyph: None,
            responses: Vec::new(),
            events: Vec::new(),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// The active grid.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Screen width in columns.
    #[must_use]
    pub fn sx(&self) -> u16 {
        self.grid.sx()
    }

    /// Screen height in rows.
    #[must_use]
    pub fn sy(&self) -> u16 {
        self.grid.sy()
    }

    /// Cursor position (column, row).
    #[must_use]
    pub fn cursor(&self) -> (u16, u16) {
        (self.cx, self.cy)
    }

    /// Current graphic attributes.
    #[must_use]
    pub fn attrs(&self) -> Attrs {
        self.attrs
    }

    /// Current mode flags.
    #[must_use]
    pub fn modes(&self) -> Modes {
        self.modes
    }

    /// The screen title (OSC 0/1/2).
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The scroll region as (top, bottom), inclusive.
    #[must_use]
    pub fn region(&self) -> (u16, u16) {
        (self.region_top, self.region_bot)
    }

    /// Whether the pending-wrap latch is set.
    #[must_use]
    pub fn pending_wrap(&self) -> bool {
        self.pending_wrap
    }

    /// Drain queued reply bytes destined for the child process.
    pub fn take_responses(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.responses)
    }

    /// Drain queued out-of-band events.
    pub fn take_events(&mut self) -> Vec<ScreenEvent> {
        std::mem::take(&mut self.events)
    }

    /// Change the scrollback capacity of the primary grid.
    pub fn set_history_limit(&mut self, limit: usize) {
        if self.modes.contains(Modes::ALT_SCREEN) {
            self.other_grid.set_history_limit(limit);
        } else {
            self.grid.set_history_limit(limit);
        }
    }

    /// Resize both grids, reflowing content and clamping derived state.
    ///
    /// The active grid's cursor tracks the reflow; the inactive grid's
    /// saved cursor tracks its own.
    pub fn resize(&mut self, sx: u16, sy: u16) {
        let sx = sx.max(1);
        let sy = sy.max(1);
        let (ncx, ncy) = self.grid.resize(sx, sy, (self.cx, self.cy));
        self.cx = ncx;
        self.cy = ncy;
        let other_cursor = (self.saved_other.cx, self.saved_other.cy);
        let (ox, oy) = self.other_grid.resize(sx, sy, other_cursor);
        self.saved_other.cx = ox;
        self.saved_other.cy = oy;
        self.saved.cx = self.saved.cx.min(sx - 1);
        self.saved.cy = self.saved.cy.min(sy - 1);
        self.region_top = 0;
        self.region_bot = sy - 1;
        self.pending_wrap = false;
        let old = std::mem::take(&mut self.tabs);
        self.tabs = (0..sx)
            .map(|x| {
                old.get(x as usize)
                    .copied()
                    .unwrap_or(x % 8 == 0 && x != 0)
            })
            .collect();
    }

    // ── Cursor motion ───────────────────────────────────────────────

    fn region_for_cursor(&self) -> (u16, u16) {
        if self.modes.contains(Modes::ORIGIN) {
            (self.region_top, self.region_bot)
        } else {
            (0, self.sy() - 1)
        }
    }

    /// Move the cursor to absolute-or-origin-relative coordinates, clamped.
    fn move_cursor(&mut self, x: u16, y: u16) {
        let (top, bot) = self.region_for_cursor();
        self.cx = x.min(self.sx() - 1);
        self.cy = (top + y).min(bot);
        self.pending_wrap = false;
    }

    fn cursor_up(&mut self, n: u16) {
        let top = if self.cy >= self.region_top {
            self.region_top
        } else {
            0
        };
        self.cy = self.cy.saturating_sub(n.max(1)).max(top);
        self.pending_wrap = false;
    }

    fn cursor_down(&mut self, n: u16) {
        let bot = if self.cy <= self.region_bot {
            self.region_bot
        } else {
            self.sy() - 1
        };
        self.cy = self.cy.saturating_add(n.max(1)).min(bot);
        self.pending_wrap = false;
    }

    fn cursor_forward(&mut self, n: u16) {
        self.cx = self.cx.saturating_add(n.max(1)).min(self.sx() - 1);
        self.pending_wrap = false;
    }

    fn cursor_back(&mut self, n: u16) {
        self.cx = self.cx.saturating_sub(n.max(1));
        self.pending_wrap = false;
    }

    fn linefeed(&mut self) {
        self.pending_wrap = false;
        if self.cy == self.region_bot {
            self.grid.scroll_region_up(
                self.region_top,
                self.region_bot,
                1,
                self.attrs.bg,
            );
        } else if self.cy < self.sy() - 1 {
            self.cy += 1;
        }
    }

    fn reverse_index(&mut self) {
        self.pending_wrap = false;
        if self.cy == self.region_top {
            self.grid.scroll_region_down(
                self.region_top,
                self.region_bot,
                1,
                self.attrs.bg,
            );
        } else if self.cy > 0 {
            self.cy -= 1;
        }
    }

    fn next_tab_stop(&self) -> u16 {
        let mut x = self.cx + 1;
        while x < self.sx() {
            if self.tabs.get(x as usize).copied().unwrap_or(false) {
                return x;
            }
            x += 1;
        }
        self.sx() - 1
    }

    fn prev_tab_stop(&self) -> u16 {
        let mut x = self.cx;
        while x > 0 {
            x -= 1;
            if self.tabs.get(x as usize).copied().unwrap_or(false) {
                return x;
            }
        }
        0
    }

    // ── Printing ────────────────────────────────────────────────────

    fn wrap_line(&mut self) {
        self.pending_wrap = false;
        self.linefeed();
        self.cx = 0;
        // Mark the row the cursor landed on as a soft-wrap continuation.
        self.grid.set_row_wrapped(self.cy, true);
    }

    fn print_glyph(&mut self, glyph: Glyph) {
        let width = glyph.width().max(1) as u16;

        if self.pending_wrap && self.modes.contains(Modes::AUTO_WRAP) {
            self.wrap_line();
        }

        // A wide glyph that would straddle the margin skips the final
        // column and starts on the next row.
        if width == 2 && self.cx + 1 >= self.sx() {
            if self.modes.contains(Modes::AUTO_WRAP) {
                let mut filler = Cell::default();
                filler.erase(self.attrs.bg);
                self.grid.set_cell(self.cx, self.cy, filler);
                self.wrap_line();
            } else {
                self.cx = self.sx().saturating_sub(2);
            }
        }

        if self.modes.contains(Modes::INSERT) {
            self.grid.insert_cells(self.cx, self.cy, width, self.attrs.bg);
        }

        if width == 2 {
            let (lead, cont) = Cell::wide(glyph, self.attrs);
            self.grid.set_cell(self.cx, self.cy, lead);
            self.grid.set_cell(self.cx + 1, self.cy, cont);
        } else {
            self.grid
                .set_cell(self.cx, self.cy, Cell::with_attrs(glyph, self.attrs));
        }
        self.last_glyph = Some(glyph);

        let new_x = self.cx + width;
        if new_x >= self.sx() {
            self.cx = self.sx() - 1;
            self.pending_wrap = true;
        } else {
            self.cx = new_x;
        }
    }

    /// Attach a combining mark to the most recently completed cell.
    fn print_combining(&mut self, ch: char) {
        // The cell is to the left of the cursor, or at the cursor with the
        // wrap latch set; a combining mark never begins a row.
        let (x, y) = if self.pending_wrap {
            (self.cx, self.cy)
        } else if self.cx > 0 {
            (self.cx - 1, self.cy)
        } else {
            return;
        };
        // Land on the lead cell if we hit the trailing half of a wide pair.
        let x = if self.grid.get_cell(x, y).is_wide_continuation() && x > 0 {
            x - 1
        } else {
            x
        };
        if let Some(cell) = self.grid.cell_mut(x, y) {
            let _ = cell.glyph_mut().push_combining(ch);
        }
    }

    // ── Erase / edit operations ─────────────────────────────────────

    fn erase_display(&mut self, mode: u16) {
        let bg = self.attrs.bg;
        match mode {
            0 => {
                self.grid
                    .clear_cells(self.cx, self.cy, self.sx() - self.cx, bg);
                if self.cy + 1 < self.sy() {
                    self.grid
                        .clear_lines(self.cy + 1, self.sy() - self.cy - 1, bg);
                }
            }
            1 => {
                if self.cy > 0 {
                    self.grid.clear_lines(0, self.cy, bg);
                }
                self.grid.clear_cells(0, self.cy, self.cx + 1, bg);
            }
            2 => self.grid.clear_lines(0, self.sy(), bg),
            3 => self.grid.clear_history(),
            _ => {}
        }
    }

    fn erase_line(&mut self, mode: u16) {
        let bg = self.attrs.bg;
        match mode {
            0 => self
                .grid
                .clear_cells(self.cx, self.cy, self.sx() - self.cx, bg),
            1 => self.grid.clear_cells(0, self.cy, self.cx + 1, bg),
            2 => self.grid.clear_cells(0, self.cy, self.sx(), bg),
            _ => {}
        }
    }

    fn insert_lines(&mut self, n: u16) {
        if self.cy < self.region_top || self.cy > self.region_bot {
            return;
        }
        self.grid
            .scroll_region_down(self.cy, self.region_bot, n.max(1), self.attrs.bg);
        self.cx = 0;
        self.pending_wrap = false;
    }

    fn delete_lines(&mut self, n: u16) {
        if self.cy < self.region_top || self.cy > self.region_bot {
            return;
        }
        self.grid
            .scroll_region_up(self.cy, self.region_bot, n.max(1), self.attrs.bg);
        self.cx = 0;
        self.pending_wrap = false;
    }

    // ── Alternate screen ────────────────────────────────────────────

    fn enter_alt(&mut self, clear: bool, save_cursor: bool) {
        if self.modes.contains(Modes::ALT_SCREEN) {
            return;
        }
        if save_cursor {
            self.save_cursor();
        }
        std::mem::swap(&mut self.grid, &mut self.other_grid);
        std::mem::swap(&mut self.saved, &mut self.saved_other);
        self.modes.insert(Modes::ALT_SCREEN);
        if clear {
            self.grid.clear_lines(0, self.sy(), Color::Default);
            self.cx = 0;
            self.cy = 0;
        }
        self.attrs.reset();
        self.pending_wrap = false;
    }

    fn leave_alt(&mut self, clear: bool, restore_cursor: bool) {
        if !self.modes.contains(Modes::ALT_SCREEN) {
            return;
        }
        if clear {
            self.grid.clear_lines(0, self.sy(), Color::Default);
        }
        std::mem::swap(&mut self.grid, &mut self.other_grid);
        std::mem::swap(&mut self.saved, &mut self.saved_other);
        self.modes.remove(Modes::ALT_SCREEN);
        self.attrs.reset();
        if restore_cursor {
            self.restore_cursor();
        }
        self.pending_wrap = false;
    }

    fn save_cursor(&mut self) {
        self.saved = SavedCursor {
            cx: self.cx,
            cy: self.cy,
            attrs: self.attrs,
            origin: self.modes.contains(Modes::ORIGIN),
            pending_wrap: self.pending_wrap,
        };
    }

    fn restore_cursor(&mut self) {
        let saved = self.saved;
        self.cx = saved.cx.min(self.sx() - 1);
        self.cy = saved.cy.min(self.sy() - 1);
        self.attrs = saved.attrs;
        self.modes.set(Modes::ORIGIN, saved.origin);
        self.pending_wrap = saved.pending_wrap;
    }

    fn full_reset(&mut self) {
        let (sx, sy) = (self.sx(), self.sy());
        let limit = self.grid.history().capacity();
        if self.modes.contains(Modes::ALT_SCREEN) {
            self.leave_alt(false, false);
        }
        self.grid = Grid::new(sx, sy, limit);
        self.other_grid = Grid::new(sx, sy, 0);
        self.cx = 0;
        self.cy = 0;
        self.pending_wrap = false;
        self.attrs = Attrs::default();
        self.saved = SavedCursor::default();
        self.saved_other = SavedCursor::default();
        self.tabs = default_tabs(sx);
        self.region_top = 0;
        self.region_bot = sy - 1;
        self.modes = Modes::AUTO_WRAP | Modes::CURSOR_VISIBLE;
        self.last_glyph = None;
    }

    fn align_test(&mut self) {
        for y in 0..self.sy() {
            for x in 0..self.sx() {
                self.grid.set_cell(x, y, Cell::new('E'));
            }
        }
    }

    // ── Modes ───────────────────────────────────────────────────────

    fn set_ansi_mode(&mut self, mode: u16, value: bool) {
        if mode == 4 {
            self.modes.set(Modes::INSERT, value);
        }
    }

    fn set_dec_mode(&mut self, mode: u16, value: bool) {
        match mode {
            1 => self.modes.set(Modes::APP_CURSOR, value),
            6 => {
                self.modes.set(Modes::ORIGIN, value);
                self.move_cursor(0, 0);
            }
            7 => self.modes.set(Modes::AUTO_WRAP, value),
            25 => self.modes.set(Modes::CURSOR_VISIBLE, value),
            47 => {
                if value {
                    self.enter_alt(false, false);
                } else {
                    self.leave_alt(false, false);
                }
            }
            1000 => self.modes.set(Modes::MOUSE_STANDARD, value),
            1002 => self.modes.set(Modes::MOUSE_BUTTON, value),
            1003 => self.modes.set(Modes::MOUSE_ALL, value),
            1004 => self.modes.set(Modes::FOCUS_REPORT, value),
            1005 => self.modes.set(Modes::MOUSE_UTF8, value),
            1006 => self.modes.set(Modes::MOUSE_SGR, value),
            1015 => self.modes.set(Modes::MOUSE_URXVT, value),
            1047 => {
                // Swap only; the alternate grid is wiped on leave.
                if value {
                    self.enter_alt(false, false);
                } else {
                    self.leave_alt(true, false);
                }
            }
            1048 => {
                if value {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            }
            1049 => {
                if value {
                    self.enter_alt(true, true);
                } else {
                    self.leave_alt(false, true);
                }
            }
            2004 => self.modes.set(Modes::BRACKETED_PASTE, value),
            _ => {}
        }
    }

    // ── SGR ─────────────────────────────────────────────────────────

    fn apply_sgr(&mut self, params: &Params) {
        if params.is_empty() {
            self.attrs.reset();
            return;
        }
        let mut i = 0;
        while i < params.len() {
            let sub = params.subparams(i);
            let p = sub.first().copied().unwrap_or(0);
            match p {
                0 => self.attrs.reset(),
                1 => self.attrs.flags.insert(AttrFlags::BOLD),
                2 => self.attrs.flags.insert(AttrFlags::DIM),
                3 => self.attrs.flags.insert(AttrFlags::ITALIC),
                4 => {
                    // 4:0 none, 4:1 single, 4:2 double, 4:3 curly.
                    let style = sub.get(1).copied().unwrap_or(1);
                    self.attrs.flags.remove(
                        AttrFlags::UNDERLINE
                            | AttrFlags::DOUBLE_UNDERLINE
                            | AttrFlags::CURLY_UNDERLINE,
                    );
                    match style {
                        0 => {}
                        2 => self.attrs.flags.insert(AttrFlags::DOUBLE_UNDERLINE),
                        3 => self.attrs.flags.insert(AttrFlags::CURLY_UNDERLINE),
                        _ => self.attrs.flags.insert(AttrFlags::UNDERLINE),
                    }
                }
                5 | 6 => self.attrs.flags.insert(AttrFlags::BLINK),
                7 => self.attrs.flags.insert(AttrFlags::REVERSE),
                8 => self.attrs.flags.insert(AttrFlags::HIDDEN),
                9 => self.attrs.flags.insert(AttrFlags::STRIKETHROUGH),
                21 => {
                    self.attrs.flags.remove(AttrFlags::UNDERLINE);
                    self.attrs.flags.insert(AttrFlags::DOUBLE_UNDERLINE);
                }
                22 => self
                    .attrs
                    .flags
                    .remove(AttrFlags::BOLD | AttrFlags::DIM),
                23 => self.attrs.flags.remove(AttrFlags::ITALIC),
                24 => self.attrs.flags.remove(
                    AttrFlags::UNDERLINE
                        | AttrFlags::DOUBLE_UNDERLINE
                        | AttrFlags::CURLY_UNDERLINE,
                ),
                25 => self.attrs.flags.remove(AttrFlags::BLINK),
                27 => self.attrs.flags.remove(AttrFlags::REVERSE),
                28 => self.attrs.flags.remove(AttrFlags::HIDDEN),
                29 => self.attrs.flags.remove(AttrFlags::STRIKETHROUGH),
                30..=37 => self.attrs.fg = Color::Named((p - 30) as u8),
                38 => {
                    if sub.len() > 1 {
                        if let Some(c) = parse_extended_color_sub(sub) {
                            self.attrs.fg = c;
                        }
                    } else if let Some((c, used)) = parse_extended_color_semi(params, i) {
                        self.attrs.fg = c;
                        i += used;
                    }
                }
                39 => self.attrs.fg = Color::Default,
                40..=47 => self.attrs.bg = Color::Named((p - 40) as u8),
                48 => {
                    if sub.len() > 1 {
                        if let Some(c) = parse_extended_color_sub(sub) {
                            self.attrs.bg = c;
                        }
                    } else if let Some((c, used)) = parse_extended_color_semi(params, i) {
                        self.attrs.bg = c;
                        i += used;
                    }
                }
                49 => self.attrs.bg = Color::Default,
                90..=97 => self.attrs.fg = Color::Named((p - 90 + 8) as u8),
                100..=107 => self.attrs.bg = Color::Named((p - 100 + 8) as u8),
                // Unknown SGR arguments are ignored, not fatal.
                _ => {}
            }
            i += 1;
        }
    }

    // ── CSI dispatch ────────────────────────────────────────────────

    fn csi(&mut self, params: &Params, intermediates: &[u8], private: Option<u8>, fin: u8) {
        if !intermediates.is_empty() {
            // DECSCUSR and friends; none affect the model.
            return;
        }
        if private == Some(b'?') {
            match fin {
                b'h' => {
                    for i in 0..params.len() {
                        if let Some(m) = params.get(i) {
                            self.set_dec_mode(m, true);
                        }
                    }
                }
                b'l' => {
                    for i in 0..params.len() {
                        if let Some(m) = params.get(i) {
                            self.set_dec_mode(m, false);
                        }
                    }
                }
                _ => {}
            }
            return;
        }
        if private.is_some() {
            return;
        }
        let p0 = params.get_or(0, 1).max(1);
        match fin {
            b'A' => self.cursor_up(p0),
            b'B' | b'e' => self.cursor_down(p0),
            b'C' | b'a' => self.cursor_forward(p0),
            b'D' => self.cursor_back(p0),
            b'E' => {
                self.cursor_down(p0);
                self.cx = 0;
            }
            b'F' => {
                self.cursor_up(p0);
                self.cx = 0;
            }
            b'G' | b'`' => {
                self.cx = p0.saturating_sub(1).min(self.sx() - 1);
                self.pending_wrap = false;
            }
            b'H' | b'f' => {
                let row = params.get_or(0, 1).max(1) - 1;
                let col = params.get_or(1, 1).max(1) - 1;
                self.move_cursor(col, row);
            }
            b'I' => {
                for _ in 0..p0 {
                    self.cx = self.next_tab_stop();
                }
                self.pending_wrap = false;
            }
            b'J' => self.erase_display(params.get_or(0, 0)),
            b'K' => self.erase_line(params.get_or(0, 0)),
            b'L' => self.insert_lines(p0),
            b'M' => self.delete_lines(p0),
            b'P' => {
                self.grid.delete_cells(self.cx, self.cy, p0, self.attrs.bg);
                self.pending_wrap = false;
            }
            b'S' => self.grid.scroll_region_up(
                self.region_top,
                self.region_bot,
                p0,
                self.attrs.bg,
            ),
            b'T' => self.grid.scroll_region_down(
                self.region_top,
                self.region_bot,
                p0,
                self.attrs.bg,
            ),
            b'X' => {
                self.grid.clear_cells(self.cx, self.cy, p0, self.attrs.bg);
                self.pending_wrap = false;
            }
            b'Z' => {
                for _ in 0..p0 {
                    self.cx = self.prev_tab_stop();
                }
                self.pending_wrap = false;
            }
            b'@' => self.grid.insert_cells(self.cx, self.cy, p0, self.attrs.bg),
            b'b' => {
                if let Some(glyph) = self.last_glyph {
                    for _ in 0..p0.min(self.sx()) {
                        self.print_glyph(glyph);
                    }
                }
            }
            b'c' => self.responses.extend_from_slice(b"\x1b[?6c"),
            b'd' => {
                let (top, _) = self.region_for_cursor();
                self.cy = (top + p0 - 1).min(self.sy() - 1);
                self.pending_wrap = false;
            }
            b'g' => match params.get_or(0, 0) {
                0 => {
                    if let Some(t) = self.tabs.get_mut(self.cx as usize) {
                        *t = false;
                    }
                }
                3 => self.tabs.iter_mut().for_each(|t| *t = false),
                _ => {}
            },
            b'h' => {
                for i in 0..params.len() {
                    if let Some(m) = params.get(i) {
                        self.set_ansi_mode(m, true);
                    }
                }
            }
            b'l' => {
                for i in 0..params.len() {
                    if let Some(m) = params.get(i) {
                        self.set_ansi_mode(m, false);
                    }
                }
            }
            b'm' => self.apply_sgr(params),
            b'n' => match params.get_or(0, 0) {
                5 => self.responses.extend_from_slice(b"\x1b[0n"),
                6 => {
                    let (top, _) = self.region_for_cursor();
                    let reply =
                        format!("\x1b[{};{}R", self.cy - top + 1, self.cx + 1);
                    self.responses.extend_from_slice(reply.as_bytes());
                }
                _ => {}
            },
            b'r' => {
                let top = params.get_or(0, 1).max(1) - 1;
                let bot = params.get_or(1, self.sy()).max(1) - 1;
                let bot = bot.min(self.sy() - 1);
                if top < bot {
                    self.region_top = top;
                    self.region_bot = bot;
                    self.move_cursor(0, 0);
                }
            }
            b's' => self.save_cursor(),
            b'u' => self.restore_cursor(),
            _ => {}
        }
    }

    // ── OSC dispatch ────────────────────────────────────────────────

    fn osc(&mut self, payload: &[u8]) {
        let Ok(text) = std::str::from_utf8(payload) else {
            return;
        };
        let (num, rest) = match text.split_once(';') {
            Some((n, r)) => (n, r),
            None => (text, ""),
        };
        match num {
            "0" | "1" | "2" => {
                self.title = rest.to_string();
                self.events.push(ScreenEvent::TitleChanged);
            }
            "4" => self.osc_palette_query(rest),
            "10" => self.osc_color_query(10, rest, (0xff, 0xff, 0xff)),
            "11" => self.osc_color_query(11, rest, (0, 0, 0)),
            "12" => self.osc_color_query(12, rest, (0xff, 0xff, 0xff)),
            "52" => {
                // "52;<target>;<base64>"; an inner "?" asks to read, which
                // is not supported.
                if let Some((_, data)) = rest.split_once(';') {
                    if data != "?" {
                        self.events
                            .push(ScreenEvent::ClipboardSet(data.as_bytes().to_vec()));
                    }
                }
            }
            _ => {}
        }
    }

    fn osc_palette_query(&mut self, rest: &str) {
        // "4;<index>;?" queries; settings are ignored.
        let mut parts = rest.split(';');
        let (Some(idx), Some(spec)) = (parts.next(), parts.next()) else {
            return;
        };
        if spec != "?" {
            return;
        }
        let Ok(idx) = idx.parse::<u8>() else {
            return;
        };
        let (r, g, b) = palette_rgb(idx);
        let reply = format!(
            "\x1b]4;{idx};rgb:{r:02x}{r:02x}/{g:02x}{g:02x}/{b:02x}{b:02x}\x07"
        );
        self.responses.extend_from_slice(reply.as_bytes());
    }

    fn osc_color_query(&mut self, num: u16, rest: &str, (r, g, b): (u8, u8, u8)) {
        if rest != "?" {
            return;
        }
        let reply = format!(
            "\x1b]{num};rgb:{r:02x}{r:02x}/{g:02x}{g:02x}/{b:02x}{b:02x}\x07"
        );
        self.responses.extend_from_slice(reply.as_bytes());
    }
}

impl Perform for Screen {
    fn print(&mut self, ch: char) {
        let glyph = Glyph::from_char(ch);
        if glyph.width() == 0 {
            self.print_combining(ch);
        } else {
            self.print_glyph(glyph);
        }
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            0x07 => self.events.push(ScreenEvent::Bell),
            0x08 => {
                // Backspace from column 0 stays at 0.
                self.pending_wrap = false;
                self.cx = self.cx.saturating_sub(1);
            }
            0x09 => {
                self.cx = self.next_tab_stop();
                self.pending_wrap = false;
            }
            0x0A | 0x0B | 0x0C => self.linefeed(),
            0x0D => {
                self.cx = 0;
                self.pending_wrap = false;
            }
            _ => {}
        }
    }

    fn csi_dispatch(
        &mut self,
        params: &Params,
        intermediates: &[u8],
        private: Option<u8>,
        final_byte: u8,
    ) {
        self.csi(params, intermediates, private, final_byte);
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], final_byte: u8) {
        if intermediates == b"#" {
            if final_byte == b'8' {
                self.align_test();
            }
            return;
        }
        if !intermediates.is_empty() {
            // Charset designation and similar; no model effect.
            return;
        }
        match final_byte {
            b'7' => self.save_cursor(),
            b'8' => self.restore_cursor(),
            b'D' => self.linefeed(),
            b'E' => {
                self.linefeed();
                self.cx = 0;
            }
            b'H' => {
                if let Some(t) = self.tabs.get_mut(self.cx as usize) {
                    *t = true;
                }
            }
            b'M' => self.reverse_index(),
            b'c' => self.full_reset(),
            b'=' => self.modes.insert(Modes::APP_KEYPAD),
            b'>' => self.modes.remove(Modes::APP_KEYPAD),
            _ => {}
        }
    }

    fn osc_dispatch(&mut self, payload: &[u8]) {
        self.osc(payload);
    }
}

/// Parse the colon form of SGR 38/48: `38:5:n`, `38:2:r:g:b`, or
/// `38:2::r:g:b` (with colorspace id).
fn parse_extended_color_sub(sub: &[u16]) -> Option<Color> {
    match sub.get(1)? {
        5 => Some(Color::Indexed(*sub.get(2)? as u8)),
        2 => {
            let (r, g, b) = if sub.len() >= 6 {
                (sub[3], sub[4], sub[5])
            } else if sub.len() == 5 {
                (sub[2], sub[3], sub[4])
            } else {
                return None;
            };
            Some(Color::Rgb(r as u8, g as u8, b as u8))
        }
        _ => None,
    }
}

/// Parse the semicolon form of SGR 38/48 starting at param `i`:
/// `38;5;n` or `38;2;r;g;b`. Returns the color and the parameter count
/// consumed beyond `i`.
fn parse_extended_color_semi(params: &Params, i: usize) -> Option<(Color, usize)> {
    match params.get(i + 1)? {
        5 => Some((Color::Indexed(params.get(i + 2)? as u8), 2)),
        2 => {
            let r = params.get(i + 2)?;
            let g = params.get(i + 3)?;
            let b = params.get(i + 4)?;
            Some((Color::Rgb(r as u8, g as u8, b as u8), 4))
        }
        _ => None,
    }
}

/// The default 256-color palette mapped to RGB.
#[must_use]
pub fn palette_rgb(idx: u8) -> (u8, u8, u8) {
    // 0-15: the standard + bright named colors.
    const NAMED: [(u8, u8, u8); 16] = [
        (0, 0, 0),
        (205, 0, 0),
        (0, 205, 0),
        (205, 205, 0),
        (0, 0, 238),
        (205, 0, 205),
        (0, 205, 205),
        (229, 229, 229),
        (127, 127, 127),
        (255, 0, 0),
        (0, 255, 0),
        (255, 255, 0),
        (92, 92, 255),
        (255, 0, 255),
        (0, 255, 255),
        (255, 255, 255),
    ];
    match idx {
        0..=15 => NAMED[idx as usize],
        16..=231 => {
            // 6x6x6 color cube.
            let i = idx - 16;
            let steps = [0u8, 95, 135, 175, 215, 255];
            (
                steps[(i / 36) as usize],
                steps[((i / 6) % 6) as usize],
                steps[(i % 6) as usize],
            )
        }
        // Grayscale ramp.
        _ => {
            let v = 8 + (idx - 232) * 10;
            (v, v, v)
        }
    }
}
