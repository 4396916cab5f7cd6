//! Terminal cell: the fundamental unit of the grid.
//!
//! Each cell stores a grapheme cluster and its SGR attributes. The grapheme
//! is kept inline (no heap allocation per cell) so that combining marks,
//! variation selectors, and ZWJ emoji sequences survive round trips through
//! scrollback and reflow.

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

/// Maximum bytes of UTF-8 a single cell can hold.
///
/// Enough for a base character plus several combining marks or a short ZWJ
/// sequence. Longer clusters are truncated at a character boundary.
pub const GLYPH_MAX: usize = 20;

bitflags! {
    /// SGR text attribute flags.
    ///
    /// Maps directly to the ECMA-48 / VT100 SGR parameter values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u16 {
        const BOLD             = 1 << 0;
        const DIM              = 1 << 1;
        const ITALIC           = 1 << 2;
        const UNDERLINE        = 1 << 3;
        const BLINK            = 1 << 4;
        const REVERSE          = 1 << 5;
        const HIDDEN           = 1 << 6;
        const STRIKETHROUGH    = 1 << 7;
        const DOUBLE_UNDERLINE = 1 << 8;
        const CURLY_UNDERLINE  = 1 << 9;
    }
}

bitflags! {
    /// Cell-level flags that are orthogonal to SGR attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u8 {
        /// This cell is the leading (left) cell of a wide (2-column) character.
        const WIDE_CHAR = 1 << 0;
        /// This cell is the trailing (right) continuation of a wide character.
        /// Its content is meaningless; rendering uses the leading cell.
        const WIDE_CONTINUATION = 1 << 1;
    }
}

/// Color representation for terminal cells.
///
/// Supports the standard terminal color model hierarchy:
/// default → 16 named → 256 indexed → 24-bit RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default (SGR 39 / SGR 49).
    #[default]
    Default,
    /// Named color index (0-15): standard 8 + bright 8.
    Named(u8),
    /// 256-color palette index (0-255).
    Indexed(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

/// SGR attributes for a cell: flags + foreground/background colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Attrs {
    pub flags: AttrFlags,
    pub fg: Color,
    pub bg: Color,
}

impl Attrs {
    /// Reset all attributes to default (SGR 0).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A grapheme cluster stored inline, with its display width.
///
/// Invariants: `len <= GLYPH_MAX`, the bytes are valid UTF-8, and `width`
/// is 0, 1, or 2. A width of 0 only occurs for combining-mark clusters
/// appended to a preceding cell and for wide-continuation padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Glyph {
    bytes: [u8; GLYPH_MAX],
    len: u8,
    width: u8,
}

impl Default for Glyph {
    fn default() -> Self {
        Self::space()
    }
}

impl Glyph {
    /// The blank glyph: a single space, width 1.
    #[must_use]
    pub const fn space() -> Self {
        let mut bytes = [0u8; GLYPH_MAX];
        bytes[0] = b' ';
        Self {
            bytes,
            len: 1,
            width: 1,
        }
    }

    /// Create a glyph from a single character.
    ///
    /// Control characters and other zero-or-negative-width codepoints get
    /// width 0; the screen writer decides what to do with them.
    #[must_use]
    pub fn from_char(ch: char) -> Self {
        let mut bytes = [0u8; GLYPH_MAX];
        let len = ch.encode_utf8(&mut bytes).len();
        let width = ch.width().unwrap_or(0);
        Self {
            bytes,
            len: len as u8,
            width: width.min(2) as u8,
        }
    }

    /// Create a glyph from a full grapheme cluster.
    ///
    /// The width is the sum of the widths of the scalars, clamped to 2,
    /// except that variation selector 16 forces emoji presentation
    /// (width 2). Clusters longer than [`GLYPH_MAX`] bytes are truncated
    /// at a character boundary.
    #[must_use]
    pub fn from_grapheme(cluster: &str) -> Self {
        let mut bytes = [0u8; GLYPH_MAX];
        let mut len = 0usize;
        let mut width = 0usize;
        let mut force_wide = false;
        for ch in cluster.chars() {
            let ch_len = ch.len_utf8();
            if len + ch_len > GLYPH_MAX {
                break;
            }
            ch.encode_utf8(&mut bytes[len..]);
            len += ch_len;
            if ch == '\u{FE0F}' {
                force_wide = true;
            }
            width += ch.width().unwrap_or(0);
        }
        if force_wide {
            width = 2;
        }
        Self {
            bytes,
            len: len as u8,
            width: width.min(2) as u8,
        }
    }

    /// The cluster as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // The buffer is only ever filled via encode_utf8 at char boundaries.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or(" ")
    }

    /// Display width in terminal columns (0, 1, or 2).
    #[must_use]
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Byte length of the stored cluster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the glyph holds zero bytes (used for continuation padding).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The empty glyph used for wide-character continuation cells.
    #[must_use]
    pub const fn padding() -> Self {
        Self {
            bytes: [0u8; GLYPH_MAX],
            len: 0,
            width: 0,
        }
    }

    /// Append a combining character to this glyph.
    ///
    /// Returns `false` (leaving the glyph unchanged) if the result would
    /// not fit inline.
    pub fn push_combining(&mut self, ch: char) -> bool {
        let ch_len = ch.len_utf8();
        let len = self.len as usize;
        if len + ch_len > GLYPH_MAX {
            return false;
        }
        ch.encode_utf8(&mut self.bytes[len..]);
        self.len = (len + ch_len) as u8;
        true
    }
}

/// A single cell in the terminal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// The grapheme content. A space for empty/erased cells.
    glyph: Glyph,
    /// Cell-level flags (wide char, continuation).
    pub flags: CellFlags,
    /// SGR text attributes.
    pub attrs: Attrs,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            glyph: Glyph::space(),
            flags: CellFlags::empty(),
            attrs: Attrs::default(),
        }
    }
}

impl Cell {
    /// Create a new cell with the given character and default attributes.
    #[must_use]
    pub fn new(ch: char) -> Self {
        Self {
            glyph: Glyph::from_char(ch),
            flags: CellFlags::empty(),
            attrs: Attrs::default(),
        }
    }

    /// Create a cell from a glyph and attributes.
    #[must_use]
    pub fn with_attrs(glyph: Glyph, attrs: Attrs) -> Self {
        Self {
            glyph,
            flags: CellFlags::empty(),
            attrs,
        }
    }

    /// Create a wide (2-column) character cell.
    ///
    /// Returns `(leading, continuation)`. The leading cell holds the
    /// glyph; the continuation cell is width-0 padding sharing the same
    /// attributes.
    #[must_use]
    pub fn wide(glyph: Glyph, attrs: Attrs) -> (Self, Self) {
        let leading = Self {
            glyph,
            flags: CellFlags::WIDE_CHAR,
            attrs,
        };
        let continuation = Self {
            glyph: Glyph::padding(),
            flags: CellFlags::WIDE_CONTINUATION,
            attrs,
        };
        (leading, continuation)
    }

    /// The glyph content of this cell.
    #[must_use]
    pub fn glyph(&self) -> &Glyph {
        &self.glyph
    }

    /// Mutable access to the glyph (for combining-mark append).
    pub fn glyph_mut(&mut self) -> &mut Glyph {
        &mut self.glyph
    }

    /// The display width in terminal columns.
    #[must_use]
    pub fn width(&self) -> u8 {
        self.glyph.width()
    }

    /// Whether this cell is the leading half of a wide character.
    #[must_use]
    pub fn is_wide(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CHAR)
    }

    /// Whether this cell is a continuation (trailing half) of a wide character.
    #[must_use]
    pub fn is_wide_continuation(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CONTINUATION)
    }

    /// Whether this cell is a blank space with default attributes.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.glyph.as_str() == " " && self.attrs == Attrs::default() && self.flags.is_empty()
    }

    /// Reset this cell to a blank space with the given background color.
    ///
    /// Used by erase operations (ED, EL, ECH) which fill with the current
    /// background but reset all other attributes.
    pub fn erase(&mut self, bg: Color) {
        self.glyph = Glyph::space();
        self.flags = CellFlags::empty();
        self.attrs = Attrs {
            bg,
            ..Attrs::default()
        };
    }
}
