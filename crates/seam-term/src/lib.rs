#![forbid(unsafe_code)]

//! VT/ANSI terminal engine for seam.
//!
//! `seam-term` is the platform-independent terminal model at the heart of the
//! multiplexer. It owns grid state, VT/ANSI parsing, cursor positioning, and
//! scrollback — all without any host I/O dependencies. The server feeds it
//! PTY bytes; the renderer reads its grids.
//!
//! # Primary responsibilities
//!
//! - **Cell**: grapheme content + SGR attributes (colors, bold, italic, etc.).
//! - **Grid**: 2D cell matrix with region scrolls, lazy rows, and reflow.
//! - **Scrollback**: ring buffer for rows scrolled off the top of the viewport.
//! - **Parser**: table-driven VT/ANSI state machine (DEC ANSI model).
//! - **Screen**: applies parser events under cursor/attribute/mode state.
//!
//! # Design principles
//!
//! - **No I/O**: all types are pure data + logic; the server supplies bytes.
//! - **Deterministic**: identical byte sequences always produce identical state.
//! - **Never fails**: out-of-range coordinates clamp; malformed sequences drop.

pub mod cell;
pub mod grid;
pub mod parser;
pub mod screen;
pub mod scrollback;

pub use cell::{AttrFlags, Attrs, Cell, CellFlags, Color, Glyph};
pub use grid::{Grid, Row};
pub use parser::{Params, Parser, Perform};
pub use screen::{palette_rgb, Modes, Screen, ScreenEvent};
pub use scrollback::Scrollback;
