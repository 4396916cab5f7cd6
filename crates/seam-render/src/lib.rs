#![forbid(unsafe_code)]

//! Client-side rendering for seam.
//!
//! Translates grid state into terminal output for each attached client:
//!
//! - **Caps**: capability query interface with a built-in xterm table and
//!   per-client overrides from the identify handshake.
//! - **Ansi**: pure escape emission (SGR transitions, color downgrade,
//!   cursor addressing).
//! - **Buffer**: the composed frame — panes blitted at layout offsets,
//!   borders, status line.
//! - **Presenter**: per-client diff of the frame against the last-rendered
//!   screen, emitting minimal output.
//!
//! The renderer reads stable snapshots; it never touches pane state.

pub mod ansi;
pub mod buffer;
pub mod caps;
pub mod presenter;

pub use ansi::downgrade;
pub use buffer::FrameBuffer;
pub use caps::{Cap, ColorLevel, TermCaps};
pub use presenter::Presenter;
