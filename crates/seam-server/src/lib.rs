//! The seam server: the state engine and I/O runtime behind the
//! multiplexer.
//!
//! One process, one cooperatively scheduled event loop. The [`Server`]
//! value owns every session, window, pane, and client; loop callbacks
//! borrow it mutably one at a time, so the object graph needs no locks.
//!
//! Data flow in steady state:
//!
//! ```text
//!  PTY fd ── read ──► parser ─► screen ─► grid
//!                                          │ mark dirty
//!                                          ▼
//!  client socket ─► command queue ─► mutations ─► renderer ─► client tty
//!  client tty  ──► key decode ─────► input encoder ─► PTY write
//! ```

pub mod client;
pub mod cmd;
pub mod event_loop;
pub mod ids;
pub mod input;
pub mod keys;
pub mod layout;
pub mod options;
pub mod pane;
pub mod pty;
pub mod render;
pub mod server;
pub mod session;
pub mod window;

pub use event_loop::EventLoop;
pub use ids::{ClientId, PaneId, SessionId, WindowId};
pub use server::Server;
