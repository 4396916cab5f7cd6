//! Panes: one virtual terminal per child process.
//!
//! A pane pairs a [`Screen`] with a PTY and a parser. The event loop feeds
//! PTY bytes through the parser into the screen, collects reply bytes
//! going the other way, and tracks pending client notifications in the
//! flag bits.

use std::collections::BTreeMap;
use std::path::Path;

use bitflags::bitflags;
use seam_term::{Parser, Screen, ScreenEvent};

use crate::ids::{PaneId, WindowId};
use crate::pty::{Pty, PtyError};

/// Bytes drained from a PTY per readiness notification.
pub const READ_BLOCK: usize = 8 * 1024;

bitflags! {
    /// Pending notifications and lifecycle state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PaneFlags: u8 {
        /// Needs a full redraw on every attached client.
        const REDRAW  = 1 << 0;
        /// Has cells newer than the last render.
        const CHANGED = 1 << 1;
        /// Was resized since the last render.
        const RESIZED = 1 << 2;
        /// The child has exited.
        const DEAD    = 1 << 3;
    }
}

/// Out-of-band pane happenings for the server to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneEvent {
    Bell,
    TitleChanged,
    /// OSC 52 clipboard payload, still base64.
    Clipboard(Vec<u8>),
}

/// One virtual terminal: screen + PTY + parser state.
#[derive(Debug)]
pub struct Pane {
    pub id: PaneId,
    /// Back reference; the window's pane list is the owning edge.
    pub window: WindowId,
    screen: Screen,
    parser: Parser,
    pty: Pty,
    /// Bytes awaiting write to the PTY.
    outbuf: Vec<u8>,
    pub flags: PaneFlags,
    pub exit_status: Option<i32>,
    /// The argv the pane was spawned with (respawn, auto-rename).
    pub command: Vec<String>,
    /// Offset of this pane within its window, set by the layout.
    pub xoff: u16,
    pub yoff: u16,
}

impl Pane {
    /// Spawn a child on a fresh PTY and wrap it in a pane.
    pub fn spawn(
        id: PaneId,
        window: WindowId,
        argv: Vec<String>,
        cwd: &Path,
        env: &BTreeMap<String, String>,
        cols: u16,
        rows: u16,
        history_limit: usize,
    ) -> Result<Self, PtyError> {
        let mut env = env.clone();
        env.insert("SEAM_PANE".to_string(), id.to_string());
        let pty = Pty::spawn(&argv, cwd, &env, cols, rows)?;
        tracing::debug!(pane = %id, pid = pty.pid(), ?argv, "spawned pane");
        Ok(Self {
            id,
            window,
            screen: Screen::new(cols, rows, history_limit),
            parser: Parser::new(),
            pty,
            outbuf: Vec::new(),
            flags: PaneFlags::REDRAW,
            exit_status: None,
            command: argv,
            xoff: 0,
            yoff: 0,
        })
    }

    /// The pane's screen.
    #[must_use]
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Mutable screen access (command-driven mutations).
    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    /// The PTY master fd for poll registration, `None` once dead.
    #[must_use]
    pub fn poll_fd(&self) -> Option<std::os::fd::RawFd> {
        if self.flags.contains(PaneFlags::DEAD) {
            None
        } else {
            Some(self.pty.raw_fd())
        }
    }

    /// The child pid (for SIGCHLD routing).
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pty.pid()
    }

    /// Pane width in columns.
    #[must_use]
    pub fn sx(&self) -> u16 {
        self.screen.sx()
    }

    /// Pane height in rows.
    #[must_use]
    pub fn sy(&self) -> u16 {
        self.screen.sy()
    }

    /// Whether output is queued for the PTY.
    #[must_use]
    pub fn wants_write(&self) -> bool {
        !self.outbuf.is_empty() && !self.flags.contains(PaneFlags::DEAD)
    }

    /// Whether the child has exited.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.flags.contains(PaneFlags::DEAD)
    }

    /// Drain one block from the PTY through the parser.
    ///
    /// Returns the screen events raised, or the PTY error that killed the
    /// read side. A zero-byte read is surfaced as no events; actual death
    /// arrives via SIGCHLD.
    pub fn on_readable(&mut self) -> Result<Vec<PaneEvent>, PtyError> {
        let mut buf = [0u8; READ_BLOCK];
        let n = self.pty.read(&mut buf)?;
        if n == 0 {
            return Ok(Vec::new());
        }
        self.parser.feed(&buf[..n], &mut self.screen);

        // Query replies synthesised by the screen go back to the child.
        let responses = self.screen.take_responses();
        if !responses.is_empty() {
            self.write(&responses);
        }

        self.flags.insert(PaneFlags::CHANGED);

        Ok(self
            .screen
            .take_events()
            .into_iter()
            .map(|event| match event {
                ScreenEvent::Bell => PaneEvent::Bell,
                ScreenEvent::TitleChanged => PaneEvent::TitleChanged,
                ScreenEvent::ClipboardSet(data) => PaneEvent::Clipboard(data),
            })
            .collect())
    }

    /// Queue bytes for the child and note the write interest.
    pub fn write(&mut self, bytes: &[u8]) {
        if self.flags.contains(PaneFlags::DEAD) {
            return;
        }
        self.outbuf.extend_from_slice(bytes);
    }

    /// Flush as much queued output to the PTY as it accepts.
    pub fn flush_output(&mut self) -> Result<(), PtyError> {
        while !self.outbuf.is_empty() {
            let n = self.pty.write(&self.outbuf)?;
            if n == 0 {
                break;
            }
            self.outbuf.drain(..n);
        }
        Ok(())
    }

    /// Resize screen and PTY together.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if cols == self.sx() && rows == self.sy() {
            return;
        }
        self.screen.resize(cols, rows);
        if let Err(e) = self.pty.resize(cols, rows) {
            tracing::warn!(pane = %self.id, error = %e, "TIOCSWINSZ failed");
        }
        self.flags.insert(PaneFlags::RESIZED | PaneFlags::REDRAW);
    }

    /// Mark the child dead with its exit status.
    pub fn mark_dead(&mut self, status: i32) {
        self.flags.insert(PaneFlags::DEAD);
        self.exit_status = Some(status);
        self.outbuf.clear();
        tracing::debug!(pane = %self.id, status, "pane died");
    }

    /// Send SIGHUP to the child (kill-pane).
    pub fn hangup(&mut self) {
        self.pty.hangup();
    }

    /// Reap the child if it has exited; `None` while still running.
    pub fn try_wait(&mut self) -> Option<i32> {
        self.pty.try_wait()
    }

    /// Update the history limit on the live screen.
    pub fn set_history_limit(&mut self, limit: usize) {
        self.screen.set_history_limit(limit);
    }
}
