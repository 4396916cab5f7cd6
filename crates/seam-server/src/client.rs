//! Clients: attached terminals and their connection state.
//!
//! A client arrives as a socket connection, walks the identify handshake
//! (TERM, flags, tty descriptor, environment, cwd), then attaches to a
//! session. The server owns the client's tty: it switches it to raw mode,
//! decodes its keystrokes, and writes rendered frames to it.

use std::collections::{BTreeMap, HashMap};
use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::path::PathBuf;
use std::time::Instant;

use bitflags::bitflags;
use seam_protocol::Channel;
use seam_render::{Presenter, TermCaps};

use crate::ids::{ClientId, SessionId};
use crate::keys::InputDecoder;

/// One in-flight file transfer over the client's socket (the server-side
/// half of `load-buffer` / `save-buffer`).
#[derive(Debug)]
pub enum FileStream {
    /// Reading a client-side file into a paste buffer.
    Read {
        /// The parked queue item to wake on completion.
        item: u64,
        session: SessionId,
        data: Vec<u8>,
    },
    /// Writing a paste buffer out to a client-side file.
    Write {
        item: u64,
        data: Vec<u8>,
    },
}

bitflags! {
    /// Client state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClientFlags: u16 {
        /// SIGTSTP-suspended; no rendering until WAKEUP.
        const SUSPENDED  = 1 << 0;
        /// May not submit state-changing commands.
        const READONLY   = 1 << 1;
        /// Marked for disconnect once output drains.
        const EXIT       = 1 << 2;
        /// Finished the identify handshake.
        const IDENTIFIED = 1 << 3;
        /// Control-mode client (text protocol, no tty rendering).
        const CONTROL    = 1 << 4;
        /// Declared UTF-8 support.
        const UTF8       = 1 << 5;
        /// Forced 256-color mode (-2).
        const FORCE_256  = 1 << 6;
    }
}

/// A transient status-line message with its expiry.
#[derive(Debug)]
pub struct Overlay {
    pub text: String,
    pub expires: Instant,
}

/// One connected client.
#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub channel: Channel,
    /// The client's tty, passed over the socket during identify.
    tty: Option<OwnedFd>,
    /// Saved termios to restore on detach.
    saved_termios: Option<rustix::termios::Termios>,
    tty_outbuf: Vec<u8>,
    pub term: String,
    pub ttyname: String,
    pub caps: TermCaps,
    pub sx: u16,
    pub sy: u16,
    /// Server-wide sequence number of this client's last RESIZE; the
    /// `window-size = latest` mode picks the client with the highest.
    pub resize_seq: u64,
    pub session: Option<SessionId>,
    pub decoder: InputDecoder,
    pub presenter: Presenter,
    pub flags: ClientFlags,
    pub env: BTreeMap<String, String>,
    pub cwd: PathBuf,
    pub pid: Option<u32>,
    pub overlay: Option<Overlay>,
    /// Set when the next key completes a prefix chord.
    pub prefix_pending: bool,
    /// Window content changed since the last render.
    pub needs_redraw: bool,
    /// Next stream id for file read/write over the socket.
    pub next_stream: u32,
    /// In-flight file transfers by stream id.
    pub file_streams: HashMap<u32, FileStream>,
}

impl Client {
    /// Wrap an accepted connection; identify still pending.
    #[must_use]
    pub fn new(id: ClientId, channel: Channel) -> Self {
        Self {
            id,
            channel,
            tty: None,
            saved_termios: None,
            tty_outbuf: Vec::new(),
            term: String::new(),
            ttyname: String::new(),
            caps: TermCaps::default(),
            sx: 80,
            sy: 24,
            resize_seq: 0,
            session: None,
            decoder: InputDecoder::new(),
            presenter: Presenter::new(80, 24),
            flags: ClientFlags::empty(),
            env: BTreeMap::new(),
            cwd: PathBuf::from("/"),
            pid: None,
            overlay: None,
            prefix_pending: false,
            needs_redraw: false,
            next_stream: 0,
            file_streams: HashMap::new(),
        }
    }

    /// Whether identify completed and a session is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.flags.contains(ClientFlags::IDENTIFIED) && self.session.is_some()
    }

    /// The tty fd for poll registration.
    #[must_use]
    pub fn tty_fd(&self) -> Option<RawFd> {
        self.tty.as_ref().map(|fd| fd.as_raw_fd())
    }

    /// Whether tty output is buffered.
    #[must_use]
    pub fn tty_wants_write(&self) -> bool {
        !self.tty_outbuf.is_empty()
    }

    /// Adopt the tty passed during identify and switch it to raw mode.
    pub fn adopt_tty(&mut self, fd: OwnedFd) -> std::io::Result<()> {
        let termios = rustix::termios::tcgetattr(fd.as_fd())
            .map_err(|e| std::io::Error::from_raw_os_error(e.raw_os_error()))?;
        let mut raw = termios.clone();
        raw.make_raw();
        rustix::termios::tcsetattr(
            fd.as_fd(),
            rustix::termios::OptionalActions::Drain,
            &raw,
        )
        .map_err(|e| std::io::Error::from_raw_os_error(e.raw_os_error()))?;
        rustix::fs::fcntl_setfl(fd.as_fd(), rustix::fs::OFlags::NONBLOCK)
            .map_err(|e| std::io::Error::from_raw_os_error(e.raw_os_error()))?;
        self.saved_termios = Some(termios);
        self.tty = Some(fd);
        Ok(())
    }

    /// Queue bytes for the client terminal.
    pub fn tty_write(&mut self, bytes: &[u8]) {
        if self.tty.is_some() {
            self.tty_outbuf.extend_from_slice(bytes);
        }
    }

    /// Flush buffered tty output as far as the fd accepts.
    pub fn tty_flush(&mut self) {
        let Some(fd) = &self.tty else {
            self.tty_outbuf.clear();
            return;
        };
        while !self.tty_outbuf.is_empty() {
            match rustix::io::write(fd, &self.tty_outbuf) {
                Ok(0) => break,
                Ok(n) => {
                    self.tty_outbuf.drain(..n);
                }
                Err(rustix::io::Errno::WOULDBLOCK) => break,
                Err(rustix::io::Errno::INTR) => continue,
                Err(_) => {
                    self.tty_outbuf.clear();
                    break;
                }
            }
        }
    }

    /// Read a block of keystrokes from the tty.
    #[must_use]
    pub fn tty_read(&mut self) -> Vec<u8> {
        let Some(fd) = &self.tty else {
            return Vec::new();
        };
        let mut buf = [0u8; 4096];
        match rustix::io::read(fd, &mut buf) {
            Ok(n) => buf[..n].to_vec(),
            Err(_) => Vec::new(),
        }
    }

    /// Setup sequences written once on attach: alternate screen on, and
    /// the input reporting modes the server wants from the client
    /// terminal (SGR mouse, bracketed paste, focus).
    pub fn enter_screen(&mut self) {
        self.tty_write(b"\x1b[?1049h\x1b[?1006h\x1b[?1002h\x1b[?2004h\x1b[?1004h");
        self.presenter.invalidate();
        self.needs_redraw = true;
    }

    /// Mirror of [`enter_screen`](Self::enter_screen), written on detach,
    /// followed by termios restoration.
    pub fn leave_screen(&mut self) {
        self.tty_write(b"\x1b[?1004l\x1b[?2004l\x1b[?1002l\x1b[?1006l\x1b[?1049l\x1b[m\x1b[?25h");
        self.tty_flush();
        if let (Some(fd), Some(termios)) = (&self.tty, &self.saved_termios) {
            let _ = rustix::termios::tcsetattr(
                fd.as_fd(),
                rustix::termios::OptionalActions::Flush,
                termios,
            );
        }
    }

    /// Post a transient status message.
    pub fn post_message(&mut self, text: impl Into<String>, ttl: std::time::Duration) {
        self.overlay = Some(Overlay {
            text: text.into(),
            expires: Instant::now() + ttl,
        });
        self.needs_redraw = true;
    }

    /// Drop the overlay when expired; returns true if it was removed.
    pub fn expire_overlay(&mut self, now: Instant) -> bool {
        if let Some(overlay) = &self.overlay
            && overlay.expires <= now
        {
            self.overlay = None;
            self.needs_redraw = true;
            return true;
        }
        false
    }

    /// Allocate a file-transfer stream id.
    pub fn alloc_stream(&mut self) -> u32 {
        let id = self.next_stream;
        self.next_stream += 1;
        id
    }
}
