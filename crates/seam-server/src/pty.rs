//! Pseudo-terminal plumbing.
//!
//! Opens the master/slave pair, forks the child with the slave as its
//! controlling terminal, and exposes non-blocking read/write on the
//! master for the event loop.

use std::collections::BTreeMap;
use std::os::fd::{AsFd, AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use rustix::termios::{tcsetwinsize, Winsize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PtyError {
    #[error("failed to open PTY: {0}")]
    Open(std::io::Error),

    #[error("failed to spawn child: {0}")]
    Spawn(std::io::Error),

    #[error("failed to set window size: {0}")]
    Winsize(rustix::io::Errno),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn errno_to_io(e: rustix::io::Errno) -> PtyError {
    PtyError::Open(std::io::Error::from_raw_os_error(e.raw_os_error()))
}

/// One pane's PTY: the master side plus the child process handle.
#[derive(Debug)]
pub struct Pty {
    master: OwnedFd,
    child: Child,
    winsize: Winsize,
}

impl Pty {
    /// Open a PTY pair and spawn `argv[0]` with the slave as controlling
    /// terminal, `cwd` as working directory, and `env` as extra
    /// environment (layered over the inherited one).
    pub fn spawn(
        argv: &[String],
        cwd: &Path,
        env: &BTreeMap<String, String>,
        cols: u16,
        rows: u16,
    ) -> Result<Self, PtyError> {
        let winsize = Winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };

        let master = rustix::pty::openpt(
            rustix::pty::OpenptFlags::RDWR | rustix::pty::OpenptFlags::NOCTTY,
        )
        .map_err(errno_to_io)?;
        rustix::pty::grantpt(&master).map_err(errno_to_io)?;
        rustix::pty::unlockpt(&master).map_err(errno_to_io)?;

        let slave_name = rustix::pty::ptsname(&master, Vec::new()).map_err(errno_to_io)?;
        let slave_path = slave_name
            .to_str()
            .map_err(|_| {
                PtyError::Open(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "invalid PTY slave name",
                ))
            })?
            .to_string();

        tcsetwinsize(&master, winsize).map_err(PtyError::Winsize)?;

        // Open the slave once and dup it for each stdio stream so every
        // Stdio owns a distinct descriptor.
        let slave = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&slave_path)
            .map_err(PtyError::Open)?;
        let slave_fd = slave.into_raw_fd();
        let slave_out = unsafe { libc::dup(slave_fd) };
        let slave_err = unsafe { libc::dup(slave_fd) };
        if slave_out < 0 || slave_err < 0 {
            unsafe {
                libc::close(slave_fd);
                if slave_out >= 0 {
                    libc::close(slave_out);
                }
            }
            return Err(PtyError::Open(std::io::Error::last_os_error()));
        }

        let (program, args) = argv.split_first().ok_or_else(|| {
            PtyError::Spawn(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty command",
            ))
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(cwd);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let child = unsafe {
            cmd.stdin(Stdio::from_raw_fd(slave_fd))
                .stdout(Stdio::from_raw_fd(slave_out))
                .stderr(Stdio::from_raw_fd(slave_err))
                .pre_exec(move || {
                    // New session, then adopt the slave as controlling TTY.
                    libc::setsid();
                    libc::ioctl(slave_fd, libc::TIOCSCTTY, 0);
                    Ok(())
                })
                .spawn()
                .map_err(PtyError::Spawn)?
        };

        // The event loop needs a non-blocking master.
        rustix::fs::fcntl_setfl(&master, rustix::fs::OFlags::NONBLOCK).map_err(errno_to_io)?;

        Ok(Self {
            master,
            child,
            winsize,
        })
    }

    /// The master descriptor, for poll registration.
    #[must_use]
    pub fn raw_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }

    /// The child process id.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Current window size.
    #[must_use]
    pub fn winsize(&self) -> (u16, u16) {
        (self.winsize.ws_col, self.winsize.ws_row)
    }

    /// Read up to `buf.len()` bytes from the master.
    ///
    /// Returns `Ok(0)` both on EOF and when nothing is ready (POLLHUP vs
    /// WOULDBLOCK are distinguished by the caller's readiness source).
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, PtyError> {
        match rustix::io::read(&self.master, buf) {
            Ok(n) => Ok(n),
            Err(rustix::io::Errno::WOULDBLOCK) => Ok(0),
            Err(rustix::io::Errno::IO) => Ok(0), // slave side fully closed
            Err(e) => Err(errno_to_io(e)),
        }
    }

    /// Write as much of `buf` as the master accepts; returns bytes taken.
    pub fn write(&self, buf: &[u8]) -> Result<usize, PtyError> {
        match rustix::io::write(&self.master, buf) {
            Ok(n) => Ok(n),
            Err(rustix::io::Errno::WOULDBLOCK) => Ok(0),
            Err(e) => Err(errno_to_io(e)),
        }
    }

    /// Propagate a resize to the PTY (and thus SIGWINCH to the child).
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), PtyError> {
        self.winsize = Winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        tcsetwinsize(self.master.as_fd(), self.winsize).map_err(PtyError::Winsize)
    }

    /// Kill the child (SIGHUP first, as a real hangup would).
    pub fn hangup(&mut self) {
        unsafe {
            libc::kill(self.child.id() as i32, libc::SIGHUP);
        }
    }

    /// Reap the child if it has exited; `None` while still running.
    pub fn try_wait(&mut self) -> Option<i32> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.code().unwrap_or(-1)),
            _ => None,
        }
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        // Leave no orphans: hang up and reap without blocking.
        self.hangup();
        let _ = self.child.try_wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["/bin/sh".into(), "-c".into(), script.into()]
    }

    #[test]
    fn spawn_echo_and_read() {
        let env = BTreeMap::new();
        let pty = Pty::spawn(&sh("printf hello"), Path::new("/"), &env, 80, 24).unwrap();
        // Poll for output; the child needs a moment.
        let mut collected = Vec::new();
        for _ in 0..100 {
            let mut buf = [0u8; 256];
            let n = pty.read(&mut buf).unwrap();
            collected.extend_from_slice(&buf[..n]);
            if collected.windows(5).any(|w| w == b"hello") {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        panic!("never saw child output: {collected:?}");
    }

    #[test]
    fn env_reaches_child() {
        let mut env = BTreeMap::new();
        env.insert("SEAM_TEST_VALUE".to_string(), "marker42".to_string());
        let pty = Pty::spawn(
            &sh("printf %s \"$SEAM_TEST_VALUE\""),
            Path::new("/"),
            &env,
            80,
            24,
        )
        .unwrap();
        let mut collected = Vec::new();
        for _ in 0..100 {
            let mut buf = [0u8; 256];
            let n = pty.read(&mut buf).unwrap();
            collected.extend_from_slice(&buf[..n]);
            if collected.windows(8).any(|w| w == b"marker42") {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        panic!("env did not reach child");
    }

    #[test]
    fn empty_command_rejected() {
        let env = BTreeMap::new();
        assert!(Pty::spawn(&[], Path::new("/"), &env, 80, 24).is_err());
    }

    #[test]
    fn child_exit_is_reaped() {
        let env = BTreeMap::new();
        let mut pty = Pty::spawn(&sh("exit 3"), Path::new("/"), &env, 80, 24).unwrap();
        for _ in 0..200 {
            if let Some(code) = pty.try_wait() {
                assert_eq!(code, 3);
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        panic!("child never reaped");
    }
}
