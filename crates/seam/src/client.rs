//! The client half: a thin protocol adapter.
//!
//! Connects to the server socket (starting a server when none answers),
//! runs the identify handshake — passing its stdin descriptor so the
//! server can own the terminal — and then sits on the socket relaying
//! protocol messages until the server says to exit.

use std::io::Write;
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rustix::event::{PollFd, PollFlags};
use seam_protocol::frame::{
    decode_u32, encode_argv, encode_cstring, encode_resize, encode_stream_data,
    encode_stream_result, encode_u32,
};
use seam_protocol::{Channel, Frame, MsgType, PROTOCOL_VERSION};

use crate::cli::Cli;

/// Client capability bits sent in IDENTIFY_FLAGS.
const FLAG_UTF8: u32 = 0x1;
const FLAG_256: u32 = 0x2;
const FLAG_CONTROL: u32 = 0x4;

/// Run as a client: connect, identify, relay. Returns the exit code.
pub fn run(cli: &Cli) -> Result<i32> {
    let socket_path = cli.resolve_socket();
    let stream = connect_or_spawn(cli, &socket_path)?;
    let mut channel = Channel::new(stream).context("wrapping socket")?;

    // Terminal state is restored on every exit path.
    let saved_termios = rustix::termios::tcgetattr(rustix::stdio::stdin()).ok();

    identify(cli, &mut channel)?;

    let winch = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGWINCH, Arc::clone(&winch))?;

    let code = relay(cli, &mut channel, &winch);

    if let Some(termios) = saved_termios {
        let _ = rustix::termios::tcsetattr(
            rustix::stdio::stdin(),
            rustix::termios::OptionalActions::Flush,
            &termios,
        );
    }
    code
}

/// Connect to the socket, spawning a server when nothing is listening.
fn connect_or_spawn(cli: &Cli, socket_path: &Path) -> Result<UnixStream> {
    if let Ok(stream) = UnixStream::connect(socket_path) {
        return Ok(stream);
    }
    // A dead server leaves a stale socket behind.
    let _ = std::fs::remove_file(socket_path);

    let exe = std::env::current_exe().context("locating executable")?;
    let mut command = Command::new(exe);
    command
        .arg("--server")
        .arg("-S")
        .arg(socket_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());
    for _ in 0..cli.verbose {
        command.arg("-v");
    }
    command.spawn().context("starting server")?;

    for _ in 0..100 {
        if let Ok(stream) = UnixStream::connect(socket_path) {
            return Ok(stream);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    bail!("server failed to start on {}", socket_path.display());
}

/// The identify handshake, ending in IDENTIFY_DONE and the command list.
fn identify(cli: &Cli, channel: &mut Channel) -> Result<()> {
    channel.send(Frame::new(
        MsgType::Version,
        encode_u32(PROTOCOL_VERSION),
    ));

    let mut flags = 0u32;
    let lang = std::env::var("LANG").unwrap_or_default();
    if cli.force_utf8 || lang.to_uppercase().contains("UTF-8") || lang.to_uppercase().contains("UTF8")
    {
        flags |= FLAG_UTF8;
    }
    if cli.force_256 {
        flags |= FLAG_256;
    }
    if cli.control {
        flags |= FLAG_CONTROL;
    }
    channel.send(Frame::new(MsgType::IdentifyFlags, encode_u32(flags)));

    let term = std::env::var("TERM").unwrap_or_else(|_| "unknown".to_string());
    channel.send(Frame::new(MsgType::IdentifyTerm, encode_cstring(&term)));

    if let Ok(name) = rustix::termios::ttyname(rustix::stdio::stdin(), Vec::new()) {
        channel.send(Frame::new(
            MsgType::IdentifyTtyName,
            encode_cstring(&name.to_string_lossy()),
        ));
    }

    // The server owns the terminal: pass our stdin and stdout.
    let stdin_dup: OwnedFd = rustix::io::dup(rustix::stdio::stdin())
        .context("dup stdin")?;
    channel.send(Frame::with_fd(MsgType::IdentifyStdin, stdin_dup));
    let stdout_dup: OwnedFd = rustix::io::dup(rustix::stdio::stdout())
        .context("dup stdout")?;
    channel.send(Frame::with_fd(MsgType::IdentifyStdout, stdout_dup));

    for (key, value) in std::env::vars() {
        channel.send(Frame::new(
            MsgType::IdentifyEnviron,
            encode_cstring(&format!("{key}={value}")),
        ));
    }
    if let Ok(cwd) = std::env::current_dir() {
        channel.send(Frame::new(
            MsgType::IdentifyCwd,
            encode_cstring(&cwd.to_string_lossy()),
        ));
    }
    channel.send(Frame::new(
        MsgType::IdentifyClientPid,
        encode_u32(std::process::id()),
    ));
    channel.send(Frame::empty(MsgType::IdentifyDone));

    send_resize(channel);
    channel.send(Frame::new(MsgType::Command, encode_argv(&cli.command)));
    Ok(())
}

/// Report the terminal size to the server.
fn send_resize(channel: &mut Channel) {
    if let Ok(size) = rustix::termios::tcgetwinsize(rustix::stdio::stdin()) {
        channel.send(Frame::new(
            MsgType::Resize,
            encode_resize(size.ws_col, size.ws_row),
        ));
    }
}

/// Relay loop: socket frames in, until the server tells us to go.
fn relay(cli: &Cli, channel: &mut Channel, winch: &AtomicBool) -> Result<i32> {
    let _ = cli;
    loop {
        let mut flags = PollFlags::IN;
        if channel.wants_write() {
            flags |= PollFlags::OUT;
        }
        let mut fds = [PollFd::new(channel.stream(), flags)];
        match rustix::event::poll(&mut fds, 200) {
            Ok(_) | Err(rustix::io::Errno::INTR) => {}
            Err(e) => bail!("poll failed: {e}"),
        }

        if winch.swap(false, Ordering::Relaxed) {
            send_resize(channel);
        }

        channel.flush().context("socket write")?;
        let frames = match channel.poll_recv() {
            Ok(frames) => frames,
            Err(seam_protocol::ProtocolError::Closed) => return Ok(0),
            Err(e) => bail!("protocol error: {e}"),
        };
        for frame in frames {
            if let Some(code) = handle_frame(channel, frame)? {
                return Ok(code);
            }
        }
    }
}

/// Process one server frame; `Some(code)` ends the client.
fn handle_frame(channel: &mut Channel, frame: Frame) -> Result<Option<i32>> {
    match frame.kind {
        MsgType::Version | MsgType::Ready => Ok(None),
        MsgType::Exit => {
            let code = decode_u32(MsgType::Exit, &frame.payload).unwrap_or(0);
            channel.send(Frame::empty(MsgType::Exiting));
            let _ = channel.flush();
            Ok(Some(code as i32))
        }
        MsgType::Detach | MsgType::DetachKill => {
            channel.send(Frame::empty(MsgType::Exiting));
            let _ = channel.flush();
            eprintln!("[detached]");
            Ok(Some(0))
        }
        MsgType::Shutdown => {
            eprintln!("[server exited]");
            Ok(Some(0))
        }
        MsgType::Shell => {
            // Command output.
            if let Ok(text) =
                seam_protocol::frame::decode_cstring(MsgType::Shell, &frame.payload)
            {
                println!("{text}");
            }
            Ok(None)
        }
        MsgType::ReadOpen => {
            handle_read_open(channel, &frame.payload);
            Ok(None)
        }
        MsgType::WriteOpen => {
            handle_write_open(channel, &frame.payload);
            Ok(None)
        }
        MsgType::Write => {
            if let Ok((stream, data)) =
                seam_protocol::frame::decode_stream_data(MsgType::Write, &frame.payload)
            {
                append_write(stream, data);
            }
            Ok(None)
        }
        MsgType::WriteClose => {
            if frame.payload.len() == 4 {
                let stream =
                    u32::from_le_bytes([frame.payload[0], frame.payload[1], frame.payload[2], frame.payload[3]]);
                close_write(stream);
            }
            Ok(None)
        }
        _ => Ok(None),
    }
}

// ── File streams (server-side load-buffer / save-buffer) ────────────

use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    /// Open write streams: id → file handle.
    static WRITE_STREAMS: RefCell<HashMap<u32, std::fs::File>> = RefCell::new(HashMap::new());
}

/// `load-buffer`: stream a local file up to the server.
fn handle_read_open(channel: &mut Channel, payload: &[u8]) {
    // stream:u32 fd:i32 path\0
    if payload.len() < 9 {
        return;
    }
    let stream = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let path_bytes = &payload[8..];
    let path = match path_bytes.split_last() {
        Some((0, body)) => String::from_utf8_lossy(body).into_owned(),
        _ => return,
    };
    match std::fs::read(&path) {
        Ok(data) => {
            for chunk in data.chunks(8 * 1024) {
                channel.send(Frame::new(
                    MsgType::Read,
                    encode_stream_data(stream, chunk),
                ));
            }
            channel.send(Frame::new(
                MsgType::ReadDone,
                encode_stream_result(stream, 0),
            ));
        }
        Err(e) => {
            channel.send(Frame::new(
                MsgType::ReadDone,
                encode_stream_result(stream, e.raw_os_error().unwrap_or(-1)),
            ));
        }
    }
}

/// `save-buffer`: open the local target and acknowledge readiness.
fn handle_write_open(channel: &mut Channel, payload: &[u8]) {
    // stream:u32 fd:i32 flags:i32 path\0
    if payload.len() < 13 {
        return;
    }
    let stream = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let append = i32::from_le_bytes([payload[8], payload[9], payload[10], payload[11]]) != 0;
    let path = match payload[12..].split_last() {
        Some((0, body)) => String::from_utf8_lossy(body).into_owned(),
        _ => return,
    };
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .append(append)
        .truncate(!append)
        .open(&path);
    match file {
        Ok(file) => {
            WRITE_STREAMS.with(|streams| streams.borrow_mut().insert(stream, file));
            channel.send(Frame::new(
                MsgType::WriteReady,
                encode_stream_result(stream, 0),
            ));
        }
        Err(e) => {
            channel.send(Frame::new(
                MsgType::WriteReady,
                encode_stream_result(stream, e.raw_os_error().unwrap_or(-1)),
            ));
        }
    }
}

fn append_write(stream: u32, data: &[u8]) {
    WRITE_STREAMS.with(|streams| {
        if let Some(file) = streams.borrow_mut().get_mut(&stream) {
            let _ = file.write_all(data);
        }
    });
}

fn close_write(stream: u32) {
    WRITE_STREAMS.with(|streams| {
        streams.borrow_mut().remove(&stream);
    });
}
