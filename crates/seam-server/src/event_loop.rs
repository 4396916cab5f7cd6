//! The event loop: one poll set, cooperatively drained.
//!
//! Sources: the listening socket, every client socket and tty, every PTY
//! master, and a signal self-pipe. Each iteration drains ready sources
//! one block each, runs the command queue until empty or parked, then
//! re-renders dirty clients. Signals are level-queued through the pipe
//! and handled at iteration boundaries.

use std::io;
use std::os::fd::{BorrowedFd, OwnedFd, RawFd};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustix::event::{PollFd, PollFlags};
use seam_protocol::frame::{
    decode_argv, decode_resize, decode_stream_result, decode_u32, encode_stream_data,
    encode_u32,
};
use seam_protocol::{Channel, Frame, MsgType, ProtocolError, PROTOCOL_VERSION};

use crate::client::{ClientFlags, FileStream};
use crate::cmd::queue::ItemFlags;
use crate::ids::{ClientId, PaneId};
use crate::pane::PaneEvent;
use crate::server::Server;
use crate::{cmd, input, render};

/// Status-line / housekeeping tick interval.
const TICK: Duration = Duration::from_secs(1);

/// Write chunk size for save-buffer streaming.
const WRITE_CHUNK: usize = 8 * 1024;

/// What a poll slot refers to.
#[derive(Debug, Clone, Copy)]
enum Source {
    Listener,
    SignalPipe,
    ClientSock(ClientId),
    ClientTty(ClientId),
    PanePty(PaneId),
}

/// The readiness loop and its signal plumbing.
pub struct EventLoop {
    listener: UnixListener,
    signal_rx: OwnedFd,
    sigchld: Arc<AtomicBool>,
    sigterm: Arc<AtomicBool>,
    sighup: Arc<AtomicBool>,
}

impl EventLoop {
    /// Bind the server socket (checking directory ownership and mode)
    /// and install signal handlers.
    pub fn bind(socket_path: &Path) -> io::Result<Self> {
        prepare_socket_dir(socket_path)?;
        // A stale socket from a dead server blocks bind; remove it. A
        // live server is detected by the client before spawning us.
        let _ = std::fs::remove_file(socket_path);
        let listener = UnixListener::bind(socket_path)?;
        listener.set_nonblocking(true)?;
        let mut permissions = std::fs::metadata(socket_path)?.permissions();
        permissions.set_mode(0o600);
        std::fs::set_permissions(socket_path, permissions)?;

        let (signal_rx, signal_tx) = rustix::pipe::pipe_with(
            rustix::pipe::PipeFlags::NONBLOCK | rustix::pipe::PipeFlags::CLOEXEC,
        )
        .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))?;

        let sigchld = Arc::new(AtomicBool::new(false));
        let sigterm = Arc::new(AtomicBool::new(false));
        let sighup = Arc::new(AtomicBool::new(false));
        for (signal, flag) in [
            (signal_hook::consts::SIGCHLD, &sigchld),
            (signal_hook::consts::SIGTERM, &sigterm),
            (signal_hook::consts::SIGHUP, &sighup),
        ] {
            signal_hook::flag::register(signal, Arc::clone(flag))
                .map_err(io::Error::other)?;
            let dup = signal_tx.try_clone()?;
            signal_hook::low_level::pipe::register_raw(signal, dup)
                .map_err(io::Error::other)?;
        }

        Ok(Self {
            listener,
            signal_rx,
            sigchld,
            sigterm,
            sighup,
        })
    }

    /// Run until the server shuts down and its clients have drained.
    pub fn run(&mut self, server: &mut Server) -> io::Result<()> {
        let mut last_tick = Instant::now();
        loop {
            if server.shutting_down && server.clients.is_empty() {
                break;
            }

            let (sources, mut fds) = self.build_poll_set(server);
            let timeout = TICK
                .saturating_sub(last_tick.elapsed())
                .as_millis()
                .max(1) as i32;
            match rustix::event::poll(&mut fds, timeout) {
                Ok(_) => {}
                Err(rustix::io::Errno::INTR) => {}
                Err(e) => return Err(io::Error::from_raw_os_error(e.raw_os_error())),
            }

            let ready: Vec<(Source, PollFlags)> = sources
                .iter()
                .zip(fds.iter())
                .map(|(s, fd)| (*s, fd.revents()))
                .filter(|(_, revents)| !revents.is_empty())
                .collect();
            drop(fds);

            // Signals first, on the iteration boundary.
            self.handle_signals(server, &ready);

            for (source, revents) in &ready {
                match source {
                    Source::Listener => self.accept_clients(server),
                    Source::SignalPipe => {}
                    Source::ClientSock(client) => {
                        if revents.intersects(PollFlags::IN | PollFlags::HUP | PollFlags::ERR)
                        {
                            client_sock_readable(server, *client);
                        }
                    }
                    Source::ClientTty(client) => {
                        if revents.intersects(PollFlags::IN) {
                            let bytes = server
                                .clients
                                .get_mut(client)
                                .map(crate::client::Client::tty_read)
                                .unwrap_or_default();
                            if !bytes.is_empty() {
                                input::handle_tty_input(server, *client, &bytes);
                            }
                        }
                    }
                    Source::PanePty(pane) => {
                        if revents.intersects(PollFlags::IN) {
                            pane_readable(server, *pane);
                        }
                        if revents.intersects(PollFlags::HUP) {
                            pane_hangup(server, *pane);
                        }
                    }
                }
            }

            // After I/O the command queue drains until empty or parked.
            cmd::drain(server);

            if last_tick.elapsed() >= TICK {
                last_tick = Instant::now();
                tick(server);
            }

            render::render_clients(server);
            flush_all(server);
            reap_exited_clients(server);
        }
        let _ = std::fs::remove_file(&server.socket_path);
        Ok(())
    }

    fn build_poll_set<'fd>(
        &'fd self,
        server: &Server,
    ) -> (Vec<Source>, Vec<PollFd<'fd>>) {
        let mut sources = Vec::new();
        let mut fds: Vec<PollFd<'fd>> = Vec::new();

        sources.push(Source::Listener);
        fds.push(PollFd::new(&self.listener, PollFlags::IN));
        sources.push(Source::SignalPipe);
        fds.push(PollFd::new(&self.signal_rx, PollFlags::IN));

        let borrow = |raw: RawFd| -> BorrowedFd<'fd> {
            // The fds live in `server`, which outlives this poll call;
            // the loop rebuilds the set every iteration.
            unsafe { BorrowedFd::borrow_raw(raw) }
        };

        for (&id, client) in &server.clients {
            sources.push(Source::ClientSock(id));
            let mut flags = PollFlags::IN;
            if client.channel.wants_write() {
                flags |= PollFlags::OUT;
            }
            fds.push(PollFd::from_borrowed_fd(borrow(client.channel.raw_fd()), flags));

            if let Some(tty) = client.tty_fd() {
                sources.push(Source::ClientTty(id));
                let mut flags = PollFlags::IN;
                if client.tty_wants_write() {
                    flags |= PollFlags::OUT;
                }
                fds.push(PollFd::from_borrowed_fd(borrow(tty), flags));
            }
        }

        for (&id, pane) in &server.panes {
            if let Some(fd) = pane.poll_fd() {
                sources.push(Source::PanePty(id));
                let mut flags = PollFlags::IN;
                if pane.wants_write() {
                    flags |= PollFlags::OUT;
                }
                fds.push(PollFd::from_borrowed_fd(borrow(fd), flags));
            }
        }

        (sources, fds)
    }

    fn handle_signals(&mut self, server: &mut Server, ready: &[(Source, PollFlags)]) {
        let signaled = ready
            .iter()
            .any(|(s, _)| matches!(s, Source::SignalPipe));
        if signaled {
            // Drain the pipe; the flags carry the which.
            let mut buf = [0u8; 64];
            while matches!(rustix::io::read(&self.signal_rx, &mut buf), Ok(n) if n > 0) {}
        }
        if self.sigchld.swap(false, Ordering::Relaxed) {
            reap_children(server);
        }
        if self.sigterm.swap(false, Ordering::Relaxed) {
            tracing::info!("SIGTERM: shutting down");
            server.kill_server();
        }
        // SIGHUP is noise to a daemon; clients going away arrive as
        // socket closes.
        self.sighup.swap(false, Ordering::Relaxed);
    }

    fn accept_clients(&self, server: &mut Server) {
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => match Channel::new(stream) {
                    Ok(channel) => {
                        server.add_client(channel);
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to wrap client socket"),
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    break;
                }
            }
        }
    }
}

/// Verify (or create) the socket directory: mode 0700, owned by us.
fn prepare_socket_dir(socket_path: &Path) -> io::Result<()> {
    let Some(dir) = socket_path.parent() else {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "bad socket path"));
    };
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }
    let metadata = std::fs::metadata(dir)?;
    let uid = rustix::process::getuid().as_raw();
    if metadata.uid() != uid {
        return Err(io::Error::other(format!(
            "socket directory {} not owned by us",
            dir.display()
        )));
    }
    if metadata.permissions().mode() & 0o077 != 0 {
        return Err(io::Error::other(format!(
            "socket directory {} has unsafe permissions",
            dir.display()
        )));
    }
    Ok(())
}

/// SIGCHLD: match exited children to panes through their handles.
fn reap_children(server: &mut Server) {
    let exited: Vec<(u32, i32)> = server
        .panes
        .values_mut()
        .filter(|p| !p.is_dead())
        .filter_map(|p| p.try_wait().map(|status| (p.pid(), status)))
        .collect();
    for (pid, status) in exited {
        tracing::debug!(pid, status, "child exited");
        server.child_exited(pid, status);
    }
}

fn client_sock_readable(server: &mut Server, client: ClientId) {
    let frames = match server.clients.get_mut(&client) {
        Some(c) => match c.channel.poll_recv() {
            Ok(frames) => frames,
            Err(ProtocolError::Closed) => {
                server.remove_client(client);
                return;
            }
            Err(e) => {
                tracing::warn!(client = %client, error = %e, "protocol error; disconnecting");
                server.remove_client(client);
                return;
            }
        },
        None => return,
    };
    for frame in frames {
        handle_frame(server, client, frame);
        if !server.clients.contains_key(&client) {
            return;
        }
    }
}

/// Dispatch one frame from a client.
fn handle_frame(server: &mut Server, client: ClientId, frame: Frame) {
    let Some(c) = server.clients.get_mut(&client) else {
        return;
    };
    match frame.kind {
        MsgType::Version => match decode_u32(MsgType::Version, &frame.payload) {
            Ok(version) if version == PROTOCOL_VERSION => {
                c.channel
                    .send(Frame::new(MsgType::Version, encode_u32(PROTOCOL_VERSION)));
            }
            Ok(version) => {
                tracing::warn!(client = %client, version, "protocol version mismatch");
                server.remove_client(client);
            }
            Err(_) => server.remove_client(client),
        },
        MsgType::IdentifyFlags | MsgType::IdentifyLongFlags => {
            if let Ok(bits) = decode_u32(frame.kind, &frame.payload) {
                // Bit 0: UTF-8 capable. Bit 1: force 256 colors.
                c.flags.set(ClientFlags::UTF8, bits & 0x1 != 0);
                c.flags.set(ClientFlags::FORCE_256, bits & 0x2 != 0);
                // Bit 2: control mode.
                c.flags.set(ClientFlags::CONTROL, bits & 0x4 != 0);
            }
        }
        MsgType::IdentifyTerm => {
            if let Ok(term) = seam_protocol::frame::decode_cstring(frame.kind, &frame.payload)
            {
                c.term = term;
            }
        }
        MsgType::IdentifyTtyName => {
            if let Ok(name) = seam_protocol::frame::decode_cstring(frame.kind, &frame.payload)
            {
                c.ttyname = name;
            }
        }
        MsgType::IdentifyTerminfo => {
            if let Ok(line) = seam_protocol::frame::decode_cstring(frame.kind, &frame.payload)
            {
                c.caps.apply_override_line(&line);
            }
        }
        MsgType::IdentifyStdin => {
            if let Some(fd) = frame.fd
                && let Err(e) = c.adopt_tty(fd)
            {
                tracing::warn!(client = %client, error = %e, "cannot adopt client tty");
            }
        }
        MsgType::IdentifyStdout | MsgType::IdentifyFeatures | MsgType::IdentifyOldCwd => {}
        MsgType::IdentifyEnviron => {
            if let Ok(pair) = seam_protocol::frame::decode_cstring(frame.kind, &frame.payload)
                && let Some((key, value)) = pair.split_once('=')
            {
                c.env.insert(key.to_string(), value.to_string());
            }
        }
        MsgType::IdentifyCwd => {
            if let Ok(cwd) = seam_protocol::frame::decode_cstring(frame.kind, &frame.payload) {
                c.cwd = cwd.into();
            }
        }
        MsgType::IdentifyClientPid => {
            if let Ok(pid) = decode_u32(frame.kind, &frame.payload) {
                c.pid = Some(pid);
            }
        }
        MsgType::IdentifyDone => {
            c.flags.insert(ClientFlags::IDENTIFIED);
            let utf8 = c.flags.contains(ClientFlags::UTF8);
            let term = c.term.clone();
            // Rebuild term/utf8/colors from the identify data while
            // keeping any terminfo overrides already applied.
            let mut caps = seam_render::TermCaps::for_term(&term, utf8);
            if c.flags.contains(ClientFlags::FORCE_256) {
                caps.set_colors(seam_render::ColorLevel::Ansi256);
            }
            c.caps.term = caps.term;
            c.caps.utf8 = caps.utf8;
            c.caps.colors = caps.colors;
            tracing::debug!(client = %client, term = %term, "client identified");
        }
        MsgType::Command => match decode_argv(&frame.payload) {
            Ok(argv) => queue_client_command(server, client, argv),
            Err(e) => {
                tracing::warn!(client = %client, error = %e, "bad command frame");
                server.remove_client(client);
            }
        },
        MsgType::Resize => {
            if let Ok((cols, rows)) = decode_resize(&frame.payload) {
                server.client_resized(client, cols, rows);
            }
        }
        MsgType::Exiting => {
            server.remove_client(client);
        }
        MsgType::Read => {
            if let Ok((stream, data)) =
                seam_protocol::frame::decode_stream_data(frame.kind, &frame.payload)
            {
                if let Some(FileStream::Read { data: buffer, .. }) =
                    c.file_streams.get_mut(&stream)
                {
                    buffer.extend_from_slice(data);
                }
            }
        }
        MsgType::ReadDone => {
            if let Ok((stream, error)) = decode_stream_result(frame.kind, &frame.payload) {
                finish_read_stream(server, client, stream, error);
            }
        }
        MsgType::WriteReady => {
            if let Ok((stream, error)) = decode_stream_result(frame.kind, &frame.payload) {
                start_write_stream(server, client, stream, error);
            }
        }
        MsgType::WriteClose => {}
        MsgType::Flags => {}
        other => {
            tracing::debug!(client = %client, kind = ?other, "ignoring frame");
        }
    }
}

/// Queue a COMMAND frame's argv as a command list.
///
/// An empty argv means the CLI default: attach when sessions exist,
/// otherwise create one.
fn queue_client_command(server: &mut Server, client: ClientId, argv: Vec<String>) {
    let argv = if argv.is_empty() {
        if server.sessions.is_empty() {
            vec!["new-session".to_string()]
        } else {
            vec!["attach-session".to_string()]
        }
    } else {
        argv
    };
    // Split on standalone ";" words into a command list.
    let mut cmds: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for word in argv {
        if word == ";" {
            if !current.is_empty() {
                cmds.push(std::mem::take(&mut current));
            }
        } else {
            current.push(word);
        }
    }
    if !current.is_empty() {
        cmds.push(current);
    }
    if cmds.is_empty() {
        return;
    }
    server
        .queue
        .append(Some(client), cmds, ItemFlags::empty(), None, None);
}

fn pane_readable(server: &mut Server, pane: PaneId) {
    let events = match server.panes.get_mut(&pane) {
        Some(p) => match p.on_readable() {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(pane = %pane, error = %e, "pane read failed");
                Vec::new()
            }
        },
        None => return,
    };
    let window = match server.panes.get(&pane) {
        Some(p) => p.window,
        None => return,
    };
    server.redraw_window(window);
    for event in events {
        match event {
            PaneEvent::Bell => {
                // The bell passes through to every client viewing the
                // window.
                let sessions = server.sessions_of_window(window);
                for session in sessions {
                    for client in server.clients_of_session(session) {
                        if let Some(c) = server.clients.get_mut(&client) {
                            c.tty_write(b"\x07");
                        }
                    }
                }
            }
            PaneEvent::TitleChanged => {
                server.auto_rename_windows();
            }
            PaneEvent::Clipboard(base64_data) => {
                publish_clipboard(server, pane, &base64_data);
            }
        }
    }
}

/// OSC 52 from a pane: store the decoded content as a paste buffer and
/// forward the sequence to every attached client terminal.
fn publish_clipboard(server: &mut Server, pane: PaneId, base64_data: &[u8]) {
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(base64_data)
        .unwrap_or_default();
    let window = match server.panes.get(&pane) {
        Some(p) => p.window,
        None => return,
    };
    let sessions = server.sessions_of_window(window);
    for &session in &sessions {
        let limit = server.session_option_number(session, "buffer-limit").max(1) as usize;
        if let Some(s) = server.sessions.get_mut(&session) {
            s.paste_push(decoded.clone(), limit);
        }
    }
    let mut sequence = b"\x1b]52;c;".to_vec();
    sequence.extend_from_slice(base64_data);
    sequence.push(0x07);
    for session in sessions {
        for client in server.clients_of_session(session) {
            if let Some(c) = server.clients.get_mut(&client) {
                c.tty_write(&sequence);
            }
        }
    }
}

/// POLLHUP on a pane whose child has not been reaped yet.
fn pane_hangup(server: &mut Server, pane: PaneId) {
    let exited = server
        .panes
        .get_mut(&pane)
        .filter(|p| !p.is_dead())
        .and_then(|p| p.try_wait().map(|status| (p.pid(), status)));
    if let Some((pid, status)) = exited {
        server.child_exited(pid, status);
    }
}

fn finish_read_stream(server: &mut Server, client: ClientId, stream: u32, error: i32) {
    let Some(c) = server.clients.get_mut(&client) else {
        return;
    };
    let Some(FileStream::Read {
        item,
        session,
        data,
    }) = c.file_streams.remove(&stream)
    else {
        return;
    };
    if error != 0 {
        server.report_error(Some(client), &format!("read failed: errno {error}"));
        server.queue.remove(item);
        return;
    }
    let limit = server.session_option_number(session, "buffer-limit").max(1) as usize;
    if let Some(s) = server.sessions.get_mut(&session) {
        s.paste_push(data, limit);
    }
    server.queue.push_back(item);
}

fn start_write_stream(server: &mut Server, client: ClientId, stream: u32, error: i32) {
    let Some(c) = server.clients.get_mut(&client) else {
        return;
    };
    if error != 0 {
        if let Some(FileStream::Write { item, .. }) = c.file_streams.remove(&stream) {
            server.report_error(Some(client), &format!("write failed: errno {error}"));
            server.queue.remove(item);
        }
        return;
    }
    let Some(FileStream::Write { item, data }) = c.file_streams.remove(&stream) else {
        return;
    };
    for chunk in data.chunks(WRITE_CHUNK) {
        c.channel
            .send(Frame::new(MsgType::Write, encode_stream_data(stream, chunk)));
    }
    c.channel.send(Frame::new(
        MsgType::WriteClose,
        stream.to_le_bytes().to_vec(),
    ));
    server.queue.push_back(item);
}

/// Housekeeping on the 1-second tick.
fn tick(server: &mut Server) {
    let now = Instant::now();
    for c in server.clients.values_mut() {
        let _ = c.expire_overlay(now);
    }
    server.auto_rename_windows();
}

/// Flush all buffered output: client sockets, client ttys, pane PTYs.
fn flush_all(server: &mut Server) {
    let mut broken: Vec<ClientId> = Vec::new();
    for (&id, c) in &mut server.clients {
        if c.channel.flush().is_err() {
            broken.push(id);
            continue;
        }
        c.tty_flush();
    }
    for id in broken {
        server.remove_client(id);
    }
    for pane in server.panes.values_mut() {
        if let Err(e) = pane.flush_output() {
            tracing::debug!(pane = %pane.id, error = %e, "pane flush failed");
        }
    }
}

/// Drop clients marked EXIT once their sockets have drained.
fn reap_exited_clients(server: &mut Server) {
    let done: Vec<ClientId> = server
        .clients
        .iter()
        .filter(|(_, c)| c.flags.contains(ClientFlags::EXIT) && !c.channel.wants_write())
        .map(|(&id, _)| id)
        .collect();
    for id in done {
        server.remove_client(id);
    }
}
