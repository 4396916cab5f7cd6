//! The server root: owner of every session, window, pane, and client.
//!
//! All state lives behind this one value; event-loop callbacks borrow it
//! mutably one at a time. Methods here are the mutation vocabulary the
//! command executors, protocol handlers, and lifecycle plumbing share.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::SystemTime;

use seam_protocol::frame::{encode_cstring, encode_u32};
use seam_protocol::{Frame, MsgType};

use crate::client::{Client, ClientFlags};
use crate::cmd::queue::{CommandQueue, WaitChannel};
use crate::ids::{ClientId, IdAllocator, PaneId, SessionId, WindowId};
use crate::layout::{LayoutNode, PresetLayout, Rect, SplitDir};
use crate::options::Options;
use crate::pane::Pane;
use crate::session::Session;
use crate::window::Window;

/// Rows reserved for the status line at the bottom of every client.
pub const STATUS_LINES: u16 = 1;

/// Everything the server owns.
pub struct Server {
    pub sessions: HashMap<SessionId, Session>,
    pub windows: HashMap<WindowId, Window>,
    pub panes: HashMap<PaneId, Pane>,
    pub clients: HashMap<ClientId, Client>,
    session_ids: IdAllocator,
    window_ids: IdAllocator,
    pane_ids: IdAllocator,
    client_ids: IdAllocator,
    pub global_options: Options,
    pub global_env: BTreeMap<String, String>,
    pub queue: CommandQueue,
    pub wait_channels: HashMap<String, WaitChannel>,
    /// Hook name → command string.
    pub hooks: HashMap<String, String>,
    pub start_time: SystemTime,
    pub socket_path: PathBuf,
    /// Set by kill-server / SIGTERM; the loop drains and exits.
    pub shutting_down: bool,
    /// Monotonic sequence handed to clients as they resize, so
    /// `window-size = latest` can order them by recency.
    resize_counter: u64,
}

impl Server {
    /// A fresh server with no sessions.
    #[must_use]
    pub fn new(socket_path: PathBuf) -> Self {
        let mut global_env = BTreeMap::new();
        global_env.insert("SEAM".to_string(), socket_path.display().to_string());
        Self {
            sessions: HashMap::new(),
            windows: HashMap::new(),
            panes: HashMap::new(),
            clients: HashMap::new(),
            session_ids: IdAllocator::default(),
            window_ids: IdAllocator::default(),
            pane_ids: IdAllocator::default(),
            client_ids: IdAllocator::default(),
            global_options: Options::new(),
            global_env,
            queue: CommandQueue::new(),
            wait_channels: HashMap::new(),
            hooks: HashMap::new(),
            start_time: SystemTime::now(),
            socket_path,
            shutting_down: false,
            resize_counter: 0,
        }
    }

    // ── Lookup helpers ──────────────────────────────────────────────

    /// Exact session-name lookup.
    #[must_use]
    pub fn session_by_name(&self, name: &str) -> Option<SessionId> {
        self.sessions
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(&id, _)| id)
    }

    /// The sessions a window is linked into.
    #[must_use]
    pub fn sessions_of_window(&self, window: WindowId) -> Vec<SessionId> {
        self.sessions
            .iter()
            .filter(|(_, s)| s.index_of(window).is_some())
            .map(|(&id, _)| id)
            .collect()
    }

    /// The clients attached to a session.
    #[must_use]
    pub fn clients_of_session(&self, session: SessionId) -> Vec<ClientId> {
        self.clients
            .iter()
            .filter(|(_, c)| c.session == Some(session))
            .map(|(&id, _)| id)
            .collect()
    }

    /// The pane's resolved options parent chain value helpers.
    #[must_use]
    pub fn session_option_number(&self, session: SessionId, name: &str) -> i64 {
        match self.sessions.get(&session) {
            Some(s) => s.options.number(Some(&self.global_options), name),
            None => self.global_options.number(None, name),
        }
    }

    #[must_use]
    pub fn session_option_flag(&self, session: SessionId, name: &str) -> bool {
        match self.sessions.get(&session) {
            Some(s) => s.options.flag(Some(&self.global_options), name),
            None => self.global_options.flag(None, name),
        }
    }

    #[must_use]
    pub fn session_option_string(&self, session: SessionId, name: &str) -> String {
        match self.sessions.get(&session) {
            Some(s) => s.options.string(Some(&self.global_options), name),
            None => self.global_options.string(None, name),
        }
    }

    /// The default shell for new panes.
    #[must_use]
    pub fn default_shell(&self) -> String {
        let configured = self.global_options.string(None, "default-shell");
        if !configured.is_empty() {
            return configured;
        }
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
    }

    /// Environment for a new pane: the global env, the spawning client's
    /// PATH, then the session env — session wins on collision — plus TERM.
    #[must_use]
    pub fn spawn_env(
        &self,
        session: SessionId,
        client: Option<ClientId>,
    ) -> BTreeMap<String, String> {
        let mut env = self.global_env.clone();
        if let Some(path) = client
            .and_then(|c| self.clients.get(&c))
            .and_then(|c| c.env.get("PATH"))
        {
            env.insert("PATH".to_string(), path.clone());
        }
        if let Some(s) = self.sessions.get(&session) {
            for (k, v) in &s.env {
                env.insert(k.clone(), v.clone());
            }
        }
        env.insert("TERM".to_string(), "screen-256color".to_string());
        env
    }

    // ── Session / window / pane creation ────────────────────────────

    /// Create a session with one window running `argv` (or the shell).
    ///
    /// `client` is the submitting client, whose PATH seeds the child
    /// environment.
    pub fn new_session(
        &mut self,
        name: Option<String>,
        cwd: Option<PathBuf>,
        argv: Vec<String>,
        sx: u16,
        sy: u16,
        client: Option<ClientId>,
    ) -> Result<SessionId, String> {
        let name = match name {
            Some(name) => {
                if name.is_empty() || name.contains([':', '.']) {
                    return Err(format!("bad session name: {name}"));
                }
                if self.session_by_name(&name).is_some() {
                    return Err(format!("duplicate session: {name}"));
                }
                name
            }
            None => {
                let mut n = self.session_ids.peek();
                loop {
                    let candidate = n.to_string();
                    if self.session_by_name(&candidate).is_none() {
                        break candidate;
                    }
                    n += 1;
                }
            }
        };

        let session_id = SessionId(self.session_ids.next());
        let cwd = cwd.unwrap_or_else(|| {
            std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("/"))
        });
        let base_index = self.global_options.number(None, "base-index") as u32;

        // The window is created first; session construction cannot fail
        // after the pane spawn succeeds.
        let window_id = self.spawn_window(
            session_id,
            &cwd,
            argv,
            sx,
            sy.saturating_sub(STATUS_LINES),
            client,
        )?;
        let session = Session::new(session_id, name, cwd, window_id, base_index);
        self.sessions.insert(session_id, session);
        if let Some(w) = self.windows.get_mut(&window_id) {
            w.refs += 1;
        }
        tracing::info!(session = %session_id, "created session");
        Ok(session_id)
    }

    /// Spawn a window (not yet linked) with one pane.
    fn spawn_window(
        &mut self,
        session: SessionId,
        cwd: &std::path::Path,
        argv: Vec<String>,
        sx: u16,
        sy: u16,
        client: Option<ClientId>,
    ) -> Result<WindowId, String> {
        let argv = if argv.is_empty() {
            vec![self.default_shell()]
        } else {
            argv
        };
        let window_id = WindowId(self.window_ids.next());
        let pane_id = PaneId(self.pane_ids.next());
        let history = self.session_option_number(session, "history-limit").max(0) as usize;
        let env = self.spawn_env(session, client);
        let pane = Pane::spawn(pane_id, window_id, argv.clone(), cwd, &env, sx, sy, history)
            .map_err(|e| format!("spawn failed: {e}"))?;
        self.panes.insert(pane_id, pane);

        let name = argv
            .first()
            .map(|c| basename(c))
            .unwrap_or_else(|| "shell".to_string());
        let window = Window::new(window_id, name, pane_id, sx, sy);
        self.windows.insert(window_id, window);
        Ok(window_id)
    }

    /// Create and link a new window into a session.
    pub fn new_window(
        &mut self,
        session: SessionId,
        argv: Vec<String>,
        name: Option<String>,
        select: bool,
        client: Option<ClientId>,
    ) -> Result<WindowId, String> {
        let (sx, sy) = self.effective_session_size(session);
        let cwd = self
            .sessions
            .get(&session)
            .map(|s| s.cwd.clone())
            .ok_or_else(|| "no such session".to_string())?;
        let window_id = self.spawn_window(session, &cwd, argv, sx, sy, client)?;
        if let Some(name) = name {
            let w = self.windows.get_mut(&window_id).unwrap();
            w.name = name;
            w.name_is_user_set = true;
        }
        let base_index = self.global_options.number(None, "base-index") as u32;
        let s = self.sessions.get_mut(&session).unwrap();
        let index = s.link_window(window_id, base_index);
        if select {
            s.select(index);
        }
        self.windows.get_mut(&window_id).unwrap().refs += 1;
        self.redraw_session(session);
        Ok(window_id)
    }

    /// Split a window's active pane, spawning a new pane.
    pub fn split_pane(
        &mut self,
        window: WindowId,
        dir: SplitDir,
        argv: Vec<String>,
        cwd: Option<PathBuf>,
        client: Option<ClientId>,
    ) -> Result<PaneId, String> {
        let session = *self
            .sessions_of_window(window)
            .first()
            .ok_or_else(|| "window not linked".to_string())?;
        let argv = if argv.is_empty() {
            vec![self.default_shell()]
        } else {
            argv
        };
        let cwd = cwd.unwrap_or_else(|| self.sessions[&session].cwd.clone());

        // Refuse when the active pane is too small to split.
        let w = &self.windows[&window];
        let active_rect = w
            .layout
            .compute(Rect::new(0, 0, w.sx, w.sy))
            .into_iter()
            .find(|(p, _)| *p == w.active)
            .map(|(_, r)| r)
            .ok_or_else(|| "active pane not in layout".to_string())?;
        let fits = match dir {
            SplitDir::Horizontal => active_rect.w >= 3,
            SplitDir::Vertical => active_rect.h >= 3,
        };
        if !fits {
            return Err("pane too small to split".to_string());
        }

        let pane_id = PaneId(self.pane_ids.next());
        let history = self.session_option_number(session, "history-limit").max(0) as usize;
        let env = self.spawn_env(session, client);
        // Sized provisionally; apply_layout resizes to the real cell.
        let pane = Pane::spawn(
            pane_id,
            window,
            argv,
            &cwd,
            &env,
            active_rect.w,
            active_rect.h,
            history,
        )
        .map_err(|e| format!("spawn failed: {e}"))?;
        self.panes.insert(pane_id, pane);
        self.windows.get_mut(&window).unwrap().add_pane(pane_id, dir);
        self.apply_layout(window);
        self.redraw_window(window);
        Ok(pane_id)
    }

    // ── Destruction (cascade: pane → window → session) ──────────────

    /// Remove a pane; collapses the window and session behind it.
    pub fn kill_pane(&mut self, pane: PaneId) {
        let Some(p) = self.panes.get_mut(&pane) else {
            return;
        };
        if !p.is_dead() {
            p.hangup();
        }
        let window = p.window;
        self.panes.remove(&pane);
        if let Some(w) = self.windows.get_mut(&window) {
            if w.remove_pane(pane) {
                self.apply_layout(window);
                self.redraw_window(window);
            } else {
                self.kill_window(window);
            }
        }
        tracing::debug!(pane = %pane, "killed pane");
    }

    /// Unlink a window from every session and destroy it.
    pub fn kill_window(&mut self, window: WindowId) {
        let sessions = self.sessions_of_window(window);
        for session in sessions {
            let mut emptied = false;
            if let Some(s) = self.sessions.get_mut(&session) {
                if let Some(index) = s.index_of(window) {
                    s.unlink_window(index);
                }
                emptied = s.is_empty();
            }
            if emptied {
                self.kill_session(session);
            } else {
                self.redraw_session(session);
            }
        }
        if let Some(w) = self.windows.remove(&window) {
            for pane in w.panes().to_vec() {
                if let Some(mut p) = self.panes.remove(&pane) {
                    if !p.is_dead() {
                        p.hangup();
                    }
                }
            }
        }
        tracing::debug!(window = %window, "killed window");
    }

    /// Destroy a session, its unshared windows, and detach its clients.
    pub fn kill_session(&mut self, session: SessionId) {
        let Some(s) = self.sessions.remove(&session) else {
            return;
        };
        tracing::info!(session = %session, name = %s.name, "destroying session");
        let windows: Vec<WindowId> = s.windows().values().copied().collect();
        for window in windows {
            let mut unreferenced = false;
            if let Some(w) = self.windows.get_mut(&window) {
                w.refs = w.refs.saturating_sub(1);
                unreferenced = w.refs == 0;
            }
            if unreferenced {
                self.kill_window(window);
            }
        }
        for client in self.clients_of_session(session) {
            self.detach_client(client, MsgType::Detach);
        }
    }

    /// Full shutdown: notify clients, destroy everything.
    pub fn kill_server(&mut self) {
        self.shutting_down = true;
        let clients: Vec<ClientId> = self.clients.keys().copied().collect();
        for id in clients {
            if let Some(c) = self.clients.get_mut(&id) {
                c.channel.send(Frame::empty(MsgType::Shutdown));
                c.flags.insert(ClientFlags::EXIT);
            }
        }
        let sessions: Vec<SessionId> = self.sessions.keys().copied().collect();
        for session in sessions {
            self.kill_session(session);
        }
    }

    // ── Dead-pane collection (SIGCHLD path) ─────────────────────────

    /// Route a reaped pid to its pane.
    pub fn child_exited(&mut self, pid: u32, status: i32) {
        let Some((&pane_id, _)) = self.panes.iter().find(|(_, p)| p.pid() == pid) else {
            return;
        };
        if let Some(p) = self.panes.get_mut(&pane_id) {
            p.mark_dead(status);
        }
        self.fire_hook("pane-died", Some(pane_id.to_string()));
        let window = self.panes[&pane_id].window;
        let remain = self
            .sessions_of_window(window)
            .first()
            .is_some_and(|&s| self.session_option_flag(s, "remain-on-exit"));
        if remain {
            self.redraw_window(window);
        } else {
            self.kill_pane(pane_id);
        }
        self.maybe_exit();
    }

    /// When the last session dies, the server exits.
    pub fn maybe_exit(&mut self) {
        if self.sessions.is_empty() {
            self.shutting_down = true;
        }
    }

    // ── Clients ─────────────────────────────────────────────────────

    /// Accept a connection.
    pub fn add_client(&mut self, channel: seam_protocol::Channel) -> ClientId {
        let id = ClientId(self.client_ids.next());
        self.clients.insert(id, Client::new(id, channel));
        tracing::debug!(client = %id, "client connected");
        id
    }

    /// Attach an identified client to a session.
    pub fn attach_client(&mut self, client: ClientId, session: SessionId) {
        if let Some(c) = self.clients.get_mut(&client) {
            c.session = Some(session);
            c.channel.send(Frame::empty(MsgType::Ready));
            c.enter_screen();
        }
        self.resize_session_windows(session);
        self.redraw_session(session);
        tracing::info!(client = %client, session = %session, "client attached");
    }

    /// Detach a client, sending `kind` (Detach or DetachKill).
    pub fn detach_client(&mut self, client: ClientId, kind: MsgType) {
        if let Some(c) = self.clients.get_mut(&client) {
            let session = c.session.take();
            c.leave_screen();
            c.channel.send(Frame::empty(kind));
            c.flags.insert(ClientFlags::EXIT);
            self.queue.cancel_client(client);
            if let Some(session) = session {
                self.resize_session_windows(session);
            }
        }
        tracing::info!(client = %client, "client detached");
    }

    /// Remove a client whose socket closed.
    ///
    /// Its queue items cancel; parked wait-channel entries go stale and
    /// are skipped at wake (the queue re-validates item ids). The session
    /// itself stays: surviving detach is the point of the server.
    pub fn remove_client(&mut self, client: ClientId) {
        if let Some(mut c) = self.clients.remove(&client) {
            let session = c.session.take();
            c.leave_screen();
            self.queue.cancel_client(client);
            if let Some(session) = session {
                self.resize_session_windows(session);
            }
        }
        tracing::debug!(client = %client, "client removed");
    }

    /// Print command output to a client: overlay when attached, stdout
    /// frame when in command mode.
    pub fn cmd_print(&mut self, client: Option<ClientId>, text: &str) {
        let Some(client) = client else {
            tracing::info!(output = %text, "command output");
            return;
        };
        let ttl = self.display_time();
        if let Some(c) = self.clients.get_mut(&client) {
            if c.is_attached() {
                c.post_message(text.to_string(), ttl);
            } else {
                // Command-mode clients print via their stdout and exit 0
                // when the item completes.
                c.channel
                    .send(Frame::new(MsgType::Shell, encode_cstring(text)));
            }
        }
    }

    /// Report a command error to its submitting client.
    pub fn report_error(&mut self, client: Option<ClientId>, message: &str) {
        tracing::debug!(error = %message, "command error");
        let Some(client) = client else {
            return;
        };
        let ttl = self.display_time();
        if let Some(c) = self.clients.get_mut(&client) {
            if c.is_attached() {
                c.post_message(message.to_string(), ttl);
            } else {
                c.channel
                    .send(Frame::new(MsgType::Shell, encode_cstring(message)));
                c.channel
                    .send(Frame::new(MsgType::Exit, encode_u32(1)));
                c.flags.insert(ClientFlags::EXIT);
            }
        }
    }

    fn display_time(&self) -> std::time::Duration {
        std::time::Duration::from_millis(
            self.global_options.number(None, "display-time").max(100) as u64,
        )
    }

    // ── Window sizing and layout ────────────────────────────────────

    /// The usable size for a session's windows (status line excluded),
    /// honoring the `window-size` option over the attached clients.
    #[must_use]
    pub fn effective_session_size(&self, session: SessionId) -> (u16, u16) {
        let mode = self.session_option_string(session, "window-size");
        let clients: Vec<&Client> = self
            .clients
            .values()
            .filter(|c| c.session == Some(session))
            .collect();
        let size = match (mode.as_str(), clients.is_empty()) {
            (_, true) | ("manual", _) => (80, 24),
            ("largest", _) => clients
                .iter()
                .map(|c| (c.sx, c.sy))
                .max_by_key(|&(x, y)| u32::from(x) * u32::from(y))
                .unwrap_or((80, 24)),
            ("smallest", _) => clients
                .iter()
                .map(|c| (c.sx, c.sy))
                .min_by_key(|&(x, y)| u32::from(x) * u32::from(y))
                .unwrap_or((80, 24)),
            // "latest": the client with the most recent RESIZE wins.
            _ => clients
                .iter()
                .max_by_key(|c| c.resize_seq)
                .map(|c| (c.sx, c.sy))
                .unwrap_or((80, 24)),
        };
        (size.0.max(2), size.1.saturating_sub(STATUS_LINES).max(2))
    }

    /// Record a client's terminal size from a RESIZE message and
    /// recompute the geometry that depends on it.
    pub fn client_resized(&mut self, client: ClientId, cols: u16, rows: u16) {
        self.resize_counter += 1;
        let seq = self.resize_counter;
        let session = match self.clients.get_mut(&client) {
            Some(c) => {
                c.sx = cols.max(2);
                c.sy = rows.max(2);
                c.resize_seq = seq;
                let (sx, sy) = (c.sx, c.sy);
                c.presenter.resize(sx, sy);
                c.needs_redraw = true;
                c.session
            }
            None => return,
        };
        if let Some(session) = session {
            self.resize_session_windows(session);
            self.redraw_session(session);
        }
    }

    /// A window's effective size: the minimum over its sessions.
    #[must_use]
    pub fn effective_window_size(&self, window: WindowId) -> (u16, u16) {
        self.sessions_of_window(window)
            .into_iter()
            .map(|s| self.effective_session_size(s))
            .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1)))
            .unwrap_or((80, 24))
    }

    /// Recompute a session's window sizes after attach/resize.
    pub fn resize_session_windows(&mut self, session: SessionId) {
        let windows: Vec<WindowId> = self
            .sessions
            .get(&session)
            .map(|s| s.windows().values().copied().collect())
            .unwrap_or_default();
        for window in windows {
            self.resize_window_to_effective(window);
        }
    }

    /// Resize one window to its effective size and retile.
    pub fn resize_window_to_effective(&mut self, window: WindowId) {
        let (sx, sy) = self.effective_window_size(window);
        let Some(w) = self.windows.get_mut(&window) else {
            return;
        };
        if w.sx == sx && w.sy == sy {
            return;
        }
        w.sx = sx;
        w.sy = sy;
        self.apply_layout(window);
        self.redraw_window(window);
    }

    /// Derive pane geometry from the layout and resize each pane.
    pub fn apply_layout(&mut self, window: WindowId) {
        let Some(w) = self.windows.get(&window) else {
            return;
        };
        let geoms = w.layout.compute(Rect::new(0, 0, w.sx, w.sy));
        for (pane_id, rect) in geoms {
            if let Some(pane) = self.panes.get_mut(&pane_id) {
                pane.xoff = rect.x;
                pane.yoff = rect.y;
                pane.resize(rect.w.max(1), rect.h.max(1));
            }
        }
    }

    /// Apply a preset layout to a window.
    pub fn select_layout(&mut self, window: WindowId, preset: PresetLayout) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.unzoom();
            let panes: Vec<PaneId> = w.panes().to_vec();
            if !panes.is_empty() {
                w.layout = LayoutNode::preset(preset, &panes);
            }
        }
        self.apply_layout(window);
        self.redraw_window(window);
    }

    // ── Redraw bookkeeping ──────────────────────────────────────────

    /// Mark every client of a session for re-render.
    pub fn redraw_session(&mut self, session: SessionId) {
        for c in self.clients.values_mut() {
            if c.session == Some(session) {
                c.needs_redraw = true;
            }
        }
    }

    /// Mark clients whose current window is `window`.
    pub fn redraw_window(&mut self, window: WindowId) {
        let sessions: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.current_window() == Some(window))
            .map(|(&id, _)| id)
            .collect();
        for session in sessions {
            self.redraw_session(session);
        }
    }

    /// Clients viewing a window right now (their session's current).
    #[must_use]
    pub fn window_is_visible(&self, window: WindowId) -> bool {
        self.clients.values().any(|c| {
            c.session
                .and_then(|s| self.sessions.get(&s))
                .and_then(Session::current_window)
                == Some(window)
        })
    }

    // ── Mouse ───────────────────────────────────────────────────────

    /// The pane under a client-coordinate point, via the layout geometry
    /// of the client's current window.
    #[must_use]
    pub fn pane_under_mouse(&self, client: ClientId, x: u16, y: u16) -> Option<PaneId> {
        let c = self.clients.get(&client)?;
        let session = c.session?;
        let window = self.sessions.get(&session)?.current_window()?;
        let w = self.windows.get(&window)?;
        let geoms = w.layout.compute(Rect::new(0, 0, w.sx, w.sy));
        geoms
            .into_iter()
            .find(|(_, rect)| rect.contains(x, y))
            .map(|(pane, _)| pane)
    }

    // ── Hooks ───────────────────────────────────────────────────────

    /// Queue a hook's command list, if one is bound to `name`.
    pub fn fire_hook(&mut self, name: &str, target: Option<String>) {
        let Some(command) = self.hooks.get(name).cloned() else {
            return;
        };
        match crate::cmd::args::split_command_string(&command) {
            Ok(cmds) if !cmds.is_empty() => {
                tracing::debug!(hook = name, "firing hook");
                self.queue.append(
                    None,
                    cmds,
                    crate::cmd::queue::ItemFlags::NOHOOKS,
                    target,
                    None,
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(hook = name, error = %e, "bad hook command"),
        }
    }

    // ── Auto-rename ─────────────────────────────────────────────────

    /// Re-derive window names from their active pane titles/commands.
    pub fn auto_rename_windows(&mut self) {
        let updates: Vec<(WindowId, String)> = self
            .windows
            .iter()
            .filter(|(_, w)| !w.name_is_user_set)
            .filter_map(|(&id, w)| {
                let pane = self.panes.get(&w.active)?;
                let title = pane.screen().title();
                let name = if title.is_empty() {
                    pane.command.first().map(|c| basename(c))?
                } else {
                    title.to_string()
                };
                (name != w.name).then_some((id, name))
            })
            .collect();
        for (window, name) in updates {
            if let Some(session) = self.sessions_of_window(window).first().copied()
                && !self.session_option_flag(session, "automatic-rename")
            {
                continue;
            }
            if let Some(w) = self.windows.get_mut(&window) {
                w.name = name;
            }
            self.redraw_window(window);
        }
    }
}

fn basename(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}
