//! Command executors.
//!
//! Each function backs one entry in the command table. They resolve the
//! item's target, mutate the server, and return a [`CmdResult`]; usage
//! errors surface as `Error` messages for the submitting client.

use std::path::PathBuf;

use seam_protocol::MsgType;

use crate::client::ClientFlags;
use crate::cmd::{CmdCtx, CmdResult};
use crate::ids::ClientId;
use crate::keys::{encode_key, encode_paste, parse_key_name};
use crate::layout::{PresetLayout, Rect, SplitDir};
use crate::server::Server;

fn err(message: impl Into<String>) -> CmdResult {
    CmdResult::Error(message.into())
}

// ── Sessions and clients ────────────────────────────────────────────

pub fn new_session(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let name = ctx.args.value('s').map(str::to_string);
    if let Some(name) = &name
        && server.session_by_name(name).is_some()
    {
        return err(format!("duplicate session: {name}"));
    }
    let cwd = ctx
        .args
        .value('c')
        .map(PathBuf::from)
        .or_else(|| ctx.client.and_then(|c| server.clients.get(&c)).map(|c| c.cwd.clone()));
    let detached = ctx.args.has('d') || ctx.client.is_none();

    let (mut sx, mut sy) = ctx
        .client
        .and_then(|c| server.clients.get(&c))
        .map_or((80, 24), |c| (c.sx, c.sy));
    if let Some(x) = ctx.args.value('x').and_then(|v| v.parse().ok()) {
        sx = x;
    }
    if let Some(y) = ctx.args.value('y').and_then(|v| v.parse().ok()) {
        sy = y;
    }

    let argv = ctx.args.positionals.clone();
    let session = match server.new_session(name, cwd, argv, sx, sy, ctx.client) {
        Ok(session) => session,
        Err(e) => return err(e),
    };
    if let Some(window_name) = ctx.args.value('n') {
        if let Some(window) = server.sessions[&session].current_window()
            && let Some(w) = server.windows.get_mut(&window)
        {
            w.name = window_name.to_string();
            w.name_is_user_set = true;
        }
    }
    if !detached && let Some(client) = ctx.client {
        server.attach_client(client, session);
    }
    server.fire_hook("session-created", Some(format!("={}", server.sessions[&session].name)));
    CmdResult::Normal
}

pub fn attach_session(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let Some(client) = ctx.client else {
        return err("attach-session needs a client");
    };
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    if ctx.args.has('d') {
        for other in server.clients_of_session(target.session) {
            if other != client {
                server.detach_client(other, MsgType::Detach);
            }
        }
    }
    if ctx.args.has('r')
        && let Some(c) = server.clients.get_mut(&client)
    {
        c.flags.insert(ClientFlags::READONLY);
    }
    server.attach_client(client, target.session);
    CmdResult::Normal
}

pub fn detach_client(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    if let Some(target) = ctx.args.value('s') {
        let session = match crate::cmd::target::resolve(server, ctx.client, Some(target), None) {
            Ok(t) => t.session,
            Err(e) => return err(e),
        };
        for client in server.clients_of_session(session) {
            server.detach_client(client, MsgType::Detach);
        }
        return CmdResult::Normal;
    }
    let Some(client) = ctx.client else {
        return err("no client to detach");
    };
    server.detach_client(client, MsgType::Detach);
    CmdResult::Normal
}

pub fn has_session(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    match ctx.find(server) {
        Ok(_) => CmdResult::Normal,
        Err(e) => err(e),
    }
}

pub fn kill_server(server: &mut Server, _ctx: &mut CmdCtx) -> CmdResult {
    server.kill_server();
    CmdResult::Stop
}

pub fn kill_session(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    match ctx.find(server) {
        Ok(target) => {
            server.kill_session(target.session);
            server.maybe_exit();
            CmdResult::Normal
        }
        Err(e) => err(e),
    }
}

pub fn rename_session(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    if let Err(e) = ctx.args.check_count(1, 1, "rename-session new-name") {
        return err(e);
    }
    let new_name = ctx.args.positionals[0].clone();
    if new_name.is_empty() || new_name.contains([':', '.']) {
        return err(format!("bad session name: {new_name}"));
    }
    if server.session_by_name(&new_name).is_some() {
        return err(format!("duplicate session: {new_name}"));
    }
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    if let Some(s) = server.sessions.get_mut(&target.session) {
        s.name = new_name;
    }
    server.redraw_session(target.session);
    server.fire_hook("session-renamed", None);
    CmdResult::Normal
}

pub fn list_sessions(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let mut lines: Vec<String> = server
        .sessions
        .values()
        .map(|s| {
            let attached = server
                .clients
                .values()
                .filter(|c| c.session == Some(s.id))
                .count();
            format!(
                "{}: {} windows{}",
                s.name,
                s.windows().len(),
                if attached > 0 { " (attached)" } else { "" }
            )
        })
        .collect();
    lines.sort();
    server.cmd_print(ctx.client, &lines.join("\n"));
    CmdResult::Normal
}

pub fn list_clients(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let mut lines: Vec<String> = server
        .clients
        .values()
        .filter(|c| c.is_attached())
        .map(|c| {
            let session = c
                .session
                .and_then(|s| server.sessions.get(&s))
                .map_or(String::new(), |s| s.name.clone());
            format!("{}: {} [{}x{}] {}", c.ttyname, session, c.sx, c.sy, c.term)
        })
        .collect();
    lines.sort();
    server.cmd_print(ctx.client, &lines.join("\n"));
    CmdResult::Normal
}

pub fn list_windows(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let session = &server.sessions[&target.session];
    let lines: Vec<String> = session
        .windows()
        .iter()
        .map(|(index, window)| {
            let w = &server.windows[window];
            let marker = if *index == session.current_index() {
                "*"
            } else {
                ""
            };
            format!(
                "{}: {}{} ({} panes) [{}x{}]",
                index,
                w.name,
                marker,
                w.pane_count(),
                w.sx,
                w.sy
            )
        })
        .collect();
    server.cmd_print(ctx.client, &lines.join("\n"));
    CmdResult::Normal
}

// ── Windows ─────────────────────────────────────────────────────────

pub fn new_window(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let name = ctx.args.value('n').map(str::to_string);
    let argv = ctx.args.positionals.clone();
    let select = !ctx.args.has('d');
    match server.new_window(target.session, argv, name, select, ctx.client) {
        Ok(_) => CmdResult::Normal,
        Err(e) => err(e),
    }
}

pub fn kill_window(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    match ctx.find(server) {
        Ok(target) => {
            server.kill_window(target.window);
            server.maybe_exit();
            CmdResult::Normal
        }
        Err(e) => err(e),
    }
}

pub fn rename_window(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    if let Err(e) = ctx.args.check_count(1, 1, "rename-window new-name") {
        return err(e);
    }
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    if let Some(w) = server.windows.get_mut(&target.window) {
        w.name = ctx.args.positionals[0].clone();
        w.name_is_user_set = true;
    }
    server.redraw_session(target.session);
    CmdResult::Normal
}

pub fn select_window(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let Some(session) = server.sessions.get_mut(&target.session) else {
        return err("no such session");
    };
    let selected = if ctx.args.has('l') {
        session.select_last()
    } else if ctx.args.has('n') {
        session.next_index().is_some_and(|i| session.select(i))
    } else if ctx.args.has('p') {
        session.prev_index().is_some_and(|i| session.select(i))
    } else {
        session.select(target.window_index)
    };
    if !selected {
        return err("no such window");
    }
    server.resize_session_windows(target.session);
    server.redraw_session(target.session);
    CmdResult::Normal
}

pub fn next_window(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    cycle_window(server, ctx, true)
}

pub fn previous_window(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    cycle_window(server, ctx, false)
}

fn cycle_window(server: &mut Server, ctx: &mut CmdCtx, forward: bool) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let Some(session) = server.sessions.get_mut(&target.session) else {
        return err("no such session");
    };
    let next = if forward {
        session.next_index()
    } else {
        session.prev_index()
    };
    match next {
        Some(index) => {
            session.select(index);
            server.resize_session_windows(target.session);
            server.redraw_session(target.session);
            CmdResult::Normal
        }
        None => err("no next window"),
    }
}

pub fn last_window(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let Some(session) = server.sessions.get_mut(&target.session) else {
        return err("no such session");
    };
    if !session.select_last() {
        return err("no last window");
    }
    server.resize_session_windows(target.session);
    server.redraw_session(target.session);
    CmdResult::Normal
}

pub fn select_layout(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    if let Err(e) = ctx.args.check_count(1, 1, "select-layout layout-name") {
        return err(e);
    }
    let Some(preset) = PresetLayout::from_name(&ctx.args.positionals[0]) else {
        return err(format!("unknown layout: {}", ctx.args.positionals[0]));
    };
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    server.select_layout(target.window, preset);
    CmdResult::Normal
}

// ── Panes ───────────────────────────────────────────────────────────

pub fn split_window(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    // -h splits side by side, -v (the default) stacks.
    let dir = if ctx.args.has('h') {
        SplitDir::Horizontal
    } else {
        SplitDir::Vertical
    };
    let cwd = ctx.args.value('c').map(PathBuf::from);
    let argv = ctx.args.positionals.clone();
    // Split around the targeted pane, not whatever is active.
    if let Some(w) = server.windows.get_mut(&target.window) {
        w.set_active(target.pane);
    }
    match server.split_pane(target.window, dir, argv, cwd, ctx.client) {
        Ok(_) => {
            // -d keeps the original pane focused.
            if ctx.args.has('d')
                && let Some(w) = server.windows.get_mut(&target.window)
            {
                w.set_active(target.pane);
            }
            CmdResult::Normal
        }
        Err(e) => err(e),
    }
}

pub fn kill_pane(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    if ctx.args.has('a') {
        // Kill every *other* pane in the window.
        let others: Vec<_> = server.windows[&target.window]
            .panes()
            .iter()
            .copied()
            .filter(|&p| p != target.pane)
            .collect();
        for pane in others {
            server.kill_pane(pane);
        }
    } else {
        server.kill_pane(target.pane);
    }
    server.maybe_exit();
    CmdResult::Normal
}

pub fn select_pane(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let Some(w) = server.windows.get(&target.window) else {
        return err("no such window");
    };

    let directional = ['L', 'R', 'U', 'D']
        .into_iter()
        .find(|&f| ctx.args.has(f));
    let chosen = if let Some(dir) = directional {
        let geoms = w.layout.compute(Rect::new(0, 0, w.sx, w.sy));
        let current = geoms
            .iter()
            .find(|(p, _)| *p == w.active)
            .map(|(_, r)| *r)
            .unwrap_or(Rect::new(0, 0, 1, 1));
        pick_adjacent(&geoms, current, dir)
    } else if ctx.args.has('l') {
        Some(w.prev_pane())
    } else {
        Some(target.pane)
    };

    match chosen {
        Some(pane) => {
            if let Some(w) = server.windows.get_mut(&target.window) {
                w.set_active(pane);
            }
            server.redraw_window(target.window);
            CmdResult::Normal
        }
        None => err("pane not found"),
    }
}

/// Pick the nearest pane in a direction from `current`.
fn pick_adjacent(
    geoms: &[(crate::ids::PaneId, Rect)],
    current: Rect,
    dir: char,
) -> Option<crate::ids::PaneId> {
    let candidates = geoms.iter().filter(|(_, r)| *r != current);
    match dir {
        'L' => candidates
            .filter(|(_, r)| r.x + r.w <= current.x)
            .max_by_key(|(_, r)| r.x + r.w),
        'R' => candidates
            .filter(|(_, r)| r.x >= current.x + current.w)
            .min_by_key(|(_, r)| r.x),
        'U' => candidates
            .filter(|(_, r)| r.y + r.h <= current.y)
            .max_by_key(|(_, r)| r.y + r.h),
        _ => candidates
            .filter(|(_, r)| r.y >= current.y + current.h)
            .min_by_key(|(_, r)| r.y),
    }
    .map(|(p, _)| *p)
}

pub fn resize_pane(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    if ctx.args.has('Z') {
        if let Some(w) = server.windows.get_mut(&target.window) {
            w.toggle_zoom();
        }
        server.apply_layout(target.window);
        server.redraw_window(target.window);
        return CmdResult::Normal;
    }
    let amount: i32 = ctx
        .args
        .positionals
        .first()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let (dir, delta) = if ctx.args.has('L') {
        (SplitDir::Horizontal, -amount)
    } else if ctx.args.has('R') {
        (SplitDir::Horizontal, amount)
    } else if ctx.args.has('U') {
        (SplitDir::Vertical, -amount)
    } else if ctx.args.has('D') {
        (SplitDir::Vertical, amount)
    } else {
        return err("resize-pane needs a direction");
    };
    if let Some(w) = server.windows.get_mut(&target.window) {
        w.unzoom();
        if !w.layout.resize_pane(target.pane, dir, delta) {
            return err("pane cannot resize that way");
        }
    }
    server.apply_layout(target.window);
    server.redraw_window(target.window);
    CmdResult::Normal
}

pub fn send_keys(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let literal = ctx.args.has('l');
    let Some(pane) = server.panes.get_mut(&target.pane) else {
        return err("no such pane");
    };
    let modes = pane.screen().modes();
    for word in &ctx.args.positionals {
        if literal {
            pane.write(word.as_bytes());
            continue;
        }
        match parse_key_name(word) {
            Some(event) => pane.write(&encode_key(event, modes)),
            None => pane.write(word.as_bytes()),
        }
    }
    CmdResult::Normal
}

// ── Buffers ─────────────────────────────────────────────────────────

pub fn set_buffer(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    if let Err(e) = ctx.args.check_count(1, 1, "set-buffer data") {
        return err(e);
    }
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let limit = server.session_option_number(target.session, "buffer-limit").max(1) as usize;
    let data = ctx.args.positionals[0].clone().into_bytes();
    let Some(session) = server.sessions.get_mut(&target.session) else {
        return err("no such session");
    };
    if ctx.args.has('a')
        && let Some(newest) = session.paste_pop()
    {
        let mut combined = newest.data;
        combined.extend_from_slice(&data);
        session.paste_push(combined, limit);
    } else {
        session.paste_push(data, limit);
    }
    CmdResult::Normal
}

pub fn show_buffer(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let index: usize = ctx
        .args
        .value('b')
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let Some(buffer) = server.sessions[&target.session].paste_get(index) else {
        return err(format!("no buffer {index}"));
    };
    let text = String::from_utf8_lossy(&buffer.data).into_owned();
    server.cmd_print(ctx.client, &text);
    CmdResult::Normal
}

pub fn list_buffers(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let lines: Vec<String> = server.sessions[&target.session]
        .paste_iter()
        .enumerate()
        .map(|(i, b)| format!("{}: {} bytes", i, b.data.len()))
        .collect();
    server.cmd_print(ctx.client, &lines.join("\n"));
    CmdResult::Normal
}

pub fn paste_buffer(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let index: usize = ctx
        .args
        .value('b')
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let delete = ctx.args.has('d');

    let data = {
        let Some(session) = server.sessions.get_mut(&target.session) else {
            return err("no such session");
        };
        if delete && index == 0 {
            match session.paste_pop() {
                Some(b) => b.data,
                None => return err("no buffer"),
            }
        } else {
            match session.paste_get(index) {
                Some(b) => b.data.clone(),
                None => return err(format!("no buffer {index}")),
            }
        }
    };
    let Some(pane) = server.panes.get_mut(&target.pane) else {
        return err("no such pane");
    };
    let bytes = encode_paste(&data, pane.screen().modes());
    pane.write(&bytes);
    CmdResult::Normal
}

pub fn load_buffer(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    if let Err(e) = ctx.args.check_count(1, 1, "load-buffer path") {
        return err(e);
    }
    let Some(client) = ctx.client else {
        return err("load-buffer needs a client");
    };
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let path = ctx.args.positionals[0].clone();
    let Some(c) = server.clients.get_mut(&client) else {
        return err("no such client");
    };
    let stream = c.alloc_stream();
    c.file_streams.insert(
        stream,
        crate::client::FileStream::Read {
            item: ctx.item_id,
            session: target.session,
            data: Vec::new(),
        },
    );
    let mut payload = Vec::new();
    payload.extend_from_slice(&stream.to_le_bytes());
    payload.extend_from_slice(&(-1i32).to_le_bytes());
    payload.extend_from_slice(path.as_bytes());
    payload.push(0);
    c.channel.send(seam_protocol::Frame::new(MsgType::ReadOpen, payload));
    CmdResult::Wait
}

pub fn save_buffer(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    if let Err(e) = ctx.args.check_count(1, 1, "save-buffer [-a] path") {
        return err(e);
    }
    let Some(client) = ctx.client else {
        return err("save-buffer needs a client");
    };
    let target = match ctx.find(server) {
        Ok(t) => t,
        Err(e) => return err(e),
    };
    let index: usize = ctx
        .args
        .value('b')
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let Some(buffer) = server.sessions[&target.session].paste_get(index) else {
        return err(format!("no buffer {index}"));
    };
    let data = buffer.data.clone();
    let append = ctx.args.has('a');
    let path = ctx.args.positionals[0].clone();
    let Some(c) = server.clients.get_mut(&client) else {
        return err("no such client");
    };
    let stream = c.alloc_stream();
    c.file_streams.insert(
        stream,
        crate::client::FileStream::Write {
            item: ctx.item_id,
            data,
        },
    );
    let mut payload = Vec::new();
    payload.extend_from_slice(&stream.to_le_bytes());
    payload.extend_from_slice(&(-1i32).to_le_bytes());
    payload.extend_from_slice(&i32::from(append).to_le_bytes());
    payload.extend_from_slice(path.as_bytes());
    payload.push(0);
    c.channel
        .send(seam_protocol::Frame::new(MsgType::WriteOpen, payload));
    CmdResult::Wait
}

// ── Options and hooks ───────────────────────────────────────────────

pub fn set_option(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    if let Err(e) = ctx.args.check_count(1, 2, "set-option option [value]") {
        return err(e);
    }
    let name = ctx.args.positionals[0].clone();
    let unset = ctx.args.has('u');
    if !unset && ctx.args.positionals.len() != 2 {
        return err("set-option needs a value");
    }

    if ctx.args.has('g') {
        if unset {
            server.global_options.unset(&name);
        } else if let Err(e) = server.global_options.set(&name, &ctx.args.positionals[1]) {
            return err(e);
        }
    } else {
        let target = match ctx.find(server) {
            Ok(t) => t,
            Err(e) => return err(e),
        };
        let Some(session) = server.sessions.get_mut(&target.session) else {
            return err("no such session");
        };
        if unset {
            session.options.unset(&name);
        } else if let Err(e) = session.options.set(&name, &ctx.args.positionals[1]) {
            return err(e);
        }
        // Options that affect geometry bite immediately.
        if name == "window-size" {
            server.resize_session_windows(target.session);
        }
        if name == "history-limit" {
            let limit = server.session_option_number(target.session, "history-limit").max(0);
            let windows: Vec<_> = server.sessions[&target.session]
                .windows()
                .values()
                .copied()
                .collect();
            for window in windows {
                let panes: Vec<_> = server.windows[&window].panes().to_vec();
                for pane in panes {
                    if let Some(p) = server.panes.get_mut(&pane) {
                        p.set_history_limit(limit as usize);
                    }
                }
            }
        }
    }
    CmdResult::Normal
}

pub fn show_options(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    let lines: Vec<String> = if ctx.args.has('g') {
        server
            .global_options
            .iter()
            .map(|(k, v)| format!("{k} {v:?}"))
            .collect()
    } else {
        let target = match ctx.find(server) {
            Ok(t) => t,
            Err(e) => return err(e),
        };
        server.sessions[&target.session]
            .options
            .iter()
            .map(|(k, v)| format!("{k} {v:?}"))
            .collect()
    };
    server.cmd_print(ctx.client, &lines.join("\n"));
    CmdResult::Normal
}

pub fn set_hook(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    if let Err(e) = ctx.args.check_count(1, 2, "set-hook hook-name [command]") {
        return err(e);
    }
    let name = ctx.args.positionals[0].clone();
    if ctx.args.has('u') {
        server.hooks.remove(&name);
        return CmdResult::Normal;
    }
    let Some(command) = ctx.args.positionals.get(1) else {
        return err("set-hook needs a command");
    };
    if let Err(e) = crate::cmd::args::split_command_string(command) {
        return err(format!("bad hook command: {e}"));
    }
    server.hooks.insert(name, command.clone());
    CmdResult::Normal
}

// ── wait-for ────────────────────────────────────────────────────────

pub fn wait_for(server: &mut Server, ctx: &mut CmdCtx) -> CmdResult {
    if let Err(e) = ctx.args.check_count(1, 1, "wait-for [-LSU] channel") {
        return err(e);
    }
    let name = ctx.args.positionals[0].clone();
    if ctx.args.has('S') {
        return wait_for_signal(server, &name);
    }
    if ctx.args.has('L') {
        return wait_for_lock(server, ctx, &name);
    }
    if ctx.args.has('U') {
        return wait_for_unlock(server, &name);
    }
    wait_for_wait(server, ctx, &name)
}

fn wait_for_signal(server: &mut Server, name: &str) -> CmdResult {
    let Some(chan) = server.wait_channels.get_mut(name) else {
        return err(format!("no waiting clients on {name}"));
    };
    if chan.waiters.is_empty() {
        return err(format!("no waiting clients on {name}"));
    }
    let woken: Vec<u64> = chan.waiters.drain(..).collect();
    let gc = chan.is_empty();
    for item in woken {
        server.queue.push_back(item);
    }
    if gc {
        server.wait_channels.remove(name);
    }
    CmdResult::Normal
}

fn wait_for_wait(server: &mut Server, ctx: &mut CmdCtx, name: &str) -> CmdResult {
    // Only detached command clients may block; an attached client would
    // deadlock its own display.
    if wait_client_is_attached(server, ctx.client) {
        return err("not able to wait");
    }
    let chan = server.wait_channels.entry(name.to_string()).or_default();
    chan.waiters.push_back(ctx.item_id);
    CmdResult::Wait
}

fn wait_for_lock(server: &mut Server, ctx: &mut CmdCtx, name: &str) -> CmdResult {
    if wait_client_is_attached(server, ctx.client) {
        return err("not able to lock");
    }
    let chan = server.wait_channels.entry(name.to_string()).or_default();
    if chan.locked {
        chan.lockers.push_back(ctx.item_id);
        return CmdResult::Wait;
    }
    chan.locked = true;
    CmdResult::Normal
}

fn wait_for_unlock(server: &mut Server, name: &str) -> CmdResult {
    let Some(chan) = server.wait_channels.get_mut(name) else {
        return err(format!("channel {name} not locked"));
    };
    if !chan.locked {
        return err(format!("channel {name} not locked"));
    }
    if let Some(next) = chan.lockers.pop_front() {
        // Hand the lock to the first locker in line.
        server.queue.push_back(next);
    } else {
        chan.locked = false;
        if chan.is_empty() {
            server.wait_channels.remove(name);
        }
    }
    CmdResult::Normal
}

fn wait_client_is_attached(server: &Server, client: Option<ClientId>) -> bool {
    client
        .and_then(|c| server.clients.get(&c))
        .is_some_and(crate::client::Client::is_attached)
}
