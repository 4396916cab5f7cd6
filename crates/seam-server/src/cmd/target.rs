//! Target resolution: `-t` strings to (session, window, pane).
//!
//! Grammar (abbreviated): `=name` exact session; `name` prefix-matched
//! session; `:N` window index in the current session; `:N.M` pane `M` of
//! window `N`; negative indices count from the end; `$N` / `@N` / `%N`
//! address by id. A mouse-originated item with no `-t` targets the pane
//! under the mouse.

use crate::ids::{ClientId, PaneId, SessionId, WindowId};
use crate::keys::MouseEvent;
use crate::server::Server;

/// A fully resolved command target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindState {
    pub session: SessionId,
    pub window_index: u32,
    pub window: WindowId,
    pub pane: PaneId,
}

/// Resolve a target string (or the implied target) for a command.
pub fn resolve(
    server: &Server,
    client: Option<ClientId>,
    target: Option<&str>,
    mouse: Option<&MouseEvent>,
) -> Result<FindState, String> {
    if target.is_none()
        && let Some(mouse) = mouse
        && let Some(client) = client
        && let Some(pane) = server.pane_under_mouse(client, mouse.x, mouse.y)
    {
        return from_pane(server, pane);
    }

    let Some(target) = target else {
        return current_target(server, client);
    };

    // Id forms go straight to the object.
    if let Some(rest) = target.strip_prefix('%') {
        let id = rest.parse::<u32>().map_err(|_| bad(target))?;
        return from_pane(server, PaneId(id));
    }
    if let Some(rest) = target.strip_prefix('@') {
        let id = rest.parse::<u32>().map_err(|_| bad(target))?;
        return from_window(server, WindowId(id), None);
    }
    if let Some(rest) = target.strip_prefix('$') {
        let id = rest.parse::<u32>().map_err(|_| bad(target))?;
        if !server.sessions.contains_key(&SessionId(id)) {
            return Err(format!("session not found: {target}"));
        }
        return session_default(server, SessionId(id));
    }

    let (session_part, rest) = match target.split_once(':') {
        Some((s, r)) => (s, Some(r)),
        None => (target, None),
    };

    let session = if session_part.is_empty() {
        current_target(server, client)?.session
    } else {
        lookup_session(server, session_part)?
    };

    let Some(rest) = rest else {
        return session_default(server, session);
    };

    let (window_part, pane_part) = match rest.split_once('.') {
        Some((w, p)) => (w, Some(p)),
        None => (rest, None),
    };

    let window_index = if window_part.is_empty() {
        server.sessions[&session].current_index()
    } else {
        parse_window_index(server, session, window_part)?
    };
    let window = server.sessions[&session]
        .window_at(window_index)
        .ok_or_else(|| format!("window not found: {target}"))?;

    let pane = match pane_part {
        None => server.windows[&window].active,
        Some(p) => parse_pane(server, window, p)?,
    };

    Ok(FindState {
        session,
        window_index,
        window,
        pane,
    })
}

fn bad(target: &str) -> String {
    format!("bad target: {target}")
}

/// The submitting client's current session/window/pane.
fn current_target(server: &Server, client: Option<ClientId>) -> Result<FindState, String> {
    let session = client
        .and_then(|c| server.clients.get(&c))
        .and_then(|c| c.session)
        .or_else(|| server.sessions.keys().min().copied())
        .ok_or_else(|| "no current session".to_string())?;
    session_default(server, session)
}

/// A session's current window and its active pane.
fn session_default(server: &Server, session: SessionId) -> Result<FindState, String> {
    let s = server
        .sessions
        .get(&session)
        .ok_or_else(|| "no current session".to_string())?;
    let window_index = s.current_index();
    let window = s
        .current_window()
        .ok_or_else(|| "session has no windows".to_string())?;
    let pane = server.windows[&window].active;
    Ok(FindState {
        session,
        window_index,
        window,
        pane,
    })
}

/// Resolve a pane id back up the graph.
fn from_pane(server: &Server, pane: PaneId) -> Result<FindState, String> {
    let p = server
        .panes
        .get(&pane)
        .ok_or_else(|| format!("pane not found: {pane}"))?;
    from_window(server, p.window, Some(pane))
}

fn from_window(
    server: &Server,
    window: WindowId,
    pane: Option<PaneId>,
) -> Result<FindState, String> {
    let w = server
        .windows
        .get(&window)
        .ok_or_else(|| format!("window not found: {window}"))?;
    // Any session linking the window will do; prefer the lowest-named.
    let (session, window_index) = server
        .sessions
        .iter()
        .filter_map(|(&sid, s)| s.index_of(window).map(|i| (sid, i)))
        .min_by_key(|&(sid, _)| server.sessions[&sid].name.clone())
        .ok_or_else(|| format!("window not linked: {window}"))?;
    Ok(FindState {
        session,
        window_index,
        window,
        pane: pane.unwrap_or(w.active),
    })
}

/// Exact (`=name`), then exact, then unambiguous-prefix session lookup.
fn lookup_session(server: &Server, name: &str) -> Result<SessionId, String> {
    if let Some(exact) = name.strip_prefix('=') {
        return server
            .session_by_name(exact)
            .ok_or_else(|| format!("session not found: {exact}"));
    }
    if let Some(id) = server.session_by_name(name) {
        return Ok(id);
    }
    let matches: Vec<SessionId> = server
        .sessions
        .iter()
        .filter(|(_, s)| s.name.starts_with(name))
        .map(|(&id, _)| id)
        .collect();
    match matches.len() {
        0 => Err(format!("session not found: {name}")),
        1 => Ok(matches[0]),
        _ => Err(format!("ambiguous session: {name}")),
    }
}

/// Window index, with negative values counting from the end.
fn parse_window_index(server: &Server, session: SessionId, part: &str) -> Result<u32, String> {
    let s = &server.sessions[&session];
    if let Some(rest) = part.strip_prefix('-')
        && let Ok(n) = rest.parse::<usize>()
        && n >= 1
    {
        let indices: Vec<u32> = s.windows().keys().copied().collect();
        return indices
            .len()
            .checked_sub(n)
            .map(|i| indices[i])
            .ok_or_else(|| bad(part));
    }
    part.parse::<u32>().map_err(|_| bad(part))
}

/// Pane index within a window, `%id`, or negative from the end.
fn parse_pane(server: &Server, window: WindowId, part: &str) -> Result<PaneId, String> {
    let w = &server.windows[&window];
    if let Some(rest) = part.strip_prefix('%') {
        let id = rest.parse::<u32>().map_err(|_| bad(part))?;
        let pane = PaneId(id);
        if w.contains(pane) {
            return Ok(pane);
        }
        return Err(format!("pane not in window: {part}"));
    }
    let panes = w.panes();
    if let Some(rest) = part.strip_prefix('-')
        && let Ok(n) = rest.parse::<usize>()
        && n >= 1
    {
        return panes
            .len()
            .checked_sub(n)
            .map(|i| panes[i])
            .ok_or_else(|| bad(part));
    }
    let index = part.parse::<usize>().map_err(|_| bad(part))?;
    panes.get(index).copied().ok_or_else(|| bad(part))
}
