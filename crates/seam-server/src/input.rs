//! Input routing: client keystrokes to pane bytes or commands.
//!
//! Keys pass straight through to the focused pane's PTY unless the prefix
//! key (C-b) intervenes; the key after the prefix looks up a fixed
//! binding table whose entries are command strings queued like any other
//! command list. Mouse events route to the pane under the pointer.

use crate::cmd::args::split_command_string;
use crate::cmd::queue::ItemFlags;
use crate::ids::ClientId;
use crate::keys::{
    encode_key, encode_mouse, encode_paste, InputEvent, Key, KeyEvent, KeyMods, MouseEvent,
};
use crate::server::Server;
use seam_term::Modes;

/// The prefix key: C-b.
const PREFIX: KeyEvent = KeyEvent {
    key: Key::Char('b'),
    mods: KeyMods::CTRL,
};

/// The default key bindings behind the prefix.
///
/// A fixed table: `bind-key` is outside the core command set.
fn binding_for(event: KeyEvent) -> Option<&'static str> {
    if !event.mods.is_empty() {
        // C-b C-b sends the prefix itself through; handled by caller.
        return None;
    }
    Some(match event.key {
        Key::Char('c') => "new-window",
        Key::Char('d') => "detach-client",
        Key::Char('n') => "next-window",
        Key::Char('p') => "previous-window",
        Key::Char('l') => "last-window",
        Key::Char('x') => "kill-pane",
        Key::Char('&') => "kill-window",
        Key::Char('%') => "split-window -h",
        Key::Char('"') => "split-window -v",
        Key::Char('z') => "resize-pane -Z",
        Key::Char('o') => "select-pane -n",
        Key::Char('s') => "list-sessions",
        Key::Char('w') => "list-windows",
        Key::Char('0') => "select-window -t :0",
        Key::Char('1') => "select-window -t :1",
        Key::Char('2') => "select-window -t :2",
        Key::Char('3') => "select-window -t :3",
        Key::Char('4') => "select-window -t :4",
        Key::Char('5') => "select-window -t :5",
        Key::Char('6') => "select-window -t :6",
        Key::Char('7') => "select-window -t :7",
        Key::Char('8') => "select-window -t :8",
        Key::Char('9') => "select-window -t :9",
        Key::Left => "select-pane -L",
        Key::Right => "select-pane -R",
        Key::Up => "select-pane -U",
        Key::Down => "select-pane -D",
        _ => return None,
    })
}

/// Feed raw tty bytes from a client through decode and routing.
pub fn handle_tty_input(server: &mut Server, client: ClientId, bytes: &[u8]) {
    let events = match server.clients.get_mut(&client) {
        Some(c) => c.decoder.feed(bytes),
        None => return,
    };
    for event in events {
        match event {
            InputEvent::Key(key) => handle_key(server, client, key),
            InputEvent::Mouse(mouse) => handle_mouse(server, client, mouse),
            InputEvent::Paste(data) => {
                forward_to_active(server, client, |modes| encode_paste(&data, modes));
            }
            InputEvent::Focus(gained) => {
                forward_to_active(server, client, |modes| {
                    if modes.contains(Modes::FOCUS_REPORT) {
                        if gained { b"\x1b[I".to_vec() } else { b"\x1b[O".to_vec() }
                    } else {
                        Vec::new()
                    }
                });
            }
        }
    }
}

fn handle_key(server: &mut Server, client: ClientId, key: KeyEvent) {
    let prefix_pending = server
        .clients
        .get(&client)
        .is_some_and(|c| c.prefix_pending);

    if prefix_pending {
        if let Some(c) = server.clients.get_mut(&client) {
            c.prefix_pending = false;
        }
        if key == PREFIX {
            // Prefix twice: the prefix byte goes to the pane.
            forward_to_active(server, client, |modes| encode_key(PREFIX, modes));
            return;
        }
        if let Some(command) = binding_for(key) {
            queue_bound_command(server, client, command);
        }
        return;
    }

    if key == PREFIX {
        if let Some(c) = server.clients.get_mut(&client) {
            c.prefix_pending = true;
        }
        return;
    }

    forward_to_active(server, client, |modes| encode_key(key, modes));
}

/// `select-pane -n` does not exist; the binding table uses it as a
/// shorthand this helper implements directly.
fn queue_bound_command(server: &mut Server, client: ClientId, command: &str) {
    if command == "select-pane -n" {
        cycle_pane(server, client);
        return;
    }
    match split_command_string(command) {
        Ok(cmds) if !cmds.is_empty() => {
            server
                .queue
                .append(Some(client), cmds, ItemFlags::empty(), None, None);
        }
        _ => {}
    }
}

fn cycle_pane(server: &mut Server, client: ClientId) {
    let Some(window_id) = current_window(server, client) else {
        return;
    };
    if let Some(w) = server.windows.get_mut(&window_id) {
        let next = w.next_pane();
        w.set_active(next);
    }
    server.redraw_window(window_id);
}

fn handle_mouse(server: &mut Server, client: ClientId, mouse: MouseEvent) {
    let Some(pane_id) = server.pane_under_mouse(client, mouse.x, mouse.y) else {
        return;
    };
    // A press selects the pane under the pointer.
    if mouse.press && !mouse.motion {
        let window_id = server.panes.get(&pane_id).map(|p| p.window);
        if let Some(window_id) = window_id {
            if let Some(w) = server.windows.get_mut(&window_id) {
                w.set_active(pane_id);
            }
            server.redraw_window(window_id);
        }
    }
    // Forward to the pane in pane-local coordinates if it reports mice.
    if let Some(pane) = server.panes.get_mut(&pane_id) {
        let local = MouseEvent {
            x: mouse.x.saturating_sub(pane.xoff).min(pane.sx().saturating_sub(1)),
            y: mouse.y.saturating_sub(pane.yoff).min(pane.sy().saturating_sub(1)),
            ..mouse
        };
        let bytes = encode_mouse(local, pane.screen().modes());
        if !bytes.is_empty() {
            pane.write(&bytes);
        }
    }
}

fn current_window(server: &Server, client: ClientId) -> Option<crate::ids::WindowId> {
    server
        .clients
        .get(&client)?
        .session
        .and_then(|s| server.sessions.get(&s))
        .and_then(crate::session::Session::current_window)
}

/// Encode something against the focused pane's modes and write it there.
fn forward_to_active(
    server: &mut Server,
    client: ClientId,
    encode: impl FnOnce(Modes) -> Vec<u8>,
) {
    let Some(window_id) = current_window(server, client) else {
        return;
    };
    let Some(active) = server.windows.get(&window_id).map(|w| w.active) else {
        return;
    };
    if let Some(pane) = server.panes.get_mut(&active) {
        let bytes = encode(pane.screen().modes());
        if !bytes.is_empty() {
            pane.write(&bytes);
        }
    }
}
