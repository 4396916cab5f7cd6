//! Per-client rendering: compose the frame, diff, and write the tty.
//!
//! For each client whose session has dirty screens: blit the current
//! window's panes at their layout offsets, draw the borders between them,
//! write the status line, and hand the frame to the client's presenter
//! for diffing against its last-rendered screen. Pane screens are read as
//! stable snapshots and never mutated here.

use seam_render::buffer::{BORDER_HORIZONTAL, BORDER_VERTICAL};
use seam_render::FrameBuffer;
use seam_term::{AttrFlags, Attrs, Color, Modes};

use crate::client::ClientFlags;
use crate::ids::ClientId;
use crate::layout::Rect;
use crate::pane::PaneFlags;
use crate::server::Server;

/// Render every client that needs it.
pub fn render_clients(server: &mut Server) {
    let dirty = collect_dirty(server);
    for client in dirty {
        render_client(server, client);
    }
    // The dirty bits served their purpose for this pass.
    for pane in server.panes.values_mut() {
        pane.flags
            .remove(PaneFlags::CHANGED | PaneFlags::RESIZED | PaneFlags::REDRAW);
    }
}

/// Clients to render: flagged ones, plus any viewing a changed pane.
fn collect_dirty(server: &Server) -> Vec<ClientId> {
    server
        .clients
        .iter()
        .filter(|(_, c)| {
            c.is_attached()
                && !c.flags.contains(ClientFlags::SUSPENDED)
                && !c.flags.contains(ClientFlags::CONTROL)
                && !c.flags.contains(ClientFlags::EXIT)
        })
        .filter(|(_, c)| {
            if c.needs_redraw {
                return true;
            }
            // A changed pane in the client's current window.
            c.session
                .and_then(|s| server.sessions.get(&s))
                .and_then(|s| s.current_window())
                .and_then(|w| server.windows.get(&w))
                .is_some_and(|w| {
                    w.panes().iter().any(|p| {
                        server.panes.get(p).is_some_and(|p| {
                            p.flags
                                .intersects(PaneFlags::CHANGED | PaneFlags::RESIZED | PaneFlags::REDRAW)
                        })
                    })
                })
        })
        .map(|(&id, _)| id)
        .collect()
}

fn render_client(server: &mut Server, client: ClientId) {
    // Phase one: compose the frame from immutable state.
    let Some(c) = server.clients.get(&client) else {
        return;
    };
    let Some(session_id) = c.session else { return };
    let Some(session) = server.sessions.get(&session_id) else {
        return;
    };
    let Some(window_id) = session.current_window() else {
        return;
    };
    let Some(window) = server.windows.get(&window_id) else {
        return;
    };

    let mut frame = FrameBuffer::new(c.sx, c.sy.max(2));
    let geoms = window
        .layout
        .compute(Rect::new(0, 0, window.sx, window.sy));

    // Borders first so panes overwrite their interior.
    let border_attrs = Attrs::default();
    let active_attrs = Attrs {
        fg: Color::Named(2),
        ..Attrs::default()
    };
    for (pane_id, rect) in &geoms {
        let attrs = if *pane_id == window.active {
            active_attrs
        } else {
            border_attrs
        };
        if rect.x + rect.w < window.sx {
            frame.fill_v(rect.x + rect.w, rect.y, rect.h, BORDER_VERTICAL, attrs);
        }
        if rect.y + rect.h < window.sy {
            frame.fill_h(rect.x, rect.y + rect.h, rect.w, BORDER_HORIZONTAL, attrs);
        }
    }

    for (pane_id, rect) in &geoms {
        if let Some(pane) = server.panes.get(pane_id) {
            frame.blit_grid(pane.screen().grid(), rect.x, rect.y, rect.w, rect.h);
            if pane.is_dead() {
                let label = format!(
                    "Pane is dead (status {})",
                    pane.exit_status.unwrap_or(-1)
                );
                let attrs = Attrs {
                    flags: AttrFlags::REVERSE,
                    ..Attrs::default()
                };
                frame.put_str(rect.x, rect.y + rect.h.saturating_sub(1), &label, attrs, rect.w);
            }
        }
    }

    // Status line on the bottom row.
    let status_row = frame.height() - 1;
    let status_on = server.session_option_flag(session_id, "status");
    if status_on {
        draw_status(server, client, &mut frame, status_row);
    }

    // Cursor: the active pane's, offset into the frame.
    let (cursor, visible) = match server.panes.get(&window.active) {
        Some(pane) => {
            let (cx, cy) = pane.screen().cursor();
            let fx = pane.xoff + cx;
            let fy = pane.yoff + cy;
            let in_frame = fx < frame.width() && fy < status_row;
            (
                (fx.min(frame.width() - 1), fy.min(frame.height() - 1)),
                in_frame && pane.screen().modes().contains(Modes::CURSOR_VISIBLE),
            )
        }
        None => ((0, 0), false),
    };

    // Phase two: present through the client's own state.
    let Some(c) = server.clients.get_mut(&client) else {
        return;
    };
    let mut out = Vec::new();
    let crate::client::Client {
        presenter, caps, ..
    } = &mut *c;
    presenter.present(&frame, cursor, visible, caps, &mut out);
    c.tty_write(&out);
    c.needs_redraw = false;
}

/// The status line: session name, window list, overlay message.
fn draw_status(server: &Server, client: ClientId, frame: &mut FrameBuffer, row: u16) {
    let Some(c) = server.clients.get(&client) else {
        return;
    };
    let status_attrs = Attrs {
        fg: Color::Named(0),
        bg: Color::Named(2),
        ..Attrs::default()
    };
    let width = frame.width();
    frame.fill_h(0, row, width, ' ', status_attrs);

    // A transient message takes the whole line.
    if let Some(overlay) = &c.overlay {
        let attrs = Attrs {
            flags: AttrFlags::REVERSE,
            ..Attrs::default()
        };
        frame.fill_h(0, row, width, ' ', attrs);
        frame.put_str(0, row, &overlay.text, attrs, width);
        return;
    }

    let Some(session) = c.session.and_then(|s| server.sessions.get(&s)) else {
        return;
    };
    let mut text = format!("[{}] ", session.name);
    for (index, window_id) in session.windows() {
        let Some(w) = server.windows.get(window_id) else {
            continue;
        };
        let marker = if *index == session.current_index() {
            "*"
        } else {
            " "
        };
        text.push_str(&format!("{}:{}{} ", index, w.name, marker));
    }
    let used = frame.put_str(0, row, &text, status_attrs, width);

    // Right side: the active pane's title.
    if let Some(title) = session
        .current_window()
        .and_then(|w| server.windows.get(&w))
        .and_then(|w| server.panes.get(&w.active))
        .map(|p| p.screen().title().to_string())
        && !title.is_empty()
    {
        let title = format!("\"{title}\"");
        let len = title.chars().count() as u16;
        if width > used + len + 1 {
            frame.put_str(width - len, row, &title, status_attrs, len);
        }
    }
}
