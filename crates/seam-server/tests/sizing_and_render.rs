//! Window sizing across multiple clients, and the render pass.

use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use seam_protocol::Channel;
use seam_server::client::ClientFlags;
use seam_server::cmd::queue::ItemFlags;
use seam_server::cmd::{self};
use seam_server::ids::{ClientId, SessionId};
use seam_server::Server;

fn server() -> Server {
    Server::new(PathBuf::from("/tmp/seam-test-socket"))
}

fn run(server: &mut Server, argv: &[&str]) {
    let cmds = vec![argv.iter().map(|s| s.to_string()).collect()];
    server.queue.append(None, cmds, ItemFlags::empty(), None, None);
    cmd::drain(server);
}

fn new_session(server: &mut Server, name: &str) -> SessionId {
    run(
        server,
        &["new-session", "-s", name, "-x", "80", "-y", "24", "/bin/cat"],
    );
    server.session_by_name(name).unwrap()
}

/// An identified client with a terminal size but no real tty. The far
/// end of the socketpair is returned so the connection stays open.
/// Sizes go through `client_resized`, so creation order is resize order.
fn fake_client(
    server: &mut Server,
    session: SessionId,
    sx: u16,
    sy: u16,
) -> (ClientId, UnixStream) {
    let (near, far) = UnixStream::pair().unwrap();
    let channel = Channel::new(near).unwrap();
    let id = server.add_client(channel);
    let c = server.clients.get_mut(&id).unwrap();
    c.flags.insert(ClientFlags::IDENTIFIED);
    c.session = Some(session);
    server.client_resized(id, sx, sy);
    (id, far)
}

#[test]
fn smallest_client_bounds_the_window() {
    let mut server = server();
    let session = new_session(&mut server, "w");
    run(&mut server, &["set-option", "-t", "w", "window-size", "smallest"]);

    let (_a, _keep_a) = fake_client(&mut server, session, 100, 30);
    let (_b, _keep_b) = fake_client(&mut server, session, 80, 24);
    server.resize_session_windows(session);

    let window = server.sessions[&session].current_window().unwrap();
    let w = &server.windows[&window];
    assert_eq!((w.sx, w.sy), (80, 23));
    let pane = server.panes.get(&w.active).unwrap();
    assert_eq!((pane.sx(), pane.sy()), (80, 23));
}

#[test]
fn largest_client_bounds_the_window() {
    let mut server = server();
    let session = new_session(&mut server, "w");
    run(&mut server, &["set-option", "-t", "w", "window-size", "largest"]);

    let (_a, _keep_a) = fake_client(&mut server, session, 100, 30);
    let (_b, _keep_b) = fake_client(&mut server, session, 80, 24);
    server.resize_session_windows(session);

    let window = server.sessions[&session].current_window().unwrap();
    let w = &server.windows[&window];
    assert_eq!((w.sx, w.sy), (100, 29));
}

#[test]
fn latest_mode_tracks_most_recent_resize() {
    let mut server = server();
    let session = new_session(&mut server, "w");
    // window-size defaults to "latest".

    let (a, _keep_a) = fake_client(&mut server, session, 100, 30);
    let window = server.sessions[&session].current_window().unwrap();
    let w = &server.windows[&window];
    assert_eq!((w.sx, w.sy), (100, 29));

    // Client B identifies afterwards and resizes to 80x24: B is now the
    // most recently sized client, so the session follows it and every
    // pane reflows to 80 columns.
    let (_b, _keep_b) = fake_client(&mut server, session, 80, 24);
    let w = &server.windows[&window];
    assert_eq!((w.sx, w.sy), (80, 23));
    let pane = &server.panes[&w.active];
    assert_eq!((pane.sx(), pane.sy()), (80, 23));

    // A resizes again and takes the lead back.
    server.client_resized(a, 100, 30);
    let w = &server.windows[&window];
    assert_eq!((w.sx, w.sy), (100, 29));
}

#[test]
fn spawn_env_merges_client_path_under_session_env() {
    let mut server = server();
    let session = new_session(&mut server, "w");
    let (client, _keep) = fake_client(&mut server, session, 80, 24);
    server
        .clients
        .get_mut(&client)
        .unwrap()
        .env
        .insert("PATH".to_string(), "/client/bin".to_string());

    let env = server.spawn_env(session, Some(client));
    assert_eq!(env.get("PATH").map(String::as_str), Some("/client/bin"));
    assert!(env.contains_key("SEAM"));
    assert_eq!(env.get("TERM").map(String::as_str), Some("screen-256color"));

    // The session environment wins on collision.
    server
        .sessions
        .get_mut(&session)
        .unwrap()
        .env
        .insert("PATH".to_string(), "/session/bin".to_string());
    let env = server.spawn_env(session, Some(client));
    assert_eq!(env.get("PATH").map(String::as_str), Some("/session/bin"));
}

#[test]
fn shared_window_takes_minimum_over_sessions() {
    let mut server = server();
    let a = new_session(&mut server, "a");
    let b = new_session(&mut server, "b");
    run(&mut server, &["set-option", "-g", "window-size", "smallest"]);

    let (_ca, _keep_a) = fake_client(&mut server, a, 120, 40);
    let (_cb, _keep_b) = fake_client(&mut server, b, 60, 20);

    // Link session a's current window into session b as well.
    let window = server.sessions[&a].current_window().unwrap();
    let index = server.sessions.get_mut(&b).unwrap().link_window(window, 0);
    server.windows.get_mut(&window).unwrap().refs += 1;
    let _ = index;

    let (sx, sy) = server.effective_window_size(window);
    assert_eq!((sx, sy), (60, 19));
}

#[test]
fn resize_after_detach_recomputes() {
    let mut server = server();
    let session = new_session(&mut server, "w");
    run(&mut server, &["set-option", "-t", "w", "window-size", "smallest"]);

    let (_a, _keep_a) = fake_client(&mut server, session, 100, 30);
    let (b, _keep_b) = fake_client(&mut server, session, 80, 24);
    server.resize_session_windows(session);

    let window = server.sessions[&session].current_window().unwrap();
    assert_eq!(server.windows[&window].sx, 80);

    server.remove_client(b);
    let w = &server.windows[&window];
    assert_eq!((w.sx, w.sy), (100, 29));
}

#[test]
fn render_pass_fills_the_presenter_frame() {
    let mut server = server();
    let session = new_session(&mut server, "w");
    let (client, _keep) = fake_client(&mut server, session, 80, 24);

    // Put known content on the active pane's screen via its PTY echo.
    let window = server.sessions[&session].current_window().unwrap();
    let pane_id = server.windows[&window].active;
    {
        let pane = server.panes.get_mut(&pane_id).unwrap();
        pane.write(b"rendered-content");
        pane.flush_output().unwrap();
        for _ in 0..200 {
            let _ = pane.on_readable();
            if pane
                .screen()
                .grid()
                .view_row_as_string(0, 0, 80)
                .starts_with("rendered-content")
            {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
    }

    seam_server::render::render_clients(&mut server);

    let c = &server.clients[&client];
    let frame = c.presenter.last_frame();
    let row: String = (0..frame.width())
        .map(|x| frame.get(x, 0).glyph().as_str().to_string())
        .collect();
    assert!(
        row.starts_with("rendered-content"),
        "frame row was {row:?}"
    );
    assert!(!c.needs_redraw);

    // The status line names the session on the bottom row.
    let status_row = frame.height() - 1;
    let status: String = (0..frame.width())
        .map(|x| frame.get(x, status_row).glyph().as_str().to_string())
        .collect();
    assert!(status.contains("[w]"), "status was {status:?}");
}

#[test]
fn split_renders_a_border_between_panes() {
    let mut server = server();
    let session = new_session(&mut server, "w");
    let (client, _keep) = fake_client(&mut server, session, 80, 24);
    run(&mut server, &["split-window", "-t", "w", "/bin/cat"]);

    seam_server::render::render_clients(&mut server);

    let c = &server.clients[&client];
    let frame = c.presenter.last_frame();
    let mut found_border = false;
    for y in 0..frame.height() {
        if frame.get(0, y).glyph().as_str() == "─" {
            found_border = true;
        }
    }
    assert!(found_border, "no horizontal border row rendered");
}
