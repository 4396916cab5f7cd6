//! Command-queue integration tests: drive a real server (real PTYs, no
//! event loop) through queued command lists and check the object graph.

use std::path::PathBuf;

use seam_server::cmd::queue::ItemFlags;
use seam_server::cmd::{self};
use seam_server::Server;

fn server() -> Server {
    Server::new(PathBuf::from("/tmp/seam-test-socket"))
}

fn queue(server: &mut Server, line: &[&[&str]]) {
    let cmds: Vec<Vec<String>> = line
        .iter()
        .map(|argv| argv.iter().map(|s| s.to_string()).collect())
        .collect();
    server.queue.append(None, cmds, ItemFlags::empty(), None, None);
}

fn run(server: &mut Server, line: &[&[&str]]) {
    queue(server, line);
    cmd::drain(server);
}

fn new_session(server: &mut Server, name: &str) {
    run(
        server,
        &[&[
            "new-session",
            "-s",
            name,
            "-x",
            "80",
            "-y",
            "24",
            "/bin/cat",
        ]],
    );
    assert!(
        server.session_by_name(name).is_some(),
        "session {name} was not created"
    );
}

#[test]
fn new_session_builds_the_graph() {
    let mut server = server();
    new_session(&mut server, "w");

    let session_id = server.session_by_name("w").unwrap();
    let session = &server.sessions[&session_id];
    assert_eq!(session.windows().len(), 1);

    let window_id = session.current_window().unwrap();
    let window = &server.windows[&window_id];
    assert_eq!(window.refs, 1);
    assert_eq!(window.pane_count(), 1);

    let pane_id = window.active;
    let pane = &server.panes[&pane_id];
    assert_eq!(pane.window, window_id);
    // Status line is reserved from the requested 24 rows.
    assert_eq!(pane.sy(), 23);
    assert_eq!(pane.sx(), 80);
}

#[test]
fn duplicate_session_name_errors_and_graph_is_unchanged() {
    let mut server = server();
    new_session(&mut server, "w");
    let before = server.sessions.len();
    run(
        &mut server,
        &[&["new-session", "-s", "w", "-x", "80", "-y", "24", "/bin/cat"]],
    );
    assert_eq!(server.sessions.len(), before);
}

#[test]
fn new_window_links_and_selects() {
    let mut server = server();
    new_session(&mut server, "w");
    run(&mut server, &[&["new-window", "-t", "w", "/bin/cat"]]);

    let session_id = server.session_by_name("w").unwrap();
    let session = &server.sessions[&session_id];
    assert_eq!(session.windows().len(), 2);
    assert_eq!(session.current_index(), 1);
}

#[test]
fn select_window_and_last_window() {
    let mut server = server();
    new_session(&mut server, "w");
    run(&mut server, &[&["new-window", "-t", "w", "/bin/cat"]]);
    run(&mut server, &[&["select-window", "-t", "w:0"]]);
    let session_id = server.session_by_name("w").unwrap();
    assert_eq!(server.sessions[&session_id].current_index(), 0);

    run(&mut server, &[&["last-window", "-t", "w"]]);
    assert_eq!(server.sessions[&session_id].current_index(), 1);
}

#[test]
fn split_window_adds_pane_with_geometry() {
    let mut server = server();
    new_session(&mut server, "w");
    run(&mut server, &[&["split-window", "-t", "w", "/bin/cat"]]);

    let session_id = server.session_by_name("w").unwrap();
    let window_id = server.sessions[&session_id].current_window().unwrap();
    let window = &server.windows[&window_id];
    assert_eq!(window.pane_count(), 2);

    // Stacked split: heights share the 23 usable rows minus the border.
    let heights: Vec<u16> = window
        .panes()
        .iter()
        .map(|p| server.panes[p].sy())
        .collect();
    assert_eq!(heights.iter().sum::<u16>() + 1, 23);
}

#[test]
fn kill_pane_collapses_and_kill_last_destroys_session() {
    let mut server = server();
    new_session(&mut server, "w");
    run(&mut server, &[&["split-window", "-t", "w", "/bin/cat"]]);

    let session_id = server.session_by_name("w").unwrap();
    let window_id = server.sessions[&session_id].current_window().unwrap();
    let second = server.windows[&window_id].active;
    run(&mut server, &[&["kill-pane", "-t", &format!("{second}")]]);
    assert_eq!(server.windows[&window_id].pane_count(), 1);

    let last = server.windows[&window_id].active;
    run(&mut server, &[&["kill-pane", "-t", &format!("{last}")]]);
    assert!(server.sessions.is_empty());
    assert!(server.windows.is_empty());
    assert!(server.panes.is_empty());
    // The last session going away shuts the server down.
    assert!(server.shutting_down);
}

#[test]
fn every_pane_belongs_to_exactly_one_window() {
    let mut server = server();
    new_session(&mut server, "a");
    new_session(&mut server, "b");
    run(&mut server, &[&["split-window", "-t", "a", "/bin/cat"]]);
    run(&mut server, &[&["new-window", "-t", "b", "/bin/cat"]]);

    for (&pane_id, pane) in &server.panes {
        let owners = server
            .windows
            .values()
            .filter(|w| w.contains(pane_id))
            .count();
        assert_eq!(owners, 1, "{pane_id} owned by {owners} windows");
        assert!(server.windows[&pane.window].contains(pane_id));
    }
    for (&window_id, _) in &server.windows {
        assert!(
            !server.sessions_of_window(window_id).is_empty(),
            "{window_id} not linked anywhere"
        );
    }
}

#[test]
fn target_resolution_by_index_and_id() {
    let mut server = server();
    new_session(&mut server, "w");
    run(&mut server, &[&["new-window", "-t", "w", "/bin/cat"]]);

    // ":N" window index form.
    run(&mut server, &[&["select-window", "-t", "w:0"]]);
    let session_id = server.session_by_name("w").unwrap();
    assert_eq!(server.sessions[&session_id].current_index(), 0);

    // Negative index counts from the end.
    run(&mut server, &[&["select-window", "-t", "w:-1"]]);
    assert_eq!(server.sessions[&session_id].current_index(), 1);

    // "=name" exact match only.
    run(&mut server, &[&["has-session", "-t", "=w"]]);
    assert!(server.session_by_name("w").is_some());
}

#[test]
fn error_aborts_rest_of_list_but_not_other_lists() {
    let mut server = server();
    new_session(&mut server, "w");
    // One list: a failing command then a session creation that must not
    // run. Then a separate list that must run.
    run(
        &mut server,
        &[
            &["has-session", "-t", "nope"],
            &["new-session", "-s", "skipped", "-x", "20", "-y", "10", "/bin/cat"],
        ],
    );
    assert!(server.session_by_name("skipped").is_none());

    run(
        &mut server,
        &[&["new-session", "-s", "ran", "-x", "20", "-y", "10", "/bin/cat"]],
    );
    assert!(server.session_by_name("ran").is_some());
}

#[test]
fn wait_for_parks_until_signal() {
    let mut server = server();
    new_session(&mut server, "w");

    // The waiter parks, leaving its follow-up command unexecuted.
    queue(
        &mut server,
        &[
            &["wait-for", "chan"],
            &["new-session", "-s", "after", "-x", "20", "-y", "10", "/bin/cat"],
        ],
    );
    cmd::drain(&mut server);
    assert!(server.session_by_name("after").is_none());
    assert!(server.wait_channels.contains_key("chan"));

    // The signal wakes it; the follow-up runs in the same drain.
    run(&mut server, &[&["wait-for", "-S", "chan"]]);
    assert!(server.session_by_name("after").is_some());
    assert!(!server.wait_channels.contains_key("chan"));
}

#[test]
fn wait_for_signal_without_waiters_errors() {
    let mut server = server();
    new_session(&mut server, "w");
    run(&mut server, &[&["wait-for", "-S", "lonely"]]);
    // The error is reported, not fatal; the channel was never created.
    assert!(!server.wait_channels.contains_key("lonely"));
}

#[test]
fn wait_for_lock_is_mutually_exclusive() {
    let mut server = server();
    new_session(&mut server, "w");

    run(&mut server, &[&["wait-for", "-L", "mutex"]]);
    assert!(server.wait_channels["mutex"].locked);

    // A second locker parks.
    queue(
        &mut server,
        &[
            &["wait-for", "-L", "mutex"],
            &["new-session", "-s", "critical", "-x", "20", "-y", "10", "/bin/cat"],
        ],
    );
    cmd::drain(&mut server);
    assert!(server.session_by_name("critical").is_none());

    // Unlock hands the lock over and the parked list continues.
    run(&mut server, &[&["wait-for", "-U", "mutex"]]);
    assert!(server.session_by_name("critical").is_some());
    assert!(server.wait_channels["mutex"].locked);

    run(&mut server, &[&["wait-for", "-U", "mutex"]]);
    assert!(!server.wait_channels.contains_key("mutex"));
}

#[test]
fn hooks_fire_after_command_with_nohooks_recursion_guard() {
    let mut server = server();
    new_session(&mut server, "w");
    run(
        &mut server,
        &[&[
            "set-hook",
            "after-new-window",
            "set-buffer -t w hook-ran",
        ]],
    );
    run(&mut server, &[&["new-window", "-t", "w", "/bin/cat"]]);

    let session_id = server.session_by_name("w").unwrap();
    let buffer = server.sessions[&session_id].paste_get(0);
    assert_eq!(buffer.map(|b| b.data.clone()), Some(b"hook-ran".to_vec()));
}

#[test]
fn paste_buffer_stack_via_commands() {
    let mut server = server();
    new_session(&mut server, "w");
    run(&mut server, &[&["set-buffer", "-t", "w", "first"]]);
    run(&mut server, &[&["set-buffer", "-t", "w", "second"]]);

    let session_id = server.session_by_name("w").unwrap();
    assert_eq!(server.sessions[&session_id].paste_len(), 2);
    assert_eq!(
        server.sessions[&session_id].paste_get(0).unwrap().data,
        b"second"
    );

    // paste-buffer feeds the pane's PTY input path.
    run(&mut server, &[&["paste-buffer", "-t", "w", "-d"]]);
    assert_eq!(server.sessions[&session_id].paste_len(), 1);
}

#[test]
fn set_option_global_and_session_layering() {
    let mut server = server();
    new_session(&mut server, "w");
    run(
        &mut server,
        &[&["set-option", "-g", "history-limit", "500"]],
    );
    let session_id = server.session_by_name("w").unwrap();
    assert_eq!(server.session_option_number(session_id, "history-limit"), 500);

    run(
        &mut server,
        &[&["set-option", "-t", "w", "history-limit", "9"]],
    );
    assert_eq!(server.session_option_number(session_id, "history-limit"), 9);

    run(
        &mut server,
        &[&["set-option", "-u", "-t", "w", "history-limit"]],
    );
    assert_eq!(server.session_option_number(session_id, "history-limit"), 500);
}

#[test]
fn rename_session_rejects_duplicates_and_bad_names() {
    let mut server = server();
    new_session(&mut server, "a");
    new_session(&mut server, "b");
    run(&mut server, &[&["rename-session", "-t", "a", "b"]]);
    // Rename refused: both names still present.
    assert!(server.session_by_name("a").is_some());
    assert!(server.session_by_name("b").is_some());

    run(&mut server, &[&["rename-session", "-t", "a", "x:y"]]);
    assert!(server.session_by_name("a").is_some());

    run(&mut server, &[&["rename-session", "-t", "a", "fresh"]]);
    assert!(server.session_by_name("fresh").is_some());
    assert!(server.session_by_name("a").is_none());
}

#[test]
fn select_layout_retiles_all_panes() {
    let mut server = server();
    new_session(&mut server, "w");
    run(&mut server, &[&["split-window", "-t", "w", "/bin/cat"]]);
    run(&mut server, &[&["split-window", "-t", "w", "/bin/cat"]]);
    run(
        &mut server,
        &[&["select-layout", "-t", "w", "even-horizontal"]],
    );

    let session_id = server.session_by_name("w").unwrap();
    let window_id = server.sessions[&session_id].current_window().unwrap();
    let window = &server.windows[&window_id];
    // Side-by-side: widths share 80 columns minus two borders.
    let widths: Vec<u16> = window
        .panes()
        .iter()
        .map(|p| server.panes[p].sx())
        .collect();
    assert_eq!(widths.len(), 3);
    assert_eq!(widths.iter().sum::<u16>() + 2, 80);
    for p in window.panes() {
        assert_eq!(server.panes[p].sy(), 23);
    }
}

#[test]
fn resize_pane_zoom_toggles() {
    let mut server = server();
    new_session(&mut server, "w");
    run(&mut server, &[&["split-window", "-t", "w", "/bin/cat"]]);

    let session_id = server.session_by_name("w").unwrap();
    let window_id = server.sessions[&session_id].current_window().unwrap();

    run(&mut server, &[&["resize-pane", "-Z", "-t", "w"]]);
    assert!(server.windows[&window_id].is_zoomed());
    // The zoomed pane takes the full usable area.
    let active = server.windows[&window_id].active;
    assert_eq!(server.panes[&active].sy(), 23);

    run(&mut server, &[&["resize-pane", "-Z", "-t", "w"]]);
    assert!(!server.windows[&window_id].is_zoomed());
}

#[test]
fn send_keys_reaches_pty() {
    let mut server = server();
    new_session(&mut server, "w");
    run(&mut server, &[&["send-keys", "-t", "w", "-l", "marker"]]);
    // The write is buffered on the pane; flushing pushes it to the child.
    let session_id = server.session_by_name("w").unwrap();
    let window_id = server.sessions[&session_id].current_window().unwrap();
    let pane_id = server.windows[&window_id].active;
    let pane = server.panes.get_mut(&pane_id).unwrap();
    assert!(pane.wants_write());
    pane.flush_output().unwrap();

    // /bin/cat echoes back through the PTY into the screen.
    let mut seen = String::new();
    for _ in 0..200 {
        let _ = pane.on_readable();
        seen = pane.screen().grid().view_row_as_string(0, 0, 80);
        if seen.starts_with("marker") {
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    panic!("pane never echoed input, saw {seen:?}");
}

#[test]
fn kill_server_flags_shutdown() {
    let mut server = server();
    new_session(&mut server, "w");
    run(&mut server, &[&["kill-server"]]);
    assert!(server.shutting_down);
    assert!(server.sessions.is_empty());
}

#[test]
fn unknown_command_is_an_error_not_a_crash() {
    let mut server = server();
    new_session(&mut server, "w");
    run(&mut server, &[&["frobnicate-all-the-things"]]);
    assert!(server.session_by_name("w").is_some());
}
