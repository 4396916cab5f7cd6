//! Commands: the fixed entry table, dispatch, and the drain loop.
//!
//! Every command is one [`CmdEntry`]: name, alias, argument template,
//! usage string, and executor. The set is closed at build time; dispatch
//! resolves names exactly, then by alias, then by unambiguous prefix.

pub mod args;
mod exec;
pub mod queue;
pub mod target;

use crate::ids::ClientId;
use crate::keys::MouseEvent;
use crate::server::Server;
pub use args::Args;
pub use queue::{CmdResult, CommandQueue, ItemFlags, WaitChannel};
pub use target::FindState;

/// Everything an executor needs besides the server.
pub struct CmdCtx {
    pub item_id: u64,
    pub client: Option<ClientId>,
    pub args: Args,
    /// The raw `-t` string (explicit, or inherited from the item).
    pub target: Option<String>,
    pub mouse: Option<MouseEvent>,
}

impl CmdCtx {
    /// Resolve the context's target against the server.
    pub fn find(&self, server: &Server) -> Result<FindState, String> {
        target::resolve(
            server,
            self.client,
            self.target.as_deref(),
            self.mouse.as_ref(),
        )
    }
}

/// One command table entry.
pub struct CmdEntry {
    pub name: &'static str,
    pub alias: Option<&'static str>,
    /// getopt-style template; `:` marks value-taking flags.
    pub template: &'static str,
    pub usage: &'static str,
    pub exec: fn(&mut Server, &mut CmdCtx) -> CmdResult,
}

/// The complete command vocabulary.
pub static COMMANDS: &[CmdEntry] = &[
    CmdEntry {
        name: "attach-session",
        alias: Some("attach"),
        template: "dt:r",
        usage: "attach-session [-dr] [-t target-session]",
        exec: exec::attach_session,
    },
    CmdEntry {
        name: "detach-client",
        alias: Some("detach"),
        template: "s:t:P",
        usage: "detach-client [-P] [-s target-session]",
        exec: exec::detach_client,
    },
    CmdEntry {
        name: "has-session",
        alias: Some("has"),
        template: "t:",
        usage: "has-session [-t target-session]",
        exec: exec::has_session,
    },
    CmdEntry {
        name: "kill-pane",
        alias: Some("killp"),
        template: "at:",
        usage: "kill-pane [-a] [-t target-pane]",
        exec: exec::kill_pane,
    },
    CmdEntry {
        name: "kill-server",
        alias: None,
        template: "",
        usage: "kill-server",
        exec: exec::kill_server,
    },
    CmdEntry {
        name: "kill-session",
        alias: None,
        template: "t:",
        usage: "kill-session [-t target-session]",
        exec: exec::kill_session,
    },
    CmdEntry {
        name: "kill-window",
        alias: Some("killw"),
        template: "t:",
        usage: "kill-window [-t target-window]",
        exec: exec::kill_window,
    },
    CmdEntry {
        name: "last-window",
        alias: Some("last"),
        template: "t:",
        usage: "last-window [-t target-session]",
        exec: exec::last_window,
    },
    CmdEntry {
        name: "list-buffers",
        alias: Some("lsb"),
        template: "t:",
        usage: "list-buffers [-t target-session]",
        exec: exec::list_buffers,
    },
    CmdEntry {
        name: "list-clients",
        alias: Some("lsc"),
        template: "t:",
        usage: "list-clients [-t target-session]",
        exec: exec::list_clients,
    },
    CmdEntry {
        name: "list-sessions",
        alias: Some("ls"),
        template: "",
        usage: "list-sessions",
        exec: exec::list_sessions,
    },
    CmdEntry {
        name: "list-windows",
        alias: Some("lsw"),
        template: "t:",
        usage: "list-windows [-t target-session]",
        exec: exec::list_windows,
    },
    CmdEntry {
        name: "load-buffer",
        alias: Some("loadb"),
        template: "b:t:",
        usage: "load-buffer [-t target-session] path",
        exec: exec::load_buffer,
    },
    CmdEntry {
        name: "new-session",
        alias: Some("new"),
        template: "dc:n:s:t:x:y:",
        usage: "new-session [-d] [-c start-directory] [-n window-name] [-s session-name] [-x width] [-y height] [command]",
        exec: exec::new_session,
    },
    CmdEntry {
        name: "new-window",
        alias: Some("neww"),
        template: "adc:n:t:",
        usage: "new-window [-ad] [-c start-directory] [-n window-name] [-t target-window] [command]",
        exec: exec::new_window,
    },
    CmdEntry {
        name: "next-window",
        alias: Some("next"),
        template: "t:",
        usage: "next-window [-t target-session]",
        exec: exec::next_window,
    },
    CmdEntry {
        name: "paste-buffer",
        alias: Some("pasteb"),
        template: "db:t:",
        usage: "paste-buffer [-d] [-b buffer-index] [-t target-pane]",
        exec: exec::paste_buffer,
    },
    CmdEntry {
        name: "previous-window",
        alias: Some("prev"),
        template: "t:",
        usage: "previous-window [-t target-session]",
        exec: exec::previous_window,
    },
    CmdEntry {
        name: "rename-session",
        alias: Some("rename"),
        template: "t:",
        usage: "rename-session [-t target-session] new-name",
        exec: exec::rename_session,
    },
    CmdEntry {
        name: "rename-window",
        alias: Some("renamew"),
        template: "t:",
        usage: "rename-window [-t target-window] new-name",
        exec: exec::rename_window,
    },
    CmdEntry {
        name: "resize-pane",
        alias: Some("resizep"),
        template: "DLRUZt:x:y:",
        usage: "resize-pane [-DLRUZ] [-t target-pane] [adjustment]",
        exec: exec::resize_pane,
    },
    CmdEntry {
        name: "save-buffer",
        alias: Some("saveb"),
        template: "ab:t:",
        usage: "save-buffer [-a] [-b buffer-index] [-t target-session] path",
        exec: exec::save_buffer,
    },
    CmdEntry {
        name: "select-layout",
        alias: Some("selectl"),
        template: "t:",
        usage: "select-layout [-t target-window] layout-name",
        exec: exec::select_layout,
    },
    CmdEntry {
        name: "select-pane",
        alias: Some("selectp"),
        template: "DLRUlt:",
        usage: "select-pane [-DLRUl] [-t target-pane]",
        exec: exec::select_pane,
    },
    CmdEntry {
        name: "select-window",
        alias: Some("selectw"),
        template: "lnpt:",
        usage: "select-window [-lnp] [-t target-window]",
        exec: exec::select_window,
    },
    CmdEntry {
        name: "send-keys",
        alias: Some("send"),
        template: "lt:",
        usage: "send-keys [-l] [-t target-pane] key ...",
        exec: exec::send_keys,
    },
    CmdEntry {
        name: "set-buffer",
        alias: Some("setb"),
        template: "at:",
        usage: "set-buffer [-a] [-t target-session] data",
        exec: exec::set_buffer,
    },
    CmdEntry {
        name: "set-hook",
        alias: None,
        template: "gu",
        usage: "set-hook [-gu] hook-name [command]",
        exec: exec::set_hook,
    },
    CmdEntry {
        name: "set-option",
        alias: Some("set"),
        template: "gut:",
        usage: "set-option [-gu] [-t target-session] option [value]",
        exec: exec::set_option,
    },
    CmdEntry {
        name: "show-buffer",
        alias: Some("showb"),
        template: "b:t:",
        usage: "show-buffer [-b buffer-index] [-t target-session]",
        exec: exec::show_buffer,
    },
    CmdEntry {
        name: "show-options",
        alias: Some("show"),
        template: "gt:",
        usage: "show-options [-g] [-t target-session]",
        exec: exec::show_options,
    },
    CmdEntry {
        name: "split-window",
        alias: Some("splitw"),
        template: "dhvc:t:",
        usage: "split-window [-dhv] [-c start-directory] [-t target-pane] [command]",
        exec: exec::split_window,
    },
    CmdEntry {
        name: "wait-for",
        alias: Some("wait"),
        template: "LSU",
        usage: "wait-for [-LSU] channel",
        exec: exec::wait_for,
    },
];

/// Resolve a command name: exact, alias, then unambiguous prefix.
pub fn find_entry(name: &str) -> Result<&'static CmdEntry, String> {
    if let Some(entry) = COMMANDS.iter().find(|e| e.name == name) {
        return Ok(entry);
    }
    if let Some(entry) = COMMANDS.iter().find(|e| e.alias == Some(name)) {
        return Ok(entry);
    }
    let matches: Vec<&CmdEntry> = COMMANDS
        .iter()
        .filter(|e| e.name.starts_with(name))
        .collect();
    match matches.len() {
        0 => Err(format!("unknown command: {name}")),
        1 => Ok(matches[0]),
        _ => Err(format!("ambiguous command: {name}")),
    }
}

/// Drain the queue until it is empty or everything runnable has parked.
///
/// One command executes at a time; lists from different clients
/// interleave only at item boundaries. A command returning ERROR aborts
/// the rest of its list but not other lists. Hooks fire after the
/// triggering item, with NOHOOKS set to stop recursion.
pub fn drain(server: &mut Server) {
    while let Some(item_id) = server.queue.pop() {
        let mut fired_hooks: Vec<(String, Option<String>)> = Vec::new();
        loop {
            let Some(item) = server.queue.item(item_id) else {
                break;
            };
            if item.index >= item.cmds.len() {
                let client = item.client;
                server.queue.remove(item_id);
                finish_command_client(server, client);
                break;
            }
            let argv = item.cmds[item.index].clone();
            let client = item.client;
            let inherited_target = item.target.clone();
            let mouse = item.mouse;
            let nohooks = item.flags.contains(ItemFlags::NOHOOKS);

            let result = run_one(
                server,
                item_id,
                client,
                &argv,
                inherited_target,
                mouse,
            );

            match result {
                CmdResult::Normal => {
                    if !nohooks
                        && let Ok(entry) = find_entry(&argv[0])
                    {
                        let hook = format!("after-{}", entry.name);
                        if server.hooks.contains_key(&hook) {
                            fired_hooks.push((hook, None));
                        }
                    }
                    if let Some(item) = server.queue.item_mut(item_id) {
                        item.index += 1;
                    }
                }
                CmdResult::Wait => {
                    // Parked on a wait channel; wake resumes at the next
                    // command. Not re-queued here.
                    if let Some(item) = server.queue.item_mut(item_id) {
                        item.index += 1;
                    }
                    break;
                }
                CmdResult::Error(message) => {
                    server.report_error(client, &message);
                    server.queue.remove(item_id);
                    break;
                }
                CmdResult::Stop => {
                    server.queue.remove(item_id);
                    break;
                }
            }
        }
        for (hook, target) in fired_hooks {
            server.fire_hook(&hook, target);
        }
    }
}

/// Execute a single command of an item.
fn run_one(
    server: &mut Server,
    item_id: u64,
    client: Option<ClientId>,
    argv: &[String],
    inherited_target: Option<String>,
    mouse: Option<MouseEvent>,
) -> CmdResult {
    let Some((name, rest)) = argv.split_first() else {
        return CmdResult::Normal;
    };
    let entry = match find_entry(name) {
        Ok(entry) => entry,
        Err(e) => return CmdResult::Error(e),
    };
    let args = match Args::parse(entry.template, rest) {
        Ok(args) => args,
        Err(e) => return CmdResult::Error(format!("{e}; usage: {}", entry.usage)),
    };
    let target = args
        .value('t')
        .map(str::to_string)
        .or(inherited_target);
    let mut ctx = CmdCtx {
        item_id,
        client,
        args,
        target,
        mouse,
    };
    tracing::debug!(command = entry.name, "executing");
    (entry.exec)(server, &mut ctx)
}

/// A command-mode client whose list finished gets its exit notification.
fn finish_command_client(server: &mut Server, client: Option<ClientId>) {
    use crate::client::ClientFlags;
    use seam_protocol::frame::encode_u32;
    use seam_protocol::{Frame, MsgType};

    let Some(client) = client else { return };
    if let Some(c) = server.clients.get_mut(&client)
        && !c.is_attached()
        && !c.flags.contains(ClientFlags::EXIT)
    {
        c.channel.send(Frame::new(MsgType::Exit, encode_u32(0)));
        c.flags.insert(ClientFlags::EXIT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_name_wins() {
        assert_eq!(find_entry("kill-server").unwrap().name, "kill-server");
    }

    #[test]
    fn alias_resolves() {
        assert_eq!(find_entry("neww").unwrap().name, "new-window");
        assert_eq!(find_entry("ls").unwrap().name, "list-sessions");
    }

    #[test]
    fn unambiguous_prefix_resolves() {
        assert_eq!(find_entry("kill-serv").unwrap().name, "kill-server");
        assert_eq!(find_entry("spl").unwrap().name, "split-window");
    }

    #[test]
    fn ambiguous_prefix_rejected() {
        assert!(find_entry("kill").is_err());
        assert!(find_entry("kill-se").is_err());
        assert!(find_entry("list-").is_err());
    }

    #[test]
    fn unknown_rejected() {
        assert!(find_entry("frobnicate").is_err());
    }

    #[test]
    fn table_names_are_unique_and_sorted() {
        let names: Vec<&str> = COMMANDS.iter().map(|e| e.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
    }
}
