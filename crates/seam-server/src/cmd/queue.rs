//! The command queue and wait channels.
//!
//! Command lists are queued as items and drained FIFO. A command may
//! return WAIT, parking its item on a named wait channel until a signal
//! releases it; lists from different clients interleave only at item
//! boundaries.

use std::collections::{HashMap, VecDeque};

use bitflags::bitflags;

use crate::ids::ClientId;
use crate::keys::MouseEvent;

bitflags! {
    /// Item flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ItemFlags: u8 {
        /// Do not fire hooks for this item's commands (set on
        /// hook-generated items to stop recursion).
        const NOHOOKS = 1 << 0;
    }
}

/// What a command executor returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdResult {
    /// Continue with the next command.
    Normal,
    /// Park the item on a wait channel; resumes at the next command.
    Wait,
    /// Report to the client and abandon the rest of the list.
    Error(String),
    /// Stop the list without error.
    Stop,
}

/// One queued command-list invocation.
#[derive(Debug)]
pub struct CmdQItem {
    pub id: u64,
    /// The submitting client; `None` for server-generated items.
    pub client: Option<ClientId>,
    /// The `;`-separated lists, parsed to argv.
    pub cmds: Vec<Vec<String>>,
    /// Next command to execute.
    pub index: usize,
    pub flags: ItemFlags,
    /// Explicit target inherited by hook items.
    pub target: Option<String>,
    /// The mouse event this item originated from, if any.
    pub mouse: Option<MouseEvent>,
}

/// Global FIFO of pending items.
#[derive(Debug, Default)]
pub struct CommandQueue {
    run: VecDeque<u64>,
    items: HashMap<u64, CmdQItem>,
    next_id: u64,
}

impl CommandQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new item at the back of the queue; returns its id.
    pub fn append(
        &mut self,
        client: Option<ClientId>,
        cmds: Vec<Vec<String>>,
        flags: ItemFlags,
        target: Option<String>,
        mouse: Option<MouseEvent>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.insert(
            id,
            CmdQItem {
                id,
                client,
                cmds,
                index: 0,
                flags,
                target,
                mouse,
            },
        );
        self.run.push_back(id);
        id
    }

    /// Put an item id at the front of the run queue.
    pub fn push_front(&mut self, id: u64) {
        if self.items.contains_key(&id) {
            self.run.push_front(id);
        }
    }

    /// Put an item id at the back of the run queue (wait-channel wake).
    pub fn push_back(&mut self, id: u64) {
        if self.items.contains_key(&id) {
            self.run.push_back(id);
        }
    }

    /// Pop the next runnable item id.
    pub fn pop(&mut self) -> Option<u64> {
        self.run.pop_front()
    }

    /// Borrow an item.
    #[must_use]
    pub fn item(&self, id: u64) -> Option<&CmdQItem> {
        self.items.get(&id)
    }

    /// Mutably borrow an item.
    pub fn item_mut(&mut self, id: u64) -> Option<&mut CmdQItem> {
        self.items.get_mut(&id)
    }

    /// Remove an item entirely.
    pub fn remove(&mut self, id: u64) -> Option<CmdQItem> {
        self.run.retain(|&i| i != id);
        self.items.remove(&id)
    }

    /// Drop every item submitted by a client (it disconnected). Parked
    /// items are removed too; wait channels prune dead ids lazily.
    pub fn cancel_client(&mut self, client: ClientId) {
        let dead: Vec<u64> = self
            .items
            .iter()
            .filter(|(_, item)| item.client == Some(client))
            .map(|(&id, _)| id)
            .collect();
        for id in dead {
            self.remove(id);
        }
    }

    /// Whether any item is runnable.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.run.is_empty()
    }
}

/// A named rendezvous point for `wait-for`.
#[derive(Debug, Default)]
pub struct WaitChannel {
    pub locked: bool,
    /// Items released by `wait-for -S`.
    pub waiters: VecDeque<u64>,
    /// Items waiting to take the lock.
    pub lockers: VecDeque<u64>,
}

impl WaitChannel {
    /// A channel with no waiters and no lock is garbage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.locked && self.waiters.is_empty() && self.lockers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_cmd(queue: &mut CommandQueue, name: &str) -> u64 {
        queue.append(
            None,
            vec![vec![name.to_string()]],
            ItemFlags::empty(),
            None,
            None,
        )
    }

    #[test]
    fn fifo_order() {
        let mut q = CommandQueue::new();
        let a = one_cmd(&mut q, "a");
        let b = one_cmd(&mut q, "b");
        assert_eq!(q.pop(), Some(a));
        assert_eq!(q.pop(), Some(b));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn parked_item_survives_pop() {
        let mut q = CommandQueue::new();
        let a = one_cmd(&mut q, "wait-for");
        assert_eq!(q.pop(), Some(a));
        // Parked: not in run queue but still stored.
        assert!(q.item(a).is_some());
        q.push_back(a);
        assert_eq!(q.pop(), Some(a));
    }

    #[test]
    fn cancel_client_removes_items() {
        let mut q = CommandQueue::new();
        let a = q.append(
            Some(ClientId(1)),
            vec![vec!["x".into()]],
            ItemFlags::empty(),
            None,
            None,
        );
        let b = one_cmd(&mut q, "y");
        q.cancel_client(ClientId(1));
        assert!(q.item(a).is_none());
        assert_eq!(q.pop(), Some(b));
    }

    #[test]
    fn push_front_runs_next() {
        let mut q = CommandQueue::new();
        let a = one_cmd(&mut q, "a");
        let b = one_cmd(&mut q, "b");
        let _ = q.pop();
        q.push_front(a);
        assert_eq!(q.pop(), Some(a));
        assert_eq!(q.pop(), Some(b));
    }

    #[test]
    fn wait_channel_gc_condition() {
        let mut chan = WaitChannel::default();
        assert!(chan.is_empty());
        chan.locked = true;
        assert!(!chan.is_empty());
        chan.locked = false;
        chan.waiters.push_back(1);
        assert!(!chan.is_empty());
    }
}
