//! Windows: ordered pane collections tiled by a layout tree.
//!
//! A window may be linked into several sessions; the reference count
//! tracks the links and the last unlink destroys it.

use crate::ids::{PaneId, WindowId};
use crate::layout::{LayoutNode, SplitDir};

/// A window: panes, the active pane, a layout, a name, a size.
#[derive(Debug)]
pub struct Window {
    pub id: WindowId,
    pub name: String,
    /// Set once the user names the window; stops automatic renaming.
    pub name_is_user_set: bool,
    /// Ordered pane list; never empty while the window lives.
    panes: Vec<PaneId>,
    pub active: PaneId,
    pub layout: LayoutNode,
    /// Stashed layout while a pane is zoomed.
    zoomed_layout: Option<LayoutNode>,
    pub sx: u16,
    pub sy: u16,
    /// Number of sessions this window is linked into.
    pub refs: u32,
}

impl Window {
    /// Create a window holding one pane.
    #[must_use]
    pub fn new(id: WindowId, name: String, pane: PaneId, sx: u16, sy: u16) -> Self {
        Self {
            id,
            name,
            name_is_user_set: false,
            panes: vec![pane],
            active: pane,
            layout: LayoutNode::leaf(pane),
            zoomed_layout: None,
            sx,
            sy,
            refs: 0,
        }
    }

    /// The ordered pane list.
    #[must_use]
    pub fn panes(&self) -> &[PaneId] {
        &self.panes
    }

    /// Whether the window holds this pane.
    #[must_use]
    pub fn contains(&self, pane: PaneId) -> bool {
        self.panes.contains(&pane)
    }

    /// Number of panes.
    #[must_use]
    pub fn pane_count(&self) -> usize {
        self.panes.len()
    }

    /// Whether a pane is currently zoomed.
    #[must_use]
    pub fn is_zoomed(&self) -> bool {
        self.zoomed_layout.is_some()
    }

    /// Add a pane by splitting the active pane's cell.
    pub fn add_pane(&mut self, pane: PaneId, dir: SplitDir) {
        self.unzoom();
        let pos = self
            .panes
            .iter()
            .position(|&p| p == self.active)
            .map_or(self.panes.len(), |i| i + 1);
        self.panes.insert(pos, pane);
        self.layout.split_pane(self.active, dir, pane);
        self.active = pane;
    }

    /// Remove a pane. Returns false when the window is now empty (the
    /// caller destroys it).
    pub fn remove_pane(&mut self, pane: PaneId) -> bool {
        self.unzoom();
        self.panes.retain(|&p| p != pane);
        if self.panes.is_empty() {
            return false;
        }
        if !self.layout.remove_pane(pane) {
            // The layout was a bare leaf for this pane; rebuild it.
            self.layout = LayoutNode::leaf(self.panes[0]);
        }
        if self.active == pane {
            self.active = self.panes[0];
        }
        true
    }

    /// Make a pane active; no-op if it is not in this window.
    pub fn set_active(&mut self, pane: PaneId) {
        if self.contains(pane) {
            self.active = pane;
        }
    }

    /// The pane after the active one, cyclic.
    #[must_use]
    pub fn next_pane(&self) -> PaneId {
        let pos = self
            .panes
            .iter()
            .position(|&p| p == self.active)
            .unwrap_or(0);
        self.panes[(pos + 1) % self.panes.len()]
    }

    /// The pane before the active one, cyclic.
    #[must_use]
    pub fn prev_pane(&self) -> PaneId {
        let pos = self
            .panes
            .iter()
            .position(|&p| p == self.active)
            .unwrap_or(0);
        self.panes[(pos + self.panes.len() - 1) % self.panes.len()]
    }

    /// Zoom the active pane: its leaf becomes the whole tree until
    /// [`unzoom`](Self::unzoom).
    pub fn zoom(&mut self) {
        if self.zoomed_layout.is_none() && self.panes.len() > 1 {
            let stash = std::mem::replace(&mut self.layout, LayoutNode::leaf(self.active));
            self.zoomed_layout = Some(stash);
        }
    }

    /// Swap the stashed layout back in.
    pub fn unzoom(&mut self) {
        if let Some(stash) = self.zoomed_layout.take() {
            self.layout = stash;
        }
    }

    /// Toggle zoom on the active pane.
    pub fn toggle_zoom(&mut self) {
        if self.is_zoomed() {
            self.unzoom();
        } else {
            self.zoom();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Window {
        Window::new(WindowId(0), "shell".into(), PaneId(0), 80, 24)
    }

    #[test]
    fn new_window_has_one_pane() {
        let w = window();
        assert_eq!(w.panes(), &[PaneId(0)]);
        assert_eq!(w.active, PaneId(0));
    }

    #[test]
    fn add_pane_splits_and_activates() {
        let mut w = window();
        w.add_pane(PaneId(1), SplitDir::Vertical);
        assert_eq!(w.panes(), &[PaneId(0), PaneId(1)]);
        assert_eq!(w.active, PaneId(1));
        assert_eq!(w.layout.panes(), vec![PaneId(0), PaneId(1)]);
    }

    #[test]
    fn remove_last_pane_reports_empty() {
        let mut w = window();
        assert!(!w.remove_pane(PaneId(0)));
    }

    #[test]
    fn remove_active_moves_activity() {
        let mut w = window();
        w.add_pane(PaneId(1), SplitDir::Vertical);
        assert!(w.remove_pane(PaneId(1)));
        assert_eq!(w.active, PaneId(0));
        assert_eq!(w.layout.panes(), vec![PaneId(0)]);
    }

    #[test]
    fn pane_cycling_wraps() {
        let mut w = window();
        w.add_pane(PaneId(1), SplitDir::Vertical);
        w.add_pane(PaneId(2), SplitDir::Horizontal);
        w.set_active(PaneId(2));
        assert_eq!(w.next_pane(), PaneId(0));
        assert_eq!(w.prev_pane(), PaneId(1));
    }

    #[test]
    fn zoom_stashes_and_restores_layout() {
        let mut w = window();
        w.add_pane(PaneId(1), SplitDir::Vertical);
        let before = w.layout.clone();
        w.set_active(PaneId(0));
        w.toggle_zoom();
        assert!(w.is_zoomed());
        assert_eq!(w.layout, LayoutNode::leaf(PaneId(0)));
        w.toggle_zoom();
        assert_eq!(w.layout, before);
    }

    #[test]
    fn zoom_single_pane_is_noop() {
        let mut w = window();
        w.zoom();
        assert!(!w.is_zoomed());
    }

    #[test]
    fn adding_pane_unzooms_first() {
        let mut w = window();
        w.add_pane(PaneId(1), SplitDir::Vertical);
        w.zoom();
        w.add_pane(PaneId(2), SplitDir::Horizontal);
        assert!(!w.is_zoomed());
        assert_eq!(w.layout.panes().len(), 3);
    }
}
