//! Layout trees: how panes tile a window.
//!
//! Interior nodes are splits with size-weighted children; leaves reference
//! panes by id. Geometry derives top-down from the window size, with one
//! border line between adjacent siblings. Five presets generate canonical
//! trees; user splits grow free-form ones.

use crate::ids::PaneId;

/// Direction of a split node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDir {
    /// Children sit side by side (split the width).
    Horizontal,
    /// Children stack (split the height).
    Vertical,
}

/// The preset layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetLayout {
    EvenHorizontal,
    EvenVertical,
    MainHorizontal,
    MainVertical,
    Tiled,
}

impl PresetLayout {
    /// Parse a preset name (select-layout argument).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "even-horizontal" => Self::EvenHorizontal,
            "even-vertical" => Self::EvenVertical,
            "main-horizontal" => Self::MainHorizontal,
            "main-vertical" => Self::MainVertical,
            "tiled" => Self::Tiled,
            _ => return None,
        })
    }
}

/// A rectangle in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    #[must_use]
    pub fn new(x: u16, y: u16, w: u16, h: u16) -> Self {
        Self { x, y, w, h }
    }

    /// Whether the point lies inside.
    #[must_use]
    pub fn contains(&self, px: u16, py: u16) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }
}

/// One node of the layout tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutNode {
    Leaf {
        pane: PaneId,
        weight: u32,
    },
    Split {
        dir: SplitDir,
        weight: u32,
        children: Vec<LayoutNode>,
    },
}

impl LayoutNode {
    /// A single-pane tree.
    #[must_use]
    pub fn leaf(pane: PaneId) -> Self {
        LayoutNode::Leaf { pane, weight: 1 }
    }

    fn weight(&self) -> u32 {
        match self {
            LayoutNode::Leaf { weight, .. } | LayoutNode::Split { weight, .. } => *weight,
        }
    }

    fn weight_mut(&mut self) -> &mut u32 {
        match self {
            LayoutNode::Leaf { weight, .. } | LayoutNode::Split { weight, .. } => weight,
        }
    }

    /// All pane ids in tree order.
    #[must_use]
    pub fn panes(&self) -> Vec<PaneId> {
        let mut out = Vec::new();
        self.collect_panes(&mut out);
        out
    }

    fn collect_panes(&self, out: &mut Vec<PaneId>) {
        match self {
            LayoutNode::Leaf { pane, .. } => out.push(*pane),
            LayoutNode::Split { children, .. } => {
                for child in children {
                    child.collect_panes(out);
                }
            }
        }
    }

    /// The first pane in tree order.
    #[must_use]
    pub fn first_pane(&self) -> Option<PaneId> {
        match self {
            LayoutNode::Leaf { pane, .. } => Some(*pane),
            LayoutNode::Split { children, .. } => {
                children.first().and_then(LayoutNode::first_pane)
            }
        }
    }

    /// Compute pane geometry for a window of `rect`.
    #[must_use]
    pub fn compute(&self, rect: Rect) -> Vec<(PaneId, Rect)> {
        let mut out = Vec::new();
        self.compute_into(rect, &mut out);
        out
    }

    fn compute_into(&self, rect: Rect, out: &mut Vec<(PaneId, Rect)>) {
        match self {
            LayoutNode::Leaf { pane, .. } => out.push((*pane, rect)),
            LayoutNode::Split { dir, children, .. } => {
                let total = match dir {
                    SplitDir::Horizontal => rect.w,
                    SplitDir::Vertical => rect.h,
                };
                let weights: Vec<u32> = children.iter().map(LayoutNode::weight).collect();
                let sizes = distribute(total, &weights);
                let mut offset = 0u16;
                for (child, size) in children.iter().zip(sizes) {
                    let child_rect = match dir {
                        SplitDir::Horizontal => {
                            Rect::new(rect.x + offset, rect.y, size, rect.h)
                        }
                        SplitDir::Vertical => {
                            Rect::new(rect.x, rect.y + offset, rect.w, size)
                        }
                    };
                    child.compute_into(child_rect, out);
                    // One border line between siblings.
                    offset = offset.saturating_add(size).saturating_add(1);
                }
            }
        }
    }

    /// Split the leaf holding `target`, putting `new_pane` after it.
    ///
    /// When the leaf's parent already splits in `dir` the new leaf joins
    /// that split; otherwise the leaf becomes a two-child split. Weights
    /// halve so the two panes share the old cell evenly.
    pub fn split_pane(&mut self, target: PaneId, dir: SplitDir, new_pane: PaneId) -> bool {
        // Join an existing same-direction split when the target is a
        // direct child of it.
        if let LayoutNode::Split {
            dir: node_dir,
            children,
            ..
        } = self
            && *node_dir == dir
        {
            if let Some(pos) = children
                .iter()
                .position(|c| matches!(c, LayoutNode::Leaf { pane, .. } if *pane == target))
            {
                let weight = children[pos].weight().max(2);
                *children[pos].weight_mut() = weight / 2;
                children.insert(
                    pos + 1,
                    LayoutNode::Leaf {
                        pane: new_pane,
                        weight: weight - weight / 2,
                    },
                );
                return true;
            }
        }

        match self {
            LayoutNode::Leaf { pane, weight } if *pane == target => {
                let weight = *weight;
                *self = LayoutNode::Split {
                    dir,
                    weight,
                    children: vec![
                        LayoutNode::Leaf {
                            pane: target,
                            weight: 1,
                        },
                        LayoutNode::Leaf {
                            pane: new_pane,
                            weight: 1,
                        },
                    ],
                };
                true
            }
            LayoutNode::Leaf { .. } => false,
            LayoutNode::Split { children, .. } => {
                children.iter_mut().any(|c| c.split_pane(target, dir, new_pane))
            }
        }
    }

    /// Remove the leaf holding `target`, collapsing single-child splits.
    ///
    /// Returns false when the tree would become empty (the caller then
    /// destroys the window) or the pane is absent.
    pub fn remove_pane(&mut self, target: PaneId) -> bool {
        match self {
            LayoutNode::Leaf { .. } => false,
            LayoutNode::Split { children, .. } => {
                if let Some(pos) = children
                    .iter()
                    .position(|c| matches!(c, LayoutNode::Leaf { pane, .. } if *pane == target))
                {
                    children.remove(pos);
                } else if !children.iter_mut().any(|c| c.remove_pane(target)) {
                    return false;
                }
                // Collapse degenerate splits.
                children.retain(
                    |c| !matches!(c, LayoutNode::Split { children, .. } if children.is_empty()),
                );
                if children.len() == 1 {
                    let weight = self.weight();
                    let mut only = match self {
                        LayoutNode::Split { children, .. } => children.remove(0),
                        LayoutNode::Leaf { .. } => unreachable!(),
                    };
                    *only.weight_mut() = weight;
                    *self = only;
                }
                true
            }
        }
    }

    /// Move the boundary after `target` within its parent split by
    /// `delta` weight units (negative shrinks the target).
    pub fn resize_pane(&mut self, target: PaneId, dir: SplitDir, delta: i32) -> bool {
        match self {
            LayoutNode::Leaf { .. } => false,
            LayoutNode::Split {
                dir: node_dir,
                children,
                ..
            } => {
                if *node_dir == dir
                    && let Some(pos) = children.iter().position(|c| {
                        matches!(c, LayoutNode::Leaf { pane, .. } if *pane == target)
                            || c.panes().contains(&target)
                    })
                {
                    let other = if pos + 1 < children.len() { pos + 1 } else if pos > 0 { pos - 1 } else {
                        return false;
                    };
                    let take = delta.unsigned_abs();
                    let (grow, shrink) = if delta >= 0 { (pos, other) } else { (other, pos) };
                    let avail = children[shrink].weight().saturating_sub(1).min(take);
                    *children[grow].weight_mut() += avail;
                    *children[shrink].weight_mut() -= avail;
                    return true;
                }
                children.iter_mut().any(|c| c.resize_pane(target, dir, delta))
            }
        }
    }

    /// Build a preset layout over `panes` (must be non-empty).
    #[must_use]
    pub fn preset(kind: PresetLayout, panes: &[PaneId]) -> Self {
        assert!(!panes.is_empty());
        if panes.len() == 1 {
            return Self::leaf(panes[0]);
        }
        let leaves = |ids: &[PaneId]| -> Vec<LayoutNode> {
            ids.iter().map(|&p| Self::leaf(p)).collect()
        };
        match kind {
            PresetLayout::EvenHorizontal => LayoutNode::Split {
                dir: SplitDir::Horizontal,
                weight: 1,
                children: leaves(panes),
            },
            PresetLayout::EvenVertical => LayoutNode::Split {
                dir: SplitDir::Vertical,
                weight: 1,
                children: leaves(panes),
            },
            PresetLayout::MainHorizontal => LayoutNode::Split {
                dir: SplitDir::Vertical,
                weight: 1,
                children: vec![
                    LayoutNode::Leaf {
                        pane: panes[0],
                        weight: 2,
                    },
                    LayoutNode::Split {
                        dir: SplitDir::Horizontal,
                        weight: 1,
                        children: leaves(&panes[1..]),
                    },
                ],
            },
            PresetLayout::MainVertical => LayoutNode::Split {
                dir: SplitDir::Horizontal,
                weight: 1,
                children: vec![
                    LayoutNode::Leaf {
                        pane: panes[0],
                        weight: 2,
                    },
                    LayoutNode::Split {
                        dir: SplitDir::Vertical,
                        weight: 1,
                        children: leaves(&panes[1..]),
                    },
                ],
            },
            PresetLayout::Tiled => {
                // Rows of ceil(sqrt(n)) columns.
                let n = panes.len();
                let cols = (1..).find(|c| c * c >= n).unwrap_or(1);
                let rows: Vec<LayoutNode> = panes
                    .chunks(cols)
                    .map(|chunk| {
                        if chunk.len() == 1 {
                            Self::leaf(chunk[0])
                        } else {
                            LayoutNode::Split {
                                dir: SplitDir::Horizontal,
                                weight: 1,
                                children: leaves(chunk),
                            }
                        }
                    })
                    .collect();
                if rows.len() == 1 {
                    rows.into_iter().next().unwrap()
                } else {
                    LayoutNode::Split {
                        dir: SplitDir::Vertical,
                        weight: 1,
                        children: rows,
                    }
                }
            }
        }
    }
}

/// Split `total` cells among weighted children with one border between
/// siblings and a minimum of one cell per child, the shortfall taken from
/// the largest sibling.
fn distribute(total: u16, weights: &[u32]) -> Vec<u16> {
    let k = weights.len();
    if k == 0 {
        return Vec::new();
    }
    let borders = (k - 1) as u16;
    let available = total.saturating_sub(borders).max(k as u16);
    let weight_sum: u64 = weights.iter().map(|&w| u64::from(w.max(1))).sum();

    let mut sizes: Vec<u16> = weights
        .iter()
        .map(|&w| {
            ((u64::from(available) * u64::from(w.max(1))) / weight_sum) as u16
        })
        .collect();

    // Hand out rounding remainder left to right.
    let mut used: u16 = sizes.iter().sum();
    let mut i = 0;
    while used < available {
        sizes[i % k] += 1;
        used += 1;
        i += 1;
    }

    // Enforce the minimum, stealing from the largest sibling.
    for i in 0..k {
        while sizes[i] < 1 {
            let largest = (0..k)
                .filter(|&j| j != i)
                .max_by_key(|&j| sizes[j])
                .unwrap_or(i);
            if sizes[largest] <= 1 {
                sizes[i] = 1;
                break;
            }
            sizes[largest] -= 1;
            sizes[i] += 1;
        }
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u32) -> PaneId {
        PaneId(n)
    }

    #[test]
    fn single_leaf_fills_window() {
        let tree = LayoutNode::leaf(p(0));
        let geoms = tree.compute(Rect::new(0, 0, 80, 24));
        assert_eq!(geoms, vec![(p(0), Rect::new(0, 0, 80, 24))]);
    }

    #[test]
    fn even_horizontal_shares_width() {
        let tree = LayoutNode::preset(PresetLayout::EvenHorizontal, &[p(0), p(1)]);
        let geoms = tree.compute(Rect::new(0, 0, 81, 24));
        // 81 cols minus 1 border = 80 shared evenly.
        assert_eq!(geoms[0].1, Rect::new(0, 0, 40, 24));
        assert_eq!(geoms[1].1, Rect::new(41, 0, 40, 24));
    }

    #[test]
    fn even_vertical_shares_height() {
        let tree = LayoutNode::preset(PresetLayout::EvenVertical, &[p(0), p(1), p(2)]);
        let geoms = tree.compute(Rect::new(0, 0, 80, 26));
        // 26 rows minus 2 borders = 24 over 3 panes.
        assert_eq!(geoms[0].1.h, 8);
        assert_eq!(geoms[1].1.h, 8);
        assert_eq!(geoms[2].1.h, 8);
        assert_eq!(geoms[1].1.y, 9);
        assert_eq!(geoms[2].1.y, 18);
    }

    #[test]
    fn split_replaces_leaf() {
        let mut tree = LayoutNode::leaf(p(0));
        assert!(tree.split_pane(p(0), SplitDir::Vertical, p(1)));
        assert_eq!(tree.panes(), vec![p(0), p(1)]);
        let geoms = tree.compute(Rect::new(0, 0, 80, 25));
        assert_eq!(geoms[0].1.h + geoms[1].1.h + 1, 25);
    }

    #[test]
    fn split_joins_same_direction_parent() {
        let mut tree = LayoutNode::leaf(p(0));
        tree.split_pane(p(0), SplitDir::Horizontal, p(1));
        tree.split_pane(p(1), SplitDir::Horizontal, p(2));
        match &tree {
            LayoutNode::Split { children, .. } => assert_eq!(children.len(), 3),
            LayoutNode::Leaf { .. } => panic!("expected split"),
        }
    }

    #[test]
    fn remove_collapses_split() {
        let mut tree = LayoutNode::leaf(p(0));
        tree.split_pane(p(0), SplitDir::Vertical, p(1));
        assert!(tree.remove_pane(p(1)));
        assert_eq!(tree, LayoutNode::leaf(p(0)));
    }

    #[test]
    fn remove_last_pane_reports_empty() {
        let mut tree = LayoutNode::leaf(p(0));
        assert!(!tree.remove_pane(p(0)));
    }

    #[test]
    fn minimum_one_cell_taken_from_largest() {
        let tree = LayoutNode::Split {
            dir: SplitDir::Horizontal,
            weight: 1,
            children: vec![
                LayoutNode::Leaf { pane: p(0), weight: 100 },
                LayoutNode::Leaf { pane: p(1), weight: 1 },
            ],
        };
        let geoms = tree.compute(Rect::new(0, 0, 10, 5));
        assert!(geoms.iter().all(|(_, r)| r.w >= 1));
        let total: u16 = geoms.iter().map(|(_, r)| r.w).sum();
        assert_eq!(total + 1, 10);
    }

    #[test]
    fn resize_moves_boundary_only() {
        let mut tree = LayoutNode::preset(PresetLayout::EvenHorizontal, &[p(0), p(1), p(2)]);
        // Give every leaf enough weight resolution first.
        if let LayoutNode::Split { children, .. } = &mut tree {
            for c in children.iter_mut() {
                *c.weight_mut() = 10;
            }
        }
        assert!(tree.resize_pane(p(0), SplitDir::Horizontal, 5));
        if let LayoutNode::Split { children, .. } = &tree {
            assert_eq!(children[0].weight(), 15);
            assert_eq!(children[1].weight(), 5);
            assert_eq!(children[2].weight(), 10);
        }
    }

    #[test]
    fn tiled_covers_all_panes() {
        let panes: Vec<PaneId> = (0..5).map(p).collect();
        let tree = LayoutNode::preset(PresetLayout::Tiled, &panes);
        assert_eq!(tree.panes().len(), 5);
        let geoms = tree.compute(Rect::new(0, 0, 80, 24));
        assert_eq!(geoms.len(), 5);
        for (_, r) in &geoms {
            assert!(r.w >= 1 && r.h >= 1);
        }
    }

    #[test]
    fn main_vertical_gives_main_more_width() {
        let tree = LayoutNode::preset(PresetLayout::MainVertical, &[p(0), p(1), p(2)]);
        let geoms = tree.compute(Rect::new(0, 0, 90, 24));
        let main = geoms.iter().find(|(id, _)| *id == p(0)).unwrap().1;
        let other = geoms.iter().find(|(id, _)| *id == p(1)).unwrap().1;
        assert!(main.w > other.w);
    }

    #[test]
    fn geometries_never_overlap() {
        let panes: Vec<PaneId> = (0..4).map(p).collect();
        for kind in [
            PresetLayout::EvenHorizontal,
            PresetLayout::EvenVertical,
            PresetLayout::MainHorizontal,
            PresetLayout::MainVertical,
            PresetLayout::Tiled,
        ] {
            let tree = LayoutNode::preset(kind, &panes);
            let geoms = tree.compute(Rect::new(0, 0, 60, 20));
            for (i, (_, a)) in geoms.iter().enumerate() {
                for (_, b) in geoms.iter().skip(i + 1) {
                    let overlap_x = a.x < b.x + b.w && b.x < a.x + a.w;
                    let overlap_y = a.y < b.y + b.h && b.y < a.y + a.h;
                    assert!(!(overlap_x && overlap_y), "{kind:?}: {a:?} overlaps {b:?}");
                }
            }
        }
    }
}
