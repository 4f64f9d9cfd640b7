// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Page arena and frontier: structure, splits, pruning, lookups.

use alloc::vec::Vec;
use kurbo::Point;

use crate::extent::Extent;
use crate::types::{PageFlags, PageId, PageNode};

/// Recommended bound on the number of splits between the root and a leaf.
pub const DEFAULT_MAX_DEPTH: u8 = 24;

/// Why [`PageTree::split`] refused to split a page.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SplitError {
    /// The page's extent has no area left to halve.
    Degenerate(Extent),
    /// The children would sit deeper than the tree's maximum depth.
    TooDeep {
        /// Extent of the page that could not be split.
        extent: Extent,
        /// Depth of that page.
        depth: u8,
    },
    /// The id is stale or the page is not a frontier member.
    NotInFrontier,
}

impl core::fmt::Display for SplitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Degenerate(extent) => write!(f, "cannot split degenerate extent {extent}"),
            Self::TooDeep { extent, depth } => {
                write!(f, "page {extent} at depth {depth} reached the depth bound")
            }
            Self::NotInFrontier => f.write_str("page is not a frontier member"),
        }
    }
}

impl core::error::Error for SplitError {}

/// A tree state that [`PageTree::rollback`] can return to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    generation: u32,
    nodes: usize,
}

/// One reversible edit, recorded while a checkpoint is open.
#[derive(Copy, Clone, Debug)]
enum Undo {
    Count { id: PageId, old: Option<u64> },
    Split { id: PageId, pos: usize },
    Prune { id: PageId, pos: usize },
}

/// Quadtree of pages, grown lazily by splitting frontier members.
///
/// Nodes live in a flat arena; the frontier is an ordered list of arena
/// handles. Splitting replaces one frontier entry with its four children at
/// the same position, so the relative order of every other member is kept.
#[derive(Clone)]
pub struct PageTree {
    nodes: Vec<PageNode>,
    frontier: Vec<PageId>,
    generation: u32,
    max_depth: u8,
    journal: Option<Vec<Undo>>,
}

impl core::fmt::Debug for PageTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let pruned = self
            .nodes
            .iter()
            .filter(|n| n.flags.contains(PageFlags::PRUNED))
            .count();
        f.debug_struct("PageTree")
            .field("nodes_total", &self.nodes.len())
            .field("frontier", &self.frontier.len())
            .field("pruned", &pruned)
            .field("generation", &self.generation)
            .field("max_depth", &self.max_depth)
            .field("journal", &self.journal.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

impl PageTree {
    /// Create a tree whose frontier is the single page `root`.
    pub fn new(root: Extent, max_depth: u8) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            frontier: Vec::new(),
            generation: 0,
            max_depth,
            journal: None,
        };
        tree.reset(root);
        tree
    }

    /// Forget every page and restart from `root` with an unknown count.
    ///
    /// Starts a new generation: ids handed out before the reset become stale.
    /// Behavior on generation overflow is unspecified.
    pub fn reset(&mut self, root: Extent) {
        self.generation = self.generation.wrapping_add(1);
        self.nodes.clear();
        self.frontier.clear();
        self.journal = None;
        let id = self.push(PageNode::new(root, None, 0));
        self.frontier.push(id);
    }

    /// Current generation; bumped by every [`PageTree::reset`].
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Maximum number of splits between the root and any page.
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// The root page of the current generation.
    pub fn root(&self) -> PageId {
        PageId::new(0, self.generation)
    }

    /// Ordered frontier handles.
    pub fn frontier(&self) -> &[PageId] {
        &self.frontier
    }

    /// Number of frontier pages.
    pub fn len(&self) -> usize {
        self.frontier.len()
    }

    /// Whether the frontier is empty. Only a tree that was never reset can be.
    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Number of pages ever created in this generation, pruned and split ones included.
    pub fn nodes_total(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if `id` refers to a page of the current generation.
    pub fn is_alive(&self, id: PageId) -> bool {
        id.generation() == self.generation && id.idx() < self.nodes.len()
    }

    /// Look up a page.
    pub fn get(&self, id: PageId) -> Option<&PageNode> {
        if !self.is_alive(id) {
            return None;
        }
        self.nodes.get(id.idx())
    }

    /// Children of a split page.
    pub fn children(&self, id: PageId) -> Option<[PageId; 4]> {
        self.get(id)?.children
    }

    /// Frontier position of `id`, if it is a member.
    pub fn position(&self, id: PageId) -> Option<usize> {
        if !self.is_alive(id) {
            return None;
        }
        self.frontier.iter().position(|f| *f == id)
    }

    /// Frontier handle at `index`.
    pub fn page_at(&self, index: usize) -> Option<PageId> {
        self.frontier.get(index).copied()
    }

    /// Wrap a signed index around the frontier ends.
    ///
    /// Returns 0 for an empty frontier.
    pub fn wrap_index(&self, index: isize) -> usize {
        if self.frontier.is_empty() {
            return 0;
        }
        #[allow(
            clippy::cast_possible_wrap,
            reason = "Frontier length is bounded by memory, far below isize::MAX."
        )]
        let len = self.frontier.len() as isize;
        #[allow(
            clippy::cast_sign_loss,
            reason = "rem_euclid with a positive modulus is non-negative."
        )]
        let wrapped = index.rem_euclid(len) as usize;
        wrapped
    }

    /// Frontier pages in order.
    pub fn leaves(&self) -> impl Iterator<Item = (PageId, &PageNode)> + '_ {
        self.frontier.iter().map(|id| (*id, self.node(*id)))
    }

    /// Record the result of a count probe. Returns false for a stale id.
    pub fn set_feature_count(&mut self, id: PageId, count: u64) -> bool {
        let Some(old) = self.get(id).map(|n| n.feature_count) else {
            return false;
        };
        self.record(Undo::Count { id, old });
        self.node_mut(id).feature_count = Some(count);
        true
    }

    /// Replace a frontier page by its four quadrants, in place.
    pub fn split(&mut self, id: PageId) -> Result<[PageId; 4], SplitError> {
        let pos = self.position(id).ok_or(SplitError::NotInFrontier)?;
        let (extent, depth) = {
            let n = self.node(id);
            (n.extent, n.depth)
        };
        if depth >= self.max_depth {
            return Err(SplitError::TooDeep { extent, depth });
        }
        let quads = extent.split().ok_or(SplitError::Degenerate(extent))?;
        let children = quads.map(|q| self.push(PageNode::new(q, Some(id), depth + 1)));
        self.frontier.splice(pos..=pos, children);
        self.record(Undo::Split { id, pos });
        let n = self.node_mut(id);
        n.children = Some(children);
        n.flags.remove(PageFlags::FRONTIER);
        n.flags.insert(PageFlags::SPLIT);
        Ok(children)
    }

    /// Remove a page from the frontier and return its former position.
    ///
    /// The sole remaining page is never pruned. Pruned pages stay in the
    /// arena, flagged [`PageFlags::PRUNED`], and never rejoin the frontier.
    pub fn prune(&mut self, id: PageId) -> Option<usize> {
        if self.frontier.len() <= 1 {
            return None;
        }
        let pos = self.position(id)?;
        self.frontier.remove(pos);
        self.record(Undo::Prune { id, pos });
        let n = self.node_mut(id);
        n.flags.remove(PageFlags::FRONTIER);
        n.flags.insert(PageFlags::PRUNED);
        Some(pos)
    }

    /// First frontier position whose extent contains `pt`.
    pub fn locate(&self, pt: Point) -> Option<usize> {
        self.frontier
            .iter()
            .position(|id| self.node(*id).extent.contains(pt))
    }

    /// Frontier position closest to `pt`; the first wins on ties.
    pub fn nearest(&self, pt: Point) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, id) in self.frontier.iter().enumerate() {
            let d = self.node(*id).extent.distance_squared_to(pt);
            match best {
                Some((_, bd)) if bd <= d => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Start recording edits so [`PageTree::rollback`] can undo them.
    ///
    /// Replaces any checkpoint still open. Undoing costs time proportional
    /// to the edits made since, not to the size of the tree.
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.journal = Some(Vec::new());
        Checkpoint {
            generation: self.generation,
            nodes: self.nodes.len(),
        }
    }

    /// Keep every edit since the open checkpoint and stop recording.
    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Undo every count, split and prune since `checkpoint`.
    ///
    /// Pages created since are dropped from the arena. Returns false, and
    /// changes nothing, when the tree was reset in between or the checkpoint
    /// is no longer open.
    pub fn rollback(&mut self, checkpoint: Checkpoint) -> bool {
        if checkpoint.generation != self.generation {
            return false;
        }
        let Some(journal) = self.journal.take() else {
            return false;
        };
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Count { id, old } => self.node_mut(id).feature_count = old,
                Undo::Split { id, pos } => {
                    self.frontier.splice(pos..pos + 4, [id]);
                    let n = self.node_mut(id);
                    n.children = None;
                    n.flags.remove(PageFlags::SPLIT);
                    n.flags.insert(PageFlags::FRONTIER);
                }
                Undo::Prune { id, pos } => {
                    self.frontier.insert(pos, id);
                    let n = self.node_mut(id);
                    n.flags.remove(PageFlags::PRUNED);
                    n.flags.insert(PageFlags::FRONTIER);
                }
            }
        }
        self.nodes.truncate(checkpoint.nodes);
        true
    }

    // --- internals ---

    fn record(&mut self, undo: Undo) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(undo);
        }
    }

    fn push(&mut self, node: PageNode) -> PageId {
        self.nodes.push(node);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "PageId uses 32-bit slots; depth bounds keep trees far smaller."
        )]
        let idx = (self.nodes.len() - 1) as u32;
        PageId::new(idx, self.generation)
    }

    /// Access a page; panics if `id` is stale.
    pub(crate) fn node(&self, id: PageId) -> &PageNode {
        self.get(id).expect("dangling PageId")
    }

    fn node_mut(&mut self, id: PageId) -> &mut PageNode {
        self.node_opt_mut(id).expect("dangling PageId")
    }

    fn node_opt_mut(&mut self, id: PageId) -> Option<&mut PageNode> {
        if !self.is_alive(id) {
            return None;
        }
        self.nodes.get_mut(id.idx())
    }
}
