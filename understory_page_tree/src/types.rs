// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the page tree: page identifiers, flags, and nodes.

use crate::extent::Extent;

/// Identifier for a page in a [`PageTree`](crate::PageTree).
///
/// A small, copyable handle made of an arena slot and the tree generation it
/// was created in.
///
/// ## Semantics
///
/// - Slots are never reused within a generation; pruning and splitting only
///   change flags and frontier membership.
/// - [`PageTree::reset`](crate::PageTree::reset) starts a new generation and
///   empties the arena, so every id from the previous query becomes stale.
/// - Stale ids never alias a live page because the generation must match.
///   Use [`PageTree::is_alive`](crate::PageTree::is_alive) to check.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PageId(pub(crate) u32, pub(crate) u32);

impl PageId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// The tree generation this id belongs to.
    pub const fn generation(self) -> u32 {
        self.1
    }
}

bitflags::bitflags! {
    /// Lifecycle flags of a page.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PageFlags: u8 {
        /// The page is currently a member of the frontier.
        const FRONTIER = 0b0000_0001;
        /// The page was replaced in the frontier by its four children.
        const SPLIT    = 0b0000_0010;
        /// The page was removed from the frontier because it holds no features.
        const PRUNED   = 0b0000_0100;
    }
}

/// A node of the page tree: a region plus what is known about its contents.
#[derive(Clone, Debug, PartialEq)]
pub struct PageNode {
    /// Region covered by this page.
    pub extent: Extent,
    /// Number of matching features, `None` until a count probe completes.
    pub feature_count: Option<u64>,
    /// Children in [`Quadrant::ALL`](crate::Quadrant::ALL) order once split.
    pub children: Option<[PageId; 4]>,
    /// Parent page; `None` for the root.
    pub parent: Option<PageId>,
    /// Number of splits between the root and this page.
    pub depth: u8,
    /// Lifecycle flags.
    pub flags: PageFlags,
}

impl PageNode {
    pub(crate) fn new(extent: Extent, parent: Option<PageId>, depth: u8) -> Self {
        Self {
            extent,
            feature_count: None,
            children: None,
            parent,
            depth,
            flags: PageFlags::FRONTIER,
        }
    }

    /// A page is a leaf until it has been split.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Whether the page is known to hold no features.
    pub fn is_empty(&self) -> bool {
        self.feature_count == Some(0)
    }

    /// Whether the page is known to hold more than `max_features` features.
    pub fn is_oversized(&self, max_features: u64) -> bool {
        self.feature_count.is_some_and(|n| n > max_features)
    }
}
