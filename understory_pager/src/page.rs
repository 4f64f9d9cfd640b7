// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Navigation requests and the pages they resolve to.

use kurbo::Point;
use understory_page_tree::{Extent, PageId};

use crate::filter::Filter;
use crate::source::LoadWindow;

/// Which page a navigation call wants.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PageRequest {
    /// The page at this index, wrapped around the page count.
    Index(usize),
    /// The page containing this query-space point.
    Point(Point),
    /// The last page.
    Last,
    /// The page after the cursor, wrapping to the first.
    Next,
    /// The page before the cursor, wrapping to the last.
    Previous,
    /// The page under the cursor again, or the first page.
    Current,
}

/// Traversal direction of a request; decides which neighbour replaces a
/// pruned page and which child of a split page is taken.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Backward,
}

impl PageRequest {
    pub(crate) fn direction(self) -> Direction {
        match self {
            Self::Last | Self::Previous => Direction::Backward,
            _ => Direction::Forward,
        }
    }
}

/// A resolved page: what to load and where it sits among its siblings.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    /// Position among the currently known pages.
    pub index: usize,
    /// Number of currently known pages.
    ///
    /// In spatial mode this grows as pages split and shrinks as empty ones
    /// are pruned.
    pub page_count: usize,
    /// Effective filter to load the page with.
    pub filter: Filter,
    /// Region of a spatial page.
    ///
    /// Edges are inclusive, so a feature lying exactly on the border between
    /// pages is counted and loaded on each of them.
    pub extent: Option<Extent>,
    /// Number of features on the page, when known.
    pub feature_count: Option<u64>,
    /// Offset/limit window to load the page with.
    pub window: LoadWindow,
    /// Page tree handle of a spatial page.
    pub id: Option<PageId>,
}

impl Page {
    /// The single page of a query that is not subdivided.
    pub(crate) fn whole(filter: Filter) -> Self {
        Self {
            index: 0,
            page_count: 1,
            filter,
            extent: None,
            feature_count: None,
            window: LoadWindow::ALL,
            id: None,
        }
    }

    /// Whether this is the last of the known pages.
    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.page_count
    }
}
