// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_page_tree --heading-base-level=0

//! Understory Page Tree: a Kurbo-native quadtree of feature pages.
//!
//! Understory Page Tree is the data structure behind spatial paging: browsing a
//! server-held feature collection one bounded region at a time.
//!
//! - [`Extent`] is an axis-aligned query-space rectangle with inclusive
//!   containment and a stable four-way [split](Extent::split).
//! - [`PageTree`] keeps every page in a flat arena and exposes an ordered
//!   *frontier*: the leaves a user can currently page through.
//! - Splitting a frontier page replaces it in place by its four quadrants;
//!   pruning removes an empty page for good.
//!
//! The tree does no I/O. Callers probe feature counts however they like (see
//! the `understory_pager` crate) and record them with
//! [`PageTree::set_feature_count`], then decide whether to split or prune.
//!
//! ## Ordering
//!
//! Quadrants are produced in [`Quadrant::ALL`] order: south-west, south-east,
//! north-west, north-east, with y growing north. Because splits happen in
//! place, this order fully determines what "page 0" and "the last page" are
//! for a given sequence of splits and prunes.
//!
//! ## Generations
//!
//! [`PageTree::reset`] empties the arena and bumps the tree generation.
//! [`PageId`]s carry the generation they were minted in, so handles from an
//! earlier query are detected as stale instead of aliasing new pages.
//!
//! # Example
//!
//! ```rust
//! use understory_page_tree::{Extent, PageTree, DEFAULT_MAX_DEPTH};
//! use kurbo::Point;
//!
//! let mut tree = PageTree::new(Extent::new(0.0, 0.0, 100.0, 100.0), DEFAULT_MAX_DEPTH);
//!
//! // The root holds too many features: replace it with its quadrants.
//! tree.set_feature_count(tree.root(), 42);
//! let [sw, _se, _nw, _ne] = tree.split(tree.root()).unwrap();
//! assert_eq!(tree.len(), 4);
//!
//! // The south-west quadrant turns out to be empty.
//! tree.set_feature_count(sw, 0);
//! assert_eq!(tree.prune(sw), Some(0));
//! assert_eq!(tree.len(), 3);
//!
//! // Find the page under a point.
//! let i = tree.locate(Point::new(75.0, 75.0)).unwrap();
//! let page = tree.get(tree.page_at(i).unwrap()).unwrap();
//! assert_eq!(page.extent, Extent::new(50.0, 50.0, 100.0, 100.0));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod extent;
pub mod tree;
pub mod types;

pub use extent::{Extent, Quadrant};
pub use tree::{Checkpoint, DEFAULT_MAX_DEPTH, PageTree, SplitError};
pub use types::{PageFlags, PageId, PageNode};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use kurbo::Point;

    /// Split every frontier page containing more than `max` of `points`.
    fn refine(tree: &mut PageTree, points: &[Point], max: u64) {
        let mut i = 0;
        while i < tree.len() {
            let id = tree.page_at(i).unwrap();
            let extent = tree.get(id).unwrap().extent;
            let n = points.iter().filter(|p| extent.contains(**p)).count() as u64;
            tree.set_feature_count(id, n);
            if n == 0 && tree.prune(id).is_some() {
                continue;
            }
            if n > max {
                tree.split(id).unwrap();
                continue;
            }
            i += 1;
        }
    }

    #[test]
    fn refined_frontier_respects_bound_and_covers_points() {
        let points: Vec<Point> = (0..40_u32)
            .map(|i| Point::new(f64::from(i % 8) * 3.0, f64::from(i / 8) * 7.0 + 1.0))
            .collect();
        let mut tree = PageTree::new(Extent::new(0.0, 0.0, 64.0, 64.0), DEFAULT_MAX_DEPTH);
        refine(&mut tree, &points, 5);

        for (_, page) in tree.leaves() {
            let n = page.feature_count.unwrap();
            assert!(n <= 5, "leaf {} holds {n} features", page.extent);
            assert!(n > 0, "empty leaves must have been pruned");
        }
        for p in &points {
            assert!(tree.locate(*p).is_some(), "{p:?} lost by pruning");
        }
    }

    #[test]
    fn pruned_regions_stay_out_of_the_frontier() {
        let points = [Point::new(90.0, 90.0), Point::new(95.0, 95.0)];
        let mut tree = PageTree::new(Extent::new(0.0, 0.0, 100.0, 100.0), DEFAULT_MAX_DEPTH);
        refine(&mut tree, &points, 1);
        let before = tree.len();
        refine(&mut tree, &points, 1);
        assert_eq!(tree.len(), before);
        assert!(tree.locate(Point::new(10.0, 10.0)).is_none());
    }
}
