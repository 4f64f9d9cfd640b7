// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spatial pager: adaptive quadtree subdivision driven by count probes.
//!
//! ## Resolution
//!
//! Every navigation call aims at one frontier page and walks from there:
//!
//! 1. If the page's feature count is unknown, probe it with
//!    `base AND BBOX(page)`. Probes of one navigation run strictly one after
//!    another.
//! 2. An empty page is pruned (unless it is the only one) and the walk moves
//!    to its neighbour in the direction of travel.
//! 3. A page with at most `max_features` features is the answer.
//! 4. An oversized page is replaced in place by its four quadrants and the
//!    walk continues with the quadrant holding the requested point, or the
//!    first (forward) or last (backward) quadrant.
//!
//! Known counts are reused, so returning to a page never probes it again.
//!
//! ## Concurrency
//!
//! The pager state sits behind a mutex that is never held across a probe.
//! One navigation may be in flight at a time; others fail with
//! [`PagerError::Busy`]. [`SpatialPager::set_base_filter`] starts a new
//! generation, and a probe answering for an older generation is discarded
//! with [`PagerError::Superseded`].

use kurbo::Point;
use parking_lot::Mutex;
use tracing::Instrument;
use understory_page_tree::{Extent, PageId, PageTree, SplitError};

use crate::error::{PagerError, Result};
use crate::filter::Filter;
use crate::flight::{FlightGuard, FlightSlot, Flighted};
use crate::page::{Direction, Page, PageRequest};
use crate::source::{HitCounter, LoadWindow};

#[derive(Debug)]
enum Query {
    Unset,
    /// Feature-id filters are passed through as a single page.
    ById(Filter),
    Spatial(Filter),
}

#[derive(Debug)]
struct SpatialState {
    query: Query,
    tree: Option<PageTree>,
    cursor: Option<PageId>,
    by_id_visited: bool,
    generation: u64,
    flight: FlightSlot,
}

impl Flighted for SpatialState {
    fn flight(&mut self) -> &mut FlightSlot {
        &mut self.flight
    }
}

/// Where the resolution walk currently aims.
#[derive(Copy, Clone, Debug)]
struct Seek {
    index: usize,
    direction: Direction,
    point: Option<Point>,
}

impl Seek {
    fn new(request: PageRequest, tree: &PageTree, cursor: Option<PageId>) -> Self {
        let len = tree.len().max(1);
        let current = cursor.and_then(|id| tree.position(id));
        let (index, point) = match request {
            PageRequest::Index(i) => (i % len, None),
            PageRequest::Point(p) => {
                let i = tree.locate(p).or_else(|| tree.nearest(p)).unwrap_or(0);
                (i, Some(p))
            }
            PageRequest::Last => (len - 1, None),
            PageRequest::Next => (current.map_or(0, |c| (c + 1) % len), None),
            PageRequest::Previous => (current.map_or(len - 1, |c| (c + len - 1) % len), None),
            PageRequest::Current => (current.unwrap_or(0), None),
        };
        Self {
            index,
            direction: request.direction(),
            point,
        }
    }

    /// Aim at the neighbour of the page just pruned from `pos`.
    fn retarget_after_prune(&mut self, pos: usize, len: usize) {
        self.point = None;
        self.index = match self.direction {
            Direction::Forward if pos >= len => 0,
            Direction::Forward => pos,
            Direction::Backward => (pos + len - 1) % len,
        };
    }
}

/// Next move of the resolution walk, decided under the lock.
enum Step {
    Probe {
        id: PageId,
        extent: Extent,
        filter: Filter,
    },
    Again,
    Resolved(Page),
}

/// Pager that subdivides the query extent until pages are small enough.
///
/// ```
/// use understory_pager::{Filter, MemoryFeature, MemorySource, SpatialPager};
/// use understory_page_tree::Extent;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), understory_pager::PagerError> {
/// let source = MemorySource::new((0..30_u32).map(|i| {
///     MemoryFeature::new(format!("f{i}"), f64::from(i) * 3.0, f64::from(i) * 3.0)
/// }));
/// let pager = SpatialPager::new(10, 24);
/// pager.set_base_filter(Filter::All, Extent::new(0.0, 0.0, 100.0, 100.0));
///
/// let first = pager.goto_index(&source, 0).await?;
/// assert!(first.feature_count.unwrap() <= 10);
/// let second = pager.next(&source).await?;
/// assert_ne!(first.extent, second.extent);
/// # Ok(())
/// # }
/// ```
pub struct SpatialPager {
    max_features: u64,
    max_depth: u8,
    state: Mutex<SpatialState>,
}

impl core::fmt::Debug for SpatialPager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let st = self.state.lock();
        f.debug_struct("SpatialPager")
            .field("max_features", &self.max_features)
            .field("max_depth", &self.max_depth)
            .field("generation", &st.generation)
            .field("tree", &st.tree)
            .field("cursor", &st.cursor)
            .finish_non_exhaustive()
    }
}

impl SpatialPager {
    /// Create a pager splitting pages above `max_features`, at most
    /// `max_depth` levels below the root.
    pub fn new(max_features: u64, max_depth: u8) -> Self {
        Self {
            max_features,
            max_depth,
            state: Mutex::new(SpatialState {
                query: Query::Unset,
                tree: None,
                cursor: None,
                by_id_visited: false,
                generation: 0,
                flight: FlightSlot::default(),
            }),
        }
    }

    /// Split threshold.
    pub fn max_features(&self) -> u64 {
        self.max_features
    }

    /// Start a new query.
    ///
    /// The root page is `query_extent` narrowed by any bbox already in
    /// `filter`. The frontier becomes that single, unprobed root and the
    /// cursor is cleared. Any navigation still in flight is superseded.
    pub fn set_base_filter(&self, filter: Filter, query_extent: Extent) {
        let mut guard = self.state.lock();
        let st = &mut *guard;
        st.generation += 1;
        st.cursor = None;
        st.by_id_visited = false;
        st.flight.clear();
        if filter.is_feature_id() {
            tracing::info!(
                generation = st.generation,
                %filter,
                "feature-id filter, spatial subdivision bypassed"
            );
            st.query = Query::ById(filter);
            return;
        }
        let root = root_extent(&filter, query_extent);
        if let Some(tree) = st.tree.as_mut() {
            tree.reset(root);
        } else {
            st.tree = Some(PageTree::new(root, self.max_depth));
        }
        tracing::info!(generation = st.generation, %root, %filter, "spatial paging reset");
        st.query = Query::Spatial(filter);
    }

    /// Resolve `request` to a page holding at most `max_features` features.
    ///
    /// Empty regions met on the way are pruned silently. Fails with
    /// [`PagerError::Probe`] when a count request fails, in which case the
    /// frontier and cursor are restored to their state before the call.
    pub async fn resolve<H>(&self, counter: &H, request: PageRequest) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        let _flight = FlightGuard::acquire(&self.state)?;
        let span = tracing::debug_span!("resolve_page", ?request);
        self.resolve_in_flight(counter, request)
            .instrument(span)
            .await
    }

    /// Go to the page at `index`, wrapped around the frontier length.
    pub async fn goto_index<H>(&self, counter: &H, index: usize) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        self.resolve(counter, PageRequest::Index(index)).await
    }

    /// Go to the page containing `point`, or the nearest page when the point
    /// lies in a pruned region or outside the query extent.
    pub async fn goto_point<H>(&self, counter: &H, point: Point) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        self.resolve(counter, PageRequest::Point(point)).await
    }

    /// Go to the last page.
    pub async fn goto_last<H>(&self, counter: &H) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        self.resolve(counter, PageRequest::Last).await
    }

    /// Go to the page after the cursor, wrapping to the first.
    pub async fn next<H>(&self, counter: &H) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        self.resolve(counter, PageRequest::Next).await
    }

    /// Go to the page before the cursor, wrapping to the last.
    pub async fn previous<H>(&self, counter: &H) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        self.resolve(counter, PageRequest::Previous).await
    }

    /// Resolve the page under the cursor again.
    pub async fn current<H>(&self, counter: &H) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        self.resolve(counter, PageRequest::Current).await
    }

    /// Query generation; bumped by every [`SpatialPager::set_base_filter`].
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Whether a navigation is in flight.
    pub fn is_resolving(&self) -> bool {
        self.state.lock().flight.is_active()
    }

    /// Whether the current filter bypasses spatial subdivision.
    pub fn is_bypassed(&self) -> bool {
        matches!(self.state.lock().query, Query::ById(_))
    }

    /// The current base filter.
    pub fn base_filter(&self) -> Option<Filter> {
        match &self.state.lock().query {
            Query::Unset => None,
            Query::ById(f) | Query::Spatial(f) => Some(f.clone()),
        }
    }

    /// Number of currently known pages.
    pub fn page_count(&self) -> Option<usize> {
        let st = self.state.lock();
        match st.query {
            Query::Unset => None,
            Query::ById(_) => Some(1),
            Query::Spatial(_) => st.tree.as_ref().map(PageTree::len),
        }
    }

    /// Extents of the frontier pages, in page order.
    pub fn frontier_extents(&self) -> Vec<Extent> {
        let st = self.state.lock();
        match (&st.query, &st.tree) {
            (Query::Spatial(_), Some(tree)) => tree.leaves().map(|(_, n)| n.extent).collect(),
            _ => Vec::new(),
        }
    }

    /// A copy of the page tree, for inspection.
    pub fn tree_snapshot(&self) -> Option<PageTree> {
        let st = self.state.lock();
        match st.query {
            Query::Spatial(_) => st.tree.clone(),
            _ => None,
        }
    }

    /// The page under the cursor, if a navigation has resolved one.
    pub fn current_page(&self) -> Option<Page> {
        let st = self.state.lock();
        match &st.query {
            Query::Unset => None,
            Query::ById(filter) => st.by_id_visited.then(|| Page::whole(filter.clone())),
            Query::Spatial(base) => {
                let tree = st.tree.as_ref()?;
                leaf_page(tree, base, st.cursor?)
            }
        }
    }

    async fn resolve_in_flight<H>(&self, counter: &H, request: PageRequest) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        let (generation, checkpoint, mut seek) = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            match &st.query {
                Query::Unset => return Err(PagerError::Uninitialized),
                Query::ById(filter) => {
                    st.by_id_visited = true;
                    return Ok(Page::whole(filter.clone()));
                }
                Query::Spatial(_) => {}
            }
            let tree = st.tree.as_mut().ok_or(PagerError::Uninitialized)?;
            let seek = Seek::new(request, tree, st.cursor);
            (st.generation, (tree.checkpoint(), st.cursor), seek)
        };

        loop {
            let step = {
                let mut guard = self.state.lock();
                self.step(&mut guard, generation, &mut seek)?
            };
            let (id, extent, filter) = match step {
                Step::Resolved(page) => return Ok(page),
                Step::Again => continue,
                Step::Probe { id, extent, filter } => (id, extent, filter),
            };

            tracing::debug!(%extent, %filter, "probing page");
            let counted = counter.count(&filter).await;

            let mut guard = self.state.lock();
            let st = &mut *guard;
            if st.generation != generation {
                tracing::debug!(%extent, "discarding probe for a replaced query");
                return Err(PagerError::Superseded);
            }
            match counted {
                Ok(count) => {
                    tracing::debug!(%extent, count, "probe answered");
                    if let Some(tree) = st.tree.as_mut() {
                        tree.set_feature_count(id, count);
                    }
                }
                Err(source) => {
                    tracing::warn!(%extent, error = %source, "probe failed, frontier restored");
                    let (mark, cursor) = checkpoint;
                    if let Some(tree) = st.tree.as_mut() {
                        tree.rollback(mark);
                    }
                    st.cursor = cursor;
                    return Err(PagerError::Probe {
                        extent: Some(extent),
                        source,
                    });
                }
            }
        }
    }

    fn step(&self, st: &mut SpatialState, generation: u64, seek: &mut Seek) -> Result<Step> {
        if st.generation != generation {
            return Err(PagerError::Superseded);
        }
        let (Query::Spatial(base), Some(tree)) = (&st.query, st.tree.as_mut()) else {
            return Err(PagerError::Superseded);
        };
        let index = seek.index.min(tree.len().saturating_sub(1));
        let id = tree.page_at(index).ok_or(PagerError::Superseded)?;
        let (extent, depth, count) = {
            let n = tree.get(id).ok_or(PagerError::Superseded)?;
            (n.extent, n.depth, n.feature_count)
        };

        let Some(count) = count else {
            return Ok(Step::Probe {
                id,
                extent,
                filter: base.clone().and(Filter::BBox(extent)),
            });
        };
        tracing::trace!(%extent, count, "count already known");

        if count == 0
            && let Some(pos) = tree.prune(id)
        {
            tracing::debug!(%extent, remaining = tree.len(), "pruned empty page");
            seek.retarget_after_prune(pos, tree.len());
            return Ok(Step::Again);
        }

        if count <= self.max_features {
            tree.commit();
            st.cursor = Some(id);
            let page = Page {
                index,
                page_count: tree.len(),
                filter: base.clone().and(Filter::BBox(extent)),
                extent: Some(extent),
                feature_count: Some(count),
                window: LoadWindow::ALL,
                id: Some(id),
            };
            tracing::debug!(index, page_count = page.page_count, %extent, count, "page resolved");
            return Ok(Step::Resolved(page));
        }

        let split = tree.split(id);
        if split.is_err() {
            tree.commit();
        }
        match split {
            Ok(_) => {
                let quadrant = match (seek.point.and_then(|p| extent.quadrant_of(p)), seek.direction) {
                    (Some(q), _) => q.index(),
                    (None, Direction::Forward) => 0,
                    (None, Direction::Backward) => 3,
                };
                // The children took over the parent's position.
                seek.index = index + quadrant;
                tracing::debug!(%extent, count, depth, "split oversized page");
                Ok(Step::Again)
            }
            Err(SplitError::Degenerate(extent)) => {
                tracing::warn!(%extent, count, "oversized page cannot be split");
                Err(PagerError::DegenerateSplit { extent })
            }
            Err(SplitError::TooDeep { extent, depth }) => {
                tracing::warn!(%extent, count, depth, "subdivision depth bound reached");
                Err(PagerError::RunawaySubdivision { extent, depth })
            }
            Err(SplitError::NotInFrontier) => Err(PagerError::Superseded),
        }
    }
}

/// Page for a frontier member.
fn leaf_page(tree: &PageTree, base: &Filter, id: PageId) -> Option<Page> {
    let index = tree.position(id)?;
    let node = tree.get(id)?;
    Some(Page {
        index,
        page_count: tree.len(),
        filter: base.clone().and(Filter::BBox(node.extent)),
        extent: Some(node.extent),
        feature_count: node.feature_count,
        window: LoadWindow::ALL,
        id: Some(id),
    })
}

/// The query extent narrowed by the filter's own bbox.
///
/// When the two are disjoint the filter's bbox wins; the query then matches
/// nothing and resolves to a single empty page.
fn root_extent(filter: &Filter, query_extent: Extent) -> Extent {
    match filter.bbox() {
        None => query_extent,
        Some(bbox) => query_extent.intersect(&bbox).unwrap_or(bbox),
    }
}
