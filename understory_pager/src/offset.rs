// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Offset pager: fixed-size windows over a single total count.
//!
//! Used when the source supports offset/limit natively, or as the fallback
//! for data that subdivision cannot separate (many coincident features).
//! The total is probed once per base filter; page `i` covers
//! `[i * max_features, (i + 1) * max_features)`.

use parking_lot::Mutex;
use tracing::Instrument;

use crate::error::{PagerError, Result};
use crate::filter::Filter;
use crate::flight::{FlightGuard, FlightSlot, Flighted};
use crate::page::{Page, PageRequest};
use crate::source::{HitCounter, LoadWindow};

#[derive(Debug, Default)]
struct OffsetState {
    base: Option<Filter>,
    total: Option<u64>,
    cursor: Option<usize>,
    generation: u64,
    flight: FlightSlot,
}

impl Flighted for OffsetState {
    fn flight(&mut self) -> &mut FlightSlot {
        &mut self.flight
    }
}

/// Pager over `offset`/`limit` windows.
pub struct OffsetPager {
    max_features: u64,
    state: Mutex<OffsetState>,
}

impl core::fmt::Debug for OffsetPager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let st = self.state.lock();
        f.debug_struct("OffsetPager")
            .field("max_features", &self.max_features)
            .field("generation", &st.generation)
            .field("total", &st.total)
            .field("cursor", &st.cursor)
            .finish_non_exhaustive()
    }
}

impl OffsetPager {
    /// Create a pager with pages of `max_features` features.
    ///
    /// A page size of zero is treated as one.
    pub fn new(max_features: u64) -> Self {
        Self {
            max_features: max_features.max(1),
            state: Mutex::new(OffsetState::default()),
        }
    }

    /// Page size.
    pub fn max_features(&self) -> u64 {
        self.max_features
    }

    /// Replace the base filter without probing.
    ///
    /// The total becomes unknown and is probed by the next navigation.
    pub fn reset(&self, filter: Filter) {
        let mut st = self.state.lock();
        st.generation += 1;
        st.total = None;
        st.cursor = None;
        st.flight.clear();
        tracing::info!(generation = st.generation, %filter, "offset paging reset");
        st.base = Some(filter);
    }

    /// Replace the base filter and probe the total count.
    ///
    /// On a failed probe the filter is still replaced and the total stays
    /// unknown.
    pub async fn set_base_filter<H>(&self, counter: &H, filter: Filter) -> Result<u64>
    where
        H: HitCounter + ?Sized,
    {
        self.reset(filter);
        let _flight = FlightGuard::acquire(&self.state)?;
        self.ensure_total(counter)
            .instrument(tracing::debug_span!("offset_total"))
            .await
    }

    /// Resolve `request` to a window of the total.
    ///
    /// [`PageRequest::Point`] carries no meaning here and resolves like
    /// [`PageRequest::Current`].
    pub async fn resolve<H>(&self, counter: &H, request: PageRequest) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        let _flight = FlightGuard::acquire(&self.state)?;
        let span = tracing::debug_span!("resolve_offset_page", ?request);
        self.resolve_in_flight(counter, request)
            .instrument(span)
            .await
    }

    /// Go to page `index`, wrapped around the page count.
    pub async fn goto_index<H>(&self, counter: &H, index: usize) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        self.resolve(counter, PageRequest::Index(index)).await
    }

    /// Go to the last page.
    pub async fn goto_last<H>(&self, counter: &H) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        self.resolve(counter, PageRequest::Last).await
    }

    /// Go to the next page, wrapping to the first.
    pub async fn next<H>(&self, counter: &H) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        self.resolve(counter, PageRequest::Next).await
    }

    /// Go to the previous page, wrapping to the last.
    pub async fn previous<H>(&self, counter: &H) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        self.resolve(counter, PageRequest::Previous).await
    }

    /// Query generation.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Whether a navigation is in flight.
    pub fn is_resolving(&self) -> bool {
        self.state.lock().flight.is_active()
    }

    /// The current base filter.
    pub fn base_filter(&self) -> Option<Filter> {
        self.state.lock().base.clone()
    }

    /// Total matching features, once probed.
    pub fn total(&self) -> Option<u64> {
        self.state.lock().total
    }

    /// Number of pages, once the total is known.
    pub fn page_count(&self) -> Option<usize> {
        self.state.lock().total.map(|t| self.page_count_for(t))
    }

    /// The page under the cursor.
    pub fn current_page(&self) -> Option<Page> {
        let st = self.state.lock();
        let (base, total, index) = (st.base.clone()?, st.total?, st.cursor?);
        Some(self.page(base, total, index, self.page_count_for(total)))
    }

    async fn resolve_in_flight<H>(&self, counter: &H, request: PageRequest) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        let generation = self.state.lock().generation;
        let total = self.ensure_total(counter).await?;

        let mut st = self.state.lock();
        if st.generation != generation {
            return Err(PagerError::Superseded);
        }
        let base = st.base.clone().ok_or(PagerError::Uninitialized)?;
        let page_count = self.page_count_for(total);
        let index = match request {
            PageRequest::Index(i) => i % page_count,
            PageRequest::Last => page_count - 1,
            PageRequest::Next => st.cursor.map_or(0, |c| (c + 1) % page_count),
            PageRequest::Previous => st
                .cursor
                .map_or(page_count - 1, |c| (c + page_count - 1) % page_count),
            PageRequest::Point(_) | PageRequest::Current => {
                st.cursor.unwrap_or(0).min(page_count - 1)
            }
        };
        st.cursor = Some(index);
        tracing::debug!(index, page_count, total, "offset page resolved");
        Ok(self.page(base, total, index, page_count))
    }

    async fn ensure_total<H>(&self, counter: &H) -> Result<u64>
    where
        H: HitCounter + ?Sized,
    {
        let (generation, base) = {
            let st = self.state.lock();
            if let Some(total) = st.total {
                tracing::trace!(total, "total already known");
                return Ok(total);
            }
            (st.generation, st.base.clone().ok_or(PagerError::Uninitialized)?)
        };

        tracing::debug!(filter = %base, "probing total count");
        let counted = counter.count(&base).await;

        let mut st = self.state.lock();
        if st.generation != generation {
            return Err(PagerError::Superseded);
        }
        match counted {
            Ok(total) => {
                tracing::debug!(total, pages = self.page_count_for(total), "total count known");
                st.total = Some(total);
                Ok(total)
            }
            Err(source) => {
                tracing::warn!(error = %source, "total count probe failed");
                Err(PagerError::Probe {
                    extent: None,
                    source,
                })
            }
        }
    }

    fn page_count_for(&self, total: u64) -> usize {
        usize::try_from(total.div_ceil(self.max_features))
            .unwrap_or(usize::MAX)
            .max(1)
    }

    fn page(&self, filter: Filter, total: u64, index: usize, page_count: usize) -> Page {
        let offset = u64::try_from(index)
            .unwrap_or(u64::MAX)
            .saturating_mul(self.max_features);
        Page {
            index,
            page_count,
            filter,
            extent: None,
            feature_count: Some(total.saturating_sub(offset).min(self.max_features)),
            window: LoadWindow::new(offset, self.max_features),
            id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use std::result::Result;
    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    struct FixedCounter {
        total: u64,
        fail: bool,
        probes: Mutex<usize>,
    }

    impl FixedCounter {
        fn new(total: u64) -> Self {
            Self {
                total,
                fail: false,
                probes: Mutex::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(0)
            }
        }
    }

    #[async_trait]
    impl HitCounter for FixedCounter {
        async fn count(&self, _filter: &Filter) -> Result<u64, SourceError> {
            *self.probes.lock() += 1;
            if self.fail {
                Err(SourceError::Timeout)
            } else {
                Ok(self.total)
            }
        }
    }

    /// Holds every probe until a permit is released.
    struct GatedCounter {
        gate: Semaphore,
        total: u64,
    }

    impl GatedCounter {
        fn new(total: u64) -> Self {
            Self {
                gate: Semaphore::new(0),
                total,
            }
        }
    }

    #[async_trait]
    impl HitCounter for GatedCounter {
        async fn count(&self, _filter: &Filter) -> Result<u64, SourceError> {
            self.gate
                .acquire()
                .await
                .map_err(|_| SourceError::Request("gate closed".into()))?
                .forget();
            Ok(self.total)
        }
    }

    #[tokio::test]
    async fn forty_five_features_in_pages_of_twenty() {
        let counter = FixedCounter::new(45);
        let p = OffsetPager::new(20);
        assert_eq!(p.set_base_filter(&counter, Filter::All).await, Ok(45));
        assert_eq!(p.page_count(), Some(3));

        let page = p.goto_index(&counter, 2).await.unwrap();
        assert_eq!(page.window, LoadWindow::new(40, 20));
        assert_eq!(page.feature_count, Some(5));
        assert_eq!(page.page_count, 3);
        assert!(page.is_last());
        assert_eq!(*counter.probes.lock(), 1, "total probed once");
    }

    #[tokio::test]
    async fn navigation_wraps_both_ways() {
        let counter = FixedCounter::new(45);
        let p = OffsetPager::new(20);
        p.set_base_filter(&counter, Filter::All).await.unwrap();

        assert_eq!(p.next(&counter).await.unwrap().index, 0);
        assert_eq!(p.previous(&counter).await.unwrap().index, 2);
        assert_eq!(p.next(&counter).await.unwrap().index, 0);
        assert_eq!(p.goto_index(&counter, 7).await.unwrap().index, 1);
        assert_eq!(p.goto_last(&counter).await.unwrap().index, 2);
        let current = p
            .resolve(&counter, PageRequest::Point(kurbo::Point::new(1.0, 1.0)))
            .await
            .unwrap();
        assert_eq!(current.index, 2);
        assert_eq!(p.current_page(), Some(current));
    }

    #[tokio::test]
    async fn empty_result_is_one_empty_page() {
        let counter = FixedCounter::new(0);
        let p = OffsetPager::new(20);
        p.set_base_filter(&counter, Filter::All).await.unwrap();
        let page = p.goto_last(&counter).await.unwrap();
        assert_eq!(page.index, 0);
        assert_eq!(page.page_count, 1);
        assert_eq!(page.feature_count, Some(0));
    }

    #[tokio::test]
    async fn failed_total_is_probed_again_lazily() {
        let p = OffsetPager::new(20);
        let err = p
            .set_base_filter(&FixedCounter::failing(), Filter::All)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PagerError::Probe {
                extent: None,
                source: SourceError::Timeout
            }
        );
        assert_eq!(p.total(), None);
        assert!(p.base_filter().is_some());

        let counter = FixedCounter::new(21);
        let page = p.next(&counter).await.unwrap();
        assert_eq!(page.index, 0);
        assert_eq!(p.page_count(), Some(2));
    }

    #[tokio::test]
    async fn navigation_needs_a_base_filter() {
        let p = OffsetPager::new(20);
        assert_eq!(
            p.next(&FixedCounter::new(3)).await.unwrap_err(),
            PagerError::Uninitialized
        );
    }

    #[tokio::test]
    async fn reset_forgets_total_and_cursor() {
        let counter = FixedCounter::new(100);
        let p = OffsetPager::new(20);
        p.set_base_filter(&counter, Filter::All).await.unwrap();
        p.goto_index(&counter, 3).await.unwrap();
        let g = p.generation();

        p.reset(Filter::equals("kind", "tree"));
        assert_eq!(p.generation(), g + 1);
        assert_eq!(p.total(), None);
        assert_eq!(p.current_page(), None);
    }

    #[tokio::test]
    async fn navigation_during_total_count_is_busy_and_reset_supersedes() {
        let counter = GatedCounter::new(45);
        let p = OffsetPager::new(20);

        let (first, ()) = tokio::join!(p.set_base_filter(&counter, Filter::All), async {
            tokio::task::yield_now().await;
            assert!(p.is_resolving());
            assert_eq!(p.next(&counter).await.unwrap_err(), PagerError::Busy);
            p.reset(Filter::equals("kind", "oak"));
            assert!(!p.is_resolving());
            counter.gate.add_permits(1);
        });
        assert_eq!(first.unwrap_err(), PagerError::Superseded);
        assert_eq!(p.total(), None);
        assert_eq!(p.base_filter(), Some(Filter::equals("kind", "oak")));

        counter.gate.add_permits(1);
        let page = p.next(&counter).await.unwrap();
        assert_eq!(page.index, 0);
        assert_eq!(page.page_count, 3);
    }

    #[tokio::test]
    async fn navigation_waiting_on_the_total_is_superseded_by_reset() {
        let counter = GatedCounter::new(45);
        let p = OffsetPager::new(20);
        p.reset(Filter::All);

        let (first, ()) = tokio::join!(p.goto_index(&counter, 1), async {
            tokio::task::yield_now().await;
            p.reset(Filter::All);
            counter.gate.add_permits(1);
        });
        assert_eq!(first.unwrap_err(), PagerError::Superseded);
        assert_eq!(p.total(), None);
        assert_eq!(p.current_page(), None);
    }
}
