// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paging controller: resolves pages, tells listeners, loads features.

use std::sync::Arc;

use kurbo::Point;
use parking_lot::RwLock;
use tracing::Instrument;
use understory_page_tree::Extent;

use crate::config::{PagingConfig, PagingMode};
use crate::error::{PagerError, Result};
use crate::filter::Filter;
use crate::page::{Page, PageRequest};
use crate::source::{FeatureBatch, FeatureSource};
use crate::strategy::PagingStrategy;

/// Sent to listeners whenever a navigation resolves a page, before its
/// features are loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct PageChange {
    /// Index of the new page.
    pub index: usize,
    /// Number of currently known pages.
    pub page_count: usize,
    /// Extent of a spatial page.
    pub extent: Option<Extent>,
    /// Extent the map should zoom to, when auto-zoom is on.
    pub zoom_to: Option<Extent>,
    /// Feature count of the page, when known.
    pub feature_count: Option<u64>,
    /// Mode the page was resolved in.
    pub mode: PagingMode,
}

/// A resolved page and its features.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedPage<F> {
    /// The page.
    pub page: Page,
    /// Its features.
    pub features: FeatureBatch<F>,
}

type Listener = Box<dyn Fn(&PageChange) + Send + Sync>;

/// Drives one layer's paging against a [`FeatureSource`].
///
/// ```
/// use std::sync::Arc;
///
/// use kurbo::Point;
/// use understory_pager::{Filter, MemorySource, PagingConfig, PagingController};
/// use understory_page_tree::Extent;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), understory_pager::PagerError> {
/// let source = Arc::new(MemorySource::from_points(
///     (0..200_u32).map(|i| Point::new(f64::from(i % 20) * 5.0 + 1.0, f64::from(i / 20) * 10.0 + 1.0)),
/// ));
/// let controller = PagingController::new(source, PagingConfig::default().with_max_features(50))?;
/// controller
///     .set_query(Filter::All, Extent::new(0.0, 0.0, 100.0, 100.0))
///     .await?;
///
/// let loaded = controller.next_page().await?;
/// assert!(loaded.features.len() <= 50);
/// # Ok(())
/// # }
/// ```
pub struct PagingController<S: FeatureSource> {
    source: Arc<S>,
    config: PagingConfig,
    strategy: PagingStrategy,
    listeners: RwLock<Vec<Listener>>,
}

impl<S: FeatureSource> core::fmt::Debug for PagingController<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PagingController")
            .field("config", &self.config)
            .field("strategy", &self.strategy)
            .field("listeners", &self.listeners.read().len())
            .finish_non_exhaustive()
    }
}

impl<S: FeatureSource> PagingController<S> {
    /// Create a controller using the pager `config` selects.
    pub fn new(source: Arc<S>, config: PagingConfig) -> Result<Self> {
        config.validate()?;
        let strategy = PagingStrategy::from_config(&config);
        tracing::debug!(mode = ?config.paging_mode, max_features = config.max_features, "paging controller created");
        Ok(Self {
            source,
            config,
            strategy,
            listeners: RwLock::new(Vec::new()),
        })
    }

    /// The feature source.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// The configuration the controller was built with.
    pub fn config(&self) -> &PagingConfig {
        &self.config
    }

    /// Active paging mode.
    pub fn mode(&self) -> PagingMode {
        self.strategy.mode()
    }

    /// The underlying pager.
    pub fn strategy(&self) -> &PagingStrategy {
        &self.strategy
    }

    /// Start a new query over `query_extent`.
    ///
    /// Supersedes any navigation still in flight.
    pub async fn set_query(&self, filter: Filter, query_extent: Extent) -> Result<()> {
        self.strategy
            .set_base_filter(&*self.source, filter, query_extent)
            .await
    }

    /// Register a page-change listener.
    ///
    /// Listeners run synchronously on the navigating task and must not
    /// register further listeners.
    pub fn on_page_changed<F>(&self, listener: F)
    where
        F: Fn(&PageChange) + Send + Sync + 'static,
    {
        self.listeners.write().push(Box::new(listener));
    }

    /// Resolve `request`, notify listeners, then load the page's features.
    ///
    /// A load failure leaves the page resolved and the cursor on it. Repeating
    /// a relative request such as [`PagingController::next_page`] would move
    /// past the failed page; [`PagingController::reload`] retries its load
    /// without probing again.
    ///
    /// When the query is replaced while the load is pending the outcome is
    /// [`PagerError::Superseded`], whether the load succeeded or failed.
    pub async fn set_page(&self, request: PageRequest) -> Result<LoadedPage<S::Feature>> {
        let generation = self.strategy.generation();
        let page = self.strategy.resolve(&*self.source, request).await?;
        self.notify(&page);

        let span = tracing::debug_span!("load_page", index = page.index, filter = %page.filter);
        let loaded = self
            .source
            .load(&page.filter, page.window)
            .instrument(span)
            .await;
        if self.strategy.generation() != generation {
            tracing::debug!(index = page.index, "dropping load of a replaced query");
            return Err(PagerError::Superseded);
        }
        let features = loaded.map_err(|source| {
            tracing::warn!(index = page.index, error = %source, "page load failed");
            PagerError::Load {
                index: page.index,
                source,
            }
        })?;
        tracing::debug!(index = page.index, loaded = features.len(), "page loaded");
        Ok(LoadedPage { page, features })
    }

    /// Go to page `index`.
    pub async fn goto_page(&self, index: usize) -> Result<LoadedPage<S::Feature>> {
        self.set_page(PageRequest::Index(index)).await
    }

    /// Go to the page containing `point`.
    pub async fn goto_point(&self, point: Point) -> Result<LoadedPage<S::Feature>> {
        self.set_page(PageRequest::Point(point)).await
    }

    /// Go to the next page.
    pub async fn next_page(&self) -> Result<LoadedPage<S::Feature>> {
        self.set_page(PageRequest::Next).await
    }

    /// Go to the previous page.
    pub async fn previous_page(&self) -> Result<LoadedPage<S::Feature>> {
        self.set_page(PageRequest::Previous).await
    }

    /// Go to the last page.
    pub async fn last_page(&self) -> Result<LoadedPage<S::Feature>> {
        self.set_page(PageRequest::Last).await
    }

    /// Load the current page again.
    pub async fn reload(&self) -> Result<LoadedPage<S::Feature>> {
        self.set_page(PageRequest::Current).await
    }

    /// The page under the cursor.
    pub fn current_page(&self) -> Option<Page> {
        self.strategy.current_page()
    }

    fn notify(&self, page: &Page) {
        let change = PageChange {
            index: page.index,
            page_count: page.page_count,
            extent: page.extent,
            zoom_to: page.extent.filter(|_| self.config.auto_zoom_to_page),
            feature_count: page.feature_count,
            mode: self.mode(),
        };
        for listener in self.listeners.read().iter() {
            listener(&change);
        }
    }
}
