// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform front over the two pagers.

use understory_page_tree::Extent;

use crate::config::{PagingConfig, PagingMode};
use crate::error::Result;
use crate::filter::Filter;
use crate::offset::OffsetPager;
use crate::page::{Page, PageRequest};
use crate::source::HitCounter;
use crate::spatial::SpatialPager;

/// The pager selected by [`PagingConfig::paging_mode`].
#[derive(Debug)]
pub enum PagingStrategy {
    /// Adaptive spatial subdivision.
    Spatial(SpatialPager),
    /// Offset/limit windows.
    Offset(OffsetPager),
}

impl PagingStrategy {
    /// Build the pager `config` asks for.
    pub fn from_config(config: &PagingConfig) -> Self {
        match config.paging_mode {
            PagingMode::Spatial => {
                Self::Spatial(SpatialPager::new(config.max_features, config.max_depth))
            }
            PagingMode::Offset => Self::Offset(OffsetPager::new(config.max_features)),
        }
    }

    /// Which pager this is.
    pub fn mode(&self) -> PagingMode {
        match self {
            Self::Spatial(_) => PagingMode::Spatial,
            Self::Offset(_) => PagingMode::Offset,
        }
    }

    /// Start a new query.
    ///
    /// `query_extent` is only used by the spatial pager; the offset pager
    /// probes its total here.
    pub async fn set_base_filter<H>(
        &self,
        counter: &H,
        filter: Filter,
        query_extent: Extent,
    ) -> Result<()>
    where
        H: HitCounter + ?Sized,
    {
        match self {
            Self::Spatial(p) => {
                p.set_base_filter(filter, query_extent);
                Ok(())
            }
            Self::Offset(p) => p.set_base_filter(counter, filter).await.map(drop),
        }
    }

    /// Resolve a navigation request.
    pub async fn resolve<H>(&self, counter: &H, request: PageRequest) -> Result<Page>
    where
        H: HitCounter + ?Sized,
    {
        match self {
            Self::Spatial(p) => p.resolve(counter, request).await,
            Self::Offset(p) => p.resolve(counter, request).await,
        }
    }

    /// The page under the cursor.
    pub fn current_page(&self) -> Option<Page> {
        match self {
            Self::Spatial(p) => p.current_page(),
            Self::Offset(p) => p.current_page(),
        }
    }

    /// Number of currently known pages.
    pub fn page_count(&self) -> Option<usize> {
        match self {
            Self::Spatial(p) => p.page_count(),
            Self::Offset(p) => p.page_count(),
        }
    }

    /// Query generation of the active pager.
    pub fn generation(&self) -> u64 {
        match self {
            Self::Spatial(p) => p.generation(),
            Self::Offset(p) => p.generation(),
        }
    }

    /// Whether a navigation is in flight.
    pub fn is_resolving(&self) -> bool {
        match self {
            Self::Spatial(p) => p.is_resolving(),
            Self::Offset(p) => p.is_resolving(),
        }
    }
}
