// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for paging and for the feature sources it talks to.

use thiserror::Error;
use understory_page_tree::Extent;

/// Failure reported by a [`FeatureSource`](crate::FeatureSource) or [`HitCounter`](crate::HitCounter).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The request reached the server but failed (network or server error).
    #[error("request failed: {0}")]
    Request(String),

    /// The request did not complete within the source's timeout.
    #[error("request timed out")]
    Timeout,

    /// The source cannot express the filter or window it was given.
    #[error("unsupported request: {0}")]
    Unsupported(String),
}

/// Paging errors.
///
/// An empty region is never an error: it is pruned silently. Everything in
/// this enum means a page could not be produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PagerError {
    /// A hit-count probe failed. Frontier and cursor are left as they were
    /// before the navigation, so retrying is safe.
    #[error("hit count probe failed for {}: {source}", describe_scope(.extent))]
    Probe {
        /// Region being counted; `None` for a whole-query count.
        extent: Option<Extent>,
        /// What the source reported.
        #[source]
        source: SourceError,
    },

    /// Loading the features of a resolved page failed. The page stays
    /// resolved; reloading it does not probe again.
    #[error("loading page {index} failed: {source}")]
    Load {
        /// Index of the page that was resolved.
        index: usize,
        /// What the source reported.
        #[source]
        source: SourceError,
    },

    /// An oversized page cannot be halved any further.
    #[error("cannot split degenerate extent {extent}")]
    DegenerateSplit {
        /// The page that stays oversized.
        extent: Extent,
    },

    /// The depth bound was reached while the page was still oversized.
    ///
    /// Typical for many coincident features; offset paging is the fallback.
    #[error("subdivision of {extent} still oversized at depth {depth}")]
    RunawaySubdivision {
        /// The page that stays oversized.
        extent: Extent,
        /// Its depth below the root page.
        depth: u8,
    },

    /// Another navigation request is still in flight.
    #[error("a navigation request is already in flight")]
    Busy,

    /// The base filter changed while this request was resolving; its result
    /// was discarded.
    #[error("the base filter changed while the page was resolving")]
    Superseded,

    /// No base filter has been set yet.
    #[error("no base filter has been set")]
    Uninitialized,

    /// The configuration cannot be used.
    #[error("invalid paging configuration: {0}")]
    InvalidConfig(String),
}

impl PagerError {
    /// Whether issuing the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Probe { .. } | Self::Load { .. } | Self::Busy | Self::Superseded
        )
    }
}

fn describe_scope(extent: &Option<Extent>) -> String {
    match extent {
        Some(e) => format!("page {e}"),
        None => "the whole query".to_owned(),
    }
}

/// Result type for paging operations.
pub type Result<T> = std::result::Result<T, PagerError>;
