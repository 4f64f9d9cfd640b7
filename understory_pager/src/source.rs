// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contracts with the server-side feature collection.
//!
//! The pager never speaks a wire protocol. It asks a [`HitCounter`] how many
//! features match a filter, and the controller asks a [`FeatureSource`] for
//! the features of a resolved page. WFS, REST or SQL backends implement these
//! traits; [`MemorySource`](crate::MemorySource) is an in-process one.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::filter::Filter;

/// Offset/limit window applied to a load request.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadWindow {
    /// Number of matching features to skip.
    pub offset: Option<u64>,
    /// Maximum number of features to return.
    pub limit: Option<u64>,
}

impl LoadWindow {
    /// No window: every matching feature.
    pub const ALL: Self = Self {
        offset: None,
        limit: None,
    };

    /// Window of `limit` features starting at `offset`.
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset: Some(offset),
            limit: Some(limit),
        }
    }
}

/// Features returned by a load request.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureBatch<F> {
    /// Features in source order.
    pub features: Vec<F>,
}

impl<F> FeatureBatch<F> {
    /// Wrap loaded features.
    pub fn new(features: Vec<F>) -> Self {
        Self { features }
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the batch holds no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterate the features.
    pub fn iter(&self) -> std::slice::Iter<'_, F> {
        self.features.iter()
    }
}

impl<F> Default for FeatureBatch<F> {
    fn default() -> Self {
        Self {
            features: Vec::new(),
        }
    }
}

impl<F> IntoIterator for FeatureBatch<F> {
    type Item = F;
    type IntoIter = std::vec::IntoIter<F>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// Counts features matching a filter without loading them.
#[async_trait]
pub trait HitCounter: Send + Sync {
    /// Number of features matching `filter`.
    ///
    /// Failures, timeouts included, must be reported as errors and never as
    /// a zero count: zero means the region is empty and will be pruned.
    async fn count(&self, filter: &Filter) -> Result<u64, SourceError>;
}

/// A feature collection that can be counted and loaded.
#[async_trait]
pub trait FeatureSource: HitCounter {
    /// Feature representation produced by [`FeatureSource::load`].
    type Feature: Send;

    /// Features matching `filter`, windowed by `window`.
    async fn load(
        &self,
        filter: &Filter,
        window: LoadWindow,
    ) -> Result<FeatureBatch<Self::Feature>, SourceError>;
}
