// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-process feature source.
//!
//! Holds point features in memory, evaluates filters with
//! [`Filter::matches`], and records every request it answers. Failures can be
//! injected one request at a time.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use kurbo::Point;
use parking_lot::Mutex;

use crate::error::SourceError;
use crate::filter::{FeatureRef, Filter};
use crate::source::{FeatureBatch, FeatureSource, HitCounter, LoadWindow};

/// A point feature with string properties.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryFeature {
    /// Feature id.
    pub id: Arc<str>,
    /// Location.
    pub position: Point,
    /// Property values by name.
    pub properties: BTreeMap<String, String>,
}

impl MemoryFeature {
    /// Feature `id` at `(x, y)` without properties.
    pub fn new(id: impl Into<Arc<str>>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            position: Point::new(x, y),
            properties: BTreeMap::new(),
        }
    }

    /// Add a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

impl FeatureRef for MemoryFeature {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> Point {
        self.position
    }

    fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

/// A request answered by a [`MemorySource`].
#[derive(Clone, Debug, PartialEq)]
pub enum SourceRequest {
    /// A hit-count request.
    Count(Filter),
    /// A feature load.
    Load(Filter, LoadWindow),
}

#[derive(Debug, Default)]
struct Faults {
    count: Option<SourceError>,
    load: Option<SourceError>,
}

/// Feature source over a fixed set of in-memory point features.
#[derive(Debug, Default)]
pub struct MemorySource {
    features: Vec<MemoryFeature>,
    requests: Mutex<Vec<SourceRequest>>,
    faults: Mutex<Faults>,
}

impl MemorySource {
    /// Source holding `features`, in this order.
    pub fn new(features: impl IntoIterator<Item = MemoryFeature>) -> Self {
        Self {
            features: features.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Source with one feature per point, with ids `f0`, `f1`, and so on.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Self {
        Self::new(
            points
                .into_iter()
                .enumerate()
                .map(|(i, p)| MemoryFeature::new(format!("f{i}"), p.x, p.y)),
        )
    }

    /// All features.
    pub fn features(&self) -> &[MemoryFeature] {
        &self.features
    }

    /// Fail the next count request with `error`.
    pub fn fail_next_count(&self, error: SourceError) {
        self.faults.lock().count = Some(error);
    }

    /// Fail the next load request with `error`.
    pub fn fail_next_load(&self, error: SourceError) {
        self.faults.lock().load = Some(error);
    }

    /// Every request answered so far, failed ones included.
    pub fn requests(&self) -> Vec<SourceRequest> {
        self.requests.lock().clone()
    }

    /// Number of count requests answered so far.
    pub fn count_requests(&self) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| matches!(r, SourceRequest::Count(_)))
            .count()
    }

    /// Forget the recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn matching<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a MemoryFeature> + 'a {
        self.features.iter().filter(move |f| filter.matches(*f))
    }
}

#[async_trait]
impl HitCounter for MemorySource {
    async fn count(&self, filter: &Filter) -> Result<u64, SourceError> {
        self.requests
            .lock()
            .push(SourceRequest::Count(filter.clone()));
        if let Some(err) = self.faults.lock().count.take() {
            return Err(err);
        }
        Ok(self.matching(filter).count() as u64)
    }
}

#[async_trait]
impl FeatureSource for MemorySource {
    type Feature = MemoryFeature;

    async fn load(
        &self,
        filter: &Filter,
        window: LoadWindow,
    ) -> Result<FeatureBatch<MemoryFeature>, SourceError> {
        self.requests
            .lock()
            .push(SourceRequest::Load(filter.clone(), window));
        if let Some(err) = self.faults.lock().load.take() {
            return Err(err);
        }
        let skip = usize::try_from(window.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let take = window
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(FeatureBatch::new(
            self.matching(filter).skip(skip).take(take).cloned().collect(),
        ))
    }
}
