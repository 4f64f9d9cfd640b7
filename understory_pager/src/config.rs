// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paging configuration.

use serde::{Deserialize, Serialize};
use understory_page_tree::DEFAULT_MAX_DEPTH;

use crate::error::{PagerError, Result};

/// How pages are formed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PagingMode {
    /// Subdivide the query extent until every page holds at most
    /// `max_features` features.
    #[default]
    Spatial,
    /// Native offset/limit paging over a single total count.
    Offset,
}

/// Configuration recognized by the [`PagingController`](crate::PagingController).
///
/// Field names serialize in camelCase, matching map client configuration files:
///
/// ```
/// use understory_pager::{PagingConfig, PagingMode};
///
/// let config: PagingConfig =
///     serde_json::from_str(r#"{ "maxFeatures": 50, "pagingMode": "offset" }"#).unwrap();
/// assert_eq!(config.max_features, 50);
/// assert_eq!(config.paging_mode, PagingMode::Offset);
/// assert!(!config.auto_zoom_to_page);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PagingConfig {
    /// Split threshold in spatial mode, page size in offset mode.
    pub max_features: u64,
    /// Strategy selected when the controller is created.
    pub paging_mode: PagingMode,
    /// Ask listeners to zoom the map to each newly resolved spatial page.
    pub auto_zoom_to_page: bool,
    /// Bound on splits below the root page before giving up.
    pub max_depth: u8,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            max_features: 100,
            paging_mode: PagingMode::Spatial,
            auto_zoom_to_page: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl PagingConfig {
    /// Set the page size / split threshold.
    #[must_use]
    pub fn with_max_features(mut self, max_features: u64) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the paging mode.
    #[must_use]
    pub fn with_mode(mut self, mode: PagingMode) -> Self {
        self.paging_mode = mode;
        self
    }

    /// Enable or disable zooming to each page.
    #[must_use]
    pub fn with_auto_zoom(mut self, enabled: bool) -> Self {
        self.auto_zoom_to_page = enabled;
        self
    }

    /// Set the subdivision depth bound.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Reject configurations the pagers cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_features == 0 {
            return Err(PagerError::InvalidConfig(
                "maxFeatures must be at least 1".into(),
            ));
        }
        if !(1..=64).contains(&self.max_depth) {
            return Err(PagerError::InvalidConfig(format!(
                "maxDepth must be within 1..=64, got {}",
                self.max_depth
            )));
        }
        Ok(())
    }
}
