// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_pager --heading-base-level=0

//! Understory Pager: browse large feature collections in bounded pages.
//!
//! A map client showing a server-held layer must never request more than
//! `max_features` features at once. This crate decides *which* features make
//! up a page, without loading anything it does not need:
//!
//! - [`SpatialPager`] subdivides the query extent into quadrants, lazily,
//!   guided by hit-count probes. Oversized pages split, empty pages vanish,
//!   and pages are ordered so next/previous traversal is stable.
//! - [`OffsetPager`] cuts a single total count into offset/limit windows,
//!   for sources that support it or data that does not subdivide.
//! - [`PagingController`] picks one of the two from a [`PagingConfig`],
//!   tells listeners about page changes, and loads the resolved page.
//!
//! The server is reached only through the [`HitCounter`] and
//! [`FeatureSource`] traits; [`MemorySource`] implements both in process.
//!
//! ## Failure model
//!
//! Empty regions are pruned silently. Failures always surface as
//! [`PagerError`]: a failed probe restores the frontier to where it was, a
//! failed load keeps the page resolved so [`PagingController::reload`] can
//! retry it. A second navigation while one is in flight fails fast with
//! [`PagerError::Busy`], and replacing the query discards whatever was in
//! flight with [`PagerError::Superseded`].
//!
//! ## Logging
//!
//! Probes, splits and prunes are reported through `tracing` at debug level,
//! inside one span per navigation.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use understory_pager::{
//!     Filter, MemoryFeature, MemorySource, PagingConfig, PagingController,
//! };
//! use understory_page_tree::Extent;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), understory_pager::PagerError> {
//! let source = Arc::new(MemorySource::new((0..64_u32).map(|i| {
//!     let (x, y) = (f64::from(i % 8) * 12.0 + 3.0, f64::from(i / 8) * 12.0 + 3.0);
//!     MemoryFeature::new(format!("tree-{i}"), x, y).with_property("kind", "tree")
//! })));
//!
//! let config = PagingConfig::default().with_max_features(16);
//! let controller = PagingController::new(source, config)?;
//! controller
//!     .set_query(Filter::equals("kind", "tree"), Extent::new(0.0, 0.0, 100.0, 100.0))
//!     .await?;
//!
//! let mut seen = 0;
//! for _ in 0..4 {
//!     let loaded = controller.next_page().await?;
//!     assert!(loaded.features.len() <= 16);
//!     seen += loaded.features.len();
//! }
//! assert_eq!(seen, 64);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
mod flight;
pub mod memory;
pub mod offset;
pub mod page;
pub mod source;
pub mod spatial;
pub mod strategy;

pub use config::{PagingConfig, PagingMode};
pub use controller::{LoadedPage, PageChange, PagingController};
pub use error::{PagerError, Result, SourceError};
pub use filter::{FeatureRef, Filter};
pub use memory::{MemoryFeature, MemorySource, SourceRequest};
pub use offset::OffsetPager;
pub use page::{Page, PageRequest};
pub use source::{FeatureBatch, FeatureSource, HitCounter, LoadWindow};
pub use spatial::SpatialPager;
pub use strategy::PagingStrategy;
