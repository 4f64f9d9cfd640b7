// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Offset paging and failure handling.
//!
//! Many features at one spot cannot be separated by subdivision: spatial
//! paging gives up at the depth bound. Offset paging windows the total count
//! instead. A failed load is retried with `reload`, which does not probe
//! again.
//!
//! Run:
//! - `cargo run -p understory_demos --example offset_paging`

use std::sync::Arc;

use kurbo::Point;
use understory_page_tree::Extent;
use understory_pager::{
    Filter, MemorySource, PagerError, PagingConfig, PagingController, PagingMode, SourceError,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 90 features stacked on one point.
    let source = Arc::new(MemorySource::from_points(
        (0..90).map(|_| Point::new(13.1, 13.1)),
    ));
    let extent = Extent::new(0.0, 0.0, 100.0, 100.0);

    let spatial = PagingController::new(
        source.clone(),
        PagingConfig::default().with_max_features(25).with_max_depth(8),
    )?;
    spatial.set_query(Filter::All, extent).await?;
    match spatial.next_page().await {
        Err(err @ PagerError::RunawaySubdivision { .. }) => {
            tracing::info!(error = %err, "spatial paging gave up");
        }
        other => tracing::error!(?other, "spatial paging did not hit the depth bound"),
    }

    let offset = PagingController::new(
        source.clone(),
        PagingConfig::default()
            .with_mode(PagingMode::Offset)
            .with_max_features(25),
    )?;
    offset.set_query(Filter::All, extent).await?;
    for _ in 0..4 {
        let page = offset.next_page().await?;
        tracing::info!(
            page = page.page.index + 1,
            of = page.page.page_count,
            window = ?page.page.window,
            features = page.features.len(),
            "offset page loaded"
        );
    }

    source.fail_next_load(SourceError::Timeout);
    if let Err(err) = offset.next_page().await {
        tracing::info!(error = %err, retryable = err.is_retryable(), "load failed");
        let probes = source.count_requests();
        let page = offset.reload().await?;
        tracing::info!(
            page = page.page.index + 1,
            features = page.features.len(),
            new_count_requests = source.count_requests() - probes,
            "page reloaded"
        );
    }

    Ok(())
}
