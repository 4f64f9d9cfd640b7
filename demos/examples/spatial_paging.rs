// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spatial paging basics.
//!
//! Pages through clustered point features with a controller configured from
//! JSON, logging every page change. Clusters end up on many small pages
//! while sparse areas share large ones.
//!
//! Run:
//! - `cargo run -p understory_demos --example spatial_paging`
//! - `RUST_LOG=understory_pager=debug cargo run -p understory_demos --example spatial_paging`

use std::sync::Arc;

use kurbo::Point;
use understory_page_tree::Extent;
use understory_pager::{Filter, MemoryFeature, MemorySource, PagingConfig, PagingController};

/// Three dense clusters plus a sparse background.
fn features() -> Vec<MemoryFeature> {
    let clusters = [(20.0, 20.0, 120_u32), (70.0, 35.0, 60), (40.0, 80.0, 90)];
    let mut out = Vec::new();
    for (ci, &(cx, cy, n)) in clusters.iter().enumerate() {
        for i in 0..n {
            let a = f64::from(i) * 2.399;
            let r = f64::from(i).sqrt() * 0.9;
            out.push(
                MemoryFeature::new(format!("c{ci}-{i}"), cx + r * a.cos(), cy + r * a.sin())
                    .with_property("kind", if i % 3 == 0 { "oak" } else { "birch" }),
            );
        }
    }
    for i in 0..40_u32 {
        let x = f64::from(i * 37 % 100) + 0.3;
        let y = f64::from(i * 61 % 100) + 0.7;
        out.push(MemoryFeature::new(format!("bg-{i}"), x, y).with_property("kind", "oak"));
    }
    out
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config: PagingConfig =
        serde_json::from_str(r#"{ "maxFeatures": 40, "autoZoomToPage": true }"#)?;
    let source = Arc::new(MemorySource::new(features()));
    let controller = PagingController::new(source.clone(), config)?;
    controller.on_page_changed(|change| {
        tracing::info!(
            page = change.index + 1,
            of = change.page_count,
            extent = %change.extent.map(|e| e.to_string()).unwrap_or_default(),
            features = ?change.feature_count,
            "page changed"
        );
    });

    let extent = Extent::new(0.0, 0.0, 100.0, 100.0);
    controller.set_query(Filter::All, extent).await?;

    tracing::info!("forward lap");
    let first = controller.next_page().await?;
    let mut loaded = first.features.len();
    loop {
        let page = controller.next_page().await?;
        if page.page.id == first.page.id {
            break;
        }
        loaded += page.features.len();
    }
    tracing::info!(
        loaded,
        pages = controller.current_page().map_or(0, |p| p.page_count),
        count_requests = source.count_requests(),
        "lap complete"
    );

    let here = controller.goto_point(Point::new(70.0, 35.0)).await?;
    tracing::info!(zoom_to = ?here.page.extent, "jumped to a point");

    tracing::info!("only oaks");
    controller
        .set_query(Filter::equals("kind", "oak"), extent)
        .await?;
    let last = controller.last_page().await?;
    tracing::info!(oaks = last.features.len(), "last page loaded");

    Ok(())
}
