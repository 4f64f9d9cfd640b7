// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use kurbo::Point;
use understory_page_tree::Extent;
use understory_pager::{Filter, MemorySource, OffsetPager, SpatialPager};

const WORLD: Extent = Extent::new(0.0, 0.0, 1000.0, 1000.0);

fn source(count: u64) -> MemorySource {
    let mut x = 0x9E37_79B9_7F4A_7C15_u64;
    let mut next = move || {
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        ((x >> 11) as f64) / ((1u64 << 53) as f64) * 1000.0
    };
    MemorySource::from_points((0..count).map(|_| Point::new(next(), next())))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn bench_spatial_lap(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("spatial_lap");
    for &(n, max) in &[(2_000u64, 100u64), (2_000, 20), (8_000, 100)] {
        let src = source(n);
        group.bench_function(format!("n{}_max{}", n, max), |b| {
            b.iter_batched(
                || {
                    let pager = SpatialPager::new(max, 24);
                    pager.set_base_filter(Filter::All, WORLD);
                    pager
                },
                |pager| {
                    rt.block_on(async {
                        let first = pager.next(&src).await.unwrap();
                        let mut pages = 1;
                        while pager.next(&src).await.unwrap().id != first.id {
                            pages += 1;
                        }
                        black_box(pages);
                    });
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_cached_navigation(c: &mut Criterion) {
    let rt = runtime();
    let src = source(4_000);
    let pager = SpatialPager::new(50, 24);
    pager.set_base_filter(Filter::All, WORLD);
    let pages = rt.block_on(async {
        let first = pager.next(&src).await.unwrap();
        while pager.next(&src).await.unwrap().id != first.id {}
        pager.page_count().unwrap()
    });
    c.bench_function(format!("cached_next_frontier{}", pages), |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(pager.next(&src).await.unwrap().index);
            });
        })
    });
}

fn bench_offset_lap(c: &mut Criterion) {
    let rt = runtime();
    let src = source(8_000);
    c.bench_function("offset_lap_n8000_max100", |b| {
        b.iter_batched(
            || OffsetPager::new(100),
            |pager| {
                rt.block_on(async {
                    pager.set_base_filter(&src, Filter::All).await.unwrap();
                    for _ in 0..pager.page_count().unwrap() {
                        black_box(pager.next(&src).await.unwrap().window);
                    }
                });
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_spatial_lap, bench_cached_navigation, bench_offset_lap);
criterion_main!(benches);
