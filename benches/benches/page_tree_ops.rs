// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::Point;
use understory_page_tree::{DEFAULT_MAX_DEPTH, Extent, PageTree};

const WORLD: Extent = Extent::new(0.0, 0.0, 2000.0, 2000.0);

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_uniform_points(count: usize) -> Vec<Point> {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    (0..count)
        .map(|_| Point::new(rng.next_f64() * 2000.0, rng.next_f64() * 2000.0))
        .collect()
}

fn gen_clustered_points(n_clusters: usize, per_cluster: usize, spread: f64) -> Vec<Point> {
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    for _ in 0..n_clusters {
        let (cx, cy) = (
            rng.next_f64() * (2000.0 - spread) + spread / 2.0,
            rng.next_f64() * (2000.0 - spread) + spread / 2.0,
        );
        for _ in 0..per_cluster {
            let dx = (rng.next_f64() - 0.5) * spread;
            let dy = (rng.next_f64() - 0.5) * spread;
            out.push(Point::new(cx + dx, cy + dy));
        }
    }
    out
}

/// Count, prune and split until every frontier page holds at most `max` points.
fn refine(tree: &mut PageTree, points: &[Point], max: u64) {
    let mut i = 0;
    while i < tree.len() {
        let id = tree.page_at(i).unwrap();
        let extent = tree.get(id).unwrap().extent;
        let n = points.iter().filter(|p| extent.contains(**p)).count() as u64;
        tree.set_feature_count(id, n);
        if n == 0 && tree.prune(id).is_some() {
            continue;
        }
        if n > max && tree.split(id).is_ok() {
            continue;
        }
        i += 1;
    }
}

fn refined(points: &[Point], max: u64) -> PageTree {
    let mut tree = PageTree::new(WORLD, DEFAULT_MAX_DEPTH);
    refine(&mut tree, points, max);
    tree
}

fn bench_refine(c: &mut Criterion) {
    let mut group = c.benchmark_group("refine");
    for &n in &[1_000usize, 4_000, 16_000] {
        let points = gen_uniform_points(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("uniform_n{}", n), |b| {
            b.iter_batched(
                || PageTree::new(WORLD, DEFAULT_MAX_DEPTH),
                |mut tree| {
                    refine(&mut tree, &points, 100);
                    black_box(tree.len());
                },
                BatchSize::SmallInput,
            )
        });
    }
    let points = gen_clustered_points(16, 500, 60.0);
    group.bench_function("clustered_16x500", |b| {
        b.iter_batched(
            || PageTree::new(WORLD, DEFAULT_MAX_DEPTH),
            |mut tree| {
                refine(&mut tree, &points, 100);
                black_box(tree.len());
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    let tree = refined(&gen_clustered_points(16, 500, 60.0), 50);
    let mut rng = Rng::new(0xFACE_FEED_CAFE_BABE);
    let queries: Vec<Point> = (0..1024)
        .map(|_| Point::new(rng.next_f64() * 2000.0, rng.next_f64() * 2000.0))
        .collect();
    group.throughput(Throughput::Elements(queries.len() as u64));
    group.bench_function(format!("locate_frontier{}", tree.len()), |b| {
        b.iter(|| {
            let found = queries.iter().filter_map(|q| tree.locate(*q)).count();
            black_box(found);
        })
    });
    group.bench_function(format!("nearest_frontier{}", tree.len()), |b| {
        b.iter(|| {
            let sum: usize = queries.iter().filter_map(|q| tree.nearest(*q)).sum();
            black_box(sum);
        })
    });
    group.finish();
}

fn bench_reset(c: &mut Criterion) {
    let points = gen_uniform_points(4_000);
    c.bench_function("reset_refined_tree", |b| {
        b.iter_batched(
            || refined(&points, 20),
            |mut tree| {
                tree.reset(WORLD);
                black_box(tree.len());
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_refine, bench_lookup, bench_reset);
criterion_main!(benches);
