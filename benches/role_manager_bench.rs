// SPDX-License-Identifier: MIT OR Apache-2.0
//! Role graph benchmarks: reachability over hierarchy depth, wide fan-out,
//! link insertion and pattern-matched role names.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use warden::matching::predicate;
use warden::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

/// A chain `level0 -> level1 -> ... -> level{depth}`.
fn chain(depth: usize) -> DefaultRoleManager {
    let mut rm = DefaultRoleManager::new(depth + 1);
    for i in 0..depth {
        rm.add_link(&format!("level{i}"), &format!("level{}", i + 1), &[])
            .unwrap();
    }
    rm
}

/// `width` users each holding one of ten roles under a single root.
fn fan_out(width: usize) -> DefaultRoleManager {
    let mut rm = DefaultRoleManager::default();
    for r in 0..10 {
        rm.add_link(&format!("role{r}"), "root", &[]).unwrap();
    }
    for u in 0..width {
        rm.add_link(&format!("user{u}"), &format!("role{}", u % 10), &[])
            .unwrap();
    }
    rm
}

// ── Reachability ────────────────────────────────────────────────────────

fn bench_has_link_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("has_link_depth");

    for depth in [1, 5, 9] {
        let rm = chain(depth);
        let top = format!("level{depth}");
        group.bench_with_input(BenchmarkId::new("reachable", depth), &rm, |b, rm| {
            b.iter(|| rm.has_link(black_box("level0"), black_box(&top), &[]).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("unreachable", depth), &rm, |b, rm| {
            b.iter(|| rm.has_link(black_box("level0"), black_box("nowhere"), &[]).unwrap());
        });
    }

    group.finish();
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("role_fan_out");

    for width in [100, 1000, 10000] {
        let rm = fan_out(width);
        group.bench_with_input(BenchmarkId::new("has_link", width), &rm, |b, rm| {
            b.iter(|| rm.has_link(black_box("user7"), black_box("root"), &[]).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("get_users", width), &rm, |b, rm| {
            b.iter(|| black_box(rm.get_users(black_box("role3"), &[]).unwrap().len()));
        });
    }

    group.finish();
}

// ── Mutation ────────────────────────────────────────────────────────────

fn bench_add_link(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_link");

    for count in [100, 1000] {
        let pairs: Vec<(String, String)> = (0..count)
            .map(|i| (format!("user{i}"), format!("role{}", i % 10)))
            .collect();
        group.bench_with_input(BenchmarkId::new("build", count), &pairs, |b, pairs| {
            b.iter(|| {
                let mut rm = DefaultRoleManager::default();
                for (user, role) in pairs {
                    rm.add_link(user, role, &[]).unwrap();
                }
                black_box(rm);
            });
        });
    }

    group.finish();
}

// ── Pattern roles ───────────────────────────────────────────────────────

fn bench_pattern_roles(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_roles");

    for count in [10, 100] {
        let mut rm = DefaultRoleManager::default();
        if let Some(f) = predicate("keyMatch2") {
            rm.add_matching_fn("keyMatch2", f);
        }
        for i in 0..count {
            rm.add_link(&format!("/book/{i}"), "book_admin", &[]).unwrap();
        }
        rm.add_link("/pen/:id", "pen_admin", &[]).unwrap();
        group.bench_with_input(BenchmarkId::new("key_match2", count), &rm, |b, rm| {
            b.iter(|| rm.has_link(black_box("/pen/3"), black_box("pen_admin"), &[]).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_has_link_depth,
    bench_fan_out,
    bench_add_link,
    bench_pattern_roles,
);
criterion_main!(benches);
