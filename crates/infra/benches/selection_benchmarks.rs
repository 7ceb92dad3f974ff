use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{TimeZone, Utc};
use farmlink_core::{GeoPoint, UserId};
use farmlink_infra::repository::{InMemoryStores, LotRepository, WarehouseRepository};
use farmlink_infra::services::{UtilizationTracker, WarehouseSelector};
use farmlink_inventory::{InventoryLot, plan_fifo};
use farmlink_warehouse::{ScoringPolicy, Utilization, Warehouse, rank_candidates};

/// `n` warehouses spread over ~100 km, with varied occupancy.
fn warehouses(n: usize) -> Vec<(Warehouse, Utilization)> {
    (0..n)
        .map(|i| {
            let location = format!("WH-{i}");
            let coordinates = GeoPoint::new(-1.0 + (i % 100) as f64 * 0.01, 36.8).unwrap();
            let warehouse = Warehouse::new(location.as_str(), 1_000)
                .unwrap()
                .with_coordinates(coordinates);
            let used = ((i * 37) % 1_000) as i64;
            (warehouse, Utilization::compute(location, 1_000, used))
        })
        .collect()
}

fn lots(n: usize) -> Vec<InventoryLot> {
    (0..n)
        .map(|i| {
            let created = Utc.timestamp_opt(1_700_000_000 + ((i * 7919) % n) as i64, 0).unwrap();
            InventoryLot::new(UserId::new(), "Maize", 10, "kg", "WH-0", created).unwrap()
        })
        .collect()
}

fn bench_rank_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_candidates");
    let policy = ScoringPolicy::default();
    let origin = GeoPoint::new(-0.5, 36.8).unwrap();

    for n in [10usize, 100, 1_000] {
        let inputs = warehouses(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &inputs, |b, inputs| {
            b.iter(|| {
                rank_candidates(
                    &policy,
                    Some(black_box(&origin)),
                    black_box(250),
                    Some("WH-3"),
                    inputs.iter().cloned(),
                )
            });
        });
    }
    group.finish();
}

fn bench_selector_over_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_optimal_warehouse");
    group.sample_size(50);

    for n in [10usize, 100] {
        let stores = InMemoryStores::in_memory();
        for (warehouse, utilization) in warehouses(n) {
            let location = warehouse.location().to_string();
            stores.warehouses.upsert(warehouse).unwrap();
            // Five lots per warehouse so utilization is a real aggregation.
            for _ in 0..5 {
                let lot = InventoryLot::new(
                    UserId::new(),
                    "Beans",
                    (utilization.current_stock / 5).max(1),
                    "kg",
                    location.as_str(),
                    Utc::now(),
                )
                .unwrap();
                stores.lots.insert(lot).unwrap();
            }
        }
        let tracker = UtilizationTracker::new(stores.warehouses.clone(), stores.lots.clone());
        let selector = WarehouseSelector::new(tracker, ScoringPolicy::default());
        let origin = GeoPoint::new(-0.5, 36.8).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(n), &selector, |b, selector| {
            b.iter(|| {
                selector
                    .find_optimal_warehouse(Some(&origin), black_box(250), None)
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_plan_fifo(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_fifo");

    for n in [100usize, 1_000, 10_000] {
        let source = lots(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &source, |b, source| {
            // Needs half the stock, so the plan walks half the lots.
            let requested = (n as i64 * 10) / 2;
            b.iter(|| plan_fifo(source.iter(), black_box(requested)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_rank_candidates,
    bench_selector_over_store,
    bench_plan_fifo,
);
criterion_main!(benches);
