//! # Store Benchmarks
//!
//! List and resolve costs for carelink-core.
//!
//! Run with: `cargo bench -p carelink-core`

use carelink_core::{
    DailyTip, EntityStore, QueryEngine, RecordId, Resolver, Role, SelectItem, User,
};
use chrono::{DateTime, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn nurse() -> User {
    User {
        id: RecordId::default(),
        username: "nina".to_string(),
        email: "nina@example.com".to_string(),
        password_hash: String::new(),
        role: Role::Nurse,
        first_name: "Nina".to_string(),
        last_name: "Hart".to_string(),
        date_of_birth: None,
        created_at: DateTime::<Utc>::UNIX_EPOCH,
    }
}

/// A store with `size` tips spread over ten patients, all by one nurse.
fn populated_store(size: usize) -> (EntityStore, RecordId) {
    let mut store = EntityStore::in_memory();
    let nurse = store.insert(nurse()).expect("insert");
    for i in 0..size {
        store
            .insert(DailyTip {
                id: RecordId::default(),
                nurse_id: nurse.id.clone(),
                patient_id: RecordId::new(format!("patient-{}", i % 10)),
                content: format!("tip {i}"),
                is_read: false,
                date: DateTime::<Utc>::UNIX_EPOCH,
            })
            .expect("insert");
    }
    (store, nurse.id)
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_filtered_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_list");

    for size in [100, 1_000, 10_000] {
        let (store, _) = populated_store(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &store, |b, store| {
            b.iter(|| {
                QueryEngine::new(store)
                    .list::<DailyTip>(Some(black_box("patient-3")))
                    .expect("list")
            });
        });
    }

    group.finish();
}

fn bench_resolve_with_reference(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_with_reference");
    let selection = vec![
        SelectItem::field("content"),
        SelectItem::nested("nurse", vec![SelectItem::field("lastName")]),
    ];

    for size in [100, 1_000] {
        let (store, _) = populated_store(size);
        let tips = QueryEngine::new(&store)
            .list::<DailyTip>(None)
            .expect("list");
        group.bench_with_input(BenchmarkId::from_parameter(size), &tips, |b, tips| {
            b.iter(|| {
                Resolver::new(&store)
                    .resolve_list(black_box(tips), Some(&selection))
                    .expect("resolve")
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filtered_list, bench_resolve_with_reference);
criterion_main!(benches);
