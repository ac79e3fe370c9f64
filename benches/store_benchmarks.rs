//! Store operation benchmarks over the SQLite and in-memory backends.

mod common;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use score_engine::{NewGame, Path, SubscribeOptions};
use std::time::Duration;

fn bench_score_delta(c: &mut Criterion) {
    let mut group = c.benchmark_group("ApplyScoreDelta");
    group.measurement_time(Duration::from_secs(5));

    for updates in [10, 100, 1_000] {
        group.throughput(Throughput::Elements(updates as u64));

        group.bench_with_input(BenchmarkId::new("Memory", updates), &updates, |b, &updates| {
            b.iter_batched(
                || {
                    let mut store = common::memory_store();
                    common::populate(&mut store, 4, 1, 1, 0);
                    store
                },
                |mut store| {
                    let mut rng = common::rng();
                    let session = store.state().sessions[0].clone();
                    let gid = session.games[0].id.clone();
                    let roster = store.state().players.clone();
                    for _ in 0..updates {
                        let delta = common::random_delta(&mut rng, &roster);
                        store.apply_score_delta(&session.id, &gid, &delta).unwrap();
                    }
                    black_box(store)
                },
                criterion::BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("SQLite", updates), &updates, |b, &updates| {
            b.iter_batched(
                || {
                    let mut store = common::sqlite_store();
                    common::populate(&mut store, 4, 1, 1, 0);
                    store
                },
                |mut store| {
                    let mut rng = common::rng();
                    let session = store.state().sessions[0].clone();
                    let gid = session.games[0].id.clone();
                    let roster = store.state().players.clone();
                    for _ in 0..updates {
                        let delta = common::random_delta(&mut rng, &roster);
                        store.apply_score_delta(&session.id, &gid, &delta).unwrap();
                    }
                    black_box(store)
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_notify(c: &mut Criterion) {
    let mut group = c.benchmark_group("NotifyListeners");

    for listeners in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(listeners), &listeners, |b, &listeners| {
            let mut store = common::populated_memory_store(2);
            let sid = store.state().sessions[0].id.clone();
            let subs: Vec<_> = (0..listeners)
                .map(|_| store.subscribe(Path::sessions(), SubscribeOptions::ordered("createdAt"), |s| {
                    black_box(s);
                }))
                .collect();
            b.iter(|| {
                let game = NewGame { name: "Bench".into(), ..Default::default() };
                let gid = store.start_game(&sid, game).unwrap();
                store.delete_game(&sid, &gid).unwrap();
            });
            for sub in subs {
                sub.unsubscribe();
            }
        });
    }
    group.finish();
}

fn bench_export_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("ExportImport");
    group.sample_size(20);

    for sessions in [10, 50] {
        let source = common::populated_memory_store(sessions);
        let json = source.export_data().to_json_pretty().unwrap();
        group.throughput(Throughput::Bytes(json.len() as u64));

        group.bench_with_input(BenchmarkId::new("Export", sessions), &source, |b, source| {
            b.iter(|| black_box(source.export_data().to_json_pretty().unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("Import_SQLite", sessions), &json, |b, json| {
            b.iter_batched(
                common::sqlite_store,
                |mut store| {
                    store.import_json(json).unwrap();
                    black_box(store)
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let store = common::populated_memory_store(50);
    c.bench_function("list_all_games", |b| b.iter(|| black_box(store.list_all_games())));
    c.bench_function("global_leaderboard", |b| b.iter(|| black_box(store.global_leaderboard())));
    c.bench_function("score_timeline", |b| b.iter(|| black_box(store.score_timeline())));
}

criterion_group!(benches, bench_score_delta, bench_notify, bench_export_import, bench_queries);
criterion_main!(benches);
