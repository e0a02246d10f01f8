use criterion::{black_box, criterion_main, Criterion};
use std::convert::Infallible;
use std::time::Duration;
use tokio::runtime::Runtime;

use fmait::prelude::*;

type WordStage = BoxedStage<'static, u64, u64, Infallible>;

fn stages(depth: usize) -> Vec<WordStage> {
    (0..depth)
        .map(|index| {
            if index % 2 == 0 {
                stage::from_fn(|x: u64| x.wrapping_mul(31).rotate_left(7)).boxed()
            } else {
                stage::from_async(|x: u64| async move {
                    tokio::task::yield_now().await;
                    x ^ 0x5bd1_e995
                })
                .boxed()
            }
        })
        .collect()
}

fn benchmark_staged_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("Staged Map Benchmarks");
    for width in [10, 1_000, 100_000] {
        for depth in [1, 4, 16] {
            group.bench_with_input(
                format!("Map {} elements through {} stages", width, depth),
                &(width, depth),
                |b, (width, depth)| {
                    let stages = stages(*depth);
                    b.to_async(Runtime::new().unwrap()).iter(|| {
                        let initial: Vec<u64> = (0..*width as u64).collect();
                        let stages = &stages;
                        async move { black_box(fmait::map(stages, initial).await.unwrap()) }
                    });
                },
            );
        }
    }
}

fn benchmark_spawned_stage(c: &mut Criterion) {
    let mut group = c.benchmark_group("Spawned Stage Benchmarks");
    for width in [10, 1_000, 100_000] {
        group.bench_with_input(
            format!("Spawn {} elements", width),
            &width,
            |b, width| {
                let spawned = Spawned::new(stage::from_fn::<_, _, _, Infallible>(|x: u64| x.count_ones()));
                b.to_async(Runtime::new().unwrap()).iter(|| {
                    let initial: Vec<u64> = (0..*width as u64).collect();
                    let spawned = &spawned;
                    async move { black_box(spawned.map_all(initial).await.unwrap()) }
                });
            },
        );
    }
}

pub fn benches() {
    let mut criterion = Criterion::default().measurement_time(Duration::from_secs(10));
    benchmark_staged_map(&mut criterion);
    benchmark_spawned_stage(&mut criterion);
}

criterion_main!(benches);
