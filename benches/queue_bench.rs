//! Benchmarks for the scheduler core.
//!
//! Benchmarks cover:
//! - Delay queue insert/pop with random fire times and priorities
//! - Lazy cancellation
//! - Registry lookup
//! - Task runner throughput end to end

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use plugin_scheduler::core::{
    Capability, DelayQueue, Next, Registry, SchedulerHandle, SleepWaiter, TaskRunner,
};
use tokio::time::Instant;

// ============================================================================
// Helpers
// ============================================================================

fn filled_queue(size: u64) -> (DelayQueue<u64>, Instant) {
    let mut rng = rand::rng();
    let now = Instant::now();
    let mut queue = DelayQueue::new();
    for i in 0..size {
        let delay = Duration::from_millis(rng.random_range(0..10_000));
        let priority = rng.random_range(0..4);
        queue.insert(now, delay, priority, i);
    }
    (queue, now)
}

struct Modulo {
    divisor: u64,
    order: i32,
}

impl Capability<u64> for Modulo {
    fn name(&self) -> &'static str {
        "modulo"
    }

    fn can_handle(&self, item: &u64) -> bool {
        item % self.divisor == 0
    }

    fn order_key(&self) -> i32 {
        self.order
    }
}

fn current_thread() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ============================================================================
// Delay queue
// ============================================================================

fn bench_delay_queue_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("delay_queue_insert");
    for size in [100u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| black_box(filled_queue(size)));
        });
    }
    group.finish();
}

fn bench_delay_queue_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("delay_queue_drain");
    for size in [100u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || filled_queue(size),
                |(mut queue, now)| {
                    let horizon = now + Duration::from_secs(10);
                    while let Next::Due(item) = queue.pop_due(horizon) {
                        black_box(item);
                    }
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_delay_queue_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("delay_queue_cancel_half");
    for size in [1_000u64, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let now = Instant::now();
                    let mut queue = DelayQueue::new();
                    let handles: Vec<_> = (0..size)
                        .map(|i| queue.insert(now, Duration::from_millis(i), 0, i))
                        .collect();
                    (queue, handles)
                },
                |(mut queue, handles)| {
                    for handle in handles.into_iter().step_by(2) {
                        queue.cancel(handle);
                    }
                    black_box(queue.len())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

// ============================================================================
// Registry
// ============================================================================

fn bench_registry_applicable(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_applicable");
    for size in [8u64, 32, 128] {
        let registry: Registry<dyn Capability<u64>> = (1..=size)
            .map(|i| -> Arc<dyn Capability<u64>> {
                Arc::new(Modulo {
                    divisor: i,
                    order: i32::try_from(size - i).unwrap_or(0),
                })
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(registry.applicable(&720_720u64).len()));
        });
    }
    group.finish();
}

// ============================================================================
// Task runner
// ============================================================================

fn bench_runner_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("runner_throughput");
    for task_count in [100u64, 1_000] {
        group.throughput(Throughput::Elements(task_count));
        group.bench_with_input(
            BenchmarkId::from_parameter(task_count),
            &task_count,
            |b, &task_count| {
                b.to_async(current_thread()).iter(|| async move {
                    let handle = SchedulerHandle::new();
                    for i in 0..task_count {
                        handle.schedule(Duration::ZERO, 0, "bench", move || async move {
                            black_box(i);
                            Ok(())
                        });
                    }
                    let stopper = handle.clone();
                    handle.schedule(Duration::from_millis(1), 0, "stop", move || async move {
                        stopper.shutdown();
                        Ok(())
                    });
                    TaskRunner::new(handle, SleepWaiter).run_forever().await.unwrap();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    delay_queue_benches,
    bench_delay_queue_insert,
    bench_delay_queue_drain,
    bench_delay_queue_cancel
);

criterion_group!(registry_benches, bench_registry_applicable);

criterion_group!(runner_benches, bench_runner_throughput);

criterion_main!(delay_queue_benches, registry_benches, runner_benches);
