//! Discrete-event engine throughput
//!
//! Measures events dispatched per second for the load-balanced and burst
//! shapes, and raw event queue push/pop cost.

use actorsim_actors::scheduler::{Event, EventQueue};
use actorsim_actors::{ActorId, ActorSpec, ScheduleSpec, Simulation, Topology};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

fn load_balanced(servers: usize) -> Topology {
    let names: Vec<String> = (1..=servers).map(|i| format!("server{i}")).collect();
    Topology::load_balanced(
        ActorSpec::new("load_balancer").schedule(ScheduleSpec::every(Duration::from_millis(10))),
        names.iter().map(|name| ActorSpec::new(name.as_str())),
        Some(ActorSpec::new("sink")),
    )
    .expect("valid topology")
}

/// Benchmark a simulated second of a load balancer with growing fan-out
fn bench_load_balanced(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_balanced_one_second");

    for servers in [1usize, 4, 16, 64] {
        // 100 firings, each a trigger plus `servers` hops to a server and on to the sink
        group.throughput(Throughput::Elements(100 * (1 + 2 * servers as u64)));
        group.bench_with_input(BenchmarkId::from_parameter(servers), &servers, |b, &servers| {
            b.iter_batched(
                || Simulation::new(load_balanced(servers)),
                |mut sim| {
                    let processed = sim.run_until(Duration::from_secs(1)).expect("run");
                    black_box(processed);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark large bursts to a single target
fn bench_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("burst_generator");

    for burst in [10u32, 1_000] {
        group.throughput(Throughput::Elements(10 * burst as u64));
        group.bench_with_input(BenchmarkId::from_parameter(burst), &burst, |b, &burst| {
            b.iter_batched(
                || {
                    Simulation::new(
                        Topology::burst(
                            ActorSpec::new("burst_generator")
                                .schedule(ScheduleSpec::every(Duration::from_millis(100)).with_burst(burst)),
                            ActorSpec::new("processor"),
                        )
                        .expect("valid topology"),
                    )
                },
                |mut sim| {
                    sim.run_until(Duration::from_secs(1)).expect("run");
                    black_box(sim.send_count("burst_generator"));
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark raw queue operations with heavy same-time ties
fn bench_event_queue(c: &mut Criterion) {
    let actor = ActorId::new();

    c.bench_function("event_queue_push_pop_10k", |b| {
        b.iter(|| {
            let mut queue = EventQueue::new();
            for i in 0..10_000u64 {
                queue.push(
                    Duration::from_millis(i % 64),
                    Event::Deliver {
                        from: actor,
                        to: actor,
                        message: actorsim_actors::Message::new("msg"),
                    },
                );
            }
            while let Some(event) = queue.pop_earliest() {
                black_box(event);
            }
        });
    });
}

criterion_group!(benches, bench_load_balanced, bench_burst, bench_event_queue);
criterion_main!(benches);
