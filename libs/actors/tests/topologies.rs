//! Integration tests for the observed topology shapes
//!
//! Runs each shape under the discrete-event model and checks send counts,
//! delivery counts and delivery order.

use actorsim_actors::{
    kinds, ActorId, ActorSpec, CountingHook, Dispatch, ScheduleSpec, Simulation, Topology,
};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Targets of every delivery dispatched until the queue drains or `limit` steps
fn delivery_order(sim: &mut Simulation, limit: usize) -> Vec<ActorId> {
    let mut order = Vec::new();
    for _ in 0..limit {
        match sim.step().unwrap() {
            Some(Dispatch::Delivery { to, .. }) => order.push(to),
            Some(_) => {}
            None => break,
        }
    }
    order
}

#[test]
fn test_burst_generator_sends_ten_per_period() {
    init_tracing();
    let hook = CountingHook::new();
    let topology = Topology::burst(
        ActorSpec::new("burst_generator")
            .emits(kinds::BATCH)
            .schedule(ScheduleSpec::every(ms(1000)).with_burst(10))
            .hook(hook.clone()),
        ActorSpec::new("processor").accepts([kinds::BATCH]),
    )
    .unwrap();
    let mut sim = Simulation::new(topology);

    for period in 1..=3 {
        sim.run_until(ms(1000 * period)).unwrap();
        assert_eq!(sim.send_count("burst_generator"), Some(10 * period));
        assert_eq!(sim.actor("processor").unwrap().received_count(), 10 * period);
    }
    assert_eq!(hook.calls(), 3);

    let report = sim.finish();
    assert_eq!(report.get("processor").map(|s| s.ignored), Some(0));
}

#[test]
fn test_load_balancer_round_robin_order() {
    init_tracing();
    let topology = Topology::load_balanced(
        ActorSpec::new("load_balancer")
            .emits(kinds::REQUEST)
            .schedule(ScheduleSpec::every(ms(10))),
        ["server1", "server2", "server3"].map(ActorSpec::new),
        None,
    )
    .unwrap();
    let mut sim = Simulation::new(topology);
    let servers: Vec<ActorId> = ["server1", "server2", "server3"]
        .iter()
        .map(|name| sim.id_of(name).unwrap())
        .collect();

    sim.start();
    // One trigger plus three deliveries
    let order = delivery_order(&mut sim, 4);

    assert_eq!(order, servers);
    assert_eq!(sim.send_count("load_balancer"), Some(3));

    sim.run_until(ms(50)).unwrap();
    assert_eq!(sim.send_count("load_balancer"), Some(15));
    for name in ["server1", "server2", "server3"] {
        assert_eq!(sim.actor(name).unwrap().received_count(), 5);
    }
}

#[test]
fn test_pipeline_delivers_in_chain_order() {
    init_tracing();
    let topology = Topology::pipeline([
        ActorSpec::new("source")
            .emits(kinds::DATA)
            .schedule(ScheduleSpec::once(ms(1))),
        ActorSpec::new("stage1").emits(kinds::DATA),
        ActorSpec::new("stage2").emits(kinds::DATA),
        ActorSpec::new("sink"),
    ])
    .unwrap();
    let mut sim = Simulation::new(topology);
    let chain: Vec<ActorId> = ["stage1", "stage2", "sink"]
        .iter()
        .map(|name| sim.id_of(name).unwrap())
        .collect();

    sim.start();
    let order = delivery_order(&mut sim, 16);

    assert_eq!(order, chain);
    for name in ["stage1", "stage2", "sink"] {
        assert_eq!(sim.actor(name).unwrap().received_count(), 1);
    }
    assert_eq!(sim.send_count("source"), Some(1));
    assert_eq!(sim.send_count("stage2"), Some(1));
    assert_eq!(sim.send_count("sink"), Some(0));
}

#[test]
fn test_pub_sub_one_message_per_subscriber() {
    init_tracing();
    let topology = Topology::pub_sub(
        ActorSpec::new("publisher")
            .emits(kinds::EVENT)
            .schedule(ScheduleSpec::every(ms(100))),
        ["subscriber1", "subscriber2", "subscriber3"].map(ActorSpec::new),
    )
    .unwrap();
    let mut sim = Simulation::new(topology);

    sim.run_until(ms(300)).unwrap();

    assert_eq!(sim.send_count("publisher"), Some(9));
    for name in ["subscriber1", "subscriber2", "subscriber3"] {
        let subscriber = sim.actor(name).unwrap();
        assert_eq!(subscriber.received_count(), 3);
        assert_eq!(subscriber.send_count(), 0);
    }
}

#[test]
fn test_hybrid_actor_receives_without_sending() {
    init_tracing();
    let topology = Topology::builder()
        .actor(ActorSpec::new("feeder").schedule(ScheduleSpec::every(ms(5))))
        .actor(ActorSpec::new("balancer").schedule(ScheduleSpec::every(ms(100))))
        .actor(ActorSpec::new("server"))
        .wire("feeder", ["balancer"])
        .wire("balancer", ["server"])
        .build()
        .unwrap();
    let mut sim = Simulation::new(topology);

    sim.run_until(ms(99)).unwrap();

    assert_eq!(sim.actor("balancer").unwrap().received_count(), 19);
    assert_eq!(sim.send_count("balancer"), Some(0));
    assert_eq!(sim.actor("server").unwrap().received_count(), 0);
}

#[test]
fn test_discrete_runs_are_deterministic() {
    init_tracing();
    let build = || {
        Topology::builder()
            .actor(
                ActorSpec::new("burst_generator")
                    .schedule(ScheduleSpec::every(ms(7)).with_burst(3)),
            )
            .actor(ActorSpec::new("load_balancer").schedule(ScheduleSpec::every(ms(10))))
            .actors(["server1", "server2", "sink"].map(ActorSpec::new))
            .wire("burst_generator", ["load_balancer", "sink"])
            .wire("load_balancer", ["server1", "server2"])
            .wire("server1", ["sink"])
            .wire("server2", ["sink"])
            .build()
            .unwrap()
    };

    let counters = |topology| {
        let mut sim = Simulation::new(topology);
        sim.run_until(ms(1000)).unwrap();
        sim.finish()
            .actors
            .into_iter()
            .map(|s| (s.name, s.sent, s.received, s.firings))
            .collect::<Vec<_>>()
    };

    let first = counters(build());
    let second = counters(build());
    assert_eq!(first, second);
    assert!(first.iter().any(|(_, sent, _, _)| *sent > 0));
}
