//! Discrete-event runtime
//!
//! A single loop over a virtual clock. Triggers and deliveries share one
//! time-ordered queue with FIFO tie-break, so a run is a pure function of the
//! topology: the same wiring always yields the same counters.

use crate::actor::{Actor, ActorStats};
use crate::error::{ActorError, Result};
use crate::messages::Message;
use crate::registry::{ActorId, ActorRegistry, TimerId};
use crate::report::RunReport;
use crate::router::FanOut;
use crate::scheduler::{DiscreteScheduler, Event, Mailer, Scheduler};
use crate::topology::{resolve_names, Topology};
use actorsim_config::{defaults, ExecutionModel, RuntimeConfig};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Discrete engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Virtual delay between a send and its delivery
    pub link_delay: Duration,
    /// Events processed per [`Simulation::run`] or [`Simulation::run_until`]
    /// call before it gives up
    pub event_limit: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            link_delay: Duration::from_millis(defaults::simulation::LINK_DELAY_MS),
            event_limit: defaults::simulation::EVENT_LIMIT,
        }
    }
}

impl From<&RuntimeConfig> for SimulationConfig {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            link_delay: Duration::from_millis(config.link_delay_ms),
            event_limit: config.event_limit,
        }
    }
}

/// Engine-wide counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationMetrics {
    pub events_processed: u64,
    pub triggers: u64,
    pub deliveries: u64,
    pub dropped_deliveries: u64,
    pub hook_failures: u64,
}

/// What one [`Simulation::step`] dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// An actor's own trigger fired
    Trigger { actor: ActorId, at: Duration, fan_out: FanOut },
    /// A message reached its target; `fan_out` is set when it caused a firing
    Delivery {
        from: ActorId,
        to: ActorId,
        at: Duration,
        fan_out: Option<FanOut>,
    },
    /// The target was gone by delivery time
    Dropped { to: ActorId, at: Duration },
}

/// Scheduler and mailer view handed to the actor being dispatched.
///
/// The firing actor is taken out of `peers` for the duration of the call, so
/// `current` counts as live even though the map does not hold it.
struct SimContext<'a> {
    scheduler: &'a mut DiscreteScheduler,
    peers: &'a HashMap<ActorId, Actor>,
    current: ActorId,
}

impl SimContext<'_> {
    fn is_live(&self, actor: &ActorId) -> bool {
        *actor == self.current || self.peers.contains_key(actor)
    }
}

impl Scheduler for SimContext<'_> {
    fn now(&self) -> Duration {
        self.scheduler.now()
    }

    fn schedule(&mut self, actor: ActorId, delay: Duration) -> Option<TimerId> {
        if !self.is_live(&actor) {
            debug!(actor_id = %actor, "Ignoring schedule request for unknown actor");
            return None;
        }
        Some(self.scheduler.arm(actor, delay))
    }

    fn cancel(&mut self, actor: ActorId) -> usize {
        self.scheduler.cancel_actor(actor)
    }
}

impl Mailer for SimContext<'_> {
    fn deliver(&mut self, from: ActorId, to: ActorId, message: Message) -> bool {
        if !self.is_live(&to) {
            debug!(from = %from, to = %to, "Dropped delivery to unresolved actor");
            return false;
        }
        self.scheduler.post(from, to, message);
        true
    }
}

/// Discrete-event runtime owning every actor of a topology
pub struct Simulation {
    scheduler: DiscreteScheduler,
    actors: HashMap<ActorId, Actor>,
    /// Declaration order, for reports
    order: Vec<ActorId>,
    names: HashMap<String, ActorId>,
    registry: ActorRegistry,
    config: SimulationConfig,
    metrics: SimulationMetrics,
    started: bool,
    finished: bool,
}

impl Simulation {
    pub fn new(topology: Topology) -> Self {
        Self::with_config(topology, SimulationConfig::default())
    }

    pub fn with_config(topology: Topology, config: SimulationConfig) -> Self {
        let routes = topology.routes();
        let (actors, names) = topology.into_parts();
        let order: Vec<ActorId> = actors.iter().map(Actor::id).collect();

        debug!(
            actors = order.len(),
            link_delay_ms = config.link_delay.as_millis() as u64,
            "Creating discrete-event simulation"
        );

        Self {
            scheduler: DiscreteScheduler::new(config.link_delay),
            actors: actors.into_iter().map(|actor| (actor.id(), actor)).collect(),
            order,
            names,
            registry: ActorRegistry::new(routes),
            config,
            metrics: SimulationMetrics::default(),
            started: false,
            finished: false,
        }
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn metrics(&self) -> SimulationMetrics {
        self.metrics
    }

    /// Current routing generation
    pub fn generation(&self) -> u64 {
        self.registry.generation()
    }

    pub fn id_of(&self, name: &str) -> Option<ActorId> {
        self.names.get(name).copied()
    }

    pub fn actor(&self, name: &str) -> Option<&Actor> {
        self.actors.get(&self.id_of(name)?)
    }

    /// Send count of `name`, if it is still part of the simulation
    pub fn send_count(&self, name: &str) -> Option<u64> {
        self.actor(name).map(Actor::send_count)
    }

    pub fn pending_events(&self) -> usize {
        self.scheduler.pending_events()
    }

    /// Arm every scheduled actor's initial trigger. Calling it again does nothing.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        for id in self.order.clone() {
            self.with_actor(id, |actor, ctx| actor.start(ctx));
        }
        info!(actors = self.order.len(), "Simulation started");
    }

    /// Arm an extra trigger for `actor` at `now + delay`; unknown actors are ignored
    pub fn schedule(&mut self, actor: ActorId, delay: Duration) -> Option<TimerId> {
        let actor_ref = self.actors.get_mut(&actor)?;
        let timer = self.scheduler.arm(actor, delay);
        actor_ref.note_armed();
        Some(timer)
    }

    /// Cancel every pending trigger of `actor`; idempotent
    pub fn cancel(&mut self, actor: ActorId) -> usize {
        self.with_actor(actor, |actor, ctx| actor.cancel_timers(ctx))
            .unwrap_or(0)
    }

    /// Dispatch the next pending event, if any. Starts the simulation first.
    pub fn step(&mut self) -> Result<Option<Dispatch>> {
        self.start();
        self.step_until(Duration::MAX)
    }

    /// Dispatch every event due at or before `until`, then move the clock to
    /// `until`. Stops at the first hook failure; calling again resumes.
    ///
    /// At most `event_limit` events are dispatched per call. When the limit
    /// cuts the run short the clock stays at the last dispatched event.
    pub fn run_until(&mut self, until: Duration) -> Result<u64> {
        self.start();
        let limit = self.config.event_limit;
        let mut processed = 0;
        while processed < limit {
            if self.step_until(until)?.is_none() {
                break;
            }
            processed += 1;
        }

        if self.scheduler.next_time().is_some_and(|next| next <= until) {
            warn!(
                limit,
                now_ms = self.now().as_millis() as u64,
                until_ms = until.as_millis() as u64,
                pending = self.scheduler.pending_events(),
                "Event limit reached before horizon"
            );
            return Ok(processed);
        }

        self.scheduler.advance_to(until);
        trace!(now_ms = self.now().as_millis() as u64, processed, "Ran simulation to horizon");
        Ok(processed)
    }

    /// Run for `duration` of virtual time from now
    pub fn run_for(&mut self, duration: Duration) -> Result<u64> {
        let until = self.now().saturating_add(duration);
        self.run_until(until)
    }

    /// Dispatch events until the queue drains or `limit` events were processed
    pub fn run(&mut self, limit: Option<u64>) -> Result<u64> {
        self.start();
        let limit = limit.unwrap_or(self.config.event_limit);
        let mut processed = 0;
        while processed < limit {
            if self.step()?.is_none() {
                return Ok(processed);
            }
            processed += 1;
        }
        if self.scheduler.pending_events() > 0 {
            warn!(limit, pending = self.scheduler.pending_events(), "Event limit reached with events pending");
        }
        Ok(processed)
    }

    /// Replace `name`'s target list with a new generation
    pub fn rewire(&mut self, name: &str, targets: &[&str]) -> Result<u64> {
        let id = self.id_of(name).ok_or_else(|| ActorError::unknown_actor(name))?;
        let targets = resolve_names(&self.names, targets)?;

        let previous = self
            .actors
            .remove(&id)
            .ok_or_else(|| ActorError::unknown_actor(name))?;
        let generation = self.registry.rewire(id, targets.clone());
        self.actors.insert(id, previous.rewired(targets));
        Ok(generation)
    }

    /// Cancel the actor's triggers and remove it. Deliveries already in
    /// flight to it, and sends still addressed to it, are counted as dropped.
    pub fn remove_actor(&mut self, name: &str) -> Result<ActorStats> {
        let id = self.names.remove(name).ok_or_else(|| ActorError::unknown_actor(name))?;
        let cancelled = self.scheduler.cancel_actor(id);
        self.registry.unregister(&id);
        self.order.retain(|other| *other != id);

        let actor = self
            .actors
            .remove(&id)
            .ok_or_else(|| ActorError::unknown_actor(name))?;
        info!(actor_id = %id, actor = name, cancelled, "Removed actor");
        Ok(actor.stats())
    }

    /// Counters so far, without stopping anything
    pub fn report(&self) -> RunReport {
        let stats = self
            .order
            .iter()
            .filter_map(|id| self.actors.get(id))
            .map(Actor::stats)
            .collect();
        RunReport::new(ExecutionModel::Discrete, self.now(), stats)
    }

    /// Cancel every pending trigger and log each actor's send count
    pub fn finish(&mut self) -> RunReport {
        if !self.finished {
            self.finished = true;
            for id in self.order.clone() {
                self.cancel(id);
            }
        }

        let report = self.report();
        report.log_summary();
        info!(
            now_ms = self.now().as_millis() as u64,
            events = self.metrics.events_processed,
            "Simulation finished"
        );
        report
    }

    fn step_until(&mut self, until: Duration) -> Result<Option<Dispatch>> {
        let Some((at, event)) = self.scheduler.pop_due(until) else {
            return Ok(None);
        };
        self.metrics.events_processed += 1;

        match event {
            Event::Trigger { actor, .. } => {
                self.metrics.triggers += 1;
                let outcome = self
                    .with_actor(actor, |actor, ctx| actor.on_timer(ctx))
                    .ok_or_else(|| ActorError::system(format!("Trigger for missing actor {actor}")))?;
                let fan_out = self.record(outcome)?;
                trace!(actor_id = %actor, at_ms = at.as_millis() as u64, sent = fan_out.attempted, "Dispatched trigger");
                Ok(Some(Dispatch::Trigger { actor, at, fan_out }))
            }
            Event::Deliver { from, to, message } => {
                let Some(outcome) = self.with_actor(to, |actor, ctx| actor.on_message(from, &message, ctx))
                else {
                    self.metrics.dropped_deliveries += 1;
                    debug!(from = %from, to = %to, "Dropped delivery to removed actor");
                    return Ok(Some(Dispatch::Dropped { to, at }));
                };
                self.metrics.deliveries += 1;
                let fan_out = match outcome {
                    Ok(fan_out) => fan_out,
                    Err(err) => return Err(self.note_failure(err)),
                };
                if let Some(fan_out) = fan_out {
                    self.metrics.dropped_deliveries += fan_out.dropped;
                }
                Ok(Some(Dispatch::Delivery { from, to, at, fan_out }))
            }
        }
    }

    fn record(&mut self, outcome: Result<FanOut>) -> Result<FanOut> {
        match outcome {
            Ok(fan_out) => {
                self.metrics.dropped_deliveries += fan_out.dropped;
                Ok(fan_out)
            }
            Err(err) => Err(self.note_failure(err)),
        }
    }

    fn note_failure(&mut self, err: ActorError) -> ActorError {
        if matches!(err, ActorError::Hook { .. }) {
            self.metrics.hook_failures += 1;
        }
        err
    }

    /// Run `f` against `id` with the actor temporarily taken out of the map
    fn with_actor<T>(
        &mut self,
        id: ActorId,
        f: impl FnOnce(&mut Actor, &mut SimContext<'_>) -> T,
    ) -> Option<T> {
        let mut actor = self.actors.remove(&id)?;
        let mut ctx = SimContext {
            scheduler: &mut self.scheduler,
            peers: &self.actors,
            current: id,
        };
        let result = f(&mut actor, &mut ctx);
        self.actors.insert(id, actor);
        Some(result)
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("now", &self.scheduler.now())
            .field("actors", &self.order.len())
            .field("pending_events", &self.scheduler.pending_events())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
