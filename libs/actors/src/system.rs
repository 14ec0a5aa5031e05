//! Actor System Core
//!
//! Concurrent runtime: every actor of a topology runs as its own tokio task
//! with an unbounded mailbox and wall-clock timers. A firing has exclusive
//! access to its actor because only the owning task ever touches it.
//!
//! Rewiring publishes a new routing generation through the shared
//! [`ActorRegistry`]; each task compares generations before a firing and
//! rebuilds its actor value when the snapshot moved, so a fan-out never sees
//! a half-updated target list.
//!
//! # Lock Ordering
//!
//! `tasks` is the only lock held across calls, and never across an `.await`.

use crate::actor::{Actor, ActorStats};
use crate::error::{ActorError, Result};
use crate::mailbox::{Envelope, Mailbox, MailboxDirectory, MailboxReceiver};
use crate::registry::{ActorId, ActorRegistry, TimerId};
use crate::report::RunReport;
use crate::scheduler::WallClockContext;
use crate::topology::{resolve_names, Topology};
use actorsim_config::ExecutionModel;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Supervision directive applied when a firing fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorDirective {
    /// Keep processing; periodic triggers stay armed
    #[default]
    Resume,
    /// Stop the actor; later sends to it are dropped
    Stop,
}

/// Concurrent runtime settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemConfig {
    pub on_hook_failure: SupervisorDirective,
}

/// System-wide metrics
#[derive(Debug, Default)]
pub struct SystemMetrics {
    pub actors_spawned: AtomicU64,
    pub actors_stopped: AtomicU64,
    pub messages_delivered: AtomicU64,
    pub deliveries_dropped: AtomicU64,
    pub firings: AtomicU64,
    pub hook_failures: AtomicU64,
    pub timers_armed: AtomicU64,
}

/// Plain copy of [`SystemMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SystemStats {
    pub actors_spawned: u64,
    pub actors_stopped: u64,
    pub messages_delivered: u64,
    pub deliveries_dropped: u64,
    pub firings: u64,
    pub hook_failures: u64,
    pub timers_armed: u64,
}

impl SystemMetrics {
    pub fn snapshot(&self) -> SystemStats {
        SystemStats {
            actors_spawned: self.actors_spawned.load(Ordering::Relaxed),
            actors_stopped: self.actors_stopped.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            deliveries_dropped: self.deliveries_dropped.load(Ordering::Relaxed),
            firings: self.firings.load(Ordering::Relaxed),
            hook_failures: self.hook_failures.load(Ordering::Relaxed),
            timers_armed: self.timers_armed.load(Ordering::Relaxed),
        }
    }
}

/// Counters published by a running actor after every envelope
type LiveStats = Arc<RwLock<ActorStats>>;

/// Core actor system running one task per actor
pub struct ActorSystem {
    system_id: String,
    registry: Arc<ActorRegistry>,
    directory: MailboxDirectory,
    tasks: Mutex<HashMap<ActorId, JoinHandle<Actor>>>,
    names: HashMap<String, ActorId>,
    /// Declaration order, for reports
    order: Vec<ActorId>,
    live: HashMap<ActorId, LiveStats>,
    metrics: Arc<SystemMetrics>,
    epoch: Instant,
}

impl ActorSystem {
    /// Spawn every actor of `topology`. Must be called inside a tokio runtime.
    pub fn start(topology: Topology, config: SystemConfig) -> Result<Self> {
        tokio::runtime::Handle::try_current()
            .map_err(|e| ActorError::system(format!("Actor system needs a tokio runtime: {e}")))?;

        let system_id = format!("system-{}", Uuid::new_v4());
        let routes = topology.routes();
        let (actors, names) = topology.into_parts();
        let order: Vec<ActorId> = actors.iter().map(Actor::id).collect();

        let registry = Arc::new(ActorRegistry::new(routes));
        let directory = MailboxDirectory::new();
        let metrics = Arc::new(SystemMetrics::default());
        let epoch = Instant::now();

        // Every mailbox must resolve before the first initial trigger can fire
        let receivers: Vec<(Actor, Mailbox, MailboxReceiver)> = actors
            .into_iter()
            .map(|actor| {
                let (mailbox, receiver) = Mailbox::new();
                directory.insert(actor.id(), mailbox.clone());
                (actor, mailbox, receiver)
            })
            .collect();

        let mut tasks = HashMap::with_capacity(receivers.len());
        let mut live = HashMap::with_capacity(receivers.len());
        for (actor, mailbox, receiver) in receivers {
            let id = actor.id();
            let stats = Arc::new(RwLock::new(actor.stats()));
            let task = ActorTask {
                generation: registry.generation(),
                ctx: WallClockContext::new(id, mailbox, directory.clone(), epoch, Arc::clone(&metrics)),
                actor,
                receiver,
                registry: Arc::clone(&registry),
                stats: Arc::clone(&stats),
                metrics: Arc::clone(&metrics),
                on_hook_failure: config.on_hook_failure,
            };
            tasks.insert(id, tokio::spawn(task.run()));
            live.insert(id, stats);
            metrics.actors_spawned.fetch_add(1, Ordering::Relaxed);
        }

        info!(
            system_id = %system_id,
            actors = order.len(),
            on_hook_failure = ?config.on_hook_failure,
            "Actor system started"
        );

        Ok(Self {
            system_id,
            registry,
            directory,
            tasks: Mutex::new(tasks),
            names,
            order,
            live,
            metrics,
            epoch,
        })
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    /// Elapsed wall-clock time since start
    pub fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    pub fn metrics(&self) -> Arc<SystemMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn generation(&self) -> u64 {
        self.registry.generation()
    }

    pub fn id_of(&self, name: &str) -> Option<ActorId> {
        self.names.get(name).copied()
    }

    /// Counters as last published by the actor's task
    pub fn stats(&self, name: &str) -> Option<ActorStats> {
        let id = self.id_of(name)?;
        self.live.get(&id).map(|stats| stats.read().clone())
    }

    pub fn send_count(&self, name: &str) -> Option<u64> {
        self.stats(name).map(|stats| stats.sent)
    }

    /// Arm an extra trigger for `actor` at `now + delay`; unknown or stopped
    /// actors are ignored
    pub async fn schedule(&self, actor: ActorId, delay: Duration) -> Option<TimerId> {
        let (reply, response) = oneshot::channel();
        if !self.directory.send(&actor, Envelope::Arm { delay, reply: Some(reply) }) {
            debug!(actor_id = %actor, "Ignoring schedule request for unknown actor");
            return None;
        }
        response.await.ok()
    }

    /// Cancel every pending trigger of `actor`; idempotent
    pub async fn cancel_timers(&self, actor: ActorId) -> usize {
        let (reply, response) = oneshot::channel();
        if !self.directory.send(&actor, Envelope::CancelTimers { reply: Some(reply) }) {
            return 0;
        }
        response.await.unwrap_or(0)
    }

    /// Publish a new routing generation for `name`; the actor rebuilds
    /// itself before its next firing
    pub fn rewire(&self, name: &str, targets: &[&str]) -> Result<u64> {
        let id = self.id_of(name).ok_or_else(|| ActorError::unknown_actor(name))?;
        let targets = resolve_names(&self.names, targets)?;
        Ok(self.registry.rewire(id, targets))
    }

    /// Stop one actor and return its final counters
    pub async fn stop_actor(&self, name: &str) -> Result<ActorStats> {
        let id = self.id_of(name).ok_or_else(|| ActorError::unknown_actor(name))?;
        let Some(task) = self.tasks.lock().remove(&id) else {
            warn!(actor_id = %id, actor = name, "Attempted to stop actor that is not running");
            return Err(ActorError::system(format!("Actor '{name}' is not running")));
        };

        self.directory.send(&id, Envelope::Stop);
        let actor = task
            .await
            .map_err(|e| ActorError::system(format!("Actor '{name}' task failed: {e}")))?;

        self.directory.remove(&id);
        self.registry.unregister(&id);
        self.metrics.actors_stopped.fetch_add(1, Ordering::Relaxed);
        info!(actor_id = %id, actor = name, "Actor stopped and cleaned up");
        Ok(actor.stats())
    }

    /// Let the system run for `duration`, then shut it down
    pub async fn run_for(self, duration: Duration) -> Result<RunReport> {
        tokio::time::sleep(duration).await;
        self.shutdown().await
    }

    /// Stop every actor, cancel their timers and report final counters
    pub async fn shutdown(self) -> Result<RunReport> {
        info!("Shutting down actor system {}", self.system_id);

        let tasks: Vec<(ActorId, JoinHandle<Actor>)> = self.tasks.lock().drain().collect();
        for (id, _) in &tasks {
            self.directory.send(id, Envelope::Stop);
        }

        let (ids, handles): (Vec<ActorId>, Vec<JoinHandle<Actor>>) = tasks.into_iter().unzip();
        let mut finished = HashMap::with_capacity(ids.len());
        for (id, joined) in ids.into_iter().zip(futures::future::join_all(handles).await) {
            match joined {
                Ok(actor) => {
                    finished.insert(id, actor.stats());
                }
                Err(e) => {
                    error!(actor_id = %id, error = %e, "Actor task failed during shutdown");
                    return Err(ActorError::system(format!("Actor task {id} failed: {e}")));
                }
            }
            self.metrics.actors_stopped.fetch_add(1, Ordering::Relaxed);
        }

        let stats = self
            .order
            .iter()
            .filter_map(|id| finished.remove(id))
            .collect();
        let report = RunReport::new(ExecutionModel::Concurrent, self.now(), stats);
        report.log_summary();

        info!(
            system_id = %self.system_id,
            elapsed_ms = report.elapsed_ms,
            metrics = ?self.metrics.snapshot(),
            "Actor system shutdown complete"
        );
        Ok(report)
    }
}

impl Drop for ActorSystem {
    fn drop(&mut self) {
        let remaining: Vec<_> = self.tasks.lock().drain().collect();
        if !remaining.is_empty() {
            warn!("Aborting {} remaining tasks during drop", remaining.len());
            for (_, task) in remaining {
                task.abort();
            }
        }
    }
}

impl std::fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorSystem")
            .field("system_id", &self.system_id)
            .field("actors", &self.order.len())
            .field("generation", &self.registry.generation())
            .finish_non_exhaustive()
    }
}

/// Task owning one actor
struct ActorTask {
    actor: Actor,
    receiver: MailboxReceiver,
    ctx: WallClockContext,
    registry: Arc<ActorRegistry>,
    generation: u64,
    stats: LiveStats,
    metrics: Arc<SystemMetrics>,
    on_hook_failure: SupervisorDirective,
}

impl ActorTask {
    async fn run(self) -> Actor {
        let ActorTask {
            mut actor,
            mut receiver,
            mut ctx,
            registry,
            mut generation,
            stats,
            metrics,
            on_hook_failure,
        } = self;
        let id = actor.id();

        actor.start(&mut ctx);
        *stats.write() = actor.stats();
        debug!(actor_id = %id, actor = actor.name(), "Actor entering message loop");

        while let Some(envelope) = receiver.recv().await {
            let outcome = match envelope {
                Envelope::Tick(timer) => {
                    if !ctx.take_tick(timer) {
                        trace!(actor_id = %id, %timer, "Skipping cancelled trigger");
                        continue;
                    }
                    actor = refresh_routes(actor, &registry, &mut generation);
                    metrics.firings.fetch_add(1, Ordering::Relaxed);
                    actor.on_timer(&mut ctx).map(|_| ())
                }
                Envelope::Deliver { from, message } => {
                    actor = refresh_routes(actor, &registry, &mut generation);
                    actor.on_message(from, &message, &mut ctx).map(|fan_out| {
                        if fan_out.is_some() {
                            metrics.firings.fetch_add(1, Ordering::Relaxed);
                        }
                    })
                }
                Envelope::Arm { delay, reply } => {
                    let timer = ctx.arm_local(delay);
                    actor.note_armed();
                    if let Some(reply) = reply {
                        let _ = reply.send(timer);
                    }
                    Ok(())
                }
                Envelope::CancelTimers { reply } => {
                    let cancelled = actor.cancel_timers(&mut ctx);
                    if let Some(reply) = reply {
                        let _ = reply.send(cancelled);
                    }
                    Ok(())
                }
                Envelope::Stop => break,
            };
            *stats.write() = actor.stats();

            if let Err(e) = outcome {
                metrics.hook_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    actor_id = %id,
                    error = %e,
                    error_category = e.category(),
                    "Actor firing failed"
                );
                if on_hook_failure == SupervisorDirective::Stop {
                    warn!(actor_id = %id, directive = "Stop", "Stopping actor due to error directive");
                    break;
                }
            }
        }

        let cancelled = actor.cancel_timers(&mut ctx);
        *stats.write() = actor.stats();
        debug!(actor_id = %id, cancelled, "Actor stopped");
        actor
    }
}

/// Rebuild `actor` if the routing snapshot moved since it last looked
fn refresh_routes(actor: Actor, registry: &ActorRegistry, generation: &mut u64) -> Actor {
    let snapshot = registry.snapshot();
    if snapshot.generation() == *generation {
        return actor;
    }
    *generation = snapshot.generation();

    match snapshot.targets(&actor.id()) {
        Some(targets) if targets != actor.targets() => actor.rewired(targets.clone()),
        _ => actor,
    }
}
