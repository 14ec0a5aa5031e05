//! Topology construction
//!
//! A topology is the fixed directed graph of actors, wired by name before a
//! run starts. Every shape (pipeline, pub/sub, load-balanced fan-out, burst
//! generator) is expressed purely through target lists.

use crate::actor::{Actor, ActorSpec};
use crate::error::{ActorError, Result};
use crate::hook::{NoopHook, TriggerHook};
use crate::registry::{ActorId, RoutingTable, TargetList};
use crate::schedule::ScheduleSpec;
use actorsim_config::{ActorConfig, MeshConfig};
use std::collections::HashMap;
use tracing::{debug, info};

/// Collects actor specs and name-based wiring, validated by [`build`](Self::build)
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    specs: Vec<ActorSpec>,
    wiring: HashMap<String, Vec<String>>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, spec: ActorSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn actors(mut self, specs: impl IntoIterator<Item = ActorSpec>) -> Self {
        self.specs.extend(specs);
        self
    }

    /// Append `targets` to `from`'s target list, keeping order
    pub fn wire<I, S>(mut self, from: &str, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wiring
            .entry(from.to_string())
            .or_default()
            .extend(targets.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<Topology> {
        let mut ids: HashMap<String, ActorId> = HashMap::with_capacity(self.specs.len());
        for spec in &self.specs {
            if spec.name.is_empty() {
                return Err(ActorError::configuration("Actor name must not be empty", Some("name")));
            }
            if ids.insert(spec.name.clone(), ActorId::new()).is_some() {
                return Err(ActorError::topology(format!("Duplicate actor name '{}'", spec.name)));
            }
        }

        for (from, targets) in &self.wiring {
            if !ids.contains_key(from) {
                return Err(ActorError::topology(format!("Wiring refers to unknown actor '{from}'")));
            }
            if let Some(unknown) = targets.iter().find(|target| !ids.contains_key(*target)) {
                return Err(ActorError::topology(format!(
                    "Actor '{from}' targets unknown actor '{unknown}'"
                )));
            }
        }

        let mut wiring = self.wiring;
        let actors: Vec<Actor> = self
            .specs
            .into_iter()
            .map(|spec| {
                let id = ids[&spec.name];
                let targets: TargetList = wiring
                    .remove(&spec.name)
                    .unwrap_or_default()
                    .iter()
                    .map(|target| ids[target])
                    .collect();
                Actor::from_spec(id, spec, targets)
            })
            .collect();

        info!(actors = actors.len(), "Topology built");
        Ok(Topology {
            actors,
            ids,
            generation: 0,
        })
    }
}

/// Fixed actor graph ready to be handed to a runtime
#[derive(Debug)]
pub struct Topology {
    /// Declaration order
    actors: Vec<Actor>,
    ids: HashMap<String, ActorId>,
    generation: u64,
}

impl Topology {
    pub fn builder() -> TopologyBuilder {
        TopologyBuilder::new()
    }

    /// Linear chain: each stage targets the next; the last stage is the sink
    pub fn pipeline(stages: impl IntoIterator<Item = ActorSpec>) -> Result<Self> {
        let stages: Vec<ActorSpec> = stages.into_iter().collect();
        let names: Vec<String> = stages.iter().map(|stage| stage.name.clone()).collect();

        let mut builder = TopologyBuilder::new().actors(stages);
        for pair in names.windows(2) {
            builder = builder.wire(&pair[0], [pair[1].clone()]);
        }
        builder.build()
    }

    /// One publisher broadcasting to every subscriber
    pub fn pub_sub(publisher: ActorSpec, subscribers: impl IntoIterator<Item = ActorSpec>) -> Result<Self> {
        let subscribers: Vec<ActorSpec> = subscribers.into_iter().collect();
        let names: Vec<String> = subscribers.iter().map(|s| s.name.clone()).collect();
        let from = publisher.name.clone();

        TopologyBuilder::new()
            .actor(publisher)
            .actors(subscribers)
            .wire(&from, names)
            .build()
    }

    /// Balancer fanning out to every server; servers optionally forward to a sink
    pub fn load_balanced(
        balancer: ActorSpec,
        servers: impl IntoIterator<Item = ActorSpec>,
        sink: Option<ActorSpec>,
    ) -> Result<Self> {
        let servers: Vec<ActorSpec> = servers.into_iter().collect();
        let names: Vec<String> = servers.iter().map(|s| s.name.clone()).collect();
        let from = balancer.name.clone();

        let mut builder = TopologyBuilder::new()
            .actor(balancer)
            .actors(servers)
            .wire(&from, names.clone());

        if let Some(sink) = sink {
            let sink_name = sink.name.clone();
            builder = builder.actor(sink);
            for server in &names {
                builder = builder.wire(server, [sink_name.clone()]);
            }
        }
        builder.build()
    }

    /// Scheduled generator sending its burst to a single target
    pub fn burst(generator: ActorSpec, target: ActorSpec) -> Result<Self> {
        let (from, to) = (generator.name.clone(), target.name.clone());
        TopologyBuilder::new()
            .actor(generator)
            .actor(target)
            .wire(&from, [to])
            .build()
    }

    /// Build from configuration with no-op hooks
    pub fn from_config(config: &MeshConfig) -> Result<Self> {
        Self::from_config_with_hooks(config, |_| Box::new(NoopHook))
    }

    /// Build from configuration, asking `hooks` for each actor's hook
    pub fn from_config_with_hooks<F>(config: &MeshConfig, mut hooks: F) -> Result<Self>
    where
        F: FnMut(&ActorConfig) -> Box<dyn TriggerHook>,
    {
        config.validate()?;

        let mut builder = TopologyBuilder::new();
        for actor in &config.actors {
            let mut spec = ActorSpec::new(actor.name.clone())
                .emits(actor.message.as_str())
                .burst(actor.effective_burst_count())
                .boxed_hook(hooks(actor));
            if let Some(schedule) = &actor.schedule {
                spec = spec.schedule(ScheduleSpec::from(schedule));
            }
            if let Some(accepts) = &actor.accepts {
                spec = spec.accepts(accepts.iter().map(String::as_str));
            }
            builder = builder.actor(spec).wire(&actor.name, actor.targets.iter().cloned());
        }

        debug!(actors = config.actors.len(), "Building topology from configuration");
        builder.build()
    }

    pub fn id_of(&self, name: &str) -> Option<ActorId> {
        self.ids.get(name).copied()
    }

    pub fn actor(&self, name: &str) -> Option<&Actor> {
        let id = self.id_of(name)?;
        self.actors.iter().find(|actor| actor.id() == id)
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Routing table of the current wiring, at the current generation
    pub fn routes(&self) -> RoutingTable {
        let routes = self
            .actors
            .iter()
            .map(|actor| (actor.id(), actor.targets().clone()))
            .collect();
        RoutingTable::at_generation(routes, self.generation)
    }

    /// Replace `name`'s targets; the actor is rebuilt with the same id.
    /// Returns the new wiring generation.
    pub fn rewire(&mut self, name: &str, targets: &[&str]) -> Result<u64> {
        let id = self.id_of(name).ok_or_else(|| ActorError::unknown_actor(name))?;
        let targets = self.resolve(targets)?;

        let position = self
            .actors
            .iter()
            .position(|actor| actor.id() == id)
            .ok_or_else(|| ActorError::unknown_actor(name))?;
        let previous = self.actors.remove(position);
        self.actors.insert(position, previous.rewired(targets));

        self.generation += 1;
        Ok(self.generation)
    }

    pub(crate) fn resolve(&self, names: &[&str]) -> Result<TargetList> {
        resolve_names(&self.ids, names)
    }

    /// Actors in declaration order, plus the name index
    pub fn into_parts(self) -> (Vec<Actor>, HashMap<String, ActorId>) {
        (self.actors, self.ids)
    }
}

/// Look up every name, preserving order
pub(crate) fn resolve_names(ids: &HashMap<String, ActorId>, names: &[&str]) -> Result<TargetList> {
    names
        .iter()
        .map(|name| ids.get(*name).copied().ok_or_else(|| ActorError::unknown_actor(*name)))
        .collect()
}
