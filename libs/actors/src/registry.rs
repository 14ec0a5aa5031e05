//! Actor Registry
//!
//! Stable actor identities and the versioned routing snapshot that maps each
//! actor to its target list. Snapshots are immutable; rewiring publishes a new
//! generation instead of editing a list a router may be reading.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique actor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId {
    id: Uuid,
}

impl ActorId {
    /// Create new actor ID
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    /// Create from UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self { id }
    }

    /// Get UUID
    pub fn uuid(&self) -> Uuid {
        self.id
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.id.simple())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one pending trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Ordered, immutable target list shared between snapshots and actors
pub type TargetList = Arc<[ActorId]>;

/// One generation of the routing table
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    generation: u64,
    routes: HashMap<ActorId, TargetList>,
}

impl RoutingTable {
    /// Create generation zero from the wired topology
    pub fn new(routes: HashMap<ActorId, TargetList>) -> Self {
        Self::at_generation(routes, 0)
    }

    /// Resume numbering from a topology that was already rewired
    pub fn at_generation(routes: HashMap<ActorId, TargetList>, generation: u64) -> Self {
        Self { generation, routes }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Targets of an actor in this generation
    pub fn targets(&self, id: &ActorId) -> Option<&TargetList> {
        self.routes.get(id)
    }

    pub fn contains(&self, id: &ActorId) -> bool {
        self.routes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Derive the next generation with one actor's targets replaced
    pub fn with_targets(&self, id: ActorId, targets: TargetList) -> Self {
        let mut routes = self.routes.clone();
        routes.insert(id, targets);
        Self {
            generation: self.generation + 1,
            routes,
        }
    }

    /// Derive the next generation without an actor; references to it
    /// elsewhere stay in place and resolve to dropped deliveries
    pub fn without(&self, id: &ActorId) -> Self {
        let mut routes = self.routes.clone();
        routes.remove(id);
        Self {
            generation: self.generation + 1,
            routes,
        }
    }
}

/// Shared, atomically swapped routing snapshot
#[derive(Debug)]
pub struct ActorRegistry {
    current: ArcSwap<RoutingTable>,
}

impl ActorRegistry {
    pub fn new(table: RoutingTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
        }
    }

    /// Current snapshot; stays valid even if a rewire lands meanwhile
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }

    /// Publish a new generation with `id` pointing at `targets`
    pub fn rewire(&self, id: ActorId, targets: TargetList) -> u64 {
        let previous = self.current.rcu(|table| table.with_targets(id, targets.clone()));
        let generation = previous.generation() + 1;
        tracing::debug!(actor_id = %id, generation, "Published routing generation");
        generation
    }

    /// Publish a new generation without `id`
    pub fn unregister(&self, id: &ActorId) -> bool {
        if !self.current.load().contains(id) {
            tracing::warn!("Attempted to unregister unknown actor: {}", id);
            return false;
        }
        self.current.rcu(|table| table.without(id));
        true
    }

    pub fn contains_actor(&self, id: &ActorId) -> bool {
        self.current.load().contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_of(pairs: &[(ActorId, &[ActorId])]) -> RoutingTable {
        RoutingTable::new(
            pairs
                .iter()
                .map(|(id, targets)| (*id, TargetList::from(targets.to_vec())))
                .collect(),
        )
    }

    #[test]
    fn test_actor_id_creation() {
        let id1 = ActorId::new();
        let id2 = ActorId::new();

        assert_ne!(id1, id2);
        assert_ne!(id1.uuid(), id2.uuid());
    }

    #[test]
    fn test_actor_id_display() {
        let id = ActorId::new();
        assert!(id.to_string().starts_with("actor-"));
    }

    #[test]
    fn test_rewire_bumps_generation_and_keeps_old_snapshot() {
        let (a, b, c) = (ActorId::new(), ActorId::new(), ActorId::new());
        let registry = ActorRegistry::new(table_of(&[(a, &[b]), (b, &[]), (c, &[])]));

        let before = registry.snapshot();
        let generation = registry.rewire(a, TargetList::from(vec![b, c]));

        assert_eq!(generation, 1);
        assert_eq!(registry.generation(), 1);
        assert_eq!(before.targets(&a).unwrap().as_ref(), &[b]);
        assert_eq!(registry.snapshot().targets(&a).unwrap().as_ref(), &[b, c]);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let a = ActorId::new();
        let registry = ActorRegistry::new(table_of(&[(a, &[])]));

        assert!(registry.unregister(&a));
        let generation = registry.generation();
        assert!(!registry.unregister(&a));
        assert_eq!(registry.generation(), generation);
        assert!(!registry.contains_actor(&a));
    }

    #[test]
    fn test_seeded_generation_keeps_counting() {
        let a = ActorId::new();
        let registry = ActorRegistry::new(RoutingTable::at_generation(
            [(a, TargetList::from(Vec::new()))].into_iter().collect(),
            3,
        ));

        assert_eq!(registry.generation(), 3);
        assert_eq!(registry.rewire(a, TargetList::from(vec![a])), 4);
    }
}
