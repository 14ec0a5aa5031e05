use crate::messages::Message;
use crate::registry::{ActorId, TimerId};
use std::{cmp::Ordering, collections::BinaryHeap, time::Duration};

/// Events that can be scheduled on the virtual clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Self-trigger of an actor
    Trigger {
        /// The actor to fire.
        actor: ActorId,
        /// Timer that produced the trigger; stale once cancelled.
        timer: TimerId,
    },

    /// Message in flight between two actors
    Deliver {
        /// Sending actor
        from: ActorId,
        /// Receiving actor
        to: ActorId,
        /// The message itself
        message: Message,
    },
}

impl Event {
    /// The actor this event is dispatched to.
    pub fn actor(&self) -> ActorId {
        match self {
            Event::Trigger { actor, .. } => *actor,
            Event::Deliver { to, .. } => *to,
        }
    }
}

/// An event scheduled for execution at a specific virtual time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEvent {
    time: Duration,
    event: Event,
    sequence: u64, // For deterministic ordering
}

impl ScheduledEvent {
    /// Returns the scheduled execution time.
    pub fn time(&self) -> Duration {
        self.time
    }

    /// Returns the insertion sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns a reference to the event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Consumes the scheduled event and returns the event.
    pub fn into_event(self) -> Event {
        self.event
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap, but we want earliest time first
        match other.time.cmp(&self.time) {
            // Same time: lower sequence first
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            other => other,
        }
    }
}

/// A priority queue for scheduling events in chronological order.
///
/// Events at the same time pop in insertion order.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    next_sequence: u64,
}

impl EventQueue {
    /// Creates a new empty event queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules an event for execution at `time`.
    pub fn push(&mut self, time: Duration, event: Event) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ScheduledEvent {
            time,
            event,
            sequence,
        });
        sequence
    }

    /// Removes and returns the earliest scheduled event.
    pub fn pop_earliest(&mut self) -> Option<ScheduledEvent> {
        self.heap.pop()
    }

    /// Returns a reference to the earliest scheduled event without removing it.
    pub fn peek_earliest(&self) -> Option<&ScheduledEvent> {
        self.heap.peek()
    }

    /// Drops every event matching `predicate`, returning how many were removed.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&Event) -> bool) -> usize {
        let before = self.heap.len();
        self.heap.retain(|scheduled| !predicate(&scheduled.event));
        before - self.heap.len()
    }

    /// Returns `true` if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the number of events in the queue.
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
