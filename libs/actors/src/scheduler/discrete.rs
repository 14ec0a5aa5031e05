//! Virtual-clock scheduler for the discrete-event model.

use super::event_queue::{Event, EventQueue};
use crate::messages::Message;
use crate::registry::{ActorId, TimerId};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::trace;

/// Virtual clock plus the pending event set.
///
/// Owns no actors: liveness checks are the caller's job, so the engine can
/// decide what "unknown actor" means at dispatch time.
#[derive(Debug, Default)]
pub struct DiscreteScheduler {
    now: Duration,
    queue: EventQueue,
    live_timers: HashMap<ActorId, BTreeSet<TimerId>>,
    next_timer: u64,
    link_delay: Duration,
}

impl DiscreteScheduler {
    pub fn new(link_delay: Duration) -> Self {
        Self {
            link_delay,
            ..Self::default()
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Queue a trigger for `actor` at `now + delay`.
    pub fn arm(&mut self, actor: ActorId, delay: Duration) -> TimerId {
        let timer = TimerId(self.next_timer);
        self.next_timer += 1;

        let fire_at = self.now + delay;
        self.queue.push(fire_at, Event::Trigger { actor, timer });
        self.live_timers.entry(actor).or_default().insert(timer);

        trace!(actor_id = %actor, %timer, fire_at_ms = fire_at.as_millis() as u64, "Armed trigger");
        timer
    }

    /// Queue a delivery at `now + link_delay`.
    pub fn post(&mut self, from: ActorId, to: ActorId, message: Message) {
        self.queue.push(self.now + self.link_delay, Event::Deliver { from, to, message });
    }

    /// Remove every pending trigger of `actor`.
    pub fn cancel_actor(&mut self, actor: ActorId) -> usize {
        let Some(timers) = self.live_timers.remove(&actor) else {
            return 0;
        };
        self.queue.remove_where(|event| {
            matches!(event, Event::Trigger { timer, .. } if timers.contains(timer))
        });
        timers.len()
    }

    pub fn pending_timers(&self, actor: ActorId) -> usize {
        self.live_timers.get(&actor).map_or(0, BTreeSet::len)
    }

    /// Fire time of the earliest pending event
    pub fn next_time(&self) -> Option<Duration> {
        self.queue.peek_earliest().map(|event| event.time())
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Pop the earliest event due at or before `until`, advancing the clock
    /// to its fire time. Triggers whose timer was cancelled are skipped.
    pub fn pop_due(&mut self, until: Duration) -> Option<(Duration, Event)> {
        loop {
            let next = self.queue.peek_earliest()?.time();
            if next > until {
                return None;
            }

            let scheduled = self.queue.pop_earliest()?;
            self.now = self.now.max(scheduled.time());
            let event = scheduled.into_event();

            if let Event::Trigger { actor, timer } = &event {
                let live = self
                    .live_timers
                    .get_mut(actor)
                    .is_some_and(|timers| timers.remove(timer));
                if !live {
                    trace!(actor_id = %actor, %timer, "Skipping stale trigger");
                    continue;
                }
                if self.live_timers.get(actor).is_some_and(BTreeSet::is_empty) {
                    self.live_timers.remove(actor);
                }
            }

            return Some((self.now, event));
        }
    }

    /// Move the clock forward to `time`; never moves it backwards.
    pub fn advance_to(&mut self, time: Duration) {
        self.now = self.now.max(time);
    }
}
