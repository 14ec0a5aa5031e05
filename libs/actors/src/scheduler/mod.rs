//! Scheduling seam
//!
//! Actor logic talks to its runtime only through [`ActorContext`]: a
//! [`Scheduler`] for timed self-triggers and a [`Mailer`] for deliveries.
//! Two implementations exist:
//!
//! - [`DiscreteScheduler`]: virtual clock, time-ordered event queue, FIFO ties
//! - [`WallClockContext`]: per-actor tokio timers feeding the actor's mailbox

pub mod discrete;
pub mod event_queue;
pub mod wall_clock;

pub use discrete::DiscreteScheduler;
pub use event_queue::{Event, EventQueue, ScheduledEvent};
pub use wall_clock::WallClockContext;

use crate::messages::Message;
use crate::registry::{ActorId, TimerId};
use std::time::Duration;

/// Timed trigger facility
pub trait Scheduler {
    /// Current time: virtual in the discrete model, elapsed since start otherwise
    fn now(&self) -> Duration;

    /// Arrange a trigger for `actor` at `now + delay`.
    ///
    /// Every call yields an independent trigger. Unknown actors are ignored
    /// and yield `None`.
    fn schedule(&mut self, actor: ActorId, delay: Duration) -> Option<TimerId>;

    /// Drop every pending trigger of `actor`; returns how many were pending.
    /// Calling it again is a no-op returning zero.
    fn cancel(&mut self, actor: ActorId) -> usize;
}

/// Message delivery facility
pub trait Mailer {
    /// Hand `message` to `to` without waiting for it to be processed.
    ///
    /// Returns `false` when the target does not resolve; the message is then
    /// dropped.
    fn deliver(&mut self, from: ActorId, to: ActorId, message: Message) -> bool;
}

/// Everything an actor needs from its runtime during a firing
pub trait ActorContext: Scheduler + Mailer {}

impl<T: Scheduler + Mailer + ?Sized> ActorContext for T {}
