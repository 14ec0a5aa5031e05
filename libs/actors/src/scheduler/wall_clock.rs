//! Wall-clock scheduler for the concurrent model.
//!
//! Each actor task owns one context. A trigger is a detached tokio sleep that
//! posts `Envelope::Tick` into the actor's own mailbox (a delayed self-send),
//! so firings are serialized with message handling.

use super::{Mailer, Scheduler};
use crate::mailbox::{Envelope, Mailbox, MailboxDirectory};
use crate::messages::Message;
use crate::registry::{ActorId, TimerId};
use crate::system::SystemMetrics;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Per-actor view of the concurrent runtime
pub struct WallClockContext {
    self_id: ActorId,
    self_mailbox: Mailbox,
    directory: MailboxDirectory,
    timers: HashMap<TimerId, AbortHandle>,
    next_timer: u64,
    epoch: Instant,
    metrics: Arc<SystemMetrics>,
}

impl WallClockContext {
    pub(crate) fn new(
        self_id: ActorId,
        self_mailbox: Mailbox,
        directory: MailboxDirectory,
        epoch: Instant,
        metrics: Arc<SystemMetrics>,
    ) -> Self {
        Self {
            self_id,
            self_mailbox,
            directory,
            timers: HashMap::new(),
            next_timer: 0,
            epoch,
            metrics,
        }
    }

    /// Start a tokio timer that ticks this actor after `delay`
    pub(crate) fn arm_local(&mut self, delay: Duration) -> TimerId {
        let timer = TimerId(self.next_timer);
        self.next_timer += 1;

        let deadline = Instant::now() + delay;
        let mailbox = self.self_mailbox.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            mailbox.send(Envelope::Tick(timer));
        });
        self.timers.insert(timer, handle.abort_handle());
        self.metrics.timers_armed.fetch_add(1, Ordering::Relaxed);

        trace!(actor_id = %self.self_id, %timer, delay_ms = delay.as_millis() as u64, "Armed wall-clock trigger");
        timer
    }

    /// Consume a tick; `false` if its timer was cancelled meanwhile
    pub(crate) fn take_tick(&mut self, timer: TimerId) -> bool {
        self.timers.remove(&timer).is_some()
    }

    pub(crate) fn cancel_local(&mut self) -> usize {
        let cancelled = self.timers.len();
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        cancelled
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

impl Scheduler for WallClockContext {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn schedule(&mut self, actor: ActorId, delay: Duration) -> Option<TimerId> {
        if actor == self.self_id {
            return Some(self.arm_local(delay));
        }

        // Another actor's timers belong to that actor's task
        let forwarded = self.directory.send(&actor, Envelope::Arm { delay, reply: None });
        if !forwarded {
            debug!(actor_id = %actor, "Ignoring schedule request for unknown actor");
        }
        None
    }

    fn cancel(&mut self, actor: ActorId) -> usize {
        if actor == self.self_id {
            return self.cancel_local();
        }
        self.directory.send(&actor, Envelope::CancelTimers { reply: None });
        0
    }
}

impl Mailer for WallClockContext {
    fn deliver(&mut self, from: ActorId, to: ActorId, message: Message) -> bool {
        let delivered = self.directory.send(&to, Envelope::Deliver { from, message });
        if delivered {
            self.metrics.messages_delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.deliveries_dropped.fetch_add(1, Ordering::Relaxed);
            debug!(from = %from, to = %to, "Dropped delivery to unresolved actor");
        }
        delivered
    }
}

impl Drop for WallClockContext {
    fn drop(&mut self) {
        self.cancel_local();
    }
}
