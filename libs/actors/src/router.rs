//! Fan-out router
//!
//! Sends `burst_count` rounds of one message per target, rounds outermost,
//! targets in list order within a round. Every attempt counts as a send even
//! if the target no longer resolves.

use crate::messages::{Message, MessageKind};
use crate::registry::ActorId;
use crate::scheduler::Mailer;
use tracing::trace;

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    /// Messages handed to the mailer (`burst_count × |targets|`)
    pub attempted: u64,
    /// Attempts whose target did not resolve
    pub dropped: u64,
}

impl FanOut {
    pub fn delivered(&self) -> u64 {
        self.attempted - self.dropped
    }
}

/// Stateless fan-out sender
pub struct Router;

impl Router {
    pub fn fan_out<M>(
        from: ActorId,
        targets: &[ActorId],
        burst_count: u32,
        kind: &MessageKind,
        mailer: &mut M,
    ) -> FanOut
    where
        M: Mailer + ?Sized,
    {
        let mut outcome = FanOut::default();
        if targets.is_empty() {
            return outcome;
        }

        for _ in 0..burst_count {
            for target in targets {
                outcome.attempted += 1;
                if !mailer.deliver(from, *target, Message::new(kind.clone())) {
                    outcome.dropped += 1;
                }
            }
        }

        trace!(
            actor_id = %from,
            attempted = outcome.attempted,
            dropped = outcome.dropped,
            "Fan-out complete"
        );
        outcome
    }
}
