//! Actor trigger state machine
//!
//! One actor type for every role. What varies between a generator, a
//! balancer, a pipeline stage and a sink is data: the schedule, the burst,
//! the target list and the hook.
//!
//! ```text
//!   Idle ──arm──▶ Scheduled ──trigger──▶ Firing ──┬──▶ Scheduled (timers left / re-armed)
//!    ▲                                            └──▶ Idle      (one-shot, none left)
//!    └──────────────── cancel ───────────────────────────────────┘
//! ```

use crate::error::{ActorError, Result};
use crate::hook::{NoopHook, TriggerHook};
use crate::messages::{Message, MessageKind};
use crate::registry::{ActorId, TargetList};
use crate::router::{FanOut, Router};
use crate::schedule::ScheduleSpec;
use crate::scheduler::ActorContext;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, trace, warn};

/// Trigger state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActorState {
    /// No pending self-trigger
    Idle,
    /// One or more triggers pending
    Scheduled,
    /// Running hook and fan-out
    Firing,
}

/// Declarative description of an actor, before it has an id or targets
pub struct ActorSpec {
    pub(crate) name: String,
    pub(crate) kind: MessageKind,
    pub(crate) schedule: Option<ScheduleSpec>,
    pub(crate) burst_count: Option<u32>,
    pub(crate) accepts: Option<BTreeSet<MessageKind>>,
    pub(crate) hook: Box<dyn TriggerHook>,
}

impl ActorSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MessageKind::default(),
            schedule: None,
            burst_count: None,
            accepts: None,
            hook: Box::new(NoopHook),
        }
    }

    /// Kind tag of the messages this actor sends
    pub fn emits(mut self, kind: impl Into<MessageKind>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn schedule(mut self, schedule: ScheduleSpec) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Burst override; defaults to the schedule's burst, or 1 for reactive actors
    pub fn burst(mut self, burst_count: u32) -> Self {
        self.burst_count = Some(burst_count);
        self
    }

    /// Only react to these kinds; others are ignored
    pub fn accepts<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<MessageKind>,
    {
        self.accepts = Some(kinds.into_iter().map(Into::into).collect());
        self
    }

    pub fn hook(mut self, hook: impl TriggerHook) -> Self {
        self.hook = Box::new(hook);
        self
    }

    pub fn boxed_hook(mut self, hook: Box<dyn TriggerHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ActorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("schedule", &self.schedule)
            .field("burst_count", &self.burst_count)
            .finish_non_exhaustive()
    }
}

/// Point-in-time copy of an actor's counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorStats {
    pub name: String,
    pub id: String,
    pub sent: u64,
    pub received: u64,
    pub ignored: u64,
    pub firings: u64,
    pub hook_failures: u64,
    pub dropped: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    sent: u64,
    received: u64,
    ignored: u64,
    firings: u64,
    hook_failures: u64,
    dropped: u64,
}

/// A live actor
pub struct Actor {
    id: ActorId,
    name: String,
    kind: MessageKind,
    accepts: Option<BTreeSet<MessageKind>>,
    targets: TargetList,
    schedule: Option<ScheduleSpec>,
    burst_count: u32,
    hook: Box<dyn TriggerHook>,
    state: ActorState,
    pending_timers: usize,
    counters: Counters,
}

impl Actor {
    pub(crate) fn from_spec(id: ActorId, spec: ActorSpec, targets: TargetList) -> Self {
        let burst_count = spec
            .burst_count
            .or(spec.schedule.map(|schedule| schedule.burst_count))
            .unwrap_or(1);

        Self {
            id,
            name: spec.name,
            kind: spec.kind,
            accepts: spec.accepts,
            targets,
            schedule: spec.schedule,
            burst_count,
            hook: spec.hook,
            state: ActorState::Idle,
            pending_timers: 0,
            counters: Counters::default(),
        }
    }

    /// Same identity and counters, new target list
    pub fn rewired(self, targets: TargetList) -> Self {
        debug!(
            actor_id = %self.id,
            actor = %self.name,
            old_targets = self.targets.len(),
            new_targets = targets.len(),
            "Rewiring actor"
        );
        Self { targets, ..self }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    pub fn targets(&self) -> &TargetList {
        &self.targets
    }

    pub fn schedule_spec(&self) -> Option<&ScheduleSpec> {
        self.schedule.as_ref()
    }

    pub fn burst_count(&self) -> u32 {
        self.burst_count
    }

    pub fn state(&self) -> ActorState {
        self.state
    }

    pub fn send_count(&self) -> u64 {
        self.counters.sent
    }

    pub fn received_count(&self) -> u64 {
        self.counters.received
    }

    pub fn pending_timers(&self) -> usize {
        self.pending_timers
    }

    pub fn stats(&self) -> ActorStats {
        ActorStats {
            name: self.name.clone(),
            id: self.id.to_string(),
            sent: self.counters.sent,
            received: self.counters.received,
            ignored: self.counters.ignored,
            firings: self.counters.firings,
            hook_failures: self.counters.hook_failures,
            dropped: self.counters.dropped,
        }
    }

    /// Arm the initial trigger, if any
    pub fn start<C: ActorContext + ?Sized>(&mut self, ctx: &mut C) {
        if let Some(schedule) = self.schedule {
            self.arm(ctx, schedule.initial_delay);
        }
    }

    /// Record a trigger armed on this actor's behalf by someone else
    pub(crate) fn note_armed(&mut self) {
        self.pending_timers += 1;
        self.settle();
    }

    /// Handle one of this actor's triggers; the scheduler has already
    /// consumed the timer.
    pub fn on_timer<C: ActorContext + ?Sized>(&mut self, ctx: &mut C) -> Result<FanOut> {
        self.pending_timers = self.pending_timers.saturating_sub(1);

        let outcome = self.fire(ctx);

        if let Some(schedule) = self.schedule.filter(ScheduleSpec::is_periodic) {
            self.arm(ctx, schedule.period);
        }
        self.settle();
        outcome
    }

    /// Handle an inbound message.
    ///
    /// Reactive actors fire on every accepted message. Scheduled actors
    /// accept inbound messages without sending; only their own triggers drive
    /// sends. Returns `None` when no firing happened.
    pub fn on_message<C: ActorContext + ?Sized>(
        &mut self,
        from: ActorId,
        message: &Message,
        ctx: &mut C,
    ) -> Result<Option<FanOut>> {
        self.counters.received += 1;

        if let Some(accepts) = &self.accepts {
            if !accepts.contains(message.kind()) {
                self.counters.ignored += 1;
                trace!(actor_id = %self.id, from = %from, kind = %message.kind(), "Ignoring unrecognized message kind");
                return Ok(None);
            }
        }

        if self.schedule.is_some() {
            trace!(actor_id = %self.id, from = %from, "Inbound message accepted by scheduled actor");
            return Ok(None);
        }

        let outcome = self.fire(ctx);
        self.settle();
        outcome.map(Some)
    }

    /// Cancel every pending trigger; repeated calls are no-ops
    pub fn cancel_timers<C: ActorContext + ?Sized>(&mut self, ctx: &mut C) -> usize {
        let cancelled = ctx.cancel(self.id);
        self.pending_timers = 0;
        self.settle();
        cancelled
    }

    fn arm<C: ActorContext + ?Sized>(&mut self, ctx: &mut C, delay: std::time::Duration) {
        if ctx.schedule(self.id, delay).is_some() {
            self.pending_timers += 1;
        }
        self.settle();
    }

    /// Hook, then fan-out with the current burst and targets
    fn fire<C: ActorContext + ?Sized>(&mut self, ctx: &mut C) -> Result<FanOut> {
        self.state = ActorState::Firing;
        self.counters.firings += 1;

        if let Err(err) = self.hook.on_trigger() {
            self.counters.hook_failures += 1;
            warn!(actor_id = %self.id, actor = %self.name, error = %err, "Trigger hook failed");
            return Err(ActorError::hook(self.name.clone(), err));
        }

        let outcome = Router::fan_out(self.id, &self.targets, self.burst_count, &self.kind, ctx);
        self.counters.sent += outcome.attempted;
        self.counters.dropped += outcome.dropped;
        Ok(outcome)
    }

    fn settle(&mut self) {
        self.state = if self.pending_timers > 0 {
            ActorState::Scheduled
        } else {
            ActorState::Idle
        };
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("targets", &self.targets)
            .field("schedule", &self.schedule)
            .field("burst_count", &self.burst_count)
            .field("state", &self.state)
            .field("sent", &self.counters.sent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::{hook_fn, CountingHook};
    use crate::messages::kinds;
    use crate::registry::TimerId;
    use crate::scheduler::{Mailer, Scheduler};
    use std::time::Duration;

    /// Context that records calls instead of running anything
    #[derive(Default)]
    struct ScriptedContext {
        armed: Vec<(ActorId, Duration)>,
        delivered: Vec<ActorId>,
        cancelled: usize,
        next_timer: u64,
    }

    impl Scheduler for ScriptedContext {
        fn now(&self) -> Duration {
            Duration::ZERO
        }

        fn schedule(&mut self, actor: ActorId, delay: Duration) -> Option<TimerId> {
            self.armed.push((actor, delay));
            self.next_timer += 1;
            Some(TimerId(self.next_timer))
        }

        fn cancel(&mut self, _actor: ActorId) -> usize {
            let pending = self.armed.len().saturating_sub(self.cancelled);
            self.cancelled += pending;
            pending
        }
    }

    impl Mailer for ScriptedContext {
        fn deliver(&mut self, _from: ActorId, to: ActorId, _message: Message) -> bool {
            self.delivered.push(to);
            true
        }
    }

    fn actor(spec: ActorSpec, targets: &[ActorId]) -> Actor {
        Actor::from_spec(ActorId::new(), spec, TargetList::from(targets.to_vec()))
    }

    #[test]
    fn test_burst_generator_firing() {
        let target = ActorId::new();
        let hook = CountingHook::new();
        let mut generator = actor(
            ActorSpec::new("burst_generator")
                .emits(kinds::BATCH)
                .schedule(ScheduleSpec::every(Duration::from_millis(1000)).with_burst(10))
                .hook(hook.clone()),
            &[target],
        );
        let mut ctx = ScriptedContext::default();

        generator.start(&mut ctx);
        assert_eq!(generator.state(), ActorState::Scheduled);
        assert_eq!(ctx.armed, vec![(generator.id(), Duration::from_millis(1000))]);

        let outcome = generator.on_timer(&mut ctx).unwrap();

        assert_eq!(outcome.attempted, 10);
        assert_eq!(generator.send_count(), 10);
        assert_eq!(ctx.delivered.len(), 10);
        assert_eq!(hook.calls(), 1);
        // Re-armed for the next period
        assert_eq!(ctx.armed.len(), 2);
        assert_eq!(generator.state(), ActorState::Scheduled);
    }

    #[test]
    fn test_one_shot_goes_idle() {
        let mut once = actor(
            ActorSpec::new("once").schedule(ScheduleSpec::once(Duration::from_millis(5))),
            &[ActorId::new()],
        );
        let mut ctx = ScriptedContext::default();

        once.start(&mut ctx);
        once.on_timer(&mut ctx).unwrap();

        assert_eq!(ctx.armed.len(), 1);
        assert_eq!(once.state(), ActorState::Idle);
        assert_eq!(once.send_count(), 1);
    }

    #[test]
    fn test_reactive_actor_fires_on_message() {
        let next = ActorId::new();
        let mut stage = actor(ActorSpec::new("stage1").emits(kinds::DATA), &[next]);
        let mut ctx = ScriptedContext::default();

        let outcome = stage
            .on_message(ActorId::new(), &Message::new(kinds::DATA), &mut ctx)
            .unwrap();

        assert_eq!(outcome.map(|fan| fan.attempted), Some(1));
        assert_eq!(ctx.delivered, vec![next]);
        assert_eq!(stage.received_count(), 1);
        assert!(ctx.armed.is_empty());
    }

    #[test]
    fn test_scheduled_actor_does_not_forward_inbound() {
        let mut balancer = actor(
            ActorSpec::new("load_balancer").schedule(ScheduleSpec::every(Duration::from_millis(10))),
            &[ActorId::new(), ActorId::new()],
        );
        let mut ctx = ScriptedContext::default();

        let outcome = balancer
            .on_message(ActorId::new(), &Message::new(kinds::MSG), &mut ctx)
            .unwrap();

        assert!(outcome.is_none());
        assert_eq!(balancer.received_count(), 1);
        assert_eq!(balancer.send_count(), 0);
    }

    #[test]
    fn test_unrecognized_kind_ignored() {
        let mut sink = actor(ActorSpec::new("sink").accepts([kinds::DATA]), &[ActorId::new()]);
        let mut ctx = ScriptedContext::default();

        let outcome = sink
            .on_message(ActorId::new(), &Message::new(kinds::EVENT), &mut ctx)
            .unwrap();

        assert!(outcome.is_none());
        assert_eq!(sink.stats().ignored, 1);
        assert!(ctx.delivered.is_empty());
    }

    #[test]
    fn test_hook_failure_aborts_fan_out_but_rearms() {
        let mut flaky = actor(
            ActorSpec::new("flaky")
                .schedule(ScheduleSpec::every(Duration::from_millis(10)))
                .boxed_hook(hook_fn(|| anyhow::bail!("boom"))),
            &[ActorId::new()],
        );
        let mut ctx = ScriptedContext::default();
        flaky.start(&mut ctx);

        let err = flaky.on_timer(&mut ctx).unwrap_err();

        assert!(matches!(err, ActorError::Hook { .. }));
        assert_eq!(flaky.send_count(), 0);
        assert!(ctx.delivered.is_empty());
        assert_eq!(flaky.stats().hook_failures, 1);
        assert_eq!(flaky.state(), ActorState::Scheduled);
    }

    #[test]
    fn test_cancel_twice_same_state() {
        let mut generator = actor(
            ActorSpec::new("gen").schedule(ScheduleSpec::every(Duration::from_millis(1))),
            &[],
        );
        let mut ctx = ScriptedContext::default();
        generator.start(&mut ctx);

        assert_eq!(generator.cancel_timers(&mut ctx), 1);
        let state_once = (generator.state(), generator.pending_timers());
        assert_eq!(generator.cancel_timers(&mut ctx), 0);

        assert_eq!((generator.state(), generator.pending_timers()), state_once);
        assert_eq!(generator.state(), ActorState::Idle);
    }

    #[test]
    fn test_rewired_keeps_identity_and_counters() {
        let (a, b) = (ActorId::new(), ActorId::new());
        let mut publisher = actor(ActorSpec::new("publisher"), &[a]);
        let mut ctx = ScriptedContext::default();
        publisher.on_message(ActorId::new(), &Message::new(kinds::MSG), &mut ctx).unwrap();

        let id = publisher.id();
        let rewired = publisher.rewired(TargetList::from(vec![a, b]));

        assert_eq!(rewired.id(), id);
        assert_eq!(rewired.send_count(), 1);
        assert_eq!(rewired.targets().as_ref(), &[a, b]);
    }
}
