//! Trigger Hooks
//!
//! The single extension point of an actor. A hook runs exactly once per
//! firing, before the fan-out, and may fail; a failure aborts that firing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Capability invoked on every firing
pub trait TriggerHook: Send + 'static {
    fn on_trigger(&mut self) -> anyhow::Result<()>;
}

/// Hook that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl TriggerHook for NoopHook {
    fn on_trigger(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Logs one line per firing, like the generated default callbacks did
#[derive(Debug, Clone)]
pub struct LoggingHook {
    label: String,
}

impl LoggingHook {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl TriggerHook for LoggingHook {
    fn on_trigger(&mut self) -> anyhow::Result<()> {
        info!(hook = %self.label, "Trigger hook invoked");
        Ok(())
    }
}

/// Counts invocations; the counter handle stays readable from outside
#[derive(Debug, Clone, Default)]
pub struct CountingHook {
    calls: Arc<AtomicU64>,
}

impl CountingHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the invocation count
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.calls)
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl TriggerHook for CountingHook {
    fn on_trigger(&mut self) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Fails every call after the first `succeed_first` ones
#[derive(Debug, Clone)]
pub struct FailingHook {
    message: String,
    succeed_first: u64,
    calls: u64,
}

impl FailingHook {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            succeed_first: 0,
            calls: 0,
        }
    }

    pub fn after(mut self, successes: u64) -> Self {
        self.succeed_first = successes;
        self
    }
}

impl TriggerHook for FailingHook {
    fn on_trigger(&mut self) -> anyhow::Result<()> {
        self.calls += 1;
        if self.calls > self.succeed_first {
            anyhow::bail!("{} (call {})", self.message, self.calls);
        }
        Ok(())
    }
}

/// Adapts a closure into a hook
pub struct FnHook<F> {
    f: F,
}

impl<F> FnHook<F>
where
    F: FnMut() -> anyhow::Result<()> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> TriggerHook for FnHook<F>
where
    F: FnMut() -> anyhow::Result<()> + Send + 'static,
{
    fn on_trigger(&mut self) -> anyhow::Result<()> {
        (self.f)()
    }
}

/// Build a boxed hook from a closure
pub fn hook_fn<F>(f: F) -> Box<dyn TriggerHook>
where
    F: FnMut() -> anyhow::Result<()> + Send + 'static,
{
    Box::new(FnHook::new(f))
}
