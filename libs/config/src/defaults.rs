//! Runtime defaults
//!
//! Default values shared by the configuration loader and the actor runtime
//! so both sides agree on what an omitted setting means.

/// Scheduling defaults
pub mod schedule {
    /// Messages sent to each target per firing when no burst is configured
    pub const BURST_COUNT: u32 = 1;
}

/// Discrete-event engine defaults
pub mod simulation {
    /// Virtual time to run a configured topology for (milliseconds)
    pub const RUN_FOR_MS: u64 = 5_000;

    /// Delay applied to every message delivery (milliseconds)
    pub const LINK_DELAY_MS: u64 = 0;

    /// Upper bound on processed events for unbounded runs
    pub const EVENT_LIMIT: u64 = 1_000_000;
}

/// Message defaults
pub mod message {
    /// Kind emitted by actors that do not name one
    pub const DEFAULT_KIND: &str = "msg";
}

/// Environment variable prefix for overrides (`ACTORSIM_RUNTIME__RUN_FOR_MS=...`)
pub const ENV_PREFIX: &str = "ACTORSIM";

/// Separator between nested keys in environment overrides
pub const ENV_SEPARATOR: &str = "__";
