//! End-of-run reports

use crate::actor::ActorStats;
use crate::error::{ActorError, Result};
use actorsim_config::ExecutionModel;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Per-actor counters at the end of a run, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub model: ExecutionModel,
    pub elapsed_ms: u64,
    pub actors: Vec<ActorStats>,
}

impl RunReport {
    pub fn new(model: ExecutionModel, elapsed: Duration, actors: Vec<ActorStats>) -> Self {
        Self {
            model,
            elapsed_ms: elapsed.as_millis() as u64,
            actors,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ActorStats> {
        self.actors.iter().find(|stats| stats.name == name)
    }

    /// Send count of `name`, zero if it is not part of the run
    pub fn sent(&self, name: &str) -> u64 {
        self.get(name).map_or(0, |stats| stats.sent)
    }

    pub fn received(&self, name: &str) -> u64 {
        self.get(name).map_or(0, |stats| stats.received)
    }

    pub fn total_sent(&self) -> u64 {
        self.actors.iter().map(|stats| stats.sent).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ActorError::system(format!("Failed to encode run report: {e}")))
    }

    /// One `info!` line per actor: "<name> sent N messages"
    pub fn log_summary(&self) {
        for stats in &self.actors {
            info!(
                actor = %stats.name,
                actor_id = %stats.id,
                sent = stats.sent,
                received = stats.received,
                "{} sent {} messages",
                stats.name,
                stats.sent
            );
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?} run, {} ms", self.model, self.elapsed_ms)?;
        writeln!(
            f,
            "{:<20} {:>10} {:>10} {:>8} {:>8}",
            "actor", "sent", "received", "firings", "dropped"
        )?;
        for stats in &self.actors {
            writeln!(
                f,
                "{:<20} {:>10} {:>10} {:>8} {:>8}",
                stats.name, stats.sent, stats.received, stats.firings, stats.dropped
            )?;
        }
        Ok(())
    }
}
