//! Mesh Configuration Module
//!
//! Loads a declarative actor topology plus runtime settings from TOML files,
//! with environment-variable overrides for the runtime section.

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Root configuration: runtime settings and the actor list
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MeshConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub actors: Vec<ActorConfig>,
}

/// Which scheduling model runs the topology
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionModel {
    /// Single loop over a virtual clock
    #[default]
    Discrete,
    /// One task per actor, wall-clock timers
    Concurrent,
}

/// Runtime-wide settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub model: ExecutionModel,

    #[serde(default = "default_run_for_ms")]
    pub run_for_ms: u64,

    #[serde(default = "default_link_delay_ms")]
    pub link_delay_ms: u64,

    #[serde(default = "default_event_limit")]
    pub event_limit: u64,
}

/// One actor of the topology
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ActorConfig {
    pub name: String,

    /// Kind tag of the messages this actor emits
    #[serde(default = "default_message_kind")]
    pub message: String,

    /// Downstream actors by name, in fan-out order
    #[serde(default)]
    pub targets: Vec<String>,

    /// Self-trigger schedule; absent for purely reactive actors
    pub schedule: Option<ScheduleConfig>,

    /// Burst for reactive actors (scheduled actors use `schedule.burst_count`)
    pub burst_count: Option<u32>,

    /// Message kinds this actor reacts to; absent means every kind
    pub accepts: Option<Vec<String>>,
}

/// Periodic self-trigger settings
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// First trigger delay; falls back to `period_ms`, matching the
    /// "first tick after one period" behaviour of interval timers
    pub initial_delay_ms: Option<u64>,

    /// Zero fires exactly once
    pub period_ms: u64,

    #[serde(default = "default_burst_count")]
    pub burst_count: u32,
}

fn default_run_for_ms() -> u64 {
    defaults::simulation::RUN_FOR_MS
}

fn default_link_delay_ms() -> u64 {
    defaults::simulation::LINK_DELAY_MS
}

fn default_event_limit() -> u64 {
    defaults::simulation::EVENT_LIMIT
}

fn default_message_kind() -> String {
    defaults::message::DEFAULT_KIND.to_string()
}

fn default_burst_count() -> u32 {
    defaults::schedule::BURST_COUNT
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model: ExecutionModel::default(),
            run_for_ms: default_run_for_ms(),
            link_delay_ms: default_link_delay_ms(),
            event_limit: default_event_limit(),
        }
    }
}

impl ScheduleConfig {
    /// Effective first-trigger delay
    pub fn initial_delay_ms(&self) -> u64 {
        self.initial_delay_ms.unwrap_or(self.period_ms)
    }
}

impl ActorConfig {
    /// Effective burst count for this actor
    pub fn effective_burst_count(&self) -> u32 {
        match (&self.schedule, self.burst_count) {
            (Some(schedule), _) => schedule.burst_count,
            (None, Some(burst)) => burst,
            (None, None) => defaults::schedule::BURST_COUNT,
        }
    }
}

impl MeshConfig {
    /// Load configuration from a TOML file with `ACTORSIM_` environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env_prefix(path, defaults::ENV_PREFIX)
    }

    /// Load configuration, taking overrides from `<env_prefix>_SECTION__KEY` variables
    pub fn load_with_env_prefix(path: &Path, env_prefix: &str) -> Result<Self> {
        info!(env_prefix, "Loading mesh config: {:?}", path);

        let builder = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator(defaults::ENV_SEPARATOR)
                    .try_parsing(true),
            );

        let config = builder.build()
            .context("Failed to build configuration")?;

        let mesh: MeshConfig = config.try_deserialize()
            .context("Failed to deserialize configuration")?;

        mesh.validate()?;
        Ok(mesh)
    }

    /// Parse configuration from TOML text without consulting the environment
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mesh: MeshConfig = toml::from_str(text)
            .context("Failed to parse mesh configuration")?;
        mesh.validate()?;
        Ok(mesh)
    }

    /// Get settings for a specific actor
    pub fn actor(&self, name: &str) -> Option<&ActorConfig> {
        self.actors.iter().find(|actor| actor.name == name)
    }

    /// Reject duplicate names and dangling target references
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for actor in &self.actors {
            if actor.name.is_empty() {
                bail!("Actor name must not be empty");
            }
            if !names.insert(actor.name.as_str()) {
                bail!("Duplicate actor name '{}'", actor.name);
            }
        }

        for actor in &self.actors {
            for target in &actor.targets {
                if !names.contains(target.as_str()) {
                    bail!("Actor '{}' targets unknown actor '{}'", actor.name, target);
                }
            }
        }

        debug!(actors = self.actors.len(), "Mesh configuration validated");
        Ok(())
    }
}

/// Convenience function to load and validate a mesh configuration file
pub fn load_config(path: &Path) -> Result<MeshConfig> {
    MeshConfig::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const LOAD_BALANCED: &str = r#"
[runtime]
model = "concurrent"
run_for_ms = 200

[[actors]]
name = "load_balancer"
message = "request"
targets = ["server1", "server2", "server3"]
schedule = { initial_delay_ms = 10, period_ms = 10 }

[[actors]]
name = "server1"
targets = ["database"]

[[actors]]
name = "server2"
targets = ["database"]

[[actors]]
name = "server3"
targets = ["database"]

[[actors]]
name = "database"
"#;

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mesh.toml");
        fs::write(&config_path, LOAD_BALANCED).unwrap();

        let config = MeshConfig::load(&config_path).unwrap();

        assert_eq!(config.runtime.model, ExecutionModel::Concurrent);
        assert_eq!(config.runtime.run_for_ms, 200);
        assert_eq!(config.runtime.event_limit, defaults::simulation::EVENT_LIMIT);
        assert_eq!(config.actors.len(), 5);

        let balancer = config.actor("load_balancer").unwrap();
        assert_eq!(balancer.message, "request");
        assert_eq!(balancer.targets, vec!["server1", "server2", "server3"]);
        let schedule = balancer.schedule.as_ref().unwrap();
        assert_eq!(schedule.period_ms, 10);
        assert_eq!(schedule.burst_count, 1);
    }

    #[test]
    fn test_defaults_for_reactive_actor() {
        let config = MeshConfig::from_toml_str(LOAD_BALANCED).unwrap();
        let database = config.actor("database").unwrap();

        assert_eq!(database.message, defaults::message::DEFAULT_KIND);
        assert!(database.targets.is_empty());
        assert!(database.schedule.is_none());
        assert_eq!(database.effective_burst_count(), 1);
    }

    #[test]
    fn test_initial_delay_falls_back_to_period() {
        let schedule = ScheduleConfig {
            initial_delay_ms: None,
            period_ms: 1000,
            burst_count: 10,
        };
        assert_eq!(schedule.initial_delay_ms(), 1000);
    }

    #[test]
    fn test_unknown_target_rejected() {
        let text = r#"
[[actors]]
name = "publisher"
targets = ["ghost"]
"#;
        let err = MeshConfig::from_toml_str(text).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let text = r#"
[[actors]]
name = "stage"

[[actors]]
name = "stage"
"#;
        assert!(MeshConfig::from_toml_str(text).is_err());
    }

    #[test]
    fn test_environment_overrides_runtime() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mesh.toml");
        fs::write(&config_path, LOAD_BALANCED).unwrap();

        // Own prefix: other tests load with the default one in parallel
        std::env::set_var("ACTORSIMTEST_RUNTIME__LINK_DELAY_MS", "7");
        let config = MeshConfig::load_with_env_prefix(&config_path, "ACTORSIMTEST");
        std::env::remove_var("ACTORSIMTEST_RUNTIME__LINK_DELAY_MS");

        assert_eq!(config.unwrap().runtime.link_delay_ms, 7);
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(MeshConfig::load(&dir.path().join("absent.toml")).is_err());
    }
}
