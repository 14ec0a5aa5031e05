//! # ActorSim Configuration
//!
//! Declarative description of an actor topology and the runtime that drives
//! it. The actor runtime builds its `Topology` from these plain data types.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use actorsim_config::{load_config, ExecutionModel};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config/burst.toml")).unwrap();
//! if config.runtime.model == ExecutionModel::Discrete {
//!     println!("{} actors", config.actors.len());
//! }
//! ```

pub mod defaults;
pub mod mesh_config;

// Re-export commonly used types
pub use mesh_config::{
    load_config, ActorConfig, ExecutionModel, MeshConfig, RuntimeConfig, ScheduleConfig,
};
