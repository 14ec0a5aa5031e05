//! Actor Runtime Error Types
//!
//! Failures surfaced by topology construction, hook execution and the
//! concurrent runtime. Dropped deliveries and stale timers are not errors.

use thiserror::Error;

/// Main actor runtime error type
#[derive(Error, Debug)]
pub enum ActorError {
    /// A trigger hook failed; fatal to that firing only
    #[error("Hook failed for actor '{actor}': {source}")]
    Hook {
        actor: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Invalid configuration values
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Invalid graph shape or wiring
    #[error("Topology error: {message}")]
    Topology { message: String },

    /// Lookup of an actor name that is not part of the topology
    #[error("Unknown actor '{name}'")]
    UnknownActor { name: String },

    /// System-level errors (task joins, runtime state)
    #[error("System error: {message}")]
    System { message: String },
}

/// Result type alias for actor runtime operations
pub type Result<T> = std::result::Result<T, ActorError>;

impl ActorError {
    /// Create a hook failure from the hook's own error
    pub fn hook(actor: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Hook {
            actor: actor.into(),
            source: source.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Configuration {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    /// Create a topology error
    pub fn topology(message: impl Into<String>) -> Self {
        Self::Topology {
            message: message.into(),
        }
    }

    /// Create an unknown-actor error
    pub fn unknown_actor(name: impl Into<String>) -> Self {
        Self::UnknownActor { name: name.into() }
    }

    /// Create a system error
    pub fn system(message: impl Into<String>) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    /// Short category label used in structured logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Hook { .. } => "hook",
            Self::Configuration { .. } => "configuration",
            Self::Topology { .. } => "topology",
            Self::UnknownActor { .. } => "unknown_actor",
            Self::System { .. } => "system",
        }
    }
}

impl From<anyhow::Error> for ActorError {
    fn from(err: anyhow::Error) -> Self {
        Self::Configuration {
            message: format!("{:#}", err),
            field: None,
        }
    }
}
