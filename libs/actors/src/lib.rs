//! Timed Actor Mesh Runtime
//!
//! Actors that optionally wake themselves on a schedule, run one hook per
//! firing, and fan a fixed burst of messages out to an ordered target list.
//! The same topology runs under two interchangeable models.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  fires   ┌──────────────┐  hook + fan-out  ┌──────────────┐
//! │  Scheduler   │─────────▶│    Actor     │─────────────────▶│   Targets    │
//! │ virtual/wall │◀─────────│ Idle/Sched/  │   burst × |T|    │ (in order)   │
//! └──────────────┘  re-arm  │ Firing       │                  └──────────────┘
//!                           └──────────────┘
//! ```
//!
//! - [`Simulation`]: discrete-event model, single loop over a virtual clock
//! - [`ActorSystem`]: concurrent model, one tokio task and mailbox per actor
//!
//! # Examples
//!
//! ```rust
//! use actorsim_actors::{ActorSpec, ScheduleSpec, Simulation, Topology};
//! use std::time::Duration;
//!
//! let topology = Topology::burst(
//!     ActorSpec::new("burst_generator")
//!         .emits("batch")
//!         .schedule(ScheduleSpec::every(Duration::from_millis(1000)).with_burst(10)),
//!     ActorSpec::new("processor"),
//! )?;
//!
//! let mut simulation = Simulation::new(topology);
//! simulation.run_until(Duration::from_millis(3500))?;
//! assert_eq!(simulation.send_count("burst_generator"), Some(30));
//! # Ok::<(), actorsim_actors::ActorError>(())
//! ```

pub mod actor;
pub mod error;
pub mod hook;
pub mod mailbox;
pub mod messages;
pub mod registry;
pub mod report;
pub mod router;
pub mod runner;
pub mod schedule;
pub mod scheduler;
pub mod simulation;
pub mod system;
pub mod topology;

pub use actor::{Actor, ActorSpec, ActorState, ActorStats};
pub use error::{ActorError, Result};
pub use hook::{hook_fn, CountingHook, FailingHook, FnHook, LoggingHook, NoopHook, TriggerHook};
pub use messages::{kinds, Message, MessageKind};
pub use registry::{ActorId, ActorRegistry, RoutingTable, TargetList, TimerId};
pub use report::RunReport;
pub use router::{FanOut, Router};
pub use runner::{run_mesh, run_mesh_with_hooks};
pub use schedule::ScheduleSpec;
pub use scheduler::{ActorContext, Mailer, Scheduler};
pub use simulation::{Dispatch, Simulation, SimulationConfig, SimulationMetrics};
pub use system::{ActorSystem, SupervisorDirective, SystemConfig, SystemMetrics, SystemStats};
pub use topology::{Topology, TopologyBuilder};
