//! # Feldspar Simulation Kernel
//!
//! A multiscale discrete-event (DEVS) simulation kernel: atomic models
//! with the classical transition contract, coupled models wired by
//! couplings, and a hierarchical processor tree driven by an exact
//! multiscale clock.
//!
//! ## Design Principles
//!
//! - **Exact multiscale time**: [`TimePoint`] is a variable-precision
//!   base-1000 magnitude, so events separated by twelve orders of
//!   magnitude still compare exactly; [`Duration`] arithmetic coarsens
//!   precision only when accuracy loss is unavoidable.
//! - **Pluggable scheduling**: the [`EventSet`] contract hides the
//!   priority-queue backend; selection is a configuration choice.
//! - **Classical DEVS semantics**: within a cycle, all outputs are
//!   collected before any transition runs; simultaneous events fire in
//!   insertion order; each component transitions at most once per cycle.
//! - **Single-threaded cooperative core**: model code runs synchronously
//!   inside the driver loop; cancellation is polled between cycles.

pub mod config;
pub mod duration;
pub mod error;
pub mod event_set;
pub mod model;
pub mod observer;
pub mod port;
pub mod processor;
pub mod scale;
pub mod simulation;
pub mod time_cache;
pub mod time_point;

// Re-export commonly used types
pub use config::{ConfigError, ConfigResult, SimulationConfig};
pub use duration::{Duration, MULTIPLIER_LIMIT, MULTIPLIER_MAX};
pub use error::{SimResult, SimulationError};
pub use event_set::{EventSet, PlanningError, Scheduler, SchedulerKind};
pub use model::{Atomic, AtomicModel, CoupledModel, Model};
pub use observer::{Observation, ObservationKind, Observer, ObserverTable};
pub use port::{Bag, Port, PortMode, Value};
pub use processor::{Processor, RootCoordinator, StepReport, TransitionStats};
pub use scale::Scale;
pub use simulation::{AbortHandle, Simulation, SimulationOptions, Status};
pub use time_cache::TimeCache;
pub use time_point::TimePoint;
