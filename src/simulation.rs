//! Simulation driver: build a processor tree from a model and run it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::duration::Duration;
use crate::error::{SimResult, SimulationError};
use crate::event_set::SchedulerKind;
use crate::model::Model;
use crate::observer::{Observation, ObservationKind, Observer, ObserverTable};
use crate::processor::{Processor, RootCoordinator, TransitionStats};
use crate::time_point::TimePoint;

/// Driver options.
///
/// # Example
///
/// ```
/// use feldspar::{Duration, SchedulerKind, SimulationOptions};
///
/// let options = SimulationOptions::new()
///     .with_duration(Duration::base(1000))
///     .with_scheduler(SchedulerKind::Calendar);
/// assert_eq!(options.duration, Duration::base(1000));
/// ```
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Maximum simulated duration; INFINITY runs until the schedule
    /// drains.
    pub duration: Duration,
    /// Event-set backend used throughout the processor tree.
    pub default_scheduler: SchedulerKind,
    /// Whether to walk the model graph checking ports and couplings
    /// before the run.
    pub run_validations: bool,
    /// Simulation time the run starts at.
    pub virtual_time: TimePoint,
}

impl SimulationOptions {
    /// Creates the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the simulated duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Selects the event-set backend.
    pub fn with_scheduler(mut self, scheduler: SchedulerKind) -> Self {
        self.default_scheduler = scheduler;
        self
    }

    /// Enables or disables the setup validation walk.
    pub fn with_validations(mut self, run_validations: bool) -> Self {
        self.run_validations = run_validations;
        self
    }

    /// Starts the run at a virtual time other than the origin.
    pub fn with_virtual_time(mut self, virtual_time: TimePoint) -> Self {
        self.virtual_time = virtual_time;
        self
    }
}

impl Default for SimulationOptions {
    fn default() -> Self {
        SimulationOptions {
            duration: Duration::INFINITY,
            default_scheduler: SchedulerKind::default(),
            run_validations: true,
            virtual_time: TimePoint::origin(),
        }
    }
}

/// Lifecycle state of a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Built, not yet initialized.
    Ready,
    /// Mid-run.
    Running,
    /// Ran to completion (schedule drained or duration bound reached).
    Done,
    /// Stopped early, by request or by a fatal error.
    Aborted,
}

/// A cloneable handle that requests cancellation.
///
/// The request is polled between cycles; a cycle in flight always
/// completes.
#[derive(Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Requests cancellation.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// A runnable simulation over one root model.
///
/// # Example
///
/// ```
/// use feldspar::{Atomic, AtomicModel, Duration, Simulation, SimulationOptions};
///
/// struct Clock;
/// impl Atomic for Clock {
///     fn time_advance(&self) -> Duration {
///         Duration::base(25)
///     }
/// }
///
/// let model = AtomicModel::new("clock", Clock);
/// let options = SimulationOptions::new().with_duration(Duration::base(100));
/// let mut simulation = Simulation::new(model.into(), options).unwrap();
/// simulation.simulate().unwrap();
/// assert_eq!(simulation.transition_stats().internal, 4);
/// ```
pub struct Simulation {
    root: RootCoordinator,
    status: Status,
    steps: u64,
    observers: ObserverTable,
    abort: Arc<AtomicBool>,
    last_error: Option<SimulationError>,
}

impl Simulation {
    /// Builds the processor tree for a model.
    ///
    /// With `run_validations` set, the model graph is checked first and
    /// wiring mistakes surface here rather than mid-run.
    pub fn new(model: Model, options: SimulationOptions) -> SimResult<Self> {
        if options.run_validations {
            model.validate()?;
        }
        let child = Processor::build(model, options.default_scheduler, &options.virtual_time);
        let root = RootCoordinator::new(child, options.virtual_time, options.duration);
        Ok(Simulation {
            root,
            status: Status::Ready,
            steps: 0,
            observers: ObserverTable::new(),
            abort: Arc::new(AtomicBool::new(false)),
            last_error: None,
        })
    }

    /// Attaches a simulation observer, notified after initialization
    /// and after every cycle.
    pub fn add_observer(&mut self, observer: Observer) {
        self.observers.attach(observer);
    }

    /// A handle that can cancel the run from elsewhere.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(Arc::clone(&self.abort))
    }

    /// Requests cancellation; polled between cycles.
    pub fn abort(&mut self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    /// Current lifecycle state.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The global simulation time.
    pub fn time(&self) -> &TimePoint {
        self.root.time()
    }

    /// Number of completed cycles.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The fatal error that aborted the run, if any.
    pub fn last_error(&self) -> Option<&SimulationError> {
        self.last_error.as_ref()
    }

    /// Aggregated transition counters over the whole tree.
    pub fn transition_stats(&self) -> TransitionStats {
        let mut stats = TransitionStats::default();
        self.root.child().accumulate_stats(&mut stats);
        stats
    }

    /// Records a fatal error: bags are cleared, the status flips to
    /// aborted and the loop will not continue.
    fn fail(&mut self, error: SimulationError) -> SimulationError {
        self.root.clear_bags();
        self.status = Status::Aborted;
        self.last_error = Some(error.clone());
        error
    }

    /// Advances one cycle. Returns `false` once the run is over.
    pub fn step(&mut self) -> SimResult<bool> {
        match self.status {
            Status::Done | Status::Aborted => {
                return Err(SimulationError::InvalidProcessor {
                    reason: format!("stepping a simulation whose status is {:?}", self.status),
                });
            }
            Status::Ready => {
                if let Err(error) = self.root.initialize() {
                    return Err(self.fail(error));
                }
                self.status = Status::Running;
                tracing::debug!(time = %self.root.time(), "simulation initialized");
                self.observers.notify_all(&Observation {
                    kind: ObservationKind::Initialized,
                    time: self.root.time().clone(),
                    elapsed: None,
                    payload: None,
                });
            }
            Status::Running => {}
        }

        if self.abort.load(Ordering::Relaxed) {
            tracing::debug!(time = %self.root.time(), "abort requested; stopping between cycles");
            self.status = Status::Aborted;
            return Ok(false);
        }

        match self.root.step() {
            Ok(Some(report)) => {
                self.steps += 1;
                tracing::debug!(time = %report.time, elapsed = %report.elapsed, "cycle completed");
                if !self.observers.is_empty() {
                    let payload = serde_json::to_value(&report.outputs).ok();
                    self.observers.notify_all(&Observation {
                        kind: ObservationKind::Step,
                        time: report.time,
                        elapsed: Some(report.elapsed),
                        payload,
                    });
                }
                Ok(true)
            }
            Ok(None) => {
                self.status = Status::Done;
                tracing::debug!(time = %self.root.time(), steps = self.steps, "simulation done");
                Ok(false)
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    /// Runs cycles until the schedule drains, the duration bound is
    /// reached, or an abort is requested.
    pub fn simulate(&mut self) -> SimResult<()> {
        while matches!(self.status, Status::Ready | Status::Running) {
            if !self.step()? {
                break;
            }
        }
        Ok(())
    }

    /// Exports run statistics as JSON.
    pub fn export_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status,
            "time": self.time().to_string(),
            "steps": self.steps,
            "transitions": self.transition_stats(),
        })
    }
}
