//! Processor hierarchy: simulators wrap atomic models, coordinators
//! wrap coupled models, and the root coordinator drives the whole tree.

pub mod coordinator;
pub mod root;
pub mod simulator;

pub use coordinator::Coordinator;
pub use root::{RootCoordinator, StepReport};
pub use simulator::Simulator;

use serde::{Deserialize, Serialize};

use crate::duration::Duration;
use crate::error::SimResult;
use crate::event_set::SchedulerKind;
use crate::model::Model;
use crate::port::Bag;
use crate::scale::Scale;
use crate::time_point::TimePoint;

/// Per-kind transition counters, aggregated over the processor tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionStats {
    /// Internal transitions fired.
    pub internal: u64,
    /// External transitions fired.
    pub external: u64,
    /// Confluent transitions fired.
    pub confluent: u64,
    /// Multi-component reactions fired (unused by the core tiers).
    pub reaction: u64,
}

/// A stateful wrapper bound to one model.
pub enum Processor {
    /// Wraps an atomic model.
    Simulator(Simulator),
    /// Wraps a coupled model.
    Coordinator(Coordinator),
}

impl Processor {
    /// Builds the processor tree for a model.
    pub(crate) fn build(model: Model, scheduler: SchedulerKind, time: &TimePoint) -> Processor {
        match model {
            Model::Atomic(model) => Processor::Simulator(Simulator::new(model)),
            Model::Coupled(model) => {
                Processor::Coordinator(Coordinator::new(model, scheduler, time))
            }
        }
    }

    /// The wrapped model's name.
    pub fn name(&self) -> &str {
        match self {
            Processor::Simulator(p) => p.name(),
            Processor::Coordinator(p) => p.name(),
        }
    }

    /// The scale this processor schedules at.
    pub fn precision(&self) -> Scale {
        match self {
            Processor::Simulator(p) => p.precision(),
            Processor::Coordinator(p) => p.precision(),
        }
    }

    pub(crate) fn initialize(&mut self, time: &TimePoint) -> SimResult<(Duration, Duration)> {
        match self {
            Processor::Simulator(p) => p.initialize(time),
            Processor::Coordinator(p) => p.initialize(time),
        }
    }

    pub(crate) fn collect_outputs(&mut self, time: &TimePoint, elapsed: Duration) -> SimResult<&Bag> {
        match self {
            Processor::Simulator(p) => p.collect_outputs(time, elapsed),
            Processor::Coordinator(p) => p.collect_outputs(time, elapsed),
        }
    }

    pub(crate) fn perform_transitions(
        &mut self,
        time: &TimePoint,
        elapsed: Duration,
        input: &Bag,
    ) -> SimResult<Duration> {
        match self {
            Processor::Simulator(p) => p.perform_transitions(time, elapsed, input),
            Processor::Coordinator(p) => p.perform_transitions(time, elapsed, input),
        }
    }

    /// Remaining duration until this processor's next event.
    pub(crate) fn imminent_duration(&mut self) -> Duration {
        match self {
            Processor::Simulator(p) => p.imminent_duration(),
            Processor::Coordinator(p) => p.imminent_duration(),
        }
    }

    pub(crate) fn accumulate_stats(&self, into: &mut TransitionStats) {
        match self {
            Processor::Simulator(p) => p.accumulate_stats(into),
            Processor::Coordinator(p) => p.accumulate_stats(into),
        }
    }

    pub(crate) fn clear_bags(&mut self) {
        match self {
            Processor::Simulator(p) => p.clear_bags(),
            Processor::Coordinator(p) => p.clear_bags(),
        }
    }
}
