//! The atomic-model processor.

use crate::duration::Duration;
use crate::error::{SimResult, SimulationError};
use crate::model::AtomicModel;
use crate::observer::{Observation, ObservationKind};
use crate::port::{Bag, Value};
use crate::scale::Scale;
use crate::time_point::TimePoint;

use super::TransitionStats;

/// Drives one atomic model through the classical DEVS cycle.
///
/// The simulator owns the model, its output bag, the last fixed planned
/// duration, and per-kind transition counters. The planned duration is
/// always the model's `time_advance` fixed at its precision level; a
/// finite advance that cannot be expressed there aborts the run.
pub struct Simulator {
    model: AtomicModel,
    /// Last `time_advance`, fixed at the model's precision.
    planned: Duration,
    /// Initial elapsed reported at initialization, consumed by the first
    /// cycle.
    elapsed_offset: Duration,
    bag: Bag,
    stats: TransitionStats,
}

impl Simulator {
    pub(crate) fn new(model: AtomicModel) -> Self {
        Simulator {
            model,
            planned: Duration::INFINITY,
            elapsed_offset: Duration::ZERO,
            bag: Bag::new(),
            stats: TransitionStats::default(),
        }
    }

    /// The wrapped model's name.
    pub fn name(&self) -> &str {
        self.model.name()
    }

    /// The scale this processor schedules at.
    pub fn precision(&self) -> Scale {
        self.model.precision()
    }

    /// Fixes the model's current time advance at its precision level.
    fn fixed_planned(&mut self) -> SimResult<Duration> {
        let advance = self.model.behavior.time_advance();
        if advance.is_negative() {
            return Err(self.invalid_duration(advance));
        }
        let planned = advance.fixed_at(self.model.precision);
        if !advance.is_infinite() && planned.is_infinite() {
            return Err(self.invalid_duration(advance));
        }
        Ok(planned)
    }

    fn invalid_duration(&self, advance: Duration) -> SimulationError {
        SimulationError::InvalidDuration {
            model: self.model.name().to_string(),
            precision: self.model.precision,
            duration: advance.to_string(),
        }
    }

    /// Applies the model's state initializer and computes the first
    /// planned duration. Returns `(elapsed, planned)` for the parent.
    pub(crate) fn initialize(&mut self, _time: &TimePoint) -> SimResult<(Duration, Duration)> {
        self.stats = TransitionStats::default();
        self.bag.clear();
        self.model.behavior.initialize();
        let elapsed = self.model.behavior.initial_elapsed();
        let planned = self.fixed_planned()?;
        self.planned = planned;
        self.elapsed_offset = elapsed;
        Ok((elapsed, planned))
    }

    /// Invokes the model's output function and returns the produced bag.
    ///
    /// Posted port names are validated against the model's declared
    /// output ports; output-port observers are notified afterwards.
    pub(crate) fn collect_outputs(
        &mut self,
        time: &TimePoint,
        elapsed: Duration,
    ) -> SimResult<&Bag> {
        self.bag.clear();
        self.model.behavior.output(&mut self.bag);

        for (port, _) in self.bag.ports() {
            if !self.model.has_output(port) {
                return Err(if self.model.has_input(port) {
                    SimulationError::InvalidPortHost {
                        model: self.model.name().to_string(),
                        port: port.to_string(),
                        expected: "output",
                    }
                } else {
                    SimulationError::NoSuchPort {
                        model: self.model.name().to_string(),
                        port: port.to_string(),
                    }
                });
            }
        }

        if !self.model.observers.is_empty() {
            let produced: Vec<(String, Value)> = self
                .bag
                .ports()
                .map(|(port, values)| (port.to_string(), Value::Array(values.to_vec())))
                .collect();
            for (port, payload) in produced {
                let observation = Observation {
                    kind: ObservationKind::Output,
                    time: time.clone(),
                    elapsed: Some(elapsed),
                    payload: Some(payload),
                };
                self.model.notify_output(&port, &observation);
            }
        }

        Ok(&self.bag)
    }

    /// Runs the transition selected by the remaining planned duration
    /// and the input bag, then replans.
    ///
    /// `elapsed` is measured from the model's last transition (or its
    /// initialization baseline), so an imminent model sees
    /// `elapsed == planned`.
    pub(crate) fn perform_transitions(
        &mut self,
        time: &TimePoint,
        elapsed: Duration,
        input: &Bag,
    ) -> SimResult<Duration> {
        let remaining = self.planned - elapsed;
        if remaining.is_zero() && input.is_empty() {
            self.model.behavior.internal_transition();
            self.stats.internal += 1;
        } else if remaining.is_zero() {
            self.model.behavior.confluent_transition(input);
            self.stats.confluent += 1;
        } else if !remaining.is_negative() && !input.is_empty() {
            self.model.behavior.external_transition(elapsed, input);
            self.stats.external += 1;
        } else {
            return Err(SimulationError::BadSynchronisation {
                model: self.model.name().to_string(),
                details: format!(
                    "transition at {time} with elapsed {elapsed} against planned {}",
                    self.planned
                ),
            });
        }
        let planned = self.fixed_planned()?;
        self.planned = planned;
        self.elapsed_offset = Duration::ZERO;
        Ok(planned)
    }

    /// Remaining duration until this model's next internal event.
    pub(crate) fn imminent_duration(&self) -> Duration {
        if self.elapsed_offset.is_zero() {
            // Keep the planned duration's own scale: subtracting a zero
            // at another scale would re-express it and change how the
            // clock truncates on advance.
            self.planned
        } else {
            self.planned - self.elapsed_offset
        }
    }

    pub(crate) fn accumulate_stats(&self, into: &mut TransitionStats) {
        into.internal += self.stats.internal;
        into.external += self.stats.external;
        into.confluent += self.stats.confluent;
        into.reaction += self.stats.reaction;
    }

    pub(crate) fn clear_bags(&mut self) {
        self.bag.clear();
    }
}
