//! The root of the processor hierarchy.

use crate::duration::Duration;
use crate::error::{SimResult, SimulationError};
use crate::port::Bag;
use crate::time_point::TimePoint;

use super::Processor;

/// What one completed simulation cycle produced.
#[derive(Clone, Debug)]
pub struct StepReport {
    /// Simulation time the cycle ran at.
    pub time: TimePoint,
    /// Duration advanced by the cycle.
    pub elapsed: Duration,
    /// Values the top-level model emitted on its output ports.
    pub outputs: Bag,
}

/// Owns the global clock and drives the processor tree one cycle at a
/// time.
///
/// Each cycle: peek the imminent duration, advance the clock by it,
/// collect outputs down the tree, then run transitions bottom-up. The
/// run ends when the imminent duration is infinite or the next cycle
/// would pass the optional end time.
pub struct RootCoordinator {
    child: Processor,
    current_time: TimePoint,
    end_time: Option<TimePoint>,
    /// Baseline of the child's elapsed measurement.
    last_reset: TimePoint,
    empty_input: Bag,
}

impl RootCoordinator {
    pub(crate) fn new(child: Processor, start: TimePoint, bound: Duration) -> Self {
        let end_time = if bound.is_infinite() {
            None
        } else {
            let mut end = start.clone();
            end.advance_exact(bound);
            Some(end)
        };
        RootCoordinator {
            last_reset: start.clone(),
            current_time: start,
            end_time,
            child,
            empty_input: Bag::new(),
        }
    }

    /// The global simulation time.
    pub fn time(&self) -> &TimePoint {
        &self.current_time
    }

    /// Initializes the tree and reports the first imminent duration.
    pub(crate) fn initialize(&mut self) -> SimResult<Duration> {
        let time = self.current_time.clone();
        let (elapsed, _) = self.child.initialize(&time)?;
        let mut reset = time;
        if !elapsed.is_zero() {
            reset.advance(-elapsed);
        }
        reset.truncate(self.child.precision());
        self.last_reset = reset;
        Ok(self.child.imminent_duration())
    }

    /// Runs one cycle; `None` when the schedule is exhausted or the
    /// next event lies past the end time.
    pub(crate) fn step(&mut self) -> SimResult<Option<StepReport>> {
        let planned = self.child.imminent_duration();
        if planned.is_infinite() {
            return Ok(None);
        }
        if planned.is_negative() {
            return Err(SimulationError::BadSynchronisation {
                model: self.child.name().to_string(),
                details: format!("imminent duration {planned} lies in the past"),
            });
        }
        let mut next = self.current_time.clone();
        next.advance(planned);
        if let Some(end) = &self.end_time {
            if next > *end {
                return Ok(None);
            }
        }
        self.current_time = next;
        let time = self.current_time.clone();
        let elapsed = time.gap(&self.last_reset);

        let outputs = self.child.collect_outputs(&time, elapsed)?.clone();
        self.child.perform_transitions(&time, elapsed, &self.empty_input)?;

        let mut reset = time.clone();
        reset.truncate(self.child.precision());
        self.last_reset = reset;

        Ok(Some(StepReport {
            time,
            elapsed,
            outputs,
        }))
    }

    pub(crate) fn child(&self) -> &Processor {
        &self.child
    }

    pub(crate) fn clear_bags(&mut self) {
        self.child.clear_bags();
    }
}
