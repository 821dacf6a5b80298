//! Observer callbacks.
//!
//! Observers receive structured [`Observation`] records after the action
//! they watch completes. A failing observer is detached and the
//! simulation continues; detachment is logged, never fatal.

use serde::Serialize;

use crate::duration::Duration;
use crate::port::Value;
use crate::time_point::TimePoint;

/// What an observation reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    /// The simulation finished initializing.
    Initialized,
    /// An output port produced values this cycle.
    Output,
    /// A simulation cycle completed.
    Step,
}

/// A structured record handed to observers.
#[derive(Clone, Debug)]
pub struct Observation {
    /// What happened.
    pub kind: ObservationKind,
    /// Simulation time of the action.
    pub time: TimePoint,
    /// Elapsed duration of the cycle, when meaningful.
    pub elapsed: Option<Duration>,
    /// Action-specific payload (e.g. the values a port produced).
    pub payload: Option<Value>,
}

/// Result of one observer notification. An `Err` detaches the observer.
pub type ObserverResult = Result<(), Box<dyn std::error::Error>>;

/// A boxed observer callback.
pub type Observer = Box<dyn FnMut(&Observation) -> ObserverResult>;

/// A list of observers that prunes itself on failure.
#[derive(Default)]
pub struct ObserverTable {
    observers: Vec<Observer>,
}

impl ObserverTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        ObserverTable::default()
    }

    /// Attaches an observer.
    pub fn attach(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    /// Notifies every observer; those returning an error are detached
    /// and the rest keep receiving notifications.
    pub fn notify_all(&mut self, observation: &Observation) {
        self.observers.retain_mut(|observer| match observer(observation) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, kind = ?observation.kind, "detaching failing observer");
                false
            }
        });
    }

    /// Number of attached observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observer is attached.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
