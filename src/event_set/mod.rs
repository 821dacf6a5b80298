//! Event-set scheduling: planned durations behind pluggable backends.
//!
//! An [`EventSet`] keeps every scheduled item keyed by the absolute
//! deadline obtained by advancing a shared reference [`TimePoint`] by the
//! planned [`Duration`]. Clients speak only in durations relative to the
//! reference; the reference itself shifts when the driver advances the
//! clock. Backends implement the [`Scheduler`] storage contract and are
//! selected by [`SchedulerKind`] at configuration time.

pub mod calendar;
pub mod heap;

use serde::{Deserialize, Serialize};
use std::hash::Hash;
use thiserror::Error;

use crate::duration::Duration;
use crate::scale::Scale;
use crate::time_point::TimePoint;

pub use calendar::CalendarScheduler;
pub use heap::BinaryHeapScheduler;

/// Raised when an event cannot be represented in the schedule, e.g. a
/// planned duration that is infinite or lies in the past.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("cannot plan event at duration {duration}")]
pub struct PlanningError {
    /// The duration that was rejected.
    pub duration: Duration,
}

/// Which [`Scheduler`] backend an event set uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// Lazy-deletion binary heap; cheapest planning path.
    #[default]
    BinaryHeap,
    /// Ordered map of deadline keys; cheapest imminent scans.
    Calendar,
}

/// The priority key of a scheduled event.
///
/// Ordering is by deadline first; among numerically equal deadlines the
/// finer planning precision sorts first, and insertion order breaks the
/// remaining ties, so simultaneous events fire FIFO.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventKey {
    /// Absolute time at which the event fires.
    pub deadline: TimePoint,
    /// Scale the duration was planned at.
    pub precision: Scale,
    /// Insertion sequence number; unique per event set.
    pub seq: u64,
}

/// Storage contract for event-set backends.
///
/// Keys are unique (the sequence number sees to that), so implementations
/// may treat the key as the full identity of a slot. `peek_key` and
/// `pop_imminent` take `&mut self` so lazy backends can compact stale
/// slots while scanning.
pub trait Scheduler<T> {
    /// Stores an item under a key. The item must not currently be
    /// scheduled.
    fn schedule(&mut self, item: T, key: EventKey);

    /// Removes an item, returning the key it was scheduled under.
    fn unschedule(&mut self, item: &T) -> Option<EventKey>;

    /// The key an item is currently scheduled under.
    fn key_of(&self, item: &T) -> Option<&EventKey>;

    /// The minimum key, without removing anything.
    fn peek_key(&mut self) -> Option<&EventKey>;

    /// Removes and returns every item whose deadline equals the current
    /// minimum deadline, in key order.
    fn pop_imminent(&mut self) -> Vec<T>;

    /// Number of scheduled items.
    fn len(&self) -> usize;

    /// Whether nothing is scheduled.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A priority schedule of items keyed by planned durations, all measured
/// from a shared current time.
///
/// # Example
///
/// ```
/// use feldspar::{Duration, EventSet, SchedulerKind, TimePoint};
///
/// let mut set: EventSet<u32> = EventSet::new(SchedulerKind::BinaryHeap, TimePoint::origin());
/// set.plan_event(1, Duration::base(10)).unwrap();
/// set.plan_event(2, Duration::base(25)).unwrap();
/// assert_eq!(set.imminent_duration(), Duration::base(10));
/// ```
pub struct EventSet<T> {
    current_time: TimePoint,
    backend: Box<dyn Scheduler<T>>,
    seq: u64,
}

impl<T: Clone + Eq + Hash + 'static> EventSet<T> {
    /// Creates an event set with the given backend, referenced to `time`.
    pub fn new(kind: SchedulerKind, time: TimePoint) -> Self {
        let backend: Box<dyn Scheduler<T>> = match kind {
            SchedulerKind::BinaryHeap => Box::new(BinaryHeapScheduler::new()),
            SchedulerKind::Calendar => Box::new(CalendarScheduler::new()),
        };
        EventSet {
            current_time: time,
            backend,
            seq: 0,
        }
    }

    /// The shared reference time durations are measured from.
    pub fn current_time(&self) -> &TimePoint {
        &self.current_time
    }

    /// Moves the reference time to `time`. Deadlines are absolute, so
    /// pending events keep their planned firing times.
    pub fn set_current_time(&mut self, time: TimePoint) {
        self.current_time = time;
    }

    /// Shifts the reference time by a duration.
    pub fn advance(&mut self, d: Duration) {
        self.current_time.advance(d);
    }

    /// Plans (or re-plans) an item to fire `d` from the current time.
    ///
    /// Negative and infinite durations are not representable in the
    /// schedule and are rejected with a [`PlanningError`].
    pub fn plan_event(&mut self, item: T, d: Duration) -> Result<(), PlanningError> {
        if d.is_infinite() || d.is_negative() {
            return Err(PlanningError { duration: d });
        }
        self.backend.unschedule(&item);
        let mut deadline = self.current_time.clone();
        deadline.advance(d);
        let key = EventKey {
            deadline,
            precision: d.precision(),
            seq: self.seq,
        };
        self.seq += 1;
        self.backend.schedule(item, key);
        Ok(())
    }

    /// Removes an item, returning its remaining duration if it was
    /// scheduled.
    pub fn cancel_event(&mut self, item: &T) -> Option<Duration> {
        let time = &self.current_time;
        self.backend.unschedule(item).map(|k| k.deadline.gap(time))
    }

    /// Remaining duration until an item fires; INFINITY if unscheduled.
    pub fn duration_of(&self, item: &T) -> Duration {
        match self.backend.key_of(item) {
            Some(key) => key.deadline.gap(&self.current_time),
            None => Duration::INFINITY,
        }
    }

    /// The minimum remaining duration; INFINITY when empty. Logically
    /// const: lazy backends may compact stale slots.
    pub fn imminent_duration(&mut self) -> Duration {
        let time = self.current_time.clone();
        match self.backend.peek_key() {
            Some(key) => key.deadline.gap(&time),
            None => Duration::INFINITY,
        }
    }

    /// Visits and removes every item whose remaining duration equals the
    /// current minimum; simultaneous events are visited in insertion
    /// order, finer planning precisions first.
    pub fn each_imminent_event(&mut self, mut visit: impl FnMut(T)) {
        for item in self.backend.pop_imminent() {
            visit(item);
        }
    }

    /// Number of scheduled items.
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }
}
