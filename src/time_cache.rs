//! Elapsed-time bookkeeping for processors.
//!
//! A [`TimeCache`] remembers, for each tracked item, the [`TimePoint`] at
//! which its elapsed counter was last reset, so the elapsed duration can
//! be recomputed on demand as the gap from that point to the cache's
//! current time. Passive components (planned duration infinite) are not
//! in any event set, but still need an elapsed value when input reaches
//! them; this cache is where it comes from.

use std::collections::HashMap;
use std::hash::Hash;

use crate::duration::Duration;
use crate::scale::Scale;
use crate::time_point::TimePoint;

/// Per-item reset points for elapsed-duration queries.
pub struct TimeCache<T> {
    current_time: TimePoint,
    reset_points: HashMap<T, TimePoint>,
}

impl<T: Eq + Hash> TimeCache<T> {
    /// Creates a cache referenced to `time`.
    pub fn new(time: TimePoint) -> Self {
        TimeCache {
            current_time: time,
            reset_points: HashMap::new(),
        }
    }

    /// The reference time elapsed durations are measured to.
    pub fn current_time(&self) -> &TimePoint {
        &self.current_time
    }

    /// Moves the reference time.
    pub fn set_current_time(&mut self, time: TimePoint) {
        self.current_time = time;
    }

    /// Shifts the reference time by a duration.
    pub fn advance(&mut self, d: Duration) {
        self.current_time.advance(d);
    }

    /// Stores an item's reset point as `current_time − elapsed`,
    /// truncated at the item's precision level.
    ///
    /// Truncation matters: a component scheduling at KILO that resets at
    /// `t = 500` must measure its next elapsed interval from `0`, not
    /// from `500`, or it would disagree with deadlines planned at KILO.
    pub fn retain_event(&mut self, item: T, elapsed: Duration, precision: Scale) {
        let mut point = self.current_time.clone();
        if !elapsed.is_zero() {
            point.advance(-elapsed);
        }
        point.truncate(precision);
        self.reset_points.insert(item, point);
    }

    /// Elapsed duration since the item's reset point; always
    /// non-negative. Zero for items never retained.
    pub fn elapsed_duration_of(&self, item: &T) -> Duration {
        match self.reset_points.get(item) {
            Some(point) => self.current_time.gap(point),
            None => Duration::ZERO,
        }
    }

    /// Drops an item's reset point.
    pub fn release_event(&mut self, item: &T) {
        self.reset_points.remove(item);
    }

    /// Number of tracked items.
    pub fn len(&self) -> usize {
        self.reset_points.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.reset_points.is_empty()
    }
}
