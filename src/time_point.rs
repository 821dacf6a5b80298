//! Absolute simulation time as a variable-precision base-1000 magnitude.
//!
//! A [`TimePoint`] stores a little-endian vector of base-1000 digits plus
//! the [`Scale`] of its least significant digit. The representation is
//! canonical: trailing (most significant) zero digits are stripped, and
//! leading (least significant) zero digits are absorbed by coarsening the
//! precision, so equal values at comparable precisions share one form and
//! ordering is total. Time only moves through [`TimePoint::advance`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Sub;

use crate::duration::{Duration, MULTIPLIER_LIMIT, MULTIPLIER_MAX};
use crate::scale::Scale;

/// Number of base-1000 digits a multiplier spans.
const EPOCH_DIGITS: usize = 5;

/// An absolute, non-negative point in simulation time.
///
/// The represented value is `Σ digits[i] · 1000^(precision + i)`.
///
/// # Example
///
/// ```
/// use feldspar::{Duration, Scale, TimePoint};
///
/// let mut t = TimePoint::new(5000, Scale::BASE);
/// assert_eq!(t.precision(), Scale::KILO);
/// assert_eq!(t.to_string(), "5e+3");
///
/// t.advance(Duration::new(250, Scale::BASE));
/// assert_eq!(t.to_string(), "5250");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimePoint {
    /// Base-1000 digits, least significant first. Never empty.
    digits: Vec<u16>,
    /// Scale of `digits[0]`.
    precision: Scale,
}

impl TimePoint {
    /// Creates a time point from a non-negative multiplier at a scale.
    ///
    /// The value is normalized: `TimePoint::new(5000, Scale::BASE)` holds
    /// a single digit `5` at KILO precision.
    pub fn new(multiplier: i64, precision: Scale) -> Self {
        let mut value = multiplier.max(0);
        let mut digits = Vec::new();
        while value > 0 {
            digits.push((value % 1000) as u16);
            value /= 1000;
        }
        if digits.is_empty() {
            digits.push(0);
        }
        let mut point = TimePoint { digits, precision };
        point.normalize();
        point
    }

    /// The origin of time at base scale.
    pub fn origin() -> Self {
        TimePoint {
            digits: vec![0],
            precision: Scale::BASE,
        }
    }

    /// Scale of the least significant digit.
    pub fn precision(&self) -> Scale {
        self.precision
    }

    /// Number of stored digits.
    pub fn size(&self) -> usize {
        self.digits.len()
    }

    /// The stored digit sequence, least significant first.
    pub fn digits(&self) -> &[u16] {
        &self.digits
    }

    /// Whether this is the origin.
    pub fn is_zero(&self) -> bool {
        self.digits.iter().all(|&d| d == 0)
    }

    /// The digit at a scale, `0` outside the represented range.
    pub fn at(&self, scale: Scale) -> u16 {
        let idx = scale - self.precision;
        if idx < 0 || idx as usize >= self.digits.len() {
            0
        } else {
            self.digits[idx as usize]
        }
    }

    /// Scale of the most significant stored digit.
    fn top_scale(&self) -> Scale {
        self.precision + (self.digits.len() as i32 - 1)
    }

    /// Advances the point in place, truncating it to the duration's
    /// precision when the duration is coarser.
    ///
    /// Truncation is the planning semantic: advancing `5010388` by
    /// `-2 @ KILO` first drops the sub-KILO digits, landing on `5008000`
    /// represented as `[8, 5]` at KILO.
    pub fn advance(&mut self, d: Duration) {
        self.advance_by(d, true);
    }

    /// Advances without truncation: when the duration is coarser than the
    /// point, the point keeps its fine digits and the duration applies at
    /// its own digit position.
    pub fn advance_exact(&mut self, d: Duration) {
        self.advance_by(d, false);
    }

    fn advance_by(&mut self, d: Duration, truncate: bool) {
        debug_assert!(!d.is_infinite());
        if d.is_infinite() || d.is_zero() {
            return;
        }
        if truncate && d.precision() > self.precision {
            // The duration is coarser: drop the digits below its precision.
            self.truncate_raw(d.precision());
        }
        let offset = d.precision() - self.precision;
        let index = if offset < 0 {
            // The duration is finer: extend downward with zero digits.
            let extend = (-offset) as usize;
            self.digits.splice(0..0, std::iter::repeat(0).take(extend));
            self.precision = d.precision();
            0
        } else {
            offset as usize
        };
        self.apply(index, d.multiplier());
        self.normalize();
    }

    /// Propagates a signed multiplier into the digit vector with carry
    /// and borrow in base 1000.
    fn apply(&mut self, start: usize, multiplier: i64) {
        let mut carry = multiplier;
        let mut idx = start;
        while carry != 0 {
            if idx >= self.digits.len() {
                if carry > 0 {
                    self.digits.resize(idx + 1, 0);
                } else {
                    // Borrow past the most significant digit: the point is
                    // non-negative by construction, clamp at the origin.
                    self.digits.clear();
                    self.digits.push(0);
                    return;
                }
            }
            let mut v = self.digits[idx] as i64 + carry.rem_euclid(1000);
            carry = carry.div_euclid(1000);
            if v >= 1000 {
                v -= 1000;
                carry += 1;
            }
            self.digits[idx] = v as u16;
            idx += 1;
        }
    }

    /// Drops the digits below a scale, coarsening the point to it.
    /// A no-op when the point is already at that scale or coarser.
    pub fn truncate(&mut self, scale: Scale) {
        self.truncate_raw(scale);
        self.normalize();
    }

    fn truncate_raw(&mut self, scale: Scale) {
        let drop = scale - self.precision;
        if drop <= 0 {
            return;
        }
        let drop = (drop as usize).min(self.digits.len());
        self.digits.drain(0..drop);
        if self.digits.is_empty() {
            self.digits.push(0);
        }
        self.precision = scale;
    }

    /// Restores canonical form: strip high zeros, absorb low zeros into
    /// the precision.
    fn normalize(&mut self) {
        while self.digits.len() > 1 && *self.digits.last().unwrap() == 0 {
            self.digits.pop();
        }
        while self.digits.len() > 1 && self.digits[0] == 0 {
            self.digits.remove(0);
            self.precision = self.precision + 1;
        }
    }

    /// The signed difference `self − other` as a [`Duration`].
    ///
    /// When the exact difference is representable at some scale at or
    /// above the finer of the two precisions, it is returned at the finest
    /// such scale. Otherwise the five most significant base-1000 digits
    /// are kept and the result is rounded to nearest at that scale, so the
    /// error is strictly less than one quantum of the returned scale.
    pub fn gap(&self, other: &TimePoint) -> Duration {
        let ordering = self.cmp(other);
        if ordering == Ordering::Equal {
            return Duration::zero(self.precision.refined(other.precision));
        }
        let (hi, lo, negate) = match ordering {
            Ordering::Less => (other, self, true),
            _ => (self, other, false),
        };
        let fine = hi.precision.refined(lo.precision);
        let top = hi.top_scale().coarsened(lo.top_scale());
        let slots = (top - fine + 1) as usize;

        let mut diff = vec![0u16; slots];
        let mut borrow = 0i32;
        for (i, slot) in diff.iter_mut().enumerate() {
            let scale = fine + i as i32;
            let mut v = hi.at(scale) as i32 - lo.at(scale) as i32 - borrow;
            if v < 0 {
                v += 1000;
                borrow = 1;
            } else {
                borrow = 0;
            }
            *slot = v as u16;
        }
        debug_assert_eq!(borrow, 0);

        let msd = diff.iter().rposition(|&d| d != 0).unwrap_or(0);
        let lsd = diff.iter().position(|&d| d != 0).unwrap_or(0);

        let (multiplier, scale) = if msd - lsd < EPOCH_DIGITS {
            // Exact: the significant digits fit in one multiplier.
            let mut m = 0i64;
            for i in (lsd..=msd).rev() {
                m = m * 1000 + diff[i] as i64;
            }
            (m, fine + lsd as i32)
        } else {
            // Keep the top five digits, round on the first dropped one.
            let keep = msd + 1 - EPOCH_DIGITS;
            let mut m = 0i64;
            for i in (keep..=msd).rev() {
                m = m * 1000 + diff[i] as i64;
            }
            if diff[keep - 1] >= 500 {
                m += 1;
            }
            if m > MULTIPLIER_MAX {
                (m / 1000, fine + (keep as i32 + 1))
            } else {
                (m, fine + keep as i32)
            }
        };
        let d = Duration::new(multiplier, scale);
        if negate {
            -d
        } else {
            d
        }
    }

    /// The time modulo one epoch (`10^15` quanta) at a scale, truncated
    /// to an integer count of quanta; always in `[0, MULTIPLIER_LIMIT)`.
    pub fn epoch_phase(&self, scale: Scale) -> i64 {
        let mut phase = 0i64;
        for i in (0..EPOCH_DIGITS).rev() {
            phase = phase * 1000 + self.at(scale + i as i32) as i64;
        }
        phase
    }

    /// The phase at which `now + d` lands, relative to the epoch boundary
    /// at or past `now`.
    ///
    /// Landing in the same epoch returns `phase(now) + d`; crossing the
    /// boundary wraps, yielding a result strictly less than `d`. The
    /// returned scale coarsens while the multiplier stays divisible by
    /// 1000, so no accuracy is lost.
    pub fn phase_from_duration(&self, d: Duration) -> Duration {
        debug_assert!(!d.is_infinite());
        if d.is_zero() {
            // The phase of `now` itself, at the point's own precision.
            return Duration::new(self.epoch_phase(self.precision), self.precision);
        }
        let origin = self.is_zero();
        let phase = self.epoch_phase(d.precision());
        let mut multiplier = (phase + d.multiplier()).rem_euclid(MULTIPLIER_LIMIT);
        let mut scale = d.precision();
        while multiplier != 0
            && multiplier % 1000 == 0
            && !(origin && scale >= Scale::BASE)
        {
            multiplier /= 1000;
            scale = scale + 1;
        }
        Duration::new(multiplier, scale)
    }

    /// Converts a phase back into the duration remaining until it, by
    /// subtracting the current phase at the phase's own precision.
    pub fn duration_from_phase(&self, phase: Duration) -> Duration {
        Duration::new(
            phase.multiplier() - self.epoch_phase(phase.precision()),
            phase.precision(),
        )
    }

    /// Re-expresses a planned duration at a finer scale, accounting for
    /// the digits of this point that planning truncation dropped.
    ///
    /// A duration planned at a coarse scale advances time from the point
    /// truncated to that scale; the actually elapsed interval at a finer
    /// scale is therefore the rescaled duration minus the truncated
    /// residue. Returns the infinite sentinel when the refined multiplier
    /// is not representable.
    pub fn refined_duration(&self, d: Duration, target: Scale) -> Duration {
        if d.is_infinite() || target >= d.precision() {
            return d;
        }
        if d.is_zero() {
            // Advancing by zero never truncates, so nothing elapses.
            return Duration::zero(target);
        }
        let mut multiplier = d.multiplier();
        let mut scale = d.precision();
        while scale > target {
            multiplier = match multiplier.checked_mul(1000) {
                Some(m) if m - (self.at(scale - 1) as i64) <= MULTIPLIER_MAX => {
                    m - self.at(scale - 1) as i64
                }
                _ => return Duration::INFINITY,
            };
            scale = scale - 1;
        }
        Duration::new(multiplier, scale)
    }

    /// Truncates to an integer count of quanta at this point's precision.
    pub fn to_i64(&self) -> i64 {
        let mut value = 0i64;
        for &d in self.digits.iter().rev() {
            value = match value.checked_mul(1000).and_then(|v| v.checked_add(d as i64)) {
                Some(v) => v,
                None => return i64::MAX,
            };
        }
        value
    }

    /// A floating-point approximation of the value at base scale.
    pub fn to_f64(&self) -> f64 {
        self.digits
            .iter()
            .enumerate()
            .map(|(i, &d)| d as f64 * 1000f64.powi(self.precision.0 + i as i32))
            .sum()
    }
}

impl Default for TimePoint {
    fn default() -> Self {
        TimePoint::origin()
    }
}

impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimePoint {}

impl PartialOrd for TimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimePoint {
    /// Total order by normalized magnitude.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        let top_a = self.top_scale();
        let top_b = other.top_scale();
        if top_a != top_b {
            return top_a.cmp(&top_b);
        }
        let bottom = self.precision.refined(other.precision);
        let mut scale = top_a;
        while scale >= bottom {
            let ordering = self.at(scale).cmp(&other.at(scale));
            if ordering != Ordering::Equal {
                return ordering;
            }
            scale = scale - 1;
        }
        Ordering::Equal
    }
}

impl Sub for &TimePoint {
    type Output = Duration;

    fn sub(self, other: &TimePoint) -> Duration {
        self.gap(other)
    }
}

impl fmt::Display for TimePoint {
    /// The base-10 integer built from the digits, with an `e±k` suffix
    /// when the precision is not the base scale.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let mut digits = self.digits.iter().rev();
        write!(f, "{}", digits.next().unwrap())?;
        for d in digits {
            write!(f, "{:03}", d)?;
        }
        let exp = self.precision.decimal_exponent();
        if exp != 0 {
            write!(f, "e{:+}", exp)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(TimePoint::new(0, Scale::BASE).to_string(), "0");
        assert_eq!(TimePoint::new(845249, Scale::MICRO).to_string(), "845249e-6");
        assert_eq!(TimePoint::new(845249, Scale::MEGA).to_string(), "845249e+6");
        assert_eq!(TimePoint::new(5000388, Scale::BASE).to_string(), "5000388");
    }

    #[test]
    fn test_construction_absorbs_low_zeros() {
        let t = TimePoint::new(5000, Scale::BASE);
        assert_eq!(t.digits(), &[5]);
        assert_eq!(t.precision(), Scale::KILO);
        assert_eq!(t.size(), 1);
    }

    #[test]
    fn test_construction_keeps_interior_zeros() {
        let t = TimePoint::new(5000388, Scale::BASE);
        assert_eq!(t.digits(), &[388, 0, 5]);
        assert_eq!(t.precision(), Scale::BASE);
    }

    #[test]
    fn test_indexing() {
        let t = TimePoint::new(5000388, Scale::BASE);
        assert_eq!(t.at(Scale::BASE), 388);
        assert_eq!(t.at(Scale::KILO), 0);
        assert_eq!(t.at(Scale::MEGA), 5);
        assert_eq!(t.at(Scale::GIGA), 0);
        assert_eq!(t.at(Scale::MILLI), 0);
    }

    #[test]
    fn test_advance_truncates_to_coarser_duration() {
        let mut t = TimePoint::new(5010388, Scale::BASE);
        t.advance(Duration::new(-2, Scale::KILO));
        assert_eq!(t.digits(), &[8, 5]);
        assert_eq!(t.precision(), Scale::KILO);
    }

    #[test]
    fn test_advance_same_precision() {
        let mut t = TimePoint::new(72_800_444_321, Scale::NANO);
        t.advance(Duration::new(1_150_000_000, Scale::NANO));
        assert_eq!(t.digits(), &[321, 444, 950, 73]);
        assert_eq!(t.precision(), Scale::NANO);
    }

    #[test]
    fn test_advance_coarser_drops_fine_digits() {
        let mut t = TimePoint::new(72_800_444_321, Scale::NANO);
        t.advance(Duration::new(1_150_000, Scale::MICRO));
        assert_eq!(t.digits(), &[444, 950, 73]);
        assert_eq!(t.precision(), Scale::MICRO);
    }

    #[test]
    fn test_advance_finer_extends() {
        let mut t = TimePoint::new(5, Scale::KILO);
        t.advance(Duration::new(250, Scale::BASE));
        assert_eq!(t.digits(), &[250, 5]);
        assert_eq!(t.precision(), Scale::BASE);
    }

    #[test]
    fn test_advance_round_trip() {
        let mut t = TimePoint::new(72_800_444_321, Scale::NANO);
        let d = Duration::new(1_150_000_000, Scale::NANO);
        t.advance(d);
        t.advance(-d);
        assert_eq!(t, TimePoint::new(72_800_444_321, Scale::NANO));
    }

    #[test]
    fn test_advance_exact_keeps_fine_digits() {
        let mut t = TimePoint::new(5010388, Scale::BASE);
        t.advance_exact(Duration::new(-2, Scale::KILO));
        assert_eq!(t.digits(), &[388, 8, 5]);
        assert_eq!(t.precision(), Scale::BASE);
    }

    #[test]
    fn test_advance_carry_chain() {
        let mut t = TimePoint::new(999_999, Scale::BASE);
        t.advance(Duration::base(1));
        assert_eq!(t.digits(), &[1]);
        assert_eq!(t.precision(), Scale::MEGA);
    }

    #[test]
    fn test_ordering() {
        let a = TimePoint::new(5000, Scale::BASE);
        let b = TimePoint::new(5, Scale::KILO);
        assert_eq!(a, b);
        assert!(TimePoint::new(4999, Scale::BASE) < b);
        assert!(TimePoint::new(1, Scale::MEGA) > b);
        assert!(TimePoint::origin() < TimePoint::new(1, Scale::FEMTO));
    }

    #[test]
    fn test_gap_exact() {
        let a = TimePoint::new(31_775_100, Scale::MICRO);
        let b = TimePoint::new(1170, Scale::MILLI);
        assert_eq!(a.gap(&b), Duration::new(30_605_100, Scale::MICRO));
    }

    #[test]
    fn test_gap_approximates_within_one_quantum() {
        // 1 − 2800·1000⁻⁶: the exact difference spans more digits than a
        // multiplier holds, so the result keeps the top five and rounds.
        let a = TimePoint::new(1, Scale::BASE);
        let b = TimePoint::new(2800, Scale(-6));
        let gap = a.gap(&b);
        assert_eq!(gap, Duration::new(999_999_999_999_997, Scale::FEMTO));
        assert_eq!(
            gap.rescale(Scale::PICO),
            Duration::new(1_000_000_000_000, Scale::PICO),
        );
    }

    #[test]
    fn test_gap_antisymmetry() {
        let a = TimePoint::new(31_775_100, Scale::MICRO);
        let b = TimePoint::new(1170, Scale::MILLI);
        assert_eq!(a.gap(&b), -b.gap(&a));
        let c = TimePoint::new(1, Scale::BASE);
        let d = TimePoint::new(2800, Scale(-6));
        assert_eq!(c.gap(&d), -d.gap(&c));
    }

    #[test]
    fn test_gap_zero() {
        let a = TimePoint::new(42, Scale::BASE);
        assert!(a.gap(&a).is_zero());
    }

    #[test]
    fn test_epoch_phase() {
        let t = TimePoint::new(2000, Scale::BASE);
        assert_eq!(t.epoch_phase(Scale::MILLI), 2_000_000);
        assert_eq!(t.epoch_phase(Scale::BASE), 2000);
        assert_eq!(t.epoch_phase(Scale::TERA), 0);
    }

    #[test]
    fn test_phase_from_duration_same_epoch() {
        let t = TimePoint::origin();
        assert_eq!(
            t.phase_from_duration(Duration::base(500)),
            Duration::base(500),
        );
    }

    #[test]
    fn test_phase_from_duration_wraps_to_next_epoch() {
        let t = TimePoint::new(MULTIPLIER_LIMIT - 1500, Scale::BASE);
        let phase = t.phase_from_duration(Duration::base(5000));
        assert_eq!(phase, Duration::base(3500));
        assert!(phase < Duration::base(5000));
    }

    #[test]
    fn test_phase_from_duration_coarsens() {
        let t = TimePoint::new(2000, Scale::BASE);
        let phase = t.phase_from_duration(Duration::new(5_000_000, Scale::MILLI));
        assert_eq!(phase.multiplier(), 7);
        assert_eq!(phase.precision(), Scale::KILO);
    }

    #[test]
    fn test_phase_from_duration_at_origin_stops_at_base() {
        let t = TimePoint::new(0, Scale::MILLI);
        let phase = t.phase_from_duration(Duration::base(134));
        assert_eq!(phase.precision(), Scale::BASE);
        assert_eq!(phase.multiplier(), 134);
    }

    #[test]
    fn test_phase_from_zero_duration_keeps_point_precision() {
        let t = TimePoint::new(23457, Scale::MICRO);
        let phase = t.phase_from_duration(Duration::zero(Scale::TERA));
        assert_eq!(phase.precision(), Scale::MICRO);
    }

    #[test]
    fn test_duration_from_phase() {
        let t = TimePoint::new(2000, Scale::BASE);
        let phase = Duration::base(7000);
        assert_eq!(t.duration_from_phase(phase), Duration::base(5000));
    }

    #[test]
    fn test_refined_duration_accounts_for_truncation() {
        // Planning 1 @ BASE from t = 0.5 truncates the half second away;
        // at MILLI the actually elapsed interval is 500 quanta.
        let t = TimePoint::new(500, Scale::MILLI);
        let refined = t.refined_duration(Duration::base(1), Scale::MILLI);
        assert_eq!(refined, Duration::new(500, Scale::MILLI));
    }

    #[test]
    fn test_refined_duration_overflow_is_infinite() {
        let t = TimePoint::origin();
        assert!(t
            .refined_duration(Duration::new(MULTIPLIER_MAX, Scale::TERA), Scale::FEMTO)
            .is_infinite());
    }

    #[test]
    fn test_conversions() {
        let t = TimePoint::new(845249, Scale::MICRO);
        assert_eq!(t.to_i64(), 845249);
        assert!((t.to_f64() - 0.845249).abs() < 1e-12);
        assert_eq!(TimePoint::new(5000, Scale::BASE).to_i64(), 5);
    }
}
