//! Multiscale durations: signed intervals at a base-1000 scale.
//!
//! A [`Duration`] is a signed 64-bit multiplier paired with a [`Scale`].
//! The multiplier is bounded by [`MULTIPLIER_MAX`] (`10^15 - 1`), five
//! base-1000 digits; values that cannot be represented saturate to the
//! infinite sentinel. Two durations at different scales compare by exact
//! magnitude, so a femtosecond-scale interval and a kilosecond-scale
//! interval order correctly without loss.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};

use crate::scale::Scale;

/// Largest representable multiplier: `10^15 - 1`.
pub const MULTIPLIER_MAX: i64 = 999_999_999_999_999;

/// One epoch of multiplier units: `10^15`.
pub const MULTIPLIER_LIMIT: i64 = 1_000_000_000_000_000;

/// Sentinel multiplier for unreachable time.
const MULTIPLIER_INFINITE: i64 = i64::MAX;

/// A signed time interval at a given scale.
///
/// The represented value is `multiplier * 1000^scale` base units. A
/// duration may be *fixed*, pinning it to the scale it was fixed at;
/// planned durations handed to the scheduler are fixed at their model's
/// precision level.
///
/// # Example
///
/// ```
/// use feldspar::{Duration, Scale};
///
/// let d = Duration::new(1500, Scale::MILLI);
/// assert_eq!(d.multiplier(), 1500);
/// assert!(d < Duration::new(2, Scale::BASE));
/// assert!(Duration::INFINITY > d);
/// ```
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Duration {
    multiplier: i64,
    precision: Scale,
    fixed: bool,
}

impl Duration {
    /// The unreachable-time sentinel.
    pub const INFINITY: Duration = Duration {
        multiplier: MULTIPLIER_INFINITE,
        precision: Scale::BASE,
        fixed: false,
    };

    /// The zero interval at base scale.
    pub const ZERO: Duration = Duration {
        multiplier: 0,
        precision: Scale::BASE,
        fixed: false,
    };

    /// Creates a duration from a multiplier and scale.
    ///
    /// Multipliers beyond [`MULTIPLIER_MAX`] in magnitude saturate to the
    /// infinite sentinel of the matching sign.
    pub fn new(multiplier: i64, precision: Scale) -> Self {
        if multiplier > MULTIPLIER_MAX {
            Duration {
                multiplier: MULTIPLIER_INFINITE,
                precision,
                fixed: false,
            }
        } else if multiplier < -MULTIPLIER_MAX {
            Duration {
                multiplier: -MULTIPLIER_INFINITE,
                precision,
                fixed: false,
            }
        } else {
            Duration {
                multiplier,
                precision,
                fixed: false,
            }
        }
    }

    /// Creates a duration at base scale.
    pub fn base(multiplier: i64) -> Self {
        Self::new(multiplier, Scale::BASE)
    }

    /// The zero interval at the given scale.
    pub fn zero(precision: Scale) -> Self {
        Duration {
            multiplier: 0,
            precision,
            fixed: false,
        }
    }

    /// Returns the multiplier.
    pub fn multiplier(&self) -> i64 {
        self.multiplier
    }

    /// Returns the scale of the multiplier.
    pub fn precision(&self) -> Scale {
        self.precision
    }

    /// Whether this duration is pinned to its scale.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Whether this duration is the unreachable-time sentinel.
    pub fn is_infinite(&self) -> bool {
        self.multiplier == MULTIPLIER_INFINITE || self.multiplier == -MULTIPLIER_INFINITE
    }

    /// Whether this duration is zero. Zero compares equal at every scale.
    pub fn is_zero(&self) -> bool {
        self.multiplier == 0
    }

    /// Whether this duration is strictly negative.
    pub fn is_negative(&self) -> bool {
        self.multiplier < 0
    }

    /// Re-expresses the duration at another scale.
    ///
    /// Refining (moving to a smaller exponent) multiplies the multiplier
    /// and saturates to the infinite sentinel on overflow. Coarsening
    /// divides, rounding to the nearest multiple (half away from zero).
    ///
    /// # Example
    ///
    /// ```
    /// use feldspar::{Duration, Scale};
    ///
    /// let d = Duration::new(7, Scale::KILO);
    /// assert_eq!(d.rescale(Scale::BASE), Duration::new(7000, Scale::BASE));
    /// assert_eq!(
    ///     Duration::new(999_999_999_999_997, Scale::FEMTO).rescale(Scale::PICO),
    ///     Duration::new(1_000_000_000_000, Scale::PICO),
    /// );
    /// ```
    pub fn rescale(&self, to: Scale) -> Duration {
        if self.is_infinite() {
            return Duration {
                multiplier: self.multiplier,
                precision: to,
                fixed: self.fixed,
            };
        }
        let delta = self.precision - to;
        let multiplier = shift_multiplier(self.multiplier, delta);
        match multiplier {
            Some(m) if m.abs() <= MULTIPLIER_MAX => Duration {
                multiplier: m,
                precision: to,
                fixed: self.fixed,
            },
            _ => Duration {
                multiplier: if self.multiplier < 0 {
                    -MULTIPLIER_INFINITE
                } else {
                    MULTIPLIER_INFINITE
                },
                precision: to,
                fixed: self.fixed,
            },
        }
    }

    /// Expresses the duration at exactly the given scale, pinning it there.
    ///
    /// Returns the infinite sentinel when the value is not exactly
    /// representable at that scale, either because refining overflows the
    /// multiplier or because coarsening would drop a nonzero remainder.
    pub fn fixed_at(&self, scale: Scale) -> Duration {
        if self.is_infinite() || self.multiplier == 0 {
            return Duration {
                multiplier: self.multiplier,
                precision: scale,
                fixed: true,
            };
        }
        let delta = self.precision - scale;
        let exact = if delta >= 0 {
            // Refining: multiply, overflow is unrepresentable.
            pow1000(delta as u32)
                .and_then(|f| (self.multiplier as i128).checked_mul(f))
                .filter(|m| m.abs() <= MULTIPLIER_MAX as i128)
                .map(|m| m as i64)
        } else {
            // Coarsening: only exact when the remainder is zero.
            pow1000((-delta) as u32).and_then(|f| {
                let m = self.multiplier as i128;
                if m % f == 0 {
                    Some((m / f) as i64)
                } else {
                    None
                }
            })
        };
        match exact {
            Some(m) => Duration {
                multiplier: m,
                precision: scale,
                fixed: true,
            },
            None => Duration {
                multiplier: if self.multiplier < 0 {
                    -MULTIPLIER_INFINITE
                } else {
                    MULTIPLIER_INFINITE
                },
                precision: scale,
                fixed: true,
            },
        }
    }

    /// Exact magnitude in units of `1000^min_scale`, for comparisons.
    fn widened(&self, at: Scale) -> Option<i128> {
        if self.multiplier == 0 {
            return Some(0);
        }
        let delta = self.precision - at;
        debug_assert!(delta >= 0);
        pow1000(delta as u32).and_then(|f| (self.multiplier as i128).checked_mul(f))
    }
}

/// Shifts a multiplier by `delta` base-1000 digits.
///
/// Positive `delta` refines (multiplies); negative coarsens with
/// round-to-nearest, half away from zero. `None` on overflow.
fn shift_multiplier(multiplier: i64, delta: i32) -> Option<i64> {
    if delta == 0 || multiplier == 0 {
        return Some(multiplier);
    }
    if delta > 0 {
        let f = pow1000(delta as u32)?;
        let m = (multiplier as i128).checked_mul(f)?;
        i64::try_from(m).ok()
    } else {
        let m = multiplier as i128;
        match pow1000((-delta) as u32) {
            Some(f) => {
                let rounded = (m.abs() + f / 2) / f;
                Some((rounded * m.signum()) as i64)
            }
            // Coarsening further than any representable magnitude.
            None => Some(0),
        }
    }
}

/// `1000^exp` as i128, `None` when it exceeds the widening range.
fn pow1000(exp: u32) -> Option<i128> {
    if exp > 12 {
        return None;
    }
    Some(1000i128.pow(exp))
}

impl Default for Duration {
    fn default() -> Self {
        Duration::ZERO
    }
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Duration {}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Duration {
    /// Exact numeric ordering across scales; infinities order outermost.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_infinite(), other.is_infinite()) {
            (true, true) => self.multiplier.signum().cmp(&other.multiplier.signum()),
            (true, false) => {
                if self.multiplier > 0 {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (false, true) => {
                if other.multiplier > 0 {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (false, false) => {
                if self.multiplier == 0 && other.multiplier == 0 {
                    return Ordering::Equal;
                }
                let fine = self.precision.refined(other.precision);
                match (self.widened(fine), other.widened(fine)) {
                    (Some(a), Some(b)) => a.cmp(&b),
                    // A multiplier that overflows the widening range
                    // dominates any representable one.
                    (None, Some(_)) => {
                        if self.multiplier < 0 {
                            Ordering::Less
                        } else {
                            Ordering::Greater
                        }
                    }
                    (Some(_), None) => {
                        if other.multiplier < 0 {
                            Ordering::Greater
                        } else {
                            Ordering::Less
                        }
                    }
                    (None, None) => {
                        // Both beyond the widening range: same scale gap is
                        // impossible here, so order by sign then scale.
                        let sa = self.multiplier.signum();
                        let sb = other.multiplier.signum();
                        if sa != sb {
                            return sa.cmp(&sb);
                        }
                        let by_scale = self.precision.cmp(&other.precision);
                        if sa < 0 {
                            by_scale.reverse()
                        } else {
                            by_scale
                        }
                    }
                }
            }
        }
    }
}

impl Add for Duration {
    type Output = Duration;

    /// Normalizes both operands to the finer scale when the coarser one
    /// can be refined without overflow, otherwise coarsens the finer
    /// operand; the sum saturates to the infinite sentinel.
    fn add(self, other: Duration) -> Duration {
        if self.is_infinite() {
            return self;
        }
        if other.is_infinite() {
            return other;
        }
        let fine = self.precision.refined(other.precision);
        let coarse = self.precision.coarsened(other.precision);
        let fixed = self.fixed || other.fixed;
        let (a, b, at) = match (self.widened(fine), other.widened(fine)) {
            (Some(a), Some(b)) if a.abs() <= MULTIPLIER_MAX as i128 && b.abs() <= MULTIPLIER_MAX as i128 => {
                (a as i64, b as i64, fine)
            }
            _ => (
                self.rescale(coarse).multiplier,
                other.rescale(coarse).multiplier,
                coarse,
            ),
        };
        let mut sum = Duration::new(a.saturating_add(b), at);
        sum.fixed = fixed;
        sum
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, other: Duration) -> Duration {
        self + (-other)
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Duration {
        Duration {
            multiplier: if self.is_infinite() {
                -self.multiplier
            } else {
                self.multiplier.wrapping_neg()
            },
            precision: self.precision,
            fixed: self.fixed,
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            return write!(f, "{}INFINITY", if self.multiplier < 0 { "-" } else { "" });
        }
        let exp = self.precision.decimal_exponent();
        if exp == 0 {
            write!(f, "{}", self.multiplier)
        } else {
            write!(f, "{}e{:+}", self.multiplier, exp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_clamps() {
        let d = Duration::new(MULTIPLIER_MAX + 1, Scale::BASE);
        assert!(d.is_infinite());
        let d = Duration::new(-(MULTIPLIER_MAX + 1), Scale::BASE);
        assert!(d.is_infinite());
        let d = Duration::new(MULTIPLIER_MAX, Scale::BASE);
        assert!(!d.is_infinite());
    }

    #[test]
    fn test_zero_equal_across_scales() {
        assert_eq!(Duration::zero(Scale::FEMTO), Duration::zero(Scale::TERA));
        assert!(Duration::zero(Scale::FEMTO).is_zero());
    }

    #[test]
    fn test_cross_scale_comparison() {
        assert!(Duration::new(999, Scale::MILLI) < Duration::new(1, Scale::BASE));
        assert_eq!(Duration::new(1000, Scale::MILLI), Duration::new(1, Scale::BASE));
        assert!(Duration::new(1, Scale::KILO) > Duration::new(999_999, Scale::MILLI));
        assert!(Duration::new(-1, Scale::BASE) < Duration::new(1, Scale::FEMTO));
        // Scale gap wider than the representable span.
        assert!(Duration::new(1, Scale(6)) > Duration::new(MULTIPLIER_MAX, Scale(-8)));
    }

    #[test]
    fn test_infinity_ordering() {
        assert!(Duration::INFINITY > Duration::new(MULTIPLIER_MAX, Scale::TERA));
        assert!(-Duration::INFINITY < Duration::new(-MULTIPLIER_MAX, Scale::TERA));
        assert_eq!(Duration::INFINITY, Duration::INFINITY);
    }

    #[test]
    fn test_rescale_refines() {
        let d = Duration::new(7, Scale::KILO);
        assert_eq!(d.rescale(Scale::BASE).multiplier(), 7000);
        assert_eq!(d.rescale(Scale::BASE).precision(), Scale::BASE);
    }

    #[test]
    fn test_rescale_overflow_is_infinite() {
        let d = Duration::new(MULTIPLIER_MAX, Scale::BASE);
        assert!(d.rescale(Scale::FEMTO).is_infinite());
    }

    #[test]
    fn test_rescale_coarsening_rounds() {
        assert_eq!(
            Duration::new(999_999_999_999_997, Scale::FEMTO)
                .rescale(Scale::PICO)
                .multiplier(),
            1_000_000_000_000,
        );
        assert_eq!(Duration::new(1499, Scale::BASE).rescale(Scale::KILO).multiplier(), 1);
        assert_eq!(Duration::new(1500, Scale::BASE).rescale(Scale::KILO).multiplier(), 2);
        assert_eq!(Duration::new(-1500, Scale::BASE).rescale(Scale::KILO).multiplier(), -2);
    }

    #[test]
    fn test_fixed_at_exact() {
        let d = Duration::new(5000, Scale::BASE).fixed_at(Scale::KILO);
        assert_eq!(d.multiplier(), 5);
        assert!(d.is_fixed());
        assert_eq!(d.precision(), Scale::KILO);
    }

    #[test]
    fn test_fixed_at_inexact_is_infinite() {
        assert!(Duration::new(5500, Scale::BASE).fixed_at(Scale::KILO).is_infinite());
        // Refining past the representable span.
        assert!(Duration::new(1000, Scale::TERA).fixed_at(Scale::FEMTO).is_infinite());
    }

    #[test]
    fn test_fixed_at_preserves_zero_and_infinity() {
        assert!(Duration::zero(Scale::BASE).fixed_at(Scale::NANO).is_zero());
        assert!(Duration::INFINITY.fixed_at(Scale::NANO).is_infinite());
    }

    #[test]
    fn test_addition_same_scale() {
        let sum = Duration::base(40) + Duration::base(2);
        assert_eq!(sum, Duration::base(42));
    }

    #[test]
    fn test_addition_normalizes_to_finer() {
        let sum = Duration::new(1, Scale::BASE) + Duration::new(500, Scale::MILLI);
        assert_eq!(sum.precision(), Scale::MILLI);
        assert_eq!(sum.multiplier(), 1500);
    }

    #[test]
    fn test_addition_coarsens_on_overflow() {
        // The KILO operand cannot be refined to FEMTO, so FEMTO coarsens.
        let sum = Duration::new(MULTIPLIER_MAX, Scale::KILO) + Duration::new(1, Scale::FEMTO);
        assert_eq!(sum.precision(), Scale::KILO);
        assert_eq!(sum.multiplier(), MULTIPLIER_MAX);
    }

    #[test]
    fn test_addition_with_infinity() {
        assert!((Duration::INFINITY + Duration::base(5)).is_infinite());
        assert!((Duration::base(5) - Duration::INFINITY).is_infinite());
    }

    #[test]
    fn test_negation() {
        assert_eq!(-Duration::base(5), Duration::base(-5));
        assert!((-Duration::INFINITY).is_infinite());
        assert!((-Duration::INFINITY) < Duration::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(Duration::base(42).to_string(), "42");
        assert_eq!(Duration::new(7, Scale::KILO).to_string(), "7e+3");
        assert_eq!(Duration::new(134, Scale::MICRO).to_string(), "134e-6");
        assert_eq!(Duration::INFINITY.to_string(), "INFINITY");
    }
}
