//! Time scales: base-1000 unit exponents.
//!
//! A [`Scale`] selects the size of one time quantum as a power of 1000.
//! Scale 0 is the base unit (conventionally one second); each step down
//! divides the quantum by 1000, each step up multiplies it by 1000.
//! Durations and time points carry a scale alongside their magnitude so
//! that events twelve orders of magnitude apart still compare exactly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A base-1000 unit exponent.
///
/// The unit size of scale `n` is `1000^n`. Smaller exponents are *finer*
/// scales; larger exponents are *coarser*. Named constants cover the
/// femto..tera range, but any exponent is a valid scale.
///
/// # Example
///
/// ```
/// use feldspar::Scale;
///
/// assert!(Scale::MILLI < Scale::BASE);
/// assert_eq!(Scale::MILLI.refined(Scale::KILO), Scale::MILLI);
/// assert_eq!(Scale::BASE + 2, Scale::MEGA);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scale(pub i32);

impl Scale {
    /// `1000^-5` base units (femtoseconds for a one-second base).
    pub const FEMTO: Scale = Scale(-5);
    /// `1000^-4` base units.
    pub const PICO: Scale = Scale(-4);
    /// `1000^-3` base units.
    pub const NANO: Scale = Scale(-3);
    /// `1000^-2` base units.
    pub const MICRO: Scale = Scale(-2);
    /// `1000^-1` base units.
    pub const MILLI: Scale = Scale(-1);
    /// The base unit.
    pub const BASE: Scale = Scale(0);
    /// `1000^1` base units.
    pub const KILO: Scale = Scale(1);
    /// `1000^2` base units.
    pub const MEGA: Scale = Scale(2);
    /// `1000^3` base units.
    pub const GIGA: Scale = Scale(3);
    /// `1000^4` base units.
    pub const TERA: Scale = Scale(4);

    /// Returns the finer of two scales (the smaller exponent).
    pub fn refined(self, other: Scale) -> Scale {
        if self <= other {
            self
        } else {
            other
        }
    }

    /// Returns the coarser of two scales (the larger exponent).
    pub fn coarsened(self, other: Scale) -> Scale {
        if self >= other {
            self
        } else {
            other
        }
    }

    /// The decimal exponent of one quantum at this scale (`3n`).
    pub fn decimal_exponent(self) -> i32 {
        self.0 * 3
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::BASE
    }
}

impl Add<i32> for Scale {
    type Output = Scale;

    fn add(self, steps: i32) -> Scale {
        Scale(self.0 + steps)
    }
}

impl Sub<i32> for Scale {
    type Output = Scale;

    fn sub(self, steps: i32) -> Scale {
        Scale(self.0 - steps)
    }
}

impl Sub for Scale {
    type Output = i32;

    /// Distance in base-1000 digits between two scales.
    fn sub(self, other: Scale) -> i32 {
        self.0 - other.0
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "10^{}", self.decimal_exponent())
    }
}
