//! Fixed-point ratios: 16 fractional digits, rounded half-up.
//!
//! Every measure is non-negative, so the value is an unsigned count of
//! 10⁻¹⁶ units. Display strips trailing fractional zeros, which makes
//! equal quantities print (and serialise) identically however derived.

use std::fmt;

use serde::{Serialize, Serializer};

/// Number of fractional digits kept.
pub const SCALE: u32 = 16;

const ONE: u128 = 10u128.pow(SCALE);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal {
    units: u128,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal { units: 0 };
    pub const ONE: Decimal = Decimal { units: ONE };

    pub fn from_count(count: u64) -> Self {
        Self {
            units: u128::from(count) * ONE,
        }
    }

    /// `numerator / denominator`, half-up at [`SCALE`] digits.
    ///
    /// `None` for a zero denominator or a result beyond the representable range.
    pub fn ratio(numerator: u128, denominator: u128) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let mut units = (numerator / denominator).checked_mul(ONE)?;
        let mut remainder = numerator % denominator;
        let mut place = ONE;
        // Long division, one digit at a time, so the scaled numerator never
        // has to fit in 128 bits.
        for _ in 0..SCALE {
            place /= 10;
            remainder = remainder.checked_mul(10)?;
            units = units.checked_add((remainder / denominator) * place)?;
            remainder %= denominator;
        }
        if remainder >= denominator - remainder {
            units = units.checked_add(1)?;
        }
        Some(Self { units })
    }

    /// `self / other`, half-up. `None` when `other` is zero.
    pub fn checked_div(self, other: Decimal) -> Option<Self> {
        // Both operands share the scale, so dividing the raw units yields the
        // quotient itself.
        Self::ratio(self.units, other.units)
    }

    pub fn is_zero(&self) -> bool {
        self.units == 0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let integer = self.units / ONE;
        let fraction = self.units % ONE;
        if fraction == 0 {
            return write!(f, "{integer}");
        }
        let digits = format!("{fraction:0width$}", width = SCALE as usize);
        write!(f, "{integer}.{}", digits.trim_end_matches('0'))
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
