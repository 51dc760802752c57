//! Fixed-point math utilities for deterministic resource accounting.
//!
//! Stockpiles, production rates and the production bonus are all kept in
//! fixed-point so that two runs of the same scenario accumulate exactly the
//! same amounts on every platform. Heuristic scores (ROI, scarcity) are
//! plain `f64` because they are only ever compared, never stored.

use fixed::types::I32F32;

/// Fixed-point number type for all resource math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Seconds in one simulated hour.
pub const SECONDS_PER_HOUR: u64 = 3600;

/// Convert an integer amount into fixed-point, saturating at the type range.
#[must_use]
pub fn fixed_from_u32(value: u32) -> Fixed {
    Fixed::saturating_from_num(value)
}

/// Length of `seconds` expressed in hours.
#[must_use]
pub fn hours_from_seconds(seconds: u64) -> Fixed {
    Fixed::saturating_from_num(seconds) / Fixed::saturating_from_num(SECONDS_PER_HOUR)
}

/// Whole part of a non-negative fixed-point amount.
///
/// Negative values clamp to zero.
#[must_use]
pub fn whole_units(value: Fixed) -> u32 {
    value.floor().saturating_to_num::<u32>()
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_from_seconds() {
        assert_eq!(hours_from_seconds(3600), Fixed::from_num(1));
        assert_eq!(hours_from_seconds(5400), Fixed::from_num(1.5));
        assert_eq!(hours_from_seconds(0), Fixed::ZERO);
    }

    #[test]
    fn test_whole_units_truncates_and_clamps() {
        assert_eq!(whole_units(Fixed::from_num(41.99)), 41);
        assert_eq!(whole_units(Fixed::from_num(-3)), 0);
    }

    #[test]
    fn test_fixed_accumulation_is_deterministic() {
        // Thirds never round-trip exactly, but they must round identically
        let rate = Fixed::from_num(387);
        let a = rate * hours_from_seconds(1200);
        let b = rate * hours_from_seconds(1200);
        assert_eq!(a, b);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_huge_durations_saturate() {
        let h = hours_from_seconds(u64::MAX);
        assert!(h > Fixed::ZERO);
    }
}
