//! Signed simulation time
//!
//! Prepull actions live at negative offsets from the pull, so simulation time
//! and durations share one signed nanosecond representation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Signed span of simulation time with nanosecond resolution
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimDuration(pub i64);

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SEC: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;

impl SimDuration {
    pub const ZERO: SimDuration = SimDuration(0);
    pub const NANOSECOND: SimDuration = SimDuration(1);
    pub const MICROSECOND: SimDuration = SimDuration(NANOS_PER_MICRO);
    pub const MILLISECOND: SimDuration = SimDuration(NANOS_PER_MILLI);
    pub const SECOND: SimDuration = SimDuration(NANOS_PER_SEC);
    pub const MINUTE: SimDuration = SimDuration(NANOS_PER_MINUTE);
    pub const HOUR: SimDuration = SimDuration(NANOS_PER_HOUR);
    /// Sentinel for effects that never run out
    pub const NEVER: SimDuration = SimDuration(i64::MAX);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(NANOS_PER_MILLI))
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SEC))
    }

    /// Build from fractional seconds, truncating below one nanosecond
    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * NANOS_PER_SEC as f64) as i64)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        let whole = self.0 / NANOS_PER_SEC;
        let frac = self.0 % NANOS_PER_SEC;
        whole as f64 + frac as f64 / NANOS_PER_SEC as f64
    }

    /// Whole seconds, truncated toward zero
    pub const fn whole_secs(self) -> i64 {
        self.0 / NANOS_PER_SEC
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Scale by a raw scalar without reinterpreting it as a duration
    pub fn mul_f64(self, scalar: f64) -> Self {
        Self((self.0 as f64 * scalar) as i64)
    }

    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Add for SimDuration {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for SimDuration {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign for SimDuration {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for SimDuration {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for SimDuration {
    type Output = Self;
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl fmt::Display for SimDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0s");
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();

        if abs < NANOS_PER_MICRO as u64 {
            return write!(f, "{sign}{abs}ns");
        }
        if abs < NANOS_PER_MILLI as u64 {
            return write!(f, "{sign}{}µs", with_fraction(abs, NANOS_PER_MICRO as u64));
        }
        if abs < NANOS_PER_SEC as u64 {
            return write!(f, "{sign}{}ms", with_fraction(abs, NANOS_PER_MILLI as u64));
        }

        let hours = abs / NANOS_PER_HOUR as u64;
        let minutes = (abs % NANOS_PER_HOUR as u64) / NANOS_PER_MINUTE as u64;
        let secs = abs % NANOS_PER_MINUTE as u64;

        f.write_str(sign)?;
        if hours > 0 {
            write!(f, "{hours}h{minutes}m")?;
        } else if minutes > 0 {
            write!(f, "{minutes}m")?;
        }
        write!(f, "{}s", with_fraction(secs, NANOS_PER_SEC as u64))
    }
}

/// Formats `value / unit` with trailing fractional zeros trimmed
fn with_fraction(value: u64, unit: u64) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let width = unit.to_string().len() - 1;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
