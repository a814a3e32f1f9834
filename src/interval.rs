use crate::error::{DatasetError, Result};
use crate::Time;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, clap::ArgEnum)]
#[serde(rename_all = "lowercase")]
pub enum IntervalType {
  /// Always the lower bound
  Tight,
  /// Always the upper bound
  Loose,
  /// Uniform between the bounds, drawn on every sample
  Random,
}

impl IntervalType {
  pub const ALL: [IntervalType; 3] = [IntervalType::Tight, IntervalType::Loose, IntervalType::Random];

  pub fn as_str(&self) -> &'static str {
    match self {
      IntervalType::Tight => "tight",
      IntervalType::Loose => "loose",
      IntervalType::Random => "random",
    }
  }
}

impl fmt::Display for IntervalType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for IntervalType {
  type Err = DatasetError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "tight" => Ok(IntervalType::Tight),
      "loose" => Ok(IntervalType::Loose),
      "random" => Ok(IntervalType::Random),
      other => Err(DatasetError::InvalidConfiguration(format!("unknown interval type `{}`", other))),
    }
  }
}

/// A policy for drawing a duration (in seconds) between two bounds.
///
/// Used both for the pickup time interval (gap between the earliest and latest pickup time of a task)
/// and the time window interval (idle time between the end of one task and the earliest pickup of the next).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
  interval_type: IntervalType,
  lower_bound: Time,
  upper_bound: Time,
}

#[derive(Deserialize)]
struct RawInterval {
  interval_type: IntervalType,
  lower_bound: Time,
  upper_bound: Time,
}

impl TryFrom<RawInterval> for Interval {
  type Error = DatasetError;

  fn try_from(raw: RawInterval) -> Result<Self> {
    Interval::new(raw.interval_type, raw.lower_bound, raw.upper_bound)
  }
}

impl Interval {
  /// Bounds must satisfy `0 <= lower_bound <= upper_bound`.  Negative bounds would let consecutive
  /// pickup windows of a chain overlap.
  pub fn new(interval_type: IntervalType, lower_bound: Time, upper_bound: Time) -> Result<Self> {
    if lower_bound < 0 {
      return Err(DatasetError::InvalidConfiguration(
        format!("interval lower bound must be non-negative, got {}", lower_bound)
      ));
    }
    if lower_bound > upper_bound {
      return Err(DatasetError::InvalidConfiguration(
        format!("interval bounds are inverted: [{}, {}]", lower_bound, upper_bound)
      ));
    }
    Ok(Interval { interval_type, lower_bound, upper_bound })
  }

  pub fn interval_type(&self) -> IntervalType { self.interval_type }

  pub fn lower_bound(&self) -> Time { self.lower_bound }

  pub fn upper_bound(&self) -> Time { self.upper_bound }

  /// Same bounds, different policy.
  pub fn with_type(&self, interval_type: IntervalType) -> Self {
    Interval { interval_type, ..*self }
  }

  /// Returns `true` if sampling never consumes randomness.
  pub fn is_deterministic(&self) -> bool {
    self.interval_type != IntervalType::Random
  }

  pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Time {
    match self.interval_type {
      IntervalType::Tight => self.lower_bound,
      IntervalType::Loose => self.upper_bound,
      IntervalType::Random => {
        let x: f64 = rng.gen_range(self.lower_bound as f64..=self.upper_bound as f64);
        x.round() as Time
      }
    }
  }
}

impl fmt::Display for Interval {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}[{}, {}]", self.interval_type, self.lower_bound, self.upper_bound)
  }
}
