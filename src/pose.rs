use crate::error::{DatasetError, Result};
use crate::task::Plan;
use crate::{Loc, Time};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

pub const DEFAULT_MAX_POSE_ATTEMPTS: usize = 1000;

/// Inclusive `[min, max]` bound on the estimated duration between a pickup and its delivery, in seconds.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DurationRange {
  pub min: Time,
  pub max: Time,
}

impl DurationRange {
  pub fn new(min: Time, max: Time) -> Result<Self> {
    if min > max {
      return Err(DatasetError::InvalidConfiguration(
        format!("duration range is inverted: [{}, {}]", min, max)
      ));
    }
    Ok(DurationRange { min, max })
  }

  pub fn unbounded() -> Self {
    DurationRange { min: Time::MIN, max: Time::MAX }
  }

  pub fn contains(&self, d: Time) -> bool {
    self.min <= d && d <= self.max
  }
}

impl Default for DurationRange {
  fn default() -> Self { DurationRange::unbounded() }
}

impl fmt::Display for DurationRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}, {}]", self.min, self.max)
  }
}

/// Conservative single-point estimate of a travel time distribution: mean plus two standard deviations,
/// rounded to whole seconds.
pub fn conservative_estimate(mean: f64, variance: f64) -> Time {
  (mean + 2.0 * variance.max(0.0).sqrt()).round() as Time
}

/// Path and travel-time queries over a map.
pub trait Planner {
  /// Goal poses belonging to any of the given map sections, in a stable order.
  fn goals(&self, map_sections: &[String]) -> Result<Vec<Loc>>;

  fn get_path(&self, from: &Loc, to: &Loc) -> Result<Vec<Loc>>;

  /// Mean and variance of the time needed to traverse `path`.
  fn get_estimated_duration(&self, path: &[Loc]) -> Result<(f64, f64)>;
}

/// Source of pickup/delivery pose pairs and travel plans.
pub trait PoseProvider {
  fn get_poses(
    &self,
    map_sections: &[String],
    duration_range: &DurationRange,
    rng: &mut dyn rand::RngCore,
  ) -> Result<(Loc, Loc)>;

  fn get_plan(&self, pickup: &Loc, delivery: &Loc) -> Result<Plan>;
}

/// Rejection-samples pose pairs from a [`Planner`], giving up after `max_attempts` draws.
pub struct PoseCreator<P> {
  planner: P,
  pub max_attempts: usize,
}

impl<P: Planner> PoseCreator<P> {
  pub fn new(planner: P) -> Self {
    PoseCreator { planner, max_attempts: DEFAULT_MAX_POSE_ATTEMPTS }
  }

  pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
    self.max_attempts = max_attempts;
    self
  }

  pub fn planner(&self) -> &P { &self.planner }

  pub fn estimated_duration(&self, pickup: &Loc, delivery: &Loc) -> Result<Time> {
    Ok(self.get_plan(pickup, delivery)?.estimated_duration)
  }

  fn unsatisfiable(&self, map_sections: &[String], duration_range: &DurationRange, attempts: usize) -> DatasetError {
    DatasetError::UnsatisfiablePoseConstraint {
      sections: map_sections.to_vec(),
      duration_range: *duration_range,
      attempts,
    }
  }
}

impl<P: Planner> PoseProvider for PoseCreator<P> {
  #[tracing::instrument(level = "trace", skip(self, rng))]
  fn get_poses(
    &self,
    map_sections: &[String],
    duration_range: &DurationRange,
    rng: &mut dyn rand::RngCore,
  ) -> Result<(Loc, Loc)> {
    let goals = self.planner.goals(map_sections)?;
    if goals.len() < 2 {
      debug!(n_goals = goals.len(), "not enough goal poses");
      return Err(self.unsatisfiable(map_sections, duration_range, 0));
    }

    for attempt in 0..self.max_attempts {
      let i = rng.gen_range(0..goals.len());
      let mut j = rng.gen_range(0..goals.len() - 1);
      if j >= i {
        j += 1;
      }
      let (pickup, delivery) = (&goals[i], &goals[j]);

      let estimated_duration = match self.estimated_duration(pickup, delivery) {
        Ok(d) => d,
        Err(DatasetError::NoPath { .. }) => {
          trace!(attempt, %pickup, %delivery, "unreachable");
          continue;
        }
        Err(e) => return Err(e),
      };
      trace!(attempt, %pickup, %delivery, estimated_duration);
      if duration_range.contains(estimated_duration) {
        return Ok((pickup.clone(), delivery.clone()));
      }
    }

    Err(self.unsatisfiable(map_sections, duration_range, self.max_attempts))
  }

  fn get_plan(&self, pickup: &Loc, delivery: &Loc) -> Result<Plan> {
    let path = self.planner.get_path(pickup, delivery)?;
    let (mean, variance) = self.planner.get_estimated_duration(&path)?;
    Ok(Plan { path, estimated_duration: conservative_estimate(mean, variance) })
  }
}
