use crate::error::Result;
use crate::interval::Interval;
use crate::pose::PoseProvider;
use crate::task::Task;
use crate::Time;
use tracing::{debug, trace};

/// Earliest pickup of `next`, given that the previous task finishes at `finish_prev` at the latest.
#[inline]
fn forward_step(
  finish_prev: Time,
  prev: &Task,
  next: &Task,
  time_window_interval: &Interval,
  pose_provider: &dyn PoseProvider,
  rng: &mut dyn rand::RngCore,
) -> Result<Time> {
  let travel_time = pose_provider.get_plan(&prev.delivery_location, &next.pickup_location)?.estimated_duration;
  let time_window = time_window_interval.sample(rng);
  trace!(finish_prev, travel_time, time_window);
  Ok(finish_prev + travel_time + time_window)
}

/// Assigns the pickup window of every task in an ordered chain.
///
/// The first task may be picked up from `dataset_start_time`.  Every following task becomes available once
/// the previous one is delivered (picked up at its latest pickup time and travelled for its estimated duration),
/// the robot has driven from that delivery to the new pickup, and a time window interval has passed.  The latest
/// pickup time is the earliest plus a pickup time interval.
///
/// Under `random` intervals every call draws new samples; `tight` and `loose` always give the same result.
#[tracing::instrument(level = "debug", skip(tasks, pose_provider, rng), fields(n_tasks = tasks.len()))]
pub fn add_constraints(
  tasks: &mut [Task],
  pickup_time_interval: &Interval,
  time_window_interval: &Interval,
  dataset_start_time: Time,
  pose_provider: &dyn PoseProvider,
  rng: &mut dyn rand::RngCore,
) -> Result<()> {
  let mut finish_prev = dataset_start_time;
  for k in 0..tasks.len() {
    let earliest = if k == 0 {
      dataset_start_time
    } else {
      let (prev, next) = (&tasks[k - 1], &tasks[k]);
      forward_step(finish_prev, prev, next, time_window_interval, pose_provider, rng)
        .map_err(|e| e.in_set(next.set_number, k))?
    };
    let latest = earliest + pickup_time_interval.sample(rng);

    let task = &mut tasks[k];
    task.earliest_pickup_time = Some(earliest);
    task.latest_pickup_time = Some(latest);
    finish_prev = latest + task.plan.estimated_duration;
    debug!(task_id=%task.task_id, earliest, latest, "pickup window");
  }
  Ok(())
}

/// Checks the pickup windows of a scheduled chain: every window is non-empty and starts no earlier than the
/// latest finish time of its predecessor.
pub fn check_chain(tasks: &[Task]) -> bool {
  let mut finish_prev: Option<Time> = None;
  for t in tasks {
    let (earliest, latest) = match (t.earliest_pickup_time, t.latest_pickup_time) {
      (Some(e), Some(l)) => (e, l),
      _ => return false,
    };
    if latest < earliest {
      return false;
    }
    if let Some(f) = finish_prev {
      if earliest < f {
        trace!(task_id=%t.task_id, earliest, finish_prev=f, "window starts before predecessor finishes");
        return false;
      }
    }
    finish_prev = t.latest_finish_time();
  }
  true
}
