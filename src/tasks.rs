use crate::error::Result;
use crate::pose::{DurationRange, PoseProvider};
use crate::task::{Task, TaskCreator};
use tracing::{debug, debug_span};

/// Draws `n` tasks for one set.  Poses are restricted to `map_sections` and to pickup/delivery pairs whose
/// estimated duration lies in `duration_range`.  The tasks have no pickup window yet.
#[tracing::instrument(level = "debug", skip(task_creator, pose_provider, rng))]
pub fn get_tasks_set(
  task_creator: &TaskCreator,
  pose_provider: &dyn PoseProvider,
  n: usize,
  map_sections: &[String],
  duration_range: &DurationRange,
  set_number: usize,
  rng: &mut dyn rand::RngCore,
) -> Result<Vec<Task>> {
  let mut tasks = Vec::with_capacity(n);

  for task_index in 0..n {
    let _s = debug_span!("task", task_index).entered();
    let in_set = |e: crate::DatasetError| e.in_set(set_number, task_index);

    let (pickup, delivery) = pose_provider.get_poses(map_sections, duration_range, rng).map_err(in_set)?;
    let plan = pose_provider.get_plan(&pickup, &delivery).map_err(in_set)?;
    let task = task_creator.create(pickup, delivery, plan, set_number, None).map_err(in_set)?;

    debug!(
      task_id=%task.task_id,
      pickup=%task.pickup_location,
      delivery=%task.delivery_location,
      estimated_duration=task.plan.estimated_duration
    );
    tasks.push(task);
  }

  Ok(tasks)
}

/// Stable sort by estimated duration, shortest first.
pub fn order_by_duration(mut tasks: Vec<Task>) -> Vec<Task> {
  tasks.sort_by_key(|t| t.plan.estimated_duration);
  tasks
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pose::PoseCreator;
  use crate::test::{chained_tasks, line_planner, ConstantPlanner};
  use crate::{DatasetError, TaskType};
  use itertools::Itertools;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  #[test]
  fn builds_n_tasks() {
    let provider = PoseCreator::new(line_planner(10));
    let creator = TaskCreator::new(TaskType::Task);
    let mut rng = StdRng::seed_from_u64(7);
    let range = DurationRange::new(10, 30).unwrap();
    let tasks = get_tasks_set(&creator, &provider, 8, &["line".to_string()], &range, 4, &mut rng).unwrap();

    assert_eq!(tasks.len(), 8);
    for t in &tasks {
      assert_eq!(t.set_number, 4);
      assert!(range.contains(t.plan.estimated_duration));
      assert_eq!(t.earliest_pickup_time, None);
      assert_eq!(t.latest_pickup_time, None);
      assert_eq!(t.plan.path.first(), Some(&t.pickup_location));
      assert_eq!(t.plan.path.last(), Some(&t.delivery_location));
    }
    assert!(tasks.iter().map(|t| t.task_id).all_unique());
  }

  #[test]
  fn reports_set_and_index() {
    let provider = PoseCreator::new(ConstantPlanner::new(&["a", "b"], 50)).with_max_attempts(5);
    let creator = TaskCreator::new(TaskType::Task);
    let mut rng = StdRng::seed_from_u64(0);
    let range = DurationRange::new(0, 10).unwrap();
    let err = get_tasks_set(&creator, &provider, 3, &["any".to_string()], &range, 2, &mut rng).unwrap_err();
    match err {
      DatasetError::InSet { set_number, task_index, source } => {
        assert_eq!((set_number, task_index), (2, 0));
        assert!(matches!(*source, DatasetError::UnsatisfiablePoseConstraint { .. }));
      }
      other => panic!("unexpected error {:?}", other),
    }
  }

  #[test]
  fn ordering_is_stable() {
    let mut tasks = chained_tasks(&["a", "b", "c", "d", "e", "f"], 0, 0);
    let durations = [30, 10, 20, 10, 30];
    for (t, &d) in tasks.iter_mut().zip(durations.iter()) {
      t.plan.estimated_duration = d;
    }
    let ids: Vec<_> = tasks.iter().map(|t| t.task_id).collect();

    let ordered = order_by_duration(tasks);
    let got: Vec<_> = ordered.iter().map(|t| t.task_id).collect();
    assert_eq!(got, vec![ids[1], ids[3], ids[2], ids[0], ids[4]]);
    assert!(ordered.iter().tuple_windows().all(|(a, b)| a.plan.estimated_duration <= b.plan.estimated_duration));
  }
}
