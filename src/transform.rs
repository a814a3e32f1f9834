use crate::dataset::Dataset;
use crate::Time;
use tracing::info;

/// Shifts every pickup window by `secs` seconds (negative values move it earlier).  Unscheduled tasks are left alone.
pub fn postpone(dataset: &mut Dataset, secs: Time) {
  for task in dataset.tasks.values_mut() {
    task.earliest_pickup_time = task.earliest_pickup_time.map(|t| t + secs);
    task.latest_pickup_time = task.latest_pickup_time.map(|t| t + secs);
  }
  dataset.meta.start_time += secs;
  info!(secs, dataset=%dataset.meta.dataset_name, "postponed");
}

/// Keeps the first `n_per_set` tasks of every set, by earliest pickup time.
pub fn split(dataset: &Dataset, n_per_set: usize, dataset_name: impl Into<String>) -> Dataset {
  let mut meta = dataset.meta.clone();
  meta.dataset_name = dataset_name.into();
  meta.dataset_id = uuid::Uuid::new_v4();

  let mut new = Dataset::new(meta);
  for (_, chain) in dataset.tasks_by_set() {
    for task in chain.into_iter().take(n_per_set) {
      new.tasks.insert(task.task_id, task);
    }
  }
  info!(n_per_set, n_tasks=new.len(), dataset=%new.meta.dataset_name, "split");
  new
}
