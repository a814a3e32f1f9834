use crate::error::{DatasetError, Result};
use crate::interval::Interval;
use crate::pose::{DurationRange, PoseProvider};
use crate::schedule::add_constraints;
use crate::sets::{partition, section_for_set};
use crate::task::{Record, Task, TaskCreator, TaskId, TaskType};
use crate::tasks::{get_tasks_set, order_by_duration};
use crate::Time;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, info_span};
use uuid::Uuid;

/// Ordered chains of tasks, keyed by set number.
pub type TasksBySet = BTreeMap<usize, Vec<Task>>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetType {
  /// A single chain of tasks
  NonOverlapping,
  /// Several chains starting at the same time
  Overlapping,
}

impl DatasetType {
  pub fn from_n_sets(n_overlapping_sets: usize) -> Result<Self> {
    match n_overlapping_sets {
      0 => Err(DatasetError::InvalidConfiguration("a dataset needs at least one set".into())),
      1 => Ok(DatasetType::NonOverlapping),
      _ => Ok(DatasetType::Overlapping),
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      DatasetType::NonOverlapping => "non_overlapping",
      DatasetType::Overlapping => "overlapping",
    }
  }
}

impl fmt::Display for DatasetType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Dataset-level metadata, written next to the tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMeta {
  pub dataset_id: Uuid,
  pub dataset_name: String,
  pub dataset_type: DatasetType,
  /// Earliest pickup time of the first task of every set
  pub start_time: Time,
  pub pickup_time_interval: Interval,
  pub time_window_interval: Interval,
  pub map_sections: Vec<String>,
  pub task_type: TaskType,
}

impl DatasetMeta {
  pub fn new(
    dataset_name: impl Into<String>,
    dataset_type: DatasetType,
    start_time: Time,
    pickup_time_interval: Interval,
    time_window_interval: Interval,
    map_sections: Vec<String>,
    task_type: TaskType,
  ) -> Self {
    DatasetMeta {
      dataset_id: Uuid::new_v4(),
      dataset_name: dataset_name.into(),
      dataset_type,
      start_time,
      pickup_time_interval,
      time_window_interval,
      map_sections,
      task_type,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
  pub meta: DatasetMeta,
  pub tasks: BTreeMap<TaskId, Task>,
}

impl Dataset {
  pub fn new(meta: DatasetMeta) -> Self {
    Dataset { meta, tasks: BTreeMap::new() }
  }

  /// Adds tasks, refusing duplicate identifiers.
  pub fn merge(&mut self, tasks: impl IntoIterator<Item=Task>) -> Result<()> {
    for task in tasks {
      if self.tasks.contains_key(&task.task_id) {
        return Err(DatasetError::InvalidArguments(format!("duplicate task id {}", task.task_id)));
      }
      self.tasks.insert(task.task_id, task);
    }
    Ok(())
  }

  pub fn len(&self) -> usize { self.tasks.len() }

  pub fn is_empty(&self) -> bool { self.tasks.is_empty() }

  /// Regroups tasks into their sets, each ordered by earliest pickup time (ties keep identifier order).
  pub fn tasks_by_set(&self) -> TasksBySet {
    let mut by_set = TasksBySet::new();
    for task in self.tasks.values() {
      by_set.entry(task.set_number).or_insert_with(Vec::new).push(task.clone());
    }
    for chain in by_set.values_mut() {
      chain.sort_by_key(|t| t.earliest_pickup_time);
    }
    by_set
  }

  /// Metadata fields flattened into the top level, plus a `tasks` map from identifier to task record.
  pub fn to_record(&self) -> Record {
    let mut record = match serde_json::to_value(&self.meta) {
      Ok(Value::Object(map)) => map,
      _ => unreachable!("metadata always serialises to a map"),
    };
    let tasks: Record = self.tasks.iter()
      .map(|(id, task)| (id.to_string(), Value::Object(task.to_record(self.meta.task_type))))
      .collect();
    record.insert("tasks".to_string(), Value::Object(tasks));
    record
  }

  pub fn from_record(mut record: Record) -> anyhow::Result<Self> {
    let tasks = match record.remove("tasks") {
      Some(Value::Object(tasks)) => tasks,
      Some(Value::Null) | None => Record::new(),
      Some(_) => anyhow::bail!("`tasks` must be a map"),
    };
    let meta: DatasetMeta = serde_json::from_value(Value::Object(record)).context("malformed dataset metadata")?;
    let mut dataset = Dataset::new(meta);
    for (key, task) in tasks {
      let task = match task {
        Value::Object(task) => Task::from_record(task).with_context(|| format!("task {}", key))?,
        _ => anyhow::bail!("task {} is not a map", key),
      };
      dataset.merge(std::iter::once(task))?;
    }
    Ok(dataset)
  }
}

/// Builds datasets of one or more chains of tasks.
pub struct DatasetCreator<'a> {
  task_creator: TaskCreator,
  pose_provider: &'a dyn PoseProvider,
  meta: DatasetMeta,
}

impl<'a> DatasetCreator<'a> {
  pub fn new(task_creator: TaskCreator, pose_provider: &'a dyn PoseProvider, meta: DatasetMeta) -> Self {
    DatasetCreator { task_creator, pose_provider, meta }
  }

  pub fn meta(&self) -> &DatasetMeta { &self.meta }

  /// Generates a dataset of `n_tasks` tasks split into `n_overlapping_sets` chains.
  ///
  /// If `tasks` is given, its poses and plans are reused and only the pickup windows are recomputed.  The
  /// returned task sets can be passed to another creator, e.g. one with a different interval type.
  pub fn create(
    &self,
    n_tasks: usize,
    n_overlapping_sets: usize,
    duration_range: &DurationRange,
    tasks: Option<TasksBySet>,
    rng: &mut dyn rand::RngCore,
  ) -> Result<(Dataset, TasksBySet)> {
    let _s = info_span!("create_dataset", dataset=%self.meta.dataset_name, ty=%self.meta.dataset_type).entered();

    let dataset_type = DatasetType::from_n_sets(n_overlapping_sets)?;
    if dataset_type != self.meta.dataset_type {
      return Err(DatasetError::InvalidConfiguration(format!(
        "{} sets make a {} dataset, but the metadata says {}", n_overlapping_sets, dataset_type, self.meta.dataset_type
      )));
    }

    let mut tasks = match tasks {
      Some(tasks) => {
        check_supplied_tasks(&tasks, n_tasks, n_overlapping_sets)?;
        tasks
      }
      None => self.sample_sets(n_tasks, n_overlapping_sets, duration_range, rng)?,
    };

    for chain in tasks.values_mut() {
      add_constraints(
        chain,
        &self.meta.pickup_time_interval,
        &self.meta.time_window_interval,
        self.meta.start_time,
        self.pose_provider,
        rng,
      )?;
    }

    let mut dataset = Dataset::new(self.meta.clone());
    dataset.merge(tasks.values().flatten().cloned())?;
    info!(n_tasks = dataset.len(), n_sets = tasks.len(), "dataset created");
    Ok((dataset, tasks))
  }

  fn sample_sets(
    &self,
    n_tasks: usize,
    n_sets: usize,
    duration_range: &DurationRange,
    rng: &mut dyn rand::RngCore,
  ) -> Result<TasksBySet> {
    if self.meta.map_sections.is_empty() {
      return Err(DatasetError::InvalidConfiguration("no map sections given".into()));
    }

    let mut by_set = TasksBySet::new();
    for (set_number, n) in partition(n_tasks, n_sets)?.into_iter().enumerate() {
      let sections = match self.meta.dataset_type {
        DatasetType::NonOverlapping => self.meta.map_sections.clone(),
        DatasetType::Overlapping => vec![section_for_set(&self.meta.map_sections, set_number)?.clone()],
      };
      let tasks = get_tasks_set(&self.task_creator, self.pose_provider, n, &sections, duration_range, set_number, rng)?;
      by_set.insert(set_number, order_by_duration(tasks));
    }
    Ok(by_set)
  }
}

fn check_supplied_tasks(tasks: &TasksBySet, n_tasks: usize, n_sets: usize) -> Result<()> {
  let total: usize = tasks.values().map(Vec::len).sum();
  if tasks.len() != n_sets || total != n_tasks {
    return Err(DatasetError::InvalidConfiguration(format!(
      "expected {} tasks in {} sets, got {} tasks in {} sets", n_tasks, n_sets, total, tasks.len()
    )));
  }
  for (&set_number, chain) in tasks {
    if let Some(t) = chain.iter().find(|t| t.set_number != set_number) {
      return Err(DatasetError::InvalidArguments(
        format!("task {} is tagged with set {} but listed in set {}", t.task_id, t.set_number, set_number)
      ));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::interval::IntervalType;
  use crate::pose::{Planner, PoseCreator};
  use crate::schedule::check_chain;
  use crate::test::{chained_tasks, line_planner, ConstantPlanner};
  use crate::map::MapGraph;
  use itertools::Itertools;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn meta(dataset_type: DatasetType, ty: IntervalType, sections: &[&str]) -> DatasetMeta {
    DatasetMeta::new(
      "test",
      dataset_type,
      900,
      Interval::new(ty, 30, 60).unwrap(),
      Interval::new(ty, 10, 300).unwrap(),
      sections.iter().map(|s| s.to_string()).collect(),
      TaskType::Task,
    )
  }

  fn campus() -> PoseCreator<MapGraph> {
    PoseCreator::new(MapGraph::load(crate::test::test_data_dir().join("campus.yaml")).unwrap())
  }

  #[test]
  fn non_overlapping_chain() {
    let provider = PoseCreator::new(line_planner(15));
    let creator = DatasetCreator::new(TaskCreator::default(), &provider, meta(DatasetType::NonOverlapping, IntervalType::Random, &["line"]));
    let mut rng = StdRng::seed_from_u64(1);
    let (dataset, tasks) = creator.create(6, 1, &DurationRange::unbounded(), None, &mut rng).unwrap();

    assert_eq!(dataset.len(), 6);
    assert_eq!(tasks.keys().copied().collect::<Vec<_>>(), vec![0]);
    let chain = &tasks[&0];
    assert_eq!(chain[0].earliest_pickup_time, Some(900));
    assert!(chain.iter().tuple_windows().all(|(a, b)| a.plan.estimated_duration <= b.plan.estimated_duration));
    assert!(check_chain(chain));
  }

  #[test]
  fn overlapping_partition() {
    let provider = campus();
    let creator = DatasetCreator::new(
      TaskCreator::default(), &provider, meta(DatasetType::Overlapping, IntervalType::Tight, &["square", "street", "faraway"]),
    );
    let mut rng = StdRng::seed_from_u64(2);
    let (dataset, tasks) = creator.create(10, 3, &DurationRange::unbounded(), None, &mut rng).unwrap();

    assert_eq!(tasks.values().map(Vec::len).collect::<Vec<_>>(), vec![3, 3, 4]);
    assert_eq!(dataset.len(), 10);
    for chain in tasks.values() {
      assert_eq!(chain[0].earliest_pickup_time, Some(900));
      assert!(chain.iter().tuple_windows().all(|(a, b)| a.plan.estimated_duration <= b.plan.estimated_duration));
      assert!(check_chain(chain));
    }
  }

  #[test]
  fn non_overlapping_tight_timestamps() {
    // each task delivers where the next one is picked up, every plan takes 50s
    let provider = PoseCreator::new(ConstantPlanner::new(&["A", "B", "C", "D"], 50));
    let creator = DatasetCreator::new(TaskCreator::default(), &provider, meta(DatasetType::NonOverlapping, IntervalType::Tight, &["x"]));
    let mut chain = TasksBySet::new();
    chain.insert(0, chained_tasks(&["A", "B", "C", "D"], 50, 0));
    let mut rng = StdRng::seed_from_u64(0);
    let (dataset, tasks) = creator.create(3, 1, &DurationRange::unbounded(), Some(chain), &mut rng).unwrap();

    let times: Vec<_> = tasks[&0].iter()
      .map(|t| (t.earliest_pickup_time.unwrap(), t.latest_pickup_time.unwrap()))
      .collect();
    assert_eq!(times, vec![(900, 930), (990, 1020), (1080, 1110)]);
    assert_eq!(dataset.tasks_by_set(), tasks);
  }

  #[test]
  fn empty_non_overlapping_dataset() {
    let provider = PoseCreator::new(ConstantPlanner::new(&["a", "b"], 10));
    let creator = DatasetCreator::new(TaskCreator::default(), &provider, meta(DatasetType::NonOverlapping, IntervalType::Tight, &["x"]));
    let mut rng = StdRng::seed_from_u64(0);
    let (dataset, tasks) = creator.create(0, 1, &DurationRange::unbounded(), None, &mut rng).unwrap();
    assert!(dataset.is_empty());
    assert_eq!(tasks[&0].len(), 0);
  }

  #[test]
  fn sets_draw_from_their_section() {
    let provider = campus();
    let sections = ["square", "street"];
    let creator = DatasetCreator::new(TaskCreator::default(), &provider, meta(DatasetType::Overlapping, IntervalType::Loose, &sections));
    let mut rng = StdRng::seed_from_u64(3);
    let (_, tasks) = creator.create(9, 3, &DurationRange::unbounded(), None, &mut rng).unwrap();

    for (&set_number, chain) in &tasks {
      let goals = provider.planner().goals(&[sections[set_number % 2].to_string()]).unwrap();
      for t in chain {
        assert_eq!(t.set_number, set_number);
        assert!(goals.contains(&t.pickup_location));
        assert!(goals.contains(&t.delivery_location));
      }
    }
  }

  #[test]
  fn reuse_tasks_with_other_interval() {
    let provider = campus();
    let mut rng = StdRng::seed_from_u64(4);
    let tight = DatasetCreator::new(TaskCreator::default(), &provider, meta(DatasetType::Overlapping, IntervalType::Tight, &["square", "street"]));
    let (_, tasks) = tight.create(6, 2, &DurationRange::unbounded(), None, &mut rng).unwrap();

    let loose = DatasetCreator::new(TaskCreator::default(), &provider, meta(DatasetType::Overlapping, IntervalType::Loose, &["square", "street"]));
    let (dataset, loose_tasks) = loose.create(6, 2, &DurationRange::unbounded(), Some(tasks.clone()), &mut rng).unwrap();

    for (a, b) in tasks.values().flatten().zip(loose_tasks.values().flatten()) {
      assert_eq!(a.task_id, b.task_id);
      assert_eq!(a.plan, b.plan);
      assert_eq!(b.latest_pickup_time.unwrap() - b.earliest_pickup_time.unwrap(), 60);
    }
    assert_eq!(dataset.len(), 6);
  }

  #[test]
  fn supplied_tasks_must_match() {
    let provider = campus();
    let mut rng = StdRng::seed_from_u64(4);
    let creator = DatasetCreator::new(TaskCreator::default(), &provider, meta(DatasetType::Overlapping, IntervalType::Tight, &["square"]));
    let (_, tasks) = creator.create(4, 2, &DurationRange::unbounded(), None, &mut rng).unwrap();
    let err = creator.create(5, 2, &DurationRange::unbounded(), Some(tasks), &mut rng).unwrap_err();
    assert!(matches!(err, DatasetError::InvalidConfiguration(_)));
  }

  #[test]
  fn type_must_match_set_count() {
    let provider = PoseCreator::new(ConstantPlanner::new(&["a", "b"], 10));
    let creator = DatasetCreator::new(TaskCreator::default(), &provider, meta(DatasetType::NonOverlapping, IntervalType::Tight, &["x"]));
    let mut rng = StdRng::seed_from_u64(0);
    assert!(creator.create(4, 2, &DurationRange::unbounded(), None, &mut rng).is_err());
    assert!(creator.create(4, 0, &DurationRange::unbounded(), None, &mut rng).is_err());
  }

  #[test]
  fn no_partial_dataset_on_failure() {
    let provider = PoseCreator::new(ConstantPlanner::new(&["a", "b"], 10)).with_max_attempts(3);
    let creator = DatasetCreator::new(TaskCreator::default(), &provider, meta(DatasetType::Overlapping, IntervalType::Tight, &["x"]));
    let mut rng = StdRng::seed_from_u64(0);
    let err = creator.create(4, 2, &DurationRange::new(20, 30).unwrap(), None, &mut rng).unwrap_err();
    assert!(matches!(err, DatasetError::InSet { set_number: 0, task_index: 0, .. }));
    assert!(matches!(err.root(), DatasetError::UnsatisfiablePoseConstraint { .. }));
  }

  #[test]
  fn record_round_trip() {
    let provider = campus();
    let mut rng = StdRng::seed_from_u64(9);
    let mut meta = meta(DatasetType::Overlapping, IntervalType::Random, &["square", "faraway"]);
    meta.task_type = TaskType::Transportation;
    let creator = DatasetCreator::new(TaskCreator::new(TaskType::Transportation), &provider, meta);
    let (dataset, _) = creator.create(5, 2, &DurationRange::unbounded(), None, &mut rng).unwrap();

    let record = dataset.to_record();
    assert_eq!(record["dataset_type"], Value::from("overlapping"));
    assert_eq!(record["pickup_time_interval"]["interval_type"], Value::from("random"));
    let first = record["tasks"].as_object().unwrap().values().next().unwrap();
    assert!(first.get("request_id").is_some());

    assert_eq!(Dataset::from_record(record).unwrap(), dataset);
  }

  #[test]
  fn regroup_by_set() {
    let provider = campus();
    let mut rng = StdRng::seed_from_u64(10);
    let creator = DatasetCreator::new(TaskCreator::default(), &provider, meta(DatasetType::Overlapping, IntervalType::Random, &["square", "street"]));
    let (dataset, tasks) = creator.create(7, 2, &DurationRange::unbounded(), None, &mut rng).unwrap();
    let regrouped = dataset.tasks_by_set();
    for (set_number, chain) in &tasks {
      let ids: Vec<_> = chain.iter().map(|t| t.task_id).collect();
      let got: Vec<_> = regrouped[set_number].iter().map(|t| t.task_id).collect();
      assert_eq!(ids, got);
    }
  }
}
