use crate::error::{DatasetError, Result};
use crate::{Loc, Time};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type TaskId = Uuid;

/// A structured record, as written to YAML files.
pub type Record = serde_json::Map<String, Value>;

/// A path between two poses plus a conservative estimate of the time needed to traverse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
  pub path: Vec<Loc>,
  /// Whole seconds
  pub estimated_duration: Time,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, clap::ArgEnum)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
  Task,
  /// Transportation request, identified by `request_id`
  Transportation,
}

impl TaskType {
  pub fn as_str(&self) -> &'static str {
    match self {
      TaskType::Task => "task",
      TaskType::Transportation => "transportation",
    }
  }

  /// Field name holding the identifier in serialised records
  pub fn id_key(&self) -> &'static str {
    match self {
      TaskType::Task => "task_id",
      TaskType::Transportation => "request_id",
    }
  }
}

impl Default for TaskType {
  fn default() -> Self { TaskType::Task }
}

impl fmt::Display for TaskType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TaskType {
  type Err = DatasetError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "task" => Ok(TaskType::Task),
      "transportation" => Ok(TaskType::Transportation),
      other => Err(DatasetError::InvalidConfiguration(format!("unknown task type `{}`", other))),
    }
  }
}

/// A pickup-and-delivery request.  The pickup window is filled in by [`crate::schedule::add_constraints`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
  #[serde(alias = "request_id")]
  pub task_id: TaskId,
  pub pickup_location: Loc,
  pub delivery_location: Loc,
  pub plan: Plan,
  pub earliest_pickup_time: Option<Time>,
  pub latest_pickup_time: Option<Time>,
  #[serde(default = "default_hard_constraints")]
  pub hard_constraints: bool,
  #[serde(default)]
  pub set_number: usize,
}

fn default_hard_constraints() -> bool { true }

impl Task {
  /// Latest time at which the delivery is finished, if the pickup window has been assigned.
  pub fn latest_finish_time(&self) -> Option<Time> {
    self.latest_pickup_time.map(|t| t + self.plan.estimated_duration)
  }

  pub fn clear_constraints(&mut self) {
    self.earliest_pickup_time = None;
    self.latest_pickup_time = None;
  }

  pub fn to_record(&self, task_type: TaskType) -> Record {
    let mut record = match serde_json::to_value(self) {
      Ok(Value::Object(map)) => map,
      _ => unreachable!("tasks always serialise to a map"),
    };
    if task_type.id_key() != "task_id" {
      if let Some(id) = record.remove("task_id") {
        record.insert(task_type.id_key().to_string(), id);
      }
    }
    record
  }

  pub fn from_record(record: Record) -> anyhow::Result<Task> {
    serde_json::from_value(Value::Object(record)).context("malformed task record")
  }

  /// Flattens nested fields using `parent_child` keys, e.g. `plan_estimated_duration`.
  pub fn to_flat_record(&self, task_type: TaskType) -> Record {
    flatten(self.to_record(task_type))
  }

  pub fn from_flat_record(flat: Record) -> anyhow::Result<Task> {
    Task::from_record(unflatten(flat, &["plan"]))
  }
}

/// One level of flattening: nested maps are replaced with `parent_child` entries.  Lists are kept as is.
pub fn flatten(record: Record) -> Record {
  let mut flat = Record::new();
  for (key, value) in record {
    match value {
      Value::Object(children) => {
        for (child, v) in children {
          flat.insert(format!("{}_{}", key, child), v);
        }
      }
      v => { flat.insert(key, v); }
    }
  }
  flat
}

/// Inverse of [`flatten`] for the given parent keys.
pub fn unflatten(flat: Record, parents: &[&str]) -> Record {
  let mut record = Record::new();
  'outer: for (key, value) in flat {
    for parent in parents {
      if let Some(child) = key.strip_prefix(parent).and_then(|s| s.strip_prefix('_')) {
        let entry = record.entry(parent.to_string()).or_insert_with(|| Value::Object(Record::new()));
        if let Value::Object(children) = entry {
          children.insert(child.to_string(), value);
        }
        continue 'outer;
      }
    }
    record.insert(key, value);
  }
  record
}

/// Builds tasks, assigning identifiers.
#[derive(Debug, Clone, Default)]
pub struct TaskCreator {
  pub task_type: TaskType,
  /// Refuse tasks whose pickup and delivery location coincide.
  pub reject_self_loops: bool,
}

impl TaskCreator {
  pub fn new(task_type: TaskType) -> Self {
    TaskCreator { task_type, reject_self_loops: false }
  }

  pub fn create(
    &self,
    pickup_location: Loc,
    delivery_location: Loc,
    plan: Plan,
    set_number: usize,
    task_id: Option<TaskId>,
  ) -> Result<Task> {
    if self.reject_self_loops && pickup_location == delivery_location {
      return Err(DatasetError::InvalidArguments(
        format!("pickup and delivery location are both `{}`", pickup_location)
      ));
    }
    if plan.estimated_duration < 0 {
      return Err(DatasetError::InvalidArguments(
        format!("negative estimated duration {}", plan.estimated_duration)
      ));
    }

    Ok(Task {
      task_id: task_id.unwrap_or_else(Uuid::new_v4),
      pickup_location,
      delivery_location,
      plan,
      earliest_pickup_time: None,
      latest_pickup_time: None,
      hard_constraints: true,
      set_number,
    })
  }
}
