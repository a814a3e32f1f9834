use crate::dataset::{Dataset, DatasetCreator, DatasetMeta, DatasetType, TasksBySet};
use crate::error::DatasetError;
use crate::interval::{Interval, IntervalType};
use crate::io::{dataset_path, get_dataset_name, store_as_csv, store_as_yaml};
use crate::map::MapGraph;
use crate::pose::{DurationRange, PoseCreator, DEFAULT_MAX_POSE_ATTEMPTS};
use crate::task::{TaskCreator, TaskType};
use crate::utils::{read_json, write_json};
use crate::Time;
use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct Inputs {
  /// Total number of tasks
  pub n_tasks: usize,
  /// Number of chains starting at the same time.  1 gives a non-overlapping dataset.
  #[clap(default_value = "1")]
  pub n_overlapping_sets: usize,
}

fn cl_parse_bounds(s: &str) -> Result<(Time, Time)> {
  let mut tok = s.split(',');
  let ctx_msg = || format!("unable to parse string `{}`, expected `integer,integer`", s);
  let err = || anyhow::Error::msg(ctx_msg());

  let a: Time = tok.next().ok_or_else(err)?.trim().parse().with_context(ctx_msg)?;
  let b: Time = tok.next().ok_or_else(err)?.trim().parse().with_context(ctx_msg)?;
  if tok.next().is_some() {
    Err(err())
  } else {
    Ok((a, b))
  }
}

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct Params {
  /// How pickup time and time window intervals are drawn from their bounds
  #[clap(long, short = 'i', default_value = "random", arg_enum)]
  pub interval_type: IntervalType,

  /// Bounds on the gap between the earliest and latest pickup time of a task, in seconds
  #[clap(long, default_value = "60,120", value_name = "LB,UB", parse(try_from_str = cl_parse_bounds))]
  pub pickup_time_bounds: (Time, Time),

  /// Bounds on the idle time between the latest finish time of a task and the earliest pickup of the next one,
  /// in seconds
  #[clap(long, default_value = "60,180", value_name = "LB,UB", parse(try_from_str = cl_parse_bounds))]
  pub time_window_bounds: (Time, Time),

  /// Earliest pickup time of the first task of every set
  #[clap(long, default_value = "0", value_name = "seconds")]
  pub start_time: Time,

  /// Map file (YAML)
  #[clap(long)]
  pub map: Option<PathBuf>,

  /// Comma-separated list of map sections to draw poses from.  Sets of an overlapping dataset cycle through them.
  #[clap(long, use_value_delimiter(true), require_value_delimiter(true))]
  pub map_sections: Vec<String>,

  /// Only use pickup/delivery pairs whose estimated duration lies in this range (inclusive)
  #[clap(long, value_name = "MIN,MAX", parse(try_from_str = cl_parse_bounds))]
  pub duration_range: Option<(Time, Time)>,

  /// RNG seed.  Drawn from entropy if not given, and recorded in the parameter file.
  #[clap(long)]
  pub seed: Option<u64>,

  #[clap(long, default_value = "task", arg_enum)]
  pub task_type: TaskType,

  /// Give up on a pose pair after this many draws
  #[clap(long, default_value = "1000")]
  pub max_pose_attempts: usize,

  /// Refuse tasks whose pickup and delivery pose coincide
  #[clap(long)]
  pub reject_self_loops: bool,

  #[clap(long, short = 'o', default_value = "datasets")]
  pub out_dir: PathBuf,

  /// Read parameters from a JSON file (as written next to every dataset) instead of the command line
  #[clap(long, value_name = "FILE")]
  #[serde(skip)]
  pub params_file: Option<PathBuf>,

  /// Dataset whose tasks were reused; only the pickup windows of this run were drawn from `seed`
  #[clap(skip)]
  #[serde(default)]
  pub tasks_from: Option<String>,
}

impl Default for Params {
  fn default() -> Self {
    Params {
      interval_type: IntervalType::Random,
      pickup_time_bounds: (60, 120),
      time_window_bounds: (60, 180),
      start_time: 0,
      map: None,
      map_sections: Vec::new(),
      duration_range: None,
      seed: None,
      task_type: TaskType::Task,
      max_pose_attempts: DEFAULT_MAX_POSE_ATTEMPTS,
      reject_self_loops: false,
      out_dir: "datasets".into(),
      params_file: None,
      tasks_from: None,
    }
  }
}

#[derive(Serialize)]
struct ParameterFile<'a> {
  commit: &'a str,
  #[serde(flatten)]
  params: &'a Params,
}

impl Params {
  /// Replaces the command-line parameters with the contents of `--params-file`, if given, then checks them.
  pub fn resolve(self) -> Result<Params> {
    let params = match &self.params_file {
      Some(p) => {
        info!(path=?p, "reading parameter file");
        let mut params: Params = read_json(p)?;
        params.params_file = self.params_file.clone();
        params
      }
      None => self,
    };
    params.validate()?;
    Ok(params)
  }

  fn validate(&self) -> std::result::Result<(), DatasetError> {
    if self.map.is_none() {
      return Err(DatasetError::InvalidConfiguration("no map file given (--map)".into()));
    }
    if self.map_sections.is_empty() {
      return Err(DatasetError::InvalidConfiguration("no map sections given (--map-sections)".into()));
    }
    if self.max_pose_attempts == 0 {
      return Err(DatasetError::InvalidConfiguration("--max-pose-attempts must be positive".into()));
    }
    self.pickup_time_interval()?;
    self.time_window_interval()?;
    self.duration_range()?;
    Ok(())
  }

  pub fn pickup_time_interval(&self) -> std::result::Result<Interval, DatasetError> {
    Interval::new(self.interval_type, self.pickup_time_bounds.0, self.pickup_time_bounds.1)
  }

  pub fn time_window_interval(&self) -> std::result::Result<Interval, DatasetError> {
    Interval::new(self.interval_type, self.time_window_bounds.0, self.time_window_bounds.1)
  }

  pub fn duration_range(&self) -> std::result::Result<DurationRange, DatasetError> {
    match self.duration_range {
      Some((min, max)) => DurationRange::new(min, max),
      None => Ok(DurationRange::unbounded()),
    }
  }

  /// Seeded RNG.  If no seed was given one is drawn and stored in the parameter file.  A run that samples its own
  /// tasks can be replayed from that file; a run with `tasks_from` set also needs the tasks of that dataset.
  pub fn rng(&mut self) -> StdRng {
    let seed = *self.seed.get_or_insert_with(rand::random);
    StdRng::seed_from_u64(seed)
  }

  pub fn task_creator(&self) -> TaskCreator {
    TaskCreator { task_type: self.task_type, reject_self_loops: self.reject_self_loops }
  }

  pub fn pose_creator(&self) -> Result<PoseCreator<MapGraph>> {
    let map = self.map.as_ref().context("no map file given (--map)")?;
    let graph = MapGraph::load(map)?;
    Ok(PoseCreator::new(graph).with_max_attempts(self.max_pose_attempts))
  }

  pub fn write_parameter_file(&self, path: impl AsRef<Path>) -> Result<()> {
    write_json(&ParameterFile { commit: env!("COMMIT_HASH"), params: self }, path)
  }
}

/// Generates one dataset and writes `<out_dir>/<name>.yaml`, `.csv` and `.params.json`.
///
/// `tasks` may hold the task sets returned by an earlier call, in which case only the pickup windows are recomputed.
pub fn create_and_store(
  inputs: &Inputs,
  params: &Params,
  pose_creator: &PoseCreator<MapGraph>,
  tasks: Option<TasksBySet>,
  rng: &mut StdRng,
) -> Result<(Dataset, TasksBySet)> {
  let dataset_type = DatasetType::from_n_sets(inputs.n_overlapping_sets)?;
  let name = get_dataset_name(&params.out_dir, inputs.n_tasks, inputs.n_overlapping_sets, params.interval_type)?;
  let meta = DatasetMeta::new(
    name.clone(),
    dataset_type,
    params.start_time,
    params.pickup_time_interval()?,
    params.time_window_interval()?,
    params.map_sections.clone(),
    params.task_type,
  );

  let creator = DatasetCreator::new(params.task_creator(), pose_creator, meta);
  let (dataset, tasks) = creator
    .create(inputs.n_tasks, inputs.n_overlapping_sets, &params.duration_range()?, tasks, rng)
    .with_context(|| format!("failed to create dataset {}", name))?;

  store_as_yaml(&dataset, dataset_path(&params.out_dir, &name, "yaml"))?;
  store_as_csv(&dataset, dataset_path(&params.out_dir, &name, "csv"))?;
  params.write_parameter_file(dataset_path(&params.out_dir, &name, "params.json"))?;
  Ok((dataset, tasks))
}
