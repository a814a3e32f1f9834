use crate::dataset::Dataset;
use crate::interval::IntervalType;
use crate::task::Record;
use crate::utils::IoContext;
use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

lazy_static! {
  static ref ID_SUFFIX: Regex = Regex::new(r"_(\d+)$").unwrap();
}

fn create_parent_dir(path: &Path) -> Result<()> {
  if let Some(dir) = path.parent() {
    if !dir.as_os_str().is_empty() {
      std::fs::create_dir_all(dir).write_context(dir)?;
    }
  }
  Ok(())
}

pub fn dataset_path(out_dir: impl AsRef<Path>, dataset_name: &str, extension: &str) -> PathBuf {
  let mut p = out_dir.as_ref().join(dataset_name);
  p.set_extension(extension);
  p
}

#[tracing::instrument(level = "debug", skip(dataset, path), fields(dataset = %dataset.meta.dataset_name))]
pub fn store_as_yaml(dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
  let path = path.as_ref();
  create_parent_dir(path)?;
  let file = std::fs::File::create(path).write_context(path)?;
  serde_yaml::to_writer(std::io::BufWriter::new(file), &Value::Object(dataset.to_record())).write_context(path)?;
  info!(path=?path, n_tasks=dataset.len(), "wrote dataset");
  Ok(())
}

pub fn load_yaml_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
  let path = path.as_ref();
  let file = std::fs::File::open(path).read_context(path)?;
  let value: Value = serde_yaml::from_reader(std::io::BufReader::new(file)).read_context(path)?;
  let record = match value {
    Value::Object(record) => record,
    _ => anyhow::bail!("{:?} does not contain a dataset", path),
  };
  let dataset = Dataset::from_record(record).with_context(|| format!("failed to read {:?}", path))?;
  debug!(path=?path, n_tasks=dataset.len(), "loaded dataset");
  Ok(dataset)
}

fn csv_field(value: &Value) -> String {
  let raw = match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    other => other.to_string(),
  };
  if raw.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
    format!("\"{}\"", raw.replace('"', "\"\""))
  } else {
    raw
  }
}

/// Comma-separated rows, header taken from the keys of the first record.
pub fn to_csv(records: &[Record]) -> String {
  let mut out = String::new();
  let header: Vec<&String> = match records.first() {
    Some(r) => r.keys().collect(),
    None => return out,
  };

  let line = |fields: Vec<String>| fields.join(",");
  let _ = writeln!(out, "{}", line(header.iter().map(|k| csv_field(&Value::String(k.to_string()))).collect()));
  for r in records {
    let row = header.iter().map(|&k| r.get(k).map(csv_field).unwrap_or_default()).collect();
    let _ = writeln!(out, "{}", line(row));
  }
  out
}

/// One flat row per task, ordered by task identifier.
#[tracing::instrument(level = "debug", skip(dataset, path), fields(dataset = %dataset.meta.dataset_name))]
pub fn store_as_csv(dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
  let path = path.as_ref();
  let rows: Vec<Record> = dataset.tasks.values()
    .map(|t| t.to_flat_record(dataset.meta.task_type))
    .collect();
  create_parent_dir(path)?;
  std::fs::write(path, to_csv(&rows)).write_context(path)?;
  info!(path=?path, n_rows=rows.len(), "wrote csv");
  Ok(())
}

pub fn dataset_name_prefix(n_tasks: usize, n_overlapping_sets: usize, interval_type: IntervalType) -> String {
  if n_overlapping_sets > 1 {
    format!("overlapping_{}_{}_{}", interval_type, n_tasks, n_overlapping_sets)
  } else {
    format!("nonoverlapping_{}_{}", interval_type, n_tasks)
  }
}

/// Next free dataset name in `out_dir`: the prefix plus one more than the largest id already used by a file with
/// the same prefix (any extension).
pub fn get_dataset_name(
  out_dir: impl AsRef<Path>,
  n_tasks: usize,
  n_overlapping_sets: usize,
  interval_type: IntervalType,
) -> Result<String> {
  let prefix = dataset_name_prefix(n_tasks, n_overlapping_sets, interval_type);
  let pattern = out_dir.as_ref().join(format!("{}_*", prefix));
  let pattern = pattern.to_str().ok_or_else(|| anyhow::anyhow!("non-UTF8 path: {:?}", out_dir.as_ref()))?;

  let mut largest = 0u64;
  for entry in glob::glob(pattern)? {
    let path = entry?;
    let stem = match path.file_stem().and_then(|s| s.to_str()) {
      Some(s) => s,
      None => continue,
    };
    let id = match ID_SUFFIX.captures(stem) {
      Some(c) if stem.len() == prefix.len() + c[0].len() => c[1].parse::<u64>()?,
      _ => continue,
    };
    largest = largest.max(id);
  }
  Ok(format!("{}_{}", prefix, largest + 1))
}
