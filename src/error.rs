use thiserror::Error;
use crate::{DurationRange, Loc};

pub type Result<T> = std::result::Result<T, DatasetError>;

/// Failures raised while generating a dataset.  All of them abort the current generation call.
#[derive(Debug, Error)]
pub enum DatasetError {
  /// Unknown interval type, inverted or negative bounds, or an impossible set layout.
  #[error("invalid configuration: {0}")]
  InvalidConfiguration(String),

  #[error("no pose pair in sections {sections:?} has an estimated duration in {duration_range} (gave up after {attempts} attempts)")]
  UnsatisfiablePoseConstraint {
    sections: Vec<String>,
    duration_range: DurationRange,
    attempts: usize,
  },

  #[error("invalid task arguments: {0}")]
  InvalidArguments(String),

  #[error("unknown pose `{0}`")]
  UnknownPose(Loc),

  #[error("no path from `{from}` to `{to}`")]
  NoPath { from: Loc, to: Loc },

  #[error("set {set_number}, task {task_index}: {source}")]
  InSet {
    set_number: usize,
    task_index: usize,
    #[source]
    source: Box<DatasetError>,
  },
}

impl DatasetError {
  pub fn in_set(self, set_number: usize, task_index: usize) -> Self {
    DatasetError::InSet { set_number, task_index, source: Box::new(self) }
  }

  /// The innermost error, skipping any set/task context.
  pub fn root(&self) -> &DatasetError {
    match self {
      DatasetError::InSet { source, .. } => source.root(),
      err => err,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn context_is_reported() {
    let err = DatasetError::InvalidArguments("pickup equals delivery".into()).in_set(2, 5);
    assert_eq!(err.to_string(), "set 2, task 5: invalid task arguments: pickup equals delivery");
    assert!(matches!(err.root(), DatasetError::InvalidArguments(_)));
  }
}
