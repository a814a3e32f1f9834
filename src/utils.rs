use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Attach the offending file path to I/O and parsing errors.
pub trait IoContext<T> {
  fn read_context(self, path: impl AsRef<Path>) -> anyhow::Result<T>;

  fn write_context(self, path: impl AsRef<Path>) -> anyhow::Result<T>;
}

impl<T, E> IoContext<T> for std::result::Result<T, E>
  where
    E: std::error::Error + Send + Sync + 'static,
{
  fn read_context(self, path: impl AsRef<Path>) -> anyhow::Result<T> {
    self.with_context(|| format!("failed to read {:?}", path.as_ref()))
  }

  fn write_context(self, path: impl AsRef<Path>) -> anyhow::Result<T> {
    self.with_context(|| format!("failed to write {:?}", path.as_ref()))
  }
}

pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
  let path = path.as_ref();
  let file = std::fs::File::open(path).read_context(path)?;
  serde_json::from_reader(std::io::BufReader::new(file)).read_context(path)
}

pub fn write_json(value: &impl Serialize, path: impl AsRef<Path>) -> anyhow::Result<()> {
  let path = path.as_ref();
  let file = std::fs::File::create(path).write_context(path)?;
  serde_json::to_writer_pretty(std::io::BufWriter::new(file), value).write_context(path)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("values.json");
    write_json(&vec![1, 2, 3], &path).unwrap();
    let values: Vec<u32> = read_json(&path).unwrap();
    assert_eq!(values, vec![1, 2, 3]);
  }

  #[test]
  fn missing_file_names_path() {
    let err = read_json::<Vec<u32>>("/definitely/not/here.json").unwrap_err();
    assert!(format!("{:#}", err).contains("not/here.json"));
  }
}
