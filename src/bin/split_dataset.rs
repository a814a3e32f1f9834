use anyhow::Result;
use clap::Parser;
use mrta_datasets::io::{dataset_path, load_yaml_dataset, store_as_csv, store_as_yaml};
use mrta_datasets::{logging, transform};
use std::path::PathBuf;

/// Build a smaller dataset from the first N tasks (by earliest pickup time) of every set.
#[derive(Parser, Debug)]
#[clap(version = env!("COMMIT_HASH"))]
struct Args {
  /// Dataset file (YAML)
  dataset: PathBuf,
  /// Name of the new dataset
  new_name: String,
  /// Number of tasks to keep in each set
  n_tasks_per_set: usize,
  /// Output directory.  Defaults to the directory of the input dataset.
  #[clap(long, short = 'o')]
  out_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
  let Args { dataset: path, new_name, n_tasks_per_set, out_dir } = Args::parse();
  let _g = logging::init_logging(None::<&str>, Some(logging::LOGFILTER_FILE))?;

  let dataset = load_yaml_dataset(&path)?;
  let split = transform::split(&dataset, n_tasks_per_set, new_name);

  let out_dir = out_dir
    .or_else(|| path.parent().map(|p| p.to_path_buf()))
    .unwrap_or_default();
  store_as_yaml(&split, dataset_path(&out_dir, &split.meta.dataset_name, "yaml"))?;
  store_as_csv(&split, dataset_path(&out_dir, &split.meta.dataset_name, "csv"))?;
  println!("{}", split.meta.dataset_name);
  Ok(())
}
