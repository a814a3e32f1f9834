use anyhow::Result;
use clap::Parser;
use mrta_datasets::io::{dataset_path, load_yaml_dataset, store_as_csv, store_as_yaml};
use mrta_datasets::{logging, transform, Time};
use std::path::PathBuf;

/// Shift the pickup windows of every task in a dataset.
#[derive(Parser, Debug)]
#[clap(version = env!("COMMIT_HASH"))]
struct Args {
  /// Dataset file (YAML)
  dataset: PathBuf,
  /// Seconds to shift by; negative values move the dataset earlier
  #[clap(allow_hyphen_values = true)]
  secs: Time,
  /// Name of the new dataset.  Defaults to the old name with a `_p<secs>` suffix.
  #[clap(long)]
  name: Option<String>,
  /// Output directory.  Defaults to the directory of the input dataset.
  #[clap(long, short = 'o')]
  out_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
  let Args { dataset: path, secs, name, out_dir } = Args::parse();
  let _g = logging::init_logging(None::<&str>, Some(logging::LOGFILTER_FILE))?;

  let mut dataset = load_yaml_dataset(&path)?;
  transform::postpone(&mut dataset, secs);
  dataset.meta.dataset_name = name.unwrap_or_else(|| format!("{}_p{}", dataset.meta.dataset_name, secs));
  dataset.meta.dataset_id = uuid::Uuid::new_v4();

  let out_dir = out_dir
    .or_else(|| path.parent().map(|p| p.to_path_buf()))
    .unwrap_or_default();
  store_as_yaml(&dataset, dataset_path(&out_dir, &dataset.meta.dataset_name, "yaml"))?;
  store_as_csv(&dataset, dataset_path(&out_dir, &dataset.meta.dataset_name, "csv"))?;
  println!("{}", dataset.meta.dataset_name);
  Ok(())
}
