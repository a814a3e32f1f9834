use anyhow::Result;
use clap::Parser;
use mrta_datasets::experiment::{create_and_store, Inputs, Params};
use mrta_datasets::logging;
use std::path::PathBuf;
use tracing::info;

/// Generate a transportation task dataset and write it as YAML and CSV.
#[derive(Parser, Debug)]
#[clap(version = env!("COMMIT_HASH"))]
struct Args {
  #[clap(flatten)]
  inputs: Inputs,
  #[clap(flatten)]
  params: Params,
  /// Write a JSON trace log to this file
  #[clap(long, value_name = "FILE")]
  log: Option<PathBuf>,
}

fn main() -> Result<()> {
  let args = Args::parse();
  let _g = logging::init_logging(args.log.as_ref(), Some(logging::LOGFILTER_FILE))?;

  let mut params = args.params.resolve()?;
  let mut rng = params.rng();
  info!(inputs=?args.inputs, params=?params);

  let pose_creator = params.pose_creator()?;
  let (dataset, _) = create_and_store(&args.inputs, &params, &pose_creator, None, &mut rng)?;
  println!("{}", dataset.meta.dataset_name);
  Ok(())
}
