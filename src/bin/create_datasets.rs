use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mrta_datasets::experiment::{create_and_store, Inputs, Params};
use mrta_datasets::{logging, IntervalType};
use std::path::PathBuf;
use tracing::info;

/// Generate one dataset per interval type (tight, loose, random), all sharing the same tasks.
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
  /// Hide the progress bar
  #[clap(long, short = 'q')]
  quiet: bool,
}

fn main() -> Result<()> {
  let args = Args::parse();
  let _g = logging::init_logging(args.log.as_ref(), Some(logging::LOGFILTER_FILE))?;

  let mut params = args.params.resolve()?;
  let mut rng = params.rng();
  let pose_creator = params.pose_creator()?;
  info!(inputs=?args.inputs, params=?params);

  let pb = if args.quiet { ProgressBar::hidden() } else { ProgressBar::new(IntervalType::ALL.len() as u64) };
  pb.set_style(ProgressStyle::default_bar().template("{bar:30} {pos}/{len} {msg}"));

  let mut tasks = None;
  let mut tasks_from: Option<String> = None;
  for &interval_type in IntervalType::ALL.iter() {
    pb.set_message(interval_type.as_str());
    let params = Params { interval_type, tasks_from: tasks_from.clone(), ..params.clone() };
    let (dataset, sampled) = create_and_store(&args.inputs, &params, &pose_creator, tasks.take(), &mut rng)?;
    pb.println(&dataset.meta.dataset_name);
    tasks_from.get_or_insert_with(|| dataset.meta.dataset_name.clone());
    tasks = Some(sampled);
    pb.inc(1);
  }
  pb.finish_and_clear();
  Ok(())
}
