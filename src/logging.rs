use std::fs::OpenOptions;
use std::path::Path;
use tracing::{info, warn};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

/// Default name of the log-filter file looked up by the binaries.
pub const LOGFILTER_FILE: &str = "datasets.logfilter";

/// Reads a filter file: one directive per line, `#` starts a comment line.
fn read_filter_file(path: &Path) -> Option<String> {
  let contents = std::fs::read_to_string(path).ok()?;
  let directives: Vec<_> = contents.lines()
    .map(str::trim)
    .filter(|s| !s.is_empty() && !s.starts_with('#'))
    .collect();
  Some(directives.join(","))
}

fn build_and_set_global_subscriber(
  logfile: Option<&Path>,
  logfilter_file: Option<&Path>,
  is_test: bool,
) -> anyhow::Result<Option<WorkerGuard>> {
  let filter_from_file = logfilter_file.and_then(read_filter_file);
  let using_filter_file = filter_from_file.is_some();

  let stderr_log = fmt::layer().with_target(false).without_time().with_writer(std::io::stderr);
  let env_filter = filter_from_file.map(EnvFilter::new).unwrap_or_else(EnvFilter::from_default_env);
  let r = registry().with(stderr_log).with(env_filter);

  let flush_guard = match logfile {
    Some(p) => {
      let logfile = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(p)
        .map_err(|e| anyhow::anyhow!("unable to open log file {:?}: {}", p, e))?;
      let (writer, guard) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(logfile);
      let json = fmt::layer()
        .json()
        .with_span_list(true)
        .with_current_span(false)
        .with_writer(writer);

      let r = r.with(json);
      if is_test { r.try_init().ok(); } else { r.try_init()?; }
      Some(guard)
    }
    None => {
      if is_test { r.try_init().ok(); } else { r.try_init()?; }
      None
    }
  };

  if let Some(filename) = logfilter_file {
    if using_filter_file {
      info!(?filename, "using log-filter file");
    } else {
      warn!(?filename, "unable to read log-filter file, falling back to RUST_LOG env var");
    }
  }

  Ok(flush_guard)
}

/// Installs the global subscriber: human-readable events on stderr, plus JSON lines in `logfile` if given.
/// The returned guard must be held until the program exits, otherwise buffered log lines are lost.
pub fn init_logging(
  logfile: Option<impl AsRef<Path>>,
  logfilter_file: Option<impl AsRef<Path>>,
) -> anyhow::Result<Option<WorkerGuard>> {
  build_and_set_global_subscriber(
    logfile.as_ref().map(|p| p.as_ref()),
    logfilter_file.as_ref().map(|p| p.as_ref()),
    false,
  )
}

#[allow(dead_code)]
pub(crate) fn init_test_logging(logfile: Option<impl AsRef<Path>>) -> Option<WorkerGuard> {
  build_and_set_global_subscriber(logfile.as_ref().map(|p| p.as_ref()), None, true).ok().flatten()
}
