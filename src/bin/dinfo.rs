use clap::Parser;
use mrta_datasets::io::load_yaml_dataset;
use mrta_datasets::*;
use prettytable::*;
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;

#[derive(Parser)]
#[clap(version = env!("COMMIT_HASH"))]
struct Args {
  /// JSON output
  #[clap(long)]
  json: bool,
  /// Also list the tasks of every set
  #[clap(long, short)]
  tasks: bool,
  /// Dataset file (YAML)
  dataset: PathBuf,
}

#[derive(Serialize, Clone, Debug)]
struct SetInfo {
  set_number: usize,
  n_tasks: usize,
  first_pickup: Option<Time>,
  last_finish: Option<Time>,
  total_duration: Time,
}

#[derive(Serialize, Clone, Debug)]
struct Output {
  name: String,
  id: String,
  dataset_type: DatasetType,
  task_type: TaskType,
  n_tasks: usize,
  start_time: Time,
  pickup_time_interval: Interval,
  time_window_interval: Interval,
  map_sections: Vec<String>,
  sets: Vec<SetInfo>,
}

impl Output {
  fn new(dataset: &Dataset) -> Self {
    let sets = dataset.tasks_by_set().into_iter()
      .map(|(set_number, chain)| SetInfo {
        set_number,
        n_tasks: chain.len(),
        first_pickup: chain.first().and_then(|t| t.earliest_pickup_time),
        last_finish: chain.last().and_then(Task::latest_finish_time),
        total_duration: chain.iter().map(|t| t.plan.estimated_duration).sum(),
      })
      .collect();

    let meta = &dataset.meta;
    Output {
      name: meta.dataset_name.clone(),
      id: meta.dataset_id.to_string(),
      dataset_type: meta.dataset_type,
      task_type: meta.task_type,
      n_tasks: dataset.len(),
      start_time: meta.start_time,
      pickup_time_interval: meta.pickup_time_interval,
      time_window_interval: meta.time_window_interval,
      map_sections: meta.map_sections.clone(),
      sets,
    }
  }

  pub fn to_table(&self) -> Table {
    fn display_val(val: impl Display) -> String {
      format!("{}", val)
    }

    let mut table = table!(
      ["Name", display_val(&self.name)],
      ["ID", display_val(&self.id)],
      ["Type", display_val(self.dataset_type)],
      ["Task type", display_val(self.task_type)],
      ["Tasks", display_val(self.n_tasks)],
      ["Sets", display_val(self.sets.len())],
      ["Start time", display_val(self.start_time)],
      ["Pickup time interval", display_val(self.pickup_time_interval)],
      ["Time window interval", display_val(self.time_window_interval)],
      ["Map sections", self.map_sections.join(" ")]
    );

    let fmt = format::FormatBuilder::new()
      .padding(1, 1)
      .build();

    table.set_format(fmt);
    for cell in table.column_iter_mut(0) {
      cell.align(format::Alignment::RIGHT);
    }
    table
  }

  fn sets_table(&self) -> Table {
    let fmt_opt = |t: Option<Time>| t.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string());
    let mut table = Table::new();
    table.set_titles(row!["Set", "Tasks", "First pickup", "Last finish", "Total duration"]);
    for s in &self.sets {
      table.add_row(row![r => s.set_number, s.n_tasks, fmt_opt(s.first_pickup), fmt_opt(s.last_finish), s.total_duration]);
    }
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table
  }
}

fn tasks_table(dataset: &Dataset) -> Table {
  let mut table = Table::new();
  table.set_titles(row!["Set", "ID", "Pickup", "Delivery", "Duration", "Earliest", "Latest"]);
  for (set_number, chain) in dataset.tasks_by_set() {
    for t in chain {
      let fmt_opt = |t: Option<Time>| t.map(|t| t.to_string()).unwrap_or_default();
      table.add_row(row![
        set_number,
        t.task_id,
        t.pickup_location,
        t.delivery_location,
        r -> t.plan.estimated_duration,
        r -> fmt_opt(t.earliest_pickup_time),
        r -> fmt_opt(t.latest_pickup_time)
      ]);
    }
  }
  table.set_format(*format::consts::FORMAT_CLEAN);
  table
}

fn main() -> anyhow::Result<()> {
  let args: Args = Args::parse();
  let dataset = load_yaml_dataset(&args.dataset)?;
  let output = Output::new(&dataset);

  if args.json {
    println!("{}", serde_json::to_string_pretty(&output)?)
  } else {
    output.to_table().printstd();
    println!();
    output.sets_table().printstd();
    if args.tasks {
      println!();
      tasks_table(&dataset).printstd();
    }
  }
  Ok(())
}
