pub use fnv::FnvHashMap as Map;
pub use error::{DatasetError, Result};
pub use interval::{Interval, IntervalType};
pub use pose::{DurationRange, Planner, PoseCreator, PoseProvider};
pub use task::{Plan, Task, TaskCreator, TaskId, TaskType};
pub use dataset::{Dataset, DatasetCreator, DatasetMeta, DatasetType, TasksBySet};

/// Seconds
pub type Time = i64;
/// A pose/node name on the map
pub type Loc = String;

pub mod error;
pub mod interval;
pub mod task;
pub mod pose;
pub mod map;
pub mod sets;
pub mod tasks;
pub mod schedule;
pub mod dataset;
pub mod io;
pub mod transform;
pub mod experiment;
pub mod logging;
pub mod utils;

pub use utils::IoContext;
