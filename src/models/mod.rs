pub mod chart;
pub mod sleep;

pub use chart::ChartRecord;
pub use sleep::{Segment, SleepLevel, SleepRecord, StageMinutes, StageSummary};
