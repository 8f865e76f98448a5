//! Activity processing
//!
//! Raw entries from the Fitbit activity log are reduced to the handful of
//! fields the chart page shows, and split into runs and everything else.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Anything faster than this average speed (km/h) is treated as a run.
pub const RUN_SPEED_THRESHOLD_KMH: f64 = 8.0;

/// ---------------------------------------------------------------------------
/// Data Structures
/// ---------------------------------------------------------------------------

/// Activity log entry as returned by the vendor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActivity {
  #[serde(default)]
  pub activity_name: Option<String>,
  /// ISO timestamp with offset, e.g. "2025-11-30T17:21:08.323-05:00"
  #[serde(default)]
  pub start_time: Option<String>,
  /// milliseconds
  #[serde(default)]
  pub active_duration: Option<f64>,
  /// kilometres
  #[serde(default)]
  pub distance: Option<f64>,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
  pub name: String,
  pub date: String,
  pub start_time: String,
  pub duration: i64,  // minutes
  pub distance: f64,  // km
  pub speed: f64,     // km/h
}

impl Activity {
  pub fn is_run(&self) -> bool {
    self.speed > RUN_SPEED_THRESHOLD_KMH
  }

  pub fn pace_min_per_km(&self) -> Option<f64> {
    if self.distance > 0.0 && self.duration > 0 {
      Some(self.duration as f64 / self.distance)
    } else {
      None
    }
  }
}

/// Processed activities keyed by date, runs kept apart from the rest
#[derive(Debug, Default)]
pub struct ActivityIndex {
  pub activities: BTreeMap<String, Vec<Activity>>,
  pub runs: BTreeMap<String, Vec<Activity>>,
}

/// ---------------------------------------------------------------------------
/// Processing
/// ---------------------------------------------------------------------------

fn round_to(value: f64, places: i32) -> f64 {
  let factor = 10f64.powi(places);
  (value * factor).round() / factor
}

/// Returns `None` when the entry has no start time.
///
/// The date is the first ten characters of the vendor timestamp, i.e. the
/// local calendar day the vendor recorded rather than a timezone-aware
/// conversion.
pub fn process_activity(raw: &RawActivity) -> Option<Activity> {
  let start_time = raw.start_time.as_deref().filter(|s| !s.is_empty())?;

  let duration = (raw.active_duration.unwrap_or(0.0) / 60_000.0).round() as i64;
  let distance = round_to(raw.distance.unwrap_or(0.0), 2);
  let speed = if duration == 0 {
    0.0
  } else {
    round_to(distance / (duration as f64 / 60.0), 1)
  };

  Some(Activity {
    name: raw.activity_name.clone().unwrap_or_default(),
    date: start_time.chars().take(10).collect(),
    start_time: start_time.to_string(),
    duration,
    distance,
    speed,
  })
}

pub fn index_by_date(raw: &[RawActivity]) -> ActivityIndex {
  let mut index = ActivityIndex::default();

  for activity in raw.iter().filter_map(process_activity) {
    let bucket = if activity.is_run() {
      &mut index.runs
    } else {
      &mut index.activities
    };
    bucket.entry(activity.date.clone()).or_default().push(activity);
  }

  index
}

/// All runs in chronological order
pub fn runs(raw: &[RawActivity]) -> Vec<Activity> {
  let mut runs: Vec<Activity> = raw
    .iter()
    .filter_map(process_activity)
    .filter(Activity::is_run)
    .collect();
  runs.sort_by(|a, b| a.start_time.cmp(&b.start_time));
  runs
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::mock_raw_activity;

  #[test]
  fn test_missing_start_time_is_rejected() {
    let mut raw = mock_raw_activity("Run", "", 1_800_000.0, 5.0);
    assert!(process_activity(&raw).is_none());

    raw.start_time = None;
    assert!(process_activity(&raw).is_none());
  }

  #[test]
  fn test_run_metrics() {
    // 5.004 km in 29.6 minutes -> 30 min, 5.0 km, 10.0 km/h
    let raw = mock_raw_activity("Run", "2025-11-30T17:21:08.323-05:00", 1_776_000.0, 5.004);
    let activity = process_activity(&raw).unwrap();

    assert_eq!(activity.name, "Run");
    assert_eq!(activity.date, "2025-11-30");
    assert_eq!(activity.duration, 30);
    assert_eq!(activity.distance, 5.0);
    assert_eq!(activity.speed, 10.0);
    assert!(activity.is_run());
  }

  #[test]
  fn test_zero_duration_has_zero_speed() {
    let raw = mock_raw_activity("Weights", "2025-11-30T08:00:00.000-05:00", 10_000.0, 1.0);
    let activity = process_activity(&raw).unwrap();
    assert_eq!(activity.duration, 0);
    assert_eq!(activity.speed, 0.0);
    assert!(!activity.is_run());
  }

  #[test]
  fn test_walk_is_not_a_run() {
    // 5 km in an hour
    let raw = mock_raw_activity("Walk", "2025-11-30T12:00:00.000-05:00", 3_600_000.0, 5.0);
    let activity = process_activity(&raw).unwrap();
    assert_eq!(activity.speed, 5.0);
    assert!(!activity.is_run());
  }

  #[test]
  fn test_run_threshold_is_exclusive() {
    // exactly 8 km/h
    let raw = mock_raw_activity("Jog", "2025-11-30T12:00:00.000-05:00", 3_600_000.0, 8.0);
    assert!(!process_activity(&raw).unwrap().is_run());
  }

  #[test]
  fn test_index_splits_runs() {
    let raw = vec![
      mock_raw_activity("Run", "2025-11-30T07:00:00.000-05:00", 1_800_000.0, 5.0),
      mock_raw_activity("Walk", "2025-11-30T12:00:00.000-05:00", 3_600_000.0, 4.0),
      mock_raw_activity("Bike", "", 3_600_000.0, 20.0),
    ];

    let index = index_by_date(&raw);
    assert_eq!(index.runs["2025-11-30"].len(), 1);
    assert_eq!(index.activities["2025-11-30"].len(), 1);
    assert_eq!(index.activities["2025-11-30"][0].name, "Walk");
  }

  #[test]
  fn test_pace() {
    let raw = mock_raw_activity("Run", "2025-11-30T07:00:00.000-05:00", 1_800_000.0, 5.0);
    let activity = process_activity(&raw).unwrap();
    assert_eq!(activity.pace_min_per_km(), Some(6.0));
  }
}
