//! Test utilities shared by the unit tests
//!
//! Mock factories for vendor records, segments and credentials, plus short
//! constructors for timestamps and dates.

use crate::activity::RawActivity;
use crate::fitbit::{FitbitConfig, FitbitTokens};
use crate::models::sleep::{parse_vendor_time, Levels, LevelSummary};
use crate::models::{Segment, SleepLevel, SleepRecord};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Vendor-format timestamp, e.g. `at("2025-01-01T07:00:00.000")`
pub fn at(raw: &str) -> NaiveDateTime {
  parse_vendor_time(raw).expect("valid vendor timestamp")
}

pub fn date(raw: &str) -> NaiveDate {
  NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid YYYY-MM-DD date")
}

/// ---------------------------------------------------------------------------
/// Sleep Record Factories
/// ---------------------------------------------------------------------------

pub fn mock_segment(time: &str, level: SleepLevel, seconds: i64) -> Segment {
  Segment::new(at(time), level, seconds)
}

fn mock_record(
  date_of_sleep: &str,
  is_main: bool,
  start: &str,
  end: &str,
  tracking_type: &str,
  summary: BTreeMap<String, LevelSummary>,
  segments: Vec<Segment>,
) -> SleepRecord {
  SleepRecord {
    date_of_sleep: date(date_of_sleep),
    is_main_sleep: is_main,
    start_time: Some(at(start)),
    end_time: Some(at(end)),
    efficiency: 90,
    log_type: Some("auto_detected".to_string()),
    tracking_type: Some(tracking_type.to_string()),
    comment: None,
    levels: Levels {
      summary,
      data: segments,
      short_data: Vec::new(),
    },
    extra: serde_json::Map::new(),
  }
}

fn summary_of(entries: &[(&str, i64)]) -> BTreeMap<String, LevelSummary> {
  entries
    .iter()
    .map(|(key, minutes)| (key.to_string(), LevelSummary::with_minutes(*minutes)))
    .collect()
}

/// Stage-tracked record; `minutes` is `[deep, light, rem, wake]`
pub fn mock_stages_record(
  date_of_sleep: &str,
  is_main: bool,
  start: &str,
  end: &str,
  minutes: [i64; 4],
  segments: Vec<Segment>,
) -> SleepRecord {
  let [deep, light, rem, wake] = minutes;
  mock_record(
    date_of_sleep,
    is_main,
    start,
    end,
    "stages",
    summary_of(&[("deep", deep), ("light", light), ("rem", rem), ("wake", wake)]),
    segments,
  )
}

/// Classic record; `minutes` is `[asleep, awake, restless]`
pub fn mock_classic_record(
  date_of_sleep: &str,
  is_main: bool,
  start: &str,
  end: &str,
  minutes: [i64; 3],
  segments: Vec<Segment>,
) -> SleepRecord {
  let [asleep, awake, restless] = minutes;
  mock_record(
    date_of_sleep,
    is_main,
    start,
    end,
    "classic",
    summary_of(&[("asleep", asleep), ("awake", awake), ("restless", restless)]),
    segments,
  )
}

/// ---------------------------------------------------------------------------
/// Activity Factories
/// ---------------------------------------------------------------------------

/// `active_ms` in milliseconds, `km` in kilometres, as the vendor reports them
pub fn mock_raw_activity(name: &str, start: &str, active_ms: f64, km: f64) -> RawActivity {
  RawActivity {
    activity_name: Some(name.to_string()),
    start_time: Some(start.to_string()),
    active_duration: Some(active_ms),
    distance: Some(km),
    extra: serde_json::Map::new(),
  }
}

/// ---------------------------------------------------------------------------
/// Credential Factories
/// ---------------------------------------------------------------------------

/// client_id `abc`, client_secret `def`
pub fn mock_fitbit_config() -> FitbitConfig {
  serde_json::from_value(serde_json::json!({
    "client_id": "abc",
    "client_secret": "def",
  }))
  .expect("valid client config")
}

pub fn mock_tokens(access_token: &str) -> FitbitTokens {
  FitbitTokens {
    access_token: access_token.to_string(),
    refresh_token: "old-refresh".to_string(),
    extra: serde_json::Map::new(),
  }
}
