use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::sleep::{vendor_time_opt, Segment};
use crate::activity::Activity;
use crate::subjective::SubjectiveRecord;

/// One night as consumed by the chart page (`data.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRecord {
  pub date: NaiveDate,
  pub deep: i64,
  pub light: i64,
  pub rem: i64,
  pub wake: i64,
  pub efficiency: i64,
  #[serde(default, with = "vendor_time_opt")]
  pub start_time: Option<NaiveDateTime>,
  #[serde(default, with = "vendor_time_opt")]
  pub end_time: Option<NaiveDateTime>,
  pub segments: Vec<Segment>,
  #[serde(default)]
  pub activities: Vec<Activity>,
  #[serde(default)]
  pub runs: Vec<Activity>,
  #[serde(default)]
  pub subjective: Option<SubjectiveRecord>,
}
