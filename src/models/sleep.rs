//! Vendor-shaped sleep records
//!
//! These mirror the Fitbit sleep log JSON closely enough that a record can be
//! read from `sleep.json`, normalized, and written back without losing fields.
//! Synthetic fixups are emitted in the same shape.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::ops::AddAssign;

/// ---------------------------------------------------------------------------
/// Timestamp Encoding
/// ---------------------------------------------------------------------------

/// Fitbit emits local wall-clock timestamps without an offset,
/// e.g. `2025-01-01T23:10:30.000`.
const VENDOR_TIME_PARSE: &str = "%Y-%m-%dT%H:%M:%S%.f";
const VENDOR_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

pub fn parse_vendor_time(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
  NaiveDateTime::parse_from_str(raw, VENDOR_TIME_PARSE)
}

pub fn format_vendor_time(time: &NaiveDateTime) -> String {
  time.format(VENDOR_TIME_FORMAT).to_string()
}

pub mod vendor_time {
  use chrono::NaiveDateTime;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(&super::format_vendor_time(time))
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
  where
    D: Deserializer<'de>,
  {
    let raw = String::deserialize(deserializer)?;
    super::parse_vendor_time(&raw).map_err(serde::de::Error::custom)
  }
}

pub mod vendor_time_opt {
  use chrono::NaiveDateTime;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S>(time: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    match time {
      Some(t) => serializer.serialize_str(&super::format_vendor_time(t)),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
  where
    D: Deserializer<'de>,
  {
    match Option::<String>::deserialize(deserializer)? {
      Some(raw) if !raw.is_empty() => match super::parse_vendor_time(&raw) {
        Ok(time) => Ok(Some(time)),
        Err(e) => {
          log::debug!("Ignoring unparseable timestamp {:?}: {}", raw, e);
          Ok(None)
        }
      },
      _ => Ok(None),
    }
  }
}

/// `null` reads as the type's default, same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_false(value: &bool) -> bool {
  !*value
}

/// ---------------------------------------------------------------------------
/// Segments
/// ---------------------------------------------------------------------------

/// Stage names across both tracking vocabularies. Levels outside both
/// keep their vendor spelling so they are written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SleepLevel {
  Deep,
  Light,
  Rem,
  Wake,
  Asleep,
  Awake,
  Restless,
  Other(String),
}

impl SleepLevel {
  pub fn as_str(&self) -> &str {
    match self {
      SleepLevel::Deep => "deep",
      SleepLevel::Light => "light",
      SleepLevel::Rem => "rem",
      SleepLevel::Wake => "wake",
      SleepLevel::Asleep => "asleep",
      SleepLevel::Awake => "awake",
      SleepLevel::Restless => "restless",
      SleepLevel::Other(raw) => raw,
    }
  }

  /// Map classic levels onto the stages vocabulary.
  pub fn to_stages(&self) -> Self {
    match self {
      SleepLevel::Asleep => SleepLevel::Light,
      SleepLevel::Awake | SleepLevel::Restless => SleepLevel::Wake,
      other => other.clone(),
    }
  }
}

impl From<String> for SleepLevel {
  fn from(raw: String) -> Self {
    match raw.as_str() {
      "deep" => SleepLevel::Deep,
      "light" => SleepLevel::Light,
      "rem" => SleepLevel::Rem,
      "wake" => SleepLevel::Wake,
      "asleep" => SleepLevel::Asleep,
      "awake" => SleepLevel::Awake,
      "restless" => SleepLevel::Restless,
      _ => SleepLevel::Other(raw),
    }
  }
}

impl From<SleepLevel> for String {
  fn from(level: SleepLevel) -> Self {
    match level {
      SleepLevel::Other(raw) => raw,
      known => known.as_str().to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
  #[serde(rename = "dateTime", with = "vendor_time")]
  pub date_time: NaiveDateTime,
  pub level: SleepLevel,
  #[serde(default, deserialize_with = "null_as_default")]
  pub seconds: i64,
  #[serde(rename = "isNap", default, skip_serializing_if = "is_false")]
  pub is_nap: bool,
}

impl Segment {
  pub fn new(date_time: NaiveDateTime, level: SleepLevel, seconds: i64) -> Self {
    Self {
      date_time,
      level,
      seconds,
      is_nap: false,
    }
  }

  pub fn end(&self) -> NaiveDateTime {
    self.date_time + Duration::seconds(self.seconds)
  }
}

pub fn sort_segments(segments: &mut [Segment]) {
  segments.sort_by_key(|s| s.date_time);
}

/// ---------------------------------------------------------------------------
/// Stage Summary
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
  #[serde(default, deserialize_with = "null_as_default")]
  pub minutes: i64,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LevelSummary {
  pub fn with_minutes(minutes: i64) -> Self {
    Self {
      minutes,
      extra: serde_json::Map::new(),
    }
  }
}

/// Per-stage minute totals in the stages vocabulary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMinutes {
  pub deep: i64,
  pub light: i64,
  pub rem: i64,
  pub wake: i64,
}

impl StageMinutes {
  pub fn total(&self) -> i64 {
    self.deep + self.light + self.rem + self.wake
  }

  pub fn get(&self, level: &SleepLevel) -> i64 {
    match level.to_stages() {
      SleepLevel::Deep => self.deep,
      SleepLevel::Light => self.light,
      SleepLevel::Rem => self.rem,
      SleepLevel::Wake => self.wake,
      _ => 0,
    }
  }
}

impl AddAssign for StageMinutes {
  fn add_assign(&mut self, other: Self) {
    self.deep += other.deep;
    self.light += other.light;
    self.rem += other.rem;
    self.wake += other.wake;
  }
}

/// The two summary vocabularies, resolved once at parse time.
/// Stages tracking is recognised by the presence of a `deep` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSummary {
  Stages {
    deep: i64,
    light: i64,
    rem: i64,
    wake: i64,
  },
  Classic {
    asleep: i64,
    awake: i64,
    restless: i64,
  },
}

impl StageSummary {
  pub fn from_levels(summary: &BTreeMap<String, LevelSummary>) -> Self {
    let minutes = |key: &str| summary.get(key).map(|s| s.minutes).unwrap_or(0);

    if summary.contains_key("deep") {
      StageSummary::Stages {
        deep: minutes("deep"),
        light: minutes("light"),
        rem: minutes("rem"),
        wake: minutes("wake"),
      }
    } else {
      StageSummary::Classic {
        asleep: minutes("asleep"),
        awake: minutes("awake"),
        restless: minutes("restless"),
      }
    }
  }

  pub fn is_classic(&self) -> bool {
    matches!(self, StageSummary::Classic { .. })
  }

  pub fn minutes(&self) -> StageMinutes {
    match *self {
      StageSummary::Stages {
        deep,
        light,
        rem,
        wake,
      } => StageMinutes {
        deep,
        light,
        rem,
        wake,
      },
      StageSummary::Classic {
        asleep,
        awake,
        restless,
      } => StageMinutes {
        deep: 0,
        light: asleep,
        rem: 0,
        wake: awake + restless,
      },
    }
  }
}

/// ---------------------------------------------------------------------------
/// Sleep Record
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Levels {
  #[serde(default)]
  pub summary: BTreeMap<String, LevelSummary>,
  #[serde(default)]
  pub data: Vec<Segment>,
  #[serde(rename = "shortData", default)]
  pub short_data: Vec<Segment>,
}

/// One entry of the vendor's sleep log. `dateOfSleep` is the only field
/// that must be present; everything else falls back to a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRecord {
  pub date_of_sleep: NaiveDate,
  #[serde(default)]
  pub is_main_sleep: bool,
  #[serde(default, with = "vendor_time_opt", skip_serializing_if = "Option::is_none")]
  pub start_time: Option<NaiveDateTime>,
  #[serde(default, with = "vendor_time_opt", skip_serializing_if = "Option::is_none")]
  pub end_time: Option<NaiveDateTime>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub efficiency: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub log_type: Option<String>,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub tracking_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,
  #[serde(default)]
  pub levels: Levels,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SleepRecord {
  pub fn summary(&self) -> StageSummary {
    StageSummary::from_levels(&self.levels.summary)
  }

  /// `data` and `shortData` concatenated, ascending by `dateTime`
  pub fn sorted_segments(&self) -> Vec<Segment> {
    let mut segments: Vec<Segment> = self
      .levels
      .data
      .iter()
      .chain(self.levels.short_data.iter())
      .cloned()
      .collect();
    sort_segments(&mut segments);
    segments
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
