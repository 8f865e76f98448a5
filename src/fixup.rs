//! Synthetic sleep for tracking gaps
//!
//! When the tracker misses part of a night, a fixup record is synthesized
//! from a reference night's stage mix and segment lengths. The result has the
//! vendor's shape so the normalizer can merge it like any other nap.
//!
//! Generation is stochastic. Callers pass the random source, so tests can
//! use a seeded generator.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use std::collections::BTreeMap;

use crate::models::sleep::{LevelSummary, Levels};
use crate::models::{Segment, SleepLevel, SleepRecord};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

pub const FIXUP_LOG_TYPE: &str = "manual_fixup";

const STAGES: [SleepLevel; 4] = [
  SleepLevel::Deep,
  SleepLevel::Light,
  SleepLevel::Rem,
  SleepLevel::Wake,
];
const LIGHT: usize = 1;

const MIN_SEGMENT_SECONDS: i64 = 30;
const CLOSING_WAKE_TARGET_SECONDS: i64 = 60;
const WAKE_DAMPING: f64 = 0.3;
const EARLY_BOOST: f64 = 1.5;
const LATE_DAMPING: f64 = 0.5;

/// Used when the reference night has no tracked minutes at all
const FALLBACK_PROPORTIONS: [f64; 4] = [0.15, 0.55, 0.20, 0.10];

/// Bedtimes at or after noon belong to the evening before the sleep date.
const EVENING_START_HOUR: u32 = 12;

fn default_durations(level: &SleepLevel) -> &'static [i64] {
  match level {
    SleepLevel::Deep => &[600, 900, 1200, 1800],
    SleepLevel::Rem => &[300, 600, 1200, 1800],
    SleepLevel::Wake => &[60, 120, 180, 300],
    _ => &[300, 600, 900, 1500, 2100],
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FixupError {
  #[error("Invalid time '{0}', expected HH:MM")]
  InvalidTime(String),

  #[error("No main sleep record available as a reference")]
  NoReference,
}

/// ---------------------------------------------------------------------------
/// Fixup Window
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixupWindow {
  pub date: NaiveDate,
  pub start: NaiveDateTime,
  pub end: NaiveDateTime,
}

impl FixupWindow {
  /// Place wall-clock `start`/`end` (HH:MM) on the night of `date`.
  ///
  /// An evening start lands on the day before `date`. The end shares the
  /// start's calendar day and rolls forward one day iff it is not after
  /// the start.
  pub fn resolve(date: NaiveDate, start: &str, end: &str) -> Result<Self, FixupError> {
    let start_time = parse_clock(start)?;
    let end_time = parse_clock(end)?;

    let start_day = if start_time.hour() >= EVENING_START_HOUR {
      date - Duration::days(1)
    } else {
      date
    };

    let start = start_day.and_time(start_time);
    let mut end = start_day.and_time(end_time);
    if end <= start {
      end += Duration::days(1);
    }

    Ok(Self { date, start, end })
  }

  pub fn seconds(&self) -> i64 {
    (self.end - self.start).num_seconds()
  }
}

fn parse_clock(raw: &str) -> Result<NaiveTime, FixupError> {
  NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| FixupError::InvalidTime(raw.to_string()))
}

/// The main sleep for `date`, or the most recent main sleep when that night
/// is missing entirely.
pub fn pick_reference(records: &[SleepRecord], date: NaiveDate) -> Option<&SleepRecord> {
  records
    .iter()
    .find(|r| r.is_main_sleep && r.date_of_sleep == date)
    .or_else(|| {
      records
        .iter()
        .filter(|r| r.is_main_sleep)
        .max_by_key(|r| r.date_of_sleep)
    })
}

/// ---------------------------------------------------------------------------
/// Stage Profile
/// ---------------------------------------------------------------------------

/// Stage mix and observed segment lengths of a reference night
#[derive(Debug, Clone)]
struct StageProfile {
  proportions: [f64; 4],
  durations: [Vec<i64>; 4],
}

impl StageProfile {
  fn from_reference(reference: &SleepRecord) -> Self {
    let minutes = reference.summary().minutes();
    let total = minutes.total();

    let proportions = if total > 0 {
      STAGES.map(|level| minutes.get(&level) as f64 / total as f64)
    } else {
      FALLBACK_PROPORTIONS
    };

    let durations = STAGES.map(|level| {
      let observed: Vec<i64> = reference
        .levels
        .data
        .iter()
        .filter(|s| s.level.to_stages() == level && s.seconds > 0)
        .map(|s| s.seconds)
        .collect();
      if observed.is_empty() {
        default_durations(&level).to_vec()
      } else {
        observed
      }
    });

    Self {
      proportions,
      durations,
    }
  }

  /// Deep sleep concentrates early in the night and REM late; wake stays sparse.
  fn weights_at(&self, elapsed_fraction: f64) -> [f64; 4] {
    let early = elapsed_fraction < 0.5;
    let [deep, light, rem, wake] = self.proportions;

    let weights = [
      deep * if early { EARLY_BOOST } else { LATE_DAMPING },
      light,
      rem * if early { LATE_DAMPING } else { EARLY_BOOST },
      wake * WAKE_DAMPING,
    ];

    let sum: f64 = weights.iter().sum();
    if sum > 0.0 {
      weights.map(|w| w / sum)
    } else {
      weights
    }
  }
}

/// ---------------------------------------------------------------------------
/// Generation
/// ---------------------------------------------------------------------------

/// Contiguous segments covering exactly `[start, end)`, closing on wake.
pub fn generate_segments<R: Rng + ?Sized>(
  reference: &SleepRecord,
  start: NaiveDateTime,
  end: NaiveDateTime,
  rng: &mut R,
) -> Vec<Segment> {
  let profile = StageProfile::from_reference(reference);
  let total = (end - start).num_seconds().max(0);

  let mut segments: Vec<Segment> = Vec::new();
  let mut cursor = start;

  loop {
    let remaining = (end - cursor).num_seconds();
    if remaining <= MIN_SEGMENT_SECONDS {
      break;
    }

    let elapsed = (total - remaining) as f64 / total as f64;
    let weights = profile.weights_at(elapsed);
    let stage = match WeightedIndex::new(weights) {
      Ok(dist) => dist.sample(rng),
      Err(_) => LIGHT,
    };

    let drawn = profile.durations[stage]
      .choose(rng)
      .copied()
      .unwrap_or(MIN_SEGMENT_SECONDS);
    let seconds = drawn.min(remaining).max(MIN_SEGMENT_SECONDS);

    segments.push(Segment::new(cursor, STAGES[stage].clone(), seconds));
    cursor += Duration::seconds(seconds);
  }

  let remaining = (end - cursor).num_seconds().max(0);
  close_with_wake(&mut segments, start, remaining);
  segments
}

/// Finish on a short wake segment that absorbs the leftover tail.
fn close_with_wake(segments: &mut Vec<Segment>, start: NaiveDateTime, remaining: i64) {
  let closing = match segments.last_mut() {
    Some(last) if last.level == SleepLevel::Wake => {
      last.seconds += remaining;
      None
    }
    Some(last) => {
      let spare = (last.seconds - MIN_SEGMENT_SECONDS).max(0);
      let borrowed = (CLOSING_WAKE_TARGET_SECONDS - remaining).clamp(0, spare);
      last.seconds -= borrowed;
      Some(Segment::new(last.end(), SleepLevel::Wake, remaining + borrowed))
    }
    None => Some(Segment::new(start, SleepLevel::Wake, remaining)),
  };

  if let Some(segment) = closing.filter(|s| s.seconds > 0) {
    segments.push(segment);
  }
}

/// Build a complete vendor-shaped fixup record for `window`.
pub fn generate_fixup<R: Rng + ?Sized>(
  reference: &SleepRecord,
  window: &FixupWindow,
  comment: Option<&str>,
  rng: &mut R,
) -> SleepRecord {
  let segments = generate_segments(reference, window.start, window.end, rng);

  let mut seconds_by_stage: BTreeMap<&'static str, (i64, i64)> = BTreeMap::new();
  for segment in &segments {
    let key = match segment.level {
      SleepLevel::Deep => "deep",
      SleepLevel::Rem => "rem",
      SleepLevel::Wake => "wake",
      _ => "light",
    };
    let entry = seconds_by_stage.entry(key).or_insert((0, 0));
    entry.0 += segment.seconds;
    entry.1 += 1;
  }

  let mut summary = BTreeMap::new();
  for key in ["deep", "light", "rem", "wake"] {
    let (seconds, count) = seconds_by_stage.get(key).copied().unwrap_or((0, 0));
    let mut level = LevelSummary::with_minutes((seconds as f64 / 60.0).round() as i64);
    level.extra.insert("count".to_string(), json!(count));
    summary.insert(key.to_string(), level);
  }

  let total_seconds = window.seconds();
  let awake_seconds = seconds_by_stage.get("wake").map(|(s, _)| *s).unwrap_or(0);
  let asleep_seconds = total_seconds - awake_seconds;
  let efficiency = if total_seconds > 0 {
    asleep_seconds * 100 / total_seconds
  } else {
    0
  };

  let mut extra = serde_json::Map::new();
  extra.insert("duration".to_string(), json!(total_seconds * 1000));
  extra.insert("minutesAsleep".to_string(), json!(asleep_seconds / 60));
  extra.insert("minutesAwake".to_string(), json!(awake_seconds / 60));
  extra.insert("timeInBed".to_string(), json!(total_seconds / 60));

  SleepRecord {
    date_of_sleep: window.date,
    is_main_sleep: false,
    start_time: Some(window.start),
    end_time: Some(window.end),
    efficiency,
    log_type: Some(FIXUP_LOG_TYPE.to_string()),
    tracking_type: Some("stages".to_string()),
    comment: comment.map(str::to_string),
    levels: Levels {
      summary,
      data: segments,
      short_data: Vec::new(),
    },
    extra,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
