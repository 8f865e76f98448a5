//! Sleep record normalization
//!
//! Collapses the raw sleep log into one chart record per night:
//! - classic (asleep/awake/restless) tracking is mapped onto stages
//! - the trailing "got out of bed" wake segment is excluded from wake time
//! - naps and fixups are folded into the night's main sleep
//!
//! Nights without a main-sleep record are dropped.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::activity::ActivityIndex;
use crate::models::sleep::sort_segments;
use crate::models::{ChartRecord, Segment, SleepLevel, SleepRecord, StageMinutes};
use crate::subjective::SubjectiveRecord;

/// A single sleep record reduced to stage totals and uniform segments
#[derive(Debug, Clone)]
pub struct SleepSummary {
  pub minutes: StageMinutes,
  pub segments: Vec<Segment>,
}

pub fn summarize(record: &SleepRecord) -> SleepSummary {
  let summary = record.summary();
  let mut minutes = summary.minutes();
  let mut segments = record.sorted_segments();

  if summary.is_classic() {
    for segment in &mut segments {
      segment.level = segment.level.to_stages();
    }
  }

  // Terminal awake
  if let Some(last) = segments.last() {
    if last.level == SleepLevel::Wake {
      minutes.wake = (minutes.wake - last.seconds / 60).max(0);
    }
  }

  SleepSummary { minutes, segments }
}

/// A nap or fixup that ends no later than the main sleep starts extends
/// the night backward instead of counting as a separate nap.
fn is_pre_sleep(extra: &SleepRecord, main: &SleepRecord) -> bool {
  match (extra.end_time, main.start_time) {
    (Some(end), Some(start)) => end <= start,
    _ => false,
  }
}

fn merge_night(records: &[&SleepRecord]) -> Option<ChartRecord> {
  let main_index = records.iter().position(|r| r.is_main_sleep)?;
  let main = records[main_index];

  let SleepSummary {
    mut minutes,
    mut segments,
  } = summarize(main);
  let mut start_time = main.start_time;

  for (_, extra) in records.iter().enumerate().filter(|(i, _)| *i != main_index) {
    let summary = summarize(extra);
    minutes += summary.minutes;

    if is_pre_sleep(extra, main) {
      start_time = match (start_time, extra.start_time) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
      };
      segments.extend(summary.segments);
    } else {
      segments.extend(summary.segments.into_iter().map(|mut s| {
        s.is_nap = true;
        s
      }));
    }
  }

  sort_segments(&mut segments);

  Some(ChartRecord {
    date: main.date_of_sleep,
    deep: minutes.deep,
    light: minutes.light,
    rem: minutes.rem,
    wake: minutes.wake,
    efficiency: main.efficiency,
    start_time,
    end_time: main.end_time,
    segments,
    activities: Vec::new(),
    runs: Vec::new(),
    subjective: None,
  })
}

/// Build the chart series, ascending by date, one record per night that
/// has a main sleep.
pub fn build_chart(
  records: &[SleepRecord],
  activities: &ActivityIndex,
  subjective: &BTreeMap<NaiveDate, SubjectiveRecord>,
) -> Vec<ChartRecord> {
  let mut nights: BTreeMap<NaiveDate, Vec<&SleepRecord>> = BTreeMap::new();
  for record in records {
    nights.entry(record.date_of_sleep).or_default().push(record);
  }

  nights
    .values()
    .filter_map(|group| merge_night(group))
    .map(|mut night| {
      let key = night.date.to_string();
      night.activities = activities.activities.get(&key).cloned().unwrap_or_default();
      night.runs = activities.runs.get(&key).cloned().unwrap_or_default();
      night.subjective = subjective.get(&night.date).cloned();
      night
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
