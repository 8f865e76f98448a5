use crate::activity::{self, Activity, RawActivity};
use crate::config::Paths;
use crate::error::{AppError, AppResult};
use crate::models::{ChartRecord, SleepRecord};
use crate::normalize::build_chart;
use crate::store;
use crate::subjective::SubjectiveRecord;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// ---------------------------------------------------------------------------
/// Build
/// ---------------------------------------------------------------------------

/// Regenerate the chart file from everything under the data dir.
/// Only `sleep.json` is required; the other inputs default to empty.
pub fn build(paths: &Paths) -> AppResult<Vec<ChartRecord>> {
  let sleep_file = paths.sleep_file();
  if !sleep_file.exists() {
    return Err(AppError::NoData);
  }

  let mut records: Vec<SleepRecord> = store::read_json(&sleep_file)?;
  let fixups: Vec<SleepRecord> = store::read_json_or_default(&paths.fixups_file())?;
  let raw_activities: Vec<RawActivity> = store::read_json_or_default(&paths.activities_file())?;
  let subjective: BTreeMap<NaiveDate, SubjectiveRecord> =
    store::read_json_or_default(&paths.subjective_file())?;

  log::debug!(
    "Building chart from {} sleep records, {} fixups, {} activities",
    records.len(),
    fixups.len(),
    raw_activities.len()
  );
  records.extend(fixups);

  let chart = build_chart(&records, &activity::index_by_date(&raw_activities), &subjective);

  let out_file = paths.chart_file();
  store::write_json(&out_file, &chart)?;
  println!("Wrote {} records to {}", chart.len(), out_file.display());

  Ok(chart)
}

/// ---------------------------------------------------------------------------
/// Runs
/// ---------------------------------------------------------------------------

pub fn runs(paths: &Paths) -> AppResult<Vec<Activity>> {
  let activities_file = paths.activities_file();
  if !activities_file.exists() {
    return Err(AppError::NoData);
  }

  let raw: Vec<RawActivity> = store::read_json(&activities_file)?;
  let runs = activity::runs(&raw);

  if runs.is_empty() {
    println!("No runs found.");
  } else {
    println!(
      "{:<10}  {:<20}  {:>8}  {:>7}  {:>9}  {:>9}",
      "Date", "Name", "Distance", "Time", "Speed", "Pace"
    );
    for run in &runs {
      println!("{}", format_run(run));
    }
  }

  Ok(runs)
}

fn format_run(run: &Activity) -> String {
  let pace = run
    .pace_min_per_km()
    .map(format_pace)
    .unwrap_or_else(|| "-".to_string());

  format!(
    "{:<10}  {:<20}  {:>5.2} km  {:>3} min  {:>4.1} km/h  {:>9}",
    run.date, run.name, run.distance, run.duration, run.speed, pace
  )
}

/// Minutes per km as `M:SS/km`
fn format_pace(minutes_per_km: f64) -> String {
  let total_seconds = (minutes_per_km * 60.0).round() as i64;
  format!("{}:{:02}/km", total_seconds / 60, total_seconds % 60)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
