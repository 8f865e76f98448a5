use crate::config::Paths;
use crate::error::{AppError, AppResult};
use crate::fixup::{generate_fixup, pick_reference, FixupError, FixupWindow};
use crate::models::SleepRecord;
use crate::store;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate a synthetic record for the night of `date` and add it to
/// `fixups.json`.
pub fn fixup(
  paths: &Paths,
  date: NaiveDate,
  start: &str,
  end: &str,
  comment: Option<&str>,
) -> AppResult<SleepRecord> {
  let mut rng = StdRng::from_entropy();
  fixup_with_rng(paths, date, start, end, comment, &mut rng)
}

/// A fixup with the same night and start time replaces the earlier one.
pub fn fixup_with_rng<R: Rng + ?Sized>(
  paths: &Paths,
  date: NaiveDate,
  start: &str,
  end: &str,
  comment: Option<&str>,
  rng: &mut R,
) -> AppResult<SleepRecord> {
  let window = FixupWindow::resolve(date, start, end)?;

  let sleep_file = paths.sleep_file();
  if !sleep_file.exists() {
    return Err(AppError::NoData);
  }
  let records: Vec<SleepRecord> = store::read_json(&sleep_file)?;
  let reference = pick_reference(&records, date).ok_or(FixupError::NoReference)?;
  if reference.date_of_sleep != date {
    log::info!(
      "No main sleep for {}, using {} as reference",
      date,
      reference.date_of_sleep
    );
  }

  let record = generate_fixup(reference, &window, comment, rng);

  let fixups_file = paths.fixups_file();
  let mut fixups: Vec<SleepRecord> = store::read_json_or_default(&fixups_file)?;
  let before = fixups.len();
  fixups.retain(|f| !(f.date_of_sleep == record.date_of_sleep && f.start_time == record.start_time));
  if fixups.len() < before {
    log::info!("Replacing existing fixup for {} at {}", date, window.start);
  }
  fixups.push(record.clone());
  fixups.sort_by_key(|f| (f.date_of_sleep, f.start_time));
  store::write_json(&fixups_file, &fixups)?;

  println!(
    "Added fixup for {}: {} to {} ({} segments)",
    date,
    window.start.format("%Y-%m-%d %H:%M"),
    window.end.format("%Y-%m-%d %H:%M"),
    record.levels.data.len()
  );
  Ok(record)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::tests::temp_paths;
  use crate::fixup::FIXUP_LOG_TYPE;
  use crate::models::SleepLevel;
  use crate::test_utils::*;

  fn seed_sleep(paths: &Paths) {
    let reference = mock_stages_record(
      "2025-01-01",
      true,
      "2024-12-31T23:00:00.000",
      "2025-01-01T07:00:00.000",
      [60, 300, 90, 30],
      vec![
        mock_segment("2024-12-31T23:00:00.000", SleepLevel::Light, 1800),
        mock_segment("2024-12-31T23:30:00.000", SleepLevel::Deep, 1200),
        mock_segment("2024-12-31T23:50:00.000", SleepLevel::Rem, 900),
        mock_segment("2025-01-01T00:05:00.000", SleepLevel::Wake, 120),
      ],
    );
    store::write_json(&paths.sleep_file(), &[reference]).unwrap();
  }

  #[test]
  fn test_fixup_requires_sleep_data() {
    let (_dir, paths) = temp_paths();
    let mut rng = StdRng::seed_from_u64(1);
    let result = fixup_with_rng(&paths, date("2025-01-02"), "23:00", "06:30", None, &mut rng);
    assert!(matches!(result, Err(AppError::NoData)));
  }

  #[test]
  fn test_fixup_rejects_bad_time() {
    let (_dir, paths) = temp_paths();
    seed_sleep(&paths);
    let mut rng = StdRng::seed_from_u64(1);
    let result = fixup_with_rng(&paths, date("2025-01-02"), "11pm", "06:30", None, &mut rng);
    assert!(matches!(result, Err(AppError::Fixup(FixupError::InvalidTime(_)))));
  }

  #[test]
  fn test_fixup_is_appended() {
    let (_dir, paths) = temp_paths();
    seed_sleep(&paths);
    let mut rng = StdRng::seed_from_u64(7);

    let record = fixup_with_rng(
      &paths,
      date("2025-01-02"),
      "23:00",
      "06:30",
      Some("watch died"),
      &mut rng,
    )
    .unwrap();

    assert_eq!(record.date_of_sleep, date("2025-01-02"));
    assert_eq!(record.start_time, Some(at("2025-01-01T23:00:00.000")));
    assert_eq!(record.end_time, Some(at("2025-01-02T06:30:00.000")));
    assert_eq!(record.log_type.as_deref(), Some(FIXUP_LOG_TYPE));
    assert_eq!(record.comment.as_deref(), Some("watch died"));
    assert!(!record.is_main_sleep);

    let stored: Vec<SleepRecord> = store::read_json(&paths.fixups_file()).unwrap();
    assert_eq!(stored, vec![record]);
  }

  #[test]
  fn test_fixup_same_start_replaces() {
    let (_dir, paths) = temp_paths();
    seed_sleep(&paths);
    let mut rng = StdRng::seed_from_u64(3);

    fixup_with_rng(&paths, date("2025-01-02"), "23:00", "05:00", None, &mut rng).unwrap();
    fixup_with_rng(&paths, date("2024-12-30"), "22:00", "06:00", None, &mut rng).unwrap();
    let latest =
      fixup_with_rng(&paths, date("2025-01-02"), "23:00", "06:30", None, &mut rng).unwrap();

    let stored: Vec<SleepRecord> = store::read_json(&paths.fixups_file()).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].date_of_sleep, date("2024-12-30"));
    assert_eq!(stored[1], latest);
  }
}
