//! Subjective sleep-quality annotations
//!
//! Each night can carry a short free-text code from the spreadsheet, e.g.
//! `c9` (category "c", score 9) or `x` (exclude this night from averages).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectiveRecord {
  pub code: Option<String>,
  pub score: Option<i64>,
  pub raw: String,
  pub exclude: bool,
}

fn is_exclude_marker(c: char) -> bool {
  c == 'x' || c == 'X'
}

pub fn parse_subjective(raw: &str) -> SubjectiveRecord {
  let exclude = raw.contains(is_exclude_marker);
  let stripped: String = raw.chars().filter(|c| !is_exclude_marker(*c)).collect();

  let digits: String = stripped
    .chars()
    .skip_while(|c| !c.is_ascii_digit())
    .take_while(|c| c.is_ascii_digit())
    .collect();
  // Digit runs too long for i64 saturate
  let score = (!digits.is_empty()).then(|| digits.parse::<i64>().unwrap_or(i64::MAX));

  let code: String = stripped.chars().filter(|c| !c.is_ascii_digit()).collect();
  let code = code.trim();

  SubjectiveRecord {
    code: (!code.is_empty()).then(|| code.to_string()),
    score,
    raw: raw.to_string(),
    exclude,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_code_and_score() {
    assert_eq!(
      parse_subjective("c9"),
      SubjectiveRecord {
        code: Some("c".to_string()),
        score: Some(9),
        raw: "c9".to_string(),
        exclude: false,
      }
    );
  }

  #[test]
  fn test_exclude_only() {
    assert_eq!(
      parse_subjective("X"),
      SubjectiveRecord {
        code: None,
        score: None,
        raw: "X".to_string(),
        exclude: true,
      }
    );
  }

  #[test]
  fn test_exclude_with_code() {
    let parsed = parse_subjective("a3x");
    assert_eq!(parsed.code.as_deref(), Some("a"));
    assert_eq!(parsed.score, Some(3));
    assert!(parsed.exclude);
  }

  #[test]
  fn test_first_digit_run_wins() {
    let parsed = parse_subjective("b10c2");
    assert_eq!(parsed.score, Some(10));
    assert_eq!(parsed.code.as_deref(), Some("bc"));
  }

  #[test]
  fn test_score_without_code() {
    let parsed = parse_subjective("7");
    assert_eq!(parsed.code, None);
    assert_eq!(parsed.score, Some(7));
    assert!(!parsed.exclude);
  }

  #[test]
  fn test_oversized_score_saturates() {
    let parsed = parse_subjective("c99999999999999999999");
    assert_eq!(parsed.code.as_deref(), Some("c"));
    assert_eq!(parsed.score, Some(i64::MAX));
  }

  #[test]
  fn test_empty_input() {
    let parsed = parse_subjective("");
    assert_eq!(parsed.code, None);
    assert_eq!(parsed.score, None);
    assert!(!parsed.exclude);
  }
}
