//! Input validation, run by adapters before a use case is invoked.
//!
//! Use cases only check business state (existence, gating, uniqueness). Shape
//! and range checks live here and produce a structured [`ValidationErrors`].

use std::fmt;

use serde::Serialize;

use crate::{
  entity::{CompetitorUpdate, NewCompetitor, NewPlace, NewUser, PlaceUpdate},
  fact::{
    DateRange, NewCompetitorSnapshot, NewRanking, NewReview, NewReviewHistory,
    ObservedMetrics,
  },
  notification::{Condition, NewNotificationSetting, NotificationSettingUpdate},
};

// ─── Error collection ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

/// Every problem found in one input, in the order they were detected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
  pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.push(FieldError { field: field.into(), message: message.into() });
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn errors(&self) -> &[FieldError] { &self.0 }

  pub fn fields(&self) -> Vec<&str> {
    self.0.iter().map(|e| e.field.as_str()).collect()
  }

  pub fn into_result(self) -> Result<(), Self> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self
      .0
      .iter()
      .map(|e| format!("{}: {}", e.field, e.message))
      .collect();
    f.write_str(&parts.join("; "))
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

pub trait Validate {
  fn validate(&self) -> Result<(), ValidationErrors>;
}

// ─── Field checks ────────────────────────────────────────────────────────────

fn required_text(errors: &mut ValidationErrors, field: &str, value: &str) {
  if value.trim().is_empty() {
    errors.push(field, "must not be empty");
  }
}

fn optional_text(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
  if let Some(v) = value {
    required_text(errors, field, v);
  }
}

fn optional_url(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
  if let Some(url) = value
    && !(url.starts_with("http://") || url.starts_with("https://"))
  {
    errors.push(field, "must be an http(s) URL");
  }
}

/// Whether `value` has no more than `decimals` fractional digits.
fn has_precision(value: f64, decimals: i32) -> bool {
  let scaled = value * 10f64.powi(decimals);
  (scaled - scaled.round()).abs() < 1e-6
}

fn average_rating(errors: &mut ValidationErrors, field: &str, value: Option<f64>) {
  let Some(rating) = value else { return };
  if !rating.is_finite() || !(0.0..=5.0).contains(&rating) {
    errors.push(field, "must be between 0.0 and 5.0");
  } else if !has_precision(rating, 1) {
    errors.push(field, "must have at most one decimal place");
  }
}

fn rank(errors: &mut ValidationErrors, field: &str, value: Option<u32>) {
  if value == Some(0) {
    errors.push(field, "ranks start at 1");
  }
}

// ─── Entities ────────────────────────────────────────────────────────────────

impl Validate for NewUser {
  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let email = self.email.trim();
    if email.is_empty() || !email.contains('@') {
      errors.push("email", "must be an email address");
    }
    required_text(&mut errors, "name", &self.name);
    errors.into_result()
  }
}

impl Validate for NewPlace {
  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    required_text(&mut errors, "external_id", &self.external_id);
    required_text(&mut errors, "name", &self.name);
    optional_url(&mut errors, "url", self.url.as_deref());
    errors.into_result()
  }
}

impl Validate for PlaceUpdate {
  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    optional_text(&mut errors, "name", self.name.as_deref());
    optional_url(&mut errors, "url", self.url.as_deref());
    errors.into_result()
  }
}

impl Validate for NewCompetitor {
  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    required_text(&mut errors, "external_id", &self.external_id);
    required_text(&mut errors, "name", &self.name);
    errors.into_result()
  }
}

impl Validate for CompetitorUpdate {
  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    optional_text(&mut errors, "name", self.name.as_deref());
    errors.into_result()
  }
}

// ─── Facts ───────────────────────────────────────────────────────────────────

impl Validate for NewRanking {
  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    rank(&mut errors, "rank", self.rank);
    errors.into_result()
  }
}

impl Validate for NewReviewHistory {
  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    average_rating(&mut errors, "average_rating", self.average_rating);
    errors.into_result()
  }
}

impl Validate for NewCompetitorSnapshot {
  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    rank(&mut errors, "rank", self.rank);
    average_rating(&mut errors, "average_rating", self.average_rating);
    errors.into_result()
  }
}

impl Validate for NewReview {
  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if let Some(rating) = self.rating
      && !(1..=5).contains(&rating)
    {
      errors.push("rating", "must be between 1 and 5");
    }
    if let Some(score) = self.sentiment_score {
      if !score.is_finite() || !(-1.0..=1.0).contains(&score) {
        errors.push("sentiment_score", "must be between -1.0 and 1.0");
      } else if !has_precision(score, 2) {
        errors.push("sentiment_score", "must have at most two decimal places");
      }
    }
    optional_text(
      &mut errors,
      "external_review_id",
      self.external_review_id.as_deref(),
    );
    errors.into_result()
  }
}

impl Validate for ObservedMetrics {
  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    rank(&mut errors, "rank", self.rank);
    average_rating(&mut errors, "average_rating", self.average_rating);
    errors.into_result()
  }
}

impl Validate for DateRange {
  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if self.start > self.end {
      errors.push("start", "must not be after end");
    }
    errors.into_result()
  }
}

// ─── Notifications ───────────────────────────────────────────────────────────

impl Validate for NewNotificationSetting {
  fn validate(&self) -> Result<(), ValidationErrors> {
    Condition::parse_all(&self.conditions).map(|_| ())
  }
}

impl Validate for NotificationSettingUpdate {
  fn validate(&self) -> Result<(), ValidationErrors> {
    match &self.conditions {
      Some(conditions) => Condition::parse_all(conditions).map(|_| ()),
      None => Ok(()),
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::fact::ReviewType;

  fn review() -> NewReview {
    NewReview {
      place_id:           Uuid::new_v4(),
      review_type:        ReviewType::Visitor,
      content:            Some("Great coffee".into()),
      author:             None,
      rating:             Some(5),
      sentiment:          None,
      sentiment_score:    Some(0.85),
      external_review_id: Some("r-1".into()),
      published_at:       None,
      collected_at:       Utc::now(),
    }
  }

  #[test]
  fn valid_review_passes() {
    assert!(review().validate().is_ok());
  }

  #[test]
  fn review_rating_and_score_ranges() {
    let mut input = review();
    input.rating = Some(0);
    input.sentiment_score = Some(1.5);
    let errors = input.validate().unwrap_err();
    assert_eq!(errors.fields(), vec!["rating", "sentiment_score"]);
  }

  #[test]
  fn sentiment_score_precision() {
    let mut input = review();
    input.sentiment_score = Some(0.123);
    let errors = input.validate().unwrap_err();
    assert_eq!(errors.fields(), vec!["sentiment_score"]);
  }

  #[test]
  fn average_rating_bounds_and_precision() {
    let mut observed = ObservedMetrics {
      average_rating: Some(4.5),
      observed_at: Utc::now(),
      ..Default::default()
    };
    assert!(observed.validate().is_ok());

    observed.average_rating = Some(5.1);
    assert!(observed.validate().is_err());

    observed.average_rating = Some(4.25);
    assert!(observed.validate().is_err());

    observed.average_rating = Some(0.0);
    assert!(observed.validate().is_ok());
  }

  #[test]
  fn rank_zero_is_rejected() {
    let observed = ObservedMetrics {
      rank: Some(0),
      observed_at: Utc::now(),
      ..Default::default()
    };
    assert_eq!(observed.validate().unwrap_err().fields(), vec!["rank"]);
  }

  #[test]
  fn inverted_range_is_rejected() {
    let now = Utc::now();
    assert!(DateRange::new(now, now).validate().is_ok());
    assert!(DateRange::new(now, now - Duration::hours(1)).validate().is_err());
  }

  #[test]
  fn place_requires_name_and_http_url() {
    let input = NewPlace {
      user_id:     Uuid::new_v4(),
      external_id: "1234".into(),
      name:        " ".into(),
      category:    None,
      address:     None,
      url:         Some("ftp://example.com".into()),
    };
    let errors = input.validate().unwrap_err();
    assert_eq!(errors.fields(), vec!["name", "url"]);
    assert_eq!(
      errors.to_string(),
      "name: must not be empty; url: must be an http(s) URL"
    );
  }
}
