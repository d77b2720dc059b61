//! Notification settings, logs, and the condition language evaluated against
//! newly recorded facts.
//!
//! A setting's condition payload is a JSON object whose keys have the form
//! `<metric>_<op>`:
//!
//! | op | fires when |
//! |----|------------|
//! | `above` | the fact's value is strictly greater than the threshold |
//! | `below` | the fact's value is strictly less than the threshold |
//! | `changed` | the value differs from the previous fact's value (threshold ignored) |
//!
//! An empty payload fires for every recorded fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  fact::{CompetitorSnapshot, RankingHistory, Review, ReviewHistory},
  validate::ValidationErrors,
};

/// Free-form condition payload as stored on a setting.
pub type ConditionMap = serde_json::Map<String, Value>;

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
  RankingChange,
  ReviewChange,
  CompetitorChange,
  NewReview,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
  Email,
  Sms,
  Push,
  Webhook,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSetting {
  pub setting_id:        Uuid,
  pub user_id:           Uuid,
  /// `None` applies the setting to every place the user owns.
  pub place_id:          Option<Uuid>,
  pub notification_type: NotificationType,
  pub channel:           Channel,
  pub is_enabled:        bool,
  pub conditions:        ConditionMap,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

fn enabled() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct NewNotificationSetting {
  pub user_id:           Uuid,
  pub place_id:          Option<Uuid>,
  pub notification_type: NotificationType,
  pub channel:           Channel,
  #[serde(default = "enabled")]
  pub is_enabled:        bool,
  #[serde(default)]
  pub conditions:        ConditionMap,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationSettingUpdate {
  pub is_enabled: Option<bool>,
  pub channel:    Option<Channel>,
  pub conditions: Option<ConditionMap>,
}

// ─── Logs ────────────────────────────────────────────────────────────────────

/// A notification attempt. Created unsent; the delivery collaborator reports
/// the outcome later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationLog {
  pub log_id:        Uuid,
  pub setting_id:    Uuid,
  pub place_id:      Uuid,
  pub message:       String,
  pub is_sent:       bool,
  pub sent_at:       Option<DateTime<Utc>>,
  pub error_message: Option<String>,
  pub created_at:    DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotificationLog {
  pub setting_id: Uuid,
  pub place_id:   Uuid,
  pub message:    String,
}

/// What the delivery collaborator reports back for one log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
  Sent { at: DateTime<Utc> },
  Failed { error: String },
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
  Rank,
  SearchResultCount,
  BlogReviewCount,
  VisitorReviewCount,
  TotalReviewCount,
  AverageRating,
  Rating,
  SentimentScore,
}

/// A fact whose fields can be read as numeric metrics.
pub trait Measured {
  const NOTIFICATION_TYPE: NotificationType;

  /// `None` when the metric does not apply to this fact or was not observed.
  fn measure(&self, metric: Metric) -> Option<f64>;
}

fn sum(a: Option<u32>, b: Option<u32>) -> Option<f64> {
  Some(f64::from(a?) + f64::from(b?))
}

impl Measured for RankingHistory {
  const NOTIFICATION_TYPE: NotificationType = NotificationType::RankingChange;

  fn measure(&self, metric: Metric) -> Option<f64> {
    match metric {
      Metric::Rank => self.rank.map(f64::from),
      Metric::SearchResultCount => self.search_result_count.map(f64::from),
      _ => None,
    }
  }
}

impl Measured for ReviewHistory {
  const NOTIFICATION_TYPE: NotificationType = NotificationType::ReviewChange;

  fn measure(&self, metric: Metric) -> Option<f64> {
    match metric {
      Metric::BlogReviewCount => Some(f64::from(self.blog_review_count)),
      Metric::VisitorReviewCount => Some(f64::from(self.visitor_review_count)),
      Metric::TotalReviewCount => Some(self.total_review_count() as f64),
      Metric::AverageRating => self.average_rating,
      _ => None,
    }
  }
}

impl Measured for CompetitorSnapshot {
  const NOTIFICATION_TYPE: NotificationType =
    NotificationType::CompetitorChange;

  fn measure(&self, metric: Metric) -> Option<f64> {
    match metric {
      Metric::Rank => self.rank.map(f64::from),
      Metric::BlogReviewCount => self.blog_review_count.map(f64::from),
      Metric::VisitorReviewCount => self.visitor_review_count.map(f64::from),
      Metric::TotalReviewCount => {
        sum(self.blog_review_count, self.visitor_review_count)
      }
      Metric::AverageRating => self.average_rating,
      _ => None,
    }
  }
}

impl Measured for Review {
  const NOTIFICATION_TYPE: NotificationType = NotificationType::NewReview;

  fn measure(&self, metric: Metric) -> Option<f64> {
    match metric {
      Metric::Rating => self.rating.map(f64::from),
      Metric::SentimentScore => self.sentiment_score,
      _ => None,
    }
  }
}

// ─── Conditions ──────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Comparison {
  Above,
  Below,
  Changed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
  pub metric:     Metric,
  pub comparison: Comparison,
  /// Present for `above` / `below`.
  pub threshold:  Option<f64>,
}

/// A condition that fired, with the values it fired on.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionMatch {
  pub condition: Condition,
  pub current:   Option<f64>,
  pub previous:  Option<f64>,
}

impl Condition {
  pub fn parse(key: &str, value: &Value) -> Result<Self, String> {
    let (metric, op) = key
      .rsplit_once('_')
      .ok_or_else(|| "expected <metric>_<above|below|changed>".to_owned())?;
    let metric: Metric =
      metric.parse().map_err(|_| format!("unknown metric {metric:?}"))?;
    let comparison: Comparison =
      op.parse().map_err(|_| format!("unknown comparison {op:?}"))?;

    let threshold = match comparison {
      Comparison::Changed => None,
      Comparison::Above | Comparison::Below => Some(
        value
          .as_f64()
          .ok_or_else(|| "threshold must be a number".to_owned())?,
      ),
    };

    Ok(Self { metric, comparison, threshold })
  }

  /// Parse every entry of a payload, collecting all problems.
  pub fn parse_all(map: &ConditionMap) -> Result<Vec<Self>, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut conditions = Vec::with_capacity(map.len());
    for (key, value) in map {
      match Self::parse(key, value) {
        Ok(c) => conditions.push(c),
        Err(message) => errors.push(format!("conditions.{key}"), message),
      }
    }
    errors.into_result()?;
    Ok(conditions)
  }

  pub fn evaluate<M: Measured>(
    &self,
    current: &M,
    previous: Option<&M>,
  ) -> Option<ConditionMatch> {
    let now = current.measure(self.metric);
    let fired = match (self.comparison, self.threshold) {
      (Comparison::Above, Some(t)) => now.is_some_and(|v| v > t),
      (Comparison::Below, Some(t)) => now.is_some_and(|v| v < t),
      (Comparison::Changed, _) => {
        previous.is_some_and(|p| p.measure(self.metric) != now)
      }
      _ => false,
    };

    fired.then(|| ConditionMatch {
      condition: *self,
      current:   now,
      previous:  previous.and_then(|p| p.measure(self.metric)),
    })
  }
}

/// Evaluate a whole condition set. `None` means the setting does not fire;
/// an empty match list means it fires unconditionally.
pub fn evaluate_conditions<M: Measured>(
  conditions: &[Condition],
  current: &M,
  previous: Option<&M>,
) -> Option<Vec<ConditionMatch>> {
  if conditions.is_empty() {
    return Some(Vec::new());
  }
  let matches: Vec<_> = conditions
    .iter()
    .filter_map(|c| c.evaluate(current, previous))
    .collect();
  (!matches.is_empty()).then_some(matches)
}

fn show(value: Option<f64>) -> String {
  value.map_or_else(|| "none".to_owned(), |v| v.to_string())
}

impl ConditionMatch {
  pub fn describe(&self) -> String {
    let Condition { metric, comparison, threshold } = self.condition;
    match comparison {
      Comparison::Changed => format!(
        "{metric} changed from {} to {}",
        show(self.previous),
        show(self.current)
      ),
      _ => format!(
        "{metric} {comparison} {} (now {})",
        show(threshold),
        show(self.current)
      ),
    }
  }
}

/// Render the message stored on a [`NotificationLog`].
pub fn render_message(
  subject: &str,
  kind: NotificationType,
  matches: &[ConditionMatch],
) -> String {
  if matches.is_empty() {
    let what = match kind {
      NotificationType::RankingChange => "ranking check",
      NotificationType::ReviewChange => "review statistics",
      NotificationType::CompetitorChange => "competitor snapshot",
      NotificationType::NewReview => "review",
    };
    return format!("[{subject}] new {what} recorded");
  }
  let parts: Vec<String> = matches.iter().map(ConditionMatch::describe).collect();
  format!("[{subject}] {}", parts.join("; "))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn ranking(rank: Option<u32>) -> RankingHistory {
    let now = Utc::now();
    RankingHistory {
      ranking_id:          Uuid::new_v4(),
      place_keyword_id:    Uuid::nil(),
      rank,
      search_result_count: Some(250),
      checked_at:          now,
      created_at:          now,
    }
  }

  fn conditions(payload: Value) -> Vec<Condition> {
    let Value::Object(map) = payload else { panic!("object expected") };
    Condition::parse_all(&map).unwrap()
  }

  #[test]
  fn parses_multi_word_metrics() {
    let c = Condition::parse("total_review_count_changed", &Value::Bool(true))
      .unwrap();
    assert_eq!(c.metric, Metric::TotalReviewCount);
    assert_eq!(c.comparison, Comparison::Changed);
    assert_eq!(c.threshold, None);
  }

  #[test]
  fn rejects_unknown_keys_and_bad_thresholds() {
    let Value::Object(map) = json!({
      "popularity_above": 3,
      "rank_sideways": 1,
      "rank_above": "ten",
    }) else {
      unreachable!()
    };
    let errors = Condition::parse_all(&map).unwrap_err();
    assert_eq!(errors.errors().len(), 3);
  }

  #[test]
  fn above_and_below_are_strict() {
    let set = conditions(json!({ "rank_above": 10 }));
    assert!(evaluate_conditions(&set, &ranking(Some(10)), None).is_none());
    assert!(evaluate_conditions(&set, &ranking(Some(11)), None).is_some());

    let set = conditions(json!({ "rank_below": 3 }));
    assert!(evaluate_conditions(&set, &ranking(Some(3)), None).is_none());
    assert!(evaluate_conditions(&set, &ranking(Some(2)), None).is_some());
  }

  #[test]
  fn missing_value_never_crosses_a_threshold() {
    let set = conditions(json!({ "rank_above": 10, "rank_below": 3 }));
    assert!(evaluate_conditions(&set, &ranking(None), None).is_none());
  }

  #[test]
  fn changed_needs_a_previous_fact() {
    let set = conditions(json!({ "rank_changed": true }));
    let current = ranking(Some(4));
    assert!(evaluate_conditions(&set, &current, None).is_none());
    assert!(evaluate_conditions(&set, &current, Some(&ranking(Some(4)))).is_none());

    let matches =
      evaluate_conditions(&set, &current, Some(&ranking(Some(7)))).unwrap();
    assert_eq!(matches[0].describe(), "rank changed from 7 to 4");

    let dropped_out =
      evaluate_conditions(&set, &ranking(None), Some(&current)).unwrap();
    assert_eq!(dropped_out[0].describe(), "rank changed from 4 to none");
  }

  #[test]
  fn empty_payload_always_fires() {
    let matches = evaluate_conditions(&[], &ranking(Some(1)), None).unwrap();
    assert!(matches.is_empty());
    assert_eq!(
      render_message("Cafe Mori", NotificationType::RankingChange, &matches),
      "[Cafe Mori] new ranking check recorded"
    );
  }

  #[test]
  fn message_lists_every_match() {
    let set = conditions(json!({ "rank_above": 10 }));
    let matches = evaluate_conditions(&set, &ranking(Some(12)), None).unwrap();
    assert_eq!(
      render_message("Cafe Mori", NotificationType::RankingChange, &matches),
      "[Cafe Mori] rank above 10 (now 12)"
    );
  }

  #[test]
  fn competitor_total_needs_both_counts() {
    let now = Utc::now();
    let snapshot = CompetitorSnapshot {
      snapshot_id:          Uuid::new_v4(),
      competitor_id:        Uuid::nil(),
      rank:                 None,
      blog_review_count:    Some(4),
      visitor_review_count: None,
      average_rating:       None,
      checked_at:           now,
      created_at:           now,
    };
    assert_eq!(snapshot.measure(Metric::TotalReviewCount), None);
    assert_eq!(snapshot.measure(Metric::BlogReviewCount), Some(4.0));
  }
}
