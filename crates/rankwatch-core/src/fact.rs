//! Fact types: the time-series half of the store.
//!
//! A fact is an immutable observation about a parent entity at a point in
//! time. Facts are only ever inserted. "Latest" is the fact with the greatest
//! observation timestamp for a parent; ties go to the most recent insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::ValidationErrors;

// ─── Common ──────────────────────────────────────────────────────────────────

/// Behaviour shared by every fact type, used by the generic repository
/// contract in [`crate::store::FactRepository`].
pub trait Fact: Clone + Send + Sync + 'static {
  /// Insert payload; carries the parent id and the observation timestamp.
  type New: Send + 'static;

  fn fact_id(&self) -> Uuid;
  fn parent_id(&self) -> Uuid;
  /// The timestamp the history is ordered by.
  fn observed_at(&self) -> DateTime<Utc>;
}

/// An inclusive `[start, end]` window over observation timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl DateRange {
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
    Self { start, end }
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.start <= at && at <= self.end
  }
}

// ─── Ranking ─────────────────────────────────────────────────────────────────

/// Search rank of a place for one tracked keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingHistory {
  pub ranking_id:          Uuid,
  pub place_keyword_id:    Uuid,
  /// `None` means the place was not found in the results.
  pub rank:                Option<u32>,
  pub search_result_count: Option<u32>,
  pub checked_at:          DateTime<Utc>,
  /// Server-assigned.
  pub created_at:          DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRanking {
  pub place_keyword_id:    Uuid,
  pub rank:                Option<u32>,
  pub search_result_count: Option<u32>,
  pub checked_at:          DateTime<Utc>,
}

impl Fact for RankingHistory {
  type New = NewRanking;

  fn fact_id(&self) -> Uuid { self.ranking_id }

  fn parent_id(&self) -> Uuid { self.place_keyword_id }

  fn observed_at(&self) -> DateTime<Utc> { self.checked_at }
}

// ─── Review counts ───────────────────────────────────────────────────────────

/// Review volume snapshot for a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewHistory {
  pub review_history_id:    Uuid,
  pub place_id:             Uuid,
  pub blog_review_count:    u32,
  pub visitor_review_count: u32,
  /// 0.0–5.0, one decimal place.
  pub average_rating:       Option<f64>,
  pub checked_at:           DateTime<Utc>,
  pub created_at:           DateTime<Utc>,
}

impl ReviewHistory {
  /// Derived on read; never stored.
  pub fn total_review_count(&self) -> u64 {
    u64::from(self.blog_review_count) + u64::from(self.visitor_review_count)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReviewHistory {
  pub place_id:             Uuid,
  pub blog_review_count:    u32,
  pub visitor_review_count: u32,
  pub average_rating:       Option<f64>,
  pub checked_at:           DateTime<Utc>,
}

impl Fact for ReviewHistory {
  type New = NewReviewHistory;

  fn fact_id(&self) -> Uuid { self.review_history_id }

  fn parent_id(&self) -> Uuid { self.place_id }

  fn observed_at(&self) -> DateTime<Utc> { self.checked_at }
}

// ─── Competitor snapshots ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorSnapshot {
  pub snapshot_id:          Uuid,
  pub competitor_id:        Uuid,
  pub rank:                 Option<u32>,
  pub blog_review_count:    Option<u32>,
  pub visitor_review_count: Option<u32>,
  pub average_rating:       Option<f64>,
  pub checked_at:           DateTime<Utc>,
  pub created_at:           DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCompetitorSnapshot {
  pub competitor_id:        Uuid,
  pub rank:                 Option<u32>,
  pub blog_review_count:    Option<u32>,
  pub visitor_review_count: Option<u32>,
  pub average_rating:       Option<f64>,
  pub checked_at:           DateTime<Utc>,
}

impl Fact for CompetitorSnapshot {
  type New = NewCompetitorSnapshot;

  fn fact_id(&self) -> Uuid { self.snapshot_id }

  fn parent_id(&self) -> Uuid { self.competitor_id }

  fn observed_at(&self) -> DateTime<Utc> { self.checked_at }
}

// ─── Individual reviews ──────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewType {
  Blog,
  Visitor,
  Other,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
  Positive,
  Negative,
  Neutral,
}

/// A single review collected from the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
  pub review_id:          Uuid,
  pub place_id:           Uuid,
  pub review_type:        ReviewType,
  pub content:            Option<String>,
  pub author:             Option<String>,
  /// 1–5.
  pub rating:             Option<u8>,
  pub sentiment:          Option<Sentiment>,
  /// −1.0..=1.0, two decimal places.
  pub sentiment_score:    Option<f64>,
  /// Deduplication key within a place, when the platform provides one.
  pub external_review_id: Option<String>,
  pub published_at:       Option<DateTime<Utc>>,
  /// When the scraper saw the review; the history is ordered by this.
  pub collected_at:       DateTime<Utc>,
  pub created_at:         DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
  pub place_id:           Uuid,
  pub review_type:        ReviewType,
  pub content:            Option<String>,
  pub author:             Option<String>,
  pub rating:             Option<u8>,
  pub sentiment:          Option<Sentiment>,
  pub sentiment_score:    Option<f64>,
  pub external_review_id: Option<String>,
  pub published_at:       Option<DateTime<Utc>>,
  pub collected_at:       DateTime<Utc>,
}

impl Fact for Review {
  type New = NewReview;

  fn fact_id(&self) -> Uuid { self.review_id }

  fn parent_id(&self) -> Uuid { self.place_id }

  fn observed_at(&self) -> DateTime<Utc> { self.collected_at }
}

// ─── Scraper output ──────────────────────────────────────────────────────────

/// One observation as produced by the external scraper. Which fields are
/// populated depends on what was scraped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservedMetrics {
  pub rank:                 Option<u32>,
  pub search_result_count:  Option<u32>,
  pub blog_review_count:    Option<u32>,
  pub visitor_review_count: Option<u32>,
  pub average_rating:       Option<f64>,
  pub observed_at:          DateTime<Utc>,
}

impl ObservedMetrics {
  pub fn to_ranking(&self, place_keyword_id: Uuid) -> NewRanking {
    NewRanking {
      place_keyword_id,
      rank: self.rank,
      search_result_count: self.search_result_count,
      checked_at: self.observed_at,
    }
  }

  /// Review-count snapshots need both counts; a scrape that missed either
  /// cannot be recorded.
  pub fn to_review_history(
    &self,
    place_id: Uuid,
  ) -> Result<NewReviewHistory, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if self.blog_review_count.is_none() {
      errors.push("blog_review_count", "required for review statistics");
    }
    if self.visitor_review_count.is_none() {
      errors.push("visitor_review_count", "required for review statistics");
    }
    errors.into_result()?;

    Ok(NewReviewHistory {
      place_id,
      blog_review_count: self.blog_review_count.unwrap_or_default(),
      visitor_review_count: self.visitor_review_count.unwrap_or_default(),
      average_rating: self.average_rating,
      checked_at: self.observed_at,
    })
  }

  pub fn to_competitor_snapshot(
    &self,
    competitor_id: Uuid,
  ) -> NewCompetitorSnapshot {
    NewCompetitorSnapshot {
      competitor_id,
      rank: self.rank,
      blog_review_count: self.blog_review_count,
      visitor_review_count: self.visitor_review_count,
      average_rating: self.average_rating,
      checked_at: self.observed_at,
    }
  }
}
