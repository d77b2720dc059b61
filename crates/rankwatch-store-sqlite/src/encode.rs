//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (nanosecond
//! precision, `Z` suffix) so that lexicographic order is chronological order.
//! Enums are stored as their SCREAMING_SNAKE_CASE names. UUIDs are stored as
//! hyphenated lowercase strings. Condition payloads are compact JSON.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rankwatch_core::{
  entity::{Competitor, Keyword, Place, PlaceKeyword, PlaceKeywordDetail, User},
  fact::{CompetitorSnapshot, RankingHistory, Review, ReviewHistory},
  notification::{ConditionMap, NotificationLog, NotificationSetting},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

/// Parse a stored enum name, reporting the column on failure.
pub fn decode_variant<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownVariant { column, value: s.to_owned() })
}

pub fn encode_region(region: Option<&str>) -> String {
  region.unwrap_or_default().to_owned()
}

pub fn decode_region(s: String) -> Option<String> {
  if s.is_empty() { None } else { Some(s) }
}

pub fn encode_conditions(conditions: &ConditionMap) -> Result<String> {
  Ok(serde_json::to_string(conditions)?)
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "user_id, email, name, is_active, created_at, updated_at";

pub struct RawUser {
  pub user_id:    String,
  pub email:      String,
  pub name:       String,
  pub is_active:  bool,
  pub created_at: String,
  pub updated_at: String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      email:      row.get(1)?,
      name:       row.get(2)?,
      is_active:  row.get(3)?,
      created_at: row.get(4)?,
      updated_at: row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      email:      self.email,
      name:       self.name,
      is_active:  self.is_active,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Places ──────────────────────────────────────────────────────────────────

pub const PLACE_COLUMNS: &str = "place_id, user_id, external_id, name, category, \
                                 address, url, is_active, created_at, updated_at";

pub struct RawPlace {
  pub place_id:    String,
  pub user_id:     String,
  pub external_id: String,
  pub name:        String,
  pub category:    Option<String>,
  pub address:     Option<String>,
  pub url:         Option<String>,
  pub is_active:   bool,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawPlace {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      place_id:    row.get(0)?,
      user_id:     row.get(1)?,
      external_id: row.get(2)?,
      name:        row.get(3)?,
      category:    row.get(4)?,
      address:     row.get(5)?,
      url:         row.get(6)?,
      is_active:   row.get(7)?,
      created_at:  row.get(8)?,
      updated_at:  row.get(9)?,
    })
  }

  pub fn into_place(self) -> Result<Place> {
    Ok(Place {
      place_id:    decode_uuid(&self.place_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      external_id: self.external_id,
      name:        self.name,
      category:    self.category,
      address:     self.address,
      url:         self.url,
      is_active:   self.is_active,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Keywords ────────────────────────────────────────────────────────────────

pub const KEYWORD_COLUMNS: &str = "keyword_id, text, created_at";

pub struct RawKeyword {
  pub keyword_id: String,
  pub text:       String,
  pub created_at: String,
}

impl RawKeyword {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      keyword_id: row.get(0)?,
      text:       row.get(1)?,
      created_at: row.get(2)?,
    })
  }

  pub fn into_keyword(self) -> Result<Keyword> {
    Ok(Keyword {
      keyword_id: decode_uuid(&self.keyword_id)?,
      text:       self.text,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

// ─── Place keywords ──────────────────────────────────────────────────────────

pub const PLACE_KEYWORD_COLUMNS: &str = "pk.place_keyword_id, pk.place_id, \
                                         pk.keyword_id, pk.region, pk.is_active, \
                                         pk.created_at, pk.updated_at";

pub struct RawPlaceKeyword {
  pub place_keyword_id: String,
  pub place_id:         String,
  pub keyword_id:       String,
  pub region:           String,
  pub is_active:        bool,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawPlaceKeyword {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      place_keyword_id: row.get(0)?,
      place_id:         row.get(1)?,
      keyword_id:       row.get(2)?,
      region:           row.get(3)?,
      is_active:        row.get(4)?,
      created_at:       row.get(5)?,
      updated_at:       row.get(6)?,
    })
  }

  pub fn into_place_keyword(self) -> Result<PlaceKeyword> {
    Ok(PlaceKeyword {
      place_keyword_id: decode_uuid(&self.place_keyword_id)?,
      place_id:         decode_uuid(&self.place_id)?,
      keyword_id:       decode_uuid(&self.keyword_id)?,
      region:           decode_region(self.region),
      is_active:        self.is_active,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

/// A place keyword row followed by `k.text, p.name` from the joins.
pub struct RawPlaceKeywordDetail {
  pub place_keyword: RawPlaceKeyword,
  pub keyword:       String,
  pub place_name:    String,
}

impl RawPlaceKeywordDetail {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      place_keyword: RawPlaceKeyword::from_row(row)?,
      keyword:       row.get(7)?,
      place_name:    row.get(8)?,
    })
  }

  pub fn into_detail(self) -> Result<PlaceKeywordDetail> {
    Ok(PlaceKeywordDetail {
      place_keyword: self.place_keyword.into_place_keyword()?,
      keyword:       self.keyword,
      place_name:    self.place_name,
    })
  }
}

// ─── Competitors ─────────────────────────────────────────────────────────────

pub const COMPETITOR_COLUMNS: &str = "competitor_id, place_id, external_id, name, \
                                      category, is_active, created_at, updated_at";

pub struct RawCompetitor {
  pub competitor_id: String,
  pub place_id:      String,
  pub external_id:   String,
  pub name:          String,
  pub category:      Option<String>,
  pub is_active:     bool,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawCompetitor {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      competitor_id: row.get(0)?,
      place_id:      row.get(1)?,
      external_id:   row.get(2)?,
      name:          row.get(3)?,
      category:      row.get(4)?,
      is_active:     row.get(5)?,
      created_at:    row.get(6)?,
      updated_at:    row.get(7)?,
    })
  }

  pub fn into_competitor(self) -> Result<Competitor> {
    Ok(Competitor {
      competitor_id: decode_uuid(&self.competitor_id)?,
      place_id:      decode_uuid(&self.place_id)?,
      external_id:   self.external_id,
      name:          self.name,
      category:      self.category,
      is_active:     self.is_active,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Facts ───────────────────────────────────────────────────────────────────

pub struct RawRanking {
  pub ranking_id:          String,
  pub place_keyword_id:    String,
  pub rank:                Option<u32>,
  pub search_result_count: Option<u32>,
  pub checked_at:          String,
  pub created_at:          String,
}

impl RawRanking {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ranking_id:          row.get(0)?,
      place_keyword_id:    row.get(1)?,
      rank:                row.get(2)?,
      search_result_count: row.get(3)?,
      checked_at:          row.get(4)?,
      created_at:          row.get(5)?,
    })
  }

  pub fn into_ranking(self) -> Result<RankingHistory> {
    Ok(RankingHistory {
      ranking_id:          decode_uuid(&self.ranking_id)?,
      place_keyword_id:    decode_uuid(&self.place_keyword_id)?,
      rank:                self.rank,
      search_result_count: self.search_result_count,
      checked_at:          decode_dt(&self.checked_at)?,
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawReviewHistory {
  pub review_history_id:    String,
  pub place_id:             String,
  pub blog_review_count:    u32,
  pub visitor_review_count: u32,
  pub average_rating:       Option<f64>,
  pub checked_at:           String,
  pub created_at:           String,
}

impl RawReviewHistory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      review_history_id:    row.get(0)?,
      place_id:             row.get(1)?,
      blog_review_count:    row.get(2)?,
      visitor_review_count: row.get(3)?,
      average_rating:       row.get(4)?,
      checked_at:           row.get(5)?,
      created_at:           row.get(6)?,
    })
  }

  pub fn into_review_history(self) -> Result<ReviewHistory> {
    Ok(ReviewHistory {
      review_history_id:    decode_uuid(&self.review_history_id)?,
      place_id:             decode_uuid(&self.place_id)?,
      blog_review_count:    self.blog_review_count,
      visitor_review_count: self.visitor_review_count,
      average_rating:       self.average_rating,
      checked_at:           decode_dt(&self.checked_at)?,
      created_at:           decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawSnapshot {
  pub snapshot_id:          String,
  pub competitor_id:        String,
  pub rank:                 Option<u32>,
  pub blog_review_count:    Option<u32>,
  pub visitor_review_count: Option<u32>,
  pub average_rating:       Option<f64>,
  pub checked_at:           String,
  pub created_at:           String,
}

impl RawSnapshot {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      snapshot_id:          row.get(0)?,
      competitor_id:        row.get(1)?,
      rank:                 row.get(2)?,
      blog_review_count:    row.get(3)?,
      visitor_review_count: row.get(4)?,
      average_rating:       row.get(5)?,
      checked_at:           row.get(6)?,
      created_at:           row.get(7)?,
    })
  }

  pub fn into_snapshot(self) -> Result<CompetitorSnapshot> {
    Ok(CompetitorSnapshot {
      snapshot_id:          decode_uuid(&self.snapshot_id)?,
      competitor_id:        decode_uuid(&self.competitor_id)?,
      rank:                 self.rank,
      blog_review_count:    self.blog_review_count,
      visitor_review_count: self.visitor_review_count,
      average_rating:       self.average_rating,
      checked_at:           decode_dt(&self.checked_at)?,
      created_at:           decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawReview {
  pub review_id:          String,
  pub place_id:           String,
  pub review_type:        String,
  pub content:            Option<String>,
  pub author:             Option<String>,
  pub rating:             Option<u8>,
  pub sentiment:          Option<String>,
  pub sentiment_score:    Option<f64>,
  pub external_review_id: Option<String>,
  pub published_at:       Option<String>,
  pub collected_at:       String,
  pub created_at:         String,
}

impl RawReview {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      review_id:          row.get(0)?,
      place_id:           row.get(1)?,
      review_type:        row.get(2)?,
      content:            row.get(3)?,
      author:             row.get(4)?,
      rating:             row.get(5)?,
      sentiment:          row.get(6)?,
      sentiment_score:    row.get(7)?,
      external_review_id: row.get(8)?,
      published_at:       row.get(9)?,
      collected_at:       row.get(10)?,
      created_at:         row.get(11)?,
    })
  }

  pub fn into_review(self) -> Result<Review> {
    Ok(Review {
      review_id:          decode_uuid(&self.review_id)?,
      place_id:           decode_uuid(&self.place_id)?,
      review_type:        decode_variant("review_type", &self.review_type)?,
      content:            self.content,
      author:             self.author,
      rating:             self.rating,
      sentiment:          self
        .sentiment
        .as_deref()
        .map(|s| decode_variant("sentiment", s))
        .transpose()?,
      sentiment_score:    self.sentiment_score,
      external_review_id: self.external_review_id,
      published_at:       decode_opt_dt(self.published_at.as_deref())?,
      collected_at:       decode_dt(&self.collected_at)?,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

// ─── Notifications ───────────────────────────────────────────────────────────

pub const SETTING_COLUMNS: &str = "setting_id, user_id, place_id, \
                                   notification_type, channel, is_enabled, \
                                   conditions, created_at, updated_at";

pub struct RawSetting {
  pub setting_id:        String,
  pub user_id:           String,
  pub place_id:          Option<String>,
  pub notification_type: String,
  pub channel:           String,
  pub is_enabled:        bool,
  pub conditions:        String,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawSetting {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      setting_id:        row.get(0)?,
      user_id:           row.get(1)?,
      place_id:          row.get(2)?,
      notification_type: row.get(3)?,
      channel:           row.get(4)?,
      is_enabled:        row.get(5)?,
      conditions:        row.get(6)?,
      created_at:        row.get(7)?,
      updated_at:        row.get(8)?,
    })
  }

  pub fn into_setting(self) -> Result<NotificationSetting> {
    Ok(NotificationSetting {
      setting_id:        decode_uuid(&self.setting_id)?,
      user_id:           decode_uuid(&self.user_id)?,
      place_id:          decode_opt_uuid(self.place_id.as_deref())?,
      notification_type: decode_variant(
        "notification_type",
        &self.notification_type,
      )?,
      channel:           decode_variant("channel", &self.channel)?,
      is_enabled:        self.is_enabled,
      conditions:        serde_json::from_str(&self.conditions)?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

pub const LOG_COLUMNS: &str = "log_id, setting_id, place_id, message, is_sent, \
                               sent_at, error_message, created_at";

pub struct RawLog {
  pub log_id:        String,
  pub setting_id:    String,
  pub place_id:      String,
  pub message:       String,
  pub is_sent:       bool,
  pub sent_at:       Option<String>,
  pub error_message: Option<String>,
  pub created_at:    String,
}

impl RawLog {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      log_id:        row.get(0)?,
      setting_id:    row.get(1)?,
      place_id:      row.get(2)?,
      message:       row.get(3)?,
      is_sent:       row.get(4)?,
      sent_at:       row.get(5)?,
      error_message: row.get(6)?,
      created_at:    row.get(7)?,
    })
  }

  pub fn into_log(self) -> Result<NotificationLog> {
    Ok(NotificationLog {
      log_id:        decode_uuid(&self.log_id)?,
      setting_id:    decode_uuid(&self.setting_id)?,
      place_id:      decode_uuid(&self.place_id)?,
      message:       self.message,
      is_sent:       self.is_sent,
      sent_at:       decode_opt_dt(self.sent_at.as_deref())?,
      error_message: self.error_message,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}
