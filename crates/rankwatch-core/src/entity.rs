//! Canonical entities: users, places, keywords, tracked place keywords, and
//! competitors.
//!
//! Identity and creation timestamps are assigned by the store. Entities are
//! mutable only through explicit patch types; soft deletion is expressed by
//! clearing `is_active`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Resource;

// ─── Gating ──────────────────────────────────────────────────────────────────

/// An entity that facts are recorded against.
///
/// The gate is evaluated against the entity's *current* state on every write;
/// it is never cached.
pub trait FactParent {
  const RESOURCE: Resource;

  fn id(&self) -> Uuid;

  /// Whether new facts may be recorded against this entity right now.
  fn accepts_facts(&self) -> bool;
}

// ─── User ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  /// Stored lower-cased; unique.
  pub email:      String,
  pub name:       String,
  pub is_active:  bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub email: String,
  pub name:  String,
}

/// Emails are compared case-insensitively and without surrounding space.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

// ─── Place ───────────────────────────────────────────────────────────────────

/// A monitored listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
  pub place_id:    Uuid,
  /// Owning user; notifications for this place go to them.
  pub user_id:     Uuid,
  /// The listing id on the external platform. Unique across all places.
  pub external_id: String,
  pub name:        String,
  pub category:    Option<String>,
  pub address:     Option<String>,
  pub url:         Option<String>,
  pub is_active:   bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPlace {
  pub user_id:     Uuid,
  pub external_id: String,
  pub name:        String,
  pub category:    Option<String>,
  pub address:     Option<String>,
  pub url:         Option<String>,
}

/// Partial update for a [`Place`]. `None` leaves the attribute unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceUpdate {
  pub name:      Option<String>,
  pub category:  Option<String>,
  pub address:   Option<String>,
  pub url:       Option<String>,
  pub is_active: Option<bool>,
}

impl FactParent for Place {
  const RESOURCE: Resource = Resource::Place;

  fn id(&self) -> Uuid { self.place_id }

  fn accepts_facts(&self) -> bool { self.is_active }
}

// ─── Keyword ─────────────────────────────────────────────────────────────────

/// A search term, deduplicated globally by its normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
  pub keyword_id: Uuid,
  pub text:       String,
  pub created_at: DateTime<Utc>,
}

/// Trim, collapse inner whitespace to single spaces, and lower-case.
pub fn normalize_keyword(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

// ─── PlaceKeyword ────────────────────────────────────────────────────────────

/// The tracked pairing of a place, a keyword, and an optional region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceKeyword {
  pub place_keyword_id: Uuid,
  pub place_id:         Uuid,
  pub keyword_id:       Uuid,
  pub region:           Option<String>,
  /// Independent of the parent place's flag.
  pub is_active:        bool,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPlaceKeyword {
  pub place_id:   Uuid,
  pub keyword_id: Uuid,
  pub region:     Option<String>,
}

/// A [`PlaceKeyword`] with its keyword text and place name joined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceKeywordDetail {
  pub place_keyword: PlaceKeyword,
  pub keyword:       String,
  pub place_name:    String,
}

/// A blank region and an absent one are the same key.
pub fn normalize_region(region: Option<&str>) -> Option<String> {
  region
    .map(str::trim)
    .filter(|r| !r.is_empty())
    .map(str::to_owned)
}

impl FactParent for PlaceKeyword {
  const RESOURCE: Resource = Resource::PlaceKeyword;

  fn id(&self) -> Uuid { self.place_keyword_id }

  fn accepts_facts(&self) -> bool { self.is_active }
}

// ─── Competitor ──────────────────────────────────────────────────────────────

/// A rival listing tracked against a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
  pub competitor_id: Uuid,
  pub place_id:      Uuid,
  /// The rival's listing id on the external platform; unique per place.
  pub external_id:   String,
  pub name:          String,
  pub category:      Option<String>,
  pub is_active:     bool,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCompetitor {
  pub place_id:    Uuid,
  pub external_id: String,
  pub name:        String,
  pub category:    Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompetitorUpdate {
  pub name:      Option<String>,
  pub category:  Option<String>,
  pub is_active: Option<bool>,
}

impl FactParent for Competitor {
  const RESOURCE: Resource = Resource::Competitor;

  fn id(&self) -> Uuid { self.competitor_id }

  fn accepts_facts(&self) -> bool { self.is_active }
}
