//! Store traits: the entity store, the generic fact repository, and the
//! notification store.
//!
//! Traits are implemented by storage backends (e.g. `rankwatch-store-sqlite`).
//! The tracking use cases depend on these abstractions, not on any concrete
//! backend.
//!
//! Point lookups return `Ok(None)` on a miss; callers decide whether absence
//! is fatal. Patch-style updates likewise return `Ok(None)` when the id does
//! not exist.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  entity::{
    Competitor, CompetitorUpdate, Keyword, NewCompetitor, NewPlace,
    NewPlaceKeyword, NewUser, Place, PlaceKeyword, PlaceKeywordDetail,
    PlaceUpdate, User,
  },
  fact::{DateRange, Fact, Review, Sentiment},
  notification::{
    DeliveryOutcome, NewNotificationLog, NewNotificationSetting,
    NotificationLog, NotificationSetting, NotificationSettingUpdate,
    NotificationType,
  },
};

// ─── Backend ─────────────────────────────────────────────────────────────────

/// Errors surfaced by a backend must distinguish uniqueness violations from
/// every other failure.
pub trait StoreFailure: std::error::Error + Send + Sync + 'static {
  fn is_unique_violation(&self) -> bool;
}

/// Shared by every store trait so a single backend has a single error type.
pub trait StoreBackend: Send + Sync {
  type Error: StoreFailure;
}

// ─── Entities ────────────────────────────────────────────────────────────────

/// Canonical records and their uniqueness-checked lookups.
pub trait EntityStore: StoreBackend {
  // ── Users ─────────────────────────────────────────────────────────────

  /// Insert a user. The email is stored normalised; a duplicate email is a
  /// unique violation.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Places ────────────────────────────────────────────────────────────

  fn create_place(
    &self,
    input: NewPlace,
  ) -> impl Future<Output = Result<Place, Self::Error>> + Send + '_;

  fn get_place(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Place>, Self::Error>> + Send + '_;

  fn find_place_by_external_id<'a>(
    &'a self,
    external_id: &'a str,
  ) -> impl Future<Output = Result<Option<Place>, Self::Error>> + Send + 'a;

  /// Places owned by `user_id`, oldest first.
  fn list_places(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Place>, Self::Error>> + Send + '_;

  fn update_place(
    &self,
    id: Uuid,
    patch: PlaceUpdate,
  ) -> impl Future<Output = Result<Option<Place>, Self::Error>> + Send + '_;

  // ── Keywords ──────────────────────────────────────────────────────────

  /// Return the keyword with exactly this (already normalised) text,
  /// creating it if needed. Atomic with respect to concurrent callers.
  fn find_or_create_keyword(
    &self,
    normalized: String,
  ) -> impl Future<Output = Result<Keyword, Self::Error>> + Send + '_;

  fn get_keyword(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Keyword>, Self::Error>> + Send + '_;

  // ── Place keywords ────────────────────────────────────────────────────

  /// Insert an active place keyword. A duplicate (place, keyword, region)
  /// triple is a unique violation.
  fn create_place_keyword(
    &self,
    input: NewPlaceKeyword,
  ) -> impl Future<Output = Result<PlaceKeyword, Self::Error>> + Send + '_;

  /// Plain lookup; relations are not populated.
  fn get_place_keyword(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<PlaceKeyword>, Self::Error>> + Send + '_;

  /// Lookup with keyword text and place name joined in.
  fn get_place_keyword_detail(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<PlaceKeywordDetail>, Self::Error>>
  + Send
  + '_;

  /// Lookup by the uniqueness triple; an absent region matches the blank one.
  fn find_place_keyword(
    &self,
    place_id: Uuid,
    keyword_id: Uuid,
    region: Option<String>,
  ) -> impl Future<Output = Result<Option<PlaceKeyword>, Self::Error>> + Send + '_;

  /// All keywords tracked for a place, with relations populated.
  fn list_place_keywords(
    &self,
    place_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PlaceKeywordDetail>, Self::Error>>
  + Send
  + '_;

  fn set_place_keyword_active(
    &self,
    id: Uuid,
    is_active: bool,
  ) -> impl Future<Output = Result<Option<PlaceKeyword>, Self::Error>> + Send + '_;

  // ── Competitors ───────────────────────────────────────────────────────

  /// Insert an active competitor. A duplicate (place, external id) pair is a
  /// unique violation.
  fn create_competitor(
    &self,
    input: NewCompetitor,
  ) -> impl Future<Output = Result<Competitor, Self::Error>> + Send + '_;

  fn get_competitor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Competitor>, Self::Error>> + Send + '_;

  fn find_competitor<'a>(
    &'a self,
    place_id: Uuid,
    external_id: &'a str,
  ) -> impl Future<Output = Result<Option<Competitor>, Self::Error>> + Send + 'a;

  fn list_competitors(
    &self,
    place_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Competitor>, Self::Error>> + Send + '_;

  fn update_competitor(
    &self,
    id: Uuid,
    patch: CompetitorUpdate,
  ) -> impl Future<Output = Result<Option<Competitor>, Self::Error>> + Send + '_;
}

// ─── Facts ───────────────────────────────────────────────────────────────────

/// The append-only repository contract, implemented once per fact type.
///
/// Every sequence is ordered by observation timestamp descending, with later
/// inserts first among equal timestamps.
pub trait FactRepository<F: Fact>: StoreBackend {
  /// Pure insert. The store assigns the id and `created_at`.
  fn save_fact(
    &self,
    input: F::New,
  ) -> impl Future<Output = Result<F, Self::Error>> + Send + '_;

  /// The `limit` most recent facts for a parent.
  fn find_by_parent(
    &self,
    parent_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<F>, Self::Error>> + Send + '_;

  /// Every fact for a parent observed within the inclusive range.
  fn find_in_range(
    &self,
    parent_id: Uuid,
    range: DateRange,
  ) -> impl Future<Output = Result<Vec<F>, Self::Error>> + Send + '_;

  fn find_latest(
    &self,
    parent_id: Uuid,
  ) -> impl Future<Output = Result<Option<F>, Self::Error>> + Send + '_;

  /// The fact directly before a stored `fact` of the same parent in
  /// observation order, regardless of when either was inserted.
  fn find_previous<'a>(
    &'a self,
    fact: &'a F,
  ) -> impl Future<Output = Result<Option<F>, Self::Error>> + Send + 'a;
}

/// Review-specific predicates over the same ordering contract.
pub trait ReviewStore: FactRepository<Review> {
  fn find_review_by_external_id<'a>(
    &'a self,
    place_id: Uuid,
    external_review_id: &'a str,
  ) -> impl Future<Output = Result<Option<Review>, Self::Error>> + Send + 'a;

  fn find_reviews_by_sentiment(
    &self,
    place_id: Uuid,
    sentiment: Sentiment,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + '_;

  /// Every review collected at or after `since`.
  fn find_reviews_since(
    &self,
    place_id: Uuid,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + '_;
}

// ─── Notifications ───────────────────────────────────────────────────────────

pub trait NotificationStore: StoreBackend {
  fn create_setting(
    &self,
    input: NewNotificationSetting,
  ) -> impl Future<Output = Result<NotificationSetting, Self::Error>> + Send + '_;

  fn get_setting(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<NotificationSetting>, Self::Error>>
  + Send
  + '_;

  fn list_settings(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<NotificationSetting>, Self::Error>>
  + Send
  + '_;

  fn update_setting(
    &self,
    id: Uuid,
    patch: NotificationSettingUpdate,
  ) -> impl Future<Output = Result<Option<NotificationSetting>, Self::Error>>
  + Send
  + '_;

  /// Enabled settings of `user_id` for `kind` that cover `place_id`, either
  /// by naming it or by naming no place at all.
  fn find_enabled_settings(
    &self,
    user_id: Uuid,
    place_id: Uuid,
    kind: NotificationType,
  ) -> impl Future<Output = Result<Vec<NotificationSetting>, Self::Error>>
  + Send
  + '_;

  fn insert_log(
    &self,
    input: NewNotificationLog,
  ) -> impl Future<Output = Result<NotificationLog, Self::Error>> + Send + '_;

  fn get_log(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<NotificationLog>, Self::Error>> + Send + '_;

  /// Unsent, not-yet-failed logs, oldest first.
  fn pending_logs(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<NotificationLog>, Self::Error>> + Send + '_;

  /// Complete a log entry. `None` when the entry is missing or was already
  /// completed.
  fn record_delivery(
    &self,
    id: Uuid,
    outcome: DeliveryOutcome,
  ) -> impl Future<Output = Result<Option<NotificationLog>, Self::Error>> + Send + '_;
}

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// Everything the tracking use cases need from one backend.
pub trait TrackingStore:
  EntityStore
  + FactRepository<crate::fact::RankingHistory>
  + FactRepository<crate::fact::ReviewHistory>
  + FactRepository<crate::fact::CompetitorSnapshot>
  + ReviewStore
  + NotificationStore
{
}

impl<T> TrackingStore for T where
  T: EntityStore
    + FactRepository<crate::fact::RankingHistory>
    + FactRepository<crate::fact::ReviewHistory>
    + FactRepository<crate::fact::CompetitorSnapshot>
    + ReviewStore
    + NotificationStore
{
}
