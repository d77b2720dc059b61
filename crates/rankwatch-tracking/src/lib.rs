//! Tracking use cases for rankwatch.
//!
//! A [`Tracker`] owns a handle to a [`TrackingStore`] and exposes one method
//! per use case. Every write re-resolves its parent entity and re-checks the
//! gating predicate against the parent's current state; nothing is cached.
//! Inputs are expected to have passed [`rankwatch_core::validate::Validate`]
//! already; the API adapter and the ingest path both do so.
//!
//! The `record_*` writes save the fact before running the notification
//! trigger. If the trigger fails the error is returned but the fact is
//! already stored, so a caller must not retry the write.

mod competitors;
mod ingest;
mod keywords;
mod notify;
mod places;
mod reviews;
mod users;

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use rankwatch_core::{
  Error, Resource, Result,
  entity::FactParent,
  fact::{DateRange, Fact},
  store::{FactRepository, TrackingStore},
  validate::Validate as _,
};

pub use ingest::{IngestOutcome, ScrapeRecord, ScrapeTarget};
pub use keywords::AddPlaceKeyword;
pub use reviews::{ReviewQuery, ReviewSummary, SentimentCounts, TypeCounts};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Tunables supplied by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingPolicy {
  /// History limit when the caller gives none.
  pub default_history_limit: usize,
  /// Upper bound on any caller-supplied limit.
  pub max_history_limit:     usize,
  /// Whether recorded facts are fed to the notification trigger.
  pub notify:                bool,
}

impl Default for TrackingPolicy {
  fn default() -> Self {
    Self { default_history_limit: 100, max_history_limit: 1000, notify: true }
  }
}

impl TrackingPolicy {
  pub fn limit(&self, requested: Option<usize>) -> usize {
    requested
      .unwrap_or(self.default_history_limit)
      .min(self.max_history_limit)
  }
}

/// Either a time window or a recency limit. With a range, the limit (if any)
/// caps the range result; without one, it selects the most recent facts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryQuery {
  pub range: Option<DateRange>,
  pub limit: Option<usize>,
}

impl HistoryQuery {
  pub fn recent(limit: usize) -> Self { Self { range: None, limit: Some(limit) } }

  pub fn between(range: DateRange) -> Self { Self { range: Some(range), limit: None } }
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

pub struct Tracker<S> {
  store:  Arc<S>,
  policy: TrackingPolicy,
}

impl<S> Clone for Tracker<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), policy: self.policy }
  }
}

impl<S: TrackingStore> Tracker<S> {
  pub fn new(store: Arc<S>, policy: TrackingPolicy) -> Self {
    Self { store, policy }
  }

  /// Facts for one parent per `query`, newest first.
  async fn history<F: Fact>(
    &self,
    parent_id: Uuid,
    query: &HistoryQuery,
  ) -> Result<Vec<F>>
  where
    S: FactRepository<F>,
  {
    let store = &*self.store;
    match query.range {
      Some(range) => {
        range.validate()?;
        let mut facts =
          <S as FactRepository<F>>::find_in_range(store, parent_id, range)
            .await
            .map_err(Error::store)?;
        if query.limit.is_some() {
          facts.truncate(self.policy.limit(query.limit));
        }
        Ok(facts)
      }
      None => {
        let limit = self.policy.limit(query.limit);
        <S as FactRepository<F>>::find_by_parent(store, parent_id, limit)
          .await
          .map_err(Error::store)
      }
    }
  }

  async fn latest<F: Fact>(&self, parent_id: Uuid) -> Result<Option<F>>
  where
    S: FactRepository<F>,
  {
    <S as FactRepository<F>>::find_latest(&*self.store, parent_id)
      .await
      .map_err(Error::store)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Turn a point-lookup miss into [`Error::NotFound`].
fn require<T>(found: Option<T>, resource: Resource, id: Uuid) -> Result<T> {
  found.ok_or(Error::NotFound(resource, id))
}

/// Check the write gate of a fact parent.
fn gate<P: FactParent>(parent: &P) -> Result<()> {
  if parent.accepts_facts() {
    return Ok(());
  }
  warn!(resource = %P::RESOURCE, id = %parent.id(), "rejected write to inactive parent");
  Err(Error::InvalidState(format!(
    "{} {} is inactive",
    P::RESOURCE,
    parent.id()
  )))
}

#[cfg(test)]
mod tests;
