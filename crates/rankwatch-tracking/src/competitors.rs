//! Competitors tracked against a place and their snapshots.

use tracing::{debug, info};
use uuid::Uuid;

use rankwatch_core::{
  Error, Resource, Result,
  entity::{Competitor, CompetitorUpdate, NewCompetitor},
  fact::{CompetitorSnapshot, NewCompetitorSnapshot},
  store::TrackingStore,
  view::{CompetitorSnapshotView, ViewOptions, competitor_snapshot_view},
};

use crate::{HistoryQuery, Tracker, gate, require};

impl<S: TrackingStore> Tracker<S> {
  pub async fn get_competitor(&self, id: Uuid) -> Result<Competitor> {
    let competitor = self.store.get_competitor(id).await.map_err(Error::store)?;
    require(competitor, Resource::Competitor, id)
  }

  /// The (place, external id) pair must be new.
  pub async fn add_competitor(&self, input: NewCompetitor) -> Result<Competitor> {
    let place = self.get_place(input.place_id).await?;
    let existing = self
      .store
      .find_competitor(place.place_id, &input.external_id)
      .await
      .map_err(Error::store)?;
    if existing.is_some() {
      return Err(Error::Conflict(format!(
        "competitor {} is already tracked for place {}",
        input.external_id, place.place_id
      )));
    }

    let competitor = self
      .store
      .create_competitor(input)
      .await
      .map_err(Error::store)?;
    info!(
      competitor_id = %competitor.competitor_id,
      place_id = %competitor.place_id,
      "tracking competitor"
    );
    Ok(competitor)
  }

  pub async fn list_competitors(&self, place_id: Uuid) -> Result<Vec<Competitor>> {
    self.get_place(place_id).await?;
    self.store.list_competitors(place_id).await.map_err(Error::store)
  }

  pub async fn update_competitor(
    &self,
    id: Uuid,
    patch: CompetitorUpdate,
  ) -> Result<Competitor> {
    let updated = self
      .store
      .update_competitor(id, patch)
      .await
      .map_err(Error::store)?;
    let competitor = require(updated, Resource::Competitor, id)?;
    info!(competitor_id = %id, is_active = competitor.is_active, "updated competitor");
    Ok(competitor)
  }

  // ─── Snapshots ─────────────────────────────────────────────────────────

  pub async fn record_competitor_snapshot(
    &self,
    input: NewCompetitorSnapshot,
    opts: ViewOptions,
  ) -> Result<CompetitorSnapshotView> {
    let competitor = self.get_competitor(input.competitor_id).await?;
    gate(&competitor)?;
    let place = self.get_place(competitor.place_id).await?;

    let fact = self
      .append::<CompetitorSnapshot>(
        competitor.competitor_id,
        &place,
        &competitor.name,
        input,
      )
      .await?;
    Ok(competitor_snapshot_view(&fact, Some(&competitor), opts))
  }

  pub async fn latest_competitor_snapshot(
    &self,
    competitor_id: Uuid,
    opts: ViewOptions,
  ) -> Result<Option<CompetitorSnapshotView>> {
    let competitor = self.get_competitor(competitor_id).await?;
    debug!(%competitor_id, "fetching latest competitor snapshot");
    let latest = self.latest::<CompetitorSnapshot>(competitor_id).await?;
    Ok(latest.map(|fact| competitor_snapshot_view(&fact, Some(&competitor), opts)))
  }

  pub async fn competitor_history(
    &self,
    competitor_id: Uuid,
    query: HistoryQuery,
    opts: ViewOptions,
  ) -> Result<Vec<CompetitorSnapshotView>> {
    let competitor = self.get_competitor(competitor_id).await?;
    debug!(%competitor_id, ?query, "fetching competitor history");
    let facts = self
      .history::<CompetitorSnapshot>(competitor_id, &query)
      .await?;
    Ok(
      facts
        .iter()
        .map(|fact| competitor_snapshot_view(fact, Some(&competitor), opts))
        .collect(),
    )
  }
}
