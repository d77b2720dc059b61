//! Place lifecycle: creation under an owner, patching, soft deletion.

use tracing::{debug, info};
use uuid::Uuid;

use rankwatch_core::{
  Error, Resource, Result,
  entity::{NewPlace, Place, PlaceUpdate},
  store::TrackingStore,
};

use crate::{Tracker, require};

impl<S: TrackingStore> Tracker<S> {
  pub async fn create_place(&self, input: NewPlace) -> Result<Place> {
    let owner = self.store.get_user(input.user_id).await.map_err(Error::store)?;
    require(owner, Resource::User, input.user_id)?;

    let existing = self
      .store
      .find_place_by_external_id(&input.external_id)
      .await
      .map_err(Error::store)?;
    if existing.is_some() {
      return Err(Error::Conflict(format!(
        "place with external id {} already exists",
        input.external_id
      )));
    }

    let place = self.store.create_place(input).await.map_err(Error::store)?;
    info!(place_id = %place.place_id, external_id = %place.external_id, "created place");
    Ok(place)
  }

  pub async fn get_place(&self, id: Uuid) -> Result<Place> {
    debug!(place_id = %id, "fetching place");
    let place = self.store.get_place(id).await.map_err(Error::store)?;
    require(place, Resource::Place, id)
  }

  pub async fn list_places(&self, user_id: Uuid) -> Result<Vec<Place>> {
    self.get_user(user_id).await?;
    self.store.list_places(user_id).await.map_err(Error::store)
  }

  pub async fn update_place(&self, id: Uuid, patch: PlaceUpdate) -> Result<Place> {
    let updated = self.store.update_place(id, patch).await.map_err(Error::store)?;
    let place = require(updated, Resource::Place, id)?;
    info!(place_id = %id, is_active = place.is_active, "updated place");
    Ok(place)
  }

  /// Soft delete: the place keeps its history but accepts no new facts.
  pub async fn deactivate_place(&self, id: Uuid) -> Result<Place> {
    self
      .update_place(id, PlaceUpdate { is_active: Some(false), ..Default::default() })
      .await
  }
}
