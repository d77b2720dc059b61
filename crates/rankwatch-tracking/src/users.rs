use tracing::{debug, info};
use uuid::Uuid;

use rankwatch_core::{
  Error, Resource, Result,
  entity::{NewUser, User},
  store::TrackingStore,
};

use crate::{Tracker, require};

impl<S: TrackingStore> Tracker<S> {
  /// Emails are unique after normalisation.
  pub async fn register_user(&self, input: NewUser) -> Result<User> {
    let existing = self
      .store
      .find_user_by_email(&input.email)
      .await
      .map_err(Error::store)?;
    if let Some(user) = existing {
      return Err(Error::Conflict(format!(
        "email {} is already registered",
        user.email
      )));
    }

    let user = self.store.create_user(input).await.map_err(Error::store)?;
    info!(user_id = %user.user_id, "registered user");
    Ok(user)
  }

  pub async fn get_user(&self, id: Uuid) -> Result<User> {
    debug!(user_id = %id, "fetching user");
    let user = self.store.get_user(id).await.map_err(Error::store)?;
    require(user, Resource::User, id)
  }
}
