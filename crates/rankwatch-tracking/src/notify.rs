//! The notification trigger, notification settings, and delivery reporting.

use tracing::{debug, info, warn};
use uuid::Uuid;

use rankwatch_core::{
  Error, Resource, Result,
  entity::Place,
  fact::Fact,
  notification::{
    Condition, DeliveryOutcome, Measured, NewNotificationLog,
    NewNotificationSetting, NotificationLog, NotificationSetting,
    NotificationSettingUpdate, evaluate_conditions, render_message,
  },
  store::{FactRepository, TrackingStore},
};

use crate::{Tracker, require};

impl<S: TrackingStore> Tracker<S> {
  /// Persist a fact and, when notifications are enabled, run the trigger.
  ///
  /// `changed` conditions compare against the fact directly before this one
  /// in observation order, so a late-recorded older observation is compared
  /// with its own predecessor rather than with the newest fact.
  ///
  /// An error from the trigger is returned after the fact was already
  /// saved. Retrying the write would record the observation twice.
  pub(crate) async fn append<F>(
    &self,
    parent_id: Uuid,
    place: &Place,
    subject: &str,
    input: F::New,
  ) -> Result<F>
  where
    F: Fact + Measured,
    S: FactRepository<F>,
  {
    let fact = <S as FactRepository<F>>::save_fact(&*self.store, input)
      .await
      .map_err(Error::store)?;
    info!(
      kind = F::NOTIFICATION_TYPE.as_ref(),
      fact_id = %fact.fact_id(),
      parent_id = %parent_id,
      "recorded fact"
    );

    if self.policy.notify {
      let triggered = async {
        let previous = <S as FactRepository<F>>::find_previous(&*self.store, &fact)
          .await
          .map_err(Error::store)?;
        self.trigger(place, subject, &fact, previous.as_ref()).await
      };
      if let Err(error) = triggered.await {
        warn!(
          fact_id = %fact.fact_id(),
          %error,
          "fact recorded but notification trigger failed"
        );
        return Err(error);
      }
    }
    Ok(fact)
  }

  /// Evaluate a freshly recorded fact against the enabled settings of the
  /// place owner and append one log entry per setting that fires.
  pub(crate) async fn trigger<F: Measured>(
    &self,
    place: &Place,
    subject: &str,
    fact: &F,
    previous: Option<&F>,
  ) -> Result<Vec<NotificationLog>> {
    let kind = F::NOTIFICATION_TYPE;
    let settings = self
      .store
      .find_enabled_settings(place.user_id, place.place_id, kind)
      .await
      .map_err(Error::store)?;

    let mut logs = Vec::new();
    for setting in settings {
      let conditions = match Condition::parse_all(&setting.conditions) {
        Ok(conditions) => conditions,
        Err(errors) => {
          warn!(setting_id = %setting.setting_id, %errors, "skipping setting with unreadable conditions");
          continue;
        }
      };
      let Some(matches) = evaluate_conditions(&conditions, fact, previous) else {
        continue;
      };

      let log = self
        .store
        .insert_log(NewNotificationLog {
          setting_id: setting.setting_id,
          place_id:   place.place_id,
          message:    render_message(subject, kind, &matches),
        })
        .await
        .map_err(Error::store)?;
      info!(
        log_id = %log.log_id,
        setting_id = %setting.setting_id,
        channel = setting.channel.as_ref(),
        "queued notification"
      );
      logs.push(log);
    }
    Ok(logs)
  }

  // ─── Settings ──────────────────────────────────────────────────────────

  /// The place, if given, must exist and belong to the same user.
  pub async fn create_notification_setting(
    &self,
    input: NewNotificationSetting,
  ) -> Result<NotificationSetting> {
    let user = self.store.get_user(input.user_id).await.map_err(Error::store)?;
    require(user, Resource::User, input.user_id)?;

    if let Some(place_id) = input.place_id {
      let place = self.store.get_place(place_id).await.map_err(Error::store)?;
      let place = require(place, Resource::Place, place_id)?;
      if place.user_id != input.user_id {
        return Err(Error::InvalidState(format!(
          "place {place_id} does not belong to user {}",
          input.user_id
        )));
      }
    }

    let setting = self.store.create_setting(input).await.map_err(Error::store)?;
    info!(
      setting_id = %setting.setting_id,
      kind = setting.notification_type.as_ref(),
      "created notification setting"
    );
    Ok(setting)
  }

  pub async fn update_notification_setting(
    &self,
    id: Uuid,
    patch: NotificationSettingUpdate,
  ) -> Result<NotificationSetting> {
    let updated = self.store.update_setting(id, patch).await.map_err(Error::store)?;
    let setting = require(updated, Resource::NotificationSetting, id)?;
    info!(setting_id = %id, "updated notification setting");
    Ok(setting)
  }

  pub async fn list_notification_settings(
    &self,
    user_id: Uuid,
  ) -> Result<Vec<NotificationSetting>> {
    let user = self.store.get_user(user_id).await.map_err(Error::store)?;
    require(user, Resource::User, user_id)?;
    debug!(%user_id, "listing notification settings");
    self.store.list_settings(user_id).await.map_err(Error::store)
  }

  // ─── Delivery ──────────────────────────────────────────────────────────

  /// Undelivered log entries, oldest first.
  pub async fn pending_notifications(
    &self,
    limit: Option<usize>,
  ) -> Result<Vec<NotificationLog>> {
    let limit = self.policy.limit(limit);
    self.store.pending_logs(limit).await.map_err(Error::store)
  }

  /// Record what the delivery collaborator reported. A log entry is
  /// completed at most once.
  pub async fn complete_delivery(
    &self,
    log_id: Uuid,
    outcome: DeliveryOutcome,
  ) -> Result<NotificationLog> {
    let log = self.store.get_log(log_id).await.map_err(Error::store)?;
    let log = require(log, Resource::NotificationLog, log_id)?;
    if log.is_sent || log.error_message.is_some() {
      return Err(Error::InvalidState(format!(
        "notification {log_id} was already completed"
      )));
    }

    let updated = self
      .store
      .record_delivery(log_id, outcome)
      .await
      .map_err(Error::store)?;
    // A concurrent report can complete the entry after the check above.
    let Some(log) = updated else {
      return Err(Error::InvalidState(format!(
        "notification {log_id} was already completed"
      )));
    };
    info!(%log_id, sent = log.is_sent, "recorded delivery outcome");
    Ok(log)
  }
}
