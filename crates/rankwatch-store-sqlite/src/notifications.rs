//! Notification settings and the delivery log.

use chrono::Utc;
use rusqlite::types::Value;
use uuid::Uuid;

use rankwatch_core::{
  notification::{
    DeliveryOutcome, NewNotificationLog, NewNotificationSetting,
    NotificationLog, NotificationSetting, NotificationSettingUpdate,
    NotificationType,
  },
  store::NotificationStore,
};

use crate::{
  Result, SqliteStore,
  encode::{
    LOG_COLUMNS, RawLog, RawSetting, SETTING_COLUMNS, encode_conditions,
    encode_dt, encode_uuid,
  },
};

impl SqliteStore {
  async fn settings_where(
    &self,
    clause: &str,
    params: Vec<Value>,
  ) -> Result<Vec<NotificationSetting>> {
    let sql = format!(
      "SELECT {SETTING_COLUMNS} FROM notification_settings WHERE {clause}
       ORDER BY created_at, rowid"
    );
    self
      .query_all(sql, params, RawSetting::from_row)
      .await?
      .into_iter()
      .map(RawSetting::into_setting)
      .collect()
  }
}

impl NotificationStore for SqliteStore {
  async fn create_setting(
    &self,
    input: NewNotificationSetting,
  ) -> Result<NotificationSetting> {
    let now = Utc::now();
    let setting = NotificationSetting {
      setting_id:        Uuid::new_v4(),
      user_id:           input.user_id,
      place_id:          input.place_id,
      notification_type: input.notification_type,
      channel:           input.channel,
      is_enabled:        input.is_enabled,
      conditions:        input.conditions,
      created_at:        now,
      updated_at:        now,
    };
    self
      .execute(
        format!(
          "INSERT INTO notification_settings ({SETTING_COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        vec![
          Value::Text(encode_uuid(setting.setting_id)),
          Value::Text(encode_uuid(setting.user_id)),
          Value::from(setting.place_id.map(encode_uuid)),
          Value::Text(setting.notification_type.as_ref().to_owned()),
          Value::Text(setting.channel.as_ref().to_owned()),
          Value::from(setting.is_enabled),
          Value::Text(encode_conditions(&setting.conditions)?),
          Value::Text(encode_dt(setting.created_at)),
          Value::Text(encode_dt(setting.updated_at)),
        ],
      )
      .await?;
    Ok(setting)
  }

  async fn get_setting(&self, id: Uuid) -> Result<Option<NotificationSetting>> {
    Ok(
      self
        .settings_where("setting_id = ?1", vec![Value::Text(encode_uuid(id))])
        .await?
        .into_iter()
        .next(),
    )
  }

  async fn list_settings(&self, user_id: Uuid) -> Result<Vec<NotificationSetting>> {
    self
      .settings_where("user_id = ?1", vec![Value::Text(encode_uuid(user_id))])
      .await
  }

  async fn update_setting(
    &self,
    id: Uuid,
    patch: NotificationSettingUpdate,
  ) -> Result<Option<NotificationSetting>> {
    let conditions = patch
      .conditions
      .as_ref()
      .map(encode_conditions)
      .transpose()?;
    let update = "UPDATE notification_settings SET
        is_enabled = COALESCE(?2, is_enabled),
        channel    = COALESCE(?3, channel),
        conditions = COALESCE(?4, conditions),
        updated_at = ?5
      WHERE setting_id = ?1"
      .to_owned();
    let params = vec![
      Value::Text(encode_uuid(id)),
      Value::from(patch.is_enabled),
      Value::from(patch.channel.map(|c| c.as_ref().to_owned())),
      Value::from(conditions),
      Value::Text(encode_dt(Utc::now())),
    ];
    let select = format!(
      "SELECT {SETTING_COLUMNS} FROM notification_settings WHERE setting_id = ?1"
    );
    self
      .update_returning(update, params, select, id, RawSetting::from_row)
      .await?
      .map(RawSetting::into_setting)
      .transpose()
  }

  async fn find_enabled_settings(
    &self,
    user_id: Uuid,
    place_id: Uuid,
    kind: NotificationType,
  ) -> Result<Vec<NotificationSetting>> {
    self
      .settings_where(
        "user_id = ?1 AND notification_type = ?2 AND is_enabled = 1
         AND (place_id IS NULL OR place_id = ?3)",
        vec![
          Value::Text(encode_uuid(user_id)),
          Value::Text(kind.as_ref().to_owned()),
          Value::Text(encode_uuid(place_id)),
        ],
      )
      .await
  }

  async fn insert_log(&self, input: NewNotificationLog) -> Result<NotificationLog> {
    let log = NotificationLog {
      log_id:        Uuid::new_v4(),
      setting_id:    input.setting_id,
      place_id:      input.place_id,
      message:       input.message,
      is_sent:       false,
      sent_at:       None,
      error_message: None,
      created_at:    Utc::now(),
    };
    self
      .execute(
        format!(
          "INSERT INTO notification_logs ({LOG_COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL, ?6)"
        ),
        vec![
          Value::Text(encode_uuid(log.log_id)),
          Value::Text(encode_uuid(log.setting_id)),
          Value::Text(encode_uuid(log.place_id)),
          Value::Text(log.message.clone()),
          Value::from(log.is_sent),
          Value::Text(encode_dt(log.created_at)),
        ],
      )
      .await?;
    Ok(log)
  }

  async fn get_log(&self, id: Uuid) -> Result<Option<NotificationLog>> {
    let sql = format!("SELECT {LOG_COLUMNS} FROM notification_logs WHERE log_id = ?1");
    self
      .query_opt(sql, vec![Value::Text(encode_uuid(id))], RawLog::from_row)
      .await?
      .map(RawLog::into_log)
      .transpose()
  }

  async fn pending_logs(&self, limit: usize) -> Result<Vec<NotificationLog>> {
    let sql = format!(
      "SELECT {LOG_COLUMNS} FROM notification_logs
       WHERE is_sent = 0 AND error_message IS NULL
       ORDER BY created_at, rowid
       LIMIT {limit}"
    );
    self
      .query_all(sql, Vec::new(), RawLog::from_row)
      .await?
      .into_iter()
      .map(RawLog::into_log)
      .collect()
  }

  async fn record_delivery(
    &self,
    id: Uuid,
    outcome: DeliveryOutcome,
  ) -> Result<Option<NotificationLog>> {
    let (is_sent, sent_at, error) = match outcome {
      DeliveryOutcome::Sent { at } => (true, Some(encode_dt(at)), None),
      DeliveryOutcome::Failed { error } => (false, None, Some(error)),
    };
    let update = "UPDATE notification_logs
        SET is_sent = ?2, sent_at = ?3, error_message = ?4
      WHERE log_id = ?1 AND is_sent = 0 AND error_message IS NULL"
      .to_owned();
    let params = vec![
      Value::Text(encode_uuid(id)),
      Value::from(is_sent),
      Value::from(sent_at),
      Value::from(error),
    ];
    let select =
      format!("SELECT {LOG_COLUMNS} FROM notification_logs WHERE log_id = ?1");
    self
      .update_returning(update, params, select, id, RawLog::from_row)
      .await?
      .map(RawLog::into_log)
      .transpose()
  }
}
