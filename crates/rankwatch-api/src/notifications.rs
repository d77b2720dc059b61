//! Handlers for notification settings and the delivery queue.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/users/:id/notification-settings` | Settings of a user |
//! | `POST`  | `/users/:id/notification-settings` | Body: [`SettingBody`]; returns 201 |
//! | `PATCH` | `/notification-settings/:id` | Body: [`NotificationSettingUpdate`] |
//! | `GET`   | `/notifications/pending` | `?limit`; oldest first |
//! | `POST`  | `/notifications/:id/delivery` | Body: [`DeliveryOutcome`] |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rankwatch_core::{
  notification::{
    Channel, ConditionMap, DeliveryOutcome, NewNotificationSetting,
    NotificationLog, NotificationSetting, NotificationSettingUpdate,
    NotificationType,
  },
  store::TrackingStore,
  validate::Validate as _,
};
use rankwatch_tracking::Tracker;
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, params::LimitParams};

fn enabled() -> bool { true }

#[derive(Debug, Deserialize)]
pub struct SettingBody {
  pub place_id:          Option<Uuid>,
  pub notification_type: NotificationType,
  pub channel:           Channel,
  #[serde(default = "enabled")]
  pub is_enabled:        bool,
  #[serde(default)]
  pub conditions:        ConditionMap,
}

/// `GET /users/:id/notification-settings`
pub async fn list_settings<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<NotificationSetting>>, ApiError> {
  Ok(Json(tracker.list_notification_settings(user_id).await?))
}

/// `POST /users/:id/notification-settings`
pub async fn create_setting<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(user_id): Path<Uuid>,
  Json(body): Json<SettingBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewNotificationSetting {
    user_id,
    place_id: body.place_id,
    notification_type: body.notification_type,
    channel: body.channel,
    is_enabled: body.is_enabled,
    conditions: body.conditions,
  };
  input.validate()?;
  let setting = tracker.create_notification_setting(input).await?;
  Ok((StatusCode::CREATED, Json(setting)))
}

/// `PATCH /notification-settings/:id`
pub async fn update_setting<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<NotificationSettingUpdate>,
) -> Result<Json<NotificationSetting>, ApiError> {
  patch.validate()?;
  Ok(Json(tracker.update_notification_setting(id, patch).await?))
}

/// `GET /notifications/pending[?limit]`
pub async fn pending<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Query(params): Query<LimitParams>,
) -> Result<Json<Vec<NotificationLog>>, ApiError> {
  Ok(Json(tracker.pending_notifications(params.limit()?).await?))
}

/// `POST /notifications/:id/delivery`
pub async fn complete_delivery<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(log_id): Path<Uuid>,
  Json(outcome): Json<DeliveryOutcome>,
) -> Result<Json<NotificationLog>, ApiError> {
  Ok(Json(tracker.complete_delivery(log_id, outcome).await?))
}
