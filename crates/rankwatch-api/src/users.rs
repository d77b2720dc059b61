//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/users` | Body: [`NewUser`]; returns 201 + user |
//! | `GET`  | `/users/:id` | Single user |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rankwatch_core::{
  entity::{NewUser, User},
  store::TrackingStore,
  validate::Validate as _,
};
use rankwatch_tracking::Tracker;
use uuid::Uuid;

use crate::error::ApiError;

/// `POST /users`
pub async fn register<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
  body.validate()?;
  let user = tracker.register_user(body).await?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/:id`
pub async fn get_one<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
  Ok(Json(tracker.get_user(id).await?))
}
