//! Handlers for places.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users/:id/places` | Places owned by the user |
//! | `POST`   | `/users/:id/places` | Body: [`PlaceBody`]; returns 201 + place |
//! | `GET`    | `/places/:id` | Single place |
//! | `PATCH`  | `/places/:id` | Body: [`PlaceUpdate`] |
//! | `DELETE` | `/places/:id` | Soft delete; returns the deactivated place |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rankwatch_core::{
  entity::{NewPlace, Place, PlaceUpdate},
  store::TrackingStore,
  validate::Validate as _,
};
use rankwatch_tracking::Tracker;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PlaceBody {
  pub external_id: String,
  pub name:        String,
  pub category:    Option<String>,
  pub address:     Option<String>,
  pub url:         Option<String>,
}

/// `GET /users/:id/places`
pub async fn list<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Place>>, ApiError> {
  Ok(Json(tracker.list_places(user_id).await?))
}

/// `POST /users/:id/places`
pub async fn create<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(user_id): Path<Uuid>,
  Json(body): Json<PlaceBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewPlace {
    user_id,
    external_id: body.external_id,
    name: body.name,
    category: body.category,
    address: body.address,
    url: body.url,
  };
  input.validate()?;
  let place = tracker.create_place(input).await?;
  Ok((StatusCode::CREATED, Json(place)))
}

/// `GET /places/:id`
pub async fn get_one<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Place>, ApiError> {
  Ok(Json(tracker.get_place(id).await?))
}

/// `PATCH /places/:id`
pub async fn update<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<PlaceUpdate>,
) -> Result<Json<Place>, ApiError> {
  patch.validate()?;
  Ok(Json(tracker.update_place(id, patch).await?))
}

/// `DELETE /places/:id`
pub async fn deactivate<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Place>, ApiError> {
  Ok(Json(tracker.deactivate_place(id).await?))
}
