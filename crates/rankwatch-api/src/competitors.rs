//! Handlers for competitors and their snapshots.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/places/:id/competitors` | Competitors of a place |
//! | `POST`  | `/places/:id/competitors` | Body: [`CompetitorBody`]; returns 201 |
//! | `GET`   | `/competitors/:id` | Single competitor |
//! | `PATCH` | `/competitors/:id` | Body: [`CompetitorUpdate`] |
//! | `GET`   | `/competitors/:id/snapshots` | [`HistoryParams`] |
//! | `POST`  | `/competitors/:id/snapshots` | Body: [`SnapshotBody`]; returns 201 |
//! | `GET`   | `/competitors/:id/snapshots/latest` | `null` when nothing recorded |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rankwatch_core::{
  entity::{Competitor, CompetitorUpdate, NewCompetitor},
  fact::NewCompetitorSnapshot,
  store::TrackingStore,
  validate::Validate as _,
  view::{CompetitorSnapshotView, ViewOptions},
};
use rankwatch_tracking::Tracker;
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, params::HistoryParams};

#[derive(Debug, Deserialize)]
pub struct CompetitorBody {
  pub external_id: String,
  pub name:        String,
  pub category:    Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotBody {
  pub rank:                 Option<u32>,
  pub blog_review_count:    Option<u32>,
  pub visitor_review_count: Option<u32>,
  pub average_rating:       Option<f64>,
  pub checked_at:           Option<DateTime<Utc>>,
}

/// `GET /places/:id/competitors`
pub async fn list<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_id): Path<Uuid>,
) -> Result<Json<Vec<Competitor>>, ApiError> {
  Ok(Json(tracker.list_competitors(place_id).await?))
}

/// `POST /places/:id/competitors`
pub async fn add<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_id): Path<Uuid>,
  Json(body): Json<CompetitorBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewCompetitor {
    place_id,
    external_id: body.external_id,
    name: body.name,
    category: body.category,
  };
  input.validate()?;
  let competitor = tracker.add_competitor(input).await?;
  Ok((StatusCode::CREATED, Json(competitor)))
}

/// `GET /competitors/:id`
pub async fn get_one<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Competitor>, ApiError> {
  Ok(Json(tracker.get_competitor(id).await?))
}

/// `PATCH /competitors/:id`
pub async fn update<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<CompetitorUpdate>,
) -> Result<Json<Competitor>, ApiError> {
  patch.validate()?;
  Ok(Json(tracker.update_competitor(id, patch).await?))
}

/// `POST /competitors/:id/snapshots`
pub async fn record<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(competitor_id): Path<Uuid>,
  Query(opts): Query<ViewOptions>,
  Json(body): Json<SnapshotBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewCompetitorSnapshot {
    competitor_id,
    rank: body.rank,
    blog_review_count: body.blog_review_count,
    visitor_review_count: body.visitor_review_count,
    average_rating: body.average_rating,
    checked_at: body.checked_at.unwrap_or_else(Utc::now),
  };
  input.validate()?;
  let view = tracker.record_competitor_snapshot(input, opts).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /competitors/:id/snapshots/latest`
pub async fn latest<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(competitor_id): Path<Uuid>,
  Query(opts): Query<ViewOptions>,
) -> Result<Json<Option<CompetitorSnapshotView>>, ApiError> {
  Ok(Json(tracker.latest_competitor_snapshot(competitor_id, opts).await?))
}

/// `GET /competitors/:id/snapshots[?start&end][&limit]`
pub async fn history<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(competitor_id): Path<Uuid>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<CompetitorSnapshotView>>, ApiError> {
  let views = tracker
    .competitor_history(competitor_id, params.query()?, params.view())
    .await?;
  Ok(Json(views))
}
