//! Handlers for tracked keywords and their rankings.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/places/:id/keywords` | `?include_relations` |
//! | `POST`  | `/places/:id/keywords` | Body: [`KeywordBody`]; returns 201 |
//! | `PATCH` | `/place-keywords/:id` | Body: `{"is_active": bool}` |
//! | `GET`   | `/place-keywords/:id/rankings` | [`HistoryParams`] |
//! | `POST`  | `/place-keywords/:id/rankings` | Body: [`RankingBody`]; returns 201 |
//! | `GET`   | `/place-keywords/:id/rankings/latest` | `null` when nothing recorded |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rankwatch_core::{
  fact::NewRanking,
  store::TrackingStore,
  validate::Validate as _,
  view::{PlaceKeywordView, RankingView, ViewOptions},
};
use rankwatch_tracking::{AddPlaceKeyword, Tracker};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, params::HistoryParams};

#[derive(Debug, Deserialize)]
pub struct KeywordBody {
  pub keyword: String,
  #[serde(default)]
  pub region:  Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct RankingBody {
  pub rank:                Option<u32>,
  pub search_result_count: Option<u32>,
  /// Defaults to the time of the request.
  pub checked_at:          Option<DateTime<Utc>>,
}

/// `GET /places/:id/keywords`
pub async fn list<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_id): Path<Uuid>,
  Query(opts): Query<ViewOptions>,
) -> Result<Json<Vec<PlaceKeywordView>>, ApiError> {
  Ok(Json(tracker.list_place_keywords(place_id, opts).await?))
}

/// `POST /places/:id/keywords`
pub async fn add<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_id): Path<Uuid>,
  Json(body): Json<KeywordBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = AddPlaceKeyword { place_id, keyword: body.keyword, region: body.region };
  input.validate()?;
  let view = tracker.add_place_keyword(input).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `PATCH /place-keywords/:id`
pub async fn set_active<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(id): Path<Uuid>,
  Query(opts): Query<ViewOptions>,
  Json(body): Json<ActiveBody>,
) -> Result<Json<PlaceKeywordView>, ApiError> {
  let view = tracker.set_place_keyword_active(id, body.is_active, opts).await?;
  Ok(Json(view))
}

/// `POST /place-keywords/:id/rankings`
pub async fn record<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_keyword_id): Path<Uuid>,
  Query(opts): Query<ViewOptions>,
  Json(body): Json<RankingBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewRanking {
    place_keyword_id,
    rank: body.rank,
    search_result_count: body.search_result_count,
    checked_at: body.checked_at.unwrap_or_else(Utc::now),
  };
  input.validate()?;
  let view = tracker.record_ranking(input, opts).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /place-keywords/:id/rankings/latest`
pub async fn latest<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_keyword_id): Path<Uuid>,
  Query(opts): Query<ViewOptions>,
) -> Result<Json<Option<RankingView>>, ApiError> {
  Ok(Json(tracker.latest_ranking(place_keyword_id, opts).await?))
}

/// `GET /place-keywords/:id/rankings[?start&end][&limit]`
pub async fn history<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_keyword_id): Path<Uuid>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<RankingView>>, ApiError> {
  let views = tracker
    .ranking_history(place_keyword_id, params.query()?, params.view())
    .await?;
  Ok(Json(views))
}
