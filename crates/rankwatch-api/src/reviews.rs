//! Handlers for review statistics and individual reviews of a place.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/places/:id/review-stats` | [`HistoryParams`] |
//! | `POST` | `/places/:id/review-stats` | Body: [`ReviewStatsBody`]; returns 201 |
//! | `GET`  | `/places/:id/review-stats/latest` | `null` when nothing recorded |
//! | `GET`  | `/places/:id/reviews` | [`ReviewParams`] |
//! | `POST` | `/places/:id/reviews` | Body: [`ReviewBody`]; returns 201 |
//! | `GET`  | `/places/:id/reviews/summary` | `?since` required |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rankwatch_core::{
  fact::{NewReview, NewReviewHistory, ReviewType, Sentiment},
  store::TrackingStore,
  validate::Validate as _,
  view::{ReviewHistoryView, ReviewView, ViewOptions},
};
use rankwatch_tracking::{ReviewSummary, Tracker};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  error::ApiError,
  params::{HistoryParams, ReviewParams, SummaryParams},
};

#[derive(Debug, Deserialize)]
pub struct ReviewStatsBody {
  pub blog_review_count:    u32,
  pub visitor_review_count: u32,
  pub average_rating:       Option<f64>,
  pub checked_at:           Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub review_type:        ReviewType,
  pub content:            Option<String>,
  pub author:             Option<String>,
  pub rating:             Option<u8>,
  pub sentiment:          Option<Sentiment>,
  pub sentiment_score:    Option<f64>,
  pub external_review_id: Option<String>,
  pub published_at:       Option<DateTime<Utc>>,
  pub collected_at:       Option<DateTime<Utc>>,
}

// ─── Review statistics ────────────────────────────────────────────────────────

/// `POST /places/:id/review-stats`
pub async fn record_stats<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_id): Path<Uuid>,
  Query(opts): Query<ViewOptions>,
  Json(body): Json<ReviewStatsBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewReviewHistory {
    place_id,
    blog_review_count: body.blog_review_count,
    visitor_review_count: body.visitor_review_count,
    average_rating: body.average_rating,
    checked_at: body.checked_at.unwrap_or_else(Utc::now),
  };
  input.validate()?;
  let view = tracker.record_review_history(input, opts).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /places/:id/review-stats/latest`
pub async fn latest_stats<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_id): Path<Uuid>,
  Query(opts): Query<ViewOptions>,
) -> Result<Json<Option<ReviewHistoryView>>, ApiError> {
  Ok(Json(tracker.latest_review_history(place_id, opts).await?))
}

/// `GET /places/:id/review-stats[?start&end][&limit]`
pub async fn stats_history<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_id): Path<Uuid>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ReviewHistoryView>>, ApiError> {
  let views = tracker
    .review_history(place_id, params.query()?, params.view())
    .await?;
  Ok(Json(views))
}

// ─── Reviews ──────────────────────────────────────────────────────────────────

/// `POST /places/:id/reviews`
pub async fn record<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_id): Path<Uuid>,
  Query(opts): Query<ViewOptions>,
  Json(body): Json<ReviewBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewReview {
    place_id,
    review_type: body.review_type,
    content: body.content,
    author: body.author,
    rating: body.rating,
    sentiment: body.sentiment,
    sentiment_score: body.sentiment_score,
    external_review_id: body.external_review_id,
    published_at: body.published_at,
    collected_at: body.collected_at.unwrap_or_else(Utc::now),
  };
  input.validate()?;
  let view = tracker.record_review(input, opts).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /places/:id/reviews[?review_type][&sentiment][&start&end][&limit]`
pub async fn list<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_id): Path<Uuid>,
  Query(params): Query<ReviewParams>,
) -> Result<Json<Vec<ReviewView>>, ApiError> {
  let views = tracker
    .reviews(place_id, params.query()?, params.view())
    .await?;
  Ok(Json(views))
}

/// `GET /places/:id/reviews/summary?since=<rfc3339>`
pub async fn summary<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Path(place_id): Path<Uuid>,
  Query(params): Query<SummaryParams>,
) -> Result<Json<ReviewSummary>, ApiError> {
  Ok(Json(tracker.review_summary(place_id, params.since).await?))
}
