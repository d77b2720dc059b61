//! `POST /ingest`: one scraper observation.
//!
//! Body: a [`ScrapeRecord`], e.g.
//! `{"target":"ranking","place_keyword_id":"…","metrics":{"rank":3,"observed_at":"…"}}`.
//! Returns 201 with the recorded view, tagged by `recorded`.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rankwatch_core::store::TrackingStore;
use rankwatch_tracking::{ScrapeRecord, Tracker};

use crate::error::ApiError;

pub async fn handler<S: TrackingStore>(
  State(tracker): State<Tracker<S>>,
  Json(record): Json<ScrapeRecord>,
) -> Result<impl IntoResponse, ApiError> {
  let outcome = tracker.ingest(record.target, record.metrics).await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}
