//! JSON REST API for rankwatch.
//!
//! Exposes an axum [`Router`] over a [`Tracker`] backed by any
//! [`TrackingStore`]. Request bodies pass through
//! [`rankwatch_core::validate::Validate`] before a use case runs; use-case
//! errors map to status codes in [`ApiError`]. Auth and TLS are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rankwatch_api::api_router(tracker.clone()))
//! ```

pub mod competitors;
pub mod error;
pub mod ingest;
pub mod keywords;
pub mod notifications;
pub mod params;
pub mod places;
pub mod reviews;
pub mod users;

use axum::{
  Router,
  routing::{get, patch, post},
};
use rankwatch_core::store::TrackingStore;
use rankwatch_tracking::Tracker;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Build a fully-materialised API router for `tracker`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(tracker: Tracker<S>) -> Router<()>
where
  S: TrackingStore + 'static,
{
  Router::new()
    // Users
    .route("/users", post(users::register::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    .route(
      "/users/{id}/places",
      get(places::list::<S>).post(places::create::<S>),
    )
    .route(
      "/users/{id}/notification-settings",
      get(notifications::list_settings::<S>)
        .post(notifications::create_setting::<S>),
    )
    // Places
    .route(
      "/places/{id}",
      get(places::get_one::<S>)
        .patch(places::update::<S>)
        .delete(places::deactivate::<S>),
    )
    .route(
      "/places/{id}/keywords",
      get(keywords::list::<S>).post(keywords::add::<S>),
    )
    .route(
      "/places/{id}/competitors",
      get(competitors::list::<S>).post(competitors::add::<S>),
    )
    .route(
      "/places/{id}/review-stats",
      get(reviews::stats_history::<S>).post(reviews::record_stats::<S>),
    )
    .route("/places/{id}/review-stats/latest", get(reviews::latest_stats::<S>))
    .route(
      "/places/{id}/reviews",
      get(reviews::list::<S>).post(reviews::record::<S>),
    )
    .route("/places/{id}/reviews/summary", get(reviews::summary::<S>))
    // Tracked keywords
    .route("/place-keywords/{id}", patch(keywords::set_active::<S>))
    .route(
      "/place-keywords/{id}/rankings",
      get(keywords::history::<S>).post(keywords::record::<S>),
    )
    .route("/place-keywords/{id}/rankings/latest", get(keywords::latest::<S>))
    // Competitors
    .route(
      "/competitors/{id}",
      get(competitors::get_one::<S>).patch(competitors::update::<S>),
    )
    .route(
      "/competitors/{id}/snapshots",
      get(competitors::history::<S>).post(competitors::record::<S>),
    )
    .route("/competitors/{id}/snapshots/latest", get(competitors::latest::<S>))
    // Notifications
    .route(
      "/notification-settings/{id}",
      patch(notifications::update_setting::<S>),
    )
    .route("/notifications/pending", get(notifications::pending::<S>))
    .route(
      "/notifications/{id}/delivery",
      post(notifications::complete_delivery::<S>),
    )
    // Scraper
    .route("/ingest", post(ingest::handler::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(tracker)
}

#[cfg(test)]
mod tests;
