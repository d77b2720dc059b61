//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use rankwatch_store_sqlite::SqliteStore;
use rankwatch_tracking::{Tracker, TrackingPolicy};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::api_router;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Tracker::new(Arc::new(store), TrackingPolicy::default()))
}

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = resp.into_body().collect().await.unwrap().to_bytes();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn id(value: &Value, field: &str) -> String {
  value[field].as_str().unwrap().to_owned()
}

/// Registers an owner and one place; returns `(user_id, place_id)`.
async fn seed(app: &Router) -> (String, String) {
  let (status, user) = send(
    app,
    "POST",
    "/users",
    Some(json!({ "email": "Owner@Example.com", "name": "Owner" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let user_id = id(&user, "user_id");

  let (status, place) = send(
    app,
    "POST",
    &format!("/users/{user_id}/places"),
    Some(json!({ "external_id": "1234", "name": "Cafe Mori" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  (user_id, id(&place, "place_id"))
}

// ─── Users and places ─────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_email_is_409() {
  let app = app().await;
  seed(&app).await;

  let (status, body) = send(
    &app,
    "POST",
    "/users",
    Some(json!({ "email": "owner@example.com", "name": "Someone" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("owner@example.com"));
}

#[tokio::test]
async fn invalid_body_is_400_with_fields() {
  let app = app().await;
  let (status, body) = send(
    &app,
    "POST",
    "/users",
    Some(json!({ "email": "not-an-email", "name": " " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let fields: Vec<&str> = body["fields"]
    .as_array()
    .unwrap()
    .iter()
    .map(|f| f["field"].as_str().unwrap())
    .collect();
  assert_eq!(fields, vec!["email", "name"]);
}

#[tokio::test]
async fn unknown_place_is_404() {
  let app = app().await;
  let (status, body) = send(
    &app,
    "GET",
    "/places/00000000-0000-0000-0000-000000000000",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().starts_with("place not found"));
}

#[tokio::test]
async fn place_patch_and_listing() {
  let app = app().await;
  let (user_id, place_id) = seed(&app).await;

  let (status, place) = send(
    &app,
    "PATCH",
    &format!("/places/{place_id}"),
    Some(json!({ "category": "cafe" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(place["category"], json!("cafe"));
  assert_eq!(place["name"], json!("Cafe Mori"));

  let (status, places) =
    send(&app, "GET", &format!("/users/{user_id}/places"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(places.as_array().unwrap().len(), 1);
}

// ─── Review statistics ────────────────────────────────────────────────────────

#[tokio::test]
async fn deactivated_place_rejects_review_stats_with_422() {
  let app = app().await;
  let (_, place_id) = seed(&app).await;
  let stats = format!("/places/{place_id}/review-stats");

  let (status, view) = send(
    &app,
    "POST",
    &format!("{stats}?include_computed=true"),
    Some(json!({
      "blog_review_count": 10,
      "visitor_review_count": 20,
      "average_rating": 4.5,
      "checked_at": "2024-06-10T09:00:00Z",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(view["total_review_count"], json!(30));

  let (status, place) =
    send(&app, "DELETE", &format!("/places/{place_id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(place["is_active"], json!(false));

  let (status, _) = send(
    &app,
    "POST",
    &stats,
    Some(json!({ "blog_review_count": 99, "visitor_review_count": 99 })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let (status, latest) = send(
    &app,
    "GET",
    &format!("{stats}/latest?include_computed=true&include_relations=true"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(latest["total_review_count"], json!(30));
  assert_eq!(latest["place_name"], json!("Cafe Mori"));
}

#[tokio::test]
async fn relations_are_absent_unless_requested() {
  let app = app().await;
  let (_, place_id) = seed(&app).await;

  let (_, view) = send(
    &app,
    "POST",
    &format!("/places/{place_id}/review-stats"),
    Some(json!({ "blog_review_count": 0, "visitor_review_count": 0 })),
  )
  .await;
  let object = view.as_object().unwrap();
  assert!(!object.contains_key("place_name"));
  assert!(!object.contains_key("total_review_count"));
}

#[tokio::test]
async fn history_range_needs_both_ends() {
  let app = app().await;
  let (_, place_id) = seed(&app).await;

  let (status, body) = send(
    &app,
    "GET",
    &format!("/places/{place_id}/review-stats?start=2024-06-01T00:00:00Z"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["fields"][0]["field"], json!("end"));

  let (status, _) = send(
    &app,
    "GET",
    &format!(
      "/places/{place_id}/review-stats?start=2024-06-02T00:00:00Z&end=2024-06-01T00:00:00Z"
    ),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Keywords and rankings ────────────────────────────────────────────────────

#[tokio::test]
async fn keyword_triple_conflicts_and_latest_is_null_when_empty() {
  let app = app().await;
  let (_, place_id) = seed(&app).await;
  let keywords = format!("/places/{place_id}/keywords");

  let (status, pk) = send(
    &app,
    "POST",
    &keywords,
    Some(json!({ "keyword": "Gangnam  Cafe", "region": "Seoul" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(pk["keyword"], json!("gangnam cafe"));
  let pk_id = id(&pk, "place_keyword_id");

  let (status, _) = send(
    &app,
    "POST",
    &keywords,
    Some(json!({ "keyword": "gangnam cafe", "region": " Seoul " })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, latest) = send(
    &app,
    "GET",
    &format!("/place-keywords/{pk_id}/rankings/latest"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(latest, Value::Null);
}

#[tokio::test]
async fn rankings_record_and_list_newest_first() {
  let app = app().await;
  let (_, place_id) = seed(&app).await;
  let (_, pk) = send(
    &app,
    "POST",
    &format!("/places/{place_id}/keywords"),
    Some(json!({ "keyword": "brunch" })),
  )
  .await;
  let rankings = format!("/place-keywords/{}/rankings", id(&pk, "place_keyword_id"));

  for (rank, at) in [(5, "2024-06-08T09:00:00Z"), (3, "2024-06-10T09:00:00Z")] {
    let (status, _) = send(
      &app,
      "POST",
      &rankings,
      Some(json!({ "rank": rank, "search_result_count": 120, "checked_at": at })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  let (status, history) =
    send(&app, "GET", &format!("{rankings}?include_relations=true"), None).await;
  assert_eq!(status, StatusCode::OK);
  let ranks: Vec<&Value> =
    history.as_array().unwrap().iter().map(|v| &v["rank"]).collect();
  assert_eq!(ranks, vec![&json!(3), &json!(5)]);
  assert_eq!(history[0]["keyword"], json!("brunch"));

  let (status, _) = send(&app, "GET", &format!("{rankings}?limit=0"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn inactive_keyword_rejects_rankings() {
  let app = app().await;
  let (_, place_id) = seed(&app).await;
  let (_, pk) = send(
    &app,
    "POST",
    &format!("/places/{place_id}/keywords"),
    Some(json!({ "keyword": "brunch" })),
  )
  .await;
  let pk_id = id(&pk, "place_keyword_id");

  let (status, toggled) = send(
    &app,
    "PATCH",
    &format!("/place-keywords/{pk_id}"),
    Some(json!({ "is_active": false })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(toggled["is_active"], json!(false));

  let (status, _) = send(
    &app,
    "POST",
    &format!("/place-keywords/{pk_id}/rankings"),
    Some(json!({ "rank": 1 })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ─── Competitors and reviews ──────────────────────────────────────────────────

#[tokio::test]
async fn competitor_pair_conflicts() {
  let app = app().await;
  let (_, place_id) = seed(&app).await;
  let competitors = format!("/places/{place_id}/competitors");
  let body = json!({ "external_id": "9876", "name": "Cafe Rival" });

  let (status, competitor) =
    send(&app, "POST", &competitors, Some(body.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  let (status, _) = send(&app, "POST", &competitors, Some(body)).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let snapshots =
    format!("/competitors/{}/snapshots", id(&competitor, "competitor_id"));
  let (status, snapshot) = send(
    &app,
    "POST",
    &format!("{snapshots}?include_computed=true&include_relations=true"),
    Some(json!({ "rank": 2, "blog_review_count": 4, "visitor_review_count": 6 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(snapshot["total_review_count"], json!(10));
  assert_eq!(snapshot["competitor_name"], json!("Cafe Rival"));

  let (_, listed) = send(&app, "GET", &competitors, None).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn reviews_filter_and_summary() {
  let app = app().await;
  let (_, place_id) = seed(&app).await;
  let reviews = format!("/places/{place_id}/reviews");

  let inputs = [
    json!({ "review_type": "VISITOR", "rating": 5, "sentiment": "POSITIVE",
            "external_review_id": "r-1", "collected_at": "2024-06-10T09:00:00Z" }),
    json!({ "review_type": "BLOG", "rating": 2, "sentiment": "NEGATIVE",
            "external_review_id": "r-2", "collected_at": "2024-06-10T10:00:00Z" }),
    json!({ "review_type": "VISITOR", "external_review_id": "r-3",
            "collected_at": "2024-06-10T11:00:00Z" }),
  ];
  for input in inputs {
    let (status, _) = send(&app, "POST", &reviews, Some(input)).await;
    assert_eq!(status, StatusCode::CREATED);
  }

  let (status, _) = send(
    &app,
    "POST",
    &reviews,
    Some(json!({ "review_type": "VISITOR", "external_review_id": "r-1" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, visitors) =
    send(&app, "GET", &format!("{reviews}?review_type=VISITOR"), None).await;
  assert_eq!(status, StatusCode::OK);
  let ids: Vec<&Value> = visitors
    .as_array()
    .unwrap()
    .iter()
    .map(|r| &r["external_review_id"])
    .collect();
  assert_eq!(ids, vec![&json!("r-3"), &json!("r-1")]);

  let (status, summary) = send(
    &app,
    "GET",
    &format!("{reviews}/summary?since=2024-06-10T00:00:00Z"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(summary["total"], json!(3));
  assert_eq!(summary["by_type"]["visitor"], json!(2));
  assert_eq!(summary["by_sentiment"]["unclassified"], json!(1));
  assert_eq!(summary["average_rating"], json!(3.5));
}

// ─── Ingest and notifications ─────────────────────────────────────────────────

#[tokio::test]
async fn ingest_dispatches_and_rejects_incomplete_review_stats() {
  let app = app().await;
  let (_, place_id) = seed(&app).await;

  let (status, outcome) = send(
    &app,
    "POST",
    "/ingest",
    Some(json!({
      "target": "review_stats",
      "place_id": place_id,
      "metrics": {
        "blog_review_count": 3,
        "visitor_review_count": 4,
        "observed_at": "2024-06-10T09:00:00Z",
      },
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(outcome["recorded"], json!("review_stats"));
  assert_eq!(outcome["total_review_count"], json!(7));

  let (status, body) = send(
    &app,
    "POST",
    "/ingest",
    Some(json!({
      "target": "review_stats",
      "place_id": place_id,
      "metrics": { "blog_review_count": 3, "observed_at": "2024-06-10T10:00:00Z" },
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["fields"][0]["field"], json!("visitor_review_count"));
}

#[tokio::test]
async fn notification_is_queued_and_delivered_once() {
  let app = app().await;
  let (user_id, place_id) = seed(&app).await;

  let (status, body) = send(
    &app,
    "POST",
    &format!("/users/{user_id}/notification-settings"),
    Some(json!({
      "notification_type": "RANKING_CHANGE",
      "channel": "EMAIL",
      "conditions": { "rank_sideways": 1 },
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["fields"][0]["field"], json!("conditions.rank_sideways"));

  let (status, _) = send(
    &app,
    "POST",
    &format!("/users/{user_id}/notification-settings"),
    Some(json!({
      "place_id": place_id,
      "notification_type": "RANKING_CHANGE",
      "channel": "EMAIL",
      "conditions": { "rank_above": 10 },
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (_, pk) = send(
    &app,
    "POST",
    &format!("/places/{place_id}/keywords"),
    Some(json!({ "keyword": "brunch" })),
  )
  .await;
  let rankings = format!("/place-keywords/{}/rankings", id(&pk, "place_keyword_id"));
  send(&app, "POST", &rankings, Some(json!({ "rank": 4 }))).await;
  send(&app, "POST", &rankings, Some(json!({ "rank": 12 }))).await;

  let (status, pending) = send(&app, "GET", "/notifications/pending", None).await;
  assert_eq!(status, StatusCode::OK);
  let pending = pending.as_array().unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(
    pending[0]["message"],
    json!("[Cafe Mori / brunch] rank above 10 (now 12)")
  );
  let delivery = format!("/notifications/{}/delivery", id(&pending[0], "log_id"));

  let outcome = json!({ "status": "sent", "at": "2024-06-10T09:05:00Z" });
  let (status, log) = send(&app, "POST", &delivery, Some(outcome.clone())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(log["is_sent"], json!(true));

  let (status, _) = send(&app, "POST", &delivery, Some(outcome)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let (_, pending) = send(&app, "GET", "/notifications/pending", None).await;
  assert_eq!(pending, json!([]));
}
