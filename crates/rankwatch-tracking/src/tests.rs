//! Use-case tests against an in-memory SQLite store.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rankwatch_core::{
  ErrorKind,
  entity::{NewCompetitor, NewPlace, NewUser, Place},
  fact::{
    DateRange, NewCompetitorSnapshot, NewRanking, NewReview, NewReviewHistory,
    ObservedMetrics, ReviewType, Sentiment,
  },
  notification::{
    Channel, ConditionMap, DeliveryOutcome, NewNotificationSetting,
    NotificationType,
  },
  view::{PlaceKeywordView, ViewOptions},
};
use rankwatch_store_sqlite::SqliteStore;
use serde_json::json;
use uuid::Uuid;

use crate::{
  AddPlaceKeyword, HistoryQuery, IngestOutcome, ReviewQuery, ScrapeTarget,
  Tracker, TrackingPolicy,
};

async fn tracker() -> Tracker<SqliteStore> {
  tracker_with(TrackingPolicy::default()).await
}

async fn tracker_with(policy: TrackingPolicy) -> Tracker<SqliteStore> {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  Tracker::new(Arc::new(store), policy)
}

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap() }

async fn place(t: &Tracker<SqliteStore>) -> Place {
  let user = t
    .register_user(NewUser {
      email: "owner@example.com".into(),
      name:  "Owner".into(),
    })
    .await
    .unwrap();
  t.create_place(NewPlace {
    user_id:     user.user_id,
    external_id: "1234".into(),
    name:        "Cafe Mori".into(),
    category:    Some("cafe".into()),
    address:     None,
    url:         None,
  })
  .await
  .unwrap()
}

async fn keyword(t: &Tracker<SqliteStore>, place: &Place) -> PlaceKeywordView {
  t.add_place_keyword(AddPlaceKeyword {
    place_id: place.place_id,
    keyword:  "Gangnam  Cafe".into(),
    region:   None,
  })
  .await
  .unwrap()
}

fn review_stats(place: &Place, blog: u32, visitor: u32, at: DateTime<Utc>) -> NewReviewHistory {
  NewReviewHistory {
    place_id:             place.place_id,
    blog_review_count:    blog,
    visitor_review_count: visitor,
    average_rating:       Some(4.4),
    checked_at:           at,
  }
}

fn ranking(place_keyword_id: Uuid, rank: u32, at: DateTime<Utc>) -> NewRanking {
  NewRanking {
    place_keyword_id,
    rank: Some(rank),
    search_result_count: Some(300),
    checked_at: at,
  }
}

fn review(place: &Place, external_id: &str, sentiment: Sentiment, hours: i64) -> NewReview {
  NewReview {
    place_id:           place.place_id,
    review_type:        ReviewType::Visitor,
    content:            Some("lovely latte".into()),
    author:             Some("kim".into()),
    rating:             Some(4),
    sentiment:          Some(sentiment),
    sentiment_score:    Some(0.5),
    external_review_id: Some(external_id.into()),
    published_at:       None,
    collected_at:       t0() + Duration::hours(hours),
  }
}

fn conditions(payload: serde_json::Value) -> ConditionMap {
  match payload {
    serde_json::Value::Object(map) => map,
    _ => panic!("object expected"),
  }
}

// ─── Users & places ──────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_email_is_conflict() {
  let t = tracker().await;
  place(&t).await;
  let err = t
    .register_user(NewUser { email: "OWNER@example.com".into(), name: "Again".into() })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn place_needs_existing_owner_and_unique_external_id() {
  let t = tracker().await;
  let p = place(&t).await;

  let mut new = NewPlace {
    user_id:     Uuid::new_v4(),
    external_id: "9999".into(),
    name:        "Elsewhere".into(),
    category:    None,
    address:     None,
    url:         None,
  };
  let err = t.create_place(new.clone()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  new.user_id = p.user_id;
  new.external_id = "1234".into();
  let err = t.create_place(new).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  assert_eq!(t.list_places(p.user_id).await.unwrap(), vec![p]);
}

#[tokio::test]
async fn missing_ids_are_not_found() {
  let t = tracker().await;
  let id = Uuid::new_v4();
  let opts = ViewOptions::PLAIN;

  let kinds = [
    t.get_place(id).await.map(|_| ()),
    t.latest_ranking(id, opts).await.map(|_| ()),
    t.latest_review_history(id, opts).await.map(|_| ()),
    t.competitor_history(id, HistoryQuery::default(), opts).await.map(|_| ()),
    t.deactivate_place(id).await.map(|_| ()),
    t.set_place_keyword_active(id, false, opts).await.map(|_| ()),
  ];
  for result in kinds {
    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
  }
}

// ─── Review statistics ───────────────────────────────────────────────────────

#[tokio::test]
async fn review_history_gated_on_active_place() {
  let t = tracker().await;
  let p = place(&t).await;

  let view = t
    .record_review_history(review_stats(&p, 10, 20, t0()), ViewOptions::FULL)
    .await
    .unwrap();
  assert_eq!(view.total_review_count, Some(30));
  assert_eq!(view.place_name.as_deref(), Some("Cafe Mori"));

  t.deactivate_place(p.place_id).await.unwrap();
  let err = t
    .record_review_history(
      review_stats(&p, 11, 21, t0() + Duration::days(1)),
      ViewOptions::FULL,
    )
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidState);

  let latest = t
    .latest_review_history(p.place_id, ViewOptions::FULL)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(latest.total_review_count, Some(30));
  assert_eq!(latest.checked_at, t0());
}

#[tokio::test]
async fn zero_counts_total_zero() {
  let t = tracker().await;
  let p = place(&t).await;
  let view = t
    .record_review_history(review_stats(&p, 0, 0, t0()), ViewOptions::default().with_computed())
    .await
    .unwrap();
  assert_eq!(view.total_review_count, Some(0));
}

#[tokio::test]
async fn review_history_range_is_inclusive_and_descending() {
  let t = tracker().await;
  let p = place(&t).await;
  for day in 0..5 {
    t.record_review_history(
      review_stats(&p, day, 0, t0() + Duration::days(i64::from(day))),
      ViewOptions::PLAIN,
    )
    .await
    .unwrap();
  }

  let range = DateRange::new(t0() + Duration::days(1), t0() + Duration::days(3));
  let views = t
    .review_history(p.place_id, HistoryQuery::between(range), ViewOptions::PLAIN)
    .await
    .unwrap();
  let counts: Vec<_> = views.iter().map(|v| v.blog_review_count).collect();
  assert_eq!(counts, vec![3, 2, 1]);

  let recent = t
    .review_history(p.place_id, HistoryQuery::recent(2), ViewOptions::PLAIN)
    .await
    .unwrap();
  let counts: Vec<_> = recent.iter().map(|v| v.blog_review_count).collect();
  assert_eq!(counts, vec![4, 3]);
}

#[tokio::test]
async fn history_defaults_to_policy_limit() {
  let policy = TrackingPolicy { default_history_limit: 3, max_history_limit: 4, notify: false };
  let t = tracker_with(policy).await;
  let p = place(&t).await;
  for day in 0..6 {
    t.record_review_history(
      review_stats(&p, day, 0, t0() + Duration::days(i64::from(day))),
      ViewOptions::PLAIN,
    )
    .await
    .unwrap();
  }

  let default = t
    .review_history(p.place_id, HistoryQuery::default(), ViewOptions::PLAIN)
    .await
    .unwrap();
  assert_eq!(default.len(), 3);

  let clamped = t
    .review_history(p.place_id, HistoryQuery::recent(50), ViewOptions::PLAIN)
    .await
    .unwrap();
  assert_eq!(clamped.len(), 4);
}

#[tokio::test]
async fn inverted_range_is_rejected() {
  let t = tracker().await;
  let p = place(&t).await;
  let range = DateRange::new(t0(), t0() - Duration::days(1));
  let err = t
    .review_history(p.place_id, HistoryQuery::between(range), ViewOptions::PLAIN)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

// ─── Keywords & rankings ─────────────────────────────────────────────────────

#[tokio::test]
async fn place_keyword_triple_is_unique() {
  let t = tracker().await;
  let p = place(&t).await;
  let first = keyword(&t, &p).await;
  assert_eq!(first.keyword.as_deref(), Some("gangnam cafe"));

  let err = t
    .add_place_keyword(AddPlaceKeyword {
      place_id: p.place_id,
      keyword:  "gangnam cafe".into(),
      region:   Some("   ".into()),
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  let seoul = t
    .add_place_keyword(AddPlaceKeyword {
      place_id: p.place_id,
      keyword:  "gangnam cafe".into(),
      region:   Some("Seoul".into()),
    })
    .await
    .unwrap();
  assert_eq!(seoul.keyword_id, first.keyword_id);

  let all = t.list_place_keywords(p.place_id, ViewOptions::PLAIN).await.unwrap();
  assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn concurrent_duplicate_place_keyword_is_one_conflict() {
  let t = tracker().await;
  let p = place(&t).await;
  let add = || {
    t.add_place_keyword(AddPlaceKeyword {
      place_id: p.place_id,
      keyword:  "Hongdae Bakery".into(),
      region:   None,
    })
  };

  let (a, b) = tokio::join!(add(), add());
  let conflicts = [&a, &b]
    .iter()
    .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::Conflict))
    .count();
  assert_eq!(conflicts, 1, "{a:?} / {b:?}");
  assert!(a.is_ok() || b.is_ok());

  let all = t.list_place_keywords(p.place_id, ViewOptions::PLAIN).await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn latest_ranking_is_max_checked_at() {
  let t = tracker().await;
  let p = place(&t).await;
  let pk = keyword(&t, &p).await;
  let id = pk.place_keyword_id;

  assert!(t.latest_ranking(id, ViewOptions::PLAIN).await.unwrap().is_none());

  // Inserted out of order: T, T-2d, T-1d.
  for (offset, rank) in [(0, 1), (-2, 9), (-1, 4)] {
    t.record_ranking(ranking(id, rank, t0() + Duration::days(offset)), ViewOptions::PLAIN)
      .await
      .unwrap();
  }

  let latest = t
    .latest_ranking(id, ViewOptions::FULL)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(latest.rank, Some(1));
  assert_eq!(latest.checked_at, t0());
  assert_eq!(latest.keyword.as_deref(), Some("gangnam cafe"));
  assert_eq!(latest.place_name.as_deref(), Some("Cafe Mori"));
}

#[tokio::test]
async fn inactive_place_keyword_rejects_rankings() {
  let t = tracker().await;
  let p = place(&t).await;
  let pk = keyword(&t, &p).await;
  t.set_place_keyword_active(pk.place_keyword_id, false, ViewOptions::PLAIN)
    .await
    .unwrap();

  let err = t
    .record_ranking(ranking(pk.place_keyword_id, 3, t0()), ViewOptions::PLAIN)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidState);
}

// ─── Competitors ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn competitor_pair_is_unique_and_gated() {
  let t = tracker().await;
  let p = place(&t).await;
  let new = NewCompetitor {
    place_id:    p.place_id,
    external_id: "5678".into(),
    name:        "Bean Brothers".into(),
    category:    None,
  };
  let c = t.add_competitor(new.clone()).await.unwrap();
  let err = t.add_competitor(new).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
  assert_eq!(t.list_competitors(p.place_id).await.unwrap().len(), 1);

  let snapshot = NewCompetitorSnapshot {
    competitor_id:        c.competitor_id,
    rank:                 Some(2),
    blog_review_count:    Some(40),
    visitor_review_count: None,
    average_rating:       Some(4.1),
    checked_at:           t0(),
  };
  let view = t
    .record_competitor_snapshot(snapshot.clone(), ViewOptions::FULL)
    .await
    .unwrap();
  assert_eq!(view.total_review_count, None);
  assert_eq!(view.competitor_name.as_deref(), Some("Bean Brothers"));

  t.update_competitor(c.competitor_id, rankwatch_core::entity::CompetitorUpdate {
    is_active: Some(false),
    ..Default::default()
  })
  .await
  .unwrap();
  let err = t
    .record_competitor_snapshot(snapshot, ViewOptions::PLAIN)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn concurrent_duplicate_competitor_is_one_conflict() {
  let t = tracker().await;
  let p = place(&t).await;
  let new = NewCompetitor {
    place_id:    p.place_id,
    external_id: "9012".into(),
    name:        "Daily Roast".into(),
    category:    Some("cafe".into()),
  };

  let (a, b) = tokio::join!(t.add_competitor(new.clone()), t.add_competitor(new));
  let conflicts = [&a, &b]
    .iter()
    .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::Conflict))
    .count();
  assert_eq!(conflicts, 1, "{a:?} / {b:?}");
  assert!(a.is_ok() || b.is_ok());
  assert_eq!(t.list_competitors(p.place_id).await.unwrap().len(), 1);
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_external_review_is_conflict() {
  let t = tracker().await;
  let p = place(&t).await;
  t.record_review(review(&p, "r-1", Sentiment::Positive, 0), ViewOptions::PLAIN)
    .await
    .unwrap();
  let err = t
    .record_review(review(&p, "r-1", Sentiment::Positive, 1), ViewOptions::PLAIN)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn reviews_filter_then_cap() {
  let t = tracker().await;
  let p = place(&t).await;
  let sentiments = [
    Sentiment::Positive,
    Sentiment::Negative,
    Sentiment::Positive,
    Sentiment::Neutral,
    Sentiment::Positive,
  ];
  for (i, sentiment) in sentiments.into_iter().enumerate() {
    t.record_review(review(&p, &format!("r-{i}"), sentiment, i as i64), ViewOptions::PLAIN)
      .await
      .unwrap();
  }

  let positive = t
    .reviews(
      p.place_id,
      ReviewQuery { sentiment: Some(Sentiment::Positive), limit: Some(2), ..Default::default() },
      ViewOptions::PLAIN,
    )
    .await
    .unwrap();
  let ids: Vec<_> = positive
    .iter()
    .map(|r| r.external_review_id.clone().unwrap())
    .collect();
  assert_eq!(ids, vec!["r-4", "r-2"]);

  // Every review is a visitor review, so the window passes the filter whole.
  let windowed = t
    .reviews(
      p.place_id,
      ReviewQuery { review_type: Some(ReviewType::Visitor), limit: Some(3), ..Default::default() },
      ViewOptions::PLAIN,
    )
    .await
    .unwrap();
  assert_eq!(windowed.len(), 3);

  let blog = t
    .reviews(
      p.place_id,
      ReviewQuery { review_type: Some(ReviewType::Blog), ..Default::default() },
      ViewOptions::PLAIN,
    )
    .await
    .unwrap();
  assert!(blog.is_empty());
}

#[tokio::test]
async fn review_summary_aggregates_window() {
  let t = tracker().await;
  let p = place(&t).await;
  t.record_review(review(&p, "old", Sentiment::Negative, -48), ViewOptions::PLAIN)
    .await
    .unwrap();
  let mut five = review(&p, "a", Sentiment::Positive, 0);
  five.rating = Some(5);
  t.record_review(five, ViewOptions::PLAIN).await.unwrap();
  let mut unrated = review(&p, "b", Sentiment::Neutral, 1);
  unrated.rating = None;
  unrated.review_type = ReviewType::Blog;
  t.record_review(unrated, ViewOptions::PLAIN).await.unwrap();
  t.record_review(review(&p, "c", Sentiment::Positive, 2), ViewOptions::PLAIN)
    .await
    .unwrap();

  let summary = t.review_summary(p.place_id, t0()).await.unwrap();
  assert_eq!(summary.total, 3);
  assert_eq!(summary.by_type.visitor, 2);
  assert_eq!(summary.by_type.blog, 1);
  assert_eq!(summary.by_sentiment.positive, 2);
  assert_eq!(summary.by_sentiment.neutral, 1);
  assert_eq!(summary.by_sentiment.negative, 0);
  assert_eq!(summary.average_rating, Some(4.5));
}

// ─── Ingest ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ingest_dispatches_by_target() {
  let t = tracker().await;
  let p = place(&t).await;
  let pk = keyword(&t, &p).await;

  let metrics = ObservedMetrics {
    rank: Some(7),
    search_result_count: Some(210),
    observed_at: t0(),
    ..Default::default()
  };
  let outcome = t
    .ingest(ScrapeTarget::Ranking { place_keyword_id: pk.place_keyword_id }, metrics)
    .await
    .unwrap();
  let IngestOutcome::Ranking(view) = outcome else {
    panic!("expected a ranking, got {outcome:?}");
  };
  assert_eq!(view.rank, Some(7));

  let partial = ObservedMetrics {
    blog_review_count: Some(3),
    observed_at: t0(),
    ..Default::default()
  };
  let err = t
    .ingest(ScrapeTarget::ReviewStats { place_id: p.place_id }, partial)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn matching_condition_queues_notification() {
  let t = tracker().await;
  let p = place(&t).await;
  let pk = keyword(&t, &p).await;

  t.create_notification_setting(NewNotificationSetting {
    user_id:           p.user_id,
    place_id:          Some(p.place_id),
    notification_type: NotificationType::RankingChange,
    channel:           Channel::Email,
    is_enabled:        true,
    conditions:        conditions(json!({ "rank_above": 10 })),
  })
  .await
  .unwrap();

  t.record_ranking(ranking(pk.place_keyword_id, 4, t0()), ViewOptions::PLAIN)
    .await
    .unwrap();
  assert!(t.pending_notifications(None).await.unwrap().is_empty());

  t.record_ranking(
    ranking(pk.place_keyword_id, 12, t0() + Duration::hours(1)),
    ViewOptions::PLAIN,
  )
  .await
  .unwrap();
  let pending = t.pending_notifications(None).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].place_id, p.place_id);
  assert!(pending[0].message.contains("rank above 10"), "{}", pending[0].message);
}

#[tokio::test]
async fn changed_condition_compares_previous_fact() {
  let t = tracker().await;
  let p = place(&t).await;
  t.create_notification_setting(NewNotificationSetting {
    user_id:           p.user_id,
    place_id:          None,
    notification_type: NotificationType::ReviewChange,
    channel:           Channel::Push,
    is_enabled:        true,
    conditions:        conditions(json!({ "total_review_count_changed": true })),
  })
  .await
  .unwrap();

  for (hours, blog) in [(0, 5), (1, 5), (2, 6)] {
    t.record_review_history(
      review_stats(&p, blog, 10, t0() + Duration::hours(hours)),
      ViewOptions::PLAIN,
    )
    .await
    .unwrap();
  }

  let pending = t.pending_notifications(None).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert!(pending[0].message.contains("from 15 to 16"), "{}", pending[0].message);
}

#[tokio::test]
async fn late_ranking_compares_with_its_own_predecessor() {
  let t = tracker().await;
  let p = place(&t).await;
  let pk = keyword(&t, &p).await;
  let id = pk.place_keyword_id;
  t.create_notification_setting(NewNotificationSetting {
    user_id:           p.user_id,
    place_id:          Some(p.place_id),
    notification_type: NotificationType::RankingChange,
    channel:           Channel::Email,
    is_enabled:        true,
    conditions:        conditions(json!({ "rank_changed": true })),
  })
  .await
  .unwrap();

  t.record_ranking(ranking(id, 3, t0()), ViewOptions::PLAIN)
    .await
    .unwrap();
  // Observed two days before the rank already on record; nothing precedes it.
  t.record_ranking(ranking(id, 7, t0() - Duration::days(2)), ViewOptions::PLAIN)
    .await
    .unwrap();
  assert!(t.pending_notifications(None).await.unwrap().is_empty());

  // Observed between the two: compared with the older rank 7.
  t.record_ranking(ranking(id, 5, t0() - Duration::days(1)), ViewOptions::PLAIN)
    .await
    .unwrap();
  let pending = t.pending_notifications(None).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert!(pending[0].message.contains("from 7 to 5"), "{}", pending[0].message);
}

#[tokio::test]
async fn disabled_trigger_queues_nothing() {
  let policy = TrackingPolicy { notify: false, ..TrackingPolicy::default() };
  let t = tracker_with(policy).await;
  let p = place(&t).await;
  t.create_notification_setting(NewNotificationSetting {
    user_id:           p.user_id,
    place_id:          None,
    notification_type: NotificationType::ReviewChange,
    channel:           Channel::Sms,
    is_enabled:        true,
    conditions:        ConditionMap::new(),
  })
  .await
  .unwrap();
  t.record_review_history(review_stats(&p, 1, 1, t0()), ViewOptions::PLAIN)
    .await
    .unwrap();
  assert!(t.pending_notifications(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn setting_place_must_belong_to_user() {
  let t = tracker().await;
  let p = place(&t).await;
  let stranger = t
    .register_user(NewUser { email: "other@example.com".into(), name: "Other".into() })
    .await
    .unwrap();

  let err = t
    .create_notification_setting(NewNotificationSetting {
      user_id:           stranger.user_id,
      place_id:          Some(p.place_id),
      notification_type: NotificationType::NewReview,
      channel:           Channel::Email,
      is_enabled:        true,
      conditions:        ConditionMap::new(),
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidState);
  assert!(t.list_notification_settings(stranger.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn delivery_completes_once() {
  let t = tracker().await;
  let p = place(&t).await;
  t.create_notification_setting(NewNotificationSetting {
    user_id:           p.user_id,
    place_id:          Some(p.place_id),
    notification_type: NotificationType::NewReview,
    channel:           Channel::Webhook,
    is_enabled:        true,
    conditions:        ConditionMap::new(),
  })
  .await
  .unwrap();
  t.record_review(review(&p, "r-1", Sentiment::Positive, 0), ViewOptions::PLAIN)
    .await
    .unwrap();

  let pending = t.pending_notifications(Some(10)).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].message, "[Cafe Mori] new review recorded");

  let log_id = pending[0].log_id;
  let done = t
    .complete_delivery(log_id, DeliveryOutcome::Sent { at: t0() })
    .await
    .unwrap();
  assert!(done.is_sent);
  assert!(t.pending_notifications(None).await.unwrap().is_empty());

  let err = t
    .complete_delivery(log_id, DeliveryOutcome::Failed { error: "late".into() })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidState);

  let err = t
    .complete_delivery(Uuid::new_v4(), DeliveryOutcome::Sent { at: t0() })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn concurrent_delivery_reports_complete_once() {
  let t = tracker().await;
  let p = place(&t).await;
  t.create_notification_setting(NewNotificationSetting {
    user_id:           p.user_id,
    place_id:          None,
    notification_type: NotificationType::NewReview,
    channel:           Channel::Push,
    is_enabled:        true,
    conditions:        ConditionMap::new(),
  })
  .await
  .unwrap();
  t.record_review(review(&p, "r-9", Sentiment::Neutral, 0), ViewOptions::PLAIN)
    .await
    .unwrap();
  let log_id = t.pending_notifications(None).await.unwrap()[0].log_id;

  let (sent, failed) = tokio::join!(
    t.complete_delivery(log_id, DeliveryOutcome::Sent { at: t0() }),
    t.complete_delivery(log_id, DeliveryOutcome::Failed { error: "timeout".into() }),
  );
  let (done, err) = match (sent, failed) {
    (Ok(done), Err(err)) | (Err(err), Ok(done)) => (done, err),
    other => panic!("exactly one report must win: {other:?}"),
  };
  assert_eq!(err.kind(), ErrorKind::InvalidState);
  assert!(done.is_sent != done.error_message.is_some());
  assert!(t.pending_notifications(None).await.unwrap().is_empty());
}
