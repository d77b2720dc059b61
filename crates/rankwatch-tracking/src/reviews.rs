//! Review statistics history, individual reviews, and the review summary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use rankwatch_core::{
  Error, Result,
  fact::{
    DateRange, NewReview, NewReviewHistory, Review, ReviewHistory, ReviewType,
    Sentiment,
  },
  store::{FactRepository, TrackingStore},
  validate::Validate as _,
  view::{
    ReviewHistoryView, ReviewView, ViewOptions, review_history_view,
    review_view,
  },
};

use crate::{HistoryQuery, Tracker, gate};

/// Filters over a place's reviews.
///
/// The window is fetched first (the date range, or the most recent `limit`
/// reviews), then narrowed by type and sentiment, then capped at `limit`.
/// A range without an explicit limit is not capped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewQuery {
  pub review_type: Option<ReviewType>,
  pub sentiment:   Option<Sentiment>,
  pub range:       Option<DateRange>,
  pub limit:       Option<usize>,
}

impl ReviewQuery {
  fn matches(&self, review: &Review) -> bool {
    self.review_type.is_none_or(|t| review.review_type == t)
      && self.sentiment.is_none_or(|s| review.sentiment == Some(s))
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
  pub blog:    usize,
  pub visitor: usize,
  pub other:   usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
  pub positive:     usize,
  pub negative:     usize,
  pub neutral:      usize,
  pub unclassified: usize,
}

/// Simple aggregation over the reviews collected since a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
  pub place_id:       Uuid,
  pub since:          DateTime<Utc>,
  pub total:          usize,
  pub by_type:        TypeCounts,
  pub by_sentiment:   SentimentCounts,
  /// Mean of the rated reviews, two decimals. `None` when none were rated.
  pub average_rating: Option<f64>,
}

impl ReviewSummary {
  fn from_reviews(place_id: Uuid, since: DateTime<Utc>, reviews: &[Review]) -> Self {
    let mut by_type = TypeCounts::default();
    let mut by_sentiment = SentimentCounts::default();
    let (mut rating_sum, mut rated) = (0u32, 0u32);

    for review in reviews {
      match review.review_type {
        ReviewType::Blog => by_type.blog += 1,
        ReviewType::Visitor => by_type.visitor += 1,
        ReviewType::Other => by_type.other += 1,
      }
      match review.sentiment {
        Some(Sentiment::Positive) => by_sentiment.positive += 1,
        Some(Sentiment::Negative) => by_sentiment.negative += 1,
        Some(Sentiment::Neutral) => by_sentiment.neutral += 1,
        None => by_sentiment.unclassified += 1,
      }
      if let Some(rating) = review.rating {
        rating_sum += u32::from(rating);
        rated += 1;
      }
    }

    let average_rating = (rated > 0).then(|| {
      let mean = f64::from(rating_sum) / f64::from(rated);
      (mean * 100.0).round() / 100.0
    });

    Self {
      place_id,
      since,
      total: reviews.len(),
      by_type,
      by_sentiment,
      average_rating,
    }
  }
}

impl<S: TrackingStore> Tracker<S> {
  // ─── Review statistics ─────────────────────────────────────────────────

  pub async fn record_review_history(
    &self,
    input: NewReviewHistory,
    opts: ViewOptions,
  ) -> Result<ReviewHistoryView> {
    let place = self.get_place(input.place_id).await?;
    gate(&place)?;

    let fact = self
      .append::<ReviewHistory>(place.place_id, &place, &place.name, input)
      .await?;
    Ok(review_history_view(&fact, Some(&place), opts))
  }

  pub async fn latest_review_history(
    &self,
    place_id: Uuid,
    opts: ViewOptions,
  ) -> Result<Option<ReviewHistoryView>> {
    let place = self.get_place(place_id).await?;
    debug!(%place_id, "fetching latest review statistics");
    let latest = self.latest::<ReviewHistory>(place_id).await?;
    Ok(latest.map(|fact| review_history_view(&fact, Some(&place), opts)))
  }

  pub async fn review_history(
    &self,
    place_id: Uuid,
    query: HistoryQuery,
    opts: ViewOptions,
  ) -> Result<Vec<ReviewHistoryView>> {
    let place = self.get_place(place_id).await?;
    debug!(%place_id, ?query, "fetching review statistics history");
    let facts = self.history::<ReviewHistory>(place_id, &query).await?;
    Ok(
      facts
        .iter()
        .map(|fact| review_history_view(fact, Some(&place), opts))
        .collect(),
    )
  }

  // ─── Reviews ───────────────────────────────────────────────────────────

  /// A review carrying an external id is recorded at most once per place.
  pub async fn record_review(
    &self,
    input: NewReview,
    opts: ViewOptions,
  ) -> Result<ReviewView> {
    let place = self.get_place(input.place_id).await?;
    gate(&place)?;

    if let Some(external_id) = input.external_review_id.as_deref() {
      let existing = self
        .store
        .find_review_by_external_id(place.place_id, external_id)
        .await
        .map_err(Error::store)?;
      if existing.is_some() {
        return Err(Error::Conflict(format!(
          "review {external_id} was already recorded for place {}",
          place.place_id
        )));
      }
    }

    let fact = self
      .append::<Review>(place.place_id, &place, &place.name, input)
      .await?;
    Ok(review_view(&fact, Some(&place), opts))
  }

  pub async fn reviews(
    &self,
    place_id: Uuid,
    query: ReviewQuery,
    opts: ViewOptions,
  ) -> Result<Vec<ReviewView>> {
    let place = self.get_place(place_id).await?;
    debug!(%place_id, ?query, "fetching reviews");
    let limit = self.policy.limit(query.limit);
    let cap = match (query.range, query.limit) {
      (Some(_), None) => usize::MAX,
      _ => limit,
    };

    let window = match (query.range, query.sentiment) {
      (Some(range), _) => {
        range.validate()?;
        <S as FactRepository<Review>>::find_in_range(&*self.store, place_id, range)
          .await
          .map_err(Error::store)?
      }
      (None, Some(sentiment)) => self
        .store
        .find_reviews_by_sentiment(place_id, sentiment, limit)
        .await
        .map_err(Error::store)?,
      (None, None) => {
        <S as FactRepository<Review>>::find_by_parent(&*self.store, place_id, limit)
          .await
          .map_err(Error::store)?
      }
    };

    Ok(
      window
        .iter()
        .filter(|review| query.matches(review))
        .take(cap)
        .map(|review| review_view(review, Some(&place), opts))
        .collect(),
    )
  }

  pub async fn review_summary(
    &self,
    place_id: Uuid,
    since: DateTime<Utc>,
  ) -> Result<ReviewSummary> {
    self.get_place(place_id).await?;
    let reviews = self
      .store
      .find_reviews_since(place_id, since)
      .await
      .map_err(Error::store)?;
    debug!(%place_id, count = reviews.len(), "summarising reviews");
    Ok(ReviewSummary::from_reviews(place_id, since, &reviews))
  }
}
