//! Append-only fact tables behind the generic [`FactRepository`] contract.
//!
//! Each fact type describes its table once through [`SqlFact`]; the queries
//! are shared. Every read orders by the observation column descending and
//! breaks ties by `rowid` descending, so the last insert among equal
//! timestamps comes first.

use chrono::{DateTime, Utc};
use rusqlite::{Row, types::Value};
use uuid::Uuid;

use rankwatch_core::{
  fact::{
    CompetitorSnapshot, DateRange, Fact, RankingHistory, Review, ReviewHistory,
    Sentiment,
  },
  store::{FactRepository, ReviewStore},
};

use crate::{
  Result, SqliteStore,
  encode::{
    RawRanking, RawReview, RawReviewHistory, RawSnapshot, encode_dt,
    encode_uuid,
  },
};

/// Table layout of one fact type.
pub trait SqlFact: Fact {
  const TABLE: &'static str;
  const PARENT_COLUMN: &'static str;
  const TIME_COLUMN: &'static str;
  const ID_COLUMN: &'static str;
  /// Column list in the order of [`SqlFact::values`] and [`SqlFact::read`].
  const COLUMNS: &'static str;

  type Raw: Send + 'static;

  fn read(row: &Row<'_>) -> rusqlite::Result<Self::Raw>;
  fn decode(raw: Self::Raw) -> Result<Self>;
  fn build(input: Self::New, id: Uuid, created_at: DateTime<Utc>) -> Self;
  fn values(&self) -> Vec<Value>;
}

fn placeholders(n: usize) -> String {
  (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

impl SqliteStore {
  /// Facts of type `F` matching `clause`, newest first.
  pub(crate) async fn select_facts<F: SqlFact>(
    &self,
    clause: &str,
    params: Vec<Value>,
    limit: Option<usize>,
  ) -> Result<Vec<F>> {
    let mut sql = format!(
      "SELECT {cols} FROM {table} WHERE {clause}
       ORDER BY {time} DESC, rowid DESC",
      cols = F::COLUMNS,
      table = F::TABLE,
      time = F::TIME_COLUMN,
    );
    if let Some(limit) = limit {
      sql.push_str(&format!(" LIMIT {limit}"));
    }
    self
      .query_all(sql, params, F::read)
      .await?
      .into_iter()
      .map(F::decode)
      .collect()
  }
}

impl<F: SqlFact> FactRepository<F> for SqliteStore {
  async fn save_fact(&self, input: F::New) -> Result<F> {
    let fact = F::build(input, Uuid::new_v4(), Utc::now());
    let values = fact.values();
    let sql = format!(
      "INSERT INTO {} ({}) VALUES ({})",
      F::TABLE,
      F::COLUMNS,
      placeholders(values.len())
    );
    self.execute(sql, values).await?;
    Ok(fact)
  }

  async fn find_by_parent(&self, parent_id: Uuid, limit: usize) -> Result<Vec<F>> {
    let clause = format!("{} = ?1", F::PARENT_COLUMN);
    self
      .select_facts(&clause, vec![Value::Text(encode_uuid(parent_id))], Some(limit))
      .await
  }

  async fn find_in_range(&self, parent_id: Uuid, range: DateRange) -> Result<Vec<F>> {
    let clause = format!(
      "{} = ?1 AND {} BETWEEN ?2 AND ?3",
      F::PARENT_COLUMN,
      F::TIME_COLUMN
    );
    let params = vec![
      Value::Text(encode_uuid(parent_id)),
      Value::Text(encode_dt(range.start)),
      Value::Text(encode_dt(range.end)),
    ];
    self.select_facts(&clause, params, None).await
  }

  async fn find_latest(&self, parent_id: Uuid) -> Result<Option<F>> {
    let clause = format!("{} = ?1", F::PARENT_COLUMN);
    Ok(
      self
        .select_facts::<F>(&clause, vec![Value::Text(encode_uuid(parent_id))], Some(1))
        .await?
        .into_iter()
        .next(),
    )
  }

  async fn find_previous<'a>(&'a self, fact: &'a F) -> Result<Option<F>> {
    let clause = format!(
      "{parent} = ?1 AND {id} <> ?3 AND ({time} < ?2 OR ({time} = ?2 AND \
       rowid < (SELECT rowid FROM {table} WHERE {id} = ?3)))",
      parent = F::PARENT_COLUMN,
      id = F::ID_COLUMN,
      time = F::TIME_COLUMN,
      table = F::TABLE,
    );
    let params = vec![
      Value::Text(encode_uuid(fact.parent_id())),
      Value::Text(encode_dt(fact.observed_at())),
      Value::Text(encode_uuid(fact.fact_id())),
    ];
    Ok(self.select_facts::<F>(&clause, params, Some(1)).await?.into_iter().next())
  }
}

impl ReviewStore for SqliteStore {
  async fn find_review_by_external_id<'a>(
    &'a self,
    place_id: Uuid,
    external_review_id: &'a str,
  ) -> Result<Option<Review>> {
    let params = vec![
      Value::Text(encode_uuid(place_id)),
      Value::Text(external_review_id.to_owned()),
    ];
    Ok(
      self
        .select_facts::<Review>(
          "place_id = ?1 AND external_review_id = ?2",
          params,
          Some(1),
        )
        .await?
        .into_iter()
        .next(),
    )
  }

  async fn find_reviews_by_sentiment(
    &self,
    place_id: Uuid,
    sentiment: Sentiment,
    limit: usize,
  ) -> Result<Vec<Review>> {
    let params = vec![
      Value::Text(encode_uuid(place_id)),
      Value::Text(sentiment.as_ref().to_owned()),
    ];
    self
      .select_facts("place_id = ?1 AND sentiment = ?2", params, Some(limit))
      .await
  }

  async fn find_reviews_since(
    &self,
    place_id: Uuid,
    since: DateTime<Utc>,
  ) -> Result<Vec<Review>> {
    let params = vec![
      Value::Text(encode_uuid(place_id)),
      Value::Text(encode_dt(since)),
    ];
    self
      .select_facts("place_id = ?1 AND collected_at >= ?2", params, None)
      .await
  }
}

// ─── Table layouts ───────────────────────────────────────────────────────────

impl SqlFact for RankingHistory {
  const TABLE: &'static str = "ranking_history";
  const ID_COLUMN: &'static str = "ranking_id";
  const PARENT_COLUMN: &'static str = "place_keyword_id";
  const TIME_COLUMN: &'static str = "checked_at";
  const COLUMNS: &'static str = "ranking_id, place_keyword_id, rank, \
                                 search_result_count, checked_at, created_at";

  type Raw = RawRanking;

  fn read(row: &Row<'_>) -> rusqlite::Result<RawRanking> { RawRanking::from_row(row) }

  fn decode(raw: RawRanking) -> Result<Self> { raw.into_ranking() }

  fn build(input: Self::New, id: Uuid, created_at: DateTime<Utc>) -> Self {
    Self {
      ranking_id: id,
      place_keyword_id: input.place_keyword_id,
      rank: input.rank,
      search_result_count: input.search_result_count,
      checked_at: input.checked_at,
      created_at,
    }
  }

  fn values(&self) -> Vec<Value> {
    vec![
      Value::Text(encode_uuid(self.ranking_id)),
      Value::Text(encode_uuid(self.place_keyword_id)),
      Value::from(self.rank),
      Value::from(self.search_result_count),
      Value::Text(encode_dt(self.checked_at)),
      Value::Text(encode_dt(self.created_at)),
    ]
  }
}

impl SqlFact for ReviewHistory {
  const TABLE: &'static str = "review_history";
  const ID_COLUMN: &'static str = "review_history_id";
  const PARENT_COLUMN: &'static str = "place_id";
  const TIME_COLUMN: &'static str = "checked_at";
  const COLUMNS: &'static str = "review_history_id, place_id, blog_review_count, \
                                 visitor_review_count, average_rating, \
                                 checked_at, created_at";

  type Raw = RawReviewHistory;

  fn read(row: &Row<'_>) -> rusqlite::Result<RawReviewHistory> {
    RawReviewHistory::from_row(row)
  }

  fn decode(raw: RawReviewHistory) -> Result<Self> { raw.into_review_history() }

  fn build(input: Self::New, id: Uuid, created_at: DateTime<Utc>) -> Self {
    Self {
      review_history_id: id,
      place_id: input.place_id,
      blog_review_count: input.blog_review_count,
      visitor_review_count: input.visitor_review_count,
      average_rating: input.average_rating,
      checked_at: input.checked_at,
      created_at,
    }
  }

  fn values(&self) -> Vec<Value> {
    vec![
      Value::Text(encode_uuid(self.review_history_id)),
      Value::Text(encode_uuid(self.place_id)),
      Value::from(self.blog_review_count),
      Value::from(self.visitor_review_count),
      Value::from(self.average_rating),
      Value::Text(encode_dt(self.checked_at)),
      Value::Text(encode_dt(self.created_at)),
    ]
  }
}

impl SqlFact for CompetitorSnapshot {
  const TABLE: &'static str = "competitor_snapshots";
  const ID_COLUMN: &'static str = "snapshot_id";
  const PARENT_COLUMN: &'static str = "competitor_id";
  const TIME_COLUMN: &'static str = "checked_at";
  const COLUMNS: &'static str = "snapshot_id, competitor_id, rank, \
                                 blog_review_count, visitor_review_count, \
                                 average_rating, checked_at, created_at";

  type Raw = RawSnapshot;

  fn read(row: &Row<'_>) -> rusqlite::Result<RawSnapshot> { RawSnapshot::from_row(row) }

  fn decode(raw: RawSnapshot) -> Result<Self> { raw.into_snapshot() }

  fn build(input: Self::New, id: Uuid, created_at: DateTime<Utc>) -> Self {
    Self {
      snapshot_id: id,
      competitor_id: input.competitor_id,
      rank: input.rank,
      blog_review_count: input.blog_review_count,
      visitor_review_count: input.visitor_review_count,
      average_rating: input.average_rating,
      checked_at: input.checked_at,
      created_at,
    }
  }

  fn values(&self) -> Vec<Value> {
    vec![
      Value::Text(encode_uuid(self.snapshot_id)),
      Value::Text(encode_uuid(self.competitor_id)),
      Value::from(self.rank),
      Value::from(self.blog_review_count),
      Value::from(self.visitor_review_count),
      Value::from(self.average_rating),
      Value::Text(encode_dt(self.checked_at)),
      Value::Text(encode_dt(self.created_at)),
    ]
  }
}

impl SqlFact for Review {
  const TABLE: &'static str = "reviews";
  const ID_COLUMN: &'static str = "review_id";
  const PARENT_COLUMN: &'static str = "place_id";
  const TIME_COLUMN: &'static str = "collected_at";
  const COLUMNS: &'static str = "review_id, place_id, review_type, content, \
                                 author, rating, sentiment, sentiment_score, \
                                 external_review_id, published_at, \
                                 collected_at, created_at";

  type Raw = RawReview;

  fn read(row: &Row<'_>) -> rusqlite::Result<RawReview> { RawReview::from_row(row) }

  fn decode(raw: RawReview) -> Result<Self> { raw.into_review() }

  fn build(input: Self::New, id: Uuid, created_at: DateTime<Utc>) -> Self {
    Self {
      review_id: id,
      place_id: input.place_id,
      review_type: input.review_type,
      content: input.content,
      author: input.author,
      rating: input.rating,
      sentiment: input.sentiment,
      sentiment_score: input.sentiment_score,
      external_review_id: input.external_review_id,
      published_at: input.published_at,
      collected_at: input.collected_at,
      created_at,
    }
  }

  fn values(&self) -> Vec<Value> {
    vec![
      Value::Text(encode_uuid(self.review_id)),
      Value::Text(encode_uuid(self.place_id)),
      Value::Text(self.review_type.as_ref().to_owned()),
      Value::from(self.content.clone()),
      Value::from(self.author.clone()),
      Value::from(self.rating),
      Value::from(self.sentiment.map(|s| s.as_ref().to_owned())),
      Value::from(self.sentiment_score),
      Value::from(self.external_review_id.clone()),
      Value::from(self.published_at.map(encode_dt)),
      Value::Text(encode_dt(self.collected_at)),
      Value::Text(encode_dt(self.created_at)),
    ]
  }
}
