//! Response projection: externally shaped views of facts and entities.
//!
//! Projection is pure. Denormalised relation fields are copied only when
//! [`ViewOptions::include_relations`] is set *and* the relation was loaded;
//! otherwise they are omitted from the serialised output entirely. Computed
//! fields appear only when [`ViewOptions::include_computed`] is set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  entity::{Competitor, Place, PlaceKeyword, PlaceKeywordDetail},
  fact::{
    CompetitorSnapshot, RankingHistory, Review, ReviewHistory, ReviewType,
    Sentiment,
  },
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ViewOptions {
  #[serde(default)]
  pub include_relations: bool,
  #[serde(default)]
  pub include_computed:  bool,
}

impl ViewOptions {
  pub const PLAIN: Self = Self { include_relations: false, include_computed: false };
  pub const FULL: Self = Self { include_relations: true, include_computed: true };

  pub fn with_computed(mut self) -> Self {
    self.include_computed = true;
    self
  }

  /// The relation, if it should be copied onto the view.
  fn relation<'a, T: ?Sized>(&self, loaded: Option<&'a T>) -> Option<&'a T> {
    loaded.filter(|_| self.include_relations)
  }
}

// ─── Ranking ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingView {
  pub ranking_id:          Uuid,
  pub place_keyword_id:    Uuid,
  pub rank:                Option<u32>,
  pub search_result_count: Option<u32>,
  pub checked_at:          DateTime<Utc>,
  pub created_at:          DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub keyword:             Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub region:              Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub place_id:            Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub place_name:          Option<String>,
}

pub fn ranking_view(
  fact: &RankingHistory,
  relation: Option<&PlaceKeywordDetail>,
  opts: ViewOptions,
) -> RankingView {
  let rel = opts.relation(relation);
  RankingView {
    ranking_id:          fact.ranking_id,
    place_keyword_id:    fact.place_keyword_id,
    rank:                fact.rank,
    search_result_count: fact.search_result_count,
    checked_at:          fact.checked_at,
    created_at:          fact.created_at,
    keyword:             rel.map(|d| d.keyword.clone()),
    region:              rel.and_then(|d| d.place_keyword.region.clone()),
    place_id:            rel.map(|d| d.place_keyword.place_id),
    place_name:          rel.map(|d| d.place_name.clone()),
  }
}

// ─── Review statistics ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewHistoryView {
  pub review_history_id:    Uuid,
  pub place_id:             Uuid,
  pub blog_review_count:    u32,
  pub visitor_review_count: u32,
  pub average_rating:       Option<f64>,
  pub checked_at:           DateTime<Utc>,
  pub created_at:           DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total_review_count:   Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub place_name:           Option<String>,
}

pub fn review_history_view(
  fact: &ReviewHistory,
  place: Option<&Place>,
  opts: ViewOptions,
) -> ReviewHistoryView {
  ReviewHistoryView {
    review_history_id:    fact.review_history_id,
    place_id:             fact.place_id,
    blog_review_count:    fact.blog_review_count,
    visitor_review_count: fact.visitor_review_count,
    average_rating:       fact.average_rating,
    checked_at:           fact.checked_at,
    created_at:           fact.created_at,
    total_review_count:   opts
      .include_computed
      .then(|| fact.total_review_count()),
    place_name:           opts.relation(place).map(|p| p.name.clone()),
  }
}

// ─── Competitor snapshots ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorSnapshotView {
  pub snapshot_id:          Uuid,
  pub competitor_id:        Uuid,
  pub rank:                 Option<u32>,
  pub blog_review_count:    Option<u32>,
  pub visitor_review_count: Option<u32>,
  pub average_rating:       Option<f64>,
  pub checked_at:           DateTime<Utc>,
  pub created_at:           DateTime<Utc>,
  /// Only when requested and both components were observed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total_review_count:   Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub competitor_name:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub place_id:             Option<Uuid>,
}

pub fn competitor_snapshot_view(
  fact: &CompetitorSnapshot,
  competitor: Option<&Competitor>,
  opts: ViewOptions,
) -> CompetitorSnapshotView {
  let total = match (fact.blog_review_count, fact.visitor_review_count) {
    (Some(blog), Some(visitor)) if opts.include_computed => {
      Some(u64::from(blog) + u64::from(visitor))
    }
    _ => None,
  };
  let rel = opts.relation(competitor);
  CompetitorSnapshotView {
    snapshot_id:          fact.snapshot_id,
    competitor_id:        fact.competitor_id,
    rank:                 fact.rank,
    blog_review_count:    fact.blog_review_count,
    visitor_review_count: fact.visitor_review_count,
    average_rating:       fact.average_rating,
    checked_at:           fact.checked_at,
    created_at:           fact.created_at,
    total_review_count:   total,
    competitor_name:      rel.map(|c| c.name.clone()),
    place_id:             rel.map(|c| c.place_id),
  }
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewView {
  pub review_id:          Uuid,
  pub place_id:           Uuid,
  pub review_type:        ReviewType,
  pub content:            Option<String>,
  pub author:             Option<String>,
  pub rating:             Option<u8>,
  pub sentiment:          Option<Sentiment>,
  pub sentiment_score:    Option<f64>,
  pub external_review_id: Option<String>,
  pub published_at:       Option<DateTime<Utc>>,
  pub collected_at:       DateTime<Utc>,
  pub created_at:         DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub place_name:         Option<String>,
}

pub fn review_view(
  fact: &Review,
  place: Option<&Place>,
  opts: ViewOptions,
) -> ReviewView {
  ReviewView {
    review_id:          fact.review_id,
    place_id:           fact.place_id,
    review_type:        fact.review_type,
    content:            fact.content.clone(),
    author:             fact.author.clone(),
    rating:             fact.rating,
    sentiment:          fact.sentiment,
    sentiment_score:    fact.sentiment_score,
    external_review_id: fact.external_review_id.clone(),
    published_at:       fact.published_at,
    collected_at:       fact.collected_at,
    created_at:         fact.created_at,
    place_name:         opts.relation(place).map(|p| p.name.clone()),
  }
}

// ─── Place keywords ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceKeywordView {
  pub place_keyword_id: Uuid,
  pub place_id:         Uuid,
  pub keyword_id:       Uuid,
  pub region:           Option<String>,
  pub is_active:        bool,
  pub created_at:       DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub keyword:          Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub place_name:       Option<String>,
}

pub fn place_keyword_view(
  place_keyword: &PlaceKeyword,
  keyword: Option<&str>,
  place_name: Option<&str>,
  opts: ViewOptions,
) -> PlaceKeywordView {
  PlaceKeywordView {
    place_keyword_id: place_keyword.place_keyword_id,
    place_id:         place_keyword.place_id,
    keyword_id:       place_keyword.keyword_id,
    region:           place_keyword.region.clone(),
    is_active:        place_keyword.is_active,
    created_at:       place_keyword.created_at,
    keyword:          opts.relation(keyword).map(|k| k.to_owned()),
    place_name:       opts.relation(place_name).map(|p| p.to_owned()),
  }
}

pub fn place_keyword_detail_view(
  detail: &PlaceKeywordDetail,
  opts: ViewOptions,
) -> PlaceKeywordView {
  place_keyword_view(
    &detail.place_keyword,
    Some(detail.keyword.as_str()),
    Some(detail.place_name.as_str()),
    opts,
  )
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn review_history(blog: u32, visitor: u32) -> ReviewHistory {
    let now = Utc::now();
    ReviewHistory {
      review_history_id:    Uuid::new_v4(),
      place_id:             Uuid::new_v4(),
      blog_review_count:    blog,
      visitor_review_count: visitor,
      average_rating:       Some(4.5),
      checked_at:           now,
      created_at:           now,
    }
  }

  fn place(id: Uuid) -> Place {
    let now = Utc::now();
    Place {
      place_id:    id,
      user_id:     Uuid::new_v4(),
      external_id: "1234".into(),
      name:        "Cafe Mori".into(),
      category:    None,
      address:     None,
      url:         None,
      is_active:   true,
      created_at:  now,
      updated_at:  now,
    }
  }

  #[test]
  fn total_is_only_computed_on_request() {
    let fact = review_history(10, 20);
    assert_eq!(
      review_history_view(&fact, None, ViewOptions::PLAIN).total_review_count,
      None
    );
    let view =
      review_history_view(&fact, None, ViewOptions::default().with_computed());
    assert_eq!(view.total_review_count, Some(30));
  }

  #[test]
  fn total_of_zero_counts_is_zero() {
    let fact = review_history(0, 0);
    let view =
      review_history_view(&fact, None, ViewOptions::default().with_computed());
    assert_eq!(view.total_review_count, Some(0));
  }

  #[test]
  fn relations_are_omitted_not_null() {
    let fact = review_history(1, 2);
    let p = place(fact.place_id);

    let plain = serde_json::to_value(review_history_view(
      &fact,
      Some(&p),
      ViewOptions::PLAIN,
    ))
    .unwrap();
    assert!(plain.get("place_name").is_none());
    assert!(plain.get("total_review_count").is_none());

    let full =
      serde_json::to_value(review_history_view(&fact, Some(&p), ViewOptions::FULL))
        .unwrap();
    assert_eq!(full["place_name"], json!("Cafe Mori"));
    assert_eq!(full["total_review_count"], json!(3));
  }

  #[test]
  fn competitor_total_requires_both_components() {
    let now = Utc::now();
    let mut snapshot = CompetitorSnapshot {
      snapshot_id:          Uuid::new_v4(),
      competitor_id:        Uuid::new_v4(),
      rank:                 Some(2),
      blog_review_count:    Some(5),
      visitor_review_count: None,
      average_rating:       None,
      checked_at:           now,
      created_at:           now,
    };
    let view = competitor_snapshot_view(&snapshot, None, ViewOptions::FULL);
    assert_eq!(view.total_review_count, None);

    snapshot.visitor_review_count = Some(7);
    let view = competitor_snapshot_view(&snapshot, None, ViewOptions::FULL);
    assert_eq!(view.total_review_count, Some(12));
  }
}
