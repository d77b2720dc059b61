//! Tracked place keywords and their ranking history.

use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use rankwatch_core::{
  Error, Resource, Result,
  entity::{NewPlaceKeyword, PlaceKeywordDetail, normalize_keyword, normalize_region},
  fact::{NewRanking, RankingHistory},
  store::TrackingStore,
  validate::{Validate, ValidationErrors},
  view::{PlaceKeywordView, RankingView, ViewOptions, place_keyword_detail_view, ranking_view},
};

use crate::{HistoryQuery, Tracker, gate, require};

/// Start tracking a search term for a place, optionally within a region.
#[derive(Debug, Clone, Deserialize)]
pub struct AddPlaceKeyword {
  pub place_id: Uuid,
  pub keyword:  String,
  #[serde(default)]
  pub region:   Option<String>,
}

impl Validate for AddPlaceKeyword {
  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if normalize_keyword(&self.keyword).is_empty() {
      errors.push("keyword", "must not be blank");
    }
    errors.into_result()
  }
}

impl<S: TrackingStore> Tracker<S> {
  async fn place_keyword_detail(&self, id: Uuid) -> Result<PlaceKeywordDetail> {
    let detail = self
      .store
      .get_place_keyword_detail(id)
      .await
      .map_err(Error::store)?;
    require(detail, Resource::PlaceKeyword, id)
  }

  /// The keyword is found or created by its normalised text; the
  /// (place, keyword, region) triple must be new.
  pub async fn add_place_keyword(
    &self,
    input: AddPlaceKeyword,
  ) -> Result<PlaceKeywordView> {
    let place = self.get_place(input.place_id).await?;
    let keyword = self
      .store
      .find_or_create_keyword(normalize_keyword(&input.keyword))
      .await
      .map_err(Error::store)?;
    let region = normalize_region(input.region.as_deref());

    let existing = self
      .store
      .find_place_keyword(place.place_id, keyword.keyword_id, region.clone())
      .await
      .map_err(Error::store)?;
    if existing.is_some() {
      return Err(Error::Conflict(format!(
        "keyword {:?} is already tracked for place {} in region {:?}",
        keyword.text,
        place.place_id,
        region.as_deref().unwrap_or_default()
      )));
    }

    let place_keyword = self
      .store
      .create_place_keyword(NewPlaceKeyword {
        place_id: place.place_id,
        keyword_id: keyword.keyword_id,
        region,
      })
      .await
      .map_err(Error::store)?;
    info!(
      place_keyword_id = %place_keyword.place_keyword_id,
      keyword = %keyword.text,
      "tracking keyword"
    );

    let detail = PlaceKeywordDetail {
      place_keyword,
      keyword: keyword.text,
      place_name: place.name,
    };
    Ok(place_keyword_detail_view(&detail, ViewOptions::FULL))
  }

  pub async fn list_place_keywords(
    &self,
    place_id: Uuid,
    opts: ViewOptions,
  ) -> Result<Vec<PlaceKeywordView>> {
    self.get_place(place_id).await?;
    let details = self
      .store
      .list_place_keywords(place_id)
      .await
      .map_err(Error::store)?;
    Ok(details.iter().map(|d| place_keyword_detail_view(d, opts)).collect())
  }

  pub async fn set_place_keyword_active(
    &self,
    id: Uuid,
    is_active: bool,
    opts: ViewOptions,
  ) -> Result<PlaceKeywordView> {
    let updated = self
      .store
      .set_place_keyword_active(id, is_active)
      .await
      .map_err(Error::store)?;
    require(updated, Resource::PlaceKeyword, id)?;
    info!(place_keyword_id = %id, is_active, "toggled keyword tracking");

    let detail = self.place_keyword_detail(id).await?;
    Ok(place_keyword_detail_view(&detail, opts))
  }

  // ─── Rankings ──────────────────────────────────────────────────────────

  pub async fn record_ranking(
    &self,
    input: NewRanking,
    opts: ViewOptions,
  ) -> Result<RankingView> {
    let detail = self.place_keyword_detail(input.place_keyword_id).await?;
    gate(&detail.place_keyword)?;
    let place = self.get_place(detail.place_keyword.place_id).await?;

    let subject = format!("{} / {}", detail.place_name, detail.keyword);
    let fact = self
      .append::<RankingHistory>(input.place_keyword_id, &place, &subject, input)
      .await?;
    Ok(ranking_view(&fact, Some(&detail), opts))
  }

  pub async fn latest_ranking(
    &self,
    place_keyword_id: Uuid,
    opts: ViewOptions,
  ) -> Result<Option<RankingView>> {
    let detail = self.place_keyword_detail(place_keyword_id).await?;
    debug!(%place_keyword_id, "fetching latest ranking");
    let latest = self.latest::<RankingHistory>(place_keyword_id).await?;
    Ok(latest.map(|fact| ranking_view(&fact, Some(&detail), opts)))
  }

  pub async fn ranking_history(
    &self,
    place_keyword_id: Uuid,
    query: HistoryQuery,
    opts: ViewOptions,
  ) -> Result<Vec<RankingView>> {
    let detail = self.place_keyword_detail(place_keyword_id).await?;
    debug!(%place_keyword_id, ?query, "fetching ranking history");
    let facts = self
      .history::<RankingHistory>(place_keyword_id, &query)
      .await?;
    Ok(
      facts
        .iter()
        .map(|fact| ranking_view(fact, Some(&detail), opts))
        .collect(),
    )
  }
}
