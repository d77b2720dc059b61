//! Query-string parameters shared by the read endpoints.

use chrono::{DateTime, Utc};
use rankwatch_core::{
  fact::{DateRange, ReviewType, Sentiment},
  validate::{Validate as _, ValidationErrors},
  view::ViewOptions,
};
use rankwatch_tracking::{HistoryQuery, ReviewQuery};
use serde::Deserialize;

use crate::error::ApiError;

/// `start` and `end` come as a pair; the window is inclusive.
fn date_range(
  start: Option<DateTime<Utc>>,
  end: Option<DateTime<Utc>>,
) -> Result<Option<DateRange>, ApiError> {
  let range = match (start, end) {
    (Some(start), Some(end)) => DateRange::new(start, end),
    (None, None) => return Ok(None),
    (None, Some(_)) | (Some(_), None) => {
      let mut errors = ValidationErrors::default();
      let missing = if start.is_none() { "start" } else { "end" };
      errors.push(missing, "start and end must be given together");
      return Err(errors.into());
    }
  };
  range.validate()?;
  Ok(Some(range))
}

fn positive_limit(limit: Option<usize>) -> Result<Option<usize>, ApiError> {
  if limit == Some(0) {
    let mut errors = ValidationErrors::default();
    errors.push("limit", "must be at least 1");
    return Err(errors.into());
  }
  Ok(limit)
}

/// `?start&end&limit&include_relations&include_computed`
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
  pub start:             Option<DateTime<Utc>>,
  pub end:               Option<DateTime<Utc>>,
  pub limit:             Option<usize>,
  #[serde(default)]
  pub include_relations: bool,
  #[serde(default)]
  pub include_computed:  bool,
}

impl HistoryParams {
  pub fn query(&self) -> Result<HistoryQuery, ApiError> {
    Ok(HistoryQuery {
      range: date_range(self.start, self.end)?,
      limit: positive_limit(self.limit)?,
    })
  }

  pub fn view(&self) -> ViewOptions {
    ViewOptions {
      include_relations: self.include_relations,
      include_computed:  self.include_computed,
    }
  }
}

/// `?review_type&sentiment&start&end&limit&include_relations`
#[derive(Debug, Default, Deserialize)]
pub struct ReviewParams {
  pub review_type:       Option<ReviewType>,
  pub sentiment:         Option<Sentiment>,
  pub start:             Option<DateTime<Utc>>,
  pub end:               Option<DateTime<Utc>>,
  pub limit:             Option<usize>,
  #[serde(default)]
  pub include_relations: bool,
}

impl ReviewParams {
  pub fn query(&self) -> Result<ReviewQuery, ApiError> {
    Ok(ReviewQuery {
      review_type: self.review_type,
      sentiment:   self.sentiment,
      range:       date_range(self.start, self.end)?,
      limit:       positive_limit(self.limit)?,
    })
  }

  pub fn view(&self) -> ViewOptions {
    ViewOptions { include_relations: self.include_relations, include_computed: false }
  }
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
  pub since: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
  pub limit: Option<usize>,
}

impl LimitParams {
  pub fn limit(&self) -> Result<Option<usize>, ApiError> { positive_limit(self.limit) }
}
