//! Scraper observations dispatched to the matching record use case.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use rankwatch_core::{
  Result,
  fact::ObservedMetrics,
  store::TrackingStore,
  validate::Validate as _,
  view::{CompetitorSnapshotView, RankingView, ReviewHistoryView, ViewOptions},
};

use crate::Tracker;

/// What a scrape job observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum ScrapeTarget {
  Ranking { place_keyword_id: Uuid },
  ReviewStats { place_id: Uuid },
  Competitor { competitor_id: Uuid },
}

/// One line of a scraper batch: the target plus its metrics.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScrapeRecord {
  #[serde(flatten)]
  pub target:  ScrapeTarget,
  pub metrics: ObservedMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "recorded", rename_all = "snake_case")]
pub enum IngestOutcome {
  Ranking(RankingView),
  ReviewStats(ReviewHistoryView),
  Competitor(CompetitorSnapshotView),
}

impl<S: TrackingStore> Tracker<S> {
  /// Validate an observation, convert it into the target's fact input, and
  /// record it. Review statistics need both counts.
  pub async fn ingest(
    &self,
    target: ScrapeTarget,
    metrics: ObservedMetrics,
  ) -> Result<IngestOutcome> {
    metrics.validate()?;
    let opts = ViewOptions::FULL;

    let outcome = match target {
      ScrapeTarget::Ranking { place_keyword_id } => IngestOutcome::Ranking(
        self
          .record_ranking(metrics.to_ranking(place_keyword_id), opts)
          .await?,
      ),
      ScrapeTarget::ReviewStats { place_id } => {
        let input = metrics.to_review_history(place_id)?;
        IngestOutcome::ReviewStats(self.record_review_history(input, opts).await?)
      }
      ScrapeTarget::Competitor { competitor_id } => IngestOutcome::Competitor(
        self
          .record_competitor_snapshot(
            metrics.to_competitor_snapshot(competitor_id),
            opts,
          )
          .await?,
      ),
    };
    info!(?target, observed_at = %metrics.observed_at, "ingested observation");
    Ok(outcome)
  }
}
