use std::sync::Arc;
use std::time::Duration;

use common::IngestJob;
use common::config::IngestConfig;
use common::quota::{DailyQuota, QuotaCheck};
use tracing::{debug, info, instrument, warn};

use super::error::IngestError;
use super::normalize::{NormalizedRecipe, missing_fields, normalize};
use super::scheduler::JobScheduler;
use super::source::{ProviderRecipe, RecipeSource, SourceError};
use super::store::{RecipeStore, StoreError};

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The day's call budget is spent; no request was made.
    DailyLimitReached { calls: u64, limit: u64 },
    /// The provider answered 402. Nothing is retried or chained.
    ProviderQuotaExhausted,
    PageProcessed {
        offset: u32,
        fetched: usize,
        saved: usize,
        skipped: usize,
        calls: u64,
        /// Offset of the chained page, when one was queued.
        next_offset: Option<u32>,
    },
}

/// Fetches one page of recipes, stores the complete ones and chains the next
/// page while the daily budget lasts.
pub struct IngestPipeline {
    source: Arc<dyn RecipeSource>,
    store: Arc<dyn RecipeStore>,
    scheduler: Arc<dyn JobScheduler>,
    quota: DailyQuota,
    config: IngestConfig,
}

impl IngestPipeline {
    pub fn new(
        source: Arc<dyn RecipeSource>,
        store: Arc<dyn RecipeStore>,
        scheduler: Arc<dyn JobScheduler>,
        quota: DailyQuota,
        config: IngestConfig,
    ) -> Self {
        Self {
            source,
            store,
            scheduler,
            quota,
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    #[instrument(skip(self, job), fields(job_id = %job.job_id, offset = job.offset, attempt = job.attempt))]
    pub async fn run(&self, job: &IngestJob) -> Result<IngestOutcome, IngestError> {
        let limit = self.quota.limit();
        if let QuotaCheck::Exceeded { calls } = self.quota.acquire().await? {
            info!(calls, limit, "Daily call limit reached");
            return Ok(IngestOutcome::DailyLimitReached { calls, limit });
        }

        let page = match self.source.search(job.offset, self.config.page_size).await {
            Ok(page) => page,
            Err(SourceError::QuotaExhausted) => {
                warn!("Provider call quota depleted, upgrade the plan to fetch more");
                return Ok(IngestOutcome::ProviderQuotaExhausted);
            }
            Err(SourceError::Http { status }) => return Err(IngestError::Http { status }),
            Err(SourceError::Network(message)) => return Err(IngestError::Network(message)),
        };

        let fetched = page.recipes.len() + page.malformed;
        let mut saved = 0;
        let mut skipped = page.malformed;
        let mut last_store_error: Option<StoreError> = None;

        for item in page.recipes {
            let api_id = item.id;
            let Some(recipe) = self.prepare(item).await? else {
                skipped += 1;
                continue;
            };
            match self.store.upsert(&recipe).await {
                Ok(outcome) => {
                    debug!(api_id, ?outcome, "Stored recipe");
                    saved += 1;
                }
                Err(e) => {
                    warn!(api_id, error = %e, "Failed to store recipe");
                    skipped += 1;
                    last_store_error = Some(e);
                }
            }
        }

        if saved == 0
            && let Some(e) = last_store_error
        {
            return Err(IngestError::Store(e));
        }

        let calls = self.quota.used().await?;
        let next_offset = if calls < limit {
            let next = job.next_page();
            let delay = Duration::from_secs(self.config.continuation_delay_secs);
            self.scheduler
                .schedule(&next, delay)
                .await
                .map_err(IngestError::Schedule)?;
            Some(next.offset)
        } else {
            None
        };

        info!(
            fetched,
            saved,
            skipped,
            calls,
            limit,
            next_offset,
            "Processed recipe page"
        );

        Ok(IngestOutcome::PageProcessed {
            offset: job.offset,
            fetched,
            saved,
            skipped,
            calls,
            next_offset,
        })
    }

    /// Complete `item` if needed and normalize it. `None` means skip.
    async fn prepare(&self, mut item: ProviderRecipe) -> Result<Option<NormalizedRecipe>, IngestError> {
        let missing = missing_fields(&item);
        if !missing.is_empty() {
            let fields: Vec<&str> = missing.iter().map(|m| m.as_str()).collect();
            if !self.config.fetch_missing_details {
                debug!(api_id = item.id, ?fields, "Skipping incomplete recipe");
                return Ok(None);
            }
            if !self.fill_details(&mut item).await? {
                return Ok(None);
            }
            if !missing_fields(&item).is_empty() {
                debug!(api_id = item.id, ?fields, "Recipe still incomplete after detail fetch");
                return Ok(None);
            }
        }

        let normalized = normalize(&item);
        if normalized.is_none() {
            warn!(api_id = item.id, "Skipping recipe with unusable id");
        }
        Ok(normalized)
    }

    /// One quota-gated detail call. Returns whether `item` was updated.
    async fn fill_details(&self, item: &mut ProviderRecipe) -> Result<bool, IngestError> {
        if let QuotaCheck::Exceeded { calls } = self.quota.acquire().await? {
            debug!(api_id = item.id, calls, "No budget left for detail fetch");
            return Ok(false);
        }
        match self.source.information(item.id).await {
            Ok(detail) => {
                item.fill_from(detail);
                Ok(true)
            }
            Err(e) => {
                warn!(api_id = item.id, error = %e, "Detail fetch failed");
                Ok(false)
            }
        }
    }
}
