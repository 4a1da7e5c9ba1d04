use crate::poller::{JobPoller, JobSnapshot, PollerConfig, PollerState};
use insight_core::{AnalysisResult, AppConfig, CoreError, JobId, ReviewsConfig};
use job_client::JobClient;
use review_pager::ResultsDashboard;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Entry point for presentation code: one analysis at a time, plus the
/// paginated views over its result.
#[derive(Debug)]
pub struct AnalysisSession {
    poller: JobPoller,
    reviews: ReviewsConfig,
}

impl AnalysisSession {
    /// Fails when `config` does not pass [`AppConfig::validate`].
    pub fn new(client: Arc<dyn JobClient>, config: &AppConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            poller: JobPoller::new(client, PollerConfig::from(&config.polling))?,
            reviews: config.reviews.clone(),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.poller.subscribe()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.poller.snapshot()
    }

    pub fn status(&self) -> PollerState {
        self.snapshot().status
    }

    pub fn progress(&self) -> u8 {
        self.snapshot().progress
    }

    pub fn stage(&self) -> String {
        self.snapshot().stage
    }

    pub fn result(&self) -> Option<Arc<AnalysisResult>> {
        self.snapshot().result
    }

    pub fn error(&self) -> Option<String> {
        self.snapshot().error
    }

    pub fn current_tip(&self) -> &'static str {
        self.snapshot().current_tip
    }

    pub fn app_url(&self) -> Option<String> {
        self.snapshot().app_url
    }

    /// Starts analysing `app_url`, abandoning any earlier analysis.
    pub async fn start(&self, app_url: &str) -> Result<JobId, CoreError> {
        info!("Starting analysis for {}", app_url);
        self.poller.restart(app_url).await
    }

    pub fn reset(&self) {
        self.poller.reset();
    }

    pub fn has_active_timers(&self) -> bool {
        self.poller.has_active_timers()
    }

    /// Paginated views over the current result, once there is one.
    pub fn dashboard(&self) -> Option<ResultsDashboard> {
        self.result().map(|result| {
            ResultsDashboard::from_result(result, self.reviews.page_size, self.reviews.cache_ttl())
        })
    }
}
