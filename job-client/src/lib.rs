pub mod api;
pub mod simulated;
pub mod validate;


pub use api::HttpJobClient;
pub use simulated::SimulatedJobClient;
pub use validate::{app_id_from_url, parse_analysis_result, parse_app_url};

use async_trait::async_trait;
use insight_core::{AnalysisResult, JobId, JobProgress, PollError, ResultError, SubmissionError};

/// Remote side of an analysis job: start it, watch it, collect the result.
#[async_trait]
pub trait JobClient: Send + Sync {
    async fn submit(&self, app_url: &str) -> Result<JobId, SubmissionError>;

    async fn poll(&self, job_id: &str) -> Result<JobProgress, PollError>;

    /// Implementations validate the payload shape before returning it.
    async fn fetch_result(&self, job_id: &str) -> Result<AnalysisResult, ResultError>;
}
