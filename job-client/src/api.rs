use crate::validate::{parse_analysis_result, parse_app_url};
use crate::JobClient;
use async_trait::async_trait;
use insight_core::{
    AnalysisResult, ApiConfig, CoreError, JobId, JobProgress, PollError, RemoteStatus,
    ResultError, SubmissionError, PROCESSING_STAGE,
};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    app_url: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    job_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusBody {
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl StatusBody {
    pub fn into_progress(self) -> JobProgress {
        let stage = self
            .stage
            .filter(|stage| !stage.trim().is_empty())
            .unwrap_or_else(|| PROCESSING_STAGE.to_string());
        JobProgress::new(
            self.progress.unwrap_or(0.0).round() as i64,
            stage,
            self.status.as_deref().map(RemoteStatus::parse),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// [`JobClient`] speaking to the analysis service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpJobClient {
    http_client: Client,
    base_url: String,
}

impl HttpJobClient {
    pub fn new(config: &ApiConfig) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Pulls the service's `{"error": ...}` message out of a failed response,
/// falling back to a description of the status code.
async fn error_message(response: Response, action: &str) -> String {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(ErrorBody { error: Some(message) }) if !message.trim().is_empty() => message,
        _ => format!("Failed to {} ({})", action, status.as_u16()),
    }
}

pub fn classify_poll_failure(job_id: &str, status: StatusCode, message: String) -> PollError {
    if status == StatusCode::NOT_FOUND {
        PollError::JobNotFound {
            job_id: job_id.to_string(),
        }
    } else if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        PollError::Transient { message }
    } else {
        PollError::Rejected {
            status_code: status.as_u16(),
            message,
        }
    }
}

pub fn classify_result_failure(job_id: &str, status: StatusCode, message: String) -> ResultError {
    if status == StatusCode::NOT_FOUND {
        ResultError::NotReady {
            job_id: job_id.to_string(),
        }
    } else {
        ResultError::Rejected {
            status_code: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl JobClient for HttpJobClient {
    async fn submit(&self, app_url: &str) -> Result<JobId, SubmissionError> {
        let url = parse_app_url(app_url)?;
        let endpoint = self.endpoint("/analyze");
        let start_time = Instant::now();

        info!("Submitting analysis request for {}", url);
        let response = self
            .http_client
            .post(&endpoint)
            .json(&AnalyzeRequest {
                app_url: url.as_str(),
            })
            .send()
            .await
            .map_err(|e| {
                error!("Analysis request failed: {}", e);
                SubmissionError::Network {
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response, "start analysis").await;
            error!("Analysis request rejected with {}: {}", status, message);
            return Err(SubmissionError::Rejected {
                status_code: status.as_u16(),
                message,
            });
        }

        let body: AnalyzeResponse = response.json().await.map_err(|e| {
            error!("Failed to parse analysis response: {}", e);
            SubmissionError::InvalidResponse {
                details: e.to_string(),
            }
        })?;

        if body.job_id.trim().is_empty() {
            return Err(SubmissionError::InvalidResponse {
                details: "empty job id".to_string(),
            });
        }

        info!(
            "Analysis job {} accepted in {:?}",
            body.job_id,
            start_time.elapsed()
        );
        Ok(body.job_id)
    }

    async fn poll(&self, job_id: &str) -> Result<JobProgress, PollError> {
        let endpoint = self.endpoint(&format!("/status/{}", job_id));

        let response = self.http_client.get(&endpoint).send().await.map_err(|e| {
            warn!("Status check failed for {}: {}", job_id, e);
            PollError::Transient {
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response, "get analysis status").await;
            warn!("Status check for {} returned {}: {}", job_id, status, message);
            return Err(classify_poll_failure(job_id, status, message));
        }

        let body: StatusBody = response.json().await.map_err(|e| {
            warn!("Failed to parse status for {}: {}", job_id, e);
            PollError::InvalidResponse {
                details: e.to_string(),
            }
        })?;

        let progress = body.into_progress();
        debug!(
            "Status update for {}: {}% {} ({:?})",
            job_id, progress.progress, progress.stage, progress.status
        );
        Ok(progress)
    }

    async fn fetch_result(&self, job_id: &str) -> Result<AnalysisResult, ResultError> {
        let endpoint = self.endpoint(&format!("/results/{}", job_id));

        info!("Fetching results for job {}", job_id);
        let response = self.http_client.get(&endpoint).send().await.map_err(|e| {
            error!("Results fetch failed for {}: {}", job_id, e);
            ResultError::Network {
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response, "get analysis results").await;
            error!("Results fetch for {} returned {}: {}", job_id, status, message);
            return Err(classify_result_failure(job_id, status, message));
        }

        let body: Value = response.json().await.map_err(|e| ResultError::InvalidPayload {
            details: e.to_string(),
        })?;

        let result = parse_analysis_result(body)?;
        debug!(
            "Results for {}: {} reviews, {} complaint categories",
            job_id,
            result.kpi.total,
            result.complaints.len()
        );
        Ok(result)
    }
}
