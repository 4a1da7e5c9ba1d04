//! In-process stand-in for the analysis service.
//!
//! Each poll moves a job one stage further through the same sequence the real
//! backend reports, so the whole client can be exercised without a server.

use crate::validate::{app_id_from_url, parse_app_url};
use crate::JobClient;
use async_trait::async_trait;
use insight_core::{
    AnalysisResult, AppInfo, FeedbackCategory, FeedbackItem, JobId, JobProgress, KpiData,
    PollError, RemoteStatus, ResultError, SubmissionError,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

const STAGES: [(i64, &str, RemoteStatus); 5] = [
    (0, "Fetching app info", RemoteStatus::Starting),
    (10, "Fetching reviews", RemoteStatus::Running),
    (45, "Fetched 25 reviews", RemoteStatus::Running),
    (80, "Analyzing reviews", RemoteStatus::Running),
    (100, "Analysis complete", RemoteStatus::Done),
];

#[derive(Debug)]
struct SimulatedJob {
    app_id: String,
    next_stage: usize,
}

impl SimulatedJob {
    fn is_complete(&self) -> bool {
        self.next_stage >= STAGES.len()
    }
}

#[derive(Debug, Default)]
pub struct SimulatedJobClient {
    jobs: Mutex<HashMap<String, SimulatedJob>>,
}

impl SimulatedJobClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<String, SimulatedJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Payload returned for every completed job.
    pub fn sample_result(app_id: &str) -> AnalysisResult {
        let item = |summary: &str, quote: &str, confidence: f64| FeedbackItem {
            summary: summary.to_string(),
            quote: quote.to_string(),
            confidence: Some(confidence),
        };

        AnalysisResult {
            app: AppInfo {
                name: app_id.to_string(),
                icon: format!("https://play-lh.googleusercontent.com/{}", app_id),
                rating: 3.9,
            },
            kpi: KpiData {
                total: 25,
                complaints: 9,
                praise: 8,
                features: 4,
            },
            complaints: vec![
                FeedbackCategory {
                    subcategory: "Pricing".to_string(),
                    items: vec![
                        item(
                            "Subscription price increased",
                            "Loved it until the price doubled overnight.",
                            0.92,
                        ),
                        item(
                            "Free tier too limited",
                            "Everything useful is behind the paywall.",
                            0.81,
                        ),
                        item(
                            "Unclear billing",
                            "I was charged twice and support never answered.",
                            0.77,
                        ),
                    ],
                    count: 3,
                },
                FeedbackCategory {
                    subcategory: "Crashes".to_string(),
                    items: vec![
                        item(
                            "Crashes on launch",
                            "Since the last update it closes as soon as I open it.",
                            0.95,
                        ),
                        item(
                            "Freezes during sync",
                            "Sync hangs forever and then the app dies.",
                            0.74,
                        ),
                    ],
                    count: 2,
                },
                FeedbackCategory {
                    subcategory: " pricing ".to_string(),
                    items: vec![
                        item(
                            "Ads in paid version",
                            "Paying and still seeing ads is ridiculous.",
                            0.88,
                        ),
                        item(
                            "No family plan",
                            "Would pay for a family plan but there is none.",
                            0.63,
                        ),
                    ],
                    count: 2,
                },
                FeedbackCategory {
                    subcategory: "Login issues".to_string(),
                    items: vec![
                        item(
                            "Logged out constantly",
                            "Have to sign in again every single day.",
                            0.84,
                        ),
                        item(
                            "Password reset broken",
                            "The reset email never arrives.",
                            0.71,
                        ),
                    ],
                    count: 2,
                },
            ],
            praise: vec![
                FeedbackCategory {
                    subcategory: "Design".to_string(),
                    items: vec![
                        item("Clean interface", "Beautiful and easy to navigate.", 0.93),
                        item("Dark mode", "The dark theme is easy on the eyes.", 0.86),
                        item("Smooth animations", "Feels fast and polished.", 0.7),
                    ],
                    count: 3,
                },
                FeedbackCategory {
                    subcategory: "Support".to_string(),
                    items: vec![
                        item("Helpful support", "They fixed my issue within an hour.", 0.9),
                        item("Friendly staff", "Support was kind and patient.", 0.76),
                    ],
                    count: 5,
                },
            ],
            feature_requests: vec![
                FeedbackCategory {
                    subcategory: "Offline mode".to_string(),
                    items: vec![
                        item("Work offline", "Please let me use it on the subway.", 0.89),
                        item("Download for later", "Want to save items offline.", 0.69),
                    ],
                    count: 2,
                },
                FeedbackCategory {
                    subcategory: "Export".to_string(),
                    items: vec![
                        item("Export to CSV", "I need my data in a spreadsheet.", 0.82),
                        item("Share as PDF", "Would love to share reports as PDF.", 0.61),
                    ],
                    count: 2,
                },
            ],
        }
    }
}

#[async_trait]
impl JobClient for SimulatedJobClient {
    async fn submit(&self, app_url: &str) -> Result<JobId, SubmissionError> {
        let url = parse_app_url(app_url)?;
        let app_id = app_id_from_url(&url).ok_or_else(|| SubmissionError::InvalidUrl {
            url: url.to_string(),
            reason: "missing app id (expected an `id=` query parameter)".to_string(),
        })?;

        let job_id = Uuid::new_v4().to_string();
        info!("Simulated analysis job {} started for {}", job_id, app_id);
        self.jobs().insert(
            job_id.clone(),
            SimulatedJob {
                app_id,
                next_stage: 0,
            },
        );
        Ok(job_id)
    }

    async fn poll(&self, job_id: &str) -> Result<JobProgress, PollError> {
        let mut jobs = self.jobs();
        let job = jobs.get_mut(job_id).ok_or_else(|| PollError::JobNotFound {
            job_id: job_id.to_string(),
        })?;

        let index = job.next_stage.min(STAGES.len() - 1);
        job.next_stage = (job.next_stage + 1).min(STAGES.len());

        let (progress, stage, status) = STAGES[index];
        debug!("Simulated job {} at {}%: {}", job_id, progress, stage);
        Ok(JobProgress::new(progress, stage, Some(status)))
    }

    async fn fetch_result(&self, job_id: &str) -> Result<AnalysisResult, ResultError> {
        let jobs = self.jobs();
        let job = jobs.get(job_id).ok_or_else(|| ResultError::NotReady {
            job_id: job_id.to_string(),
        })?;

        if !job.is_complete() {
            return Err(ResultError::NotReady {
                job_id: job_id.to_string(),
            });
        }

        let result = Self::sample_result(&job.app_id);
        result.validate()?;
        Ok(result)
    }
}
