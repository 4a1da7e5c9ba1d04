use crate::error::{CoreError, ResultError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub type JobId = String;

pub const DEFAULT_STAGE: &str = "Initializing...";
pub const PROCESSING_STAGE: &str = "Processing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Error,
}

/// Status string reported by the analysis service alongside progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemoteStatus {
    Starting,
    Running,
    Done,
    Error,
    Unknown,
}

impl RemoteStatus {
    /// Parses the service's status label, ignoring case and surrounding whitespace.
    /// `completed` and `done` are both treated as done.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "starting" | "pending" => RemoteStatus::Starting,
            "running" => RemoteStatus::Running,
            "done" | "completed" => RemoteStatus::Done,
            "error" | "failed" => RemoteStatus::Error,
            _ => RemoteStatus::Unknown,
        }
    }
}

/// One status poll response.
#[derive(Debug, Clone, PartialEq)]
pub struct JobProgress {
    pub progress: u8,
    pub stage: String,
    pub status: Option<RemoteStatus>,
}

impl JobProgress {
    pub fn new(progress: i64, stage: impl Into<String>, status: Option<RemoteStatus>) -> Self {
        Self {
            progress: progress.clamp(0, 100) as u8,
            stage: stage.into(),
            status,
        }
    }

    /// Either signal is sufficient: a full progress bar counts as complete even
    /// when the status label still says the job is running.
    pub fn is_complete(&self) -> bool {
        self.progress >= 100 || self.status == Some(RemoteStatus::Done)
    }

    pub fn is_failed(&self) -> bool {
        !self.is_complete() && self.status == Some(RemoteStatus::Error)
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub stage: String,
    pub result: Option<Arc<AnalysisResult>>,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            progress: 0,
            stage: DEFAULT_STAGE.to_string(),
            result: None,
            submitted_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, update: &JobProgress) {
        self.progress = update.progress;
        self.stage = update.stage.clone();
        self.status = if update.is_complete() {
            JobStatus::Done
        } else {
            match update.status {
                Some(RemoteStatus::Error) => JobStatus::Error,
                Some(RemoteStatus::Starting) => JobStatus::Pending,
                _ => JobStatus::Running,
            }
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub icon: String,
    pub rating: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiData {
    pub total: u32,
    pub complaints: u32,
    pub praise: u32,
    pub features: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub summary: String,
    pub quote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCategory {
    pub subcategory: String,
    pub items: Vec<FeedbackItem>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub app: AppInfo,
    pub kpi: KpiData,
    pub complaints: Vec<FeedbackCategory>,
    pub praise: Vec<FeedbackCategory>,
    pub feature_requests: Vec<FeedbackCategory>,
}

impl AnalysisResult {
    pub fn categories(&self, kind: FeedbackKind) -> &[FeedbackCategory] {
        match kind {
            FeedbackKind::Complaint => &self.complaints,
            FeedbackKind::Praise => &self.praise,
            FeedbackKind::Feature => &self.feature_requests,
        }
    }

    /// Categories of one kind with duplicate labels folded together.
    pub fn merged_categories(&self, kind: FeedbackKind) -> Vec<FeedbackCategory> {
        merge_categories(self.categories(kind))
    }

    pub fn validate(&self) -> Result<(), ResultError> {
        if !(0.0..=5.0).contains(&self.app.rating) {
            return Err(ResultError::InvalidPayload {
                details: format!("app rating {} is outside 0-5", self.app.rating),
            });
        }

        let kpi = &self.kpi;
        let categorized =
            u64::from(kpi.complaints) + u64::from(kpi.praise) + u64::from(kpi.features);
        if categorized > u64::from(kpi.total) {
            return Err(ResultError::InvalidPayload {
                details: format!(
                    "kpi breakdown ({}) exceeds total reviews ({})",
                    categorized, kpi.total
                ),
            });
        }

        for kind in FeedbackKind::ALL {
            for category in self.categories(kind) {
                let out_of_range = category.items.iter().find(|item| {
                    item.confidence
                        .is_some_and(|confidence| !(0.0..=1.0).contains(&confidence))
                });
                if let Some(item) = out_of_range {
                    return Err(ResultError::InvalidPayload {
                        details: format!(
                            "confidence {:?} out of range in {} category '{}'",
                            item.confidence,
                            kind,
                            category.subcategory
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Resource type of a feedback collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Complaint,
    Praise,
    Feature,
}

impl FeedbackKind {
    pub const ALL: [FeedbackKind; 3] = [
        FeedbackKind::Complaint,
        FeedbackKind::Praise,
        FeedbackKind::Feature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Complaint => "complaint",
            FeedbackKind::Praise => "praise",
            FeedbackKind::Feature => "feature",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FeedbackKind::Complaint => "Complaints",
            FeedbackKind::Praise => "Praise",
            FeedbackKind::Feature => "Feature Requests",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    DateDesc,
    DateAsc,
    RatingDesc,
    RatingAsc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::DateDesc => "date_desc",
            SortOrder::DateAsc => "date_asc",
            SortOrder::RatingDesc => "rating_desc",
            SortOrder::RatingAsc => "rating_asc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date_desc" | "newest" => Ok(SortOrder::DateDesc),
            "date_asc" | "oldest" => Ok(SortOrder::DateAsc),
            "rating_desc" => Ok(SortOrder::RatingDesc),
            "rating_asc" => Ok(SortOrder::RatingAsc),
            other => Err(CoreError::InvalidInput {
                message: format!("unknown sort order '{}'", other),
            }),
        }
    }
}

/// Identity of a category label: trimmed, inner whitespace collapsed, lowercased.
pub fn category_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Folds categories whose labels differ only by case or whitespace. Items are
/// concatenated in input order, counts summed, and the first label seen (trimmed)
/// is kept. Output order follows first appearance.
pub fn merge_categories(categories: &[FeedbackCategory]) -> Vec<FeedbackCategory> {
    let mut merged: Vec<FeedbackCategory> = Vec::with_capacity(categories.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for category in categories {
        let key = category_key(&category.subcategory);
        match positions.get(&key) {
            Some(&index) => {
                let existing = &mut merged[index];
                existing.items.extend(category.items.iter().cloned());
                existing.count += category.count;
            }
            None => {
                positions.insert(key, merged.len());
                merged.push(FeedbackCategory {
                    subcategory: category.subcategory.trim().to_string(),
                    items: category.items.clone(),
                    count: category.count,
                });
            }
        }
    }

    merged
}
