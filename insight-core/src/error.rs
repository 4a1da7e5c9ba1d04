use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Poll error: {0}")]
    Poll(#[from] PollError),

    #[error("Result error: {0}")]
    Result(#[from] ResultError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Superseded by a newer job (generation {generation})")]
    Superseded { generation: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmissionError {
    #[error("Invalid app URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Analysis request rejected ({status_code}): {message}")]
    Rejected { status_code: u16, message: String },

    #[error("Analysis request failed: {message}")]
    Network { message: String },

    #[error("Invalid submission response: {details}")]
    InvalidResponse { details: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PollError {
    #[error("Status check failed: {message}")]
    Transient { message: String },

    #[error("Analysis job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("Analysis job {job_id} failed: {stage}")]
    JobFailed { job_id: String, stage: String },

    #[error("Status request rejected ({status_code}): {message}")]
    Rejected { status_code: u16, message: String },

    #[error("Invalid status response: {details}")]
    InvalidResponse { details: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResultError {
    #[error("Results not ready for job {job_id}")]
    NotReady { job_id: String },

    #[error("Results request rejected ({status_code}): {message}")]
    Rejected { status_code: u16, message: String },

    #[error("Results request failed: {message}")]
    Network { message: String },

    #[error("Invalid results format: {details}")]
    InvalidPayload { details: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
