use crate::error::*;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_transient(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Submission(e) => {
                error!("Submission error details: {:?}", e);
            }
            CoreError::Poll(e) => {
                error!("Poll error details: {:?}", e);
            }
            CoreError::Result(e) => {
                error!("Result error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_transient(&self) -> bool {
        match self {
            CoreError::Poll(e) => e.is_transient(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Submission(e) => e.user_friendly_message(),
            CoreError::Poll(e) => e.user_friendly_message(),
            CoreError::Result(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            CoreError::Superseded { .. } => {
                "This analysis was replaced by a newer one.".to_string()
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Submission(_) => "SUBMISSION".to_string(),
            CoreError::Poll(_) => "POLL".to_string(),
            CoreError::Result(_) => "RESULT".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::InvalidTransition { .. } => "INVALID_TRANSITION".to_string(),
            CoreError::Superseded { .. } => "SUPERSEDED".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for SubmissionError {
    fn log_error(&self) -> &Self {
        error!("SubmissionError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("SubmissionError (warning): {}", self);
        self
    }

    fn is_transient(&self) -> bool {
        false // a failed submission ends the session
    }

    fn user_friendly_message(&self) -> String {
        match self {
            SubmissionError::InvalidUrl { url, .. } => {
                format!("'{}' is not a valid app store URL.", url)
            }
            SubmissionError::Rejected { message, .. } => {
                format!("Failed to start analysis: {}", message)
            }
            _ => "Failed to start analysis process".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            SubmissionError::InvalidUrl { .. } => "SUBMIT_INVALID_URL".to_string(),
            SubmissionError::Rejected { .. } => "SUBMIT_REJECTED".to_string(),
            SubmissionError::Network { .. } => "SUBMIT_NETWORK".to_string(),
            SubmissionError::InvalidResponse { .. } => "SUBMIT_INVALID_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for PollError {
    fn log_error(&self) -> &Self {
        error!("PollError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("PollError (warning): {}", self);
        self
    }

    fn is_transient(&self) -> bool {
        matches!(
            self,
            PollError::Transient { .. } | PollError::InvalidResponse { .. }
        )
    }

    fn user_friendly_message(&self) -> String {
        match self {
            PollError::JobNotFound { .. } => {
                "The analysis job could not be found. Please start a new analysis.".to_string()
            }
            PollError::JobFailed { stage, .. } => format!("Analysis failed: {}", stage),
            PollError::Rejected { message, .. } => {
                format!("Failed to check analysis status: {}", message)
            }
            _ => "Failed to check analysis status".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            PollError::Transient { .. } => "POLL_TRANSIENT".to_string(),
            PollError::JobNotFound { .. } => "POLL_JOB_NOT_FOUND".to_string(),
            PollError::JobFailed { .. } => "POLL_JOB_FAILED".to_string(),
            PollError::Rejected { .. } => "POLL_REJECTED".to_string(),
            PollError::InvalidResponse { .. } => "POLL_INVALID_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for ResultError {
    fn log_error(&self) -> &Self {
        error!("ResultError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ResultError (warning): {}", self);
        self
    }

    fn is_transient(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ResultError::InvalidPayload { details } => {
                format!("Failed to fetch analysis results: {}", details)
            }
            _ => "Failed to fetch analysis results".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ResultError::NotReady { .. } => "RESULT_NOT_READY".to_string(),
            ResultError::Rejected { .. } => "RESULT_REJECTED".to_string(),
            ResultError::Network { .. } => "RESULT_NETWORK".to_string(),
            ResultError::InvalidPayload { .. } => "RESULT_INVALID_PAYLOAD".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_transient(&self) -> bool {
        false // Config errors need user intervention
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::Read { path, .. } => {
                format!("Configuration file '{}' could not be read.", path)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration is invalid: {}", reason)
            }
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::Read { .. } => "CONFIG_READ_ERROR".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            info!("User message: {}", error.user_friendly_message());
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
            if error.is_transient() {
                info!("Error is transient, progress continues");
            }
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
