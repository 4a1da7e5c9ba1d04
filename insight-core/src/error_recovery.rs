//! Failure policy for recurring background requests.
//!
//! A single failed status poll should not end an analysis. This module decides
//! which failures are tolerated and counts consecutive ones so a persistent outage
//! still escalates after a bounded number of ticks.

use crate::{CoreError, ErrorExt};
use tracing::{info, warn};

/// What to do with a failed recurring request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Keep going; the next tick may succeed
    Tolerate,
    /// Stop and surface the error
    Escalate,
}

/// Maps errors onto recovery strategies
pub struct ErrorRecovery;

impl ErrorRecovery {
    /// Determine the strategy for a single failure, ignoring history
    pub fn determine_strategy(error: &CoreError) -> RecoveryStrategy {
        if error.is_transient() {
            RecoveryStrategy::Tolerate
        } else {
            RecoveryStrategy::Escalate
        }
    }
}

/// Counts consecutive failures against a threshold.
#[derive(Debug, Clone)]
pub struct FailureTracker {
    consecutive: u32,
    threshold: u32,
}

impl FailureTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: 0,
            threshold: threshold.max(1),
        }
    }

    /// Record a failure and decide whether it escalates.
    pub fn record_failure(&mut self, error: &CoreError) -> RecoveryStrategy {
        self.consecutive += 1;

        match ErrorRecovery::determine_strategy(error) {
            RecoveryStrategy::Escalate => RecoveryStrategy::Escalate,
            RecoveryStrategy::Tolerate if self.consecutive >= self.threshold => {
                warn!(
                    "Escalating after {} consecutive failures: {}",
                    self.consecutive, error
                );
                RecoveryStrategy::Escalate
            }
            RecoveryStrategy::Tolerate => {
                info!(
                    "Tolerating failure {}/{}: {}",
                    self.consecutive,
                    self.threshold,
                    error.user_friendly_message()
                );
                RecoveryStrategy::Tolerate
            }
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }
}
