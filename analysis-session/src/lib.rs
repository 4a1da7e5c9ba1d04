pub mod poller;
pub mod session;

pub use poller::{JobPoller, JobSnapshot, PollerConfig, PollerState};
pub use session::AnalysisSession;
