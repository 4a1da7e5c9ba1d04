//! Job-tracking state machine.
//!
//! A [`JobPoller`] drives one analysis job from submission to a terminal state.
//! Its two timers (the status poll driver and the tip rotation) are tokio tasks
//! owned by the poller and torn down through a single routine on every exit path.
//! Every response is tagged with the generation it was issued under; a response
//! from an older generation is discarded without touching state.

use insight_core::{
    AnalysisResult, CoreError, ErrorExt, ErrorReporter, FailureTracker, Job, JobId,
    JobProgress, JobStatus, PollError, PollingConfig, RecoveryStrategy, ResultError,
    TipRotation, DEFAULT_STAGE,
};
use job_client::JobClient;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PollerState {
    #[default]
    Idle,
    Submitting,
    Polling,
    Done,
    Error,
}

impl PollerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollerState::Idle => "idle",
            PollerState::Submitting => "submitting",
            PollerState::Polling => "polling",
            PollerState::Done => "done",
            PollerState::Error => "error",
        }
    }

    /// A job is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, PollerState::Submitting | PollerState::Polling)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PollerState::Done | PollerState::Error)
    }
}

impl fmt::Display for PollerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consumer-visible state, republished after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub status: PollerState,
    pub job_id: Option<JobId>,
    pub app_url: Option<String>,
    pub progress: u8,
    pub stage: String,
    pub result: Option<Arc<AnalysisResult>>,
    pub error: Option<String>,
    pub current_tip: &'static str,
}

impl Default for JobSnapshot {
    fn default() -> Self {
        Self {
            status: PollerState::Idle,
            job_id: None,
            app_url: None,
            progress: 0,
            stage: DEFAULT_STAGE.to_string(),
            result: None,
            error: None,
            current_tip: TipRotation::default().current(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub tip_interval: Duration,
    pub max_consecutive_failures: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl PollerConfig {
    /// Both timers need a non-zero period; `interval_at` panics on zero.
    pub fn validate(&self) -> Result<(), CoreError> {
        let zero = [
            ("poll_interval", self.poll_interval),
            ("tip_interval", self.tip_interval),
        ]
        .into_iter()
        .find(|(_, period)| period.is_zero());

        match zero {
            Some((field, _)) => Err(CoreError::InvalidInput {
                message: format!("{} must be greater than zero", field),
            }),
            None => Ok(()),
        }
    }
}

impl From<&PollingConfig> for PollerConfig {
    fn from(config: &PollingConfig) -> Self {
        Self {
            poll_interval: config.interval(),
            tip_interval: config.tip_interval(),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

#[derive(Debug, Default)]
struct Timers {
    poll: Option<JoinHandle<()>>,
    tip: Option<JoinHandle<()>>,
}

impl Timers {
    fn teardown(&mut self) {
        for handle in [self.poll.take(), self.tip.take()].into_iter().flatten() {
            handle.abort();
        }
    }

    fn any_running(&self) -> bool {
        [&self.poll, &self.tip]
            .into_iter()
            .flatten()
            .any(|handle| !handle.is_finished())
    }
}

struct Inner {
    generation: u64,
    state: PollerState,
    app_url: Option<String>,
    job: Option<Job>,
    error: Option<String>,
    failures: FailureTracker,
    tips: TipRotation,
    timers: Timers,
}

impl Inner {
    fn new(config: &PollerConfig) -> Self {
        Self {
            generation: 0,
            state: PollerState::Idle,
            app_url: None,
            job: None,
            error: None,
            failures: FailureTracker::new(config.max_consecutive_failures),
            tips: TipRotation::default(),
            timers: Timers::default(),
        }
    }

    /// The only place timers are stopped.
    fn teardown(&mut self) {
        self.timers.teardown();
    }

    /// Clears everything and invalidates responses still in flight.
    fn clear(&mut self) {
        self.teardown();
        self.generation += 1;
        self.state = PollerState::Idle;
        self.app_url = None;
        self.job = None;
        self.error = None;
        self.failures.reset();
        self.tips.reset();
    }

    fn fail(&mut self, error: &CoreError) {
        ErrorReporter::default().report_error(error);
        self.teardown();
        self.state = PollerState::Error;
        self.error = Some(error.user_friendly_message());
        if let Some(job) = self.job.as_mut() {
            job.status = JobStatus::Error;
        }
    }

    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            status: self.state,
            job_id: self.job.as_ref().map(|job| job.id.clone()),
            app_url: self.app_url.clone(),
            progress: self.job.as_ref().map_or(0, |job| job.progress),
            stage: self
                .job
                .as_ref()
                .map_or_else(|| DEFAULT_STAGE.to_string(), |job| job.stage.clone()),
            result: self.job.as_ref().and_then(|job| job.result.clone()),
            error: self.error.clone(),
            current_tip: self.tips.current(),
        }
    }
}

enum PollStep {
    Continue,
    Fetch,
    Stop,
}

struct Shared {
    inner: Mutex<Inner>,
    view: watch::Sender<JobSnapshot>,
    client: Arc<dyn JobClient>,
    config: PollerConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        let next = inner.snapshot();
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn apply_poll(&self, generation: u64, response: Result<JobProgress, PollError>) -> PollStep {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state != PollerState::Polling {
            debug!("Discarding status response from generation {}", generation);
            return PollStep::Stop;
        }

        match response {
            Ok(update) => {
                inner.failures.record_success();
                let job_id = match inner.job.as_mut() {
                    Some(job) => {
                        job.apply(&update);
                        job.id.clone()
                    }
                    None => return PollStep::Stop,
                };

                if update.is_complete() {
                    info!("Analysis job {} complete, fetching results", job_id);
                    self.publish(&inner);
                    PollStep::Fetch
                } else if update.is_failed() {
                    let error = CoreError::Poll(PollError::JobFailed {
                        job_id,
                        stage: update.stage,
                    });
                    inner.fail(&error);
                    self.publish(&inner);
                    PollStep::Stop
                } else {
                    debug!("Job {} at {}%: {}", job_id, update.progress, update.stage);
                    self.publish(&inner);
                    PollStep::Continue
                }
            }
            Err(e) => {
                let error = CoreError::from(e);
                match inner.failures.record_failure(&error) {
                    RecoveryStrategy::Tolerate => {
                        ErrorReporter::default().report_warning(&error);
                        PollStep::Continue
                    }
                    RecoveryStrategy::Escalate => {
                        inner.fail(&error);
                        self.publish(&inner);
                        PollStep::Stop
                    }
                }
            }
        }
    }

    fn apply_result(&self, generation: u64, outcome: Result<AnalysisResult, ResultError>) {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state != PollerState::Polling {
            debug!("Discarding results from generation {}", generation);
            return;
        }

        match outcome {
            Ok(result) => {
                inner.teardown();
                inner.state = PollerState::Done;
                if let Some(job) = inner.job.as_mut() {
                    job.status = JobStatus::Done;
                    job.progress = 100;
                    job.result = Some(Arc::new(result));
                    info!("Analysis job {} finished", job.id);
                }
                self.publish(&inner);
            }
            Err(e) => {
                inner.fail(&CoreError::from(e));
                self.publish(&inner);
            }
        }
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Polls one job until it settles, then fetches its result exactly once.
fn spawn_poll_driver(
    weak: Weak<Shared>,
    generation: u64,
    job_id: JobId,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = ticker(period);
        loop {
            interval.tick().await;
            let Some(shared) = weak.upgrade() else {
                return;
            };

            let response = shared.client.poll(&job_id).await;
            match shared.apply_poll(generation, response) {
                PollStep::Continue => {}
                PollStep::Stop => return,
                PollStep::Fetch => {
                    drop(interval);
                    let outcome = shared.client.fetch_result(&job_id).await;
                    shared.apply_result(generation, outcome);
                    return;
                }
            }
        }
    })
}

fn spawn_tip_rotation(weak: Weak<Shared>, generation: u64, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = ticker(period);
        loop {
            interval.tick().await;
            let Some(shared) = weak.upgrade() else {
                return;
            };

            let mut inner = shared.lock();
            if inner.generation != generation || !inner.state.is_active() {
                return;
            }
            inner.tips.advance();
            shared.publish(&inner);
        }
    })
}

/// Drives a single analysis job. Not `Clone`; wrap in an `Arc` to share.
pub struct JobPoller {
    shared: Arc<Shared>,
}

impl JobPoller {
    pub fn new(client: Arc<dyn JobClient>, config: PollerConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let (view, _) = watch::channel(JobSnapshot::default());
        Ok(Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::new(&config)),
                view,
                client,
                config,
            }),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.shared.view.subscribe()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.shared.view.borrow().clone()
    }

    pub fn state(&self) -> PollerState {
        self.shared.lock().state
    }

    pub fn has_active_timers(&self) -> bool {
        self.shared.lock().timers.any_running()
    }

    /// Starts a job. Only valid from `Idle`.
    pub async fn submit(&self, app_url: &str) -> Result<JobId, CoreError> {
        let generation = {
            let mut inner = self.shared.lock();
            if inner.state != PollerState::Idle {
                return Err(CoreError::InvalidTransition {
                    from: inner.state.to_string(),
                    to: PollerState::Submitting.to_string(),
                });
            }
            self.begin_submission(&mut inner, app_url)
        };
        self.finish_submission(generation, app_url).await
    }

    /// Resets whatever is in progress and submits `app_url`, in one step.
    pub async fn restart(&self, app_url: &str) -> Result<JobId, CoreError> {
        let generation = {
            let mut inner = self.shared.lock();
            if inner.state != PollerState::Idle {
                info!("Abandoning {} analysis for {}", inner.state, app_url);
            }
            self.begin_submission(&mut inner, app_url)
        };
        self.finish_submission(generation, app_url).await
    }

    /// Returns to `Idle`. Safe to call in any state, any number of times.
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        if inner.state != PollerState::Idle {
            info!("Resetting analysis from {}", inner.state);
        }
        inner.clear();
        self.shared.publish(&inner);
    }

    fn begin_submission(&self, inner: &mut Inner, app_url: &str) -> u64 {
        inner.clear();
        inner.state = PollerState::Submitting;
        inner.app_url = Some(app_url.to_string());

        let generation = inner.generation;
        inner.timers.tip = Some(spawn_tip_rotation(
            Arc::downgrade(&self.shared),
            generation,
            self.shared.config.tip_interval,
        ));
        self.shared.publish(inner);
        generation
    }

    async fn finish_submission(&self, generation: u64, app_url: &str) -> Result<JobId, CoreError> {
        let outcome = self.shared.client.submit(app_url).await;

        let mut inner = self.shared.lock();
        if inner.generation != generation {
            debug!("Discarding submission response from generation {}", generation);
            return Err(CoreError::Superseded { generation });
        }

        match outcome {
            Ok(job_id) => {
                info!("Tracking analysis job {} for {}", job_id, app_url);
                inner.job = Some(Job::new(job_id.clone()));
                inner.state = PollerState::Polling;
                inner.timers.poll = Some(spawn_poll_driver(
                    Arc::downgrade(&self.shared),
                    generation,
                    job_id.clone(),
                    self.shared.config.poll_interval,
                ));
                self.shared.publish(&inner);
                Ok(job_id)
            }
            Err(e) => {
                let error = CoreError::from(e);
                warn!("Analysis submission for {} failed", app_url);
                inner.fail(&error);
                self.shared.publish(&inner);
                Err(error)
            }
        }
    }
}

/// Timer tasks only hold a weak reference, so dropping the poller stops them.
impl Drop for JobPoller {
    fn drop(&mut self) {
        self.shared.lock().teardown();
    }
}

impl fmt::Debug for JobPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobPoller")
            .field("snapshot", &self.snapshot())
            .field("config", &self.shared.config)
            .finish()
    }
}
