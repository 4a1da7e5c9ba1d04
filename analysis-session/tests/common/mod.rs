#![allow(dead_code)]

use async_trait::async_trait;
use insight_core::{
    AnalysisResult, JobId, JobProgress, PollError, RemoteStatus, ResultError, SubmissionError,
};
use job_client::{JobClient, SimulatedJobClient};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const APP_A: &str = "https://play.google.com/store/apps/details?id=com.example.alpha";
pub const APP_B: &str = "https://play.google.com/store/apps/details?id=com.example.beta";

pub fn job_id(url: &str) -> JobId {
    format!("job-{}", url)
}

pub fn running(progress: i64, stage: &str) -> Result<JobProgress, PollError> {
    Ok(JobProgress::new(progress, stage, Some(RemoteStatus::Running)))
}

pub fn transient() -> Result<JobProgress, PollError> {
    Err(PollError::Transient {
        message: "connection reset".to_string(),
    })
}

#[derive(Default)]
struct Script {
    polls: HashMap<JobId, VecDeque<Result<JobProgress, PollError>>>,
    results: HashMap<JobId, Result<AnalysisResult, ResultError>>,
    submit_failures: HashMap<String, SubmissionError>,
    submit_gates: HashMap<String, Arc<Notify>>,
    poll_gates: HashMap<JobId, Arc<Notify>>,
    fetch_gates: HashMap<JobId, Arc<Notify>>,
    submitted: Vec<String>,
    polled: Vec<JobId>,
    fetched: Vec<JobId>,
}

/// Backend double replaying canned responses. Job ids are `job-{url}`. The last
/// scripted poll response for a job repeats forever.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<Script>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn polls(&self, url: &str, responses: Vec<Result<JobProgress, PollError>>) {
        self.script
            .lock()
            .unwrap()
            .polls
            .insert(job_id(url), responses.into());
    }

    pub fn result(&self, url: &str, result: Result<AnalysisResult, ResultError>) {
        self.script.lock().unwrap().results.insert(job_id(url), result);
    }

    pub fn fail_submit(&self, url: &str, error: SubmissionError) {
        self.script
            .lock()
            .unwrap()
            .submit_failures
            .insert(url.to_string(), error);
    }

    /// Holds submissions of `url` until the returned gate is notified.
    pub fn gate_submit(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script
            .lock()
            .unwrap()
            .submit_gates
            .insert(url.to_string(), Arc::clone(&gate));
        gate
    }

    /// Holds the next status check of `url`'s job until the gate is notified.
    pub fn gate_poll(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script
            .lock()
            .unwrap()
            .poll_gates
            .insert(job_id(url), Arc::clone(&gate));
        gate
    }

    /// Holds the next result download of `url`'s job until the gate is notified.
    pub fn gate_fetch(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script
            .lock()
            .unwrap()
            .fetch_gates
            .insert(job_id(url), Arc::clone(&gate));
        gate
    }

    pub fn submit_count(&self) -> usize {
        self.script.lock().unwrap().submitted.len()
    }

    pub fn poll_count(&self, url: &str) -> usize {
        let id = job_id(url);
        self.script
            .lock()
            .unwrap()
            .polled
            .iter()
            .filter(|polled| **polled == id)
            .count()
    }

    pub fn fetch_count(&self) -> usize {
        self.script.lock().unwrap().fetched.len()
    }
}

#[async_trait]
impl JobClient for ScriptedClient {
    async fn submit(&self, app_url: &str) -> Result<JobId, SubmissionError> {
        let gate = {
            let mut script = self.script.lock().unwrap();
            script.submitted.push(app_url.to_string());
            script.submit_gates.get(app_url).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.script.lock().unwrap().submit_failures.get(app_url) {
            Some(error) => Err(error.clone()),
            None => Ok(job_id(app_url)),
        }
    }

    async fn poll(&self, job_id: &str) -> Result<JobProgress, PollError> {
        let gate = {
            let mut script = self.script.lock().unwrap();
            script.polled.push(job_id.to_string());
            script.poll_gates.remove(job_id)
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut script = self.script.lock().unwrap();
        let queue = match script.polls.get_mut(job_id) {
            Some(queue) => queue,
            None => {
                return Err(PollError::JobNotFound {
                    job_id: job_id.to_string(),
                })
            }
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }

    async fn fetch_result(&self, job_id: &str) -> Result<AnalysisResult, ResultError> {
        let gate = {
            let mut script = self.script.lock().unwrap();
            script.fetched.push(job_id.to_string());
            script.fetch_gates.remove(job_id)
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.script
            .lock()
            .unwrap()
            .results
            .get(job_id)
            .cloned()
            .unwrap_or_else(|| Ok(SimulatedJobClient::sample_result(job_id)))
    }
}
