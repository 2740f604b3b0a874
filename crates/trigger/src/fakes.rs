//! In-memory fakes for the port traits (testing only).
//!
//! [`MemoryJobStore`] honours the idempotent-by-identity contract of
//! [`JobStore`] and can be scripted to fail specific jobs, without any
//! external dependencies.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::context::Context;
use crate::job::JobRequest;
use crate::store::{JobStore, StoreError};
use crate::JobId;

#[derive(Debug, Default)]
struct State {
    records: Vec<JobRequest>,
    failures: HashMap<String, VecDeque<StoreError>>,
    attempts: HashMap<String, usize>,
}

/// In-memory job store keeping requests in creation order.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    state: Mutex<State>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `err` as the answer to the next create of `job`.
    ///
    /// Queued failures are consumed in order before the job is stored.
    pub fn fail_job(&self, job: &str, err: StoreError) {
        let mut state = self.state.lock().unwrap();
        state
            .failures
            .entry(job.to_string())
            .or_default()
            .push_back(err);
    }

    /// Number of create calls seen for `job`, successful or not.
    pub fn attempts(&self, job: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.attempts.get(job).copied().unwrap_or(0)
    }

    pub fn get(&self, id: &JobId) -> Option<JobRequest> {
        let state = self.state.lock().unwrap();
        state.records.iter().find(|r| r.id == *id).cloned()
    }

    /// Stored requests in creation order.
    pub fn records(&self) -> Vec<JobRequest> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, _ctx: &Context, request: &JobRequest) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let job = request.job.as_str();
        *state.attempts.entry(job.to_string()).or_default() += 1;

        if let Some(err) = state.failures.get_mut(job).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        if state.records.iter().any(|r| r.id == request.id) {
            return Err(StoreError::AlreadyExists { id: request.id });
        }
        state.records.push(request.clone());
        Ok(())
    }
}
