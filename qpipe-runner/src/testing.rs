//! Scripted in-memory scheduler for tests
//!
//! Every submitted job is given a listing script: one entry per
//! `list_jobs` call saying whether the job is shown. Once the script runs
//! out the job is gone for good.

use async_trait::async_trait;
use qpipe_client::{ClientError, QueueClient, Result, SubmitRequest};
use qpipe_core::JobId;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use tokio::time::Instant;

#[derive(Default)]
struct State {
    next_id: u64,
    default_listing: usize,
    scripts: VecDeque<Vec<bool>>,
    submit_failures: VecDeque<bool>,
    list_failures: usize,
    listings: HashMap<JobId, VecDeque<bool>>,
    submissions: Vec<(JobId, SubmitRequest)>,
    submit_times: Vec<Instant>,
    cancels: Vec<JobId>,
    list_calls: usize,
    max_listed: usize,
    max_live_at_submit: usize,
}

/// Deterministic [`QueueClient`] whose queue only changes when polled
pub struct FakeQueue {
    state: Mutex<State>,
}

impl FakeQueue {
    /// Every job is listed for `polls` calls to `list_jobs`, then disappears
    pub fn new(polls: usize) -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1000,
                default_listing: polls,
                ..State::default()
            }),
        }
    }

    /// The next submission follows `script` instead of the default listing
    pub fn script_next(self, script: Vec<bool>) -> Self {
        self.state.lock().unwrap().scripts.push_back(script);
        self
    }

    /// The next submission prints no job id
    pub fn fail_next_submit(self) -> Self {
        self.state.lock().unwrap().submit_failures.push_back(true);
        self
    }

    /// The next submission succeeds (used to interleave with failures)
    pub fn succeed_next_submit(self) -> Self {
        self.state.lock().unwrap().submit_failures.push_back(false);
        self
    }

    /// The next `count` queries fail without consuming any listing
    pub fn fail_next_lists(&self, count: usize) {
        self.state.lock().unwrap().list_failures += count;
    }

    pub fn submissions(&self) -> Vec<(JobId, SubmitRequest)> {
        self.state.lock().unwrap().submissions.clone()
    }

    /// When each successful submission happened, in submission order
    pub fn submit_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().submit_times.clone()
    }

    pub fn cancels(&self) -> Vec<JobId> {
        self.state.lock().unwrap().cancels.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    /// Largest number of jobs any single listing showed
    pub fn max_listed(&self) -> usize {
        self.state.lock().unwrap().max_listed
    }

    /// Largest number of live jobs right after a submission
    pub fn max_live_at_submit(&self) -> usize {
        self.state.lock().unwrap().max_live_at_submit
    }

    /// Jobs that would still be listed by the next query
    pub fn live(&self) -> HashSet<JobId> {
        let state = self.state.lock().unwrap();
        state
            .listings
            .iter()
            .filter(|(_, script)| script.iter().any(|shown| *shown))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[async_trait]
impl QueueClient for FakeQueue {
    async fn submit(&self, request: &SubmitRequest) -> Result<JobId> {
        let mut state = self.state.lock().unwrap();

        if state.submit_failures.pop_front().unwrap_or(false) {
            return Err(ClientError::Submission("no job id in qsub output: ''".into()));
        }

        let id = JobId::new(state.next_id.to_string());
        state.next_id += 1;

        let script = match state.scripts.pop_front() {
            Some(script) => script,
            None => vec![true; state.default_listing],
        };
        state.listings.insert(id.clone(), script.into());
        state.submissions.push((id.clone(), request.clone()));
        state.submit_times.push(Instant::now());

        let live = state
            .listings
            .values()
            .filter(|script| script.iter().any(|shown| *shown))
            .count();
        state.max_live_at_submit = state.max_live_at_submit.max(live);

        Ok(id)
    }

    async fn list_jobs(&self, _user: Option<&str>) -> Result<HashSet<JobId>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;

        if state.list_failures > 0 {
            state.list_failures -= 1;
            return Err(ClientError::QueryTransient("qstat exited with 1".into()));
        }

        let listed: HashSet<JobId> = state
            .listings
            .iter_mut()
            .filter_map(|(id, script)| match script.pop_front() {
                Some(true) => Some(id.clone()),
                _ => None,
            })
            .collect();

        state.max_listed = state.max_listed.max(listed.len());
        Ok(listed)
    }

    async fn cancel(&self, id: &JobId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.cancels.push(id.clone());
        // A cancelled job lingers for one more listing
        if let Some(script) = state.listings.get_mut(id) {
            script.clear();
            script.push_back(true);
        }
        Ok(())
    }
}
