//! Hosted scraping jobs.
//!
//! A job is started with the list of URLs, polled until it reaches a terminal
//! state or the configured timeout elapses, and its dataset is downloaded in
//! one request. Time is read through [`Clock`] so the polling loop can be
//! driven deterministically.
use crate::twitter::error::ExtractError;
use async_trait::async_trait;
use insight_common::activity::ActivityLog;
use insight_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const MAX_TWEETS_DESIRED: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
}

impl JobState {
    /// Map the provider's status string. Unknown values count as still pending.
    pub fn from_remote(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "RUNNING" => JobState::Running,
            "SUCCEEDED" => JobState::Succeeded,
            "FAILED" => JobState::Failed,
            "ABORTING" | "ABORTED" => JobState::Aborted,
            "TIMING-OUT" | "TIMED-OUT" => JobState::TimedOut,
            _ => JobState::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending | JobState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
            JobState::Aborted => "ABORTED",
            JobState::TimedOut => "TIMED_OUT",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Wait(Duration),
    Done(JobState),
}

/// Polling state machine. Feed it each observed remote state with the time
/// elapsed since the job started; it answers with the next step.
#[derive(Debug, Clone)]
pub struct JobTracker {
    policy: PollPolicy,
    state: JobState,
}

impl JobTracker {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            state: JobState::Pending,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn observe(&mut self, remote: JobState, elapsed: Duration) -> PollStep {
        if self.state.is_terminal() {
            return PollStep::Done(self.state);
        }
        self.state = remote;
        if remote.is_terminal() {
            return PollStep::Done(remote);
        }
        if elapsed >= self.policy.timeout {
            self.state = JobState::TimedOut;
            return PollStep::Done(JobState::TimedOut);
        }
        let remaining = self.policy.timeout - elapsed;
        PollStep::Wait(self.policy.interval.min(remaining))
    }
}

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, dur: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await;
    }
}

/// Clock that only moves when slept on. Returns immediately from `sleep`.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, dur: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += dur;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep(&self, dur: Duration) {
        self.advance(dur);
    }
}

/// Run input accepted by the tweet scraper actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    pub start_urls: Vec<String>,
    pub handles: Vec<String>,
    pub tweets_desired: u32,
    pub with_replies: bool,
    pub include_user_info: bool,
}

impl JobInput {
    pub fn new(start_urls: Vec<String>, handles: Vec<String>, tweets_desired: u32) -> Self {
        Self {
            start_urls,
            handles,
            tweets_desired: tweets_desired.clamp(1, MAX_TWEETS_DESIRED),
            with_replies: false,
            include_user_info: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobRun {
    pub id: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize)]
struct RunEnvelope {
    data: JobRun,
}

#[async_trait]
pub trait JobApi: Send + Sync {
    async fn start_run(&self, input: &JobInput) -> Result<JobRun, HttpError>;
    async fn run_status(&self, run_id: &str) -> Result<JobRun, HttpError>;
    async fn dataset_items(&self, run_id: &str) -> Result<Vec<Value>, HttpError>;
}

/// Actor platform client authenticated with a bearer token.
#[derive(Clone)]
pub struct ApifyClient {
    http: HttpClient,
    actor_id: String,
    token: String,
}

impl fmt::Debug for ApifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApifyClient")
            .field("base", &self.http.base_url().as_str())
            .field("actor_id", &self.actor_id)
            .finish_non_exhaustive()
    }
}

impl ApifyClient {
    pub fn new(
        base_url: &str,
        actor_id: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, HttpError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(HttpError::Build("API token is empty".into()));
        }
        Ok(Self {
            http: HttpClient::new(base_url)?.with_timeout(timeout),
            actor_id: actor_id.into(),
            token,
        })
    }

    fn opts(&self) -> RequestOpts<'_> {
        RequestOpts {
            auth: Some(Auth::Bearer(&self.token)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl JobApi for ApifyClient {
    async fn start_run(&self, input: &JobInput) -> Result<JobRun, HttpError> {
        let path = format!("acts/{}/runs", self.actor_id);
        let env: RunEnvelope = self.http.post_json(&path, input, self.opts()).await?;
        Ok(env.data)
    }

    async fn run_status(&self, run_id: &str) -> Result<JobRun, HttpError> {
        let path = format!("actor-runs/{run_id}");
        let env: RunEnvelope = self.http.get_json(&path, self.opts()).await?;
        Ok(env.data)
    }

    async fn dataset_items(&self, run_id: &str) -> Result<Vec<Value>, HttpError> {
        let path = format!("actor-runs/{run_id}/dataset/items");
        self.http.get_json(&path, self.opts()).await
    }
}

/// Start a job, poll it to completion, and return its dataset items.
///
/// Any terminal state other than success, including the local timeout, is an error.
pub async fn run_job(
    api: &dyn JobApi,
    clock: &dyn Clock,
    policy: PollPolicy,
    input: &JobInput,
    log: &mut ActivityLog,
) -> Result<Vec<Value>, ExtractError> {
    let mut run = api.start_run(input).await.map_err(ExtractError::JobStart)?;
    log.info(format!("Scraping job started: {}", run.id));

    let started = clock.now();
    let mut tracker = JobTracker::new(policy);
    loop {
        let remote = JobState::from_remote(&run.status);
        let elapsed = clock.now().saturating_duration_since(started);
        tracing::info!(run_id = %run.id, state = %remote, elapsed_ms = elapsed.as_millis() as u64, "job.poll.status");
        match tracker.observe(remote, elapsed) {
            PollStep::Wait(dur) => {
                clock.sleep(dur).await;
                run = api
                    .run_status(&run.id)
                    .await
                    .map_err(|source| ExtractError::JobPoll {
                        run_id: run.id.clone(),
                        source,
                    })?;
            }
            PollStep::Done(JobState::Succeeded) => break,
            PollStep::Done(state) => {
                return Err(ExtractError::JobEnded {
                    run_id: run.id,
                    state,
                });
            }
        }
    }

    let items = api
        .dataset_items(&run.id)
        .await
        .map_err(|source| ExtractError::JobDataset {
            run_id: run.id.clone(),
            source,
        })?;
    log.info(format!("Scraping job {} returned {} items", run.id, items.len()));
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn remote_states_map() {
        assert_eq!(JobState::from_remote("READY"), JobState::Pending);
        assert_eq!(JobState::from_remote("running"), JobState::Running);
        assert_eq!(JobState::from_remote("SUCCEEDED"), JobState::Succeeded);
        assert_eq!(JobState::from_remote("ABORTING"), JobState::Aborted);
        assert_eq!(JobState::from_remote("TIMED-OUT"), JobState::TimedOut);
        assert_eq!(JobState::from_remote("???"), JobState::Pending);
    }

    #[test]
    fn tracker_waits_then_finishes() {
        let mut t = JobTracker::new(PollPolicy {
            interval: secs(5),
            timeout: secs(60),
        });
        assert_eq!(t.observe(JobState::Pending, secs(0)), PollStep::Wait(secs(5)));
        assert_eq!(t.observe(JobState::Running, secs(5)), PollStep::Wait(secs(5)));
        assert_eq!(t.state(), JobState::Running);
        assert_eq!(
            t.observe(JobState::Succeeded, secs(10)),
            PollStep::Done(JobState::Succeeded)
        );
    }

    #[test]
    fn tracker_times_out_and_caps_last_wait() {
        let mut t = JobTracker::new(PollPolicy {
            interval: secs(5),
            timeout: secs(12),
        });
        assert_eq!(t.observe(JobState::Running, secs(10)), PollStep::Wait(secs(2)));
        assert_eq!(
            t.observe(JobState::Running, secs(12)),
            PollStep::Done(JobState::TimedOut)
        );
        // terminal states stick
        assert_eq!(
            t.observe(JobState::Succeeded, secs(13)),
            PollStep::Done(JobState::TimedOut)
        );
    }

    #[test]
    fn tweets_desired_is_clamped() {
        assert_eq!(JobInput::new(vec![], vec![], 0).tweets_desired, 1);
        assert_eq!(JobInput::new(vec![], vec![], 500).tweets_desired, 200);
        let body = serde_json::to_value(JobInput::new(vec!["u".into()], vec!["h".into()], 20)).unwrap();
        assert_eq!(body["startUrls"][0], "u");
        assert_eq!(body["tweetsDesired"], 20);
        assert_eq!(body["includeUserInfo"], true);
    }

    #[tokio::test]
    async fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.sleep(secs(7)).await;
        assert_eq!(clock.now() - start, secs(7));
    }
}
