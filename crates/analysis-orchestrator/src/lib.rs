pub mod cancel;
pub mod poll;
pub mod retry;
pub mod state;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use poll::{poll_until_settled, PollMachine, PollOutcome, PollState, PollTiming};
pub use retry::{RetryDecision, RetryPolicy};
pub use state::{OrchestratorState, Phase, Transition};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use analysis_core::{normalize, AnalysisRequest, JobError, JobService};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub poll: PollTiming,
    pub retry: RetryPolicy,
}

/// Only the active session may write the shared state.
struct SessionGate {
    active: AtomicU64,
    state: watch::Sender<OrchestratorState>,
}

impl SessionGate {
    /// Returns false when `session` has been superseded; nothing is written then.
    fn apply(&self, session: u64, transition: Transition) -> bool {
        self.state.send_if_modified(|state| {
            if self.active.load(Ordering::SeqCst) != session {
                return false;
            }
            *state = std::mem::take(state).apply(transition);
            true
        })
    }
}

struct ActiveSession {
    id: u64,
    cancel: CancelHandle,
    /// Cleared once a `wait()` has joined it.
    task: Option<JoinHandle<()>>,
}

/// Runs analysis jobs one at a time: submit, poll, normalize, retry.
///
/// Starting a new submission cancels the previous session before any state
/// is written for the new one. Must be used from within a tokio runtime.
pub struct AnalysisOrchestrator {
    service: Arc<dyn JobService>,
    config: OrchestratorConfig,
    gate: Arc<SessionGate>,
    next_session: u64,
    active: Option<ActiveSession>,
    last_request: Option<AnalysisRequest>,
}

impl AnalysisOrchestrator {
    pub fn new(service: Arc<dyn JobService>, config: OrchestratorConfig) -> Self {
        let (state, _) = watch::channel(OrchestratorState::default());
        Self {
            service,
            config,
            gate: Arc::new(SessionGate {
                active: AtomicU64::new(0),
                state,
            }),
            next_session: 0,
            active: None,
            last_request: None,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Receiver for state snapshots; changes on every applied transition.
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.gate.state.subscribe()
    }

    pub fn snapshot(&self) -> OrchestratorState {
        self.gate.state.borrow().clone()
    }

    pub fn last_request(&self) -> Option<&AnalysisRequest> {
        self.last_request.as_ref()
    }

    pub fn retry_available(&self) -> bool {
        self.last_request.is_some() && self.snapshot().can_retry(self.config.retry.max_attempts)
    }

    /// Start a new interaction for `request`.
    ///
    /// An invalid request is rejected without a network call. It does not
    /// disturb a job that is still in flight.
    pub fn submit(&mut self, request: AnalysisRequest) -> Result<(), JobError> {
        if let Err(e) = request.validate() {
            tracing::warn!("Rejected analysis request: {}", e);
            if !self.snapshot().is_loading() {
                self.last_request = None;
                let session = self.supersede();
                self.gate.apply(session, Transition::Rejected(e.to_string()));
            }
            return Err(e);
        }

        tracing::info!(
            "Submitting analysis for {} ({})",
            request.symbol,
            request.company_name
        );
        self.last_request = Some(request.clone());
        self.start_session(request, 1, Duration::ZERO);
        Ok(())
    }

    /// Re-run the whole cycle for the last request after the retry delay.
    pub fn retry(&mut self) -> RetryDecision {
        let state = self.snapshot();
        if state.phase != Phase::Failed {
            return RetryDecision::NotFailed;
        }
        if !self.config.retry.allows(state.attempt_count) {
            tracing::info!(
                "Retry cap reached after {} attempts",
                state.attempt_count
            );
            return RetryDecision::Exhausted;
        }
        let Some(request) = self.last_request.clone() else {
            return RetryDecision::NoRequest;
        };

        let attempt = state.attempt_count + 1;
        tracing::info!(
            "Retrying analysis for {} (attempt {}/{})",
            request.symbol,
            attempt,
            self.config.retry.max_attempts
        );
        self.start_session(request, attempt, self.config.retry.delay);
        RetryDecision::Scheduled { attempt }
    }

    /// Stop the active session, if any, and return to idle.
    pub fn cancel(&mut self) {
        let session = self.supersede();
        self.gate.apply(session, Transition::Reset);
    }

    /// Wait for the active session to finish, including automatic retries.
    ///
    /// Dropping the returned future early leaves the session running, and a
    /// later call waits for it again.
    pub async fn wait(&mut self) -> OrchestratorState {
        if let Some(active) = self.active.as_mut() {
            if let Some(task) = active.task.as_mut() {
                let joined = task.await;
                active.task = None;
                if let Err(e) = joined {
                    tracing::error!("Analysis session {} aborted: {}", active.id, e);
                }
            }
        }
        self.snapshot()
    }

    /// Cancel the running session and open a new session id. Stale
    /// sessions can no longer write once this returns.
    fn supersede(&mut self) -> u64 {
        self.next_session += 1;
        let next = self.next_session;
        // Under the state lock, so no stale write can land after this.
        self.gate.state.send_if_modified(|_| {
            self.gate.active.store(next, Ordering::SeqCst);
            false
        });
        if let Some(previous) = self.active.take() {
            previous.cancel.cancel();
            tracing::debug!("Cancelled analysis session {}", previous.id);
        }
        next
    }

    fn start_session(&mut self, request: AnalysisRequest, attempt: u32, delay: Duration) {
        let id = self.supersede();
        self.gate.apply(id, Transition::Submitting { attempt });

        let (cancel, token) = cancel_pair();
        let session = Session {
            id,
            service: Arc::clone(&self.service),
            gate: Arc::clone(&self.gate),
            config: self.config,
        };
        let task = tokio::spawn(session.run(request, attempt, delay, token));
        self.active = Some(ActiveSession {
            id,
            cancel,
            task: Some(task),
        });
    }
}

enum CycleOutcome {
    Succeeded,
    Failed { timed_out: bool },
    Cancelled,
}

struct Session {
    id: u64,
    service: Arc<dyn JobService>,
    gate: Arc<SessionGate>,
    config: OrchestratorConfig,
}

impl Session {
    async fn run(
        self,
        request: AnalysisRequest,
        mut attempt: u32,
        mut delay: Duration,
        mut cancel: CancelToken,
    ) {
        loop {
            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let timed_out = match self.run_cycle(&request, &mut cancel).await {
                CycleOutcome::Failed { timed_out } => timed_out,
                CycleOutcome::Succeeded | CycleOutcome::Cancelled => return,
            };

            if !self.config.retry.should_auto_retry(attempt, timed_out) {
                return;
            }
            attempt += 1;
            delay = self.config.retry.delay;
            tracing::info!(
                "Auto-retrying analysis for {} (attempt {}/{})",
                request.symbol,
                attempt,
                self.config.retry.max_attempts
            );
            if !self.gate.apply(self.id, Transition::Submitting { attempt }) {
                return;
            }
        }
    }

    async fn run_cycle(&self, request: &AnalysisRequest, cancel: &mut CancelToken) -> CycleOutcome {
        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return CycleOutcome::Cancelled,
            result = self.service.submit(request) => result,
        };
        if cancel.is_cancelled() {
            return CycleOutcome::Cancelled;
        }

        let handle = match submitted {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Submission for {} failed ({}): {}", request.symbol, e.kind(), e);
                return self.fail(e, false);
            }
        };

        let polling = Transition::Polling {
            request_id: handle.request_id.clone(),
        };
        if !self.gate.apply(self.id, polling) {
            return CycleOutcome::Cancelled;
        }

        match poll_until_settled(self.service.as_ref(), &handle, self.config.poll, cancel).await {
            PollOutcome::Completed(payload) => {
                let report = Arc::new(normalize(&payload));
                if !self.gate.apply(self.id, Transition::Succeeded(report)) {
                    return CycleOutcome::Cancelled;
                }
                tracing::info!("Analysis for {} completed (job {})", request.symbol, handle);
                CycleOutcome::Succeeded
            }
            PollOutcome::Failed(e) => {
                tracing::warn!("Job {} failed ({}): {}", handle, e.kind(), e);
                self.fail(e, false)
            }
            PollOutcome::TimedOut => {
                tracing::warn!(
                    "Job {} did not finish within {:?}",
                    handle,
                    self.config.poll.deadline
                );
                self.fail(JobError::Timeout, true)
            }
            PollOutcome::Cancelled => CycleOutcome::Cancelled,
        }
    }

    fn fail(&self, error: JobError, timed_out: bool) -> CycleOutcome {
        if self.gate.apply(self.id, Transition::Failed(error.to_string())) {
            CycleOutcome::Failed { timed_out }
        } else {
            CycleOutcome::Cancelled
        }
    }
}
