//! Poll loop for one accepted job.
//!
//! [`PollMachine`] is a pure state machine: it is fed events and answers
//! with the next action. [`poll_until_settled`] drives it with tokio timers
//! and the job service, checking the session's cancel token around every
//! suspension point so nothing is applied after cancellation.

use std::time::Duration;

use analysis_core::{JobError, JobHandle, JobService, JobStatus};

use crate::cancel::CancelToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub interval: Duration,
    /// Measured from the moment polling starts.
    pub deadline: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            deadline: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Polling)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    IntervalElapsed,
    StatusReceived(JobStatus),
    PollFailed(JobError),
    DeadlineElapsed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollAction {
    IssuePoll,
    ScheduleNextPoll,
    Finish(PollOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Raw report payload, not yet normalized.
    Completed(serde_json::Value),
    Failed(JobError),
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PollMachine {
    state: PollState,
    polls_issued: u32,
}

impl Default for PollMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PollMachine {
    pub fn new() -> Self {
        Self {
            state: PollState::Polling,
            polls_issued: 0,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn polls_issued(&self) -> u32 {
        self.polls_issued
    }

    /// Once terminal, every event is ignored and no action is returned.
    pub fn handle(mut self, event: PollEvent) -> (Self, Option<PollAction>) {
        if self.state.is_terminal() {
            return (self, None);
        }

        match event {
            PollEvent::IntervalElapsed => {
                self.polls_issued += 1;
                (self, Some(PollAction::IssuePoll))
            }
            PollEvent::StatusReceived(JobStatus::Processing) => {
                (self, Some(PollAction::ScheduleNextPoll))
            }
            PollEvent::StatusReceived(JobStatus::Completed(payload)) => {
                self.finish(PollState::Completed, PollOutcome::Completed(payload))
            }
            PollEvent::StatusReceived(JobStatus::Failed(message)) => self.finish(
                PollState::Failed,
                PollOutcome::Failed(JobError::ServerReported(message)),
            ),
            PollEvent::PollFailed(error) => self.finish(
                PollState::Failed,
                PollOutcome::Failed(JobError::Transport(format!(
                    "Failed to check analysis status: {}",
                    error
                ))),
            ),
            PollEvent::DeadlineElapsed => self.finish(PollState::TimedOut, PollOutcome::TimedOut),
            PollEvent::Cancelled => self.finish(PollState::Cancelled, PollOutcome::Cancelled),
        }
    }

    fn finish(mut self, state: PollState, outcome: PollOutcome) -> (Self, Option<PollAction>) {
        self.state = state;
        (self, Some(PollAction::Finish(outcome)))
    }
}

enum Step {
    Wait,
    Query,
}

/// Poll `handle` every `timing.interval` until the job settles, the deadline
/// passes or the session is cancelled. Polls never overlap: the next one is
/// scheduled only after the previous response arrived.
pub async fn poll_until_settled(
    service: &dyn JobService,
    handle: &JobHandle,
    timing: PollTiming,
    cancel: &mut CancelToken,
) -> PollOutcome {
    let deadline = tokio::time::sleep(timing.deadline);
    tokio::pin!(deadline);

    let mut machine = PollMachine::new();
    let mut step = Step::Wait;

    loop {
        let event = match step {
            Step::Wait => tokio::select! {
                biased;
                _ = cancel.cancelled() => PollEvent::Cancelled,
                _ = &mut deadline => PollEvent::DeadlineElapsed,
                _ = tokio::time::sleep(timing.interval) => PollEvent::IntervalElapsed,
            },
            Step::Query => tokio::select! {
                biased;
                _ = cancel.cancelled() => PollEvent::Cancelled,
                _ = &mut deadline => PollEvent::DeadlineElapsed,
                result = service.status(handle) => match result {
                    Ok(status) => PollEvent::StatusReceived(status),
                    Err(e) => {
                        tracing::warn!("Status check for job {} failed: {}", handle, e);
                        PollEvent::PollFailed(e)
                    }
                },
            },
        };
        // A response that raced a cancellation is dropped here.
        let event = if cancel.is_cancelled() {
            PollEvent::Cancelled
        } else {
            event
        };

        let (next, action) = machine.handle(event);
        machine = next;

        match action {
            Some(PollAction::ScheduleNextPoll) => step = Step::Wait,
            Some(PollAction::IssuePoll) => {
                tracing::debug!("Polling job {} (poll #{})", handle, machine.polls_issued());
                step = Step::Query;
            }
            Some(PollAction::Finish(outcome)) => {
                tracing::debug!(
                    "Job {} settled as {:?} after {} polls",
                    handle,
                    machine.state(),
                    machine.polls_issued()
                );
                return outcome;
            }
            // unreachable: the loop exits on the first Finish
            None => return PollOutcome::Cancelled,
        }
    }
}
