use std::sync::Arc;

use analysis_core::NormalizedReport;
use serde::Serialize;

/// Coarse lifecycle phase shown to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Polling,
    Succeeded,
    Failed,
}

/// Snapshot of the single orchestration session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestratorState {
    pub phase: Phase,
    pub report: Option<Arc<NormalizedReport>>,
    pub error_message: Option<String>,
    pub request_id: Option<String>,
    /// Submit cycles started in the current interaction, retries included.
    pub attempt_count: u32,
}

/// Every way the state is allowed to change.
#[derive(Debug, Clone)]
pub enum Transition {
    /// A submit cycle (first or retry) is starting.
    Submitting { attempt: u32 },
    Polling { request_id: String },
    Succeeded(Arc<NormalizedReport>),
    Failed(String),
    /// Request rejected locally before any cycle started.
    Rejected(String),
    Reset,
}

impl OrchestratorState {
    pub fn apply(self, transition: Transition) -> Self {
        match transition {
            Transition::Submitting { attempt } => Self {
                phase: Phase::Submitting,
                report: None,
                error_message: None,
                request_id: None,
                attempt_count: attempt,
            },
            Transition::Polling { request_id } => Self {
                phase: Phase::Polling,
                request_id: Some(request_id),
                ..self
            },
            Transition::Succeeded(report) => Self {
                phase: Phase::Succeeded,
                report: Some(report),
                error_message: None,
                ..self
            },
            Transition::Failed(message) => Self {
                phase: Phase::Failed,
                report: None,
                error_message: Some(message),
                ..self
            },
            Transition::Rejected(message) => Self {
                phase: Phase::Failed,
                report: None,
                error_message: Some(message),
                request_id: None,
                attempt_count: 0,
            },
            Transition::Reset => Self::default(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Submitting | Phase::Polling)
    }

    /// Whether a retry may be offered under a cap of `max_attempts`.
    pub fn can_retry(&self, max_attempts: u32) -> bool {
        self.phase == Phase::Failed && self.attempt_count < max_attempts
    }

    /// Status line while a job is in flight.
    pub fn progress_message(&self, max_attempts: u32) -> Option<String> {
        if !self.is_loading() {
            return None;
        }
        if self.attempt_count > 1 {
            Some(format!(
                "Retrying analysis (attempt {}/{})...",
                self.attempt_count, max_attempts
            ))
        } else {
            Some(
                "Multi-agent system is running... Agents are collaborating to generate your report"
                    .to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> Arc<NormalizedReport> {
        Arc::new(analysis_core::normalize(&json!({ "executive_summary": "ok" })))
    }

    #[test]
    fn test_happy_path_transitions() {
        let state = OrchestratorState::default()
            .apply(Transition::Submitting { attempt: 1 });
        assert!(state.is_loading());
        assert_eq!(state.attempt_count, 1);

        let state = state.apply(Transition::Polling {
            request_id: "job-1".into(),
        });
        assert_eq!(state.phase, Phase::Polling);
        assert!(state.is_loading());

        let state = state.apply(Transition::Succeeded(report()));
        assert_eq!(state.phase, Phase::Succeeded);
        assert!(!state.is_loading());
        assert!(state.error_message.is_none());
        assert_eq!(state.request_id.as_deref(), Some("job-1"));
    }

    #[test]
    fn test_failure_clears_loading() {
        let state = OrchestratorState::default()
            .apply(Transition::Submitting { attempt: 2 })
            .apply(Transition::Failed("boom".into()));
        assert!(!state.is_loading());
        assert_eq!(state.error_message.as_deref(), Some("boom"));
        assert!(state.can_retry(3));
        assert!(!state.can_retry(2));
    }

    #[test]
    fn test_new_cycle_clears_previous_result() {
        let state = OrchestratorState::default()
            .apply(Transition::Submitting { attempt: 1 })
            .apply(Transition::Succeeded(report()))
            .apply(Transition::Submitting { attempt: 1 });
        assert!(state.report.is_none());
        assert!(state.request_id.is_none());
    }

    #[test]
    fn test_progress_message() {
        let idle = OrchestratorState::default();
        assert_eq!(idle.progress_message(3), None);

        let retrying = idle.apply(Transition::Submitting { attempt: 2 });
        assert_eq!(
            retrying.progress_message(3).as_deref(),
            Some("Retrying analysis (attempt 2/3)...")
        );
    }
}
