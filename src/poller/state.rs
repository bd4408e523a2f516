//! Acquisition states, events and the transition rule.

use crate::api::FetchError;
use crate::models::{RawPayload, SiteEvaluation};
use crate::normalizer::normalize;
use std::fmt;
use std::sync::Arc;

/// State of one acquisition.
///
/// `Idle -> Loading -> {Ready, Pending, Failed}`, and `Pending -> Loading`
/// once the retry delay has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Loading,
    Pending,
    Ready,
    Failed,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Ready | PollState::Failed)
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollState::Idle => write!(f, "idle"),
            PollState::Loading => write!(f, "loading"),
            PollState::Pending => write!(f, "pending"),
            PollState::Ready => write!(f, "ready"),
            PollState::Failed => write!(f, "failed"),
        }
    }
}

/// Event delivered to subscribers of an acquisition.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionEvent {
    /// A fetch was issued.
    Loading,
    /// The result does not exist yet; a retry is scheduled.
    Pending,
    Ready(Arc<SiteEvaluation>),
    Failed(FetchError),
}

impl AcquisitionEvent {
    /// State the acquisition is in after this event.
    pub fn state(&self) -> PollState {
        match self {
            AcquisitionEvent::Loading => PollState::Loading,
            AcquisitionEvent::Pending => PollState::Pending,
            AcquisitionEvent::Ready(_) => PollState::Ready,
            AcquisitionEvent::Failed(_) => PollState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }
}

/// What to do after a fetch completed.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Ready(SiteEvaluation),
    Retry,
    Stop(FetchError),
}

/// Decide the next step from a fetch result.
///
/// A payload that is not a JSON object cannot be defaulted into an
/// evaluation and stops the acquisition; any other payload is normalized.
pub fn on_fetch_result(result: Result<RawPayload, FetchError>) -> Transition {
    match result {
        Ok(raw) if raw.is_object() => Transition::Ready(normalize(&raw)),
        Ok(raw) => Transition::Stop(FetchError::Malformed(format!(
            "expected an evaluation object, got {}",
            json_kind(&raw)
        ))),
        Err(e) if e.is_retryable() => Transition::Retry,
        Err(e) => Transition::Stop(e),
    }
}

fn json_kind(value: &RawPayload) -> &'static str {
    match value {
        RawPayload::Null => "null",
        RawPayload::Bool(_) => "a boolean",
        RawPayload::Number(_) => "a number",
        RawPayload::String(_) => "a string",
        RawPayload::Array(_) => "an array",
        RawPayload::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_is_ready() {
        let transition = on_fetch_result(Ok(json!({ "run_id": "r1", "total_score": 50 })));
        match transition {
            Transition::Ready(evaluation) => {
                assert_eq!(evaluation.run_id, "r1");
                assert_eq!(evaluation.total_score, 50.0);
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_retries() {
        assert_eq!(on_fetch_result(Err(FetchError::NotFoundYet)), Transition::Retry);
    }

    #[test]
    fn test_other_failures_stop() {
        let err = FetchError::Unauthorized("expired".into());
        assert_eq!(on_fetch_result(Err(err.clone())), Transition::Stop(err));

        let err = FetchError::Transport("refused".into());
        assert_eq!(on_fetch_result(Err(err.clone())), Transition::Stop(err));
    }

    #[test]
    fn test_non_object_payload_stops() {
        match on_fetch_result(Ok(json!([1, 2, 3]))) {
            Transition::Stop(FetchError::Malformed(msg)) => assert!(msg.contains("an array")),
            other => panic!("expected Malformed stop, got {:?}", other),
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(PollState::Ready.is_terminal());
        assert!(PollState::Failed.is_terminal());
        assert!(!PollState::Pending.is_terminal());
        assert!(!PollState::Loading.is_terminal());
        assert!(!PollState::Idle.is_terminal());
        assert!(AcquisitionEvent::Failed(FetchError::NotFoundYet).is_terminal());
    }
}
