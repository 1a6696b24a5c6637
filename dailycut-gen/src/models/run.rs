//! Generation run state machine
//!
//! A run progresses through:
//! Gathering → Composing → ResolvingCollection → Synthesizing → Persisting → Done,
//! with Failed reachable from every non-terminal state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::executor::TierAttempt;

/// Pipeline stage of a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Aggregating news/weather/calendar context
    Gathering,
    /// Composing lyrics and genre tags via the text capability
    Composing,
    /// Resolving (or creating) the weekly album
    ResolvingCollection,
    /// Long-running audio synthesis job
    Synthesizing,
    /// Writing the song record, minting the share token
    Persisting,
    /// Run finished successfully
    Done,
    /// Run failed with a recorded reason
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Gathering => "Gathering",
            RunState::Composing => "Composing",
            RunState::ResolvingCollection => "ResolvingCollection",
            RunState::Synthesizing => "Synthesizing",
            RunState::Persisting => "Persisting",
            RunState::Done => "Done",
            RunState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// Client-correctable rejection: the request never entered the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The owner already has `daily_limit` songs for this day
    LimitReached,
    /// Another generation for this owner/day is currently running
    AlreadyInFlight,
}

/// Pipeline-internal failure, surfaced with the per-tier attempt log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FailureReason {
    /// Every text generation tier failed or returned malformed output
    ComposeExhausted { attempts: Vec<TierAttempt> },
    /// The synthesis job exceeded its timeout - may succeed if retried
    SynthesisTimeout { elapsed_seconds: u64 },
    /// The synthesis provider rejected the job - retrying is unlikely to help
    SynthesisRejected { reason: String },
    /// The song record could not be written
    PersistConflict { reason: String },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::ComposeExhausted { attempts } => {
                write!(f, "all {} text generation tiers exhausted", attempts.len())
            }
            FailureReason::SynthesisTimeout { elapsed_seconds } => {
                write!(f, "audio synthesis timed out after {}s", elapsed_seconds)
            }
            FailureReason::SynthesisRejected { reason } => {
                write!(f, "audio synthesis rejected: {}", reason)
            }
            FailureReason::PersistConflict { reason } => {
                write!(f, "persist conflict: {}", reason)
            }
        }
    }
}

/// One generation run (in-memory state, persisted per transition)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRun {
    pub run_id: Uuid,
    pub owner_id: Uuid,
    /// UTC day this run counts against
    pub day: NaiveDate,
    pub state: RunState,
    /// Set when state is Failed
    pub failure: Option<FailureReason>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl GenerationRun {
    pub fn new(owner_id: Uuid, day: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            owner_id,
            day,
            state: RunState::Gathering,
            failure: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to a new state, stamping the end time on terminal states
    pub fn transition_to(&mut self, new_state: RunState) {
        self.state = new_state;
        if matches!(new_state, RunState::Done | RunState::Failed) {
            self.ended_at = Some(Utc::now());
        }
    }

    /// Mark the run failed with a reason
    pub fn fail(&mut self, reason: FailureReason) {
        self.failure = Some(reason);
        self.transition_to(RunState::Failed);
    }

    /// Whether the run has finished (successfully or not)
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RunState::Done | RunState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_starts_gathering() {
        let run = GenerationRun::new(Uuid::new_v4(), NaiveDate::from_ymd_opt(2025, 3, 12).unwrap());
        assert_eq!(run.state, RunState::Gathering);
        assert!(!run.is_terminal());
        assert!(run.ended_at.is_none());
    }

    #[test]
    fn test_terminal_states_stamp_end_time() {
        let mut run =
            GenerationRun::new(Uuid::new_v4(), NaiveDate::from_ymd_opt(2025, 3, 12).unwrap());
        run.transition_to(RunState::Composing);
        assert!(run.ended_at.is_none());

        run.transition_to(RunState::Done);
        assert!(run.is_terminal());
        assert!(run.ended_at.is_some());
    }

    #[test]
    fn test_fail_records_reason() {
        let mut run =
            GenerationRun::new(Uuid::new_v4(), NaiveDate::from_ymd_opt(2025, 3, 12).unwrap());
        run.fail(FailureReason::SynthesisTimeout { elapsed_seconds: 901 });

        assert_eq!(run.state, RunState::Failed);
        assert!(run.is_terminal());
        assert!(matches!(
            run.failure,
            Some(FailureReason::SynthesisTimeout { elapsed_seconds: 901 })
        ));
    }
}
