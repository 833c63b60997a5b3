//! Bounds on how often and for how long a circuit may fire.

use serde::{Deserialize, Serialize};

use crate::time::{self, Timestamp};

/// Configured bounds on a circuit's runs. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConstraints {
    /// Stop once this many fire decisions have been made.
    pub max_executions: Option<u64>,
    /// Stop once this many action runs have completed successfully.
    pub max_successful_completions: Option<u64>,
    /// Runs are only allowed at or after this instant.
    pub start_date: Option<Timestamp>,
    /// Runs are only allowed at or before this instant.
    pub end_date: Option<Timestamp>,
}

impl ExecutionConstraints {
    /// Whether any bound is configured at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.max_executions.is_none()
            && self.max_successful_completions.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}

/// Run counters of a circuit, owned by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    /// Incremented on every fire decision, whatever its outcome.
    pub executed_count: u64,
    /// Incremented when the executor returns without failure.
    pub successful_completion_count: u64,
}

/// Whether the circuit may keep running after an action run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunVerdict {
    ContinueRun,
    ExitRun,
}

/// Which bound ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedBound {
    MaxExecutions,
    DateWindow,
    MaxSuccessfulCompletions,
}

/// Evaluates [`ExecutionConstraints`] against [`RunCounters`].
#[derive(Debug, Clone, Default)]
pub struct ConstraintGate {
    constraints: Option<ExecutionConstraints>,
}

impl ConstraintGate {
    /// A gate with no constraints: every check continues.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(constraints: ExecutionConstraints) -> Self {
        Self {
            constraints: Some(constraints),
        }
    }

    #[must_use]
    pub fn constraints(&self) -> Option<&ExecutionConstraints> {
        self.constraints.as_ref()
    }

    /// Check the bounds at the current time.
    #[must_use]
    pub fn check(&self, counters: &RunCounters) -> RunVerdict {
        self.check_at(counters, time::now())
    }

    /// Check the bounds at instant `at`.
    #[must_use]
    pub fn check_at(&self, counters: &RunCounters, at: Timestamp) -> RunVerdict {
        match self.exhausted_bound(counters, at) {
            Some(_) => RunVerdict::ExitRun,
            None => RunVerdict::ContinueRun,
        }
    }

    /// The first violated bound, if any.
    #[must_use]
    pub fn exhausted_bound(&self, counters: &RunCounters, at: Timestamp) -> Option<ExhaustedBound> {
        let constraints = self.constraints.as_ref()?;

        if constraints
            .max_executions
            .is_some_and(|max| counters.executed_count >= max)
        {
            return Some(ExhaustedBound::MaxExecutions);
        }
        if !time::within_window(at, constraints.start_date, constraints.end_date) {
            return Some(ExhaustedBound::DateWindow);
        }
        if constraints
            .max_successful_completions
            .is_some_and(|max| counters.successful_completion_count >= max)
        {
            return Some(ExhaustedBound::MaxSuccessfulCompletions);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn counters(executed: u64, successful: u64) -> RunCounters {
        RunCounters {
            executed_count: executed,
            successful_completion_count: successful,
        }
    }

    #[test]
    fn should_continue_when_no_constraints_configured() {
        let gate = ConstraintGate::unbounded();
        assert_eq!(gate.check(&counters(1_000, 1_000)), RunVerdict::ContinueRun);
    }

    #[test]
    fn should_continue_when_constraints_are_all_empty() {
        let gate = ConstraintGate::new(ExecutionConstraints::default());
        assert_eq!(gate.check(&counters(50, 50)), RunVerdict::ContinueRun);
    }

    #[test]
    fn should_exit_after_third_execution_when_max_is_three() {
        let gate = ConstraintGate::new(ExecutionConstraints {
            max_executions: Some(3),
            ..ExecutionConstraints::default()
        });
        assert_eq!(gate.check(&counters(1, 0)), RunVerdict::ContinueRun);
        assert_eq!(gate.check(&counters(2, 0)), RunVerdict::ContinueRun);
        assert_eq!(gate.check(&counters(3, 0)), RunVerdict::ExitRun);
    }

    #[test]
    fn should_exit_when_successful_completions_reach_max() {
        let gate = ConstraintGate::new(ExecutionConstraints {
            max_successful_completions: Some(2),
            ..ExecutionConstraints::default()
        });
        assert_eq!(gate.check(&counters(5, 1)), RunVerdict::ContinueRun);
        assert_eq!(gate.check(&counters(5, 2)), RunVerdict::ExitRun);
    }

    #[test]
    fn should_exit_outside_date_window() {
        let now = time::now();
        let gate = ConstraintGate::new(ExecutionConstraints {
            start_date: Some(now - Duration::hours(1)),
            end_date: Some(now + Duration::hours(1)),
            ..ExecutionConstraints::default()
        });
        assert_eq!(gate.check_at(&counters(0, 0), now), RunVerdict::ContinueRun);
        assert_eq!(
            gate.exhausted_bound(&counters(0, 0), now + Duration::hours(2)),
            Some(ExhaustedBound::DateWindow)
        );
        assert_eq!(
            gate.check_at(&counters(0, 0), now - Duration::hours(2)),
            RunVerdict::ExitRun
        );
    }

    #[test]
    fn should_exit_when_any_single_bound_is_violated() {
        let now = time::now();
        let gate = ConstraintGate::new(ExecutionConstraints {
            max_executions: Some(10),
            max_successful_completions: Some(10),
            end_date: Some(now - Duration::seconds(1)),
            ..ExecutionConstraints::default()
        });
        assert_eq!(gate.check_at(&counters(0, 0), now), RunVerdict::ExitRun);
    }

    #[test]
    fn should_deserialize_constraints_from_partial_json() {
        let constraints: ExecutionConstraints =
            serde_json::from_value(serde_json::json!({ "max_executions": 4 })).unwrap();
        assert_eq!(constraints.max_executions, Some(4));
        assert!(constraints.end_date.is_none());
        assert!(!constraints.is_empty());
    }
}
