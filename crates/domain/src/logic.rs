//! Decides when the satisfied conditions are enough to fire.
//!
//! Watchers report matches and unmatches independently of each other. The
//! [`ConditionAggregator`] keeps the set of currently satisfied condition ids
//! and evaluates the configured [`ConditionalLogic`] against it.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ConfigurationError;
use crate::id::ConditionId;
use crate::log::{LogCategory, LogRing};

/// Which policy turns the satisfied set into a fire decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicPolicy {
    /// Fire when every registered condition is satisfied.
    Every,
    /// Fire when at least `value` conditions are satisfied.
    Threshold { value: usize },
    /// Fire when one specific condition is satisfied.
    Target { target: ConditionId },
}

impl fmt::Display for LogicPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Every => f.write_str("every"),
            Self::Threshold { value } => write!(f, "threshold({value})"),
            Self::Target { target } => write!(f, "target({target})"),
        }
    }
}

/// Conditional logic of a circuit: a policy plus an optional polling interval.
///
/// Deserializes from the flat form
/// `{ "type": "threshold", "value": 2, "interval_ms": 5000 }` and rejects a
/// THRESHOLD without `value` or a TARGET without `target_condition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLogic", into = "RawLogic")]
pub struct ConditionalLogic {
    pub policy: LogicPolicy,
    /// Upper bound on each observation and pause between cycles.
    pub interval: Option<Duration>,
}

impl ConditionalLogic {
    #[must_use]
    pub fn every() -> Self {
        Self::from(LogicPolicy::Every)
    }

    #[must_use]
    pub fn threshold(value: usize) -> Self {
        Self::from(LogicPolicy::Threshold { value })
    }

    #[must_use]
    pub fn target(target: ConditionId) -> Self {
        Self::from(LogicPolicy::Target { target })
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}

impl From<LogicPolicy> for ConditionalLogic {
    fn from(policy: LogicPolicy) -> Self {
        Self {
            policy,
            interval: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawPolicy {
    Every,
    Threshold,
    Target,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawLogic {
    #[serde(rename = "type")]
    kind: RawPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_condition: Option<ConditionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interval_ms: Option<u64>,
}

impl TryFrom<RawLogic> for ConditionalLogic {
    type Error = ConfigurationError;

    fn try_from(raw: RawLogic) -> Result<Self, Self::Error> {
        let policy = match raw.kind {
            RawPolicy::Every => LogicPolicy::Every,
            RawPolicy::Threshold => LogicPolicy::Threshold {
                value: raw.value.ok_or(ConfigurationError::IncompleteLogic {
                    logic: "threshold",
                    field: "value",
                })?,
            },
            RawPolicy::Target => LogicPolicy::Target {
                target: raw
                    .target_condition
                    .ok_or(ConfigurationError::IncompleteLogic {
                        logic: "target",
                        field: "target_condition",
                    })?,
            },
        };
        Ok(Self {
            policy,
            interval: raw.interval_ms.map(Duration::from_millis),
        })
    }
}

impl From<ConditionalLogic> for RawLogic {
    fn from(logic: ConditionalLogic) -> Self {
        let (kind, value, target_condition) = match logic.policy {
            LogicPolicy::Every => (RawPolicy::Every, None, None),
            LogicPolicy::Threshold { value } => (RawPolicy::Threshold, Some(value), None),
            LogicPolicy::Target { target } => (RawPolicy::Target, None, Some(target)),
        };
        Self {
            kind,
            value,
            target_condition,
            interval_ms: logic
                .interval
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}

/// Result of evaluating conditional logic against the satisfied set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOutcome {
    /// Not enough conditions hold yet.
    Continue,
    /// The logic is satisfied; actions should run.
    Fire,
}

/// Tracks which conditions are currently matched.
#[derive(Debug, Clone, Default)]
pub struct ConditionAggregator {
    satisfied: BTreeSet<ConditionId>,
}

impl ConditionAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as satisfied.
    pub fn record_match(&mut self, id: ConditionId, log: &mut LogRing) {
        self.satisfied.insert(id);
        log.append(
            LogCategory::Condition,
            format!("condition {id} matched"),
            &json!({ "condition_id": id, "satisfied": self.satisfied }),
        );
    }

    /// Mark `id` as no longer satisfied.
    pub fn record_unmatch(&mut self, id: ConditionId, log: &mut LogRing) {
        self.satisfied.remove(&id);
        log.append(
            LogCategory::Condition,
            format!("condition {id} unmatched"),
            &json!({ "condition_id": id, "satisfied": self.satisfied }),
        );
    }

    /// Evaluate `logic` against the satisfied set.
    ///
    /// `total` is the number of registered conditions. Without logic the
    /// circuit never fires.
    pub fn evaluate(
        &self,
        logic: Option<&ConditionalLogic>,
        total: usize,
        log: &mut LogRing,
    ) -> LogicOutcome {
        let outcome = match logic.map(|l| l.policy) {
            None => LogicOutcome::Continue,
            Some(LogicPolicy::Every) if self.satisfied.len() == total => LogicOutcome::Fire,
            Some(LogicPolicy::Threshold { value }) if self.satisfied.len() >= value => {
                LogicOutcome::Fire
            }
            Some(LogicPolicy::Target { target }) if self.satisfied.contains(&target) => {
                LogicOutcome::Fire
            }
            Some(_) => LogicOutcome::Continue,
        };

        let policy = logic.map_or_else(|| "none".to_string(), |l| l.policy.to_string());
        log.append(
            LogCategory::Condition,
            format!("logic {policy} evaluated to {outcome:?}"),
            &json!({
                "policy": policy,
                "outcome": outcome,
                "satisfied": self.satisfied,
                "total": total,
            }),
        );
        outcome
    }

    /// Whether `id` is currently satisfied.
    #[must_use]
    pub fn is_satisfied(&self, id: ConditionId) -> bool {
        self.satisfied.contains(&id)
    }

    /// Number of currently satisfied conditions.
    #[must_use]
    pub fn satisfied_count(&self) -> usize {
        self.satisfied.len()
    }

    /// Satisfied conditions in ascending id order.
    pub fn satisfied(&self) -> impl Iterator<Item = ConditionId> + '_ {
        self.satisfied.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(raw: u32) -> ConditionId {
        ConditionId::new(raw)
    }

    fn aggregator_with(ids: &[u32], log: &mut LogRing) -> ConditionAggregator {
        let mut agg = ConditionAggregator::new();
        for raw in ids {
            agg.record_match(id(*raw), log);
        }
        agg
    }

    #[test]
    fn should_continue_when_no_logic_is_configured() {
        let mut log = LogRing::new();
        let agg = aggregator_with(&[1, 2], &mut log);
        assert_eq!(agg.evaluate(None, 2, &mut log), LogicOutcome::Continue);
    }

    #[test]
    fn should_fire_every_only_when_all_conditions_hold() {
        let mut log = LogRing::new();
        let logic = ConditionalLogic::every();
        let mut agg = aggregator_with(&[1, 2], &mut log);
        assert_eq!(agg.evaluate(Some(&logic), 3, &mut log), LogicOutcome::Continue);

        agg.record_match(id(3), &mut log);
        assert_eq!(agg.evaluate(Some(&logic), 3, &mut log), LogicOutcome::Fire);

        agg.record_unmatch(id(2), &mut log);
        assert_eq!(agg.evaluate(Some(&logic), 3, &mut log), LogicOutcome::Continue);
    }

    #[test]
    fn should_ignore_repeated_matches_of_same_condition() {
        let mut log = LogRing::new();
        let agg = aggregator_with(&[1, 1, 1], &mut log);
        assert_eq!(agg.satisfied_count(), 1);
        assert_eq!(
            agg.evaluate(Some(&ConditionalLogic::threshold(2)), 3, &mut log),
            LogicOutcome::Continue
        );
    }

    #[test]
    fn should_fire_target_regardless_of_other_conditions() {
        let mut log = LogRing::new();
        let logic = ConditionalLogic::target(id(2));
        let mut agg = aggregator_with(&[1, 3], &mut log);
        assert_eq!(agg.evaluate(Some(&logic), 3, &mut log), LogicOutcome::Continue);

        agg.record_match(id(2), &mut log);
        agg.record_unmatch(id(1), &mut log);
        assert_eq!(agg.evaluate(Some(&logic), 3, &mut log), LogicOutcome::Fire);
    }

    #[test]
    fn should_log_every_notification_and_evaluation() {
        let mut log = LogRing::new();
        let mut agg = aggregator_with(&[1], &mut log);
        agg.record_unmatch(id(1), &mut log);
        agg.evaluate(Some(&ConditionalLogic::every()), 1, &mut log);

        let messages: Vec<_> = log.read(None).into_iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            [
                "condition 1 matched",
                "condition 1 unmatched",
                "logic every evaluated to Continue",
            ]
        );
    }

    #[test]
    fn should_deserialize_threshold_logic_with_interval() {
        let logic: ConditionalLogic = serde_json::from_value(serde_json::json!({
            "type": "threshold",
            "value": 2,
            "interval_ms": 1500
        }))
        .unwrap();
        assert_eq!(logic.policy, LogicPolicy::Threshold { value: 2 });
        assert_eq!(logic.interval, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn should_reject_threshold_without_value() {
        let result: Result<ConditionalLogic, _> =
            serde_json::from_value(serde_json::json!({ "type": "threshold" }));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("threshold is missing its value"), "{err}");
    }

    #[test]
    fn should_reject_target_without_target_condition() {
        let raw = RawLogic {
            kind: RawPolicy::Target,
            value: Some(3),
            target_condition: None,
            interval_ms: None,
        };
        assert_eq!(
            ConditionalLogic::try_from(raw),
            Err(ConfigurationError::IncompleteLogic {
                logic: "target",
                field: "target_condition",
            })
        );
    }

    fn apply(ops: &[(u32, bool)], log: &mut LogRing) -> ConditionAggregator {
        let mut agg = ConditionAggregator::new();
        for (raw, matched) in ops {
            if *matched {
                agg.record_match(id(*raw), log);
            } else {
                agg.record_unmatch(id(*raw), log);
            }
        }
        agg
    }

    proptest! {
        #[test]
        fn every_fires_iff_all_conditions_satisfied(
            ops in prop::collection::vec((1u32..=5, any::<bool>()), 0..40),
        ) {
            let mut log = LogRing::with_capacity(8);
            let agg = apply(&ops, &mut log);
            let all = (1..=5).all(|raw| agg.is_satisfied(id(raw)));
            let outcome = agg.evaluate(Some(&ConditionalLogic::every()), 5, &mut log);
            prop_assert_eq!(outcome == LogicOutcome::Fire, all);
        }

        #[test]
        fn threshold_fires_iff_enough_conditions_satisfied(
            ops in prop::collection::vec((1u32..=6, any::<bool>()), 0..40),
            k in 0usize..=6,
        ) {
            let mut log = LogRing::with_capacity(8);
            let agg = apply(&ops, &mut log);
            let outcome = agg.evaluate(Some(&ConditionalLogic::threshold(k)), 6, &mut log);
            prop_assert_eq!(outcome == LogicOutcome::Fire, agg.satisfied_count() >= k);
        }

        #[test]
        fn target_fires_iff_target_satisfied(
            ops in prop::collection::vec((1u32..=4, any::<bool>()), 0..40),
            target in 1u32..=4,
        ) {
            let mut log = LogRing::with_capacity(8);
            let agg = apply(&ops, &mut log);
            let outcome = agg.evaluate(Some(&ConditionalLogic::target(id(target))), 4, &mut log);
            prop_assert_eq!(outcome == LogicOutcome::Fire, agg.is_satisfied(id(target)));
        }
    }
}
