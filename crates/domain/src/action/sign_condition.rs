//! Whether a fetched value warrants a signature.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// How a condition joins the running result of the fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Joiner {
    #[serde(rename = "&&", alias = "and")]
    And,
    #[serde(rename = "||", alias = "or")]
    Or,
}

/// Comparison applied between the fetched value and the condition's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "===")]
    StrictEq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "!==")]
    StrictNe,
}

impl Comparison {
    pub const ALL: [Self; 8] = [
        Self::Lt,
        Self::Gt,
        Self::Le,
        Self::Ge,
        Self::Eq,
        Self::StrictEq,
        Self::Ne,
        Self::StrictNe,
    ];

    /// Operator as written in configuration and in the rendered script.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::StrictEq => "===",
            Self::Ne => "!=",
            Self::StrictNe => "!==",
        }
    }

    /// Whether the operator orders its operands rather than testing equality.
    #[must_use]
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Gt | Self::Le | Self::Ge)
    }
}

/// One step of a sign-condition fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignCondition {
    #[serde(rename = "type")]
    pub joiner: Joiner,
    pub operator: Comparison,
    pub value: serde_json::Value,
}

impl SignCondition {
    #[must_use]
    pub fn new(joiner: Joiner, operator: Comparison, value: impl Into<serde_json::Value>) -> Self {
        Self {
            joiner,
            operator,
            value: value.into(),
        }
    }

    /// Whether `actual <operator> self.value` holds.
    ///
    /// Numbers compare numerically, strings lexicographically. Ordering
    /// operators between values of different kinds never hold, and loose and
    /// strict equality are the same typed comparison. The rendered script
    /// evaluates fetch conditions with these rules too.
    #[must_use]
    pub fn holds(&self, actual: &serde_json::Value) -> bool {
        let ordering = compare(actual, &self.value);
        match self.operator {
            Comparison::Lt => ordering == Some(Ordering::Less),
            Comparison::Gt => ordering == Some(Ordering::Greater),
            Comparison::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            Comparison::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            Comparison::Eq | Comparison::StrictEq => ordering == Some(Ordering::Equal),
            Comparison::Ne | Comparison::StrictNe => ordering != Some(Ordering::Equal),
        }
    }
}

fn compare(left: &serde_json::Value, right: &serde_json::Value) -> Option<Ordering> {
    use serde_json::Value;

    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        (l, r) if l == r => Some(Ordering::Equal),
        _ => None,
    }
}

/// Fold `conditions` left-to-right over `value`.
///
/// The accumulator is seeded with `true` when the first condition joins with
/// AND and `false` when it joins with OR; each condition then combines its
/// own result into the accumulator with its joiner. An empty list never signs.
#[must_use]
pub fn evaluate(conditions: &[SignCondition], value: &serde_json::Value) -> bool {
    let Some(first) = conditions.first() else {
        return false;
    };
    let seed = first.joiner == Joiner::And;
    conditions
        .iter()
        .fold(seed, |acc, condition| match condition.joiner {
            Joiner::And => acc && condition.holds(value),
            Joiner::Or => acc || condition.holds(value),
        })
}
