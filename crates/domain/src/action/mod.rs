//! The work a circuit performs when its logic fires.
//!
//! Every action carries a `priority`. Priorities are unique across a circuit
//! and order the generated script: lower priorities are emitted first.

pub mod sign_condition;

pub use sign_condition::{Comparison, Joiner, SignCondition};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of an [`Action`], also the prefix of its script unit name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Custom,
    Fetch,
    Contract,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom => f.write_str("custom"),
            Self::Fetch => f.write_str("fetch"),
            Self::Contract => f.write_str("contract"),
        }
    }
}

/// Arbitrary script code run as-is by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAction {
    pub priority: u32,
    /// Body of the unit. Calls reporting a result are redirected into the
    /// shared result map.
    pub code: String,
}

/// An HTTP read whose extracted value may additionally be signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchAction {
    pub priority: u32,
    pub base_url: String,
    pub endpoint: String,
    /// Dotted path of the value inside the JSON response, e.g. `"data.price"`.
    pub response_path: String,
    /// Sent as a bearer token when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub sign_condition: Vec<SignCondition>,
    /// Bytes handed to the signing primitive when the sign condition holds.
    #[serde(default)]
    pub to_sign: Vec<u8>,
}

impl FetchAction {
    /// Full URL of the request.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

/// A contract call signed as an EIP-1559 transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractAction {
    pub priority: u32,
    pub contract_address: String,
    /// JSON ABI of the contract (array of fragments).
    pub abi: serde_json::Value,
    pub function_name: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    /// Chain identifier from the registry, e.g. `"ethereum"`.
    pub chain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
}

/// A unit of work run when the circuit fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Custom(CustomAction),
    Fetch(FetchAction),
    Contract(ContractAction),
}

impl Action {
    #[must_use]
    pub fn priority(&self) -> u32 {
        match self {
            Self::Custom(a) => a.priority,
            Self::Fetch(a) => a.priority,
            Self::Contract(a) => a.priority,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Custom(_) => ActionKind::Custom,
            Self::Fetch(_) => ActionKind::Fetch,
            Self::Contract(_) => ActionKind::Contract,
        }
    }

    /// Name of the script unit generated for this action, e.g. `fetch2`.
    #[must_use]
    pub fn unit_name(&self) -> String {
        format!("{}{}", self.kind(), self.priority())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(a) => write!(f, "custom(priority {})", a.priority),
            Self::Fetch(a) => write!(f, "fetch({}, priority {})", a.url(), a.priority),
            Self::Contract(a) => write!(
                f,
                "contract({}.{} on {}, priority {})",
                a.contract_address, a.function_name, a.chain, a.priority
            ),
        }
    }
}
