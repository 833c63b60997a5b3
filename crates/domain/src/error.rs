//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`CircuitError`]
//! via `#[from]`.

/// Top-level error for every fallible circuit operation.
#[derive(Debug, thiserror::Error)]
pub enum CircuitError {
    /// The circuit was configured in a way that can never run.
    #[error("configuration error")]
    Configuration(#[from] ConfigurationError),

    /// The remote executor failed while running the compiled script.
    #[error("action run failed")]
    Execution(#[from] ExecutionError),

    /// Issuing or resolving the signing identity failed.
    #[error("signing identity unavailable")]
    Identity(#[from] IdentityError),
}

/// Invalid circuit configuration. Always fatal, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// `start` was called before any condition was registered.
    #[error("no conditions have been set")]
    NoConditions,

    /// `start` was called before any action was registered.
    #[error("no actions have been set")]
    NoActions,

    /// Two actions share the same priority.
    #[error("duplicate action priority {priority}")]
    DuplicatePriority { priority: u32 },

    /// THRESHOLD logic without a value, or TARGET logic without a target.
    #[error("conditional logic {logic} is missing its {field}")]
    IncompleteLogic {
        logic: &'static str,
        field: &'static str,
    },

    /// The chain identifier of a contract action is not in the registry.
    #[error("invalid chain `{chain}`, valid chains are: {}", valid.join(", "))]
    UnknownChain { chain: String, valid: Vec<String> },

    /// A contract address is not `0x` followed by 40 hex digits.
    #[error("invalid contract address `{0}`")]
    InvalidAddress(String),

    /// The ABI does not declare the requested function, or is malformed.
    #[error("invalid ABI for function `{function}`: {reason}")]
    InvalidAbi { function: String, reason: String },

    /// A call argument could not be encoded as its declared ABI type.
    #[error("cannot encode argument {index} as `{kind}`: {reason}")]
    InvalidArgument {
        index: usize,
        kind: String,
        reason: String,
    },

    /// The signing public key is not an uncompressed, `0x04`-prefixed key.
    #[error("malformed signing public key `{0}`")]
    MalformedPublicKey(String),

    /// `start` was called on a circuit that is already running.
    #[error("circuit is already running")]
    AlreadyRunning,

    /// `start` was called on a circuit that has already halted.
    #[error("circuit has halted and cannot be restarted")]
    Halted,
}

/// Failure reported by the remote script executor.
#[derive(Debug, thiserror::Error)]
#[error("{phase}: {message}")]
pub struct ExecutionError {
    /// Which stage of the run failed, e.g. `"execute script"`.
    pub phase: &'static str,
    pub message: String,
}

/// Failure reported by the identity issuer.
#[derive(Debug, thiserror::Error)]
#[error("identity issuance failed: {0}")]
pub struct IdentityError(pub String);
