//! Script executor port — runs a compiled script remotely.

use async_trait::async_trait;
use serde::Serialize;

/// Everything the executor needs to run one action script.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRequest {
    /// Rendered script text.
    pub code: String,
    /// SHA-256 of `code`, for executors that run content-addressed scripts.
    pub content_hash: String,
    /// Authentication signature, opaque to the circuit.
    pub auth_sig: serde_json::Value,
    /// Parameters exposed to the script (`publicKey`, API keys, …).
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Runs compiled scripts on the remote execution environment.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Execute `request` and return the script's JSON output.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutorError`] when the remote execution fails.
    async fn execute(&self, request: ExecutionRequest) -> Result<serde_json::Value, ExecutorError>;
}

/// Failure reported by a [`ScriptExecutor`].
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The executor could not be reached.
    #[error("executor unavailable: {0}")]
    Unavailable(String),

    /// The script ran and failed.
    #[error("script failed: {0}")]
    Script(String),
}
