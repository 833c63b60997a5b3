//! Echo executor, standing in for the remote script runtime.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::json;

use circuit_app::ports::{ExecutionRequest, ExecutorError, ScriptExecutor};
use circuit_domain::script::API_KEYS_PARAM;

/// Executes nothing and answers with what it was asked to run.
///
/// The response carries the script's content hash, its size, the run number
/// and the parameter names it received. Parameter values are never echoed,
/// since they may hold API keys.
#[derive(Debug, Default)]
pub struct EchoExecutor {
    runs: AtomicU64,
    fail_from_run: Option<u64>,
}

impl EchoExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every run from the `run`-th (1-based) onwards.
    #[must_use]
    pub fn failing_from(run: u64) -> Self {
        Self {
            runs: AtomicU64::new(0),
            fail_from_run: Some(run),
        }
    }

    /// Number of runs requested so far.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ScriptExecutor for EchoExecutor {
    #[tracing::instrument(skip_all, fields(content_hash = %request.content_hash))]
    async fn execute(&self, request: ExecutionRequest) -> Result<serde_json::Value, ExecutorError> {
        let run = self.runs.fetch_add(1, Ordering::Relaxed) + 1;

        if request.code.is_empty() {
            return Err(ExecutorError::Script("empty script".to_string()));
        }
        if self.fail_from_run.is_some_and(|from| run >= from) {
            tracing::warn!(run, "virtual executor failing on purpose");
            return Err(ExecutorError::Unavailable(format!(
                "virtual executor refused run {run}"
            )));
        }

        let params: Vec<&str> = request.params.keys().map(String::as_str).collect();
        tracing::debug!(run, ?params, "virtual script executed");
        Ok(json!({
            "run": run,
            "contentHash": request.content_hash,
            "codeLength": request.code.len(),
            "params": params,
            "authenticated": request.params.contains_key(API_KEYS_PARAM),
        }))
    }
}
