//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `circuit.toml` in the working directory, or the file named by
//! `CIRCUIT_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.
//!
//! ```toml
//! [server]
//! port = 3000
//!
//! [logic]
//! type = "threshold"
//! value = 1
//! interval_ms = 5000
//!
//! [constraints]
//! max_executions = 10
//!
//! [[conditions]]
//! name = "price-above"
//! pattern = ["idle", "match"]
//!
//! [[actions]]
//! type = "custom"
//! priority = 1
//! code = "Lit.Actions.setResponse({ response: 42 });"
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use circuit_adapter_virtual::{Observation, ScriptedWatcher};
use circuit_app::ports::ConditionWatcher;
use circuit_domain::action::Action;
use circuit_domain::constraint::ExecutionConstraints;
use circuit_domain::logic::{ConditionalLogic, LogicPolicy};

const DEFAULT_CONFIG_PATH: &str = "circuit.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Inputs of the circuit run.
    pub circuit: CircuitConfig,
    /// When the satisfied conditions fire the actions.
    pub logic: Option<ConditionalLogic>,
    /// Bounds on the circuit's runs.
    pub constraints: Option<ExecutionConstraints>,
    /// Virtual conditions, identified 1, 2, … in file order.
    pub conditions: Vec<ConditionConfig>,
    /// Actions compiled into the circuit's script.
    pub actions: Vec<Action>,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Executor inputs of the run.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Existing signing key. A local identity is issued when absent.
    pub public_key: Option<String>,
    pub auth_sig: serde_json::Value,
    /// Extra parameters exposed to the script.
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// One scripted condition.
#[derive(Debug, Deserialize)]
pub struct ConditionConfig {
    pub name: String,
    /// Observations replayed one per cycle, wrapping around.
    #[serde(default)]
    pub pattern: Vec<Observation>,
    /// Delay before each observation reports.
    #[serde(default)]
    pub latency_ms: u64,
}

impl Config {
    /// Load configuration from `circuit.toml` (or `CIRCUIT_CONFIG`, if set)
    /// then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("CIRCUIT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CIRCUIT_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("CIRCUIT_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if let Some(condition) = self.conditions.iter().find(|c| c.name.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "condition with pattern {:?} has an empty name",
                condition.pattern
            )));
        }
        if let Some(LogicPolicy::Target { target }) = self.logic.map(|l| l.policy) {
            let known = usize::try_from(target.get())
                .is_ok_and(|raw| (1..=self.conditions.len()).contains(&raw));
            if !known {
                return Err(ConfigError::Validation(format!(
                    "target condition {target} does not exist ({} conditions configured)",
                    self.conditions.len()
                )));
            }
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Build one watcher per configured condition, in file order.
    #[must_use]
    pub fn watchers(&self) -> Vec<Arc<dyn ConditionWatcher>> {
        self.conditions
            .iter()
            .map(|c| {
                let watcher = ScriptedWatcher::new(&c.name, c.pattern.clone())
                    .with_latency(Duration::from_millis(c.latency_ms));
                Arc::new(watcher) as Arc<dyn ConditionWatcher>
            })
            .collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "circuitd=info,circuit_app=info,circuit_domain=info,tower_http=debug"
                .to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
