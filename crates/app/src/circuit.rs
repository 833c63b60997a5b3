//! Circuit controller: watches conditions, fires the action script, and
//! stops when its execution constraints are exhausted.
//!
//! A [`Circuit`] runs in cycles. Each cycle asks every condition watcher to
//! observe once, concurrently, with match/unmatch callbacks wired into the
//! [`ConditionAggregator`]. Whenever the conditional logic evaluates to FIRE,
//! the compiled [`Script`] is handed to the [`ScriptExecutor`] and the
//! [`ConstraintGate`] decides whether the circuit may keep running. At most
//! one action run happens per cycle, whether it is triggered by a callback or
//! by the evaluation at the end of the cycle.
//!
//! All shared state sits behind one mutex that is never held across an
//! `.await`, so every mutation between two suspension points is atomic.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

use circuit_domain::action::Action;
use circuit_domain::constraint::{ConstraintGate, ExecutionConstraints, RunCounters, RunVerdict};
use circuit_domain::error::{CircuitError, ConfigurationError, ExecutionError};
use circuit_domain::id::ConditionId;
use circuit_domain::log::{LogCategory, LogEntry, LogRing};
use circuit_domain::logic::{ConditionAggregator, ConditionalLogic, LogicOutcome};
use circuit_domain::script::{self, Script};
use circuit_domain::time;

use crate::ports::identity::validate_public_key;
use crate::ports::{
    ConditionCallbacks, ConditionWatcher, ExecutionRequest, IdentityIssuer, ScriptExecutor,
};
use crate::stop_signal::StopSignal;

/// Lifecycle of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitStatus {
    /// Conditions or actions are still missing.
    Idle,
    /// Conditions and actions are registered; `start` has not been called.
    Armed,
    Running,
    /// Stopped by request, by constraint exhaustion, or by a failed run.
    /// Terminal: a halted circuit cannot be started again.
    Halted,
}

/// Per-run inputs of [`Circuit::start`].
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Signing key to use. When absent, one is issued for the compiled script.
    pub public_key: Option<String>,
    /// Authentication signature forwarded to the executor.
    pub auth_sig: serde_json::Value,
    /// Extra parameters exposed to the script.
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Executor inputs fixed for the duration of a run.
#[derive(Debug, Clone)]
struct Session {
    public_key: String,
    auth_sig: serde_json::Value,
    params: serde_json::Map<String, serde_json::Value>,
}

/// Everything a circuit mutates, guarded by one mutex.
struct CircuitState {
    watchers: Vec<Arc<dyn ConditionWatcher>>,
    logic: Option<ConditionalLogic>,
    gate: ConstraintGate,
    script: Arc<Script>,
    aggregator: ConditionAggregator,
    counters: RunCounters,
    log: LogRing,
    status: CircuitStatus,
    session: Option<Session>,
    /// An action run was already decided in the current cycle.
    fired_this_cycle: bool,
    /// First fatal failure of a run, surfaced by `start`.
    failure: Option<CircuitError>,
}

impl CircuitState {
    fn refresh_status(&mut self) {
        if matches!(self.status, CircuitStatus::Idle | CircuitStatus::Armed) {
            self.status = if self.watchers.is_empty() || self.script.is_empty() {
                CircuitStatus::Idle
            } else {
                CircuitStatus::Armed
            };
        }
    }

    /// Decide whether to fire now, claiming the cycle's single run if so.
    fn claim_fire(&mut self) -> bool {
        let total = self.watchers.len();
        let outcome = self
            .aggregator
            .evaluate(self.logic.as_ref(), total, &mut self.log);
        if outcome != LogicOutcome::Fire || self.fired_this_cycle {
            return false;
        }
        self.fired_this_cycle = true;
        self.counters.executed_count += 1;
        true
    }
}

struct Shared {
    state: Mutex<CircuitState>,
    executor: Arc<dyn ScriptExecutor>,
    issuer: Arc<dyn IdentityIssuer>,
    stop: StopSignal,
}

/// An event-condition-action circuit.
///
/// Cloning yields another handle to the same circuit, so one clone can run
/// [`start`](Self::start) while others read logs or call [`stop`](Self::stop).
#[derive(Clone)]
pub struct Circuit {
    shared: Arc<Shared>,
}

impl Circuit {
    /// Create an idle circuit using `executor` to run scripts and `issuer`
    /// to obtain signing identities.
    #[must_use]
    pub fn new(
        executor: impl ScriptExecutor + 'static,
        issuer: impl IdentityIssuer + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(CircuitState {
                    watchers: Vec::new(),
                    logic: None,
                    gate: ConstraintGate::unbounded(),
                    script: Arc::new(Script::default()),
                    aggregator: ConditionAggregator::new(),
                    counters: RunCounters::default(),
                    log: LogRing::new(),
                    status: CircuitStatus::Idle,
                    session: None,
                    fired_this_cycle: false,
                    failure: None,
                }),
                executor: Arc::new(executor),
                issuer: Arc::new(issuer),
                stop: StopSignal::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CircuitState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the conditions to watch, replacing any previous set.
    ///
    /// Returns the identifiers assigned to them, 1-based in the given order.
    /// Satisfaction recorded for the previous set is forgotten.
    pub fn set_conditions(&self, watchers: Vec<Arc<dyn ConditionWatcher>>) -> Vec<ConditionId> {
        let mut state = self.state();
        let ids = (0..watchers.len()).map(ConditionId::from_index).collect();
        for (index, watcher) in watchers.iter().enumerate() {
            tracing::debug!(
                condition_id = %ConditionId::from_index(index),
                watcher = %watcher.describe(),
                "condition registered"
            );
        }
        state.watchers = watchers;
        state.aggregator = ConditionAggregator::new();
        state.refresh_status();
        ids
    }

    /// Set the policy deciding when the satisfied conditions fire the actions.
    pub fn set_conditional_logic(&self, logic: ConditionalLogic) {
        self.state().logic = Some(logic);
    }

    /// Bound how often and for how long the circuit may fire.
    pub fn set_execution_constraints(&self, constraints: ExecutionConstraints) {
        self.state().gate = ConstraintGate::new(constraints);
    }

    /// Register actions and compile them into the circuit's script.
    ///
    /// Registration is additive, also while the circuit runs: actions
    /// registered earlier stay in the script and an action identical to an
    /// already registered one is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CircuitError::Configuration`] for duplicate priorities or an
    /// invalid contract action. The script is left unchanged in that case.
    #[tracing::instrument(skip_all, fields(count = actions.len()))]
    pub fn set_actions(&self, actions: &[Action]) -> Result<(), CircuitError> {
        let mut state = self.state();
        match script::compile(&state.script, actions) {
            Ok(compiled) => {
                tracing::debug!(added = ?compiled.added, "action script compiled");
                state.script = Arc::new(compiled.script);
                state.refresh_status();
                Ok(())
            }
            Err(err) => {
                state.log.append(
                    LogCategory::Error,
                    format!("action compilation failed: {err}"),
                    &json!({ "phase": "compile actions", "error": err.to_string() }),
                );
                Err(err.into())
            }
        }
    }

    /// Ask the circuit to stop after in-flight work completes.
    ///
    /// Stopping is final: a circuit stopped before it starts halts as soon as
    /// [`start`](Self::start) is called, without running a cycle.
    pub fn stop(&self) {
        self.shared.stop.raise();
    }

    #[must_use]
    pub fn status(&self) -> CircuitStatus {
        self.state().status
    }

    #[must_use]
    pub fn counters(&self) -> RunCounters {
        self.state().counters
    }

    /// Conditions currently counted as satisfied.
    #[must_use]
    pub fn satisfied_conditions(&self) -> Vec<ConditionId> {
        self.state().aggregator.satisfied().collect()
    }

    /// The compiled script, as it would be sent on the next run.
    #[must_use]
    pub fn script(&self) -> Arc<Script> {
        Arc::clone(&self.state().script)
    }

    /// Log entries oldest-to-newest, optionally restricted to one category.
    #[must_use]
    pub fn logs(&self, category: Option<LogCategory>) -> Vec<LogEntry> {
        self.state().log.read(category)
    }

    /// Run the circuit until it is stopped.
    ///
    /// Resolves with `Ok(())` when stopped by [`stop`](Self::stop) or when
    /// the execution constraints are exhausted, including when either
    /// already holds at the time of the call. A circuit runs at most once.
    ///
    /// # Errors
    ///
    /// - [`CircuitError::Configuration`] when no condition or no action is
    ///   registered, the circuit already runs or has halted, or the public
    ///   key is malformed
    /// - [`CircuitError::Identity`] when no key was given and issuing one fails
    /// - [`CircuitError::Execution`] when an action run fails; the circuit
    ///   halts without retrying
    #[tracing::instrument(skip_all)]
    pub async fn start(&self, options: StartOptions) -> Result<(), CircuitError> {
        let Some(script) = self.begin()? else {
            tracing::info!("circuit halted before running");
            return Ok(());
        };

        let session = match self.open_session(&script, options).await {
            Ok(session) => session,
            Err(err) => {
                self.halt();
                return Err(err);
            }
        };
        self.state().session = Some(session);
        tracing::info!("circuit running");

        let result = self.run_loop().await;
        self.halt();
        tracing::info!(ok = result.is_ok(), "circuit halted");
        result
    }

    /// Validate registration and move to RUNNING.
    ///
    /// Returns `None`, with the circuit HALTED, when a stop was requested or
    /// the execution constraints are exhausted before the first cycle.
    fn begin(&self) -> Result<Option<Arc<Script>>, CircuitError> {
        let mut state = self.state();
        let problem = if state.watchers.is_empty() {
            Some(ConfigurationError::NoConditions)
        } else if state.script.is_empty() {
            Some(ConfigurationError::NoActions)
        } else if state.status == CircuitStatus::Running {
            Some(ConfigurationError::AlreadyRunning)
        } else if state.status == CircuitStatus::Halted {
            Some(ConfigurationError::Halted)
        } else {
            None
        };
        if let Some(err) = problem {
            state.log.append(
                LogCategory::Error,
                format!("cannot start circuit: {err}"),
                &json!({ "phase": "start", "error": err.to_string() }),
            );
            return Err(err.into());
        }

        let counters = state.counters;
        if self.shared.stop.is_raised() {
            state.log.append(
                LogCategory::Condition,
                "stop requested before start, circuit halted",
                &json!({ "counters": counters }),
            );
            state.status = CircuitStatus::Halted;
            return Ok(None);
        }
        let now = time::now();
        if state.gate.check_at(&counters, now) == RunVerdict::ExitRun {
            let bound = state.gate.exhausted_bound(&counters, now);
            state.log.append(
                LogCategory::Condition,
                "execution constraints exhausted before start, circuit halted",
                &json!({ "bound": bound, "counters": counters }),
            );
            state.status = CircuitStatus::Halted;
            return Ok(None);
        }

        state.status = CircuitStatus::Running;
        Ok(Some(Arc::clone(&state.script)))
    }

    fn halt(&self) {
        self.state().status = CircuitStatus::Halted;
    }

    async fn open_session(
        &self,
        script: &Script,
        options: StartOptions,
    ) -> Result<Session, CircuitError> {
        let public_key = match options.public_key {
            Some(key) => key,
            None => {
                let content_hash = script.content_hash();
                match self.shared.issuer.issue(&content_hash).await {
                    Ok(identity) => {
                        self.state().log.append(
                            LogCategory::Response,
                            "signing identity issued",
                            &json!(identity),
                        );
                        identity.public_key
                    }
                    Err(err) => {
                        self.state().log.append(
                            LogCategory::Error,
                            format!("cannot start circuit: {err}"),
                            &json!({ "phase": "issue identity", "content_hash": content_hash }),
                        );
                        return Err(err.into());
                    }
                }
            }
        };

        if let Err(err) = validate_public_key(&public_key) {
            self.state().log.append(
                LogCategory::Error,
                format!("cannot start circuit: {err}"),
                &json!({ "phase": "validate public key" }),
            );
            return Err(err.into());
        }

        Ok(Session {
            public_key,
            auth_sig: options.auth_sig,
            params: options.params,
        })
    }

    async fn run_loop(&self) -> Result<(), CircuitError> {
        let stop = &self.shared.stop;
        while !stop.is_raised() {
            self.run_cycle().await;

            let failure = self.state().failure.take();
            if let Some(err) = failure {
                return Err(err);
            }
            if stop.is_raised() {
                break;
            }

            let interval = self.state().logic.and_then(|l| l.interval);
            if let Some(interval) = interval {
                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    () = stop.raised() => {}
                }
            } else {
                // Let other tasks observe state between back-to-back cycles.
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }

    /// Observe every condition once, then evaluate the logic for the cycle.
    async fn run_cycle(&self) {
        let (watchers, interval) = {
            let mut state = self.state();
            state.fired_this_cycle = false;
            (
                state.watchers.clone(),
                state.logic.and_then(|l| l.interval),
            )
        };

        let (fire_tx, mut fire_rx) = mpsc::unbounded_channel::<()>();

        let observations: Vec<_> = watchers
            .iter()
            .enumerate()
            .map(|(index, watcher)| {
                let sink = ConditionSink {
                    id: ConditionId::from_index(index),
                    circuit: self,
                    fire_tx: fire_tx.clone(),
                };
                async move { self.observe(watcher.as_ref(), &sink, interval).await }
            })
            .collect();
        drop(fire_tx);

        // A stop abandons pending observations. Dropping them drops their
        // senders, so the worker still drains every run already requested.
        let observing = async {
            tokio::select! {
                _ = future::join_all(observations) => {}
                () = self.shared.stop.raised() => {}
            }
        };
        // Runs requested by callbacks execute here, outside the watchers'
        // futures, so a watcher timing out never cancels an executor call.
        let fire_worker = async {
            while fire_rx.recv().await.is_some() {
                self.run_actions().await;
            }
        };
        future::join(observing, fire_worker).await;

        // Failed runs raise the stop signal too.
        if self.shared.stop.is_raised() {
            return;
        }
        let fire = self.state().claim_fire();
        if fire {
            self.run_actions().await;
        }
    }

    /// Run one observation, bounded by the logic interval when there is one.
    async fn observe(
        &self,
        watcher: &dyn ConditionWatcher,
        sink: &ConditionSink<'_>,
        interval: Option<Duration>,
    ) {
        let observation = watcher.observe(sink);
        let outcome = match interval {
            Some(limit) => match tokio::time::timeout(limit, observation).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                    self.state().log.append(
                        LogCategory::Condition,
                        format!("condition {} observation timed out", sink.id),
                        &json!({ "condition_id": sink.id, "timeout_ms": timeout_ms }),
                    );
                    return;
                }
            },
            None => observation.await,
        };
        if let Err(err) = outcome {
            self.state().log.append(
                LogCategory::Error,
                format!("condition {} observation failed: {err}", sink.id),
                &json!({
                    "phase": "observe condition",
                    "condition_id": sink.id,
                    "watcher": watcher.describe(),
                    "error": err.to_string(),
                }),
            );
        }
    }

    /// Execute the compiled script once and apply the execution constraints.
    async fn run_actions(&self) {
        let request = {
            let state = self.state();
            let Some(session) = state.session.clone() else {
                return;
            };
            let script = Arc::clone(&state.script);
            let mut params = script.params();
            params.extend(session.params);
            params.insert(
                "publicKey".to_string(),
                serde_json::Value::String(session.public_key),
            );
            ExecutionRequest {
                code: script.render(),
                content_hash: script.content_hash(),
                auth_sig: session.auth_sig,
                params,
            }
        };

        let content_hash = request.content_hash.clone();
        let outcome = self.shared.executor.execute(request).await;

        let mut state = self.state();
        match outcome {
            Ok(response) => {
                state.counters.successful_completion_count += 1;
                state.log.append(
                    LogCategory::Response,
                    "action run completed",
                    &json!({ "content_hash": content_hash, "response": response }),
                );
            }
            Err(err) => {
                state.log.append(
                    LogCategory::Error,
                    format!("action run failed: {err}"),
                    &json!({ "phase": "execute script", "content_hash": content_hash }),
                );
                if state.failure.is_none() {
                    state.failure = Some(CircuitError::Execution(ExecutionError {
                        phase: "execute script",
                        message: err.to_string(),
                    }));
                }
                self.shared.stop.raise();
                return;
            }
        }

        let counters = state.counters;
        let now = time::now();
        if state.gate.check_at(&counters, now) == RunVerdict::ExitRun {
            let bound = state.gate.exhausted_bound(&counters, now);
            state.log.append(
                LogCategory::Condition,
                "execution constraints exhausted, stopping circuit",
                &json!({ "bound": bound, "counters": counters }),
            );
            self.shared.stop.raise();
        }
    }
}

/// Callbacks installed on one condition for one cycle.
struct ConditionSink<'a> {
    id: ConditionId,
    circuit: &'a Circuit,
    fire_tx: mpsc::UnboundedSender<()>,
}

impl ConditionSink<'_> {
    fn request_fire_if_due(&self, state: &mut CircuitState) {
        if state.claim_fire() {
            // The receiver outlives every sink of the cycle.
            let _ = self.fire_tx.send(());
        }
    }
}

#[async_trait]
impl ConditionCallbacks for ConditionSink<'_> {
    async fn on_matched(&self) {
        let mut state = self.circuit.state();
        let CircuitState {
            aggregator, log, ..
        } = &mut *state;
        aggregator.record_match(self.id, log);
        self.request_fire_if_due(&mut state);
    }

    async fn on_unmatched(&self) {
        let mut state = self.circuit.state();
        let CircuitState {
            aggregator, log, ..
        } = &mut *state;
        aggregator.record_unmatch(self.id, log);
        self.request_fire_if_due(&mut state);
    }
}
