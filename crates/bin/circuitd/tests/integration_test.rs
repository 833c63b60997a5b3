//! End-to-end smoke tests for the full circuitd stack.
//!
//! Each test wires a complete circuit (virtual watchers, echo executor, local
//! identity issuer, real controller, real axum router) and exercises the HTTP
//! layer via `tower::ServiceExt::oneshot`. No TCP port is bound.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use circuit_adapter_http_axum::router;
use circuit_adapter_http_axum::state::AppState;
use circuit_adapter_virtual::{EchoExecutor, LocalIdentityIssuer, Observation, ScriptedWatcher};
use circuit_app::circuit::{Circuit, CircuitStatus, StartOptions};
use circuit_app::ports::ConditionWatcher;
use circuit_domain::action::{Action, CustomAction};
use circuit_domain::constraint::ExecutionConstraints;
use circuit_domain::logic::ConditionalLogic;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Build a circuit firing on every cycle, bounded to `max_executions` runs.
fn circuit(max_executions: u64) -> Circuit {
    let circuit = Circuit::new(EchoExecutor::new(), LocalIdentityIssuer);
    let always: Arc<dyn ConditionWatcher> =
        Arc::new(ScriptedWatcher::new("always", vec![Observation::Match]));
    let flaky: Arc<dyn ConditionWatcher> = Arc::new(ScriptedWatcher::new(
        "flaky",
        vec![Observation::Match, Observation::Fail],
    ));
    circuit.set_conditions(vec![always, flaky]);
    circuit.set_conditional_logic(ConditionalLogic::threshold(1));
    circuit.set_execution_constraints(ExecutionConstraints {
        max_executions: Some(max_executions),
        ..ExecutionConstraints::default()
    });
    circuit
        .set_actions(&[Action::Custom(CustomAction {
            priority: 1,
            code: "Lit.Actions.setResponse({ response: 42 });".to_string(),
        })])
        .unwrap();
    circuit
}

async fn get_json(circuit: &Circuit, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = router::build(AppState::new(circuit.clone()))
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let resp = router::build(AppState::new(circuit(1)))
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_report_halted_status_when_constraints_exhausted() {
    let circuit = circuit(2);
    circuit.start(StartOptions::default()).await.unwrap();

    let (status, body) = get_json(&circuit, "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "halted");
    assert_eq!(body["counters"]["executed_count"], 2);
    assert_eq!(body["counters"]["successful_completion_count"], 2);
    assert_eq!(body["units"], serde_json::json!(["custom1"]));
}

#[tokio::test]
async fn should_expose_run_responses_in_log() {
    let circuit = circuit(2);
    circuit.start(StartOptions::default()).await.unwrap();

    let (status, body) = get_json(&circuit, "/api/logs?category=response").await;

    assert_eq!(status, StatusCode::OK);
    let runs = body
        .as_array()
        .unwrap()
        .iter()
        .filter(|entry| entry["message"] == "action run completed")
        .count();
    assert_eq!(runs, 2);
}

#[tokio::test]
async fn should_expose_watcher_failures_in_error_log() {
    let circuit = circuit(2);
    circuit.start(StartOptions::default()).await.unwrap();

    let (_, body) = get_json(&circuit, "/api/logs?category=error").await;

    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(
        entries[0]["message"]
            .as_str()
            .unwrap()
            .contains("flaky failed to observe")
    );
}

#[tokio::test]
async fn should_stop_running_circuit_when_stop_posted() {
    let circuit = Circuit::new(EchoExecutor::new(), LocalIdentityIssuer);
    let idle: Arc<dyn ConditionWatcher> = Arc::new(ScriptedWatcher::new("idle", Vec::new()));
    circuit.set_conditions(vec![idle]);
    circuit.set_conditional_logic(
        ConditionalLogic::every().with_interval(std::time::Duration::from_millis(10)),
    );
    circuit
        .set_actions(&[Action::Custom(CustomAction {
            priority: 1,
            code: "console.log(1);".to_string(),
        })])
        .unwrap();

    let runner = circuit.clone();
    let run = tokio::spawn(async move { runner.start(StartOptions::default()).await });
    while circuit.status() != CircuitStatus::Running {
        tokio::task::yield_now().await;
    }

    let resp = router::build(AppState::new(circuit.clone()))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/stop")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert!(run.await.unwrap().is_ok());
    let (_, body) = get_json(&circuit, "/api/status").await;
    assert_eq!(body["status"], "halted");
}
