//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the API routes under `/api`. Includes a [`TraceLayer`] that logs
/// each HTTP request/response at the `DEBUG` level using the `tracing`
/// ecosystem.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use circuit_adapter_virtual::{EchoExecutor, LocalIdentityIssuer};
    use circuit_app::circuit::{Circuit, CircuitStatus};
    use circuit_domain::action::{Action, CustomAction};
    use tower::ServiceExt;

    fn test_circuit() -> Circuit {
        let circuit = Circuit::new(EchoExecutor::new(), LocalIdentityIssuer);
        circuit
            .set_actions(&[Action::Custom(CustomAction {
                priority: 1,
                code: "console.log(1);".to_string(),
            })])
            .unwrap();
        circuit
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let app = build(AppState::new(test_circuit()));
        let (status, _) = send(app, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn should_list_logs_filtered_by_category() {
        let circuit = test_circuit();
        // duplicate priority, logged under ERROR
        let _ = circuit.set_actions(&[
            Action::Custom(CustomAction {
                priority: 5,
                code: String::new(),
            }),
            Action::Custom(CustomAction {
                priority: 5,
                code: String::new(),
            }),
        ]);
        let app = build(AppState::new(circuit));

        let (status, body) = send(app.clone(), "GET", "/api/logs?category=ERROR").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["category"], "error");

        let (_, body) = send(app, "GET", "/api/logs?category=response").await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_reject_unknown_log_category() {
        let app = build(AppState::new(test_circuit()));
        let (status, body) = send(app, "GET", "/api/logs?category=debug").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown log category `debug`");
    }

    #[tokio::test]
    async fn should_report_status_with_compiled_units() {
        let app = build(AppState::new(test_circuit()));
        let (status, body) = send(app, "GET", "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "idle");
        assert_eq!(body["counters"]["executed_count"], 0);
        assert_eq!(body["satisfied"], serde_json::json!([]));
        assert_eq!(body["units"], serde_json::json!(["custom1"]));
    }

    #[tokio::test]
    async fn should_accept_stop_request() {
        let circuit = test_circuit();
        let app = build(AppState::new(circuit.clone()));
        let (status, _) = send(app, "POST", "/api/stop").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        // the stop is kept; the circuit halts as soon as it is started
        assert_eq!(circuit.status(), CircuitStatus::Idle);
    }
}
