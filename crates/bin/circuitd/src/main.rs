//! # circuitd — circuit daemon
//!
//! Composition root that wires all adapters together, runs the circuit and
//! serves its HTTP API.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize `tracing`
//! - Construct the port implementations (adapters) and the circuit
//! - Register conditions, logic, constraints and actions from the config
//! - Run the circuit in the background and serve the axum router
//! - Stop the circuit on shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer. No domain logic belongs here.

mod config;

use circuit_adapter_http_axum::state::AppState;
use circuit_adapter_virtual::{EchoExecutor, LocalIdentityIssuer};
use circuit_app::circuit::{Circuit, StartOptions};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Circuit
    let circuit = Circuit::new(EchoExecutor::new(), LocalIdentityIssuer);
    let ids = circuit.set_conditions(config.watchers());
    tracing::info!(conditions = ids.len(), "conditions registered");
    if let Some(logic) = config.logic {
        circuit.set_conditional_logic(logic);
    }
    if let Some(constraints) = config.constraints.clone() {
        circuit.set_execution_constraints(constraints);
    }
    circuit.set_actions(&config.actions)?;

    let runner = circuit.clone();
    let options = StartOptions {
        public_key: config.circuit.public_key.clone(),
        auth_sig: config.circuit.auth_sig.clone(),
        params: config.circuit.params.clone(),
    };
    let run = tokio::spawn(async move { runner.start(options).await });

    // HTTP
    let app = circuit_adapter_http_axum::router::build(AppState::new(circuit.clone()));
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "circuitd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    circuit.stop();
    match run.await? {
        Ok(()) => {
            tracing::info!(counters = ?circuit.counters(), "circuit stopped");
            Ok(())
        }
        Err(err) => {
            tracing::error!(error = ?err, "circuit failed");
            Err(err.into())
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
