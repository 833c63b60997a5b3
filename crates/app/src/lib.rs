//! # circuit-app
//!
//! Application layer for circuit.
//!
//! ## Responsibilities
//! - Define **ports** (traits) for every IO boundary: condition watchers, the
//!   remote script executor, and the signing-identity issuer
//! - Run circuits: the [`circuit::Circuit`] controller wires watchers into the
//!   condition aggregator, fires the compiled script through the executor and
//!   gates further runs with the execution constraints
//!
//! ## Dependency rule
//! Depends only on `circuit-domain`. Never imports adapter crates.
//! Adapters depend on *this* crate (to implement ports), not the other way around.

pub mod circuit;
pub mod ports;
pub mod stop_signal;
