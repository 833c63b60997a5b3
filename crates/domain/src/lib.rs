//! # circuit-domain
//!
//! Pure domain model for the circuit automation system.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define the **Log Ring** (fixed-capacity record of everything a circuit does)
//! - Define **Conditional logic** and the aggregator that turns match/unmatch
//!   notifications into a fire decision
//! - Define **Execution constraints** (count and date bounds on firing)
//! - Define **Actions** (custom code, authenticated fetch, contract call)
//! - Normalize contract calls into unsigned transactions (chain registry, ABI encoding)
//! - Compile actions into a single executable **Script**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod constraint;
pub mod log;
pub mod logic;
pub mod script;
pub mod transaction;
