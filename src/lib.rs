// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS Network Simulator core
//!
//! A discrete-event simulation core for quantum networks: a deterministic
//! scheduler, a quantum state engine that keeps entangled qubits in shared
//! state groups, and a component/port model for channels, memories and
//! nodes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Simulation                 │
//! │      (context, run loop, seeded RNG)     │
//! ├─────────────────────────────────────────┤
//! │     Component / Port network model       │
//! │  (channels, memories, nodes, models)     │
//! ├──────────────────┬──────────────────────┤
//! │   Event Engine   │  Quantum State Engine │
//! │  (queue, clock,  │  (ket / dm / stab     │
//! │   expressions)   │   state groups)       │
//! └──────────────────┴──────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`events`]: Scheduler, event types and event expressions
//! - [`qubits`]: Quantum state engine
//! - [`components`]: Components, ports, channels, memories and models
//! - [`simulation`]: The simulation context and run loop
//! - [`error`]: Error types

pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod qubits;
pub mod simulation;

pub use config::Config;
pub use error::{Error, Result};
pub use simulation::Simulation;

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
