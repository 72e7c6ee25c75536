// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quantum state engine.
//!
//! Qubits are handles into a [`QuantumEngine`]. Each assigned qubit belongs
//! to one state group, and groups merge lazily when a multi-qubit operation
//! touches qubits from different groups. Three representations are
//! supported:
//!
//! | Formalism | Storage | Gates | Noise |
//! |-----------|---------|-------|-------|
//! | `ket` | state vector | any unitary | sampled trajectories |
//! | `dm` | density matrix | any unitary | exact channels |
//! | `stab` | stabilizer tableau | Clifford only | Pauli mixtures |
//!
//! Position 0 in a group is the most significant bit of the basis index.

pub mod engine;
pub mod ketstates;
pub mod linalg;
pub mod measure;
pub mod noise;
pub mod operator;
pub mod repr;
pub mod stabilizer;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use engine::{GroupId, QuantumEngine, StateGroup};
pub use linalg::{CMatrix, CVector};
pub use operator::{ops, Operator};
pub use repr::{Formalism, QRepr};
pub use stabilizer::{CliffordGate, Pauli, PauliString, StabilizerTableau};

/// Handle to a qubit owned by a [`QuantumEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub usize);

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}
