// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! State-group representations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::linalg::{self, CMatrix, CVector, ATOL};
use super::stabilizer::StabilizerTableau;
use crate::error::QStateError;

/// Numeric representation used for a state group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Formalism {
    /// Pure state vector
    #[default]
    #[serde(rename = "ket")]
    Ket,
    /// Density matrix
    #[serde(rename = "dm")]
    DensityMatrix,
    /// Stabilizer tableau (Clifford only)
    #[serde(rename = "stab")]
    Stabilizer,
}

impl fmt::Display for Formalism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Formalism::Ket => "ket",
            Formalism::DensityMatrix => "dm",
            Formalism::Stabilizer => "stab",
        })
    }
}

impl FromStr for Formalism {
    type Err = QStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ket" => Ok(Formalism::Ket),
            "dm" | "density_matrix" => Ok(Formalism::DensityMatrix),
            "stab" | "stabilizer" => Ok(Formalism::Stabilizer),
            other => Err(QStateError::UnsupportedOperation(format!(
                "unknown formalism '{}'",
                other
            ))),
        }
    }
}

/// The state of one group, in one of the formalisms.
#[derive(Debug, Clone, PartialEq)]
pub enum QRepr {
    Ket(CVector),
    DensityMatrix(CMatrix),
    Stabilizer(StabilizerTableau),
}

impl QRepr {
    /// Ground state |0…0⟩ of `n` qubits.
    pub fn ground(formalism: Formalism, n: usize) -> Self {
        let dim = 1usize << n;
        match formalism {
            Formalism::Ket => {
                let mut v = CVector::zeros(dim);
                v[0] = num_complex::Complex64::new(1.0, 0.0);
                QRepr::Ket(v)
            }
            Formalism::DensityMatrix => {
                let mut m = CMatrix::zeros((dim, dim));
                m[[0, 0]] = num_complex::Complex64::new(1.0, 0.0);
                QRepr::DensityMatrix(m)
            }
            Formalism::Stabilizer => QRepr::Stabilizer(StabilizerTableau::new(n)),
        }
    }

    /// Parse stabilizer generators, e.g. `["+XX", "+ZZ"]`.
    pub fn stabilizers(generators: &[&str]) -> Result<Self, QStateError> {
        Ok(QRepr::Stabilizer(StabilizerTableau::parse(generators)?))
    }

    pub fn formalism(&self) -> Formalism {
        match self {
            QRepr::Ket(_) => Formalism::Ket,
            QRepr::DensityMatrix(_) => Formalism::DensityMatrix,
            QRepr::Stabilizer(_) => Formalism::Stabilizer,
        }
    }

    /// Number of qubits implied by the representation, if its shape is
    /// consistent.
    pub fn num_qubits(&self) -> Option<usize> {
        let from_dim = |d: usize| d.is_power_of_two().then(|| d.trailing_zeros() as usize);
        match self {
            QRepr::Ket(v) => from_dim(v.len()),
            QRepr::DensityMatrix(m) if m.is_square() => from_dim(m.nrows()),
            QRepr::DensityMatrix(_) => None,
            QRepr::Stabilizer(t) => Some(t.num_qubits()),
        }
    }

    /// Density matrix of the whole group.
    pub fn to_dm(&self) -> CMatrix {
        match self {
            QRepr::Ket(v) => linalg::ket_to_dm(v),
            QRepr::DensityMatrix(m) => m.clone(),
            QRepr::Stabilizer(t) => t.to_dm(),
        }
    }

    /// Check the representation describes an `n`-qubit state and normalize
    /// it.
    pub(crate) fn validated(self, n: usize) -> Result<Self, QStateError> {
        let expected_dim = 1usize << n;
        match self {
            QRepr::Ket(v) => {
                if v.len() != expected_dim {
                    return Err(QStateError::DimensionMismatch {
                        expected: expected_dim,
                        actual: v.len(),
                    });
                }
                let norm = linalg::norm(&v);
                if norm < ATOL || !norm.is_finite() {
                    return Err(QStateError::InvalidState(
                        "state vector has zero norm".into(),
                    ));
                }
                Ok(QRepr::Ket(v.mapv(|z| z / norm)))
            }
            QRepr::DensityMatrix(m) => {
                if m.dim() != (expected_dim, expected_dim) {
                    return Err(QStateError::DimensionMismatch {
                        expected: expected_dim,
                        actual: m.nrows(),
                    });
                }
                if !linalg::is_hermitian(&m, 1e-8) {
                    return Err(QStateError::InvalidState(
                        "density matrix is not Hermitian".into(),
                    ));
                }
                if m.diag().iter().any(|z| z.re < -1e-8) {
                    return Err(QStateError::InvalidState(
                        "density matrix has negative populations".into(),
                    ));
                }
                let tr = linalg::trace(&m).re;
                if tr < ATOL {
                    return Err(QStateError::InvalidState(
                        "density matrix has zero trace".into(),
                    ));
                }
                Ok(QRepr::DensityMatrix(m.mapv(|z| z / tr)))
            }
            QRepr::Stabilizer(t) => {
                if t.num_qubits() != n {
                    return Err(QStateError::DimensionMismatch {
                        expected: n,
                        actual: t.num_qubits(),
                    });
                }
                Ok(QRepr::Stabilizer(t))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qubits::ketstates;
    use approx::assert_relative_eq;

    #[test]
    fn test_formalism_parse_and_display() {
        assert_eq!("ket".parse::<Formalism>().unwrap(), Formalism::Ket);
        assert_eq!("DM".parse::<Formalism>().unwrap(), Formalism::DensityMatrix);
        assert_eq!(
            "stabilizer".parse::<Formalism>().unwrap(),
            Formalism::Stabilizer
        );
        assert!("mps".parse::<Formalism>().is_err());
        assert_eq!(Formalism::Stabilizer.to_string(), "stab");
    }

    #[test]
    fn test_ground_states() {
        assert_eq!(QRepr::ground(Formalism::Ket, 2).num_qubits(), Some(2));
        let dm = QRepr::ground(Formalism::DensityMatrix, 1).to_dm();
        assert_relative_eq!(dm[[0, 0]].re, 1.0);
        let stab = QRepr::ground(Formalism::Stabilizer, 3);
        assert_eq!(stab.formalism(), Formalism::Stabilizer);
        assert_eq!(stab.num_qubits(), Some(3));
    }

    #[test]
    fn test_validated_normalizes_ket() {
        let v = ketstates::s0().mapv(|z| z * 3.0);
        let QRepr::Ket(v) = QRepr::Ket(v).validated(1).unwrap() else {
            panic!("expected ket");
        };
        assert_relative_eq!(v[0].re, 1.0);
    }

    #[test]
    fn test_validated_rejects_wrong_dimension() {
        assert!(matches!(
            QRepr::Ket(ketstates::b00()).validated(1),
            Err(QStateError::DimensionMismatch {
                expected: 2,
                actual: 4
            })
        ));
        assert!(QRepr::Ket(CVector::zeros(2)).validated(1).is_err());
    }

    #[test]
    fn test_validated_checks_density_matrix() {
        let mut m = CMatrix::zeros((2, 2));
        m[[0, 1]] = num_complex::Complex64::new(1.0, 0.0);
        m[[0, 0]] = num_complex::Complex64::new(1.0, 0.0);
        assert!(matches!(
            QRepr::DensityMatrix(m).validated(1),
            Err(QStateError::InvalidState(_))
        ));
        let doubled = linalg::identity(2);
        let QRepr::DensityMatrix(rho) = QRepr::DensityMatrix(doubled).validated(1).unwrap() else {
            panic!("expected dm");
        };
        assert_relative_eq!(linalg::trace(&rho).re, 1.0);
    }

    #[test]
    fn test_stabilizers_helper() {
        let repr = QRepr::stabilizers(&["+XX", "+ZZ"]).unwrap();
        assert!(linalg::approx_eq(
            &repr.to_dm(),
            &linalg::ket_to_dm(&ketstates::b00()),
            1e-9
        ));
    }
}
