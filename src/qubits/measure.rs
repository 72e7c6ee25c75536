// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Projective and generalized measurement.

use num_complex::Complex64;
use rand::Rng;
use tracing::debug;

use super::engine::{sample_index, QuantumEngine};
use super::linalg::{self, CMatrix};
use super::operator::{ops, Operator};
use super::repr::{Formalism, QRepr};
use super::stabilizer::StabilizerTableau;
use super::QubitId;
use crate::error::{QStateError, Result};

/// Pauli axis a stabilizer measurement is rotated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn of(observable: &Operator) -> Option<Self> {
        [(Axis::X, ops::x()), (Axis::Y, ops::y()), (Axis::Z, ops::z())]
            .into_iter()
            .find(|(_, p)| linalg::approx_eq(observable.matrix(), p.matrix(), 1e-9))
            .map(|(axis, _)| axis)
    }

    /// Rotate the axis onto Z.
    fn to_z(self, t: &mut StabilizerTableau, a: usize) {
        match self {
            Axis::X => t.h(a),
            Axis::Y => {
                t.sdg(a);
                t.h(a);
            }
            Axis::Z => {}
        }
    }

    fn from_z(self, t: &mut StabilizerTableau, a: usize) {
        match self {
            Axis::X => t.h(a),
            Axis::Y => {
                t.h(a);
                t.s(a);
            }
            Axis::Z => {}
        }
    }
}

impl QuantumEngine {
    /// Measure each of `qubits` in the eigenbasis of a single-qubit
    /// observable. Outcome 0 is the larger eigenvalue. The measured qubit
    /// ends in its own group holding the observed eigenvector, or
    /// unassigned when `discard` is set.
    pub fn measure<R: Rng + ?Sized>(
        &mut self,
        qubits: &[QubitId],
        observable: &Operator,
        discard: bool,
        rng: &mut R,
    ) -> Result<(Vec<u8>, Vec<f64>)> {
        Self::check_distinct(qubits)?;
        let basis = observable.eigenbasis()?;
        let mut axis = None;
        for q in qubits {
            if self.formalism_of(*q)? == Formalism::Stabilizer && axis.is_none() {
                axis = Some(Axis::of(observable).ok_or_else(|| {
                    QStateError::UnsupportedOperation(format!(
                        "stabilizer groups can only be measured in X, Y or Z, not {}",
                        observable.name()
                    ))
                })?);
            }
        }

        let mut outcomes = Vec::with_capacity(qubits.len());
        let mut probabilities = Vec::with_capacity(qubits.len());
        for &q in qubits {
            let (outcome, prob) = self.measure_one(q, &basis, axis, discard, rng)?;
            outcomes.push(outcome);
            probabilities.push(prob);
        }
        self.operations += 1;
        debug!(
            observable = observable.name(),
            outcomes = ?outcomes,
            "Measured qubits"
        );
        Ok((outcomes, probabilities))
    }

    fn measure_one<R: Rng + ?Sized>(
        &mut self,
        q: QubitId,
        basis: &[(f64, [Complex64; 2]); 2],
        axis: Option<Axis>,
        discard: bool,
        rng: &mut R,
    ) -> Result<(u8, f64)> {
        let gid = self.group_id(q)?;
        let pos = self.position(q)?;
        let group = self.group_ref(gid)?;
        let n = group.len();
        let rest_qubits: Vec<QubitId> =
            group.qubits().iter().copied().filter(|m| *m != q).collect();

        let (outcome, prob, rest, own) = match group.repr() {
            QRepr::Ket(psi) => {
                let branches = (*basis).map(|(_, v)| linalg::contract_ket(psi, n, pos, &v));
                let p0 = linalg::norm(&branches[0]).powi(2).clamp(0.0, 1.0);
                let k = usize::from(rng.gen::<f64>() >= p0);
                let prob = if k == 0 { p0 } else { 1.0 - p0 };
                let norm = linalg::norm(&branches[k]);
                let rest = QRepr::Ket(branches[k].mapv(|z| z / norm));
                let own = QRepr::Ket(ndarray::arr1(&basis[k].1));
                (k as u8, prob, rest, own)
            }
            QRepr::DensityMatrix(rho) => {
                let branches = (*basis).map(|(_, v)| linalg::contract_dm(rho, n, pos, &v));
                let p0 = linalg::trace(&branches[0]).re.clamp(0.0, 1.0);
                let k = usize::from(rng.gen::<f64>() >= p0);
                let prob = if k == 0 { p0 } else { 1.0 - p0 };
                let tr = linalg::trace(&branches[k]).re;
                let rest = QRepr::DensityMatrix(branches[k].mapv(|z| z / tr));
                let own = QRepr::DensityMatrix(linalg::ket_to_dm(&ndarray::arr1(&basis[k].1)));
                (k as u8, prob, rest, own)
            }
            QRepr::Stabilizer(t) => {
                let axis = axis.unwrap_or(Axis::Z);
                let mut t = t.clone();
                axis.to_z(&mut t, pos);
                let (outcome, prob) = t.measure_z(pos, rng)?;
                let rest = QRepr::Stabilizer(t.split_off(pos)?);
                let mut single = StabilizerTableau::new(1);
                if outcome == 1 {
                    single.x(0);
                }
                axis.from_z(&mut single, 0);
                (outcome, prob, rest, QRepr::Stabilizer(single))
            }
        };

        self.remove_group(gid)?;
        if !rest_qubits.is_empty() {
            self.install(rest_qubits, rest);
        }
        if discard {
            self.unassign(q);
        } else {
            self.install(vec![q], own);
        }
        Ok((outcome, prob))
    }

    /// Generalized measurement with operators `{M_i}` acting jointly on
    /// `qubits`. Outcome `i` occurs with probability `‖M_i ψ‖²` (or
    /// `tr(M_i ρ M_i†)`) and leaves the normalized post-measurement state.
    /// The group is never split.
    pub fn gmeasure<R: Rng + ?Sized>(
        &mut self,
        qubits: &[QubitId],
        meas_ops: &[Operator],
        rng: &mut R,
    ) -> Result<(usize, f64)> {
        check_complete(qubits.len(), meas_ops)?;
        Self::check_distinct(qubits)?;
        if self.formalism_of(Self::first_qubit(qubits)?)? == Formalism::Stabilizer {
            return Err(QStateError::UnsupportedOperation(
                "generalized measurement on a stabilizer group".into(),
            )
            .into());
        }
        let gid = self.merge(qubits)?;
        let positions = self.positions(qubits)?;
        let group = self.group_mut(gid)?;
        let n = group.len();

        let (index, prob) = match &mut group.repr {
            QRepr::Ket(psi) => {
                let branches: Vec<_> = meas_ops
                    .iter()
                    .map(|m| {
                        let mut v = psi.clone();
                        linalg::apply_to_ket(&mut v, n, &positions, m.matrix());
                        v
                    })
                    .collect();
                let probs: Vec<f64> = branches.iter().map(|v| linalg::norm(v).powi(2)).collect();
                let i = sample_index(&probs, rng);
                let norm = probs[i].sqrt();
                *psi = branches[i].mapv(|z| z / norm);
                (i, probs[i])
            }
            QRepr::DensityMatrix(rho) => {
                let branches: Vec<CMatrix> = meas_ops
                    .iter()
                    .map(|m| {
                        let mut r = rho.clone();
                        linalg::apply_to_dm(&mut r, n, &positions, m.matrix());
                        r
                    })
                    .collect();
                let probs: Vec<f64> = branches.iter().map(|r| linalg::trace(r).re).collect();
                let i = sample_index(&probs, rng);
                *rho = branches[i].mapv(|z| z / probs[i]);
                (i, probs[i])
            }
            QRepr::Stabilizer(_) => {
                return Err(QStateError::UnsupportedOperation(
                    "generalized measurement on a stabilizer group".into(),
                )
                .into())
            }
        };
        self.operations += 1;
        debug!(outcome = index, probability = prob, "Generalized measurement");
        Ok((index, prob))
    }
}

/// Check that `ops` act on `k` qubits and satisfy Σ M†M = I.
pub(super) fn check_complete(k: usize, ops: &[Operator]) -> Result<()> {
    let dim = 1usize << k;
    if ops.is_empty() {
        return Err(QStateError::InvalidOperator("empty operator set".into()).into());
    }
    if let Some(op) = ops.iter().find(|op| op.dim() != dim) {
        return Err(QStateError::DimensionMismatch {
            expected: dim,
            actual: op.dim(),
        }
        .into());
    }
    let sum = ops.iter().fold(CMatrix::zeros((dim, dim)), |acc, op| {
        acc + linalg::conjugate_transpose(op.matrix()).dot(op.matrix())
    });
    if !linalg::approx_eq(&sum, &linalg::identity(dim), 1e-8) {
        return Err(QStateError::InvalidOperator(
            "operators do not satisfy the completeness relation".into(),
        )
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::qubits::ketstates;
    use crate::test_utils::seeded_rng;
    use approx::assert_relative_eq;

    fn bell(engine: &mut QuantumEngine) -> Vec<QubitId> {
        let q = engine.create(2, true);
        engine.operate(&[q[0]], &ops::h()).unwrap();
        engine.operate(&q, &ops::cnot()).unwrap();
        q
    }

    // ========================================================================
    // Projective measurement
    // ========================================================================

    #[test]
    fn test_measure_basis_state_is_deterministic() {
        let mut engine = QuantumEngine::default();
        let mut rng = seeded_rng(1);
        let q = engine.create(1, true);
        engine.operate(&q, &ops::x()).unwrap();
        let (outcomes, probs) = engine.measure(&q, &ops::z(), false, &mut rng).unwrap();
        assert_eq!(outcomes, vec![1]);
        assert_relative_eq!(probs[0], 1.0, epsilon = 1e-12);
        assert!(engine.is_assigned(q[0]));
    }

    #[test]
    fn test_measure_plus_state_in_x() {
        let mut engine = QuantumEngine::default();
        let mut rng = seeded_rng(2);
        let q = engine.create(1, true);
        engine.operate(&q, &ops::h()).unwrap();
        let (outcomes, _) = engine.measure(&q, &ops::x(), false, &mut rng).unwrap();
        assert_eq!(outcomes, vec![0]);
    }

    #[test]
    fn test_measure_with_discard_unassigns() {
        let mut engine = QuantumEngine::default();
        let mut rng = seeded_rng(3);
        let q = bell(&mut engine);
        engine.measure(&[q[0]], &ops::z(), true, &mut rng).unwrap();
        assert!(!engine.is_assigned(q[0]));
        assert_eq!(engine.group_size(q[1]).unwrap(), 1);
    }

    #[test]
    fn test_measure_rejects_multi_qubit_observable() {
        let mut engine = QuantumEngine::default();
        let mut rng = seeded_rng(3);
        let q = engine.create(2, true);
        assert!(matches!(
            engine.measure(&q, &ops::cnot(), false, &mut rng),
            Err(Error::QState(QStateError::InvalidOperator(_)))
        ));
    }

    #[test]
    fn test_bell_correlations_all_formalisms() {
        for formalism in [Formalism::Ket, Formalism::DensityMatrix, Formalism::Stabilizer] {
            let mut rng = seeded_rng(42);
            let mut zeros = 0;
            for _ in 0..1000 {
                let mut engine = QuantumEngine::new(formalism, 12);
                let q = bell(&mut engine);
                let (outcomes, probs) = engine.measure(&q, &ops::z(), false, &mut rng).unwrap();
                assert_eq!(outcomes[0], outcomes[1], "{formalism}");
                assert_relative_eq!(probs[0], 0.5, epsilon = 1e-9);
                assert_relative_eq!(probs[1], 1.0, epsilon = 1e-9);
                if outcomes[0] == 0 {
                    zeros += 1;
                }
            }
            assert!((420..=580).contains(&zeros), "{formalism}: {zeros}");
        }
    }

    #[test]
    fn test_measured_qubit_holds_eigenvector() {
        for formalism in [Formalism::Ket, Formalism::DensityMatrix, Formalism::Stabilizer] {
            let mut engine = QuantumEngine::new(formalism, 12);
            let mut rng = seeded_rng(9);
            let q = engine.create(1, true);
            let (outcomes, _) = engine.measure(&q, &ops::y(), false, &mut rng).unwrap();
            let expected = if outcomes[0] == 0 {
                ketstates::y0()
            } else {
                ketstates::y1()
            };
            assert_relative_eq!(
                engine.fidelity(&q, &expected, true).unwrap(),
                1.0,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_stabilizer_measure_rejects_non_pauli() {
        let mut engine = QuantumEngine::new(Formalism::Stabilizer, 12);
        let mut rng = seeded_rng(0);
        let q = engine.create(1, true);
        let obs = ops::rotation(0.3, [1.0, 0.0, 0.0])
            .unwrap()
            .product(&ops::z())
            .unwrap()
            .product(&ops::rotation(0.3, [1.0, 0.0, 0.0]).unwrap().dagger())
            .unwrap();
        assert!(engine.measure(&q, &obs, false, &mut rng).is_err());
    }

    // ========================================================================
    // Generalized measurement
    // ========================================================================

    #[test]
    fn test_gmeasure_projectors() {
        let mut engine = QuantumEngine::default();
        let mut rng = seeded_rng(4);
        let q = engine.create(1, true);
        let projectors = ops::z().projectors().unwrap();
        let (index, prob) = engine.gmeasure(&q, &projectors, &mut rng).unwrap();
        assert_eq!(index, 0);
        assert_relative_eq!(prob, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gmeasure_bell_projection_keeps_group() {
        let mut engine = QuantumEngine::new(Formalism::DensityMatrix, 12);
        let mut rng = seeded_rng(4);
        let q = bell(&mut engine);
        let phi = Operator::new("Pphi", linalg::ket_to_dm(&ketstates::b00())).unwrap();
        let rest = Operator::new(
            "Prest",
            linalg::identity(4) - linalg::ket_to_dm(&ketstates::b00()),
        )
        .unwrap();
        let (index, prob) = engine.gmeasure(&q, &[phi, rest], &mut rng).unwrap();
        assert_eq!(index, 0);
        assert_relative_eq!(prob, 1.0, epsilon = 1e-9);
        assert_eq!(engine.group_size(q[0]).unwrap(), 2);
    }

    #[test]
    fn test_gmeasure_rejects_empty_target() {
        let mut engine = QuantumEngine::default();
        let mut rng = seeded_rng(4);
        let projectors = ops::z().projectors().unwrap();
        assert!(engine.gmeasure(&[], &projectors, &mut rng).is_err());
    }

    #[test]
    fn test_gmeasure_requires_completeness() {
        let mut engine = QuantumEngine::default();
        let mut rng = seeded_rng(4);
        let q = engine.create(1, true);
        let [p0, _] = ops::z().projectors().unwrap();
        assert!(matches!(
            engine.gmeasure(&q, &[p0], &mut rng),
            Err(Error::QState(QStateError::InvalidOperator(_)))
        ));
    }

    #[test]
    fn test_gmeasure_unsupported_on_stabilizer() {
        let mut engine = QuantumEngine::new(Formalism::Stabilizer, 12);
        let mut rng = seeded_rng(4);
        let q = engine.create(1, true);
        let projectors = ops::z().projectors().unwrap();
        assert!(matches!(
            engine.gmeasure(&q, &projectors, &mut rng),
            Err(Error::QState(QStateError::UnsupportedOperation(_)))
        ));
    }
}
