// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Noise channels.
//!
//! Density-matrix groups evolve exactly under each channel. Ket groups
//! sample a single trajectory, so averages over many runs converge to the
//! density-matrix result. Stabilizer groups accept only Pauli mixtures.

use ndarray::array;
use num_complex::Complex64;
use rand::Rng;
use tracing::trace;

use super::engine::{sample_index, QuantumEngine};
use super::linalg::{self, CMatrix};
use super::measure::check_complete;
use super::operator::{ops, Operator};
use super::repr::{Formalism, QRepr};
use super::stabilizer::CliffordGate;
use super::QubitId;
use crate::error::{QStateError, Result};

fn check_probability(name: &str, p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(QStateError::InvalidOperator(format!(
            "{} must be in [0, 1], got {}",
            name, p
        ))
        .into());
    }
    Ok(())
}

impl QuantumEngine {
    /// Apply the channel ρ → Σ K ρ K†.
    pub fn apply_kraus<R: Rng + ?Sized>(
        &mut self,
        qubits: &[QubitId],
        kraus: &[Operator],
        rng: &mut R,
    ) -> Result<()> {
        check_complete(qubits.len(), kraus)?;
        Self::check_distinct(qubits)?;
        if self.formalism_of(Self::first_qubit(qubits)?)? == Formalism::Stabilizer {
            return Err(QStateError::UnsupportedOperation(
                "Kraus channels on a stabilizer group".into(),
            )
            .into());
        }
        let gid = self.merge(qubits)?;
        let positions = self.positions(qubits)?;
        let group = self.group_mut(gid)?;
        let n = group.len();
        match &mut group.repr {
            QRepr::Ket(psi) => {
                let branches: Vec<_> = kraus
                    .iter()
                    .map(|k| {
                        let mut v = psi.clone();
                        linalg::apply_to_ket(&mut v, n, &positions, k.matrix());
                        v
                    })
                    .collect();
                let weights: Vec<f64> = branches.iter().map(|v| linalg::norm(v).powi(2)).collect();
                let i = sample_index(&weights, rng);
                let norm = weights[i].sqrt();
                *psi = branches[i].mapv(|z| z / norm);
            }
            QRepr::DensityMatrix(rho) => {
                let dim = rho.nrows();
                *rho = kraus.iter().fold(CMatrix::zeros((dim, dim)), |acc, k| {
                    let mut r = rho.clone();
                    linalg::apply_to_dm(&mut r, n, &positions, k.matrix());
                    acc + r
                });
            }
            QRepr::Stabilizer(_) => {
                return Err(QStateError::UnsupportedOperation(
                    "Kraus channels on a stabilizer group".into(),
                )
                .into())
            }
        }
        self.operations += 1;
        trace!(channel_size = kraus.len(), qubits = qubits.len(), "Applied Kraus channel");
        Ok(())
    }

    /// Apply unitary `operators[i]` with probability proportional to
    /// `weights[i]`. Density matrices receive the full mixture.
    pub fn stochastic_operate<R: Rng + ?Sized>(
        &mut self,
        qubits: &[QubitId],
        operators: &[Operator],
        weights: &[f64],
        rng: &mut R,
    ) -> Result<()> {
        if operators.is_empty() || operators.len() != weights.len() {
            return Err(QStateError::InvalidOperator(format!(
                "{} operators with {} weights",
                operators.len(),
                weights.len()
            ))
            .into());
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(QStateError::InvalidOperator("weights must be finite and >= 0".into()).into());
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(QStateError::InvalidOperator("weights sum to zero".into()).into());
        }
        let dim = 1usize << qubits.len();
        for op in operators {
            if op.dim() != dim {
                return Err(QStateError::DimensionMismatch {
                    expected: dim,
                    actual: op.dim(),
                }
                .into());
            }
            if !op.is_unitary() {
                return Err(QStateError::InvalidOperator(format!("{} is not unitary", op.name())).into());
            }
        }
        Self::check_distinct(qubits)?;

        match self.formalism_of(Self::first_qubit(qubits)?)? {
            Formalism::Ket => {
                let i = sample_index(weights, rng);
                self.operate(qubits, &operators[i])
            }
            Formalism::Stabilizer => {
                if let Some(op) = operators.iter().find(|op| CliffordGate::recognize(op).is_none()) {
                    return Err(QStateError::UnsupportedOperation(format!(
                        "{} is not a Clifford gate",
                        op.name()
                    ))
                    .into());
                }
                let i = sample_index(weights, rng);
                self.operate(qubits, &operators[i])
            }
            Formalism::DensityMatrix => {
                let gid = self.merge(qubits)?;
                let positions = self.positions(qubits)?;
                let group = self.group_mut(gid)?;
                let n = group.len();
                if let QRepr::DensityMatrix(rho) = &mut group.repr {
                    let d = rho.nrows();
                    *rho = operators.iter().zip(weights).fold(
                        CMatrix::zeros((d, d)),
                        |acc, (op, w)| {
                            let mut r = rho.clone();
                            linalg::apply_to_dm(&mut r, n, &positions, op.matrix());
                            acc + r.mapv(|z| z * (w / total))
                        },
                    );
                }
                self.operations += 1;
                Ok(())
            }
        }
    }

    /// Pauli channel with weights for (I, X, Y, Z).
    pub fn apply_pauli_noise<R: Rng + ?Sized>(
        &mut self,
        q: QubitId,
        weights: [f64; 4],
        rng: &mut R,
    ) -> Result<()> {
        let paulis = [ops::i(), ops::x(), ops::y(), ops::z()];
        self.stochastic_operate(&[q], &paulis, &weights, rng)
    }

    /// Depolarizing channel: ρ → (1 − p) ρ + p I/2.
    pub fn depolarize<R: Rng + ?Sized>(&mut self, q: QubitId, prob: f64, rng: &mut R) -> Result<()> {
        check_probability("depolarizing probability", prob)?;
        let p = prob / 4.0;
        self.apply_pauli_noise(q, [1.0 - 3.0 * p, p, p, p], rng)
    }

    /// Dephasing channel: Z with probability `prob`.
    pub fn dephase<R: Rng + ?Sized>(&mut self, q: QubitId, prob: f64, rng: &mut R) -> Result<()> {
        check_probability("dephasing probability", prob)?;
        self.apply_pauli_noise(q, [1.0 - prob, 0.0, 0.0, prob], rng)
    }

    /// Amplitude damping with decay `gamma`, applied with probability
    /// `prob`.
    pub fn amplitude_dampen<R: Rng + ?Sized>(
        &mut self,
        q: QubitId,
        gamma: f64,
        prob: f64,
        rng: &mut R,
    ) -> Result<()> {
        check_probability("gamma", gamma)?;
        check_probability("damping probability", prob)?;
        self.group_id(q)?;
        if gamma == 0.0 || prob == 0.0 {
            return Ok(());
        }
        let c = |re: f64| Complex64::new(re, 0.0);
        let k0: CMatrix = array![[c(1.0), c(0.0)], [c(0.0), c((1.0 - gamma).sqrt())]];
        let k1: CMatrix = array![[c(0.0), c(gamma.sqrt())], [c(0.0), c(0.0)]];
        let scale = c(prob.sqrt());
        let mut kraus = vec![
            Operator::new("AD0", k0)?.scale(scale),
            Operator::new("AD1", k1)?.scale(scale),
        ];
        if prob < 1.0 {
            kraus.push(ops::i().scale(c((1.0 - prob).sqrt())));
        }
        self.apply_kraus(&[q], &kraus, rng)
    }

    /// Depolarize with probability `1 − e^(−rate·elapsed)`.
    pub fn delay_depolarize<R: Rng + ?Sized>(
        &mut self,
        q: QubitId,
        rate: f64,
        elapsed: f64,
        rng: &mut R,
    ) -> Result<()> {
        if !rate.is_finite() || rate < 0.0 || !elapsed.is_finite() || elapsed < 0.0 {
            return Err(QStateError::InvalidOperator(format!(
                "rate {} and elapsed time {} must be finite and >= 0",
                rate, elapsed
            ))
            .into());
        }
        self.group_id(q)?;
        if rate * elapsed == 0.0 {
            return Ok(());
        }
        self.depolarize(q, 1.0 - (-rate * elapsed).exp(), rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::qubits::ketstates;
    use crate::test_utils::seeded_rng;
    use approx::assert_relative_eq;

    fn dm_engine() -> (QuantumEngine, QubitId) {
        let mut engine = QuantumEngine::new(Formalism::DensityMatrix, 12);
        let q = engine.create(1, true)[0];
        (engine, q)
    }

    #[test]
    fn test_depolarize_dm_exact() {
        let (mut engine, q) = dm_engine();
        let mut rng = seeded_rng(0);
        engine.depolarize(q, 0.5, &mut rng).unwrap();
        let rho = engine.reduced_density_matrix(&[q]).unwrap();
        assert_relative_eq!(rho[[0, 0]].re, 0.75, epsilon = 1e-12);
        assert_relative_eq!(rho[[1, 1]].re, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_full_depolarization_is_maximally_mixed() {
        let (mut engine, q) = dm_engine();
        let mut rng = seeded_rng(0);
        engine.operate(&[q], &ops::h()).unwrap();
        engine.depolarize(q, 1.0, &mut rng).unwrap();
        let rho = engine.reduced_density_matrix(&[q]).unwrap();
        assert!(linalg::approx_eq(&rho, &linalg::identity(2).mapv(|z| z * 0.5), 1e-12));
    }

    #[test]
    fn test_dephase_kills_coherence() {
        let (mut engine, q) = dm_engine();
        let mut rng = seeded_rng(0);
        engine.operate(&[q], &ops::h()).unwrap();
        engine.dephase(q, 0.5, &mut rng).unwrap();
        let rho = engine.reduced_density_matrix(&[q]).unwrap();
        assert_relative_eq!(rho[[0, 1]].norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(rho[[0, 0]].re, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_probability_out_of_range() {
        let (mut engine, q) = dm_engine();
        let mut rng = seeded_rng(0);
        assert!(matches!(
            engine.depolarize(q, 1.5, &mut rng),
            Err(Error::QState(QStateError::InvalidOperator(_)))
        ));
        assert!(engine.dephase(q, -0.1, &mut rng).is_err());
    }

    #[test]
    fn test_amplitude_damping_decays_excited_state() {
        let (mut engine, q) = dm_engine();
        let mut rng = seeded_rng(0);
        engine.operate(&[q], &ops::x()).unwrap();
        engine.amplitude_dampen(q, 0.3, 1.0, &mut rng).unwrap();
        let rho = engine.reduced_density_matrix(&[q]).unwrap();
        assert_relative_eq!(rho[[0, 0]].re, 0.3, epsilon = 1e-12);
        assert_relative_eq!(rho[[1, 1]].re, 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_amplitude_damping_partial_probability() {
        let (mut engine, q) = dm_engine();
        let mut rng = seeded_rng(0);
        engine.operate(&[q], &ops::x()).unwrap();
        engine.amplitude_dampen(q, 1.0, 0.5, &mut rng).unwrap();
        let rho = engine.reduced_density_matrix(&[q]).unwrap();
        assert_relative_eq!(rho[[0, 0]].re, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_kraus_ket_trajectories_average_to_channel() {
        let mut rng = seeded_rng(17);
        let trials = 2000;
        let mut decayed = 0;
        for _ in 0..trials {
            let mut engine = QuantumEngine::default();
            let q = engine.create(1, true)[0];
            engine.operate(&[q], &ops::x()).unwrap();
            engine.amplitude_dampen(q, 0.4, 1.0, &mut rng).unwrap();
            if engine.fidelity(&[q], &ketstates::s0(), true).unwrap() > 0.5 {
                decayed += 1;
            }
        }
        let fraction = decayed as f64 / trials as f64;
        assert!((fraction - 0.4).abs() < 0.05, "decayed fraction {fraction}");
    }

    #[test]
    fn test_kraus_rejected_on_stabilizer() {
        let mut engine = QuantumEngine::new(Formalism::Stabilizer, 12);
        let mut rng = seeded_rng(0);
        let q = engine.create(1, true)[0];
        assert!(matches!(
            engine.amplitude_dampen(q, 0.5, 1.0, &mut rng),
            Err(Error::QState(QStateError::UnsupportedOperation(_)))
        ));
    }

    #[test]
    fn test_pauli_noise_on_stabilizer() {
        let mut engine = QuantumEngine::new(Formalism::Stabilizer, 12);
        let mut rng = seeded_rng(0);
        let q = engine.create(1, true)[0];
        engine.apply_pauli_noise(q, [0.0, 1.0, 0.0, 0.0], &mut rng).unwrap();
        assert_relative_eq!(
            engine.fidelity(&[q], &ketstates::s1(), true).unwrap(),
            1.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_empty_target_rejected() {
        let mut engine = QuantumEngine::default();
        let mut rng = seeded_rng(0);
        assert!(engine.apply_kraus(&[], &[ops::i()], &mut rng).is_err());
        assert!(engine
            .stochastic_operate(&[], &[ops::i()], &[1.0], &mut rng)
            .is_err());
    }

    #[test]
    fn test_stochastic_operate_validates_weights() {
        let (mut engine, q) = dm_engine();
        let mut rng = seeded_rng(0);
        assert!(engine
            .stochastic_operate(&[q], &[ops::x()], &[0.5, 0.5], &mut rng)
            .is_err());
        assert!(engine
            .stochastic_operate(&[q], &[ops::x(), ops::z()], &[0.0, 0.0], &mut rng)
            .is_err());
    }

    #[test]
    fn test_stochastic_operate_normalizes_weights() {
        let (mut engine, q) = dm_engine();
        let mut rng = seeded_rng(0);
        engine
            .stochastic_operate(&[q], &[ops::i(), ops::x()], &[3.0, 1.0], &mut rng)
            .unwrap();
        let rho = engine.reduced_density_matrix(&[q]).unwrap();
        assert_relative_eq!(rho[[1, 1]].re, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_delay_depolarize() {
        let (mut engine, q) = dm_engine();
        let mut rng = seeded_rng(0);
        engine.delay_depolarize(q, 0.0, 100.0, &mut rng).unwrap();
        engine.delay_depolarize(q, 1e-3, 0.0, &mut rng).unwrap();
        assert_eq!(engine.operation_count(), 0);

        engine.delay_depolarize(q, 1e-3, 1000.0, &mut rng).unwrap();
        let p = 1.0 - (-1.0f64).exp();
        let rho = engine.reduced_density_matrix(&[q]).unwrap();
        assert_relative_eq!(rho[[1, 1]].re, p / 2.0, epsilon = 1e-12);
        assert!(engine.delay_depolarize(q, -1.0, 1.0, &mut rng).is_err());
    }
}
