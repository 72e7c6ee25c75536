// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quantum error models applied by channels and memories.
//!
//! Rates are per unit of simulated time. A time-independent model applies
//! its rate as a fixed probability on every call instead.

use rand::RngCore;

use super::{check_rate, Properties, QuantumErrorModel};
use crate::error::{NetworkError, Result};
use crate::qubits::{QuantumEngine, QubitId};

/// Depolarizing noise.
#[derive(Debug, Clone, PartialEq)]
pub struct DepolarNoiseModel {
    rate: f64,
    time_independent: bool,
}

impl DepolarNoiseModel {
    pub fn new(rate: f64, time_independent: bool) -> Result<Self> {
        check_rate("depolar rate", rate)?;
        if time_independent && rate > 1.0 {
            return Err(NetworkError::InvalidModel(format!(
                "time-independent depolar probability must be <= 1, got {}",
                rate
            ))
            .into());
        }
        Ok(Self {
            rate,
            time_independent,
        })
    }
}

impl QuantumErrorModel for DepolarNoiseModel {
    fn name(&self) -> &str {
        "depolar"
    }

    fn error_operation(
        &self,
        qstate: &mut QuantumEngine,
        qubits: &[QubitId],
        elapsed: f64,
        _properties: &Properties,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        for q in qubits {
            if self.time_independent {
                qstate.depolarize(*q, self.rate, rng)?;
            } else {
                qstate.delay_depolarize(*q, self.rate, elapsed, rng)?;
            }
        }
        Ok(())
    }
}

/// Dephasing noise: Z with probability `1 − e^(−rate·t)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DephaseNoiseModel {
    rate: f64,
    time_independent: bool,
}

impl DephaseNoiseModel {
    pub fn new(rate: f64, time_independent: bool) -> Result<Self> {
        check_rate("dephase rate", rate)?;
        if time_independent && rate > 1.0 {
            return Err(NetworkError::InvalidModel(format!(
                "time-independent dephase probability must be <= 1, got {}",
                rate
            ))
            .into());
        }
        Ok(Self {
            rate,
            time_independent,
        })
    }
}

impl QuantumErrorModel for DephaseNoiseModel {
    fn name(&self) -> &str {
        "dephase"
    }

    fn error_operation(
        &self,
        qstate: &mut QuantumEngine,
        qubits: &[QubitId],
        elapsed: f64,
        _properties: &Properties,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let prob = if self.time_independent {
            self.rate
        } else {
            1.0 - (-self.rate * elapsed).exp()
        };
        if prob == 0.0 {
            return Ok(());
        }
        for q in qubits {
            qstate.dephase(*q, prob, rng)?;
        }
        Ok(())
    }
}

/// Relaxation and dephasing from T1 and T2 times. A time of 0 disables
/// that process.
///
/// Relaxation is amplitude damping with γ = 1 − e^(−t/T1). Pure dephasing
/// uses 1/Tφ = 1/T2 − 1/(2·T1) and flips the phase with probability
/// (1 − e^(−t/Tφ))/2.
#[derive(Debug, Clone, PartialEq)]
pub struct T1T2NoiseModel {
    t1: f64,
    t2: f64,
}

impl T1T2NoiseModel {
    pub fn new(t1: f64, t2: f64) -> Result<Self> {
        check_rate("T1", t1)?;
        check_rate("T2", t2)?;
        if t1 > 0.0 && t2 > 2.0 * t1 {
            return Err(NetworkError::InvalidModel(format!(
                "T2 ({}) must be <= 2*T1 ({})",
                t2,
                2.0 * t1
            ))
            .into());
        }
        Ok(Self { t1, t2 })
    }

    /// Amplitude damping parameter after `elapsed`.
    pub fn gamma(&self, elapsed: f64) -> f64 {
        if self.t1 == 0.0 {
            0.0
        } else {
            1.0 - (-elapsed / self.t1).exp()
        }
    }

    /// Phase-flip probability after `elapsed`.
    pub fn dephase_probability(&self, elapsed: f64) -> f64 {
        if self.t2 == 0.0 {
            return 0.0;
        }
        let t1_term = if self.t1 == 0.0 { 0.0 } else { 1.0 / (2.0 * self.t1) };
        let gamma_phi = (1.0 / self.t2 - t1_term).max(0.0);
        (1.0 - (-elapsed * gamma_phi).exp()) / 2.0
    }
}

impl QuantumErrorModel for T1T2NoiseModel {
    fn name(&self) -> &str {
        "t1t2"
    }

    fn error_operation(
        &self,
        qstate: &mut QuantumEngine,
        qubits: &[QubitId],
        elapsed: f64,
        _properties: &Properties,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let gamma = self.gamma(elapsed);
        let p_phase = self.dephase_probability(elapsed);
        for q in qubits {
            if gamma > 0.0 {
                qstate.amplitude_dampen(*q, gamma, 1.0, rng)?;
            }
            if p_phase > 0.0 {
                qstate.dephase(*q, p_phase, rng)?;
            }
        }
        Ok(())
    }
}
