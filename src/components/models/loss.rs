// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Qubit loss models.

use super::{property, QuantumLossModel, Properties};
use crate::error::{NetworkError, Result};

fn check_probability(name: &str, p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(NetworkError::InvalidModel(format!(
            "{} must be in [0, 1], got {}",
            name, p
        ))
        .into());
    }
    Ok(())
}

/// Loss in fibre: an initial coupling loss plus attenuation in dB/km over
/// the component's `length`.
#[derive(Debug, Clone, PartialEq)]
pub struct FibreLossModel {
    p_loss_init: f64,
    p_loss_length: f64,
}

impl FibreLossModel {
    pub fn new(p_loss_init: f64, p_loss_length: f64) -> Result<Self> {
        check_probability("p_loss_init", p_loss_init)?;
        super::check_rate("p_loss_length", p_loss_length)?;
        Ok(Self {
            p_loss_init,
            p_loss_length,
        })
    }
}

impl QuantumLossModel for FibreLossModel {
    fn name(&self) -> &str {
        "fibre_loss"
    }

    fn required_properties(&self) -> &[&'static str] {
        &["length"]
    }

    fn loss_probability(&self, properties: &Properties) -> Result<f64> {
        let length = property(properties, "length")?;
        let survival =
            (1.0 - self.p_loss_init) * 10f64.powf(-length * self.p_loss_length / 10.0);
        Ok((1.0 - survival).clamp(0.0, 1.0))
    }
}

/// Length-independent loss probability.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedLossModel {
    prob: f64,
}

impl FixedLossModel {
    pub fn new(prob: f64) -> Result<Self> {
        check_probability("loss probability", prob)?;
        Ok(Self { prob })
    }
}

impl QuantumLossModel for FixedLossModel {
    fn name(&self) -> &str {
        "fixed_loss"
    }

    fn loss_probability(&self, _properties: &Properties) -> Result<f64> {
        Ok(self.prob)
    }
}
