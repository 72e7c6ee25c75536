// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pluggable physical models.
//!
//! A model is a pure function of a component's properties and the shared
//! random stream. Each declares the property keys it reads; attaching a
//! model to a component that lacks one of them fails immediately.

pub mod config;
pub mod delay;
pub mod loss;
pub mod noise;

use rand::RngCore;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{NetworkError, Result};
use crate::qubits::{QuantumEngine, QubitId};

pub use config::{DelayModelConfig, ErrorModelConfig, LossModelConfig};
pub use delay::{FibreDelayModel, FixedDelayModel, GaussianDelayModel};
pub use loss::{FibreLossModel, FixedLossModel};
pub use noise::{DephaseNoiseModel, DepolarNoiseModel, T1T2NoiseModel};

/// Named physical parameters of a component, e.g. `length`.
pub type Properties = BTreeMap<String, f64>;

/// Produces the propagation delay of a channel.
pub trait DelayModel: fmt::Debug {
    fn name(&self) -> &str;

    fn required_properties(&self) -> &[&'static str] {
        &[]
    }

    fn generate_delay(&self, properties: &Properties, rng: &mut dyn RngCore) -> Result<f64>;
}

/// Mutates qubits to model noise accumulated over `elapsed` time.
pub trait QuantumErrorModel: fmt::Debug {
    fn name(&self) -> &str;

    fn required_properties(&self) -> &[&'static str] {
        &[]
    }

    fn error_operation(
        &self,
        qstate: &mut QuantumEngine,
        qubits: &[QubitId],
        elapsed: f64,
        properties: &Properties,
        rng: &mut dyn RngCore,
    ) -> Result<()>;
}

/// Probability that a qubit is lost in transit.
pub trait QuantumLossModel: fmt::Debug {
    fn name(&self) -> &str;

    fn required_properties(&self) -> &[&'static str] {
        &[]
    }

    fn loss_probability(&self, properties: &Properties) -> Result<f64>;
}

/// Model slots of a component.
#[derive(Debug, Clone, Default)]
pub struct Models {
    pub delay: Option<Rc<dyn DelayModel>>,
    pub quantum_noise: Option<Rc<dyn QuantumErrorModel>>,
    pub quantum_loss: Option<Rc<dyn QuantumLossModel>>,
}

/// Fail with `MissingProperty` unless every key in `required` is set.
pub fn check_required(component: &str, required: &[&str], properties: &Properties) -> Result<()> {
    match required.iter().find(|key| !properties.contains_key(**key)) {
        Some(missing) => Err(NetworkError::MissingProperty {
            component: component.to_string(),
            property: missing.to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

/// Read a property that `check_required` has vetted.
pub(crate) fn property(properties: &Properties, key: &str) -> Result<f64> {
    properties.get(key).copied().ok_or_else(|| {
        NetworkError::MissingProperty {
            component: "<model>".to_string(),
            property: key.to_string(),
        }
        .into()
    })
}

pub(crate) fn check_rate(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(NetworkError::InvalidModel(format!(
            "{} must be finite and >= 0, got {}",
            name, value
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_check_required() {
        let mut props = Properties::new();
        assert!(check_required("fibre", &[], &props).is_ok());
        assert!(matches!(
            check_required("fibre", &["length"], &props),
            Err(Error::Network(NetworkError::MissingProperty { .. }))
        ));
        props.insert("length".into(), 10.0);
        assert!(check_required("fibre", &["length"], &props).is_ok());
    }

    #[test]
    fn test_check_rate() {
        assert!(check_rate("rate", 0.0).is_ok());
        assert!(check_rate("rate", -1.0).is_err());
        assert!(check_rate("rate", f64::NAN).is_err());
    }
}
