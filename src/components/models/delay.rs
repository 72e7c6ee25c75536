// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Channel delay models. Delays are in ns.

use rand::RngCore;
use rand_distr::{Distribution, Normal};

use super::{check_rate, property, DelayModel, Properties};
use crate::error::{NetworkError, Result};

/// Speed of light in fibre, km/s.
pub const FIBRE_SPEED_KM_S: f64 = 200_000.0;

/// Constant delay.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedDelayModel {
    delay: f64,
}

impl FixedDelayModel {
    pub fn new(delay: f64) -> Result<Self> {
        check_rate("delay", delay)?;
        Ok(Self { delay })
    }
}

impl DelayModel for FixedDelayModel {
    fn name(&self) -> &str {
        "fixed"
    }

    fn generate_delay(&self, _properties: &Properties, _rng: &mut dyn RngCore) -> Result<f64> {
        Ok(self.delay)
    }
}

/// Normally distributed delay; negative samples clamp to 0.
#[derive(Debug, Clone)]
pub struct GaussianDelayModel {
    mean: f64,
    std: f64,
    dist: Normal<f64>,
}

impl GaussianDelayModel {
    pub fn new(mean: f64, std: f64) -> Result<Self> {
        check_rate("mean", mean)?;
        check_rate("std", std)?;
        let dist = Normal::new(mean, std)
            .map_err(|e| NetworkError::InvalidModel(format!("gaussian delay: {}", e)))?;
        Ok(Self { mean, std, dist })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std(&self) -> f64 {
        self.std
    }
}

impl DelayModel for GaussianDelayModel {
    fn name(&self) -> &str {
        "gaussian"
    }

    fn generate_delay(&self, _properties: &Properties, rng: &mut dyn RngCore) -> Result<f64> {
        Ok(self.dist.sample(rng).max(0.0))
    }
}

/// Propagation delay over the component's `length` (km) at speed `c`
/// (km/s).
#[derive(Debug, Clone, PartialEq)]
pub struct FibreDelayModel {
    c: f64,
}

impl Default for FibreDelayModel {
    fn default() -> Self {
        Self {
            c: FIBRE_SPEED_KM_S,
        }
    }
}

impl FibreDelayModel {
    pub fn new(c: f64) -> Result<Self> {
        if !c.is_finite() || c <= 0.0 {
            return Err(NetworkError::InvalidModel(format!("speed must be > 0, got {}", c)).into());
        }
        Ok(Self { c })
    }
}

impl DelayModel for FibreDelayModel {
    fn name(&self) -> &str {
        "fibre"
    }

    fn required_properties(&self) -> &[&'static str] {
        &["length"]
    }

    fn generate_delay(&self, properties: &Properties, _rng: &mut dyn RngCore) -> Result<f64> {
        Ok(property(properties, "length")? / self.c * 1e9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_utils::seeded_rng;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_delay() {
        let model = FixedDelayModel::new(10.0).unwrap();
        let mut rng = seeded_rng(0);
        assert_eq!(model.generate_delay(&Properties::new(), &mut rng).unwrap(), 10.0);
        assert!(FixedDelayModel::new(-1.0).is_err());
    }

    #[test]
    fn test_gaussian_delay_never_negative() {
        let model = GaussianDelayModel::new(1.0, 5.0).unwrap();
        let mut rng = seeded_rng(3);
        for _ in 0..500 {
            assert!(model.generate_delay(&Properties::new(), &mut rng).unwrap() >= 0.0);
        }
    }

    #[test]
    fn test_gaussian_delay_mean() {
        let model = GaussianDelayModel::new(100.0, 1.0).unwrap();
        let mut rng = seeded_rng(3);
        let n = 2000;
        let total: f64 = (0..n)
            .map(|_| model.generate_delay(&Properties::new(), &mut rng).unwrap())
            .sum();
        assert_relative_eq!(total / n as f64, 100.0, epsilon = 0.2);
    }

    #[test]
    fn test_gaussian_delay_rejects_bad_std() {
        for std in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                GaussianDelayModel::new(1.0, std),
                Err(Error::Network(NetworkError::InvalidModel(_)))
            ));
        }
        assert!(GaussianDelayModel::new(1.0, 0.0).is_ok());
    }

    #[test]
    fn test_fibre_delay() {
        let model = FibreDelayModel::default();
        let mut rng = seeded_rng(0);
        let props = Properties::from([("length".to_string(), 2.0)]);
        // 2 km at 200000 km/s = 10 us
        assert_relative_eq!(model.generate_delay(&props, &mut rng).unwrap(), 10_000.0);
        assert_eq!(model.required_properties(), &["length"]);
        assert!(model.generate_delay(&Properties::new(), &mut rng).is_err());
    }
}
