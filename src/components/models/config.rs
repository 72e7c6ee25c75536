// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Serde records describing models, for YAML network descriptions.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use super::delay::{FibreDelayModel, FixedDelayModel, GaussianDelayModel, FIBRE_SPEED_KM_S};
use super::loss::{FibreLossModel, FixedLossModel};
use super::noise::{DephaseNoiseModel, DepolarNoiseModel, T1T2NoiseModel};
use super::{DelayModel, QuantumErrorModel, QuantumLossModel};
use crate::error::Result;

fn default_fibre_speed() -> f64 {
    FIBRE_SPEED_KM_S
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DelayModelConfig {
    Fixed {
        delay: f64,
    },
    Gaussian {
        mean: f64,
        std: f64,
    },
    Fibre {
        #[serde(default = "default_fibre_speed")]
        c: f64,
    },
}

impl DelayModelConfig {
    pub fn build(&self) -> Result<Rc<dyn DelayModel>> {
        Ok(match self {
            DelayModelConfig::Fixed { delay } => Rc::new(FixedDelayModel::new(*delay)?),
            DelayModelConfig::Gaussian { mean, std } => {
                Rc::new(GaussianDelayModel::new(*mean, *std)?)
            }
            DelayModelConfig::Fibre { c } => Rc::new(FibreDelayModel::new(*c)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorModelConfig {
    Depolar {
        rate: f64,
        #[serde(default)]
        time_independent: bool,
    },
    Dephase {
        rate: f64,
        #[serde(default)]
        time_independent: bool,
    },
    #[serde(rename = "t1t2")]
    T1T2 {
        #[serde(default)]
        t1: f64,
        #[serde(default)]
        t2: f64,
    },
}

impl ErrorModelConfig {
    pub fn build(&self) -> Result<Rc<dyn QuantumErrorModel>> {
        Ok(match self {
            ErrorModelConfig::Depolar {
                rate,
                time_independent,
            } => Rc::new(DepolarNoiseModel::new(*rate, *time_independent)?),
            ErrorModelConfig::Dephase {
                rate,
                time_independent,
            } => Rc::new(DephaseNoiseModel::new(*rate, *time_independent)?),
            ErrorModelConfig::T1T2 { t1, t2 } => Rc::new(T1T2NoiseModel::new(*t1, *t2)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LossModelConfig {
    FibreLoss {
        #[serde(default)]
        p_loss_init: f64,
        p_loss_length: f64,
    },
    Fixed {
        prob: f64,
    },
}

impl LossModelConfig {
    pub fn build(&self) -> Result<Rc<dyn QuantumLossModel>> {
        Ok(match self {
            LossModelConfig::FibreLoss {
                p_loss_init,
                p_loss_length,
            } => Rc::new(FibreLossModel::new(*p_loss_init, *p_loss_length)?),
            LossModelConfig::Fixed { prob } => Rc::new(FixedLossModel::new(*prob)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_config_from_yaml() {
        let cfg: DelayModelConfig = serde_yaml::from_str("type: fibre").unwrap();
        assert_eq!(cfg, DelayModelConfig::Fibre { c: FIBRE_SPEED_KM_S });
        assert_eq!(cfg.build().unwrap().name(), "fibre");

        let cfg: DelayModelConfig = serde_yaml::from_str("type: fixed\ndelay: 10.0").unwrap();
        assert_eq!(cfg.build().unwrap().name(), "fixed");
    }

    #[test]
    fn test_error_config_from_yaml() {
        let cfg: ErrorModelConfig = serde_yaml::from_str("type: t1t2\nt1: 100.0\nt2: 50.0").unwrap();
        assert_eq!(cfg, ErrorModelConfig::T1T2 { t1: 100.0, t2: 50.0 });
        assert_eq!(cfg.build().unwrap().name(), "t1t2");

        let cfg: ErrorModelConfig = serde_yaml::from_str("type: depolar\nrate: 0.001").unwrap();
        assert_eq!(
            cfg,
            ErrorModelConfig::Depolar {
                rate: 0.001,
                time_independent: false
            }
        );
    }

    #[test]
    fn test_invalid_config_fails_on_build() {
        let cfg = ErrorModelConfig::T1T2 { t1: 1.0, t2: 5.0 };
        assert!(cfg.build().is_err());
        let cfg = LossModelConfig::Fixed { prob: 2.0 };
        assert!(cfg.build().is_err());
    }

    #[test]
    fn test_loss_config_roundtrip_yaml() {
        let cfg = LossModelConfig::FibreLoss {
            p_loss_init: 0.2,
            p_loss_length: 0.25,
        };
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        assert!(yaml.contains("type: fibre_loss"));
        let back: LossModelConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, cfg);
    }
}
