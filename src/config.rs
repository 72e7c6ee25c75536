// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for the simulator.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. netsim.yaml file
//! 3. Environment variables (QUBITOS_*)
//! 4. CLI arguments

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{Error, Result};
use crate::qubits::Formalism;

/// Largest group the dense formalisms can hold before memory use explodes.
const HARD_MAX_GROUP_QUBITS: usize = 24;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Simulation settings
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Resource limits
    #[serde(default)]
    pub limits: ResourceLimits,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                config = serde_yaml::from_str(&content)?;
            }
        } else {
            for path in &["netsim.yaml", "netsim.yml"] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yaml::from_str(&content)?;
                    break;
                }
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("QUBITOS_NETSIM_SEED") {
            if let Ok(seed) = val.parse() {
                self.simulation.seed = seed;
            }
        }
        if let Ok(val) = env::var("QUBITOS_NETSIM_FORMALISM") {
            if let Ok(formalism) = val.parse() {
                self.simulation.formalism = formalism;
            }
        }
        if let Ok(val) = env::var("QUBITOS_NETSIM_MAX_GROUP_QUBITS") {
            if let Ok(n) = val.parse() {
                self.limits.max_group_qubits = n;
            }
        }
        if let Ok(val) = env::var("QUBITOS_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_group_qubits == 0 {
            return Err(Error::Config("max_group_qubits cannot be 0".into()));
        }
        if self.limits.max_group_qubits > HARD_MAX_GROUP_QUBITS {
            return Err(Error::Config(format!(
                "max_group_qubits {} exceeds hard limit {}",
                self.limits.max_group_qubits, HARD_MAX_GROUP_QUBITS
            )));
        }
        match self.logging.format.as_str() {
            "json" | "pretty" => {}
            other => {
                return Err(Error::Config(format!(
                    "unknown log format '{}' (expected json or pretty)",
                    other
                )))
            }
        }
        if self.simulation.formalism == Formalism::Stabilizer {
            tracing::warn!(
                "Stabilizer formalism selected. Non-Clifford operations on new \
                 groups will fail; convert groups first if needed."
            );
        }
        Ok(())
    }
}

/// Simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for the single random-number stream
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Formalism used for newly created state groups
    #[serde(default)]
    pub formalism: Formalism,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            formalism: Formalism::default(),
        }
    }
}

fn default_seed() -> u64 {
    42
}

/// Resource limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum number of qubits in one state group
    #[serde(default = "default_max_group_qubits")]
    pub max_group_qubits: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_group_qubits: default_max_group_qubits(),
        }
    }
}

fn default_max_group_qubits() -> usize {
    12
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::sync::Mutex;

    // Serializes tests that read or write QUBITOS_* variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.simulation.seed, 42);
        assert_eq!(config.simulation.formalism, Formalism::Ket);
        assert_eq!(config.limits.max_group_qubits, 12);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let mut bad_config = Config::default();
        bad_config.limits.max_group_qubits = 0;
        assert!(bad_config.validate().is_err());
    }

    #[test]
    fn test_validate_group_limit_too_large() {
        let mut config = Config::default();
        config.limits.max_group_qubits = 40;
        let msg = format!("{}", config.validate().unwrap_err());
        assert!(msg.contains("hard limit"));
    }

    #[test]
    fn test_validate_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".into();
        let msg = format!("{}", config.validate().unwrap_err());
        assert!(msg.contains("log format"));
    }

    #[test]
    fn test_validate_stabilizer_still_passes() {
        let mut config = Config::default();
        config.simulation.formalism = Formalism::Stabilizer;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
simulation:
  seed: 7
  formalism: dm
limits:
  max_group_qubits: 8
"#
        )
        .unwrap();

        let config = Config::load(Some(f.path())).unwrap();
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.simulation.formalism, Formalism::DensityMatrix);
        assert_eq!(config.limits.max_group_qubits, 8);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let path = std::path::Path::new("/tmp/does_not_exist_qubitos_netsim_test.yaml");
        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.limits.max_group_qubits, 12);
    }

    #[test]
    fn test_config_load_invalid_yaml() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{{{{not: valid: yaml::::").unwrap();

        let result = Config::load(Some(f.path()));
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_config_load_unknown_formalism() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "simulation:\n  formalism: tensor_network").unwrap();

        assert!(Config::load(Some(f.path())).is_err());
    }

    #[test]
    fn test_env_override_seed() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut config = Config::default();
        std::env::set_var("QUBITOS_NETSIM_SEED", "1234");
        config.apply_env_overrides();
        assert_eq!(config.simulation.seed, 1234);
        std::env::remove_var("QUBITOS_NETSIM_SEED");
    }

    #[test]
    fn test_env_override_formalism() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut config = Config::default();
        std::env::set_var("QUBITOS_NETSIM_FORMALISM", "stab");
        config.apply_env_overrides();
        assert_eq!(config.simulation.formalism, Formalism::Stabilizer);
        std::env::remove_var("QUBITOS_NETSIM_FORMALISM");

        // Unparseable values are ignored
        std::env::set_var("QUBITOS_NETSIM_FORMALISM", "banana");
        config.apply_env_overrides();
        assert_eq!(config.simulation.formalism, Formalism::Stabilizer);
        std::env::remove_var("QUBITOS_NETSIM_FORMALISM");
    }

    #[test]
    fn test_env_override_max_group_qubits() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut config = Config::default();
        std::env::set_var("QUBITOS_NETSIM_MAX_GROUP_QUBITS", "5");
        config.apply_env_overrides();
        assert_eq!(config.limits.max_group_qubits, 5);
        std::env::remove_var("QUBITOS_NETSIM_MAX_GROUP_QUBITS");
    }

    #[test]
    fn test_env_override_log_level() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut config = Config::default();
        std::env::set_var("QUBITOS_LOG_LEVEL", "debug");
        config.apply_env_overrides();
        assert_eq!(config.logging.level, "debug");
        std::env::remove_var("QUBITOS_LOG_LEVEL");
    }

    #[test]
    fn test_config_yaml_roundtrip_keeps_formalism_names() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("formalism: ket"));
    }
}
