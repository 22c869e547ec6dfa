//! ═══════════════════════════════════════════════════════════════════════════════
//! CONFIG — Layered Settings
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Defaults → optional JSON config file → environment overrides. Every knob
//! carries a working default; a missing file is not an error.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::coherence::CoherenceConfig;
use crate::error::{ConfigError, KeelResult};
use crate::pacer::PacerConfig;
use crate::recovery::RecoveryConfig;
use crate::ring::RingConfig;
use crate::stabilize::StabilizeConfig;

/// Top-level configuration, one section per subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeelConfig {
    pub ring: RingConfig,
    pub coherence: CoherenceConfig,
    pub stabilize: StabilizeConfig,
    pub recovery: RecoveryConfig,
    pub pacer: PacerConfig,
    /// JSON-lines journal target; `None` disables event logging
    pub journal_path: Option<PathBuf>,
}

impl Default for KeelConfig {
    fn default() -> Self {
        Self {
            ring: RingConfig::default(),
            coherence: CoherenceConfig::default(),
            stabilize: StabilizeConfig::default(),
            recovery: RecoveryConfig::default(),
            pacer: PacerConfig::default(),
            journal_path: None,
        }
    }
}

impl KeelConfig {
    /// Load defaults, overlay the config file if present, then apply
    /// environment overrides.
    pub fn load() -> KeelResult<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Ok(journal) = std::env::var("KEEL_JOURNAL") {
            if !journal.is_empty() {
                config.journal_path = Some(PathBuf::from(journal));
            }
        }
        if let Ok(ms) = std::env::var("KEEL_TICK_MS") {
            if let Ok(ms) = ms.parse::<u64>() {
                config.pacer.interval_ms = ms;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path (CLI `--config`)
    pub fn load_from(path: &PathBuf) -> KeelResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file location
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keel")
            .join("config.json")
    }

    /// Default journal location
    pub fn default_journal_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keel")
            .join("journal.jsonl")
    }

    pub fn save(&self) -> KeelResult<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> KeelResult<()> {
        if self.ring.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ring.capacity".to_string(),
                message: "must be positive".to_string(),
            }
            .into());
        }
        if !(self.ring.entropy_threshold > 0.0 && self.ring.entropy_threshold <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "ring.entropy_threshold".to_string(),
                message: "must lie in (0, 1]".to_string(),
            }
            .into());
        }
        if self.pacer.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pacer.interval_ms".to_string(),
                message: "must be positive".to_string(),
            }
            .into());
        }
        if self.recovery.window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "recovery.window".to_string(),
                message: "must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(KeelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_from_defaults() {
        let partial = r#"{"ring": {"capacity": 64, "entropy_threshold": 0.5, "initial_temperature": 0.1}}"#;
        let config: KeelConfig = serde_json::from_str(partial).unwrap();
        assert_eq!(config.ring.capacity, 64);
        // Untouched sections keep their defaults
        assert_eq!(config.stabilize.cooldown_base, 250);
        assert_eq!(config.pacer.interval_ms, PacerConfig::default().interval_ms);
    }

    #[test]
    fn test_invalid_capacity_rejected() {
        let mut config = KeelConfig::default();
        config.ring.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = KeelConfig::default();
        config.ring.entropy_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let err = KeelConfig::load_from(&PathBuf::from("/nonexistent-keel/config.json"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("not found"));
    }
}
