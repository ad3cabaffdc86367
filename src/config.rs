use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::MixerError;

pub const CONFIG_FILE_NAME: &str = "mixer.json";

/// What to do with compound names that normalize to no known slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnrecognizedPolicy {
    /// Drop from the mapping without a word.
    Ignore,
    /// Drop from the mapping, log a warning and list them in the report.
    #[default]
    Warn,
    /// Refuse the selection when it is entered.
    Reject,
}

/// Controller constants, read once at start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Serial port of the pump/dosing controller.
    pub pump_port: String,
    /// Serial port of the conductivity meter.
    pub meter_port: String,
    pub baud_rate: u32,
    /// Batch volume in ml that the percentages are applied to.
    pub total_volume_ml: f64,
    pub iteration_pause_ms: u64,
    pub default_iterations: u32,
    /// Target for the declared total and for the compound sum, in percent.
    pub recommended_total: f64,
    pub unrecognized: UnrecognizedPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            pump_port: "/dev/tty.usbserial-1110".to_string(),
            meter_port: "COM15".to_string(),
            baud_rate: 115_200,
            total_volume_ml: 3.00,
            iteration_pause_ms: 500,
            default_iterations: 10,
            recommended_total: 10.0,
            unrecognized: UnrecognizedPolicy::Warn,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), MixerError> {
        if !(self.total_volume_ml.is_finite() && self.total_volume_ml > 0.0) {
            return Err(MixerError::InvalidConfig(format!(
                "total_volume_ml must be positive, got {}",
                self.total_volume_ml
            )));
        }
        if self.baud_rate == 0 {
            return Err(MixerError::InvalidConfig("baud_rate must be non-zero".to_string()));
        }
        if !(0.0..=100.0).contains(&self.recommended_total) {
            return Err(MixerError::InvalidConfig(format!(
                "recommended_total must be within 0..=100, got {}",
                self.recommended_total
            )));
        }
        if self.default_iterations == 0 {
            return Err(MixerError::InvalidConfig("default_iterations must be positive".to_string()));
        }
        Ok(())
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let config: ControllerConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Loads `mixer.json` from the working directory, or defaults when absent.
    pub fn load_or_default() -> Result<Self> {
        let path = default_config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }
}

pub fn default_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(CONFIG_FILE_NAME)
}
