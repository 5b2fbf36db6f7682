//! Simulation configuration
//!
//! Values come from defaults, optionally overlaid by a JSON file and then by
//! command-line flags. Everything is validated once before the world is built.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::policy::PolicyMode;
use super::types::{
    DEFAULT_COORDINATION_INTERVAL, DEFAULT_GREEN_DURATION, DEFAULT_UPDATE_FREQUENCY,
    DEFAULT_YELLOW_DURATION,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SimConfig {
    /// Control-cycle period
    pub update_frequency: f64,
    /// Network coordination tick period
    pub coordination_interval: f64,
    pub policy_mode: PolicyMode,
    pub fixed_green_duration: f64,
    pub fixed_yellow_duration: f64,
    /// Let the adaptive policy break equal-demand ties with the network bias
    pub bias_tie_break: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            update_frequency: DEFAULT_UPDATE_FREQUENCY,
            coordination_interval: DEFAULT_COORDINATION_INTERVAL,
            policy_mode: PolicyMode::default(),
            fixed_green_duration: DEFAULT_GREEN_DURATION,
            fixed_yellow_duration: DEFAULT_YELLOW_DURATION,
            bias_tie_break: false,
        }
    }
}

impl SimConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json).context("Invalid config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Bad config in {}", path.display()))
    }

    /// Reject values the scheduler or fixed-time cycle cannot run with
    pub fn validate(&self) -> Result<()> {
        require_positive("updateFrequency", self.update_frequency)?;
        require_positive("coordinationInterval", self.coordination_interval)?;
        require_positive("fixedGreenDuration", self.fixed_green_duration)?;
        if !self.fixed_yellow_duration.is_finite() || self.fixed_yellow_duration < 0.0 {
            bail!(
                "fixedYellowDuration must be a finite, non-negative number (got {})",
                self.fixed_yellow_duration
            );
        }
        Ok(())
    }
}

fn require_positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{} must be a finite, positive number (got {})", field, value);
    }
    Ok(())
}
