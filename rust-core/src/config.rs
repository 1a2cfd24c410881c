//! Tuning parameters for every pipeline stage.
//!
//! Each stage owns a plain config struct whose `Default` carries the
//! production constants. `DrConfig` bundles them and can be loaded from a
//! YAML file; any field left out of the file keeps its default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DrError, Result};

/// Parameters for heading estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingConfig {
    /// Low-pass coefficient: filtered = α·new + (1−α)·previous.
    pub alpha: f64,
    /// Pitch or roll beyond this (degrees) switches on tilt compensation.
    pub tilt_threshold_deg: f64,
    /// Jump between new reading and previous filtered heading that raises
    /// the calibrating signal (degrees).
    pub interference_threshold_deg: f64,
    /// How long the calibrating signal stays up (ms).
    pub calibration_pulse_ms: f64,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            tilt_threshold_deg: 5.0,
            interference_threshold_deg: 20.0,
            calibration_pulse_ms: 2000.0,
        }
    }
}

/// Parameters for acceleration integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Raw 2D acceleration magnitude below which a sample counts as still (m/s²).
    pub stationary_threshold: f64,
    /// Consecutive still samples before the device is declared stationary.
    pub stationary_samples: u32,
    /// Weight of the new reading when learning bias while stationary.
    pub bias_alpha: f64,
    /// Bias-corrected components at or below this are zeroed (m/s²).
    pub deadzone: f64,
    /// Exponential velocity decay rate (1/s).
    pub damping: f64,
    /// Smallest accepted Δt between samples (s).
    pub min_dt_s: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            stationary_threshold: 0.12,
            stationary_samples: 6,
            bias_alpha: 0.2,
            deadzone: 0.05,
            damping: 1.0,
            min_dt_s: 0.001,
        }
    }
}

/// Parameters for georeferencing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Meters per degree of latitude (flat-Earth approximation).
    pub meters_per_degree: f64,
    /// Fixes closer than this to a stored point are duplicates (m).
    pub dedup_radius_m: f64,
    /// Drop fixes whose accuracy radius exceeds this (m). `None` keeps all.
    pub max_accuracy_m: Option<f64>,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            meters_per_degree: 111_320.0,
            dedup_radius_m: 0.5,
            max_accuracy_m: None,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrConfig {
    pub heading: HeadingConfig,
    pub motion: MotionConfig,
    pub geo: GeoConfig,
}

impl DrConfig {
    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| DrError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: DrConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the estimator's invariants.
    pub fn validate(&self) -> Result<()> {
        let h = &self.heading;
        check(h.alpha > 0.0 && h.alpha <= 1.0, "heading.alpha must be in (0, 1]")?;
        check(
            h.tilt_threshold_deg.is_finite() && h.tilt_threshold_deg >= 0.0,
            "heading.tilt_threshold_deg must be >= 0",
        )?;
        check(
            h.interference_threshold_deg.is_finite() && h.interference_threshold_deg > 0.0,
            "heading.interference_threshold_deg must be > 0",
        )?;
        check(
            h.calibration_pulse_ms.is_finite() && h.calibration_pulse_ms >= 0.0,
            "heading.calibration_pulse_ms must be >= 0",
        )?;

        let m = &self.motion;
        check(
            m.stationary_threshold.is_finite() && m.stationary_threshold >= 0.0,
            "motion.stationary_threshold must be >= 0",
        )?;
        check(m.stationary_samples >= 1, "motion.stationary_samples must be >= 1")?;
        check(
            m.bias_alpha > 0.0 && m.bias_alpha <= 1.0,
            "motion.bias_alpha must be in (0, 1]",
        )?;
        check(
            m.deadzone.is_finite() && m.deadzone >= 0.0,
            "motion.deadzone must be >= 0",
        )?;
        check(
            m.damping.is_finite() && m.damping >= 0.0,
            "motion.damping must be >= 0",
        )?;
        check(
            m.min_dt_s.is_finite() && m.min_dt_s > 0.0,
            "motion.min_dt_s must be > 0",
        )?;

        let g = &self.geo;
        check(
            g.meters_per_degree.is_finite() && g.meters_per_degree > 0.0,
            "geo.meters_per_degree must be > 0",
        )?;
        check(
            g.dedup_radius_m.is_finite() && g.dedup_radius_m >= 0.0,
            "geo.dedup_radius_m must be >= 0",
        )?;
        if let Some(limit) = g.max_accuracy_m {
            check(
                limit.is_finite() && limit > 0.0,
                "geo.max_accuracy_m must be > 0 when set",
            )?;
        }
        Ok(())
    }
}

fn check(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(DrError::InvalidConfig(message.to_string()))
    }
}
