//! Inertial Motion Integration Module.
//!
//! Turns gravity-removed device-frame acceleration plus the current heading
//! into world-frame velocity, position and a path:
//! - Stationary detection with bias learning and velocity clamping (ZUPT)
//! - Bias correction and deadzone suppression of residual noise
//! - Rotation into the world frame by heading
//! - Damped semi-implicit Euler integration
//!
//! Every step is computed on candidates first and committed only if all of
//! them are finite, so a bad sample can never poison the state.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::MotionConfig;
use crate::signal::{deadzone_vec, BiasEstimator, StationaryDetector};
use crate::trajectory::Path;
use crate::types::{HeadingState, MotionSample, MotionState, Vec2};

/// Per-outcome sample counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionStats {
    /// Samples that advanced position.
    pub accepted: u64,
    /// Samples absorbed while stationary.
    pub stationary: u64,
    /// Baseline seeds, duplicates, regressions and sub-minimum Δt.
    pub timing_rejected: u64,
    /// Samples with non-finite fields.
    pub malformed: u64,
    /// Samples whose derived values went non-finite.
    pub non_finite: u64,
}

/// Outcome of a single motion update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    Integrated,
    Stationary,
    /// First sample after start/reset: only the timestamp baseline is set.
    Seeded,
    TimingRejected,
    Malformed,
    NonFinite,
}

/// Dead-reckoning integrator for linear acceleration.
pub struct MotionIntegrator {
    config: MotionConfig,

    // Integration state
    velocity: Vec2,
    position: Vec2,
    last_timestamp_ms: Option<f64>,

    // Calibration state, survives reset
    bias: BiasEstimator,
    stationary: StationaryDetector,

    // History
    path: Path,

    // Statistics
    stats: MotionStats,
    last_outcome: Option<MotionOutcome>,
}

impl MotionIntegrator {
    /// Create a new integrator at the origin.
    pub fn new(config: MotionConfig) -> Self {
        Self {
            bias: BiasEstimator::new(config.bias_alpha),
            stationary: StationaryDetector::new(
                config.stationary_threshold,
                config.stationary_samples,
            ),
            config,
            velocity: Vec2::ZERO,
            position: Vec2::ZERO,
            last_timestamp_ms: None,
            path: Path::new(),
            stats: MotionStats::default(),
            last_outcome: None,
        }
    }

    /// Create with default configuration.
    pub fn default_integrator() -> Self {
        Self::new(MotionConfig::default())
    }

    /// Integrate one motion sample using the given committed heading.
    pub fn update(&mut self, sample: &MotionSample, heading: &HeadingState) -> MotionState {
        let outcome = self.step(sample, heading);
        self.last_outcome = Some(outcome);
        self.state()
    }

    /// Get the current motion state.
    pub fn state(&self) -> MotionState {
        MotionState {
            velocity: self.velocity,
            position: self.position,
            acceleration_bias: self.bias.bias(),
            stationary_sample_count: self.stationary.count(),
            last_sample_timestamp_ms: self.last_timestamp_ms,
        }
    }

    /// Get the dead-reckoned path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the current speed (m/s).
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    pub fn is_stationary(&self) -> bool {
        self.stationary.is_stationary()
    }

    pub fn stats(&self) -> MotionStats {
        self.stats
    }

    /// Outcome of the most recent update, if any.
    pub fn last_outcome(&self) -> Option<MotionOutcome> {
        self.last_outcome
    }

    /// Zero velocity, position and path and forget the timestamp baseline.
    ///
    /// Bias and the stationary run are hardware calibration and are kept.
    pub fn reset(&mut self) {
        self.velocity = Vec2::ZERO;
        self.position = Vec2::ZERO;
        self.path.reset();
        self.last_timestamp_ms = None;
        info!(
            bias_x = self.bias.bias().x,
            bias_y = self.bias.bias().y,
            "motion integrator reset"
        );
    }

    /// Forget only the timestamp baseline (stream unsubscribed).
    ///
    /// The next sample re-seeds Δt instead of integrating across the gap.
    pub fn clear_timestamp_baseline(&mut self) {
        self.last_timestamp_ms = None;
    }

    // =========================================================================
    // PRIVATE METHODS
    // =========================================================================

    fn step(&mut self, sample: &MotionSample, heading: &HeadingState) -> MotionOutcome {
        if !sample.is_well_formed() {
            self.stats.malformed += 1;
            return MotionOutcome::Malformed;
        }

        let t = sample.timestamp_ms;
        let last = match self.last_timestamp_ms {
            Some(last) => last,
            None => {
                self.last_timestamp_ms = Some(t);
                self.stats.timing_rejected += 1;
                return MotionOutcome::Seeded;
            }
        };

        let dt = (t - last) / 1000.0;
        if dt <= 0.0 || dt < self.config.min_dt_s {
            // The baseline never moves backwards
            self.last_timestamp_ms = Some(last.max(t));
            self.stats.timing_rejected += 1;
            debug!(t_ms = t, last_ms = last, "motion sample rejected: non-increasing timestamp");
            return MotionOutcome::TimingRejected;
        }

        let raw = sample.accel;
        let magnitude = raw.magnitude();
        if !magnitude.is_finite() {
            self.stats.non_finite += 1;
            debug!(t_ms = t, "motion sample discarded: non-finite magnitude");
            return MotionOutcome::NonFinite;
        }

        let was_stationary = self.stationary.is_stationary();
        let mut detector = self.stationary.clone();

        if detector.update(magnitude) {
            if !was_stationary {
                debug!(t_ms = t, "device stationary");
            }
            self.stationary = detector;
            self.bias.learn(raw);
            self.velocity = Vec2::ZERO;
            self.last_timestamp_ms = Some(t);
            self.stats.stationary += 1;
            return MotionOutcome::Stationary;
        }

        let corrected = deadzone_vec(self.bias.correct(raw), self.config.deadzone);
        let world = corrected.rotate(heading.heading_rad());

        let decay = (-self.config.damping * dt).exp();
        let velocity = (self.velocity + world.scale(dt)).scale(decay);
        let position = self.position + velocity.scale(dt);

        if !world.is_finite() || !velocity.is_finite() || !position.is_finite() {
            self.stats.non_finite += 1;
            debug!(t_ms = t, "motion sample discarded: non-finite integration result");
            return MotionOutcome::NonFinite;
        }

        if was_stationary {
            debug!(t_ms = t, "device moving");
        }
        self.stationary = detector;
        self.velocity = velocity;
        self.position = position;
        self.last_timestamp_ms = Some(t);
        self.path.push(position);
        self.stats.accepted += 1;
        MotionOutcome::Integrated
    }
}

// ============================================================================
// TESTS
// ============================================================================
