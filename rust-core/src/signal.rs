//! Signal filtering primitives shared by the heading and motion stages.
//!
//! This module provides the low-level, O(1)-per-sample building blocks:
//! - Angle wrapping and shortest-path angular differences
//! - Exponential smoothing (scalar and angular)
//! - Deadzone suppression of residual sensor noise
//! - Stationary detection by consecutive low-magnitude samples
//! - Acceleration bias learning during known-still periods
//!
//! Design note: every filter keeps incremental state only. No history
//! buffers, no allocations in the hot path.

use crate::types::Vec2;

/// Wrap an angle in degrees into [0, 360).
pub fn wrap_360(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round a tiny negative input up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle in degrees into [-180, 180).
pub fn wrap_180(deg: f64) -> f64 {
    wrap_360(deg + 180.0) - 180.0
}

/// Shortest unsigned angular distance between two headings, in [0, 180].
pub fn angular_distance(a_deg: f64, b_deg: f64) -> f64 {
    wrap_180(a_deg - b_deg).abs()
}

/// One step of exponential smoothing: α·new + (1−α)·previous.
pub fn exp_smooth(previous: f64, new: f64, alpha: f64) -> f64 {
    alpha * new + (1.0 - alpha) * previous
}

/// Exponential smoothing of a heading along the shortest arc.
///
/// Identical to [`exp_smooth`] when both angles sit on the same side of the
/// 0/360 seam; across the seam it departs from the plain `α·new + (1−α)·prev`
/// formula and moves through north instead of south (355° → 5° steps to 357°,
/// not 285°).
pub fn exp_smooth_angle(previous_deg: f64, new_deg: f64, alpha: f64) -> f64 {
    wrap_360(previous_deg + alpha * wrap_180(new_deg - previous_deg))
}

/// Zero a value whose magnitude is at or below `threshold`.
pub fn deadzone(value: f64, threshold: f64) -> f64 {
    if value.abs() <= threshold {
        0.0
    } else {
        value
    }
}

/// Component-wise [`deadzone`].
pub fn deadzone_vec(v: Vec2, threshold: f64) -> Vec2 {
    Vec2::new(deadzone(v.x, threshold), deadzone(v.y, threshold))
}

/// Declares the device stationary after N consecutive quiet samples.
#[derive(Debug, Clone)]
pub struct StationaryDetector {
    /// Magnitude below which a sample is quiet (m/s²).
    threshold: f64,
    /// Quiet samples required before declaring stationary.
    required: u32,
    /// Current run of quiet samples.
    count: u32,
}

impl StationaryDetector {
    pub fn new(threshold: f64, required: u32) -> Self {
        Self {
            threshold,
            required,
            count: 0,
        }
    }

    /// Feed one raw magnitude. Returns true while stationary.
    pub fn update(&mut self, magnitude: f64) -> bool {
        if magnitude < self.threshold {
            self.count = self.count.saturating_add(1);
        } else {
            self.count = 0;
        }
        self.is_stationary()
    }

    pub fn is_stationary(&self) -> bool {
        self.count >= self.required
    }

    /// Current run length of quiet samples.
    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Learns a slowly-varying acceleration bias.
///
/// Only fed while the device is known to be still, so any reading is
/// attributed to sensor offset rather than motion.
#[derive(Debug, Clone)]
pub struct BiasEstimator {
    bias: Vec2,
    alpha: f64,
}

impl BiasEstimator {
    pub fn new(alpha: f64) -> Self {
        Self {
            bias: Vec2::ZERO,
            alpha,
        }
    }

    /// Pull the bias estimate toward a raw still-period reading.
    pub fn learn(&mut self, raw: Vec2) {
        self.bias = Vec2::new(
            exp_smooth(self.bias.x, raw.x, self.alpha),
            exp_smooth(self.bias.y, raw.y, self.alpha),
        );
    }

    /// Remove the learned bias from a raw reading.
    pub fn correct(&self, raw: Vec2) -> Vec2 {
        raw - self.bias
    }

    pub fn bias(&self) -> Vec2 {
        self.bias
    }
}

// ============================================================================
// TESTS
// ============================================================================
