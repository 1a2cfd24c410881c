//! Heading Estimation Module.
//!
//! Turns raw orientation events into a stable heading:
//! - Tilt compensation when the device is pitched or rolled
//! - Exponential low-pass filtering of the compensated reading
//! - Platform normalization (compass-native inversion, screen rotation)
//! - Magnetic interference detection (advisory calibrating pulse)
//!
//! Heading is what rotates device-frame acceleration into the world frame,
//! so every published value is kept in [0, 360) and never non-finite.

use tracing::trace;

use crate::calibration::CalibrationPulse;
use crate::config::HeadingConfig;
use crate::signal::{angular_distance, exp_smooth_angle, wrap_360};
use crate::types::{HeadingState, OrientationSample};

/// Heading estimator driven by orientation samples.
pub struct HeadingEstimator {
    config: HeadingConfig,

    // Committed state
    state: HeadingState,

    // Interference advisory
    pulse: CalibrationPulse,

    // Statistics
    sample_count: u64,
    tilt_compensated_count: u64,
}

impl HeadingEstimator {
    /// Create a new heading estimator.
    pub fn new(config: HeadingConfig) -> Self {
        Self {
            state: HeadingState::new(config.alpha),
            pulse: CalibrationPulse::new(config.calibration_pulse_ms),
            config,
            sample_count: 0,
            tilt_compensated_count: 0,
        }
    }

    /// Create with default configuration.
    pub fn default_estimator() -> Self {
        Self::new(HeadingConfig::default())
    }

    /// Process one orientation sample and return the committed heading state.
    ///
    /// Malformed samples and samples whose derived values are non-finite
    /// leave the state untouched; the previous state is returned.
    pub fn update(&mut self, sample: &OrientationSample) -> HeadingState {
        if !sample.is_well_formed() {
            return self.state;
        }

        let tilted = self.is_tilted(sample);
        let compensated = if tilted {
            tilt_compensated_heading(sample.azimuth_deg, sample.pitch_deg, sample.roll_deg)
        } else {
            // Near level the correction is negligible; use the raw azimuth
            wrap_360(sample.azimuth_deg)
        };
        let previous = if self.state.is_uninitialized() {
            None
        } else {
            Some(self.state.filtered_deg)
        };

        // First reading seeds the filter directly
        let filtered = match previous {
            Some(prev) => exp_smooth_angle(prev, compensated, self.config.alpha),
            None => compensated,
        };
        let heading = self.normalize_platform(filtered, sample);

        if !compensated.is_finite() || !filtered.is_finite() || !heading.is_finite() {
            return self.state;
        }

        // Compared against the previous filtered value, before it is replaced
        if let Some(prev) = previous {
            let jump = angular_distance(compensated, prev);
            if jump > self.config.interference_threshold_deg {
                trace!(jump_deg = jump, t_ms = sample.timestamp_ms, "calibrating pulse raised");
                self.pulse.raise(sample.timestamp_ms);
            }
        }

        self.state = HeadingState {
            filtered_deg: filtered,
            heading_deg: heading,
            last_raw_deg: Some(compensated),
            alpha: self.config.alpha,
        };
        self.sample_count += 1;
        if tilted {
            self.tilt_compensated_count += 1;
        }
        self.state
    }

    /// Get the committed heading state.
    pub fn state(&self) -> HeadingState {
        self.state
    }

    /// Get the platform-normalized heading in degrees.
    pub fn heading_deg(&self) -> f64 {
        self.state.heading_deg
    }

    /// Whether the interference advisory is up at `now_ms`.
    pub fn is_calibrating(&self, now_ms: f64) -> bool {
        self.pulse.is_active(now_ms)
    }

    /// Drop any pending calibrating pulse (session teardown).
    pub fn clear_calibration(&mut self) {
        self.pulse.clear();
    }

    /// Number of interference pulses raised so far.
    pub fn calibration_events(&self) -> u64 {
        self.pulse.raise_count()
    }

    /// Number of accepted samples.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Number of accepted samples that needed tilt compensation.
    pub fn tilt_compensated_count(&self) -> u64 {
        self.tilt_compensated_count
    }

    /// Forget the filter state so the next sample re-seeds it.
    pub fn reset(&mut self) {
        self.state = HeadingState::new(self.config.alpha);
        self.pulse.clear();
        self.sample_count = 0;
        self.tilt_compensated_count = 0;
    }

    // =========================================================================
    // PRIVATE METHODS
    // =========================================================================

    fn is_tilted(&self, sample: &OrientationSample) -> bool {
        sample.pitch_deg.abs() > self.config.tilt_threshold_deg
            || sample.roll_deg.abs() > self.config.tilt_threshold_deg
    }

    fn normalize_platform(&self, filtered_deg: f64, sample: &OrientationSample) -> f64 {
        if sample.compass_native {
            wrap_360(360.0 - filtered_deg)
        } else if let Some(rotation) = sample.screen_rotation_deg {
            wrap_360(filtered_deg + rotation)
        } else {
            filtered_deg
        }
    }
}

/// Tilt-compensated heading from azimuth/pitch/roll, in [0, 360).
///
/// Pitch is undone first: the device direction `cos β·y − sin β·z` is the one
/// pitch carries onto the horizontal plane. Roll then swings that direction
/// off the azimuth by
///
/// ```text
/// δ = atan2(sin β · sin γ, cos² β + sin² β · cos γ)
/// ```
///
/// and the result is `azimuth + δ`. With either angle at zero δ vanishes, and
/// for small tilt δ ≈ β·γ, so the output is continuous with the raw azimuth
/// used below the tilt threshold.
pub fn tilt_compensated_heading(azimuth_deg: f64, pitch_deg: f64, roll_deg: f64) -> f64 {
    let (sin_b, cos_b) = pitch_deg.to_radians().sin_cos();
    let (sin_g, cos_g) = roll_deg.to_radians().sin_cos();

    let swing = (sin_b * sin_g).atan2(cos_b * cos_b + sin_b * sin_b * cos_g);

    wrap_360(azimuth_deg + swing.to_degrees())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn level(t: f64, azimuth: f64) -> OrientationSample {
        OrientationSample::new(t, azimuth, 0.0, 0.0)
    }

    #[test]
    fn test_first_sample_seeds_filter() {
        let mut estimator = HeadingEstimator::default_estimator();
        let state = estimator.update(&level(0.0, 123.0));
        assert_abs_diff_eq!(state.filtered_deg, 123.0);
        assert_abs_diff_eq!(state.heading_deg, 123.0);
        assert_eq!(state.last_raw_deg, Some(123.0));
    }

    #[test]
    fn test_low_pass_filtering() {
        let mut estimator = HeadingEstimator::default_estimator();
        estimator.update(&level(0.0, 10.0));
        let state = estimator.update(&level(20.0, 20.0));
        // 0.2 * 20 + 0.8 * 10
        assert_abs_diff_eq!(state.filtered_deg, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_filter_crosses_north_on_short_arc() {
        let mut estimator = HeadingEstimator::default_estimator();
        estimator.update(&level(0.0, 355.0));
        let state = estimator.update(&level(20.0, 5.0));
        assert_abs_diff_eq!(state.filtered_deg, 357.0, epsilon = 1e-9);
    }

    #[test]
    fn test_level_device_uses_raw_azimuth() {
        let mut estimator = HeadingEstimator::default_estimator();
        let state = estimator.update(&OrientationSample::new(0.0, 42.0, 4.9, -4.9));
        assert_abs_diff_eq!(state.filtered_deg, 42.0);
        assert_eq!(estimator.tilt_compensated_count(), 0);
    }

    #[test]
    fn test_upright_device_is_tilt_compensated() {
        let mut estimator = HeadingEstimator::default_estimator();
        let state = estimator.update(&OrientationSample::new(0.0, 30.0, 90.0, 0.0));
        assert_abs_diff_eq!(state.filtered_deg, 30.0, epsilon = 1e-9);
        assert_eq!(estimator.tilt_compensated_count(), 1);
    }

    #[test]
    fn test_roll_of_upright_device_swings_heading() {
        // Upright: δ = atan2(sin 30°, cos 30°) = 30°
        assert_abs_diff_eq!(tilt_compensated_heading(30.0, 90.0, 30.0), 60.0, epsilon = 1e-9);
        assert!(angular_distance(tilt_compensated_heading(30.0, 90.0, -30.0), 0.0) < 1e-9);
        // Flat device: roll alone does not change where it points
        assert_abs_diff_eq!(tilt_compensated_heading(30.0, 0.0, 60.0), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tilt_compensation_continuous_at_threshold() {
        for az in [0.0, 30.0, 179.0, 355.0] {
            for (pitch, roll) in [
                (5.1, 0.0),
                (-5.1, 0.0),
                (0.0, 5.1),
                (0.0, -5.1),
                (5.1, 5.1),
                (-5.1, 5.1),
                (5.1, -5.1),
            ] {
                let h = tilt_compensated_heading(az, pitch, roll);
                let gap = angular_distance(h, az);
                assert!(gap < 1.0, "az {} pitch {} roll {}: got {}", az, pitch, roll, h);
            }
        }
    }

    #[test]
    fn test_wobble_across_tilt_threshold_is_not_interference() {
        let mut estimator = HeadingEstimator::default_estimator();
        let wobble = [(4.9, 0.0), (5.1, 0.0), (-5.1, 0.0), (0.0, 5.1), (0.0, -5.1), (4.9, 4.9)];
        for (i, (pitch, roll)) in wobble.iter().enumerate() {
            let t = i as f64 * 20.0;
            let state = estimator.update(&OrientationSample::new(t, 30.0, *pitch, *roll));
            assert!(angular_distance(state.heading_deg, 30.0) < 0.5);
            assert!(!estimator.is_calibrating(t));
        }
        assert_eq!(estimator.calibration_events(), 0);
        assert_eq!(estimator.tilt_compensated_count(), 4);
    }

    #[test]
    fn test_dropped_sample_does_not_count_as_tilted() {
        let mut estimator = HeadingEstimator::default_estimator();
        estimator.update(&OrientationSample::new(0.0, 10.0, 30.0, 0.0));
        estimator.update(&OrientationSample::new(20.0, f64::NAN, 30.0, 0.0));
        estimator.update(&OrientationSample::new(40.0, 10.0, 30.0, f64::INFINITY));
        assert_eq!(estimator.tilt_compensated_count(), 1);
        assert_eq!(estimator.sample_count(), 1);
    }

    #[test]
    fn test_seam_crossing_is_not_interference() {
        // 355° -> 5° is a 10° turn through north, not a 350° jump
        let mut estimator = HeadingEstimator::default_estimator();
        estimator.update(&level(0.0, 355.0));
        let state = estimator.update(&level(20.0, 5.0));
        assert!(!estimator.is_calibrating(20.0));
        assert_eq!(estimator.calibration_events(), 0);
        assert_abs_diff_eq!(state.filtered_deg, 357.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tilt_compensated_heading_bounded() {
        for az in (-720..=720).step_by(45) {
            for pitch in (-180..=180).step_by(30) {
                for roll in (-90..=90).step_by(30) {
                    let h = tilt_compensated_heading(az as f64, pitch as f64, roll as f64);
                    assert!((0.0..360.0).contains(&h), "heading {} out of range", h);
                }
            }
        }
    }

    #[test]
    fn test_compass_native_inversion() {
        let mut estimator = HeadingEstimator::default_estimator();
        let state = estimator.update(&level(0.0, 90.0).with_compass_native());
        assert_abs_diff_eq!(state.heading_deg, 270.0);
        assert_abs_diff_eq!(state.filtered_deg, 90.0);

        let mut north = HeadingEstimator::default_estimator();
        let state = north.update(&level(0.0, 0.0).with_compass_native());
        assert_abs_diff_eq!(state.heading_deg, 0.0);
    }

    #[test]
    fn test_screen_rotation_added_modulo_360() {
        let mut estimator = HeadingEstimator::default_estimator();
        let state = estimator.update(&level(0.0, 300.0).with_screen_rotation(90.0));
        assert_abs_diff_eq!(state.heading_deg, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_compass_native_takes_precedence_over_rotation() {
        let mut estimator = HeadingEstimator::default_estimator();
        let sample = level(0.0, 100.0)
            .with_compass_native()
            .with_screen_rotation(90.0);
        let state = estimator.update(&sample);
        assert_abs_diff_eq!(state.heading_deg, 260.0);
    }

    #[test]
    fn test_malformed_sample_dropped() {
        let mut estimator = HeadingEstimator::default_estimator();
        let before = estimator.update(&level(0.0, 45.0));
        let after = estimator.update(&OrientationSample::new(10.0, f64::NAN, 0.0, 0.0));
        assert_eq!(before, after);
        assert_eq!(estimator.sample_count(), 1);

        let after = estimator.update(&OrientationSample::new(20.0, 90.0, f64::INFINITY, 0.0));
        assert_eq!(before, after);
    }

    #[test]
    fn test_calibration_pulse_on_large_jump() {
        let mut estimator = HeadingEstimator::default_estimator();
        estimator.update(&level(0.0, 10.0));
        assert!(!estimator.is_calibrating(0.0));

        estimator.update(&level(100.0, 35.0));
        assert!(estimator.is_calibrating(100.0));
        assert!(estimator.is_calibrating(2099.0));
        assert!(!estimator.is_calibrating(2100.0));
        assert_eq!(estimator.calibration_events(), 1);
    }

    #[test]
    fn test_small_changes_do_not_pulse() {
        let mut estimator = HeadingEstimator::default_estimator();
        for i in 0..50 {
            estimator.update(&level(i as f64 * 20.0, 10.0 + (i % 3) as f64));
        }
        assert_eq!(estimator.calibration_events(), 0);
    }

    #[test]
    fn test_pulse_does_not_block_update() {
        let mut estimator = HeadingEstimator::default_estimator();
        estimator.update(&level(0.0, 10.0));
        let state = estimator.update(&level(20.0, 110.0));
        assert_abs_diff_eq!(state.filtered_deg, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_heading_bounded_for_arbitrary_inputs() {
        let mut estimator = HeadingEstimator::default_estimator();
        let inputs = [-1e6, -360.0, -0.0, 359.999_999, 360.0, 720.5, 1e9];
        for (i, az) in inputs.iter().enumerate() {
            for pitch in [0.0, 45.0, -170.0] {
                let sample = OrientationSample::new(i as f64, *az, pitch, 10.0)
                    .with_screen_rotation(-270.0);
                let state = estimator.update(&sample);
                assert!((0.0..360.0).contains(&state.filtered_deg));
                assert!((0.0..360.0).contains(&state.heading_deg));
            }
        }
    }

    #[test]
    fn test_reset_reseeds_filter() {
        let mut estimator = HeadingEstimator::default_estimator();
        estimator.update(&level(0.0, 10.0));
        estimator.update(&level(20.0, 200.0));
        estimator.reset();

        assert!(estimator.state().is_uninitialized());
        assert!(!estimator.is_calibrating(30.0));
        let state = estimator.update(&level(40.0, 200.0));
        assert_abs_diff_eq!(state.filtered_deg, 200.0);
    }
}
