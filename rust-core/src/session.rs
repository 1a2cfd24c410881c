//! Monitoring session: the core's side of the session controller contract.
//!
//! A `Session` owns one instance of every pipeline stage and routes the three
//! input streams into them:
//! 1. **Orientation** -> `HeadingEstimator`
//! 2. **Motion** (+ committed heading) -> `MotionIntegrator`
//! 3. **Fix** -> `GeoreferencingCorrelator`
//!
//! Events are handled one at a time, run to completion, in arrival order.
//! A motion update always reads the heading committed before it started.
//!
//! Lifecycle: a session starts inactive. `start()` subscribes it to the
//! streams; `stop()` unsubscribes it, clears the calibrating pulse and the
//! motion timestamp baseline. Bias and the stationary run survive stop/start.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DrConfig;
use crate::export::SessionSnapshot;
use crate::geo::{CorrelationReport, GeoStats, GeoreferencingCorrelator};
use crate::heading::HeadingEstimator;
use crate::motion::{MotionIntegrator, MotionStats};
use crate::trajectory::Path;
use crate::types::{GeoFix, GeoPoint, HeadingState, MotionSample, MotionState, OrientationSample};

/// One event from any of the three input streams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensorEvent {
    Orientation(OrientationSample),
    Motion(MotionSample),
    Fix(GeoFix),
}

impl SensorEvent {
    /// Timestamp on the monotonic sensor clock, if the event carries one.
    ///
    /// Fix timestamps come from the receiver's clock and are not comparable.
    fn monotonic_ms(&self) -> Option<f64> {
        match self {
            SensorEvent::Orientation(s) => Some(s.timestamp_ms),
            SensorEvent::Motion(s) => Some(s.timestamp_ms),
            SensorEvent::Fix(_) => None,
        }
    }
}

/// Dead-reckoning monitoring session.
pub struct Session {
    config: DrConfig,

    // Processing stages
    heading: HeadingEstimator,
    motion: MotionIntegrator,
    correlator: GeoreferencingCorrelator,

    // Lifecycle
    active: bool,
    clock_ms: Option<f64>,
    events_ignored: u64,
}

impl Session {
    /// Create an inactive session with the given configuration.
    pub fn new(config: DrConfig) -> Self {
        Self {
            heading: HeadingEstimator::new(config.heading.clone()),
            motion: MotionIntegrator::new(config.motion.clone()),
            correlator: GeoreferencingCorrelator::new(config.geo.clone()),
            config,
            active: false,
            clock_ms: None,
            events_ignored: 0,
        }
    }

    /// Subscribe to the input streams.
    pub fn start(&mut self) {
        if !self.active {
            self.active = true;
            info!("session started");
        }
    }

    /// Unsubscribe from the input streams.
    pub fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.heading.clear_calibration();
            self.motion.clear_timestamp_baseline();
            info!(
                path_points = self.motion.path().len(),
                fixes = self.correlator.ground_truth_trace().len(),
                "session stopped"
            );
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Route one event. Returns false if the session is stopped and the
    /// event was ignored.
    pub fn dispatch(&mut self, event: &SensorEvent) -> bool {
        if !self.active {
            self.events_ignored += 1;
            return false;
        }

        if let Some(t) = event.monotonic_ms().filter(|t| t.is_finite()) {
            self.clock_ms = Some(self.clock_ms.map_or(t, |c| c.max(t)));
        }

        match event {
            SensorEvent::Orientation(sample) => {
                self.heading.update(sample);
            }
            SensorEvent::Motion(sample) => {
                // Snapshot the committed heading before integrating
                let heading = self.heading.state();
                self.motion.update(sample, &heading);
                self.correlator.sync_projection(self.motion.path());
            }
            SensorEvent::Fix(fix) => {
                self.correlator.ingest_ground_truth(fix);
                self.correlator.sync_projection(self.motion.path());
            }
        }
        true
    }

    /// Convenience wrapper for an orientation event.
    pub fn on_orientation(&mut self, sample: OrientationSample) -> bool {
        self.dispatch(&SensorEvent::Orientation(sample))
    }

    /// Convenience wrapper for a motion event.
    pub fn on_motion(&mut self, sample: MotionSample) -> bool {
        self.dispatch(&SensorEvent::Motion(sample))
    }

    /// Convenience wrapper for a ground-truth fix.
    pub fn on_fix(&mut self, fix: GeoFix) -> bool {
        self.dispatch(&SensorEvent::Fix(fix))
    }

    /// Zero velocity, position and path. Calibration, heading and ground
    /// truth are kept.
    pub fn reset(&mut self) {
        self.motion.reset();
        self.correlator.sync_projection(self.motion.path());
        info!("session reset");
    }

    // =========================================================================
    // READ ACCESSORS
    // =========================================================================

    pub fn config(&self) -> &DrConfig {
        &self.config
    }

    pub fn heading_state(&self) -> HeadingState {
        self.heading.state()
    }

    pub fn motion_state(&self) -> MotionState {
        self.motion.state()
    }

    pub fn motion_stats(&self) -> MotionStats {
        self.motion.stats()
    }

    pub fn geo_stats(&self) -> GeoStats {
        self.correlator.stats()
    }

    pub fn path(&self) -> &Path {
        self.motion.path()
    }

    pub fn projected_trace(&self) -> &[GeoPoint] {
        self.correlator.projected_trace()
    }

    pub fn ground_truth_trace(&self) -> &[GeoPoint] {
        self.correlator.ground_truth_trace()
    }

    pub fn anchor(&self) -> Option<&GeoFix> {
        self.correlator.anchor()
    }

    /// Calibrating signal evaluated at `now_ms`.
    pub fn calibrating(&self, now_ms: f64) -> bool {
        self.active && self.heading.is_calibrating(now_ms)
    }

    /// Calibrating signal evaluated at the latest sensor timestamp seen.
    pub fn is_calibrating(&self) -> bool {
        self.clock_ms.map_or(false, |now| self.calibrating(now))
    }

    /// Latest monotonic sensor timestamp seen.
    pub fn clock_ms(&self) -> Option<f64> {
        self.clock_ms
    }

    /// Events dropped because the session was stopped.
    pub fn events_ignored(&self) -> u64 {
        self.events_ignored
    }

    pub fn correlation(&self) -> CorrelationReport {
        self.correlator.report(self.motion.path())
    }

    /// Capture every output in one serializable value.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            active: self.active,
            clock_ms: self.clock_ms,
            heading: self.heading_state(),
            calibrating: self.is_calibrating(),
            calibration_events: self.heading.calibration_events(),
            motion: self.motion_state(),
            motion_stats: self.motion_stats(),
            geo_stats: self.geo_stats(),
            path: self.path().points().to_vec(),
            projected_trace: self.projected_trace().to_vec(),
            ground_truth_trace: self.ground_truth_trace().to_vec(),
            correlation: self.correlation(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DrConfig::default())
    }
}
