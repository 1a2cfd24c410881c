//! Export of session outputs for downstream consumers.
//!
//! A `SessionSnapshot` bundles everything the display and comparison code
//! reads: heading, motion state, the dead-reckoned path, the projected and
//! ground-truth traces, and the correlation summary. It is self-contained so
//! it can be streamed or written to disk as a single JSON document.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geo::{CorrelationReport, GeoStats};
use crate::motion::MotionStats;
use crate::types::{GeoPoint, HeadingState, MotionState, Vec2};

/// Point-in-time copy of all session outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub active: bool,
    /// Latest monotonic sensor timestamp (ms).
    pub clock_ms: Option<f64>,
    pub heading: HeadingState,
    /// Interference advisory at `clock_ms`.
    pub calibrating: bool,
    pub calibration_events: u64,
    pub motion: MotionState,
    pub motion_stats: MotionStats,
    pub geo_stats: GeoStats,
    pub path: Vec<Vec2>,
    pub projected_trace: Vec<GeoPoint>,
    pub ground_truth_trace: Vec<GeoPoint>,
    pub correlation: CorrelationReport,
}

impl SessionSnapshot {
    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Trajectory-only view: the local path and its projection.
    pub fn trajectory_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct TrajectoryView<'a> {
            point_count: usize,
            path: &'a [Vec2],
            projected_trace: &'a [GeoPoint],
        }

        Ok(serde_json::to_string(&TrajectoryView {
            point_count: self.path.len(),
            path: &self.path,
            projected_trace: &self.projected_trace,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use crate::session::Session;
    use crate::types::{GeoFix, MotionSample, OrientationSample};

    use super::*;

    fn populated_session() -> Session {
        let mut session = Session::default();
        session.start();
        session.on_fix(GeoFix::new(52.0, 13.0, 4.0, 0.0));
        session.on_orientation(OrientationSample::new(0.0, 45.0, 0.0, 0.0));
        session.on_motion(MotionSample::new(0.0, 0.0, 0.0));
        for i in 1..=10 {
            session.on_motion(MotionSample::new(i as f64 * 20.0, 1.0, 0.5));
        }
        session
    }

    #[test]
    fn test_snapshot_reflects_session() {
        let session = populated_session();
        let snapshot = session.snapshot();
        assert!(snapshot.active);
        assert_eq!(snapshot.path.len(), 11);
        assert_eq!(snapshot.projected_trace.len(), 11);
        assert_eq!(snapshot.ground_truth_trace.len(), 1);
        assert_eq!(snapshot.motion_stats.accepted, 10);
        assert_eq!(snapshot.correlation.anchor, Some(GeoPoint::new(52.0, 13.0)));
    }

    #[test]
    fn test_snapshot_json_restores() {
        let snapshot = populated_session().snapshot();
        let json = snapshot.to_json().unwrap();
        let restored = SessionSnapshot::from_json(&json).unwrap();
        assert_eq!(restored.path.len(), snapshot.path.len());
        assert_eq!(restored.motion_stats, snapshot.motion_stats);
        assert_eq!(restored.correlation.anchor, snapshot.correlation.anchor);
    }

    #[test]
    fn test_trajectory_json_fields() {
        let snapshot = populated_session().snapshot();
        let json = snapshot.trajectory_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["point_count"], 11);
        assert!(value["projected_trace"].is_array());
    }
}
