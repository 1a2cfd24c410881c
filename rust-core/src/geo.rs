//! Georeferencing of the dead-reckoned path.
//!
//! The local path lives in meters relative to the session origin. To compare
//! it against satellite fixes it is anchored at the first accepted fix and
//! converted to degrees with a flat-Earth (local tangent plane)
//! approximation:
//!
//! ```text
//! meters_per_lat_degree = 111320
//! meters_per_lon_degree = 111320 · cos(anchor_latitude)
//! latitude  = anchor_latitude  + y / meters_per_lat_degree
//! longitude = anchor_longitude + x / meters_per_lon_degree
//! ```
//!
//! Only valid over tens to low hundreds of meters and away from the poles.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::GeoConfig;
use crate::signal::wrap_180;
use crate::trajectory::Path;
use crate::types::{GeoFix, GeoPoint, Vec2};

/// Meters per degree of longitude at `latitude_deg`.
pub fn meters_per_lon_degree(latitude_deg: f64, meters_per_degree: f64) -> f64 {
    meters_per_degree * latitude_deg.to_radians().cos()
}

/// Project one local point onto geographic coordinates around `anchor`.
///
/// Longitudes that cross the antimeridian are wrapped back into [-180, 180].
/// Returns `None` when the result would not be finite.
pub fn project_point(point: Vec2, anchor: GeoPoint, meters_per_degree: f64) -> Option<GeoPoint> {
    let lon_scale = meters_per_lon_degree(anchor.latitude, meters_per_degree);
    if !(lon_scale.is_finite() && lon_scale > 0.0) {
        return None;
    }
    let longitude = anchor.longitude + point.x / lon_scale;
    let projected = GeoPoint::new(
        anchor.latitude + point.y / meters_per_degree,
        // In-range values pass through untouched
        if (-180.0..=180.0).contains(&longitude) {
            longitude
        } else {
            wrap_180(longitude)
        },
    );
    projected.is_finite().then_some(projected)
}

/// Project a whole path around an anchor fix.
///
/// Needs at least two points and an anchor; otherwise, or if any point
/// fails to project, the trace is empty.
pub fn project_path(path: &[Vec2], anchor: Option<&GeoFix>, meters_per_degree: f64) -> Vec<GeoPoint> {
    let anchor = match anchor {
        Some(fix) if path.len() >= 2 => fix.point(),
        _ => return Vec::new(),
    };
    path.iter()
        .map(|p| project_point(*p, anchor, meters_per_degree))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

/// Flat-Earth distance in meters, scaled at `reference`'s latitude.
pub fn flat_earth_distance_m(reference: GeoPoint, other: GeoPoint, meters_per_degree: f64) -> f64 {
    let dy = (other.latitude - reference.latitude) * meters_per_degree;
    let dx = wrap_180(other.longitude - reference.longitude)
        * meters_per_lon_degree(reference.latitude, meters_per_degree);
    dx.hypot(dy)
}

/// Summary of how the dead-reckoned trace compares to ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub anchor: Option<GeoPoint>,
    pub projected_points: usize,
    pub ground_truth_points: usize,
    /// Polyline length of the dead-reckoned path (m).
    pub dr_path_length_m: f64,
    /// Polyline length of the ground-truth trace (m).
    pub ground_truth_length_m: f64,
    /// Distance between the latest projected point and the latest fix (m).
    pub latest_offset_m: Option<f64>,
}

/// Fix ingestion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoStats {
    pub fixes_received: u64,
    pub fixes_dropped: u64,
    pub duplicates: u64,
}

/// Anchors the path to the first fix and keeps the ground-truth trace.
pub struct GeoreferencingCorrelator {
    config: GeoConfig,

    anchor: Option<GeoFix>,
    ground_truth: Vec<GeoPoint>,

    // Projected trace and the path generation it was built from
    projected: Vec<GeoPoint>,
    synced_generation: Option<u64>,

    stats: GeoStats,
}

impl GeoreferencingCorrelator {
    pub fn new(config: GeoConfig) -> Self {
        Self {
            config,
            anchor: None,
            ground_truth: Vec::new(),
            projected: Vec::new(),
            synced_generation: None,
            stats: GeoStats::default(),
        }
    }

    /// Create with default configuration.
    pub fn default_correlator() -> Self {
        Self::new(GeoConfig::default())
    }

    /// Add a fix to the ground-truth trace unless it duplicates a stored point.
    ///
    /// The first accepted fix becomes the anchor.
    pub fn ingest_ground_truth(&mut self, fix: &GeoFix) -> &[GeoPoint] {
        self.stats.fixes_received += 1;

        if !fix.is_well_formed() {
            self.stats.fixes_dropped += 1;
            return &self.ground_truth;
        }
        if let Some(limit) = self.config.max_accuracy_m {
            if fix.accuracy_m > limit {
                self.stats.fixes_dropped += 1;
                debug!(accuracy_m = fix.accuracy_m, limit_m = limit, "fix dropped: poor accuracy");
                return &self.ground_truth;
            }
        }

        if self.anchor.is_none() {
            info!(lat = fix.latitude, lon = fix.longitude, "georeferencing anchor acquired");
            self.anchor = Some(*fix);
            // Anchor changed: the projection must be rebuilt
            self.synced_generation = None;
        }

        let candidate = fix.point();
        if self.is_duplicate(candidate) {
            self.stats.duplicates += 1;
            trace!(lat = fix.latitude, lon = fix.longitude, "duplicate fix suppressed");
        } else {
            self.ground_truth.push(candidate);
        }
        &self.ground_truth
    }

    /// Bring the projected trace up to date with `path`.
    ///
    /// Appends projections of new points; rebuilds from scratch after a path
    /// reset or an anchor change.
    pub fn sync_projection(&mut self, path: &Path) {
        let anchor = match self.anchor {
            Some(anchor) if path.len() >= 2 => anchor,
            _ => {
                self.projected.clear();
                self.synced_generation = None;
                return;
            }
        };

        let rebuild = self.synced_generation != Some(path.generation())
            || self.projected.is_empty()
            || self.projected.len() > path.len();

        if rebuild {
            self.projected = project_path(path.points(), Some(&anchor), self.config.meters_per_degree);
        } else {
            let fresh: Option<Vec<GeoPoint>> = path.points()[self.projected.len()..]
                .iter()
                .map(|p| project_point(*p, anchor.point(), self.config.meters_per_degree))
                .collect();
            match fresh {
                Some(points) => self.projected.extend(points),
                None => self.projected.clear(),
            }
        }
        self.synced_generation = Some(path.generation());
    }

    pub fn anchor(&self) -> Option<&GeoFix> {
        self.anchor.as_ref()
    }

    pub fn projected_trace(&self) -> &[GeoPoint] {
        &self.projected
    }

    pub fn ground_truth_trace(&self) -> &[GeoPoint] {
        &self.ground_truth
    }

    pub fn stats(&self) -> GeoStats {
        self.stats
    }

    /// Compare the projected trace with ground truth.
    pub fn report(&self, path: &Path) -> CorrelationReport {
        let mpd = self.config.meters_per_degree;
        let ground_truth_length_m = self
            .ground_truth
            .windows(2)
            .map(|pair| flat_earth_distance_m(pair[0], pair[1], mpd))
            .sum();
        let latest_offset_m = match (self.ground_truth.last(), self.projected.last()) {
            (Some(truth), Some(estimate)) => Some(flat_earth_distance_m(*truth, *estimate, mpd)),
            _ => None,
        };

        CorrelationReport {
            anchor: self.anchor.map(|fix| fix.point()),
            projected_points: self.projected.len(),
            ground_truth_points: self.ground_truth.len(),
            dr_path_length_m: path.length_m(),
            ground_truth_length_m,
            latest_offset_m,
        }
    }

    /// Forget the anchor and both traces.
    pub fn clear(&mut self) {
        self.anchor = None;
        self.ground_truth.clear();
        self.projected.clear();
        self.synced_generation = None;
    }

    // =========================================================================
    // PRIVATE METHODS
    // =========================================================================

    fn is_duplicate(&self, candidate: GeoPoint) -> bool {
        let radius = self.config.dedup_radius_m;
        let mpd = self.config.meters_per_degree;
        self.ground_truth
            .iter()
            .any(|stored| flat_earth_distance_m(*stored, candidate, mpd) < radius)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const MPD: f64 = 111_320.0;

    fn fix(lat: f64, lon: f64) -> GeoFix {
        GeoFix::new(lat, lon, 5.0, 0.0)
    }

    #[test]
    fn test_projection_round_trip_one_degree_north() {
        let anchor = fix(0.0, 0.0);
        let trace = project_path(&[Vec2::ZERO, Vec2::new(0.0, 111_320.0)], Some(&anchor), MPD);
        assert_eq!(trace.len(), 2);
        assert_abs_diff_eq!(trace[1].latitude, 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(trace[1].longitude, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_projection_scales_longitude_by_latitude() {
        let anchor = GeoPoint::new(60.0, 10.0);
        // cos(60°) = 0.5, so 55660 m east is one degree
        let p = project_point(Vec2::new(55_660.0, 0.0), anchor, MPD).unwrap();
        assert_abs_diff_eq!(p.longitude, 11.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.latitude, 60.0, epsilon = 1e-12);
    }

    #[test]
    fn test_projection_wraps_across_antimeridian() {
        let anchor = GeoPoint::new(0.0, 179.9995);
        // 111.32 m is 0.001° at the equator
        let east = project_point(Vec2::new(111.32, 0.0), anchor, MPD).unwrap();
        assert!((-180.0..=180.0).contains(&east.longitude));
        assert_abs_diff_eq!(east.longitude, -179.9995, epsilon = 1e-9);

        let anchor = GeoPoint::new(0.0, -179.9995);
        let west = project_point(Vec2::new(-111.32, 0.0), anchor, MPD).unwrap();
        assert_abs_diff_eq!(west.longitude, 179.9995, epsilon = 1e-9);

        // Distance to the anchor is unaffected by the wrap
        let d = flat_earth_distance_m(GeoPoint::new(0.0, 179.9995), east, MPD);
        assert_abs_diff_eq!(d, 111.32, epsilon = 1e-6);
    }

    #[test]
    fn test_projection_requires_two_points_and_anchor() {
        let anchor = fix(45.0, 7.0);
        assert!(project_path(&[Vec2::ZERO], Some(&anchor), MPD).is_empty());
        assert!(project_path(&[Vec2::ZERO, Vec2::new(1.0, 1.0)], None, MPD).is_empty());
    }

    #[test]
    fn test_flat_earth_distance() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0 / MPD);
        assert_abs_diff_eq!(flat_earth_distance_m(a, b, MPD), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_flat_earth_distance_across_antimeridian() {
        let a = GeoPoint::new(0.0, 179.999_999);
        let b = GeoPoint::new(0.0, -179.999_999);
        assert!(flat_earth_distance_m(a, b, MPD) < 1.0);
    }

    #[test]
    fn test_first_fix_becomes_anchor() {
        let mut correlator = GeoreferencingCorrelator::default_correlator();
        assert!(correlator.anchor().is_none());
        correlator.ingest_ground_truth(&fix(45.0, 7.0));
        correlator.ingest_ground_truth(&fix(45.001, 7.0));
        assert_eq!(correlator.anchor().map(|a| a.latitude), Some(45.0));
        assert_eq!(correlator.ground_truth_trace().len(), 2);
    }

    #[test]
    fn test_ground_truth_dedup() {
        let mut correlator = GeoreferencingCorrelator::default_correlator();
        correlator.ingest_ground_truth(&fix(0.0, 0.0));
        let trace = correlator.ingest_ground_truth(&fix(0.0, 0.3 / MPD));
        assert_eq!(trace.len(), 1);

        let mut correlator = GeoreferencingCorrelator::default_correlator();
        correlator.ingest_ground_truth(&fix(0.0, 0.0));
        let trace = correlator.ingest_ground_truth(&fix(0.0, 1.0 / MPD));
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn test_dedup_checks_every_stored_point() {
        let mut correlator = GeoreferencingCorrelator::default_correlator();
        correlator.ingest_ground_truth(&fix(0.0, 0.0));
        correlator.ingest_ground_truth(&fix(0.0, 10.0 / MPD));
        // Back near the first point
        correlator.ingest_ground_truth(&fix(0.0, 0.2 / MPD));
        assert_eq!(correlator.ground_truth_trace().len(), 2);
        assert_eq!(correlator.stats().duplicates, 1);
    }

    #[test]
    fn test_invalid_fixes_dropped() {
        let mut correlator = GeoreferencingCorrelator::default_correlator();
        correlator.ingest_ground_truth(&fix(f64::NAN, 0.0));
        correlator.ingest_ground_truth(&fix(95.0, 0.0));
        assert!(correlator.anchor().is_none());
        assert!(correlator.ground_truth_trace().is_empty());
        assert_eq!(correlator.stats().fixes_dropped, 2);
    }

    #[test]
    fn test_accuracy_gate() {
        let config = GeoConfig {
            max_accuracy_m: Some(20.0),
            ..GeoConfig::default()
        };
        let mut correlator = GeoreferencingCorrelator::new(config);
        correlator.ingest_ground_truth(&GeoFix::new(45.0, 7.0, 50.0, 0.0));
        assert!(correlator.anchor().is_none());
        correlator.ingest_ground_truth(&GeoFix::new(45.1, 7.0, 10.0, 1.0));
        assert_eq!(correlator.anchor().map(|a| a.latitude), Some(45.1));
    }

    #[test]
    fn test_projection_sync_is_incremental_and_rebuilds_on_reset() {
        let mut correlator = GeoreferencingCorrelator::default_correlator();
        let mut path = Path::new();
        path.push(Vec2::new(1.0, 0.0));

        correlator.sync_projection(&path);
        assert!(correlator.projected_trace().is_empty(), "no anchor yet");

        correlator.ingest_ground_truth(&fix(10.0, 20.0));
        correlator.sync_projection(&path);
        assert_eq!(correlator.projected_trace().len(), 2);

        path.push(Vec2::new(2.0, 0.0));
        correlator.sync_projection(&path);
        assert_eq!(correlator.projected_trace().len(), 3);
        let expected = project_path(path.points(), correlator.anchor(), MPD);
        assert_eq!(correlator.projected_trace(), expected.as_slice());

        path.reset();
        correlator.sync_projection(&path);
        assert!(correlator.projected_trace().is_empty());

        path.push(Vec2::new(0.0, 5.0));
        correlator.sync_projection(&path);
        assert_eq!(correlator.projected_trace().len(), 2);
        assert_abs_diff_eq!(correlator.projected_trace()[1].longitude, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_report_offsets() {
        let mut correlator = GeoreferencingCorrelator::default_correlator();
        let mut path = Path::new();
        path.push(Vec2::new(0.0, 10.0));

        correlator.ingest_ground_truth(&fix(0.0, 0.0));
        correlator.ingest_ground_truth(&fix(10.0 / MPD, 0.0));
        correlator.sync_projection(&path);

        let report = correlator.report(&path);
        assert_eq!(report.projected_points, 2);
        assert_eq!(report.ground_truth_points, 2);
        assert_abs_diff_eq!(report.dr_path_length_m, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.ground_truth_length_m, 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(report.latest_offset_m.unwrap(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_clear_forgets_anchor() {
        let mut correlator = GeoreferencingCorrelator::default_correlator();
        correlator.ingest_ground_truth(&fix(1.0, 1.0));
        correlator.clear();
        assert!(correlator.anchor().is_none());
        assert!(correlator.ground_truth_trace().is_empty());
    }
}
