//! Core data types for the dead-reckoning engine.
//!
//! Inputs arrive as transient samples (orientation, motion, geographic fix)
//! and are consumed immediately. Outputs are small `Copy` state structs plus
//! the point sequences owned by the trajectory and georeferencing modules.
//!
//! Design principle: if a concept exists, it gets a type. Positions are
//! `Vec2` in meters, geographic coordinates are `GeoPoint` in degrees, and
//! the two never mix without going through the projection in `geo`.

use serde::{Deserialize, Serialize};

/// A 2D vector in the local world frame (x = east, y = north).
///
/// Used for acceleration (m/s²), velocity (m/s) and position (m).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// The zero vector (also the session origin).
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Distance to another point.
    pub fn distance_to(&self, other: &Vec2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn scale(&self, factor: f64) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }

    /// Rotate counter-clockwise by `angle_rad`.
    pub fn rotate(&self, angle_rad: f64) -> Vec2 {
        let (sin, cos) = angle_rad.sin_cos();
        Vec2::new(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
        )
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A geographic coordinate in degrees (WGS84 assumed, not enforced).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// A single orientation event from the host's attitude sensor.
///
/// Angles are in degrees. `compass_native` marks sources that already report
/// a compass heading (clockwise from north) instead of an azimuth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationSample {
    /// Monotonic timestamp in milliseconds (same clock as motion samples).
    pub timestamp_ms: f64,
    /// Rotation about the vertical axis.
    pub azimuth_deg: f64,
    /// Rotation about the device's lateral axis (front-back tilt).
    pub pitch_deg: f64,
    /// Rotation about the device's longitudinal axis (left-right tilt).
    pub roll_deg: f64,
    /// Platform reports a native compass heading.
    #[serde(default)]
    pub compass_native: bool,
    /// Current screen rotation, when the platform exposes it.
    #[serde(default)]
    pub screen_rotation_deg: Option<f64>,
}

impl OrientationSample {
    /// Creates a sample without platform hints.
    pub fn new(timestamp_ms: f64, azimuth_deg: f64, pitch_deg: f64, roll_deg: f64) -> Self {
        Self {
            timestamp_ms,
            azimuth_deg,
            pitch_deg,
            roll_deg,
            compass_native: false,
            screen_rotation_deg: None,
        }
    }

    /// Mark the sample as coming from a compass-heading-native source.
    pub fn with_compass_native(mut self) -> Self {
        self.compass_native = true;
        self
    }

    pub fn with_screen_rotation(mut self, rotation_deg: f64) -> Self {
        self.screen_rotation_deg = Some(rotation_deg);
        self
    }

    /// True when every numeric field that is present is finite.
    pub fn is_well_formed(&self) -> bool {
        self.timestamp_ms.is_finite()
            && self.azimuth_deg.is_finite()
            && self.pitch_deg.is_finite()
            && self.roll_deg.is_finite()
            && self.screen_rotation_deg.map_or(true, f64::is_finite)
    }
}

/// A single linear-acceleration event (gravity already removed, device frame).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: f64,
    /// Linear acceleration [x, y] in m/s².
    pub accel: Vec2,
}

impl MotionSample {
    pub fn new(timestamp_ms: f64, accel_x: f64, accel_y: f64) -> Self {
        Self {
            timestamp_ms,
            accel: Vec2::new(accel_x, accel_y),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.timestamp_ms.is_finite() && self.accel.is_finite()
    }
}

/// A ground-truth position from the satellite receiver.
///
/// Immutable once received.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters.
    pub accuracy_m: f64,
    /// Receiver timestamp in milliseconds.
    pub timestamp_ms: f64,
}

impl GeoFix {
    pub fn new(latitude: f64, longitude: f64, accuracy_m: f64, timestamp_ms: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m,
            timestamp_ms,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Finite fields and coordinates inside the valid degree ranges.
    pub fn is_well_formed(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.accuracy_m.is_finite()
            && self.timestamp_ms.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Heading estimate after the most recent accepted orientation sample.
///
/// Both angles are always in [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadingState {
    /// Low-pass filter state (tilt-compensated, before platform correction).
    pub filtered_deg: f64,
    /// Platform-normalized heading. This is what the motion integrator reads.
    pub heading_deg: f64,
    /// Last tilt-compensated reading fed into the filter.
    pub last_raw_deg: Option<f64>,
    /// Smoothing coefficient in (0, 1].
    pub alpha: f64,
}

impl HeadingState {
    pub fn new(alpha: f64) -> Self {
        Self {
            filtered_deg: 0.0,
            heading_deg: 0.0,
            last_raw_deg: None,
            alpha,
        }
    }

    /// True until the first sample has initialized the filter.
    pub fn is_uninitialized(&self) -> bool {
        self.last_raw_deg.is_none()
    }

    pub fn heading_rad(&self) -> f64 {
        self.heading_deg.to_radians()
    }
}

/// Integration state of the motion integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    /// World-frame velocity in m/s.
    pub velocity: Vec2,
    /// World-frame position in m, origin = session start.
    pub position: Vec2,
    /// Learned device-frame acceleration bias in m/s².
    pub acceleration_bias: Vec2,
    /// Consecutive samples below the stationary threshold.
    pub stationary_sample_count: u32,
    /// Timestamp baseline for the next Δt.
    pub last_sample_timestamp_ms: Option<f64>,
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            position: Vec2::ZERO,
            acceleration_bias: Vec2::ZERO,
            stationary_sample_count: 0,
            last_sample_timestamp_ms: None,
        }
    }
}

impl MotionState {
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }
}

// ============================================================================
// TESTS
// ============================================================================
