//! Inertial Dead-Reckoning Engine Library
//!
//! Estimates a moving device's 2D trajectory from orientation and linear
//! acceleration streams, and cross-references it against satellite fixes.
//!
//! # Design Philosophy
//!
//! - **Streaming filter, not a validator**: every update is O(1) per sample
//!   and never fails. Bad input degrades to "hold last good state".
//! - **Finite by construction**: heading stays in [0, 360); velocity and
//!   position are only committed when every intermediate value is finite.
//! - **Single writer**: each stage owns its state and is mutated by exactly
//!   one event at a time, in arrival order.
//!
//! # Example
//!
//! ```
//! use inertial_dr::{GeoFix, MotionSample, OrientationSample, Session};
//!
//! let mut session = Session::default();
//! session.start();
//!
//! session.on_fix(GeoFix::new(48.8584, 2.2945, 4.0, 0.0));
//! session.on_orientation(OrientationSample::new(0.0, 90.0, 0.0, 0.0));
//! session.on_motion(MotionSample::new(0.0, 0.0, 0.0));
//! session.on_motion(MotionSample::new(20.0, 0.8, 0.0));
//!
//! assert_eq!(session.path().len(), 2);
//! assert_eq!(session.projected_trace().len(), 2);
//! ```

pub mod calibration;
pub mod config;
pub mod error;
pub mod export;
pub mod geo;
pub mod heading;
pub mod motion;
pub mod runner;
pub mod session;
pub mod signal;
pub mod trajectory;
pub mod types;


// Re-export commonly used types
pub use config::{DrConfig, GeoConfig, HeadingConfig, MotionConfig};
pub use error::{DrError, Result};
pub use export::SessionSnapshot;
pub use geo::{project_path, CorrelationReport, GeoreferencingCorrelator};
pub use heading::HeadingEstimator;
pub use motion::{MotionIntegrator, MotionStats};
pub use runner::{EventSender, SessionRunner};
pub use session::{SensorEvent, Session};
pub use trajectory::Path;
pub use types::{
    GeoFix, GeoPoint, HeadingState, MotionSample, MotionState, OrientationSample, Vec2,
};
