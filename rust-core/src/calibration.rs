//! Magnetic-interference advisory signal.
//!
//! A large jump in the compass reading usually means a nearby magnetic
//! disturbance. The heading estimator raises a pulse that display code shows
//! for a fixed window. The pulse is an expiring flag checked against the
//! monotonic sample clock, so there is no timer that could fire after the
//! session is torn down.

/// A time-bounded boolean signal.
#[derive(Debug, Clone)]
pub struct CalibrationPulse {
    duration_ms: f64,
    raised_at_ms: Option<f64>,
    raise_count: u64,
}

impl CalibrationPulse {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            raised_at_ms: None,
            raise_count: 0,
        }
    }

    /// Raise (or re-arm) the pulse at `now_ms`. The window restarts.
    pub fn raise(&mut self, now_ms: f64) {
        self.raised_at_ms = Some(now_ms);
        self.raise_count += 1;
    }

    /// True while `now_ms` is inside the window [raised, raised + duration).
    pub fn is_active(&self, now_ms: f64) -> bool {
        match self.raised_at_ms {
            Some(raised) => {
                let elapsed = now_ms - raised;
                elapsed >= 0.0 && elapsed < self.duration_ms
            }
            None => false,
        }
    }

    /// Drop the pulse immediately.
    pub fn clear(&mut self) {
        self.raised_at_ms = None;
    }

    /// Total number of times the pulse was raised.
    pub fn raise_count(&self) -> u64 {
        self.raise_count
    }
}
