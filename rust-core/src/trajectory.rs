//! Dead-reckoning trajectory history.
//!
//! The path is the ordered sequence of integrated positions. Order is the
//! trajectory shape, so points are only ever appended. A session reset
//! truncates back to the origin and bumps the generation counter so that
//! anything derived from the path (the projected trace) knows to rebuild.

use serde::{Deserialize, Serialize};

use crate::types::Vec2;

/// Append-only sequence of world-frame positions, seeded with the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    points: Vec<Vec2>,
    generation: u64,
}

impl Path {
    /// A path containing only the origin.
    pub fn new() -> Self {
        Self {
            points: vec![Vec2::ZERO],
            generation: 0,
        }
    }

    /// Append the next position.
    pub fn push(&mut self, point: Vec2) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Never true in practice: the origin is always present.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Vec2> {
        self.points.last()
    }

    /// Incremented on every reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Polyline length in meters.
    pub fn length_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]))
            .sum()
    }

    /// Truncate to the single origin point.
    pub fn reset(&mut self) {
        self.points.clear();
        self.points.push(Vec2::ZERO);
        self.generation += 1;
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::new()
    }
}
