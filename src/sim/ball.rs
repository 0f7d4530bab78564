//! Ball motion along the note path
//!
//! The ball always travels at a constant speed toward the next position and
//! never waits for input. Input only affects judgment.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{ARRIVAL_THRESHOLD, BALL_SPEED};

/// Motion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallState {
    /// Not simulating (session stopped or path empty)
    Idle,
    /// Moving toward `target_index`
    Travelling,
    /// Snapped onto a position this tick
    Arrived,
}

/// Per-tick motion report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallStep {
    pub pos: Vec2,
    /// Path index the ball snapped onto this tick, if any
    pub arrived: Option<usize>,
}

/// The moving point the player times input against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub pos: Vec2,
    /// Index of the path position the ball is heading to
    pub target_index: usize,
    pub state: BallState,
    /// Furthest path index the ball has reached
    last_reached: Option<usize>,
}

impl Default for Ball {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            target_index: 1,
            state: BallState::Idle,
            last_reached: None,
        }
    }
}

impl Ball {
    /// Snap onto `path[start]` and head for the following position
    pub fn launch(&mut self, path: &[Vec2], start: usize) {
        let Some(&pos) = path.get(start) else {
            *self = Self::default();
            return;
        };
        self.pos = pos;
        self.target_index = (start + 1).min(path.len() - 1);
        self.last_reached = Some(start);
        self.state = if path.len() > 1 {
            BallState::Travelling
        } else {
            BallState::Idle
        };
    }

    /// Return to the origin and stop simulating
    pub fn park(&mut self, path: &[Vec2]) {
        *self = Self::default();
        if let Some(&origin) = path.first() {
            self.pos = origin;
        }
    }

    /// Freeze in place
    pub fn halt(&mut self) {
        self.state = BallState::Idle;
    }

    /// True once the ball has reached (and possibly left) `index`
    pub fn has_reached(&self, index: usize) -> bool {
        self.last_reached.is_some_and(|reached| reached >= index)
    }

    /// True when the ball sits on the final path position with nowhere to go
    pub fn at_rest(&self, path: &[Vec2]) -> bool {
        !path.is_empty() && self.has_reached(path.len() - 1)
    }

    /// Advance one tick of `dt` seconds
    pub fn advance(&mut self, path: &[Vec2], dt: f32) -> BallStep {
        if self.state == BallState::Idle || path.is_empty() {
            return BallStep {
                pos: self.pos,
                arrived: None,
            };
        }

        let last = path.len() - 1;
        let target_index = self.target_index.min(last);
        let target = path[target_index];
        let to_target = target - self.pos;
        let dist = to_target.length();

        if dist > ARRIVAL_THRESHOLD {
            // Clamp so a long frame never carries the ball past its target
            let step = (BALL_SPEED * dt).min(dist);
            self.pos += to_target / dist * step;
            self.state = BallState::Travelling;
            BallStep {
                pos: self.pos,
                arrived: None,
            }
        } else {
            self.pos = target;
            self.state = BallState::Arrived;
            self.last_reached = Some(self.last_reached.map_or(target_index, |r| r.max(target_index)));
            self.target_index = (target_index + 1).min(last);
            BallStep {
                pos: self.pos,
                arrived: Some(target_index),
            }
        }
    }
}
