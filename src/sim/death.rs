//! Failure window and death tracking
//!
//! Keeps the most recent judgments in a bounded window. Three failures
//! inside the window count as a death and wipe the window.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::judgment::JudgmentKind;
use crate::consts::{FAILURE_WINDOW_BASE, FAILURE_WINDOW_BPM_STEP, FAILURES_PER_DEATH};

/// Window size for a BPM (faster songs get a slightly longer window)
pub fn failure_window_size(bpm: f64) -> usize {
    FAILURE_WINDOW_BASE + (bpm / FAILURE_WINDOW_BPM_STEP).floor().max(0.0) as usize
}

/// Result of recording one judgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    /// This judgment completed a death; the window has been wiped.
    /// Only observable here, at the moment of recording.
    pub died: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureTracker {
    recent: VecDeque<JudgmentKind>,
    death_count: u32,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a judgment, evicting the oldest beyond the window for `bpm`
    pub fn record(&mut self, kind: JudgmentKind, bpm: f64) -> FailureOutcome {
        let window = failure_window_size(bpm);
        self.recent.push_back(kind);
        while self.recent.len() > window {
            self.recent.pop_front();
        }

        if self.failure_count() >= FAILURES_PER_DEATH {
            self.death_count += 1;
            // Hard reset, not a sliding eviction
            self.recent.clear();
            log::info!("Failure window exhausted (deaths: {})", self.death_count);
            return FailureOutcome { died: true };
        }

        FailureOutcome { died: false }
    }

    /// Failing judgments currently in the window
    pub fn failure_count(&self) -> usize {
        self.recent.iter().filter(|k| k.is_failure()).count()
    }

    /// Continuous check; always false right after a death since the window is wiped
    pub fn is_player_dead(&self) -> bool {
        self.failure_count() >= FAILURES_PER_DEATH
    }

    pub fn death_count(&self) -> u32 {
        self.death_count
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn reset(&mut self) {
        self.recent.clear();
        self.death_count = 0;
    }
}
