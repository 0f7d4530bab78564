//! Session state types
//!
//! Everything the host (renderer, HUD, audio) reads from a running session.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::judgment::{JudgmentKind, JudgmentResult};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Not running (initial, stopped or reset)
    Stopped,
    /// Counting in before play
    Countdown { beats_left: u32 },
    /// Ball moving, notes being judged
    Playing,
    /// Stopped by a death with invincibility off
    GameOver,
}

impl SessionPhase {
    /// True while timers and the frame loop are live
    pub fn is_running(self) -> bool {
        matches!(self, SessionPhase::Countdown { .. } | SessionPhase::Playing)
    }
}

/// Music readiness, polled before `start()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioStatus {
    /// Level has no music
    NotRequired,
    Loading,
    Ready,
    Failed(String),
}

/// Per-run options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Engine supplies input when the ball reaches each note
    pub auto_play: bool,
    /// Deaths are counted but never end the run
    pub invincible: bool,
    /// Path index to start from (editor preview); `None` starts at the beginning
    pub start_index: Option<usize>,
}

/// The judgment currently shown on screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgmentLabel {
    pub kind: JudgmentKind,
    pub position: Vec2,
    pub shown_at_ms: f64,
    pub duration_ms: f64,
}

impl JudgmentLabel {
    pub fn remaining_ms(&self, now_ms: f64) -> f64 {
        (self.shown_at_ms + self.duration_ms - now_ms).max(0.0)
    }
}

/// Side effects for the host, drained once per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Countdown advanced; 0 means play has begun
    CountdownBeat { beats_left: u32 },
    /// Start music, skipping `seek_ms` into the track
    AudioStart { seek_ms: f64 },
    AudioStop,
    Hitsound,
    Judged(JudgmentResult),
    LabelCleared,
    GameOver { death_count: u32 },
    /// Every note has been judged
    LevelCleared,
}

/// Read-only view for the renderer and HUD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub phase: SessionPhase,
    pub ball_pos: Vec2,
    pub current_note_index: usize,
    pub note_count: usize,
    pub score: u64,
    pub combo: u32,
    pub death_count: u32,
    pub failure_window: usize,
    pub label: Option<JudgmentLabel>,
    pub label_remaining_ms: f64,
}
