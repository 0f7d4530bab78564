//! Railbeat - A rail rhythm game core
//!
//! Core modules:
//! - `level`: Level document model (song, notes, speed/easing events)
//! - `sim`: Deterministic simulation (note path, ball motion, judgment, failure window)
//! - `editor`: Level editing operations with an injected camera handle
//! - `audio`: Audio port and event routing (Web Audio on wasm)
//! - `settings`: Player preferences

pub mod audio;
pub mod editor;
pub mod level;
pub mod settings;
pub mod sim;

pub use level::{LevelDocument, LevelError};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Fixed timestep used by the headless runner (60 Hz, one rendered frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Largest frame delta accepted from the host (long stalls are clamped)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Spatial units per grid step of a note offset
    pub const GRID_UNIT: f32 = 50.0;

    /// Ball speed in spatial units per second (never paced to musical timing)
    pub const BALL_SPEED: f32 = 150.0;
    /// Distance at which the ball snaps onto its target
    pub const ARRIVAL_THRESHOLD: f32 = 2.0;

    /// Judgment distance tiers (inclusive upper bounds, spatial units)
    pub const PERFECT_RANGE: f32 = 20.0;
    pub const SLIGHT_RANGE: f32 = 40.0;
    pub const NEAR_RANGE: f32 = 60.0;
    pub const FAR_RANGE: f32 = 80.0;

    /// Outer judgment range; leaving it without input means the note was passed
    pub const JUDGMENT_RANGE: f32 = 100.0;
    /// Minimum time spent in range before an exit counts as TOO_SLOW
    pub const TOO_SLOW_GUARD_MS: f64 = 300.0;
    /// Dwell time at the path end before an unplayed note times out
    pub const TIMEOUT_DWELL_MS: f64 = 500.0;

    /// Judgment results become visible one frame after they are triggered
    pub const JUDGMENT_DELAY_MS: f64 = 16.0;
    /// Delay before the start note is auto-judged once play begins
    pub const ANCHOR_TRIGGER_DELAY_MS: f64 = 50.0;
    /// Judgment label display time for the start note
    pub const ANCHOR_LABEL_MS: f64 = 1000.0;
    /// Judgment label display time for every other note
    pub const LABEL_MS: f64 = 1500.0;

    /// Beats counted down before play begins
    pub const COUNTDOWN_BEATS: u32 = 3;

    /// Failure window is BASE + floor(bpm / BPM_STEP)
    pub const FAILURE_WINDOW_BASE: usize = 10;
    pub const FAILURE_WINDOW_BPM_STEP: f64 = 400.0;
    /// Failing judgments inside one window that count as a death
    pub const FAILURES_PER_DEATH: usize = 3;

    /// Default BPM used when a host has no level loaded
    pub const DEFAULT_BPM: f64 = 120.0;
}

/// Milliseconds per beat at the given BPM
#[inline]
pub fn beat_interval_ms(bpm: f64) -> f64 {
    60_000.0 / bpm
}

