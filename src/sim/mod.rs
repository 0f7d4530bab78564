//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time only moves through `tick` (virtual clock, no wall-clock timers)
//! - Note positions derive from the level's offset chain alone
//! - No rendering, audio or platform dependencies

pub mod ball;
pub mod death;
pub mod judgment;
pub mod path;
pub mod schedule;
pub mod session;
pub mod state;
pub mod tick;

pub use ball::{Ball, BallState};
pub use death::{FailureTracker, failure_window_size};
pub use judgment::{JudgmentCause, JudgmentKind, JudgmentResult, Side, classify, judge};
pub use path::resolve;
pub use session::{Session, SessionError};
pub use state::{
    AudioStatus, FrameSnapshot, JudgmentLabel, SessionConfig, SessionEvent, SessionPhase,
};
pub use tick::{TickInput, tick};
