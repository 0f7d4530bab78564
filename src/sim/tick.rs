//! Per-frame simulation update
//!
//! `tick(session, input, dt)` is the only thing the frame loop calls. It
//! advances the virtual clock, runs due timers, applies input, moves the
//! ball and feeds the no-input detectors.

use super::judgment::{self, Proximity};
use super::session::Session;
use super::state::SessionPhase;
use crate::consts::MAX_FRAME_DT;

/// Input gathered for a single frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Key/pointer hit this frame
    pub hit: bool,
}

/// Advance the session by one frame of `dt` seconds
pub fn tick(session: &mut Session, input: &TickInput, dt: f32) {
    if !session.phase.is_running() {
        return;
    }
    let dt = dt.clamp(0.0, MAX_FRAME_DT);

    for task in session.scheduler.advance(dt as f64 * 1000.0) {
        session.run_task(task);
        // A death inside this batch cancels everything after it
        if !session.phase.is_running() {
            return;
        }
    }

    if session.phase != SessionPhase::Playing {
        return;
    }

    if input.hit {
        session.input();
    }

    let step = session.ball.advance(&session.path, dt);
    if let Some(index) = step.arrived {
        log::trace!("Ball reached note {}", index);
    }

    let index = session.current_note_index;
    let Some(&target) = session.path.get(index) else {
        return;
    };
    if session.watch.is_resolved() || index == session.start_index {
        return;
    }

    if session.config.auto_play {
        // Auto-play hits each note as the ball reaches it (or catches up
        // once the previous judgment lands)
        if session.ball.has_reached(index) {
            session.trigger_input();
        }
        return;
    }

    let proximity = Proximity {
        distance: step.pos.distance(target),
        passed: session.ball.has_reached(index),
        at_rest: session.ball.at_rest(&session.path),
        now_ms: session.scheduler.now_ms(),
    };
    if let Some(verdict) = session.watch.observe(proximity) {
        let result = judgment::unplayed(step.pos, target, index, verdict);
        session.schedule_judgment(result);
    }
}
