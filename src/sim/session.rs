//! Session controller
//!
//! Owns all mutable gameplay state: countdown, current note, score, combo,
//! failure window and the ball. Lifecycle is
//! `Stopped -> Countdown -> Playing -> (Stopped | GameOver)`.

use glam::Vec2;
use thiserror::Error;

use super::ball::Ball;
use super::death::{FailureTracker, failure_window_size};
use super::judgment::{self, JudgmentCause, JudgmentResult, NoteWatch, Side};
use super::path;
use super::schedule::{Scheduler, TaskId};
use super::state::{
    AudioStatus, FrameSnapshot, JudgmentLabel, SessionConfig, SessionEvent, SessionPhase,
};
use crate::beat_interval_ms;
use crate::consts::*;
use crate::level::LevelDocument;

/// Reasons `start()` refuses to run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("audio is still loading")]
    AudioNotReady,
    #[error("audio failed to load: {0}")]
    AudioFailed(String),
    #[error("start note {index} is out of range (level has {notes} notes)")]
    StartIndexOutOfRange { index: usize, notes: usize },
    #[error("session is already running")]
    AlreadyRunning,
}

/// Deferred work driven by the virtual clock
#[derive(Debug, Clone)]
pub(super) enum Task {
    CountdownBeat,
    StartAudio,
    /// Auto-judge the start note once play begins
    AnchorTrigger,
    Apply(JudgmentResult),
    ClearLabel,
}

/// A gameplay session over one level
#[derive(Debug, Clone)]
pub struct Session {
    pub(super) path: Vec<Vec2>,
    pub(super) bpm: f64,
    pub(super) offset_ms: f64,
    pub(super) audio: AudioStatus,
    pub(super) config: SessionConfig,
    pub(super) phase: SessionPhase,
    pub(super) ball: Ball,
    pub(super) current_note_index: usize,
    pub(super) start_index: usize,
    pub(super) watch: NoteWatch,
    pub(super) score: u64,
    pub(super) combo: u32,
    pub(super) failures: FailureTracker,
    pub(super) label: Option<JudgmentLabel>,
    label_clear: Option<TaskId>,
    pub(super) scheduler: Scheduler<Task>,
    events: Vec<SessionEvent>,
    cleared: bool,
}

impl Session {
    pub fn new(level: &LevelDocument, config: SessionConfig) -> Self {
        let path = path::resolve(&level.content);
        let mut ball = Ball::default();
        ball.park(&path);
        Self {
            path,
            bpm: level.bpm(),
            offset_ms: level.offset_ms(),
            audio: Self::initial_audio(level),
            config,
            phase: SessionPhase::Stopped,
            ball,
            current_note_index: 0,
            start_index: 0,
            watch: NoteWatch::new(0),
            score: 0,
            combo: 0,
            failures: FailureTracker::new(),
            label: None,
            label_clear: None,
            scheduler: Scheduler::new(),
            events: Vec::new(),
            cleared: false,
        }
    }

    fn initial_audio(level: &LevelDocument) -> AudioStatus {
        if level.audio_ref().is_some() {
            AudioStatus::Loading
        } else {
            AudioStatus::NotRequired
        }
    }

    /// Swap in a new or edited level; resets the session
    pub fn load_level(&mut self, level: &LevelDocument) {
        self.path = path::resolve(&level.content);
        self.bpm = level.bpm();
        self.offset_ms = level.offset_ms();
        self.audio = Self::initial_audio(level);
        self.reset();
    }

    // === Accessors ===

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Absolute note positions (index 0 is the start note)
    pub fn positions(&self) -> &[Vec2] {
        &self.path
    }

    pub fn ball_pos(&self) -> Vec2 {
        self.ball.pos
    }

    pub fn current_note_index(&self) -> usize {
        self.current_note_index
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn death_count(&self) -> u32 {
        self.failures.death_count()
    }

    pub fn failure_window(&self) -> usize {
        failure_window_size(self.bpm)
    }

    pub fn last_judgment(&self) -> Option<&JudgmentLabel> {
        self.label.as_ref()
    }

    pub fn now_ms(&self) -> f64 {
        self.scheduler.now_ms()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn audio_status(&self) -> &AudioStatus {
        &self.audio
    }

    pub fn set_audio_status(&mut self, status: AudioStatus) {
        if let AudioStatus::Failed(msg) = &status {
            log::warn!("Audio failed: {}", msg);
        }
        self.audio = status;
    }

    pub fn set_auto_play(&mut self, auto_play: bool) {
        self.config.auto_play = auto_play;
    }

    pub fn set_invincible(&mut self, invincible: bool) {
        self.config.invincible = invincible;
    }

    pub fn set_start_index(&mut self, start_index: Option<usize>) {
        self.config.start_index = start_index;
    }

    /// Take the side effects produced since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        let now = self.now_ms();
        FrameSnapshot {
            phase: self.phase,
            ball_pos: self.ball.pos,
            current_note_index: self.current_note_index,
            note_count: self.path.len().saturating_sub(1),
            score: self.score,
            combo: self.combo,
            death_count: self.failures.death_count(),
            failure_window: self.failure_window(),
            label: self.label,
            label_remaining_ms: self.label.map_or(0.0, |l| l.remaining_ms(now)),
        }
    }

    // === Lifecycle ===

    /// Begin the countdown. Nothing changes if this returns an error.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.phase.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        match &self.audio {
            AudioStatus::Loading => return Err(SessionError::AudioNotReady),
            AudioStatus::Failed(msg) => return Err(SessionError::AudioFailed(msg.clone())),
            AudioStatus::NotRequired | AudioStatus::Ready => {}
        }
        let start_index = self.config.start_index.unwrap_or(0);
        if start_index >= self.path.len() {
            return Err(SessionError::StartIndexOutOfRange {
                index: start_index,
                notes: self.path.len() - 1,
            });
        }

        self.scheduler.cancel_all();
        self.start_index = start_index;

        let beat = beat_interval_ms(self.bpm);
        for n in 1..=COUNTDOWN_BEATS {
            self.scheduler.schedule_in(beat * n as f64, Task::CountdownBeat);
        }

        if self.audio == AudioStatus::Ready {
            // Positive offsets pre-roll the music into the countdown
            let audio_delay = beat * COUNTDOWN_BEATS as f64 - self.offset_ms;
            if audio_delay >= 0.0 {
                self.scheduler.schedule_in(audio_delay, Task::StartAudio);
            } else {
                self.events.push(SessionEvent::AudioStart {
                    seek_ms: -audio_delay,
                });
            }
        }

        self.phase = SessionPhase::Countdown {
            beats_left: COUNTDOWN_BEATS,
        };
        self.events.push(SessionEvent::CountdownBeat {
            beats_left: COUNTDOWN_BEATS,
        });
        log::info!(
            "Starting countdown: {} BPM ({:.1}ms/beat), offset {}ms, start note {}",
            self.bpm,
            beat,
            self.offset_ms,
            start_index
        );
        Ok(())
    }

    /// Halt timers and music; score and note index are kept for inspection
    pub fn stop(&mut self) {
        self.scheduler.cancel_all();
        self.label_clear = None;
        self.ball.halt();
        if self.phase.is_running() {
            log::info!(
                "Session stopped at note {} (score {}, combo {})",
                self.current_note_index,
                self.score,
                self.combo
            );
        }
        if self.phase != SessionPhase::GameOver {
            self.phase = SessionPhase::Stopped;
        }
        self.events.push(SessionEvent::AudioStop);
    }

    /// Stop and return to a fresh state
    pub fn reset(&mut self) {
        self.stop();
        self.phase = SessionPhase::Stopped;
        self.current_note_index = 0;
        self.start_index = 0;
        self.watch = NoteWatch::new(0);
        self.score = 0;
        self.combo = 0;
        self.failures.reset();
        self.label = None;
        self.cleared = false;
        self.ball.park(&self.path);
        log::info!("Session reset");
    }

    fn begin_play(&mut self) {
        self.phase = SessionPhase::Playing;
        self.current_note_index = self.start_index;
        self.watch = NoteWatch::new(self.start_index);
        self.score = 0;
        self.combo = 0;
        self.failures.reset();
        self.label = None;
        self.cleared = false;
        self.ball.launch(&self.path, self.start_index);
        if self.path.len() > 1 {
            self.scheduler
                .schedule_in(ANCHOR_TRIGGER_DELAY_MS, Task::AnchorTrigger);
        }
        log::info!(
            "Playing from note {} in {} mode ({} notes)",
            self.start_index,
            if self.config.auto_play { "auto" } else { "manual" },
            self.path.len() - 1
        );
    }

    fn game_over(&mut self) {
        self.scheduler.cancel_all();
        self.label_clear = None;
        self.ball.halt();
        self.phase = SessionPhase::GameOver;
        let death_count = self.failures.death_count();
        self.events.push(SessionEvent::AudioStop);
        self.events.push(SessionEvent::GameOver { death_count });
        log::info!("Game over: too many misses/empty hits (deaths: {})", death_count);
    }

    // === Input and judgment ===

    /// Manual input (key/pointer). Ignored outside play and in auto-play.
    pub fn input(&mut self) {
        if self.phase != SessionPhase::Playing {
            log::debug!("Input ignored: phase {:?}", self.phase);
            return;
        }
        if self.config.auto_play {
            log::debug!("Input ignored: auto-play is driving");
            return;
        }
        self.trigger_input();
    }

    /// Judge the current note against the live ball position
    pub(super) fn trigger_input(&mut self) {
        // An empty level never judges at all
        if self.path.len() < 2 {
            return;
        }
        let index = self.current_note_index;
        let Some(&target) = self.path.get(index) else {
            let result = judgment::empty_hit(self.ball.pos, index);
            self.scheduler
                .schedule_in(JUDGMENT_DELAY_MS, Task::Apply(result));
            return;
        };

        if !self.watch.claim() {
            log::debug!("Note {} already judged, ignoring input", index);
            return;
        }

        let side = if self.ball.has_reached(index) {
            Side::Late
        } else {
            Side::Early
        };
        let result = judgment::judge_side(self.ball.pos, target, index, side);
        log::debug!(
            "Input on note {}: distance {:.1} -> {:?}",
            index,
            result.distance,
            result.kind
        );
        self.scheduler
            .schedule_in(JUDGMENT_DELAY_MS, Task::Apply(result));
    }

    /// Queue a detector verdict for the current note
    pub(super) fn schedule_judgment(&mut self, result: JudgmentResult) {
        log::debug!(
            "Note {} resolved without input: {:?} ({:?})",
            result.note_index,
            result.kind,
            result.cause
        );
        self.scheduler
            .schedule_in(JUDGMENT_DELAY_MS, Task::Apply(result));
    }

    fn apply_judgment(&mut self, result: JudgmentResult) {
        let advances = result.cause != JudgmentCause::Empty;
        if advances && result.note_index != self.current_note_index {
            log::debug!("Dropping stale judgment for note {}", result.note_index);
            return;
        }

        self.score += result.score as u64;
        self.combo = if result.breaks_combo { 0 } else { self.combo + 1 };

        let now = self.now_ms();
        self.label = Some(JudgmentLabel {
            kind: result.kind,
            position: result.position,
            shown_at_ms: now,
            duration_ms: result.display_ms,
        });
        if let Some(previous) = self.label_clear.take() {
            self.scheduler.cancel(previous);
        }
        self.label_clear = Some(self.scheduler.schedule_in(result.display_ms, Task::ClearLabel));

        self.events.push(SessionEvent::Hitsound);
        self.events.push(SessionEvent::Judged(result));

        let outcome = self.failures.record(result.kind, self.bpm);

        if advances {
            self.current_note_index += 1;
            self.watch = NoteWatch::new(self.current_note_index);
            if self.current_note_index >= self.path.len() && !self.cleared {
                self.cleared = true;
                self.events.push(SessionEvent::LevelCleared);
                log::info!("Level cleared: score {}, combo {}", self.score, self.combo);
            }
        }

        // The death flag is only visible at the instant of recording
        if outcome.died || self.failures.is_player_dead() {
            if self.config.invincible {
                log::info!("Death ignored (invincible)");
            } else {
                self.game_over();
            }
        }
    }

    pub(super) fn run_task(&mut self, task: Task) {
        match task {
            Task::CountdownBeat => {
                if let SessionPhase::Countdown { beats_left } = self.phase {
                    let beats_left = beats_left.saturating_sub(1);
                    self.events.push(SessionEvent::CountdownBeat { beats_left });
                    if beats_left == 0 {
                        self.begin_play();
                    } else {
                        self.phase = SessionPhase::Countdown { beats_left };
                    }
                }
            }
            Task::StartAudio => self.events.push(SessionEvent::AudioStart { seek_ms: 0.0 }),
            Task::AnchorTrigger => {
                if self.phase == SessionPhase::Playing
                    && self.current_note_index == self.start_index
                    && !self.watch.is_resolved()
                {
                    self.trigger_input();
                }
            }
            Task::Apply(result) => {
                if self.phase == SessionPhase::Playing {
                    self.apply_judgment(result);
                }
            }
            Task::ClearLabel => {
                // A newer label may have landed in the same batch
                let now = self.now_ms();
                if self.label.is_some_and(|l| l.remaining_ms(now) > 0.0) {
                    return;
                }
                self.label = None;
                self.label_clear = None;
                self.events.push(SessionEvent::LabelCleared);
            }
        }
    }
}
