//! Distance-based judgment
//!
//! Pure classification of how far the ball was from a note when input
//! arrived, plus the per-note detectors that resolve notes the player never
//! hit (overshoot, hesitation, timeout).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Discrete accuracy classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JudgmentKind {
    Perfect,
    SlightlyFast,
    SlightlySlow,
    Fast,
    Slow,
    TooFast,
    TooSlow,
    Miss,
    /// Input with no pending note
    EmptyHit,
}

impl JudgmentKind {
    pub fn score(self) -> u32 {
        match self {
            JudgmentKind::Perfect => 100,
            JudgmentKind::SlightlyFast | JudgmentKind::SlightlySlow => 80,
            JudgmentKind::Fast | JudgmentKind::Slow => 60,
            JudgmentKind::TooFast
            | JudgmentKind::TooSlow
            | JudgmentKind::Miss
            | JudgmentKind::EmptyHit => 0,
        }
    }

    pub fn breaks_combo(self) -> bool {
        matches!(
            self,
            JudgmentKind::TooFast
                | JudgmentKind::TooSlow
                | JudgmentKind::Miss
                | JudgmentKind::EmptyHit
        )
    }

    /// Counts toward the failure window
    pub fn is_failure(self) -> bool {
        matches!(self, JudgmentKind::Miss | JudgmentKind::EmptyHit)
    }

    /// On-screen label text
    pub fn label(self) -> &'static str {
        match self {
            JudgmentKind::Perfect => "PERFECT",
            JudgmentKind::SlightlyFast => "SLIGHTLY FAST",
            JudgmentKind::SlightlySlow => "SLIGHTLY SLOW",
            JudgmentKind::Fast => "FAST",
            JudgmentKind::Slow => "SLOW",
            JudgmentKind::TooFast => "TOO FAST",
            JudgmentKind::TooSlow => "TOO SLOW",
            JudgmentKind::Miss => "MISS",
            JudgmentKind::EmptyHit => "EMPTY HIT",
        }
    }

    /// Label color (CSS hex)
    pub fn color(self) -> &'static str {
        match self {
            JudgmentKind::Perfect => "#00ff88",
            JudgmentKind::SlightlyFast | JudgmentKind::SlightlySlow => "#88ff00",
            JudgmentKind::Fast | JudgmentKind::Slow => "#ffaa00",
            JudgmentKind::TooFast | JudgmentKind::TooSlow => "#ff6600",
            JudgmentKind::Miss => "#ff0000",
            JudgmentKind::EmptyHit => "#666666",
        }
    }
}

/// Which side of the note the ball was on when input arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Side {
    /// Ball still approaching the note
    #[default]
    Early,
    /// Ball already reached the note
    Late,
}

/// What produced a judgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JudgmentCause {
    /// Player input, or the auto-play input signal
    Input,
    /// Ball left the judgment range after passing the note
    Overshoot,
    /// Note drifted in range, then out again before the ball reached it
    Hesitation,
    /// Ball stalled far away or at the end of the path with no input
    Timeout,
    /// Input with nothing left to judge
    Empty,
}

/// A resolved note
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgmentResult {
    pub note_index: usize,
    pub kind: JudgmentKind,
    pub cause: JudgmentCause,
    pub distance: f32,
    pub score: u32,
    pub breaks_combo: bool,
    /// Where the label is drawn
    pub position: Vec2,
    /// How long the label stays visible
    pub display_ms: f64,
}

/// Classify a distance on the early side
pub fn classify(distance: f32) -> JudgmentKind {
    classify_side(distance, Side::Early)
}

/// Classify a distance; the first tier whose bound is not exceeded wins
pub fn classify_side(distance: f32, side: Side) -> JudgmentKind {
    let early = side == Side::Early;
    if distance <= PERFECT_RANGE {
        JudgmentKind::Perfect
    } else if distance <= SLIGHT_RANGE {
        if early {
            JudgmentKind::SlightlyFast
        } else {
            JudgmentKind::SlightlySlow
        }
    } else if distance <= NEAR_RANGE {
        if early { JudgmentKind::Fast } else { JudgmentKind::Slow }
    } else if distance <= FAR_RANGE {
        if early {
            JudgmentKind::TooFast
        } else {
            JudgmentKind::TooSlow
        }
    } else {
        JudgmentKind::Miss
    }
}

/// Label display time for a note
pub fn display_duration_ms(note_index: usize) -> f64 {
    if note_index == 0 {
        ANCHOR_LABEL_MS
    } else {
        LABEL_MS
    }
}

fn result(
    note_index: usize,
    kind: JudgmentKind,
    cause: JudgmentCause,
    distance: f32,
    position: Vec2,
) -> JudgmentResult {
    JudgmentResult {
        note_index,
        kind,
        cause,
        distance,
        score: kind.score(),
        breaks_combo: kind.breaks_combo(),
        position,
        display_ms: display_duration_ms(note_index),
    }
}

/// Judge an input against a note (early side)
pub fn judge(ball_pos: Vec2, target_pos: Vec2, note_index: usize) -> JudgmentResult {
    judge_side(ball_pos, target_pos, note_index, Side::Early)
}

/// Judge an input against a note.
///
/// Note 0 is the synthetic start note and is always PERFECT.
pub fn judge_side(ball_pos: Vec2, target_pos: Vec2, note_index: usize, side: Side) -> JudgmentResult {
    if note_index == 0 {
        return result(0, JudgmentKind::Perfect, JudgmentCause::Input, 0.0, ball_pos);
    }
    let distance = ball_pos.distance(target_pos);
    result(
        note_index,
        classify_side(distance, side),
        JudgmentCause::Input,
        distance,
        ball_pos,
    )
}

/// Judgment for an input that had no note to land on
pub fn empty_hit(ball_pos: Vec2, note_index: usize) -> JudgmentResult {
    result(
        note_index,
        JudgmentKind::EmptyHit,
        JudgmentCause::Empty,
        0.0,
        ball_pos,
    )
}

/// Judgment produced by a detector rather than input
pub fn unplayed(
    ball_pos: Vec2,
    target_pos: Vec2,
    note_index: usize,
    verdict: Verdict,
) -> JudgmentResult {
    // Overshoot labels sit on the note the ball flew past
    let position = match verdict.cause {
        JudgmentCause::Overshoot => target_pos,
        _ => ball_pos,
    };
    result(
        note_index,
        verdict.kind,
        verdict.cause,
        ball_pos.distance(target_pos),
        position,
    )
}

/// Detector outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub kind: JudgmentKind,
    pub cause: JudgmentCause,
}

/// What the detectors see each tick
#[derive(Debug, Clone, Copy)]
pub struct Proximity {
    /// Ball distance to the pending note
    pub distance: f32,
    /// Ball has already reached the note
    pub passed: bool,
    /// Ball is resting at the end of the path
    pub at_rest: bool,
    pub now_ms: f64,
}

/// Resolution tracking for the note currently awaiting judgment.
///
/// Exactly one judgment may claim a note; whichever path claims it first
/// (input or a detector) wins and the rest become no-ops.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteWatch {
    pub note_index: usize,
    resolved: bool,
    in_range_since: Option<f64>,
    stalled_since: Option<f64>,
}

impl NoteWatch {
    pub fn new(note_index: usize) -> Self {
        Self {
            note_index,
            ..Default::default()
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Claim the note. Returns false if something already claimed it.
    pub fn claim(&mut self) -> bool {
        !std::mem::replace(&mut self.resolved, true)
    }

    /// Run the no-input detectors; a returned verdict has already claimed the note
    pub fn observe(&mut self, p: Proximity) -> Option<Verdict> {
        if self.resolved {
            return None;
        }

        let in_range = p.distance <= JUDGMENT_RANGE;
        if !in_range && p.passed {
            return self.settle(JudgmentKind::Miss, JudgmentCause::Overshoot);
        }

        if in_range {
            self.in_range_since.get_or_insert(p.now_ms);
        } else if let Some(since) = self.in_range_since.take() {
            if p.now_ms - since >= TOO_SLOW_GUARD_MS {
                return self.settle(JudgmentKind::TooSlow, JudgmentCause::Hesitation);
            }
        }

        // A passed note far from the ball was already settled as an overshoot,
        // so the dwell timer only runs while the ball rests at the path end
        let stalled = p.passed && p.at_rest;
        if stalled {
            let since = *self.stalled_since.get_or_insert(p.now_ms);
            if p.now_ms - since > TIMEOUT_DWELL_MS {
                return self.settle(JudgmentKind::Miss, JudgmentCause::Timeout);
            }
        } else {
            self.stalled_since = None;
        }

        None
    }

    fn settle(&mut self, kind: JudgmentKind, cause: JudgmentCause) -> Option<Verdict> {
        self.resolved = true;
        Some(Verdict { kind, cause })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(0.0), JudgmentKind::Perfect);
        assert_eq!(classify(20.0), JudgmentKind::Perfect);
        assert_eq!(classify(20.0001), JudgmentKind::SlightlyFast);
        assert_eq!(classify(40.0), JudgmentKind::SlightlyFast);
        assert_eq!(classify(40.0001), JudgmentKind::Fast);
        assert_eq!(classify(60.0), JudgmentKind::Fast);
        assert_eq!(classify(80.0), JudgmentKind::TooFast);
        assert_eq!(classify(80.0001), JudgmentKind::Miss);
    }

    #[test]
    fn test_late_side_mirrors_tiers() {
        assert_eq!(classify_side(10.0, Side::Late), JudgmentKind::Perfect);
        assert_eq!(classify_side(30.0, Side::Late), JudgmentKind::SlightlySlow);
        assert_eq!(classify_side(50.0, Side::Late), JudgmentKind::Slow);
        assert_eq!(classify_side(70.0, Side::Late), JudgmentKind::TooSlow);
        assert_eq!(classify_side(90.0, Side::Late), JudgmentKind::Miss);
    }

    #[test]
    fn test_score_and_combo_table() {
        assert_eq!(JudgmentKind::Perfect.score(), 100);
        assert_eq!(JudgmentKind::SlightlySlow.score(), 80);
        assert_eq!(JudgmentKind::Fast.score(), 60);
        assert_eq!(JudgmentKind::TooFast.score(), 0);
        assert!(!JudgmentKind::Slow.breaks_combo());
        assert!(JudgmentKind::TooSlow.breaks_combo());
        assert!(JudgmentKind::EmptyHit.breaks_combo());
        assert!(JudgmentKind::Miss.is_failure());
        assert!(!JudgmentKind::TooSlow.is_failure());
    }

    #[test]
    fn test_anchor_note_is_always_perfect() {
        let r = judge(Vec2::new(500.0, 500.0), Vec2::ZERO, 0);
        assert_eq!(r.kind, JudgmentKind::Perfect);
        assert_eq!(r.score, 100);
        assert!(!r.breaks_combo);
        assert_eq!(r.display_ms, 1000.0);
    }

    #[test]
    fn test_judge_uses_distance() {
        let r = judge(Vec2::new(50.0, 0.0), Vec2::new(100.0, 0.0), 1);
        assert_eq!(r.kind, JudgmentKind::Fast);
        assert_eq!(r.score, 60);
        assert_eq!(r.distance, 50.0);
        assert_eq!(r.position, Vec2::new(50.0, 0.0));
        assert_eq!(r.display_ms, 1500.0);
    }

    #[test]
    fn test_claim_is_once_only() {
        let mut watch = NoteWatch::new(3);
        assert!(watch.claim());
        assert!(!watch.claim());
        let p = Proximity {
            distance: 500.0,
            passed: true,
            at_rest: false,
            now_ms: 0.0,
        };
        assert_eq!(watch.observe(p), None);
    }

    #[test]
    fn test_overshoot_after_passing() {
        let mut watch = NoteWatch::new(1);
        let far_ahead = Proximity {
            distance: 140.0,
            passed: false,
            at_rest: false,
            now_ms: 0.0,
        };
        // Note still ahead: being far away is not a miss
        assert_eq!(watch.observe(far_ahead), None);

        let passed = Proximity {
            distance: 101.0,
            passed: true,
            at_rest: false,
            now_ms: 100.0,
        };
        let verdict = watch.observe(passed).unwrap();
        assert_eq!(verdict.kind, JudgmentKind::Miss);
        assert_eq!(verdict.cause, JudgmentCause::Overshoot);
        assert!(watch.is_resolved());
    }

    #[test]
    fn test_hesitation_needs_guard_time() {
        // Player index ran ahead of the ball: the note drifts in and out of range
        let mut watch = NoteWatch::new(1);
        let at = |distance, now_ms| Proximity {
            distance,
            passed: false,
            at_rest: false,
            now_ms,
        };
        assert_eq!(watch.observe(at(90.0, 0.0)), None);
        assert_eq!(watch.observe(at(10.0, 200.0)), None);
        let verdict = watch.observe(at(100.5, 400.0)).unwrap();
        assert_eq!(verdict.kind, JudgmentKind::TooSlow);
        assert_eq!(verdict.cause, JudgmentCause::Hesitation);
    }

    #[test]
    fn test_short_flicker_is_not_hesitation() {
        let mut watch = NoteWatch::new(1);
        let at = |distance, now_ms| Proximity {
            distance,
            passed: false,
            at_rest: false,
            now_ms,
        };
        assert_eq!(watch.observe(at(99.0, 0.0)), None);
        assert_eq!(watch.observe(at(101.0, 100.0)), None);
        assert!(!watch.is_resolved());
    }

    #[test]
    fn test_timeout_at_end_of_path() {
        let mut watch = NoteWatch::new(1);
        let resting = |now_ms| Proximity {
            distance: 0.0,
            passed: true,
            at_rest: true,
            now_ms,
        };
        assert_eq!(watch.observe(resting(0.0)), None);
        assert_eq!(watch.observe(resting(500.0)), None);
        let verdict = watch.observe(resting(516.0)).unwrap();
        assert_eq!(verdict.kind, JudgmentKind::Miss);
        assert_eq!(verdict.cause, JudgmentCause::Timeout);
    }

    #[test]
    fn test_far_passed_note_is_an_overshoot() {
        // Beyond the timeout distance a passed note never waits for the dwell
        let mut watch = NoteWatch::new(1);
        let verdict = watch
            .observe(Proximity {
                distance: 160.0,
                passed: true,
                at_rest: false,
                now_ms: 0.0,
            })
            .unwrap();
        assert_eq!(verdict.cause, JudgmentCause::Overshoot);
        assert_eq!(verdict.kind, JudgmentKind::Miss);
    }

    #[test]
    fn test_overshoot_label_sits_on_note() {
        let verdict = Verdict {
            kind: JudgmentKind::Miss,
            cause: JudgmentCause::Overshoot,
        };
        let r = unplayed(Vec2::new(0.0, 120.0), Vec2::ZERO, 2, verdict);
        assert_eq!(r.position, Vec2::ZERO);
        assert_eq!(r.distance, 120.0);
        assert!(r.breaks_combo);
        assert_eq!(r.score, 0);
    }

    proptest! {
        #[test]
        fn prop_classify_is_monotonic(a in 0.0f32..200.0, b in 0.0f32..200.0) {
            let rank = |k: JudgmentKind| match k {
                JudgmentKind::Perfect => 0,
                JudgmentKind::SlightlyFast => 1,
                JudgmentKind::Fast => 2,
                JudgmentKind::TooFast => 3,
                _ => 4,
            };
            let (near, far) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(rank(classify(near)) <= rank(classify(far)));
            prop_assert!(classify(near).score() >= classify(far).score());
        }
    }
}
