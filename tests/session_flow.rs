//! End-to-end session runs through the public API

use glam::Vec2;
use railbeat::LevelDocument;
use railbeat::consts::SIM_DT;
use railbeat::editor::{Editor, NoCamera};
use railbeat::level::Note;
use railbeat::sim::{
    JudgmentCause, JudgmentKind, JudgmentResult, Session, SessionConfig, SessionEvent,
    SessionPhase, TickInput, tick,
};

const SINGLE_NOTE: &str = r#"{
    "property": { "song": { "name": "One", "bpm": 120 } },
    "content": [ { "positionOffset": [2, 0], "timing": 1000, "type": "tap" } ]
}"#;

fn level(content: Vec<Note>) -> LevelDocument {
    let mut level = LevelDocument::sample();
    level.content = content;
    level.addons.clear();
    level
}

fn judged(events: &[SessionEvent]) -> Vec<JudgmentResult> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Judged(r) => Some(*r),
            _ => None,
        })
        .collect()
}

/// Run frames, pressing whenever the ball sits exactly on a pending note
/// listed in `press`
fn run(session: &mut Session, frames: usize, press: &[usize]) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    let mut pressed = Vec::new();
    for _ in 0..frames {
        let index = session.current_note_index();
        let on_note = session
            .positions()
            .get(index)
            .is_some_and(|p| *p == session.ball_pos());
        let hit = on_note && press.contains(&index) && !pressed.contains(&index);
        if hit {
            pressed.push(index);
        }
        tick(session, &TickInput { hit }, SIM_DT);
        events.extend(session.drain_events());
    }
    events
}

#[test]
fn single_note_without_input_is_missed() {
    let level = LevelDocument::from_json(SINGLE_NOTE).unwrap();
    let mut session = Session::new(&level, SessionConfig::default());
    assert_eq!(
        session.positions(),
        &[Vec2::ZERO, Vec2::new(100.0, 0.0)]
    );

    session.start().unwrap();
    let events = run(&mut session, 60 * 5, &[]);
    let results = judged(&events);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].note_index, 0);
    assert_eq!(results[0].kind, JudgmentKind::Perfect);
    assert_eq!(results[1].note_index, 1);
    assert_eq!(results[1].kind, JudgmentKind::Miss);
    assert_eq!(results[1].cause, JudgmentCause::Timeout);
    assert!(events.contains(&SessionEvent::LevelCleared));
    assert_eq!(session.combo(), 0);
    assert_eq!(session.score(), 100);
}

#[test]
fn combo_builds_and_a_miss_resets_it() {
    let content = (0..5).map(|i| Note::tap(2.0, 0.0, 1000.0 * (i + 1) as f64)).collect();
    let mut session = Session::new(&level(content), SessionConfig::default());
    session.start().unwrap();

    // Anchor plus four presses; note 5 is left alone
    let mut events = Vec::new();
    let mut combo_before_last = None;
    for _ in 0..60 * 8 {
        events.extend(run(&mut session, 1, &[1, 2, 3, 4]));
        if session.current_note_index() == 5 && combo_before_last.is_none() {
            combo_before_last = Some((session.combo(), session.score()));
        }
    }
    assert_eq!(combo_before_last, Some((5, 500)));

    let results = judged(&events);
    assert_eq!(results.len(), 6);
    assert!(results[..5].iter().all(|r| r.kind == JudgmentKind::Perfect));
    assert_eq!(results[5].kind, JudgmentKind::Miss);

    // The miss breaks the combo but keeps the score
    assert_eq!(session.score(), 500);
    assert_eq!(session.combo(), 0);
    assert_eq!(session.phase(), SessionPhase::Playing);
}

#[test]
fn double_input_judges_once() {
    let level = LevelDocument::from_json(SINGLE_NOTE).unwrap();
    let mut session = Session::new(&level, SessionConfig::default());
    session.start().unwrap();

    let mut events = Vec::new();
    for _ in 0..600 {
        if session.current_note_index() == 1 && session.ball_pos() == session.positions()[1] {
            session.input();
            session.input();
        }
        tick(&mut session, &TickInput::default(), SIM_DT);
        events.extend(session.drain_events());
        if session.current_note_index() == 2 {
            break;
        }
    }
    events.extend(run(&mut session, 5, &[]));

    let for_note_1: Vec<_> = judged(&events)
        .into_iter()
        .filter(|r| r.note_index == 1)
        .collect();
    assert_eq!(for_note_1.len(), 1);
    assert_eq!(for_note_1[0].kind, JudgmentKind::Perfect);
    assert_eq!(session.score(), 200);
}

#[test]
fn preview_starts_from_selected_note() {
    let level = LevelDocument::sample();
    let mut session = Session::new(
        &level,
        SessionConfig {
            auto_play: true,
            start_index: Some(3),
            ..Default::default()
        },
    );
    session.start().unwrap();
    let events = run(&mut session, 60 * 15, &[]);
    let results = judged(&events);

    assert_eq!(results.first().map(|r| r.note_index), Some(3));
    assert_eq!(results.len(), level.note_count() + 1 - 3);
    assert!(events.contains(&SessionEvent::LevelCleared));
}

#[test]
fn edited_level_plays_with_new_positions() {
    let mut editor = Editor::new(LevelDocument::from_json(SINGLE_NOTE).unwrap(), Box::new(NoCamera));
    editor.insert_note_after(1, [0.0, 2.0]).unwrap();
    let level = editor.into_level();

    let mut session = Session::new(
        &level,
        SessionConfig {
            auto_play: true,
            ..Default::default()
        },
    );
    assert_eq!(session.positions()[2], Vec2::new(100.0, 100.0));
    session.start().unwrap();
    let events = run(&mut session, 60 * 6, &[]);
    assert_eq!(judged(&events).len(), 3);
    assert_eq!(session.score(), 300);
}

#[test]
fn audio_must_be_ready_before_start() {
    let mut level = LevelDocument::from_json(SINGLE_NOTE).unwrap();
    level.property.song.href = "song.mp3".to_string();
    let mut session = Session::new(&level, SessionConfig::default());
    assert!(session.start().is_err());

    session.set_audio_status(railbeat::sim::AudioStatus::Ready);
    session.start().unwrap();
    let events = run(&mut session, 100, &[]);
    assert!(events.contains(&SessionEvent::AudioStart { seek_ms: 0.0 }));
}
