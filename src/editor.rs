//! Level editing
//!
//! Note indices here are path indices: note 0 is the origin anchor and note
//! `i > 0` is `content[i - 1]`. Event `noteIndex` values use the same scheme.

use glam::Vec2;
use thiserror::Error;

use crate::level::{LevelDocument, LevelError, LevelEvent, Note};
use crate::sim::resolve;

/// Gap between an inserted note and the one before it
const INSERT_TIMING_STEP_MS: f64 = 1000.0;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("cannot edit while the level is playing")]
    Playing,
    #[error("note {index} out of range ({notes} notes)")]
    NoteOutOfRange { index: usize, notes: usize },
    #[error("note {note} has no event {event}")]
    EventOutOfRange { note: usize, event: usize },
    #[error("the origin note has no editable data")]
    OriginNote,
    #[error("edit would produce an invalid level: {0}")]
    Invalid(#[from] LevelError),
}

/// Camera focus commands issued by the editor
pub trait CameraControl {
    /// Move the view to a note immediately (no animation)
    fn snap_to_note(&mut self, index: usize, position: Vec2);
}

/// Camera that ignores every command
#[derive(Debug, Default)]
pub struct NoCamera;

impl CameraControl for NoCamera {
    fn snap_to_note(&mut self, _index: usize, _position: Vec2) {}
}

pub struct Editor {
    level: LevelDocument,
    positions: Vec<Vec2>,
    selected: Option<usize>,
    playing: bool,
    camera: Box<dyn CameraControl>,
}

impl Editor {
    pub fn new(level: LevelDocument, camera: Box<dyn CameraControl>) -> Self {
        let positions = resolve(&level.content);
        Self {
            level,
            positions,
            selected: None,
            playing: false,
            camera,
        }
    }

    pub fn level(&self) -> &LevelDocument {
        &self.level
    }

    /// Hand the document over (e.g. to save or to start a session)
    pub fn into_level(self) -> LevelDocument {
        self.level
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Mirror the session state; edits are refused while playing
    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    fn ensure_editable(&self) -> Result<(), EditorError> {
        if self.playing {
            log::warn!("Edit refused while playing");
            return Err(EditorError::Playing);
        }
        Ok(())
    }

    fn check_note(&self, index: usize) -> Result<(), EditorError> {
        if index < self.positions.len() {
            Ok(())
        } else {
            Err(EditorError::NoteOutOfRange {
                index,
                notes: self.positions.len(),
            })
        }
    }

    /// Apply `edit` to a copy and keep it only if the result still loads
    fn commit(&mut self, edit: impl FnOnce(&mut LevelDocument)) -> Result<(), EditorError> {
        let mut trial = self.level.clone();
        edit(&mut trial);
        if let Err(e) = trial.validate() {
            log::warn!("Edit rejected: {}", e);
            return Err(e.into());
        }
        self.level = trial;
        Ok(())
    }

    fn refresh_positions(&mut self) {
        self.positions = resolve(&self.level.content);
    }

    /// Select a note and focus the camera on it
    pub fn select_note(&mut self, index: usize) -> Result<(), EditorError> {
        self.ensure_editable()?;
        self.check_note(index)?;
        self.selected = Some(index);
        self.camera.snap_to_note(index, self.positions[index]);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if !self.playing {
            self.selected = None;
        }
    }

    /// Insert a tap note right after `after`, offset by `offset` grid units.
    ///
    /// The new note is timed 1000ms after its predecessor and becomes the
    /// selection. Events on later notes keep pointing at the same notes.
    /// Returns the new note's index.
    pub fn insert_note_after(
        &mut self,
        after: usize,
        offset: [f32; 2],
    ) -> Result<usize, EditorError> {
        self.ensure_editable()?;
        self.check_note(after)?;

        let prev_timing = match after {
            0 => 0.0,
            i => self.level.content[i - 1].timing,
        };
        let inserted = after + 1;
        self.level.content.insert(
            after,
            Note::tap(offset[0], offset[1], prev_timing + INSERT_TIMING_STEP_MS),
        );
        for event in &mut self.level.addons {
            let idx = event.note_index_mut();
            if *idx >= inserted {
                *idx += 1;
            }
        }
        self.refresh_positions();

        log::info!("Inserted note {} with offset {:?}", inserted, offset);
        self.selected = Some(inserted);
        self.camera.snap_to_note(inserted, self.positions[inserted]);
        Ok(inserted)
    }

    /// Replace a note's data
    pub fn update_note(&mut self, index: usize, note: Note) -> Result<(), EditorError> {
        self.ensure_editable()?;
        self.check_note(index)?;
        if index == 0 {
            return Err(EditorError::OriginNote);
        }
        self.commit(|level| level.content[index - 1] = note)?;
        self.refresh_positions();
        Ok(())
    }

    /// Events attached to a note, in document order
    pub fn events(&self, note: usize) -> Vec<&LevelEvent> {
        self.level.events_for_note(note).collect()
    }

    pub fn add_event(&mut self, event: LevelEvent) -> Result<(), EditorError> {
        self.ensure_editable()?;
        self.check_note(event.note_index())?;
        let note = event.note_index();
        self.commit(|level| level.addons.push(event))?;
        log::debug!("Added event on note {}", note);
        Ok(())
    }

    /// Document position of the `k`-th event of `note`
    fn event_slot(&self, note: usize, k: usize) -> Result<usize, EditorError> {
        self.level
            .addons
            .iter()
            .enumerate()
            .filter(|(_, e)| e.note_index() == note)
            .nth(k)
            .map(|(slot, _)| slot)
            .ok_or(EditorError::EventOutOfRange { note, event: k })
    }

    pub fn update_event(
        &mut self,
        note: usize,
        k: usize,
        event: LevelEvent,
    ) -> Result<(), EditorError> {
        self.ensure_editable()?;
        self.check_note(event.note_index())?;
        let slot = self.event_slot(note, k)?;
        self.commit(|level| level.addons[slot] = event)
    }

    pub fn delete_event(&mut self, note: usize, k: usize) -> Result<LevelEvent, EditorError> {
        self.ensure_editable()?;
        let slot = self.event_slot(note, k)?;
        Ok(self.level.addons.remove(slot))
    }
}
