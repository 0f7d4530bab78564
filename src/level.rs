//! Level document model
//!
//! A level is a song plus an ordered chain of notes. Notes carry offsets
//! relative to the previous note; absolute positions are derived by
//! `sim::path::resolve` and never stored in the document.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a level document
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("invalid level JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid level format - missing content")]
    MissingContent,
    #[error("song bpm must be a positive number, got {0}")]
    InvalidBpm(f64),
    #[error("song offset must be finite, got {0}")]
    InvalidOffset(f64),
    #[error("song volume must be within [0, 1], got {0}")]
    InvalidVolume(f32),
    #[error("note {index} has invalid timing {timing}")]
    InvalidTiming { index: usize, timing: f64 },
    #[error("event {index} sets a non-positive speed {speed}")]
    InvalidSpeed { index: usize, speed: f32 },
    #[error("failed to read level file: {0}")]
    Io(#[from] std::io::Error),
}

/// Credited artist or author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub link: String,
}

/// Song metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Credit>,
    pub bpm: f64,
    /// Audio offset in milliseconds (positive = audio pre-rolls into the countdown)
    #[serde(default)]
    pub offset: f64,
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Audio reference; empty means the level has no music
    #[serde(default)]
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
}

fn default_volume() -> f32 {
    1.0
}

fn default_hitsound_volume() -> f32 {
    0.5
}

fn default_version() -> f32 {
    1.0
}

/// Hitsound selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hitsound {
    #[serde(rename = "type")]
    pub source: String,
    pub name: String,
}

impl Default for Hitsound {
    fn default() -> Self {
        Self {
            source: "internal".to_string(),
            name: "Kick".to_string(),
        }
    }
}

/// Chart-level metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelMeta {
    #[serde(default)]
    pub authors: Vec<Credit>,
    #[serde(default)]
    pub level_tags: Vec<String>,
    #[serde(default = "default_hitsound_volume")]
    pub hitsound_volume: f32,
    #[serde(default)]
    pub hitsound: Hitsound,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_color: Option<String>,
    #[serde(default)]
    pub default_rail_color: Vec<String>,
}

impl Default for LevelMeta {
    fn default() -> Self {
        Self {
            authors: Vec::new(),
            level_tags: Vec::new(),
            hitsound_volume: default_hitsound_volume(),
            hitsound: Hitsound::default(),
            preview_color: None,
            default_rail_color: Vec::new(),
        }
    }
}

/// Document header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default = "default_version")]
    pub version: f32,
    pub song: Song,
    #[serde(default)]
    pub level: LevelMeta,
}

/// Note kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Tap,
    Hold,
    Slide,
}

/// A judgeable point, placed relative to the previous note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Offset from the previous note in grid units
    pub position_offset: [f32; 2],
    /// Nominal timing in ms (advisory; never drives the ball)
    pub timing: f64,
    #[serde(rename = "type", default)]
    pub kind: NoteKind,
}

impl Note {
    pub fn tap(dx: f32, dy: f32, timing: f64) -> Self {
        Self {
            position_offset: [dx, dy],
            timing,
            kind: NoteKind::Tap,
        }
    }
}

/// Easing curves selectable by easing-change events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    #[default]
    Linear,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
}

/// Timed addon bound to a note (several may target the same note)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum LevelEvent {
    SpeedChange {
        note_index: usize,
        #[serde(default)]
        distance_offset: f32,
        new_speed: f32,
    },
    EasingChange {
        note_index: usize,
        #[serde(default)]
        distance_offset: f32,
        new_easing: Easing,
    },
}

impl LevelEvent {
    pub fn speed_change(note_index: usize, new_speed: f32) -> Self {
        LevelEvent::SpeedChange {
            note_index,
            distance_offset: 0.0,
            new_speed,
        }
    }

    pub fn easing_change(note_index: usize, new_easing: Easing) -> Self {
        LevelEvent::EasingChange {
            note_index,
            distance_offset: 0.0,
            new_easing,
        }
    }

    pub fn note_index(&self) -> usize {
        match self {
            LevelEvent::SpeedChange { note_index, .. }
            | LevelEvent::EasingChange { note_index, .. } => *note_index,
        }
    }

    pub(crate) fn note_index_mut(&mut self) -> &mut usize {
        match self {
            LevelEvent::SpeedChange { note_index, .. }
            | LevelEvent::EasingChange { note_index, .. } => note_index,
        }
    }
}

/// A complete chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDocument {
    pub property: Property,
    /// Notes in play order (document order, not timing order)
    pub content: Vec<Note>,
    #[serde(default)]
    pub addons: Vec<LevelEvent>,
}

/// Wire shape used to report a missing `content` with a dedicated error
#[derive(Deserialize)]
struct RawLevel {
    property: Property,
    #[serde(default)]
    content: Option<Vec<Note>>,
    #[serde(default)]
    addons: Vec<LevelEvent>,
}

impl LevelDocument {
    /// Parse and validate a level from JSON text
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let raw: RawLevel = serde_json::from_str(json)?;
        let level = Self {
            property: raw.property,
            content: raw.content.ok_or(LevelError::MissingContent)?,
            addons: raw.addons,
        };
        level.validate()?;
        log::info!(
            "Loaded level '{}' ({} notes, {} events, {} BPM)",
            level.property.song.name,
            level.note_count(),
            level.addons.len(),
            level.bpm()
        );
        Ok(level)
    }

    /// Serialize to indented JSON
    pub fn to_json_pretty(&self) -> Result<String, LevelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the invariants the simulation relies on
    pub fn validate(&self) -> Result<(), LevelError> {
        let song = &self.property.song;
        if !song.bpm.is_finite() || song.bpm <= 0.0 {
            return Err(LevelError::InvalidBpm(song.bpm));
        }
        if !song.offset.is_finite() {
            return Err(LevelError::InvalidOffset(song.offset));
        }
        if !(0.0..=1.0).contains(&song.volume) {
            return Err(LevelError::InvalidVolume(song.volume));
        }
        for (index, note) in self.content.iter().enumerate() {
            if !note.timing.is_finite() || note.timing < 0.0 {
                return Err(LevelError::InvalidTiming {
                    index,
                    timing: note.timing,
                });
            }
        }
        for (index, event) in self.addons.iter().enumerate() {
            if let LevelEvent::SpeedChange { new_speed, .. } = event {
                if !new_speed.is_finite() || *new_speed <= 0.0 {
                    return Err(LevelError::InvalidSpeed {
                        index,
                        speed: *new_speed,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn bpm(&self) -> f64 {
        self.property.song.bpm
    }

    pub fn offset_ms(&self) -> f64 {
        self.property.song.offset
    }

    /// Audio reference, if the level has music
    pub fn audio_ref(&self) -> Option<&str> {
        let href = self.property.song.href.trim();
        (!href.is_empty()).then_some(href)
    }

    /// Number of authored notes (excludes the synthetic start note)
    pub fn note_count(&self) -> usize {
        self.content.len()
    }

    /// Events attached to a note, in document order
    pub fn events_for_note(&self, note_index: usize) -> impl Iterator<Item = &LevelEvent> {
        self.addons
            .iter()
            .filter(move |e| e.note_index() == note_index)
    }

    /// Built-in sample chart
    pub fn sample() -> Self {
        Self {
            property: Property {
                version: 1.0,
                song: Song {
                    name: "Sample Track".to_string(),
                    artists: vec![Credit {
                        name: "PrismMark".to_string(),
                        link: String::new(),
                    }],
                    bpm: 120.0,
                    offset: 0.0,
                    volume: 1.0,
                    href: String::new(),
                    thumb: None,
                },
                level: LevelMeta {
                    authors: vec![Credit {
                        name: "Editor".to_string(),
                        link: String::new(),
                    }],
                    level_tags: vec!["sample".to_string(), "tutorial".to_string()],
                    preview_color: Some("#00ff88ff".to_string()),
                    default_rail_color: vec!["#00ff88ff".to_string(), "#0088ffff".to_string()],
                    ..LevelMeta::default()
                },
            },
            content: vec![
                Note::tap(2.0, 0.0, 1000.0),
                Note::tap(1.0, 2.0, 2000.0),
                Note::tap(-1.0, 2.0, 3000.0),
                Note::tap(-2.0, 0.0, 4000.0),
                Note::tap(-1.0, -2.0, 5000.0),
                Note::tap(1.0, -2.0, 6000.0),
                Note::tap(3.0, 1.0, 7000.0),
                Note::tap(0.0, 3.0, 8000.0),
            ],
            addons: vec![
                LevelEvent::speed_change(3, 1.5),
                LevelEvent::easing_change(5, Easing::EaseOutSine),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVEL_JSON: &str = r#"{
        "property": {
            "version": 1.0,
            "song": { "name": "Test", "bpm": 150, "offset": -40, "volume": 0.8, "href": "song.ogg" },
            "level": { "hitsoundVolume": 0.25, "hitsound": { "type": "internal", "name": "Kick" } }
        },
        "content": [
            { "positionOffset": [2, 0], "timing": 1000, "type": "tap" },
            { "positionOffset": [0, -1], "timing": 500, "type": "slide" }
        ],
        "addons": [
            { "type": "speed_change", "noteIndex": 1, "distanceOffset": 0, "newSpeed": 2.0 },
            { "type": "easing_change", "noteIndex": 1, "distanceOffset": 10, "newEasing": "easeInOutCubic" }
        ]
    }"#;

    #[test]
    fn test_parse_full_document() {
        let level = LevelDocument::from_json(LEVEL_JSON).unwrap();
        assert_eq!(level.bpm(), 150.0);
        assert_eq!(level.offset_ms(), -40.0);
        assert_eq!(level.audio_ref(), Some("song.ogg"));
        assert_eq!(level.note_count(), 2);
        assert_eq!(level.content[1].kind, NoteKind::Slide);
        assert_eq!(level.property.level.hitsound_volume, 0.25);
        assert_eq!(level.events_for_note(1).count(), 2);
        assert_eq!(
            level.addons[1],
            LevelEvent::EasingChange {
                note_index: 1,
                distance_offset: 10.0,
                new_easing: Easing::EaseInOutCubic,
            }
        );
    }

    #[test]
    fn test_missing_content_is_rejected() {
        let json = r#"{ "property": { "song": { "bpm": 120 } } }"#;
        let err = LevelDocument::from_json(json).unwrap_err();
        assert!(matches!(err, LevelError::MissingContent));
        assert!(err.to_string().contains("missing content"));
    }

    #[test]
    fn test_empty_content_is_valid() {
        let json = r#"{ "property": { "song": { "bpm": 120 } }, "content": [] }"#;
        let level = LevelDocument::from_json(json).unwrap();
        assert_eq!(level.note_count(), 0);
        assert_eq!(level.audio_ref(), None);
        assert_eq!(level.property.song.volume, 1.0);
    }

    #[test]
    fn test_bad_bpm_is_rejected() {
        let json = r#"{ "property": { "song": { "bpm": 0 } }, "content": [] }"#;
        assert!(matches!(
            LevelDocument::from_json(json),
            Err(LevelError::InvalidBpm(_))
        ));

        let json = r#"{ "property": { "song": { "bpm": "fast" } }, "content": [] }"#;
        assert!(matches!(
            LevelDocument::from_json(json),
            Err(LevelError::Json(_))
        ));
    }

    #[test]
    fn test_validation_catches_bad_values() {
        let mut level = LevelDocument::sample();
        level.property.song.volume = 1.5;
        assert!(matches!(level.validate(), Err(LevelError::InvalidVolume(_))));

        let mut level = LevelDocument::sample();
        level.content[2].timing = -1.0;
        assert!(matches!(
            level.validate(),
            Err(LevelError::InvalidTiming { index: 2, .. })
        ));

        let mut level = LevelDocument::sample();
        level.addons.push(LevelEvent::speed_change(0, 0.0));
        assert!(matches!(
            level.validate(),
            Err(LevelError::InvalidSpeed { index: 2, .. })
        ));
    }

    #[test]
    fn test_sample_survives_save_and_load() {
        let level = LevelDocument::sample();
        let json = level.to_json_pretty().unwrap();
        assert!(json.contains("\"positionOffset\""));
        assert!(json.contains("\"speed_change\""));
        assert!(json.contains("\"easeOutSine\""));
        assert_eq!(LevelDocument::from_json(&json).unwrap(), level);
    }
}
