//! Player settings and preferences
//!
//! Persisted separately from level documents in LocalStorage.

use serde::{Deserialize, Serialize};

use crate::sim::SessionConfig;

/// Player settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Gameplay ===
    /// Judge every note automatically on arrival
    pub auto_play: bool,
    /// Failures are still tracked but never end the session
    pub invincible: bool,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,
    /// Hitsound volume (0.0 - 1.0)
    pub hitsound_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_play: false,
            invincible: false,

            master_volume: 0.8,
            music_volume: 1.0,
            hitsound_volume: 0.5,
        }
    }
}

impl Settings {
    /// Session options derived from these settings (no preview start)
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            auto_play: self.auto_play,
            invincible: self.invincible,
            start_index: None,
        }
    }

    /// Keep volumes within [0, 1]
    pub fn clamp(&mut self) {
        self.master_volume = self.master_volume.clamp(0.0, 1.0);
        self.music_volume = self.music_volume.clamp(0.0, 1.0);
        self.hitsound_volume = self.hitsound_volume.clamp(0.0, 1.0);
    }

    /// Parse stored settings, clamping out-of-range values
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.clamp();
        Ok(settings)
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "railbeat_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        log::debug!("No settings storage on native ({})", Self::STORAGE_KEY);
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
