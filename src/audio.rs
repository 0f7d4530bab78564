//! Audio output
//!
//! The simulation never touches audio directly. It emits `SessionEvent`s and
//! the host routes them to an `AudioPort`. On wasm the port is Web Audio:
//! a procedural kick hitsound (no sample files) plus an `<audio>` element
//! for the song.

use crate::sim::SessionEvent;

/// Audio commands issued by a session
pub trait AudioPort {
    /// Judgment landed
    fn play_hitsound(&mut self);
    /// Start the song, skipping `seek_ms` into it
    fn start_music(&mut self, seek_ms: f64);
    /// Halt the song and rewind
    fn stop_music(&mut self);
    /// Countdown tick (optional)
    fn countdown_beat(&mut self, _beats_left: u32) {}
}

/// Forward the audio-relevant events of one frame to `port`
pub fn route_events(events: &[SessionEvent], port: &mut impl AudioPort) {
    for event in events {
        match event {
            SessionEvent::Hitsound => port.play_hitsound(),
            SessionEvent::AudioStart { seek_ms } => port.start_music(*seek_ms),
            SessionEvent::AudioStop => port.stop_music(),
            SessionEvent::CountdownBeat { beats_left } if *beats_left > 0 => {
                port.countdown_beat(*beats_left)
            }
            _ => {}
        }
    }
}

/// Port that only logs and counts, for headless runs
#[derive(Debug, Clone, Default)]
pub struct LogAudio {
    pub hitsounds: u32,
    pub music_playing: bool,
}

impl AudioPort for LogAudio {
    fn play_hitsound(&mut self) {
        self.hitsounds += 1;
    }

    fn start_music(&mut self, seek_ms: f64) {
        log::debug!("Music start (seek {:.0}ms)", seek_ms);
        self.music_playing = true;
    }

    fn stop_music(&mut self) {
        if self.music_playing {
            log::debug!("Music stop");
        }
        self.music_playing = false;
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudio;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, GainNode, HtmlAudioElement, OscillatorNode, OscillatorType};

    use super::AudioPort;
    use crate::sim::AudioStatus;

    /// `HTMLMediaElement.HAVE_ENOUGH_DATA`
    const HAVE_ENOUGH_DATA: u16 = 4;

    /// Web Audio backed port
    pub struct WebAudio {
        ctx: Option<AudioContext>,
        music: Option<HtmlAudioElement>,
        master_volume: f32,
        music_volume: f32,
        hitsound_volume: f32,
        muted: bool,
    }

    impl Default for WebAudio {
        fn default() -> Self {
            Self::new()
        }
    }

    impl WebAudio {
        pub fn new() -> Self {
            // Try to create audio context (may fail if not in secure context)
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - hitsounds disabled");
            }
            Self {
                ctx,
                music: None,
                master_volume: 0.8,
                music_volume: 1.0,
                hitsound_volume: 0.5,
                muted: false,
            }
        }

        /// Resume audio context (required after user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        pub fn set_volumes(&mut self, master: f32, music: f32, hitsound: f32) {
            self.master_volume = master.clamp(0.0, 1.0);
            self.music_volume = music.clamp(0.0, 1.0);
            self.hitsound_volume = hitsound.clamp(0.0, 1.0);
            self.apply_music_volume();
        }

        pub fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
            self.apply_music_volume();
        }

        /// Begin loading a song; poll `status()` until it is ready
        pub fn load_music(&mut self, href: Option<&str>) {
            self.stop_music();
            self.music = None;
            let Some(href) = href else { return };
            match HtmlAudioElement::new_with_src(href) {
                Ok(el) => {
                    el.set_preload("auto");
                    el.load();
                    self.music = Some(el);
                    self.apply_music_volume();
                    log::info!("Loading music: {}", href);
                }
                Err(e) => log::warn!("Failed to create audio element: {:?}", e),
            }
        }

        /// Readiness for `Session::set_audio_status`
        pub fn status(&self) -> AudioStatus {
            match &self.music {
                None => AudioStatus::NotRequired,
                Some(el) if el.error().is_some() => {
                    AudioStatus::Failed("Failed to load audio".to_string())
                }
                Some(el) if el.ready_state() >= HAVE_ENOUGH_DATA => AudioStatus::Ready,
                Some(_) => AudioStatus::Loading,
            }
        }

        fn apply_music_volume(&self) {
            if let Some(el) = &self.music {
                let vol = if self.muted {
                    0.0
                } else {
                    self.master_volume * self.music_volume
                };
                el.set_volume(vol as f64);
            }
        }

        fn effect_volume(&self) -> f32 {
            if self.muted {
                0.0
            } else {
                self.master_volume * self.hitsound_volume
            }
        }

        /// Create an oscillator with gain envelope
        fn create_osc(
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        fn live_context(&self) -> Option<&AudioContext> {
            let ctx = self.ctx.as_ref()?;
            // Resume context if suspended (browsers require user gesture)
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }
            Some(ctx)
        }
    }

    impl AudioPort for WebAudio {
        /// Kick - 60Hz sine dropping fast under a ~30/s exponential decay
        fn play_hitsound(&mut self) {
            let vol = self.effect_volume();
            if vol <= 0.0 {
                return;
            }
            let Some(ctx) = self.live_context() else { return };
            let Some((osc, gain)) = Self::create_osc(ctx, 60.0, OscillatorType::Sine) else {
                return;
            };
            let t = ctx.current_time();

            gain.gain().set_value_at_time(vol * 0.6, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.1)
                .ok();
            osc.frequency().set_value_at_time(60.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(30.0, t + 0.1)
                .ok();

            osc.start().ok();
            osc.stop_with_when(t + 0.12).ok();
        }

        fn start_music(&mut self, seek_ms: f64) {
            let Some(el) = &self.music else { return };
            el.set_current_time(seek_ms / 1000.0);
            if let Err(e) = el.play() {
                log::warn!("Music playback failed: {:?}", e);
            }
        }

        fn stop_music(&mut self) {
            if let Some(el) = &self.music {
                let _ = el.pause();
                el.set_current_time(0.0);
            }
        }

        /// Countdown - short high ping
        fn countdown_beat(&mut self, _beats_left: u32) {
            let vol = self.effect_volume();
            if vol <= 0.0 {
                return;
            }
            let Some(ctx) = self.live_context() else { return };
            let Some((osc, gain)) = Self::create_osc(ctx, 880.0, OscillatorType::Triangle) else {
                return;
            };
            let t = ctx.current_time();

            gain.gain().set_value_at_time(vol * 0.3, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.08)
                .ok();

            osc.start().ok();
            osc.stop_with_when(t + 0.1).ok();
        }
    }
}
