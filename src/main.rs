//! Railbeat entry point
//!
//! Browser: drives a session from requestAnimationFrame with DOM input and HUD.
//! Native: headless runner that plays a level file and logs the result.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, KeyboardEvent};

    use railbeat::audio::{WebAudio, route_events};
    use railbeat::consts::*;
    use railbeat::sim::{AudioStatus, Session, SessionEvent, SessionPhase, TickInput, tick};
    use railbeat::{LevelDocument, Settings};

    /// Upper bound on catch-up ticks per frame
    const MAX_SUBSTEPS: u32 = 6;

    /// Game instance holding all state
    struct Game {
        session: Session,
        audio: WebAudio,
        settings: Settings,
        input: TickInput,
        accumulator: f32,
        last_time: f64,
    }

    impl Game {
        fn new(level: &LevelDocument, settings: Settings) -> Self {
            let mut audio = WebAudio::new();
            audio.set_volumes(
                settings.master_volume,
                settings.music_volume * level.property.song.volume,
                settings.hitsound_volume * level.property.level.hitsound_volume,
            );
            audio.load_music(level.audio_ref());
            Self {
                session: Session::new(level, settings.session_config()),
                audio,
                settings,
                input: TickInput::default(),
                accumulator: 0.0,
                last_time: 0.0,
            }
        }

        /// Run simulation ticks and dispatch their side effects
        fn update(&mut self, dt: f32) {
            if self.session.audio_status() == &AudioStatus::Loading {
                let status = self.audio.status();
                if status != AudioStatus::Loading {
                    log::info!("Audio status: {:?}", status);
                    self.session.set_audio_status(status);
                }
            }

            self.accumulator += dt.min(MAX_FRAME_DT);
            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                tick(&mut self.session, &self.input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;

                // Clear one-shot inputs after processing
                self.input.hit = false;
            }

            let events = self.session.drain_events();
            route_events(&events, &mut self.audio);
            for event in &events {
                match event {
                    SessionEvent::GameOver { death_count } => {
                        log::info!("Game over after {} death(s)", death_count)
                    }
                    SessionEvent::LevelCleared => {
                        log::info!("Level cleared, score {}", self.session.score())
                    }
                    _ => {}
                }
            }
        }

        fn toggle_start(&mut self) {
            self.audio.resume();
            if self.session.phase().is_running() {
                self.session.stop();
            } else {
                if self.session.phase() == SessionPhase::GameOver {
                    self.session.reset();
                }
                if let Err(e) = self.session.start() {
                    log::warn!("Cannot start: {}", e);
                }
            }
        }

        fn toggle_auto_play(&mut self) {
            self.settings.auto_play = !self.settings.auto_play;
            self.session.set_auto_play(self.settings.auto_play);
            self.settings.save();
            log::info!("Auto play: {}", self.settings.auto_play);
        }

        fn toggle_invincible(&mut self) {
            self.settings.invincible = !self.settings.invincible;
            self.session.set_invincible(self.settings.invincible);
            self.settings.save();
            log::info!("Invincible: {}", self.settings.invincible);
        }

        /// Update HUD elements in DOM
        fn update_hud(&self, document: &Document) {
            let snap = self.session.snapshot();

            set_text(document, "#hud-score .hud-value", &snap.score.to_string());
            set_text(
                document,
                "#hud-note .hud-value",
                &format!("{}/{}", snap.current_note_index.min(snap.note_count), snap.note_count),
            );
            set_text(document, "#hud-deaths .hud-value", &snap.death_count.to_string());

            // Combo (only show when 2+)
            if let Some(el) = document.get_element_by_id("hud-combo") {
                if snap.combo > 1 {
                    let _ = el.set_attribute("class", "hud-item");
                    set_text(document, "#hud-combo .hud-value", &snap.combo.to_string());
                } else {
                    let _ = el.set_attribute("class", "hud-item hidden");
                }
            }

            // Judgment label follows the judged note
            if let Some(el) = document.get_element_by_id("judgment-label") {
                match snap.label {
                    Some(label) if snap.label_remaining_ms > 0.0 => {
                        el.set_text_content(Some(label.kind.label()));
                        let _ = el.set_attribute(
                            "style",
                            &format!(
                                "color: {}; transform: translate({}px, {}px)",
                                label.kind.color(),
                                label.position.x,
                                -label.position.y
                            ),
                        );
                        let _ = el.set_attribute("class", "");
                    }
                    _ => {
                        let _ = el.set_attribute("class", "hidden");
                    }
                }
            }

            if let Some(el) = document.get_element_by_id("ball") {
                let _ = el.set_attribute(
                    "style",
                    &format!(
                        "transform: translate({}px, {}px)",
                        snap.ball_pos.x, -snap.ball_pos.y
                    ),
                );
            }

            if let Some(el) = document.get_element_by_id("countdown") {
                if let SessionPhase::Countdown { beats_left } = snap.phase {
                    el.set_text_content(Some(&beats_left.to_string()));
                    let _ = el.set_attribute("class", "");
                } else {
                    let _ = el.set_attribute("class", "hidden");
                }
            }

            if let Some(el) = document.get_element_by_id("game-over") {
                if snap.phase == SessionPhase::GameOver {
                    let _ = el.set_attribute("class", "");
                    set_text(document, "#final-score", &snap.score.to_string());
                } else {
                    let _ = el.set_attribute("class", "hidden");
                }
            }
        }
    }

    fn set_text(document: &Document, selector: &str, text: &str) {
        if let Some(el) = document.query_selector(selector).ok().flatten() {
            el.set_text_content(Some(text));
        }
    }

    /// Level JSON embedded in the page, or the built-in sample
    fn load_level(document: &Document) -> LevelDocument {
        let json = document
            .get_element_by_id("level-data")
            .and_then(|el| el.text_content());
        match json.map(|j| LevelDocument::from_json(&j)) {
            Some(Ok(level)) => level,
            Some(Err(e)) => {
                log::warn!("Embedded level rejected ({}), using sample", e);
                LevelDocument::sample()
            }
            None => LevelDocument::sample(),
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("Failed to init logger: {}", e).into());
        }

        log::info!("Railbeat starting...");

        let Some(window) = web_sys::window() else { return };
        let Some(document) = window.document() else { return };

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let level = load_level(&document);
        let settings = Settings::load();
        log::info!(
            "Loaded \"{}\" ({} notes, {} BPM)",
            level.property.song.name,
            level.note_count(),
            level.bpm()
        );

        let game = Rc::new(RefCell::new(Game::new(&level, settings)));

        setup_input_handlers(game.clone());
        setup_auto_stop(game.clone());

        if let Some(hud) = document.get_element_by_id("hud") {
            let _ = hud.set_attribute("class", "");
        }

        request_animation_frame(game);

        log::info!("Railbeat running!");
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };

        // Keyboard
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if event.repeat() {
                    return;
                }
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    " " | "d" | "f" | "j" | "k" => g.input.hit = true,
                    "Enter" => g.toggle_start(),
                    "Escape" => g.session.stop(),
                    "r" | "R" => g.session.reset(),
                    "a" | "A" => g.toggle_auto_play(),
                    "i" | "I" => g.toggle_invincible(),
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Pointer / touch
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                g.input.hit = true;
            });
            let _ = window
                .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Stop the run when the tab is hidden (timers keep virtual time, audio does not)
    fn setup_auto_stop(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                let mut g = game.borrow_mut();
                if g.session.phase().is_running() {
                    g.session.stop();
                    log::info!("Auto-stopped (tab hidden)");
                }
            }
        });
        let _ = document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt);
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                g.update_hud(&document);
            }
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    headless::run(std::env::args().skip(1))
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::collections::HashMap;

    use railbeat::audio::{LogAudio, route_events};
    use railbeat::consts::*;
    use railbeat::sim::{Session, SessionEvent, SessionPhase, TickInput, tick};
    use railbeat::{LevelDocument, LevelError, Settings};

    /// Seconds of simulated time after the last note before giving up
    const TAIL_SECS: f32 = 5.0;

    #[derive(Debug, Default)]
    struct Options {
        auto_play: bool,
        invincible: bool,
        start_index: Option<usize>,
        level_path: Option<String>,
    }

    fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
        let mut opts = Options::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--auto" => opts.auto_play = true,
                "--invincible" => opts.invincible = true,
                "--start" => {
                    let value = args.next().ok_or("--start needs a note index")?;
                    let index = value
                        .parse()
                        .map_err(|_| format!("bad note index: {}", value))?;
                    opts.start_index = Some(index);
                }
                flag if flag.starts_with("--") => return Err(format!("unknown flag: {}", flag)),
                path => opts.level_path = Some(path.to_string()),
            }
        }
        Ok(opts)
    }

    fn load_level(path: Option<&str>) -> Result<LevelDocument, LevelError> {
        match path {
            Some(path) => {
                log::info!("Loading level from {}", path);
                let json = std::fs::read_to_string(path)?;
                LevelDocument::from_json(&json)
            }
            None => {
                log::info!("No level given, playing the built-in sample");
                Ok(LevelDocument::sample())
            }
        }
    }

    pub fn run(args: impl Iterator<Item = String>) -> Result<(), Box<dyn std::error::Error>> {
        let opts = parse_args(args)?;
        let level = load_level(opts.level_path.as_deref())?;

        let mut config = Settings::load().session_config();
        config.auto_play |= opts.auto_play;
        config.invincible |= opts.invincible;
        config.start_index = opts.start_index;

        let mut session = Session::new(&level, config);
        // Headless runs never wait for music
        session.set_audio_status(railbeat::sim::AudioStatus::NotRequired);
        session.start()?;

        let path_len: f32 = session
            .positions()
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .sum();
        let countdown_secs =
            (COUNTDOWN_BEATS as f64 * railbeat::beat_interval_ms(level.bpm()) / 1000.0) as f32;
        let limit = countdown_secs + path_len / BALL_SPEED + TAIL_SECS;

        let mut audio = LogAudio::default();
        let mut counts: HashMap<&'static str, u32> = HashMap::new();
        let input = TickInput::default();
        let mut elapsed = 0.0;
        let mut cleared = false;

        while elapsed < limit && session.phase().is_running() {
            tick(&mut session, &input, SIM_DT);
            elapsed += SIM_DT;

            let events = session.drain_events();
            route_events(&events, &mut audio);
            for event in &events {
                match event {
                    SessionEvent::Judged(result) => {
                        log::debug!(
                            "Note {}: {} ({:?}, {:.1} units)",
                            result.note_index,
                            result.kind.label(),
                            result.cause,
                            result.distance
                        );
                        *counts.entry(result.kind.label()).or_default() += 1;
                    }
                    SessionEvent::LevelCleared => cleared = true,
                    _ => {}
                }
            }
            if cleared && session.last_judgment().is_none() {
                break;
            }
        }

        let outcome = match session.phase() {
            SessionPhase::GameOver => "game over",
            _ if cleared => "cleared",
            _ => "timed out",
        };
        session.stop();

        let mut tally: Vec<_> = counts.into_iter().collect();
        tally.sort();
        log::info!(
            "Result: {} | score {} | combo {} | deaths {} | hitsounds {} | {:?}",
            outcome,
            session.score(),
            session.combo(),
            session.death_count(),
            audio.hitsounds,
            tally
        );
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn args(list: &[&str]) -> impl Iterator<Item = String> {
            list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
        }

        #[test]
        fn test_parse_args() {
            let opts = parse_args(args(&["--auto", "--start", "2", "level.json"])).unwrap();
            assert!(opts.auto_play);
            assert!(!opts.invincible);
            assert_eq!(opts.start_index, Some(2));
            assert_eq!(opts.level_path.as_deref(), Some("level.json"));

            assert!(parse_args(args(&["--start"])).is_err());
            assert!(parse_args(args(&["--bogus"])).is_err());
        }

        #[test]
        fn test_missing_level_file() {
            let err = load_level(Some("/nonexistent/railbeat-level.json")).unwrap_err();
            assert!(matches!(err, LevelError::Io(_)));
        }

        #[test]
        fn test_sample_autoplay_run() {
            assert!(run(args(&["--auto"])).is_ok());
        }
    }
}
