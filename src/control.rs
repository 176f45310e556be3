//! Control surface: commands that change what the render loop draws and plays.
//!
//! Keyboard and IPC both produce [`ControlMessage`]s and send them over a
//! channel; only the render loop touches [`ControlState`].

use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::audio::Playback;
use crate::renderer::{DrawParams, Feature};

/// Volume change applied by the `+` and `-` keys.
pub const GAIN_STEP: f32 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Toggle(Feature),
    Set(Feature, bool),
    PlayPause,
    SetGain(f32),
    GainStep(f32),
    SelectTrack(usize),
    NextTrack,
    PrevTrack,
    Fullscreen,
    Status,
    ListFeatures,
    ListTracks,
    Ping,
    Quit,
}

/// A command plus an optional channel for the one-line reply.
pub struct ControlMessage {
    pub command: ControlCommand,
    pub reply: Option<oneshot::Sender<String>>,
}

impl ControlMessage {
    pub fn new(command: ControlCommand) -> Self {
        Self {
            command,
            reply: None,
        }
    }

    pub fn with_reply(command: ControlCommand, reply: oneshot::Sender<String>) -> Self {
        Self {
            command,
            reply: Some(reply),
        }
    }
}

/// Everything the control surface can change, owned by the render loop.
#[derive(Debug, Clone)]
pub struct ControlState {
    pub params: DrawParams,
    pub gain: f32,
    pub tracks: Vec<PathBuf>,
    pub track_index: usize,
    /// State of the play button, not of the sink: a finished track still
    /// reads as playing until the button is pressed again.
    pub playing: bool,
    pub fullscreen: bool,
    pub fullscreen_available: bool,
    pub quit: bool,
}

impl ControlState {
    pub fn new(params: DrawParams, gain: f32, tracks: Vec<PathBuf>) -> Self {
        Self {
            params,
            gain: gain.clamp(0.0, 1.0),
            tracks,
            track_index: 0,
            playing: false,
            fullscreen: false,
            fullscreen_available: true,
            quit: false,
        }
    }

    pub fn current_track(&self) -> Option<&PathBuf> {
        self.tracks.get(self.track_index)
    }

    /// Volume label shown next to the slider, in percent.
    pub fn volume_label(&self) -> u32 {
        (self.gain * 100.0).round() as u32
    }

    pub fn status_line(&self) -> String {
        let features: Vec<&str> = Feature::all()
            .iter()
            .filter(|f| self.params.get(**f))
            .map(|f| f.name())
            .collect();
        let track = self
            .current_track()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "none".to_string());
        format!(
            "playing={} volume={} track={} fullscreen={} effects={}",
            self.playing,
            self.volume_label(),
            track,
            self.fullscreen,
            if features.is_empty() { "none".to_string() } else { features.join(",") },
        )
    }

    fn select_track(&mut self, index: usize, playback: &mut dyn Playback) -> String {
        let Some(path) = self.tracks.get(index).cloned() else {
            return format!("err: no track {}", index);
        };
        self.track_index = index;

        if let Err(e) = playback.load_track(&path) {
            warn!("Could not load {}: {}", path.display(), e);
        }
        // A track change pauses whatever was playing.
        if self.playing {
            playback.pause();
            self.playing = false;
        }
        format!("ok: {}", path.display())
    }
}

/// Apply one command and return the reply line.
pub fn process_command(
    command: ControlCommand,
    state: &mut ControlState,
    playback: &mut dyn Playback,
) -> String {
    match command {
        ControlCommand::Toggle(feature) => {
            let on = state.params.toggle(feature);
            info!("{} {}", feature, if on { "on" } else { "off" });
            format!("ok: {}={}", feature, on)
        }
        ControlCommand::Set(feature, on) => {
            state.params.set(feature, on);
            format!("ok: {}={}", feature, on)
        }
        ControlCommand::PlayPause => {
            if state.playing {
                playback.pause();
                state.playing = false;
                "ok: paused".to_string()
            } else {
                playback.play();
                state.playing = true;
                "ok: playing".to_string()
            }
        }
        ControlCommand::SetGain(gain) => {
            state.gain = gain.clamp(0.0, 1.0);
            playback.set_gain(state.gain);
            format!("ok: volume {}", state.volume_label())
        }
        ControlCommand::GainStep(delta) => {
            state.gain = (state.gain + delta).clamp(0.0, 1.0);
            playback.set_gain(state.gain);
            format!("ok: volume {}", state.volume_label())
        }
        ControlCommand::SelectTrack(index) => state.select_track(index, playback),
        ControlCommand::NextTrack | ControlCommand::PrevTrack => {
            if state.tracks.is_empty() {
                return "err: no tracks configured".to_string();
            }
            let len = state.tracks.len();
            let index = if command == ControlCommand::NextTrack {
                (state.track_index + 1) % len
            } else {
                (state.track_index + len - 1) % len
            };
            state.select_track(index, playback)
        }
        ControlCommand::Fullscreen => {
            if !state.fullscreen_available {
                return "err: fullscreen not available".to_string();
            }
            state.fullscreen = !state.fullscreen;
            format!("ok: fullscreen={}", state.fullscreen)
        }
        ControlCommand::Status => format!("ok: {}", state.status_line()),
        ControlCommand::ListFeatures => {
            let names: Vec<&str> = Feature::all().iter().map(|f| f.name()).collect();
            format!("ok: {}", names.join(","))
        }
        ControlCommand::ListTracks => {
            let names: Vec<String> = state
                .tracks
                .iter()
                .enumerate()
                .map(|(i, p)| format!("{}={}", i, p.display()))
                .collect();
            format!("ok: {}", names.join(","))
        }
        ControlCommand::Ping => "ok: pong".to_string(),
        ControlCommand::Quit => {
            state.quit = true;
            "ok: bye".to_string()
        }
    }
}
