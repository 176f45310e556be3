use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use rtrb::{Consumer, RingBuffer};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::fft::FrequencyAnalyzer;
use super::tap::Tap;
use super::{AudioError, Playback, SpectrumSource};
use crate::config::AudioConfig;

/// Mono samples buffered between the output thread and the analyser.
/// A few frames' worth at 48 kHz.
const TAP_CAPACITY: usize = 16_384;

struct Output {
    // Dropping the stream silences every sink created from its handle.
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

/// Audio graph: decoded file -> analyser tap -> gain -> default output.
///
/// The spectrum is taken before the gain stage, so volume changes do not
/// change what is drawn.
pub struct Player {
    output: Option<Output>,
    sink: Option<Sink>,
    samples: Option<Consumer<f32>>,
    analyzer: FrequencyAnalyzer,
    gain: f32,
    /// Last requested track, replayed when play is pressed after it ended.
    track: Option<PathBuf>,
}

impl Player {
    /// Open the default output device. When there is none the player still
    /// works as a (silent) spectrum source.
    pub fn new(config: &AudioConfig) -> Result<Self, AudioError> {
        let analyzer = FrequencyAnalyzer::new(
            config.fft_size,
            config.smoothing,
            config.min_decibels,
            config.max_decibels,
        )?;

        let output = match OutputStream::try_default() {
            Ok((stream, handle)) => Some(Output {
                _stream: stream,
                handle,
            }),
            Err(e) => {
                warn!("No audio output available, playback disabled: {}", e);
                None
            }
        };

        info!(
            "Analyser: fft size {}, {} bins",
            analyzer.fft_size(),
            analyzer.bin_count()
        );

        Ok(Self {
            output,
            sink: None,
            samples: None,
            analyzer,
            gain: config.gain.clamp(0.0, 1.0),
            track: None,
        })
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// A track was loaded but its sink has run dry (or was never built).
    fn needs_restart(&self) -> bool {
        self.track.is_some() && self.sink.as_ref().map_or(true, Sink::empty)
    }
}

/// Move tapped samples into the analyser. Anything but a running track
/// feeds a window of silence, so the picture decays instead of freezing.
fn feed_analyzer(analyzer: &mut FrequencyAnalyzer, samples: Option<&mut Consumer<f32>>, live: bool) {
    if let Some(samples) = samples {
        if let Ok(chunk) = samples.read_chunk(samples.slots()) {
            if live {
                let (first, second) = chunk.as_slices();
                analyzer.push_samples(first);
                analyzer.push_samples(second);
            }
            chunk.commit_all();
        }
    }
    if !live {
        analyzer.push_silence(analyzer.fft_size());
    }
}

impl Playback for Player {
    fn load_track(&mut self, path: &Path) -> Result<(), AudioError> {
        self.track = Some(path.to_path_buf());

        // Drop the old sink first so two tracks never overlap.
        self.sink = None;
        self.samples = None;
        self.analyzer.reset();

        let Some(output) = &self.output else {
            return Err(AudioError::NoOutputDevice);
        };

        let file = File::open(path).map_err(|source| AudioError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|source| AudioError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        let (producer, consumer) = RingBuffer::new(TAP_CAPACITY);
        let sink = Sink::try_new(&output.handle)?;
        sink.pause();
        sink.set_volume(self.gain);
        sink.append(Tap::new(decoder.convert_samples::<f32>(), producer));

        info!("Loaded track: {}", path.display());
        self.sink = Some(sink);
        self.samples = Some(consumer);
        Ok(())
    }

    fn play(&mut self) {
        if self.output.is_some() && self.needs_restart() {
            if let Some(path) = self.track.clone() {
                debug!("Restarting finished track {}", path.display());
                if let Err(e) = self.load_track(&path) {
                    warn!("Could not restart {}: {}", path.display(), e);
                    return;
                }
            }
        }
        if let Some(sink) = &self.sink {
            sink.play();
            info!("Playback started");
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
            info!("Playback paused");
        }
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.gain);
        }
        debug!("Gain set to {}", self.gain);
    }

    fn is_playing(&self) -> bool {
        self.sink
            .as_ref()
            .map_or(false, |sink| !sink.is_paused() && !sink.empty())
    }
}

impl SpectrumSource for Player {
    fn bin_count(&self) -> usize {
        self.analyzer.bin_count()
    }

    fn refresh(&mut self, into: &mut [u8]) {
        let live = self.is_playing();
        feed_analyzer(&mut self.analyzer, self.samples.as_mut(), live);
        self.analyzer.byte_frequency_data(into);
    }
}
