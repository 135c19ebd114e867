//! Rhythm loop playback: play / stop / is-playing over a swappable backend.
//!
//! The player renders two measures of the selected rhythm and hands the
//! buffer to an `AudioBackend`. Playback is clocked by the caller's
//! millisecond clock, so the player also works headless (`NullBackend`)
//! and under virtual time in tests.

use crate::error::AudioError;
use crate::rhythm::{pattern_for, render_loop};
use log::{debug, info, warn};

/// Rate used when no real device decides it.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Something that can emit a mono f32 buffer once.
pub trait AudioBackend {
    fn sample_rate(&self) -> u32;
    /// Begin playing `samples` from the start, replacing anything playing.
    fn start(&mut self, samples: Vec<f32>) -> Result<(), AudioError>;
    fn stop(&mut self);
}

/// Discards audio. Used headless and when no output device is available.
pub struct NullBackend {
    sample_rate: u32,
}

impl NullBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl AudioBackend for NullBackend {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&mut self, samples: Vec<f32>) -> Result<(), AudioError> {
        debug!("NullBackend: dropping {} samples", samples.len());
        Ok(())
    }

    fn stop(&mut self) {}
}

// ─── cpal output ────────────────────────────────────────────────────────

#[cfg(feature = "audio")]
pub use cpal_backend::CpalBackend;

#[cfg(feature = "audio")]
mod cpal_backend {
    use super::AudioBackend;
    use crate::error::AudioError;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{Device, Stream, StreamConfig};
    use log::{error, info};

    /// Default output device via cpal.
    ///
    /// Holds the cpal `Stream` while a loop plays; dropping it stops output.
    /// Not `Send`: build it on the thread that will use it.
    pub struct CpalBackend {
        device: Device,
        config: StreamConfig,
        stream: Option<Stream>,
    }

    impl CpalBackend {
        pub fn open() -> Result<Self, AudioError> {
            let host = cpal::default_host();
            let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
            let supported = device
                .default_output_config()
                .map_err(|e| AudioError::Stream(e.to_string()))?;
            info!(
                "Audio output: {} @ {}Hz  {} ch",
                device.name().unwrap_or_else(|_| "unknown".into()),
                supported.sample_rate().0,
                supported.channels()
            );
            Ok(Self {
                device,
                config: supported.into(),
                stream: None,
            })
        }
    }

    impl AudioBackend for CpalBackend {
        fn sample_rate(&self) -> u32 {
            self.config.sample_rate.0
        }

        fn start(&mut self, samples: Vec<f32>) -> Result<(), AudioError> {
            self.stop();
            let channels = self.config.channels as usize;
            let mut pos = 0usize;
            let stream = self
                .device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        // Mono source duplicated to every channel; silence past the end
                        for frame in data.chunks_mut(channels) {
                            let s = samples.get(pos).copied().unwrap_or(0.0);
                            frame.fill(s);
                            pos += 1;
                        }
                    },
                    |e| error!("Audio stream error: {e}"),
                    None,
                )
                .map_err(|e| AudioError::Stream(e.to_string()))?;
            stream
                .play()
                .map_err(|e| AudioError::Stream(e.to_string()))?;
            self.stream = Some(stream);
            Ok(())
        }

        fn stop(&mut self) {
            self.stream = None;
        }
    }
}

/// Best available backend: the default output device when built with
/// `audio` and one exists, otherwise silence.
pub fn default_backend(want_audio: bool) -> Box<dyn AudioBackend> {
    if !want_audio {
        return Box::new(NullBackend::default());
    }
    #[cfg(feature = "audio")]
    {
        match CpalBackend::open() {
            Ok(b) => return Box::new(b),
            Err(e) => warn!("Audio output unavailable ({}), playing silently", e),
        }
    }
    #[cfg(not(feature = "audio"))]
    warn!("Built without the 'audio' feature, playing silently");
    Box::new(NullBackend::default())
}

// ─── Player ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub name: String,
    pub started_ms: u64,
    pub duration_ms: u64,
}

impl NowPlaying {
    pub fn ends_ms(&self) -> u64 {
        self.started_ms + self.duration_ms
    }
}

pub struct RhythmPlayer {
    backend: Box<dyn AudioBackend>,
    current: Option<NowPlaying>,
}

impl RhythmPlayer {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            current: None,
        }
    }

    pub fn silent() -> Self {
        Self::new(Box::new(NullBackend::default()))
    }

    /// Start the two-measure loop for `name`, stopping whatever was playing.
    /// Returns the loop length in ms, or `None` if the backend refused.
    pub fn play(&mut self, name: &str, now_ms: u64) -> Option<u64> {
        self.stop();
        let pattern = pattern_for(name);
        let samples = render_loop(&pattern, self.backend.sample_rate());
        let duration_ms = pattern.loop_ms();

        if let Err(e) = self.backend.start(samples) {
            warn!("Could not play {:?}: {}", name, e);
            return None;
        }
        info!("Playing {:?} ({} bpm, {} ms)", name, pattern.bpm, duration_ms);
        self.current = Some(NowPlaying {
            name: name.to_string(),
            started_ms: now_ms,
            duration_ms,
        });
        Some(duration_ms)
    }

    /// Stop playback. Safe to call when nothing plays. Returns whether
    /// something was stopped.
    pub fn stop(&mut self) -> bool {
        match self.current.take() {
            Some(p) => {
                self.backend.stop();
                debug!("Stopped {:?}", p.name);
                true
            }
            None => false,
        }
    }

    pub fn is_playing(&self, now_ms: u64) -> bool {
        self.current.as_ref().is_some_and(|p| now_ms < p.ends_ms())
    }

    /// Auto-stop once the loop has run out. Returns true if it stopped now.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match &self.current {
            Some(p) if now_ms >= p.ends_ms() => self.stop(),
            _ => false,
        }
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.current.as_ref()
    }

    /// When the current loop ends, if any.
    pub fn deadline(&self) -> Option<u64> {
        self.current.as_ref().map(NowPlaying::ends_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Start(usize),
        Stop,
    }

    struct Recording {
        calls: Arc<Mutex<Vec<Call>>>,
        fail: bool,
    }

    impl AudioBackend for Recording {
        fn sample_rate(&self) -> u32 {
            8000
        }
        fn start(&mut self, samples: Vec<f32>) -> Result<(), AudioError> {
            if self.fail {
                return Err(AudioError::Stream("device gone".into()));
            }
            self.calls.lock().unwrap().push(Call::Start(samples.len()));
            Ok(())
        }
        fn stop(&mut self) {
            self.calls.lock().unwrap().push(Call::Stop);
        }
    }

    fn recording(fail: bool) -> (RhythmPlayer, Arc<Mutex<Vec<Call>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let backend = Recording {
            calls: calls.clone(),
            fail,
        };
        (RhythmPlayer::new(Box::new(backend)), calls)
    }

    #[test]
    fn test_play_runs_for_two_measures() {
        let (mut p, calls) = recording(false);
        // 4 beats at 100 bpm: 2.4 s per measure
        assert_eq!(p.play("4/4 Basic", 1000), Some(4800));
        assert!(p.is_playing(1000));
        assert!(p.is_playing(5799));
        assert!(!p.is_playing(5800));
        assert_eq!(*calls.lock().unwrap(), vec![Call::Start(2 * 19200)]);
    }

    #[test]
    fn test_play_restarts_cleanly() {
        let (mut p, calls) = recording(false);
        p.play("Swing", 0);
        p.play("Triplets", 100);
        assert_eq!(p.now_playing().unwrap().name, "Triplets");
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1], Call::Stop);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut p, calls) = recording(false);
        assert!(!p.stop());
        p.play("Backbeat", 0);
        assert!(p.stop());
        assert!(!p.stop());
        assert!(!p.is_playing(1));
        let stops = calls.lock().unwrap().iter().filter(|c| **c == Call::Stop).count();
        assert_eq!(stops, 1);
    }

    #[test]
    fn test_poll_auto_stops_at_loop_end() {
        let (mut p, _) = recording(false);
        let len = p.play("3/4 Waltz", 0).unwrap();
        assert_eq!(p.deadline(), Some(len));
        assert!(!p.poll(len - 1));
        assert!(p.poll(len));
        assert!(p.now_playing().is_none());
        assert!(!p.poll(len + 1));
    }

    #[test]
    fn test_backend_failure_is_swallowed() {
        let (mut p, _) = recording(true);
        assert_eq!(p.play("Swing", 0), None);
        assert!(!p.is_playing(0));
        assert!(!p.stop());
    }

    #[test]
    fn test_unknown_rhythm_still_plays() {
        let mut p = RhythmPlayer::silent();
        assert_eq!(p.play("Bossa Nova", 0), Some(4800));
    }
}
