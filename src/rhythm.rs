use crate::dsp::{mix_tone, ms_to_samples};
use crate::error::AudioError;
use hound::{SampleFormat, WavSpec, WavWriter};
use log::info;
use std::path::Path;

/// Measures rendered per loop.
pub const LOOP_MEASURES: usize = 2;

/// Envelope ramps applied to every note to avoid clicks.
pub const ATTACK_MS: f64 = 5.0;
pub const RELEASE_MS: f64 = 30.0;

const ACCENT_HZ: f64 = 1320.0;
const BEAT_HZ: f64 = 880.0;
const ACCENT_AMP: f32 = 0.5;
const BEAT_AMP: f32 = 0.35;

/// One event inside a measure, both fields as fractions of the measure.
/// A zero duration is a rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub start: f64,
    pub duration: f64,
}

impl Hit {
    pub const fn note(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    pub const fn rest(start: f64) -> Self {
        Self {
            start,
            duration: 0.0,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.duration <= 0.0
    }
}

/// Playable data for a rhythm name.
#[derive(Debug, Clone, PartialEq)]
pub struct RhythmPattern {
    pub hits: Vec<Hit>,
    pub bpm: f64,
    /// Counted pulses per measure at `bpm`.
    pub beats_per_measure: u32,
}

impl RhythmPattern {
    pub fn measure_ms(&self) -> f64 {
        self.beats_per_measure as f64 * 60_000.0 / self.bpm
    }

    /// Length of the full loop (`LOOP_MEASURES` measures).
    pub fn loop_ms(&self) -> u64 {
        (self.measure_ms() * LOOP_MEASURES as f64).round() as u64
    }

    pub fn notes(&self) -> impl Iterator<Item = &Hit> {
        self.hits.iter().filter(|h| !h.is_rest())
    }
}

fn evenly(count: usize, duration: f64) -> Vec<Hit> {
    (0..count)
        .map(|k| Hit::note(k as f64 / count as f64, duration))
        .collect()
}

fn pattern(beats_per_measure: u32, bpm: f64, hits: Vec<Hit>) -> RhythmPattern {
    RhythmPattern {
        hits,
        bpm,
        beats_per_measure,
    }
}

/// Beat pattern for a rhythm name. Unknown names get plain 4/4.
pub fn pattern_for(name: &str) -> RhythmPattern {
    match name {
        "4/4 Basic" => pattern(4, 100.0, evenly(4, 0.2)),
        "3/4 Waltz" => pattern(3, 90.0, evenly(3, 0.25)),
        "6/8 Compound" => pattern(6, 180.0, evenly(6, 0.12)),
        "5/4 Odd Meter" => pattern(5, 110.0, evenly(5, 0.15)),
        // 4 + 3 grouping
        "7/8 Asymmetric" => pattern(7, 210.0, evenly(7, 0.1)),
        "12/8 Blues" => pattern(
            12,
            216.0,
            (0..4)
                .flat_map(|b| {
                    let beat = b as f64 / 4.0;
                    [Hit::note(beat, 0.15), Hit::note(beat + 2.0 / 12.0, 0.07)]
                })
                .collect(),
        ),
        "2/4 March" => pattern(2, 120.0, vec![Hit::note(0.0, 0.3), Hit::note(0.5, 0.3)]),
        "Syncopated" => pattern(
            4,
            100.0,
            vec![
                Hit::note(0.0, 0.1),
                Hit::note(0.125, 0.2),
                Hit::note(0.375, 0.1),
                Hit::rest(0.5),
                Hit::note(0.625, 0.1),
            ],
        ),
        "Swing" => pattern(
            4,
            120.0,
            (0..4)
                .flat_map(|b| {
                    let beat = b as f64 / 4.0;
                    [Hit::note(beat, 0.12), Hit::note(beat + 2.0 / 12.0, 0.05)]
                })
                .collect(),
        ),
        "Backbeat" => pattern(
            4,
            96.0,
            vec![
                Hit::rest(0.0),
                Hit::note(0.25, 0.2),
                Hit::rest(0.5),
                Hit::note(0.75, 0.2),
            ],
        ),
        "Half-time" => pattern(4, 140.0, vec![Hit::note(0.0, 0.4), Hit::rest(0.5)]),
        "Double-time" => pattern(4, 100.0, evenly(8, 0.1)),
        "Dotted" => pattern(
            4,
            100.0,
            vec![
                Hit::note(0.0, 0.35),
                Hit::note(0.375, 0.1),
                Hit::note(0.5, 0.35),
                Hit::note(0.875, 0.1),
            ],
        ),
        "Triplets" => pattern(4, 90.0, evenly(12, 0.07)),
        // Three against four
        "Polyrhythm" => pattern(
            4,
            100.0,
            evenly(3, 0.1).into_iter().chain(evenly(4, 0.08)).collect(),
        ),
        "Shifting Accents" => pattern(4, 110.0, evenly(6, 0.1)),
        _ => pattern(4, 100.0, evenly(4, 0.2)),
    }
}

/// Render `LOOP_MEASURES` measures back to back as mono f32 at `sample_rate`.
/// Downbeats are pitched higher than the other hits.
pub fn render_loop(pattern: &RhythmPattern, sample_rate: u32) -> Vec<f32> {
    let measure = ms_to_samples(pattern.measure_ms(), sample_rate);
    let attack = ms_to_samples(ATTACK_MS, sample_rate);
    let release = ms_to_samples(RELEASE_MS, sample_rate);
    let mut buf = vec![0.0f32; measure * LOOP_MEASURES];

    for m in 0..LOOP_MEASURES {
        for hit in pattern.notes() {
            let offset = m * measure + (hit.start * measure as f64).round() as usize;
            let len = (hit.duration * measure as f64).round() as usize;
            let (freq, amp) = if hit.start == 0.0 {
                (ACCENT_HZ, ACCENT_AMP)
            } else {
                (BEAT_HZ, BEAT_AMP)
            };
            mix_tone(&mut buf, offset, len, freq, amp, sample_rate, attack, release);
        }
    }

    // Overlapping hits (polyrhythms) can sum past full scale
    for s in buf.iter_mut() {
        *s = s.clamp(-1.0, 1.0);
    }
    buf
}

/// Write the loop for `name` to a mono 32-bit float WAV file.
pub fn export_wav(name: &str, path: &Path, sample_rate: u32) -> Result<u64, AudioError> {
    let pattern = pattern_for(name);
    let samples = render_loop(&pattern, sample_rate);
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &s in &samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    info!(
        "Exported {:?}: {} samples ({} ms) → {:?}",
        name,
        samples.len(),
        pattern.loop_ms(),
        path
    );
    Ok(samples.len() as u64)
}
