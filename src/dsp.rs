//! Synthesis primitives for the rhythm loop: tone bursts, click-free
//! envelopes, and a couple of measurement helpers used by tests.

use std::f64::consts::PI;

/// Linear attack/release gain at sample `i` of a note `len` samples long.
/// Both ramps are clamped so they never overlap on very short notes.
pub fn envelope_gain(i: usize, len: usize, attack: usize, release: usize) -> f32 {
    if len == 0 {
        return 0.0;
    }
    let attack = attack.min(len / 2).max(1);
    let release = release.min(len - attack).max(1);
    if i < attack {
        i as f32 / attack as f32
    } else if i >= len - release {
        (len - i) as f32 / release as f32
    } else {
        1.0
    }
}

/// Add an enveloped sine burst into `buf` starting at `offset`.
/// Samples past the end of `buf` are dropped.
pub fn mix_tone(
    buf: &mut [f32],
    offset: usize,
    len: usize,
    freq_hz: f64,
    amp: f32,
    sample_rate: u32,
    attack: usize,
    release: usize,
) {
    let end = (offset + len).min(buf.len());
    if offset >= end {
        return;
    }
    for (i, s) in buf[offset..end].iter_mut().enumerate() {
        let phase = 2.0 * PI * freq_hz * i as f64 / sample_rate as f64;
        *s += amp * envelope_gain(i, len, attack, release) * phase.sin() as f32;
    }
}

/// Milliseconds → whole samples.
pub fn ms_to_samples(ms: f64, sample_rate: u32) -> usize {
    (ms * sample_rate as f64 / 1000.0).round() as usize
}

/// Root mean square of an audio buffer.
pub fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Largest absolute sample value.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}
