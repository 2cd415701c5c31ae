//! Note synthesis: frequency + timbre -> 8-bit unsigned PCM
//!
//! Every note is rendered whole, up front, as a fixed-length buffer with a
//! linear fade-out. Samples are unsigned bytes centred on 128.

use crate::error::{KeytoneError, Result};
use crate::timbre::Timbre;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::{FRAC_PI_2, PI};

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Seconds per rendered key press
pub const NOTE_DURATION: f64 = 0.3;

/// Longest note accepted, in seconds
pub const MAX_NOTE_SECONDS: f64 = 60.0;

/// Envelope level at the first sample
pub const PEAK_AMPLITUDE: f64 = 0.8;

/// Silence in unsigned 8-bit PCM
pub const PCM_CENTER: i64 = 128;

/// Substituted for samples above 255. Kept at 192 (not 255) for
/// compatibility with existing recordings.
pub const OVERFLOW_SAMPLE: u8 = 192;

/// Base oscillator values at one instant, each in [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveShapes {
    pub sine: f64,
    pub square: f64,
    /// Arcsine of the sine, so only approximately linear
    pub triangle: f64,
    pub sawtooth: f64,
    pub noise: f64,
}

impl WaveShapes {
    /// Shapes for `freq` Hz at `t` seconds. `noise` is supplied by the caller.
    pub fn at(freq: f64, t: f64, noise: f64) -> Self {
        let sine = (2.0 * PI * freq * t).sin();
        let square = if sine >= 0.0 { 1.0 } else { -1.0 };
        let triangle = sine.asin() / FRAC_PI_2;
        let cycles = t * freq;
        let sawtooth = 2.0 * (cycles - (0.5 + cycles).floor());

        Self {
            sine,
            square,
            triangle,
            sawtooth,
            noise,
        }
    }
}

/// One rendered note. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SampleBuffer(Vec<u8>);

impl SampleBuffer {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Playback length in seconds at `sample_rate`
    pub fn duration(&self, sample_rate: u32) -> f64 {
        self.0.len() as f64 / sample_rate as f64
    }

    /// Convert to float samples in [-1, 1) for audio devices
    pub fn to_f32(&self) -> Vec<f32> {
        self.0.iter().map(|&s| pcm_u8_to_f32(s)).collect()
    }
}

impl AsRef<[u8]> for SampleBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

pub fn pcm_u8_to_f32(sample: u8) -> f32 {
    (sample as f32 - PCM_CENTER as f32) / PCM_CENTER as f32
}

/// Number of samples for `duration` seconds, rounded to the nearest sample
pub fn sample_count(sample_rate: u32, duration: f64) -> usize {
    (sample_rate as f64 * duration).round() as usize
}

/// Linear fade-out from [`PEAK_AMPLITUDE`] toward zero
pub fn envelope(index: usize, count: usize) -> f64 {
    PEAK_AMPLITUDE * (1.0 - index as f64 / count as f64)
}

/// Clamp a centred integer sample into a byte
pub fn quantize_sample(raw: i64) -> u8 {
    if raw > 255 {
        OVERFLOW_SAMPLE
    } else if raw < 0 {
        0
    } else {
        raw as u8
    }
}

fn validate(freq: f64, duration: f64, sample_rate: u32) -> Result<()> {
    if !(freq.is_finite() && freq > 0.0) {
        return Err(KeytoneError::InvalidParameter(format!(
            "frequency must be positive, got {}",
            freq
        )));
    }
    if !(duration.is_finite() && duration >= 0.0) {
        return Err(KeytoneError::InvalidParameter(format!(
            "duration must be non-negative, got {}",
            duration
        )));
    }
    if duration > MAX_NOTE_SECONDS {
        return Err(KeytoneError::InvalidParameter(format!(
            "duration must be at most {} s, got {}",
            MAX_NOTE_SECONDS, duration
        )));
    }
    if sample_rate == 0 {
        return Err(KeytoneError::InvalidParameter(
            "sample rate must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Render one note using the thread-local RNG for noise
pub fn synthesize(
    freq: f64,
    duration: f64,
    sample_rate: u32,
    timbre: Timbre,
) -> Result<SampleBuffer> {
    synthesize_with_rng(freq, duration, sample_rate, timbre, &mut rand::thread_rng())
}

/// Render one note, drawing noise from `rng`
pub fn synthesize_with_rng<R: Rng + ?Sized>(
    freq: f64,
    duration: f64,
    sample_rate: u32,
    timbre: Timbre,
    rng: &mut R,
) -> Result<SampleBuffer> {
    validate(freq, duration, sample_rate)?;

    let count = sample_count(sample_rate, duration);
    let noisy = timbre.uses_noise();
    let mut buf = Vec::with_capacity(count);

    for i in 0..count {
        let t = i as f64 / sample_rate as f64;
        let noise = if noisy { 2.0 * rng.gen::<f64>() - 1.0 } else { 0.0 };
        let wave = timbre.mix(&WaveShapes::at(freq, t, noise));

        let amplitude = envelope(i, count);
        let raw = PCM_CENTER + (127.0 * amplitude * wave).round() as i64;
        buf.push(quantize_sample(raw));
    }

    Ok(SampleBuffer(buf))
}

/// Fixed per-note settings used for every key press in a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteSettings {
    pub duration: f64,
    pub sample_rate: u32,
}

impl NoteSettings {
    pub fn new(duration: f64, sample_rate: u32) -> Result<Self> {
        // any positive frequency will do for the check
        validate(1.0, duration, sample_rate)?;
        Ok(Self {
            duration,
            sample_rate,
        })
    }

    pub fn samples_per_note(&self) -> usize {
        sample_count(self.sample_rate, self.duration)
    }
}

impl Default for NoteSettings {
    fn default() -> Self {
        Self {
            duration: NOTE_DURATION,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

/// Note renderer owning its noise source
pub struct Synthesizer {
    settings: NoteSettings,
    rng: StdRng,
}

impl Synthesizer {
    pub fn new(settings: NoteSettings) -> Self {
        Self {
            settings,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic noise, for tests and offline rendering
    pub fn with_seed(settings: NoteSettings, seed: u64) -> Self {
        Self {
            settings,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn render(&mut self, freq: f64, timbre: Timbre) -> Result<SampleBuffer> {
        synthesize_with_rng(
            freq,
            self.settings.duration,
            self.settings.sample_rate,
            timbre,
            &mut self.rng,
        )
    }
}
