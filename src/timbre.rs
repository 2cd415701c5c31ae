//! Named wave types selectable per session

use crate::error::KeytoneError;
use crate::synth::WaveShapes;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Synthesis recipe for a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timbre {
    Sine,
    Square,
    Triangle,
    Sawtooth,
    Noise,
    Flute,
    Clarinet,
    Organ,
    Strings,
    Synth,
    Piano,
    Chiptune,
}

impl Timbre {
    pub const ALL: [Timbre; 12] = [
        Timbre::Sine,
        Timbre::Square,
        Timbre::Triangle,
        Timbre::Sawtooth,
        Timbre::Noise,
        Timbre::Flute,
        Timbre::Clarinet,
        Timbre::Organ,
        Timbre::Strings,
        Timbre::Synth,
        Timbre::Piano,
        Timbre::Chiptune,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Timbre::Sine => "sine",
            Timbre::Square => "square",
            Timbre::Triangle => "triangle",
            Timbre::Sawtooth => "sawtooth",
            Timbre::Noise => "noise",
            Timbre::Flute => "flute",
            Timbre::Clarinet => "clarinet",
            Timbre::Organ => "organ",
            Timbre::Strings => "strings",
            Timbre::Synth => "synth",
            Timbre::Piano => "piano",
            Timbre::Chiptune => "chiptune",
        }
    }

    /// Exact (case-sensitive) name lookup
    pub fn from_name(name: &str) -> Option<Timbre> {
        Timbre::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Name lookup for wave-change requests. Names outside the table render
    /// as a plain sine.
    pub fn resolve(name: &str) -> Timbre {
        Timbre::from_name(name).unwrap_or_else(|| {
            warn!("Unrecognized wave type {:?}, falling back to sine", name);
            Timbre::Sine
        })
    }

    /// Whether output depends on the random noise source
    pub fn uses_noise(self) -> bool {
        matches!(self, Timbre::Noise | Timbre::Piano)
    }

    /// Blend the base shapes into one sample in [-1, 1]
    pub fn mix(self, s: &WaveShapes) -> f64 {
        match self {
            Timbre::Sine | Timbre::Flute => s.sine,
            Timbre::Square | Timbre::Chiptune => s.square,
            Timbre::Triangle => s.triangle,
            Timbre::Sawtooth => s.sawtooth,
            Timbre::Noise => s.noise,
            Timbre::Clarinet => 0.7 * s.sine + 0.3 * s.square,
            Timbre::Organ => 0.5 * s.sine + 0.5 * s.triangle,
            Timbre::Strings => 0.6 * s.sine + 0.4 * s.sawtooth,
            Timbre::Synth => 0.4 * s.square + 0.4 * s.sawtooth + 0.2 * s.sine,
            Timbre::Piano => 0.8 * s.sine + 0.2 * s.noise,
        }
    }
}

impl Default for Timbre {
    fn default() -> Self {
        Timbre::Strings
    }
}

impl fmt::Display for Timbre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Timbre {
    type Err = KeytoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timbre::from_name(s)
            .ok_or_else(|| KeytoneError::InvalidParameter(format!("unknown wave type {:?}", s)))
    }
}
