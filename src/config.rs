//! Runtime configuration
//!
//! Sources, lowest priority first: built-in defaults, a TOML file,
//! `KEYTONE_*` environment variables, command-line flags (applied by the
//! binary).

use crate::error::{KeytoneError, Result};
use crate::queue::DEFAULT_CAPACITY;
use crate::synth::{NoteSettings, DEFAULT_SAMPLE_RATE, MAX_NOTE_SECONDS, NOTE_DURATION};
use crate::timbre::Timbre;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TCP address the event server binds
    pub listen: String,
    /// Notes that may wait for playback before new ones are dropped
    pub queue_capacity: usize,
    pub sample_rate: u32,
    /// Seconds per note
    pub note_duration: f64,
    /// Wave type each new session starts with
    pub default_wave: String,
    /// Play through the audio device (otherwise notes are discarded)
    pub audio: bool,
    /// Device ring buffer length in seconds
    pub ring_seconds: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            queue_capacity: DEFAULT_CAPACITY,
            sample_rate: DEFAULT_SAMPLE_RATE,
            note_duration: NOTE_DURATION,
            default_wave: Timbre::default().name().to_string(),
            audio: true,
            ring_seconds: 1.0,
        }
    }
}

impl Config {
    /// Load from `path` (or defaults), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KeytoneError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| KeytoneError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| KeytoneError::Config(e.to_string()))
    }

    /// Apply `KEYTONE_LISTEN`, `KEYTONE_QUEUE_CAPACITY`, `KEYTONE_DEFAULT_WAVE`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(listen) = lookup("KEYTONE_LISTEN") {
            self.listen = listen;
        }
        if let Some(capacity) = lookup("KEYTONE_QUEUE_CAPACITY") {
            self.queue_capacity = capacity.trim().parse().map_err(|_| {
                KeytoneError::Config(format!(
                    "KEYTONE_QUEUE_CAPACITY is not a number: {:?}",
                    capacity
                ))
            })?;
        }
        if let Some(wave) = lookup("KEYTONE_DEFAULT_WAVE") {
            self.default_wave = wave;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(KeytoneError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(KeytoneError::Config("sample_rate must be positive".to_string()));
        }
        if !(self.note_duration.is_finite() && self.note_duration > 0.0) {
            return Err(KeytoneError::Config(format!(
                "note_duration must be positive, got {}",
                self.note_duration
            )));
        }
        if self.note_duration > MAX_NOTE_SECONDS {
            return Err(KeytoneError::Config(format!(
                "note_duration must be at most {} s, got {}",
                MAX_NOTE_SECONDS, self.note_duration
            )));
        }
        if Timbre::from_name(&self.default_wave).is_none() {
            return Err(KeytoneError::Config(format!(
                "unknown default_wave {:?}",
                self.default_wave
            )));
        }
        if !(self.ring_seconds.is_finite() && self.ring_seconds > 0.0) {
            return Err(KeytoneError::Config(format!(
                "ring_seconds must be positive, got {}",
                self.ring_seconds
            )));
        }
        Ok(())
    }

    pub fn note_settings(&self) -> Result<NoteSettings> {
        NoteSettings::new(self.note_duration, self.sample_rate)
    }

    pub fn default_timbre(&self) -> Timbre {
        Timbre::resolve(&self.default_wave)
    }
}
