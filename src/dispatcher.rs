//! Per-session event handling
//!
//! Each session owns its current timbre; sessions share only the pitch map
//! (read-only) and the playback queue. Per-event failures are logged and
//! counted, never returned to the transport.

use crate::error::{KeytoneError, Result};
use crate::event::InputEvent;
use crate::pitch_map::PitchMap;
use crate::queue::PlaybackQueue;
use crate::synth::{NoteSettings, Synthesizer};
use crate::timbre::Timbre;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What a successfully handled event did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dispatched {
    /// A note was rendered and queued
    Queued { key: char, frequency: f64, timbre: Timbre },
    /// The session timbre changed
    TimbreChanged(Timbre),
}

/// Per-session counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub played: usize,
    pub skipped: usize,
    pub unknown_keys: usize,
    pub malformed: usize,
    pub wave_changes: usize,
    /// Events that hit a non-recoverable error (bad synthesis settings)
    pub failed: usize,
}

pub struct EventDispatcher {
    pitch_map: Arc<PitchMap>,
    queue: PlaybackQueue,
    synth: Synthesizer,
    timbre: Timbre,
    stats: SessionStats,
}

impl EventDispatcher {
    pub fn new(
        pitch_map: Arc<PitchMap>,
        queue: PlaybackQueue,
        settings: NoteSettings,
        timbre: Timbre,
    ) -> Self {
        Self::with_synthesizer(pitch_map, queue, Synthesizer::new(settings), timbre)
    }

    pub fn with_synthesizer(
        pitch_map: Arc<PitchMap>,
        queue: PlaybackQueue,
        synth: Synthesizer,
        timbre: Timbre,
    ) -> Self {
        Self {
            pitch_map,
            queue,
            synth,
            timbre,
            stats: SessionStats::default(),
        }
    }

    pub fn timbre(&self) -> Timbre {
        self.timbre
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Handle one raw transport payload, logging any per-event error
    pub fn handle_message(&mut self, payload: &[u8]) -> Option<Dispatched> {
        debug!("Received {} byte message", payload.len());

        let result = InputEvent::parse(payload).and_then(|event| self.dispatch(event));
        self.record(result)
    }

    /// Handle one decoded event, logging any per-event error
    pub fn handle_event(&mut self, event: InputEvent) -> Option<Dispatched> {
        let result = self.dispatch(event);
        self.record(result)
    }

    /// Apply an event to the session. Errors leave the session unchanged.
    pub fn dispatch(&mut self, event: InputEvent) -> Result<Dispatched> {
        match event {
            InputEvent::WaveChange(name) => self.change_wave(&name),
            InputEvent::KeyPress(symbol) => self.press_key(&symbol),
        }
    }

    fn change_wave(&mut self, name: &str) -> Result<Dispatched> {
        if name.is_empty() {
            return Err(KeytoneError::MalformedEvent(
                "Empty wave type received".to_string(),
            ));
        }

        self.timbre = Timbre::resolve(name);
        info!("Wave type updated to: {}", self.timbre);
        Ok(Dispatched::TimbreChanged(self.timbre))
    }

    fn press_key(&mut self, symbol: &str) -> Result<Dispatched> {
        let mut chars = symbol.chars();
        let key = match (chars.next(), chars.next()) {
            (Some(key), None) => key,
            _ => {
                return Err(KeytoneError::MalformedEvent(format!(
                    "Invalid key format: {:?}",
                    symbol
                )))
            }
        };

        let frequency = self
            .pitch_map
            .frequency(key)
            .ok_or(KeytoneError::UnknownKey(key))?;

        let buffer = self.synth.render(frequency, self.timbre)?;
        if !self.queue.try_enqueue(buffer) {
            return Err(if self.queue.is_closed() {
                KeytoneError::QueueClosed
            } else {
                KeytoneError::QueueFull
            });
        }

        debug!("Queued {:?} at {:.2} Hz ({})", key, frequency, self.timbre);
        Ok(Dispatched::Queued {
            key,
            frequency,
            timbre: self.timbre,
        })
    }

    fn record(&mut self, result: Result<Dispatched>) -> Option<Dispatched> {
        match result {
            Ok(dispatched) => {
                match dispatched {
                    Dispatched::Queued { .. } => self.stats.played += 1,
                    Dispatched::TimbreChanged(_) => self.stats.wave_changes += 1,
                }
                Some(dispatched)
            }
            Err(e) if e.is_recoverable() => {
                match e {
                    KeytoneError::QueueFull | KeytoneError::QueueClosed => {
                        self.stats.skipped += 1
                    }
                    KeytoneError::UnknownKey(_) => self.stats.unknown_keys += 1,
                    _ => self.stats.malformed += 1,
                }
                warn!("{}", e);
                None
            }
            Err(e) => {
                self.stats.failed += 1;
                error!("Event handling failed: {}", e);
                None
            }
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        let s = self.stats;
        info!(
            "Session ended: {} played, {} skipped, {} unknown keys, {} malformed, \
             {} wave changes, {} failed",
            s.played, s.skipped, s.unknown_keys, s.malformed, s.wave_changes, s.failed
        );
    }
}
