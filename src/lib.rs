//! # Keytone - networked keyboard synthesizer
//!
//! Keytone turns key-press events into short 8-bit PCM notes and plays them
//! through one shared audio output.
//!
//! ## Pipeline
//!
//! ```text
//! transport -> EventDispatcher -> PitchMap -> synthesize -> PlaybackQueue -> AudioSink
//! ```
//!
//! - [`pitch_map`]: twenty keys tuned one semitone apart
//! - [`synth`]: fixed-length note rendering with a linear fade-out
//! - [`queue`]: bounded FIFO that drops new notes when full, drained by
//!   one thread
//! - [`dispatcher`]: per-session state machine (current wave type)
//! - [`server`]: TCP line transport, one session per connection
//! - [`audio`]: cpal output device sink
//!
//! ## Quick Start
//!
//! ```rust
//! use keytone::dispatcher::EventDispatcher;
//! use keytone::pitch_map::PitchMap;
//! use keytone::queue::PlaybackQueue;
//! use keytone::sink::MemorySink;
//! use keytone::synth::NoteSettings;
//! use keytone::timbre::Timbre;
//! use std::sync::Arc;
//!
//! let (queue, drain) = PlaybackQueue::with_capacity(10);
//! let sink = MemorySink::new();
//! let player = drain.spawn(sink.clone()).unwrap();
//!
//! let mut session = EventDispatcher::new(
//!     Arc::new(PitchMap::build()),
//!     queue.clone(),
//!     NoteSettings::default(),
//!     Timbre::Strings,
//! );
//! session.handle_message(br#"{"type":"key","key":"a"}"#);
//!
//! queue.close();
//! player.join().unwrap();
//! assert_eq!(sink.buffers()[0].len(), 13230);
//! ```

pub mod audio;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod pitch_map;
pub mod queue;
pub mod server;
pub mod sink;
pub mod synth;
pub mod timbre;

pub use config::Config;
pub use dispatcher::{Dispatched, EventDispatcher, SessionStats};
pub use error::{KeytoneError, Result};
pub use event::InputEvent;
pub use pitch_map::PitchMap;
pub use queue::{PlaybackQueue, QueueDrain, QueueStats};
pub use sink::AudioSink;
pub use synth::{synthesize, NoteSettings, SampleBuffer, Synthesizer};
pub use timbre::Timbre;
