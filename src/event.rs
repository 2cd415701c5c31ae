//! Input events delivered by a transport
//!
//! Two wire forms are accepted:
//! - JSON envelopes: `{"type":"key","key":"a"}` and `{"type":"wave","wave":"organ"}`
//! - A bare single byte, treated as a key press (older clients)

use crate::error::{KeytoneError, Result};
use serde::{Deserialize, Serialize};

/// One decoded message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Key press, symbol not yet validated
    KeyPress(String),
    /// Wave type change, name not yet validated
    WaveChange(String),
}

/// Structured message as it appears on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub wave: String,
}

impl Envelope {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            kind: "key".to_string(),
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn wave(wave: impl Into<String>) -> Self {
        Self {
            kind: "wave".to_string(),
            wave: wave.into(),
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> String {
        // A struct of plain strings always serializes
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl InputEvent {
    /// Decode one transport payload
    pub fn parse(payload: &[u8]) -> Result<InputEvent> {
        match serde_json::from_slice::<Envelope>(payload) {
            Ok(envelope) => Self::from_envelope(envelope),
            Err(e) => {
                if let [byte] = payload {
                    Ok(InputEvent::KeyPress(char::from(*byte).to_string()))
                } else {
                    Err(KeytoneError::MalformedEvent(format!(
                        "Invalid message format: {}",
                        e
                    )))
                }
            }
        }
    }

    fn from_envelope(envelope: Envelope) -> Result<InputEvent> {
        match envelope.kind.as_str() {
            "key" => Ok(InputEvent::KeyPress(envelope.key)),
            "wave" => Ok(InputEvent::WaveChange(envelope.wave)),
            other => Err(KeytoneError::MalformedEvent(format!(
                "Unknown message type: {:?}",
                other
            ))),
        }
    }
}
