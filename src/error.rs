//! Error types shared across the synthesis pipeline

use std::fmt;

/// Keytone error types
#[derive(Debug)]
pub enum KeytoneError {
    /// Synthesis input outside its valid range (rate, duration, frequency)
    InvalidParameter(String),
    /// Symbol not present in the pitch map
    UnknownKey(char),
    /// Unparseable or structurally invalid event payload
    MalformedEvent(String),
    /// Playback queue at capacity, sound dropped
    QueueFull,
    /// Playback queue closed, no further sounds accepted
    QueueClosed,
    /// Invalid or unreadable configuration
    Config(String),
    /// Audio device or stream failure
    Audio(String),
    /// IO error
    Io(std::io::Error),
}

impl KeytoneError {
    /// Per-event errors that the dispatcher reports and then moves past.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KeytoneError::UnknownKey(_)
                | KeytoneError::MalformedEvent(_)
                | KeytoneError::QueueFull
                | KeytoneError::QueueClosed
        )
    }
}

impl fmt::Display for KeytoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeytoneError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            KeytoneError::UnknownKey(key) => write!(f, "Unknown key pressed: {:?}", key),
            KeytoneError::MalformedEvent(msg) => write!(f, "Malformed event: {}", msg),
            KeytoneError::QueueFull => write!(f, "Playback queue full, sound skipped"),
            KeytoneError::QueueClosed => write!(f, "Playback queue closed"),
            KeytoneError::Config(msg) => write!(f, "Configuration error: {}", msg),
            KeytoneError::Audio(msg) => write!(f, "Audio error: {}", msg),
            KeytoneError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for KeytoneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeytoneError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KeytoneError {
    fn from(e: std::io::Error) -> Self {
        KeytoneError::Io(e)
    }
}

/// Result type for keytone operations
pub type Result<T> = std::result::Result<T, KeytoneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(KeytoneError::UnknownKey('z').is_recoverable());
        assert!(KeytoneError::MalformedEvent("x".into()).is_recoverable());
        assert!(KeytoneError::QueueFull.is_recoverable());
        assert!(!KeytoneError::InvalidParameter("rate".into()).is_recoverable());
        assert!(!KeytoneError::Config("bad".into()).is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            KeytoneError::QueueFull.to_string(),
            "Playback queue full, sound skipped"
        );
        assert_eq!(
            KeytoneError::UnknownKey('z').to_string(),
            "Unknown key pressed: 'z'"
        );
    }
}
