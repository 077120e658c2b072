//! Event Types
//!
//! Events flow from the player core to the UI thread.

use serde::{Deserialize, Serialize};

use crate::catalog::Track;
use crate::error::{ErrorKind, PlayerError};
use crate::transport::TransportPhase;

/// Events sent from the player to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Transport moved to a new phase
    TransportChanged { phase: TransportPhase, is_playing: bool },

    /// Media metadata for the current track is available
    TrackLoaded { track: Track, duration: f64 },

    /// Media clock moved
    TimeUpdate { current_time: f64, duration: f64 },

    VolumeChanged { volume: f32, is_muted: bool },

    /// Current EQ gains, lowest band first
    EqualizerChanged { gains: Vec<f32> },

    WaveformReady { columns: usize },

    WaveformFailed { message: String },

    /// Playback reached the end of the track
    Ended,

    /// Error occurred
    Error { kind: ErrorKind, message: String },
}

impl Event {
    /// Create an error event from any PlayerError
    pub fn error(err: &PlayerError) -> Self {
        Event::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::TimeUpdate {
            current_time: 1.5,
            duration: 10.0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"TimeUpdate\""));
        assert!(json.contains("\"current_time\":1.5"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_unit_event() {
        let json = serde_json::to_string(&Event::Ended).unwrap();
        assert_eq!(json, r#"{"type":"Ended"}"#);
    }

    #[test]
    fn test_error_event() {
        let event = Event::error(&PlayerError::Network("HTTP 502".into()));
        match event {
            Event::Error { kind, message } => {
                assert_eq!(kind, ErrorKind::Network);
                assert!(message.contains("502"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
