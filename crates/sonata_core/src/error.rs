//! Player Error Types

use serde::{Deserialize, Serialize};
use sonata_dsp::DspError;
use thiserror::Error;

/// Errors that can occur in the player core
///
/// All of these are recoverable: none should take the host down.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Audio output unavailable: {0}")]
    Capability(String),

    #[error("{what} out of range: {value}")]
    InvalidRange { what: &'static str, value: f64 },

    #[error("Stale load completion for generation {stale} (current is {current})")]
    StaleLoad { stale: u64, current: u64 },

    #[error("No track loaded")]
    NoTrackLoaded,

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("DSP error: {0}")]
    Dsp(#[from] DspError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ring buffer overflow - audio thread can't keep up")]
    BufferOverflow,

    #[error("Channel send error - receiver dropped")]
    ChannelSendError,
}

/// Result type alias for player operations
pub type PlayerResult<T> = Result<T, PlayerError>;

/// Error category reported to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Capability,
    InvalidRange,
    StaleLoad,
    NoTrack,
    Decode,
    Internal,
}

impl PlayerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlayerError::Network(_) => ErrorKind::Network,
            PlayerError::Capability(_) => ErrorKind::Capability,
            PlayerError::InvalidRange { .. } => ErrorKind::InvalidRange,
            PlayerError::Dsp(DspError::InvalidBandIndex { .. } | DspError::InvalidGain(_)) => {
                ErrorKind::InvalidRange
            }
            PlayerError::StaleLoad { .. } => ErrorKind::StaleLoad,
            PlayerError::NoTrackLoaded => ErrorKind::NoTrack,
            PlayerError::Decode(_) => ErrorKind::Decode,
            PlayerError::Dsp(_)
            | PlayerError::Config(_)
            | PlayerError::BufferOverflow
            | PlayerError::ChannelSendError => ErrorKind::Internal,
        }
    }

    /// Check a float argument is a real number before clamping it
    pub(crate) fn check_finite(what: &'static str, value: f64) -> PlayerResult<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(PlayerError::InvalidRange { what, value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlayerError::Network("search returned HTTP 502".into());
        assert!(err.to_string().contains("502"));

        let err = PlayerError::InvalidRange {
            what: "volume",
            value: f64::NAN,
        };
        assert!(err.to_string().contains("volume"));

        let err = PlayerError::StaleLoad { stale: 1, current: 2 };
        assert!(err.to_string().contains("generation 1"));
    }

    #[test]
    fn test_error_from_dsp() {
        let dsp_err = DspError::InvalidBandIndex { index: 10, count: 10 };
        let err: PlayerError = dsp_err.into();
        assert!(matches!(err, PlayerError::Dsp(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidRange);

        let err: PlayerError = DspError::InvalidSampleRate(0.0).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(PlayerError::Capability("x".into()).kind(), ErrorKind::Capability);
        assert_eq!(PlayerError::NoTrackLoaded.kind(), ErrorKind::NoTrack);
        assert_eq!(
            PlayerError::StaleLoad { stale: 0, current: 1 }.kind(),
            ErrorKind::StaleLoad
        );
    }

    #[test]
    fn test_check_finite() {
        assert_eq!(PlayerError::check_finite("seek", 3.5), Ok(3.5));
        assert!(PlayerError::check_finite("seek", f64::INFINITY).is_err());
    }
}
