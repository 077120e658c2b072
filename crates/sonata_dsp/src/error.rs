//! DSP Error Types

use thiserror::Error;

/// Errors that can occur during DSP operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Invalid band index: {index} (must be 0-{})", .count - 1)]
    InvalidBandIndex { index: usize, count: usize },

    #[error("Invalid gain value: {0} dB (must be a finite number)")]
    InvalidGain(f32),

    #[error("Invalid filter coefficients for frequency {frequency}Hz at sample rate {sample_rate}Hz")]
    InvalidCoefficients { frequency: f32, sample_rate: f32 },

    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f32),

    #[error("Channel count must be at least 1, got {0}")]
    InvalidChannelCount(usize),
}
