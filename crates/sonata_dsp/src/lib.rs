//! Sonata DSP - Digital Signal Processing Module
//!
//! This crate provides the audio processing pieces for Sonata, including:
//! - 10-band equalizer state (low shelf, 8 peaking bells, high shelf)
//! - BiQuad filter nodes with scheduled gain automation
//! - A serial processor chain with a processing-time cursor
//! - Waveform peak reduction for the track overview
//!
//! # Architecture
//!
//! The DSP chain follows a strict "no allocation in audio callback" rule.
//! Gain changes reach the filters as events and are applied between samples.

mod eq;
mod error;
mod filter;
mod processor;
mod waveform;

pub use eq::{
    clamp_gain, Band, BandType, EqualizerState, BAND_COUNT, BAND_Q, EQ_BANDS, MAX_GAIN_DB,
    MIN_GAIN_DB,
};
pub use error::DspError;
pub use filter::BiquadFilter;
pub use processor::{AudioProcessor, GainEvent, ProcessContext, ProcessorChain};
pub use waveform::WaveformPeaks;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify all public types are accessible
        let state = EqualizerState::default();
        let _filter = BiquadFilter::new(state.bands()[0], 48000.0).unwrap();
        let _chain = ProcessorChain::new(48000.0, 2, 512);
    }
}
