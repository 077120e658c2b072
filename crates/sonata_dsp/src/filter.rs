//! Equalizer Filter Node
//!
//! One biquad per band with sample-accurate gain automation. Gain changes
//! arrive as [`GainEvent`]s and are applied either as an immediate step or
//! as a short linear ramp, so that slider moves don't click.

use biquad::{Biquad, DirectForm2Transposed};

use crate::eq::Band;
use crate::error::DspError;
use crate::processor::{AudioProcessor, GainEvent, ProcessContext};

/// Coefficients are recomputed every this many frames while ramping
const RAMP_UPDATE_INTERVAL: u32 = 16;

#[derive(Debug, Clone, Copy)]
struct GainRamp {
    start_db: f32,
    target_db: f32,
    total: u32,
    elapsed: u32,
}

impl GainRamp {
    fn value(&self) -> f32 {
        let t = self.elapsed as f32 / self.total as f32;
        self.start_db + (self.target_db - self.start_db) * t
    }
}

/// A single equalizer band running on the audio thread
pub struct BiquadFilter {
    band: Band,
    sample_rate: f32,
    // DirectForm2Transposed: better numerical stability than DF1
    left: DirectForm2Transposed<f32>,
    right: DirectForm2Transposed<f32>,
    pending: Option<GainEvent>,
    ramp: Option<GainRamp>,
}

impl BiquadFilter {
    pub fn new(band: Band, sample_rate: f32) -> Result<Self, DspError> {
        let coeffs = band.to_coefficients(sample_rate)?;
        Ok(Self {
            band,
            sample_rate,
            left: DirectForm2Transposed::<f32>::new(coeffs),
            right: DirectForm2Transposed::<f32>::new(coeffs),
            pending: None,
            ramp: None,
        })
    }

    pub fn band(&self) -> &Band {
        &self.band
    }

    /// Gain the filter will settle on once pending automation completes
    pub fn target_gain_db(&self) -> f32 {
        if let Some(event) = self.pending {
            return event.gain_db;
        }
        match self.ramp {
            Some(ramp) => ramp.target_db,
            None => self.band.gain_db,
        }
    }

    pub fn is_automating(&self) -> bool {
        self.pending.is_some() || self.ramp.is_some()
    }

    fn apply_gain(&mut self, gain_db: f32) {
        let band = self.band.with_gain(gain_db);
        // Frequency and Q were validated in `new`, only the gain changes here
        if let Ok(coeffs) = band.to_coefficients(self.sample_rate) {
            self.left.update_coefficients(coeffs);
            self.right.update_coefficients(coeffs);
            self.band = band;
        }
    }

    fn start(&mut self, event: GainEvent) {
        if event.ramp_frames == 0 {
            self.ramp = None;
            self.apply_gain(event.gain_db);
        } else {
            self.ramp = Some(GainRamp {
                start_db: self.band.gain_db,
                target_db: event.gain_db,
                total: event.ramp_frames,
                elapsed: 0,
            });
        }
    }

    fn run_frames(&mut self, buffer: &mut [f32], channels: usize) {
        for frame in buffer.chunks_exact_mut(channels) {
            let mut step = None;
            if let Some(ramp) = self.ramp.as_mut() {
                ramp.elapsed += 1;
                if ramp.elapsed >= ramp.total {
                    step = Some((ramp.target_db, true));
                } else if ramp.elapsed % RAMP_UPDATE_INTERVAL == 1 {
                    step = Some((ramp.value(), false));
                }
            }
            if let Some((gain_db, done)) = step {
                self.apply_gain(gain_db);
                if done {
                    self.ramp = None;
                }
            }

            frame[0] = self.left.run(frame[0]);
            if channels > 1 {
                frame[1] = self.right.run(frame[1]);
            }
        }
    }
}

impl AudioProcessor for BiquadFilter {
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext) {
        let channels = context.channels.max(1);
        let frames = buffer.len() / channels;
        let block_start = context.frame_position;
        let block_end = block_start + frames as u64;

        let mut offset = 0;
        if let Some(event) = self.pending {
            if event.at_frame < block_end {
                let due = event.at_frame.saturating_sub(block_start) as usize;
                self.run_frames(&mut buffer[..due * channels], channels);
                self.pending = None;
                self.start(event);
                offset = due * channels;
            }
        }
        self.run_frames(&mut buffer[offset..frames * channels], channels);
    }

    fn reset(&mut self) {
        self.left.reset_state();
        self.right.reset_state();
    }

    fn name(&self) -> &'static str {
        match self.band.band_type {
            crate::eq::BandType::LowShelf => "lowshelf",
            crate::eq::BandType::Peaking => "peaking",
            crate::eq::BandType::HighShelf => "highshelf",
        }
    }

    /// Latest event wins: a newer change replaces one that hasn't started yet
    fn schedule_gain(&mut self, event: &GainEvent) {
        self.pending = Some(*event);
    }

    fn gain_db(&self) -> Option<f32> {
        Some(self.band.gain_db)
    }
}
