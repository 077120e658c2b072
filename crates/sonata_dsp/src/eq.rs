//! 10-Band Equalizer State
//!
//! Band layout, gain validation and the UI-side source of truth for gains.
//! Filter response follows the RBJ (Robert Bristow-Johnson) Audio EQ Cookbook.

use biquad::{Coefficients, ToHertz, Type};

use crate::error::DspError;

/// Number of equalizer bands
pub const BAND_COUNT: usize = 10;

/// EQ band frequencies (Hz) - ISO-style octave centers, lowest first
pub const EQ_BANDS: [f32; BAND_COUNT] = [
    32.0,    // Sub-bass
    64.0,    // Bass
    125.0,   // Low-mid
    250.0,   // Mid
    500.0,   // Mid
    1000.0,  // Upper-mid
    2000.0,  // Presence
    4000.0,  // Brilliance
    8000.0,  // High
    16000.0, // Air
];

/// Lowest accepted band gain
pub const MIN_GAIN_DB: f32 = -12.0;

/// Highest accepted band gain
pub const MAX_GAIN_DB: f32 = 12.0;

/// Fixed bandwidth for every band
pub const BAND_Q: f32 = 1.0;

/// Filter type for each EQ band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandType {
    LowShelf,
    Peaking,
    HighShelf,
}

impl BandType {
    /// Response type derived from a band's position in the chain.
    ///
    /// First band is a low shelf, last band a high shelf, everything in
    /// between is a peaking bell.
    pub fn for_position(index: usize, count: usize) -> Self {
        match index {
            0 => BandType::LowShelf,
            i if i + 1 == count => BandType::HighShelf,
            _ => BandType::Peaking,
        }
    }
}

/// Single EQ band
///
/// Bands are values: an edit produces a new record via [`Band::with_gain`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub frequency: f32,
    pub gain_db: f32,
    pub q: f32,
    pub band_type: BandType,
}

impl Band {
    pub fn new(frequency: f32, band_type: BandType) -> Self {
        Self {
            frequency,
            gain_db: 0.0,
            q: BAND_Q,
            band_type,
        }
    }

    /// Copy of this band with a different gain
    pub fn with_gain(self, gain_db: f32) -> Self {
        Self { gain_db, ..self }
    }

    /// Generate BiQuad coefficients for this band
    pub fn to_coefficients(self, sample_rate: f32) -> Result<Coefficients<f32>, DspError> {
        if sample_rate <= 0.0 || !sample_rate.is_finite() {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }

        let filter = match self.band_type {
            BandType::LowShelf => Type::LowShelf(self.gain_db),
            BandType::Peaking => Type::PeakingEQ(self.gain_db),
            BandType::HighShelf => Type::HighShelf(self.gain_db),
        };

        Coefficients::<f32>::from_params(filter, sample_rate.hz(), self.frequency.hz(), self.q)
            .map_err(|_| DspError::InvalidCoefficients {
                frequency: self.frequency,
                sample_rate,
            })
    }
}

/// Validate a gain value and clamp it into [`MIN_GAIN_DB`, `MAX_GAIN_DB`]
pub fn clamp_gain(gain_db: f32) -> Result<f32, DspError> {
    if !gain_db.is_finite() {
        return Err(DspError::InvalidGain(gain_db));
    }
    Ok(gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB))
}

/// Ordered gains for the fixed band set
#[derive(Debug, Clone, PartialEq)]
pub struct EqualizerState {
    bands: [Band; BAND_COUNT],
}

impl Default for EqualizerState {
    fn default() -> Self {
        let bands = core::array::from_fn(|i| {
            Band::new(EQ_BANDS[i], BandType::for_position(i, BAND_COUNT))
        });
        Self { bands }
    }
}

impl EqualizerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// All bands, lowest frequency first
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band(&self, index: usize) -> Option<&Band> {
        self.bands.get(index)
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Replace the gain of one band
    ///
    /// Returns the gain actually stored, after clamping.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Result<f32, DspError> {
        if index >= self.bands.len() {
            return Err(DspError::InvalidBandIndex {
                index,
                count: self.bands.len(),
            });
        }
        let gain_db = clamp_gain(gain_db)?;
        self.bands[index] = self.bands[index].with_gain(gain_db);
        Ok(gain_db)
    }

    /// Restore every band to 0 dB
    pub fn reset_all(&mut self) {
        for band in self.bands.iter_mut() {
            *band = band.with_gain(0.0);
        }
    }

    /// Get all gains (useful for UI serialization)
    pub fn gains(&self) -> [f32; BAND_COUNT] {
        core::array::from_fn(|i| self.bands[i].gain_db)
    }

    pub fn is_flat(&self) -> bool {
        self.bands.iter().all(|b| b.gain_db == 0.0)
    }
}
