//! Waveform Peak Reduction
//!
//! Reduces a decoded track to a fixed number of (min, max) columns for
//! drawing an amplitude overview. Channels are mixed to mono first and the
//! result is normalized so the loudest column reaches 1.0.

use crate::error::DspError;

/// Amplitude overview of a whole track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformPeaks {
    columns: Vec<(f32, f32)>,
}

impl WaveformPeaks {
    /// Build `columns` min/max pairs from interleaved samples
    pub fn from_interleaved(
        samples: &[f32],
        channels: usize,
        columns: usize,
    ) -> Result<Self, DspError> {
        if channels == 0 {
            return Err(DspError::InvalidChannelCount(channels));
        }
        let frames = samples.len() / channels;
        if frames == 0 || columns == 0 {
            return Ok(Self::default());
        }

        let columns = columns.min(frames);
        let mut peaks = Vec::with_capacity(columns);
        for column in 0..columns {
            let start = column * frames / columns;
            let end = ((column + 1) * frames / columns).max(start + 1);

            let mut min = f32::MAX;
            let mut max = f32::MIN;
            for frame in samples[start * channels..end * channels].chunks_exact(channels) {
                let mono = frame.iter().sum::<f32>() / channels as f32;
                min = min.min(mono);
                max = max.max(mono);
            }
            peaks.push((min, max));
        }

        let loudest = peaks
            .iter()
            .fold(0.0_f32, |acc, (lo, hi)| acc.max(lo.abs()).max(hi.abs()));
        if loudest > 0.0 {
            for (lo, hi) in peaks.iter_mut() {
                *lo /= loudest;
                *hi /= loudest;
            }
        }

        Ok(Self { columns: peaks })
    }

    pub fn columns(&self) -> &[(f32, f32)] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column under a playback fraction in [0, 1]
    pub fn column_at(&self, fraction: f64) -> Option<usize> {
        if self.columns.is_empty() || !fraction.is_finite() {
            return None;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let index = (fraction * self.columns.len() as f64) as usize;
        Some(index.min(self.columns.len() - 1))
    }

    /// Peak-to-peak height of a column, 0.0 to 2.0
    pub fn amplitude(&self, column: usize) -> f32 {
        self.columns
            .get(column)
            .map(|(lo, hi)| hi - lo)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let peaks = WaveformPeaks::from_interleaved(&[], 2, 100).unwrap();
        assert!(peaks.is_empty());
        assert_eq!(peaks.column_at(0.5), None);
    }

    #[test]
    fn test_zero_channels_rejected() {
        assert!(WaveformPeaks::from_interleaved(&[0.1, 0.2], 0, 10).is_err());
    }

    #[test]
    fn test_normalized_to_unit_peak() {
        let samples: Vec<f32> = (0..4800)
            .map(|i| (i as f32 * 0.05).sin() * 0.25)
            .collect();
        let peaks = WaveformPeaks::from_interleaved(&samples, 1, 64).unwrap();

        assert_eq!(peaks.len(), 64);
        let loudest = peaks
            .columns()
            .iter()
            .fold(0.0_f32, |acc, (lo, hi)| acc.max(lo.abs()).max(hi.abs()));
        assert!((loudest - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_quiet_section_is_visible() {
        // First half loud, second half silent
        let mut samples = vec![0.0_f32; 2000];
        for (i, s) in samples.iter_mut().take(1000).enumerate() {
            *s = if i % 2 == 0 { 0.8 } else { -0.8 };
        }
        let peaks = WaveformPeaks::from_interleaved(&samples, 1, 10).unwrap();
        assert!(peaks.amplitude(0) > 1.9);
        assert_eq!(peaks.amplitude(9), 0.0);
    }

    #[test]
    fn test_stereo_is_mixed() {
        // Opposite-phase channels cancel out
        let samples = vec![0.5, -0.5, 0.5, -0.5, 0.5, -0.5];
        let peaks = WaveformPeaks::from_interleaved(&samples, 2, 3).unwrap();
        assert_eq!(peaks.columns(), &[(0.0, 0.0); 3]);
    }

    #[test]
    fn test_more_columns_than_frames() {
        let samples = vec![0.1, 0.2, 0.3];
        let peaks = WaveformPeaks::from_interleaved(&samples, 1, 50).unwrap();
        assert_eq!(peaks.len(), 3);
    }

    #[test]
    fn test_column_at_fraction() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let peaks = WaveformPeaks::from_interleaved(&samples, 1, 100).unwrap();
        assert_eq!(peaks.column_at(0.0), Some(0));
        assert_eq!(peaks.column_at(0.5), Some(50));
        assert_eq!(peaks.column_at(1.0), Some(99));
        assert_eq!(peaks.column_at(2.0), Some(99));
        assert_eq!(peaks.column_at(f64::NAN), None);
    }
}
