//! Player and Stream Configuration

use serde::{Deserialize, Serialize};

/// Audio stream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Buffer size in frames (lower = less latency, higher = more stability)
    pub buffer_size: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            buffer_size: 512,
        }
    }
}

impl StreamConfig {
    /// Calculate latency in milliseconds for this configuration
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Convert a duration in milliseconds to whole frames
    pub fn ms_to_frames(&self, ms: f32) -> u32 {
        (ms.max(0.0) * self.sample_rate as f32 / 1000.0).round() as u32
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        // The 16 kHz band must sit below Nyquist
        if self.sample_rate <= 32000 || self.sample_rate > 192000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.channels == 0 || self.channels > 2 {
            return Err(format!("Invalid channel count: {}", self.channels));
        }
        if self.buffer_size < 32 || self.buffer_size > 8192 {
            return Err(format!("Invalid buffer size: {}", self.buffer_size));
        }
        Ok(())
    }
}

/// Overall player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Output stream configuration
    pub stream: StreamConfig,

    /// Length of the gain ramp used for EQ changes, 0 for an immediate step
    #[serde(default = "default_gain_ramp_ms")]
    pub gain_ramp_ms: f32,

    /// Number of columns in the waveform overview
    #[serde(default = "default_waveform_columns")]
    pub waveform_columns: usize,

    /// Largest tolerated waveform-vs-media clock difference before re-seeking
    #[serde(default = "default_drift_tolerance")]
    pub drift_tolerance_secs: f64,

    /// Capacity of the source ring buffer feeding the graph, in frames
    #[serde(default = "default_source_buffer_frames")]
    pub source_buffer_frames: usize,
}

fn default_gain_ramp_ms() -> f32 {
    5.0
}

fn default_waveform_columns() -> usize {
    600
}

fn default_drift_tolerance() -> f64 {
    0.25
}

fn default_source_buffer_frames() -> usize {
    // Half a second at 48 kHz
    24000
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            gain_ramp_ms: default_gain_ramp_ms(),
            waveform_columns: default_waveform_columns(),
            drift_tolerance_secs: default_drift_tolerance(),
            source_buffer_frames: default_source_buffer_frames(),
        }
    }
}

impl PlayerConfig {
    /// Reproduce immediate step changes instead of ramps
    pub fn with_step_gain(mut self) -> Self {
        self.gain_ramp_ms = 0.0;
        self
    }

    pub fn gain_ramp_frames(&self) -> u32 {
        self.stream.ms_to_frames(self.gain_ramp_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.stream.validate()?;
        if !self.gain_ramp_ms.is_finite() || self.gain_ramp_ms < 0.0 || self.gain_ramp_ms > 100.0 {
            return Err(format!("Invalid gain ramp: {} ms", self.gain_ramp_ms));
        }
        if self.waveform_columns == 0 {
            return Err("Waveform needs at least one column".to_string());
        }
        if !self.drift_tolerance_secs.is_finite() || self.drift_tolerance_secs <= 0.0 {
            return Err(format!(
                "Invalid drift tolerance: {}",
                self.drift_tolerance_secs
            ));
        }
        if self.source_buffer_frames < self.stream.buffer_size as usize {
            return Err(format!(
                "Source buffer ({} frames) smaller than stream buffer ({} frames)",
                self.source_buffer_frames, self.stream.buffer_size
            ));
        }
        Ok(())
    }
}
