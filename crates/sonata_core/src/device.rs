//! Output Device Enumeration

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

use crate::error::{PlayerError, PlayerResult};

/// An audio output device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Unique identifier for this device
    pub id: String,

    /// Human-readable device name
    pub name: String,

    /// Whether this is the system default device
    pub is_default: bool,

    /// Supported sample rates (may be empty if querying failed)
    pub sample_rates: Vec<u32>,

    /// Maximum supported channels
    pub max_channels: u16,
}

impl AudioDevice {
    /// Enumerate output devices on the default host
    pub fn enumerate_outputs() -> PlayerResult<Vec<AudioDevice>> {
        let host = cpal::default_host();

        let default_name = host.default_output_device().and_then(|d| d.name().ok());

        let devices: Vec<AudioDevice> = host
            .output_devices()
            .map_err(|e| PlayerError::Capability(e.to_string()))?
            .filter_map(|device| Self::from_cpal_device(&device, default_name.as_deref()).ok())
            .collect();

        if devices.is_empty() {
            return Err(PlayerError::Capability("no output devices found".into()));
        }

        Ok(devices)
    }

    /// Get the default output device
    pub fn default_output() -> PlayerResult<AudioDevice> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PlayerError::Capability("no output device".into()))?;

        Self::from_cpal_device(&device, None).map(|mut d| {
            d.is_default = true;
            d
        })
    }

    /// Whether a device can run a given stream rate
    pub fn supports_rate(&self, sample_rate: u32) -> bool {
        self.sample_rates.contains(&sample_rate)
    }

    fn from_cpal_device(device: &cpal::Device, default_name: Option<&str>) -> PlayerResult<Self> {
        let name = device
            .name()
            .map_err(|e| PlayerError::Capability(e.to_string()))?;

        // CPAL doesn't provide separate IDs
        let id = name.clone();
        let is_default = default_name.map(|d| d == name).unwrap_or(false);

        let (sample_rates, max_channels) = match device.supported_output_configs() {
            Ok(configs) => extract_config_info(configs),
            Err(_) => (vec![], 2),
        };

        Ok(AudioDevice {
            id,
            name,
            is_default,
            sample_rates,
            max_channels,
        })
    }
}

fn extract_config_info(
    configs: impl Iterator<Item = cpal::SupportedStreamConfigRange>,
) -> (Vec<u32>, u16) {
    let mut sample_rates = Vec::new();
    let mut max_channels = 0u16;

    const COMMON_RATES: [u32; 6] = [44100, 48000, 88200, 96000, 176400, 192000];

    for config in configs {
        max_channels = max_channels.max(config.channels());

        let min = config.min_sample_rate().0;
        let max = config.max_sample_rate().0;

        for &rate in &COMMON_RATES {
            if rate >= min && rate <= max && !sample_rates.contains(&rate) {
                sample_rates.push(rate);
            }
        }
    }

    sample_rates.sort_unstable();
    (sample_rates, max_channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_device_serialization() {
        let device = AudioDevice {
            id: "test-id".to_string(),
            name: "Test Device".to_string(),
            is_default: true,
            sample_rates: vec![44100, 48000],
            max_channels: 2,
        };

        let json = serde_json::to_string(&device).unwrap();
        let deserialized: AudioDevice = serde_json::from_str(&json).unwrap();

        assert_eq!(device.id, deserialized.id);
        assert!(deserialized.supports_rate(48000));
        assert!(!deserialized.supports_rate(96000));
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_enumerate_outputs() {
        let devices = AudioDevice::enumerate_outputs();
        assert!(devices.is_ok());
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_default_output() {
        if let Ok(d) = AudioDevice::default_output() {
            assert!(d.is_default);
        }
    }
}
