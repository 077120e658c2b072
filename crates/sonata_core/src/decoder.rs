//! Audio Decoding
//!
//! Turns fetched bytes into interleaved f32 PCM with symphonia. The same
//! decoded buffer feeds the media element and the waveform peaks.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{PlayerError, PlayerResult};

/// Fully decoded track, interleaved
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Frame at `index`, mixed to (left, right). Mono is duplicated.
    #[inline]
    pub fn frame(&self, index: usize) -> (f32, f32) {
        let base = index * self.channels;
        match self.channels {
            1 => {
                let s = self.samples[base];
                (s, s)
            }
            _ => (self.samples[base], self.samples[base + 1]),
        }
    }
}

/// Decode a complete in-memory file (mp3, wav, flac, ogg)
pub fn decode_audio(bytes: Vec<u8>) -> PlayerResult<DecodedAudio> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlayerError::Decode(e.to_string()))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| PlayerError::Decode("no default track".into()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PlayerError::Decode(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(PlayerError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count());

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            // Corrupt frames are skipped, the rest of the stream still plays
            Err(SymphoniaError::DecodeError(_)) | Err(SymphoniaError::IoError(_)) => {
                skipped += 1;
            }
            Err(e) => return Err(PlayerError::Decode(e.to_string())),
        }
    }

    if skipped > 0 {
        warn!("Skipped {} undecodable packets", skipped);
    }

    let sample_rate =
        sample_rate.ok_or_else(|| PlayerError::Decode("unknown sample rate".into()))?;
    let channels = match channels {
        Some(c) if c > 0 => c,
        _ => return Err(PlayerError::Decode("unknown channel layout".into())),
    };

    // Keep whole frames only
    samples.truncate(samples.len() - samples.len() % channels);

    let audio = DecodedAudio {
        samples,
        sample_rate,
        channels,
    };
    debug!(
        "Decoded {:.2}s of audio ({} Hz, {} ch)",
        audio.duration(),
        audio.sample_rate,
        audio.channels
    );
    Ok(audio)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Render a sine into an in-memory 16-bit WAV
    pub(crate) fn sine_wav(sample_rate: u32, channels: u16, seconds: f32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let frames = (sample_rate as f32 * seconds) as usize;
            for i in 0..frames {
                let t = i as f32 / sample_rate as f32;
                let s = (t * 440.0 * std::f32::consts::TAU).sin() * 0.5;
                for _ in 0..channels {
                    writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_stereo_wav() {
        let audio = decode_audio(sine_wav(44100, 2, 0.5)).unwrap();
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.frames(), 22050);
        assert!((audio.duration() - 0.5).abs() < 1e-6);

        let peak = audio.samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.45 && peak < 0.55, "peak {}", peak);
    }

    #[test]
    fn test_decode_mono_wav() {
        let audio = decode_audio(sine_wav(48000, 1, 0.25)).unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.frames(), 12000);

        let (l, r) = audio.frame(100);
        assert_eq!(l, r);
    }

    #[test]
    fn test_decode_garbage() {
        let result = decode_audio(vec![0x13; 512]);
        assert!(matches!(result, Err(PlayerError::Decode(_))));
    }

    #[test]
    fn test_empty_duration() {
        let audio = DecodedAudio {
            samples: Vec::new(),
            sample_rate: 0,
            channels: 2,
        };
        assert_eq!(audio.duration(), 0.0);
    }
}
