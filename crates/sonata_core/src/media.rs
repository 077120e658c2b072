//! Media Element
//!
//! The primary player: it owns the authoritative playback clock and feeds
//! the audio graph's source node. Volume is applied here, before the
//! equalizer.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::clock::PlaybackClock;
use crate::context::SourceFeed;
use crate::decoder::DecodedAudio;

/// What changed during one `advance`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaTick {
    pub time_changed: bool,
    pub ended: bool,
}

/// Playback surface the controller drives
pub trait MediaElement: Send {
    /// Point at a new resource. Drops loaded audio, rewinds and pauses.
    fn set_source(&mut self, url: &str);

    fn source(&self) -> Option<&str>;

    /// Hand over decoded audio for the current source; duration becomes known
    fn attach(&mut self, audio: Arc<DecodedAudio>);

    fn is_ready(&self) -> bool;

    /// Start or continue. Before audio is attached this only records intent.
    fn play(&mut self);

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, time: f64);

    /// Zero until metadata is available
    fn duration(&self) -> f64;

    fn volume(&self) -> f32;

    fn set_volume(&mut self, volume: f32);

    /// Advance the clock and top up the graph source
    fn advance(&mut self, elapsed: Duration, sink: Option<&mut SourceFeed>) -> MediaTick;
}

/// Media element playing decoded PCM
///
/// Resamples linearly from the track rate to the output rate.
pub struct PcmMediaElement {
    url: Option<String>,
    audio: Option<Arc<DecodedAudio>>,
    clock: PlaybackClock,
    volume: f32,
    output_rate: u32,
    /// Next source frame to push, fractional
    read_pos: f64,
    needs_flush: bool,
    scratch: Vec<f32>,
}

impl PcmMediaElement {
    pub fn new(output_rate: u32) -> Self {
        Self {
            url: None,
            audio: None,
            clock: PlaybackClock::new(),
            volume: 1.0,
            output_rate,
            read_pos: 0.0,
            needs_flush: false,
            scratch: Vec::new(),
        }
    }

    /// Forget what was queued and continue from the clock position
    fn rewind_feed(&mut self) {
        if let Some(audio) = &self.audio {
            self.read_pos = self.clock.position() * audio.sample_rate as f64;
        }
        self.needs_flush = true;
    }

    fn fill(&mut self, sink: &mut SourceFeed) {
        let Some(audio) = self.audio.as_ref() else {
            return;
        };
        let frames = audio.frames();
        if frames == 0 {
            return;
        }

        let step = audio.sample_rate as f64 / self.output_rate.max(1) as f64;
        let channels = sink.channels();
        let last = frames - 1;

        self.scratch.clear();
        for _ in 0..sink.free_frames() {
            if self.read_pos >= frames as f64 {
                break;
            }
            let index = self.read_pos as usize;
            let frac = (self.read_pos - index as f64) as f32;
            let (l0, r0) = audio.frame(index);
            let (l1, r1) = audio.frame((index + 1).min(last));
            let left = (l0 + (l1 - l0) * frac) * self.volume;
            let right = (r0 + (r1 - r0) * frac) * self.volume;

            if channels == 1 {
                self.scratch.push((left + right) * 0.5);
            } else {
                self.scratch.push(left);
                self.scratch.push(right);
                // Extra output channels stay silent
                self.scratch.extend(std::iter::repeat(0.0).take(channels - 2));
            }
            self.read_pos += step;
        }

        sink.push(&self.scratch);
    }
}

impl MediaElement for PcmMediaElement {
    fn set_source(&mut self, url: &str) {
        self.url = Some(url.to_string());
        self.audio = None;
        self.clock.reset();
        self.read_pos = 0.0;
        self.needs_flush = true;
    }

    fn source(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn attach(&mut self, audio: Arc<DecodedAudio>) {
        debug!(
            "Media ready: {:.2}s at {} Hz",
            audio.duration(),
            audio.sample_rate
        );
        self.clock.set_duration(audio.duration());
        self.audio = Some(audio);
        self.rewind_feed();
    }

    fn is_ready(&self) -> bool {
        self.audio.is_some()
    }

    fn play(&mut self) {
        if self.audio.is_some()
            && self.clock.duration() > 0.0
            && self.clock.position() >= self.clock.duration()
        {
            // Playing again from the end starts over
            self.clock.seek(0.0);
            self.rewind_feed();
        }
        self.clock.play();
    }

    fn pause(&mut self) {
        self.clock.pause();
        self.rewind_feed();
    }

    fn is_paused(&self) -> bool {
        !self.clock.is_playing()
    }

    fn current_time(&self) -> f64 {
        self.clock.position()
    }

    fn set_current_time(&mut self, time: f64) {
        self.clock.seek(time);
        self.rewind_feed();
    }

    fn duration(&self) -> f64 {
        if self.audio.is_some() {
            self.clock.duration()
        } else {
            0.0
        }
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        if volume != self.volume {
            self.volume = volume;
            // Queued audio was scaled with the old volume
            if self.clock.is_playing() {
                self.rewind_feed();
            }
        }
    }

    fn advance(&mut self, elapsed: Duration, sink: Option<&mut SourceFeed>) -> MediaTick {
        if let Some(sink) = sink {
            if self.needs_flush {
                sink.flush();
                self.needs_flush = false;
            }
            if self.audio.is_some() && self.clock.is_playing() {
                self.fill(sink);
            }
        }

        if self.audio.is_none() {
            return MediaTick::default();
        }

        let before = self.clock.position();
        let ended = self.clock.advance(elapsed);
        MediaTick {
            time_changed: self.clock.position() != before,
            ended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;
    use crate::context::RenderCore;
    use sonata_dsp::ProcessorChain;

    fn ramp_audio(sample_rate: u32, seconds: f64) -> Arc<DecodedAudio> {
        let frames = (sample_rate as f64 * seconds) as usize;
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let v = i as f32 / frames as f32;
            samples.push(v);
            samples.push(-v);
        }
        Arc::new(DecodedAudio {
            samples,
            sample_rate,
            channels: 2,
        })
    }

    fn feed(frames: usize) -> (SourceFeed, RenderCore) {
        let chain = ProcessorChain::new(48000.0, 2, 512);
        let wiring = RenderCore::wire(chain, frames);
        wiring.shared.set_running(true);
        (wiring.source, wiring.core)
    }

    #[test]
    fn test_duration_unknown_until_attached() {
        let mut media = PcmMediaElement::new(48000);
        media.set_source("/get_audio/a");
        assert_eq!(media.duration(), 0.0);
        assert!(!media.is_ready());

        media.attach(ramp_audio(48000, 2.0));
        assert!((media.duration() - 2.0).abs() < 1e-9);
        assert_eq!(media.source(), Some("/get_audio/a"));
    }

    #[test]
    fn test_play_before_ready_records_intent() {
        let mut media = PcmMediaElement::new(48000);
        media.set_source("/get_audio/a");
        media.play();
        assert!(!media.is_paused());

        let tick = media.advance(Duration::from_secs(1), None);
        assert_eq!(tick, MediaTick::default());
        assert_eq!(media.current_time(), 0.0);

        media.attach(ramp_audio(48000, 2.0));
        let tick = media.advance(Duration::from_millis(500), None);
        assert!(tick.time_changed);
        assert!((media.current_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_ends_and_pauses() {
        let mut media = PcmMediaElement::new(48000);
        media.set_source("/a");
        media.attach(ramp_audio(48000, 1.0));
        media.play();

        let tick = media.advance(Duration::from_secs(2), None);
        assert!(tick.ended);
        assert!(media.is_paused());
        assert_eq!(media.current_time(), 1.0);

        // Playing again restarts
        media.play();
        assert_eq!(media.current_time(), 0.0);
    }

    #[test]
    fn test_fill_pushes_scaled_audio() {
        let (mut sink, mut core) = feed(256);
        let mut media = PcmMediaElement::new(48000);
        media.set_source("/a");
        media.attach(ramp_audio(48000, 1.0));
        media.set_volume(0.5);
        media.play();

        media.advance(Duration::from_millis(1), Some(&mut sink));
        assert_eq!(sink.free_frames(), 0);

        let mut out = vec![0.0_f32; 512];
        core.render(&mut out);
        let expected_left = 100.0 / 48000.0 * 0.5;
        assert!((out[200] - expected_left).abs() < 1e-6);
        assert!((out[201] + expected_left).abs() < 1e-6);
    }

    #[test]
    fn test_resampling_step() {
        let (mut sink, mut core) = feed(100);
        let mut media = PcmMediaElement::new(48000);
        media.set_source("/a");
        // Half the output rate: each source frame is stretched over two
        media.attach(ramp_audio(24000, 1.0));
        media.play();
        media.advance(Duration::ZERO, Some(&mut sink));

        let mut out = vec![0.0_f32; 200];
        core.render(&mut out);
        let src_step = 1.0 / 24000.0;
        assert!((out[2] - src_step * 0.5).abs() < 1e-6);
        assert!((out[4] - src_step).abs() < 1e-6);
    }

    #[test]
    fn test_seek_flushes_queued_audio() {
        let (mut sink, mut core) = feed(64);
        let mut media = PcmMediaElement::new(48000);
        media.set_source("/a");
        media.attach(ramp_audio(48000, 1.0));
        media.play();
        media.advance(Duration::ZERO, Some(&mut sink));

        media.set_current_time(0.5);
        media.advance(Duration::ZERO, Some(&mut sink));

        // Everything queued before the seek is dropped
        let mut out = vec![1.0_f32; 2];
        core.render(&mut out);
        assert_eq!(out, vec![0.0, 0.0]);

        media.advance(Duration::ZERO, Some(&mut sink));
        core.render(&mut out);
        assert!((out[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_paused_media_pushes_nothing() {
        let config = PlayerConfig::default();
        let (mut sink, _core) = feed(config.source_buffer_frames);
        let mut media = PcmMediaElement::new(48000);
        media.set_source("/a");
        media.attach(ramp_audio(48000, 1.0));

        media.advance(Duration::from_millis(100), Some(&mut sink));
        assert_eq!(sink.free_frames(), config.source_buffer_frames);
        assert_eq!(media.current_time(), 0.0);
    }

    #[test]
    fn test_volume_clamped() {
        let mut media = PcmMediaElement::new(48000);
        media.set_volume(1.7);
        assert_eq!(media.volume(), 1.0);
        media.set_volume(-1.0);
        assert_eq!(media.volume(), 0.0);
    }
}
