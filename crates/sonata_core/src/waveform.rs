//! Waveform Sync
//!
//! The waveform view loads the same resource as the media element, draws
//! its amplitude overview and runs its own clock. The controller mirrors
//! play/pause/seek into it and, every tick, pulls it back to the media
//! element's time if the two have drifted further apart than the tolerance.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sonata_dsp::WaveformPeaks;
use tracing::{debug, warn};

use crate::clock::PlaybackClock;
use crate::decoder::DecodedAudio;
use crate::error::{PlayerError, PlayerResult};
use crate::loader::LoadTicket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveformStatus {
    Empty,
    Loading,
    Ready,
    Failed,
}

pub struct WaveformSync {
    url: Option<String>,
    ticket: Option<LoadTicket>,
    status: WaveformStatus,
    peaks: WaveformPeaks,
    clock: PlaybackClock,
    autoplay_on_ready: bool,
    columns: usize,
    drift_tolerance: f64,
    corrections: u64,
}

impl WaveformSync {
    pub fn new(columns: usize, drift_tolerance: f64) -> Self {
        Self {
            url: None,
            ticket: None,
            status: WaveformStatus::Empty,
            peaks: WaveformPeaks::default(),
            clock: PlaybackClock::new(),
            autoplay_on_ready: false,
            columns,
            drift_tolerance,
            corrections: 0,
        }
    }

    /// Start loading `url`, abandoning any load in progress
    pub fn load(&mut self, url: &str, ticket: LoadTicket) {
        self.url = Some(url.to_string());
        self.ticket = Some(ticket);
        self.status = WaveformStatus::Loading;
        self.peaks = WaveformPeaks::default();
        self.clock.reset();
        self.autoplay_on_ready = false;
    }

    /// Start playing as soon as the load completes
    pub fn set_autoplay(&mut self, autoplay: bool) {
        self.autoplay_on_ready = autoplay;
    }

    fn check_ticket(&self, ticket: LoadTicket) -> PlayerResult<()> {
        match self.ticket {
            Some(current) if current == ticket => Ok(()),
            current => Err(PlayerError::StaleLoad {
                stale: ticket.generation,
                current: current.map(|t| t.generation).unwrap_or(0),
            }),
        }
    }

    /// Audio for the current load is available
    pub fn on_ready(&mut self, ticket: LoadTicket, audio: &DecodedAudio) -> PlayerResult<()> {
        self.check_ticket(ticket)?;

        self.peaks = WaveformPeaks::from_interleaved(&audio.samples, audio.channels, self.columns)?;
        self.clock.set_duration(audio.duration());
        self.status = WaveformStatus::Ready;
        debug!(
            "Waveform ready: {} columns, {:.2}s",
            self.peaks.len(),
            audio.duration()
        );

        if self.autoplay_on_ready {
            self.clock.play();
        }
        Ok(())
    }

    pub fn on_failed(&mut self, ticket: LoadTicket, error: &PlayerError) -> PlayerResult<()> {
        self.check_ticket(ticket)?;
        warn!("Waveform load failed: {}", error);
        self.status = WaveformStatus::Failed;
        self.clock.pause();
        Ok(())
    }

    /// Play now, or once ready if still loading. Playing from the end
    /// starts over.
    pub fn play(&mut self) {
        match self.status {
            WaveformStatus::Ready => {
                if self.clock.duration() > 0.0 && self.clock.position() >= self.clock.duration() {
                    self.clock.seek(0.0);
                }
                self.clock.play();
            }
            WaveformStatus::Loading => self.autoplay_on_ready = true,
            WaveformStatus::Empty | WaveformStatus::Failed => {}
        }
    }

    pub fn pause(&mut self) {
        self.autoplay_on_ready = false;
        self.clock.pause();
    }

    /// Seek to a fraction of the track, clamped into [0, 1]
    pub fn seek_to_fraction(&mut self, fraction: f64) -> PlayerResult<()> {
        let fraction = PlayerError::check_finite("seek fraction", fraction)?.clamp(0.0, 1.0);
        self.clock.seek(fraction * self.clock.duration());
        Ok(())
    }

    /// Advance the waveform's own clock. Returns true at the end.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        self.clock.advance(elapsed)
    }

    /// Re-seek to `media_time` when the clocks disagree by more than the
    /// tolerance. Returns the measured drift when a correction was made.
    pub fn correct_drift(&mut self, media_time: f64) -> Option<f64> {
        if self.status != WaveformStatus::Ready {
            return None;
        }

        let drift = self.clock.position() - media_time;
        if drift.abs() <= self.drift_tolerance {
            return None;
        }

        self.clock.seek(media_time);
        self.corrections += 1;
        debug!("Waveform drifted {:+.3}s, re-synced", drift);
        Some(drift)
    }

    pub fn status(&self) -> WaveformStatus {
        self.status
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn peaks(&self) -> &WaveformPeaks {
        &self.peaks
    }

    pub fn position(&self) -> f64 {
        self.clock.position()
    }

    pub fn duration(&self) -> f64 {
        self.clock.duration()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    /// Column of the peaks under the playhead
    pub fn progress_column(&self) -> Option<usize> {
        self.peaks.column_at(self.clock.fraction())
    }

    /// Speed of the waveform clock relative to wall time
    pub fn set_rate(&mut self, rate: f64) {
        self.clock.set_rate(rate);
    }

    /// Number of drift corrections made so far
    pub fn corrections(&self) -> u64 {
        self.corrections
    }
}
