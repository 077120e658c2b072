//! Playback Clock

use std::time::Duration;

/// Position within a track, advanced by elapsed wall time while playing
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    position: f64,
    duration: f64,
    playing: bool,
    rate: f64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            position: 0.0,
            duration: 0.0,
            playing: false,
            rate: 1.0,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
        self.position = self.position.min(self.duration);
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Jump to `position`, clamped into the track
    pub fn seek(&mut self, position: f64) {
        self.position = position.clamp(0.0, self.duration);
    }

    /// Played fraction, 0 for an unknown duration
    pub fn fraction(&self) -> f64 {
        if self.duration > 0.0 {
            self.position / self.duration
        } else {
            0.0
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Speed relative to wall time
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate.max(0.0);
    }

    /// Move forward by `elapsed`. Returns true if the end was reached.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        if !self.playing {
            return false;
        }

        self.position += elapsed.as_secs_f64() * self.rate;
        if self.duration > 0.0 && self.position >= self.duration {
            self.position = self.duration;
            self.playing = false;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        *self = Self {
            rate: self.rate,
            ..Self::new()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_only_while_playing() {
        let mut clock = PlaybackClock::new();
        clock.set_duration(10.0);

        assert!(!clock.advance(Duration::from_secs(1)));
        assert_eq!(clock.position(), 0.0);

        clock.play();
        clock.advance(Duration::from_millis(1500));
        assert!((clock.position() - 1.5).abs() < 1e-9);
        assert!((clock.fraction() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_end_of_track() {
        let mut clock = PlaybackClock::new();
        clock.set_duration(2.0);
        clock.play();

        assert!(clock.advance(Duration::from_secs(3)));
        assert_eq!(clock.position(), 2.0);
        assert!(!clock.is_playing());
    }

    #[test]
    fn test_seek_clamps() {
        let mut clock = PlaybackClock::new();
        clock.set_duration(100.0);

        clock.seek(-5.0);
        assert_eq!(clock.position(), 0.0);
        clock.seek(500.0);
        assert_eq!(clock.position(), 100.0);
    }

    #[test]
    fn test_unknown_duration() {
        let mut clock = PlaybackClock::new();
        clock.seek(5.0);
        assert_eq!(clock.position(), 0.0);
        assert_eq!(clock.fraction(), 0.0);
    }

    #[test]
    fn test_rate() {
        let mut clock = PlaybackClock::new();
        clock.set_duration(10.0);
        clock.set_rate(1.1);
        clock.play();
        clock.advance(Duration::from_secs(2));
        assert!((clock.position() - 2.2).abs() < 1e-9);

        clock.reset();
        assert_eq!(clock.position(), 0.0);
        assert_eq!(clock.rate(), 1.1);
    }
}
