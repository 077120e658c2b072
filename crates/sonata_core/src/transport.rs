//! Transport State
//!
//! Every non-idle state carries the session it belongs to, so "playing with
//! no track" can't be expressed.

use serde::{Deserialize, Serialize};

use crate::catalog::Track;
use crate::context::ContextState;
use crate::error::ErrorKind;
use crate::waveform::WaveformStatus;

/// One `load_track` call: the track, its stream URL and load generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub track: Track,
    pub audio_url: String,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Idle,
    /// Waiting for the media load; `autoplay` is the user's current intent
    Loading { session: Session, autoplay: bool },
    Playing(Session),
    Paused(Session),
    /// A failure, with the session that hit it if there was one
    Error {
        session: Option<Session>,
        kind: ErrorKind,
    },
}

impl Transport {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Transport::Idle => None,
            Transport::Loading { session, .. }
            | Transport::Playing(session)
            | Transport::Paused(session) => Some(session),
            Transport::Error { session, .. } => session.as_ref(),
        }
    }

    /// Playing, or loading with the intent to play
    pub fn is_playing(&self) -> bool {
        matches!(
            self,
            Transport::Playing(_) | Transport::Loading { autoplay: true, .. }
        )
    }

    pub fn phase(&self) -> TransportPhase {
        match self {
            Transport::Idle => TransportPhase::Idle,
            Transport::Loading { .. } => TransportPhase::Loading,
            Transport::Playing(_) => TransportPhase::Playing,
            Transport::Paused(_) => TransportPhase::Paused,
            Transport::Error { .. } => TransportPhase::Error,
        }
    }
}

/// Transport state without its payload, for the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPhase {
    Idle,
    Loading,
    Playing,
    Paused,
    Error,
}

/// Everything the UI renders, as one serializable value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    pub audio_url: Option<String>,
    pub transport: TransportPhase,
    pub error: Option<ErrorKind>,
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub volume: f32,
    pub is_muted: bool,
    pub show_equalizer: bool,
    pub eq_gains: Vec<f32>,
    pub context: Option<ContextState>,
    pub waveform: WaveformStatus,
}
