//! Sonata App Library - Host Commands and State
//!
//! This module exposes the player core to a UI host. Every command takes
//! the shared [`AppState`] and returns `Result<_, String>` so it can be
//! forwarded over any IPC bridge as-is.

pub mod commands;

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use sonata_core::{PlaybackController, PlayerConfig, StaticCatalog, TrackCatalog};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared by all commands
pub struct AppState {
    pub player: Mutex<Option<PlaybackController>>,
    pub catalog: Arc<dyn TrackCatalog>,
    pub config: PlayerConfig,
}

impl AppState {
    pub fn new(catalog: Arc<dyn TrackCatalog>) -> Self {
        Self {
            player: Mutex::new(None),
            catalog,
            config: PlayerConfig::default(),
        }
    }

    /// State with an already constructed player (custom backends, headless hosts)
    pub fn with_player(player: PlaybackController) -> Self {
        let state = Self::new(Arc::new(StaticCatalog::default()));
        *state
            .player
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(player);
        state
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(StaticCatalog::default()))
    }
}

/// EQ band info for the frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandInfo {
    pub index: usize,
    pub frequency: f32,
    pub label: String,
    pub gain_db: f32,
}

/// Output device info for the frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Formatted playhead, e.g. "1:23 / 3:45"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDisplay {
    pub current: String,
    pub duration: String,
}

/// Waveform overview for drawing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveformView {
    /// (min, max) per column
    pub peaks: Vec<(f32, f32)>,
    pub progress_column: Option<usize>,
}

/// Install the log subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sonata=debug"));

    // A host may have installed its own subscriber already
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() {
        info!("Starting Sonata Player");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_creation() {
        let state = AppState::default();
        let guard = state.player.lock().unwrap();
        assert!(guard.is_none());
    }

    #[test]
    fn test_views_serialize() {
        let display = TimeDisplay {
            current: "1:23".into(),
            duration: "3:45".into(),
        };
        let json = serde_json::to_string(&display).unwrap();
        assert_eq!(json, r#"{"current":"1:23","duration":"3:45"}"#);
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
    }
}
