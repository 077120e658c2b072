//! Host Commands - Called from the UI layer

use std::time::Duration;

use sonata_core::{
    format_frequency, format_time, AudioDevice, Event, PlaybackController, PlaybackState,
    PlayerResult, Track, EQ_BANDS,
};
use tracing::{error, info};

use crate::{AppState, BandInfo, DeviceInfo, TimeDisplay, WaveformView};

/// Run `f` against the player, mapping errors to strings for the host
fn with_player<T>(
    state: &AppState,
    f: impl FnOnce(&mut PlaybackController) -> PlayerResult<T>,
) -> Result<T, String> {
    let mut player_guard = state.player.lock().map_err(|e| e.to_string())?;

    if let Some(ref mut player) = *player_guard {
        f(player).map_err(|e| e.to_string())
    } else {
        Err("Player not initialized".into())
    }
}

/// Create the player on the default output device
pub fn init_player(state: &AppState) -> Result<(), String> {
    let mut player_guard = state.player.lock().map_err(|e| e.to_string())?;

    if player_guard.is_some() {
        return Ok(()); // Already initialized
    }

    info!("Initializing player");

    match PlaybackController::with_output_device(state.config.clone(), state.catalog.clone()) {
        Ok(player) => {
            *player_guard = Some(player);
            Ok(())
        }
        Err(e) => {
            error!("Failed to initialize player: {}", e);
            Err(e.to_string())
        }
    }
}

pub fn search(state: &AppState, query: &str) -> Result<Vec<Track>, String> {
    with_player(state, |player| player.search(query))
}

pub fn load_track(state: &AppState, track: Track) -> Result<(), String> {
    with_player(state, |player| player.load_track(track))
}

pub fn toggle_play(state: &AppState) -> Result<(), String> {
    with_player(state, |player| player.toggle_play())
}

/// Pause and release the output until the next play, for hosts going idle
pub fn suspend_output(state: &AppState) -> Result<(), String> {
    with_player(state, |player| player.suspend_output())
}

/// Seek to `time` seconds
pub fn seek(state: &AppState, time: f64) -> Result<(), String> {
    with_player(state, |player| player.seek(time))
}

pub fn set_volume(state: &AppState, volume: f32) -> Result<(), String> {
    with_player(state, |player| player.set_volume(volume))
}

pub fn toggle_mute(state: &AppState) -> Result<(), String> {
    with_player(state, |player| {
        player.toggle_mute();
        Ok(())
    })
}

/// Set EQ band gain
pub fn set_band_gain(state: &AppState, band: usize, gain_db: f32) -> Result<(), String> {
    with_player(state, |player| player.set_band_gain(band, gain_db).map(|_| ()))
}

pub fn reset_equalizer(state: &AppState) -> Result<(), String> {
    with_player(state, |player| player.reset_equalizer())
}

/// Show or hide the EQ panel; returns the new visibility
pub fn toggle_equalizer(state: &AppState) -> Result<bool, String> {
    with_player(state, |player| Ok(player.toggle_equalizer_panel()))
}

/// EQ bands with their current gains
pub fn get_eq_bands(state: &AppState) -> Result<Vec<BandInfo>, String> {
    with_player(state, |player| {
        let gains = player.graph().equalizer().gains();
        Ok(EQ_BANDS
            .iter()
            .zip(gains.iter())
            .enumerate()
            .map(|(index, (&frequency, &gain_db))| BandInfo {
                index,
                frequency,
                label: format_frequency(frequency),
                gain_db,
            })
            .collect())
    })
}

pub fn get_state(state: &AppState) -> Result<PlaybackState, String> {
    with_player(state, |player| Ok(player.state()))
}

pub fn get_time_display(state: &AppState) -> Result<TimeDisplay, String> {
    with_player(state, |player| {
        let snapshot = player.state();
        Ok(TimeDisplay {
            current: format_time(snapshot.current_time),
            duration: format_time(snapshot.duration),
        })
    })
}

pub fn get_waveform(state: &AppState) -> Result<WaveformView, String> {
    with_player(state, |player| {
        let waveform = player.waveform();
        Ok(WaveformView {
            peaks: waveform.peaks().columns().to_vec(),
            progress_column: waveform.progress_column(),
        })
    })
}

pub fn download_url(state: &AppState, track: &Track) -> Result<String, String> {
    with_player(state, |player| Ok(player.download_url(track)))
}

/// Apply finished loads and advance the clocks by `elapsed_ms`
///
/// Hosts call this from their frame or timer loop. Returns the number of
/// loads applied.
pub fn tick(state: &AppState, elapsed_ms: u64) -> Result<usize, String> {
    with_player(state, |player| {
        let applied = player.pump();
        player.tick(Duration::from_millis(elapsed_ms));
        Ok(applied)
    })
}

/// Poll for player events
pub fn poll_events(state: &AppState) -> Result<Vec<Event>, String> {
    with_player(state, |player| {
        Ok(std::iter::from_fn(|| player.poll_event()).collect())
    })
}

/// List output devices
pub fn list_devices() -> Result<Vec<DeviceInfo>, String> {
    let devices = AudioDevice::enumerate_outputs().map_err(|e| e.to_string())?;

    Ok(devices
        .into_iter()
        .map(|d| DeviceInfo {
            id: d.id,
            name: d.name,
            is_default: d.is_default,
        })
        .collect())
}
