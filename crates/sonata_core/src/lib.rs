//! Sonata Core - Player Engine
//!
//! This crate provides the playback core for Sonata, including:
//! - Track search and stream URLs through a pluggable catalog
//! - The equalizer audio graph (source, 10 filters, destination)
//! - Transport state with stale-load protection
//! - A waveform view kept in step with the media clock
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        UI Thread                            │
//! │  (host) ──calls──▶ PlaybackController ◀──events── (host)    │
//! │     │ tick()            │          ▲ pump()                 │
//! │     ▼                   ▼          │ crossbeam-channel      │
//! │  MediaElement      WaveformSync   Loader threads            │
//! └─────────────────────────────────────────────────────────────┘
//!        │ rtrb (PCM)          │ rtrb (gain events)
//!        ▼                     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Audio Thread                           │
//! │   Source ──▶ 32Hz ──▶ ... ──▶ 16kHz ──▶ Destination         │
//! │              (Zero allocation in this path)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod catalog;
mod clock;
mod config;
mod context;
mod controller;
mod decoder;
mod device;
mod error;
mod format;
mod graph;
mod loader;
mod media;
mod message;
mod stream;
mod transport;
mod waveform;

pub use catalog::{
    audio_path, download_url, is_blank_query, parse_search_response, search_path, StaticCatalog,
    Track, TrackCatalog,
};
pub use clock::PlaybackClock;
pub use config::{PlayerConfig, StreamConfig};
pub use context::{
    AudioBackend, AudioContext, ContextState, OfflineBackend, OfflineRenderer, OpenedContext,
    RenderCore, SharedState, SourceFeed, Wiring,
};
pub use controller::PlaybackController;
pub use decoder::{decode_audio, DecodedAudio};
pub use device::AudioDevice;
pub use error::{ErrorKind, PlayerError, PlayerResult};
pub use format::{format_frequency, format_time};
pub use graph::{AudioGraph, GainUpdate, GraphNode, GraphReady, Topology};
pub use loader::{
    LoadEvent, LoadRequest, LoadTarget, LoadTicket, ManualLoader, ResourceLoader, ThreadedLoader,
};
pub use media::{MediaElement, MediaTick, PcmMediaElement};
pub use message::Event;
pub use stream::CpalBackend;
pub use transport::{PlaybackState, Session, Transport, TransportPhase};
pub use waveform::{WaveformStatus, WaveformSync};

// Re-export DSP types for convenience
pub use sonata_dsp::{
    Band, BandType, EqualizerState, GainEvent, ProcessorChain, WaveformPeaks, BAND_COUNT,
    EQ_BANDS, MAX_GAIN_DB, MIN_GAIN_DB,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify public API is accessible
        let config = PlayerConfig::default();
        let _graph = AudioGraph::new(config.clone());
        let _catalog = StaticCatalog::new(Vec::new()).offline();
        assert_eq!(format_time(61.0), "1:01");
    }
}
