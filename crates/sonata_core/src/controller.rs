//! Playback Controller
//!
//! Owns the transport state the UI sees and keeps the audio graph, the
//! media element and the waveform view consistent with it.
//!
//! All methods run on one thread (the host's UI/event thread). Loads
//! complete on loader threads and come back through [`PlaybackController::pump`];
//! the host drives clocks with [`PlaybackController::tick`].

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::catalog::{self, Track, TrackCatalog};
use crate::config::PlayerConfig;
use crate::context::AudioBackend;
use crate::decoder::DecodedAudio;
use crate::error::{PlayerError, PlayerResult};
use crate::graph::{AudioGraph, GainUpdate};
use crate::loader::{
    LoadEvent, LoadRequest, LoadTarget, LoadTicket, ResourceLoader, ThreadedLoader,
};
use crate::media::{MediaElement, PcmMediaElement};
use crate::message::Event;
use crate::stream::CpalBackend;
use crate::transport::{PlaybackState, Session, Transport};
use crate::waveform::{WaveformStatus, WaveformSync};

pub struct PlaybackController {
    config: PlayerConfig,
    catalog: Arc<dyn TrackCatalog>,
    backend: Box<dyn AudioBackend>,
    loader: Box<dyn ResourceLoader>,
    graph: AudioGraph,
    media: Box<dyn MediaElement>,
    waveform: WaveformSync,
    transport: Transport,

    /// Bumped by every `load_track`; completions for older values are stale
    generation: u64,
    current_time: f64,
    duration: f64,
    /// Slider value; output is 0 while muted
    volume: f32,
    is_muted: bool,
    /// Restored when unmuting from a volume of 0
    pre_mute_volume: f32,
    show_equalizer: bool,

    load_sender: Sender<LoadEvent>,
    load_receiver: Receiver<LoadEvent>,
    event_sender: Sender<Event>,
    event_receiver: Receiver<Event>,
}

impl PlaybackController {
    pub fn new(
        config: PlayerConfig,
        catalog: Arc<dyn TrackCatalog>,
        backend: Box<dyn AudioBackend>,
        loader: Box<dyn ResourceLoader>,
    ) -> PlayerResult<Self> {
        config.validate().map_err(PlayerError::Config)?;

        let (load_sender, load_receiver) = unbounded();
        let (event_sender, event_receiver) = unbounded();

        Ok(Self {
            media: Box::new(PcmMediaElement::new(config.stream.sample_rate)),
            waveform: WaveformSync::new(config.waveform_columns, config.drift_tolerance_secs),
            graph: AudioGraph::new(config.clone()),
            config,
            catalog,
            backend,
            loader,
            transport: Transport::Idle,
            generation: 0,
            current_time: 0.0,
            duration: 0.0,
            volume: 1.0,
            is_muted: false,
            pre_mute_volume: 1.0,
            show_equalizer: false,
            load_sender,
            load_receiver,
            event_sender,
            event_receiver,
        })
    }

    /// Default output device, loads fetched through the catalog on worker threads
    pub fn with_output_device(
        config: PlayerConfig,
        catalog: Arc<dyn TrackCatalog>,
    ) -> PlayerResult<Self> {
        let loader = ThreadedLoader::new(Arc::clone(&catalog));
        Self::new(config, catalog, Box::new(CpalBackend::new()), Box::new(loader))
    }

    /// Swap in a different media element (before any track is loaded)
    pub fn with_media(mut self, media: Box<dyn MediaElement>) -> Self {
        self.media = media;
        self
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Search the catalog. A blank query returns nothing without a request.
    pub fn search(&self, query: &str) -> PlayerResult<Vec<Track>> {
        if catalog::is_blank_query(query) {
            return Ok(Vec::new());
        }

        self.catalog.search(query).map_err(|e| {
            warn!("Search for {:?} failed: {}", query, e);
            self.emit(Event::error(&e));
            e
        })
    }

    pub fn download_url(&self, track: &Track) -> String {
        catalog::download_url(self.catalog.as_ref(), track)
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Start a new session for `track`
    ///
    /// Any load still in flight becomes stale. Playback starts once the
    /// media is ready unless the user pauses first.
    pub fn load_track(&mut self, track: Track) -> PlayerResult<()> {
        self.generation += 1;
        let generation = self.generation;
        let audio_url = self.catalog.audio_url(&track.video_id);
        info!(
            "Loading \"{}\" by {} from {} (generation {})",
            track.title, track.artist, audio_url, generation
        );

        let session = Session {
            track,
            audio_url,
            generation,
        };

        if let Err(e) = self.ensure_graph() {
            self.fail(Some(session), &e);
            return Err(e);
        }

        self.media.set_source(&session.audio_url);
        self.waveform.load(
            &session.audio_url,
            LoadTicket {
                generation,
                target: LoadTarget::Waveform,
            },
        );
        self.waveform.set_autoplay(true);
        self.current_time = 0.0;
        self.duration = 0.0;

        for target in [LoadTarget::Media, LoadTarget::Waveform] {
            let request = LoadRequest {
                ticket: LoadTicket { generation, target },
                url: session.audio_url.clone(),
            };
            if let Err(e) = self.loader.issue(request, self.load_sender.clone()) {
                self.fail(Some(session), &e);
                return Err(e);
            }
        }

        self.set_transport(Transport::Loading {
            session,
            autoplay: true,
        });
        Ok(())
    }

    /// Flip between playing and paused
    pub fn toggle_play(&mut self) -> PlayerResult<()> {
        let session = match &self.transport {
            Transport::Idle | Transport::Error { session: None, .. } => {
                return Err(PlayerError::NoTrackLoaded)
            }
            Transport::Error {
                session: Some(session),
                ..
            } => {
                // Retry the failed session
                let track = session.track.clone();
                return self.load_track(track);
            }
            Transport::Loading { session, .. }
            | Transport::Playing(session)
            | Transport::Paused(session) => session.clone(),
        };

        if let Err(e) = self.ensure_graph() {
            self.fail(Some(session), &e);
            return Err(e);
        }

        let next = match self.transport.clone() {
            Transport::Loading { session, autoplay } => {
                self.waveform.set_autoplay(!autoplay);
                if autoplay {
                    self.media.pause();
                } else {
                    self.media.play();
                }
                Transport::Loading {
                    session,
                    autoplay: !autoplay,
                }
            }
            Transport::Playing(session) => {
                self.media.pause();
                self.waveform.pause();
                Transport::Paused(session)
            }
            Transport::Paused(session) => {
                self.play_both();
                Transport::Playing(session)
            }
            other => other,
        };
        self.set_transport(next);
        Ok(())
    }

    /// Pause and suspend the audio context, e.g. when the host goes idle
    ///
    /// Nothing is torn down; the next play action resumes the context.
    pub fn suspend_output(&mut self) -> PlayerResult<()> {
        match self.transport.clone() {
            Transport::Playing(session) => {
                self.media.pause();
                self.waveform.pause();
                self.set_transport(Transport::Paused(session));
            }
            Transport::Loading {
                session,
                autoplay: true,
            } => {
                self.media.pause();
                self.waveform.set_autoplay(false);
                self.set_transport(Transport::Loading {
                    session,
                    autoplay: false,
                });
            }
            _ => {}
        }
        self.graph.suspend()
    }

    /// Jump to `time` seconds, clamped into the track
    pub fn seek(&mut self, time: f64) -> PlayerResult<()> {
        let time = PlayerError::check_finite("seek time", time)?;
        if self.transport.session().is_none() {
            return Err(PlayerError::NoTrackLoaded);
        }

        let duration = self.media.duration();
        let target = time.clamp(0.0, duration.max(0.0));
        self.media.set_current_time(target);
        self.current_time = target;

        let fraction = if duration > 0.0 {
            target / duration
        } else {
            0.0
        };
        self.waveform.seek_to_fraction(fraction)?;

        debug!("Seek to {:.2}s ({:.3})", target, fraction);
        self.emit(Event::TimeUpdate {
            current_time: target,
            duration: self.duration,
        });
        Ok(())
    }

    /// Set the volume slider; 0 mutes, anything else unmutes
    pub fn set_volume(&mut self, volume: f32) -> PlayerResult<()> {
        let volume = PlayerError::check_finite("volume", volume as f64)?.clamp(0.0, 1.0) as f32;

        self.volume = volume;
        if volume == 0.0 {
            self.is_muted = true;
        } else {
            self.is_muted = false;
            self.pre_mute_volume = volume;
        }
        self.apply_volume();
        Ok(())
    }

    /// Mute keeps the slider value; unmute restores it exactly
    pub fn toggle_mute(&mut self) {
        if self.is_muted {
            self.is_muted = false;
            if self.volume == 0.0 {
                self.volume = self.pre_mute_volume;
            }
        } else {
            self.is_muted = true;
        }
        self.apply_volume();
    }

    fn apply_volume(&mut self) {
        let output = if self.is_muted { 0.0 } else { self.volume };
        self.media.set_volume(output);
        self.emit(Event::VolumeChanged {
            volume: self.volume,
            is_muted: self.is_muted,
        });
    }

    /// Mirror the media clock into the transport state
    pub fn on_time_update(&mut self) {
        self.current_time = self.media.current_time();
        self.duration = self.media.duration();
        self.emit(Event::TimeUpdate {
            current_time: self.current_time,
            duration: self.duration,
        });
    }

    /// Advance both clocks by `elapsed` and keep the waveform in step
    pub fn tick(&mut self, elapsed: Duration) {
        let tick = self.media.advance(elapsed, self.graph.source_mut());
        self.waveform.advance(elapsed);

        if tick.time_changed || tick.ended {
            self.on_time_update();
        }
        if self.media.is_ready() {
            self.waveform.correct_drift(self.media.current_time());
        }

        if tick.ended {
            if let Transport::Playing(session) = &self.transport {
                let session = session.clone();
                info!("Reached end of \"{}\"", session.track.title);
                self.waveform.pause();
                self.set_transport(Transport::Paused(session));
                self.emit(Event::Ended);
            }
        }

        // The waveform clock can stop on its own at its end
        if self.waveform.status() == WaveformStatus::Ready
            && self.transport.is_playing() != self.waveform.is_playing()
        {
            if self.transport.is_playing() {
                self.waveform.play();
                self.align_waveform();
            } else {
                self.waveform.pause();
            }
        }
    }

    // ------------------------------------------------------------------
    // Loads
    // ------------------------------------------------------------------

    /// Process every completed load. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let events: Vec<LoadEvent> = self.load_receiver.try_iter().collect();
        let mut applied = 0;

        for event in events {
            match self.handle_load_event(event) {
                Ok(()) => applied += 1,
                Err(PlayerError::StaleLoad { stale, current }) => {
                    debug!(
                        "Discarded load for generation {} (current {})",
                        stale, current
                    );
                }
                Err(e) => debug!("Load completed with error: {}", e),
            }
        }
        applied
    }

    /// Apply one load completion
    pub fn handle_load_event(&mut self, event: LoadEvent) -> PlayerResult<()> {
        let ticket = event.ticket();
        if ticket.generation != self.generation {
            return Err(PlayerError::StaleLoad {
                stale: ticket.generation,
                current: self.generation,
            });
        }

        match (event, ticket.target) {
            (LoadEvent::Loaded { audio, .. }, LoadTarget::Media) => {
                self.on_media_ready(audio);
                Ok(())
            }
            (LoadEvent::Loaded { audio, .. }, LoadTarget::Waveform) => {
                self.waveform.on_ready(ticket, &audio)?;
                if self.media.is_ready() {
                    self.align_waveform();
                }
                self.emit(Event::WaveformReady {
                    columns: self.waveform.peaks().len(),
                });
                Ok(())
            }
            (LoadEvent::Failed { error, .. }, LoadTarget::Media) => {
                warn!("Media load failed: {}", error);
                self.media.pause();
                self.waveform.pause();
                let session = self.transport.session().cloned();
                self.fail(session, &error);
                Err(error)
            }
            (LoadEvent::Failed { error, .. }, LoadTarget::Waveform) => {
                // The track still plays without its overview
                self.waveform.on_failed(ticket, &error)?;
                self.emit(Event::WaveformFailed {
                    message: error.to_string(),
                });
                Ok(())
            }
        }
    }

    fn on_media_ready(&mut self, audio: Arc<DecodedAudio>) {
        let (session, autoplay) = match &self.transport {
            Transport::Loading { session, autoplay } => (session.clone(), *autoplay),
            _ => return,
        };

        self.media.attach(audio);
        self.current_time = 0.0;
        self.duration = self.media.duration();
        self.emit(Event::TrackLoaded {
            track: session.track.clone(),
            duration: self.duration,
        });

        if autoplay {
            self.play_both();
            self.set_transport(Transport::Playing(session));
        } else {
            self.media.pause();
            self.waveform.pause();
            self.set_transport(Transport::Paused(session));
        }
    }

    // ------------------------------------------------------------------
    // Equalizer
    // ------------------------------------------------------------------

    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> PlayerResult<GainUpdate> {
        let update = self.graph.set_band_gain(index, gain_db)?;
        self.emit_gains();
        Ok(update)
    }

    pub fn reset_equalizer(&mut self) -> PlayerResult<()> {
        self.graph.reset_all()?;
        self.emit_gains();
        Ok(())
    }

    /// Show or hide the EQ panel. Has no effect on audio.
    pub fn toggle_equalizer_panel(&mut self) -> bool {
        self.show_equalizer = !self.show_equalizer;
        self.show_equalizer
    }

    fn emit_gains(&self) {
        self.emit(Event::EqualizerChanged {
            gains: self.graph.equalizer().gains().to_vec(),
        });
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    pub fn state(&self) -> PlaybackState {
        let session = self.transport.session();
        PlaybackState {
            current_track: session.map(|s| s.track.clone()),
            audio_url: session.map(|s| s.audio_url.clone()),
            transport: self.transport.phase(),
            error: match &self.transport {
                Transport::Error { kind, .. } => Some(*kind),
                _ => None,
            },
            is_playing: self.transport.is_playing(),
            current_time: self.current_time,
            duration: self.duration,
            volume: self.volume,
            is_muted: self.is_muted,
            show_equalizer: self.show_equalizer,
            eq_gains: self.graph.equalizer().gains().to_vec(),
            context: self.graph.context_state(),
            waveform: self.waveform.status(),
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    pub fn media(&self) -> &dyn MediaElement {
        self.media.as_ref()
    }

    pub fn waveform(&self) -> &WaveformSync {
        &self.waveform
    }

    pub fn waveform_mut(&mut self) -> &mut WaveformSync {
        &mut self.waveform
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Get next event (non-blocking)
    pub fn poll_event(&self) -> Option<Event> {
        self.event_receiver.try_recv().ok()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Build the graph on first use and make sure it is producing sound
    fn ensure_graph(&mut self) -> PlayerResult<()> {
        self.graph.initialize(self.backend.as_ref())?;
        self.graph.resume()
    }

    /// Start the media element and mirror it into the waveform
    fn play_both(&mut self) {
        self.media.play();
        self.waveform.play();
        self.align_waveform();
    }

    /// Move the waveform playhead to the media element's position
    fn align_waveform(&mut self) {
        let duration = self.media.duration();
        if duration <= 0.0 {
            return;
        }
        if let Err(e) = self
            .waveform
            .seek_to_fraction(self.media.current_time() / duration)
        {
            warn!("Waveform realign failed: {}", e);
        }
    }

    fn fail(&mut self, session: Option<Session>, error: &PlayerError) {
        warn!("Playback error: {}", error);
        self.emit(Event::error(error));
        self.set_transport(Transport::Error {
            session,
            kind: error.kind(),
        });
    }

    fn set_transport(&mut self, next: Transport) {
        let changed = next.phase() != self.transport.phase()
            || next.is_playing() != self.transport.is_playing();
        self.transport = next;
        if changed {
            self.emit(Event::TransportChanged {
                phase: self.transport.phase(),
                is_playing: self.transport.is_playing(),
            });
        }
    }

    fn emit(&self, event: Event) {
        // The receiver lives in self, so this can't fail
        let _ = self.event_sender.send(event);
    }
}
