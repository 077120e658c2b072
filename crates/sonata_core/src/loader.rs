//! Resource Loading
//!
//! Fetch + decode happens off the controller thread. Every request carries a
//! [`LoadTicket`]; completions come back as [`LoadEvent`]s over a crossbeam
//! channel and the controller drops any whose generation is no longer current.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::catalog::TrackCatalog;
use crate::decoder::{decode_audio, DecodedAudio};
use crate::error::{PlayerError, PlayerResult};

/// Which consumer a load is for. Media and waveform load independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadTarget {
    Media,
    Waveform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub target: LoadTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub url: String,
}

/// Completion of a [`LoadRequest`]
#[derive(Debug, Clone)]
pub enum LoadEvent {
    Loaded {
        ticket: LoadTicket,
        audio: Arc<DecodedAudio>,
    },
    Failed {
        ticket: LoadTicket,
        error: PlayerError,
    },
}

impl LoadEvent {
    pub fn ticket(&self) -> LoadTicket {
        match self {
            LoadEvent::Loaded { ticket, .. } | LoadEvent::Failed { ticket, .. } => *ticket,
        }
    }
}

/// Something that can turn a URL into decoded audio, eventually
pub trait ResourceLoader: Send {
    /// Start a load. The completion is sent on `events`.
    fn issue(&mut self, request: LoadRequest, events: Sender<LoadEvent>) -> PlayerResult<()>;
}

/// Fetches through a catalog and decodes on a short-lived worker thread
pub struct ThreadedLoader {
    catalog: Arc<dyn TrackCatalog>,
}

impl ThreadedLoader {
    pub fn new(catalog: Arc<dyn TrackCatalog>) -> Self {
        Self { catalog }
    }
}

impl ResourceLoader for ThreadedLoader {
    fn issue(&mut self, request: LoadRequest, events: Sender<LoadEvent>) -> PlayerResult<()> {
        let catalog = Arc::clone(&self.catalog);

        thread::Builder::new()
            .name("sonata-loader".into())
            .spawn(move || {
                let LoadRequest { ticket, url } = request;
                debug!("Fetching {} for {:?}", url, ticket);

                let event = match catalog.fetch_audio(&url).and_then(decode_audio) {
                    Ok(audio) => LoadEvent::Loaded {
                        ticket,
                        audio: Arc::new(audio),
                    },
                    Err(error) => {
                        warn!("Load of {} failed: {}", url, error);
                        LoadEvent::Failed { ticket, error }
                    }
                };

                // The controller may be gone already
                let _ = events.send(event);
            })
            .map_err(|e| PlayerError::Config(format!("failed to spawn loader: {}", e)))?;

        Ok(())
    }
}

struct PendingLoad {
    request: LoadRequest,
    events: Sender<LoadEvent>,
}

/// Loader whose completions are delivered by hand
///
/// Clones share the same pending list, so a host (or test) can keep one
/// clone and complete loads in any order while the controller owns another.
#[derive(Clone, Default)]
pub struct ManualLoader {
    pending: Arc<Mutex<Vec<PendingLoad>>>,
}

impl ManualLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests not yet completed, oldest first
    pub fn pending(&self) -> Vec<LoadRequest> {
        self.pending
            .lock()
            .iter()
            .map(|p| p.request.clone())
            .collect()
    }

    /// Complete the oldest pending load for `url` and `target`
    pub fn complete(&self, url: &str, target: LoadTarget, audio: Arc<DecodedAudio>) -> bool {
        self.finish(url, target, |ticket| LoadEvent::Loaded {
            ticket,
            audio: Arc::clone(&audio),
        })
    }

    /// Complete both the media and waveform loads for `url`
    pub fn complete_all(&self, url: &str, audio: Arc<DecodedAudio>) -> bool {
        let media = self.complete(url, LoadTarget::Media, Arc::clone(&audio));
        let waveform = self.complete(url, LoadTarget::Waveform, audio);
        media && waveform
    }

    pub fn fail(&self, url: &str, target: LoadTarget, error: PlayerError) -> bool {
        self.finish(url, target, |ticket| LoadEvent::Failed {
            ticket,
            error: error.clone(),
        })
    }

    fn finish(
        &self,
        url: &str,
        target: LoadTarget,
        make_event: impl FnOnce(LoadTicket) -> LoadEvent,
    ) -> bool {
        let mut pending = self.pending.lock();
        let Some(index) = pending
            .iter()
            .position(|p| p.request.url == url && p.request.ticket.target == target)
        else {
            return false;
        };

        let load = pending.remove(index);
        load.events.send(make_event(load.request.ticket)).is_ok()
    }
}

impl ResourceLoader for ManualLoader {
    fn issue(&mut self, request: LoadRequest, events: Sender<LoadEvent>) -> PlayerResult<()> {
        self.pending.lock().push(PendingLoad { request, events });
        Ok(())
    }
}
