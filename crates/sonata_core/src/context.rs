//! Audio Contexts
//!
//! An [`AudioBackend`] opens an [`AudioContext`]: a running (or suspended)
//! render loop that pulls PCM from a source ring, pushes it through the
//! processor chain and hands it to an output. Two backends exist:
//!
//! - `CpalBackend` (see `stream.rs`) renders to the default output device
//! - [`OfflineBackend`] renders on demand, for headless hosts and tests
//!
//! Both share [`RenderCore`], so the realtime path is the same code either way.
//!
//! ```text
//!  control thread                      render thread
//!  ──────────────                      ─────────────
//!  schedule(GainEvent) ──rtrb──┐
//!                              ├──▶ RenderCore::render ──▶ output
//!  SourceFeed::push(pcm) ─rtrb─┘
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use serde::{Deserialize, Serialize};
use sonata_dsp::{GainEvent, ProcessorChain};
use tracing::info;

use crate::config::PlayerConfig;
use crate::error::{PlayerError, PlayerResult};

/// Gain events in flight between control and render thread
const PARAM_QUEUE_SIZE: usize = 256;

/// Lifecycle of an audio context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextState {
    /// Created but not yet authorized to produce sound
    Suspended,
    Running,
    Closed,
}

/// A live render loop with a processing-time cursor
pub trait AudioContext: Send {
    fn state(&self) -> ContextState;

    fn resume(&mut self) -> PlayerResult<()>;

    fn suspend(&mut self) -> PlayerResult<()>;

    fn close(&mut self) -> PlayerResult<()>;

    fn sample_rate(&self) -> u32;

    fn channels(&self) -> usize;

    /// Frames rendered so far. Does not advance while suspended.
    fn current_frame(&self) -> u64;

    /// Processing time in seconds
    fn current_time(&self) -> f64 {
        self.current_frame() as f64 / self.sample_rate().max(1) as f64
    }

    /// Queue a gain change for the render thread
    fn schedule(&mut self, event: GainEvent) -> PlayerResult<()>;
}

/// An opened context plus the feed for its source node
pub struct OpenedContext {
    pub context: Box<dyn AudioContext>,
    pub source: SourceFeed,
}

/// Platform capability to produce audio
pub trait AudioBackend: Send {
    /// Open a context rendering `chain`. Fails with `Capability` when the
    /// platform has no usable output.
    fn open(&self, config: &PlayerConfig, chain: ProcessorChain) -> PlayerResult<OpenedContext>;
}

/// State shared between a context handle and its render loop
pub struct SharedState {
    running: AtomicBool,
    frames: AtomicU64,
    underruns: AtomicU64,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            frames: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
        }
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer side of the source node
///
/// Whatever is pushed here is what the graph plays, in whole interleaved
/// frames at the context's rate.
pub struct SourceFeed {
    producer: Producer<f32>,
    channels: usize,
    /// Samples pushed since creation
    written: u64,
    flush_until: Arc<AtomicU64>,
}

impl SourceFeed {
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames that can be pushed without overflowing
    pub fn free_frames(&self) -> usize {
        self.producer.slots() / self.channels
    }

    /// Push as many whole frames as fit. Returns the number of frames written.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        let frames = (samples.len() / self.channels).min(self.free_frames());
        let len = frames * self.channels;
        if len == 0 {
            return 0;
        }

        match self.producer.write_chunk_uninit(len) {
            Ok(chunk) => {
                let pushed = chunk.fill_from_iter(samples[..len].iter().copied());
                self.written += pushed as u64;
                pushed / self.channels
            }
            Err(_) => 0,
        }
    }

    /// Drop everything pushed so far that hasn't been rendered yet
    ///
    /// Samples pushed after this call are kept.
    pub fn flush(&self) {
        self.flush_until.store(self.written, Ordering::Release);
    }
}

/// The render loop body shared by every backend
///
/// # Real-time Safety
///
/// `render` does not allocate or lock; it only touches the ring buffers,
/// atomics and the processor chain.
pub struct RenderCore {
    chain: ProcessorChain,
    params: Consumer<GainEvent>,
    source: Consumer<f32>,
    /// Samples consumed since creation
    read: u64,
    flush_until: Arc<AtomicU64>,
    shared: Arc<SharedState>,
}

/// Everything `wire` produces: the render side and the control side
pub struct Wiring {
    pub core: RenderCore,
    pub params: Producer<GainEvent>,
    pub source: SourceFeed,
    pub shared: Arc<SharedState>,
}

impl RenderCore {
    /// Create the ring buffers that connect a chain to its controls
    pub fn wire(chain: ProcessorChain, source_frames: usize) -> Wiring {
        let channels = chain.context().channels.max(1);
        let (params_tx, params_rx) = RingBuffer::<GainEvent>::new(PARAM_QUEUE_SIZE);
        let (source_tx, source_rx) = RingBuffer::<f32>::new(source_frames.max(1) * channels);
        let flush_until = Arc::new(AtomicU64::new(0));
        let shared = Arc::new(SharedState::new());

        Wiring {
            core: RenderCore {
                chain,
                params: params_rx,
                source: source_rx,
                read: 0,
                flush_until: Arc::clone(&flush_until),
                shared: Arc::clone(&shared),
            },
            params: params_tx,
            source: SourceFeed {
                producer: source_tx,
                channels,
                written: 0,
                flush_until,
            },
            shared,
        }
    }

    /// Fill `out` (interleaved) with the next block
    pub fn render(&mut self, out: &mut [f32]) {
        // Events are routed even while suspended; they take effect at their frame
        while let Ok(event) = self.params.pop() {
            self.chain.dispatch(&event);
        }

        let flush_until = self.flush_until.load(Ordering::Acquire);
        if flush_until > self.read {
            let stale = ((flush_until - self.read) as usize).min(self.source.slots());
            if let Ok(chunk) = self.source.read_chunk(stale) {
                chunk.commit_all();
                self.read += stale as u64;
            }
        }

        if !self.shared.is_running() {
            out.fill(0.0);
            return;
        }

        let to_read = out.len().min(self.source.slots());
        let mut copied = 0;
        if let Ok(chunk) = self.source.read_chunk(to_read) {
            let (first, second) = chunk.as_slices();
            out[..first.len()].copy_from_slice(first);
            out[first.len()..first.len() + second.len()].copy_from_slice(second);
            copied = first.len() + second.len();
            chunk.commit_all();
            self.read += copied as u64;
        }
        if copied < out.len() {
            out[copied..].fill(0.0);
            self.shared.underruns.fetch_add(1, Ordering::Relaxed);
        }

        self.chain.process(out);
        self.shared
            .frames
            .store(self.chain.frame_position(), Ordering::Release);
    }

    pub fn chain(&self) -> &ProcessorChain {
        &self.chain
    }
}

/// Send a gain event to the render thread
pub(crate) fn push_event(params: &mut Producer<GainEvent>, event: GainEvent) -> PlayerResult<()> {
    params.push(event).map_err(|_| PlayerError::BufferOverflow)
}

pub(crate) fn closed_error() -> PlayerError {
    PlayerError::Capability("audio context is closed".into())
}

/// On-demand renderer behind an [`OfflineBackend`] context
#[derive(Clone)]
pub struct OfflineRenderer {
    core: Arc<Mutex<RenderCore>>,
    shared: Arc<SharedState>,
}

impl OfflineRenderer {
    /// Render one block, as the device callback would
    pub fn render(&self, out: &mut [f32]) {
        self.core.lock().render(out);
    }

    /// Gains applied by the filter nodes, in signal order
    pub fn gains(&self) -> Vec<Option<f32>> {
        self.core.lock().chain().gains()
    }

    pub fn node_names(&self) -> Vec<&'static str> {
        self.core.lock().chain().node_names()
    }

    pub fn underruns(&self) -> u64 {
        self.shared.underruns()
    }
}

struct OfflineContext {
    params: Producer<GainEvent>,
    shared: Arc<SharedState>,
    state: ContextState,
    sample_rate: u32,
    channels: usize,
}

impl AudioContext for OfflineContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> PlayerResult<()> {
        if self.state == ContextState::Closed {
            return Err(closed_error());
        }
        self.shared.set_running(true);
        self.state = ContextState::Running;
        Ok(())
    }

    fn suspend(&mut self) -> PlayerResult<()> {
        if self.state == ContextState::Closed {
            return Err(closed_error());
        }
        self.shared.set_running(false);
        self.state = ContextState::Suspended;
        Ok(())
    }

    fn close(&mut self) -> PlayerResult<()> {
        self.shared.set_running(false);
        self.state = ContextState::Closed;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn current_frame(&self) -> u64 {
        self.shared.frames()
    }

    fn schedule(&mut self, event: GainEvent) -> PlayerResult<()> {
        if self.state == ContextState::Closed {
            return Err(closed_error());
        }
        push_event(&mut self.params, event)
    }
}

#[derive(Default)]
struct OfflineInner {
    opened: usize,
    unavailable: bool,
    start_running: bool,
    renderer: Option<OfflineRenderer>,
}

/// Backend that renders only when asked
///
/// Contexts start suspended, like a browser context before a user gesture.
/// Clones share state, so a host can keep a clone to drive rendering and
/// inspect how many contexts were opened.
#[derive(Clone, Default)]
pub struct OfflineBackend {
    inner: Arc<Mutex<OfflineInner>>,
}

impl OfflineBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that reports no audio capability
    pub fn unavailable() -> Self {
        let backend = Self::default();
        backend.inner.lock().unavailable = true;
        backend
    }

    /// Open contexts already running
    pub fn running() -> Self {
        let backend = Self::default();
        backend.inner.lock().start_running = true;
        backend
    }

    /// Make later `open` calls succeed or fail
    pub fn set_available(&self, available: bool) {
        self.inner.lock().unavailable = !available;
    }

    /// Number of contexts opened through this backend
    pub fn opened(&self) -> usize {
        self.inner.lock().opened
    }

    /// Renderer of the most recently opened context
    pub fn renderer(&self) -> Option<OfflineRenderer> {
        self.inner.lock().renderer.clone()
    }
}

impl AudioBackend for OfflineBackend {
    fn open(&self, config: &PlayerConfig, chain: ProcessorChain) -> PlayerResult<OpenedContext> {
        let mut inner = self.inner.lock();
        if inner.unavailable {
            return Err(PlayerError::Capability(
                "no audio output available".into(),
            ));
        }

        let sample_rate = config.stream.sample_rate;
        let channels = chain.context().channels;
        let wiring = RenderCore::wire(chain, config.source_buffer_frames);

        let state = if inner.start_running {
            wiring.shared.set_running(true);
            ContextState::Running
        } else {
            ContextState::Suspended
        };

        inner.opened += 1;
        inner.renderer = Some(OfflineRenderer {
            core: Arc::new(Mutex::new(wiring.core)),
            shared: Arc::clone(&wiring.shared),
        });
        info!(
            "Opened offline context #{} ({} Hz, {:?})",
            inner.opened, sample_rate, state
        );

        Ok(OpenedContext {
            context: Box::new(OfflineContext {
                params: wiring.params,
                shared: wiring.shared,
                state,
                sample_rate,
                channels,
            }),
            source: wiring.source,
        })
    }
}
