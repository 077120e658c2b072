//! Equalizer Audio Graph
//!
//! The graph is built lazily, on the first playback action, and at most once
//! per session:
//!
//! ```text
//! Source ──▶ lowshelf 32 ──▶ peaking 64 ──▶ … ──▶ highshelf 16k ──▶ Destination
//! ```
//!
//! Gain edits always land in [`EqualizerState`] first. Before the graph
//! exists that is all that happens; the filters pick the gains up when they
//! are built. Afterwards each edit is also scheduled on the live filter at
//! the context's current processing time.

use sonata_dsp::{BiquadFilter, EqualizerState, GainEvent, ProcessorChain};
use tracing::{debug, info};

use crate::config::PlayerConfig;
use crate::context::{AudioBackend, AudioContext, ContextState, SourceFeed};
use crate::error::PlayerResult;

/// Result of a successful `initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphReady {
    pub filters: usize,
    pub sample_rate: u32,
    pub state: ContextState,
    /// False when the graph already existed and nothing was built
    pub newly_built: bool,
}

/// What happened to a gain edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainUpdate {
    /// Recorded only; applied when the graph is built
    Deferred,
    /// Scheduled on the live filter
    Scheduled { at_frame: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphNode {
    Source,
    Filter(usize),
    Destination,
}

/// Nodes and connections of a built graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub nodes: Vec<GraphNode>,
    pub connections: Vec<(GraphNode, GraphNode)>,
}

impl Topology {
    /// Source, then `filters` nodes in series, then the destination
    fn series(filters: usize) -> Self {
        let mut nodes = Vec::with_capacity(filters + 2);
        nodes.push(GraphNode::Source);
        nodes.extend((0..filters).map(GraphNode::Filter));
        nodes.push(GraphNode::Destination);

        let connections = nodes.windows(2).map(|pair| (pair[0], pair[1])).collect();
        Self { nodes, connections }
    }

    pub fn filter_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, GraphNode::Filter(_)))
            .count()
    }
}

struct LiveGraph {
    context: Box<dyn AudioContext>,
    source: SourceFeed,
    topology: Topology,
}

pub struct AudioGraph {
    config: PlayerConfig,
    eq: EqualizerState,
    live: Option<LiveGraph>,
}

impl AudioGraph {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            eq: EqualizerState::default(),
            live: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.live.is_some()
    }

    /// Build the graph if it doesn't exist yet
    ///
    /// Later calls return immediately with `newly_built == false`. When the
    /// backend can't provide a context the graph stays unbuilt and the call
    /// can be retried.
    pub fn initialize(&mut self, backend: &dyn AudioBackend) -> PlayerResult<GraphReady> {
        if let Some(live) = &self.live {
            return Ok(GraphReady {
                filters: live.topology.filter_count(),
                sample_rate: live.context.sample_rate(),
                state: live.context.state(),
                newly_built: false,
            });
        }

        let stream = &self.config.stream;
        let sample_rate = stream.sample_rate as f32;
        let mut chain = ProcessorChain::new(
            sample_rate,
            stream.channels as usize,
            stream.buffer_size as usize,
        );
        for band in self.eq.bands() {
            chain.add(BiquadFilter::new(*band, sample_rate)?);
        }

        let opened = backend.open(&self.config, chain)?;
        let topology = Topology::series(self.eq.len());
        let ready = GraphReady {
            filters: topology.filter_count(),
            sample_rate: opened.context.sample_rate(),
            state: opened.context.state(),
            newly_built: true,
        };

        info!(
            "Audio graph built: {} filters at {} Hz ({:?})",
            ready.filters, ready.sample_rate, ready.state
        );
        if !self.eq.is_flat() {
            debug!("Applied deferred gains {:?}", self.eq.gains());
        }

        self.live = Some(LiveGraph {
            context: opened.context,
            source: opened.source,
            topology,
        });
        Ok(ready)
    }

    /// Record a band gain and, once built, schedule it on the filter
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> PlayerResult<GainUpdate> {
        let applied = self.eq.set_band_gain(index, gain_db)?;
        let ramp_frames = self.config.gain_ramp_frames();

        match self.live.as_mut() {
            None => Ok(GainUpdate::Deferred),
            Some(live) => {
                let at_frame = live.context.current_frame();
                live.context.schedule(GainEvent {
                    node: index,
                    gain_db: applied,
                    at_frame,
                    ramp_frames,
                })?;
                Ok(GainUpdate::Scheduled { at_frame })
            }
        }
    }

    /// Flatten every band
    pub fn reset_all(&mut self) -> PlayerResult<()> {
        self.eq.reset_all();
        let ramp_frames = self.config.gain_ramp_frames();

        if let Some(live) = self.live.as_mut() {
            let at_frame = live.context.current_frame();
            for (node, band) in self.eq.bands().iter().enumerate() {
                live.context.schedule(GainEvent {
                    node,
                    gain_db: band.gain_db,
                    at_frame,
                    ramp_frames,
                })?;
            }
        }
        Ok(())
    }

    pub fn equalizer(&self) -> &EqualizerState {
        &self.eq
    }

    pub fn resume(&mut self) -> PlayerResult<()> {
        if let Some(live) = self.live.as_mut() {
            if live.context.state() == ContextState::Suspended {
                live.context.resume()?;
                info!("Audio context resumed");
            }
        }
        Ok(())
    }

    pub fn suspend(&mut self) -> PlayerResult<()> {
        if let Some(live) = self.live.as_mut() {
            if live.context.state() == ContextState::Running {
                live.context.suspend()?;
                info!("Audio context suspended");
            }
        }
        Ok(())
    }

    /// None until the graph is built
    pub fn context_state(&self) -> Option<ContextState> {
        self.live.as_ref().map(|l| l.context.state())
    }

    /// Processing time of the context in seconds
    pub fn current_time(&self) -> Option<f64> {
        self.live.as_ref().map(|l| l.context.current_time())
    }

    pub fn topology(&self) -> Option<&Topology> {
        self.live.as_ref().map(|l| &l.topology)
    }

    pub fn source_mut(&mut self) -> Option<&mut SourceFeed> {
        self.live.as_mut().map(|l| &mut l.source)
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }
}

impl Drop for AudioGraph {
    fn drop(&mut self) {
        if let Some(live) = self.live.as_mut() {
            let _ = live.context.close();
        }
    }
}
