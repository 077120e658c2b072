//! Audio Stream Management
//!
//! Opens a CPAL output stream on the default device and runs the shared
//! render loop inside its callback.
//!
//! # Threading
//!
//! ```text
//!   control thread ──StreamCommand──▶ sonata-audio thread (owns cpal::Stream)
//!         │                                   │
//!         └──────rtrb (gains, pcm)──────▶ output callback ──▶ speakers
//! ```
//!
//! `cpal::Stream` is not `Send` on every platform, so it never leaves the
//! thread that built it. The context handle talks to that thread over a
//! bounded crossbeam channel and waits for each reply.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig as CpalStreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use rtrb::Producer;
use sonata_dsp::{GainEvent, ProcessorChain};
use tracing::{debug, error, info, warn};

use crate::config::{PlayerConfig, StreamConfig};
use crate::context::{
    closed_error, push_event, AudioBackend, AudioContext, ContextState, OpenedContext,
    RenderCore, SharedState,
};
use crate::error::{PlayerError, PlayerResult};

/// Commands for the thread that owns the stream
enum StreamCommand {
    Play(Sender<PlayerResult<()>>),
    Pause(Sender<PlayerResult<()>>),
    Close,
}

/// Backend rendering to the system's default output device
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for CpalBackend {
    fn open(&self, config: &PlayerConfig, chain: ProcessorChain) -> PlayerResult<OpenedContext> {
        config.validate().map_err(PlayerError::Config)?;

        let stream_config = config.stream.clone();
        let wiring = RenderCore::wire(chain, config.source_buffer_frames);
        let shared = Arc::clone(&wiring.shared);
        let core = wiring.core;

        let (command_sender, command_receiver) = bounded::<StreamCommand>(8);
        let (ready_sender, ready_receiver) = bounded::<PlayerResult<()>>(1);

        let thread_config = stream_config.clone();
        let audio_thread = thread::Builder::new()
            .name("sonata-audio".into())
            .spawn(move || {
                stream_thread_main(thread_config, core, command_receiver, ready_sender);
            })
            .map_err(|e| PlayerError::Capability(e.to_string()))?;

        // Wait until the stream exists (or failed to)
        ready_receiver
            .recv()
            .map_err(|_| PlayerError::Capability("audio thread exited".into()))??;

        info!(
            "Opened output stream: {} Hz, {} ch, {:.1} ms buffer",
            stream_config.sample_rate,
            stream_config.channels,
            stream_config.latency_ms()
        );

        Ok(OpenedContext {
            context: Box::new(CpalContext {
                commands: command_sender,
                params: wiring.params,
                shared,
                state: ContextState::Suspended,
                config: stream_config,
                audio_thread: Some(audio_thread),
            }),
            source: wiring.source,
        })
    }
}

fn stream_thread_main(
    config: StreamConfig,
    core: RenderCore,
    commands: Receiver<StreamCommand>,
    ready: Sender<PlayerResult<()>>,
) {
    let stream = match build_output_stream(&config, core) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    // Some hosts start streams on creation; a context starts suspended
    if let Err(e) = stream.pause() {
        debug!("Initial pause not supported: {}", e);
    }
    let _ = ready.send(Ok(()));
    debug!("Audio thread started");

    while let Ok(command) = commands.recv() {
        match command {
            StreamCommand::Play(reply) => {
                let result = stream
                    .play()
                    .map_err(|e| PlayerError::Capability(e.to_string()));
                let _ = reply.send(result);
            }
            StreamCommand::Pause(reply) => {
                let result = stream
                    .pause()
                    .map_err(|e| PlayerError::Capability(e.to_string()));
                let _ = reply.send(result);
            }
            StreamCommand::Close => break,
        }
    }

    drop(stream);
    debug!("Audio thread stopped");
}

fn build_output_stream(config: &StreamConfig, mut core: RenderCore) -> PlayerResult<Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlayerError::Capability("no output device".into()))?;

    let cpal_config = CpalStreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
    };

    device
        .build_output_stream(
            &cpal_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Real-time audio callback - NO allocations allowed here
                core.render(data);
            },
            move |err| {
                error!("Output stream error: {}", err);
            },
            None,
        )
        .map_err(|e| PlayerError::Capability(e.to_string()))
}

/// Context handle for a CPAL stream
struct CpalContext {
    commands: Sender<StreamCommand>,
    params: Producer<GainEvent>,
    shared: Arc<SharedState>,
    state: ContextState,
    config: StreamConfig,
    audio_thread: Option<JoinHandle<()>>,
}

impl CpalContext {
    fn request(&self, make: fn(Sender<PlayerResult<()>>) -> StreamCommand) -> PlayerResult<()> {
        let (reply_sender, reply_receiver) = bounded(1);
        self.commands
            .send(make(reply_sender))
            .map_err(|_| PlayerError::ChannelSendError)?;
        reply_receiver
            .recv()
            .map_err(|_| PlayerError::ChannelSendError)?
    }
}

impl AudioContext for CpalContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> PlayerResult<()> {
        match self.state {
            ContextState::Closed => Err(closed_error()),
            ContextState::Running => Ok(()),
            ContextState::Suspended => {
                self.shared.set_running(true);
                if let Err(e) = self.request(StreamCommand::Play) {
                    self.shared.set_running(false);
                    return Err(e);
                }
                self.state = ContextState::Running;
                Ok(())
            }
        }
    }

    fn suspend(&mut self) -> PlayerResult<()> {
        match self.state {
            ContextState::Closed => Err(closed_error()),
            ContextState::Suspended => Ok(()),
            ContextState::Running => {
                self.shared.set_running(false);
                self.request(StreamCommand::Pause)?;
                self.state = ContextState::Suspended;
                Ok(())
            }
        }
    }

    fn close(&mut self) -> PlayerResult<()> {
        if self.state == ContextState::Closed {
            return Ok(());
        }
        self.shared.set_running(false);
        let _ = self.commands.send(StreamCommand::Close);
        if let Some(handle) = self.audio_thread.take() {
            if handle.join().is_err() {
                warn!("Audio thread panicked");
            }
        }
        self.state = ContextState::Closed;
        info!("Output stream closed");
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn channels(&self) -> usize {
        self.config.channels as usize
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

impl Drop for CpalContext {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonata_dsp::{BiquadFilter, EqualizerState};

    fn eq_chain(config: &StreamConfig) -> ProcessorChain {
        let mut chain = ProcessorChain::new(
            config.sample_rate as f32,
            config.channels as usize,
            config.buffer_size as usize,
        );
        for band in EqualizerState::default().bands() {
            chain.add(BiquadFilter::new(*band, config.sample_rate as f32).unwrap());
        }
        chain
    }

    #[test]
    fn test_invalid_config_rejected_before_opening() {
        let config = PlayerConfig {
            stream: StreamConfig {
                buffer_size: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let chain = eq_chain(&config.stream);
        let result = CpalBackend::new().open(&config, chain);
        assert!(matches!(result, Err(PlayerError::Config(_))));
    }

    // Hardware-dependent tests
    #[test]
    #[ignore = "requires audio hardware"]
    fn test_stream_lifecycle() {
        let config = PlayerConfig::default();
        let chain = eq_chain(&config.stream);
        let opened = CpalBackend::new().open(&config, chain);

        // May fail if no audio hardware, which is fine for CI
        if let Ok(opened) = opened {
            let mut context = opened.context;
            assert_eq!(context.state(), ContextState::Suspended);
            context.resume().unwrap();
            assert_eq!(context.state(), ContextState::Running);
            context.suspend().unwrap();
            context.close().unwrap();
            assert_eq!(context.state(), ContextState::Closed);
        }
    }
}
