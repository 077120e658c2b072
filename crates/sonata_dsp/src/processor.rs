//! Audio Processor Trait
//!
//! Defines the interface for chainable audio processors and the serial
//! chain that carries audio from the graph source to its destination.

/// Context passed to processors containing stream metadata
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext {
    pub sample_rate: f32,
    pub channels: usize,
    pub buffer_size: usize,
    /// Frame index of the first frame in the current buffer
    pub frame_position: u64,
}

impl ProcessContext {
    pub fn new(sample_rate: f32, channels: usize, buffer_size: usize) -> Self {
        Self {
            sample_rate,
            channels,
            buffer_size,
            frame_position: 0,
        }
    }
}

/// A gain change for one node of the chain, applied by the audio thread
///
/// `at_frame` is measured on the chain's processing-time cursor. A
/// `ramp_frames` of 0 is an immediate step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainEvent {
    pub node: usize,
    pub gain_db: f32,
    pub at_frame: u64,
    pub ramp_frames: u32,
}

/// Trait for audio processors in the DSP chain
///
/// # Real-time Safety Contract
///
/// Implementors MUST follow these rules in `process()` and `schedule_gain()`:
/// - NO heap allocations (no Vec::push, no Box::new, no String)
/// - NO syscalls (no file I/O, no network, no mutex locks)
/// - NO unbounded loops
/// - Constant or O(n) time complexity where n = buffer size
///
/// Violating these rules causes audio dropouts ("glitches").
pub trait AudioProcessor: Send {
    /// Process audio buffer in-place
    ///
    /// Buffer format is interleaved: [L0, R0, L1, R1, ...]
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext);

    /// Reset internal state (delay lines, envelopes, etc.)
    fn reset(&mut self);

    /// Human-readable name for debugging/UI
    fn name(&self) -> &'static str;

    /// Whether this processor is currently enabled
    fn is_enabled(&self) -> bool {
        true
    }

    /// Queue a gain change. Processors without a gain parameter ignore it.
    fn schedule_gain(&mut self, _event: &GainEvent) {}

    /// Gain currently applied to the signal, if the processor has one
    fn gain_db(&self) -> Option<f32> {
        None
    }
}

/// A chain of processors applied sequentially
///
/// The chain owns the processing-time cursor: every processed buffer
/// advances it by the number of frames in the buffer.
pub struct ProcessorChain {
    processors: Vec<Box<dyn AudioProcessor>>,
    context: ProcessContext,
}

impl ProcessorChain {
    pub fn new(sample_rate: f32, channels: usize, buffer_size: usize) -> Self {
        Self {
            processors: Vec::new(),
            context: ProcessContext::new(sample_rate, channels, buffer_size),
        }
    }

    /// Add a processor to the end of the chain
    ///
    /// Note: This allocates. Only call during setup, not in audio callback.
    pub fn add<P: AudioProcessor + 'static>(&mut self, processor: P) {
        self.processors.push(Box::new(processor));
    }

    /// Process buffer through all enabled processors
    #[inline]
    pub fn process(&mut self, buffer: &mut [f32]) {
        for processor in &mut self.processors {
            if processor.is_enabled() {
                processor.process(buffer, &self.context);
            }
        }
        let frames = buffer.len() / self.context.channels.max(1);
        self.context.frame_position += frames as u64;
    }

    /// Route a gain event to its node. Returns false for an unknown node.
    pub fn dispatch(&mut self, event: &GainEvent) -> bool {
        match self.processors.get_mut(event.node) {
            Some(processor) => {
                processor.schedule_gain(event);
                true
            }
            None => false,
        }
    }

    /// Reset all processors
    pub fn reset(&mut self) {
        for processor in &mut self.processors {
            processor.reset();
        }
    }

    /// Processing-time cursor in frames
    pub fn frame_position(&self) -> u64 {
        self.context.frame_position
    }

    pub fn context(&self) -> &ProcessContext {
        &self.context
    }

    /// Names of the nodes, in signal order
    pub fn node_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Applied gains, in signal order
    pub fn gains(&self) -> Vec<Option<f32>> {
        self.processors.iter().map(|p| p.gain_db()).collect()
    }

    /// Get number of processors in chain
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Check if chain is empty
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test processor that just inverts audio (for testing chain)
    struct InvertProcessor;

    impl AudioProcessor for InvertProcessor {
        fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
            for sample in buffer.iter_mut() {
                *sample = -*sample;
            }
        }

        fn reset(&mut self) {}

        fn name(&self) -> &'static str {
            "Inverter"
        }
    }

    /// Records the last gain event it was given
    struct GainProbe {
        gain: f32,
    }

    impl AudioProcessor for GainProbe {
        fn process(&mut self, _buffer: &mut [f32], _context: &ProcessContext) {}

        fn reset(&mut self) {}

        fn name(&self) -> &'static str {
            "Probe"
        }

        fn schedule_gain(&mut self, event: &GainEvent) {
            self.gain = event.gain_db;
        }

        fn gain_db(&self) -> Option<f32> {
            Some(self.gain)
        }
    }

    #[test]
    fn test_empty_chain() {
        let mut chain = ProcessorChain::new(48000.0, 2, 512);
        assert!(chain.is_empty());

        let mut buffer = vec![0.5, -0.5];
        chain.process(&mut buffer);

        // Empty chain should not modify buffer
        assert_eq!(buffer[0], 0.5);
        assert_eq!(buffer[1], -0.5);
    }

    #[test]
    fn test_processor_chain_order() {
        let mut chain = ProcessorChain::new(48000.0, 2, 512);

        // Two inverters should cancel out
        chain.add(InvertProcessor);
        chain.add(InvertProcessor);

        let mut buffer = vec![0.5, -0.5];
        chain.process(&mut buffer);

        assert_eq!(buffer[0], 0.5);
        assert_eq!(buffer[1], -0.5);
        assert_eq!(chain.node_names(), vec!["Inverter", "Inverter"]);
    }

    #[test]
    fn test_cursor_advances_by_frames() {
        let mut chain = ProcessorChain::new(48000.0, 2, 512);
        chain.add(InvertProcessor);
        assert_eq!(chain.frame_position(), 0);

        let mut buffer = vec![0.0; 256];
        chain.process(&mut buffer);
        assert_eq!(chain.frame_position(), 128);

        chain.process(&mut buffer);
        assert_eq!(chain.frame_position(), 256);
    }

    #[test]
    fn test_dispatch_routes_by_node() {
        let mut chain = ProcessorChain::new(48000.0, 2, 512);
        chain.add(InvertProcessor);
        chain.add(GainProbe { gain: 0.0 });

        let event = GainEvent {
            node: 1,
            gain_db: 4.5,
            at_frame: 0,
            ramp_frames: 0,
        };
        assert!(chain.dispatch(&event));
        assert_eq!(chain.gains(), vec![None, Some(4.5)]);

        let missing = GainEvent { node: 7, ..event };
        assert!(!chain.dispatch(&missing));
    }

    #[test]
    fn test_process_context() {
        let ctx = ProcessContext::new(48000.0, 2, 512);
        assert_eq!(ctx.sample_rate, 48000.0);
        assert_eq!(ctx.channels, 2);
        assert_eq!(ctx.buffer_size, 512);
        assert_eq!(ctx.frame_position, 0);
    }
}
