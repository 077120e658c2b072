//! Performance benchmarks for the DSP module
//!
//! Run with: cargo bench -p sonata_dsp

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sonata_dsp::{BiquadFilter, EqualizerState, GainEvent, ProcessorChain};

fn build_chain(sample_rate: f32) -> ProcessorChain {
    let state = EqualizerState::default();
    let mut chain = ProcessorChain::new(sample_rate, 2, 512);
    for band in state.bands() {
        chain.add(BiquadFilter::new(*band, sample_rate).unwrap());
    }
    chain
}

fn benchmark_chain_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("equalizer_chain");

    // Common buffer sizes in audio applications
    let buffer_sizes = [64, 128, 256, 512, 1024, 2048];

    for size in buffer_sizes {
        // Stereo buffer (interleaved)
        let sample_count = size * 2;

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("process_{}_frames", size), |b| {
            let mut chain = build_chain(48000.0);
            let mut buffer: Vec<f32> = (0..sample_count)
                .map(|i| (i as f32 * 0.001).sin())
                .collect();

            b.iter(|| {
                chain.process(black_box(&mut buffer));
            });
        });
    }

    group.finish();
}

fn benchmark_gain_ramp(c: &mut Criterion) {
    c.bench_function("chain_process_while_ramping", |b| {
        let mut chain = build_chain(48000.0);
        let mut buffer = vec![0.25_f32; 1024];
        let mut band = 0;
        let mut gain = 0.0_f32;

        b.iter(|| {
            // Simulate a slider being dragged every buffer
            chain.dispatch(&GainEvent {
                node: band,
                gain_db: gain,
                at_frame: chain.frame_position(),
                ramp_frames: 240,
            });
            chain.process(black_box(&mut buffer));
            band = (band + 1) % 10;
            gain = (gain + 1.0) % 12.0;
        });
    });
}

criterion_group!(benches, benchmark_chain_processing, benchmark_gain_ramp);

criterion_main!(benches);
