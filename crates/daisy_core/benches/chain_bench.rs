//! Criterion benchmarks for the daisy-chain bus
//!
//! Run with: cargo bench -p daisy_core
//!
//! Measures whole-rack frame cost for chains of increasing length and the
//! cost of single participants ticking in isolation.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use daisy_core::chain::{ChainIo, ChainMessage, Mailbox, Neighbor, encode};
use daisy_core::poly::PolyInput;
use daisy_core::{
    GridPos, ModuleId, ModuleRegistry, ParticipantKind, ProcessArgs, Rack, RackModule, Vec2,
};
use std::sync::Arc;

const SAMPLE_RATE: f32 = 48000.0;
const FRAMES_PER_ITER: u64 = 480; // 10ms worth

/// `strips` channel strips, each fed a constant, ending in a master and VU.
fn chain_rack(strips: usize, with_vu: bool) -> (Rack, ModuleId) {
    let mut rack = Rack::new(Arc::new(ModuleRegistry::builtin()), SAMPLE_RATE);
    let mut col = 0;
    for i in 0..strips {
        let strip = rack
            .add_module("channelStrip", GridPos::new(col, 0))
            .expect("add strip");
        rack.set_input_voltage(strip, "in-l", PolyInput::mono(i as f32 * 0.1))
            .expect("feed strip");
        col += 2;
        if with_vu {
            rack.add_module("channelStripVu", GridPos::new(col, 0))
                .expect("add vu");
            col += 1;
        }
    }
    let master = rack
        .add_module("master", GridPos::new(col, 0))
        .expect("add master");
    rack.add_module("channelStripVu", GridPos::new(col + 3, 0))
        .expect("add master vu");
    (rack, master)
}

fn bench_chain_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_length");
    group.throughput(Throughput::Elements(FRAMES_PER_ITER));

    for strips in [1, 4, 8, 16] {
        let (mut rack, master) = chain_rack(strips, false);
        group.bench_with_input(BenchmarkId::new("strips", strips), &strips, |b, _| {
            b.iter(|| {
                for _ in 0..FRAMES_PER_ITER {
                    rack.process_frame();
                }
                black_box(rack.get_output(master, "out-l").map(|o| o.get(0)).ok());
            })
        });
    }
    group.finish();
}

fn bench_metered_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("metered_chain");
    group.throughput(Throughput::Elements(FRAMES_PER_ITER));

    let (mut rack, master) = chain_rack(8, true);
    group.bench_function("8_strips_with_vu", |b| {
        b.iter(|| {
            for _ in 0..FRAMES_PER_ITER {
                rack.process_frame();
            }
            black_box(rack.get_output(master, "out-l").map(|o| o.get(0)).ok());
        })
    });
    group.finish();
}

fn bench_participant_tick(c: &mut Criterion) {
    let registry = ModuleRegistry::builtin();
    let mut group = c.benchmark_group("participant_tick");
    group.throughput(Throughput::Elements(FRAMES_PER_ITER));

    let mut incoming = ChainMessage::head(Vec2::default());
    incoming.mix.set_channels(16);
    for lane in 0..16 {
        incoming.mix.set(lane, encode(1.0), encode(-1.0));
    }
    let strip = Some(Neighbor {
        id: 0,
        kind: Some(ParticipantKind::ChannelStrip),
    });

    for model in ["channelStrip", "auxSendGroup", "channelStripVu", "separator", "master"] {
        let mut module = registry.create(model).expect("builtin model");
        let mut inbox = Mailbox::new();
        let mut outbox = Mailbox::new();
        let args = ProcessArgs::new(SAMPLE_RATE, 0, Vec2::default());

        group.bench_function(model, |b| {
            b.iter(|| {
                for _ in 0..FRAMES_PER_ITER {
                    inbox.publish(&incoming);
                    let mut io = ChainIo::new(strip, strip, &mut inbox, Some(&mut outbox));
                    module.process(&args, Some(&mut io));
                }
                black_box(outbox.consumer().strip_index);
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_chain_length,
    bench_metered_chain,
    bench_participant_tick
);
criterion_main!(benches);
