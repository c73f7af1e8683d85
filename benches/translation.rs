//! Benchmarks for VL01 decoding and Suntech encoding

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use vl01_suntech::{
    decode_location, FrameType, InboundFrame, MemorySender, MemoryStore, SuntechEncoder,
    Translator,
};

fn generate_bodies(count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| {
            let hour = (i / 3600 % 24) as u8;
            let minute = (i / 60 % 60) as u8;
            let second = (i % 60) as u8;
            let mut body = vec![24, 6, 1, hour, minute, second, 0xC8];
            body.extend_from_slice(&(81_000_000u32 + i as u32 * 17).to_be_bytes());
            body.extend_from_slice(&(40_500_000u32 + i as u32 * 29).to_be_bytes());
            body.push((i % 120) as u8);
            body.extend_from_slice(&(0x1C00u16 | (i % 360) as u16).to_be_bytes());
            body.extend_from_slice(&[0x02, 0xD4, 0x0B]);
            body.extend_from_slice(&[0u8; 12]);
            body.extend_from_slice(&[0x01, 0x00, 0x00]);
            body.extend_from_slice(&(i as u32).to_be_bytes());
            body
        })
        .collect()
}

fn bench_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoding");
    let bodies = generate_bodies(1000);

    group.throughput(Throughput::Elements(1000));

    group.bench_function("decode_1000_locations", |b| {
        b.iter(|| {
            for body in &bodies {
                black_box(decode_location(body).ok());
            }
        })
    });

    group.finish();
}

fn bench_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");

    // Setup - decode records first
    let records: Vec<_> = generate_bodies(1000)
        .iter()
        .filter_map(|body| decode_location(body).ok())
        .collect();
    let encoder = SuntechEncoder::new();

    group.throughput(Throughput::Elements(records.len() as u64));

    group.bench_function("encode_1000_stt", |b| {
        b.iter(|| {
            for (serial, record) in records.iter().enumerate() {
                let packet = encoder.location_report(
                    "868120301234567",
                    record,
                    serial as u32,
                    true,
                    Some(1),
                );
                black_box(packet.to_text());
            }
        })
    });

    group.finish();
}

fn bench_translation(c: &mut Criterion) {
    let mut group = c.benchmark_group("translation");
    let frames: Vec<_> = generate_bodies(1000)
        .into_iter()
        .enumerate()
        .map(|(i, body)| InboundFrame::new("868120301234567", i as u32, FrameType::Location, body))
        .collect();

    group.throughput(Throughput::Elements(1000));

    group.bench_function("translate_1000_locations", |b| {
        b.iter(|| {
            let sender = MemorySender::with_buffer_size(1000);
            let translator = Translator::new(MemoryStore::new(), sender);
            for frame in &frames {
                black_box(translator.handle(frame).ok());
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_decoding, bench_encoding, bench_translation);
criterion_main!(benches);
