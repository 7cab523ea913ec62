/// Framing and decode throughput and latency benchmarks

use byteorder::{BigEndian, ByteOrder};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use itch_feed_handler::{Decoder, Framer, MessageType};

fn create_message(msg_type: MessageType, tracking: u16) -> Vec<u8> {
    let mut msg = vec![0u8; msg_type.wire_len()];
    msg[0] = msg_type as u8;
    BigEndian::write_u16(&mut msg[1..3], 1);
    BigEndian::write_u16(&mut msg[3..5], tracking);
    msg
}

fn create_add_order(tracking: u16) -> Vec<u8> {
    let mut msg = create_message(MessageType::AddOrder, tracking);
    BigEndian::write_u64(&mut msg[11..19], u64::from(tracking));
    msg[19] = b'B';
    BigEndian::write_u32(&mut msg[20..24], 100);
    msg[24..32].copy_from_slice(b"AAPL    ");
    BigEndian::write_u32(&mut msg[32..36], 1_250_000);
    msg
}

/// Mixed order flow: adds, executions, cancels and deletes
fn create_message_buffer(msg_count: usize) -> Vec<u8> {
    let mut buffer = Vec::new();
    for i in 0..msg_count {
        let tracking = (i % 65535 + 1) as u16;
        let msg = match i % 4 {
            0 | 1 => create_add_order(tracking),
            2 => create_message(MessageType::OrderExecuted, tracking),
            _ => create_message(MessageType::OrderDelete, tracking),
        };
        buffer.extend_from_slice(&msg);
    }
    buffer
}

fn bench_frame_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_throughput");

    for msg_count in [10, 1000, 100000].iter() {
        let buffer = create_message_buffer(*msg_count);
        group.throughput(Throughput::Bytes(buffer.len() as u64));

        group.bench_with_input(BenchmarkId::new("frame_only", msg_count), &buffer, |b, buf| {
            b.iter(|| Framer::new(black_box(buf)).count());
        });

        group.bench_with_input(BenchmarkId::new("frame_and_decode", msg_count), &buffer, |b, buf| {
            b.iter(|| {
                Framer::new(black_box(buf))
                    .filter_map(|(_, raw)| raw.decode().ok())
                    .count()
            });
        });
    }
    group.finish();
}

fn bench_decode_message_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_types");

    for msg_type in MessageType::ALL {
        let msg = if msg_type == MessageType::AddOrder {
            create_add_order(42)
        } else {
            create_message(msg_type, 42)
        };
        group.bench_function(msg_type.name(), |b| {
            b.iter(|| Decoder::decode(msg_type, black_box(&msg)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_frame_throughput, bench_decode_message_types);
criterion_main!(benches);
