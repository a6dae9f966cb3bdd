// SPDX-License-Identifier: MPL-2.0
//! Benchmarks for the audio callback hot path.
//!
//! Measures how fast [`AudioFeed::feed`] splices queued packets into
//! device-sized buffers, with and without a flush in flight.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use lockstep::application::port::StreamHandle;
use lockstep::domain::{Marker, SamplePacket};
use lockstep::player::{unit_channel, AudioFeed, SharedTransport, Transport};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

/// 20 ms of 48 kHz stereo.
const PACKET_SAMPLES: usize = 1920;
const PACKETS: usize = 64;
/// A typical hardware period.
const PERIOD: usize = 1024;

struct NullControl;

impl StreamHandle for NullControl {
    fn seek(&self, _target: Duration) {}
    fn shutdown(&self) {}
    fn total_duration(&self) -> Duration {
        Duration::from_secs(10)
    }
    fn frame_duration(&self) -> Option<Duration> {
        None
    }
}

fn transport() -> SharedTransport {
    Transport::new(Arc::new(NullControl), 0)
}

fn queued_feed(transport: &SharedTransport, first_marker: Marker) -> AudioFeed {
    let (tx, rx) = unit_channel(PACKETS);
    for i in 0..PACKETS {
        let marker = if i == 0 { first_marker } else { Marker::Normal };
        let at = Duration::from_millis(20 * i as u64);
        let _ = tx.send(SamplePacket::new(at, marker, vec![0.25; PACKET_SAMPLES]));
    }
    AudioFeed::new(transport.clone(), rx)
}

fn bench_feed(c: &mut Criterion) {
    let mut group = c.benchmark_group("audio_feed");
    let transport = transport();

    group.bench_function("splice_packets", |b| {
        b.iter_batched(
            || queued_feed(&transport, Marker::Rebase),
            |mut feed| {
                let mut buffer = vec![0.0f32; PERIOD];
                for _ in 0..(PACKETS * PACKET_SAMPLES / PERIOD) {
                    black_box(feed.feed(&mut buffer));
                }
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("discard_while_flushing", |b| {
        b.iter_batched(
            || {
                let transport = self::transport();
                transport.request_seek(Duration::ZERO);
                transport.issue_pending_seek();
                // Every queued packet predates the rebase and gets dropped
                (queued_feed(&transport, Marker::Normal), transport)
            },
            |(mut feed, _transport)| {
                let mut buffer = vec![0.0f32; PERIOD];
                black_box(feed.feed(&mut buffer));
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_feed);
criterion_main!(benches);
