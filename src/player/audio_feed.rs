// SPDX-License-Identifier: MPL-2.0
//! Audio device callback body.
//!
//! [`AudioFeed::feed`] fills the device buffer from the sample channel,
//! splicing packets across calls. A seek raises the transport's audio flush
//! signal; from then on packets are discarded until the first rebase packet
//! of the new segment arrives.
//!
//! Without a video track the feed stands in for the video tick: packets are
//! admitted through the transport (so the current position and the step
//! budget follow the audio), and end-of-stream sentinels apply the loop rule.

use super::channel::UnitReceiver;
use super::transport::SharedTransport;
use crate::domain::SamplePacket;

/// Drains sample packets into device buffers.
#[derive(Debug)]
pub struct AudioFeed {
    transport: SharedTransport,
    channel: UnitReceiver<SamplePacket>,
    held: Vec<f32>,
    cursor: usize,
    flushing: bool,
    closed: bool,
    /// No video track; the feed drives the transport.
    audio_only: bool,
}

impl AudioFeed {
    /// Creates a feed alongside a video track. End-of-stream sentinels are
    /// discarded; the video tick owns the loop rule.
    #[must_use]
    pub fn new(transport: SharedTransport, channel: UnitReceiver<SamplePacket>) -> Self {
        Self {
            transport,
            channel,
            held: Vec::new(),
            cursor: 0,
            flushing: false,
            closed: false,
            audio_only: false,
        }
    }

    /// Creates a feed for audio-only playback. Each packet counts as one
    /// step, and end-of-stream sentinels drive looping and shutdown.
    #[must_use]
    pub fn audio_only(transport: SharedTransport, channel: UnitReceiver<SamplePacket>) -> Self {
        Self {
            audio_only: true,
            ..Self::new(transport, channel)
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    /// Fills `out` with interleaved samples, blocking on the channel as
    /// needed.
    ///
    /// Returns the number of samples written. Anything short of `out.len()`
    /// means the channel closed (every later call returns 0) or, in
    /// audio-only playback, that the transport paused after a step.
    pub fn feed(&mut self, out: &mut [f32]) -> usize {
        if self.closed {
            return 0;
        }

        let mut filled = 0;
        while filled < out.len() {
            self.poll_flush();

            if self.cursor >= self.held.len() {
                if self.audio_only && self.transport.mode().is_paused() {
                    return filled;
                }
                if !self.pull() {
                    return filled;
                }
            }

            let available = &self.held[self.cursor..];
            let count = available.len().min(out.len() - filled);
            out[filled..filled + count].copy_from_slice(&available[..count]);
            filled += count;
            self.cursor += count;
        }
        filled
    }

    fn poll_flush(&mut self) {
        if self.transport.take_audio_flush() {
            self.flushing = true;
            self.held.clear();
            self.cursor = 0;
        }
    }

    /// Receives packets until one is accepted. Returns false on closure.
    fn pull(&mut self) -> bool {
        loop {
            let Some(packet) = self.channel.recv() else {
                self.closed = true;
                self.transport.mark_audio_closed();
                log::debug!("Audio channel closed");
                return false;
            };

            // The flush may have been raised while we were waiting
            self.poll_flush();

            if packet.marker.is_end_of_stream() {
                if self.audio_only {
                    self.transport.on_end_of_stream();
                }
                continue;
            }

            let rebase = packet.marker.is_rebase();
            if rebase {
                self.flushing = false;
            } else if self.flushing {
                continue;
            }
            if self.audio_only && !self.transport.admit_frame(rebase, packet.timecode) {
                continue;
            }

            self.held = packet.data;
            self.cursor = 0;
            return true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Marker, TransportMode};
    use crate::player::channel::{unit_channel, UnitSender};
    use crate::player::transport::Transport;
    use crate::test_utils::RecordingControl;
    use std::sync::Arc;
    use std::time::Duration;

    fn packet(at: u64, marker: Marker, data: &[f32]) -> SamplePacket {
        SamplePacket::new(Duration::from_millis(at), marker, data.to_vec())
    }

    fn setup(loops: u32) -> (AudioFeed, UnitSender<SamplePacket>, Arc<RecordingControl>) {
        let control = Arc::new(RecordingControl::default());
        let transport = Transport::new(control.clone(), loops);
        let (tx, rx) = unit_channel(16);
        (AudioFeed::new(transport, rx), tx, control)
    }

    fn setup_audio_only(
        capacity: usize,
    ) -> (AudioFeed, UnitSender<SamplePacket>, Arc<RecordingControl>) {
        let control = Arc::new(RecordingControl::default());
        let transport = Transport::new(control.clone(), 0);
        let (tx, rx) = unit_channel(capacity);
        (AudioFeed::audio_only(transport, rx), tx, control)
    }

    #[test]
    fn packets_are_spliced_across_calls() {
        let (mut feed, tx, _) = setup(0);
        tx.send(packet(0, Marker::Rebase, &[1.0, 2.0, 3.0])).unwrap();
        tx.send(packet(10, Marker::Normal, &[4.0, 5.0])).unwrap();
        tx.send(packet(20, Marker::Normal, &[6.0, 7.0, 8.0, 9.0])).unwrap();

        let mut out = [0.0; 4];
        assert_eq!(feed.feed(&mut out), 4);
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0]);

        assert_eq!(feed.feed(&mut out), 4);
        assert_eq!(out, [5.0, 6.0, 7.0, 8.0]);

        drop(tx);
        out = [0.0; 4];
        assert_eq!(feed.feed(&mut out), 1);
        assert_eq!(out, [9.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn closed_feed_is_a_no_op() {
        let (mut feed, tx, _) = setup(0);
        drop(tx);

        let mut out = [0.5; 8];
        assert_eq!(feed.feed(&mut out), 0);
        assert!(feed.is_closed());
        assert_eq!(feed.feed(&mut out), 0);
        assert_eq!(out, [0.5; 8]);
    }

    #[test]
    fn closure_is_reported_to_transport() {
        let control = Arc::new(RecordingControl::default());
        let transport = Transport::new(control, 0);
        let (tx, rx) = unit_channel::<SamplePacket>(4);
        let mut feed = AudioFeed::new(transport.clone(), rx);
        drop(tx);

        feed.feed(&mut [0.0; 4]);
        assert!(transport.is_audio_closed());
    }

    #[test]
    fn flush_discards_until_rebase() {
        let (mut feed, tx, _) = setup(0);
        tx.send(packet(0, Marker::Rebase, &[1.0, 2.0, 3.0, 4.0])).unwrap();

        let mut out = [0.0; 2];
        feed.feed(&mut out);
        assert_eq!(out, [1.0, 2.0]);

        feed.transport.request_seek(Duration::from_secs(3));
        feed.transport.issue_pending_seek();
        tx.send(packet(10, Marker::Normal, &[9.0, 9.0])).unwrap();
        tx.send(packet(20, Marker::Normal, &[9.0, 9.0])).unwrap();
        tx.send(packet(3000, Marker::Rebase, &[5.0, 6.0])).unwrap();
        tx.send(packet(3010, Marker::Normal, &[7.0, 8.0])).unwrap();

        // The rest of the held packet and the stale packets contribute nothing
        let mut out = [0.0; 4];
        assert_eq!(feed.feed(&mut out), 4);
        assert_eq!(out, [5.0, 6.0, 7.0, 8.0]);
        assert!(!feed.is_flushing());
    }

    #[test]
    fn end_of_stream_is_skipped_alongside_video() {
        let (mut feed, tx, control) = setup(0);
        tx.send(packet(0, Marker::Rebase, &[1.0])).unwrap();
        tx.send(SamplePacket::end_of_stream(Duration::from_millis(10)))
            .unwrap();
        tx.send(packet(0, Marker::Rebase, &[2.0])).unwrap();

        let mut out = [0.0; 2];
        assert_eq!(feed.feed(&mut out), 2);
        assert_eq!(out, [1.0, 2.0]);
        assert!(control.calls().is_empty());
    }

    #[test]
    fn audio_only_feed_applies_loop_rule() {
        let control = Arc::new(RecordingControl::default());
        let transport = Transport::new(control.clone(), 1);
        let (tx, rx) = unit_channel(8);
        let mut feed = AudioFeed::audio_only(transport.clone(), rx);

        tx.send(packet(0, Marker::Rebase, &[1.0])).unwrap();
        tx.send(SamplePacket::end_of_stream(Duration::from_millis(10)))
            .unwrap();
        tx.send(SamplePacket::end_of_stream(Duration::from_millis(10)))
            .unwrap();
        drop(tx);

        let mut out = [0.0; 4];
        assert_eq!(feed.feed(&mut out), 1);
        assert_eq!(transport.remaining_loops(), 0);
        assert_eq!(transport.mode(), TransportMode::ShuttingDown);
        assert_eq!(control.shutdowns(), 1);
        assert!(transport.is_audio_closed());
    }

    #[test]
    fn stale_packet_after_a_blocking_wait_is_flushed() {
        let (mut feed, tx, _) = setup(0);
        let transport = feed.transport.clone();
        tx.send(packet(0, Marker::Rebase, &[1.0, 2.0])).unwrap();

        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let device = std::thread::spawn(move || {
            let mut first = [0.0; 2];
            feed.feed(&mut first);
            ready_tx.send(first).unwrap();

            // Blocks on the empty channel until the main thread sends
            let mut second = [0.0; 2];
            feed.feed(&mut second);
            second
        });

        assert_eq!(ready_rx.recv().unwrap(), [1.0, 2.0]);
        std::thread::sleep(Duration::from_millis(50));

        transport.request_seek(Duration::from_secs(4));
        transport.issue_pending_seek();
        tx.send(packet(20, Marker::Normal, &[9.0, 9.0])).unwrap();
        tx.send(packet(4000, Marker::Rebase, &[5.0, 6.0])).unwrap();

        assert_eq!(device.join().unwrap(), [5.0, 6.0]);
    }

    #[test]
    fn audio_only_feed_tracks_position_for_resume() {
        let (mut feed, tx, control) = setup_audio_only(32);
        let transport = feed.transport.clone();
        tx.send(packet(0, Marker::Rebase, &[0.1; 4])).unwrap();
        for i in 1..30 {
            tx.send(packet(i * 100, Marker::Normal, &[0.1; 4])).unwrap();
        }

        let mut out = [0.0; 4];
        for _ in 0..30 {
            assert_eq!(feed.feed(&mut out), 4);
        }
        assert_eq!(transport.current_timecode(), Duration::from_millis(2900));

        transport.on_pause_toggle();
        assert!(transport.mode().is_paused());
        transport.on_pause_toggle();
        transport.issue_pending_seek();

        assert_eq!(control.seeks(), vec![Duration::from_millis(2900)]);
        assert_eq!(transport.mode(), TransportMode::Flushing);
    }

    #[test]
    fn audio_only_step_plays_one_packet_then_pauses() {
        let (mut feed, tx, _) = setup_audio_only(8);
        let transport = feed.transport.clone();
        tx.send(packet(0, Marker::Rebase, &[1.0, 1.0])).unwrap();
        tx.send(packet(20, Marker::Normal, &[2.0, 2.0])).unwrap();
        tx.send(packet(40, Marker::Normal, &[3.0, 3.0])).unwrap();

        let mut out = [0.0; 2];
        feed.feed(&mut out);

        transport.on_pause_toggle();
        transport.on_single_step();
        assert_eq!(transport.mode(), TransportMode::Stepping(1));

        let mut out = [0.0; 4];
        assert_eq!(feed.feed(&mut out), 2);
        assert_eq!(out, [2.0, 2.0, 0.0, 0.0]);
        assert!(transport.mode().is_paused());
        assert_eq!(transport.current_timecode(), Duration::from_millis(20));
        assert!(!feed.is_closed());
    }

    #[test]
    fn audio_only_seek_ends_flushing_on_rebase() {
        let (mut feed, tx, _) = setup_audio_only(8);
        let transport = feed.transport.clone();
        tx.send(packet(0, Marker::Rebase, &[1.0])).unwrap();
        feed.feed(&mut [0.0; 1]);

        transport.request_seek(Duration::from_millis(500));
        transport.issue_pending_seek();
        tx.send(packet(20, Marker::Normal, &[9.0])).unwrap();
        tx.send(packet(500, Marker::Rebase, &[4.0])).unwrap();

        let mut out = [0.0; 1];
        assert_eq!(feed.feed(&mut out), 1);
        assert_eq!(out, [4.0]);
        assert_eq!(transport.mode(), TransportMode::Playing);
        assert_eq!(transport.current_timecode(), Duration::from_millis(500));
    }
}
