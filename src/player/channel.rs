// SPDX-License-Identifier: MPL-2.0
//! Bounded, closable conduits from the demuxer to the playback core.
//!
//! Thin wrappers over `tokio::sync::mpsc` bounded channels used from plain
//! threads: the demuxer blocks when a track's channel is full, the consumer
//! blocks when it is empty, and closure is reported once the queue drains.
//!
//! Neither side may be used from inside an async runtime (the blocking
//! calls panic there); both the render tick and the audio callback run on
//! ordinary threads.

use tokio::sync::mpsc;

use crate::domain::StreamUnit;

/// Producer half, owned by the demuxer.
#[derive(Debug)]
pub struct UnitSender<T> {
    inner: mpsc::Sender<T>,
}

impl<T> Clone for UnitSender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: StreamUnit> UnitSender<T> {
    /// Delivers a unit, blocking while the channel is full.
    ///
    /// Returns the unit back if the consumer has gone away.
    pub fn send(&self, unit: T) -> Result<(), T> {
        self.inner.blocking_send(unit).map_err(|e| e.0)
    }

    /// Returns true once the receiving side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Consumer half, owned by the video engine or the audio feed.
#[derive(Debug)]
pub struct UnitReceiver<T> {
    inner: mpsc::Receiver<T>,
}

impl<T: StreamUnit> UnitReceiver<T> {
    /// Waits for the next unit. `None` means the channel is closed.
    pub fn recv(&mut self) -> Option<T> {
        self.inner.blocking_recv()
    }
}

/// Creates a bounded unit channel holding at most `capacity` units.
///
/// A zero capacity is raised to one.
#[must_use]
pub fn unit_channel<T: StreamUnit>(capacity: usize) -> (UnitSender<T>, UnitReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (UnitSender { inner: tx }, UnitReceiver { inner: rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Marker, SamplePacket};
    use std::time::Duration;

    fn packet(ms: u64) -> SamplePacket {
        SamplePacket::new(Duration::from_millis(ms), Marker::Normal, vec![0.0; 4])
    }

    #[test]
    fn units_arrive_in_order() {
        let (tx, mut rx) = unit_channel(4);
        tx.send(packet(0)).unwrap();
        tx.send(packet(20)).unwrap();
        assert_eq!(rx.recv().unwrap().timecode, Duration::ZERO);
        assert_eq!(rx.recv().unwrap().timecode, Duration::from_millis(20));
    }

    #[test]
    fn queued_units_drain_before_closure() {
        let (tx, mut rx) = unit_channel::<SamplePacket>(2);
        tx.send(packet(0)).unwrap();
        drop(tx);

        assert!(rx.recv().is_some());
        assert!(rx.recv().is_none());
        assert!(rx.recv().is_none());
    }

    #[test]
    fn send_fails_once_receiver_is_dropped() {
        let (tx, rx) = unit_channel::<SamplePacket>(1);
        drop(rx);
        assert!(tx.is_closed());
        let returned = tx.send(packet(40)).unwrap_err();
        assert_eq!(returned.timecode, Duration::from_millis(40));
    }

    #[test]
    fn full_channel_applies_backpressure() {
        let (tx, mut rx) = unit_channel(1);
        tx.send(packet(0)).unwrap();

        let producer = std::thread::spawn(move || {
            // Blocks until the consumer drains the first packet
            tx.send(packet(20)).unwrap();
        });

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(rx.recv().unwrap().timecode, Duration::ZERO);
        producer.join().unwrap();
        assert_eq!(rx.recv().unwrap().timecode, Duration::from_millis(20));
        assert!(rx.recv().is_none());
    }

    #[test]
    fn zero_capacity_is_usable() {
        let (tx, mut rx) = unit_channel(0);
        tx.send(packet(0)).unwrap();
        assert!(rx.recv().is_some());
    }
}
