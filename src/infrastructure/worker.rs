// SPDX-License-Identifier: MPL-2.0
//! Control plumbing shared by demuxer workers.
//!
//! A worker runs on its own thread and polls an unbounded command channel
//! between units. [`WorkerHandle`] is the [`StreamHandle`] side of it.

use crate::application::port::StreamHandle;
use std::time::Duration;
use tokio::sync::mpsc;

/// Request sent from the playback core to a demuxer worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    Seek(Duration),
    Shutdown,
}

/// Outcome of polling the command channel between two units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    Idle,
    Seek(Duration),
    Stop,
}

/// Non-blocking poll, used while the worker is producing.
pub fn poll_commands(commands: &mut mpsc::UnboundedReceiver<WorkerCommand>) -> Poll {
    match commands.try_recv() {
        Ok(WorkerCommand::Seek(target)) => Poll::Seek(target),
        Ok(WorkerCommand::Shutdown) | Err(mpsc::error::TryRecvError::Disconnected) => Poll::Stop,
        Err(mpsc::error::TryRecvError::Empty) => Poll::Idle,
    }
}

/// Blocking wait, used once the worker has sent its end-of-stream sentinels.
pub fn wait_for_command(commands: &mut mpsc::UnboundedReceiver<WorkerCommand>) -> Poll {
    match commands.blocking_recv() {
        Some(WorkerCommand::Seek(target)) => Poll::Seek(target),
        Some(WorkerCommand::Shutdown) | None => Poll::Stop,
    }
}

/// Keeps a seek target strictly inside the stream so the worker always has
/// a unit to deliver (and mark as rebase) after it.
#[must_use]
pub fn clamp_seek(target: Duration, total: Duration, frame: Duration) -> Duration {
    if total.is_zero() || target < total {
        return target;
    }
    total.saturating_sub(frame.max(Duration::from_millis(1)))
}

/// Rounds `value` down to a multiple of `step`.
#[must_use]
pub fn align_down(value: Duration, step: Duration) -> Duration {
    let step_nanos = step.as_nanos();
    if step_nanos == 0 {
        return value;
    }
    let aligned = value.as_nanos() / step_nanos * step_nanos;
    Duration::from_nanos(u64::try_from(aligned).unwrap_or(u64::MAX))
}

/// [`StreamHandle`] backed by a worker's command channel.
#[derive(Debug)]
pub struct WorkerHandle {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    total: Duration,
    frame: Option<Duration>,
}

impl WorkerHandle {
    #[must_use]
    pub fn new(
        commands: mpsc::UnboundedSender<WorkerCommand>,
        total: Duration,
        frame: Option<Duration>,
    ) -> Self {
        Self {
            commands,
            total,
            frame,
        }
    }
}

impl StreamHandle for WorkerHandle {
    fn seek(&self, target: Duration) {
        // A gone worker has already closed its channels
        let _ = self.commands.send(WorkerCommand::Seek(target));
    }

    fn shutdown(&self) {
        let _ = self.commands.send(WorkerCommand::Shutdown);
    }

    fn total_duration(&self) -> Duration {
        self.total
    }

    fn frame_duration(&self) -> Option<Duration> {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_inside_stream_is_kept() {
        let total = Duration::from_secs(10);
        let frame = Duration::from_millis(40);
        assert_eq!(
            clamp_seek(Duration::from_secs(3), total, frame),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn seek_past_end_lands_on_last_frame() {
        let total = Duration::from_secs(10);
        let frame = Duration::from_millis(40);
        assert_eq!(
            clamp_seek(Duration::from_secs(12), total, frame),
            Duration::from_millis(9960)
        );
        assert_eq!(clamp_seek(total, total, frame), Duration::from_millis(9960));
    }

    #[test]
    fn unknown_duration_does_not_clamp() {
        let target = Duration::from_secs(42);
        assert_eq!(
            clamp_seek(target, Duration::ZERO, Duration::from_millis(40)),
            target
        );
    }

    #[test]
    fn align_down_snaps_to_step() {
        let step = Duration::from_millis(40);
        assert_eq!(
            align_down(Duration::from_millis(119), step),
            Duration::from_millis(80)
        );
        assert_eq!(
            align_down(Duration::from_millis(120), step),
            Duration::from_millis(120)
        );
        assert_eq!(
            align_down(Duration::from_millis(7), Duration::ZERO),
            Duration::from_millis(7)
        );
    }

    #[test]
    fn handle_forwards_requests() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = WorkerHandle::new(tx, Duration::from_secs(5), None);

        handle.seek(Duration::from_secs(1));
        handle.shutdown();

        assert_eq!(poll_commands(&mut rx), Poll::Seek(Duration::from_secs(1)));
        assert_eq!(poll_commands(&mut rx), Poll::Stop);
        assert_eq!(poll_commands(&mut rx), Poll::Idle);
    }

    #[test]
    fn dropped_handle_stops_the_worker() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        drop(WorkerHandle::new(tx, Duration::ZERO, None));
        assert_eq!(poll_commands(&mut rx), Poll::Stop);
        assert_eq!(wait_for_command(&mut rx), Poll::Stop);
    }
}
