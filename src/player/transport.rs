// SPDX-License-Identifier: MPL-2.0
//! Shared transport state: seeks, steps, loops and shutdown.
//!
//! One [`Transport`] is shared between the video tick, the audio callback and
//! the input handlers. Its fields live behind a short-held mutex that is never
//! kept across a channel wait or a call into the demuxer. The audio flush
//! signal is a separate atomic so the audio callback can poll it without
//! taking the lock.
//!
//! # Discontinuities
//!
//! ```text
//! request_seek(t) ──► pending_seek = t
//! next tick       ──► demuxer.seek(t), phase = Flushing, audio flush raised
//! rebase frame    ──► phase = Running
//! ```

use crate::application::port::StreamHandle;
use crate::domain::{Phase, SeekFraction, StepBudget, TransportMode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Frame duration used for stepping when the container declares no rate.
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(40);

/// Transport shared across the playback contexts.
pub type SharedTransport = Arc<Transport>;

/// What an end-of-stream sentinel led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfStreamOutcome {
    /// A loop was consumed and a seek to zero is pending.
    Looping { remaining: u32 },
    /// No loops left; shutdown was signaled now.
    ShuttingDown,
    /// Shutdown had already been signaled earlier.
    AlreadyShuttingDown,
}

#[derive(Debug, Default)]
struct TransportState {
    phase: Phase,
    steps: StepBudget,
    pending_seek: Option<Duration>,
    remaining_loops: u32,
    current_timecode: Duration,
    shutdown_signaled: bool,
}

/// Playback transport and the demuxer control it drives.
pub struct Transport {
    state: Mutex<TransportState>,
    audio_flush: AtomicBool,
    audio_closed: AtomicBool,
    control: Arc<dyn StreamHandle>,
    total_duration: Duration,
    frame_duration: Duration,
}

impl Transport {
    /// Creates a playing transport that will restart `loops` more times after
    /// the first pass.
    #[must_use]
    pub fn new(control: Arc<dyn StreamHandle>, loops: u32) -> SharedTransport {
        let total_duration = control.total_duration();
        let frame_duration = control
            .frame_duration()
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_FRAME_DURATION);

        Arc::new(Self {
            state: Mutex::new(TransportState {
                remaining_loops: loops,
                ..TransportState::default()
            }),
            audio_flush: AtomicBool::new(false),
            audio_closed: AtomicBool::new(false),
            control,
            total_duration,
            frame_duration,
        })
    }

    fn state(&self) -> MutexGuard<'_, TransportState> {
        // The state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[must_use]
    pub fn mode(&self) -> TransportMode {
        let state = self.state();
        TransportMode::from_parts(state.phase, state.steps)
    }

    #[must_use]
    pub fn steps(&self) -> StepBudget {
        self.state().steps
    }

    #[must_use]
    pub fn pending_seek(&self) -> Option<Duration> {
        self.state().pending_seek
    }

    #[must_use]
    pub fn remaining_loops(&self) -> u32 {
        self.state().remaining_loops
    }

    /// Timecode of the most recently surfaced frame or packet.
    #[must_use]
    pub fn current_timecode(&self) -> Duration {
        self.state().current_timecode
    }

    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    #[must_use]
    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    // =========================================================================
    // Seek and discontinuity handling
    // =========================================================================

    /// Stores a seek target for the next tick. Ignored once shutting down.
    pub fn request_seek(&self, target: Duration) {
        let mut state = self.state();
        if state.phase == Phase::ShuttingDown {
            return;
        }
        state.pending_seek = Some(target);
    }

    /// Hands a pending seek to the demuxer and enters `Flushing`.
    ///
    /// Returns the issued target, if any.
    pub fn issue_pending_seek(&self) -> Option<Duration> {
        let target = {
            let mut state = self.state();
            let target = state.pending_seek.take()?;
            if state.phase == Phase::ShuttingDown {
                return None;
            }
            state.phase = Phase::Flushing;
            self.audio_flush.store(true, Ordering::Release);
            target
        };

        log::info!("Seeking to {:.3}s", target.as_secs_f64());
        self.control.seek(target);
        Some(target)
    }

    /// Consumes the audio flush signal.
    pub fn take_audio_flush(&self) -> bool {
        self.audio_flush.swap(false, Ordering::AcqRel)
    }

    /// Applies a received frame (or, without a video track, a sample packet)
    /// to the transport.
    ///
    /// A rebase unit ends flushing. Returns true if the frame should become
    /// current, in which case one step is consumed and its timecode recorded.
    pub fn admit_frame(&self, rebase: bool, timecode: Duration) -> bool {
        let mut state = self.state();
        if rebase && state.phase == Phase::Flushing {
            state.phase = Phase::Running;
        }
        if state.phase == Phase::Flushing {
            return false;
        }
        state.steps = state.steps.consume();
        state.current_timecode = timecode;
        true
    }

    /// Applies the loop rule for an end-of-stream sentinel.
    pub fn on_end_of_stream(&self) -> EndOfStreamOutcome {
        {
            let mut state = self.state();
            if state.remaining_loops > 0 && !state.shutdown_signaled {
                state.remaining_loops -= 1;
                state.pending_seek = Some(Duration::ZERO);
                log::info!("End of stream, looping ({} left)", state.remaining_loops);
                return EndOfStreamOutcome::Looping {
                    remaining: state.remaining_loops,
                };
            }
        }

        if self.begin_shutdown() {
            EndOfStreamOutcome::ShuttingDown
        } else {
            EndOfStreamOutcome::AlreadyShuttingDown
        }
    }

    /// Tells the demuxer to stop and enters `ShuttingDown`.
    ///
    /// Returns false if shutdown had already been signaled.
    pub fn begin_shutdown(&self) -> bool {
        {
            let mut state = self.state();
            if state.shutdown_signaled {
                return false;
            }
            state.shutdown_signaled = true;
            state.phase = Phase::ShuttingDown;
            state.pending_seek = None;
        }

        log::info!("Shutting down demuxer");
        self.control.shutdown();
        true
    }

    /// Records that the audio channel has closed.
    pub fn mark_audio_closed(&self) {
        self.audio_closed.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_audio_closed(&self) -> bool {
        self.audio_closed.load(Ordering::Acquire)
    }

    // =========================================================================
    // Input commands
    // =========================================================================

    fn set_steps(&self, steps: StepBudget) {
        self.state().steps = steps;
    }

    /// Jumps to a fraction of the total duration. The step budget is kept.
    pub fn on_seek_to_fraction(&self, fraction: SeekFraction) {
        self.request_seek(fraction.of(self.total_duration));
    }

    /// Pauses, or resumes from the current frame when already paused.
    pub fn on_pause_toggle(&self) {
        if self.steps().is_paused() {
            self.on_replay_from_current();
        } else {
            self.set_steps(StepBudget::PAUSED);
        }
    }

    /// Surfaces the frame one frame duration after the current one, then pauses.
    pub fn on_step_forward(&self) {
        self.set_steps(StepBudget::SINGLE);
        let target = self.current_timecode().saturating_add(self.frame_duration);
        self.request_seek(target);
    }

    /// Surfaces the frame one frame duration before the current one, then pauses.
    pub fn on_step_backward(&self) {
        self.set_steps(StepBudget::SINGLE);
        let target = self.current_timecode().saturating_sub(self.frame_duration);
        self.request_seek(target);
    }

    /// Lets exactly one more decoded frame through.
    pub fn on_single_step(&self) {
        self.set_steps(StepBudget::SINGLE);
    }

    /// Resumes free-running playback from the current frame's timecode.
    pub fn on_replay_from_current(&self) {
        self.set_steps(StepBudget::Unbounded);
        self.request_seek(self.current_timecode());
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("state", &*self.state())
            .field("audio_flush", &self.audio_flush)
            .field("audio_closed", &self.audio_closed)
            .field("total_duration", &self.total_duration)
            .field("frame_duration", &self.frame_duration)
            .finish_non_exhaustive()
    }
}
