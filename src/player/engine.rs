// SPDX-License-Identifier: MPL-2.0
//! Video update tick.
//!
//! [`PlaybackEngine::update`] is called once per display refresh. It issues
//! pending seeks, pulls at most one due frame from the video channel (or
//! drains while a discontinuity is in flight), applies the end-of-stream
//! loop rule, and hands back what should be on screen.
//!
//! The engine owns the timebase and the two frame slots. Everything it shares
//! with the audio callback and the input handlers goes through the
//! [`Transport`](super::transport::Transport).

use super::channel::UnitReceiver;
use super::pacing::{blend_factor, should_advance, Clock, SystemClock, Timebase};
use super::presentation::PresentationSnapshot;
use super::transport::{EndOfStreamOutcome, SharedTransport};
use crate::domain::{DecodedPicture, TransportMode};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of one update tick.
#[derive(Debug, Clone)]
pub enum Tick {
    /// Keep running and draw this.
    Present(PresentationSnapshot),
    /// Playback is over. Every later tick returns this too.
    Halted,
}

impl Tick {
    #[must_use]
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted)
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&PresentationSnapshot> {
        match self {
            Self::Present(snapshot) => Some(snapshot),
            Self::Halted => None,
        }
    }
}

/// Presentation options fixed for the lifetime of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Cross-fade between the previous and the current frame.
    pub blend: bool,
    /// Advance one frame per tick instead of pacing by timecode.
    pub ignore_timecodes: bool,
}

/// Drives the video side of playback.
#[derive(Debug)]
pub struct PlaybackEngine {
    transport: SharedTransport,
    video: Option<UnitReceiver<DecodedPicture>>,
    options: EngineOptions,
    /// Re-read when a flush ends, since the drain may have blocked.
    clock: Box<dyn Clock>,
    timebase: Timebase,
    current: Option<Arc<DecodedPicture>>,
    previous: Option<Arc<DecodedPicture>>,
    /// Timecode carried by the last end-of-stream sentinel.
    track_end: Option<Duration>,
    closed: bool,
    halted: bool,
}

impl PlaybackEngine {
    /// Creates an engine. Without a video channel the engine only services
    /// seeks and reports `Halted` once the audio track has closed.
    #[must_use]
    pub fn new(
        transport: SharedTransport,
        video: Option<UnitReceiver<DecodedPicture>>,
        options: EngineOptions,
    ) -> Self {
        Self {
            transport,
            video,
            options,
            clock: Box::new(SystemClock),
            timebase: Timebase::new(),
            current: None,
            previous: None,
            track_end: None,
            closed: false,
            halted: false,
        }
    }

    /// Replaces the clock used to anchor the segment after a seek.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }

    #[must_use]
    pub fn timebase(&self) -> &Timebase {
        &self.timebase
    }

    /// Runs one tick at wall-clock instant `now`.
    pub fn update(&mut self, now: Instant) -> Tick {
        if self.halted {
            return Tick::Halted;
        }

        self.transport.issue_pending_seek();

        if self.video.is_none() {
            return self.audio_only_tick();
        }

        if !self.closed && self.wants_frame(now) {
            self.pull(now);
            while !self.closed && self.transport.mode() == TransportMode::Flushing {
                self.pull(now);
            }
        }

        if self.closed && self.end_reached(now) {
            log::info!("Playback finished");
            self.halted = true;
            return Tick::Halted;
        }

        Tick::Present(self.snapshot(now))
    }

    fn audio_only_tick(&mut self) -> Tick {
        if self.transport.is_audio_closed() {
            log::info!("Audio track closed, playback finished");
            self.halted = true;
            return Tick::Halted;
        }
        Tick::Present(PresentationSnapshot::empty(self.transport.mode()))
    }

    fn wants_frame(&self, now: Instant) -> bool {
        match self.transport.mode() {
            TransportMode::Flushing | TransportMode::ShuttingDown => true,
            TransportMode::Stepping(0) => false,
            TransportMode::Playing | TransportMode::Stepping(_) => should_advance(
                &self.timebase,
                now,
                self.current.as_ref().map(|picture| picture.timecode),
                self.options.ignore_timecodes,
            ),
        }
    }

    /// Receives one unit and applies it.
    fn pull(&mut self, now: Instant) {
        let Some(video) = self.video.as_mut() else {
            return;
        };

        let Some(picture) = video.recv() else {
            self.closed = true;
            if self.transport.begin_shutdown() {
                log::info!("Video channel closed without end of stream");
            }
            return;
        };

        if picture.marker.is_end_of_stream() {
            self.track_end = Some(picture.timecode);
            if matches!(
                self.transport.on_end_of_stream(),
                EndOfStreamOutcome::Looping { .. }
            ) {
                self.track_end = None;
            }
            return;
        }

        let rebase = picture.marker.is_rebase();
        let ends_flush = rebase && self.transport.mode() == TransportMode::Flushing;
        if !self.transport.admit_frame(rebase, picture.timecode) {
            log::trace!("Discarding frame at {:?} while flushing", picture.timecode);
            return;
        }

        let picture = Arc::new(picture);
        if rebase {
            // The demuxer seek may have kept us waiting well past `now`
            let anchor = if ends_flush {
                now.max(self.clock.now())
            } else {
                now
            };
            self.timebase.rebase(anchor, picture.timecode);
            self.previous = Some(picture.clone());
        } else {
            self.previous = self.current.take();
        }
        log::trace!("Frame at {:?} is current", picture.timecode);
        self.current = Some(picture);
    }

    /// After closure, the last frame stays up until the track end is due.
    fn end_reached(&self, now: Instant) -> bool {
        if self.options.ignore_timecodes {
            return true;
        }
        self.track_end.is_none_or(|end| self.timebase.is_due(now, end))
    }

    fn snapshot(&self, now: Instant) -> PresentationSnapshot {
        let mode = self.transport.mode();
        if !self.options.blend {
            return PresentationSnapshot {
                current: self.current.clone(),
                ..PresentationSnapshot::empty(mode)
            };
        }

        let factor = match (&self.previous, &self.current) {
            (Some(previous), Some(current)) => {
                blend_factor(&self.timebase, now, previous.timecode, current.timecode)
            }
            _ => 1.0,
        };

        PresentationSnapshot {
            current: self.current.clone(),
            previous: self.previous.clone(),
            blend_factor: factor,
            mode,
        }
    }
}
