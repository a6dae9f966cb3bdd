// SPDX-License-Identifier: MPL-2.0
//! Timebase and frame pacing.
//!
//! Maps stream timecodes onto wall-clock instants and decides when the next
//! decoded frame should become current.
//!
//! # Timebase
//!
//! Each continuity segment has an origin instant such that
//!
//! ```text
//! wall_time = origin + frame.timecode
//! ```
//!
//! The origin is recomputed from the first frame after every discontinuity
//! (`origin = now - frame.timecode`), so a seek or loop restart presents its
//! first frame immediately and paces the rest from there.
//!
//! # Blending
//!
//! With cross-fade enabled the renderer mixes the previous and the current
//! frame. The mix factor runs from 0 (previous) to 1 (current) as wall time
//! moves from the previous frame's instant to the current frame's instant.

use std::time::{Duration, Instant};

/// Source of wall-clock time.
pub trait Clock: Send + std::fmt::Debug {
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Wall-clock anchor of the current continuity segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timebase {
    origin: Option<Instant>,
}

impl Timebase {
    /// Creates a timebase with no origin yet; the first rebase sets it.
    #[must_use]
    pub fn new() -> Self {
        Self { origin: None }
    }

    /// Anchors a new segment so that `timecode` maps onto `now`.
    ///
    /// If `timecode` lies further in the past than the monotonic clock can
    /// represent, the origin is pinned to `now`.
    pub fn rebase(&mut self, now: Instant, timecode: Duration) {
        self.origin = Some(now.checked_sub(timecode).unwrap_or(now));
    }

    /// Origin of the current segment, if one has been established.
    #[must_use]
    pub fn origin(&self) -> Option<Instant> {
        self.origin
    }

    /// Wall-clock instant at which `timecode` is due.
    #[must_use]
    pub fn deadline(&self, timecode: Duration) -> Option<Instant> {
        self.origin.map(|origin| origin + timecode)
    }

    /// Returns true if `timecode` is due at `now`.
    ///
    /// Without an origin nothing can be paced, so everything is due.
    #[must_use]
    pub fn is_due(&self, now: Instant, timecode: Duration) -> bool {
        self.deadline(timecode).is_none_or(|due| now >= due)
    }

    /// Stream position corresponding to `now`.
    #[must_use]
    pub fn position(&self, now: Instant) -> Option<Duration> {
        self.origin.map(|origin| now.saturating_duration_since(origin))
    }
}

/// Decides whether the engine should pull the next frame this tick.
///
/// * `ignore_timecodes` advances once per tick regardless of pacing.
/// * Without a current frame there is nothing to hold, so the engine pulls.
#[must_use]
pub fn should_advance(
    timebase: &Timebase,
    now: Instant,
    current: Option<Duration>,
    ignore_timecodes: bool,
) -> bool {
    match current {
        None => true,
        Some(_) if ignore_timecodes => true,
        Some(timecode) => timebase.is_due(now, timecode),
    }
}

/// Cross-fade factor between the previous and the current frame.
///
/// Returns a value in `[0, 1]`. Two frames sharing a timecode (or a
/// current frame older than the previous one) yield 1, which shows the
/// current frame unblended.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // factor is within [0, 1]
pub fn blend_factor(timebase: &Timebase, now: Instant, previous: Duration, current: Duration) -> f32 {
    let Some(position) = timebase.position(now) else {
        return 1.0;
    };

    let span = current.as_secs_f64() - previous.as_secs_f64();
    if span <= 0.0 {
        return 1.0;
    }

    let elapsed = position.as_secs_f64() - previous.as_secs_f64();
    (elapsed / span).clamp(0.0, 1.0) as f32
}
