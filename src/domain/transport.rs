// SPDX-License-Identifier: MPL-2.0
//! Transport modes and step budgets.
//!
//! The externally visible [`TransportMode`] is derived from two orthogonal
//! pieces of state: the [`Phase`] (is a discontinuity or shutdown in flight)
//! and the [`StepBudget`] (how many more frames may be surfaced).

/// Lifecycle phase of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Normal operation, frames are paced against the timebase.
    #[default]
    Running,
    /// A seek is in flight; incoming data is discarded until a rebase unit.
    Flushing,
    /// The demuxer was told to stop; channels drain until closed. Terminal.
    ShuttingDown,
}

/// Number of frames (audio-only: packets) that may still be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepBudget {
    /// Free-running playback.
    #[default]
    Unbounded,
    /// A finite number of frames; `Finite(0)` is paused.
    Finite(u32),
}

impl StepBudget {
    pub const PAUSED: Self = Self::Finite(0);
    pub const SINGLE: Self = Self::Finite(1);

    /// Consumes one step. Unbounded budgets are never exhausted.
    #[must_use]
    pub fn consume(self) -> Self {
        match self {
            Self::Unbounded => Self::Unbounded,
            Self::Finite(n) => Self::Finite(n.saturating_sub(1)),
        }
    }

    #[must_use]
    pub fn is_paused(self) -> bool {
        self == Self::PAUSED
    }
}

/// Transport mode as seen from outside the core. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Free-running playback.
    Playing,
    /// Stepping with the given number of frames left (0 = paused).
    Stepping(u32),
    /// Waiting for the rebase unit that ends a seek.
    Flushing,
    /// Terminal shutdown in progress.
    ShuttingDown,
}

impl TransportMode {
    #[must_use]
    pub fn from_parts(phase: Phase, steps: StepBudget) -> Self {
        match (phase, steps) {
            (Phase::ShuttingDown, _) => Self::ShuttingDown,
            (Phase::Flushing, _) => Self::Flushing,
            (Phase::Running, StepBudget::Unbounded) => Self::Playing,
            (Phase::Running, StepBudget::Finite(n)) => Self::Stepping(n),
        }
    }

    #[must_use]
    pub fn is_paused(self) -> bool {
        self == Self::Stepping(0)
    }
}
