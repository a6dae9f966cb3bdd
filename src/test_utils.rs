// SPDX-License-Identifier: MPL-2.0
//! Test utilities for float comparisons and other common test helpers.
//!
//! This module re-exports the `approx` crate's assertion macro for float comparison,
//! which properly handle floating-point precision issues that `assert_eq!` cannot.

use crate::application::port::StreamHandle;
use std::sync::Mutex;
use std::time::Duration;

// Re-export approx macros for convenient use in tests
pub use approx::assert_abs_diff_eq;

/// Default epsilon for f32 comparisons.
/// Suitable for values that should be "exactly equal" but may have minor floating-point errors.
pub const F32_EPSILON: f32 = 1e-6;

/// A request received by [`RecordingControl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCall {
    Seek(Duration),
    Shutdown,
}

/// Stream handle that records every request instead of acting on it.
#[derive(Debug)]
pub struct RecordingControl {
    calls: Mutex<Vec<ControlCall>>,
    total: Duration,
    frame: Option<Duration>,
}

impl RecordingControl {
    pub fn new(total: Duration, frame: Option<Duration>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            total,
            frame,
        }
    }

    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ControlCall::Seek(target) => Some(target),
                ControlCall::Shutdown => None,
            })
            .collect()
    }

    pub fn shutdowns(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == ControlCall::Shutdown)
            .count()
    }
}

impl Default for RecordingControl {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Some(Duration::from_millis(40)))
    }
}

impl StreamHandle for RecordingControl {
    fn seek(&self, target: Duration) {
        self.calls.lock().unwrap().push(ControlCall::Seek(target));
    }

    fn shutdown(&self) {
        self.calls.lock().unwrap().push(ControlCall::Shutdown);
    }

    fn total_duration(&self) -> Duration {
        self.total
    }

    fn frame_duration(&self) -> Option<Duration> {
        self.frame
    }
}
