// SPDX-License-Identifier: MPL-2.0
//! Playback newtypes.
//!
//! Type-safe wrappers for playback values, ensuring they are always within
//! valid ranges.

use std::time::Duration;

// =============================================================================
// Volume
// =============================================================================

/// Volume bounds (0.0 to 1.5, where 1.0 = 100%).
pub mod volume_bounds {
    /// Minimum volume level.
    pub const MIN: f32 = 0.0;
    /// Maximum volume level (1.5 = 150% amplification).
    pub const MAX: f32 = 1.5;
    /// Default volume level.
    pub const DEFAULT: f32 = 1.0;
}

/// Output volume, guaranteed to be within 0.0–1.5.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume(f32);

impl Volume {
    /// Creates a new volume level, clamping to valid range.
    #[must_use]
    pub fn new(volume: f32) -> Self {
        Self(volume.clamp(volume_bounds::MIN, volume_bounds::MAX))
    }

    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }

    /// Gain actually applied to samples.
    ///
    /// Quadratic curve so the setting feels linear to the ear:
    /// 0.5 → 0.25 (-12 dB), 1.0 → 1.0, 1.5 → 2.25 (+7 dB).
    #[must_use]
    pub fn gain(self) -> f32 {
        self.0 * self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(volume_bounds::DEFAULT)
    }
}

// =============================================================================
// SeekFraction
// =============================================================================

/// Position along the stream, 0.0 = start, 1.0 = end. Out-of-range values
/// are clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekFraction(f64);

impl SeekFraction {
    #[must_use]
    pub fn new(fraction: f64) -> Self {
        if fraction.is_nan() {
            return Self(0.0);
        }
        Self(fraction.clamp(0.0, 1.0))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Stream position this fraction points at.
    #[must_use]
    pub fn of(self, total: Duration) -> Duration {
        total.mul_f64(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_abs_diff_eq;

    #[test]
    fn volume_clamps_to_valid_range() {
        assert_abs_diff_eq!(Volume::new(-1.0).value(), volume_bounds::MIN);
        assert_abs_diff_eq!(Volume::new(4.0).value(), volume_bounds::MAX);
        assert_abs_diff_eq!(Volume::new(0.7).value(), 0.7);
    }

    #[test]
    fn volume_gain_is_quadratic() {
        assert_abs_diff_eq!(Volume::new(0.5).gain(), 0.25);
        assert_abs_diff_eq!(Volume::default().gain(), 1.0);
        assert_abs_diff_eq!(Volume::new(1.5).gain(), 2.25);
    }

    #[test]
    fn seek_fraction_clamps_and_handles_nan() {
        assert_abs_diff_eq!(SeekFraction::new(-0.3).value(), 0.0);
        assert_abs_diff_eq!(SeekFraction::new(1.7).value(), 1.0);
        assert_abs_diff_eq!(SeekFraction::new(f64::NAN).value(), 0.0);
    }

    #[test]
    fn seek_fraction_scales_duration() {
        let fraction = SeekFraction::new(0.25);
        assert_eq!(
            fraction.of(Duration::from_secs(60)),
            Duration::from_secs(15)
        );
    }
}
