// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for all configuration constants.
//!
//! # Categories
//!
//! - **Playback**: Looping and display pacing
//! - **Buffers**: Channel capacities between demuxer and playback core

// ==========================================================================
// Playback Defaults
// ==========================================================================

/// Default number of extra passes after the first one.
pub const DEFAULT_LOOPS: u32 = 0;

/// Default render tick rate when pacing to the display.
pub const DEFAULT_REFRESH_HZ: u32 = 60;

/// Minimum render tick rate.
pub const MIN_REFRESH_HZ: u32 = 1;

/// Maximum render tick rate.
pub const MAX_REFRESH_HZ: u32 = 480;

// ==========================================================================
// Buffer Defaults
// ==========================================================================

/// Default capacity of the decoded picture channel, in frames.
pub const DEFAULT_VIDEO_CHANNEL_CAPACITY: usize = 8;

/// Default capacity of the sample channel, in packets.
pub const DEFAULT_AUDIO_CHANNEL_CAPACITY: usize = 64;

/// Minimum channel capacity.
pub const MIN_CHANNEL_CAPACITY: usize = 1;

/// Maximum channel capacity.
pub const MAX_CHANNEL_CAPACITY: usize = 1024;

// ==========================================================================
// Compile-time Validation
// ==========================================================================

const _: () = {
    assert!(MIN_REFRESH_HZ > 0);
    assert!(DEFAULT_REFRESH_HZ >= MIN_REFRESH_HZ);
    assert!(DEFAULT_REFRESH_HZ <= MAX_REFRESH_HZ);

    assert!(MIN_CHANNEL_CAPACITY > 0);
    assert!(DEFAULT_VIDEO_CHANNEL_CAPACITY >= MIN_CHANNEL_CAPACITY);
    assert!(DEFAULT_VIDEO_CHANNEL_CAPACITY <= MAX_CHANNEL_CAPACITY);
    assert!(DEFAULT_AUDIO_CHANNEL_CAPACITY >= MIN_CHANNEL_CAPACITY);
    assert!(DEFAULT_AUDIO_CHANNEL_CAPACITY <= MAX_CHANNEL_CAPACITY);
};
