// SPDX-License-Identifier: MPL-2.0
//! Playback domain types.
//!
//! Value objects and enums that are independent of any decoding, audio
//! device, or rendering concerns.

pub mod media;
pub mod newtypes;
pub mod transport;

pub use media::{
    AudioTrackInfo, DecodedPicture, Marker, PicturePlanes, SamplePacket, StreamUnit,
    VideoTrackInfo,
};
pub use newtypes::{SeekFraction, Volume};
pub use transport::{Phase, StepBudget, TransportMode};
