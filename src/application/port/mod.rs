// SPDX-License-Identifier: MPL-2.0
//! Port definitions (interfaces to external collaborators).
//!
//! Infrastructure adapters implement these traits; the playback core only
//! depends on them.

pub mod demuxer;

pub use demuxer::{
    AudioTrack, ContainerReader, OpenedStream, StreamHandle, TrackRequest, VideoTrack,
};
