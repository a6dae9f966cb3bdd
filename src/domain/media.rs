// SPDX-License-Identifier: MPL-2.0
//! Decoded media units carried from the demuxer to the playback core.
//!
//! Every unit (picture or sample packet) carries a [`Marker`] telling the
//! consumer whether it is ordinary data, the first unit after a
//! discontinuity, or the end-of-stream sentinel.

use std::time::Duration;

/// Continuity marker attached to each decoded unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Marker {
    /// Regular data within the current continuity segment.
    #[default]
    Normal,

    /// First unit after a discontinuity (seek, loop restart, stream start).
    /// The consumer must recompute its timebase from this unit.
    Rebase,

    /// Sentinel marking the end of the track. Carries no data and is never
    /// presented or played.
    EndOfStream,
}

impl Marker {
    #[must_use]
    pub fn is_rebase(self) -> bool {
        matches!(self, Self::Rebase)
    }

    #[must_use]
    pub fn is_end_of_stream(self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

/// Common view over pictures and sample packets.
pub trait StreamUnit: Send + 'static {
    /// Presentation timecode relative to track start.
    fn timecode(&self) -> Duration;

    /// Continuity marker of this unit.
    fn marker(&self) -> Marker;
}

/// Planar YCbCr 4:2:0 picture data.
///
/// Chroma planes are half the luma width and height. Strides are in bytes
/// and may exceed the visible width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PicturePlanes {
    pub width: u32,
    pub height: u32,
    pub y: Vec<u8>,
    pub y_stride: usize,
    pub cb: Vec<u8>,
    pub cr: Vec<u8>,
    pub c_stride: usize,
}

impl PicturePlanes {
    /// Chroma plane dimensions (rounded up for odd sizes).
    #[must_use]
    pub fn chroma_size(&self) -> (u32, u32) {
        (self.width.div_ceil(2), self.height.div_ceil(2))
    }
}

/// One decoded video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPicture {
    pub timecode: Duration,
    pub marker: Marker,
    pub planes: PicturePlanes,
}

impl DecodedPicture {
    #[must_use]
    pub fn new(timecode: Duration, marker: Marker, planes: PicturePlanes) -> Self {
        Self {
            timecode,
            marker,
            planes,
        }
    }

    /// End-of-stream sentinel. `track_end` is the timecode at which the last
    /// real frame stops being displayed.
    #[must_use]
    pub fn end_of_stream(track_end: Duration) -> Self {
        Self {
            timecode: track_end,
            marker: Marker::EndOfStream,
            planes: PicturePlanes::default(),
        }
    }
}

impl StreamUnit for DecodedPicture {
    fn timecode(&self) -> Duration {
        self.timecode
    }

    fn marker(&self) -> Marker {
        self.marker
    }
}

/// One decoded audio packet of interleaved `f32` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePacket {
    pub timecode: Duration,
    pub marker: Marker,
    pub data: Vec<f32>,
}

impl SamplePacket {
    #[must_use]
    pub fn new(timecode: Duration, marker: Marker, data: Vec<f32>) -> Self {
        Self {
            timecode,
            marker,
            data,
        }
    }

    #[must_use]
    pub fn end_of_stream(track_end: Duration) -> Self {
        Self {
            timecode: track_end,
            marker: Marker::EndOfStream,
            data: Vec::new(),
        }
    }

    /// Number of samples across all channels.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.data.len()
    }
}

impl StreamUnit for SamplePacket {
    fn timecode(&self) -> Duration {
        self.timecode
    }

    fn marker(&self) -> Marker {
        self.marker
    }
}

/// Static properties of the video track being played.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoTrackInfo {
    pub width: u32,
    pub height: u32,
    /// Nominal duration of one frame, if the container declares a rate.
    pub frame_duration: Option<Duration>,
}

/// Static properties of the audio track as delivered to the core
/// (after resampling to the output format).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTrackInfo {
    pub sample_rate: u32,
    pub channels: u16,
}
