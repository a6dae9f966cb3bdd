// SPDX-License-Identifier: MPL-2.0
//! Demuxer port definition.
//!
//! The playback core never talks to a container library directly. It asks a
//! [`ContainerReader`] to open a path, receives one channel per played track,
//! and steers the producer through a [`StreamHandle`].
//!
//! # Protocol
//!
//! - The first unit of each track, and the first unit after every seek, is
//!   marked [`Marker::Rebase`].
//! - At the end of a track the producer sends one [`Marker::EndOfStream`]
//!   sentinel whose timecode is the track end, then waits for a seek or a
//!   shutdown.
//! - `seek` and `shutdown` are asynchronous requests. Their effects are only
//!   observed through the channels: a rebase unit, or closure.
//! - Any unrecoverable decode failure ends in channel closure so the core
//!   can stop cleanly instead of waiting forever.
//!
//! [`Marker::Rebase`]: crate::domain::Marker::Rebase
//! [`Marker::EndOfStream`]: crate::domain::Marker::EndOfStream

use crate::domain::{AudioTrackInfo, DecodedPicture, SamplePacket, VideoTrackInfo};
use crate::error::StartupError;
use crate::player::channel::UnitReceiver;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Requests and opened streams
// =============================================================================

/// What the caller wants out of the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackRequest {
    /// Decode the first video track, if any.
    pub video: bool,

    /// Decode the first audio track, if any.
    pub audio: bool,

    /// Sample rate and channel count audio must be delivered in.
    /// `None` keeps the track's native format.
    pub audio_format: Option<AudioTrackInfo>,

    /// Capacity of the picture channel, in frames.
    pub video_capacity: usize,

    /// Capacity of the sample channel, in packets.
    pub audio_capacity: usize,
}

impl Default for TrackRequest {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
            audio_format: None,
            video_capacity: crate::config::DEFAULT_VIDEO_CHANNEL_CAPACITY,
            audio_capacity: crate::config::DEFAULT_AUDIO_CHANNEL_CAPACITY,
        }
    }
}

/// A video track ready for consumption.
#[derive(Debug)]
pub struct VideoTrack {
    pub info: VideoTrackInfo,
    pub channel: UnitReceiver<DecodedPicture>,
}

/// An audio track ready for consumption.
#[derive(Debug)]
pub struct AudioTrack {
    pub info: AudioTrackInfo,
    pub channel: UnitReceiver<SamplePacket>,
}

/// Result of a successful open: the control handle plus the played tracks.
pub struct OpenedStream {
    pub handle: Arc<dyn StreamHandle>,
    video: Option<VideoTrack>,
    audio: Option<AudioTrack>,
}

impl OpenedStream {
    #[must_use]
    pub fn new(
        handle: Arc<dyn StreamHandle>,
        video: Option<VideoTrack>,
        audio: Option<AudioTrack>,
    ) -> Self {
        Self {
            handle,
            video,
            audio,
        }
    }

    /// Takes the first video track. Returns `None` if there is none or it
    /// was already taken.
    pub fn take_video(&mut self) -> Option<VideoTrack> {
        self.video.take()
    }

    /// Takes the first audio track. Returns `None` if there is none or it
    /// was already taken.
    pub fn take_audio(&mut self) -> Option<AudioTrack> {
        self.audio.take()
    }

    #[must_use]
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedStream")
            .field("duration", &self.handle.total_duration())
            .field("video", &self.video)
            .field("audio", &self.audio)
            .finish()
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Control surface of a running demuxer.
///
/// Both requests return immediately. Implementations must tolerate calls in
/// any order and after the producer has already stopped.
pub trait StreamHandle: Send + Sync {
    /// Requests a jump to `target`. The next unit on every track carries
    /// [`Marker::Rebase`](crate::domain::Marker::Rebase).
    fn seek(&self, target: Duration);

    /// Requests the producer to stop. The channels close once it has.
    fn shutdown(&self);

    /// Total duration of the container.
    fn total_duration(&self) -> Duration;

    /// Nominal duration of one video frame, when the container declares a
    /// frame rate.
    fn frame_duration(&self) -> Option<Duration>;
}

/// Port for opening a container and starting its demuxer.
pub trait ContainerReader {
    /// Opens and parses `path`, starting production on the requested tracks.
    ///
    /// # Errors
    ///
    /// Returns a [`StartupError`] if the file cannot be read or parsed, or if
    /// none of the requested tracks exist.
    fn open_and_parse(
        &self,
        path: &Path,
        request: &TrackRequest,
    ) -> Result<OpenedStream, StartupError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::channel::unit_channel;
    use std::sync::atomic::{AtomicBool, Ordering};

    // Both traits must be usable as trait objects
    fn _assert_object_safe(_: &dyn StreamHandle, _: &dyn ContainerReader) {}

    #[derive(Default)]
    struct RecordingHandle {
        shut_down: AtomicBool,
    }

    impl StreamHandle for RecordingHandle {
        fn seek(&self, _target: Duration) {}

        fn shutdown(&self) {
            self.shut_down.store(true, Ordering::SeqCst);
        }

        fn total_duration(&self) -> Duration {
            Duration::from_secs(3)
        }

        fn frame_duration(&self) -> Option<Duration> {
            None
        }
    }

    struct VideoOnlyReader;

    impl ContainerReader for VideoOnlyReader {
        fn open_and_parse(
            &self,
            path: &Path,
            request: &TrackRequest,
        ) -> Result<OpenedStream, StartupError> {
            if !path.ends_with("clip.webm") {
                return Err(StartupError::NotFound(path.to_path_buf()));
            }
            let (_tx, rx) = unit_channel(request.video_capacity);
            let video = VideoTrack {
                info: VideoTrackInfo {
                    width: 4,
                    height: 4,
                    frame_duration: None,
                },
                channel: rx,
            };
            Ok(OpenedStream::new(
                Arc::new(RecordingHandle::default()),
                request.video.then_some(video),
                None,
            ))
        }
    }

    #[test]
    fn open_reports_missing_file() {
        let err = VideoOnlyReader
            .open_and_parse(Path::new("missing.webm"), &TrackRequest::default())
            .unwrap_err();
        assert!(matches!(err, StartupError::NotFound(_)));
    }

    #[test]
    fn tracks_can_only_be_taken_once() {
        let mut opened = VideoOnlyReader
            .open_and_parse(Path::new("clip.webm"), &TrackRequest::default())
            .unwrap();

        assert!(opened.has_video());
        assert!(!opened.has_audio());
        assert!(opened.take_video().is_some());
        assert!(opened.take_video().is_none());
        assert!(opened.take_audio().is_none());
        assert_eq!(opened.handle.total_duration(), Duration::from_secs(3));
    }

    #[test]
    fn request_can_skip_video() {
        let request = TrackRequest {
            video: false,
            ..TrackRequest::default()
        };
        let opened = VideoOnlyReader
            .open_and_parse(Path::new("clip.webm"), &request)
            .unwrap();
        assert!(!opened.has_video());
    }
}
