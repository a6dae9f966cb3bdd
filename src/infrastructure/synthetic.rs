// SPDX-License-Identifier: MPL-2.0
//! Generated test-pattern source.
//!
//! [`SyntheticSource`] implements [`ContainerReader`] without touching the
//! filesystem: a worker thread produces a moving luma gradient and a sine
//! tone, interleaved by timecode, and follows the same seek / end-of-stream
//! protocol as the `FFmpeg` adapter.

use super::worker::{
    align_down, clamp_seek, poll_commands, wait_for_command, Poll, WorkerCommand, WorkerHandle,
};
use crate::application::port::{
    AudioTrack, ContainerReader, OpenedStream, TrackRequest, VideoTrack,
};
use crate::domain::{
    AudioTrackInfo, DecodedPicture, Marker, PicturePlanes, SamplePacket, StreamUnit,
    VideoTrackInfo,
};
use crate::error::StartupError;
use crate::player::channel::{unit_channel, UnitSender};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const DEFAULT_DURATION: Duration = Duration::from_secs(10);
const DEFAULT_FRAME_RATE: u32 = 25;
const DEFAULT_WIDTH: u32 = 320;
const DEFAULT_HEIGHT: u32 = 180;
const PACKET_DURATION: Duration = Duration::from_millis(20);
const TONE_HZ: f64 = 440.0;
const TONE_AMPLITUDE: f64 = 0.2;
const FALLBACK_AUDIO: AudioTrackInfo = AudioTrackInfo {
    sample_rate: 48_000,
    channels: 2,
};

/// Test-pattern stream generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticSource {
    duration: Duration,
    frame_duration: Duration,
    width: u32,
    height: u32,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION)
    }
}

impl SyntheticSource {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            frame_duration: Duration::from_secs(1) / DEFAULT_FRAME_RATE,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }

    /// Sets the frame rate. Zero is raised to one.
    #[must_use]
    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_duration = Duration::from_secs(1) / fps.max(1);
        self
    }

    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(2);
        self.height = height.max(2);
        self
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    fn video_info(&self) -> VideoTrackInfo {
        VideoTrackInfo {
            width: self.width,
            height: self.height,
            frame_duration: Some(self.frame_duration),
        }
    }

    fn picture(&self, timecode: Duration, marker: Marker) -> DecodedPicture {
        let index = timecode.as_nanos() / self.frame_duration.as_nanos().max(1);
        #[allow(clippy::cast_possible_truncation)]
        let shift = (index as u32).wrapping_mul(4);

        let (width, height) = (self.width, self.height);
        let mut y = Vec::with_capacity((width * height) as usize);
        for row in 0..height {
            for col in 0..width {
                y.push((col.wrapping_add(row).wrapping_add(shift) & 0xFF) as u8);
            }
        }

        let mut planes = PicturePlanes {
            width,
            height,
            y,
            y_stride: width as usize,
            ..PicturePlanes::default()
        };
        let (cw, ch) = planes.chroma_size();
        let chroma_len = (cw * ch) as usize;
        planes.cb = vec![(shift & 0xFF) as u8; chroma_len];
        planes.cr = vec![128; chroma_len];
        planes.c_stride = cw as usize;

        DecodedPicture::new(timecode, marker, planes)
    }

    fn packet(format: AudioTrackInfo, timecode: Duration, marker: Marker) -> SamplePacket {
        let rate = u128::from(format.sample_rate);
        let first = timecode.as_nanos() * rate / 1_000_000_000;
        let frames = PACKET_DURATION.as_nanos() * rate / 1_000_000_000;
        let channels = usize::from(format.channels.max(1));

        let mut data = Vec::with_capacity(frames as usize * channels);
        for n in first..first + frames {
            #[allow(clippy::cast_precision_loss)]
            let phase = std::f64::consts::TAU * TONE_HZ * n as f64 / rate as f64;
            #[allow(clippy::cast_possible_truncation)]
            let value = (phase.sin() * TONE_AMPLITUDE) as f32;
            data.extend(std::iter::repeat_n(value, channels));
        }

        SamplePacket::new(timecode, marker, data)
    }
}

impl ContainerReader for SyntheticSource {
    fn open_and_parse(
        &self,
        path: &Path,
        request: &TrackRequest,
    ) -> Result<OpenedStream, StartupError> {
        if !request.video && !request.audio {
            return Err(StartupError::NoPlayableTrack);
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let handle = Arc::new(WorkerHandle::new(
            command_tx,
            self.duration,
            Some(self.frame_duration),
        ));

        let mut video = None;
        let mut video_tx = None;
        if request.video {
            let (tx, rx) = unit_channel(request.video_capacity);
            video_tx = Some(tx);
            video = Some(VideoTrack {
                info: self.video_info(),
                channel: rx,
            });
        }

        let mut audio = None;
        let mut audio_tx = None;
        let audio_format = request.audio_format.unwrap_or(FALLBACK_AUDIO);
        if request.audio {
            let (tx, rx) = unit_channel(request.audio_capacity);
            audio_tx = Some(tx);
            audio = Some(AudioTrack {
                info: audio_format,
                channel: rx,
            });
        }

        let worker = Worker {
            source: *self,
            audio_format,
            video: video_tx.map(Lane::new),
            audio: audio_tx.map(Lane::new),
        };
        std::thread::Builder::new()
            .name("synthetic-demuxer".to_string())
            .spawn(move || worker.run(command_rx))
            .map_err(|e| StartupError::Other(format!("Failed to spawn demuxer: {e}")))?;

        log::info!(
            "Opened test pattern '{}' ({:.1}s, {}x{})",
            path.display(),
            self.duration.as_secs_f64(),
            self.width,
            self.height
        );
        Ok(OpenedStream::new(handle, video, audio))
    }
}

/// Per-track production cursor.
struct Lane<T> {
    tx: UnitSender<T>,
    next: Duration,
    rebase: bool,
    ended: bool,
}

impl<T: StreamUnit> Lane<T> {
    fn new(tx: UnitSender<T>) -> Self {
        Self {
            tx,
            next: Duration::ZERO,
            rebase: true,
            ended: false,
        }
    }

    fn restart(&mut self, at: Duration) {
        self.next = at;
        self.rebase = true;
        self.ended = false;
    }

    fn take_marker(&mut self) -> Marker {
        if std::mem::take(&mut self.rebase) {
            Marker::Rebase
        } else {
            Marker::Normal
        }
    }

    /// Pending timecode, or `None` once the sentinel went out.
    fn pending(&self) -> Option<Duration> {
        (!self.ended).then_some(self.next)
    }
}

struct Worker {
    source: SyntheticSource,
    audio_format: AudioTrackInfo,
    video: Option<Lane<DecodedPicture>>,
    audio: Option<Lane<SamplePacket>>,
}

impl Worker {
    fn run(mut self, mut commands: mpsc::UnboundedReceiver<WorkerCommand>) {
        loop {
            let video_next = self.video.as_ref().and_then(Lane::pending);
            let audio_next = self.audio.as_ref().and_then(Lane::pending);

            let poll = if video_next.is_none() && audio_next.is_none() {
                if self.video.is_none() && self.audio.is_none() {
                    break;
                }
                wait_for_command(&mut commands)
            } else {
                poll_commands(&mut commands)
            };

            match poll {
                Poll::Stop => break,
                Poll::Seek(target) => {
                    self.seek(target);
                    continue;
                }
                Poll::Idle => {}
            }

            match (video_next, audio_next) {
                (Some(v), Some(a)) if a < v => self.step_audio(),
                (Some(_), _) => self.step_video(),
                (None, Some(_)) => self.step_audio(),
                (None, None) => {}
            }
        }
        log::debug!("Synthetic demuxer stopped");
    }

    fn seek(&mut self, target: Duration) {
        let target = clamp_seek(target, self.source.duration, self.source.frame_duration);
        log::debug!("Synthetic seek to {:.3}s", target.as_secs_f64());
        if let Some(lane) = self.video.as_mut() {
            lane.restart(align_down(target, self.source.frame_duration));
        }
        if let Some(lane) = self.audio.as_mut() {
            lane.restart(align_down(target, PACKET_DURATION));
        }
    }

    fn step_video(&mut self) {
        let Some(lane) = self.video.as_mut() else {
            return;
        };
        let unit = if lane.next >= self.source.duration {
            lane.ended = true;
            DecodedPicture::end_of_stream(self.source.duration)
        } else {
            let marker = lane.take_marker();
            let picture = self.source.picture(lane.next, marker);
            lane.next += self.source.frame_duration;
            picture
        };
        if lane.tx.send(unit).is_err() {
            self.video = None;
        }
    }

    fn step_audio(&mut self) {
        let Some(lane) = self.audio.as_mut() else {
            return;
        };
        let unit = if lane.next >= self.source.duration {
            lane.ended = true;
            SamplePacket::end_of_stream(self.source.duration)
        } else {
            let marker = lane.take_marker();
            let packet = SyntheticSource::packet(self.audio_format, lane.next, marker);
            lane.next += PACKET_DURATION;
            packet
        };
        if lane.tx.send(unit).is_err() {
            self.audio = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::port::StreamHandle;

    fn short_source() -> SyntheticSource {
        SyntheticSource::new(Duration::from_millis(200)).with_size(16, 8)
    }

    fn request(video: bool, audio: bool) -> TrackRequest {
        TrackRequest {
            video,
            audio,
            audio_format: None,
            video_capacity: 64,
            audio_capacity: 64,
        }
    }

    #[test]
    fn empty_request_has_no_playable_track() {
        let result = short_source().open_and_parse(Path::new("pattern"), &request(false, false));
        assert_eq!(result.err(), Some(StartupError::NoPlayableTrack));
    }

    #[test]
    fn video_track_plays_through_to_sentinel() {
        let mut opened = short_source()
            .open_and_parse(Path::new("pattern"), &request(true, false))
            .unwrap();
        assert!(!opened.has_audio());
        let mut video = opened.take_video().unwrap();
        assert_eq!(video.info.width, 16);
        assert_eq!(video.info.frame_duration, Some(Duration::from_millis(40)));

        let mut timecodes = Vec::new();
        loop {
            let unit = video.channel.recv().unwrap();
            if unit.marker.is_end_of_stream() {
                assert_eq!(unit.timecode, Duration::from_millis(200));
                break;
            }
            if timecodes.is_empty() {
                assert_eq!(unit.marker, Marker::Rebase);
            } else {
                assert_eq!(unit.marker, Marker::Normal);
            }
            assert_eq!(unit.planes.y.len(), 16 * 8);
            assert_eq!(unit.planes.cb.len(), 8 * 4);
            timecodes.push(unit.timecode.as_millis());
        }
        assert_eq!(timecodes, vec![0, 40, 80, 120, 160]);
    }

    #[test]
    fn seek_after_end_restarts_with_rebase() {
        let mut opened = short_source()
            .open_and_parse(Path::new("pattern"), &request(true, false))
            .unwrap();
        let mut video = opened.take_video().unwrap();

        while !video.channel.recv().unwrap().marker.is_end_of_stream() {}

        opened.handle.seek(Duration::from_millis(90));
        let first = video.channel.recv().unwrap();
        assert_eq!(first.marker, Marker::Rebase);
        assert_eq!(first.timecode, Duration::from_millis(80));
        let second = video.channel.recv().unwrap();
        assert_eq!(second.marker, Marker::Normal);
        assert_eq!(second.timecode, Duration::from_millis(120));
    }

    #[test]
    fn seek_past_end_still_delivers_a_frame() {
        let mut opened = short_source()
            .open_and_parse(Path::new("pattern"), &request(true, false))
            .unwrap();
        let mut video = opened.take_video().unwrap();
        while !video.channel.recv().unwrap().marker.is_end_of_stream() {}

        opened.handle.seek(Duration::from_secs(5));
        let last = video.channel.recv().unwrap();
        assert_eq!(last.marker, Marker::Rebase);
        assert_eq!(last.timecode, Duration::from_millis(160));
        assert!(video.channel.recv().unwrap().marker.is_end_of_stream());
    }

    #[test]
    fn shutdown_closes_channels() {
        let mut opened = short_source()
            .open_and_parse(Path::new("pattern"), &request(true, true))
            .unwrap();
        let mut video = opened.take_video().unwrap();
        let mut audio = opened.take_audio().unwrap();

        opened.handle.shutdown();
        while video.channel.recv().is_some() {}
        while audio.channel.recv().is_some() {}
    }

    #[test]
    fn tracks_are_interleaved_by_timecode() {
        let mut opened = short_source()
            .open_and_parse(Path::new("pattern"), &request(true, true))
            .unwrap();
        let mut video = opened.take_video().unwrap();
        let mut audio = opened.take_audio().unwrap();
        assert_eq!(audio.info, FALLBACK_AUDIO);

        let mut packets = Vec::new();
        loop {
            let unit = audio.channel.recv().unwrap();
            if unit.marker.is_end_of_stream() {
                break;
            }
            packets.push(unit);
        }
        assert_eq!(packets.len(), 10);
        assert_eq!(packets[0].marker, Marker::Rebase);
        // 20 ms at 48 kHz stereo
        assert_eq!(packets[0].sample_count(), 960 * 2);
        assert!(packets
            .iter()
            .all(|p| p.data.iter().all(|s| s.abs() <= 0.2 + 1e-6)));

        let mut frames = 0;
        while !video.channel.recv().unwrap().marker.is_end_of_stream() {
            frames += 1;
        }
        assert_eq!(frames, 5);
    }

    #[test]
    fn audio_follows_requested_format() {
        let mut req = request(false, true);
        req.audio_format = Some(AudioTrackInfo {
            sample_rate: 8_000,
            channels: 1,
        });
        let mut opened = short_source()
            .open_and_parse(Path::new("pattern"), &req)
            .unwrap();
        assert!(!opened.has_video());
        let mut audio = opened.take_audio().unwrap();

        let first = audio.channel.recv().unwrap();
        assert_eq!(first.sample_count(), 160);
        assert_eq!(first.data[0], 0.0);
        assert_eq!(opened.handle.total_duration(), Duration::from_millis(200));
    }

    #[test]
    fn frame_rate_sets_frame_duration() {
        let source = SyntheticSource::default().with_frame_rate(50);
        assert_eq!(source.frame_duration(), Duration::from_millis(20));
        assert_eq!(source.duration(), Duration::from_secs(10));
    }
}
