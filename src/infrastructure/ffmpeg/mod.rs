// SPDX-License-Identifier: MPL-2.0
//! `FFmpeg` adapter implementing the [`ContainerReader`] port.
//!
//! The container is opened on a dedicated worker thread (`FFmpeg` contexts
//! are not `Send`); the caller blocks until the worker has probed the
//! streams and either reports the track layout or a [`StartupError`].
//!
//! From then on the worker demuxes packets in file order, decodes the
//! played tracks, converts pictures to YUV420P and resamples audio to packed
//! `f32` in the requested output format. It polls for seek and shutdown
//! requests between packets.

use super::worker::{
    clamp_seek, poll_commands, wait_for_command, Poll, WorkerCommand, WorkerHandle,
};
use crate::application::port::{
    AudioTrack, ContainerReader, OpenedStream, TrackRequest, VideoTrack,
};
use crate::domain::{
    AudioTrackInfo, DecodedPicture, Marker, PicturePlanes, SamplePacket, VideoTrackInfo,
};
use crate::error::StartupError;
use crate::player::channel::{unit_channel, UnitSender};
use crate::player::transport::DEFAULT_FRAME_DURATION;
use std::path::Path;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

static FFMPEG_INIT: Once = Once::new();

/// Initializes `FFmpeg` once per process and silences its console logging
/// below error level.
///
/// # Errors
///
/// Returns an error if `FFmpeg` fails to initialize.
pub fn init_ffmpeg() -> Result<(), StartupError> {
    let mut init_result = Ok(());

    FFMPEG_INIT.call_once(|| {
        if let Err(e) = ffmpeg_next::init() {
            init_result = Err(StartupError::Other(format!(
                "FFmpeg initialization failed: {e}"
            )));
            return;
        }

        // SAFETY: av_log_set_level is thread-safe and only affects logging
        unsafe {
            ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_ERROR);
        }
    });

    init_result
}

/// Track layout reported by the worker once the container is open.
#[derive(Debug, Clone, Copy)]
struct Probe {
    total: Duration,
    video: Option<VideoTrackInfo>,
    audio: Option<AudioTrackInfo>,
}

/// Opens containers through `FFmpeg`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegReader;

impl FfmpegReader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ContainerReader for FfmpegReader {
    fn open_and_parse(
        &self,
        path: &Path,
        request: &TrackRequest,
    ) -> Result<OpenedStream, StartupError> {
        if !path.is_file() {
            return Err(StartupError::NotFound(path.to_path_buf()));
        }
        init_ffmpeg()?;

        let (video_tx, video_rx) = unit_channel(request.video_capacity);
        let (audio_tx, audio_rx) = unit_channel(request.audio_capacity);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<Probe, StartupError>>();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let worker_path = path.to_path_buf();
        let worker_request = *request;
        std::thread::Builder::new()
            .name("ffmpeg-demuxer".to_string())
            .spawn(move || {
                let worker = match Worker::open(&worker_path, &worker_request, video_tx, audio_tx)
                {
                    Ok(worker) => worker,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                if ready_tx.send(Ok(worker.probe())).is_ok() {
                    worker.run(command_rx);
                }
            })
            .map_err(|e| StartupError::Other(format!("Failed to spawn demuxer: {e}")))?;

        let probe = ready_rx
            .blocking_recv()
            .map_err(|_| StartupError::Other("Demuxer exited while opening".to_string()))??;

        log::info!(
            "Opened '{}' ({:.3}s, video: {}, audio: {})",
            path.display(),
            probe.total.as_secs_f64(),
            probe.video.is_some(),
            probe.audio.is_some()
        );

        let handle = Arc::new(WorkerHandle::new(
            command_tx,
            probe.total,
            probe.video.and_then(|info| info.frame_duration),
        ));
        let video = probe.video.map(|info| VideoTrack {
            info,
            channel: video_rx,
        });
        let audio = probe.audio.map(|info| AudioTrack {
            info,
            channel: audio_rx,
        });
        Ok(OpenedStream::new(handle, video, audio))
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Rebase and precise-seek bookkeeping for one track.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cursor {
    rebase: bool,
    skip_before: Option<Duration>,
    last_end: Option<Duration>,
}

impl Cursor {
    fn new() -> Self {
        Self {
            rebase: true,
            skip_before: None,
            last_end: None,
        }
    }

    fn restart(&mut self, target: Duration) {
        self.rebase = true;
        self.skip_before = Some(target);
        self.last_end = None;
    }

    /// Returns false for units that end at or before the pending seek target.
    fn admits(&mut self, timecode: Duration, length: Duration) -> bool {
        if let Some(target) = self.skip_before {
            if timecode + length <= target {
                return false;
            }
            self.skip_before = None;
        }
        true
    }

    /// Marker for an admitted unit ending at `end`.
    fn marker(&mut self, end: Duration) -> Marker {
        self.last_end = Some(end);
        if std::mem::take(&mut self.rebase) {
            Marker::Rebase
        } else {
            Marker::Normal
        }
    }

    /// Timecode for the end-of-stream sentinel.
    fn track_end(&self, total: Duration) -> Duration {
        self.last_end.unwrap_or(total)
    }
}

fn to_timecode(pts: Option<i64>, time_base: f64) -> Duration {
    #[allow(clippy::cast_precision_loss)]
    let secs = pts.map_or(0.0, |pts| pts as f64 * time_base);
    Duration::from_secs_f64(secs.max(0.0))
}

fn rational_secs(value: ffmpeg_next::Rational) -> Option<f64> {
    (value.numerator() > 0 && value.denominator() > 0)
        .then(|| f64::from(value.numerator()) / f64::from(value.denominator()))
}

/// Copies `rows` rows of plane `index`, keeping the source stride.
fn copy_plane(frame: &ffmpeg_next::frame::Video, index: usize, rows: u32) -> Vec<u8> {
    let data = frame.data(index);
    let len = (frame.stride(index) * rows as usize).min(data.len());
    data[..len].to_vec()
}

/// Extracts packed f32 samples from a resampled audio frame.
fn extract_samples(frame: &ffmpeg_next::frame::Audio, channels: u16) -> Vec<f32> {
    let data = frame.data(0);
    let sample_count = frame.samples() * usize::from(channels);

    data.chunks_exact(4)
        .take(sample_count)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect()
}

struct VideoLane {
    stream_index: usize,
    time_base: f64,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    info: VideoTrackInfo,
    tx: UnitSender<DecodedPicture>,
    cursor: Cursor,
}

impl VideoLane {
    fn open(
        input: &ffmpeg_next::format::context::Input,
        tx: UnitSender<DecodedPicture>,
    ) -> Result<Option<Self>, StartupError> {
        let Some(stream) = input.streams().best(ffmpeg_next::media::Type::Video) else {
            return Ok(None);
        };

        let context = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| {
                StartupError::from_message(&format!("Failed to create codec context: {e}"))
            })?;
        let decoder = context.decoder().video().map_err(|e| {
            StartupError::from_message(&format!("Failed to create video decoder: {e}"))
        })?;

        let (width, height) = (decoder.width(), decoder.height());
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| StartupError::Other(format!("Failed to create scaler: {e}")))?;

        let frame_duration = rational_secs(stream.avg_frame_rate())
            .or_else(|| rational_secs(stream.rate()))
            .map(|fps| Duration::from_secs_f64(1.0 / fps));

        Ok(Some(Self {
            stream_index: stream.index(),
            time_base: rational_secs(stream.time_base()).unwrap_or(0.0),
            decoder,
            scaler,
            info: VideoTrackInfo {
                width,
                height,
                frame_duration,
            },
            tx,
            cursor: Cursor::new(),
        }))
    }

    fn convert(&mut self, decoded: &ffmpeg_next::frame::Video) -> Option<PicturePlanes> {
        let mut yuv = ffmpeg_next::frame::Video::empty();
        if let Err(e) = self.scaler.run(decoded, &mut yuv) {
            log::warn!("Picture conversion failed: {e}");
            return None;
        }

        let mut planes = PicturePlanes {
            width: yuv.width(),
            height: yuv.height(),
            ..PicturePlanes::default()
        };
        let (_, chroma_rows) = planes.chroma_size();
        planes.y = copy_plane(&yuv, 0, planes.height);
        planes.y_stride = yuv.stride(0);
        planes.cb = copy_plane(&yuv, 1, chroma_rows);
        planes.cr = copy_plane(&yuv, 2, chroma_rows);
        planes.c_stride = yuv.stride(1);
        Some(planes)
    }

    /// Feeds one packet (or end of input) and forwards every decoded frame.
    /// Returns false once the consumer is gone.
    fn decode(&mut self, packet: Option<&ffmpeg_next::Packet>) -> bool {
        let sent = match packet {
            Some(packet) => self.decoder.send_packet(packet),
            None => self.decoder.send_eof(),
        };
        if let Err(e) = sent {
            log::warn!("Video packet rejected: {e}");
            return true;
        }

        let length = self.info.frame_duration.unwrap_or(DEFAULT_FRAME_DURATION);
        let mut decoded = ffmpeg_next::frame::Video::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let timecode = to_timecode(decoded.timestamp(), self.time_base);
            if !self.cursor.admits(timecode, length) {
                continue;
            }
            let Some(planes) = self.convert(&decoded) else {
                continue;
            };
            let marker = self.cursor.marker(timecode + length);
            if self
                .tx
                .send(DecodedPicture::new(timecode, marker, planes))
                .is_err()
            {
                return false;
            }
        }
        true
    }
}

struct AudioLane {
    stream_index: usize,
    time_base: f64,
    decoder: ffmpeg_next::decoder::Audio,
    resampler: ffmpeg_next::software::resampling::Context,
    info: AudioTrackInfo,
    tx: UnitSender<SamplePacket>,
    cursor: Cursor,
}

impl AudioLane {
    fn open(
        input: &ffmpeg_next::format::context::Input,
        format: Option<AudioTrackInfo>,
        tx: UnitSender<SamplePacket>,
    ) -> Result<Option<Self>, StartupError> {
        let Some(stream) = input.streams().best(ffmpeg_next::media::Type::Audio) else {
            return Ok(None);
        };

        let context = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| {
                StartupError::from_message(&format!("Failed to create codec context: {e}"))
            })?;
        let decoder = context.decoder().audio().map_err(|e| {
            StartupError::from_message(&format!("Failed to create audio decoder: {e}"))
        })?;

        #[allow(clippy::cast_possible_truncation)]
        let native_channels = decoder.channels().clamp(1, 2) as u16;
        let info = format.unwrap_or(AudioTrackInfo {
            sample_rate: decoder.rate(),
            channels: native_channels,
        });
        let layout = match info.channels {
            1 => ffmpeg_next::ChannelLayout::MONO,
            2 => ffmpeg_next::ChannelLayout::STEREO,
            n => ffmpeg_next::ChannelLayout::default(i32::from(n)),
        };

        let resampler = ffmpeg_next::software::resampling::Context::get(
            decoder.format(),
            decoder.channel_layout(),
            decoder.rate(),
            ffmpeg_next::format::Sample::F32(ffmpeg_next::format::sample::Type::Packed),
            layout,
            info.sample_rate,
        )
        .map_err(|e| StartupError::Other(format!("Failed to create resampler: {e}")))?;

        Ok(Some(Self {
            stream_index: stream.index(),
            time_base: rational_secs(stream.time_base()).unwrap_or(0.0),
            decoder,
            resampler,
            info,
            tx,
            cursor: Cursor::new(),
        }))
    }

    /// Feeds one packet (or end of input) and forwards every decoded packet.
    /// Returns false once the consumer is gone.
    fn decode(&mut self, packet: Option<&ffmpeg_next::Packet>) -> bool {
        let sent = match packet {
            Some(packet) => self.decoder.send_packet(packet),
            None => self.decoder.send_eof(),
        };
        if let Err(e) = sent {
            log::warn!("Audio packet rejected: {e}");
            return true;
        }

        let mut decoded = ffmpeg_next::frame::Audio::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let timecode = to_timecode(decoded.timestamp(), self.time_base);

            let mut resampled = ffmpeg_next::frame::Audio::empty();
            if let Err(e) = self.resampler.run(&decoded, &mut resampled) {
                log::warn!("Resampling failed: {e}");
                continue;
            }

            #[allow(clippy::cast_precision_loss)]
            let length = Duration::from_secs_f64(
                resampled.samples() as f64 / f64::from(self.info.sample_rate.max(1)),
            );
            if !self.cursor.admits(timecode, length) {
                continue;
            }

            let data = extract_samples(&resampled, self.info.channels);
            let marker = self.cursor.marker(timecode + length);
            if self
                .tx
                .send(SamplePacket::new(timecode, marker, data))
                .is_err()
            {
                return false;
            }
        }
        true
    }
}

struct Worker {
    input: ffmpeg_next::format::context::Input,
    total: Duration,
    video: Option<VideoLane>,
    audio: Option<AudioLane>,
}

impl Worker {
    fn open(
        path: &Path,
        request: &TrackRequest,
        video_tx: UnitSender<DecodedPicture>,
        audio_tx: UnitSender<SamplePacket>,
    ) -> Result<Self, StartupError> {
        let input = ffmpeg_next::format::input(path)
            .map_err(|e| StartupError::from_message(&format!("Failed to open input: {e}")))?;

        #[allow(clippy::cast_precision_loss)]
        let total = if input.duration() > 0 {
            Duration::from_secs_f64(
                input.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE),
            )
        } else {
            Duration::ZERO
        };

        let video = if request.video {
            VideoLane::open(&input, video_tx)?
        } else {
            None
        };
        let audio = if request.audio {
            AudioLane::open(&input, request.audio_format, audio_tx)?
        } else {
            None
        };

        if video.is_none() && audio.is_none() {
            return Err(StartupError::NoPlayableTrack);
        }

        Ok(Self {
            input,
            total,
            video,
            audio,
        })
    }

    fn probe(&self) -> Probe {
        Probe {
            total: self.total,
            video: self.video.as_ref().map(|lane| lane.info),
            audio: self.audio.as_ref().map(|lane| lane.info),
        }
    }

    fn run(mut self, mut commands: mpsc::UnboundedReceiver<WorkerCommand>) {
        let mut at_end = false;

        while self.video.is_some() || self.audio.is_some() {
            let poll = if at_end {
                wait_for_command(&mut commands)
            } else {
                poll_commands(&mut commands)
            };
            match poll {
                Poll::Stop => break,
                Poll::Seek(target) => {
                    self.seek(target);
                    at_end = false;
                    continue;
                }
                Poll::Idle => {}
            }

            let next = self
                .input
                .packets()
                .next()
                .map(|(stream, packet)| (stream.index(), packet));
            match next {
                Some((index, packet)) => self.decode(index, &packet),
                None => {
                    self.finish();
                    at_end = true;
                }
            }
        }
        log::debug!("FFmpeg demuxer stopped");
    }

    fn decode(&mut self, index: usize, packet: &ffmpeg_next::Packet) {
        if let Some(lane) = self.video.as_mut() {
            if lane.stream_index == index && !lane.decode(Some(packet)) {
                self.video = None;
            }
        }
        if let Some(lane) = self.audio.as_mut() {
            if lane.stream_index == index && !lane.decode(Some(packet)) {
                self.audio = None;
            }
        }
    }

    /// Drains the decoders and sends the end-of-stream sentinels.
    fn finish(&mut self) {
        let total = self.total;
        if let Some(lane) = self.video.as_mut() {
            let alive = lane.decode(None)
                && lane
                    .tx
                    .send(DecodedPicture::end_of_stream(lane.cursor.track_end(total)))
                    .is_ok();
            if !alive {
                self.video = None;
            }
        }
        if let Some(lane) = self.audio.as_mut() {
            let alive = lane.decode(None)
                && lane
                    .tx
                    .send(SamplePacket::end_of_stream(lane.cursor.track_end(total)))
                    .is_ok();
            if !alive {
                self.audio = None;
            }
        }
        log::debug!("FFmpeg demuxer reached end of input");
    }

    fn seek(&mut self, target: Duration) {
        let frame = self
            .video
            .as_ref()
            .and_then(|lane| lane.info.frame_duration)
            .unwrap_or(DEFAULT_FRAME_DURATION);
        let target = clamp_seek(target, self.total, frame);
        let timestamp = i64::try_from(target.as_micros()).unwrap_or(i64::MAX);

        if let Err(e) = self.input.seek(timestamp, ..timestamp) {
            log::warn!("Seek to {:.3}s failed: {e}", target.as_secs_f64());
        }
        if let Some(lane) = self.video.as_mut() {
            lane.decoder.flush();
            lane.cursor.restart(target);
        }
        if let Some(lane) = self.audio.as_mut() {
            lane.decoder.flush();
            lane.cursor.restart(target);
        }
    }
}
