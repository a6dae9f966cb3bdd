// SPDX-License-Identifier: MPL-2.0
//! Render loop and playback options.
//!
//! A [`Session`] ticks the [`PlaybackEngine`] at the configured refresh rate
//! (or as fast as possible when unsynchronized) and hands every snapshot to a
//! [`Presenter`] until the engine halts.

use super::engine::{EngineOptions, PlaybackEngine, Tick};
use super::presentation::Presenter;
use crate::application::port::TrackRequest;
use crate::config::Config;
use crate::domain::{AudioTrackInfo, Volume};
use crate::error::Result;
use std::time::{Duration, Instant};

/// Effective playback options after merging the config file and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOptions {
    pub blend: bool,
    pub ignore_timecodes: bool,
    pub loops: u32,
    pub sync_to_display: bool,
    pub refresh_hz: u32,
    pub fullscreen: bool,
    pub play_video: bool,
    pub play_audio: bool,
    pub volume: Volume,
    pub muted: bool,
    pub video_capacity: usize,
    pub audio_capacity: usize,
}

impl PlaybackOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            blend: config.playback.blend.unwrap_or(false),
            ignore_timecodes: config.playback.ignore_timecodes.unwrap_or(false),
            loops: config.playback.loops(),
            sync_to_display: config.playback.sync_to_display.unwrap_or(true),
            refresh_hz: config.playback.refresh_hz(),
            fullscreen: config.display.fullscreen.unwrap_or(false),
            play_video: true,
            play_audio: true,
            volume: config.audio.volume(),
            muted: config.audio.muted.unwrap_or(false),
            video_capacity: config.buffers.video_frames(),
            audio_capacity: config.buffers.audio_packets(),
        }
    }

    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            blend: self.blend,
            ignore_timecodes: self.ignore_timecodes,
        }
    }

    /// Tracks to ask the demuxer for, with audio in `audio_format`.
    #[must_use]
    pub fn track_request(&self, audio_format: Option<AudioTrackInfo>) -> TrackRequest {
        TrackRequest {
            video: self.play_video,
            audio: self.play_audio && audio_format.is_some(),
            audio_format,
            video_capacity: self.video_capacity,
            audio_capacity: self.audio_capacity,
        }
    }

    /// Time between ticks, or `None` to tick as fast as possible.
    #[must_use]
    pub fn tick_interval(&self) -> Option<Duration> {
        self.sync_to_display
            .then(|| Duration::from_secs(1) / self.refresh_hz.max(1))
    }
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Totals reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub ticks: u64,
    pub elapsed: Duration,
}

/// Drives an engine and a presenter until playback halts.
#[derive(Debug)]
pub struct Session<P> {
    engine: PlaybackEngine,
    presenter: P,
    tick_interval: Option<Duration>,
}

impl<P: Presenter> Session<P> {
    #[must_use]
    pub fn new(engine: PlaybackEngine, presenter: P, tick_interval: Option<Duration>) -> Self {
        Self {
            engine,
            presenter,
            tick_interval,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    #[must_use]
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Runs one tick at `now`. Returns false once the engine has halted.
    ///
    /// # Errors
    ///
    /// Returns an error if the presenter fails.
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        match self.engine.update(now) {
            Tick::Halted => Ok(false),
            Tick::Present(snapshot) => {
                self.presenter.present(&snapshot)?;
                Ok(true)
            }
        }
    }

    /// Ticks against the wall clock until the engine halts.
    ///
    /// # Errors
    ///
    /// Returns an error if the presenter fails. The demuxer is told to shut
    /// down before the error is returned.
    pub fn run(&mut self) -> Result<SessionSummary> {
        let started = Instant::now();
        let mut ticks = 0u64;

        loop {
            let now = Instant::now();
            match self.tick(now) {
                Ok(true) => ticks += 1,
                Ok(false) => break,
                Err(err) => {
                    self.engine.transport().begin_shutdown();
                    return Err(err);
                }
            }

            if let Some(interval) = self.tick_interval {
                let spent = now.elapsed();
                if spent < interval {
                    std::thread::sleep(interval - spent);
                }
            }
        }

        let summary = SessionSummary {
            ticks,
            elapsed: started.elapsed(),
        };
        log::info!(
            "Session ended after {} ticks in {:.3}s",
            summary.ticks,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }
}
