// SPDX-License-Identifier: MPL-2.0
//! Synchronized playback core.
//!
//! Three contexts cooperate:
//!
//! - the demuxer thread pushes decoded units into bounded [`channel`]s;
//! - the render loop calls [`PlaybackEngine::update`] once per refresh;
//! - the audio device calls [`AudioFeed::feed`] once per hardware period.
//!
//! Everything they share lives in the [`Transport`].

pub mod audio_feed;
pub mod audio_output;
pub mod channel;
pub mod controls;
pub mod engine;
pub mod pacing;
pub mod presentation;
pub mod session;
pub mod transport;

pub use audio_feed::AudioFeed;
pub use audio_output::{AudioDevice, AudioOutput};
pub use channel::{unit_channel, UnitReceiver, UnitSender};
pub use controls::{Command, UnknownCommand};
pub use engine::{EngineOptions, PlaybackEngine, Tick};
pub use pacing::{blend_factor, should_advance, Clock, SystemClock, Timebase};
pub use presentation::{aspect_fit, LogPresenter, PresentationSnapshot, Presenter};
pub use session::{PlaybackOptions, Session, SessionSummary};
pub use transport::{EndOfStreamOutcome, SharedTransport, Transport, DEFAULT_FRAME_DURATION};
