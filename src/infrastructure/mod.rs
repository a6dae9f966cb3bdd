// SPDX-License-Identifier: MPL-2.0
//! Infrastructure layer adapters.
//!
//! Concrete implementations of the demuxer port defined in
//! `application::port`.
//!
//! # Available Adapters
//!
//! - [`ffmpeg`]: Container demuxing and decoding via `FFmpeg`
//! - [`synthetic`]: Generated test pattern and tone, no file needed
//!
//! Both run their producer on a dedicated thread and share the command
//! plumbing in [`worker`].

pub mod ffmpeg;
pub mod synthetic;
pub mod worker;

pub use ffmpeg::FfmpegReader;
pub use synthetic::SyntheticSource;
