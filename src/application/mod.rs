// SPDX-License-Identifier: MPL-2.0
//! Application layer.
//!
//! - [`port`]: Trait definitions the playback core depends on
//!
//! # Dependency Rule
//!
//! - The application layer depends on domain types only
//! - Infrastructure implements the ports (`FFmpeg` demuxer, synthetic source)
//! - The playback core consumes ports, never concrete adapters
//!
//! # Example
//!
//! ```ignore
//! use lockstep::application::port::{ContainerReader, TrackRequest};
//! use lockstep::infrastructure::synthetic::SyntheticSource;
//!
//! let mut opened = SyntheticSource::default()
//!     .open_and_parse(Path::new("pattern"), &TrackRequest::default())?;
//! let video = opened.take_video();
//! ```

pub mod port;
