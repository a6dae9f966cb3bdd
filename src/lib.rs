// SPDX-License-Identifier: MPL-2.0
//! `lockstep` plays a decoded video track and its audio track together,
//! keeping picture and sound locked to one timebase.
//!
//! The playback core ([`player`]) is independent of any container library:
//! it consumes decoded units through the demuxer port in [`application`],
//! implemented in [`infrastructure`] by an `FFmpeg` adapter and a synthetic
//! test-pattern source. Audio goes out through `cpal`.

#![doc(html_root_url = "https://docs.rs/lockstep/0.3.0")]

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod player;

#[cfg(test)]
pub mod test_utils;
