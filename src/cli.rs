// SPDX-License-Identifier: MPL-2.0
//! Command-line flags.
//!
//! Flags override the values loaded from `settings.toml`; anything not given
//! on the command line keeps the file (or default) value.

use crate::error::{Error, Result};
use crate::player::PlaybackOptions;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::time::Duration;

pub const USAGE: &str = "\
lockstep - synchronized audio/video playback

USAGE:
    lockstep -i <FILE> [OPTIONS]
    lockstep --test-pattern <SECONDS> [OPTIONS]

OPTIONS:
    -i <FILE>                 Input file
    -u                        Unsynchronized display (tick as fast as possible)
    -t                        Ignore timecodes (present every frame at once)
    -b                        Blend consecutive frames
    -f                        Fullscreen
    -a                        Audio only
    -v                        Video only
    -l <N>                    Loop N additional times
    --config-dir <DIR>        Read settings.toml from DIR
    --test-pattern <SECONDS>  Play a generated pattern instead of a file
    -h, --help                Print this help

COMMANDS (stdin):
    p  pause/resume     r  replay from here   f / b  step forward / back
    s  single step      seek <0..1>           q      quit
";

/// Parsed command-line flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flags {
    pub input: Option<PathBuf>,
    pub unsync: bool,
    pub ignore_timecodes: bool,
    pub blend: bool,
    pub fullscreen: bool,
    pub audio_only: bool,
    pub video_only: bool,
    pub loops: Option<u32>,
    pub config_dir: Option<PathBuf>,
    pub test_pattern: Option<Duration>,
    pub help: bool,
}

impl Flags {
    /// Parses the process arguments.
    ///
    /// # Errors
    ///
    /// See [`Flags::from_vec`].
    pub fn from_env() -> Result<Self> {
        Self::from_args(pico_args::Arguments::from_env())
    }

    /// Parses an explicit argument list (without the program name).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed values, unknown arguments,
    /// conflicting `-a`/`-v`, or when neither an input nor a test pattern is
    /// given.
    pub fn from_vec(args: Vec<OsString>) -> Result<Self> {
        Self::from_args(pico_args::Arguments::from_vec(args))
    }

    fn from_args(mut args: pico_args::Arguments) -> Result<Self> {
        if args.contains(["-h", "--help"]) {
            return Ok(Self {
                help: true,
                ..Self::default()
            });
        }

        let test_pattern = args
            .opt_value_from_fn("--test-pattern", parse_seconds)?
            .map(Duration::from_secs_f64);

        let flags = Self {
            input: args.opt_value_from_os_str("-i", parse_path)?,
            unsync: args.contains("-u"),
            ignore_timecodes: args.contains("-t"),
            blend: args.contains("-b"),
            fullscreen: args.contains("-f"),
            audio_only: args.contains("-a"),
            video_only: args.contains("-v"),
            loops: args.opt_value_from_str("-l")?,
            config_dir: args.opt_value_from_os_str("--config-dir", parse_path)?,
            test_pattern,
            help: false,
        };

        let remaining = args.finish();
        if !remaining.is_empty() {
            return Err(Error::Config(format!(
                "Unexpected arguments: {}",
                remaining
                    .iter()
                    .map(|arg| arg.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ")
            )));
        }
        if flags.audio_only && flags.video_only {
            return Err(Error::Config("-a and -v cannot be combined".to_string()));
        }
        if flags.input.is_none() && flags.test_pattern.is_none() {
            return Err(Error::Config(
                "No input given (use -i <FILE> or --test-pattern <SECONDS>)".to_string(),
            ));
        }

        Ok(flags)
    }

    /// Applies the flags on top of options loaded from the config file.
    pub fn apply(&self, options: &mut PlaybackOptions) {
        if self.unsync {
            options.sync_to_display = false;
        }
        if self.ignore_timecodes {
            options.ignore_timecodes = true;
        }
        if self.blend {
            options.blend = true;
        }
        if self.fullscreen {
            options.fullscreen = true;
        }
        if self.audio_only {
            options.play_video = false;
        }
        if self.video_only {
            options.play_audio = false;
        }
        if let Some(loops) = self.loops {
            options.loops = loops;
        }
    }
}

fn parse_path(value: &OsStr) -> std::result::Result<PathBuf, &'static str> {
    Ok(PathBuf::from(value))
}

fn parse_seconds(value: &str) -> std::result::Result<f64, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    if secs.is_finite() && secs > 0.0 {
        Ok(secs)
    } else {
        Err(format!("'{value}' must be a positive number of seconds"))
    }
}
