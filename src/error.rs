// SPDX-License-Identifier: MPL-2.0
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Error {
    Io(String),
    Config(String),
    Audio(String),
    Startup(StartupError),
}

/// Reasons a stream could not be opened for playback.
///
/// These are fatal: they are reported before any transport state exists and
/// the process exits without entering playback.
#[derive(Debug, Clone, PartialEq)]
pub enum StartupError {
    /// The input path does not exist or cannot be read.
    NotFound(PathBuf),

    /// The container could not be parsed (malformed or unknown format).
    Unparseable(String),

    /// The container holds no track we were asked to play.
    NoPlayableTrack,

    /// A track uses a codec the decoder cannot handle.
    UnsupportedCodec(String),

    /// Anything else reported by the demuxer.
    Other(String),
}

impl StartupError {
    /// Sorts a raw demuxer/decoder message into a specific startup error.
    pub fn from_message(msg: &str) -> Self {
        let msg_lower = msg.to_lowercase();

        // Codec errors first, they often also contain "not found"
        if msg_lower.contains("codec") || msg_lower.contains("decoder") {
            if let Some(codec) = Self::extract_codec_name(&msg_lower) {
                return StartupError::UnsupportedCodec(codec);
            }
            return StartupError::Other(msg.to_string());
        }

        if msg_lower.contains("no video stream")
            || msg_lower.contains("no audio stream")
            || msg_lower.contains("no playable")
        {
            return StartupError::NoPlayableTrack;
        }

        if msg_lower.contains("invalid data found")
            || msg_lower.contains("corrupt")
            || msg_lower.contains("malformed")
            || msg_lower.contains("invalid")
        {
            return StartupError::Unparseable(msg.to_string());
        }

        StartupError::Other(msg.to_string())
    }

    fn extract_codec_name(msg: &str) -> Option<String> {
        let codecs = [
            "h264", "hevc", "h265", "vp8", "vp9", "av1", "vorbis", "opus", "aac",
        ];
        codecs
            .iter()
            .find(|codec| msg.contains(*codec))
            .map(|codec| codec.to_uppercase())
    }
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::NotFound(path) => {
                write!(f, "Unable to open file '{}'", path.display())
            }
            StartupError::Unparseable(msg) => write!(f, "Unable to parse file: {}", msg),
            StartupError::NoPlayableTrack => write!(f, "No playable track found"),
            StartupError::UnsupportedCodec(codec) => write!(f, "Unsupported codec: {}", codec),
            StartupError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O Error: {}", e),
            Error::Config(e) => write!(f, "Config Error: {}", e),
            Error::Audio(e) => write!(f, "Audio Error: {}", e),
            Error::Startup(e) => write!(f, "Startup Error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<StartupError> for Error {
    fn from(err: StartupError) -> Self {
        Error::Startup(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<pico_args::Error> for Error {
    fn from(err: pico_args::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
