// SPDX-License-Identifier: MPL-2.0
//! User commands and the line-based command reader.
//!
//! | Input            | Command                          |
//! |------------------|----------------------------------|
//! | `p`              | Pause / resume                   |
//! | `r`              | Replay from the current frame    |
//! | `f`              | Step one frame forward           |
//! | `b`              | Step one frame back              |
//! | `s`              | Let one more frame through       |
//! | `seek <0..1>`    | Jump to a fraction of the stream |
//! | `q`              | Stop playback                    |

use super::transport::Transport;
use crate::domain::SeekFraction;
use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;
use std::thread::JoinHandle;

/// A user command addressed to the transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    PauseToggle,
    ReplayFromCurrent,
    StepForward,
    StepBackward,
    SingleStep,
    SeekTo(SeekFraction),
    Quit,
}

impl Command {
    /// Applies the command.
    pub fn apply(self, transport: &Transport) {
        log::debug!("Command: {self:?}");
        match self {
            Self::PauseToggle => transport.on_pause_toggle(),
            Self::ReplayFromCurrent => transport.on_replay_from_current(),
            Self::StepForward => transport.on_step_forward(),
            Self::StepBackward => transport.on_step_backward(),
            Self::SingleStep => transport.on_single_step(),
            Self::SeekTo(fraction) => transport.on_seek_to_fraction(fraction),
            Self::Quit => {
                transport.begin_shutdown();
            }
        }
    }
}

/// Error returned for unrecognized command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl std::fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown command '{}'", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = match (words.next(), words.next(), words.next()) {
            (Some("p"), None, _) => Self::PauseToggle,
            (Some("r"), None, _) => Self::ReplayFromCurrent,
            (Some("f"), None, _) => Self::StepForward,
            (Some("b"), None, _) => Self::StepBackward,
            (Some("s"), None, _) => Self::SingleStep,
            (Some("q"), None, _) => Self::Quit,
            (Some("seek"), Some(value), None) => value
                .parse::<f64>()
                .map(|fraction| Self::SeekTo(SeekFraction::new(fraction)))
                .map_err(|_| UnknownCommand(line.trim().to_string()))?,
            _ => return Err(UnknownCommand(line.trim().to_string())),
        };
        Ok(command)
    }
}

/// Reads commands from `input` line by line until it ends or a `q` is read.
pub fn read_commands<R: BufRead>(input: R, transport: &Transport) {
    for line in input.lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                command.apply(transport);
                if command == Command::Quit {
                    break;
                }
            }
            Err(err) => log::warn!("{err}"),
        }
    }
}

/// Spawns a thread reading commands from standard input.
///
/// # Errors
///
/// Returns an error if the thread cannot be spawned.
pub fn spawn_stdin_reader(transport: Arc<Transport>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || read_commands(std::io::stdin().lock(), &transport))
}
