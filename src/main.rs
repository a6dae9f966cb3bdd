// SPDX-License-Identifier: MPL-2.0
use env_logger::Env;
use lockstep::application::port::{ContainerReader, OpenedStream};
use lockstep::cli::{Flags, USAGE};
use lockstep::config::{self, paths};
use lockstep::error::{Error, Result};
use lockstep::infrastructure::{FfmpegReader, SyntheticSource};
use lockstep::player::{
    aspect_fit, controls, AudioDevice, AudioFeed, AudioOutput, LogPresenter, PlaybackEngine,
    PlaybackOptions, Session, Transport,
};
use std::path::Path;
use std::process::ExitCode;

/// Window size used when not fullscreen.
const WINDOW_SIZE: (u32, u32) = (1280, 720);

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let flags = match Flags::from_env() {
        Ok(flags) if flags.help => {
            print!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Ok(flags) => flags,
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(&flags) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ Error::Startup(_)) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            log::error!("Playback failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn open(
    flags: &Flags,
    options: &PlaybackOptions,
    device: Option<&AudioDevice>,
) -> Result<OpenedStream> {
    let request = options.track_request(device.map(AudioDevice::format));
    let opened = match (flags.test_pattern, &flags.input) {
        (Some(duration), _) => {
            SyntheticSource::new(duration).open_and_parse(Path::new("test-pattern"), &request)?
        }
        (None, Some(path)) => FfmpegReader::new().open_and_parse(path, &request)?,
        (None, None) => {
            return Err(Error::Config("No input given".to_string()));
        }
    };
    Ok(opened)
}

fn run(flags: &Flags) -> Result<()> {
    paths::init_cli_override(flags.config_dir.clone());
    let (config, warning) = config::load();
    if let Some(warning) = warning {
        log::warn!("{warning}");
    }

    let mut options = PlaybackOptions::from_config(&config);
    flags.apply(&mut options);

    let device = if options.play_audio {
        match AudioDevice::default_output() {
            Ok(device) => Some(device),
            Err(err) => {
                log::warn!("{err}; playing without sound");
                None
            }
        }
    } else {
        None
    };

    let mut opened = open(flags, &options, device.as_ref())?;
    let video = opened.take_video();
    let audio = opened.take_audio();

    let transport = Transport::new(opened.handle.clone(), options.loops);

    let output = match (device.as_ref(), audio) {
        (Some(device), Some(track)) => {
            if track.info != device.format() {
                log::warn!(
                    "Audio track delivered as {:?}, device expects {:?}",
                    track.info,
                    device.format()
                );
            }
            let feed = if video.is_some() {
                AudioFeed::new(transport.clone(), track.channel)
            } else {
                AudioFeed::audio_only(transport.clone(), track.channel)
            };
            Some(AudioOutput::start(
                device,
                feed,
                transport.clone(),
                options.volume,
                options.muted,
            )?)
        }
        _ => None,
    };

    if let Some(track) = video.as_ref() {
        let (sx, sy) = aspect_fit((track.info.width, track.info.height), WINDOW_SIZE);
        let window = if options.fullscreen {
            "fullscreen".to_string()
        } else {
            format!("{}x{}", WINDOW_SIZE.0, WINDOW_SIZE.1)
        };
        log::info!(
            "Video {}x{} in {window} window, picture scale {sx:.3} x {sy:.3}",
            track.info.width,
            track.info.height
        );
    } else if output.is_none() {
        transport.begin_shutdown();
        return Err(Error::Audio(
            "Nothing to play: no video and no audio output".to_string(),
        ));
    }

    let engine = PlaybackEngine::new(
        transport.clone(),
        video.map(|track| track.channel),
        options.engine_options(),
    );
    controls::spawn_stdin_reader(transport.clone())?;

    let mut session = Session::new(engine, LogPresenter::new(), options.tick_interval());
    let summary = session.run()?;
    log::info!(
        "Presented {} frames in {} ticks",
        session.presenter().frames(),
        summary.ticks
    );
    drop(output);
    Ok(())
}
