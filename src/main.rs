//! stream-playback - play an audio file on an output device.
//!
//! Decodes the file up front, then streams it to the device in fixed-size
//! chunks until it ends, loops forever with `--loop`, or Ctrl+C is pressed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use stream_playback::{
    decode_file, list_output_devices, PlaybackEvent, StreamPlaybackError, StreamPlayer,
    DEFAULT_CHUNK_SAMPLES,
};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for stream-playback
#[derive(Parser, Debug)]
#[command(name = "stream-playback")]
#[command(about = "Stream an audio file to an output device")]
#[command(version)]
struct Args {
    /// Audio file to play (mp3, wav, ogg, flac, m4a, aac, wma, opus).
    /// Not needed, and not checked, with --list-devices
    #[arg(required_unless_present = "list_devices")]
    file: Option<PathBuf>,

    /// Output device index (see --list-devices)
    #[arg(short, long)]
    device: Option<usize>,

    /// List available output devices and exit, ignoring FILE
    #[arg(short, long)]
    list_devices: bool,

    /// Loop the file until interrupted
    #[arg(long = "loop")]
    looping: bool,

    /// Samples per chunk and per device buffer
    #[arg(short, long = "chunk-size", default_value_t = DEFAULT_CHUNK_SAMPLES)]
    chunk_size: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stream_playback=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_input_error() => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Unexpected error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), StreamPlaybackError> {
    if args.list_devices {
        return print_devices();
    }

    let Some(path) = args.file else {
        return Err(StreamPlaybackError::InvalidConfig(
            "no audio file given".to_string(),
        ));
    };

    // Bad input fails here, before any device is touched
    let buffer = decode_file(&path)?;

    let mut builder = StreamPlayer::builder()
        .chunk_samples(args.chunk_size)
        .looping(args.looping)
        .on_event(|event| match event {
            PlaybackEvent::LoopRestarted { .. } => println!("Looping..."),
            PlaybackEvent::StreamError { error } => eprintln!("[Warning] Stream error: {error}"),
            _ => {}
        });
    if let Some(index) = args.device {
        builder = builder.device(index);
    }

    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let sample_rate = buffer.sample_rate();
    let duration = buffer.duration();

    let session = builder.start(buffer)?;

    println!();
    println!("Streaming: {name}");
    println!("Sample rate: {sample_rate} Hz");
    println!("Duration: {:.2} seconds", duration.as_secs_f64());
    println!();
    println!("Press Ctrl+C to stop streaming...");

    let stop = session.stop_handle();
    let wait = session.wait();
    tokio::pin!(wait);

    let stats = tokio::select! {
        result = &mut wait => result?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::warn!("Could not listen for Ctrl+C: {}", e);
            } else {
                println!("\n\nStopping stream...");
                stop.stop();
            }
            wait.await?
        }
    };

    tracing::debug!(?stats, "Playback finished");
    Ok(())
}

fn print_devices() -> Result<(), StreamPlaybackError> {
    let devices = list_output_devices()?;

    println!("\nAvailable audio devices:");
    println!("{}", "-".repeat(50));
    for device in devices {
        let default_marker = if device.is_default { " (DEFAULT)" } else { "" };
        println!("  [{}] {}{}", device.index, device.name, default_marker);
        println!(
            "      Channels: {}, Sample Rate: {}",
            device.channels, device.default_sample_rate
        );
    }

    Ok(())
}
