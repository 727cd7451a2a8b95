//! generate-test-audio - write the standard test WAV files.
//!
//! Run with: cargo run --bin generate-test-audio -- [OUTPUT_DIR]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use stream_playback::format::write_wav;
use stream_playback::source::standard_test_signals;
use stream_playback::StreamPlaybackError;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for generate-test-audio
#[derive(Parser, Debug)]
#[command(name = "generate-test-audio")]
#[command(about = "Generate WAV files for testing stream-playback")]
#[command(version)]
struct Args {
    /// Directory to write the files into
    #[arg(default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stream_playback=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match generate(&args.output_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn generate(output_dir: &Path) -> Result<(), StreamPlaybackError> {
    std::fs::create_dir_all(output_dir).map_err(|e| StreamPlaybackError::io(output_dir, e))?;

    println!("Generating test audio files...");

    let signals = standard_test_signals()?;
    for signal in &signals {
        let path = output_dir.join(format!("{}.wav", signal.name));
        println!(
            "Creating {}.wav - {} ({:.1} seconds)",
            signal.name,
            signal.description,
            signal.buffer.duration().as_secs_f64()
        );
        write_wav(&path, &signal.buffer)?;
        tracing::debug!("Wrote {}", path.display());
    }

    println!("\nTest audio files created:");
    for signal in &signals {
        println!("  - {:<16}: {}", format!("{}.wav", signal.name), signal.description);
    }

    Ok(())
}
