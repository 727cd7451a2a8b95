//! Looping playback example.
//!
//! Plays a generated melody on the default output device, looping until
//! 10 seconds have passed or Ctrl+C is pressed.
//!
//! Run with: cargo run --example loop_tone

use std::time::Duration;
use stream_playback::source::TEST_SIGNAL_SAMPLE_RATE;
use stream_playback::{PlaybackEvent, SignalGenerator, StreamPlayer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    let mut generator = SignalGenerator::new(TEST_SIGNAL_SAMPLE_RATE);
    generator.melody();
    let buffer = generator.into_buffer()?;

    println!("Looping a {:.1}s melody for 10 seconds...", buffer.duration().as_secs_f64());
    println!("Press Ctrl+C to stop early.");

    let session = StreamPlayer::builder()
        .looping(true)
        .on_event(|event| match event {
            PlaybackEvent::LoopRestarted { pass, .. } => println!("[Event] Loop pass {pass}"),
            PlaybackEvent::StreamError { error } => eprintln!("[Warning] {error}"),
            _ => {}
        })
        .start(buffer)?;

    println!("Playing on: {}", session.device_name());

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(10)) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    // wait() consumes the session and returns the final stats
    session.stop();
    let stats = session.wait().await?;

    println!("Stats: {:?}", stats);

    Ok(())
}
