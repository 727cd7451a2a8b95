//! # stream-playback
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Real-time audio file playback through a bounded, non-blocking pipeline.
//!
//! `stream-playback` decodes an audio file into mono 16-bit samples and
//! streams them to an output device via CPAL. A producer thread slices the
//! audio into fixed-size chunks and the device callback pulls them off a
//! bounded queue, substituting silence rather than ever blocking.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stream_playback::{decode_file, StreamPlayer};
//!
//! let buffer = decode_file("song.mp3")?;
//!
//! let session = StreamPlayer::builder()
//!     .chunk_samples(1024)
//!     .looping(true)
//!     .on_event(|e| tracing::info!(?e, "playback event"))
//!     .start(buffer)?;
//!
//! // Stop from a signal handler, a UI, a timer...
//! let stop = session.stop_handle();
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     stop.stop();
//! });
//!
//! let stats = session.wait().await?;
//! println!("Played {} chunks", stats.chunks_played);
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **Producer Thread**: Slices the sample buffer into chunks, paced only by queue backpressure
//! - **Chunk Queue**: Bounded SPSC queue, the only point where the two sides meet
//! - **Device Thread**: Real-time callback that never blocks and plays silence on underrun
//!
//! A controller thread owns the device stream, sequences passes for
//! looping, and closes the stream on every exit path.

// unsafe_code lint is configured in Cargo.toml as "deny"
#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod chunk;
mod config;
mod error;
mod event;
pub mod format;
pub mod output;
mod pipeline;
mod sample_buffer;
mod session;
pub mod source;

pub use builder::{StreamPlayer, StreamPlayerBuilder};
pub use chunk::{Chunk, QueueItem, BYTES_PER_SAMPLE};
pub use config::{PlaybackConfig, DEFAULT_CHUNK_SAMPLES, DEFAULT_QUEUE_CAPACITY, MAX_PUSH_TIMEOUT};
pub use error::StreamPlaybackError;
pub use event::{event_callback, EventCallback, PlaybackEvent, StopReason};
pub use output::{
    default_output_device_name, list_output_devices, CpalOutput, MockOutput, MockRecording,
    OutputBackend, OutputConfig, OutputDeviceInfo, PlaybackStream, StreamHandle,
};
pub use pipeline::{CallbackStatus, ChunkQueue, PlaybackCallback, Producer, ProducerOutcome};
pub use sample_buffer::SampleBuffer;
pub use session::{Session, StopHandle, StreamPhase, StreamState, StreamStats};
pub use source::{decode_file, Decoder, SignalGenerator, SymphoniaDecoder};
