//! Playback pipeline components.
//!
//! The pipeline connects a decoded sample buffer to the output device via a
//! bounded chunk queue:
//!
//! ```text
//! SampleBuffer → Producer Thread → Chunk Queue → Playback Callback → Device
//! ```
//!
//! - **Producer**: Slices the buffer into fixed-size chunks, paced by queue backpressure
//! - **Chunk Queue**: Bounded SPSC FIFO of chunks and end-of-pass markers
//! - **Playback Callback**: Runs on the device thread, never blocks, fills gaps with silence
//! - **Controller**: Opens the device, sequences passes, handles looping and stop
//!
//! The queue ensures the device callback never waits on the producer.

mod callback;
mod controller;
mod producer;
mod queue;

pub use callback::{CallbackStatus, PlaybackCallback};
pub(crate) use controller::Controller;
pub use producer::{Producer, ProducerOutcome};
pub use queue::ChunkQueue;
