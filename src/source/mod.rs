//! Where playback audio comes from.
//!
//! Decoding turns audio files into mono [`SampleBuffer`](crate::SampleBuffer)s;
//! the generator synthesizes test signals without any files.

mod decoder;
mod generator;

pub use decoder::{check_input, decode_file, Decoder, SymphoniaDecoder, SUPPORTED_EXTENSIONS};
pub use generator::{standard_test_signals, SignalGenerator, TestSignal, TEST_SIGNAL_SAMPLE_RATE};
