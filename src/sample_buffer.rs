//! Decoded mono audio held in memory for the length of a stream.

use std::sync::Arc;
use std::time::Duration;

use crate::StreamPlaybackError;

/// An immutable buffer of mono 16-bit samples at a fixed sample rate.
///
/// Samples live in an `Arc<[i16]>`, so cloning a `SampleBuffer` is cheap and
/// the producer thread can read it while the controller keeps its own handle.
///
/// # Example
///
/// ```
/// use stream_playback::SampleBuffer;
/// use std::time::Duration;
///
/// let buffer = SampleBuffer::new(vec![0i16; 22050], 44100).unwrap();
/// assert_eq!(buffer.duration(), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Arc<[i16]>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Creates a buffer from decoded samples.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSampleRate` if `sample_rate` is zero.
    pub fn new(samples: impl Into<Arc<[i16]>>, sample_rate: u32) -> Result<Self, StreamPlaybackError> {
        if sample_rate == 0 {
            return Err(StreamPlaybackError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            samples: samples.into(),
            sample_rate,
        })
    }

    /// The samples, in playback order.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples (one per frame, since the buffer is mono).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if the buffer holds no audio.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length of the buffer.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Number of fixed-size chunks one pass over this buffer produces.
    pub fn chunk_count(&self, chunk_samples: usize) -> usize {
        if chunk_samples == 0 {
            return 0;
        }
        self.samples.len().div_ceil(chunk_samples)
    }
}
