//! Configuration types for playback streams.

use std::time::Duration;

use crate::StreamPlaybackError;

/// Default number of samples per chunk (and per device buffer).
pub const DEFAULT_CHUNK_SAMPLES: usize = 1024;

/// Default number of chunks the queue can hold.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Longest accepted push timeout. Stop is only noticed between pushes, so
/// this also bounds how long a stop can take.
pub const MAX_PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for stream behavior.
///
/// Use [`PlaybackConfig::default()`] for sensible defaults, or customize as needed.
///
/// # Example
///
/// ```
/// use stream_playback::PlaybackConfig;
/// use std::time::Duration;
///
/// let config = PlaybackConfig {
///     chunk_samples: 512,
///     looping: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Samples per chunk. Also requested as the device buffer size.
    ///
    /// Default: 1024
    pub chunk_samples: usize,

    /// Maximum number of chunks waiting between producer and device.
    ///
    /// This bound is the only flow control: the producer waits when it is
    /// reached. Default: 100
    pub queue_capacity: usize,

    /// How long a single push waits on a full queue before the producer
    /// re-checks its stop signal.
    ///
    /// Bounds shutdown latency. Default: 100ms
    pub push_timeout: Duration,

    /// Pause between the end of one pass and the start of the next when looping.
    ///
    /// Default: 500ms
    pub loop_restart_delay: Duration,

    /// Extra time allowed for the device to play out queued audio at the end
    /// of a pass before the controller gives up waiting.
    ///
    /// Default: 1s
    pub drain_grace: Duration,

    /// Restart from the beginning after each pass until stopped.
    ///
    /// Default: false
    pub looping: bool,
}

impl PlaybackConfig {
    /// Checks that the configuration can drive a stream.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a zero chunk size or queue capacity, and
    /// for a push timeout that is zero or above [`MAX_PUSH_TIMEOUT`].
    pub fn validate(&self) -> Result<(), StreamPlaybackError> {
        if self.chunk_samples == 0 {
            return Err(StreamPlaybackError::InvalidConfig(
                "chunk size must be at least 1 sample".to_string(),
            ));
        }
        if u32::try_from(self.chunk_samples).is_err() {
            return Err(StreamPlaybackError::InvalidConfig(format!(
                "chunk size {} is too large",
                self.chunk_samples
            )));
        }
        if self.queue_capacity == 0 {
            return Err(StreamPlaybackError::InvalidConfig(
                "queue capacity must be at least 1 chunk".to_string(),
            ));
        }
        if self.push_timeout.is_zero() {
            return Err(StreamPlaybackError::InvalidConfig(
                "push timeout must be non-zero".to_string(),
            ));
        }
        if self.push_timeout > MAX_PUSH_TIMEOUT {
            return Err(StreamPlaybackError::InvalidConfig(format!(
                "push timeout {:?} exceeds the {:?} maximum",
                self.push_timeout, MAX_PUSH_TIMEOUT
            )));
        }
        Ok(())
    }

    /// Playback duration of one chunk at the given sample rate.
    #[must_use]
    pub fn chunk_duration(&self, sample_rate: u32) -> Duration {
        if sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.chunk_samples as f64 / f64::from(sample_rate))
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            chunk_samples: DEFAULT_CHUNK_SAMPLES,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            push_timeout: Duration::from_millis(100),
            loop_restart_delay: Duration::from_millis(500),
            drain_grace: Duration::from_secs(1),
            looping: false,
        }
    }
}
