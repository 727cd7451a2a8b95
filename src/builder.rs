//! Builder pattern for `StreamPlayer`.

use std::sync::Arc;
use std::time::Duration;

use crate::output::{CpalOutput, OutputBackend};
use crate::pipeline::{ChunkQueue, Controller};
use crate::session::{Session, StreamState};
use crate::{
    event_callback, EventCallback, PlaybackConfig, PlaybackEvent, SampleBuffer,
    StreamPlaybackError,
};

/// Builder for configuring and starting playback.
///
/// Use [`StreamPlayer::builder()`] to create a new builder.
///
/// # Example
///
/// ```ignore
/// use stream_playback::{decode_file, StreamPlayer};
///
/// let buffer = decode_file("song.mp3")?;
///
/// let session = StreamPlayer::builder()
///     .device(2)
///     .chunk_samples(512)
///     .looping(true)
///     .on_event(|e| tracing::debug!(?e, "playback event"))
///     .start(buffer)?;
///
/// session.wait().await?;
/// ```
///
/// [`StreamPlayer::builder()`]: crate::StreamPlayer::builder
#[must_use]
pub struct StreamPlayerBuilder {
    /// Where audio is played. `None` means the default CPAL device.
    output: Option<Box<dyn OutputBackend>>,
    /// Event callback.
    event_callback: Option<EventCallback>,
    /// Playback configuration.
    config: PlaybackConfig,
}

impl Default for StreamPlayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamPlayerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            output: None,
            event_callback: None,
            config: PlaybackConfig::default(),
        }
    }

    /// Set custom playback configuration.
    pub fn with_config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    /// Samples per chunk and per device buffer.
    ///
    /// Default: 1024
    pub fn chunk_samples(mut self, samples: usize) -> Self {
        self.config.chunk_samples = samples;
        self
    }

    /// Maximum number of chunks queued ahead of the device.
    ///
    /// Default: 100
    pub fn queue_capacity(mut self, chunks: usize) -> Self {
        self.config.queue_capacity = chunks;
        self
    }

    /// How long one push waits on a full queue before re-checking for stop.
    pub fn push_timeout(mut self, timeout: Duration) -> Self {
        self.config.push_timeout = timeout;
        self
    }

    /// Pause between loop passes.
    pub fn loop_restart_delay(mut self, delay: Duration) -> Self {
        self.config.loop_restart_delay = delay;
        self
    }

    /// Restart from the beginning after each pass until stopped.
    pub fn looping(mut self, enabled: bool) -> Self {
        self.config.looping = enabled;
        self
    }

    /// Play on the output device at `index` in the host's device list.
    ///
    /// See [`list_output_devices()`](crate::list_output_devices).
    pub fn device(self, index: usize) -> Self {
        self.output(CpalOutput::with_device_index(index))
    }

    /// Play through a custom output backend, such as
    /// [`MockOutput`](crate::MockOutput).
    pub fn output<B: OutputBackend + 'static>(mut self, backend: B) -> Self {
        self.output = Some(Box::new(backend));
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// Events include stream open, pass boundaries, loop restarts and device errors.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(PlaybackEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Returns the configuration `start` will use.
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Opens the output and starts streaming `buffer`.
    ///
    /// Returns once the device stream is open; playback continues in the
    /// background until the [`Session`] finishes or is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The output device cannot be found or opened
    /// - The device cannot play mono audio at the buffer's sample rate
    pub fn start(self, buffer: SampleBuffer) -> Result<Session, StreamPlaybackError> {
        self.config.validate()?;

        let backend = self
            .output
            .unwrap_or_else(|| Box::new(CpalOutput::default_device()));

        tracing::debug!(
            "Starting playback on {}: {} samples at {}Hz, looping: {}",
            backend.name(),
            buffer.len(),
            buffer.sample_rate(),
            self.config.looping
        );

        let state = Arc::new(StreamState::new(self.config.looping));
        let queue = Arc::new(ChunkQueue::new(self.config.queue_capacity));

        let controller = Controller::new(
            buffer,
            queue,
            Arc::clone(&state),
            self.config,
            self.event_callback,
        );
        let (handle, device_name) = controller.spawn(backend)?;

        Ok(Session::new(state, handle, device_name))
    }
}

/// Main entry point for stream-playback.
///
/// Use [`StreamPlayer::builder()`] to start configuring playback.
pub struct StreamPlayer;

impl StreamPlayer {
    /// Creates a new builder for configuring playback.
    pub fn builder() -> StreamPlayerBuilder {
        StreamPlayerBuilder::new()
    }
}
