//! Output backends: where the playback callback's audio goes.
//!
//! [`CpalOutput`] opens a real device through CPAL. [`MockOutput`] drives the
//! callback from a plain thread so the pipeline can be tested without
//! hardware.

mod device;
mod mock;

pub use device::CpalOutput;
pub use mock::{MockOutput, MockRecording};

use cpal::traits::{DeviceTrait, HostTrait};

use crate::event::EventCallback;
use crate::pipeline::PlaybackCallback;
use crate::StreamPlaybackError;

/// Parameters for opening an output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Sample rate of the audio in Hz. No resampling is done.
    pub sample_rate: u32,
    /// Channels carried by the signal. Always 1.
    pub channels: u16,
    /// Requested frames per device buffer.
    pub chunk_samples: usize,
}

impl OutputConfig {
    /// Mono output at `sample_rate` with `chunk_samples` frames per buffer.
    pub fn mono(sample_rate: u32, chunk_samples: usize) -> Self {
        Self {
            sample_rate,
            channels: 1,
            chunk_samples,
        }
    }
}

/// An audio output that can host a [`PlaybackCallback`].
///
/// Implementations start invoking the callback as soon as `open` returns
/// and keep doing so until the returned [`PlaybackStream`] is closed.
pub trait OutputBackend: Send {
    /// Backend name for logging.
    fn name(&self) -> String;

    /// Opens an output stream driven by `callback`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be found or the stream cannot
    /// be built or started.
    fn open(
        &self,
        config: &OutputConfig,
        callback: PlaybackCallback,
        on_event: Option<EventCallback>,
    ) -> Result<PlaybackStream, StreamPlaybackError>;
}

/// Backend-specific part of an open stream.
pub trait StreamHandle {
    /// Stops the stream and releases the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to stop cleanly.
    fn stop(&mut self) -> Result<(), StreamPlaybackError>;
}

/// An open output stream.
///
/// The device keeps invoking the playback callback while this exists.
/// Dropping it closes the stream, so every exit path releases the device.
pub struct PlaybackStream {
    handle: Option<Box<dyn StreamHandle>>,
    device_name: String,
}

impl PlaybackStream {
    /// Wraps a backend handle.
    pub fn new(handle: Box<dyn StreamHandle>, device_name: impl Into<String>) -> Self {
        Self {
            handle: Some(handle),
            device_name: device_name.into(),
        }
    }

    /// Name of the device this stream plays on.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Closes the stream now instead of on drop.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if stopping failed. The device is
    /// released either way.
    pub fn close(mut self) -> Result<(), StreamPlaybackError> {
        self.stop_handle()
    }

    fn stop_handle(&mut self) -> Result<(), StreamPlaybackError> {
        match self.handle.take() {
            Some(mut handle) => handle.stop(),
            None => Ok(()),
        }
    }
}

impl Drop for PlaybackStream {
    fn drop(&mut self) {
        if let Err(e) = self.stop_handle() {
            tracing::warn!("Failed to close output stream on '{}': {}", self.device_name, e);
        }
    }
}

impl std::fmt::Debug for PlaybackStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackStream")
            .field("device_name", &self.device_name)
            .field("open", &self.handle.is_some())
            .finish()
    }
}

/// Information about an output device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDeviceInfo {
    /// Position in the host's output device list; accepted by `--device`.
    pub index: usize,
    /// Device name.
    pub name: String,
    /// Channel count of the device's default output config.
    pub channels: u16,
    /// Sample rate of the device's default output config.
    pub default_sample_rate: u32,
    /// Whether this is the host's default output device.
    pub is_default: bool,
}

/// Lists all available output devices.
///
/// Devices whose default config can't be queried are listed with zero
/// channels and sample rate.
///
/// # Errors
///
/// Returns an error if the audio host cannot be accessed.
pub fn list_output_devices() -> Result<Vec<OutputDeviceInfo>, StreamPlaybackError> {
    let host = cpal::default_host();
    let default_name = default_output_device_name();
    let devices = host
        .output_devices()
        .map_err(|e| StreamPlaybackError::BackendError(e.to_string()))?;

    Ok(devices
        .enumerate()
        .map(|(index, device)| {
            let name = device.name().unwrap_or_else(|_| "unknown".to_string());
            let (channels, default_sample_rate) = device
                .default_output_config()
                .map(|c| (c.channels(), c.sample_rate().0))
                .unwrap_or((0, 0));
            let is_default = default_name.as_deref() == Some(name.as_str());
            OutputDeviceInfo {
                index,
                name,
                channels,
                default_sample_rate,
                is_default,
            }
        })
        .collect())
}

/// Gets the name of the default output device, if any.
pub fn default_output_device_name() -> Option<String> {
    cpal::default_host()
        .default_output_device()
        .and_then(|d| d.name().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandle(Arc<AtomicUsize>);

    impl StreamHandle for CountingHandle {
        fn stop(&mut self) -> Result<(), StreamPlaybackError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_output_config_mono() {
        let config = OutputConfig::mono(44100, 1024);
        assert_eq!(config.channels, 1);
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.chunk_samples, 1024);
    }

    #[test]
    fn test_playback_stream_closes_on_drop() {
        let stops = Arc::new(AtomicUsize::new(0));
        {
            let stream = PlaybackStream::new(Box::new(CountingHandle(Arc::clone(&stops))), "test");
            assert_eq!(stream.device_name(), "test");
        }
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_playback_stream_close_is_not_repeated_on_drop() {
        let stops = Arc::new(AtomicUsize::new(0));
        let stream = PlaybackStream::new(Box::new(CountingHandle(Arc::clone(&stops))), "test");
        stream.close().unwrap();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_list_devices_doesnt_panic() {
        // This may return empty list in CI, but shouldn't panic
        let _ = list_output_devices();
    }

    #[test]
    fn test_default_device_doesnt_panic() {
        // This may return None in CI, but shouldn't panic
        let _ = default_output_device_name();
    }
}
