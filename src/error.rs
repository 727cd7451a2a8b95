//! Error types for stream-playback.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`StreamPlaybackError`]): Prevent the stream from starting
//! - **Recoverable events**: Runtime issues surfaced via [`EventCallback`](crate::EventCallback)

use std::path::PathBuf;

/// Fatal errors that prevent an audio file from being streamed.
///
/// These errors are returned from decoding and from
/// [`StreamPlayerBuilder::start()`] and are reported before any audio reaches
/// the device. Runtime conditions (underruns, device hiccups) are handled via
/// the event callback instead.
///
/// [`StreamPlayerBuilder::start()`]: crate::StreamPlayerBuilder::start
#[derive(Debug, thiserror::Error)]
pub enum StreamPlaybackError {
    /// The audio file does not exist.
    #[error("Audio file not found: {}", path.display())]
    FileNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// The file extension is not one of the recognized audio formats.
    #[error("Unsupported audio format: {extension}")]
    UnsupportedFormat {
        /// The extension that was rejected, including the leading dot.
        extension: String,
    },

    /// The file was recognized but could not be decoded.
    #[error("failed to decode {}: {reason}", path.display())]
    Decode {
        /// File being decoded.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A sample buffer was created with a zero sample rate.
    #[error("invalid sample rate: {0}Hz")]
    InvalidSampleRate(u32),

    /// The playback configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No output device exists at the requested index.
    #[error("output device {index} not found ({available} available)")]
    DeviceNotFound {
        /// Index that was requested.
        index: usize,
        /// Number of output devices on the host.
        available: usize,
    },

    /// No default output device is configured on this system.
    #[error("no default output device configured")]
    NoDefaultDevice,

    /// The device cannot play mono audio at the requested rate.
    #[error("device '{device}' cannot play {sample_rate}Hz audio")]
    UnsupportedStreamConfig {
        /// Name of the device.
        device: String,
        /// The requested sample rate.
        sample_rate: u32,
    },

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    BackendError(String),

    /// File I/O error.
    #[error("file error: {}: {source}", path.display())]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A worker thread could not be spawned or panicked.
    #[error("{thread} thread failed: {reason}")]
    ThreadPanicked {
        /// Name of the worker thread.
        thread: &'static str,
        /// Panic payload or spawn error.
        reason: String,
    },
}

impl StreamPlaybackError {
    /// Creates a decode error for the given path.
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a file error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for errors caused by the input file rather than the
    /// device or the runtime.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. } | Self::UnsupportedFormat { .. } | Self::Decode { .. }
        )
    }
}
