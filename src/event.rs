//! Runtime events for monitoring playback.
//!
//! Events are notifications about stream progress and health. Playback
//! continues after most events are emitted - they're for logging and UI,
//! not error handling.

use std::fmt;
use std::sync::Arc;

/// Why a playback stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The file played to the end with looping disabled.
    Finished,
    /// Stop was requested (Ctrl+C, [`Session::stop()`], or session drop).
    ///
    /// [`Session::stop()`]: crate::Session::stop
    StopRequested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "finished"),
            Self::StopRequested => write!(f, "stop requested"),
        }
    }
}

/// Runtime events emitted during playback.
///
/// # Example
///
/// ```
/// use stream_playback::PlaybackEvent;
///
/// fn handle_event(event: PlaybackEvent) {
///     match event {
///         PlaybackEvent::StreamOpened { device, sample_rate, .. } => {
///             eprintln!("Opened {} at {} Hz", device, sample_rate);
///         }
///         PlaybackEvent::LoopRestarted { pass, discarded } => {
///             eprintln!("Loop pass {} (discarded {} queued items)", pass, discarded);
///         }
///         PlaybackEvent::StreamError { error } => {
///             eprintln!("Device error: {}", error);
///         }
///         PlaybackEvent::Stopped { reason } => {
///             eprintln!("Stopped: {}", reason);
///         }
///         _ => {}
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    /// The output device stream is open and the callback is running.
    StreamOpened {
        /// Name of the output device.
        device: String,
        /// Stream sample rate in Hz.
        sample_rate: u32,
        /// Samples per chunk requested as the device buffer size.
        chunk_samples: usize,
    },

    /// The producer started slicing a new pass over the audio.
    PassStarted {
        /// Zero-based pass number.
        pass: u64,
    },

    /// A pass played through to its end marker.
    PassCompleted {
        /// Zero-based pass number.
        pass: u64,
        /// Chunks the producer enqueued for this pass.
        chunks: u64,
    },

    /// Looping restarted playback from the beginning.
    ///
    /// Anything still queued from the previous pass was discarded.
    LoopRestarted {
        /// Number of the pass that is about to start.
        pass: u64,
        /// Queue items discarded on restart.
        discarded: usize,
    },

    /// The device did not consume the end of a pass within the expected time.
    ///
    /// The controller moves on as if the pass had completed.
    DrainTimedOut {
        /// Pass that did not drain.
        pass: u64,
        /// Items still queued when the wait gave up.
        queued: usize,
    },

    /// The audio backend reported an error on the output stream.
    StreamError {
        /// Description of the error.
        error: String,
    },

    /// The device stream was closed. Always the last event.
    Stopped {
        /// Why playback ended.
        reason: StopReason,
    },
}

/// Callback type for receiving runtime events.
///
/// Register an event callback via [`StreamPlayerBuilder::on_event()`].
/// Callbacks run on the controller thread, or on the audio backend's error
/// thread for [`PlaybackEvent::StreamError`], so keep them short.
///
/// [`StreamPlayerBuilder::on_event()`]: crate::StreamPlayerBuilder::on_event
pub type EventCallback = Arc<dyn Fn(PlaybackEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use stream_playback::{event_callback, PlaybackEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(PlaybackEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn emit(callback: Option<&EventCallback>, event: PlaybackEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_event_debug() {
        let event = PlaybackEvent::LoopRestarted {
            pass: 3,
            discarded: 12,
        };
        let debug = format!("{:?}", event);
        assert!(debug.contains("LoopRestarted"));
        assert!(debug.contains("12"));
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::Finished.to_string(), "finished");
        assert_eq!(StopReason::StopRequested.to_string(), "stop requested");
    }

    #[test]
    fn test_event_callback_helper() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = event_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback(PlaybackEvent::PassStarted { pass: 0 });
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_emit_without_callback_is_noop() {
        emit(None, PlaybackEvent::PassStarted { pass: 0 });
    }
}
