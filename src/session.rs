//! Playback session state and the handle returned to callers.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::StreamPlaybackError;

/// Lifecycle phase of a playback stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Created, device not opened yet.
    Idle,
    /// The producer is filling the queue for the current pass.
    Producing,
    /// The producer finished a pass; queued audio is playing out.
    Draining,
    /// The device stream is closed. Terminal.
    Stopped,
}

impl StreamPhase {
    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Producing => 1,
            Self::Draining => 2,
            Self::Stopped => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Producing,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// Statistics about a playback session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Chunks pushed onto the queue by the producer.
    pub chunks_produced: u64,
    /// Chunks taken off the queue by the playback callback.
    pub chunks_played: u64,
    /// Times the callback found the queue empty and filled with silence.
    pub underruns: u64,
    /// Passes the producer completed (end marker enqueued).
    pub passes_produced: u64,
    /// Passes the callback played to the end marker.
    pub passes_played: u64,
    /// Callback invocations that faulted and were replaced with silence.
    pub callback_faults: u64,
    /// Whether the session ended because stop was requested.
    pub stop_requested: bool,
}

/// State shared between the controller, the producer thread and the
/// device callback.
///
/// Everything is atomic: the device callback reads and updates it without
/// taking locks.
#[derive(Debug)]
pub struct StreamState {
    running: AtomicBool,
    stop_requested: AtomicBool,
    loop_enabled: AtomicBool,
    phase: AtomicU8,
    chunks_produced: AtomicU64,
    chunks_played: AtomicU64,
    underruns: AtomicU64,
    passes_produced: AtomicU64,
    passes_played: AtomicU64,
    callback_faults: AtomicU64,
}

impl StreamState {
    /// Creates fresh state for one stream.
    pub fn new(loop_enabled: bool) -> Self {
        Self {
            running: AtomicBool::new(true),
            stop_requested: AtomicBool::new(false),
            loop_enabled: AtomicBool::new(loop_enabled),
            phase: AtomicU8::new(StreamPhase::Idle.as_u8()),
            chunks_produced: AtomicU64::new(0),
            chunks_played: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
            passes_produced: AtomicU64::new(0),
            passes_played: AtomicU64::new(0),
            callback_faults: AtomicU64::new(0),
        }
    }

    /// Asks the producer and controller to wind down.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Returns `true` until the stream reaches [`StreamPhase::Stopped`].
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether a finished pass restarts from the beginning.
    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled.load(Ordering::SeqCst)
    }

    /// Turns looping on or off for subsequent pass boundaries.
    pub fn set_loop_enabled(&self, enabled: bool) {
        self.loop_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> StreamPhase {
        StreamPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Number of passes the callback has played through to the end marker.
    pub fn passes_played(&self) -> u64 {
        self.passes_played.load(Ordering::SeqCst)
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> StreamStats {
        StreamStats {
            chunks_produced: self.chunks_produced.load(Ordering::SeqCst),
            chunks_played: self.chunks_played.load(Ordering::SeqCst),
            underruns: self.underruns.load(Ordering::SeqCst),
            passes_produced: self.passes_produced.load(Ordering::SeqCst),
            passes_played: self.passes_played.load(Ordering::SeqCst),
            callback_faults: self.callback_faults.load(Ordering::SeqCst),
            stop_requested: self.is_stop_requested(),
        }
    }

    pub(crate) fn set_phase(&self, phase: StreamPhase) {
        self.phase.store(phase.as_u8(), Ordering::SeqCst);
        if phase == StreamPhase::Stopped {
            self.running.store(false, Ordering::SeqCst);
        }
    }

    pub(crate) fn record_chunk_produced(&self) {
        self.chunks_produced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pass_produced(&self) {
        self.passes_produced.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_chunk_played(&self) {
        self.chunks_played.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pass_played(&self) {
        self.passes_played.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_callback_fault(&self) {
        self.callback_faults.fetch_add(1, Ordering::Relaxed);
    }
}

/// A cloneable handle that can stop a [`Session`] from elsewhere, e.g. a
/// Ctrl+C handler.
#[derive(Debug, Clone)]
pub struct StopHandle {
    state: Arc<StreamState>,
}

impl StopHandle {
    /// Requests the session to stop.
    pub fn stop(&self) {
        self.state.request_stop();
    }

    /// Returns `true` once stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.state.is_stop_requested()
    }
}

/// Handle to a running playback stream.
///
/// Returned by [`StreamPlayerBuilder::start()`]. Playback runs on background
/// threads until the file has played (once, or forever when looping) or
/// [`stop()`](Session::stop) is called.
///
/// # Lifecycle
///
/// 1. Created by [`StreamPlayerBuilder::start()`] once the device stream is open
/// 2. The producer and device callback run in the background
/// 3. [`wait()`](Session::wait) or [`join()`](Session::join) for the outcome
/// 4. Dropping the `Session` requests stop and joins the background threads
///
/// # Example
///
/// ```ignore
/// let session = StreamPlayer::builder().looping(true).start(buffer)?;
///
/// tokio::time::sleep(Duration::from_secs(10)).await;
/// session.stop();
///
/// let stats = session.wait().await?;
/// ```
///
/// [`StreamPlayerBuilder::start()`]: crate::StreamPlayerBuilder::start
pub struct Session {
    state: Arc<StreamState>,
    controller: Option<JoinHandle<Result<StreamStats, StreamPlaybackError>>>,
    device_name: String,
}

impl Session {
    pub(crate) fn new(
        state: Arc<StreamState>,
        controller: JoinHandle<Result<StreamStats, StreamPlaybackError>>,
        device_name: String,
    ) -> Self {
        Self {
            state,
            controller: Some(controller),
            device_name,
        }
    }

    /// Name of the output device the stream opened.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Returns `true` while the device stream is open.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> StreamPhase {
        self.state.phase()
    }

    /// Returns current session statistics.
    pub fn stats(&self) -> StreamStats {
        self.state.stats()
    }

    /// Turns looping on or off. Takes effect at the next pass boundary.
    pub fn set_looping(&self, enabled: bool) {
        self.state.set_loop_enabled(enabled);
    }

    /// Requests a graceful stop.
    ///
    /// The producer exits within one push timeout and the controller closes
    /// the device stream. Use [`wait()`](Session::wait) or
    /// [`join()`](Session::join) to wait for that to happen.
    pub fn stop(&self) {
        self.state.request_stop();
    }

    /// Returns a handle that can request stop without owning the session.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Blocks until the stream has stopped and returns its final statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread failed while streaming.
    pub fn join(mut self) -> Result<StreamStats, StreamPlaybackError> {
        match self.controller.take() {
            Some(handle) => join_controller(handle),
            None => Ok(self.state.stats()),
        }
    }

    /// Waits, without blocking the async runtime, until the stream has
    /// stopped and returns its final statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread failed while streaming.
    pub async fn wait(mut self) -> Result<StreamStats, StreamPlaybackError> {
        let Some(handle) = self.controller.take() else {
            return Ok(self.state.stats());
        };

        tokio::task::spawn_blocking(move || join_controller(handle))
            .await
            .map_err(|e| StreamPlaybackError::ThreadPanicked {
                thread: "session-wait",
                reason: e.to_string(),
            })?
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handle) = self.controller.take() {
            // Session dropped without join/wait - stop and reap the threads
            self.state.request_stop();
            if let Err(e) = join_controller(handle) {
                tracing::warn!("Playback session ended with error during drop: {}", e);
            }
        }
    }
}

fn join_controller(
    handle: JoinHandle<Result<StreamStats, StreamPlaybackError>>,
) -> Result<StreamStats, StreamPlaybackError> {
    handle
        .join()
        .map_err(|panic| StreamPlaybackError::ThreadPanicked {
            thread: "stream-controller",
            reason: panic_message(panic.as_ref()),
        })?
}

/// Extracts a readable message from a thread panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
