//! Mock output backend for testing.
//!
//! Drives the playback callback from a plain thread at a fixed cadence and
//! records everything it "played", so the pipeline can be tested without
//! audio hardware.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use super::{OutputBackend, OutputConfig, PlaybackStream, StreamHandle};
use crate::event::EventCallback;
use crate::pipeline::{CallbackStatus, PlaybackCallback};
use crate::session::panic_message;
use crate::StreamPlaybackError;

/// Default time between mock callback invocations.
const DEFAULT_PERIOD: Duration = Duration::from_millis(1);

/// Device name reported by [`MockOutput`].
const MOCK_DEVICE_NAME: &str = "mock output";

/// Everything a [`MockOutput`] stream played.
#[derive(Debug, Default)]
pub struct MockRecording {
    samples: Mutex<Vec<i16>>,
    callbacks: AtomicUsize,
    completes: AtomicUsize,
    opens: AtomicUsize,
}

impl MockRecording {
    /// All samples written by the callback, silence included.
    pub fn samples(&self) -> Vec<i16> {
        self.samples.lock().clone()
    }

    /// Number of callback invocations.
    pub fn callbacks(&self) -> usize {
        self.callbacks.load(Ordering::SeqCst)
    }

    /// Number of invocations that returned [`CallbackStatus::Complete`].
    pub fn completes(&self) -> usize {
        self.completes.load(Ordering::SeqCst)
    }

    /// Number of streams opened on this backend.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

/// Output backend that plays into memory.
///
/// # Example
///
/// ```ignore
/// let output = MockOutput::new();
/// let recording = output.recording();
///
/// let session = StreamPlayer::builder().output(output).start(buffer)?;
/// session.join()?;
///
/// assert!(recording.samples().starts_with(buffer.samples()));
/// ```
#[derive(Debug, Clone)]
pub struct MockOutput {
    period: Duration,
    frames_per_callback: Option<usize>,
    fail_open: bool,
    recording: Arc<MockRecording>,
}

impl MockOutput {
    /// Creates a mock output invoking the callback every millisecond.
    pub fn new() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            frames_per_callback: None,
            fail_open: false,
            recording: Arc::new(MockRecording::default()),
        }
    }

    /// Sets the time between callback invocations.
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Requests buffers of `frames` instead of the configured chunk size.
    #[must_use]
    pub fn with_frames_per_callback(mut self, frames: usize) -> Self {
        self.frames_per_callback = Some(frames.max(1));
        self
    }

    /// Makes `open` fail, as a missing or busy device would.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::new()
        }
    }

    /// Shared handle to what this backend plays.
    pub fn recording(&self) -> Arc<MockRecording> {
        Arc::clone(&self.recording)
    }
}

impl Default for MockOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBackend for MockOutput {
    fn name(&self) -> String {
        MOCK_DEVICE_NAME.to_string()
    }

    fn open(
        &self,
        config: &OutputConfig,
        mut callback: PlaybackCallback,
        _on_event: Option<EventCallback>,
    ) -> Result<PlaybackStream, StreamPlaybackError> {
        if self.fail_open {
            return Err(StreamPlaybackError::BackendError(
                "mock output refused to open".to_string(),
            ));
        }
        self.recording.opens.fetch_add(1, Ordering::SeqCst);

        let frames = self.frames_per_callback.unwrap_or(config.chunk_samples).max(1);
        let period = self.period;
        let recording = Arc::clone(&self.recording);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("mock-output".to_string())
            .spawn(move || {
                let mut buffer = vec![0i16; frames];
                while !stop_flag.load(Ordering::SeqCst) {
                    let status = callback.fill_guarded(&mut buffer);

                    recording.samples.lock().extend_from_slice(&buffer);
                    recording.callbacks.fetch_add(1, Ordering::SeqCst);
                    if status == CallbackStatus::Complete {
                        recording.completes.fetch_add(1, Ordering::SeqCst);
                    }

                    thread::sleep(period);
                }
            })
            .map_err(|e| StreamPlaybackError::BackendError(format!("failed to spawn mock output: {e}")))?;

        Ok(PlaybackStream::new(
            Box::new(MockStreamHandle {
                stop,
                thread: Some(thread),
            }),
            MOCK_DEVICE_NAME,
        ))
    }
}

struct MockStreamHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl StreamHandle for MockStreamHandle {
    fn stop(&mut self) -> Result<(), StreamPlaybackError> {
        self.stop.store(true, Ordering::SeqCst);
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|panic| StreamPlaybackError::ThreadPanicked {
                    thread: "mock-output",
                    reason: panic_message(panic.as_ref()),
                }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ChunkQueue;
    use crate::session::StreamState;
    use crate::{Chunk, QueueItem};

    fn callback(queue: &Arc<ChunkQueue>) -> PlaybackCallback {
        PlaybackCallback::new(Arc::clone(queue), Arc::new(StreamState::new(false)), 4)
    }

    #[test]
    fn test_mock_output_plays_queue() {
        let queue = Arc::new(ChunkQueue::new(4));
        queue
            .try_push(QueueItem::Chunk(Chunk::from_slice(&[1, 2, 3, 4], 4, 0, 0)))
            .unwrap();
        queue.try_push(QueueItem::EndOfPass).unwrap();

        let output = MockOutput::new();
        let recording = output.recording();
        let stream = output
            .open(&OutputConfig::mono(8000, 4), callback(&queue), None)
            .unwrap();

        while recording.completes() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        stream.close().unwrap();

        let samples = recording.samples();
        assert_eq!(&samples[..4], &[1, 2, 3, 4]);
        assert_eq!(&samples[4..8], &[0, 0, 0, 0]);
        assert_eq!(recording.opens(), 1);
    }

    #[test]
    fn test_mock_output_stops_on_close() {
        let queue = Arc::new(ChunkQueue::new(4));
        let output = MockOutput::new();
        let recording = output.recording();
        let stream = output
            .open(&OutputConfig::mono(8000, 4), callback(&queue), None)
            .unwrap();

        thread::sleep(Duration::from_millis(10));
        drop(stream);

        let after_close = recording.callbacks();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(recording.callbacks(), after_close);
        assert!(recording.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_failing_output_never_opens() {
        let queue = Arc::new(ChunkQueue::new(4));
        let output = MockOutput::failing();
        let recording = output.recording();

        let result = output.open(&OutputConfig::mono(8000, 4), callback(&queue), None);
        assert!(matches!(result, Err(StreamPlaybackError::BackendError(_))));
        assert_eq!(recording.opens(), 0);
        assert_eq!(recording.callbacks(), 0);
    }

    #[test]
    fn test_frames_per_callback_override() {
        let queue = Arc::new(ChunkQueue::new(4));
        let output = MockOutput::new().with_frames_per_callback(3);
        let recording = output.recording();
        let stream = output
            .open(&OutputConfig::mono(8000, 1024), callback(&queue), None)
            .unwrap();

        while recording.callbacks() < 2 {
            thread::sleep(Duration::from_millis(1));
        }
        stream.close().unwrap();

        assert_eq!(recording.samples().len(), recording.callbacks() * 3);
    }
}
