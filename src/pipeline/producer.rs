//! Producer - slices a sample buffer into fixed-size chunks for the queue.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::pipeline::ChunkQueue;
use crate::session::StreamState;
use crate::{Chunk, PlaybackConfig, QueueItem, SampleBuffer, StreamPlaybackError};

/// How a producer pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerOutcome {
    /// Every chunk and the end marker were enqueued.
    Completed {
        /// Chunks enqueued for the pass.
        chunks: u64,
    },
    /// Stop was requested before the pass was fully enqueued.
    ///
    /// No end marker was pushed.
    Stopped {
        /// Chunks enqueued before the stop was observed.
        chunks: u64,
    },
}

impl ProducerOutcome {
    /// Chunks enqueued, whichever way the pass ended.
    pub fn chunks(&self) -> u64 {
        match self {
            Self::Completed { chunks } | Self::Stopped { chunks } => *chunks,
        }
    }
}

/// Walks a [`SampleBuffer`] and feeds it to the [`ChunkQueue`] one chunk at
/// a time.
///
/// Pacing comes only from queue backpressure: a push waits while the queue
/// is full, and between timed-out attempts the stop flag is re-checked.
#[derive(Debug, Clone)]
pub struct Producer {
    buffer: SampleBuffer,
    queue: Arc<ChunkQueue>,
    state: Arc<StreamState>,
    chunk_samples: usize,
    push_timeout: Duration,
}

impl Producer {
    /// Creates a producer for `buffer` using the chunking parameters in `config`.
    pub fn new(
        buffer: SampleBuffer,
        queue: Arc<ChunkQueue>,
        state: Arc<StreamState>,
        config: &PlaybackConfig,
    ) -> Self {
        Self {
            buffer,
            queue,
            state,
            chunk_samples: config.chunk_samples.max(1),
            push_timeout: config.push_timeout,
        }
    }

    /// Runs one full pass over the buffer on the calling thread.
    ///
    /// Emits `ceil(len / chunk_samples)` chunks followed by an end marker.
    /// The final chunk is zero-padded; the cursor only advances by the real
    /// samples consumed.
    pub fn run(&self, pass: u64) -> ProducerOutcome {
        let samples = self.buffer.samples();
        let mut cursor = 0;
        let mut chunks = 0u64;

        tracing::debug!(
            pass,
            samples = samples.len(),
            chunk_samples = self.chunk_samples,
            "Producer pass starting"
        );

        while cursor < samples.len() {
            if self.state.is_stop_requested() {
                return self.stopped(pass, chunks);
            }

            let end = (cursor + self.chunk_samples).min(samples.len());
            let chunk = Chunk::from_slice(&samples[cursor..end], self.chunk_samples, pass, cursor);
            let consumed = chunk.valid_samples();

            if !self.push_until_stopped(QueueItem::Chunk(chunk)) {
                return self.stopped(pass, chunks);
            }

            self.state.record_chunk_produced();
            chunks += 1;
            cursor += consumed;
        }

        if !self.push_until_stopped(QueueItem::EndOfPass) {
            return self.stopped(pass, chunks);
        }

        self.state.record_pass_produced();
        tracing::debug!(pass, chunks, "Producer pass complete");

        ProducerOutcome::Completed { chunks }
    }

    /// Runs one pass on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the thread cannot be spawned.
    pub fn spawn(self, pass: u64) -> Result<JoinHandle<ProducerOutcome>, StreamPlaybackError> {
        thread::Builder::new()
            .name("chunk-producer".to_string())
            .spawn(move || self.run(pass))
            .map_err(|e| {
                StreamPlaybackError::BackendError(format!("failed to spawn producer thread: {e}"))
            })
    }

    /// Pushes `item`, retrying on timeout until it lands or stop is requested.
    ///
    /// Returns `false` if stop was requested first; the item is dropped.
    fn push_until_stopped(&self, item: QueueItem) -> bool {
        let mut item = item;
        loop {
            match self.queue.push(item, self.push_timeout) {
                Ok(()) => return true,
                Err(rejected) => {
                    if self.state.is_stop_requested() {
                        return false;
                    }
                    item = rejected;
                }
            }
        }
    }

    fn stopped(&self, pass: u64, chunks: u64) -> ProducerOutcome {
        tracing::debug!(pass, chunks, "Producer stopped before end of pass");
        ProducerOutcome::Stopped { chunks }
    }
}
