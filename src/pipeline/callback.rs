//! Playback callback - pulls chunks off the queue on the device's real-time thread.
//!
//! Everything here runs inside the audio backend's callback. It must never
//! block, allocate in the steady state, or log.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::format::write_le_bytes;
use crate::pipeline::ChunkQueue;
use crate::session::StreamState;
use crate::{Chunk, QueueItem};

/// What the device should do after a callback invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    /// Keep invoking the callback.
    Continue,
    /// The end of the current pass was reached; the buffer was completed with silence.
    Complete,
}

/// Supplies device buffers from the [`ChunkQueue`].
///
/// Each invocation fills the whole output buffer. When the device buffer is
/// the same size as a chunk, every call pops exactly one item; otherwise the
/// unplayed tail of a chunk carries over to the next call.
///
/// - A chunk is copied out and playback continues
/// - The end-of-pass marker yields silence and [`CallbackStatus::Complete`]
/// - An empty queue yields silence and [`CallbackStatus::Continue`]
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use stream_playback::{CallbackStatus, ChunkQueue, PlaybackCallback, StreamState};
///
/// let queue = Arc::new(ChunkQueue::new(4));
/// let state = Arc::new(StreamState::new(false));
/// let mut callback = PlaybackCallback::new(queue, state, 256);
///
/// // Empty queue: silence, keep going
/// let mut out = [1i16; 256];
/// assert_eq!(callback.fill(&mut out), CallbackStatus::Continue);
/// assert!(out.iter().all(|&s| s == 0));
/// ```
pub struct PlaybackCallback {
    queue: Arc<ChunkQueue>,
    state: Arc<StreamState>,
    current: Option<Chunk>,
    offset: usize,
    scratch: Vec<i16>,
}

impl PlaybackCallback {
    /// Creates a callback reading from `queue`.
    ///
    /// `frames_hint` preallocates scratch space for [`fill_bytes()`](Self::fill_bytes).
    pub fn new(queue: Arc<ChunkQueue>, state: Arc<StreamState>, frames_hint: usize) -> Self {
        Self {
            queue,
            state,
            current: None,
            offset: 0,
            scratch: vec![0; frames_hint],
        }
    }

    /// Fills `out` with the next mono samples.
    pub fn fill(&mut self, out: &mut [i16]) -> CallbackStatus {
        let mut written = 0;

        while written < out.len() {
            if let Some(chunk) = &self.current {
                let remaining = &chunk.samples()[self.offset..];
                let n = remaining.len().min(out.len() - written);
                out[written..written + n].copy_from_slice(&remaining[..n]);
                written += n;
                self.offset += n;

                if self.offset >= chunk.len() {
                    self.current = None;
                    self.offset = 0;
                }
                continue;
            }

            match self.queue.try_pop() {
                Some(QueueItem::Chunk(chunk)) => {
                    self.state.record_chunk_played();
                    self.current = Some(chunk);
                    self.offset = 0;
                }
                Some(QueueItem::EndOfPass) => {
                    out[written..].fill(0);
                    self.state.record_pass_played();
                    return CallbackStatus::Complete;
                }
                None => {
                    out[written..].fill(0);
                    self.state.record_underrun();
                    return CallbackStatus::Continue;
                }
            }
        }

        CallbackStatus::Continue
    }

    /// Like [`fill()`](Self::fill), but a fault inside the callback degrades
    /// to a silent buffer instead of unwinding into the audio backend.
    pub fn fill_guarded(&mut self, out: &mut [i16]) -> CallbackStatus {
        match catch_unwind(AssertUnwindSafe(|| self.fill(out))) {
            Ok(status) => status,
            Err(_) => {
                out.fill(0);
                self.current = None;
                self.offset = 0;
                self.state.record_callback_fault();
                CallbackStatus::Continue
            }
        }
    }

    /// Fills a byte buffer with little-endian 16-bit PCM.
    ///
    /// `out` holds `frame_count * 2` bytes; a trailing odd byte is zeroed.
    pub fn fill_bytes(&mut self, out: &mut [u8]) -> CallbackStatus {
        let frames = out.len() / 2;
        if self.scratch.len() < frames {
            self.scratch.resize(frames, 0);
        }

        let mut scratch = std::mem::take(&mut self.scratch);
        let status = self.fill_guarded(&mut scratch[..frames]);
        let written = write_le_bytes(&scratch[..frames], out);
        out[written..].fill(0);
        self.scratch = scratch;

        status
    }
}

impl std::fmt::Debug for PlaybackCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCallback")
            .field("queue", &self.queue)
            .field("offset", &self.offset)
            .field("has_chunk", &self.current.is_some())
            .finish_non_exhaustive()
    }
}
