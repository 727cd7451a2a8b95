//! Stream controller - owns the device stream and sequences producer passes.
//!
//! ```text
//! Idle → Producing → Draining ─┬→ Producing   (looping)
//!                              └→ Stopped     (finished or stop requested)
//! ```

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::event::{emit, EventCallback, PlaybackEvent, StopReason};
use crate::output::{OutputBackend, OutputConfig, PlaybackStream};
use crate::pipeline::{ChunkQueue, PlaybackCallback, Producer, ProducerOutcome};
use crate::session::{panic_message, StreamPhase, StreamState, StreamStats};
use crate::{PlaybackConfig, SampleBuffer, StreamPlaybackError};

/// Longest single sleep while waiting on a stop-aware condition.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a spawned controller thread.
pub(crate) type ControllerHandle = JoinHandle<Result<StreamStats, StreamPlaybackError>>;

/// How the controller's wait for a pass to play out ended.
enum Drain {
    Played,
    TimedOut,
    Stopped,
}

/// Runs one playback stream from device open to close.
pub(crate) struct Controller {
    buffer: SampleBuffer,
    queue: Arc<ChunkQueue>,
    state: Arc<StreamState>,
    config: PlaybackConfig,
    on_event: Option<EventCallback>,
}

impl Controller {
    pub(crate) fn new(
        buffer: SampleBuffer,
        queue: Arc<ChunkQueue>,
        state: Arc<StreamState>,
        config: PlaybackConfig,
        on_event: Option<EventCallback>,
    ) -> Self {
        Self {
            buffer,
            queue,
            state,
            config,
            on_event,
        }
    }

    /// Starts the controller thread and waits for the output to open.
    ///
    /// The device stream is created on the controller thread, which owns it
    /// for its whole life. Open failures come back here before any audio is
    /// produced.
    ///
    /// Returns the thread handle and the device name.
    pub(crate) fn spawn(
        self,
        backend: Box<dyn OutputBackend>,
    ) -> Result<(ControllerHandle, String), StreamPlaybackError> {
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let handle = thread::Builder::new()
            .name("stream-controller".to_string())
            .spawn(move || self.run(backend.as_ref(), &ready_tx))
            .map_err(|e| StreamPlaybackError::ThreadPanicked {
                thread: "stream-controller",
                reason: e.to_string(),
            })?;

        match ready_rx.recv() {
            Ok(Ok(device_name)) => Ok((handle, device_name)),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            // Sender dropped without a result: the thread died before opening
            Err(_) => Err(match handle.join() {
                Err(panic) => StreamPlaybackError::ThreadPanicked {
                    thread: "stream-controller",
                    reason: panic_message(panic.as_ref()),
                },
                Ok(Err(e)) => e,
                Ok(Ok(_)) => StreamPlaybackError::BackendError(
                    "output stream was never opened".to_string(),
                ),
            }),
        }
    }

    fn run(
        self,
        backend: &dyn OutputBackend,
        ready: &mpsc::SyncSender<Result<String, StreamPlaybackError>>,
    ) -> Result<StreamStats, StreamPlaybackError> {
        let sample_rate = self.buffer.sample_rate();
        let output_config = OutputConfig::mono(sample_rate, self.config.chunk_samples);
        let callback = PlaybackCallback::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.state),
            self.config.chunk_samples,
        );

        let stream = match backend.open(&output_config, callback, self.on_event.clone()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::debug!("Output '{}' failed to open: {}", backend.name(), e);
                self.state.set_phase(StreamPhase::Stopped);
                let _ = ready.send(Err(e));
                return Ok(self.state.stats());
            }
        };

        let device_name = stream.device_name().to_string();
        tracing::info!(
            "Streaming to '{}' at {}Hz, {} samples per chunk",
            device_name,
            sample_rate,
            self.config.chunk_samples
        );
        self.emit(PlaybackEvent::StreamOpened {
            device: device_name.clone(),
            sample_rate,
            chunk_samples: self.config.chunk_samples,
        });
        let _ = ready.send(Ok(device_name));

        let result = self.run_passes();
        self.close(stream);

        let reason = result?;
        let stats = self.state.stats();
        tracing::info!(
            "Stream stopped ({}): {} chunks played, {} silent callbacks",
            reason,
            stats.chunks_played,
            stats.underruns
        );
        self.emit(PlaybackEvent::Stopped { reason });

        Ok(stats)
    }

    fn run_passes(&self) -> Result<StopReason, StreamPlaybackError> {
        let mut pass = 0u64;

        loop {
            if self.state.is_stop_requested() {
                return Ok(StopReason::StopRequested);
            }

            self.state.set_phase(StreamPhase::Producing);
            let played_before = self.state.passes_played();
            self.emit(PlaybackEvent::PassStarted { pass });

            let producer = Producer::new(
                self.buffer.clone(),
                Arc::clone(&self.queue),
                Arc::clone(&self.state),
                &self.config,
            );
            let outcome = producer
                .spawn(pass)?
                .join()
                .map_err(|panic| StreamPlaybackError::ThreadPanicked {
                    thread: "chunk-producer",
                    reason: panic_message(panic.as_ref()),
                })?;

            let ProducerOutcome::Completed { chunks } = outcome else {
                return Ok(StopReason::StopRequested);
            };

            self.state.set_phase(StreamPhase::Draining);
            match self.wait_for_drain(played_before) {
                Drain::Played => {}
                Drain::Stopped => return Ok(StopReason::StopRequested),
                Drain::TimedOut => {
                    let queued = self.queue.len();
                    tracing::warn!(
                        "Pass {} did not finish playing in time ({} items still queued)",
                        pass,
                        queued
                    );
                    self.emit(PlaybackEvent::DrainTimedOut { pass, queued });
                }
            }
            self.emit(PlaybackEvent::PassCompleted { pass, chunks });

            if !self.state.loop_enabled() {
                return Ok(StopReason::Finished);
            }

            if !self.pause(self.config.loop_restart_delay) {
                return Ok(StopReason::StopRequested);
            }

            let discarded = self.queue.clear();
            pass += 1;
            tracing::info!("Restarting from the top (pass {}, {} stale items discarded)", pass, discarded);
            self.emit(PlaybackEvent::LoopRestarted { pass, discarded });
        }
    }

    /// Waits until the callback reaches the end marker of the current pass.
    ///
    /// The limit is the play time of everything still queued plus the
    /// configured grace period.
    fn wait_for_drain(&self, played_before: u64) -> Drain {
        let chunk_duration = self.config.chunk_duration(self.buffer.sample_rate());
        let queued = u32::try_from(self.queue.len() + 1).unwrap_or(u32::MAX);
        let limit = chunk_duration.saturating_mul(queued).saturating_add(self.config.drain_grace);
        let deadline = Instant::now().checked_add(limit);

        loop {
            if self.state.passes_played() > played_before {
                return Drain::Played;
            }
            if self.state.is_stop_requested() {
                return Drain::Stopped;
            }
            match remaining(deadline) {
                Some(left) if left.is_zero() => return Drain::TimedOut,
                left => thread::sleep(left.map_or(POLL_INTERVAL, |l| POLL_INTERVAL.min(l))),
            }
        }
    }

    /// Sleeps for `duration` unless stop is requested first.
    ///
    /// Returns `false` if stopped.
    fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);
        loop {
            if self.state.is_stop_requested() {
                return false;
            }
            match remaining(deadline) {
                Some(left) if left.is_zero() => return true,
                left => thread::sleep(left.map_or(POLL_INTERVAL, |l| POLL_INTERVAL.min(l))),
            }
        }
    }

    fn close(&self, stream: PlaybackStream) {
        let device_name = stream.device_name().to_string();
        if let Err(e) = stream.close() {
            tracing::warn!("Failed to close output stream on '{}': {}", device_name, e);
        }
        self.state.set_phase(StreamPhase::Stopped);
    }

    fn emit(&self, event: PlaybackEvent) {
        emit(self.on_event.as_ref(), event);
    }
}

/// Time left until `deadline`; `None` when there is no deadline.
fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}
