//! Integration tests for stream-playback.
//!
//! Everything here runs against `MockOutput`. Tests that require actual
//! audio hardware are marked with `#[ignore]` and should be run manually.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use stream_playback::format::{write_wav, WavWriter};
use stream_playback::{
    decode_file, CallbackStatus, ChunkQueue, MockOutput, PlaybackCallback, PlaybackConfig,
    PlaybackEvent, Producer, ProducerOutcome, QueueItem, SampleBuffer, SignalGenerator,
    StopReason, StreamPhase, StreamPlaybackError, StreamPlayer, StreamState,
};
use tempfile::tempdir;

/// Samples 1..=len, never zero, so silence is distinguishable from audio.
fn ramp(len: usize) -> Vec<i16> {
    (0..len).map(|i| (i % 30_000) as i16 + 1).collect()
}

fn pipeline(
    samples: Vec<i16>,
    config: &PlaybackConfig,
) -> (Producer, Arc<ChunkQueue>, Arc<StreamState>) {
    let buffer = SampleBuffer::new(samples, 44100).unwrap();
    let queue = Arc::new(ChunkQueue::new(config.queue_capacity));
    let state = Arc::new(StreamState::new(config.looping));
    let producer = Producer::new(buffer, Arc::clone(&queue), Arc::clone(&state), config);
    (producer, queue, state)
}

/// Splits a mock recording into device buffers and keeps those that carried audio.
fn audible_blocks(recording: &[i16], frames: usize) -> Vec<Vec<i16>> {
    recording
        .chunks_exact(frames)
        .filter(|block| block.iter().any(|&s| s != 0))
        .map(<[i16]>::to_vec)
        .collect()
}

#[test]
fn test_end_to_end_2050_samples_in_1024_chunks() {
    let config = PlaybackConfig::default();
    let input = ramp(2050);
    let (producer, queue, state) = pipeline(input.clone(), &config);

    assert_eq!(producer.run(0), ProducerOutcome::Completed { chunks: 3 });
    assert_eq!(queue.len(), 4);

    let mut callback = PlaybackCallback::new(Arc::clone(&queue), Arc::clone(&state), 1024);
    let mut out = vec![0i16; 1024];

    assert_eq!(callback.fill(&mut out), CallbackStatus::Continue);
    assert_eq!(out, input[..1024]);

    assert_eq!(callback.fill(&mut out), CallbackStatus::Continue);
    assert_eq!(out, input[1024..2048]);

    assert_eq!(callback.fill(&mut out), CallbackStatus::Continue);
    assert_eq!(&out[..2], &input[2048..]);
    assert!(out[2..].iter().all(|&s| s == 0));

    assert_eq!(callback.fill(&mut out), CallbackStatus::Complete);
    assert!(out.iter().all(|&s| s == 0));

    let stats = state.stats();
    assert_eq!(stats.chunks_played, 3);
    assert_eq!(stats.passes_played, 1);
    assert_eq!(stats.underruns, 0);
}

#[test]
fn test_chunk_count_and_prefix_reconstruction() {
    for chunk_samples in [1usize, 5, 256, 1024] {
        for len in [0usize, 1, 255, 256, 257, 1023, 1024, 1025, 2050, 4096] {
            let config = PlaybackConfig {
                chunk_samples,
                queue_capacity: 8192,
                ..Default::default()
            };
            let input = ramp(len);
            let (producer, queue, _) = pipeline(input.clone(), &config);
            producer.run(0);

            let mut chunks = Vec::new();
            let mut end_markers = 0;
            while let Some(item) = queue.try_pop() {
                match item {
                    QueueItem::Chunk(chunk) => {
                        assert_eq!(end_markers, 0, "chunk after end marker");
                        assert_eq!(chunk.len(), chunk_samples);
                        chunks.push(chunk);
                    }
                    QueueItem::EndOfPass => end_markers += 1,
                }
            }

            assert_eq!(end_markers, 1);
            assert_eq!(chunks.len(), len.div_ceil(chunk_samples), "len={len} chunk={chunk_samples}");

            let rebuilt: Vec<i16> = chunks
                .iter()
                .flat_map(|c| c.real_samples().iter().copied())
                .collect();
            assert_eq!(rebuilt, input, "len={len} chunk={chunk_samples}");
        }
    }
}

#[test]
fn test_loop_passes_restart_from_zero() {
    const PASSES: u64 = 4;

    let config = PlaybackConfig {
        chunk_samples: 100,
        queue_capacity: 16,
        ..Default::default()
    };
    let (producer, queue, state) = pipeline(ramp(950), &config);
    let per_pass = 10;

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut starts = Vec::new();
            let mut chunks = 0u64;
            let mut passes = 0;
            while passes < PASSES {
                match queue.try_pop() {
                    Some(QueueItem::Chunk(chunk)) => {
                        chunks += 1;
                        if chunk.start_sample() == 0 {
                            starts.push((chunk.pass(), chunk.samples()[0]));
                        }
                    }
                    Some(QueueItem::EndOfPass) => passes += 1,
                    None => thread::yield_now(),
                }
            }
            (chunks, starts)
        })
    };

    for pass in 0..PASSES {
        assert_eq!(producer.run(pass), ProducerOutcome::Completed { chunks: per_pass });
    }

    let (chunks, starts) = consumer.join().unwrap();
    assert_eq!(chunks, PASSES * per_pass);
    assert_eq!(starts, (0..PASSES).map(|p| (p, 1i16)).collect::<Vec<_>>());
    assert_eq!(state.stats().chunks_produced, PASSES * per_pass);
}

#[test]
fn test_stop_unblocks_producer_on_full_queue() {
    let config = PlaybackConfig {
        chunk_samples: 64,
        queue_capacity: 4,
        push_timeout: Duration::from_millis(100),
        ..Default::default()
    };
    let (producer, queue, state) = pipeline(ramp(64 * 100), &config);
    let handle = producer.spawn(0).unwrap();

    // Wait for the producer to fill the queue and block
    while queue.len() < 4 {
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(20));
    let produced_at_stop = state.stats().chunks_produced;

    let stopped_at = Instant::now();
    state.request_stop();
    let outcome = handle.join().unwrap();

    // One push timeout plus scheduling slack
    assert!(stopped_at.elapsed() < Duration::from_millis(300));
    assert_eq!(outcome, ProducerOutcome::Stopped { chunks: 4 });
    assert_eq!(state.stats().chunks_produced, produced_at_stop);
    assert_eq!(queue.len(), 4);
}

#[test]
fn test_underrun_returns_silent_bytes_and_continues() {
    let queue = Arc::new(ChunkQueue::new(4));
    let state = Arc::new(StreamState::new(false));
    let mut callback = PlaybackCallback::new(queue, Arc::clone(&state), 1024);

    let frame_count = 1024;
    let mut bytes = vec![0x55u8; frame_count * 2];
    let start = Instant::now();
    assert_eq!(callback.fill_bytes(&mut bytes), CallbackStatus::Continue);
    assert!(start.elapsed() < Duration::from_millis(50));

    assert_eq!(bytes.len(), frame_count * 2);
    assert!(bytes.iter().all(|&b| b == 0));
    assert_eq!(state.stats().underruns, 1);
}

#[test]
fn test_unsupported_extension_never_opens_device() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("noise.xyz");
    std::fs::write(&path, b"\x00\x01\x02\x03").unwrap();

    let output = MockOutput::new();
    let recording = output.recording();

    // Same order as the CLI: decode first, then open the device
    let result = decode_file(&path).and_then(|buffer| StreamPlayer::builder().output(output).start(buffer));

    match result {
        Err(e @ StreamPlaybackError::UnsupportedFormat { .. }) => {
            assert!(e.is_input_error());
            assert_eq!(e.to_string(), "Unsupported audio format: .xyz");
        }
        Err(other) => panic!("expected UnsupportedFormat, got {other}"),
        Ok(_) => panic!("expected UnsupportedFormat, got a session"),
    }
    assert_eq!(recording.opens(), 0);
}

#[test]
fn test_missing_file_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.mp3");

    let err = decode_file(&path).unwrap_err();
    assert!(matches!(err, StreamPlaybackError::FileNotFound { .. }));
    assert!(err.to_string().starts_with("Audio file not found: "));
}

#[test]
fn test_generated_wav_decodes_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("melody.wav");

    let mut generator = SignalGenerator::new(22050);
    generator.melody();
    let buffer = generator.into_buffer().unwrap();
    write_wav(&path, &buffer).unwrap();

    let decoded = decode_file(&path).unwrap();
    assert_eq!(decoded.sample_rate(), 22050);
    assert_eq!(decoded.samples(), buffer.samples());
    assert_eq!(decoded.duration(), buffer.duration());
}

#[test]
fn test_stereo_wav_streams_as_mono() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stereo.wav");

    let mut writer = WavWriter::create(&path, 8000, 2).unwrap();
    let frames: Vec<i16> = (1..=300).flat_map(|i| [i, i + 2]).collect();
    writer.write_samples(&frames).unwrap();
    writer.finalize().unwrap();

    let buffer = decode_file(&path).unwrap();
    assert_eq!(buffer.len(), 300);
    assert_eq!(buffer.samples()[0], 2);
    assert_eq!(buffer.samples()[299], 301);
}

#[test]
fn test_session_plays_whole_file_once() {
    let input = ramp(1000);
    let buffer = SampleBuffer::new(input.clone(), 8000).unwrap();
    let output = MockOutput::new();
    let recording = output.recording();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let session = StreamPlayer::builder()
        .chunk_samples(128)
        .output(output)
        .on_event(move |e| sink.lock().push(e))
        .start(buffer)
        .unwrap();

    let stats = session.join().unwrap();
    assert_eq!(stats.chunks_produced, 8);
    assert_eq!(stats.chunks_played, 8);
    assert_eq!(stats.passes_played, 1);
    assert!(!stats.stop_requested);
    assert_eq!(recording.completes(), 1);

    let played: Vec<i16> = audible_blocks(&recording.samples(), 128)
        .concat()
        .into_iter()
        .take(input.len())
        .collect();
    assert_eq!(played, input);

    let events = events.lock();
    assert!(matches!(events[0], PlaybackEvent::StreamOpened { sample_rate: 8000, .. }));
    assert!(events
        .iter()
        .any(|e| matches!(e, PlaybackEvent::PassCompleted { pass: 0, chunks: 8 })));
    assert!(matches!(
        events.last(),
        Some(PlaybackEvent::Stopped {
            reason: StopReason::Finished
        })
    ));
}

#[tokio::test]
async fn test_looping_session_until_stopped() {
    let buffer = SampleBuffer::new(ramp(300), 8000).unwrap();
    let output = MockOutput::new();
    let recording = output.recording();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let session = StreamPlayer::builder()
        .chunk_samples(100)
        .loop_restart_delay(Duration::from_millis(5))
        .looping(true)
        .output(output)
        .on_event(move |e| sink.lock().push(e))
        .start(buffer)
        .unwrap();

    while session.stats().passes_played < 3 {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert!(session.is_running());

    session.stop_handle().stop();
    let stats = session.wait().await.unwrap();

    assert!(stats.passes_played >= 3);
    assert!(stats.stop_requested);

    let events = events.lock();
    let completed: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::PassCompleted { chunks, .. } => Some(*chunks),
            _ => None,
        })
        .collect();
    assert!(completed.len() >= 3);
    assert!(completed.iter().all(|&c| c == 3));

    // Every pass is played from the first sample
    let blocks = audible_blocks(&recording.samples(), 100);
    let pass_starts = blocks.iter().filter(|b| b[0] == 1).count();
    assert!(pass_starts >= 3);

    assert!(matches!(
        events.last(),
        Some(PlaybackEvent::Stopped {
            reason: StopReason::StopRequested
        })
    ));
}

#[test]
fn test_stop_is_prompt_during_long_playback() {
    // Ten minutes of audio with a slow device: nowhere near finished when stopped
    let buffer = SampleBuffer::new(vec![1i16; 8000 * 600], 8000).unwrap();
    let output = MockOutput::new().with_period(Duration::from_millis(5));

    let session = StreamPlayer::builder()
        .queue_capacity(4)
        .push_timeout(Duration::from_millis(50))
        .output(output)
        .start(buffer)
        .unwrap();

    thread::sleep(Duration::from_millis(30));
    assert_eq!(session.phase(), StreamPhase::Producing);

    let stopped_at = Instant::now();
    session.stop();
    let stats = session.join().unwrap();

    assert!(stopped_at.elapsed() < Duration::from_millis(500));
    assert!(stats.stop_requested);
    assert_eq!(stats.passes_played, 0);
}

#[test]
fn test_dropping_session_releases_output() {
    let buffer = SampleBuffer::new(ramp(500), 8000).unwrap();
    let output = MockOutput::new();
    let recording = output.recording();

    let session = StreamPlayer::builder()
        .chunk_samples(50)
        .looping(true)
        .output(output)
        .start(buffer)
        .unwrap();

    while recording.callbacks() < 5 {
        thread::sleep(Duration::from_millis(1));
    }
    drop(session);

    let after_drop = recording.callbacks();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(recording.callbacks(), after_drop);
}

#[test]
fn test_device_buffer_differs_from_chunk_size() {
    let input = ramp(1000);
    let buffer = SampleBuffer::new(input.clone(), 8000).unwrap();
    let output = MockOutput::new().with_frames_per_callback(300);
    let recording = output.recording();

    let session = StreamPlayer::builder()
        .chunk_samples(128)
        .output(output)
        .start(buffer)
        .unwrap();
    let stats = session.join().unwrap();
    assert_eq!(stats.passes_played, 1);

    // Input has no zero samples, so dropping silence leaves exactly the audio
    let audible: Vec<i16> = recording.samples().into_iter().filter(|&s| s != 0).collect();
    assert_eq!(audible, input);
}

#[test]
#[ignore = "requires audio hardware"]
fn test_real_device_playback() {
    let mut generator = SignalGenerator::new(44100);
    generator.sine(440.0, 500, 0.2);
    let buffer = generator.into_buffer().unwrap();

    let session = StreamPlayer::builder().start(buffer).unwrap();
    println!("Playing on: {}", session.device_name());

    let stats = session.join().unwrap();
    assert_eq!(stats.passes_played, 1);
}
