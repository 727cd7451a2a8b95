//! CPAL output device backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig as CpalStreamConfig,
    SupportedBufferSize, SupportedStreamConfigRange,
};

use super::{OutputBackend, OutputConfig, PlaybackStream, StreamHandle};
use crate::event::{emit, EventCallback, PlaybackEvent};
use crate::format::i16_to_f32;
use crate::pipeline::PlaybackCallback;
use crate::StreamPlaybackError;

/// Plays audio on a CPAL output device.
///
/// The signal is always mono 16-bit. If the device can't take that
/// directly, the stream is opened as f32 and/or with the mono signal copied
/// to every device channel. The sample rate is never converted.
#[derive(Debug, Clone, Default)]
pub struct CpalOutput {
    device_index: Option<usize>,
}

impl CpalOutput {
    /// Output on the host's default device.
    pub fn default_device() -> Self {
        Self { device_index: None }
    }

    /// Output on the device at `index` in the host's output device list.
    pub fn with_device_index(index: usize) -> Self {
        Self {
            device_index: Some(index),
        }
    }

    /// Output on the given device, or the default one for `None`.
    pub fn new(device_index: Option<usize>) -> Self {
        Self { device_index }
    }

    fn resolve_device(&self) -> Result<Device, StreamPlaybackError> {
        let host = cpal::default_host();

        let Some(index) = self.device_index else {
            return host
                .default_output_device()
                .ok_or(StreamPlaybackError::NoDefaultDevice);
        };

        let devices = host
            .output_devices()
            .map_err(|e| StreamPlaybackError::BackendError(e.to_string()))?;
        let mut available = 0;
        for (i, device) in devices.enumerate() {
            if i == index {
                return Ok(device);
            }
            available = i + 1;
        }

        Err(StreamPlaybackError::DeviceNotFound { index, available })
    }
}

impl OutputBackend for CpalOutput {
    fn name(&self) -> String {
        match self.device_index {
            Some(index) => format!("cpal device #{index}"),
            None => "cpal default device".to_string(),
        }
    }

    fn open(
        &self,
        config: &OutputConfig,
        callback: PlaybackCallback,
        on_event: Option<EventCallback>,
    ) -> Result<PlaybackStream, StreamPlaybackError> {
        let device = self.resolve_device()?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let (stream_config, sample_format) = choose_stream_config(&device, &device_name, config)?;

        tracing::info!(
            "Opening output stream on '{}': {}Hz, {} channel(s), {:?}, buffer {:?}",
            device_name,
            stream_config.sample_rate.0,
            stream_config.channels,
            sample_format,
            stream_config.buffer_size
        );

        let stream = match sample_format {
            SampleFormat::I16 => build_stream::<i16>(
                &device,
                &stream_config,
                callback,
                on_event,
                config.chunk_samples,
                |s| s,
            ),
            SampleFormat::F32 => build_stream::<f32>(
                &device,
                &stream_config,
                callback,
                on_event,
                config.chunk_samples,
                i16_to_f32,
            ),
            format => {
                return Err(StreamPlaybackError::BackendError(format!(
                    "unsupported device sample format {format:?}"
                )));
            }
        }
        .map_err(|e| StreamPlaybackError::BackendError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| StreamPlaybackError::BackendError(e.to_string()))?;

        Ok(PlaybackStream::new(
            Box::new(CpalStreamHandle {
                stream: Some(stream),
            }),
            device_name,
        ))
    }
}

/// Picks the closest supported config to mono i16 at the requested rate.
///
/// Preference: fewer deviations from mono, then i16 over f32, then fewer
/// channels.
fn choose_stream_config(
    device: &Device,
    device_name: &str,
    config: &OutputConfig,
) -> Result<(CpalStreamConfig, SampleFormat), StreamPlaybackError> {
    let ranges = device
        .supported_output_configs()
        .map_err(|e| StreamPlaybackError::BackendError(e.to_string()))?;

    let best = ranges
        .filter(|range| supports(range, config.sample_rate))
        .min_by_key(|range| {
            (
                range.channels() != config.channels,
                range.sample_format() != SampleFormat::I16,
                range.channels(),
            )
        })
        .ok_or_else(|| StreamPlaybackError::UnsupportedStreamConfig {
            device: device_name.to_string(),
            sample_rate: config.sample_rate,
        })?;

    if best.channels() != config.channels {
        tracing::debug!(
            "Device '{}' has no mono output; duplicating across {} channels",
            device_name,
            best.channels()
        );
    }

    let buffer_size = fixed_buffer_size(best.buffer_size(), config.chunk_samples);
    if buffer_size == BufferSize::Default {
        tracing::debug!(
            "Device '{}' rejects {}-frame buffers; using host default",
            device_name,
            config.chunk_samples
        );
    }

    Ok((
        CpalStreamConfig {
            channels: best.channels(),
            sample_rate: SampleRate(config.sample_rate),
            buffer_size,
        },
        best.sample_format(),
    ))
}

fn supports(range: &SupportedStreamConfigRange, sample_rate: u32) -> bool {
    matches!(range.sample_format(), SampleFormat::I16 | SampleFormat::F32)
        && range.min_sample_rate().0 <= sample_rate
        && sample_rate <= range.max_sample_rate().0
}

fn fixed_buffer_size(supported: &SupportedBufferSize, frames: usize) -> BufferSize {
    let Ok(frames) = u32::try_from(frames) else {
        return BufferSize::Default;
    };
    match supported {
        SupportedBufferSize::Range { min, max } if (*min..=*max).contains(&frames) => {
            BufferSize::Fixed(frames)
        }
        _ => BufferSize::Default,
    }
}

fn build_stream<T>(
    device: &Device,
    config: &CpalStreamConfig,
    mut callback: PlaybackCallback,
    on_event: Option<EventCallback>,
    frames_hint: usize,
    convert: fn(i16) -> T,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(config.channels.max(1));
    // Allocated up front; only grows if the host hands us a larger buffer
    let mut mono = vec![0i16; frames_hint];

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let frames = data.len() / channels;
            if mono.len() < frames {
                mono.resize(frames, 0);
            }
            callback.fill_guarded(&mut mono[..frames]);

            for (frame, &sample) in data.chunks_exact_mut(channels).zip(&mono[..frames]) {
                frame.fill(convert(sample));
            }
        },
        move |err| {
            tracing::error!("Audio stream error: {}", err);
            emit(
                on_event.as_ref(),
                PlaybackEvent::StreamError {
                    error: err.to_string(),
                },
            );
        },
        None,
    )
}

/// Keeps a CPAL stream alive until stopped.
struct CpalStreamHandle {
    stream: Option<Stream>,
}

impl StreamHandle for CpalStreamHandle {
    fn stop(&mut self) -> Result<(), StreamPlaybackError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        // Dropping the stream releases the device even if pause fails
        stream
            .pause()
            .map_err(|e| StreamPlaybackError::BackendError(e.to_string()))
    }
}
