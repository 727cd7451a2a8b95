//! Audio file decoding to mono 16-bit samples.

use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;

use symphonia::core::audio::SampleBuffer as DecodedSamples;
use symphonia::core::codecs::{CodecRegistry, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia_adapter_libopus::OpusDecoder;

use crate::format::downmix_to_mono;
use crate::{SampleBuffer, StreamPlaybackError};

/// File extensions accepted for playback (lowercase, without the dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a", "aac", "wma", "opus"];

/// Symphonia's bundled codecs plus Opus through libopus.
fn codec_registry() -> &'static CodecRegistry {
    static REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = CodecRegistry::new();
        symphonia::default::register_enabled_codecs(&mut registry);
        registry.register_all::<OpusDecoder>();
        registry
    })
}

/// Turns an audio file into a [`SampleBuffer`].
///
/// Implementations mix multi-channel audio down to mono before returning.
pub trait Decoder: Send + Sync {
    /// Decodes the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the path does not exist, `UnsupportedFormat`
    /// for an unrecognized extension, and `Decode` if the contents can't be
    /// decoded.
    fn decode(&self, path: &Path) -> Result<SampleBuffer, StreamPlaybackError>;
}

/// Checks that `path` exists and has a supported extension.
///
/// Runs before any decoding or device work, so bad input fails fast.
///
/// # Errors
///
/// Returns `FileNotFound` or `UnsupportedFormat`.
pub fn check_input(path: &Path) -> Result<(), StreamPlaybackError> {
    if !path.exists() {
        return Err(StreamPlaybackError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(StreamPlaybackError::UnsupportedFormat {
            extension: format!(".{extension}"),
        });
    }

    Ok(())
}

/// Decoder backed by Symphonia.
///
/// Handles WAV, FLAC, MP3, Ogg Vorbis, Ogg Opus, AAC and M4A. WMA passes
/// the extension check but has no decoder, so it fails with `Decode`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    /// Creates a decoder.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<SampleBuffer, StreamPlaybackError> {
        check_input(path)?;

        let file = File::open(path).map_err(|e| StreamPlaybackError::io(path, e))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| StreamPlaybackError::decode(path, e.to_string()))?;

        let mut format = probed.format;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| StreamPlaybackError::decode(path, "no audio track found"))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut decoder = codec_registry()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| StreamPlaybackError::decode(path, e.to_string()))?;

        let mut mono: Vec<i16> = Vec::new();
        let mut skipped_packets = 0u64;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                // End of stream
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(StreamPlaybackError::decode(path, e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate.get_or_insert(spec.rate);

                    let mut samples = DecodedSamples::<i16>::new(decoded.capacity() as u64, spec);
                    samples.copy_interleaved_ref(decoded);
                    mono.extend(downmix_to_mono(samples.samples(), spec.channels.count()));
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    skipped_packets += 1;
                    tracing::debug!("Skipping undecodable packet in {}: {}", path.display(), e);
                }
                Err(e) => return Err(StreamPlaybackError::decode(path, e.to_string())),
            }
        }

        if skipped_packets > 0 {
            tracing::warn!(
                "Skipped {} corrupt packets while decoding {}",
                skipped_packets,
                path.display()
            );
        }

        let sample_rate =
            sample_rate.ok_or_else(|| StreamPlaybackError::decode(path, "unknown sample rate"))?;

        tracing::debug!(
            "Decoded {}: {} samples at {}Hz",
            path.display(),
            mono.len(),
            sample_rate
        );

        SampleBuffer::new(mono, sample_rate)
    }
}

/// Decodes `path` with the default decoder.
///
/// # Errors
///
/// See [`Decoder::decode`].
pub fn decode_file(path: impl AsRef<Path>) -> Result<SampleBuffer, StreamPlaybackError> {
    SymphoniaDecoder::new().decode(path.as_ref())
}
