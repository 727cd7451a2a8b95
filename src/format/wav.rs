//! 16-bit PCM WAV output, backed by `hound`.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::{SampleBuffer, StreamPlaybackError};

/// Writes 16-bit PCM audio to a WAV file.
///
/// Sizes in the header are filled in by [`finalize()`](WavWriter::finalize);
/// a writer dropped without finalizing still leaves a readable file.
///
/// # Example
///
/// ```no_run
/// use stream_playback::format::WavWriter;
///
/// let mut writer = WavWriter::create("tone.wav", 44100, 1)?;
/// writer.write_samples(&[0, 1000, 2000])?;
/// writer.finalize()?;
/// # Ok::<(), stream_playback::StreamPlaybackError>(())
/// ```
pub struct WavWriter {
    inner: hound::WavWriter<BufWriter<File>>,
    path: PathBuf,
    samples_written: u64,
}

impl WavWriter {
    /// Creates the file for interleaved audio with `channels` channels.
    ///
    /// # Errors
    ///
    /// Returns an `Io` error if the file cannot be created.
    pub fn create(
        path: impl AsRef<Path>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, StreamPlaybackError> {
        let path = path.as_ref().to_path_buf();
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let inner = hound::WavWriter::create(&path, spec).map_err(|e| wav_error(&path, e))?;

        Ok(Self {
            inner,
            path,
            samples_written: 0,
        })
    }

    /// Appends interleaved samples.
    ///
    /// # Errors
    ///
    /// Returns an `Io` error if the write fails.
    pub fn write_samples(&mut self, samples: &[i16]) -> Result<(), StreamPlaybackError> {
        let mut writer = self.inner.get_i16_writer(samples.len() as u32);
        for &sample in samples {
            writer.write_sample(sample);
        }
        writer.flush().map_err(|e| wav_error(&self.path, e))?;
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    /// Number of samples written so far, counting every channel.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Completes the header and closes the file.
    ///
    /// # Errors
    ///
    /// Returns an `Io` error if the header cannot be updated.
    pub fn finalize(self) -> Result<PathBuf, StreamPlaybackError> {
        let Self { inner, path, .. } = self;
        inner.finalize().map_err(|e| wav_error(&path, e))?;
        Ok(path)
    }
}

/// Writes a whole mono buffer to `path` as a WAV file.
///
/// # Errors
///
/// Returns an `Io` error if the file cannot be written.
pub fn write_wav(path: impl AsRef<Path>, buffer: &SampleBuffer) -> Result<PathBuf, StreamPlaybackError> {
    let mut writer = WavWriter::create(path, buffer.sample_rate(), 1)?;
    writer.write_samples(buffer.samples())?;
    writer.finalize()
}

fn wav_error(path: &Path, error: hound::Error) -> StreamPlaybackError {
    match error {
        hound::Error::IoError(e) => StreamPlaybackError::io(path, e),
        other => StreamPlaybackError::io(path, std::io::Error::other(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_back(path: &Path) -> (hound::WavSpec, Vec<i16>) {
        let mut reader = hound::WavReader::open(path).unwrap();
        let spec = reader.spec();
        let samples = reader.samples::<i16>().map(Result::unwrap).collect();
        (spec, samples)
    }

    #[test]
    fn test_mono_spec() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono.wav");

        let mut writer = WavWriter::create(&path, 44100, 1).unwrap();
        writer.write_samples(&[100, 200, 300]).unwrap();
        writer.finalize().unwrap();

        let (spec, samples) = read_back(&path);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(samples, vec![100, 200, 300]);
    }

    #[test]
    fn test_multiple_writes_accumulate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sizes.wav");

        let mut writer = WavWriter::create(&path, 16000, 1).unwrap();
        writer.write_samples(&[1, 2]).unwrap();
        writer.write_samples(&[3, 4, 5, 6]).unwrap();
        assert_eq!(writer.samples_written(), 6);
        let written = writer.finalize().unwrap();
        assert_eq!(written, path);

        let (_, samples) = read_back(&path);
        assert_eq!(samples, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_pcm_data_little_endian() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("le.wav");

        let buffer = SampleBuffer::new(vec![0x1234i16, 0x5678], 8000).unwrap();
        write_wav(&path, &buffer).unwrap();

        // Sample data is the last 4 bytes of the file
        let data = std::fs::read(&path).unwrap();
        assert_eq!(&data[data.len() - 4..], &[0x34, 0x12, 0x78, 0x56]);
    }

    #[test]
    fn test_stereo_interleaved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        let mut writer = WavWriter::create(&path, 8000, 2).unwrap();
        writer.write_samples(&[1, -1, 2, -2]).unwrap();
        writer.finalize().unwrap();

        let (spec, samples) = read_back(&path);
        assert_eq!(spec.channels, 2);
        assert_eq!(samples, vec![1, -1, 2, -2]);
    }

    #[test]
    fn test_invalid_path_error() {
        let result = WavWriter::create("/nonexistent/directory/test.wav", 16000, 1);
        let err = result.err().unwrap();
        assert!(matches!(err, StreamPlaybackError::Io { .. }));
        assert!(err.to_string().contains("nonexistent"));
    }
}
