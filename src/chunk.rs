//! Fixed-size audio chunks and the items carried by the chunk queue.

use std::time::Duration;

/// Bytes per 16-bit sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// A fixed-length slice of mono 16-bit audio cut from a
/// [`SampleBuffer`](crate::SampleBuffer).
///
/// Every chunk of a stream has the same length. The final chunk of a pass is
/// zero-padded; [`valid_samples()`](Chunk::valid_samples) tells how many
/// leading samples are real audio.
///
/// # Example
///
/// ```
/// use stream_playback::Chunk;
///
/// let chunk = Chunk::new(vec![7i16; 2], 4, 0, 2048);
/// assert_eq!(chunk.samples(), &[7, 7, 0, 0]);
/// assert_eq!(chunk.valid_samples(), 2);
/// assert_eq!(chunk.byte_len(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    samples: Box<[i16]>,
    valid_samples: usize,
    pass: u64,
    start_sample: usize,
}

impl Chunk {
    /// Creates a chunk of exactly `len` samples from `samples`, zero-padding
    /// the tail when fewer are supplied.
    ///
    /// Samples beyond `len` are discarded.
    pub fn new(mut samples: Vec<i16>, len: usize, pass: u64, start_sample: usize) -> Self {
        samples.truncate(len);
        let valid_samples = samples.len();
        samples.resize(len, 0);

        Self {
            samples: samples.into_boxed_slice(),
            valid_samples,
            pass,
            start_sample,
        }
    }

    /// Creates a chunk by copying `slice`, padded with zeros to `len`.
    pub fn from_slice(slice: &[i16], len: usize, pass: u64, start_sample: usize) -> Self {
        let mut samples = Vec::with_capacity(len);
        samples.extend_from_slice(&slice[..slice.len().min(len)]);
        Self::new(samples, len, pass, start_sample)
    }

    /// All samples, including padding.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// The unpadded prefix: the samples that came from the source buffer.
    pub fn real_samples(&self) -> &[i16] {
        &self.samples[..self.valid_samples]
    }

    /// Number of samples that came from the source buffer.
    pub fn valid_samples(&self) -> usize {
        self.valid_samples
    }

    /// Returns `true` if the chunk was zero-padded.
    pub fn is_padded(&self) -> bool {
        self.valid_samples < self.samples.len()
    }

    /// Number of samples, including padding.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if this chunk contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Size of the chunk on the wire: two bytes per sample.
    pub fn byte_len(&self) -> usize {
        self.samples.len() * BYTES_PER_SAMPLE
    }

    /// Loop pass this chunk belongs to (0 for the first pass).
    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// Index of the first sample of this chunk within the source buffer.
    pub fn start_sample(&self) -> usize {
        self.start_sample
    }

    /// Position of this chunk from the start of its pass.
    pub fn position(&self, sample_rate: u32) -> Duration {
        if sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.start_sample as f64 / f64::from(sample_rate))
    }

    /// Serializes the samples as little-endian 16-bit PCM.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.byte_len()];
        crate::format::write_le_bytes(&self.samples, &mut bytes);
        bytes
    }
}

/// An entry in the [`ChunkQueue`](crate::ChunkQueue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    /// A chunk of audio.
    Chunk(Chunk),
    /// No more chunks follow for the current pass.
    EndOfPass,
}

impl QueueItem {
    /// Returns `true` for the end-of-pass marker.
    pub fn is_end_of_pass(&self) -> bool {
        matches!(self, Self::EndOfPass)
    }

    /// Returns the chunk, if this item carries one.
    pub fn into_chunk(self) -> Option<Chunk> {
        match self {
            Self::Chunk(chunk) => Some(chunk),
            Self::EndOfPass => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_chunk_not_padded() {
        let chunk = Chunk::new(vec![1, 2, 3, 4], 4, 0, 0);
        assert!(!chunk.is_padded());
        assert_eq!(chunk.real_samples(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_short_chunk_zero_padded() {
        let chunk = Chunk::from_slice(&[5, 6], 1024, 0, 2048);
        assert_eq!(chunk.len(), 1024);
        assert_eq!(chunk.valid_samples(), 2);
        assert!(chunk.is_padded());
        assert_eq!(&chunk.samples()[..2], &[5, 6]);
        assert!(chunk.samples()[2..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_oversized_input_truncated() {
        let chunk = Chunk::from_slice(&[1, 2, 3, 4, 5], 3, 0, 0);
        assert_eq!(chunk.samples(), &[1, 2, 3]);
        assert_eq!(chunk.valid_samples(), 3);
    }

    #[test]
    fn test_byte_len_is_twice_samples() {
        let chunk = Chunk::new(vec![0; 1024], 1024, 0, 0);
        assert_eq!(chunk.byte_len(), 2048);
        assert_eq!(chunk.to_le_bytes().len(), 2048);
    }

    #[test]
    fn test_to_le_bytes() {
        let chunk = Chunk::new(vec![0x0102, -1], 2, 0, 0);
        assert_eq!(chunk.to_le_bytes(), vec![0x02, 0x01, 0xFF, 0xFF]);
    }

    #[test]
    fn test_position() {
        let chunk = Chunk::new(vec![0; 4], 4, 1, 44100);
        assert_eq!(chunk.position(44100), Duration::from_secs(1));
        assert_eq!(chunk.position(0), Duration::ZERO);
        assert_eq!(chunk.pass(), 1);
    }

    #[test]
    fn test_queue_item_helpers() {
        assert!(QueueItem::EndOfPass.is_end_of_pass());
        assert!(QueueItem::EndOfPass.into_chunk().is_none());

        let item = QueueItem::Chunk(Chunk::new(vec![1], 1, 0, 0));
        assert!(!item.is_end_of_pass());
        assert_eq!(item.into_chunk().unwrap().samples(), &[1]);
    }
}
