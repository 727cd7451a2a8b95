//! Sample format and channel conversion.

/// Converts an f32 sample to i16.
///
/// Input should be in the range [-1.0, 1.0].
/// Values outside this range are clamped.
///
/// Scales by 32767 (not 32768), so -1.0 maps to -32767.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Converts an i16 sample to f32 in the range [-1.0, 1.0].
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Mixes interleaved multi-channel samples down to mono by averaging each frame.
///
/// A trailing partial frame is ignored. `channels` of 0 or 1 returns the
/// input unchanged.
pub fn downmix_to_mono(interleaved: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| {
            // Sum in i32 to avoid overflow
            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Writes `samples` into `out` as little-endian 16-bit PCM.
///
/// Writes `min(samples.len(), out.len() / 2)` samples and returns that count.
pub fn write_le_bytes(samples: &[i16], out: &mut [u8]) -> usize {
    let mut written = 0;
    for (sample, dst) in samples.iter().zip(out.chunks_exact_mut(2)) {
        dst.copy_from_slice(&sample.to_le_bytes());
        written += 1;
    }
    written
}
