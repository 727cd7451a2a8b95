//! Audio format utilities.
//!
//! - Sample format conversion (f32 ↔ i16)
//! - Channel downmixing (interleaved → mono)
//! - Little-endian PCM serialization
//! - 16-bit PCM WAV writing (via `hound`)

mod convert;
mod wav;

pub use convert::{downmix_to_mono, f32_to_i16, i16_to_f32, write_le_bytes};
pub use wav::{write_wav, WavWriter};
