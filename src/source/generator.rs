//! Synthetic test signals.

use std::f64::consts::PI;
use std::time::Duration;

use crate::{SampleBuffer, StreamPlaybackError};

/// Sample rate used for the standard test files.
pub const TEST_SIGNAL_SAMPLE_RATE: u32 = 44100;

/// Full-scale amplitude for generated 16-bit samples.
const FULL_SCALE: f64 = 32767.0;

/// Fade applied to each melody note, in milliseconds.
const NOTE_FADE_MS: u64 = 50;

/// Notes of the test melody: (frequency Hz, duration ms).
const MELODY: &[(f64, u64)] = &[
    (440.0, 500),  // A
    (494.0, 500),  // B
    (523.0, 500),  // C
    (587.0, 500),  // D
    (659.0, 500),  // E
    (587.0, 500),  // D
    (523.0, 500),  // C
    (494.0, 500),  // B
    (440.0, 1000), // A (long)
];

/// Builds mono test audio one segment at a time.
///
/// Produces deterministic signals for exercising the pipeline without
/// audio files, and feeds the `generate-test-audio` tool.
///
/// # Example
///
/// ```
/// use stream_playback::source::SignalGenerator;
///
/// let mut generator = SignalGenerator::new(16000);
///
/// // 100ms of silence, then 100ms of a 440Hz sine wave
/// generator.silence(100);
/// generator.sine(440.0, 100, 1.0);
///
/// assert_eq!(generator.samples().len(), 3200);
/// ```
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    sample_rate: u32,
    samples: Vec<i16>,
}

impl SignalGenerator {
    /// Creates an empty generator at the given sample rate.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: Vec::new(),
        }
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Appends silence for the given duration in milliseconds.
    pub fn silence(&mut self, duration_ms: u64) -> &mut Self {
        let num_samples = self.samples_for_duration(duration_ms);
        self.samples.resize(self.samples.len() + num_samples, 0);
        self
    }

    /// Appends a sine wave. `amplitude` is a fraction of full scale.
    pub fn sine(&mut self, frequency: f64, duration_ms: u64, amplitude: f64) -> &mut Self {
        let num_samples = self.samples_for_duration(duration_ms);
        let sample_rate = f64::from(self.sample_rate);

        for i in 0..num_samples {
            let t = i as f64 / sample_rate;
            let value = (2.0 * PI * frequency * t).sin();
            self.samples.push(to_sample(value * amplitude));
        }
        self
    }

    /// Appends a logarithmic frequency sweep from `start_hz` to `end_hz`.
    pub fn log_sweep(&mut self, start_hz: f64, end_hz: f64, duration_ms: u64, amplitude: f64) -> &mut Self {
        let num_samples = self.samples_for_duration(duration_ms);
        let sample_rate = f64::from(self.sample_rate);
        let duration = duration_ms as f64 / 1000.0;
        let ratio = end_hz / start_hz;
        let k = duration / ratio.ln();

        for i in 0..num_samples {
            let t = i as f64 / sample_rate;
            // Instantaneous frequency start_hz * ratio^(t / duration)
            let phase = 2.0 * PI * start_hz * k * (ratio.powf(t / duration) - 1.0);
            self.samples.push(to_sample(phase.cos() * amplitude));
        }
        self
    }

    /// Appends deterministic white noise.
    pub fn noise(&mut self, duration_ms: u64, amplitude: f64) -> &mut Self {
        let num_samples = self.samples_for_duration(duration_ms);
        let amplitude = (amplitude * FULL_SCALE) as i16;

        // Simple LCG for deterministic "random" noise
        let mut seed: u32 = 12345;
        for _ in 0..num_samples {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let random = ((seed >> 16) as i32 - 32768) as i16;
            let sample = (i32::from(random) * i32::from(amplitude) / 32767) as i16;
            self.samples.push(sample);
        }
        self
    }

    /// Appends a sine note with linear fade-in and fade-out.
    pub fn note(&mut self, frequency: f64, duration_ms: u64, fade_ms: u64) -> &mut Self {
        let start = self.samples.len();
        self.sine(frequency, duration_ms, 1.0);

        let note = &mut self.samples[start..];
        let fade = ((u64::from(self.sample_rate) * fade_ms / 1000) as usize).min(note.len() / 2);
        if fade == 0 {
            return self;
        }
        let len = note.len();
        for i in 0..fade {
            let gain = i as f64 / fade as f64;
            note[i] = (f64::from(note[i]) * gain) as i16;
            note[len - 1 - i] = (f64::from(note[len - 1 - i]) * gain) as i16;
        }
        self
    }

    /// Appends three 800Hz beeps separated by short gaps, then a second of silence.
    pub fn beep_pattern(&mut self) -> &mut Self {
        for i in 0..3 {
            if i > 0 {
                self.silence(300);
            }
            self.sine(800.0, 200, 1.0);
        }
        self.silence(1000)
    }

    /// Appends the A-B-C-D-E-D-C-B-A test melody.
    pub fn melody(&mut self) -> &mut Self {
        for &(frequency, duration_ms) in MELODY {
            self.note(frequency, duration_ms, NOTE_FADE_MS);
        }
        self
    }

    /// Appends a voice-like signal: a 200Hz tone with vibrato and harmonics
    /// under a rise-and-decay envelope, peaking at 70% of full scale.
    pub fn voice(&mut self, duration_ms: u64) -> &mut Self {
        const BASE_HZ: f64 = 200.0;
        const VIBRATO_HZ: f64 = 5.0;
        const VIBRATO_DEPTH_HZ: f64 = 10.0;

        let num_samples = self.samples_for_duration(duration_ms);
        let sample_rate = f64::from(self.sample_rate);

        let mut phase = 0.0;
        let raw: Vec<f64> = (0..num_samples)
            .map(|i| {
                let t = i as f64 / sample_rate;
                let frequency = BASE_HZ + VIBRATO_DEPTH_HZ * (2.0 * PI * VIBRATO_HZ * t).sin();
                phase += 2.0 * PI * frequency / sample_rate;

                let tone = phase.sin() + 0.3 * (2.0 * phase).sin() + 0.2 * (3.0 * phase).sin();
                let envelope = (-t * 0.5).exp() * (1.0 - (-t * 10.0).exp());
                tone * envelope
            })
            .collect();

        let peak = raw.iter().fold(0.0f64, |max, v| max.max(v.abs()));
        if peak > 0.0 {
            self.samples
                .extend(raw.iter().map(|v| to_sample(v / peak * 0.7)));
        } else {
            self.samples.resize(self.samples.len() + num_samples, 0);
        }
        self
    }

    /// Appends raw samples directly.
    pub fn add_samples(&mut self, samples: &[i16]) -> &mut Self {
        self.samples.extend_from_slice(samples);
        self
    }

    /// Appends the current contents again, `times - 1` more times.
    pub fn repeat(&mut self, times: usize) -> &mut Self {
        let pattern = self.samples.clone();
        for _ in 1..times {
            self.samples.extend_from_slice(&pattern);
        }
        self
    }

    /// Takes all accumulated samples, clearing the internal buffer.
    pub fn take_samples(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.samples)
    }

    /// Returns a reference to the accumulated samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Returns the duration of accumulated samples.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Converts the accumulated samples into a [`SampleBuffer`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidSampleRate` if the generator was created with rate 0.
    pub fn into_buffer(self) -> Result<SampleBuffer, StreamPlaybackError> {
        SampleBuffer::new(self.samples, self.sample_rate)
    }

    fn samples_for_duration(&self, duration_ms: u64) -> usize {
        (u64::from(self.sample_rate) * duration_ms / 1000) as usize
    }
}

/// A named test signal, written to `<name>.wav` by `generate-test-audio`.
#[derive(Debug, Clone)]
pub struct TestSignal {
    /// File stem.
    pub name: &'static str,
    /// What the signal sounds like.
    pub description: &'static str,
    /// The audio.
    pub buffer: SampleBuffer,
}

/// The standard set of test files.
///
/// # Errors
///
/// Never fails in practice; the sample rate is a non-zero constant.
pub fn standard_test_signals() -> Result<Vec<TestSignal>, StreamPlaybackError> {
    let rate = TEST_SIGNAL_SAMPLE_RATE;

    let mut tone = SignalGenerator::new(rate);
    tone.sine(440.0, 3000, 1.0);

    let mut beeps = SignalGenerator::new(rate);
    beeps.beep_pattern().repeat(2);

    let mut sweep = SignalGenerator::new(rate);
    sweep.log_sweep(100.0, 2000.0, 5000, 0.5);

    let mut music = SignalGenerator::new(rate);
    music.melody();

    let mut voice = SignalGenerator::new(rate);
    voice.voice(3000);

    Ok(vec![
        TestSignal {
            name: "test_tone",
            description: "Simple 440Hz tone",
            buffer: tone.into_buffer()?,
        },
        TestSignal {
            name: "test_beeps",
            description: "Beep pattern for testing",
            buffer: beeps.into_buffer()?,
        },
        TestSignal {
            name: "test_sweep",
            description: "Frequency sweep",
            buffer: sweep.into_buffer()?,
        },
        TestSignal {
            name: "test_music",
            description: "Simple melody",
            buffer: music.into_buffer()?,
        },
        TestSignal {
            name: "test_voice",
            description: "Voice-like modulated sound",
            buffer: voice.into_buffer()?,
        },
    ])
}

fn to_sample(value: f64) -> i16 {
    (value * FULL_SCALE).clamp(-FULL_SCALE - 1.0, FULL_SCALE) as i16
}
