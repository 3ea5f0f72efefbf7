//! Additive sine synthesis over a fixed time grid.

use std::f64::consts::PI;

use super::buffer::SampleBuffer;
use super::harmonics::HarmonicProfile;
use crate::config::SynthConfig;

/// `n` evenly spaced instants covering `[0, duration)`.
pub fn time_vector(n: usize, duration: f64) -> impl Iterator<Item = f64> {
    let step = if n == 0 { 0.0 } else { duration / n as f64 };
    (0..n).map(move |i| i as f64 * step)
}

/// Renders a [`HarmonicProfile`] into a raw, unshaped buffer.
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer {
    sample_rate: u32,
    duration: f64,
    len: usize,
}

impl Synthesizer {
    pub fn new(config: &SynthConfig) -> Self {
        Synthesizer {
            sample_rate: config.sample_rate_hz,
            duration: config.duration_seconds,
            len: config.sample_count(),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.len
    }

    /// Sum of `weight * sin(2π f t)` over the fundamental and every overtone.
    ///
    /// Pure: the same profile always yields the same bits.
    pub fn render(&self, profile: &HarmonicProfile) -> SampleBuffer {
        let mut buffer = SampleBuffer::silent(self.sample_rate, self.len);
        for (frequency, weight) in profile.partials() {
            let omega = 2.0 * PI * frequency;
            for (s, t) in buffer
                .samples_mut()
                .iter_mut()
                .zip(time_vector(self.len, self.duration))
            {
                *s += weight * (omega * t).sin();
            }
        }
        buffer
    }
}
