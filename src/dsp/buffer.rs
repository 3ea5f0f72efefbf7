//! SampleBuffer: one element's mono signal, owned by a single render.

/// Mono f64 samples at a fixed sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    samples: Vec<f64>,
}

impl SampleBuffer {
    pub fn new(sample_rate: u32, samples: Vec<f64>) -> Self {
        SampleBuffer {
            sample_rate,
            samples,
        }
    }

    pub fn silent(sample_rate: u32, len: usize) -> Self {
        SampleBuffer::new(sample_rate, vec![0.0; len])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f64] {
        &mut self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value. NaN if any sample is NaN.
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0_f64, |m, &s| {
            if s.is_nan() || m.is_nan() { f64::NAN } else { m.max(s.abs()) }
        })
    }

    /// Multiply every sample by the matching entry of `gains`.
    ///
    /// `gains` must have the buffer's length; extra entries are ignored.
    pub fn apply_gains(&mut self, gains: impl IntoIterator<Item = f64>) {
        for (s, g) in self.samples.iter_mut().zip(gains) {
            *s *= g;
        }
    }

    pub fn scale(&mut self, gain: f64) {
        for s in &mut self.samples {
            *s *= gain;
        }
    }

    /// Clamp into `[-limit, limit]`. Never wraps.
    pub fn clamp(&mut self, limit: f64) {
        for s in &mut self.samples {
            *s = s.clamp(-limit, limit);
        }
    }

    /// Convert to 16-bit PCM, clamping to the representable range.
    pub fn to_pcm_i16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|&s| (s * 32767.0).round().clamp(-32768.0, 32767.0) as i16)
            .collect()
    }

    /// Convert to f32 for WebAudio playback.
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples.iter().map(|&s| s as f32).collect()
    }
}
