//! Envelope shaping: taper window, exponential decay, output level.

use std::f64::consts::PI;

use super::buffer::SampleBuffer;
use super::synth::time_vector;
use crate::config::{NormalizationPolicy, SynthConfig};
use crate::error::CueError;

/// Full-scale limit of the export container.
pub const CONTAINER_LIMIT: f64 = 1.0;

/// Symmetric Tukey (tapered cosine) window of length `n`.
///
/// `alpha` is the fraction of the window inside the cosine tapers, split
/// evenly between both ends. `alpha <= 0` gives a rectangle, `alpha >= 1`
/// a Hann window.
pub fn tukey_window(n: usize, alpha: f64) -> Vec<f64> {
    if n <= 1 || alpha <= 0.0 {
        return vec![1.0; n];
    }
    let m = (n - 1) as f64;
    if alpha >= 1.0 {
        return (0..n)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / m).cos())
            .collect();
    }

    let width = (alpha * m / 2.0).floor() as usize;
    (0..n)
        .map(|i| {
            let x = i as f64;
            if i <= width {
                0.5 * (1.0 + (PI * (-1.0 + 2.0 * x / alpha / m)).cos())
            } else if i >= n - width - 1 {
                0.5 * (1.0 + (PI * (-2.0 / alpha + 1.0 + 2.0 * x / alpha / m)).cos())
            } else {
                1.0
            }
        })
        .collect()
}

/// `exp(-t / tau)`.
pub fn exponential_decay(t: f64, tau: f64) -> f64 {
    (-t / tau).exp()
}

/// Shapes a raw synthesized buffer into a bounded, export-ready cue.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeShaper {
    taper: f64,
    decay_sec: f64,
    duration: f64,
    volume: f64,
    policy: NormalizationPolicy,
}

impl EnvelopeShaper {
    pub fn new(config: &SynthConfig) -> Self {
        EnvelopeShaper {
            taper: config.taper_fraction(),
            decay_sec: config.envelope_decay_sec,
            duration: config.duration_seconds,
            volume: config.output_volume,
            policy: config.normalization,
        }
    }

    /// Window, decay, normalize, clamp. Operates in place.
    pub fn shape(&self, buffer: &mut SampleBuffer) -> Result<(), CueError> {
        let n = buffer.len();
        buffer.apply_gains(tukey_window(n, self.taper));
        buffer.apply_gains(time_vector(n, self.duration).map(|t| exponential_decay(t, self.decay_sec)));

        match self.policy {
            NormalizationPolicy::Peak => {
                let peak = buffer.peak();
                if !(peak.is_finite() && peak > 0.0) {
                    return Err(CueError::Normalization(format!(
                        "cannot peak-normalize a buffer with peak {peak}"
                    )));
                }
                for s in buffer.samples_mut() {
                    *s = *s / peak * self.volume;
                }
            }
            NormalizationPolicy::Fixed => {
                if buffer.samples().iter().any(|s| !s.is_finite()) {
                    return Err(CueError::Normalization(
                        "buffer contains non-finite samples".to_string(),
                    ));
                }
                buffer.scale(self.volume);
            }
        }

        buffer.clamp(CONTAINER_LIMIT);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::harmonics::HarmonicMapper;
    use crate::dsp::synth::Synthesizer;
    use crate::element::Block;

    fn small_config() -> SynthConfig {
        SynthConfig {
            sample_rate_hz: 8000,
            duration_seconds: 1.0,
            envelope_attack_sec: 0.1,
            ..SynthConfig::default()
        }
    }

    fn rendered(config: &SynthConfig, block: Block) -> SampleBuffer {
        let profile = HarmonicMapper::new(config).profile(3, 15, block).unwrap();
        Synthesizer::new(config).render(&profile)
    }

    #[test]
    fn tukey_edges_and_plateau() {
        let w = tukey_window(101, 0.2);
        assert!(w[0].abs() < 1e-12);
        assert!(w[100].abs() < 1e-12);
        assert_eq!(w[50], 1.0);
        for i in 0..101 {
            assert!((w[i] - w[100 - i]).abs() < 1e-12, "not symmetric at {i}");
            assert!((0.0..=1.0).contains(&w[i]));
        }
    }

    #[test]
    fn tukey_degenerate_shapes() {
        assert_eq!(tukey_window(5, 0.0), vec![1.0; 5]);
        assert_eq!(tukey_window(1, 0.5), vec![1.0]);
        assert!(tukey_window(0, 0.5).is_empty());
        let hann = tukey_window(5, 1.0);
        let expected = [0.0, 0.5, 1.0, 0.5, 0.0];
        for (a, b) in hann.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn tukey_taper_is_monotonic_rise() {
        let w = tukey_window(1000, 0.3);
        let width = (0.3 * 999.0 / 2.0) as usize;
        assert!(w[..=width].windows(2).all(|p| p[1] >= p[0]));
    }

    #[test]
    fn decay_follows_time_constant() {
        assert_eq!(exponential_decay(0.0, 0.5), 1.0);
        assert!((exponential_decay(0.5, 0.5) - (-1.0_f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn peak_policy_hits_output_volume() {
        let config = small_config();
        let mut buf = rendered(&config, Block::P);
        EnvelopeShaper::new(&config).shape(&mut buf).unwrap();
        let peak = buf.peak();
        assert!(peak <= config.output_ceiling(), "peak {peak} above ceiling");
        assert!((peak - 0.3).abs() < 1e-12);
    }

    #[test]
    fn every_block_stays_under_ceiling() {
        let config = small_config();
        let shaper = EnvelopeShaper::new(&config);
        for block in Block::ALL {
            let mut buf = rendered(&config, block);
            shaper.shape(&mut buf).unwrap();
            assert!(buf.peak() <= config.output_ceiling());
            assert_eq!(buf.len(), config.sample_count());
        }
    }

    #[test]
    fn fixed_policy_scales_without_normalizing() {
        let config = SynthConfig {
            normalization: NormalizationPolicy::Fixed,
            ..small_config()
        };
        let raw = rendered(&config, Block::S);
        let mut shaped = raw.clone();
        EnvelopeShaper::new(&config).shape(&mut shaped).unwrap();
        // The fundamental alone never exceeds 1, so the fixed gain bounds the result.
        assert!(shaped.peak() <= 0.3 + 1e-12);
        assert!(shaped.peak() < raw.peak());
        assert!(shaped.peak() <= config.output_ceiling());
    }

    #[test]
    fn fixed_policy_clamps_to_container() {
        let config = SynthConfig {
            normalization: NormalizationPolicy::Fixed,
            output_volume: 1.0,
            envelope_attack_sec: 0.0,
            envelope_decay_sec: 1e9,
            ..small_config()
        };
        let mut buf = SampleBuffer::new(8000, vec![3.0; 8000]);
        EnvelopeShaper::new(&config).shape(&mut buf).unwrap();
        assert_eq!(buf.peak(), 1.0);
    }

    #[test]
    fn silent_buffer_fails_peak_normalization() {
        let config = small_config();
        let mut buf = SampleBuffer::silent(8000, 8000);
        let err = EnvelopeShaper::new(&config).shape(&mut buf).unwrap_err();
        assert!(matches!(err, CueError::Normalization(_)));
    }

    #[test]
    fn edges_are_faded() {
        let config = small_config();
        let mut buf = rendered(&config, Block::D);
        EnvelopeShaper::new(&config).shape(&mut buf).unwrap();
        assert_eq!(buf.samples()[0], 0.0);
        assert!(buf.samples()[buf.len() - 1].abs() < 1e-12);
    }
}
