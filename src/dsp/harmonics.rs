//! Harmonic mapping: period, group and block to a set of partials.
//!
//! The fundamental comes from the period and the overtone series from the
//! group, so elements of one column share a spectral "colour" and elements of
//! one row share a pitch. How many overtones an element gets is a lookup on
//! its block. That mapping is a sonic stylization of the table layout, not
//! anything physical about the element.

use serde::Serialize;

use crate::config::{OvertoneTable, SynthConfig};
use crate::element::{Block, ElementRecord};
use crate::error::CueError;

/// One weighted overtone above the fundamental.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Overtone {
    /// Multiple of the overtone base frequency (1, 2, 3, …).
    pub multiplier: u32,
    pub frequency_hz: f64,
    pub weight: f64,
}

/// Partials of one element's cue. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarmonicProfile {
    pub fundamental_hz: f64,
    pub overtone_base_hz: f64,
    pub overtones: Vec<Overtone>,
}

impl HarmonicProfile {
    pub fn overtone_count(&self) -> usize {
        self.overtones.len()
    }

    /// Every partial as `(frequency_hz, weight)`, fundamental first at unit weight.
    pub fn partials(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        std::iter::once((self.fundamental_hz, 1.0))
            .chain(self.overtones.iter().map(|o| (o.frequency_hz, o.weight)))
    }
}

/// Maps element coordinates onto a [`HarmonicProfile`].
#[derive(Debug, Clone)]
pub struct HarmonicMapper {
    base_frequency_hz: f64,
    decay: Vec<f64>,
    table: OvertoneTable,
}

impl HarmonicMapper {
    pub fn new(config: &SynthConfig) -> Self {
        HarmonicMapper {
            base_frequency_hz: config.base_frequency_hz,
            decay: config.harmonic_decay_sequence.clone(),
            table: config.overtone_count_by_block,
        }
    }

    pub fn profile_for(&self, element: &ElementRecord) -> Result<HarmonicProfile, CueError> {
        self.profile(element.period(), element.group(), element.block())
    }

    pub fn profile(&self, period: u32, group: u32, block: Block) -> Result<HarmonicProfile, CueError> {
        if period == 0 {
            return Err(CueError::InvalidElementData(
                "period must be positive to derive a fundamental".to_string(),
            ));
        }
        if group == 0 {
            return Err(CueError::InvalidElementData(
                "group must be positive to derive an overtone".to_string(),
            ));
        }

        let fundamental_hz = period as f64 * self.base_frequency_hz;
        let overtone_base_hz = fundamental_hz * group as f64;
        let count = self.table.count(block);

        let overtones = (0..count)
            .map(|i| {
                let weight = self.decay.get(i).copied().ok_or_else(|| {
                    CueError::Synthesis(format!(
                        "{block} needs overtone {} but the decay sequence has {} weights",
                        i + 1,
                        self.decay.len()
                    ))
                })?;
                let multiplier = i as u32 + 1;
                Ok(Overtone {
                    multiplier,
                    frequency_hz: multiplier as f64 * overtone_base_hz,
                    weight,
                })
            })
            .collect::<Result<Vec<_>, CueError>>()?;

        Ok(HarmonicProfile {
            fundamental_hz,
            overtone_base_hz,
            overtones,
        })
    }
}
