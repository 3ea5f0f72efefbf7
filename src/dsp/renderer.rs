//! Cue renderer: element to shaped samples, and samples to WAV.

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use super::buffer::SampleBuffer;
use super::envelope::EnvelopeShaper;
use super::harmonics::{HarmonicMapper, HarmonicProfile};
use super::synth::Synthesizer;
use crate::config::SynthConfig;
use crate::element::{Block, ElementRecord};
use crate::error::{CueError, ExportError};

/// Mapper → synthesizer → shaper, built once per run from the synth config.
#[derive(Debug, Clone)]
pub struct CueRenderer {
    mapper: HarmonicMapper,
    synth: Synthesizer,
    shaper: EnvelopeShaper,
}

impl CueRenderer {
    pub fn new(config: &SynthConfig) -> Self {
        CueRenderer {
            mapper: HarmonicMapper::new(config),
            synth: Synthesizer::new(config),
            shaper: EnvelopeShaper::new(config),
        }
    }

    /// Render one element's cue. A fresh buffer per call, shaped in place.
    pub fn render(&self, element: &ElementRecord) -> Result<SampleBuffer, CueError> {
        let profile = self.mapper.profile_for(element)?;
        self.render_profile(&profile)
    }

    /// Same as [`render`](Self::render) from bare coordinates.
    pub fn render_coordinates(&self, period: u32, group: u32, block: Block) -> Result<SampleBuffer, CueError> {
        let profile = self.mapper.profile(period, group, block)?;
        self.render_profile(&profile)
    }

    pub fn render_profile(&self, profile: &HarmonicProfile) -> Result<SampleBuffer, CueError> {
        let mut buffer = self.synth.render(profile);
        self.shaper.shape(&mut buffer)?;
        Ok(buffer)
    }
}

fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn write_pcm<W: Write + Seek>(writer: W, buffer: &SampleBuffer) -> Result<(), hound::Error> {
    let mut wav = hound::WavWriter::new(writer, wav_spec(buffer.sample_rate()))?;
    for sample in buffer.to_pcm_i16() {
        wav.write_sample(sample)?;
    }
    wav.finalize()
}

/// Encode a buffer as a 16-bit mono PCM WAV byte array.
pub fn encode_wav(buffer: &SampleBuffer) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = Cursor::new(Vec::with_capacity(44 + buffer.len() * 2));
    write_pcm(&mut cursor, buffer)?;
    Ok(cursor.into_inner())
}

/// Write a buffer to `path` as 16-bit mono PCM WAV, replacing any old file.
pub fn write_wav(path: &Path, buffer: &SampleBuffer) -> Result<(), ExportError> {
    let file = std::fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_pcm(std::io::BufWriter::new(file), buffer).map_err(|source| ExportError::Wav {
        path: path.to_path_buf(),
        source,
    })
}
