//! Run configuration: the synthesis constant set and the export settings.
//!
//! Both halves deserialize from JSON with every field optional, so a config
//! file only needs to name what it overrides:
//!
//! ```json
//! { "synth": { "output_volume": 0.5 }, "export": { "workers": 4 } }
//! ```

use ariadne::{Color, Label, Report, ReportKind, Source};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::element::Block;
use crate::error::ConfigError;

/// How the envelope shaper sets the final output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationPolicy {
    /// Divide by the buffer peak, then scale by `output_volume`.
    #[default]
    Peak,
    /// Scale by `output_volume` only.
    Fixed,
}

/// Overtone count per block. A stylization, not chemistry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OvertoneTable {
    pub s: usize,
    pub p: usize,
    pub d: usize,
    pub f: usize,
}

impl OvertoneTable {
    pub fn count(&self, block: Block) -> usize {
        match block {
            Block::S => self.s,
            Block::P => self.p,
            Block::D => self.d,
            Block::F => self.f,
        }
    }

    pub fn max(&self) -> usize {
        Block::ALL.iter().map(|&b| self.count(b)).max().unwrap_or(0)
    }
}

impl Default for OvertoneTable {
    fn default() -> Self {
        OvertoneTable { s: 0, p: 3, d: 1, f: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub base_frequency_hz: f64,
    pub sample_rate_hz: u32,
    pub duration_seconds: f64,
    pub harmonic_decay_sequence: Vec<f64>,
    pub overtone_count_by_block: OvertoneTable,
    /// Length of the fade-in (and fade-out) taper.
    pub envelope_attack_sec: f64,
    /// Time constant of the exponential decay.
    pub envelope_decay_sec: f64,
    pub output_volume: f64,
    pub normalization: NormalizationPolicy,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            base_frequency_hz: 40.0,
            sample_rate_hz: 44_100,
            duration_seconds: 2.0,
            harmonic_decay_sequence: vec![0.5, 0.2, 0.1],
            overtone_count_by_block: OvertoneTable::default(),
            envelope_attack_sec: 0.2,
            envelope_decay_sec: 0.5,
            output_volume: 0.3,
            normalization: NormalizationPolicy::Peak,
        }
    }
}

impl SynthConfig {
    /// Number of samples in every rendered buffer.
    pub fn sample_count(&self) -> usize {
        (self.sample_rate_hz as f64 * self.duration_seconds).round() as usize
    }

    /// Tukey taper fraction: attack and release each span `envelope_attack_sec`.
    pub fn taper_fraction(&self) -> f64 {
        (2.0 * self.envelope_attack_sec / self.duration_seconds).clamp(0.0, 1.0)
    }

    /// Largest absolute sample value the shaper can emit.
    pub fn output_ceiling(&self) -> f64 {
        match self.normalization {
            NormalizationPolicy::Peak => self.output_volume.min(1.0),
            NormalizationPolicy::Fixed => 1.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("base_frequency_hz", self.base_frequency_hz),
            ("duration_seconds", self.duration_seconds),
            ("envelope_decay_sec", self.envelope_decay_sec),
            ("output_volume", self.output_volume),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::Invalid("sample_rate_hz must be positive".into()));
        }
        if self.sample_count() == 0 {
            return Err(ConfigError::Invalid(
                "sample_rate_hz * duration_seconds rounds to zero samples".into(),
            ));
        }
        if !(self.envelope_attack_sec.is_finite() && self.envelope_attack_sec >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "envelope_attack_sec must be >= 0, got {}",
                self.envelope_attack_sec
            )));
        }
        if self.output_volume > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "output_volume {} exceeds full scale (1.0)",
                self.output_volume
            )));
        }

        let decay = &self.harmonic_decay_sequence;
        if let Some(w) = decay.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
            return Err(ConfigError::Invalid(format!(
                "harmonic_decay_sequence contains invalid weight {w}"
            )));
        }
        if decay.windows(2).any(|pair| pair[1] > pair[0]) {
            return Err(ConfigError::Invalid(
                "harmonic_decay_sequence must be non-increasing".into(),
            ));
        }
        let needed = self.overtone_count_by_block.max();
        if decay.len() < needed {
            return Err(ConfigError::Invalid(format!(
                "harmonic_decay_sequence has {} weights but a block needs {needed} overtones",
                decay.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub encoder_program: String,
    /// Transcoder codec selector, e.g. `libmp3lame`.
    pub codec: String,
    /// VBR quality (`-qscale:a`); lower is better for LAME.
    pub quality: u8,
    /// Extension of the compressed asset.
    pub extension: String,
    pub encoder_timeout_secs: u64,
    pub workers: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            output_dir: PathBuf::from("sounds"),
            encoder_program: "ffmpeg".to_string(),
            codec: "libmp3lame".to_string(),
            quality: 1,
            extension: "mp3".to_string(),
            encoder_timeout_secs: 60,
            workers: 1,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.encoder_program.trim().is_empty() {
            return Err(ConfigError::Invalid("encoder_program is empty".into()));
        }
        if self.extension.is_empty() || !self.extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Invalid(format!(
                "extension '{}' must be non-empty ASCII alphanumerics",
                self.extension
            )));
        }
        if self.extension.eq_ignore_ascii_case("wav") {
            return Err(ConfigError::Invalid(
                "extension 'wav' would collide with the intermediate file".into(),
            ));
        }
        if self.encoder_timeout_secs == 0 {
            return Err(ConfigError::Invalid("encoder_timeout_secs must be positive".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub synth: SynthConfig,
    pub export: ExportConfig,
}

impl Config {
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.synth.validate()?;
        self.export.validate()
    }

    pub fn to_json_pretty(&self) -> String {
        // Plain structs of numbers and strings always serialize.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl ConfigError {
    /// Render the error against the config source, with a caret under the
    /// offending location for parse errors.
    pub fn render_report(&self, name: &str, source: &str) -> String {
        let mut out = Vec::new();
        let written = match self {
            ConfigError::Parse { message, line, column } => {
                let offset = line_col_to_offset(source, *line, *column);
                let span = offset..(offset + 1).min(source.len()).max(offset);
                Report::build(ReportKind::Error, (name, span.clone()))
                    .with_config(report_config())
                    .with_message("could not parse configuration")
                    .with_label(
                        Label::new((name, span))
                            .with_message(strip_position(message))
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((name, Source::from(source)), &mut out)
            }
            other => Report::build(ReportKind::Error, (name, 0..0))
                .with_config(report_config())
                .with_message(other.to_string())
                .finish()
                .write((name, Source::from(source)), &mut out),
        };
        match written {
            Ok(()) => String::from_utf8_lossy(&out).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

fn report_config() -> ariadne::Config {
    ariadne::Config::default()
        .with_color(false)
        .with_index_type(ariadne::IndexType::Byte)
}

/// serde_json appends " at line L column C"; the report shows that visually.
fn strip_position(message: &str) -> &str {
    match message.rfind(" at line ") {
        Some(idx) => &message[..idx],
        None => message,
    }
}

/// Byte offset of a 1-based line/column pair, clamped to the source.
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (i, text) in source.split_inclusive('\n').enumerate() {
        if i + 1 == line {
            let col = column.saturating_sub(1).min(text.len());
            return (offset + col).min(source.len());
        }
        offset += text.len();
    }
    source.len()
}
