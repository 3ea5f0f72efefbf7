use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Per-element failure. None of these abort a batch run.
#[derive(Debug)]
pub enum CueError {
    /// Missing or non-positive period/group, unknown block, duplicate key.
    InvalidElementData(String),
    /// Configuration bug detected while mapping or synthesizing.
    Synthesis(String),
    /// The shaped buffer had no usable peak (all zero or non-finite).
    Normalization(String),
    Export(ExportError),
    /// The task rendering this element panicked or was cancelled.
    Worker(String),
}

/// Failure while writing, encoding or cleaning up one element's assets.
#[derive(Debug)]
pub enum ExportError {
    Io { path: PathBuf, source: io::Error },
    Wav { path: PathBuf, source: hound::Error },
    EncoderMissing { program: String },
    EncoderFailed { code: Option<i32>, stderr: String },
    EncoderTimeout { after: Duration },
    MissingOutput { path: PathBuf },
    Cleanup { path: PathBuf, source: io::Error },
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse { message: String, line: usize, column: usize },
    Invalid(String),
}

/// Failure to read the element table. Fatal for the whole run.
#[derive(Debug)]
pub enum ProviderError {
    Io { path: PathBuf, source: io::Error },
    Csv(csv::Error),
}

impl CueError {
    /// Short machine-friendly category, used in summaries and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CueError::InvalidElementData(_) => "invalid_element_data",
            CueError::Synthesis(_) => "synthesis",
            CueError::Normalization(_) => "normalization",
            CueError::Export(_) => "export",
            CueError::Worker(_) => "worker",
        }
    }
}

impl fmt::Display for CueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CueError::InvalidElementData(msg) => write!(f, "Invalid element data: {msg}"),
            CueError::Synthesis(msg) => write!(f, "Synthesis error: {msg}"),
            CueError::Normalization(msg) => write!(f, "Normalization error: {msg}"),
            CueError::Export(e) => write!(f, "Export error: {e}"),
            CueError::Worker(msg) => write!(f, "Worker failure: {msg}"),
        }
    }
}

impl std::error::Error for CueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CueError::Export(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io { path, source } => {
                write!(f, "I/O failure at '{}': {source}", path.display())
            }
            ExportError::Wav { path, source } => {
                write!(f, "Could not write WAV '{}': {source}", path.display())
            }
            ExportError::EncoderMissing { program } => {
                write!(f, "Encoder '{program}' not found")
            }
            ExportError::EncoderFailed { code, stderr } => {
                match code {
                    Some(c) => write!(f, "Encoder exited with status {c}")?,
                    None => write!(f, "Encoder terminated by signal")?,
                }
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
            ExportError::EncoderTimeout { after } => {
                write!(f, "Encoder timed out after {:.1}s", after.as_secs_f64())
            }
            ExportError::MissingOutput { path } => {
                write!(f, "Encoder reported success but '{}' is missing", path.display())
            }
            ExportError::Cleanup { path, source } => {
                write!(f, "Could not remove intermediate '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io { source, .. } | ExportError::Cleanup { source, .. } => Some(source),
            ExportError::Wav { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Could not read config '{}': {source}", path.display())
            }
            ConfigError::Parse { message, line, column } => {
                write!(f, "Config parse error at {line}:{column}: {message}")
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Io { path, source } => {
                write!(f, "Could not open element table '{}': {source}", path.display())
            }
            ProviderError::Csv(e) => write!(f, "Malformed element table: {e}"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<ExportError> for CueError {
    fn from(e: ExportError) -> Self {
        CueError::Export(e)
    }
}

impl From<csv::Error> for ProviderError {
    fn from(e: csv::Error) -> Self {
        ProviderError::Csv(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse {
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
        }
    }
}
