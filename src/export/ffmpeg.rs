//! Transcoding through an external `ffmpeg`-compatible executable.

use log::debug;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{EncodeOptions, Encoder};
use crate::config::ExportConfig;
use crate::error::ExportError;

/// Longest stderr excerpt carried in an error.
const MAX_STDERR_CHARS: usize = 2000;

/// Runs `program` once per element and waits at most `timeout` for it.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: String,
    timeout: Duration,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        FfmpegEncoder {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        FfmpegEncoder::new(
            config.encoder_program.clone(),
            Duration::from_secs(config.encoder_timeout_secs),
        )
    }
}

impl Encoder for FfmpegEncoder {
    async fn transcode(&self, input: &Path, output: &Path, options: &EncodeOptions) -> Result<(), ExportError> {
        let args = options.args(input, output);
        debug!("{} {:?}", self.program, args);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    ExportError::EncoderMissing {
                        program: self.program.clone(),
                    }
                } else {
                    ExportError::Io {
                        path: self.program.clone().into(),
                        source,
                    }
                }
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExportError::EncoderTimeout { after: self.timeout })?;
        let out = result.map_err(|source| ExportError::Io {
            path: self.program.clone().into(),
            source,
        })?;

        if out.status.success() {
            Ok(())
        } else {
            let stderr: String = String::from_utf8_lossy(&out.stderr)
                .chars()
                .take(MAX_STDERR_CHARS)
                .collect();
            Err(ExportError::EncoderFailed {
                code: out.status.code(),
                stderr,
            })
        }
    }
}
