//! Asset export: WAV intermediate, external transcode, cleanup.

pub mod ffmpeg;

use log::{debug, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::dsp::{SampleBuffer, write_wav};
use crate::error::ExportError;

pub use ffmpeg::FfmpegEncoder;

/// Transcoder settings passed through to every invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    pub codec: String,
    pub quality: u8,
    /// Linear gain for the transcoder's volume filter.
    pub volume: f64,
    pub overwrite: bool,
    pub quiet: bool,
}

impl EncodeOptions {
    /// The shaper already set the output level, so the filter stays at unity.
    pub fn from_config(config: &ExportConfig) -> Self {
        EncodeOptions {
            codec: config.codec.clone(),
            quality: config.quality,
            volume: 1.0,
            overwrite: true,
            quiet: true,
        }
    }

    /// Command-line arguments, in transcoder order:
    /// overwrite, input, codec, quality, verbosity, volume filter, output.
    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(13);
        args.push(if self.overwrite { "-y" } else { "-n" }.into());
        args.push("-i".into());
        args.push(input.as_os_str().to_owned());
        args.push("-codec:a".into());
        args.push(self.codec.as_str().into());
        args.push("-qscale:a".into());
        args.push(self.quality.to_string().into());
        if self.quiet {
            args.push("-v".into());
            args.push("0".into());
        }
        args.push("-af".into());
        args.push(format!("volume={}", self.volume).into());
        args.push(output.as_os_str().to_owned());
        args
    }
}

/// An external (or fake) audio transcoder.
pub trait Encoder: Send + Sync {
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        options: &EncodeOptions,
    ) -> impl Future<Output = Result<(), ExportError>> + Send;
}

/// A persisted compressed cue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioAsset {
    pub atomic_number: u32,
    pub path: PathBuf,
    pub bytes: u64,
    /// Hex SHA-256 of the compressed file.
    pub sha256: String,
}

/// Writes the WAV, runs the encoder, removes the WAV on success.
#[derive(Debug)]
pub struct AssetExporter<E> {
    output_dir: PathBuf,
    extension: String,
    options: EncodeOptions,
    encoder: E,
}

impl<E: Encoder> AssetExporter<E> {
    pub fn new(config: &ExportConfig, encoder: E) -> Self {
        AssetExporter {
            output_dir: config.output_dir.clone(),
            extension: config.extension.clone(),
            options: EncodeOptions::from_config(config),
            encoder,
        }
    }

    pub fn wav_path(&self, atomic_number: u32) -> PathBuf {
        self.output_dir.join(format!("sound-{atomic_number}.wav"))
    }

    pub fn asset_path(&self, atomic_number: u32) -> PathBuf {
        self.output_dir
            .join(format!("sound-{atomic_number}.{}", self.extension))
    }

    /// Export one element. On encoder failure the WAV stays on disk.
    pub async fn export(&self, buffer: &SampleBuffer, atomic_number: u32) -> Result<AudioAsset, ExportError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| ExportError::Io {
                path: self.output_dir.clone(),
                source,
            })?;

        let wav = self.wav_path(atomic_number);
        let out = self.asset_path(atomic_number);
        write_wav(&wav, buffer)?;
        debug!("wrote intermediate {}", wav.display());

        if let Err(e) = self.encoder.transcode(&wav, &out, &self.options).await {
            warn!(
                "encoding element {atomic_number} failed, keeping {}: {e}",
                wav.display()
            );
            return Err(e);
        }

        let data = match tokio::fs::read(&out).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExportError::MissingOutput { path: out });
            }
            Err(source) => return Err(ExportError::Io { path: out, source }),
        };

        tokio::fs::remove_file(&wav)
            .await
            .map_err(|source| ExportError::Cleanup {
                path: wav.clone(),
                source,
            })?;

        Ok(AudioAsset {
            atomic_number,
            bytes: data.len() as u64,
            sha256: sha256_hex(&data),
            path: out,
        })
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Copies the WAV verbatim, recording every call.
    #[derive(Default)]
    struct CopyEncoder {
        calls: Mutex<Vec<Vec<OsString>>>,
    }

    impl Encoder for CopyEncoder {
        async fn transcode(&self, input: &Path, output: &Path, options: &EncodeOptions) -> Result<(), ExportError> {
            self.calls.lock().unwrap().push(options.args(input, output));
            tokio::fs::copy(input, output)
                .await
                .map(|_| ())
                .map_err(|source| ExportError::Io {
                    path: output.to_path_buf(),
                    source,
                })
        }
    }

    struct FailingEncoder;

    impl Encoder for FailingEncoder {
        async fn transcode(&self, _: &Path, _: &Path, _: &EncodeOptions) -> Result<(), ExportError> {
            Err(ExportError::EncoderFailed {
                code: Some(1),
                stderr: "synthetic failure".to_string(),
            })
        }
    }

    /// Claims success without writing anything.
    struct LyingEncoder;

    impl Encoder for LyingEncoder {
        async fn transcode(&self, _: &Path, _: &Path, _: &EncodeOptions) -> Result<(), ExportError> {
            Ok(())
        }
    }

    fn config(dir: &Path) -> ExportConfig {
        ExportConfig {
            output_dir: dir.join("sounds"),
            ..ExportConfig::default()
        }
    }

    fn tone() -> SampleBuffer {
        let samples = (0..800).map(|i| 0.3 * (i as f64 * 0.05).sin()).collect();
        SampleBuffer::new(8000, samples)
    }

    #[test]
    fn args_follow_transcoder_order() {
        let opts = EncodeOptions::from_config(&ExportConfig::default());
        let args = opts.args(Path::new("sounds/sound-6.wav"), Path::new("sounds/sound-6.mp3"));
        let args: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            args,
            vec![
                "-y", "-i", "sounds/sound-6.wav", "-codec:a", "libmp3lame", "-qscale:a", "1",
                "-v", "0", "-af", "volume=1", "sounds/sound-6.mp3",
            ]
        );
    }

    #[test]
    fn volume_filter_keeps_exact_gain() {
        let opts = EncodeOptions {
            volume: 0.25,
            ..EncodeOptions::from_config(&ExportConfig::default())
        };
        let args = opts.args(Path::new("in.wav"), Path::new("out.mp3"));
        assert!(args.iter().any(|a| a == "volume=0.25"), "{args:?}");
    }

    #[test]
    fn paths_keyed_by_atomic_number() {
        let exporter = AssetExporter::new(&ExportConfig::default(), LyingEncoder);
        assert_eq!(exporter.wav_path(26), PathBuf::from("sounds/sound-26.wav"));
        assert_eq!(exporter.asset_path(26), PathBuf::from("sounds/sound-26.mp3"));
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn success_removes_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = AssetExporter::new(&config(dir.path()), CopyEncoder::default());
        let asset = exporter.export(&tone(), 1).await.unwrap();

        assert!(asset.path.exists());
        assert!(!exporter.wav_path(1).exists());
        assert_eq!(asset.atomic_number, 1);
        assert_eq!(asset.bytes, std::fs::metadata(&asset.path).unwrap().len());
        assert_eq!(exporter.encoder.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = AssetExporter::new(&config(dir.path()), FailingEncoder);
        let err = exporter.export(&tone(), 6).await.unwrap_err();

        assert!(matches!(err, ExportError::EncoderFailed { code: Some(1), .. }));
        assert!(exporter.wav_path(6).exists());
        assert!(!exporter.asset_path(6).exists());
    }

    #[tokio::test]
    async fn missing_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = AssetExporter::new(&config(dir.path()), LyingEncoder);
        let err = exporter.export(&tone(), 8).await.unwrap_err();
        assert!(matches!(err, ExportError::MissingOutput { .. }));
        assert!(exporter.wav_path(8).exists());
    }

    #[tokio::test]
    async fn re_export_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = AssetExporter::new(&config(dir.path()), CopyEncoder::default());
        let first = exporter.export(&tone(), 3).await.unwrap();
        let second = exporter.export(&tone(), 3).await.unwrap();
        assert_eq!(first, second);
    }
}
