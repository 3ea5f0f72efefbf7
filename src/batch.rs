//! Batch driver: renders and exports every element, collecting failures.

use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::dsp::CueRenderer;
use crate::element::{ElementRecord, ElementRow};
use crate::error::{ConfigError, CueError};
use crate::export::{AssetExporter, AudioAsset, Encoder};

/// Why one element produced no asset.
#[derive(Debug)]
pub struct ElementFailure {
    pub atomic_number: u32,
    pub error: CueError,
}

/// Outcome of a batch run. Owned by the caller, filled in by the driver.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: Vec<AudioAsset>,
    pub failures: Vec<ElementFailure>,
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    atomic_number: u32,
    file: String,
    bytes: u64,
    sha256: &'a str,
}

impl BatchReport {
    pub fn new(total: usize) -> Self {
        BatchReport {
            total,
            ..BatchReport::default()
        }
    }

    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Atomic numbers of failed elements, ascending.
    pub fn failed_keys(&self) -> Vec<u32> {
        let mut keys: Vec<u32> = self.failures.iter().map(|f| f.atomic_number).collect();
        keys.sort_unstable();
        keys
    }

    pub fn record(&mut self, atomic_number: u32, outcome: Result<AudioAsset, CueError>) {
        match outcome {
            Ok(asset) => self.succeeded.push(asset),
            Err(error) => self.failures.push(ElementFailure { atomic_number, error }),
        }
    }

    /// JSON list of the produced assets, for cache-busting on the web page.
    pub fn write_manifest(&self, path: &Path) -> std::io::Result<()> {
        let mut assets: Vec<&AudioAsset> = self.succeeded.iter().collect();
        assets.sort_by_key(|a| a.atomic_number);
        let entries: Vec<ManifestEntry<'_>> = assets
            .into_iter()
            .map(|a| ManifestEntry {
                atomic_number: a.atomic_number,
                file: a
                    .path
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                bytes: a.bytes,
                sha256: &a.sha256,
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} elements exported, {} failed",
            self.succeeded.len(),
            self.total,
            self.failures.len()
        )?;
        if self.failures.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = self.failed_keys().iter().map(u32::to_string).collect();
        write!(f, "\nfailed elements: {}", keys.join(", "))?;
        let mut failures: Vec<&ElementFailure> = self.failures.iter().collect();
        failures.sort_by_key(|fl| fl.atomic_number);
        for failure in failures {
            write!(
                f,
                "\n  {} [{}]: {}",
                failure.atomic_number,
                failure.error.kind(),
                failure.error
            )?;
        }
        Ok(())
    }
}

/// Runs the cue pipeline over a table of elements.
pub struct BatchDriver<E> {
    renderer: Arc<CueRenderer>,
    exporter: Arc<AssetExporter<E>>,
    workers: usize,
}

impl<E: Encoder + 'static> BatchDriver<E> {
    /// Validates the whole configuration up front; a bad constant set never
    /// reaches the first element.
    pub fn new(config: &Config, encoder: E) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(BatchDriver {
            renderer: Arc::new(CueRenderer::new(&config.synth)),
            exporter: Arc::new(AssetExporter::new(&config.export, encoder)),
            workers: config.export.workers,
        })
    }

    /// Render and export every row. Element failures are recorded, never fatal.
    pub async fn run(&self, rows: &[ElementRow]) -> BatchReport {
        let total = rows.len();
        let mut report = BatchReport::new(total);
        let mut seen = HashSet::with_capacity(total);
        let mut elements = Vec::with_capacity(total);

        for row in rows {
            let n = row.atomic_number;
            let validated = if seen.insert(n) {
                ElementRecord::try_from(row)
            } else {
                Err(CueError::InvalidElementData(format!(
                    "duplicate atomic number {n}"
                )))
            };
            match validated {
                Ok(element) => elements.push(element),
                Err(e) => {
                    warn!("skipping element {n}: {e}");
                    report.record(n, Err(e));
                }
            }
        }

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = Vec::with_capacity(elements.len());
        for element in elements {
            let permits = Arc::clone(&permits);
            let renderer = Arc::clone(&self.renderer);
            let exporter = Arc::clone(&self.exporter);
            let n = element.atomic_number();
            let label = element.label();
            let task = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                process_element(&renderer, &exporter, &element).await
            });
            tasks.push((n, label, task));
        }

        for (n, label, task) in tasks {
            let outcome = task.await.unwrap_or_else(|join| {
                let what = if join.is_panic() { "panicked" } else { "was cancelled" };
                Err(CueError::Worker(format!("task for element {n} {what}")))
            });
            match &outcome {
                Ok(asset) => info!(
                    "[{}/{total}] element {label} -> {}",
                    report.processed() + 1,
                    asset.path.display()
                ),
                Err(e) => warn!("[{}/{total}] element {label} failed: {e}", report.processed() + 1),
            }
            report.record(n, outcome);
        }

        info!("{}", report.to_string().lines().next().unwrap_or_default());
        report
    }
}

async fn process_element<E: Encoder>(
    renderer: &CueRenderer,
    exporter: &AssetExporter<E>,
    element: &ElementRecord,
) -> Result<AudioAsset, CueError> {
    let buffer = renderer.render(element)?;
    let asset = exporter.export(&buffer, element.atomic_number()).await?;
    Ok(asset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExportConfig, SynthConfig};
    use crate::error::ExportError;
    use crate::export::EncodeOptions;

    struct CopyEncoder;

    impl Encoder for CopyEncoder {
        async fn transcode(&self, input: &Path, output: &Path, _: &EncodeOptions) -> Result<(), ExportError> {
            std::fs::copy(input, output).map(|_| ()).map_err(|source| ExportError::Io {
                path: output.to_path_buf(),
                source,
            })
        }
    }

    /// Panics on element 2, copies everything else.
    struct PanickingEncoder;

    impl Encoder for PanickingEncoder {
        async fn transcode(&self, input: &Path, output: &Path, options: &EncodeOptions) -> Result<(), ExportError> {
            if input.ends_with("sound-2.wav") {
                panic!("encoder blew up");
            }
            CopyEncoder.transcode(input, output, options).await
        }
    }

    fn config(dir: &Path, workers: usize) -> Config {
        Config {
            synth: SynthConfig {
                sample_rate_hz: 8000,
                duration_seconds: 0.25,
                ..SynthConfig::default()
            },
            export: ExportConfig {
                output_dir: dir.to_path_buf(),
                workers,
                ..ExportConfig::default()
            },
        }
    }

    fn row(n: u32, period: Option<u32>, group: Option<u32>, block: &str) -> ElementRow {
        ElementRow {
            atomic_number: n,
            period,
            group,
            block: Some(block.to_string()),
            ..ElementRow::default()
        }
    }

    #[tokio::test]
    async fn invalid_rows_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let driver = BatchDriver::new(&config(dir.path(), 1), CopyEncoder).unwrap();
        let rows = vec![
            row(1, Some(1), Some(1), "s-block"),
            row(2, Some(1), None, "s-block"),
            row(3, Some(2), Some(1), "x-block"),
            row(4, Some(2), Some(0), "s-block"),
            row(1, Some(1), Some(1), "s-block"),
        ];
        let report = driver.run(&rows).await;

        assert_eq!(report.total, 5);
        assert_eq!(report.processed(), 5);
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.failed_keys(), vec![1, 2, 3, 4]);
        assert!(report
            .failures
            .iter()
            .all(|f| matches!(f.error, CueError::InvalidElementData(_))));
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn parallel_workers_export_everything() {
        let dir = tempfile::tempdir().unwrap();
        let driver = BatchDriver::new(&config(dir.path(), 4), CopyEncoder).unwrap();
        let rows: Vec<ElementRow> = (1..=12)
            .map(|n| row(n, Some(1 + n % 7), Some(1 + n % 18), "p-block"))
            .collect();
        let report = driver.run(&rows).await;

        assert!(report.is_success(), "{report}");
        assert_eq!(report.succeeded.len(), 12);
        for n in 1..=12 {
            assert!(dir.path().join(format!("sound-{n}.mp3")).exists());
            assert!(!dir.path().join(format!("sound-{n}.wav")).exists());
        }
    }

    #[test]
    fn bad_config_rejected_before_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), 1);
        cfg.synth.harmonic_decay_sequence = vec![0.5];
        assert!(BatchDriver::new(&cfg, CopyEncoder).is_err());
    }

    #[tokio::test]
    async fn panicked_worker_reported_as_worker_failure() {
        let dir = tempfile::tempdir().unwrap();
        let driver = BatchDriver::new(&config(dir.path(), 2), PanickingEncoder).unwrap();
        let rows: Vec<ElementRow> = (1..=3).map(|n| row(n, Some(2), Some(n), "s-block")).collect();
        let report = driver.run(&rows).await;

        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed_keys(), vec![2]);
        let failure = &report.failures[0];
        assert!(matches!(failure.error, CueError::Worker(_)), "{}", failure.error);
        assert_eq!(failure.error.kind(), "worker");
        assert!(report.to_string().contains("2 [worker]: Worker failure: task for element 2 panicked"));
    }

    #[tokio::test]
    async fn summary_lists_failed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let driver = BatchDriver::new(&config(dir.path(), 1), CopyEncoder).unwrap();
        let rows = vec![
            row(10, Some(2), Some(18), "p-block"),
            row(9, None, Some(17), "p-block"),
        ];
        let report = driver.run(&rows).await;
        let text = report.to_string();
        assert!(text.starts_with("1 of 2 elements exported, 1 failed"), "{text}");
        assert!(text.contains("failed elements: 9"), "{text}");
        assert!(text.contains("[invalid_element_data]"), "{text}");
    }

    #[tokio::test]
    async fn manifest_lists_assets_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let driver = BatchDriver::new(&config(dir.path(), 2), CopyEncoder).unwrap();
        let rows = vec![
            row(3, Some(2), Some(1), "s-block"),
            row(1, Some(1), Some(1), "s-block"),
        ];
        let report = driver.run(&rows).await;
        let manifest = dir.path().join("manifest.json");
        report.write_manifest(&manifest).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&manifest).unwrap()).unwrap();
        let entries = parsed.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["atomic_number"], 1);
        assert_eq!(entries[0]["file"], "sound-1.mp3");
        assert_eq!(entries[1]["atomic_number"], 3);
        assert_eq!(entries[1]["sha256"].as_str().unwrap().len(), 64);
    }
}
