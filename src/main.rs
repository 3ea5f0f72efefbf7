use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use periodic_tones::batch::BatchDriver;
use periodic_tones::config::Config;
use periodic_tones::export::FfmpegEncoder;
use periodic_tones::{harmonics, table};

#[derive(Parser)]
#[command(name = "periodic-tones")]
#[command(version, about = "Render a sound cue for every chemical element")]
#[command(propagate_version = true)]
struct Cli {
    /// JSON configuration file (defaults to config.json in the user config dir)
    #[arg(long, global = true, env = "PERIODIC_TONES_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `debug`
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render and encode a cue for every element in the table
    Render {
        /// Periodic table CSV
        #[arg(long, default_value = "data/periodic-table.csv")]
        table: PathBuf,

        /// Output directory (overrides the config)
        #[arg(long, short)]
        out: Option<PathBuf>,

        /// Concurrent elements (overrides the config)
        #[arg(long, short)]
        workers: Option<usize>,

        /// Transcoder executable (overrides the config)
        #[arg(long)]
        encoder: Option<String>,

        /// Also write manifest.json next to the assets
        #[arg(long)]
        manifest: bool,
    },

    /// Print the harmonic profile of one element as JSON
    Profile {
        period: u32,
        group: u32,
        /// s, p, d or f (also accepts `d-block`)
        block: String,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "periodic-tones", "periodic-tones")
        .map(|dirs| dirs.config_dir().join("config.json"))
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path().filter(|p| p.exists()) {
            Some(p) => p,
            None => return Ok(Config::default()),
        },
    };
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    Config::from_json_str(&source).map_err(|err| {
        let name = path.display().to_string();
        eprint!("{}", err.render_report(&name, &source));
        anyhow!(err)
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let _logger = flexi_logger::Logger::try_with_str(&cli.log_level)
        .with_context(|| format!("Invalid log level `{}`", cli.log_level))?
        .log_to_stderr()
        .start()
        .context("Failed to start logger")?;

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            table: table_path,
            out,
            workers,
            encoder,
            manifest,
        } => {
            if let Some(out) = out {
                config.export.output_dir = out;
            }
            if let Some(workers) = workers {
                config.export.workers = workers;
            }
            if let Some(encoder) = encoder {
                config.export.encoder_program = encoder;
            }

            let rows = table::load(&table_path)
                .with_context(|| format!("Failed to load element table {}", table_path.display()))?;
            let encoder = FfmpegEncoder::from_config(&config.export);
            let driver = BatchDriver::new(&config, encoder)?;
            let report = driver.run(&rows).await;

            println!("{report}");
            if manifest {
                let path = config.export.output_dir.join("manifest.json");
                report
                    .write_manifest(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Profile {
            period,
            group,
            block,
        } => {
            let profile = harmonics(period, group, &block)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            println!("{}", config.to_json_pretty());
            Ok(ExitCode::SUCCESS)
        }
    }
}
