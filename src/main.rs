//! Command line front end for bioannot.
//!
//! Operates on annotation data kept by the filesystem backend:
//!
//! ```bash
//! bioannot --data-dir ./data --image img-1 --mask mask-1 stats
//! bioannot --data-dir ./data --image img-1 --mask mask-1 export-json out.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use bioannot::backend::FeatureCollection;
use bioannot::constants::EXPORT_FILENAME;
use bioannot::export::raster_url;
use bioannot::model::{Grade, ImageMetadata};
use bioannot::{
    AnnotationBackend, AnnotationSession, AppConfig, FileBackend, FileExportSink, MaskKey,
    RasterOptions,
};

#[derive(Parser)]
#[command(name = "bioannot")]
#[command(about = "Polygon annotation engine for pyramidal biomedical images", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root directory of the filesystem backend
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Image id
    #[arg(long)]
    image: String,

    /// Mask id
    #[arg(long)]
    mask: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct RasterFlags {
    /// Render true-positive features
    #[arg(long)]
    true_positive: bool,
    /// Render false-positive features
    #[arg(long)]
    false_positive: bool,
    /// Render false-negative features
    #[arg(long)]
    false_negative: bool,
    /// Render in grayscale
    #[arg(long)]
    grayscale: bool,
}

impl From<RasterFlags> for RasterOptions {
    fn from(flags: RasterFlags) -> Self {
        Self {
            true_positive: flags.true_positive,
            false_positive: flags.false_positive,
            false_negative: flags.false_negative,
            grayscale: flags.grayscale,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print grade statistics
    Stats,

    /// Simplify every feature by one step and save
    SimplifyAll,

    /// Remove the holes of every feature and save
    RemoveHoles,

    /// Write the saved annotation data as a JSON document
    ExportJson {
        /// Output file
        #[arg(default_value = EXPORT_FILENAME)]
        output: PathBuf,

        #[command(flatten)]
        raster: RasterFlags,
    },

    /// Print the raster export URL
    ExportUrl {
        #[command(flatten)]
        raster: RasterFlags,
    },

    /// Discard every edit and restore the ingestion-time annotations
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Store polygonizer output as the ingestion-time annotations of a mask
    Ingest {
        /// GeoJSON feature collection
        features: PathBuf,

        /// Image width in pixels
        #[arg(long)]
        width: u32,

        /// Image height in pixels
        #[arg(long)]
        height: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => AppConfig::load_from_default_path(),
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let key = MaskKey::new(cli.image, cli.mask);
    let mut backend = FileBackend::new(&cli.data_dir);

    match cli.command {
        Commands::Ingest {
            features,
            width,
            height,
        } => {
            let json = std::fs::read_to_string(&features)
                .with_context(|| format!("Failed to read {}", features.display()))?;
            let collection: FeatureCollection = serde_json::from_str(&json)
                .with_context(|| format!("Invalid feature collection {}", features.display()))?;
            let count = collection.features.len();
            let image = ImageMetadata::with_size(&key.image_id, width, height);
            backend.ingest(&key, &image, collection.features)?;
            println!("📥 Ingested {} feature(s) for {}", count, key);
            Ok(())
        }
        Commands::ExportUrl { raster } => {
            let url = raster_url(&config.api_url, &key, raster.into())?;
            println!("{}", url);
            Ok(())
        }
        command => run_session(command, AnnotationSession::start(backend, key, config)?),
    }
}

fn run_session(command: Commands, mut session: AnnotationSession<FileBackend>) -> Result<()> {
    match command {
        Commands::Stats => {
            let stats = session.statistics();
            println!("📊 {} feature(s)", stats.total);
            for (grade, count) in [
                (Grade::TruePositive, stats.true_positive),
                (Grade::FalsePositive, stats.false_positive),
                (Grade::FalseNegative, stats.false_negative),
            ] {
                println!(
                    "   {:<16} {:>6} ({:.1}%)",
                    grade.name(),
                    count,
                    stats.percentage(count)
                );
            }
            println!(
                "   {:<16} {:>6} ({:.1}%)",
                "Unspecified",
                stats.unspecified,
                stats.percentage(stats.unspecified)
            );
            match stats.overall_score {
                Some(score) => println!("   Overall score: {}%", score),
                None => println!("   Overall score: not set"),
            }
        }
        Commands::SimplifyAll => {
            let count = session.simplify_all();
            session.save()?;
            println!("✂️ Simplified {} feature(s)", count);
        }
        Commands::RemoveHoles => {
            let count = session.remove_all_holes();
            session.save()?;
            println!("🕳️ Removed holes from {} feature(s)", count);
        }
        Commands::ExportJson { output, raster } => {
            let mut sink = FileExportSink::new(&output);
            session.export(&mut sink, raster.into())?;
            println!("📤 Exported to {}", output.display());
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("Reset discards all saved and unsaved edits; pass --yes to confirm");
            }
            session.reset(|| yes)?;
            println!("↩️ Restored {} feature(s)", session.store().len());
        }
        Commands::Ingest { .. } | Commands::ExportUrl { .. } => {}
    }
    Ok(())
}
