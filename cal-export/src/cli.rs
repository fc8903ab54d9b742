//! Sous-commandes de la CLI

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use cal_export::config::{DatasetConfig, DatasetKind};
use cal_export::export::pipeline::{self, ExportRequest};
use cal_export::export::precision::MAX_DECIMALS;
use cal_export::export::{AreaModel, ExportOptions, ExportSettings, ParquetCompression};
use cal_export::report::ExportStatus;
use cal_export::verify::{self, VerifyOptions, VerifyReport};
use clap::{Args, Subcommand};
use geofeed::input::encoding_for_label;
use geofeed::ReadOptions;
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Export parcel polygons to a Parquet file
    Parcels(ExportArgs),

    /// Export building footprints to a Parquet file
    Buildings(ExportArgs),

    /// Check exported Parquet files against the export invariants
    Verify {
        /// Parquet files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write the verification results as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Area model used at export time: fixed, latitude-scaled
        #[arg(long, default_value = "fixed")]
        area_model: AreaModel,

        /// Preset name or JSON config whose area bounds apply
        #[arg(long)]
        config: Option<String>,
    },
}

#[derive(Args)]
pub struct ExportArgs {
    /// Source file, directory or glob pattern (repeatable)
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<String>,

    /// Output Parquet file
    #[arg(short, long)]
    output: PathBuf,

    /// Config preset name (parcels/buildings) or path to a JSON config
    #[arg(long)]
    config: Option<String>,

    /// EPSG code forced for every source (overrides the config and the `crs` member)
    #[arg(long)]
    source_srid: Option<u32>,

    /// Round coordinates to N decimals before validation (off by default)
    #[arg(long)]
    precision: Option<u8>,

    /// Area model: fixed (default), latitude-scaled
    #[arg(long, default_value = "fixed")]
    area_model: AreaModel,

    /// Drop records whose geometry was already emitted
    #[arg(long)]
    dedup: bool,

    /// Worker threads (défaut : env CAL_EXPORT_JOBS / nombre de CPU)
    #[arg(long, alias = "threads")]
    jobs: Option<usize>,

    /// Rows per Parquet batch (défaut : env CAL_EXPORT_BATCH_SIZE / 5000)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Parquet compression: zstd, snappy, uncompressed (défaut : env CAL_EXPORT_COMPRESSION / zstd)
    #[arg(long)]
    compression: Option<ParquetCompression>,

    /// Fallback encoding for sources that are not valid UTF-8 (default: windows-1252)
    #[arg(long)]
    encoding: Option<String>,

    /// Write the export report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

/// Exécute un export parcels/buildings
pub fn cmd_export(kind: DatasetKind, args: ExportArgs) -> Result<()> {
    let config_spec = args.config.as_deref().unwrap_or(kind.as_str());
    let config = DatasetConfig::resolve(config_spec)
        .with_context(|| format!("Cannot load config {}", config_spec))?;
    if config.dataset != kind {
        bail!(
            "Config {} describes {}, not {}",
            config_spec,
            config.dataset.as_str(),
            kind.as_str()
        );
    }

    if let Some(decimals) = args.precision {
        if decimals > MAX_DECIMALS {
            bail!("Precision must be at most {} decimals", MAX_DECIMALS);
        }
    }

    let read_options = match args.encoding.as_deref() {
        Some(label) => ReadOptions {
            fallback_encoding: encoding_for_label(label)?,
        },
        None => ReadOptions::default(),
    };

    let settings = ExportSettings::from_env().with_overrides(args.jobs, args.batch_size, args.compression);

    println!("=== Export {} ===", kind.as_str());
    println!("Inputs: {}", args.input.join(", "));
    println!("Output: {}", args.output.display());
    println!("Config: {}", config_spec);
    println!("Jobs: {}", settings.jobs);
    println!("Batch size: {}", settings.batch_size);
    println!("Compression: {}", settings.compression.as_str());
    println!("Area model: {}", args.area_model.as_str());
    match args.precision {
        Some(decimals) => println!("Coordinate precision: {} decimals", decimals),
        None => println!("Coordinate precision: unchanged"),
    }
    println!("Dedup: {}", args.dedup);
    println!("Fallback encoding: {}", read_options.fallback_encoding.name());

    let request = ExportRequest {
        inputs: args.input,
        output: args.output,
        config,
        source_srid: args.source_srid,
        options: ExportOptions {
            area_model: args.area_model,
            precision: args.precision,
        },
        dedup: args.dedup,
        settings,
        read_options,
    };

    let report = pipeline::run(&request)?;
    report.display();

    if let Some(path) = &args.report {
        report.save_to_file(path)?;
        info!(path = %path.display(), "Report saved");
    }

    if report.status == ExportStatus::Failed {
        bail!("Export failed: {}", report.summary());
    }
    println!("{}", report.summary());

    Ok(())
}

/// Vérifie des fichiers exportés
pub fn cmd_verify(
    files: &[PathBuf],
    report_path: Option<&PathBuf>,
    area_model: AreaModel,
    config: Option<&str>,
) -> Result<()> {
    let bounds = config
        .map(DatasetConfig::resolve)
        .transpose()?
        .map(|c| c.bounds());
    let options = VerifyOptions { area_model, bounds };

    let mut reports: Vec<VerifyReport> = Vec::with_capacity(files.len());
    for file in files {
        let report = verify::verify_file_with(file, &options)
            .with_context(|| format!("Verification of {} failed", file.display()))?;
        report.display();
        reports.push(report);
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&reports)?;
        std::fs::write(path, json).with_context(|| format!("Cannot write report {}", path.display()))?;
        info!(path = %path.display(), "Verification report saved");
    }

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        bail!("{} of {} files failed verification", failed, reports.len());
    }

    println!("All {} files verified", reports.len());
    Ok(())
}
