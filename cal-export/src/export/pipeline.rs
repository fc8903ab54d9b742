//! Orchestration d'un export : sources → exporteur (rayon) → dédoublonnage → Parquet
//!
//! Les sources sont traitées dans l'ordre trié de leurs chemins. Les
//! enregistrements d'une source sont transformés en parallèle, ordre conservé ;
//! seuls le dédoublonnage et l'écriture sont séquentiels. La sortie est donc
//! déterministe pour un jeu d'entrées donné.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use geofeed::{ReadOptions, SourceBatch, SourceRecord};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::dedup::Deduplicator;
use super::exporter::{
    stamp_from_config, BuildingExporter, ExportOptions, ParcelExporter, SourceContext,
};
use super::parquet::{ParquetRecord, ParquetSink};
use super::record::{BuildingRecord, Outcome, ParcelRecord};
use super::settings::ExportSettings;
use crate::config::{DatasetConfig, DatasetKind};
use crate::report::{ExportReport, SourceStats};
use crate::reproject_lite::SmartReprojector;

/// Transformation d'un enregistrement source en enregistrement exporté
pub trait Exporter: Sync {
    type Record: ParquetRecord + Send;

    fn process(&self, record: &SourceRecord, ctx: &SourceContext) -> Outcome<Self::Record>;
}

impl Exporter for ParcelExporter {
    type Record = ParcelRecord;

    fn process(&self, record: &SourceRecord, ctx: &SourceContext) -> Outcome<ParcelRecord> {
        ParcelExporter::process(self, record, ctx)
    }
}

impl Exporter for BuildingExporter {
    type Record = BuildingRecord;

    fn process(&self, record: &SourceRecord, ctx: &SourceContext) -> Outcome<BuildingRecord> {
        BuildingExporter::process(self, record, ctx)
    }
}

/// Paramètres d'un export
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Fichiers, répertoires ou motifs glob
    pub inputs: Vec<String>,
    pub output: PathBuf,
    pub config: DatasetConfig,
    /// EPSG imposé à toutes les sources
    pub source_srid: Option<u32>,
    pub options: ExportOptions,
    /// Supprimer les géométries déjà émises
    pub dedup: bool,
    pub settings: ExportSettings,
    /// Encodage de repli des sources non UTF-8
    pub read_options: ReadOptions,
}

/// Exécute un export complet et retourne son rapport.
///
/// Une source illisible est comptée en échec et ignorée ; le rapport passe
/// alors en `PartialSuccess` (ou `Failed` si aucune source n'a pu être lue).
pub fn run(request: &ExportRequest) -> Result<ExportReport> {
    let started_at = Instant::now();
    let export_timestamp = Utc::now();
    let kind = request.config.dataset;

    let sources = collect_sources(&request.inputs)?;
    if sources.is_empty() {
        bail!("No source files found in {}", request.inputs.join(", "));
    }

    info!(
        dataset = kind.as_str(),
        sources = sources.len(),
        output = %request.output.display(),
        jobs = request.settings.jobs,
        fallback_encoding = request.read_options.fallback_encoding.name(),
        area_model = request.options.area_model.as_str(),
        dedup = request.dedup,
        "Starting export"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(request.settings.jobs.max(1))
        .build()
        .context("Failed to build thread pool")?;

    let stamp = Arc::new(stamp_from_config(&request.config, export_timestamp));
    let mut report = ExportReport::new(kind.as_str(), &request.output, &export_timestamp.to_rfc3339());

    let run = DatasetRun {
        request,
        sources: &sources,
        pool: &pool,
    };
    match kind {
        DatasetKind::Parcels => {
            let exporter = ParcelExporter::new(&request.config, stamp, request.options);
            run.execute(&exporter, &mut report)?;
        }
        DatasetKind::Buildings => {
            let exporter = BuildingExporter::new(&request.config, stamp, request.options);
            run.execute(&exporter, &mut report)?;
        }
    }

    report.set_duration(started_at.elapsed());
    report.finalize();

    info!(
        dataset = kind.as_str(),
        emitted = report.records_emitted,
        dropped = report.records_dropped,
        failed_sources = report.sources_failed,
        status = ?report.status,
        "Export finished"
    );

    Ok(report)
}

struct DatasetRun<'a> {
    request: &'a ExportRequest,
    sources: &'a [PathBuf],
    pool: &'a rayon::ThreadPool,
}

impl DatasetRun<'_> {
    fn execute<E: Exporter>(&self, exporter: &E, report: &mut ExportReport) -> Result<()> {
        let mut sink = ParquetSink::<E::Record>::create(&self.request.output, &self.request.settings)?;
        let mut dedup = self.request.dedup.then(Deduplicator::new);

        for path in self.sources {
            let name = path.display().to_string();

            let batch = match geofeed::read_with(path, &self.request.read_options) {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(file = %name, error = %e, "Skipping unreadable source");
                    report.record_source_failure(&name, &e.to_string());
                    continue;
                }
            };

            let epsg = match self.source_epsg(&batch) {
                Ok(epsg) => epsg,
                Err(message) => {
                    warn!(file = %name, error = %message, "Skipping source with unrecognised CRS");
                    report.record_source_failure(&name, &message);
                    continue;
                }
            };
            let reprojector = match SmartReprojector::new(epsg, 4326) {
                Ok(reprojector) => reprojector,
                Err(e) => {
                    warn!(file = %name, epsg = epsg, error = %e, "Skipping source with unsupported CRS");
                    report.record_source_failure(&name, &e.to_string());
                    continue;
                }
            };

            for error in &batch.errors {
                report.record_warning(&name, &error.to_string());
            }
            if !batch.errors.is_empty() {
                warn!(file = %name, errors = batch.errors.len(), "Source has unreadable features");
            }

            let checksum = match compute_file_checksum(path) {
                Ok(checksum) => Some(checksum),
                Err(e) => {
                    warn!(file = %name, error = %e, "Checksum failed");
                    None
                }
            };

            let mut stats = SourceStats {
                path: name.clone(),
                checksum,
                format: batch.format.as_str().to_string(),
                epsg,
                county: batch.county.map(|c| c.name.to_string()),
                records_read: batch.records.len(),
                read_errors: batch.errors.len(),
                ..Default::default()
            };

            let ctx = SourceContext {
                file: name,
                reprojector,
                county: batch.county,
            };

            let outcomes: Vec<Outcome<E::Record>> = self.pool.install(|| {
                batch
                    .records
                    .par_iter()
                    .map(|record| exporter.process(record, &ctx))
                    .collect()
            });

            for (record, outcome) in batch.records.iter().zip(outcomes) {
                let outcome = match (outcome, dedup.as_mut()) {
                    (Outcome::Emitted(emitted), Some(seen)) => match seen.check(emitted.geometry()) {
                        Ok(()) => Outcome::Emitted(emitted),
                        Err(reason) => Outcome::Dropped(reason),
                    },
                    (outcome, _) => outcome,
                };

                match outcome {
                    Outcome::Emitted(emitted) => {
                        sink.push(emitted)?;
                        stats.emitted += 1;
                        report.record_emitted();
                    }
                    Outcome::Dropped(reason) => {
                        debug!(file = %ctx.file, index = record.index, reason = %reason, "Record dropped");
                        stats.dropped += 1;
                        report.record_drop(reason);
                    }
                }
            }

            info!(
                file = %ctx.file,
                epsg = epsg,
                reprojection = ctx.reprojector.description(),
                read = stats.records_read,
                emitted = stats.emitted,
                dropped = stats.dropped,
                "Source exported"
            );
            report.record_source(stats);
        }

        report.bbox = sink.bbox();
        let rows = sink.close()?;
        debug!(output = %self.request.output.display(), rows = rows, "Parquet file closed");
        Ok(())
    }

    /// `--source-srid`, puis la configuration, puis le membre `crs` de la source.
    ///
    /// Un membre `crs` non reconnu n'est jamais remplacé par WGS84.
    fn source_epsg(&self, batch: &SourceBatch) -> Result<u32, String> {
        if let Some(epsg) = self.request.source_srid.or(self.request.config.source_epsg) {
            return Ok(epsg);
        }
        match &batch.unknown_crs {
            Some(name) => Err(format!("Unrecognised crs member `{}`; set --source-srid", name)),
            None => Ok(batch.crs.epsg),
        }
    }
}

/// Collecte les fichiers sources depuis des chemins, répertoires ou motifs glob.
///
/// Les répertoires sont parcourus récursivement ; seuls les fichiers d'extension
/// connue y sont retenus. Un fichier nommé explicitement est toujours retenu.
/// Le résultat est trié et sans doublon.
pub fn collect_sources(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();

    for input in inputs {
        let path = Path::new(input);
        if path.is_file() {
            sources.push(path.to_path_buf());
        } else if path.is_dir() {
            collect_directory(path, &mut sources)?;
        } else {
            let entries = glob::glob(input).with_context(|| format!("Invalid input pattern {}", input))?;
            let before = sources.len();
            for entry in entries {
                let entry = entry.context("Cannot read glob entry")?;
                if entry.is_file() {
                    sources.push(entry);
                }
            }
            if sources.len() == before {
                warn!(input = %input, "Input matches no file");
            }
        }
    }

    sources.sort();
    sources.dedup();
    Ok(sources)
}

fn collect_directory(dir: &Path, sources: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("Cannot read {}", dir.display()))? {
        let entry_path = entry?.path();

        if entry_path.is_dir() {
            collect_directory(&entry_path, sources)?;
        } else if geofeed::input::is_source_path(&entry_path) {
            sources.push(entry_path);
        }
    }
    Ok(())
}

/// Calcule le checksum blake3 d'un fichier
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    use std::fs::File;
    use std::io::Read;

    let mut file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 65536];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ExportStatus;
    use std::fs;

    fn square(x: f64, y: f64, side: f64) -> serde_json::Value {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[x, y], [x + side, y], [x + side, y + side], [x, y + side], [x, y]]]
        })
    }

    fn write_collection(path: &Path, features: Vec<serde_json::Value>) {
        let collection = serde_json::json!({"type": "FeatureCollection", "features": features});
        fs::write(path, collection.to_string()).unwrap();
    }

    fn request(inputs: Vec<String>, output: PathBuf, preset: &str) -> ExportRequest {
        ExportRequest {
            inputs,
            output,
            config: DatasetConfig::from_preset(preset).unwrap(),
            source_srid: None,
            options: ExportOptions::default(),
            dedup: false,
            settings: ExportSettings {
                jobs: 2,
                batch_size: 2,
                ..Default::default()
            },
            read_options: ReadOptions::default(),
        }
    }

    #[test]
    fn test_collect_sources_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.geojson"), "{}").unwrap();
        fs::write(dir.path().join("sub/a.geojsonl"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let inputs = vec![dir.path().display().to_string()];
        let sources = collect_sources(&inputs).unwrap();

        assert_eq!(sources.len(), 2);
        assert!(sources[0].ends_with("b.geojson"));
        assert!(sources[1].ends_with("sub/a.geojsonl"));
    }

    #[test]
    fn test_collect_sources_glob_and_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.geojson"), "{}").unwrap();
        fs::write(dir.path().join("b.geojson"), "{}").unwrap();
        fs::write(dir.path().join("c.txt"), "").unwrap();

        let inputs = vec![
            format!("{}/*.geojson", dir.path().display()),
            dir.path().join("c.txt").display().to_string(),
            dir.path().join("a.geojson").display().to_string(),
        ];
        let sources = collect_sources(&inputs).unwrap();

        assert_eq!(sources.len(), 3);
        assert!(sources.iter().any(|p| p.ends_with("c.txt")));
    }

    #[test]
    fn test_checksum_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.geojson");
        fs::write(&path, "hello").unwrap();

        let first = compute_file_checksum(&path).unwrap();
        assert_eq!(first, compute_file_checksum(&path).unwrap());
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_run_buildings_with_failed_source() {
        let dir = tempfile::tempdir().unwrap();
        write_collection(
            &dir.path().join("a.geojson"),
            vec![
                serde_json::json!({"type": "Feature", "geometry": square(-118.0, 34.0, 0.0002), "properties": {"confidence": 0.9}}),
                serde_json::json!({"type": "Feature", "geometry": square(-118.1, 34.0, 0.00002), "properties": {}}),
                serde_json::json!({"type": "Feature", "geometry": null, "properties": {}}),
            ],
        );
        fs::write(dir.path().join("b.geojson"), "[1, 2, 3]").unwrap();

        let output = dir.path().join("out/buildings.parquet");
        let report = run(&request(vec![dir.path().display().to_string()], output.clone(), "buildings")).unwrap();

        assert!(output.exists());
        assert_eq!(report.status, ExportStatus::PartialSuccess);
        assert_eq!(report.records_read, 3);
        assert_eq!(report.records_emitted, 1);
        assert_eq!(report.drops["area_below_minimum"], 1);
        assert_eq!(report.drops["missing_geometry"], 1);
        assert_eq!(report.sources_failed, 1);
        assert!(report.sources[0].checksum.is_some());
        assert!(report.bbox.is_some());
    }

    #[test]
    fn test_run_dedup_drops_repeated_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let feature = serde_json::json!({"type": "Feature", "geometry": square(-118.0, 34.0, 0.0004), "properties": {"APN": "1"}});
        write_collection(&dir.path().join("a.geojson"), vec![feature.clone(), feature]);

        let mut req = request(
            vec![dir.path().join("a.geojson").display().to_string()],
            dir.path().join("parcels.parquet"),
            "parcels",
        );
        req.dedup = true;
        let report = run(&req).unwrap();

        assert_eq!(report.status, ExportStatus::Success);
        assert_eq!(report.records_emitted, 1);
        assert_eq!(report.drops["duplicate_geometry"], 1);
    }

    #[test]
    fn test_run_fails_when_nothing_readable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.geojson"), "not json").unwrap();

        let report = run(&request(
            vec![dir.path().display().to_string()],
            dir.path().join("parcels.parquet"),
            "parcels",
        ))
        .unwrap();
        assert_eq!(report.status, ExportStatus::Failed);
    }

    #[test]
    fn test_run_without_sources_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(&request(
            vec![dir.path().display().to_string()],
            dir.path().join("parcels.parquet"),
            "parcels",
        ));
        assert!(result.is_err());
    }
}
