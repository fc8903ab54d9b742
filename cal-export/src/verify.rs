//! Vérification d'un fichier Parquet produit
//!
//! Relit chaque ligne et contrôle les invariants des exports : géométrie WKB
//! décodable et valide, surface dans les bornes et cohérente avec la géométrie,
//! colonnes toujours nulles, règle `inferred_flag`/`inference_method`,
//! `state`, identifiants de bâtiments denses.

use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{Array, BinaryArray, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use geozero::wkb::Wkb;
use geozero::ToGeo;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DatasetKind;
use crate::export::area::{self, AreaBounds, AreaModel};
use crate::export::parquet::{GEOMETRY_COLUMN, GEO_METADATA_KEY};
use crate::export::record::STATE;

/// Nombre maximal de violations détaillées
pub const MAX_REPORTED_VIOLATIONS: usize = 100;

/// Écart relatif toléré entre la surface stockée et la surface recalculée
const AREA_TOLERANCE: f64 = 1e-9;

/// Options de vérification
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyOptions {
    /// Modèle de surface utilisé à l'export
    pub area_model: AreaModel,
    /// Bornes de surface (défaut : celles du jeu de données détecté)
    pub bounds: Option<AreaBounds>,
}

/// Invariant violé par une ligne
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    /// Ligne (0-based), `None` pour une violation au niveau du fichier
    pub row: Option<u64>,
    pub rule: &'static str,
    pub message: String,
}

/// Résultat de la vérification d'un fichier
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub path: String,
    pub dataset: DatasetKind,
    pub rows: u64,
    /// Violations (liste tronquée à `MAX_REPORTED_VIOLATIONS`)
    pub violations: Vec<Violation>,
    pub violations_total: usize,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.violations_total == 0
    }

    fn push(&mut self, row: Option<u64>, rule: &'static str, message: impl Into<String>) {
        self.violations_total += 1;
        if self.violations.len() < MAX_REPORTED_VIOLATIONS {
            self.violations.push(Violation {
                row,
                rule,
                message: message.into(),
            });
        }
    }

    /// Affiche le résultat sur la console
    pub fn display(&self) {
        let status = if self.is_ok() { "OK" } else { "FAILED" };
        println!(
            "{} [{}] {} rows, {} violations: {}",
            status,
            self.dataset.as_str(),
            self.rows,
            self.violations_total,
            self.path
        );
        for v in self.violations.iter().take(20) {
            match v.row {
                Some(row) => println!("  row {}: {} ({})", row, v.rule, v.message),
                None => println!("  {} ({})", v.rule, v.message),
            }
        }
        if self.violations_total > 20 {
            println!("  ... and {} more", self.violations_total - 20);
        }
    }
}

/// Vérifie un fichier avec les options par défaut
pub fn verify_file(path: &Path) -> Result<VerifyReport> {
    verify_file_with(path, &VerifyOptions::default())
}

/// Vérifie un fichier Parquet produit par l'export
pub fn verify_file_with(path: &Path, options: &VerifyOptions) -> Result<VerifyReport> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Not a Parquet file: {}", path.display()))?;

    let dataset = detect_dataset(builder.schema())?;
    let geo_metadata = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|kv| kv.iter().find(|entry| entry.key == GEO_METADATA_KEY))
        .and_then(|entry| entry.value.clone());

    let mut report = VerifyReport {
        path: path.display().to_string(),
        dataset,
        rows: 0,
        violations: Vec::new(),
        violations_total: 0,
    };
    check_geo_metadata(geo_metadata.as_deref(), &mut report);

    let checker = RowChecker {
        dataset,
        model: options.area_model,
        bounds: options.bounds.unwrap_or(match dataset {
            DatasetKind::Parcels => AreaBounds::PARCELS,
            DatasetKind::Buildings => AreaBounds::BUILDINGS,
        }),
    };

    let reader = builder.build().context("Parquet reader init failed")?;
    for batch in reader {
        let batch = batch.context("Parquet read failed")?;
        checker.check_batch(&batch, &mut report)?;
        report.rows += batch.num_rows() as u64;
    }

    info!(
        path = %report.path,
        dataset = dataset.as_str(),
        rows = report.rows,
        violations = report.violations_total,
        "File verified"
    );
    Ok(report)
}

fn detect_dataset(schema: &arrow::datatypes::Schema) -> Result<DatasetKind> {
    let has = |name: &str| schema.field_with_name(name).is_ok();

    if has("building_id") && has("footprint_area_sqft") {
        Ok(DatasetKind::Buildings)
    } else if has("apn") && has("area_sqft") {
        Ok(DatasetKind::Parcels)
    } else {
        bail!("Unrecognised schema: neither a parcels nor a buildings file")
    }
}

fn check_geo_metadata(value: Option<&str>, report: &mut VerifyReport) {
    let Some(value) = value else {
        report.push(None, "geo_metadata", "missing `geo` key-value metadata");
        return;
    };

    match serde_json::from_str::<serde_json::Value>(value) {
        Ok(meta) if meta["primary_column"] == GEOMETRY_COLUMN => {}
        Ok(_) => report.push(None, "geo_metadata", "primary_column is not `geometry`"),
        Err(e) => report.push(None, "geo_metadata", format!("invalid JSON: {}", e)),
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow!("Column `{}` is missing or has an unexpected type", name))
}

fn text(array: &StringArray, i: usize) -> Option<&str> {
    (!array.is_null(i)).then(|| array.value(i))
}

struct RowChecker {
    dataset: DatasetKind,
    model: AreaModel,
    bounds: AreaBounds,
}

impl RowChecker {
    fn check_batch(&self, batch: &RecordBatch, report: &mut VerifyReport) -> Result<()> {
        let first_row = report.rows;
        let area_name = match self.dataset {
            DatasetKind::Parcels => "area_sqft",
            DatasetKind::Buildings => "footprint_area_sqft",
        };

        let geometry = column::<BinaryArray>(batch, GEOMETRY_COLUMN)?;
        let area = column::<Float64Array>(batch, area_name)?;
        let inferred_flag = column::<BooleanArray>(batch, "inferred_flag")?;
        let inference_method = column::<StringArray>(batch, "inference_method")?;

        for i in 0..batch.num_rows() {
            let row = first_row + i as u64;

            self.check_geometry(geometry, area, i, row, report);

            let flag = !inferred_flag.is_null(i) && inferred_flag.value(i);
            match (flag, text(inference_method, i)) {
                (false, Some(method)) => report.push(
                    Some(row),
                    "inference_method",
                    format!("method `{}` without inferred_flag", method),
                ),
                (true, None) => report.push(Some(row), "inference_method", "inferred_flag without method"),
                _ => {}
            }
        }

        match self.dataset {
            DatasetKind::Parcels => self.check_parcels(batch, first_row, report),
            DatasetKind::Buildings => self.check_buildings(batch, first_row, inferred_flag, report),
        }
    }

    fn check_geometry(
        &self,
        geometry: &BinaryArray,
        area: &Float64Array,
        i: usize,
        row: u64,
        report: &mut VerifyReport,
    ) {
        if geometry.is_null(i) {
            report.push(Some(row), "geometry", "null geometry");
            return;
        }

        let geom = match Wkb(geometry.value(i).to_vec()).to_geo() {
            Ok(geom) => geom,
            Err(e) => {
                report.push(Some(row), "geometry", format!("WKB decode failed: {}", e));
                return;
            }
        };

        if let Err(rule) = geofeed::validate::check(&geom) {
            report.push(Some(row), "geometry", format!("invalid geometry: {}", rule));
        }

        if area.is_null(i) {
            report.push(Some(row), "area", "null area");
            return;
        }
        let stored = area.value(i);

        if !self.bounds.contains(stored) {
            report.push(
                Some(row),
                "area_bounds",
                format!(
                    "{:.1} sqft outside [{}, {})",
                    stored, self.bounds.min_sqft, self.bounds.max_sqft
                ),
            );
        }

        let recomputed = area::square_feet(&geom, self.model);
        if (recomputed - stored).abs() > AREA_TOLERANCE * stored.abs().max(1.0) {
            debug!(row = row, stored = stored, recomputed = recomputed, "Area mismatch");
            report.push(
                Some(row),
                "area_consistency",
                format!("stored {:.3} sqft, geometry gives {:.3}", stored, recomputed),
            );
        }
    }

    fn check_parcels(&self, batch: &RecordBatch, first_row: u64, report: &mut VerifyReport) -> Result<()> {
        let state = column::<StringArray>(batch, "state")?;
        let zoning = column::<StringArray>(batch, "zoning_raw")?;
        let land_use = column::<StringArray>(batch, "land_use_raw")?;

        for i in 0..batch.num_rows() {
            let row = first_row + i as u64;
            if text(state, i) != Some(STATE) {
                report.push(Some(row), "state", format!("state is {:?}", text(state, i)));
            }
            if !zoning.is_null(i) {
                report.push(Some(row), "null_column", "zoning_raw is not null");
            }
            if !land_use.is_null(i) {
                report.push(Some(row), "null_column", "land_use_raw is not null");
            }
        }
        Ok(())
    }

    fn check_buildings(
        &self,
        batch: &RecordBatch,
        first_row: u64,
        inferred_flag: &BooleanArray,
        report: &mut VerifyReport,
    ) -> Result<()> {
        let building_id = column::<Int64Array>(batch, "building_id")?;
        let parcel_apn = column::<StringArray>(batch, "parcel_apn")?;
        let null_columns = ["height_ft", "stories"].map(|name| (name, batch.column_by_name(name)));

        for i in 0..batch.num_rows() {
            let row = first_row + i as u64;
            let expected = row as i64 + 1;

            if building_id.is_null(i) || building_id.value(i) != expected {
                report.push(
                    Some(row),
                    "building_id",
                    format!("expected {}, found {:?}", expected, (!building_id.is_null(i)).then(|| building_id.value(i))),
                );
            }
            if !parcel_apn.is_null(i) {
                report.push(Some(row), "null_column", "parcel_apn is not null");
            }
            for (name, array) in &null_columns {
                match array {
                    Some(array) if array.is_null(i) => {}
                    Some(_) => report.push(Some(row), "null_column", format!("{} is not null", name)),
                    None => report.push(Some(row), "null_column", format!("{} column missing", name)),
                }
            }
            if !inferred_flag.is_null(i) && inferred_flag.value(i) {
                report.push(Some(row), "inferred_flag", "buildings are never inferred");
            }
        }
        Ok(())
    }
}
