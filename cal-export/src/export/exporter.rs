//! Exporteur avec conservation de la provenance
//!
//! Un enregistrement source donne au plus un enregistrement exporté :
//! géométrie présente → reprojection → arrondi optionnel → validité →
//! surface → bornes → estampillage. Les géométries invalides ne sont jamais
//! réparées. Aucun effet de bord, aucune lecture croisée entre jeux de données.

use geo::Geometry;
use geofeed::{validate, County, SourceRecord};
use std::sync::Arc;
use tracing::debug;

use super::area::{self, AreaBounds, AreaModel};
use super::precision::round_geometry_coords;
use super::record::{
    BuildingRecord, DropReason, Outcome, ParcelRecord, Provenance, Stamp, COUNTY_FROM_FILENAME,
};
use crate::config::DatasetConfig;
use crate::reproject_lite::SmartReprojector;

/// Contexte d'un fichier source
pub struct SourceContext {
    /// Nom du fichier (logs)
    pub file: String,
    /// Reprojection du CRS source vers EPSG:4326
    pub reprojector: SmartReprojector,
    /// Comté déduit du nom de fichier
    pub county: Option<County>,
}

impl SourceContext {
    /// Contexte pour une source déjà en EPSG:4326
    pub fn wgs84(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            reprojector: SmartReprojector::Identity,
            county: None,
        }
    }
}

/// Options de traitement communes
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    pub area_model: AreaModel,
    /// Nombre de décimales conservées (désactivé par défaut)
    pub precision: Option<u8>,
}

/// Étapes géométriques communes aux deux jeux de données
#[derive(Debug, Clone, Copy)]
struct GeometryPipeline {
    bounds: AreaBounds,
    options: ExportOptions,
}

impl GeometryPipeline {
    fn run(&self, record: &SourceRecord, ctx: &SourceContext) -> Result<(Geometry, f64), DropReason> {
        let geometry = record.geometry.as_ref().ok_or(DropReason::MissingGeometry)?;

        let geometry = ctx.reprojector.transform_geometry(geometry).map_err(|e| {
            debug!(file = %ctx.file, index = record.index, error = %e, "Reprojection failed");
            DropReason::ReprojectionFailed
        })?;

        let geometry = match self.options.precision {
            Some(decimals) => round_geometry_coords(&geometry, decimals),
            None => geometry,
        };

        validate::check(&geometry).map_err(DropReason::InvalidGeometry)?;

        let area_sqft = area::square_feet(&geometry, self.options.area_model);
        self.bounds.check(area_sqft)?;

        Ok((geometry, area_sqft))
    }
}

/// Exporteur de parcelles
pub struct ParcelExporter {
    pipeline: GeometryPipeline,
    stamp: Arc<Stamp>,
    apn_keys: Vec<String>,
    city_keys: Vec<String>,
    county_keys: Vec<String>,
    source_id_keys: Vec<String>,
    county_from_filename: bool,
}

impl ParcelExporter {
    pub fn new(config: &DatasetConfig, stamp: Arc<Stamp>, options: ExportOptions) -> Self {
        Self {
            pipeline: GeometryPipeline {
                bounds: config.bounds(),
                options,
            },
            stamp,
            apn_keys: config.sources_for("apn"),
            city_keys: config.sources_for("city"),
            county_keys: config.sources_for("county"),
            source_id_keys: config.sources_for("source_id"),
            county_from_filename: config.county_from_filename,
        }
    }

    /// Traite un enregistrement source
    pub fn process(&self, record: &SourceRecord, ctx: &SourceContext) -> Outcome<ParcelRecord> {
        let (geometry, area_sqft) = match self.pipeline.run(record, ctx) {
            Ok(result) => result,
            Err(reason) => return Outcome::Dropped(reason),
        };

        let mut inference_method = None;
        let county = match record.text(&self.county_keys) {
            Some(county) => Some(county),
            None if self.county_from_filename => ctx.county.map(|c| {
                inference_method = Some(COUNTY_FROM_FILENAME.to_string());
                c.name.to_string()
            }),
            None => None,
        };

        Outcome::Emitted(ParcelRecord {
            apn: record.text(&self.apn_keys),
            geometry,
            area_sqft,
            city: record.text(&self.city_keys),
            county,
            provenance: Provenance {
                stamp: Arc::clone(&self.stamp),
                source_id: record.text(&self.source_id_keys).or_else(|| record.id.clone()),
            },
            inferred_flag: inference_method.is_some(),
            inference_method,
        })
    }
}

/// Exporteur d'emprises de bâtiments
pub struct BuildingExporter {
    pipeline: GeometryPipeline,
    stamp: Arc<Stamp>,
    confidence_keys: Vec<String>,
    release_keys: Vec<String>,
    capture_dates_keys: Vec<String>,
    source_id_keys: Vec<String>,
}

impl BuildingExporter {
    pub fn new(config: &DatasetConfig, stamp: Arc<Stamp>, options: ExportOptions) -> Self {
        Self {
            pipeline: GeometryPipeline {
                bounds: config.bounds(),
                options,
            },
            stamp,
            confidence_keys: config.sources_for("confidence"),
            release_keys: config.sources_for("release"),
            capture_dates_keys: config.sources_for("capture_dates"),
            source_id_keys: config.sources_for("source_id"),
        }
    }

    /// Traite un enregistrement source
    pub fn process(&self, record: &SourceRecord, ctx: &SourceContext) -> Outcome<BuildingRecord> {
        let (geometry, footprint_area_sqft) = match self.pipeline.run(record, ctx) {
            Ok(result) => result,
            Err(reason) => return Outcome::Dropped(reason),
        };

        Outcome::Emitted(BuildingRecord {
            geometry,
            footprint_area_sqft,
            provenance: Provenance {
                stamp: Arc::clone(&self.stamp),
                source_id: record.text(&self.source_id_keys).or_else(|| record.id.clone()),
            },
            // -1 signale l'absence de score dans les sources
            confidence: record.number(&self.confidence_keys).filter(|c| *c >= 0.0),
            release: record.number(&self.release_keys).and_then(release_number),
            capture_dates: record.text(&self.capture_dates_keys),
        })
    }
}

fn release_number(value: f64) -> Option<i32> {
    if value.fract() == 0.0 && value >= i32::MIN as f64 && value <= i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}

/// Estampille d'un export depuis sa configuration
pub fn stamp_from_config(config: &DatasetConfig, export_timestamp: chrono::DateTime<chrono::Utc>) -> Stamp {
    Stamp {
        source_system: config.source_system.clone(),
        source_table: config.source_table.clone(),
        spatial_resolution: config.spatial_resolution().to_string(),
        export_timestamp,
        license_note: config.license_note.clone(),
        source_label: config
            .source_label
            .clone()
            .unwrap_or_else(|| config.source_system.clone()),
    }
}
