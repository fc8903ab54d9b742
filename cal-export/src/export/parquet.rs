//! Écriture Parquet (géométrie WKB, métadonnées GeoParquet)

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use arrow::array::{
    new_null_array, ArrayRef, BinaryArray, BooleanArray, Float64Array, Int32Array, Int64Array,
    StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use geo::{BoundingRect, Geometry};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wkb::geom_to_wkb;

use super::record::{BuildingRecord, ParcelRecord, Provenance, STATE};
use super::settings::ExportSettings;

/// Colonne géométrique principale
pub const GEOMETRY_COLUMN: &str = "geometry";

/// Clé des métadonnées GeoParquet
pub const GEO_METADATA_KEY: &str = "geo";

/// Version GeoParquet écrite
pub const GEOPARQUET_VERSION: &str = "1.0.0";

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
}

fn provenance_fields() -> Vec<Field> {
    vec![
        Field::new("source_system", DataType::Utf8, false),
        Field::new("source_table", DataType::Utf8, false),
        Field::new("source_id", DataType::Utf8, true),
        Field::new("spatial_resolution", DataType::Utf8, false),
        Field::new("export_timestamp", timestamp_type(), false),
    ]
}

/// Schéma de `parcels.parquet`
pub fn parcel_schema() -> SchemaRef {
    let mut fields = vec![
        Field::new("apn", DataType::Utf8, true),
        Field::new(GEOMETRY_COLUMN, DataType::Binary, false),
        Field::new("area_sqft", DataType::Float64, false),
        Field::new("city", DataType::Utf8, true),
        Field::new("county", DataType::Utf8, true),
        Field::new("state", DataType::Utf8, false),
        Field::new("zoning_raw", DataType::Utf8, true),
        Field::new("land_use_raw", DataType::Utf8, true),
    ];
    fields.extend(provenance_fields());
    fields.extend([
        Field::new("inferred_flag", DataType::Boolean, false),
        Field::new("inference_method", DataType::Utf8, true),
        Field::new("license_note", DataType::Utf8, false),
    ]);
    Arc::new(Schema::new(fields))
}

/// Schéma de `buildings.parquet`
pub fn building_schema() -> SchemaRef {
    let mut fields = vec![
        Field::new("building_id", DataType::Int64, false),
        Field::new("parcel_apn", DataType::Utf8, true),
        Field::new(GEOMETRY_COLUMN, DataType::Binary, false),
        Field::new("footprint_area_sqft", DataType::Float64, false),
        Field::new("height_ft", DataType::Float64, true),
        Field::new("stories", DataType::Int32, true),
        Field::new("source", DataType::Utf8, false),
    ];
    fields.extend(provenance_fields());
    fields.extend([
        Field::new("confidence", DataType::Float64, true),
        Field::new("release", DataType::Int32, true),
        Field::new("capture_dates", DataType::Utf8, true),
        Field::new("inferred_flag", DataType::Boolean, false),
        Field::new("inference_method", DataType::Utf8, true),
        Field::new("license_note", DataType::Utf8, false),
    ]);
    Arc::new(Schema::new(fields))
}

/// Enregistrement sérialisable en RecordBatch
pub trait ParquetRecord: Sized {
    fn schema() -> SchemaRef;

    fn geometry(&self) -> &Geometry;

    /// Construit un lot ; `first_row` est le rang (0-based) de la première ligne
    fn to_batch(rows: &[Self], first_row: u64) -> Result<RecordBatch>;
}

fn wkb_column(geometries: impl Iterator<Item = Result<Vec<u8>>>) -> Result<ArrayRef> {
    let encoded = geometries.collect::<Result<Vec<_>>>()?;
    Ok(Arc::new(BinaryArray::from_iter_values(encoded.iter())))
}

fn encode_wkb(geom: &Geometry) -> Result<Vec<u8>> {
    geom_to_wkb(geom).map_err(|e| anyhow!("Failed to convert geometry to WKB: {:?}", e))
}

fn provenance_columns<'a>(provenance: impl Iterator<Item = &'a Provenance> + Clone) -> Vec<ArrayRef> {
    vec![
        Arc::new(StringArray::from_iter_values(
            provenance.clone().map(|p| p.stamp.source_system.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            provenance.clone().map(|p| p.stamp.source_table.as_str()),
        )),
        Arc::new(StringArray::from_iter(
            provenance.clone().map(|p| p.source_id.as_deref()),
        )),
        Arc::new(StringArray::from_iter_values(
            provenance.clone().map(|p| p.stamp.spatial_resolution.as_str()),
        )),
        Arc::new(
            TimestampMicrosecondArray::from_iter_values(
                provenance.map(|p| p.stamp.export_timestamp.timestamp_micros()),
            )
            .with_timezone("UTC"),
        ),
    ]
}

fn license_column<'a>(provenance: impl Iterator<Item = &'a Provenance>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(
        provenance.map(|p| p.stamp.license_note.as_str()),
    ))
}

impl ParquetRecord for ParcelRecord {
    fn schema() -> SchemaRef {
        parcel_schema()
    }

    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn to_batch(rows: &[Self], _first_row: u64) -> Result<RecordBatch> {
        let n = rows.len();
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.apn.as_deref()))),
            wkb_column(rows.iter().map(|r| encode_wkb(&r.geometry)))?,
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.area_sqft))),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.city.as_deref()))),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.county.as_deref()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|_| STATE))),
            new_null_array(&DataType::Utf8, n),
            new_null_array(&DataType::Utf8, n),
        ];
        columns.extend(provenance_columns(rows.iter().map(|r| &r.provenance)));
        columns.push(Arc::new(BooleanArray::from(
            rows.iter().map(|r| r.inferred_flag).collect::<Vec<_>>(),
        )));
        columns.push(Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.inference_method.as_deref()),
        )));
        columns.push(license_column(rows.iter().map(|r| &r.provenance)));

        RecordBatch::try_new(parcel_schema(), columns).context("Failed to build parcel batch")
    }
}

impl ParquetRecord for BuildingRecord {
    fn schema() -> SchemaRef {
        building_schema()
    }

    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn to_batch(rows: &[Self], first_row: u64) -> Result<RecordBatch> {
        let n = rows.len();
        let first_id = first_row as i64 + 1;
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(first_id..first_id + n as i64)),
            new_null_array(&DataType::Utf8, n),
            wkb_column(rows.iter().map(|r| encode_wkb(&r.geometry)))?,
            Arc::new(Float64Array::from_iter_values(
                rows.iter().map(|r| r.footprint_area_sqft),
            )),
            new_null_array(&DataType::Float64, n),
            new_null_array(&DataType::Int32, n),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.provenance.stamp.source_label.as_str()),
            )),
        ];
        columns.extend(provenance_columns(rows.iter().map(|r| &r.provenance)));
        columns.push(Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.confidence))));
        columns.push(Arc::new(Int32Array::from_iter(rows.iter().map(|r| r.release))));
        columns.push(Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.capture_dates.as_deref()),
        )));
        columns.push(Arc::new(BooleanArray::from(vec![false; n])));
        columns.push(new_null_array(&DataType::Utf8, n));
        columns.push(license_column(rows.iter().map(|r| &r.provenance)));

        RecordBatch::try_new(building_schema(), columns).context("Failed to build building batch")
    }
}

/// Emprise des géométries écrites (lon/lat)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    fn extend(self, other: BBox) -> BBox {
        BBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn of(geom: &Geometry) -> Option<BBox> {
        geom.bounding_rect().map(|r| BBox {
            min_x: r.min().x,
            min_y: r.min().y,
            max_x: r.max().x,
            max_y: r.max().y,
        })
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

/// Statistiques géométriques accumulées pour les métadonnées GeoParquet
#[derive(Debug, Default, Clone)]
struct GeometryStats {
    bbox: Option<BBox>,
    has_polygon: bool,
    has_multipolygon: bool,
}

impl GeometryStats {
    fn add(&mut self, geom: &Geometry) {
        match geom {
            Geometry::Polygon(_) => self.has_polygon = true,
            Geometry::MultiPolygon(_) => self.has_multipolygon = true,
            _ => {}
        }
        if let Some(bbox) = BBox::of(geom) {
            self.bbox = Some(match self.bbox {
                Some(current) => current.extend(bbox),
                None => bbox,
            });
        }
    }

    fn geometry_types(&self) -> Vec<&'static str> {
        let mut types = Vec::new();
        if self.has_polygon {
            types.push("Polygon");
        }
        if self.has_multipolygon {
            types.push("MultiPolygon");
        }
        types
    }

    /// Métadonnées `geo` (GeoParquet 1.0.0, CRS omis = OGC:CRS84)
    fn geo_metadata(&self) -> String {
        let mut column = serde_json::json!({
            "encoding": "WKB",
            "geometry_types": self.geometry_types(),
        });
        if let Some(bbox) = self.bbox {
            column["bbox"] = serde_json::json!(bbox.as_array());
        }

        serde_json::json!({
            "version": GEOPARQUET_VERSION,
            "primary_column": GEOMETRY_COLUMN,
            "columns": { GEOMETRY_COLUMN: column },
        })
        .to_string()
    }
}

fn writer_properties(settings: &ExportSettings) -> WriterProperties {
    let created_by = KeyValue {
        key: "created_by".to_string(),
        value: Some(format!("cal-export {}", env!("CARGO_PKG_VERSION"))),
    };
    WriterProperties::builder()
        .set_compression(settings.compression.to_parquet())
        .set_max_row_group_size(settings.batch_size.max(1) * 20)
        .set_key_value_metadata(Some(vec![created_by]))
        .build()
}

/// Writer Parquet par lots
pub struct ParquetSink<R: ParquetRecord> {
    writer: ArrowWriter<File>,
    buffer: Vec<R>,
    batch_size: usize,
    rows_flushed: u64,
    stats: GeometryStats,
    path: PathBuf,
}

pub type ParcelSink = ParquetSink<ParcelRecord>;

/// Les `building_id` sont attribués à l'écriture : 1, 2, 3... dans l'ordre de `push`
pub type BuildingSink = ParquetSink<BuildingRecord>;

impl<R: ParquetRecord> ParquetSink<R> {
    /// Crée le fichier de sortie
    pub fn create(path: &Path, settings: &ExportSettings) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory {}", parent.display()))?;
        }

        let file = File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
        let writer = ArrowWriter::try_new(file, R::schema(), Some(writer_properties(settings)))
            .context("Parquet writer init failed")?;

        Ok(Self {
            writer,
            buffer: Vec::with_capacity(settings.batch_size.max(1)),
            batch_size: settings.batch_size.max(1),
            rows_flushed: 0,
            stats: GeometryStats::default(),
            path: path.to_path_buf(),
        })
    }

    /// Ajoute un enregistrement ; retourne son rang 1-based dans le fichier
    pub fn push(&mut self, record: R) -> Result<u64> {
        self.stats.add(record.geometry());
        self.buffer.push(record);
        let row = self.rows_pushed();

        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(row)
    }

    /// Nombre de lignes acceptées (écrites ou en attente)
    pub fn rows_pushed(&self) -> u64 {
        self.rows_flushed + self.buffer.len() as u64
    }

    /// Emprise des géométries acceptées
    pub fn bbox(&self) -> Option<BBox> {
        self.stats.bbox
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let batch = R::to_batch(&self.buffer, self.rows_flushed)?;
        self.writer.write(&batch).context("Parquet write failed")?;
        self.rows_flushed += self.buffer.len() as u64;
        debug!(path = %self.path.display(), rows = self.rows_flushed, "Batch written");
        self.buffer.clear();
        Ok(())
    }

    /// Termine le fichier ; retourne le nombre de lignes écrites
    pub fn close(mut self) -> Result<u64> {
        self.flush()?;

        self.writer.append_key_value_metadata(KeyValue {
            key: GEO_METADATA_KEY.to_string(),
            value: Some(self.stats.geo_metadata()),
        });
        self.writer.close().context("Parquet close failed")?;

        Ok(self.rows_flushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::record::Stamp;
    use chrono::TimeZone;
    use geo::{polygon, MultiPolygon, Polygon};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn stamp() -> Arc<Stamp> {
        Arc::new(Stamp {
            source_system: "ms".to_string(),
            source_table: "ca".to_string(),
            spatial_resolution: "building".to_string(),
            export_timestamp: chrono::Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            license_note: "ODbL".to_string(),
            source_label: "Microsoft Building Footprints".to_string(),
        })
    }

    fn square(x: f64) -> Polygon {
        polygon![
            (x: x, y: 37.0),
            (x: x + 0.0002, y: 37.0),
            (x: x + 0.0002, y: 37.0002),
            (x: x, y: 37.0002),
            (x: x, y: 37.0),
        ]
    }

    fn building(x: f64) -> BuildingRecord {
        BuildingRecord {
            geometry: Geometry::Polygon(square(x)),
            footprint_area_sqft: 4348.0,
            provenance: Provenance {
                stamp: stamp(),
                source_id: None,
            },
            confidence: Some(0.9),
            release: Some(2),
            capture_dates: None,
        }
    }

    #[test]
    fn test_building_ids_are_dense_across_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/buildings.parquet");
        let settings = ExportSettings {
            batch_size: 3,
            ..ExportSettings::default()
        };

        let mut sink = BuildingSink::create(&path, &settings).unwrap();
        for i in 0..7 {
            let row = sink.push(building(-122.0 + i as f64 * 0.001)).unwrap();
            assert_eq!(row, i as u64 + 1);
        }
        let bbox = sink.bbox().unwrap();
        assert_eq!(sink.close().unwrap(), 7);
        assert!((bbox.min_x - (-122.0)).abs() < 1e-12);

        let file = File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();
        let mut ids = Vec::new();
        for batch in reader {
            let batch = batch.unwrap();
            let col = batch
                .column_by_name("building_id")
                .unwrap()
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap();
            ids.extend(col.values().iter().copied());
            assert_eq!(batch.column_by_name("parcel_apn").unwrap().null_count(), batch.num_rows());
        }
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_geo_metadata() {
        let mut stats = GeometryStats::default();
        stats.add(&Geometry::Polygon(square(-122.0)));
        stats.add(&Geometry::MultiPolygon(MultiPolygon::new(vec![square(-121.0)])));

        let meta: serde_json::Value = serde_json::from_str(&stats.geo_metadata()).unwrap();
        assert_eq!(meta["version"], "1.0.0");
        assert_eq!(meta["primary_column"], "geometry");
        assert_eq!(meta["columns"]["geometry"]["encoding"], "WKB");
        assert_eq!(
            meta["columns"]["geometry"]["geometry_types"],
            serde_json::json!(["Polygon", "MultiPolygon"])
        );
        assert!(meta["columns"]["geometry"].get("crs").is_none());
        assert_eq!(meta["columns"]["geometry"]["bbox"][0], -122.0);
    }

    #[test]
    fn test_empty_file_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcels.parquet");
        let sink = ParcelSink::create(&path, &ExportSettings::default()).unwrap();
        assert_eq!(sink.close().unwrap(), 0);

        let file = File::open(&path).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        assert_eq!(builder.schema().fields().len(), parcel_schema().fields().len());
        let kv = builder.metadata().file_metadata().key_value_metadata().unwrap();
        assert!(kv.iter().any(|kv| kv.key == GEO_METADATA_KEY));
    }
}
