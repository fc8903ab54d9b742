//! # cal-export
//!
//! Export des parcelles cadastrales et des emprises de bâtiments de Californie
//! vers Parquet (géométrie WKB en EPSG:4326, métadonnées GeoParquet), avec
//! conservation de la provenance de chaque enregistrement.
//!
//! ## Features
//!
//! - Lecture GeoJSON / GeoJSONSeq (éventuellement `.bz2`) via `geofeed`
//! - Reprojection pure Rust des CRS californiens vers EPSG:4326
//! - Filtrage par validité géométrique et par surface, sans réparation
//! - Vérification des fichiers produits
//!
//! ## Usage CLI
//!
//! ```bash
//! cal-export parcels --input ./parcels/ --output parcels.parquet
//! cal-export buildings --input 'footprints/*.geojsonl.bz2' --output buildings.parquet
//! cal-export verify parcels.parquet buildings.parquet
//! ```

pub mod config;
pub mod export;
pub mod report;
pub mod reproject_lite;
pub mod verify;

pub use config::{DatasetConfig, DatasetKind};
pub use export::pipeline::run;
pub use report::{ExportReport, ExportStatus};
pub use verify::{verify_file, VerifyReport};
