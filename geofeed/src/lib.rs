//! # geofeed
//!
//! Lecture des sources brutes de parcelles et d'emprises de bâtiments
//! (GeoJSON `FeatureCollection`, GeoJSON ligne à ligne / GeoJSONSeq).
//!
//! ## Features
//!
//! - Découpage des lignes SIMD avec `memchr`, validation UTF-8 avec `simdutf8`
//! - Décompression `.bz2` transparente
//! - Détection du CRS source (membre `crs` historique)
//! - Prédicat de validité des polygones (aucune réparation)
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! use geofeed::{read, validate};
//! use std::path::Path;
//!
//! let batch = read(Path::new("parcels_06037.geojsonl.bz2"))?;
//! println!("EPSG: {}", batch.crs.epsg);
//!
//! for record in &batch.records {
//!     if let Some(geometry) = &record.geometry {
//!         println!("{}: valid = {}", record.index, validate::is_valid(geometry));
//!     }
//! }
//! ```

pub mod county;
pub mod error;
pub mod input;
pub mod parser;
pub mod types;
pub mod validate;

pub use county::{county_from_path, County};
pub use error::GeofeedError;
pub use types::{Crs, SourceBatch, SourceFormat, SourceRecord};
pub use validate::Invalidity;

use encoding_rs::Encoding;
use std::path::Path;
use tracing::debug;

/// Options de lecture
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Encodage utilisé quand le contenu n'est pas de l'UTF-8 valide
    pub fallback_encoding: &'static Encoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            fallback_encoding: encoding_rs::WINDOWS_1252,
        }
    }
}

/// Lit un fichier source et retourne ses enregistrements.
///
/// # Errors
///
/// Retourne `GeofeedError` si le fichier est illisible ou si son contenu
/// n'est pas une `FeatureCollection`. Les problèmes propres à une feature
/// sont collectés dans [`SourceBatch::errors`].
pub fn read(path: &Path) -> Result<SourceBatch, GeofeedError> {
    read_with(path, &ReadOptions::default())
}

/// Comme [`read`], avec des options explicites
pub fn read_with(path: &Path, options: &ReadOptions) -> Result<SourceBatch, GeofeedError> {
    let file = path.display().to_string();
    let source = input::load(path)?;
    let text = input::decode(&source.data, options.fallback_encoding, &file);

    let format = source.format.unwrap_or_else(|| parser::sniff_format(&text));
    let parsed = parser::parse(&text, format, &file)?;
    let county = county_from_path(path);

    debug!(
        file = %file,
        format = format.as_str(),
        compressed = source.compressed,
        records = parsed.records.len(),
        errors = parsed.errors.len(),
        epsg = parsed.crs.epsg,
        "Source read"
    );

    Ok(SourceBatch {
        records: parsed.records,
        format,
        crs: parsed.crs,
        unknown_crs: parsed.unknown_crs,
        county,
        errors: parsed.errors,
    })
}
