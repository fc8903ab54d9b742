//! Enregistrements produits par l'export

use chrono::{DateTime, Utc};
use geo::Geometry;
use geofeed::Invalidity;
use std::sync::Arc;

/// Valeur de la colonne `state`
pub const STATE: &str = "California";

/// Méthode d'inférence du comté depuis le nom de fichier
pub const COUNTY_FROM_FILENAME: &str = "county_from_filename_fips";

/// Raison de l'abandon d'un enregistrement source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    MissingGeometry,
    ReprojectionFailed,
    InvalidGeometry(Invalidity),
    AreaBelowMinimum,
    AreaAboveMaximum,
    DuplicateGeometry,
}

impl DropReason {
    /// Identifiant stable (rapports)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingGeometry => "missing_geometry",
            Self::ReprojectionFailed => "reprojection_failed",
            Self::InvalidGeometry(_) => "invalid_geometry",
            Self::AreaBelowMinimum => "area_below_minimum",
            Self::AreaAboveMaximum => "area_above_maximum",
            Self::DuplicateGeometry => "duplicate_geometry",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidGeometry(rule) => write!(f, "invalid_geometry ({})", rule),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Résultat du traitement d'un enregistrement source
#[derive(Debug, Clone)]
pub enum Outcome<R> {
    Emitted(R),
    Dropped(DropReason),
}

impl<R> Outcome<R> {
    pub fn emitted(self) -> Option<R> {
        match self {
            Self::Emitted(record) => Some(record),
            Self::Dropped(_) => None,
        }
    }

    pub fn is_emitted(&self) -> bool {
        matches!(self, Self::Emitted(_))
    }
}

/// Métadonnées fixes d'un export, partagées par tous les enregistrements
#[derive(Debug, Clone, PartialEq)]
pub struct Stamp {
    pub source_system: String,
    pub source_table: String,
    pub spatial_resolution: String,
    pub export_timestamp: DateTime<Utc>,
    pub license_note: String,
    /// Colonne `source` (bâtiments)
    pub source_label: String,
}

/// Bloc de provenance d'un enregistrement
#[derive(Debug, Clone)]
pub struct Provenance {
    pub stamp: Arc<Stamp>,
    /// Identifiant de l'enregistrement dans la table d'origine
    pub source_id: Option<String>,
}

/// Parcelle exportée
#[derive(Debug, Clone)]
pub struct ParcelRecord {
    pub apn: Option<String>,
    /// Géométrie EPSG:4326, valide
    pub geometry: Geometry,
    pub area_sqft: f64,
    pub city: Option<String>,
    pub county: Option<String>,
    pub provenance: Provenance,
    pub inferred_flag: bool,
    /// `None` si et seulement si `inferred_flag` est faux
    pub inference_method: Option<String>,
}

impl ParcelRecord {
    pub fn state(&self) -> &'static str {
        STATE
    }

    /// Toujours nul : aucune inférence de zonage
    pub fn zoning_raw(&self) -> Option<&str> {
        None
    }

    /// Toujours nul : aucune inférence d'usage du sol
    pub fn land_use_raw(&self) -> Option<&str> {
        None
    }
}

/// Emprise de bâtiment exportée.
///
/// `building_id` est attribué par le writer, dans l'ordre d'émission.
#[derive(Debug, Clone)]
pub struct BuildingRecord {
    pub geometry: Geometry,
    pub footprint_area_sqft: f64,
    pub provenance: Provenance,
    /// Score de confiance ; les sentinelles négatives sont déjà nulles
    pub confidence: Option<f64>,
    pub release: Option<i32>,
    pub capture_dates: Option<String>,
}

impl BuildingRecord {
    /// Toujours nul : aucun rattachement aux parcelles
    pub fn parcel_apn(&self) -> Option<&str> {
        None
    }

    /// Toujours nul : aucune inférence de hauteur
    pub fn height_ft(&self) -> Option<f64> {
        None
    }

    pub fn stories(&self) -> Option<i32> {
        None
    }

    pub fn inferred_flag(&self) -> bool {
        false
    }

    pub fn inference_method(&self) -> Option<&str> {
        None
    }
}
