//! Types de données pour le crate geofeed

use geo::Geometry;
use serde_json::{Map, Value};

use crate::county::County;
use crate::GeofeedError;

/// Résultat de la lecture d'un fichier source
#[derive(Debug)]
pub struct SourceBatch {
    /// Enregistrements dans l'ordre du fichier
    pub records: Vec<SourceRecord>,

    /// Format détecté
    pub format: SourceFormat,

    /// Système de coordonnées déclaré par la source
    pub crs: Crs,

    /// Membre `crs` présent mais non reconnu ; `crs` vaut alors WGS84 par
    /// défaut et ne doit pas être utilisé sans CRS imposé
    pub unknown_crs: Option<String>,

    /// Comté déduit du nom de fichier (code FIPS), si présent
    pub county: Option<County>,

    /// Erreurs non fatales rencontrées pendant la lecture
    pub errors: Vec<GeofeedError>,
}

impl SourceBatch {
    /// Nombre d'enregistrements avec une géométrie exploitable
    pub fn with_geometry(&self) -> usize {
        self.records.iter().filter(|r| r.geometry.is_some()).count()
    }
}

/// Un enregistrement brut tel que lu dans la source
#[derive(Debug, Clone)]
pub struct SourceRecord {
    /// Position dans le fichier (0-based)
    pub index: usize,

    /// Membre `id` de la feature GeoJSON, s'il existe
    pub id: Option<String>,

    /// Géométrie convertie, `None` si absente ou non convertible
    pub geometry: Option<Geometry>,

    /// Propriétés brutes
    pub properties: Map<String, Value>,
}

impl SourceRecord {
    /// Première valeur textuelle non vide parmi les propriétés candidates.
    ///
    /// Les nombres et booléens sont rendus sous forme textuelle.
    pub fn text(&self, keys: &[String]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.properties.get(k))
            .find_map(crate::parser::properties::as_text)
    }

    /// Première valeur numérique parmi les propriétés candidates.
    ///
    /// Accepte les nombres JSON et les chaînes numériques (`"0.97"`).
    pub fn number(&self, keys: &[String]) -> Option<f64> {
        keys.iter()
            .filter_map(|k| self.properties.get(k))
            .find_map(crate::parser::properties::as_number)
    }
}

/// Format d'un fichier source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Un objet GeoJSON `FeatureCollection`
    FeatureCollection,
    /// Une feature GeoJSON par ligne (GeoJSONL, GeoJSONSeq RFC 8142)
    Sequence,
}

impl SourceFormat {
    /// Détermine le format depuis l'extension (hors `.bz2`)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "geojson" | "json" => Some(Self::FeatureCollection),
            "geojsonl" | "geojsons" | "geojsonseq" | "ndjson" | "jsonl" => Some(Self::Sequence),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeatureCollection => "FeatureCollection",
            Self::Sequence => "GeoJSONSeq",
        }
    }
}

/// Système de coordonnées déclaré par une source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crs {
    /// Code EPSG
    pub epsg: u32,
}

impl Crs {
    /// WGS84 longitude/latitude (défaut GeoJSON)
    pub const WGS84: Crs = Crs { epsg: 4326 };
}

impl Default for Crs {
    fn default() -> Self {
        Self::WGS84
    }
}
