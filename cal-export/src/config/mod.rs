//! Configuration des jeux de données exportés

use serde::{Deserialize, Serialize};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::export::area::AreaBounds;

/// Jeu de données produit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Parcels,
    Buildings,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parcels => "parcels",
            Self::Buildings => "buildings",
        }
    }

    /// Colonnes cibles alimentées depuis les propriétés source
    pub fn mappable_targets(&self) -> &'static [&'static str] {
        match self {
            Self::Parcels => &["apn", "city", "county", "source_id"],
            Self::Buildings => &["confidence", "release", "capture_dates", "source_id"],
        }
    }

    fn default_resolution(&self) -> &'static str {
        match self {
            Self::Parcels => "parcel",
            Self::Buildings => "building",
        }
    }

    fn default_bounds(&self) -> AreaBounds {
        match self {
            Self::Parcels => AreaBounds::PARCELS,
            Self::Buildings => AreaBounds::BUILDINGS,
        }
    }
}

/// Configuration d'un jeu de données
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetConfig {
    pub dataset: DatasetKind,

    /// Provenance : système d'origine
    pub source_system: String,

    /// Provenance : table d'origine
    pub source_table: String,

    /// Étiquette de résolution spatiale (`parcel`, `building`)
    #[serde(default)]
    pub spatial_resolution: Option<String>,

    pub license_note: String,

    /// Colonne `source` des bâtiments
    #[serde(default)]
    pub source_label: Option<String>,

    /// EPSG imposé aux sources (prioritaire sur leur membre `crs`)
    #[serde(default)]
    pub source_epsg: Option<u32>,

    /// Bornes de surface `[min, max)` en pieds carrés
    #[serde(default)]
    pub area: Option<AreaBounds>,

    /// Mapping des propriétés source vers les colonnes
    pub fields: Vec<FieldMapping>,

    /// Déduire le comté du code FIPS présent dans le nom de fichier
    #[serde(default)]
    pub county_from_filename: bool,
}

/// Mapping d'un champ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldMapping {
    /// Nom de la propriété source
    pub source: String,

    /// Nom de la colonne cible
    pub target: String,
}

impl DatasetConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "parcels" => Self::load_embedded(include_str!("presets/parcels.json")),
            "buildings" => Self::load_embedded(include_str!("presets/buildings.json")),
            _ => bail!("Unknown preset: {}. Use: parcels, buildings", preset),
        }
    }

    /// Preset si le nom est connu, sinon fichier JSON
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        match name_or_path {
            "parcels" | "buildings" => Self::from_preset(name_or_path),
            path => Self::load(Path::new(path)),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse embedded config")?;
        config.validate()?;
        Ok(config)
    }

    /// Vérifie la cohérence de la configuration
    pub fn validate(&self) -> Result<()> {
        let allowed = self.dataset.mappable_targets();
        for field in &self.fields {
            if !allowed.contains(&field.target.as_str()) {
                bail!(
                    "Unknown target column `{}` for {} (allowed: {})",
                    field.target,
                    self.dataset.as_str(),
                    allowed.join(", ")
                );
            }
        }

        let bounds = self.bounds();
        if !(bounds.min_sqft.is_finite() && bounds.max_sqft.is_finite())
            || bounds.min_sqft < 0.0
            || bounds.min_sqft >= bounds.max_sqft
        {
            bail!(
                "Invalid area bounds [{}, {}) for {}",
                bounds.min_sqft,
                bounds.max_sqft,
                self.dataset.as_str()
            );
        }

        if self.dataset == DatasetKind::Buildings && self.source_label.is_none() {
            bail!("Building configuration requires a `source_label`");
        }

        Ok(())
    }

    /// Propriétés source d'une colonne cible, dans l'ordre de priorité
    pub fn sources_for(&self, target: &str) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.target == target)
            .map(|f| f.source.clone())
            .collect()
    }

    pub fn spatial_resolution(&self) -> &str {
        self.spatial_resolution
            .as_deref()
            .unwrap_or_else(|| self.dataset.default_resolution())
    }

    pub fn bounds(&self) -> AreaBounds {
        self.area.unwrap_or_else(|| self.dataset.default_bounds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_load() {
        let parcels = DatasetConfig::from_preset("parcels").unwrap();
        assert_eq!(parcels.dataset, DatasetKind::Parcels);
        assert_eq!(parcels.bounds(), AreaBounds::PARCELS);
        assert_eq!(parcels.spatial_resolution(), "parcel");
        assert!(parcels.county_from_filename);
        assert_eq!(parcels.sources_for("apn")[0], "APN");

        let buildings = DatasetConfig::from_preset("buildings").unwrap();
        assert_eq!(buildings.dataset, DatasetKind::Buildings);
        assert_eq!(buildings.bounds(), AreaBounds::BUILDINGS);
        assert_eq!(buildings.spatial_resolution(), "building");
        assert_eq!(buildings.sources_for("capture_dates").len(), 2);
    }

    #[test]
    fn test_unknown_preset() {
        assert!(DatasetConfig::from_preset("zoning").is_err());
    }

    #[test]
    fn test_unknown_target_rejected() {
        let json = r#"{
            "dataset": "buildings",
            "source_system": "s", "source_table": "t",
            "license_note": "l", "source_label": "x",
            "fields": [{"source": "APN", "target": "parcel_apn"}]
        }"#;
        let config: DatasetConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_and_bad_bounds() {
        let json = r#"{
            "dataset": "parcels",
            "source_system": "s", "source_table": "t", "license_note": "l",
            "fields": [],
            "area": {"min_sqft": 5000.0, "max_sqft": 10.0}
        }"#;
        let config: DatasetConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.spatial_resolution(), "parcel");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(
            &path,
            r#"{"dataset": "parcels", "source_system": "la_county", "source_table": "assessor",
                "license_note": "public", "source_epsg": 2229,
                "fields": [{"source": "AIN", "target": "apn"}]}"#,
        )
        .unwrap();

        let config = DatasetConfig::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(config.source_epsg, Some(2229));
        assert_eq!(config.sources_for("apn"), vec!["AIN".to_string()]);
        assert_eq!(config.bounds(), AreaBounds::PARCELS);
    }
}
