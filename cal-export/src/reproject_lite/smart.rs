//! Choix du reprojector selon le CRS source

use super::ReprojectorLite;
use anyhow::{bail, Result};
use geo::Geometry;

/// Reprojection intelligente
///
/// Les sources déjà en coordonnées géographiques (WGS84, NAD83, CRS84) passent
/// telles quelles ; les projections connues passent par reproject_lite.
pub enum SmartReprojector {
    /// Reprojection légère (pure Rust)
    Lite(ReprojectorLite),
    /// Pas de reprojection (source géographique)
    Identity,
}

impl SmartReprojector {
    /// Crée un nouveau reprojector
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if target_epsg != 4326 {
            bail!("Only EPSG:4326 output is supported (requested EPSG:{})", target_epsg);
        }

        // Pas de reprojection nécessaire
        if matches!(source_epsg, 4326 | 4269) {
            return Ok(Self::Identity);
        }

        if ReprojectorLite::is_supported(source_epsg, target_epsg) {
            let lite = ReprojectorLite::new(source_epsg, target_epsg)?;
            return Ok(Self::Lite(lite));
        }

        bail!(
            "Reprojection EPSG:{} → EPSG:{} is not supported.\n\
             Supported sources: 4326, 4269 (identity), 3857 (Web Mercator), 3310 (California Albers),\n\
             2225-2230 / 26941-26946 (California State Plane zones 1-6), 26910/26911/32610/32611 (UTM 10N/11N)",
            source_epsg,
            target_epsg
        );
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        match self {
            Self::Identity => Ok(geom.clone()),
            Self::Lite(lite) => lite.transform_geometry(geom),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Retourne une description du reprojector utilisé
    pub fn description(&self) -> &'static str {
        match self {
            Self::Identity => "identity (no reprojection)",
            Self::Lite(_) => "reproject_lite (pure Rust)",
        }
    }
}
