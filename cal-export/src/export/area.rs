//! Surface dérivée en pieds carrés
//!
//! La surface est calculée en degrés carrés sur la géométrie WGS84 puis
//! convertie avec un facteur fixe, valable autour de 35°N.

use geo::{Area, Centroid, Geometry};
use serde::{Deserialize, Serialize};

use super::record::DropReason;

/// Pieds carrés par degré carré (à 35°N)
pub const SQFT_PER_SQUARE_DEGREE: f64 = 1.087e11;

/// Latitude de référence du facteur de conversion
pub const REFERENCE_LATITUDE: f64 = 35.0;

/// Modèle de conversion degrés carrés → pieds carrés
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AreaModel {
    /// Facteur fixe, sans correction de latitude
    #[default]
    Fixed,
    /// Facteur corrigé par cos(latitude du centroïde) / cos(35°)
    LatitudeScaled,
}

impl std::str::FromStr for AreaModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(AreaModel::Fixed),
            "latitude-scaled" | "latitude_scaled" | "scaled" => Ok(AreaModel::LatitudeScaled),
            _ => Err(format!("Invalid area model: {}. Use: fixed, latitude-scaled", s)),
        }
    }
}

impl AreaModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::LatitudeScaled => "latitude-scaled",
        }
    }
}

/// Surface d'une géométrie lon/lat, en pieds carrés
pub fn square_feet(geometry: &Geometry, model: AreaModel) -> f64 {
    let fixed = geometry.unsigned_area() * SQFT_PER_SQUARE_DEGREE;

    match model {
        AreaModel::Fixed => fixed,
        AreaModel::LatitudeScaled => match geometry.centroid() {
            Some(centroid) => {
                fixed * centroid.y().to_radians().cos() / REFERENCE_LATITUDE.to_radians().cos()
            }
            None => fixed,
        },
    }
}

/// Bornes `[min, max)` de surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaBounds {
    pub min_sqft: f64,
    pub max_sqft: f64,
}

impl AreaBounds {
    pub const PARCELS: AreaBounds = AreaBounds {
        min_sqft: 1_200.0,
        max_sqft: 50_000_000.0,
    };

    pub const BUILDINGS: AreaBounds = AreaBounds {
        min_sqft: 100.0,
        max_sqft: 1_000_000.0,
    };

    /// Vérifie qu'une surface est dans les bornes
    pub fn check(&self, area_sqft: f64) -> Result<(), DropReason> {
        if area_sqft < self.min_sqft {
            Err(DropReason::AreaBelowMinimum)
        } else if area_sqft >= self.max_sqft {
            Err(DropReason::AreaAboveMaximum)
        } else {
            Ok(())
        }
    }

    pub fn contains(&self, area_sqft: f64) -> bool {
        self.check(area_sqft).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Polygon};

    /// Rectangle de `w` × `h` degrés au point (x, y)
    fn rect(x: f64, y: f64, w: f64, h: f64) -> Geometry {
        let poly: Polygon = polygon![
            (x: x, y: y),
            (x: x + w, y: y),
            (x: x + w, y: y + h),
            (x: x, y: y + h),
            (x: x, y: y),
        ];
        Geometry::Polygon(poly)
    }

    #[test]
    fn test_fixed_conversion() {
        // 0.0004 × 0.0003 = 1.2e-7 deg²
        let geometry = rect(-118.2430, 34.0530, 0.0004, 0.0003);
        let area = square_feet(&geometry, AreaModel::Fixed);
        assert!((area - 13_044.0).abs() < 0.01, "area={}", area);
        assert!(AreaBounds::PARCELS.contains(area));
    }

    #[test]
    fn test_small_building_dropped() {
        // ≈ 45 sqft
        let geometry = rect(-122.0, 37.0, 0.00002, 0.0000207);
        let area = square_feet(&geometry, AreaModel::Fixed);
        assert!((area - 45.0).abs() < 0.1, "area={}", area);
        assert_eq!(AreaBounds::BUILDINGS.check(area), Err(DropReason::AreaBelowMinimum));
    }

    #[test]
    fn test_bounds_are_half_open() {
        assert!(AreaBounds::PARCELS.check(1_200.0).is_ok());
        assert_eq!(
            AreaBounds::PARCELS.check(50_000_000.0),
            Err(DropReason::AreaAboveMaximum)
        );
        assert!(AreaBounds::BUILDINGS.check(100.0).is_ok());
        assert_eq!(AreaBounds::BUILDINGS.check(99.999), Err(DropReason::AreaBelowMinimum));
        assert_eq!(
            AreaBounds::BUILDINGS.check(1_000_000.0),
            Err(DropReason::AreaAboveMaximum)
        );
    }

    #[test]
    fn test_latitude_scaled() {
        let at_reference = rect(-120.0, 34.9995, 0.001, 0.001);
        let fixed = square_feet(&at_reference, AreaModel::Fixed);
        let scaled = square_feet(&at_reference, AreaModel::LatitudeScaled);
        assert!((fixed - scaled).abs() / fixed < 1e-4);

        let north = rect(-124.0, 41.9, 0.001, 0.001);
        assert!(square_feet(&north, AreaModel::LatitudeScaled) < square_feet(&north, AreaModel::Fixed));
    }

    #[test]
    fn test_area_model_from_str() {
        assert_eq!("fixed".parse::<AreaModel>(), Ok(AreaModel::Fixed));
        assert_eq!("Latitude-Scaled".parse::<AreaModel>(), Ok(AreaModel::LatitudeScaled));
        assert!("geodesic".parse::<AreaModel>().is_err());
    }
}
