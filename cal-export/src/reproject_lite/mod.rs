//! Reprojection légère en Rust pur (sans dépendances externes)
//!
//! Supporte les projections des sources californiennes :
//! - Web Mercator (EPSG:3857)
//! - California Albers (EPSG:3310)
//! - NAD83 / California zones 1-6, pieds US (EPSG:2225-2230)
//! - NAD83 / California zones 1-6, mètres (EPSG:26941-26946)
//! - UTM 10N / 11N (EPSG:26910, 26911, 32610, 32611)
//!
//! Cible : WGS84 (EPSG:4326). NAD83 est assimilé à WGS84 (écart métrique).

mod albers;
mod ellipsoid;
mod lambert;
mod mercator;
mod smart;
mod utm;

pub use smart::SmartReprojector;

use anyhow::{anyhow, bail, Result};
use geo::{Coord, Geometry, MapCoords};

use lambert::LambertConic;

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

/// Projection source
#[derive(Debug, Clone, Copy)]
enum Projection {
    WebMercator,
    CaliforniaAlbers,
    Lambert(LambertConic),
    Utm { zone: u32 },
}

impl Projection {
    fn for_epsg(epsg: u32) -> Option<Self> {
        let projection = match epsg {
            3857 | 900913 => Self::WebMercator,
            3310 => Self::CaliforniaAlbers,
            2225..=2230 => Self::Lambert(LambertConic::california_zone_feet((epsg - 2224) as u8).ok()?),
            26941..=26946 => Self::Lambert(LambertConic::california_zone_metres((epsg - 26940) as u8).ok()?),
            26910 | 32610 => Self::Utm { zone: 10 },
            26911 | 32611 => Self::Utm { zone: 11 },
            _ => return None,
        };
        Some(projection)
    }

    fn to_geographic(&self, x: f64, y: f64) -> Result<Geographic> {
        match self {
            Self::WebMercator => mercator::web_mercator_to_geographic(x, y),
            Self::CaliforniaAlbers => albers::albers_to_geographic(x, y),
            Self::Lambert(params) => lambert::lambert_to_geographic(params, x, y),
            Self::Utm { zone } => utm::utm_to_geographic(x, y, *zone, false),
        }
    }
}

/// Reprojection légère vers WGS84
pub struct ReprojectorLite {
    source_epsg: u32,
    projection: Projection,
}

impl ReprojectorLite {
    /// Crée un nouveau reprojector
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if !Self::is_supported_target(target_epsg) {
            bail!("EPSG:{} is not a supported target. Supported: 4326", target_epsg);
        }

        let projection = Projection::for_epsg(source_epsg).ok_or_else(|| {
            anyhow!(
                "EPSG:{} is not supported. Supported sources: 3857, 3310, 2225-2230, 26941-26946, 26910, 26911, 32610, 32611",
                source_epsg
            )
        })?;

        Ok(Self {
            source_epsg,
            projection,
        })
    }

    /// Vérifie si l'EPSG source est supporté
    pub fn is_supported_source(epsg: u32) -> bool {
        Projection::for_epsg(epsg).is_some()
    }

    /// Vérifie si l'EPSG cible est supporté
    pub fn is_supported_target(epsg: u32) -> bool {
        epsg == 4326
    }

    /// Vérifie si la reprojection est supportée
    pub fn is_supported(source: u32, target: u32) -> bool {
        Self::is_supported_source(source) && Self::is_supported_target(target)
    }

    /// Transforme un point (x, y) de la source vers lon/lat en degrés
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (lon, lat) = self.projection.to_geographic(x, y)?.to_degrees();

        if !lon.is_finite() || !lat.is_finite() {
            bail!("EPSG:{} point ({}, {}) has no geographic image", self.source_epsg, x, y);
        }

        Ok((lon, lat))
    }

    /// Transforme une géométrie (tous types)
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        geom.try_map_coords(|c: Coord| {
            let (x, y) = self.transform_point(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }
}
