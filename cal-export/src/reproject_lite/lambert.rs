//! Lambert Conformal Conic 2SP
//!
//! Zones NAD83 / California (State Plane) 1 à 6, en mètres (EPSG:26941-26946)
//! ou en pieds US (EPSG:2225-2230).

use super::ellipsoid::{GRS80, US_SURVEY_FOOT};
use super::Geographic;
use anyhow::{bail, Result};

/// Paramètres d'une conique conforme de Lambert (angles en radians)
#[derive(Debug, Clone, Copy)]
pub struct LambertConic {
    /// Longitude origine
    pub lon0: f64,
    /// Latitude origine
    pub lat0: f64,
    /// Premier parallèle standard
    pub lat1: f64,
    /// Deuxième parallèle standard
    pub lat2: f64,
    /// False easting (mètres)
    pub x0: f64,
    /// False northing (mètres)
    pub y0: f64,
    /// Taille de l'unité des coordonnées, en mètres
    pub unit: f64,
}

fn dms(deg: f64, min: f64) -> f64 {
    (deg + min / 60.0).to_radians()
}

impl LambertConic {
    /// Zone State Plane de Californie (1 à 6)
    pub fn california_zone(zone: u8, unit: f64) -> Result<Self> {
        // (lat1, lat2, lat0, lon0)
        let (lat1, lat2, lat0, lon0) = match zone {
            1 => (dms(41.0, 40.0), dms(40.0, 0.0), dms(39.0, 20.0), -122.0),
            2 => (dms(39.0, 50.0), dms(38.0, 20.0), dms(37.0, 40.0), -122.0),
            3 => (dms(38.0, 26.0), dms(37.0, 4.0), dms(36.0, 30.0), -120.5),
            4 => (dms(37.0, 15.0), dms(36.0, 0.0), dms(35.0, 20.0), -119.0),
            5 => (dms(35.0, 28.0), dms(34.0, 2.0), dms(33.0, 30.0), -118.0),
            6 => (dms(33.0, 53.0), dms(32.0, 47.0), dms(32.0, 10.0), -116.25),
            _ => bail!("California State Plane zone {} does not exist", zone),
        };

        Ok(Self {
            lon0: f64::to_radians(lon0),
            lat0,
            lat1,
            lat2,
            x0: 2_000_000.0,
            y0: 500_000.0,
            unit,
        })
    }

    /// Zone en pieds US
    pub fn california_zone_feet(zone: u8) -> Result<Self> {
        Self::california_zone(zone, US_SURVEY_FOOT)
    }

    /// Zone en mètres
    pub fn california_zone_metres(zone: u8) -> Result<Self> {
        Self::california_zone(zone, 1.0)
    }
}

/// Calcule la latitude isométrique
fn isometric_latitude(lat: f64, e: f64) -> f64 {
    let sin_lat = lat.sin();
    let term = ((1.0 - e * sin_lat) / (1.0 + e * sin_lat)).powf(e / 2.0);
    ((std::f64::consts::FRAC_PI_4 + lat / 2.0).tan() * term).ln()
}

/// Calcule la latitude depuis la latitude isométrique (itératif)
fn latitude_from_isometric(iso_lat: f64, e: f64) -> f64 {
    let mut lat = 2.0 * iso_lat.exp().atan() - std::f64::consts::FRAC_PI_2;

    for _ in 0..10 {
        let sin_lat = lat.sin();
        let term = ((1.0 + e * sin_lat) / (1.0 - e * sin_lat)).powf(e / 2.0);
        let new_lat = 2.0 * (iso_lat.exp() * term).atan() - std::f64::consts::FRAC_PI_2;

        if (new_lat - lat).abs() < 1e-12 {
            return new_lat;
        }
        lat = new_lat;
    }
    lat
}

/// Calcule le grand normal (rayon de courbure dans le plan vertical)
fn grande_normale(lat: f64, a: f64, e2: f64) -> f64 {
    a / (1.0 - e2 * lat.sin().powi(2)).sqrt()
}

/// Convertit des coordonnées projetées en coordonnées géographiques NAD83
pub fn lambert_to_geographic(params: &LambertConic, x: f64, y: f64) -> Result<Geographic> {
    let e = GRS80::E;
    let e2 = GRS80::E2;
    let a = GRS80::A;

    // Calcul des constantes de la projection
    let n1 = grande_normale(params.lat1, a, e2);
    let n2 = grande_normale(params.lat2, a, e2);

    let iso_lat1 = isometric_latitude(params.lat1, e);
    let iso_lat2 = isometric_latitude(params.lat2, e);
    let iso_lat0 = isometric_latitude(params.lat0, e);

    // Exposant de la projection
    let n = (n1 * params.lat1.cos()).ln() - (n2 * params.lat2.cos()).ln();
    let n = n / (iso_lat2 - iso_lat1);

    // Constante C
    let c = (n1 * params.lat1.cos() / n) * (n * iso_lat1).exp();

    // Rayon à l'origine
    let r0 = c * (-n * iso_lat0).exp();

    // Coordonnées centrées, en mètres
    let dx = x * params.unit - params.x0;
    let dy = y * params.unit - params.y0;

    // Rayon et angle
    let r = (dx.powi(2) + (r0 - dy).powi(2)).sqrt();
    let r = if n < 0.0 { -r } else { r };

    let gamma = (dx / (r0 - dy)).atan();

    // Latitude isométrique
    let iso_lat = -(r / c).ln() / n;

    // Latitude géographique
    let lat = latitude_from_isometric(iso_lat, e);

    // Longitude
    let lon = params.lon0 + gamma / n;

    Ok(Geographic::new(lon, lat))
}
