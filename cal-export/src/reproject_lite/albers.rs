//! Albers Equal Area Conic, California Albers (EPSG:3310)

use super::ellipsoid::GRS80;
use super::Geographic;
use anyhow::{bail, Result};

/// Paramètres EPSG:3310 (NAD83 / California Albers)
struct CaliforniaAlbers {
    lon0: f64,
    lat0: f64,
    lat1: f64,
    lat2: f64,
    x0: f64,
    y0: f64,
}

impl Default for CaliforniaAlbers {
    fn default() -> Self {
        Self {
            lon0: (-120.0_f64).to_radians(),
            lat0: 0.0,
            lat1: 34.0_f64.to_radians(),
            lat2: 40.5_f64.to_radians(),
            x0: 0.0,
            y0: -4_000_000.0,
        }
    }
}

fn m(lat: f64, e2: f64) -> f64 {
    lat.cos() / (1.0 - e2 * lat.sin().powi(2)).sqrt()
}

fn q(lat: f64, e: f64, e2: f64) -> f64 {
    let sin_lat = lat.sin();
    (1.0 - e2)
        * (sin_lat / (1.0 - e2 * sin_lat.powi(2))
            - (1.0 / (2.0 * e)) * ((1.0 - e * sin_lat) / (1.0 + e * sin_lat)).ln())
}

/// Convertit California Albers vers coordonnées géographiques NAD83
pub fn albers_to_geographic(x: f64, y: f64) -> Result<Geographic> {
    let params = CaliforniaAlbers::default();
    let a = GRS80::A;
    let e = GRS80::E;
    let e2 = GRS80::E2;

    let m1 = m(params.lat1, e2);
    let m2 = m(params.lat2, e2);
    let q0 = q(params.lat0, e, e2);
    let q1 = q(params.lat1, e, e2);
    let q2 = q(params.lat2, e, e2);

    let n = (m1.powi(2) - m2.powi(2)) / (q2 - q1);
    let c = m1.powi(2) + n * q1;
    let rho0 = a * (c - n * q0).sqrt() / n;

    let dx = x - params.x0;
    let dy = y - params.y0;

    let rho = (dx.powi(2) + (rho0 - dy).powi(2)).sqrt();
    let theta = dx.atan2(rho0 - dy);
    let q = (c - rho.powi(2) * n.powi(2) / a.powi(2)) / n;

    if !(-2.0..=2.0).contains(&q) {
        bail!("Point ({}, {}) is outside the Albers projection domain", x, y);
    }

    // Itération de Snyder (3-16)
    let mut lat = (q / 2.0).asin();
    for _ in 0..15 {
        let sin_lat = lat.sin();
        let one_minus = 1.0 - e2 * sin_lat.powi(2);
        let next = lat
            + one_minus.powi(2) / (2.0 * lat.cos())
                * (q / (1.0 - e2) - sin_lat / one_minus
                    + (1.0 / (2.0 * e)) * ((1.0 - e * sin_lat) / (1.0 + e * sin_lat)).ln());

        if (next - lat).abs() < 1e-12 {
            lat = next;
            break;
        }
        lat = next;
    }

    let lon = params.lon0 + theta / n;

    Ok(Geographic::new(lon, lat))
}
