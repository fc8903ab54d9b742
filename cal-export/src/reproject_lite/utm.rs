//! Projection UTM (Universal Transverse Mercator)
//!
//! Zones supportées:
//! - Zone 10N (EPSG:26910 NAD83, EPSG:32610 WGS84) - Californie du Nord
//! - Zone 11N (EPSG:26911 NAD83, EPSG:32611 WGS84) - Californie du Sud

use super::ellipsoid::WGS84;
use super::Geographic;
use anyhow::Result;

/// Convertit UTM vers coordonnées géographiques WGS84
pub fn utm_to_geographic(x: f64, y: f64, zone: u32, south: bool) -> Result<Geographic> {
    let a = WGS84::A;
    let e2 = WGS84::E2;
    let ep2 = WGS84::EP2;

    // Paramètres UTM
    let k0 = 0.9996; // Facteur d'échelle
    let x0 = 500000.0; // False easting
    let y0 = if south { 10000000.0 } else { 0.0 }; // False northing

    // Longitude centrale de la zone
    let lon0 = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();

    // Coordonnées réduites
    let x = x - x0;
    let y = y - y0;

    // Calcul du footprint latitude
    let m = y / k0;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));

    // Coefficients pour la série
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    // Calculs intermédiaires
    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let n1 = a / (1.0 - e2 * sin_phi1.powi(2)).sqrt();
    let t1 = tan_phi1.powi(2);
    let c1 = ep2 * cos_phi1.powi(2);
    let r1 = a * (1.0 - e2) / (1.0 - e2 * sin_phi1.powi(2)).powf(1.5);
    let d = x / (n1 * k0);

    // Latitude
    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2) - 252.0 * ep2 - 3.0 * c1.powi(2))
                    * d.powi(6)
                    / 720.0);

    // Longitude
    let lon = lon0
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * ep2 + 24.0 * t1.powi(2))
                * d.powi(5)
                / 120.0)
            / cos_phi1;

    Ok(Geographic::new(lon, lat))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(geo: Geographic, lon: f64, lat: f64) {
        let (got_lon, got_lat) = geo.to_degrees();
        assert!((got_lon - lon).abs() < 1e-6, "lon={}", got_lon);
        assert!((got_lat - lat).abs() < 1e-6, "lat={}", got_lat);
    }

    #[test]
    fn test_zone10() {
        // San Francisco, Sacramento, Redding
        assert_close(utm_to_geographic(551130.768, 4180998.881, 10, false).unwrap(), -122.4194, 37.7749);
        assert_close(utm_to_geographic(631140.259, 4271422.623, 10, false).unwrap(), -121.4944, 38.5816);
        assert_close(utm_to_geographic(551477.493, 4493034.078, 10, false).unwrap(), -122.3917, 40.5865);
    }

    #[test]
    fn test_zone11() {
        // Los Angeles, San Diego
        assert_close(utm_to_geographic(385308.233, 3768806.701, 11, false).unwrap(), -118.2427, 34.0537);
        assert_close(utm_to_geographic(484902.621, 3619781.608, 11, false).unwrap(), -117.1611, 32.7157);
    }
}
