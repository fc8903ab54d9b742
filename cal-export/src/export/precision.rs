//! Arrondi des coordonnées

use geo::{Coord, Geometry, MapCoords};

/// Nombre maximal de décimales accepté (au-delà, l'arrondi n'a plus d'effet en f64)
pub const MAX_DECIMALS: u8 = 15;

/// Arrondit les coordonnées d'une géométrie à la précision spécifiée
pub fn round_geometry_coords(geom: &Geometry, decimals: u8) -> Geometry {
    let factor = 10_f64.powi(decimals.min(MAX_DECIMALS) as i32);

    geom.map_coords(|c: Coord| Coord {
        x: (c.x * factor).round() / factor,
        y: (c.y * factor).round() / factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Polygon};

    #[test]
    fn test_round_polygon() {
        let poly: Polygon = polygon![
            (x: -118.24271234, y: 34.05371234),
            (x: -118.24261234, y: 34.05371234),
            (x: -118.24261234, y: 34.05381234),
            (x: -118.24271234, y: 34.05371234),
        ];
        let Geometry::Polygon(rounded) = round_geometry_coords(&Geometry::Polygon(poly), 6) else {
            panic!("expected a polygon");
        };
        let first = rounded.exterior().0[0];
        assert_eq!(first.x, -118.242712);
        assert_eq!(first.y, 34.053712);
    }

    #[test]
    fn test_rounding_can_collapse_ring() {
        let poly: Polygon = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0004, y: 0.0),
            (x: 0.0004, y: 0.0004),
            (x: 0.0, y: 0.0),
        ];
        let rounded = round_geometry_coords(&Geometry::Polygon(poly), 2);
        assert!(!geofeed::validate::is_valid(&rounded));
    }
}
