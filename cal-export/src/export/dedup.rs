//! Suppression des doublons de géométrie
//!
//! Le hash est normalisé pour être indépendant de l'ordre de départ des anneaux
//! (un polygone qui commence à un vertex différent aura le même hash).

use blake3::Hasher;
use geo::{Coord, Geometry, LineString, Polygon};
use std::collections::HashSet;

use super::record::DropReason;

/// Calcule un hash stable d'une géométrie surfacique
///
/// Les anneaux de polygones sont normalisés pour commencer au vertex
/// lexicographiquement le plus petit (min x, puis min y).
pub fn geometry_hash(geom: &Geometry) -> [u8; 32] {
    let mut hasher = Hasher::new();

    match geom {
        Geometry::Polygon(p) => {
            hasher.update(b"POLYGON");
            hash_polygon(&mut hasher, p);
        }
        Geometry::MultiPolygon(mp) => {
            hasher.update(b"MULTIPOLYGON");
            for poly in mp.0.iter() {
                hasher.update(b"POLY");
                hash_polygon(&mut hasher, poly);
            }
        }
        _ => {
            hasher.update(format!("{:?}", geom).as_bytes());
        }
    }

    *hasher.finalize().as_bytes()
}

fn hash_polygon(hasher: &mut Hasher, poly: &Polygon) {
    hasher.update(b"EXT");
    hash_ring_normalized(hasher, poly.exterior());
    for interior in poly.interiors() {
        hasher.update(b"INT");
        hash_ring_normalized(hasher, interior);
    }
}

/// Hash un anneau (ring) de polygone en le normalisant
/// pour commencer au vertex lexicographiquement le plus petit.
fn hash_ring_normalized(hasher: &mut Hasher, ring: &LineString) {
    // Ignore le dernier point qui est identique au premier pour un ring fermé
    let len = if ring.0.len() > 1 && ring.0.first() == ring.0.last() {
        ring.0.len() - 1
    } else {
        ring.0.len()
    };

    if len == 0 {
        return;
    }

    let min_idx = (0..len)
        .min_by(|&a, &b| {
            let ca = &ring.0[a];
            let cb = &ring.0[b];
            ca.x.partial_cmp(&cb.x)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| ca.y.partial_cmp(&cb.y).unwrap_or(std::cmp::Ordering::Equal))
        })
        .unwrap_or(0);

    for i in 0..len {
        let idx = (min_idx + i) % len;
        hash_coord(hasher, ring.0[idx]);
    }
}

/// Hash une coordonnée avec arrondi pour stabilité
fn hash_coord(hasher: &mut Hasher, coord: Coord) {
    // 7 décimales en degrés (~1cm)
    let x = (coord.x * 10_000_000.0).round() as i64;
    let y = (coord.y * 10_000_000.0).round() as i64;
    hasher.update(&x.to_le_bytes());
    hasher.update(&y.to_le_bytes());
}

/// Ensemble des géométries déjà émises pendant un export
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<[u8; 32]>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre une géométrie ; rejette si elle a déjà été émise
    pub fn check(&mut self, geom: &Geometry) -> Result<(), DropReason> {
        if self.seen.insert(geometry_hash(geom)) {
            Ok(())
        } else {
            Err(DropReason::DuplicateGeometry)
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_hash_independent_of_start_vertex() {
        let a = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0),
        ]);
        let b = Geometry::Polygon(polygon![
            (x: 1.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0),
        ]);
        assert_eq!(geometry_hash(&a), geometry_hash(&b));
    }

    #[test]
    fn test_different_geometries() {
        let a = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0),
        ]);
        let b = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 0.0),
        ]);
        assert_ne!(geometry_hash(&a), geometry_hash(&b));
    }

    #[test]
    fn test_deduplicator() {
        let a = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0),
        ]);
        let mut dedup = Deduplicator::new();
        assert!(dedup.check(&a).is_ok());
        assert_eq!(dedup.check(&a), Err(DropReason::DuplicateGeometry));
        assert_eq!(dedup.len(), 1);
    }
}
