//! Prédicat de validité des polygones
//!
//! Règles OGC Simple Features appliquées aux surfaces : anneaux fermés et
//! simples, trous contenus dans l'enveloppe extérieure, parties d'un
//! multipolygone d'intérieurs disjoints. Les géométries invalides ne sont
//! jamais réparées ici.

pub mod ring;
pub mod topology;

use geo::{Geometry, Polygon};
use thiserror::Error;

/// Règle de validité violée
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Invalidity {
    #[error("geometry is not a Polygon or MultiPolygon")]
    NotPolygonal,

    #[error("geometry is empty")]
    Empty,

    #[error("coordinate is not finite")]
    NonFiniteCoordinate,

    #[error("ring is not closed")]
    RingNotClosed,

    #[error("ring has too few points")]
    TooFewPoints,

    #[error("ring has zero area")]
    ZeroArea,

    #[error("ring self-intersection")]
    SelfIntersection,

    #[error("rings of a polygon cross")]
    RingsCross,

    #[error("hole lies outside its shell")]
    HoleOutsideShell,

    #[error("hole lies inside another hole")]
    NestedHoles,

    #[error("polygon interior is disconnected")]
    DisconnectedInterior,

    #[error("multipolygon parts overlap")]
    OverlappingPolygons,
}

impl Invalidity {
    /// Identifiant stable (rapports, logs)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotPolygonal => "not_polygonal",
            Self::Empty => "empty",
            Self::NonFiniteCoordinate => "non_finite_coordinate",
            Self::RingNotClosed => "ring_not_closed",
            Self::TooFewPoints => "too_few_points",
            Self::ZeroArea => "zero_area",
            Self::SelfIntersection => "self_intersection",
            Self::RingsCross => "rings_cross",
            Self::HoleOutsideShell => "hole_outside_shell",
            Self::NestedHoles => "nested_holes",
            Self::DisconnectedInterior => "disconnected_interior",
            Self::OverlappingPolygons => "overlapping_polygons",
        }
    }
}

/// Vérifie qu'une géométrie est une surface valide.
///
/// Retourne la première règle violée.
pub fn check(geometry: &Geometry) -> Result<(), Invalidity> {
    match geometry {
        Geometry::Polygon(polygon) => check_polygon(polygon),
        Geometry::MultiPolygon(multi) => {
            if multi.0.is_empty() {
                return Err(Invalidity::Empty);
            }
            for polygon in &multi.0 {
                check_polygon(polygon)?;
            }
            topology::check_disjoint_parts(&multi.0)
        }
        _ => Err(Invalidity::NotPolygonal),
    }
}

/// Forme booléenne de [`check`]
pub fn is_valid(geometry: &Geometry) -> bool {
    check(geometry).is_ok()
}

/// Vérifie un polygone isolé (anneaux puis relations entre anneaux)
pub fn check_polygon(polygon: &Polygon) -> Result<(), Invalidity> {
    if polygon.exterior().0.is_empty() {
        return Err(Invalidity::Empty);
    }

    ring::check_ring(polygon.exterior())?;
    for hole in polygon.interiors() {
        ring::check_ring(hole)?;
    }

    if polygon.interiors().is_empty() {
        return Ok(());
    }

    topology::check_rings_do_not_cross(polygon)?;
    topology::check_holes(polygon)?;
    topology::check_connected_interior(polygon)
}
