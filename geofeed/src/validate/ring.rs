//! Règles portant sur un anneau isolé

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Line, LineString};

use super::Invalidity;

/// Vérifie qu'un anneau est fermé, non dégénéré et simple
pub fn check_ring(ring: &LineString) -> Result<(), Invalidity> {
    let coords = &ring.0;

    if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(Invalidity::NonFiniteCoordinate);
    }

    if coords.len() < 4 {
        return Err(Invalidity::TooFewPoints);
    }

    if coords.first() != coords.last() {
        return Err(Invalidity::RingNotClosed);
    }

    let points = distinct_points(coords);
    // fermeture comprise
    if points.len() < 4 {
        return Err(Invalidity::TooFewPoints);
    }

    if signed_area(&points) == 0.0 {
        return Err(Invalidity::ZeroArea);
    }

    if !is_simple(&points) {
        return Err(Invalidity::SelfIntersection);
    }

    Ok(())
}

/// Supprime les sommets consécutifs répétés
pub(crate) fn distinct_points(coords: &[Coord]) -> Vec<Coord> {
    let mut points: Vec<Coord> = Vec::with_capacity(coords.len());
    for c in coords {
        if points.last() != Some(c) {
            points.push(*c);
        }
    }
    points
}

/// Aire signée (shoelace) d'un anneau fermé
pub(crate) fn signed_area(points: &[Coord]) -> f64 {
    let sum: f64 = points
        .windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum();
    sum / 2.0
}

/// Segments d'un anneau fermé sans sommets répétés
pub(crate) fn segments(points: &[Coord]) -> Vec<Line> {
    points.windows(2).map(|w| Line::new(w[0], w[1])).collect()
}

/// Teste les boîtes englobantes de deux segments
pub(crate) fn boxes_overlap(a: &Line, b: &Line) -> bool {
    let (ax0, ax1) = min_max(a.start.x, a.end.x);
    let (ay0, ay1) = min_max(a.start.y, a.end.y);
    let (bx0, bx1) = min_max(b.start.x, b.end.x);
    let (by0, by1) = min_max(b.start.y, b.end.y);
    ax0 <= bx1 && bx0 <= ax1 && ay0 <= by1 && by0 <= ay1
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Un anneau est simple si ses segments ne se touchent qu'entre voisins,
/// au sommet partagé.
fn is_simple(points: &[Coord]) -> bool {
    let segs = segments(points);
    let n = segs.len();

    for i in 0..n {
        for j in (i + 1)..n {
            let a = &segs[i];
            let b = &segs[j];
            if !boxes_overlap(a, b) {
                continue;
            }

            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(*a, *b) {
                None => {}
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(LineIntersection::Collinear { intersection })
                    if adjacent && intersection.start == intersection.end => {}
                Some(_) => return false,
            }
        }
    }

    true
}
