//! Relations entre anneaux d'un polygone et entre parties d'un multipolygone

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{BoundingRect, Coord, Line, LineString, Polygon, Rect};

use super::ring::{boxes_overlap, distinct_points, segments};
use super::Invalidity;

/// Deux anneaux d'un même polygone peuvent se toucher en un point, jamais
/// se croiser ni partager un segment.
pub fn check_rings_do_not_cross(polygon: &Polygon) -> Result<(), Invalidity> {
    let rings: Vec<Vec<Line>> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_segments)
        .collect();

    for i in 0..rings.len() {
        for j in (i + 1)..rings.len() {
            if boundaries_cross(&rings[i], &rings[j]) {
                return Err(Invalidity::RingsCross);
            }
        }
    }

    Ok(())
}

/// Chaque trou est dans l'enveloppe extérieure et hors des autres trous
pub fn check_holes(polygon: &Polygon) -> Result<(), Invalidity> {
    let shell = Polygon::new(polygon.exterior().clone(), vec![]);

    for hole in polygon.interiors() {
        match position_of_ring(hole, &shell) {
            Some(CoordPos::Inside) => {}
            _ => return Err(Invalidity::HoleOutsideShell),
        }
    }

    let holes: Vec<Polygon> = polygon
        .interiors()
        .iter()
        .map(|h| Polygon::new(h.clone(), vec![]))
        .collect();

    for (i, hole) in polygon.interiors().iter().enumerate() {
        for (j, other) in holes.iter().enumerate() {
            if i != j && position_of_ring(hole, other) == Some(CoordPos::Inside) {
                return Err(Invalidity::NestedHoles);
            }
        }
    }

    Ok(())
}

/// L'intérieur d'un polygone reste connexe : deux anneaux se touchent en un
/// point au plus, et les contacts entre anneaux ne forment pas de cycle.
///
/// Suppose les anneaux déjà sans croisement.
pub fn check_connected_interior(polygon: &Polygon) -> Result<(), Invalidity> {
    let rings: Vec<Vec<Line>> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_segments)
        .collect();
    let mut parent: Vec<usize> = (0..rings.len()).collect();

    for i in 0..rings.len() {
        for j in (i + 1)..rings.len() {
            match touch_points(&rings[i], &rings[j]).len() {
                0 => {}
                1 => {
                    let (a, b) = (root(&mut parent, i), root(&mut parent, j));
                    if a == b {
                        return Err(Invalidity::DisconnectedInterior);
                    }
                    parent[a] = b;
                }
                _ => return Err(Invalidity::DisconnectedInterior),
            }
        }
    }

    Ok(())
}

fn root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Points de contact distincts entre deux contours
fn touch_points(a: &[Line], b: &[Line]) -> Vec<Coord> {
    let mut points: Vec<Coord> = Vec::new();

    for sa in a {
        for sb in b {
            if !boxes_overlap(sa, sb) {
                continue;
            }
            let point = match line_intersection(*sa, *sb) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => intersection,
                Some(LineIntersection::Collinear { intersection }) => intersection.start,
                None => continue,
            };
            if !points.iter().any(|p| same_point(*p, point)) {
                points.push(point);
            }
        }
    }

    points
}

fn same_point(a: Coord, b: Coord) -> bool {
    let tolerance = 1e-12 * a.x.abs().max(a.y.abs()).max(1.0);
    (a.x - b.x).abs() <= tolerance && (a.y - b.y).abs() <= tolerance
}

/// Les parties d'un multipolygone ont des intérieurs disjoints
/// (contact ponctuel toléré).
pub fn check_disjoint_parts(polygons: &[Polygon]) -> Result<(), Invalidity> {
    let rects: Vec<Option<Rect>> = polygons.iter().map(|p| p.bounding_rect()).collect();
    let boundaries: Vec<Vec<Line>> = polygons.iter().map(polygon_segments).collect();

    for i in 0..polygons.len() {
        for j in (i + 1)..polygons.len() {
            let (Some(a), Some(b)) = (rects[i], rects[j]) else {
                continue;
            };
            if !rects_overlap(&a, &b) {
                continue;
            }

            if boundaries_cross(&boundaries[i], &boundaries[j])
                || position_of_ring(polygons[i].exterior(), &polygons[j]) == Some(CoordPos::Inside)
                || position_of_ring(polygons[j].exterior(), &polygons[i]) == Some(CoordPos::Inside)
            {
                return Err(Invalidity::OverlappingPolygons);
            }
        }
    }

    Ok(())
}

fn ring_segments(ring: &LineString) -> Vec<Line> {
    segments(&distinct_points(&ring.0))
}

fn polygon_segments(polygon: &Polygon) -> Vec<Line> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(ring_segments)
        .collect()
}

/// Croisement propre ou recouvrement colinéaire entre deux contours
fn boundaries_cross(a: &[Line], b: &[Line]) -> bool {
    for sa in a {
        for sb in b {
            if !boxes_overlap(sa, sb) {
                continue;
            }
            match line_intersection(*sa, *sb) {
                Some(LineIntersection::SinglePoint { is_proper: true, .. }) => return true,
                Some(LineIntersection::Collinear { intersection })
                    if intersection.start != intersection.end =>
                {
                    return true
                }
                _ => {}
            }
        }
    }
    false
}

/// Position d'un anneau par rapport à un polygone, d'après son premier
/// sommet hors du contour. `None` si tous les sommets sont sur le contour.
fn position_of_ring(ring: &LineString, polygon: &Polygon) -> Option<CoordPos> {
    ring.0
        .iter()
        .map(|c| polygon.coordinate_position(c))
        .find(|pos| *pos != CoordPos::OnBoundary)
}

fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon};

    fn square_ring(x: f64, y: f64, size: f64) -> LineString {
        line_string![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]
    }

    #[test]
    fn test_hole_crossing_shell() {
        let poly = Polygon::new(square_ring(0.0, 0.0, 4.0), vec![square_ring(3.0, 1.0, 2.0)]);
        assert_eq!(check_rings_do_not_cross(&poly), Err(Invalidity::RingsCross));
    }

    #[test]
    fn test_hole_touching_shell_at_vertex() {
        let hole = line_string![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 1.0),
            (x: 1.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ];
        let poly = Polygon::new(square_ring(0.0, 0.0, 4.0), vec![hole]);
        assert!(check_rings_do_not_cross(&poly).is_ok());
        assert!(check_holes(&poly).is_ok());
    }

    #[test]
    fn test_single_touch_keeps_interior_connected() {
        let hole = line_string![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 1.0),
            (x: 1.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ];
        let poly = Polygon::new(square_ring(0.0, 0.0, 4.0), vec![hole]);
        assert!(check_connected_interior(&poly).is_ok());
    }

    #[test]
    fn test_hole_touching_shell_twice() {
        // Le contact en (4, 2) est au milieu d'une arête de l'enveloppe
        let hole = line_string![
            (x: 0.0, y: 2.0),
            (x: 2.0, y: 1.0),
            (x: 4.0, y: 2.0),
            (x: 2.0, y: 3.0),
            (x: 0.0, y: 2.0),
        ];
        let poly = Polygon::new(square_ring(0.0, 0.0, 4.0), vec![hole]);
        assert!(check_rings_do_not_cross(&poly).is_ok());
        assert!(check_holes(&poly).is_ok());
        assert_eq!(
            check_connected_interior(&poly),
            Err(Invalidity::DisconnectedInterior)
        );
    }

    #[test]
    fn test_touching_holes_forming_cycle() {
        // Trois trous triangulaires en chaîne fermée autour de (5, 5)
        let a = line_string![(x: 2.0, y: 2.0), (x: 8.0, y: 2.0), (x: 5.0, y: 4.0), (x: 2.0, y: 2.0)];
        let b = line_string![(x: 8.0, y: 2.0), (x: 8.0, y: 8.0), (x: 6.0, y: 5.0), (x: 8.0, y: 2.0)];
        let c = line_string![(x: 8.0, y: 8.0), (x: 2.0, y: 2.0), (x: 4.0, y: 5.0), (x: 8.0, y: 8.0)];
        let poly = Polygon::new(square_ring(0.0, 0.0, 10.0), vec![a.clone(), b.clone(), c]);
        assert!(check_rings_do_not_cross(&poly).is_ok());
        assert_eq!(
            check_connected_interior(&poly),
            Err(Invalidity::DisconnectedInterior)
        );

        // Sans le troisième trou, la chaîne est ouverte
        let open = Polygon::new(square_ring(0.0, 0.0, 10.0), vec![a, b]);
        assert!(check_connected_interior(&open).is_ok());
    }

    #[test]
    fn test_nested_holes() {
        let poly = Polygon::new(
            square_ring(0.0, 0.0, 10.0),
            vec![square_ring(1.0, 1.0, 8.0), square_ring(3.0, 3.0, 2.0)],
        );
        assert!(check_rings_do_not_cross(&poly).is_ok());
        assert_eq!(check_holes(&poly), Err(Invalidity::NestedHoles));
    }

    #[test]
    fn test_parts_touching_at_corner() {
        let a = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0)];
        let b = polygon![(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0), (x: 1.0, y: 2.0), (x: 1.0, y: 1.0)];
        assert!(check_disjoint_parts(&[a, b]).is_ok());
    }

    #[test]
    fn test_parts_sharing_edge() {
        let a = Polygon::new(square_ring(0.0, 0.0, 1.0), vec![]);
        let b = Polygon::new(square_ring(1.0, 0.0, 1.0), vec![]);
        assert_eq!(check_disjoint_parts(&[a, b]), Err(Invalidity::OverlappingPolygons));
    }

    #[test]
    fn test_part_inside_other() {
        let outer = Polygon::new(square_ring(0.0, 0.0, 10.0), vec![]);
        let inner = Polygon::new(square_ring(2.0, 2.0, 1.0), vec![]);
        assert_eq!(
            check_disjoint_parts(&[outer, inner]),
            Err(Invalidity::OverlappingPolygons)
        );
    }

    #[test]
    fn test_part_inside_hole_of_other() {
        let ring = Polygon::new(square_ring(0.0, 0.0, 10.0), vec![square_ring(2.0, 2.0, 6.0)]);
        let island = Polygon::new(square_ring(4.0, 4.0, 1.0), vec![]);
        assert!(check_disjoint_parts(&[ring, island]).is_ok());
    }
}
