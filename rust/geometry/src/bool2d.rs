// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Boolean Operations for Surface Matching and Footprints
//!
//! Polygon intersection, difference and union on the z = 0 plane, built on
//! the i_overlay crate, with geo_buf buffering for narrow features. Callers bring 3D faces into face coordinates first
//! (see [`crate::transform::align_face`]).
//!
//! Conversion rules shared by every operation:
//! - every vertex must satisfy |z| <= tolerance
//! - vertices are snapped to points already seen in the same operation
//! - input rings must be counter-clockwise with area >= tolerance²
//! - output rings are spike-cleaned, hole-free and snapped back to input points
//!
//! Invalid input never panics; the operation returns `None` or an empty list.

use geo::{LineString, Simplify};
use geo_buf::buffer_polygon;
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::{Point3, Vector3};
use tracing::{debug, error, info, warn};

use crate::polygon::Polygon;
use crate::primitives::{
    distance, point_line_distance, remove_collinear, reorder_ulc, segment_parameter,
};
use crate::snap::PointSnapper;
use crate::tolerance::GeometryTolerance;

type Path = Vec<[f64; 2]>;

/// Edges whose unit directions have a dot product below this are antiparallel.
const ANTIPARALLEL_COS: f64 = -0.99;

/// Result of intersecting two faces in a shared face frame
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionResult {
    /// Largest intersection ring (counter-clockwise)
    pub intersection: Vec<Point3<f64>>,
    /// Remaining disjoint intersection rings, largest first
    pub secondary: Vec<Vec<Point3<f64>>>,
    /// First polygon minus second polygon
    pub remainder1: Vec<Vec<Point3<f64>>>,
    /// Second polygon minus first polygon
    pub remainder2: Vec<Vec<Point3<f64>>>,
}

impl IntersectionResult {
    /// Pieces the first polygon splits into besides the primary intersection.
    pub fn new_polygons1(&self) -> Vec<Vec<Point3<f64>>> {
        self.secondary.iter().chain(&self.remainder1).cloned().collect()
    }

    /// Pieces the second polygon splits into besides the primary intersection.
    pub fn new_polygons2(&self) -> Vec<Vec<Point3<f64>>> {
        self.secondary.iter().chain(&self.remainder2).cloned().collect()
    }

    /// Total area covered by the first polygon's pieces.
    pub fn area1(&self) -> f64 {
        ring_area(&self.intersection) + self.new_polygons1().iter().map(|r| ring_area(r)).sum::<f64>()
    }

    /// Total area covered by the second polygon's pieces.
    pub fn area2(&self) -> f64 {
        ring_area(&self.intersection) + self.new_polygons2().iter().map(|r| ring_area(r)).sum::<f64>()
    }
}

/// Intersect two counter-clockwise rings.
///
/// Returns `None` for invalid or self-intersecting input, an empty
/// intersection, or a primary intersection that is too small, self-intersecting
/// or holed. Secondary pieces and remainders that fail the same checks are
/// dropped with a log entry.
pub fn intersect(
    polygon1: &[Point3<f64>],
    polygon2: &[Point3<f64>],
    tol: &GeometryTolerance,
) -> Option<IntersectionResult> {
    let mut snapper = PointSnapper::new(*tol);
    let path1 = non_intersecting_path(polygon1, &mut snapper, tol)?;
    let path2 = non_intersecting_path(polygon2, &mut snapper, tol)?;

    let subject = vec![path1];
    let clip = vec![path2];

    let shapes = subject.overlay(&clip, OverlayRule::Intersect, FillRule::EvenOdd);
    if shapes.is_empty() {
        return None;
    }

    let mut pieces = clean_shapes(&shapes, &mut snapper, tol);
    if pieces.is_empty() {
        return None;
    }
    if pieces.len() > 1 {
        info!(count = pieces.len(), "Intersection has multiple elements");
        pieces.sort_by(|a, b| b.area().total_cmp(&a.area()));
    }

    let primary = &pieces[0];
    let intersection = vertices_from_ring(&primary.outer, &mut snapper, tol);
    if intersection.is_empty() {
        info!("Cannot compute area of largest intersection");
        return None;
    }
    let area = primary.area();
    if area < tol.area() {
        info!(area, "Largest intersection has very small area");
        return None;
    }
    if self_intersects(&intersection, tol) {
        error!("Largest intersection is self intersecting");
        return None;
    }
    if primary.has_holes() {
        error!("Largest intersection has inner loops");
        return None;
    }

    let secondary = collect_pieces(&pieces[1..], &mut snapper, tol, "intersection");

    let diff1 = subject.overlay(&clip, OverlayRule::Difference, FillRule::EvenOdd);
    let diff1 = clean_shapes(&diff1, &mut snapper, tol);
    let remainder1 = collect_pieces(&diff1, &mut snapper, tol, "face difference");

    let diff2 = clip.overlay(&subject, OverlayRule::Difference, FillRule::EvenOdd);
    let diff2 = clean_shapes(&diff2, &mut snapper, tol);
    let remainder2 = collect_pieces(&diff2, &mut snapper, tol, "face difference");

    Some(IntersectionResult {
        intersection,
        secondary,
        remainder1,
        remainder2,
    })
}

/// Union of two counter-clockwise rings.
///
/// Succeeds only when the union is a single hole-free polygon of non-trivial
/// area. The result starts at its upper-left corner with collinear vertices
/// removed.
pub fn join(
    polygon1: &[Point3<f64>],
    polygon2: &[Point3<f64>],
    tol: &GeometryTolerance,
) -> Option<Polygon> {
    let mut snapper = PointSnapper::new(*tol);
    let path1 = non_intersecting_path(polygon1, &mut snapper, tol)?;
    let path2 = non_intersecting_path(polygon2, &mut snapper, tol)?;

    let shapes = vec![path1].overlay(&vec![path2], OverlayRule::Union, FillRule::EvenOdd);
    let pieces: Vec<Polygon> = shapes
        .iter()
        .filter_map(|shape| polygon_from_shape(shape))
        .filter_map(|p| remove_spikes_polygon(&p, tol))
        .collect();

    if pieces.len() != 1 {
        return None;
    }
    let union = &pieces[0];
    if union.has_holes() {
        error!("Union has inner loops");
        return None;
    }

    let vertices = vertices_from_ring(&union.outer, &mut snapper, tol);
    if vertices.is_empty() {
        info!("Cannot compute area of union");
        return None;
    }
    let area = union.area();
    if area < tol.area() {
        info!(area, "Union has very small area");
        return None;
    }
    if self_intersects(&vertices, tol) {
        error!("Union is self intersecting");
        return None;
    }

    let vertices = remove_collinear(&reorder_ulc(&vertices, tol), tol);
    Some(Polygon::new(vertices))
}

/// Merge every group of touching rings into one polygon.
///
/// Rings are grouped into connected components of the "joins with" relation;
/// each component is then unioned pairwise until nothing more merges. Rings
/// that never merge into their component's result are kept as separate
/// polygons and logged.
pub fn join_all(polygons: &[Vec<Point3<f64>>], tol: &GeometryTolerance) -> Vec<Polygon> {
    let n = polygons.len();
    if n <= 1 {
        return polygons.iter().map(|p| Polygon::new(p.clone())).collect();
    }

    let mut adjacency = vec![vec![false; n]; n];
    for i in 0..n {
        adjacency[i][i] = true;
        for j in (i + 1)..n {
            if join(&polygons[i], &polygons[j], tol).is_some() {
                adjacency[i][j] = true;
                adjacency[j][i] = true;
            }
        }
    }

    let mut result = Vec::new();
    for component in connected_components(&adjacency) {
        let mut current = Polygon::new(polygons[component[0]].clone());
        let mut pending: Vec<usize> = component[1..].to_vec();

        loop {
            let before = pending.len();
            pending.retain(|&i| match join(&current.outer, &polygons[i], tol) {
                Some(joined) => {
                    current = joined;
                    false
                }
                None => true,
            });
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        result.push(current);
        for i in pending {
            error!(polygon = i, "Expected polygons to join together");
            result.push(Polygon::new(polygons[i].clone()));
        }
    }

    result
}

/// Subtract hole rings from a ring, returning hole-free pieces.
///
/// Any invalid input ring yields an empty result.
pub fn subtract(
    polygon: &[Point3<f64>],
    holes: &[Vec<Point3<f64>>],
    tol: &GeometryTolerance,
) -> Vec<Vec<Point3<f64>>> {
    let mut snapper = PointSnapper::new(*tol);
    let Some(initial) = non_intersecting_path(polygon, &mut snapper, tol) else {
        return Vec::new();
    };

    let mut pieces: Vec<Polygon> = vec![polygon_from_paths(&[initial])];
    for hole in holes {
        let Some(hole_path) = non_intersecting_path(hole, &mut snapper, tol) else {
            return Vec::new();
        };
        let clip = vec![hole_path];

        let mut next = Vec::new();
        for piece in &pieces {
            let shapes = polygon_paths(piece).overlay(&clip, OverlayRule::Difference, FillRule::EvenOdd);
            next.extend(clean_shapes(&shapes, &mut snapper, tol));
        }
        pieces = next;
    }

    pieces
        .iter()
        .map(|p| vertices_from_ring(&p.outer, &mut snapper, tol))
        .filter(|v| !v.is_empty())
        .collect()
}

/// Remove spikes from a ring, repeating until nothing changes.
///
/// A spike is a vertex where the boundary doubles back on itself: the next
/// vertex lies on the line of the incoming edge (or the previous vertex on the
/// outgoing edge) and the direction reverses. Consecutive vertices closer than
/// the tolerance are merged. Returns an empty ring if fewer than three
/// vertices survive. Applying it twice gives the same ring as applying it once.
pub fn remove_spikes(ring: &[Point3<f64>], tol: &GeometryTolerance) -> Vec<Point3<f64>> {
    let mut points = dedup_ring(ring, tol);

    loop {
        let n = points.len();
        if n < 3 {
            return Vec::new();
        }
        let spike = (0..n).find(|&i| is_spike(&points[(i + n - 1) % n], &points[i], &points[(i + 1) % n], tol));
        match spike {
            Some(i) => {
                points.remove(i);
                points = dedup_ring(&points, tol);
            }
            None => return points,
        }
    }
}

/// Spike removal by buffering: shrink by the tolerance, grow back, simplify.
///
/// Features narrower than twice the tolerance vanish while the shrink runs.
/// The result is snapped back onto the input vertices. A ring pinched into
/// several parts yields several rings.
pub fn remove_spikes_buffered(ring: &[Point3<f64>], tol: &GeometryTolerance) -> Vec<Vec<Point3<f64>>> {
    let ccw = ensure_ccw(ring);
    if ccw.len() < 3 {
        return Vec::new();
    }
    let mut snapper = PointSnapper::new(*tol);
    snapper.snap_all(&ccw);

    let shrunk = buffer_polygon(&to_geo_polygon(&ccw), -tol.distance);
    let mut result = Vec::new();

    for piece in shrunk.0.iter() {
        let grown = buffer_polygon(piece, tol.distance);
        for restored in grown.0.iter().map(|p| p.simplify(&tol.distance)) {
            let outer = ensure_ccw(&from_geo_ring(restored.exterior()));
            let vertices = vertices_from_ring(&outer, &mut snapper, tol);
            let vertices = remove_collinear(&vertices, tol);
            if vertices.len() >= 3 && ring_area(&vertices) >= tol.area() {
                result.push(vertices);
            }
        }
    }

    debug!(input = ring.len(), pieces = result.len(), "Buffered spike removal");
    result
}

/// Decompose a polygon with holes into hole-free pieces.
///
/// Each hole is cut open by a vertical line through its interior; the two
/// halves are processed again until no piece has holes.
pub fn remove_holes(polygon: &Polygon) -> Vec<Polygon> {
    let mut done = Vec::new();
    let mut queue = vec![polygon.clone()];
    let mut budget = 4 * (polygon.holes.len() + 1);

    while let Some(piece) = queue.pop() {
        if !piece.has_holes() {
            done.push(piece);
            continue;
        }
        if budget == 0 {
            error!(holes = piece.holes.len(), "Failed to remove holes from polygon");
            continue;
        }
        budget -= 1;
        queue.extend(split_at_hole(&piece));
    }

    done
}

/// Simplify a ring on the z = 0 plane.
///
/// Vertices are snapped, spikes removed and near-collinear vertices dropped.
/// With `remove_collinear` false, input vertices lying on the simplified
/// edges are inserted back. Winding is preserved; the result starts at the
/// upper-left corner.
pub fn simplify(
    vertices: &[Point3<f64>],
    remove_collinear_points: bool,
    tol: &GeometryTolerance,
) -> Vec<Point3<f64>> {
    let reversed = compute_signed_area(vertices) < 0.0;
    let ccw = ensure_ccw(vertices);

    let mut snapper = PointSnapper::new(*tol);
    if non_intersecting_path(&ccw, &mut snapper, tol).is_none() {
        return Vec::new();
    }
    let snapped = dedup_ring(&snapper.snap_all(&ccw), tol);
    let cleaned = remove_collinear(&remove_spikes(&snapped, tol), tol);
    if cleaned.len() < 3 {
        return Vec::new();
    }

    let mut result = if remove_collinear_points {
        cleaned
    } else {
        reinsert_points(&cleaned, &snapped, tol)
    };

    if reversed {
        result.reverse();
    }
    reorder_ulc(&result, tol)
}

/// True if two non-adjacent edges of the ring touch or cross.
///
/// Edges closer than half the tolerance count as touching.
pub fn self_intersects(ring: &[Point3<f64>], tol: &GeometryTolerance) -> bool {
    let n = ring.len();
    if n < 4 {
        return false;
    }
    let limit = tol.distance * 0.5;

    for i in 0..n {
        let a0 = &ring[i];
        let a1 = &ring[(i + 1) % n];
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let b0 = &ring[j];
            let b1 = &ring[(j + 1) % n];
            if segment_distance(a0, a1, b0, b1) <= limit {
                return true;
            }
        }
    }
    false
}

/// True if two valid rings share area or touch along their boundaries.
pub fn intersects(polygon1: &[Point3<f64>], polygon2: &[Point3<f64>], tol: &GeometryTolerance) -> bool {
    let mut snapper = PointSnapper::new(*tol);
    let (Some(path1), Some(path2)) = (
        ring_to_path(polygon1, &mut snapper, tol),
        ring_to_path(polygon2, &mut snapper, tol),
    ) else {
        return false;
    };

    let shapes = vec![path1].overlay(&vec![path2], OverlayRule::Intersect, FillRule::EvenOdd);
    let overlap: f64 = shapes
        .iter()
        .filter_map(|s| polygon_from_shape(s))
        .map(|p| p.area())
        .sum();
    if overlap >= tol.area() {
        return true;
    }

    let n1 = polygon1.len();
    let n2 = polygon2.len();
    (0..n1).any(|i| {
        (0..n2).any(|j| {
            segment_distance(&polygon1[i], &polygon1[(i + 1) % n1], &polygon2[j], &polygon2[(j + 1) % n2])
                <= tol.distance
        })
    })
}

/// True if the point is inside the ring or within tolerance of its boundary.
pub fn point_in_polygon(point: &Point3<f64>, ring: &[Point3<f64>], tol: &GeometryTolerance) -> bool {
    if point.z.abs() > tol.distance || ring.len() < 3 {
        return false;
    }
    point_on_boundary(point, ring, tol) || point_in_contour(point, ring)
}

/// True if the point is strictly inside the ring, further than the tolerance
/// from its boundary.
pub fn within(point: &Point3<f64>, ring: &[Point3<f64>], tol: &GeometryTolerance) -> bool {
    if point.z.abs() > tol.distance || ring.len() < 3 {
        return false;
    }
    !point_on_boundary(point, ring, tol) && point_in_contour(point, ring)
}

/// True if the point lies within tolerance of any edge of the ring.
pub fn point_on_boundary(point: &Point3<f64>, ring: &[Point3<f64>], tol: &GeometryTolerance) -> bool {
    let n = ring.len();
    (0..n).any(|i| point_segment_distance(point, &ring[i], &ring[(i + 1) % n]) <= tol.distance)
}

/// Compute the signed area of a ring projected on the XY plane
/// Positive = counter-clockwise, Negative = clockwise
pub fn compute_signed_area(contour: &[Point3<f64>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = contour.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i].x * contour[j].y;
        area -= contour[j].x * contour[i].y;
    }

    area * 0.5
}

/// Ensure ring has counter-clockwise winding (positive area)
pub fn ensure_ccw(contour: &[Point3<f64>]) -> Vec<Point3<f64>> {
    if compute_signed_area(contour) < 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Ensure ring has clockwise winding (for holes)
pub fn ensure_cw(contour: &[Point3<f64>]) -> Vec<Point3<f64>> {
    if compute_signed_area(contour) > 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Check if a point is inside a ring using ray casting (XY only)
pub fn point_in_contour(point: &Point3<f64>, contour: &[Point3<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = contour.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = &contour[i];
        let pj = &contour[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// True if the ring has two antiparallel, non-adjacent edges closer than
/// twice the tolerance, i.e. a sliver that direct spike removal cannot see.
pub fn has_narrow_feature(ring: &[Point3<f64>], tol: &GeometryTolerance) -> bool {
    let n = ring.len();
    if n < 4 {
        return false;
    }
    let limit = 2.0 * tol.distance;

    for i in 0..n {
        let a0 = &ring[i];
        let a1 = &ring[(i + 1) % n];
        let Some(da) = (a1 - a0).try_normalize(1e-12) else {
            continue;
        };
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let b0 = &ring[j];
            let b1 = &ring[(j + 1) % n];
            let Some(db) = (b1 - b0).try_normalize(1e-12) else {
                continue;
            };
            if da.dot(&db) < ANTIPARALLEL_COS && segment_distance(a0, a1, b0, b1) < limit {
                return true;
            }
        }
    }
    false
}

// ============================================================================
// Internal Helper Functions
// ============================================================================

/// Validate and convert a ring to i_overlay path format.
fn ring_to_path(
    vertices: &[Point3<f64>],
    snapper: &mut PointSnapper,
    tol: &GeometryTolerance,
) -> Option<Path> {
    if vertices.len() < 3 {
        return None;
    }
    if vertices.iter().any(|v| v.z.abs() > tol.distance) {
        error!("All points must be on z = 0 plane");
        return None;
    }

    let flat: Vec<Point3<f64>> = vertices.iter().map(|v| Point3::new(v.x, v.y, 0.0)).collect();
    let snapped = dedup_ring(&snapper.snap_all(&flat), tol);
    if snapped.len() < 3 {
        return None;
    }

    // Clockwise and degenerate rings are both rejected here
    if compute_signed_area(&snapped) < tol.area() {
        return None;
    }

    Some(snapped.iter().map(|p| [p.x, p.y]).collect())
}

fn non_intersecting_path(
    vertices: &[Point3<f64>],
    snapper: &mut PointSnapper,
    tol: &GeometryTolerance,
) -> Option<Path> {
    let path = ring_to_path(vertices, snapper, tol)?;
    if self_intersects(&path_to_ring(&path), tol) {
        debug!(vertices = vertices.len(), "Rejecting self intersecting ring");
        return None;
    }
    Some(path)
}

fn path_to_ring(path: &[[f64; 2]]) -> Vec<Point3<f64>> {
    path.iter().map(|p| Point3::new(p[0], p[1], 0.0)).collect()
}

/// Build a polygon from one i_overlay shape: first contour is the outer
/// boundary, the rest are holes.
fn polygon_from_shape(shape: &[Path]) -> Option<Polygon> {
    let (outer, holes) = shape.split_first()?;
    if outer.len() < 3 {
        return None;
    }
    Some(Polygon::with_holes(
        path_to_ring(outer),
        holes.iter().filter(|h| h.len() >= 3).map(|h| path_to_ring(h)).collect(),
    ))
}

fn polygon_from_paths(paths: &[Path]) -> Polygon {
    let mut rings = paths.iter().map(|p| path_to_ring(p));
    let outer = rings.next().unwrap_or_default();
    Polygon::with_holes(outer, rings.collect())
}

fn polygon_paths(polygon: &Polygon) -> Vec<Path> {
    polygon
        .rings()
        .map(|r| r.iter().map(|p| [p.x, p.y]).collect())
        .collect()
}

/// Spike-clean every shape and decompose holes, in that order.
fn clean_shapes(
    shapes: &[Vec<Path>],
    snapper: &mut PointSnapper,
    tol: &GeometryTolerance,
) -> Vec<Polygon> {
    let mut result = Vec::new();
    for shape in shapes {
        let Some(polygon) = polygon_from_shape(shape) else {
            continue;
        };
        let Some(polygon) = remove_spikes_polygon(&polygon, tol) else {
            continue;
        };

        let outer_snapped = snapper.snap_all(&polygon.outer);
        if has_narrow_feature(&outer_snapped, tol) {
            debug!("Residual narrow feature, using buffered spike removal");
            for ring in remove_spikes_buffered(&outer_snapped, tol) {
                // Holes are re-applied by difference against the cleaned ring
                let piece = Polygon::with_holes(ring, polygon.holes.clone());
                result.extend(remove_holes(&clip_holes(&piece)));
            }
            continue;
        }

        result.extend(remove_holes(&polygon));
    }
    result
}

/// Recompute a polygon whose holes may no longer lie inside its outer ring.
fn clip_holes(polygon: &Polygon) -> Polygon {
    if !polygon.has_holes() {
        return polygon.clone();
    }
    let outer: Vec<Path> = vec![polygon.outer.iter().map(|p| [p.x, p.y]).collect()];
    let holes: Vec<Path> = polygon
        .holes
        .iter()
        .map(|h| ensure_ccw(h).iter().map(|p| [p.x, p.y]).collect())
        .collect();
    let shapes = outer.overlay(&holes, OverlayRule::Difference, FillRule::EvenOdd);
    shapes
        .iter()
        .filter_map(|s| polygon_from_shape(s))
        .max_by(|a, b| a.area().total_cmp(&b.area()))
        .unwrap_or_else(|| Polygon::new(Vec::new()))
}

fn remove_spikes_polygon(polygon: &Polygon, tol: &GeometryTolerance) -> Option<Polygon> {
    let outer = remove_spikes(&polygon.outer, tol);
    if outer.len() < 3 {
        return None;
    }
    let holes = polygon
        .holes
        .iter()
        .map(|h| remove_spikes(h, tol))
        .filter(|h| h.len() >= 3)
        .collect();
    Some(Polygon::with_holes(outer, holes))
}

/// Snap, validate and convert result polygons; invalid pieces are logged and
/// dropped.
fn collect_pieces(
    pieces: &[Polygon],
    snapper: &mut PointSnapper,
    tol: &GeometryTolerance,
    what: &str,
) -> Vec<Vec<Point3<f64>>> {
    let mut result = Vec::new();
    for piece in pieces {
        let vertices = vertices_from_ring(&piece.outer, snapper, tol);
        if vertices.is_empty() {
            info!(what, "Cannot compute area, result will not include this polygon");
            continue;
        }
        let area = piece.area();
        if area < tol.area() {
            info!(what, area, "Very small area, result will not include this polygon");
            continue;
        }
        if self_intersects(&vertices, tol) {
            error!(what, "Self intersecting, result will not include this polygon");
            continue;
        }
        if piece.has_holes() {
            error!(what, "Inner loops, result will not include this polygon");
            continue;
        }
        result.push(vertices);
    }
    result
}

/// Snap an output ring onto known points and drop redundant vertices.
fn vertices_from_ring(
    ring: &[Point3<f64>],
    snapper: &mut PointSnapper,
    tol: &GeometryTolerance,
) -> Vec<Point3<f64>> {
    let flat: Vec<Point3<f64>> = ring.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
    let snapped = dedup_ring(&snapper.snap_all(&flat), tol);
    let result = remove_collinear(&snapped, tol);
    if result.len() < 3 {
        return Vec::new();
    }
    result
}

/// Merge consecutive vertices closer than the tolerance, including the
/// closing pair.
fn dedup_ring(ring: &[Point3<f64>], tol: &GeometryTolerance) -> Vec<Point3<f64>> {
    let mut result: Vec<Point3<f64>> = Vec::with_capacity(ring.len());
    for p in ring {
        if result.last().map_or(true, |last| !tol.points_equal(last, p)) {
            result.push(*p);
        }
    }
    while result.len() > 1 && tol.points_equal(&result[0], &result[result.len() - 1]) {
        result.pop();
    }
    result
}

fn is_spike(prev: &Point3<f64>, curr: &Point3<f64>, next: &Point3<f64>, tol: &GeometryTolerance) -> bool {
    let incoming: Vector3<f64> = curr - prev;
    let outgoing: Vector3<f64> = next - curr;
    if incoming.dot(&outgoing) >= 0.0 {
        return false;
    }
    point_line_distance(next, prev, curr) <= tol.distance
        || point_line_distance(prev, curr, next) <= tol.distance
}

fn to_geo_polygon(ring: &[Point3<f64>]) -> geo::Polygon<f64> {
    let exterior: Vec<(f64, f64)> = ring.iter().map(|p| (p.x, p.y)).collect();
    geo::Polygon::new(LineString::from(exterior), Vec::new())
}

/// Open ring from a closed geo line string.
fn from_geo_ring(ring: &LineString<f64>) -> Vec<Point3<f64>> {
    let mut points: Vec<Point3<f64>> = ring.coords().map(|c| Point3::new(c.x, c.y, 0.0)).collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Cut a polygon with a vertical line through the interior of its first hole.
fn split_at_hole(polygon: &Polygon) -> Vec<Polygon> {
    let Some(hole) = polygon.holes.first() else {
        return vec![polygon.clone()];
    };

    let (hole_min, hole_max) = x_range(hole);
    let split_x = 0.5 * (hole_min + hole_max);

    let (mut min_x, mut max_x) = x_range(&polygon.outer);
    let (mut min_y, mut max_y) = y_range(&polygon.outer);
    min_x -= 1.0;
    max_x += 1.0;
    min_y -= 1.0;
    max_y += 1.0;

    let subject = polygon_paths(polygon);
    let halves = [
        vec![vec![[min_x, min_y], [split_x, min_y], [split_x, max_y], [min_x, max_y]]],
        vec![vec![[split_x, min_y], [max_x, min_y], [max_x, max_y], [split_x, max_y]]],
    ];

    let mut result = Vec::new();
    for half in &halves {
        let shapes = subject.overlay(half, OverlayRule::Intersect, FillRule::EvenOdd);
        result.extend(shapes.iter().filter_map(|s| polygon_from_shape(s)));
    }
    result
}

fn x_range(ring: &[Point3<f64>]) -> (f64, f64) {
    ring.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)))
}

fn y_range(ring: &[Point3<f64>]) -> (f64, f64) {
    ring.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)))
}

/// Insert original vertices that lie on the edges of a simplified ring,
/// ordered along each edge.
fn reinsert_points(
    simplified: &[Point3<f64>],
    original: &[Point3<f64>],
    tol: &GeometryTolerance,
) -> Vec<Point3<f64>> {
    let mut pending: Vec<Point3<f64>> = original
        .iter()
        .filter(|p| !simplified.iter().any(|q| distance(p, q) < tol.distance))
        .cloned()
        .collect();

    let n = simplified.len();
    let mut result = Vec::with_capacity(n + pending.len());
    for i in 0..n {
        let a = &simplified[i];
        let b = &simplified[(i + 1) % n];
        result.push(*a);

        let mut on_edge: Vec<(f64, Point3<f64>)> = Vec::new();
        pending.retain(|p| {
            let t = segment_parameter(p, a, b);
            if t > 0.0 && t < 1.0 && point_line_distance(p, a, b) < tol.distance {
                on_edge.push((t, *p));
                false
            } else {
                true
            }
        });
        on_edge.sort_by(|x, y| x.0.total_cmp(&y.0));
        result.extend(on_edge.into_iter().map(|(_, p)| p));
    }

    if !pending.is_empty() {
        warn!(count = pending.len(), "Unique vertices were not added back to the polygon");
    }
    result
}

/// Connected components of a symmetric adjacency matrix, each sorted by
/// index, ordered by their smallest index.
fn connected_components(adjacency: &[Vec<bool>]) -> Vec<Vec<usize>> {
    let n = adjacency.len();
    let mut visited = vec![false; n];
    let mut components = Vec::new();

    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut stack = vec![start];
        let mut component = Vec::new();
        while let Some(i) = stack.pop() {
            component.push(i);
            for j in 0..n {
                if adjacency[i][j] && !visited[j] {
                    visited[j] = true;
                    stack.push(j);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }

    components
}

fn ring_area(ring: &[Point3<f64>]) -> f64 {
    compute_signed_area(ring).abs()
}

fn point_segment_distance(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let t = segment_parameter(p, a, b).clamp(0.0, 1.0);
    distance(p, &(a + (b - a) * t))
}

fn orient(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn segment_distance(a0: &Point3<f64>, a1: &Point3<f64>, b0: &Point3<f64>, b1: &Point3<f64>) -> f64 {
    let crosses = orient(a0, a1, b0) * orient(a0, a1, b1) < 0.0
        && orient(b0, b1, a0) * orient(b0, b1, a1) < 0.0;
    if crosses {
        return 0.0;
    }
    point_segment_distance(a0, b0, b1)
        .min(point_segment_distance(a1, b0, b1))
        .min(point_segment_distance(b0, a0, a1))
        .min(point_segment_distance(b1, a0, a1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point3<f64>> {
        vec![
            Point3::new(x0, y0, 0.0),
            Point3::new(x1, y0, 0.0),
            Point3::new(x1, y1, 0.0),
            Point3::new(x0, y1, 0.0),
        ]
    }

    fn total_area(rings: &[Vec<Point3<f64>>]) -> f64 {
        rings.iter().map(|r| ring_area(r)).sum()
    }

    #[test]
    fn test_compute_signed_area() {
        let ccw = rect(0.0, 0.0, 2.0, 3.0);
        assert_relative_eq!(compute_signed_area(&ccw), 6.0, epsilon = 1e-12);
        let cw: Vec<_> = ccw.iter().rev().cloned().collect();
        assert_relative_eq!(compute_signed_area(&cw), -6.0, epsilon = 1e-12);
        assert!(compute_signed_area(&ensure_ccw(&cw)) > 0.0);
        assert!(compute_signed_area(&ensure_cw(&ccw)) < 0.0);
    }

    #[test]
    fn test_intersect_overlapping_rectangles() {
        let tol = GeometryTolerance::default();
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 0.0, 15.0, 10.0);
        let result = intersect(&a, &b, &tol).unwrap();

        assert_relative_eq!(ring_area(&result.intersection), 50.0, epsilon = 1e-6);
        assert!(result.secondary.is_empty());
        assert_eq!(result.remainder1.len(), 1);
        assert_eq!(result.remainder2.len(), 1);
        assert_relative_eq!(total_area(&result.remainder1), 50.0, epsilon = 1e-6);
        assert_relative_eq!(result.area1(), 100.0, epsilon = 1e-6);
        assert_relative_eq!(result.area2(), 100.0, epsilon = 1e-6);

        // Output corners are snapped onto input corners
        assert!(result
            .intersection
            .iter()
            .all(|p| a.contains(p) || b.contains(p)));
    }

    #[test]
    fn test_intersect_contained_splits_remainder() {
        let tol = GeometryTolerance::default();
        let big = rect(0.0, 0.0, 10.0, 10.0);
        let small = rect(4.0, 4.0, 6.0, 6.0);
        let result = intersect(&big, &small, &tol).unwrap();

        assert_relative_eq!(ring_area(&result.intersection), 4.0, epsilon = 1e-6);
        // The frame around the small square is decomposed into hole-free pieces
        assert!(result.remainder1.len() >= 2);
        assert_relative_eq!(total_area(&result.remainder1), 96.0, epsilon = 1e-6);
        assert!(result.remainder2.is_empty());
    }

    #[test]
    fn test_intersect_rejects_invalid_input() {
        let tol = GeometryTolerance::default();
        let a = rect(0.0, 0.0, 10.0, 10.0);

        let cw: Vec<_> = a.iter().rev().cloned().collect();
        assert!(intersect(&a, &cw, &tol).is_none());

        let bow_tie = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ];
        assert!(intersect(&a, &bow_tie, &tol).is_none());

        let lifted = rect(0.0, 0.0, 1.0, 1.0)
            .into_iter()
            .map(|p| Point3::new(p.x, p.y, 1.0))
            .collect::<Vec<_>>();
        assert!(intersect(&a, &lifted, &tol).is_none());

        // Disjoint
        assert!(intersect(&a, &rect(20.0, 0.0, 30.0, 10.0), &tol).is_none());
    }

    #[test]
    fn test_intersect_multiple_pieces_sorted_by_area() {
        let tol = GeometryTolerance::default();
        // U shape crossing a bar yields two disjoint intersections
        let u_shape = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(7.0, 10.0, 0.0),
            Point3::new(7.0, 2.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(2.0, 10.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ];
        let bar = rect(-1.0, 5.0, 11.0, 6.0);
        let result = intersect(&u_shape, &bar, &tol).unwrap();

        assert_relative_eq!(ring_area(&result.intersection), 3.0, epsilon = 1e-6);
        assert_eq!(result.secondary.len(), 1);
        assert_relative_eq!(ring_area(&result.secondary[0]), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_join_adjacent() {
        let tol = GeometryTolerance::default();
        let joined = join(&rect(0.0, 0.0, 5.0, 5.0), &rect(5.0, 0.0, 10.0, 5.0), &tol).unwrap();
        assert_eq!(joined.outer.len(), 4);
        assert_relative_eq!(joined.area(), 50.0, epsilon = 1e-6);
        // Upper-left corner first
        assert_relative_eq!(joined.outer[0].x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(joined.outer[0].y, 5.0, epsilon = 1e-9);

        assert!(join(&rect(0.0, 0.0, 5.0, 5.0), &rect(6.0, 0.0, 10.0, 5.0), &tol).is_none());
    }

    #[test]
    fn test_join_all_components() {
        let tol = GeometryTolerance::default();
        let rings = vec![
            rect(0.0, 0.0, 5.0, 5.0),
            rect(20.0, 0.0, 25.0, 5.0),
            rect(10.0, 0.0, 15.0, 5.0),
            rect(5.0, 0.0, 10.0, 5.0),
        ];
        let mut joined = join_all(&rings, &tol);
        joined.sort_by(|a, b| b.area().total_cmp(&a.area()));
        assert_eq!(joined.len(), 2);
        assert_relative_eq!(joined[0].area(), 75.0, epsilon = 1e-6);
        assert_relative_eq!(joined[0].perimeter(), 40.0, epsilon = 1e-6);
        assert_relative_eq!(joined[1].area(), 25.0, epsilon = 1e-6);
    }

    #[test]
    fn test_subtract() {
        let tol = GeometryTolerance::default();
        let pieces = subtract(
            &rect(0.0, 0.0, 10.0, 10.0),
            &[rect(2.0, 2.0, 4.0, 4.0), rect(6.0, 6.0, 8.0, 8.0)],
            &tol,
        );
        assert!(!pieces.is_empty());
        assert_relative_eq!(total_area(&pieces), 92.0, epsilon = 1e-6);
        for piece in &pieces {
            assert!(compute_signed_area(piece) > 0.0);
        }
    }

    #[test]
    fn test_remove_spikes() {
        let tol = GeometryTolerance::default();
        let spiky = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(5.0, -3.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ];
        let once = remove_spikes(&spiky, &tol);
        let twice = remove_spikes(&once, &tol);
        assert_eq!(once, twice);
        assert_relative_eq!(ring_area(&once), 100.0, epsilon = 1e-9);
        assert!(once.iter().all(|p| p.y >= 0.0));
    }

    #[test]
    fn test_remove_spikes_buffered_narrow_sliver() {
        let tol = GeometryTolerance::default();
        // Square with a 15 mm wide sliver sticking out of the top edge
        let ring = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(5.015, 10.0, 0.0),
            Point3::new(5.015, 13.0, 0.0),
            Point3::new(5.0, 13.0, 0.0),
            Point3::new(5.0, 10.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ];
        let cleaned = remove_spikes(&ring, &tol);
        assert!(has_narrow_feature(&cleaned, &tol));

        let buffered = remove_spikes_buffered(&cleaned, &tol);
        assert_eq!(buffered.len(), 1);
        assert_relative_eq!(ring_area(&buffered[0]), 100.0, epsilon = 1e-3);
        assert!(buffered[0].iter().all(|p| p.y <= 10.0 + 1e-6));
    }

    #[test]
    fn test_intersect_difference_sliver_is_cleaned() {
        let tol = GeometryTolerance::default();
        // Clipping leaves a 15 mm wide strip along x = 0 below the body
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(0.015, 0.0, 10.0, 5.0);
        let result = intersect(&a, &b, &tol).unwrap();

        assert_relative_eq!(ring_area(&result.intersection), 9.985 * 5.0, epsilon = 1e-6);
        assert!(result.remainder2.is_empty());
        assert_eq!(result.remainder1.len(), 1);

        let remainder = &result.remainder1[0];
        assert_relative_eq!(ring_area(remainder), 50.0, epsilon = 1e-3);
        assert!(compute_signed_area(remainder) > 0.0);
        assert!(!self_intersects(remainder, &tol));
        assert!(!has_narrow_feature(remainder, &tol));
        assert!(remainder.iter().all(|p| p.y >= 5.0 - tol.distance));
    }

    #[test]
    fn test_remove_holes() {
        let frame = Polygon::with_holes(rect(0.0, 0.0, 10.0, 10.0), vec![rect(3.0, 3.0, 7.0, 7.0)]);
        let pieces = remove_holes(&frame);
        assert!(pieces.len() >= 2);
        assert!(pieces.iter().all(|p| !p.has_holes()));
        let area: f64 = pieces.iter().map(|p| p.area()).sum();
        assert_relative_eq!(area, 84.0, epsilon = 1e-6);
    }

    #[test]
    fn test_simplify() {
        let tol = GeometryTolerance::default();
        let mut ring = rect(0.0, 0.0, 10.0, 10.0);
        ring.insert(1, Point3::new(5.0, 0.0, 0.0));

        let simplified = simplify(&ring, true, &tol);
        assert_eq!(simplified.len(), 4);

        let kept = simplify(&ring, false, &tol);
        assert_eq!(kept.len(), 5);
        assert!(kept.contains(&Point3::new(5.0, 0.0, 0.0)));
        assert!(compute_signed_area(&kept) > 0.0);
    }

    #[test]
    fn test_predicates() {
        let tol = GeometryTolerance::default();
        let square = rect(0.0, 0.0, 10.0, 10.0);

        assert!(point_in_polygon(&Point3::new(5.0, 5.0, 0.0), &square, &tol));
        assert!(point_in_polygon(&Point3::new(10.0, 5.0, 0.0), &square, &tol));
        assert!(!point_in_polygon(&Point3::new(11.0, 5.0, 0.0), &square, &tol));
        assert!(within(&Point3::new(5.0, 5.0, 0.0), &square, &tol));
        assert!(!within(&Point3::new(10.0, 5.0, 0.0), &square, &tol));

        assert!(intersects(&square, &rect(5.0, 5.0, 15.0, 15.0), &tol));
        assert!(intersects(&square, &rect(10.0, 0.0, 20.0, 10.0), &tol));
        assert!(!intersects(&square, &rect(11.0, 0.0, 20.0, 10.0), &tol));

        let bow_tie = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ];
        assert!(self_intersects(&bow_tie, &tol));
        assert!(!self_intersects(&square, &tol));
        assert!(point_in_contour(&Point3::new(1.0, 1.0, 0.0), &square));
    }
}
