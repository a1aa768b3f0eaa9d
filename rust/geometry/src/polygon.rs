// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar polygon with holes on the z = 0 plane.

use nalgebra::Point3;

use crate::bool2d::{compute_signed_area, ensure_ccw, ensure_cw, point_in_polygon, within};
use crate::primitives::{distance, perimeter, segment_overlap};
use crate::tolerance::GeometryTolerance;

/// Outer ring plus hole rings
///
/// Outer ring is counter-clockwise, holes are clockwise (seen from +Z).
/// Rings are open: the first vertex is not repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub outer: Vec<Point3<f64>>,
    pub holes: Vec<Vec<Point3<f64>>>,
}

impl Polygon {
    /// Create a polygon without holes. The ring is reoriented counter-clockwise.
    pub fn new(outer: Vec<Point3<f64>>) -> Self {
        Self {
            outer: ensure_ccw(&outer),
            holes: Vec::new(),
        }
    }

    /// Create a polygon with holes, normalizing ring orientation.
    pub fn with_holes(outer: Vec<Point3<f64>>, holes: Vec<Vec<Point3<f64>>>) -> Self {
        Self {
            outer: ensure_ccw(&outer),
            holes: holes.iter().map(|h| ensure_cw(h)).collect(),
        }
    }

    /// Net area: outer minus holes.
    pub fn area(&self) -> f64 {
        let outer = compute_signed_area(&self.outer).abs();
        let holes: f64 = self.holes.iter().map(|h| compute_signed_area(h).abs()).sum();
        outer - holes
    }

    /// Total boundary length, holes included.
    pub fn perimeter(&self) -> f64 {
        perimeter(&self.outer) + self.holes.iter().map(|h| perimeter(h)).sum::<f64>()
    }

    pub fn has_holes(&self) -> bool {
        !self.holes.is_empty()
    }

    /// Outer ring followed by the holes.
    pub fn rings(&self) -> impl Iterator<Item = &Vec<Point3<f64>>> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    /// Length of the segment `a → b` that runs along this polygon's boundary.
    ///
    /// Only collinear overlap counts; touching a vertex contributes nothing.
    pub fn overlap(&self, a: &Point3<f64>, b: &Point3<f64>, tol: &GeometryTolerance) -> f64 {
        let mut total = 0.0;
        for ring in self.rings() {
            let n = ring.len();
            for i in 0..n {
                if let Some((s, e)) = segment_overlap(a, b, &ring[i], &ring[(i + 1) % n], tol) {
                    total += distance(&s, &e);
                }
            }
        }
        total
    }

    /// True if the point is inside or on the boundary and not strictly inside
    /// a hole.
    pub fn contains(&self, point: &Point3<f64>, tol: &GeometryTolerance) -> bool {
        point_in_polygon(point, &self.outer, tol)
            && !self.holes.iter().any(|h| within(point, &ensure_ccw(h), tol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frame() -> Polygon {
        let outer = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ];
        let hole = vec![
            Point3::new(3.0, 3.0, 0.0),
            Point3::new(7.0, 3.0, 0.0),
            Point3::new(7.0, 7.0, 0.0),
            Point3::new(3.0, 7.0, 0.0),
        ];
        Polygon::with_holes(outer, vec![hole])
    }

    #[test]
    fn area_and_perimeter_account_for_holes() {
        let p = frame();
        assert_relative_eq!(p.area(), 84.0, epsilon = 1e-9);
        assert_relative_eq!(p.perimeter(), 56.0, epsilon = 1e-9);
        assert!(compute_signed_area(&p.holes[0]) < 0.0);
    }

    #[test]
    fn overlap_with_boundary() {
        let tol = GeometryTolerance::default();
        let p = frame();
        let overlap = p.overlap(&Point3::new(-5.0, 0.0, 0.0), &Point3::new(4.0, 0.0, 0.0), &tol);
        assert_relative_eq!(overlap, 4.0, epsilon = 1e-9);

        // Along a hole edge
        let overlap = p.overlap(&Point3::new(3.0, 0.0, 0.0), &Point3::new(3.0, 5.0, 0.0), &tol);
        assert_relative_eq!(overlap, 2.0, epsilon = 1e-9);

        // Crossing the boundary
        let overlap = p.overlap(&Point3::new(5.0, -1.0, 0.0), &Point3::new(5.0, 1.0, 0.0), &tol);
        assert_relative_eq!(overlap, 0.0);
    }

    #[test]
    fn containment_excludes_hole_interior() {
        let tol = GeometryTolerance::default();
        let p = frame();
        assert!(p.contains(&Point3::new(1.0, 1.0, 0.0), &tol));
        assert!(p.contains(&Point3::new(10.0, 5.0, 0.0), &tol));
        assert!(!p.contains(&Point3::new(5.0, 5.0, 0.0), &tol));
        assert!(p.contains(&Point3::new(3.0, 5.0, 0.0), &tol));
        assert!(!p.contains(&Point3::new(11.0, 5.0, 0.0), &tol));
    }
}
