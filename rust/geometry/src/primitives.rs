// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point, vector and vertex-loop primitives.
//!
//! Points and vectors are plain `nalgebra` values. The functions here operate
//! on ordered vertex loops (first vertex not repeated) and take every
//! threshold from a [`GeometryTolerance`].

use nalgebra::{Matrix4, Point3, Vector3};

use crate::tolerance::GeometryTolerance;
use crate::transform::{align_face, transform_points};

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (b - a).norm()
}

/// Unnormalized Newell normal of a vertex loop.
///
/// Its length is twice the loop area and its direction follows the right-hand
/// rule relative to the winding order.
pub fn newell_vector(vertices: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    let n = vertices.len();

    for i in 0..n {
        let curr = &vertices[i];
        let next = &vertices[(i + 1) % n];

        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }

    normal
}

/// Outward unit normal of a vertex loop (Newell's method).
///
/// Returns `None` for fewer than three vertices or a degenerate loop.
pub fn outward_normal(vertices: &[Point3<f64>]) -> Option<Vector3<f64>> {
    if vertices.len() < 3 {
        return None;
    }
    let normal = newell_vector(vertices);
    let len = normal.norm();
    if len < 1e-12 {
        return None;
    }
    Some(normal / len)
}

/// Area of a planar vertex loop.
pub fn polygon_area(vertices: &[Point3<f64>]) -> Option<f64> {
    if vertices.len() < 3 {
        return None;
    }
    Some(newell_vector(vertices).norm() / 2.0)
}

/// Arithmetic mean of the vertices. Lies in the plane of a planar loop.
pub fn vertex_centroid(vertices: &[Point3<f64>]) -> Option<Point3<f64>> {
    if vertices.is_empty() {
        return None;
    }
    let sum = vertices
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / vertices.len() as f64))
}

/// Area-weighted centroid of a planar vertex loop.
pub fn centroid(vertices: &[Point3<f64>]) -> Option<Point3<f64>> {
    let normal = outward_normal(vertices)?;
    let origin = vertex_centroid(vertices)?;
    let n = vertices.len();

    let mut weighted = Vector3::zeros();
    let mut total = 0.0;
    for i in 0..n {
        let a = &vertices[i];
        let b = &vertices[(i + 1) % n];
        let area = (a - origin).cross(&(b - origin)).dot(&normal) / 2.0;
        weighted += (origin.coords + a.coords + b.coords) / 3.0 * area;
        total += area;
    }

    if total.abs() < 1e-12 {
        return None;
    }
    Some(Point3::from(weighted / total))
}

/// Perimeter of a closed vertex loop.
pub fn perimeter(vertices: &[Point3<f64>]) -> f64 {
    let n = vertices.len();
    (0..n)
        .map(|i| distance(&vertices[i], &vertices[(i + 1) % n]))
        .sum()
}

/// Distance from `point` to the infinite line through `a` and `b`.
pub fn point_line_distance(point: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let dir = b - a;
    let len = dir.norm();
    if len < 1e-12 {
        return distance(point, a);
    }
    dir.cross(&(point - a)).norm() / len
}

/// Parameter of the projection of `point` on the segment `a → b`
/// (0 at `a`, 1 at `b`).
pub fn segment_parameter(point: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let dir = b - a;
    let len_sq = dir.norm_squared();
    if len_sq < 1e-24 {
        return 0.0;
    }
    (point - a).dot(&dir) / len_sq
}

/// Overlapping part of two collinear segments.
///
/// Returns the sub-segment of `a0 → a1` that is covered by `b0 → b1` when
/// both endpoints of `b` lie on the line of `a` and the overlap is longer than
/// the tolerance. Segments that only touch at a vertex do not overlap.
pub fn segment_overlap(
    a0: &Point3<f64>,
    a1: &Point3<f64>,
    b0: &Point3<f64>,
    b1: &Point3<f64>,
    tol: &GeometryTolerance,
) -> Option<(Point3<f64>, Point3<f64>)> {
    let length = distance(a0, a1);
    if length <= tol.distance {
        return None;
    }
    if point_line_distance(b0, a0, a1) > tol.distance
        || point_line_distance(b1, a0, a1) > tol.distance
    {
        return None;
    }

    let t0 = segment_parameter(b0, a0, a1);
    let t1 = segment_parameter(b1, a0, a1);
    let lo = t0.min(t1).max(0.0);
    let hi = t0.max(t1).min(1.0);

    if (hi - lo) * length <= tol.distance {
        return None;
    }

    let dir = a1 - a0;
    Some((a0 + dir * lo, a0 + dir * hi))
}

/// Removes consecutive duplicates and vertices lying on the line through
/// their neighbours.
pub fn remove_collinear(vertices: &[Point3<f64>], tol: &GeometryTolerance) -> Vec<Point3<f64>> {
    let mut result: Vec<Point3<f64>> = Vec::with_capacity(vertices.len());
    for p in vertices {
        if result.last().map_or(true, |last| !tol.points_equal(last, p)) {
            result.push(*p);
        }
    }
    while result.len() > 1 && tol.points_equal(&result[0], &result[result.len() - 1]) {
        result.pop();
    }

    let mut changed = true;
    while changed && result.len() >= 3 {
        changed = false;
        let n = result.len();
        for i in 0..n {
            let prev = &result[(i + n - 1) % n];
            let next = &result[(i + 1) % n];
            if point_line_distance(&result[i], prev, next) <= tol.distance
                && segment_parameter(&result[i], prev, next) > 0.0
                && segment_parameter(&result[i], prev, next) < 1.0
            {
                result.remove(i);
                changed = true;
                break;
            }
        }
    }

    result
}

/// True if `b` is a cyclic rotation of `a` within tolerance.
pub fn circular_equal(a: &[Point3<f64>], b: &[Point3<f64>], tol: &GeometryTolerance) -> bool {
    if a.len() != b.len() || a.is_empty() {
        return false;
    }
    let n = a.len();
    (0..n).any(|offset| (0..n).all(|i| tol.points_equal(&a[i], &b[(i + offset) % n])))
}

/// Reorders a loop so that it starts at its upper-left corner, as seen in the
/// face's own coordinate system. Winding is preserved.
pub fn reorder_ulc(vertices: &[Point3<f64>], tol: &GeometryTolerance) -> Vec<Point3<f64>> {
    let Ok(face) = align_face(vertices) else {
        return vertices.to_vec();
    };
    let Some(inverse) = face.try_inverse() else {
        return vertices.to_vec();
    };
    let local = transform_points(&inverse, vertices);

    let mut best = 0;
    for (i, p) in local.iter().enumerate().skip(1) {
        let b = &local[best];
        let higher = p.y > b.y + tol.distance;
        let same_height = (p.y - b.y).abs() <= tol.distance;
        if higher || (same_height && p.x < b.x - tol.distance) {
            best = i;
        }
    }

    let mut result = Vec::with_capacity(vertices.len());
    result.extend_from_slice(&vertices[best..]);
    result.extend_from_slice(&vertices[..best]);
    result
}

/// Plane in Hessian normal form: `normal · p + d = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub d: f64,
}

impl Plane {
    /// Plane through a planar vertex loop, oriented by its winding.
    pub fn from_points(vertices: &[Point3<f64>]) -> Option<Self> {
        let normal = outward_normal(vertices)?;
        let origin = vertex_centroid(vertices)?;
        Some(Self {
            normal,
            d: -normal.dot(&origin.coords),
        })
    }

    /// Signed distance from a point to the plane.
    #[inline]
    pub fn distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) + self.d
    }

    /// True if both planes coincide and face opposite directions.
    ///
    /// `extent` is the reach of the faces on the planes, see [`Plane::equal`].
    pub fn reverse_equal(&self, other: &Plane, extent: f64, tol: &GeometryTolerance) -> bool {
        self.coincides(&-other.normal, -other.d, extent, tol)
    }

    /// True if both planes coincide and face the same direction.
    ///
    /// The normals may differ by the angle that moves a point `extent` away
    /// from the plane origin by no more than the distance tolerance.
    pub fn equal(&self, other: &Plane, extent: f64, tol: &GeometryTolerance) -> bool {
        self.coincides(&other.normal, other.d, extent, tol)
    }

    fn coincides(&self, normal: &Vector3<f64>, d: f64, extent: f64, tol: &GeometryTolerance) -> bool {
        if self.normal.dot(normal) <= 0.0 {
            return false;
        }
        let sin = self.normal.cross(normal).norm();
        sin * extent.max(tol.distance) <= tol.distance && (self.d - d).abs() <= tol.distance
    }
}

/// How far the points of two vertex loops reach from the middle of their
/// common bounding box. Used as the extent when comparing their planes.
pub fn face_extent(a: &[Point3<f64>], b: &[Point3<f64>]) -> f64 {
    BoundingBox::from_points(a.iter().chain(b)).map_or(0.0, |bounds| 0.5 * bounds.size().norm())
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut min = *first;
        let mut max = *first;

        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(Self { min, max })
    }

    /// Bounding box of the eight transformed corners.
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Self {
        let corners = [
            Point3::new(self.min.x, self.min.y, self.min.z),
            Point3::new(self.max.x, self.min.y, self.min.z),
            Point3::new(self.min.x, self.max.y, self.min.z),
            Point3::new(self.max.x, self.max.y, self.min.z),
            Point3::new(self.min.x, self.min.y, self.max.z),
            Point3::new(self.max.x, self.min.y, self.max.z),
            Point3::new(self.min.x, self.max.y, self.max.z),
            Point3::new(self.max.x, self.max.y, self.max.z),
        ];
        let moved = transform_points(matrix, &corners);
        // Eight corners always yield a box.
        Self::from_points(&moved).unwrap_or(*self)
    }

    /// True if the boxes overlap or touch within tolerance.
    pub fn intersects(&self, other: &BoundingBox, tol: &GeometryTolerance) -> bool {
        let t = tol.distance;
        self.min.x <= other.max.x + t
            && self.max.x >= other.min.x - t
            && self.min.y <= other.max.y + t
            && self.max.y >= other.min.y - t
            && self.min.z <= other.max.z + t
            && self.max.z >= other.min.z - t
    }

    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn volume(&self) -> f64 {
        let s = self.size();
        s.x * s.y * s.z
    }
}
