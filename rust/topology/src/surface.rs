// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar surfaces as ordered vertex loops.

use bemgeo_geometry::primitives::{centroid, outward_normal, polygon_area, Plane};
use bemgeo_geometry::GeometryTolerance;
use nalgebra::{Point3, Vector3};

use crate::edge::{Surface3dEdge, SurfaceRef};
use crate::error::{Error, Result};

/// A planar surface of a polyhedron.
///
/// Vertices are ordered counter-clockwise seen from outside; the first vertex
/// is not repeated. Edge `i` runs from vertex `i` to vertex `(i + 1) % n`.
#[derive(Debug, Clone)]
pub struct Surface3d {
    vertices: Vec<Point3<f64>>,
    name: String,
    surf_num: usize,
    edges: Vec<Surface3dEdge>,
    tol: GeometryTolerance,
}

impl Surface3d {
    /// Creates a surface, failing for loops with fewer than three vertices.
    pub fn new(
        vertices: Vec<Point3<f64>>,
        name: impl Into<String>,
        surf_num: usize,
        tol: GeometryTolerance,
    ) -> Result<Self> {
        let name = name.into();
        if vertices.len() < 3 {
            return Err(Error::DegenerateSurface {
                name,
                count: vertices.len(),
            });
        }

        let owner = SurfaceRef::new(name.clone(), surf_num);
        let edges = build_edges(&vertices, &owner, tol);

        Ok(Self {
            vertices,
            name,
            surf_num,
            edges,
            tol,
        })
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn surf_num(&self) -> usize {
        self.surf_num
    }

    pub fn edges(&self) -> &[Surface3dEdge] {
        &self.edges
    }

    pub fn surface_ref(&self) -> SurfaceRef {
        SurfaceRef::new(self.name.clone(), self.surf_num)
    }

    pub fn tolerance(&self) -> &GeometryTolerance {
        &self.tol
    }

    /// True if no vertex turns the wrong way by more than the tolerance.
    ///
    /// The turn at each vertex is the signed distance of the next vertex from
    /// the line through the previous edge, measured in the surface plane.
    /// Planarity is not checked.
    pub fn is_convex(&self) -> bool {
        let Some(normal) = outward_normal(&self.vertices) else {
            return false;
        };
        let n = self.vertices.len();

        for i in 0..n {
            let prev = &self.vertices[(i + n - 1) % n];
            let curr = &self.vertices[i];
            let next = &self.vertices[(i + 1) % n];

            let incoming = curr - prev;
            let len = incoming.norm();
            if len < 1e-12 {
                continue;
            }
            let turn = incoming.cross(&(next - curr)).dot(&normal) / len;
            if turn < -self.tol.distance {
                return false;
            }
        }
        true
    }

    pub fn num_conflicted_edges(&self) -> usize {
        self.edges.iter().filter(|e| e.conflicted_orientation()).count()
    }

    pub fn ratio_of_conflicted_edges(&self) -> f64 {
        self.num_conflicted_edges() as f64 / self.edges.len() as f64
    }

    /// Inserts `point` after vertex `edge_index`, splitting that edge.
    ///
    /// Returns `Ok(false)` if the edge does not contain the point.
    pub fn split_edge_at(&mut self, edge_index: usize, point: Point3<f64>) -> Result<bool> {
        let edge = self.edges.get_mut(edge_index).ok_or_else(|| Error::EdgeOutOfRange {
            name: self.name.clone(),
            index: edge_index,
        })?;

        match edge.split_edge(point) {
            Some(second) => {
                self.vertices.insert(edge_index + 1, point);
                self.edges.insert(edge_index + 1, second);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The same surface with reversed winding.
    pub fn reversed(&self) -> Self {
        let vertices: Vec<Point3<f64>> = self.vertices.iter().rev().cloned().collect();
        let edges = build_edges(&vertices, &self.surface_ref(), self.tol);
        Self {
            vertices,
            name: self.name.clone(),
            surf_num: self.surf_num,
            edges,
            tol: self.tol,
        }
    }

    pub fn outward_normal(&self) -> Option<Vector3<f64>> {
        outward_normal(&self.vertices)
    }

    pub fn area(&self) -> f64 {
        polygon_area(&self.vertices).unwrap_or(0.0)
    }

    pub fn centroid(&self) -> Option<Point3<f64>> {
        centroid(&self.vertices)
    }

    pub fn plane(&self) -> Option<Plane> {
        Plane::from_points(&self.vertices)
    }

    pub(crate) fn edges_mut(&mut self) -> &mut [Surface3dEdge] {
        &mut self.edges
    }
}

fn build_edges(vertices: &[Point3<f64>], owner: &SurfaceRef, tol: GeometryTolerance) -> Vec<Surface3dEdge> {
    let n = vertices.len();
    (0..n)
        .map(|i| Surface3dEdge::new(vertices[i], vertices[(i + 1) % n], owner.clone(), tol))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn surface(points: &[[f64; 3]]) -> Surface3d {
        let vertices = points.iter().map(|p| Point3::new(p[0], p[1], p[2])).collect();
        Surface3d::new(vertices, "Surface", 0, GeometryTolerance::default()).unwrap()
    }

    #[test]
    fn rejects_degenerate_loops() {
        let result = Surface3d::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            "Line",
            3,
            GeometryTolerance::default(),
        );
        assert!(matches!(result, Err(Error::DegenerateSurface { count: 2, .. })));
    }

    #[test]
    fn edges_follow_vertices() {
        let s = surface(&[[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 3.0, 0.0]]);
        assert_eq!(s.edges().len(), 3);
        assert_eq!(s.edges()[2].start(), &Point3::new(4.0, 3.0, 0.0));
        assert_eq!(s.edges()[2].end(), &Point3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(s.area(), 6.0);
    }

    #[test]
    fn convexity() {
        let square = surface(&[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 2.0, 0.0], [0.0, 2.0, 0.0]]);
        assert!(square.is_convex());

        let l_shape = surface(&[
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [1.0, 2.0, 0.0],
            [0.0, 2.0, 0.0],
        ]);
        assert!(!l_shape.is_convex());

        // A tiny dent within tolerance still counts as convex
        let dented = surface(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.004, 0.0],
            [3.0, 0.0, 0.0],
            [3.0, 3.0, 0.0],
            [0.0, 3.0, 0.0],
        ]);
        assert!(dented.is_convex());
    }

    #[test]
    fn split_edge_inserts_vertex() {
        let mut s = surface(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 5.0, 0.0], [0.0, 5.0, 0.0]]);
        assert!(s.split_edge_at(0, Point3::new(4.0, 0.0, 0.0)).unwrap());
        assert_eq!(s.vertices().len(), 5);
        assert_eq!(s.vertices()[1], Point3::new(4.0, 0.0, 0.0));
        assert_eq!(s.edges().len(), 5);
        assert!(s.edges()[1].created());
        assert_eq!(s.edges()[1].end(), &Point3::new(10.0, 0.0, 0.0));

        assert!(!s.split_edge_at(2, Point3::new(4.0, 0.0, 0.0)).unwrap());
        assert!(s.split_edge_at(9, Point3::new(4.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn reversal_flips_normal() {
        let s = surface(&[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 2.0, 0.0], [0.0, 2.0, 0.0]]);
        let r = s.reversed();
        assert_relative_eq!(s.outward_normal().unwrap().z, 1.0);
        assert_relative_eq!(r.outward_normal().unwrap().z, -1.0);
        assert_eq!(r.surface_ref(), s.surface_ref());
        let mut back = r.vertices().to_vec();
        back.reverse();
        assert_eq!(back, s.vertices());
        assert!(r.edges()[0].reverse_equal(&s.edges()[2]));
    }
}
