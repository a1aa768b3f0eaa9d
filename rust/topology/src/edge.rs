// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Directed surface edges and their owning surfaces.
//!
//! An edge is shared by every surface whose loop runs along it. In a closed,
//! consistently oriented polyhedron each edge has exactly two owners that
//! traverse it in opposite directions.

use std::fmt;

use bemgeo_geometry::primitives::{distance, point_line_distance, segment_parameter};
use bemgeo_geometry::GeometryTolerance;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Identifies a surface within one polyhedron.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceRef {
    pub name: String,
    pub surf_num: usize,
}

impl SurfaceRef {
    pub fn new(name: impl Into<String>, surf_num: usize) -> Self {
        Self {
            name: name.into(),
            surf_num,
        }
    }
}

impl fmt::Display for SurfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.surf_num)
    }
}

/// A directed edge with the surfaces that share it.
#[derive(Debug, Clone)]
pub struct Surface3dEdge {
    start: Point3<f64>,
    end: Point3<f64>,
    surfaces: SmallVec<[SurfaceRef; 2]>,
    conflicted_orientation: bool,
    created: bool,
    tol: GeometryTolerance,
}

impl Surface3dEdge {
    pub fn new(
        start: Point3<f64>,
        end: Point3<f64>,
        surface: SurfaceRef,
        tol: GeometryTolerance,
    ) -> Self {
        let mut surfaces = SmallVec::new();
        surfaces.push(surface);
        Self {
            start,
            end,
            surfaces,
            conflicted_orientation: false,
            created: false,
            tol,
        }
    }

    #[inline]
    pub fn start(&self) -> &Point3<f64> {
        &self.start
    }

    #[inline]
    pub fn end(&self) -> &Point3<f64> {
        &self.end
    }

    /// Surfaces sharing this edge, in the order they were matched.
    pub fn surfaces(&self) -> &[SurfaceRef] {
        &self.surfaces
    }

    /// The surface that first produced this edge.
    pub fn first_surface(&self) -> &SurfaceRef {
        &self.surfaces[0]
    }

    /// Number of surfaces sharing this edge.
    #[inline]
    pub fn count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn append_surface(&mut self, surface: SurfaceRef) {
        self.surfaces.push(surface);
    }

    pub fn conflicted_orientation(&self) -> bool {
        self.conflicted_orientation
    }

    pub fn mark_conflicted_orientation(&mut self) {
        self.conflicted_orientation = true;
    }

    /// True for edges produced by splitting during colinear repair.
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn length(&self) -> f64 {
        distance(&self.start, &self.end)
    }

    /// Same endpoints in the same order.
    pub fn is_equal(&self, other: &Surface3dEdge) -> bool {
        self.tol.points_equal(&self.start, &other.start) && self.tol.points_equal(&self.end, &other.end)
    }

    /// Same endpoints in opposite order.
    pub fn reverse_equal(&self, other: &Surface3dEdge) -> bool {
        self.tol.points_equal(&self.start, &other.end) && self.tol.points_equal(&self.end, &other.start)
    }

    /// Same endpoints in either order.
    pub fn is_undirected_equal(&self, other: &Surface3dEdge) -> bool {
        self.is_equal(other) || self.reverse_equal(other)
    }

    /// True if `point` lies on the edge strictly between its endpoints.
    ///
    /// Points within tolerance of an endpoint are not contained.
    pub fn contains_point(&self, point: &Point3<f64>) -> bool {
        if self.tol.points_equal(point, &self.start) || self.tol.points_equal(point, &self.end) {
            return false;
        }
        if point_line_distance(point, &self.start, &self.end) > self.tol.distance {
            return false;
        }
        let t = segment_parameter(point, &self.start, &self.end);
        t > 0.0 && t < 1.0
    }

    /// Split at `point`: this edge becomes `start → point` and the returned
    /// edge `point → old end` carries the same surfaces, flagged as created.
    ///
    /// Returns `None` and leaves the edge untouched if the point is not
    /// contained.
    pub fn split_edge(&mut self, point: Point3<f64>) -> Option<Surface3dEdge> {
        if !self.contains_point(&point) {
            return None;
        }
        let old_end = std::mem::replace(&mut self.end, point);
        Some(Self {
            start: point,
            end: old_end,
            surfaces: self.surfaces.clone(),
            conflicted_orientation: false,
            created: true,
            tol: self.tol,
        })
    }

    /// Copy with only the first owner and no conflict flag, the form an edge
    /// takes when it enters a fresh matching pool.
    pub(crate) fn detached(&self) -> Self {
        let mut surfaces = SmallVec::new();
        surfaces.push(self.surfaces[0].clone());
        Self {
            start: self.start,
            end: self.end,
            surfaces,
            conflicted_orientation: false,
            created: self.created,
            tol: self.tol,
        }
    }

    pub(crate) fn set_conflicted_orientation(&mut self, conflicted: bool) {
        self.conflicted_orientation = conflicted;
    }
}

impl fmt::Display for Surface3dEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Edge [{:.4}, {:.4}, {:.4}] -> [{:.4}, {:.4}, {:.4}], count={}, surfaces=[",
            self.start.x, self.start.y, self.start.z, self.end.x, self.end.y, self.end.z,
            self.count()
        )?;
        for (i, s) in self.surfaces.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, "]")?;
        if self.conflicted_orientation {
            write!(f, ", conflicted")?;
        }
        if self.created {
            write!(f, ", created")?;
        }
        Ok(())
    }
}
