// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building footprint and exposed perimeter.
//!
//! The footprint is the union of every ground-contact floor of the building.
//! A space's exposed perimeter is the length of its ground floor edges that
//! run along the footprint boundary.

use bemgeo_geometry::{join_all, GeometryTolerance, Polygon};
use nalgebra::{Matrix4, Point3};
use tracing::{debug, info, warn};

use crate::space::{BoundaryCondition, PlanarSurface, Space, SurfaceType};

/// Building-coordinate vertices of a ground-contact floor at zero elevation
/// facing down, flattened onto z = 0.
fn ground_floor_vertices(
    surface: &PlanarSurface,
    transformation: &Matrix4<f64>,
    tol: &GeometryTolerance,
) -> Option<Vec<Point3<f64>>> {
    if surface.surface_type != SurfaceType::Floor
        || surface.boundary_condition != BoundaryCondition::Ground
        || surface.vertices.len() < 3
    {
        return None;
    }

    let vertices: Vec<Point3<f64>> = surface
        .vertices
        .iter()
        .map(|p| transformation.transform_point(p))
        .collect();
    if vertices.iter().any(|p| p.z.abs() > tol.distance) {
        return None;
    }
    let facing_down = bemgeo_geometry::primitives::outward_normal(&vertices)
        .is_some_and(|n| n.z < 0.0);
    if !facing_down {
        return None;
    }

    Some(vertices.into_iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect())
}

/// Union of all ground floors of all spaces, normally a single polygon.
pub fn generate_footprint(spaces: &[Space], tol: &GeometryTolerance) -> Vec<Polygon> {
    let mut rings = Vec::new();
    for space in spaces {
        for surface in &space.surfaces {
            if let Some(mut vertices) = ground_floor_vertices(surface, &space.transformation, tol) {
                // Seen from above a downward floor runs clockwise
                vertices.reverse();
                rings.push(vertices);
            }
        }
    }
    debug!(floors = rings.len(), "Collected ground floors for footprint");

    let footprint = join_all(&rings, tol);
    if footprint.len() > 1 {
        warn!(pieces = footprint.len(), "Footprint is not a single polygon");
    } else {
        info!(
            perimeter = footprint.iter().map(|p| p.perimeter()).sum::<f64>(),
            "Generated building footprint"
        );
    }
    footprint
}

/// Length of the edges of one ground floor that overlap the footprint
/// boundary. Surfaces that are not ground floors contribute nothing.
pub fn exposed_perimeter(
    surface: &PlanarSurface,
    transformation: &Matrix4<f64>,
    footprint: &[Polygon],
    tol: &GeometryTolerance,
) -> f64 {
    let Some(vertices) = ground_floor_vertices(surface, transformation, tol) else {
        return 0.0;
    };

    let n = vertices.len();
    (0..n)
        .map(|i| {
            let a = &vertices[i];
            let b = &vertices[(i + 1) % n];
            footprint.iter().map(|poly| poly.overlap(a, b, tol)).sum::<f64>()
        })
        .sum()
}

/// Sum of [`Space::exposed_perimeter`] over all spaces.
pub fn total_exposed_perimeter(spaces: &[Space], footprint: &[Polygon], tol: &GeometryTolerance) -> f64 {
    spaces
        .iter()
        .map(|s| s.exposed_perimeter(footprint, tol))
        .sum()
}

impl Space {
    /// Length of this space's ground floor edges on the footprint boundary.
    pub fn exposed_perimeter(&self, footprint: &[Polygon], tol: &GeometryTolerance) -> f64 {
        self.surfaces
            .iter()
            .map(|s| exposed_perimeter(s, &self.transformation, footprint, tol))
            .sum()
    }
}
