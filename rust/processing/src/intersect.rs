// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface intersection between spaces.
//!
//! Two coplanar, opposite-facing surfaces of different spaces are cut so that
//! their overlap becomes one surface in each space. Whatever is left of
//! either surface becomes new surfaces of its space, ready to intersect with
//! further surfaces or to be matched later.

use bemgeo_geometry::primitives::{face_extent, polygon_area, reorder_ulc, Plane};
use bemgeo_geometry::transform::{align_face, invert, transform_points};
use bemgeo_geometry::{intersect, GeometryTolerance};
use nalgebra::{Matrix4, Point3};
use rustc_hash::FxHashSet;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::space::{pair_mut, PlanarSurface, Space};

/// Surfaces touched by one intersection, as indices into their spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceIntersection {
    pub surface: usize,
    pub other_surface: usize,
    /// Surfaces appended to the first space.
    pub new_surfaces: Vec<usize>,
    /// Surfaces appended to the other space.
    pub new_other_surfaces: Vec<usize>,
}

impl SurfaceIntersection {
    /// True if the two surfaces already coincided.
    pub fn is_exact(&self) -> bool {
        self.new_surfaces.is_empty() && self.new_other_surfaces.is_empty()
    }
}

/// Intersects surface `index` of `space` with surface `other_index` of
/// `other`.
///
/// On success both surfaces are replaced by their common part and the
/// leftovers are appended to their spaces. Returns `Ok(None)` and leaves both
/// spaces untouched when the surfaces are not coplanar and opposite, do not
/// overlap, or either has sub surfaces or a match.
pub fn compute_intersection(
    space: &mut Space,
    index: usize,
    other: &mut Space,
    other_index: usize,
    tol: &GeometryTolerance,
) -> Result<Option<SurfaceIntersection>> {
    let surface = space.surface(index)?;
    let other_surface = other.surface(other_index)?;

    if surface.has_sub_surfaces || other_surface.has_sub_surfaces {
        error!(
            surface = %surface.name,
            other_surface = %other_surface.name,
            "Sub surfaces are not allowed in intersection"
        );
        return Ok(None);
    }
    if surface.is_matched() || other_surface.is_matched() {
        error!(
            surface = %surface.name,
            other_surface = %other_surface.name,
            "Adjacent surfaces are not allowed in intersection"
        );
        return Ok(None);
    }

    // Work in building coordinates
    let building = transform_points(&space.transformation, &surface.vertices);
    let other_building = transform_points(&other.transformation, &other_surface.vertices);
    if building.len() < 3 || other_building.len() < 3 {
        error!(
            surface = %surface.name,
            other_surface = %other_surface.name,
            "Fewer than 3 vertices, intersection fails"
        );
        return Ok(None);
    }

    let (Some(plane), Some(other_plane)) = (Plane::from_points(&building), Plane::from_points(&other_building)) else {
        return Ok(None);
    };
    if !plane.reverse_equal(&other_plane, face_extent(&building, &other_building), tol) {
        return Ok(None);
    }

    let Ok(face) = align_face(&building) else {
        error!(surface = %surface.name, "Cannot compute face transform, intersection fails");
        return Ok(None);
    };
    let to_face = invert(&face)?;

    // Both loops counter-clockwise in the first surface's face frame
    let face_vertices = transform_points(&to_face, &building);
    let mut other_face_vertices = transform_points(&to_face, &other_building);
    other_face_vertices.reverse();

    let Some(result) = intersect(&face_vertices, &other_face_vertices, tol) else {
        return Ok(None);
    };

    check_area(&surface.name, &face_vertices, result.area1(), tol);
    check_area(&other_surface.name, &other_face_vertices, result.area2(), tol);

    let to_space = invert(&space.transformation)? * face;
    let to_other_space = invert(&other.transformation)? * face;

    let place = |matrix: &Matrix4<f64>, ring: &[Point3<f64>], reverse: bool| {
        let mut vertices = transform_points(matrix, ring);
        if reverse {
            vertices.reverse();
        }
        reorder_ulc(&vertices, tol)
    };

    let surface_name = surface.name.clone();
    let other_name = other_surface.name.clone();
    let new_polygons1 = result.new_polygons1();
    let new_polygons2 = result.new_polygons2();

    space.surfaces[index].vertices = place(&to_space, &result.intersection, false);
    other.surfaces[other_index].vertices = place(&to_other_space, &result.intersection, true);

    let new_surfaces = append_pieces(space, index, &new_polygons1, |ring| place(&to_space, ring, false));
    let new_other_surfaces =
        append_pieces(other, other_index, &new_polygons2, |ring| place(&to_other_space, ring, true));

    let intersection = SurfaceIntersection {
        surface: index,
        other_surface: other_index,
        new_surfaces,
        new_other_surfaces,
    };
    info!(
        surface = %surface_name,
        other_surface = %other_name,
        new_surfaces = intersection.new_surfaces.len(),
        new_other_surfaces = intersection.new_other_surfaces.len(),
        "Intersected surfaces"
    );
    Ok(Some(intersection))
}

fn check_area(name: &str, ring: &[Point3<f64>], pieces_area: f64, tol: &GeometryTolerance) {
    if let Some(area) = polygon_area(ring) {
        if (area - pieces_area).abs() > tol.matching_area() {
            error!(
                surface = %name,
                initial_area = area,
                pieces_area,
                "Initial area of surface does not equal post intersection area"
            );
        }
    }
}

/// Appends one surface per ring, copying type and boundary condition from
/// the parent. Returns the new indices.
fn append_pieces(
    space: &mut Space,
    parent: usize,
    rings: &[Vec<Point3<f64>>],
    place: impl Fn(&[Point3<f64>]) -> Vec<Point3<f64>>,
) -> Vec<usize> {
    let template = space.surfaces[parent].clone();
    let mut indices = Vec::with_capacity(rings.len());
    for ring in rings {
        let name = unique_name(space, &template.name);
        space.surfaces.push(PlanarSurface {
            name,
            vertices: place(ring),
            adjacent_surface: None,
            has_sub_surfaces: false,
            ..template.clone()
        });
        indices.push(space.surfaces.len() - 1);
    }
    indices
}

fn unique_name(space: &Space, base: &str) -> String {
    (1..)
        .map(|n| format!("{} {}", base, n))
        .find(|candidate| space.surface_by_name(candidate).is_none())
        .unwrap_or_else(|| base.to_string())
}

/// Intersects every surface of `space` with every surface of `other` until
/// no new surfaces appear.
///
/// Larger surfaces go first. A pair is tried once: surfaces that did not
/// intersect will not after their vertices change, and surfaces that did
/// now coincide.
pub fn intersect_surfaces(space: &mut Space, other: &mut Space, tol: &GeometryTolerance) -> Result<()> {
    debug!(space = %space.name, other = %other.name, "Intersecting spaces");

    let by_area = |s: &Space| {
        let mut order: Vec<usize> = (0..s.surfaces.len()).collect();
        order.sort_by(|&a, &b| s.surfaces[b].gross_area().total_cmp(&s.surfaces[a].gross_area()));
        order
    };
    let mut surfaces = by_area(space);
    let mut other_surfaces = by_area(other);
    let mut completed: FxHashSet<(usize, usize)> = FxHashSet::default();

    loop {
        let mut new_surfaces = Vec::new();
        let mut new_other_surfaces = Vec::new();

        for &i in &surfaces {
            if is_ineligible(&space.surfaces[i]) {
                continue;
            }
            for &j in &other_surfaces {
                if is_ineligible(&other.surfaces[j]) || !completed.insert((i, j)) {
                    continue;
                }

                let Some(result) = compute_intersection(space, i, other, j, tol)? else {
                    continue;
                };

                // Pieces of this intersection never intersect each other again
                let ours: Vec<usize> = std::iter::once(i).chain(result.new_surfaces.iter().copied()).collect();
                let theirs: Vec<usize> =
                    std::iter::once(j).chain(result.new_other_surfaces.iter().copied()).collect();
                for &a in &ours {
                    for &b in &theirs {
                        completed.insert((a, b));
                    }
                }

                new_surfaces.extend(result.new_surfaces);
                new_other_surfaces.extend(result.new_other_surfaces);
            }
        }

        if new_surfaces.is_empty() && new_other_surfaces.is_empty() {
            return Ok(());
        }
        surfaces.extend(new_surfaces);
        other_surfaces.extend(new_other_surfaces);
    }
}

fn is_ineligible(surface: &PlanarSurface) -> bool {
    surface.has_sub_surfaces || surface.is_matched()
}

/// Intersects all pairs of spaces whose bounding boxes touch, smallest floor
/// area first.
pub fn intersect_all(spaces: &mut [Space], tol: &GeometryTolerance) -> Result<()> {
    let mut order: Vec<usize> = (0..spaces.len()).collect();
    order.sort_by(|&a, &b| spaces[a].floor_area().total_cmp(&spaces[b].floor_area()));

    let bounds: Vec<_> = spaces.iter().map(|s| s.building_bounding_box()).collect();

    for (n, &i) in order.iter().enumerate() {
        for &j in &order[n + 1..] {
            let touching = match (&bounds[i], &bounds[j]) {
                (Some(a), Some(b)) => a.intersects(b, tol),
                _ => false,
            };
            if !touching {
                continue;
            }
            let Some((space, other)) = pair_mut(spaces, i, j) else {
                continue;
            };
            intersect_surfaces(space, other, tol)?;
        }
    }
    Ok(())
}
