// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface matching between spaces.
//!
//! Two surfaces match when they face each other and one's vertex loop is the
//! other's reversed, up to a cyclic shift. Matched surfaces become interior
//! boundaries pointing at each other.

use bemgeo_geometry::primitives::{circular_equal, face_extent, Plane};
use bemgeo_geometry::transform::{invert, transform_points};
use bemgeo_geometry::GeometryTolerance;
use tracing::{debug, info};

use crate::error::Result;
use crate::space::{pair_mut, AdjacentSurface, Space};

/// Matches the unmatched surfaces of `space` with those of `other`.
/// Returns the number of new matches.
pub fn match_surfaces(space: &mut Space, other: &mut Space, tol: &GeometryTolerance) -> Result<usize> {
    // Other space coordinates into this space's coordinates
    let transformation = invert(&space.transformation)? * other.transformation;
    let mut matches = 0;

    for i in 0..space.surfaces.len() {
        if space.surfaces[i].is_matched() {
            continue;
        }
        let vertices = &space.surfaces[i].vertices;
        let Some(plane) = Plane::from_points(vertices) else {
            continue;
        };

        let mut found = None;
        for (j, other_surface) in other.surfaces.iter().enumerate() {
            if other_surface.is_matched() {
                continue;
            }
            let mut other_vertices = transform_points(&transformation, &other_surface.vertices);
            let Some(other_plane) = Plane::from_points(&other_vertices) else {
                continue;
            };
            if !plane.reverse_equal(&other_plane, face_extent(vertices, &other_vertices), tol) {
                continue;
            }
            other_vertices.reverse();
            if circular_equal(vertices, &other_vertices, tol) {
                found = Some(j);
                break;
            }
        }

        if let Some(j) = found {
            let name = space.surfaces[i].name.clone();
            let other_name = other.surfaces[j].name.clone();
            debug!(space = %space.name, surface = %name, other = %other.name, other_surface = %other_name, "Matched surfaces");

            space.surfaces[i].set_adjacent_surface(AdjacentSurface {
                space: other.name.clone(),
                surface: other_name,
            });
            other.surfaces[j].set_adjacent_surface(AdjacentSurface {
                space: space.name.clone(),
                surface: name,
            });
            matches += 1;
        }
    }

    Ok(matches)
}

/// Matches surfaces between every pair of spaces whose bounding boxes touch.
/// Returns the number of new matches.
pub fn match_all(spaces: &mut [Space], tol: &GeometryTolerance) -> Result<usize> {
    let bounds: Vec<_> = spaces.iter().map(|s| s.building_bounding_box()).collect();
    let mut matches = 0;

    for i in 0..spaces.len() {
        for j in (i + 1)..spaces.len() {
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
            matches += match_surfaces(space, other, tol)?;
        }
    }

    info!(spaces = spaces.len(), matches, "Matched surfaces");
    Ok(matches)
}

/// Clears every match, restoring default boundary conditions.
pub fn unmatch_all(spaces: &mut [Space]) {
    for surface in spaces.iter_mut().flat_map(|s| s.surfaces.iter_mut()) {
        surface.reset_adjacent_surface();
    }
}
