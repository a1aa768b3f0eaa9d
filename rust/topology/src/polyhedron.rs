// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed-shell analysis of a set of surfaces.
//!
//! A [`Polyhedron`] is built once from a space's surfaces and answers every
//! question afterwards from cached state:
//!
//! 1. all surface edges are matched into a pool of unique undirected edges;
//!    opposite-direction matches are consistent, same-direction matches are
//!    orientation conflicts
//! 2. edges used by a single surface trigger colinear repair, which splits
//!    them at vertices of other surfaces lying on them, then matching reruns
//! 3. the shell is enclosed iff every unique edge is used exactly twice
//! 4. volume comes from the divergence theorem, signed by surface winding
//!
//! Construction never fails. Geometry that cannot be repaired is reported by
//! [`Polyhedron::is_enclosed_volume`] and [`Polyhedron::repair_exhausted`].

use bemgeo_geometry::primitives::{distance, vertex_centroid, BoundingBox};
use bemgeo_geometry::GeometryTolerance;
use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::edge::{Surface3dEdge, SurfaceRef};
use crate::error::{Error, Result};
use crate::surface::Surface3d;

/// Colinear repair passes attempted before giving up.
pub const DEFAULT_MAX_REPAIR_PASSES: usize = 8;

/// Immutable analysis of a set of surfaces.
#[derive(Debug, Clone)]
pub struct Polyhedron {
    surfaces: Vec<Surface3d>,
    unique_edges: Vec<Surface3dEdge>,
    tol: GeometryTolerance,
    enclosed: bool,
    has_conflicts: bool,
    repair_passes: usize,
    repaired: bool,
    repair_exhausted: bool,
    divergence_volume: f64,
}

impl Polyhedron {
    /// Analyses the surfaces with the default repair cap.
    pub fn new(surfaces: Vec<Surface3d>, tol: GeometryTolerance) -> Self {
        Self::with_repair_limit(surfaces, tol, DEFAULT_MAX_REPAIR_PASSES)
    }

    /// Analyses the surfaces, running at most `max_passes` colinear repair
    /// passes.
    pub fn with_repair_limit(
        mut surfaces: Vec<Surface3d>,
        tol: GeometryTolerance,
        max_passes: usize,
    ) -> Self {
        let mut unique_edges = match_edges(&mut surfaces);
        let mut repair_passes = 0;
        let mut repaired = false;
        let mut repair_exhausted = false;

        while unique_edges.iter().any(|e| e.count() == 1) {
            if repair_passes >= max_passes {
                repair_exhausted = true;
                warn!(
                    passes = repair_passes,
                    unresolved = unique_edges.iter().filter(|e| e.count() == 1).count(),
                    "Colinear repair did not converge"
                );
                break;
            }
            repair_passes += 1;

            let splits = repair_colinear(&mut surfaces);
            debug!(pass = repair_passes, splits, "Colinear repair pass");
            if splits == 0 {
                break;
            }
            repaired = true;
            unique_edges = match_edges(&mut surfaces);
        }

        let enclosed = unique_edges.iter().all(|e| e.count() == 2);
        let has_conflicts = unique_edges.iter().any(|e| e.conflicted_orientation());
        let divergence_volume = divergence_volume(&surfaces);

        let polyhedron = Self {
            surfaces,
            unique_edges,
            tol,
            enclosed,
            has_conflicts,
            repair_passes,
            repaired,
            repair_exhausted,
            divergence_volume,
        };
        polyhedron.check_box_volume();
        polyhedron
    }

    /// Builds surfaces from named vertex loops, numbering them in order.
    pub fn from_loops<S: Into<String>>(
        loops: impl IntoIterator<Item = (S, Vec<Point3<f64>>)>,
        tol: GeometryTolerance,
    ) -> Result<Self> {
        let surfaces = loops
            .into_iter()
            .enumerate()
            .map(|(i, (name, vertices))| Surface3d::new(vertices, name, i, tol))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(surfaces, tol))
    }

    /// Surfaces after colinear repair.
    pub fn surfaces(&self) -> &[Surface3d] {
        &self.surfaces
    }

    pub fn unique_edges(&self) -> &[Surface3dEdge] {
        &self.unique_edges
    }

    pub fn tolerance(&self) -> &GeometryTolerance {
        &self.tol
    }

    pub fn num_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    /// True iff every unique undirected edge is used by exactly two surfaces.
    pub fn is_enclosed_volume(&self) -> bool {
        self.enclosed
    }

    /// Edges not used exactly twice. Edges created by colinear repair are
    /// skipped unless `include_created_edges` is set.
    pub fn edges_not_two(&self, include_created_edges: bool) -> Vec<&Surface3dEdge> {
        self.unique_edges
            .iter()
            .filter(|e| e.count() != 2 && (include_created_edges || !e.created()))
            .collect()
    }

    /// True if any vertex loop was changed by colinear repair.
    pub fn had_colinear_repair(&self) -> bool {
        self.repaired
    }

    pub fn repair_passes(&self) -> usize {
        self.repair_passes
    }

    /// True if the repair cap was hit while edges were still unresolved.
    pub fn repair_exhausted(&self) -> bool {
        self.repair_exhausted
    }

    /// True if any edge pair was matched in the same direction.
    pub fn has_any_surface_with_incorrect_orientation(&self) -> bool {
        self.has_conflicts
    }

    /// Enclosed, internally consistent, but every normal points inwards.
    pub fn is_completely_inside_out(&self) -> bool {
        self.enclosed && !self.has_conflicts && self.divergence_volume < 0.0
    }

    /// Signed volume from the divergence theorem, positive when surfaces
    /// face outwards. Meaningful only for enclosed polyhedra.
    pub fn calc_divergence_theorem_volume(&self) -> f64 {
        self.divergence_volume
    }

    /// Signed volume if enclosed.
    pub fn polyhedron_volume(&self) -> Option<f64> {
        self.enclosed.then_some(self.divergence_volume)
    }

    /// Volume of the bounding box if every surface lies on one of its faces,
    /// i.e. the polyhedron is an axis-aligned box.
    pub fn box_volume(&self) -> Option<f64> {
        let bbox = self.bounding_box()?;
        let t = self.tol.distance;

        let on_face = |s: &Surface3d| {
            let v = s.vertices();
            let flat = |get: fn(&Point3<f64>) -> f64, target: f64| {
                v.iter().all(|p| (get(p) - target).abs() <= t)
            };
            flat(|p| p.x, bbox.min.x)
                || flat(|p| p.x, bbox.max.x)
                || flat(|p| p.y, bbox.min.y)
                || flat(|p| p.y, bbox.max.y)
                || flat(|p| p.z, bbox.min.z)
                || flat(|p| p.z, bbox.max.z)
        };

        self.surfaces.iter().all(on_face).then(|| bbox.volume())
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.surfaces.iter().flat_map(|s| s.vertices()))
    }

    /// Surfaces to flip so that all normals point outwards.
    ///
    /// For each edge matched in the same direction, the surface with the
    /// higher share of conflicted edges is picked; ties go to the surface
    /// with more conflicted edges, then to the later surface. A completely
    /// inside-out polyhedron returns every surface. Sorted by `surf_num`.
    ///
    /// Cyclic conflicts, where flipping either side of every pair leaves
    /// another pair conflicted, are not resolved in one call.
    pub fn find_surfaces_with_incorrect_orientation(&self) -> Vec<&Surface3d> {
        if self.is_completely_inside_out() {
            return self.surfaces.iter().collect();
        }

        let mut picked: FxHashSet<usize> = FxHashSet::default();
        for edge in self.unique_edges.iter().filter(|e| e.conflicted_orientation()) {
            let owners = edge.surfaces();
            for i in 0..owners.len() {
                for j in (i + 1)..owners.len() {
                    let (Some(a), Some(b)) = (self.index_of(&owners[i]), self.index_of(&owners[j])) else {
                        continue;
                    };
                    picked.insert(self.pick_worse(a, b));
                }
            }
        }

        let mut result: Vec<&Surface3d> = picked.into_iter().map(|i| &self.surfaces[i]).collect();
        result.sort_by_key(|s| s.surf_num());
        result
    }

    /// Summary of the analysis for diagnostics.
    pub fn report(&self) -> PolyhedronReport {
        PolyhedronReport {
            num_surfaces: self.surfaces.len(),
            num_unique_edges: self.unique_edges.len(),
            is_enclosed: self.enclosed,
            num_edges_not_two: self.edges_not_two(true).len(),
            num_created_edges: self.unique_edges.iter().filter(|e| e.created()).count(),
            had_colinear_repair: self.repaired,
            repair_passes: self.repair_passes,
            repair_exhausted: self.repair_exhausted,
            has_incorrect_orientation: self.has_conflicts,
            is_completely_inside_out: self.is_completely_inside_out(),
            volume: self.polyhedron_volume(),
            surfaces_to_flip: self
                .find_surfaces_with_incorrect_orientation()
                .into_iter()
                .map(|s| s.surface_ref())
                .collect(),
        }
    }

    fn index_of(&self, surface: &SurfaceRef) -> Option<usize> {
        self.surfaces
            .iter()
            .position(|s| s.surf_num() == surface.surf_num && s.name() == surface.name)
    }

    fn pick_worse(&self, a: usize, b: usize) -> usize {
        let (sa, sb) = (&self.surfaces[a], &self.surfaces[b]);
        let (ra, rb) = (sa.ratio_of_conflicted_edges(), sb.ratio_of_conflicted_edges());
        if ra > rb {
            return a;
        }
        if rb > ra {
            return b;
        }
        match sa.num_conflicted_edges().cmp(&sb.num_conflicted_edges()) {
            std::cmp::Ordering::Greater => a,
            std::cmp::Ordering::Less => b,
            std::cmp::Ordering::Equal => a.max(b),
        }
    }

    /// Logs an error when an axis-aligned box disagrees with the divergence
    /// volume by more than the tolerance swept over the surface area.
    fn check_box_volume(&self) {
        if !self.enclosed {
            return;
        }
        let Some(box_volume) = self.box_volume() else {
            return;
        };
        let surface_area: f64 = self.surfaces.iter().map(|s| s.area()).sum();
        let difference = (box_volume - self.divergence_volume.abs()).abs();
        if difference > self.tol.distance * surface_area {
            error!(
                box_volume,
                divergence_volume = self.divergence_volume,
                "Polyhedron volume does not match its bounding box"
            );
        }
    }
}

/// Serializable summary of a [`Polyhedron`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyhedronReport {
    pub num_surfaces: usize,
    pub num_unique_edges: usize,
    pub is_enclosed: bool,
    pub num_edges_not_two: usize,
    pub num_created_edges: usize,
    pub had_colinear_repair: bool,
    pub repair_passes: usize,
    pub repair_exhausted: bool,
    pub has_incorrect_orientation: bool,
    pub is_completely_inside_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    pub surfaces_to_flip: Vec<SurfaceRef>,
}

impl PolyhedronReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Match every surface edge into a pool of unique undirected edges and copy
/// each pool edge's conflict flag back onto the surface edges it absorbed.
fn match_edges(surfaces: &mut [Surface3d]) -> Vec<Surface3dEdge> {
    let mut pool: Vec<Surface3dEdge> = Vec::new();
    let mut membership: Vec<Vec<usize>> = Vec::with_capacity(surfaces.len());

    for surface in surfaces.iter() {
        let mut indices = Vec::with_capacity(surface.edges().len());
        for edge in surface.edges() {
            let owner = edge.first_surface().clone();
            let index = if let Some(i) = pool.iter().position(|p| p.reverse_equal(edge)) {
                pool[i].append_surface(owner);
                i
            } else if let Some(i) = pool.iter().position(|p| p.is_equal(edge)) {
                pool[i].append_surface(owner);
                pool[i].mark_conflicted_orientation();
                i
            } else {
                pool.push(edge.detached());
                pool.len() - 1
            };
            indices.push(index);
        }
        membership.push(indices);
    }

    for (surface, indices) in surfaces.iter_mut().zip(&membership) {
        for (edge, &i) in surface.edges_mut().iter_mut().zip(indices) {
            edge.set_conflicted_orientation(pool[i].conflicted_orientation());
        }
    }

    pool
}

/// One colinear repair pass. Each surface edge without a partner is split at
/// the nearest vertex of another surface lying on it; the shortened edge is
/// checked again. Returns the number of splits.
fn repair_colinear(surfaces: &mut [Surface3d]) -> usize {
    let mut splits = 0;

    for si in 0..surfaces.len() {
        let mut ei = 0;
        while ei < surfaces[si].edges().len() {
            let edge = &surfaces[si].edges()[ei];
            if has_partner(surfaces, si, edge) {
                ei += 1;
                continue;
            }

            let start = *edge.start();
            let nearest = surfaces
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != si)
                .flat_map(|(_, s)| s.vertices().iter())
                .filter(|p| edge.contains_point(p))
                .min_by(|a, b| distance(a, &start).total_cmp(&distance(b, &start)))
                .copied();

            match nearest {
                Some(point) if matches!(surfaces[si].split_edge_at(ei, point), Ok(true)) => {
                    splits += 1;
                }
                _ => ei += 1,
            }
        }
    }

    splits
}

fn has_partner(surfaces: &[Surface3d], si: usize, edge: &Surface3dEdge) -> bool {
    surfaces.iter().enumerate().any(|(other, s)| {
        other != si && s.edges().iter().any(|e| e.is_undirected_equal(edge))
    })
}

/// Sum of `(1/3)·(A·n̂)·x̄` over the vertex-centroid fan of every surface.
fn divergence_volume(surfaces: &[Surface3d]) -> f64 {
    let mut volume = 0.0;
    for surface in surfaces {
        let vertices = surface.vertices();
        let Some(center) = vertex_centroid(vertices) else {
            continue;
        };
        let n = vertices.len();
        for i in 0..n {
            let a = &vertices[i];
            let b = &vertices[(i + 1) % n];
            let area_vector: Vector3<f64> = (a - center).cross(&(b - center)) * 0.5;
            let tri_centroid = (center.coords + a.coords + b.coords) / 3.0;
            volume += area_vector.dot(&tri_centroid) / 3.0;
        }
    }
    volume
}
