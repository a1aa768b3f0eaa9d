// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spaces and their planar surfaces.
//!
//! A [`Space`] is the unit the rest of the pipeline works on: a named set of
//! planar surfaces in space coordinates plus the rigid transformation that
//! places the space in the building. Every closed-shell question is answered
//! by building a fresh [`Polyhedron`] from the current vertex loops.

use bemgeo_geometry::bool2d::ensure_ccw;
use bemgeo_geometry::primitives::{
    centroid, outward_normal, polygon_area, remove_collinear, reorder_ulc, BoundingBox, Plane,
};
use bemgeo_geometry::{join_all, GeometryTolerance};
use bemgeo_topology::{Polyhedron, PolyhedronReport, Surface3d};
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::SpaceGeometryConfig;
use crate::error::{Error, Result};

/// Role of a surface in its space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceType {
    Floor,
    Wall,
    RoofCeiling,
}

impl SurfaceType {
    /// Default classification by tilt, the angle between the outward normal
    /// and world up: below 60° is a roof or ceiling, below 179° a wall,
    /// anything steeper a floor.
    pub fn from_outward_normal(normal: &Vector3<f64>) -> Self {
        let Some(unit) = normal.try_normalize(1e-12) else {
            return SurfaceType::Wall;
        };
        let tilt = unit.z.clamp(-1.0, 1.0).acos().to_degrees();
        if tilt < 60.0 {
            SurfaceType::RoofCeiling
        } else if tilt < 179.0 {
            SurfaceType::Wall
        } else {
            SurfaceType::Floor
        }
    }
}

/// What lies on the outside of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryCondition {
    Outdoors,
    Ground,
    /// Another space's surface, see [`PlanarSurface::adjacent_surface`].
    Surface,
}

impl BoundaryCondition {
    /// Floors sit on the ground, everything else faces outdoors.
    pub fn default_for(surface_type: SurfaceType) -> Self {
        match surface_type {
            SurfaceType::Floor => BoundaryCondition::Ground,
            _ => BoundaryCondition::Outdoors,
        }
    }
}

/// The surface on the other side of a matched interior surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdjacentSurface {
    pub space: String,
    pub surface: String,
}

/// A planar surface in space coordinates.
///
/// Vertices are counter-clockwise seen from outside the space.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarSurface {
    pub name: String,
    pub surface_type: SurfaceType,
    pub boundary_condition: BoundaryCondition,
    pub vertices: Vec<Point3<f64>>,
    pub adjacent_surface: Option<AdjacentSurface>,
    /// Surfaces carrying windows or doors are never split or re-matched.
    pub has_sub_surfaces: bool,
}

impl PlanarSurface {
    /// Creates a surface whose type and boundary condition are defaulted from
    /// its outward normal.
    pub fn new(name: impl Into<String>, vertices: Vec<Point3<f64>>) -> Self {
        let surface_type = outward_normal(&vertices)
            .map(|n| SurfaceType::from_outward_normal(&n))
            .unwrap_or(SurfaceType::Wall);
        Self::with_type(name, surface_type, vertices)
    }

    pub fn with_type(
        name: impl Into<String>,
        surface_type: SurfaceType,
        vertices: Vec<Point3<f64>>,
    ) -> Self {
        Self {
            name: name.into(),
            surface_type,
            boundary_condition: BoundaryCondition::default_for(surface_type),
            vertices,
            adjacent_surface: None,
            has_sub_surfaces: false,
        }
    }

    pub fn with_boundary_condition(mut self, boundary_condition: BoundaryCondition) -> Self {
        self.boundary_condition = boundary_condition;
        self
    }

    pub fn outward_normal(&self) -> Option<Vector3<f64>> {
        outward_normal(&self.vertices)
    }

    /// Area of the vertex loop, sub surfaces included.
    pub fn gross_area(&self) -> f64 {
        polygon_area(&self.vertices).unwrap_or(0.0)
    }

    pub fn centroid(&self) -> Option<Point3<f64>> {
        centroid(&self.vertices)
    }

    pub fn plane(&self) -> Option<Plane> {
        Plane::from_points(&self.vertices)
    }

    pub fn is_matched(&self) -> bool {
        self.adjacent_surface.is_some()
    }

    /// Marks the surface as an interior boundary shared with `adjacent`.
    pub fn set_adjacent_surface(&mut self, adjacent: AdjacentSurface) {
        self.adjacent_surface = Some(adjacent);
        self.boundary_condition = BoundaryCondition::Surface;
    }

    /// Clears the match and restores the default boundary condition.
    pub fn reset_adjacent_surface(&mut self) {
        if self.adjacent_surface.take().is_some() {
            self.boundary_condition = BoundaryCondition::default_for(self.surface_type);
        }
    }

    /// Reverses the winding and restarts the loop at its upper-left corner.
    pub fn flip(&mut self, tol: &GeometryTolerance) {
        self.vertices.reverse();
        self.vertices = reorder_ulc(&self.vertices, tol);
    }

    /// Convexity of the vertex loop, see [`Surface3d::is_convex`].
    pub fn is_convex(&self, tol: &GeometryTolerance) -> Result<bool> {
        Ok(self.to_surface3d(0, tol)?.is_convex())
    }

    pub(crate) fn to_surface3d(&self, surf_num: usize, tol: &GeometryTolerance) -> Result<Surface3d> {
        Ok(Surface3d::new(self.vertices.clone(), self.name.clone(), surf_num, *tol)?)
    }
}

/// Outcome of [`Space::fix_surfaces_with_incorrect_orientation`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrientationFix {
    /// Names of flipped surfaces, in flip order. A surface may appear twice
    /// if a later round flipped it back.
    pub flipped: Vec<String>,
    /// Rounds that flipped at least one surface.
    pub passes: usize,
    /// True if no surface is left with an incorrect orientation.
    pub converged: bool,
}

impl OrientationFix {
    pub fn changed(&self) -> bool {
        !self.flipped.is_empty()
    }
}

/// Geometry diagnostics of one space, computed in one go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceDiagnostics {
    pub space: String,
    pub is_enclosed: bool,
    pub is_convex: bool,
    pub volume: f64,
    pub floor_area: f64,
    pub ceiling_height: f64,
    pub incorrectly_oriented_surfaces: Vec<String>,
    pub non_convex_surfaces: Vec<String>,
    pub polyhedron: PolyhedronReport,
}

impl SpaceDiagnostics {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// A building space.
#[derive(Debug, Clone, PartialEq)]
pub struct Space {
    pub name: String,
    /// Maps space coordinates to building coordinates.
    pub transformation: Matrix4<f64>,
    pub surfaces: Vec<PlanarSurface>,
}

impl Space {
    /// Creates a space placed at the building origin.
    pub fn new(name: impl Into<String>, surfaces: Vec<PlanarSurface>) -> Self {
        Self {
            name: name.into(),
            transformation: Matrix4::identity(),
            surfaces,
        }
    }

    pub fn with_transformation(mut self, transformation: Matrix4<f64>) -> Self {
        self.transformation = transformation;
        self
    }

    /// Extrudes a floor print into a closed space: one floor, one wall per
    /// floor print edge and a roof.
    ///
    /// The floor print must lie at one height within the distance tolerance
    /// and face down, i.e. run clockwise seen from above. It is flattened to
    /// the height of its first point.
    pub fn from_floor_print(
        name: impl Into<String>,
        floor_print: &[Point3<f64>],
        floor_height: f64,
        tol: &GeometryTolerance,
    ) -> Result<Self> {
        let name = name.into();
        if floor_height.is_nan() || floor_height <= 0.0 {
            return Err(Error::InvalidFloorPrint(format!(
                "floor height must be positive, got {}",
                floor_height
            )));
        }
        if floor_print.len() < 3 {
            return Err(Error::InvalidFloorPrint(format!(
                "{} points, at least 3 are required",
                floor_print.len()
            )));
        }

        let z = floor_print[0].z;
        if floor_print.iter().any(|p| (p.z - z).abs() > tol.distance) {
            return Err(Error::InvalidFloorPrint("inconsistent z height".into()));
        }
        let floor: Vec<Point3<f64>> = floor_print.iter().map(|p| Point3::new(p.x, p.y, z)).collect();
        match outward_normal(&floor) {
            Some(n) if n.z <= -1.0 + tol.distance => {}
            Some(_) => {
                return Err(Error::InvalidFloorPrint(
                    "outward normal must point down".into(),
                ))
            }
            None => return Err(Error::InvalidFloorPrint("no outward normal".into())),
        }

        let top = z + floor_height;
        let n = floor.len();
        let mut surfaces = Vec::with_capacity(n + 2);
        surfaces.push(PlanarSurface::with_type(
            format!("{} Floor", name),
            SurfaceType::Floor,
            floor.clone(),
        ));
        for i in 0..n {
            let a = &floor[i];
            let b = &floor[(i + 1) % n];
            surfaces.push(PlanarSurface::with_type(
                format!("{} Wall {}", name, i + 1),
                SurfaceType::Wall,
                vec![
                    Point3::new(a.x, a.y, top),
                    Point3::new(b.x, b.y, top),
                    Point3::new(b.x, b.y, z),
                    Point3::new(a.x, a.y, z),
                ],
            ));
        }
        surfaces.push(PlanarSurface::with_type(
            format!("{} RoofCeiling", name),
            SurfaceType::RoofCeiling,
            floor.iter().rev().map(|p| Point3::new(p.x, p.y, top)).collect(),
        ));

        Ok(Self::new(name, surfaces))
    }

    pub fn surface(&self, index: usize) -> Result<&PlanarSurface> {
        self.surfaces.get(index).ok_or_else(|| Error::SurfaceOutOfRange {
            space: self.name.clone(),
            index,
        })
    }

    pub fn surface_by_name(&self, name: &str) -> Option<&PlanarSurface> {
        self.surfaces.iter().find(|s| s.name == name)
    }

    /// Vertices of surface `index` in building coordinates.
    pub fn building_vertices(&self, index: usize) -> Result<Vec<Point3<f64>>> {
        let surface = self.surface(index)?;
        Ok(surface
            .vertices
            .iter()
            .map(|p| self.transformation.transform_point(p))
            .collect())
    }

    /// Closed-shell analysis of the current surfaces. Surface `i` of the
    /// polyhedron is surface `i` of the space.
    pub fn polyhedron(&self, config: &SpaceGeometryConfig) -> Result<Polyhedron> {
        let surfaces = self
            .surfaces
            .iter()
            .enumerate()
            .map(|(i, s)| s.to_surface3d(i, &config.tolerance))
            .collect::<Result<Vec<_>>>()?;
        Ok(Polyhedron::with_repair_limit(
            surfaces,
            config.tolerance,
            config.max_repair_passes,
        ))
    }

    pub fn is_enclosed_volume(&self, config: &SpaceGeometryConfig) -> Result<bool> {
        let poly = self.polyhedron(config)?;
        if !poly.is_enclosed_volume() {
            let edges = poly.edges_not_two(true);
            warn!(
                space = %self.name,
                edges = edges.len(),
                "Space is not enclosed, some edges are not used exactly twice"
            );
            for edge in edges {
                debug!(space = %self.name, %edge, "Edge not used exactly twice");
            }
        }
        Ok(poly.is_enclosed_volume())
    }

    /// Sum of the gross areas of all floors.
    pub fn floor_area(&self) -> f64 {
        self.surfaces
            .iter()
            .filter(|s| s.surface_type == SurfaceType::Floor)
            .map(|s| s.gross_area())
            .sum()
    }

    /// Mean roof vertex height minus mean floor vertex height, or zero if the
    /// space lacks either.
    pub fn ceiling_height(&self) -> f64 {
        let mean_z = |surface_type: SurfaceType| {
            let (sum, count) = self
                .surfaces
                .iter()
                .filter(|s| s.surface_type == surface_type)
                .flat_map(|s| s.vertices.iter())
                .fold((0.0, 0usize), |(sum, count), p| (sum + p.z, count + 1));
            (count > 0).then(|| sum / count as f64)
        };
        match (mean_z(SurfaceType::RoofCeiling), mean_z(SurfaceType::Floor)) {
            (Some(roof), Some(floor)) => roof - floor,
            _ => 0.0,
        }
    }

    /// Enclosed volume.
    ///
    /// Inside-out spaces report the magnitude of their volume. Spaces that
    /// are open or partly misoriented fall back to ceiling height times floor
    /// area.
    pub fn volume(&self, config: &SpaceGeometryConfig) -> Result<f64> {
        let poly = self.polyhedron(config)?;
        Ok(self.volume_of(&poly))
    }

    /// Surfaces whose outward normal points into the space.
    pub fn find_surfaces_with_incorrect_orientation(
        &self,
        config: &SpaceGeometryConfig,
    ) -> Result<Vec<&PlanarSurface>> {
        let poly = self.polyhedron(config)?;
        Ok(incorrect_orientation_indices(&poly)
            .into_iter()
            .map(|i| &self.surfaces[i])
            .collect())
    }

    pub fn are_all_surfaces_correctly_oriented(&self, config: &SpaceGeometryConfig) -> Result<bool> {
        let surfaces = self.find_surfaces_with_incorrect_orientation(config)?;
        for surface in &surfaces {
            error!(
                space = %self.name,
                surface = %surface.name,
                "Surface has an outward normal pointing in the wrong direction"
            );
        }
        Ok(surfaces.is_empty())
    }

    /// Flips misoriented surfaces and re-analyses, for at most
    /// `config.max_orientation_passes` rounds.
    pub fn fix_surfaces_with_incorrect_orientation(
        &mut self,
        config: &SpaceGeometryConfig,
    ) -> Result<OrientationFix> {
        let mut fix = OrientationFix::default();

        for _ in 0..config.max_orientation_passes {
            let indices = incorrect_orientation_indices(&self.polyhedron(config)?);
            if indices.is_empty() {
                fix.converged = true;
                return Ok(fix);
            }
            fix.passes += 1;
            for i in indices {
                let surface = &mut self.surfaces[i];
                error!(
                    space = %self.name,
                    surface = %surface.name,
                    "Surface has an outward normal pointing in the wrong direction, flipping it"
                );
                surface.flip(&config.tolerance);
                fix.flipped.push(surface.name.clone());
            }
        }

        fix.converged = incorrect_orientation_indices(&self.polyhedron(config)?).is_empty();
        if !fix.converged {
            warn!(
                space = %self.name,
                passes = fix.passes,
                "Orientation fixing did not converge"
            );
        }
        Ok(fix)
    }

    pub fn find_non_convex_surfaces(&self, tol: &GeometryTolerance) -> Result<Vec<&PlanarSurface>> {
        let mut result = Vec::new();
        for surface in &self.surfaces {
            if !surface.is_convex(tol)? {
                result.push(surface);
            }
        }
        Ok(result)
    }

    /// Outline of the union of all floors, counter-clockwise seen from above,
    /// starting at the upper-left corner with collinear points removed.
    ///
    /// Empty if there are no floors, the floors are not at one height, or
    /// they do not union into a single polygon.
    pub fn floor_print(&self, tol: &GeometryTolerance) -> Vec<Point3<f64>> {
        let mut floors: Vec<&PlanarSurface> = Vec::new();
        for surface in &self.surfaces {
            if surface.vertices.len() < 3 {
                warn!(space = %self.name, surface = %surface.name, "Skipping surface with fewer than 3 vertices");
                continue;
            }
            if surface.surface_type == SurfaceType::Floor {
                floors.push(surface);
            }
        }
        floors.sort_by(|a, b| a.name.cmp(&b.name));

        let Some(z) = floors.first().map(|f| f.vertices[0].z) else {
            error!(space = %self.name, "No floor surfaces found to compute floor print");
            return Vec::new();
        };
        if floors
            .iter()
            .flat_map(|f| f.vertices.iter())
            .any(|p| (p.z - z).abs() > tol.distance)
        {
            error!(space = %self.name, "All floor surfaces must lie on the same plane to compute floor print");
            return Vec::new();
        }

        let rings: Vec<Vec<Point3<f64>>> = floors
            .iter()
            .map(|f| ensure_ccw(&f.vertices.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect::<Vec<_>>()))
            .collect();

        let outline = if rings.len() == 1 {
            rings[0].clone()
        } else {
            let joined = join_all(&rings, tol);
            if joined.len() != 1 {
                warn!(space = %self.name, pieces = joined.len(), "Floors do not form a single floor print");
                return Vec::new();
            }
            joined[0].outer.clone()
        };

        let outline = remove_collinear(&reorder_ulc(&remove_collinear(&outline, tol), tol), tol);
        if outline.len() < 3 {
            return Vec::new();
        }
        outline.into_iter().map(|p| Point3::new(p.x, p.y, z)).collect()
    }

    /// True if the floor print is convex. Spaces without a floor print are
    /// not convex.
    pub fn is_convex(&self, tol: &GeometryTolerance) -> bool {
        let points = self.floor_print(tol);
        if points.is_empty() {
            warn!(space = %self.name, "Cannot compute a floor print");
            return false;
        }
        Surface3d::new(points, format!("{} floor print", self.name), 0, *tol)
            .map(|s| s.is_convex())
            .unwrap_or(false)
    }

    /// Bounding box in space coordinates.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.surfaces.iter().flat_map(|s| &s.vertices))
    }

    /// Bounding box in building coordinates.
    pub fn building_bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box().map(|b| b.transformed(&self.transformation))
    }

    /// Enclosure, convexity, orientation and volume from a single analysis.
    pub fn diagnostics(&self, config: &SpaceGeometryConfig) -> Result<SpaceDiagnostics> {
        let tol = &config.tolerance;
        let poly = self.polyhedron(config)?;

        let incorrectly_oriented_surfaces = incorrect_orientation_indices(&poly)
            .into_iter()
            .map(|i| self.surfaces[i].name.clone())
            .collect();
        let non_convex_surfaces = self
            .find_non_convex_surfaces(tol)?
            .into_iter()
            .map(|s| s.name.clone())
            .collect();

        Ok(SpaceDiagnostics {
            space: self.name.clone(),
            is_enclosed: poly.is_enclosed_volume(),
            is_convex: self.is_convex(tol),
            volume: self.volume_of(&poly),
            floor_area: self.floor_area(),
            ceiling_height: self.ceiling_height(),
            incorrectly_oriented_surfaces,
            non_convex_surfaces,
            polyhedron: poly.report(),
        })
    }

    fn volume_of(&self, poly: &Polyhedron) -> f64 {
        if poly.is_enclosed_volume() {
            if poly.is_completely_inside_out() {
                error!(
                    space = %self.name,
                    "All surfaces are inside-out, call fix_surfaces_with_incorrect_orientation"
                );
                return -poly.calc_divergence_theorem_volume();
            }
            if !poly.has_any_surface_with_incorrect_orientation() {
                return poly.calc_divergence_theorem_volume();
            }
            warn!(
                space = %self.name,
                "Some surfaces have incorrect orientation, falling back to ceiling height times floor area"
            );
        } else {
            warn!(
                space = %self.name,
                edges = poly.edges_not_two(true).len(),
                "Space is not enclosed, falling back to ceiling height times floor area"
            );
        }
        self.ceiling_height() * self.floor_area()
    }
}

fn incorrect_orientation_indices(poly: &Polyhedron) -> Vec<usize> {
    poly.find_surfaces_with_incorrect_orientation()
        .into_iter()
        .map(|s| s.surf_num())
        .collect()
}

/// Two distinct elements of a slice, mutably.
pub(crate) fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> Option<(&mut T, &mut T)> {
    if i == j || i.max(j) >= items.len() {
        return None;
    }
    if i < j {
        let (head, tail) = items.split_at_mut(j);
        Some((&mut head[i], &mut tail[0]))
    } else {
        let (head, tail) = items.split_at_mut(i);
        Some((&mut tail[0], &mut head[j]))
    }
}
