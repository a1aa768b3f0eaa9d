// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use bemgeo_geometry::transform::placement;
use bemgeo_geometry::GeometryTolerance;
use bemgeo_processing::{
    intersect_all, match_all, unmatch_all, BoundaryCondition, Space, SpaceGeometryConfig,
    SurfaceType,
};
use nalgebra::{Point3, Vector3};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn block(name: &str, size: f64, origin: Vector3<f64>) -> Space {
    let floor = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(0.0, size, 0.0),
        Point3::new(size, size, 0.0),
        Point3::new(size, 0.0, 0.0),
    ];
    Space::from_floor_print(name, &floor, 3.0, &GeometryTolerance::default())
        .expect("valid floor print")
        .with_transformation(placement(0.0, &origin))
}

/// One 20 x 20 space on the ground with four 10 x 10 spaces on top of it.
fn one_below_four_above() -> Vec<Space> {
    vec![
        block("Ground", 20.0, Vector3::zeros()),
        block("Upper SW", 10.0, Vector3::new(0.0, 0.0, 3.0)),
        block("Upper SE", 10.0, Vector3::new(10.0, 0.0, 3.0)),
        block("Upper NW", 10.0, Vector3::new(0.0, 10.0, 3.0)),
        block("Upper NE", 10.0, Vector3::new(10.0, 10.0, 3.0)),
    ]
}

fn ceilings(space: &Space) -> Vec<usize> {
    (0..space.surfaces.len())
        .filter(|&i| space.surfaces[i].surface_type == SurfaceType::RoofCeiling)
        .collect()
}

#[test]
fn test_one_below_four_above_intersection() {
    init_logging();
    let mut spaces = one_below_four_above();
    let config = SpaceGeometryConfig::default();
    let tol = config.tolerance;

    intersect_all(&mut spaces, &tol).unwrap();

    // Floor, four walls and one ceiling piece per space above
    let ground = &spaces[0];
    assert_eq!(ground.surfaces.len(), 9);
    let pieces = ceilings(ground);
    assert_eq!(pieces.len(), 4);
    for &i in &pieces {
        assert_relative_eq!(ground.surfaces[i].gross_area(), 100.0, epsilon = 1e-6);
        let n = ground.surfaces[i].outward_normal().unwrap();
        assert_relative_eq!(n.z, 1.0, epsilon = 1e-9);
    }
    let total: f64 = pieces.iter().map(|&i| ground.surfaces[i].gross_area()).sum();
    assert_relative_eq!(total, 400.0, epsilon = 1e-6);

    // Splitting the ceiling leaves T-junctions on the wall tops
    assert!(ground.is_enclosed_volume(&config).unwrap());
    assert_relative_eq!(ground.volume(&config).unwrap(), 1200.0, epsilon = 1e-6);

    for upper in &spaces[1..] {
        assert_eq!(upper.surfaces.len(), 6, "{}", upper.name);
        assert!(upper.is_enclosed_volume(&config).unwrap());
        assert_relative_eq!(upper.volume(&config).unwrap(), 300.0, epsilon = 1e-6);
    }
}

#[test]
fn test_match_after_intersection() {
    init_logging();
    let mut spaces = one_below_four_above();
    let tol = GeometryTolerance::default();

    intersect_all(&mut spaces, &tol).unwrap();
    // Four ceiling/floor pairs and four shared walls between the upper spaces
    assert_eq!(match_all(&mut spaces, &tol).unwrap(), 8);

    let ground = &spaces[0];
    let mut neighbours: Vec<&str> = ceilings(ground)
        .into_iter()
        .map(|i| {
            let surface = &ground.surfaces[i];
            assert_eq!(surface.boundary_condition, BoundaryCondition::Surface);
            surface.adjacent_surface.as_ref().unwrap().space.as_str()
        })
        .collect();
    neighbours.sort();
    assert_eq!(neighbours, ["Upper NE", "Upper NW", "Upper SE", "Upper SW"]);

    for upper in &spaces[1..] {
        let floor = upper.surface_by_name(&format!("{} Floor", upper.name)).unwrap();
        let adjacent = floor.adjacent_surface.as_ref().unwrap();
        assert_eq!(adjacent.space, "Ground");
        assert!(adjacent.surface.starts_with("Ground RoofCeiling"));
    }
    // Exterior walls of the ground space stay outdoors
    assert!(ground
        .surfaces
        .iter()
        .filter(|s| s.surface_type == SurfaceType::Wall)
        .all(|s| s.boundary_condition == BoundaryCondition::Outdoors));

    unmatch_all(&mut spaces);
    assert!(spaces
        .iter()
        .flat_map(|s| &s.surfaces)
        .all(|s| s.adjacent_surface.is_none() && s.boundary_condition != BoundaryCondition::Surface));
    assert_eq!(match_all(&mut spaces, &tol).unwrap(), 8);
}

#[test]
fn test_intersecting_twice_changes_nothing() {
    init_logging();
    let mut spaces = one_below_four_above();
    let tol = GeometryTolerance::default();

    intersect_all(&mut spaces, &tol).unwrap();
    let counts: Vec<usize> = spaces.iter().map(|s| s.surfaces.len()).collect();
    intersect_all(&mut spaces, &tol).unwrap();
    assert_eq!(counts, spaces.iter().map(|s| s.surfaces.len()).collect::<Vec<_>>());
}
