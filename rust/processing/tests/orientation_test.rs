// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use bemgeo_processing::{PlanarSurface, Space, SpaceGeometryConfig, SurfaceType};
use nalgebra::Point3;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
    Point3::new(x, y, z)
}

/// 8 x 6 x 3 room built surface by surface, with the roof split in two.
fn room() -> Space {
    let (l, w, h) = (8.0, 6.0, 3.0);
    let surfaces = vec![
        PlanarSurface::new("Floor", vec![p(0.0, 0.0, 0.0), p(0.0, w, 0.0), p(l, w, 0.0), p(l, 0.0, 0.0)]),
        PlanarSurface::new("South", vec![p(0.0, 0.0, h), p(0.0, 0.0, 0.0), p(l, 0.0, 0.0), p(l, 0.0, h)]),
        PlanarSurface::new("East", vec![p(l, 0.0, h), p(l, 0.0, 0.0), p(l, w, 0.0), p(l, w, h)]),
        PlanarSurface::new("North", vec![p(l, w, h), p(l, w, 0.0), p(0.0, w, 0.0), p(0.0, w, h)]),
        PlanarSurface::new("West", vec![p(0.0, w, h), p(0.0, w, 0.0), p(0.0, 0.0, 0.0), p(0.0, 0.0, h)]),
        PlanarSurface::new("Roof West", vec![p(0.0, 0.0, h), p(4.0, 0.0, h), p(4.0, w, h), p(0.0, w, h)]),
        PlanarSurface::new("Roof East", vec![p(4.0, 0.0, h), p(l, 0.0, h), p(l, w, h), p(4.0, w, h)]),
    ];
    Space::new("Room", surfaces)
}

fn flip(space: &mut Space, name: &str) {
    let tol = SpaceGeometryConfig::default().tolerance;
    space
        .surfaces
        .iter_mut()
        .find(|s| s.name == name)
        .expect("surface exists")
        .flip(&tol);
}

#[test]
fn test_well_formed_room() {
    init_logging();
    let space = room();
    let config = SpaceGeometryConfig::default();

    assert!(space.is_enclosed_volume(&config).unwrap());
    assert!(space.are_all_surfaces_correctly_oriented(&config).unwrap());
    assert_relative_eq!(space.volume(&config).unwrap(), 144.0, epsilon = 1e-9);
    assert_eq!(space.surfaces[5].surface_type, SurfaceType::RoofCeiling);
    assert_relative_eq!(space.floor_area(), 48.0, epsilon = 1e-9);
    assert_relative_eq!(space.ceiling_height(), 3.0, epsilon = 1e-9);
}

#[test]
fn test_fix_one_reversed_roof_piece() {
    init_logging();
    let mut space = room();
    flip(&mut space, "Roof East");
    let config = SpaceGeometryConfig::default();

    let wrong: Vec<&str> = space
        .find_surfaces_with_incorrect_orientation(&config)
        .unwrap()
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(wrong, ["Roof East"]);
    assert!(!space.are_all_surfaces_correctly_oriented(&config).unwrap());

    let fix = space.fix_surfaces_with_incorrect_orientation(&config).unwrap();
    assert!(fix.converged);
    assert_eq!(fix.flipped, ["Roof East"]);
    assert_eq!(fix.passes, 1);
    assert!(space.are_all_surfaces_correctly_oriented(&config).unwrap());
    assert_relative_eq!(space.volume(&config).unwrap(), 144.0, epsilon = 1e-9);
}

#[test]
fn test_fix_inside_out_room() {
    init_logging();
    let mut space = room();
    let names: Vec<String> = space.surfaces.iter().map(|s| s.name.clone()).collect();
    for name in &names {
        flip(&mut space, name);
    }
    let config = SpaceGeometryConfig::default();

    assert_eq!(
        space.find_surfaces_with_incorrect_orientation(&config).unwrap().len(),
        space.surfaces.len()
    );
    assert_relative_eq!(space.volume(&config).unwrap(), 144.0, epsilon = 1e-9);

    let fix = space.fix_surfaces_with_incorrect_orientation(&config).unwrap();
    assert!(fix.converged);
    assert_eq!(fix.flipped.len(), 7);
    assert!(space.are_all_surfaces_correctly_oriented(&config).unwrap());
}

#[test]
fn test_diagnostics_report() {
    init_logging();
    let mut space = room();
    flip(&mut space, "North");
    let config = SpaceGeometryConfig::default();

    let diagnostics = space.diagnostics(&config).unwrap();
    assert!(diagnostics.is_enclosed);
    assert!(diagnostics.is_convex);
    assert_eq!(diagnostics.incorrectly_oriented_surfaces, ["North"]);
    assert!(diagnostics.non_convex_surfaces.is_empty());

    let json = diagnostics.to_json().unwrap();
    assert!(json.contains("\"incorrectly_oriented_surfaces\""));
    assert!(json.contains("North"));
}

#[test]
fn test_fix_stops_at_pass_limit_before_converging() {
    init_logging();
    let make = || {
        let mut space = room();
        for name in ["South", "East", "North", "West"] {
            flip(&mut space, name);
        }
        space
    };

    // The first round flips floor and roof, which leaves the room inside out
    let config = SpaceGeometryConfig {
        max_orientation_passes: 1,
        ..SpaceGeometryConfig::default()
    };
    let mut space = make();
    let fix = space.fix_surfaces_with_incorrect_orientation(&config).unwrap();
    assert!(!fix.converged);
    assert_eq!(fix.passes, 1);
    assert_eq!(fix.flipped, ["Floor", "Roof West", "Roof East"]);
    assert_eq!(
        space.find_surfaces_with_incorrect_orientation(&config).unwrap().len(),
        space.surfaces.len()
    );

    let config = SpaceGeometryConfig::default();
    let mut space = make();
    let fix = space.fix_surfaces_with_incorrect_orientation(&config).unwrap();
    assert!(fix.converged);
    assert_eq!(fix.passes, 2);
    assert_eq!(fix.flipped.len(), 10);
    assert!(space.are_all_surfaces_correctly_oriented(&config).unwrap());
    assert_relative_eq!(space.volume(&config).unwrap(), 144.0, epsilon = 1e-9);
}
