// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use bemgeo_geometry::tolerance::TOLERANCE_ENV_VAR;
use bemgeo_geometry::GeometryTolerance;
use bemgeo_processing::config::{MAX_ORIENTATION_PASSES_ENV_VAR, MAX_REPAIR_PASSES_ENV_VAR};
use bemgeo_processing::{Space, SpaceGeometryConfig};
use nalgebra::Point3;

// Environment variables are process-wide, so everything touching them lives
// in one test.
#[test]
fn test_config_from_env() {
    std::env::set_var(TOLERANCE_ENV_VAR, "0.001");
    std::env::set_var(MAX_REPAIR_PASSES_ENV_VAR, " 3 ");
    std::env::set_var(MAX_ORIENTATION_PASSES_ENV_VAR, "2");
    let config = SpaceGeometryConfig::from_env();
    assert_eq!(config.tolerance.distance, 0.001);
    assert_eq!(config.max_repair_passes, 3);
    assert_eq!(config.max_orientation_passes, 2);

    std::env::set_var(TOLERANCE_ENV_VAR, "-5");
    std::env::set_var(MAX_REPAIR_PASSES_ENV_VAR, "many");
    std::env::set_var(MAX_ORIENTATION_PASSES_ENV_VAR, "0");
    assert_eq!(SpaceGeometryConfig::from_env(), SpaceGeometryConfig::default());

    std::env::remove_var(TOLERANCE_ENV_VAR);
    std::env::remove_var(MAX_REPAIR_PASSES_ENV_VAR);
    std::env::remove_var(MAX_ORIENTATION_PASSES_ENV_VAR);
    assert_eq!(SpaceGeometryConfig::from_env(), SpaceGeometryConfig::default());
}

#[test]
fn test_tolerance_changes_matching() {
    // Walls 5 mm apart are the same wall at 1 cm but not at 1 mm
    let floor = |x0: f64, x1: f64| {
        [
            Point3::new(x0, 0.0, 0.0),
            Point3::new(x0, 4.0, 0.0),
            Point3::new(x1, 4.0, 0.0),
            Point3::new(x1, 0.0, 0.0),
        ]
    };
    let make = || {
        let tol = GeometryTolerance::default();
        vec![
            Space::from_floor_print("West", &floor(0.0, 4.0), 3.0, &tol).unwrap(),
            Space::from_floor_print("East", &floor(4.005, 8.0), 3.0, &tol).unwrap(),
        ]
    };

    let coarse = SpaceGeometryConfig::from_json(r#"{"tolerance": {"distance": 0.01}}"#).unwrap();
    let mut spaces = make();
    assert_eq!(bemgeo_processing::match_all(&mut spaces, &coarse.tolerance).unwrap(), 1);

    let fine = SpaceGeometryConfig::default().with_tolerance(GeometryTolerance::new(0.001).unwrap());
    let mut spaces = make();
    assert_eq!(bemgeo_processing::match_all(&mut spaces, &fine.tolerance).unwrap(), 0);
}
