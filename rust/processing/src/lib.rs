// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BEMGeo Processing
//!
//! Space-level geometry checks and repairs for building energy models.
//!
//! A [`Space`] owns planar surfaces in its own coordinates and a transform
//! into building coordinates. This crate answers the questions an energy
//! simulation needs before it can trust a model: is each space closed, are
//! its surfaces facing out, what is its volume, where does the building meet
//! the ground, and which surfaces of neighbouring spaces touch each other.
//!
//! ```
//! use bemgeo_processing::{Space, SpaceGeometryConfig};
//! use nalgebra::Point3;
//!
//! let floor = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(0.0, 5.0, 0.0),
//!     Point3::new(10.0, 5.0, 0.0),
//!     Point3::new(10.0, 0.0, 0.0),
//! ];
//! let config = SpaceGeometryConfig::default();
//! let space = Space::from_floor_print("Office", &floor, 3.0, &config.tolerance).unwrap();
//!
//! assert!(space.is_enclosed_volume(&config).unwrap());
//! assert!((space.volume(&config).unwrap() - 150.0).abs() < 1e-9);
//! ```

pub mod config;
pub mod error;
pub mod footprint;
pub mod intersect;
pub mod matching;
pub mod space;

pub use config::SpaceGeometryConfig;
pub use error::{Error, Result};
pub use footprint::{exposed_perimeter, generate_footprint, total_exposed_perimeter};
pub use intersect::{compute_intersection, intersect_all, intersect_surfaces, SurfaceIntersection};
pub use matching::{match_all, match_surfaces, unmatch_all};
pub use space::{
    AdjacentSurface, BoundaryCondition, OrientationFix, PlanarSurface, Space, SpaceDiagnostics,
    SurfaceType,
};
