// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BEMGeo Topology
//!
//! Closed-shell analysis for building spaces described as planar polygonal
//! surfaces.
//!
//! A [`Polyhedron`] matches the directed edges of its [`Surface3d`]s into a
//! pool of undirected [`Surface3dEdge`]s. From that pool it decides whether
//! the surfaces enclose a volume, repairs T-junctions by inserting colinear
//! vertices, finds surfaces whose winding disagrees with their neighbours and
//! computes the signed enclosed volume.
//!
//! ```
//! use bemgeo_geometry::GeometryTolerance;
//! use bemgeo_topology::Polyhedron;
//! use nalgebra::Point3;
//!
//! let p = |x, y, z| Point3::new(x, y, z);
//! let tetra = Polyhedron::from_loops(
//!     vec![
//!         ("Base", vec![p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(1.0, 0.0, 0.0)]),
//!         ("Front", vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 0.0, 1.0)]),
//!         ("Side", vec![p(0.0, 0.0, 0.0), p(0.0, 0.0, 1.0), p(0.0, 1.0, 0.0)]),
//!         ("Slope", vec![p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0)]),
//!     ],
//!     GeometryTolerance::default(),
//! )
//! .unwrap();
//!
//! assert!(tetra.is_enclosed_volume());
//! assert!((tetra.calc_divergence_theorem_volume() - 1.0 / 6.0).abs() < 1e-12);
//! ```

pub mod edge;
pub mod error;
pub mod polyhedron;
pub mod surface;

pub use edge::{Surface3dEdge, SurfaceRef};
pub use error::{Error, Result};
pub use polyhedron::{Polyhedron, PolyhedronReport, DEFAULT_MAX_REPAIR_PASSES};
pub use surface::Surface3d;
