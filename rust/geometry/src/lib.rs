// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BEMGeo Geometry Primitives
//!
//! Tolerance handling, point and vertex-loop primitives, face transforms and
//! a 2D polygon boolean engine built on i_overlay, used to validate and
//! repair building-space geometry.

pub mod bool2d;
pub mod error;
pub mod polygon;
pub mod primitives;
pub mod snap;
pub mod tolerance;
pub mod transform;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point3, Vector3};

pub use bool2d::{
    intersect, join, join_all, remove_holes, remove_spikes, remove_spikes_buffered, simplify,
    subtract, IntersectionResult,
};
pub use error::{Error, Result};
pub use polygon::Polygon;
pub use primitives::{BoundingBox, Plane};
pub use snap::PointSnapper;
pub use tolerance::GeometryTolerance;
pub use transform::{align_face, transform_points};
