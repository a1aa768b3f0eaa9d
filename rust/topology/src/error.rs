// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for surface and polyhedron construction.
//!
//! Topology problems (open shells, misoriented surfaces) are not errors; they
//! are reported through [`crate::Polyhedron`] queries. Only invalid input is.

/// Result type alias for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building surfaces.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A surface loop needs at least three vertices.
    #[error("surface '{name}' has {count} vertices, at least 3 are required")]
    DegenerateSurface { name: String, count: usize },

    /// An edge index outside the surface's loop.
    #[error("surface '{name}' has no edge {index}")]
    EdgeOutOfRange { name: String, index: usize },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Geometry(#[from] bemgeo_geometry::Error),
}
