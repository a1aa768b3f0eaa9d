// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for space-level processing.

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised for invalid input, never for imperfect building geometry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Geometry(#[from] bemgeo_geometry::Error),

    #[error(transparent)]
    Topology(#[from] bemgeo_topology::Error),

    /// Configuration value out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Floor print that cannot be extruded into a space.
    #[error("invalid floor print: {0}")]
    InvalidFloorPrint(String),

    #[error("space '{space}' has no surface {index}")]
    SurfaceOutOfRange { space: String, index: usize },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
