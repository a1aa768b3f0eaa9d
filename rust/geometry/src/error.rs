// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in geometry primitives and configuration
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid tolerance: {0}")]
    InvalidTolerance(f64),

    #[error("Degenerate face: {0}")]
    DegenerateFace(String),

    #[error("Transformation is not invertible")]
    SingularTransform,

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}
