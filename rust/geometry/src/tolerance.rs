// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The single geometric tolerance shared by every component.
//!
//! Point equality, edge matching, colinearity tests, polygon booleans and
//! point snapping all derive their thresholds from one [`GeometryTolerance`].
//! Components never hard-code their own epsilons.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable read by [`GeometryTolerance::from_env`].
pub const TOLERANCE_ENV_VAR: &str = "BEMGEO_TOLERANCE";

/// Default distance tolerance in meters (1 cm).
pub const DEFAULT_DISTANCE: f64 = 0.01;

/// Distance tolerance used for all geometric comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryTolerance {
    /// Maximum distance (m) at which two points are considered equal.
    pub distance: f64,
}

impl Default for GeometryTolerance {
    fn default() -> Self {
        Self {
            distance: DEFAULT_DISTANCE,
        }
    }
}

impl GeometryTolerance {
    /// Creates a tolerance, rejecting non-finite or non-positive distances.
    pub fn new(distance: f64) -> Result<Self> {
        if !distance.is_finite() || distance <= 0.0 {
            return Err(Error::InvalidTolerance(distance));
        }
        Ok(Self { distance })
    }

    /// Loads the tolerance from `BEMGEO_TOLERANCE`, falling back to the default
    /// when the variable is unset or invalid.
    pub fn from_env() -> Self {
        std::env::var(TOLERANCE_ENV_VAR)
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .and_then(|d| Self::new(d).ok())
            .unwrap_or_default()
    }

    /// Parses a tolerance from JSON such as `{"distance": 0.001}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let tol: Self = serde_json::from_str(json)?;
        Self::new(tol.distance)
    }

    /// Area threshold below which a polygon is considered degenerate.
    #[inline]
    pub fn area(&self) -> f64 {
        self.distance * self.distance
    }

    /// Allowed area drift between a surface and the pieces an intersection
    /// splits it into.
    #[inline]
    pub fn matching_area(&self) -> f64 {
        10.0 * self.area()
    }

    /// True if two points are within the distance tolerance.
    #[inline]
    pub fn points_equal(&self, a: &Point3<f64>, b: &Point3<f64>) -> bool {
        (a - b).norm() <= self.distance
    }

    /// True if two points are within tolerance when projected on the XY plane.
    #[inline]
    pub fn points_equal_2d(&self, a: &Point3<f64>, b: &Point3<f64>) -> bool {
        let dx = a.x - b.x;
        let dy = a.y - b.y;
        (dx * dx + dy * dy).sqrt() <= self.distance
    }

    /// True if a length is indistinguishable from zero.
    #[inline]
    pub fn is_zero(&self, value: f64) -> bool {
        value.abs() <= self.distance
    }
}
