// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Processing configuration loaded from environment variables or JSON.

use bemgeo_geometry::GeometryTolerance;
use bemgeo_topology::DEFAULT_MAX_REPAIR_PASSES;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MAX_REPAIR_PASSES_ENV_VAR: &str = "BEMGEO_MAX_REPAIR_PASSES";
pub const MAX_ORIENTATION_PASSES_ENV_VAR: &str = "BEMGEO_MAX_ORIENTATION_PASSES";

/// Flip-and-rebuild rounds attempted by orientation fixing.
pub const DEFAULT_MAX_ORIENTATION_PASSES: usize = 4;

/// Settings shared by every space-level operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceGeometryConfig {
    /// Distance tolerance for all geometric comparisons.
    pub tolerance: GeometryTolerance,
    /// Colinear repair passes per polyhedron.
    pub max_repair_passes: usize,
    /// Rounds of orientation fixing per space.
    pub max_orientation_passes: usize,
}

impl Default for SpaceGeometryConfig {
    fn default() -> Self {
        Self {
            tolerance: GeometryTolerance::default(),
            max_repair_passes: DEFAULT_MAX_REPAIR_PASSES,
            max_orientation_passes: DEFAULT_MAX_ORIENTATION_PASSES,
        }
    }
}

impl SpaceGeometryConfig {
    /// Load configuration from environment variables. Unset or invalid
    /// values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tolerance: GeometryTolerance::from_env(),
            max_repair_passes: std::env::var(MAX_REPAIR_PASSES_ENV_VAR)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_repair_passes),
            max_orientation_passes: std::env::var(MAX_ORIENTATION_PASSES_ENV_VAR)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_orientation_passes),
        }
    }

    /// Parses and validates a configuration such as
    /// `{"tolerance": {"distance": 0.001}, "max_repair_passes": 4}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        config.validated()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Same configuration with the tolerance replaced.
    pub fn with_tolerance(mut self, tolerance: GeometryTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn validated(self) -> Result<Self> {
        GeometryTolerance::new(self.tolerance.distance)?;
        if self.max_orientation_passes == 0 {
            return Err(Error::Config(
                "max_orientation_passes must be at least 1".into(),
            ));
        }
        Ok(self)
    }
}
