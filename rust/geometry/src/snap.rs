// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point snapping for boolean operations.
//!
//! Every point that enters or leaves the 2D boolean engine is replaced by the
//! earliest previously seen point within tolerance. This keeps shared corners
//! bit-identical across the inputs and outputs of one operation, which the
//! edge matcher relies on.
//!
//! A grid hash with cells of one tolerance width gives O(1) average lookups;
//! only the 3x3x3 neighbourhood of a cell can hold a point within tolerance.

use nalgebra::Point3;
use rustc_hash::FxHashMap;

use crate::tolerance::GeometryTolerance;

type Cell = (i64, i64, i64);

/// Merge-or-insert store of points seen during one operation.
#[derive(Debug)]
pub struct PointSnapper {
    tol: GeometryTolerance,
    points: Vec<Point3<f64>>,
    grid: FxHashMap<Cell, Vec<usize>>,
}

impl PointSnapper {
    pub fn new(tol: GeometryTolerance) -> Self {
        Self {
            tol,
            points: Vec::new(),
            grid: FxHashMap::default(),
        }
    }

    /// Returns the earliest stored point within tolerance of `point`, storing
    /// `point` itself when there is none.
    pub fn snap(&mut self, point: &Point3<f64>) -> Point3<f64> {
        if let Some(existing) = self.find(point) {
            return existing;
        }
        let index = self.points.len();
        self.points.push(*point);
        self.grid.entry(self.cell(point)).or_default().push(index);
        *point
    }

    /// Snaps every point of a ring.
    pub fn snap_all(&mut self, ring: &[Point3<f64>]) -> Vec<Point3<f64>> {
        ring.iter().map(|p| self.snap(p)).collect()
    }

    /// Earliest stored point within tolerance, without inserting.
    pub fn find(&self, point: &Point3<f64>) -> Option<Point3<f64>> {
        let (cx, cy, cz) = self.cell(point);
        let mut best: Option<usize> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(indices) = self.grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &i in indices {
                        if best.map_or(false, |b| b < i) {
                            continue;
                        }
                        if self.tol.points_equal(&self.points[i], point) {
                            best = Some(i);
                        }
                    }
                }
            }
        }

        best.map(|i| self.points[i])
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn cell(&self, p: &Point3<f64>) -> Cell {
        let size = self.tol.distance;
        (
            (p.x / size).floor() as i64,
            (p.y / size).floor() as i64,
            (p.z / size).floor() as i64,
        )
    }
}
