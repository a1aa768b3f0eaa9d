// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rigid transforms between building, space and face coordinates
//!
//! Spaces carry a 4x4 placement matrix relative to the building. Face-level
//! work (2D booleans, upper-left-corner ordering) happens in a face frame
//! whose Z axis is the outward normal, so the face lies on z = 0.

use crate::error::{Error, Result};
use crate::primitives::outward_normal;
use nalgebra::{Matrix4, Point3, Vector3};

/// Build a face frame for a planar vertex loop.
///
/// The returned matrix maps face coordinates to the loop's coordinates:
/// - Z axis: outward normal of the loop
/// - X axis: horizontal, or world X for horizontal faces
/// - Y axis: Z × X (points up on walls)
/// - Origin: first vertex
///
/// Multiply by the inverse to bring the loop onto z = 0.
pub fn align_face(vertices: &[Point3<f64>]) -> Result<Matrix4<f64>> {
    let z_axis = outward_normal(vertices).ok_or_else(|| {
        Error::DegenerateFace(format!("{} vertices without a normal", vertices.len()))
    })?;
    let origin = vertices[0];

    // Horizontal faces keep world X, everything else gets a horizontal X axis
    let up = Vector3::new(0.0, 0.0, 1.0);
    let horizontal = up.cross(&z_axis);
    let x_axis = if horizontal.norm() > 1e-6 {
        horizontal.normalize()
    } else {
        Vector3::new(1.0, 0.0, 0.0)
    };

    // Y axis from the right-hand rule: Y = Z × X
    let y_axis = z_axis.cross(&x_axis).normalize();

    Ok(frame(&x_axis, &y_axis, &z_axis, &origin))
}

/// Build a transform from orthonormal axes and an origin (column-major).
pub fn frame(
    x_axis: &Vector3<f64>,
    y_axis: &Vector3<f64>,
    z_axis: &Vector3<f64>,
    origin: &Point3<f64>,
) -> Matrix4<f64> {
    Matrix4::new(
        x_axis.x, y_axis.x, z_axis.x, origin.x,
        x_axis.y, y_axis.y, z_axis.y, origin.y,
        x_axis.z, y_axis.z, z_axis.z, origin.z,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Inverse of a transform, or `Error::SingularTransform`.
pub fn invert(matrix: &Matrix4<f64>) -> Result<Matrix4<f64>> {
    matrix.try_inverse().ok_or(Error::SingularTransform)
}

/// Apply a transform to every point of a loop.
pub fn transform_points(matrix: &Matrix4<f64>, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    points
        .iter()
        .map(|p| matrix.transform_point(p))
        .collect()
}

/// Apply the rotational part of a transform to a direction.
pub fn transform_vector(matrix: &Matrix4<f64>, vector: &Vector3<f64>) -> Vector3<f64> {
    matrix.transform_vector(vector)
}

/// Rotation about the world Z axis followed by a translation, the usual
/// placement of a space within a building.
pub fn placement(rotation_z: f64, translation: &Vector3<f64>) -> Matrix4<f64> {
    let (sin, cos) = rotation_z.sin_cos();
    frame(
        &Vector3::new(cos, sin, 0.0),
        &Vector3::new(-sin, cos, 0.0),
        &Vector3::new(0.0, 0.0, 1.0),
        &Point3::from(*translation),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn aligned_wall_lies_on_xy_plane() {
        // North wall seen from outside, normal +Y
        let wall = vec![
            Point3::new(10.0, 5.0, 0.0),
            Point3::new(0.0, 5.0, 0.0),
            Point3::new(0.0, 5.0, 3.0),
            Point3::new(10.0, 5.0, 3.0),
        ];
        let face = align_face(&wall).unwrap();
        let to_face = invert(&face).unwrap();
        let local = transform_points(&to_face, &wall);

        for p in &local {
            assert_relative_eq!(p.z, 0.0, epsilon = 1e-9);
        }
        // Counter-clockwise in the face frame
        let normal = outward_normal(&local).unwrap();
        assert_relative_eq!(normal.z, 1.0, epsilon = 1e-9);
        // Top edge has the larger local y
        assert!(local[2].y > local[1].y);

        let back = transform_points(&face, &local);
        for (a, b) in back.iter().zip(&wall) {
            assert_relative_eq!((a - b).norm(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn aligned_floor_keeps_orientation() {
        // Floor, normal -Z
        let floor = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 4.0, 0.0),
            Point3::new(6.0, 4.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
        ];
        let face = align_face(&floor).unwrap();
        let local = transform_points(&invert(&face).unwrap(), &floor);
        assert_relative_eq!(outward_normal(&local).unwrap().z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_face_is_rejected() {
        let line = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        assert!(align_face(&line).is_err());
        assert!(invert(&Matrix4::zeros()).is_err());
    }

    #[test]
    fn placement_rotates_then_translates() {
        let m = placement(std::f64::consts::FRAC_PI_2, &Vector3::new(10.0, 0.0, 0.0));
        let p = m.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);

        let v = transform_vector(&m, &Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-12);
    }
}
