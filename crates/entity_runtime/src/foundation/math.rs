//! Math utilities and types
//!
//! Provides the nalgebra aliases used throughout the runtime, the
//! position/rotation/scale [`Transform`], and the single place where
//! authored rotations (degrees or quaternions) become runtime rotations.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, UnitQuaternion, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Create a transform from a transformation matrix
    ///
    /// Assumes the matrix has no shear, which holds for anything built from
    /// [`Transform::to_matrix`] with positive scale.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = translation_of(matrix);

        let scale_x = Vec3::new(matrix.m11, matrix.m21, matrix.m31).magnitude();
        let scale_y = Vec3::new(matrix.m12, matrix.m22, matrix.m32).magnitude();
        let scale_z = Vec3::new(matrix.m13, matrix.m23, matrix.m33).magnitude();
        let scale = Vec3::new(scale_x, scale_y, scale_z);

        // a collapsed axis carries no rotation information
        let divisor = |s: f32| if s > f32::EPSILON { s } else { 1.0 };
        let (scale_x, scale_y, scale_z) = (divisor(scale_x), divisor(scale_y), divisor(scale_z));
        let rotation_matrix = Mat3::new(
            matrix.m11 / scale_x, matrix.m12 / scale_y, matrix.m13 / scale_z,
            matrix.m21 / scale_x, matrix.m22 / scale_y, matrix.m23 / scale_z,
            matrix.m31 / scale_x, matrix.m32 / scale_y, matrix.m33 / scale_z,
        );
        let rotation = Quat::from_matrix(&rotation_matrix);

        Self {
            position,
            rotation,
            scale,
        }
    }
}

/// Extract the translation column of an affine matrix
pub fn translation_of(matrix: &Mat4) -> Vec3 {
    Vec3::new(matrix.m14, matrix.m24, matrix.m34)
}

/// Build a rotation from Euler angles authored in degrees.
///
/// Angles are applied in intrinsic X, then Y, then Z order
/// (`R = Rx * Ry * Rz`), the convention used by the authoring tools.
/// Every degree-to-radian conversion for rotations goes through here.
pub fn euler_degrees_to_quat(degrees: [f32; 3]) -> Quat {
    let [x, y, z] = degrees.map(|angle| angle * DEG_TO_RAD);
    UnitQuaternion::from_axis_angle(&Vec3::x_axis(), x)
        * UnitQuaternion::from_axis_angle(&Vec3::y_axis(), y)
        * UnitQuaternion::from_axis_angle(&Vec3::z_axis(), z)
}

/// Interpret an authored rotation array.
///
/// Three values are Euler degrees, four values are a quaternion stored as
/// `[x, y, z, w]`. Any other length yields the identity rotation and a warning.
pub fn rotation_from_authored(values: &[f32]) -> Quat {
    match *values {
        [x, y, z] => euler_degrees_to_quat([x, y, z]),
        [x, y, z, w] => {
            let quaternion = Quaternion::new(w, x, y, z);
            if quaternion.norm() <= f32::EPSILON {
                log::warn!("Zero-length quaternion {values:?}, using identity rotation");
                Quat::identity()
            } else {
                Quat::from_quaternion(quaternion)
            }
        }
        _ => {
            log::warn!(
                "Rotation must have 3 (Euler degrees) or 4 (quaternion) values, got {}; using identity",
                values.len()
            );
            Quat::identity()
        }
    }
}

/// Degrees to radians conversion factor
pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_euler_degrees_single_axis_matches_axis_angle() {
        let rotation = euler_degrees_to_quat([0.0, 90.0, 0.0]);
        let expected = UnitQuaternion::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2);

        assert_relative_eq!(rotation.angle_to(&expected), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_degrees_are_not_treated_as_radians() {
        let rotation = euler_degrees_to_quat([0.0, 90.0, 0.0]);
        let wrong = UnitQuaternion::from_axis_angle(&Vec3::y_axis(), 90.0);

        assert!(rotation.angle_to(&wrong) > 0.1);
    }

    #[test]
    fn test_euler_order_is_x_then_y_then_z() {
        let rotation = euler_degrees_to_quat([90.0, 90.0, 0.0]);
        // Rx(90) * Ry(90) applied to +Z: Ry sends +Z to +X, Rx keeps +X
        let rotated = rotation * Vec3::z();

        assert_relative_eq!(rotated, Vec3::x(), epsilon = EPSILON);
    }

    #[test]
    fn test_rotation_from_quaternion_values() {
        let half = std::f32::consts::FRAC_1_SQRT_2;
        let rotation = rotation_from_authored(&[0.0, half, 0.0, half]);
        let expected = euler_degrees_to_quat([0.0, 90.0, 0.0]);

        assert_relative_eq!(rotation.angle_to(&expected), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_rotation_with_bad_length_is_identity() {
        assert_eq!(rotation_from_authored(&[1.0, 2.0]), Quat::identity());
        assert_eq!(rotation_from_authored(&[0.0, 0.0, 0.0, 0.0]), Quat::identity());
    }

    #[test]
    fn test_transform_matrix_round_trip() {
        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: euler_degrees_to_quat([0.0, 45.0, 0.0]),
            scale: Vec3::new(2.0, 1.0, 0.5),
        };

        let restored = Transform::from_matrix(&transform.to_matrix());

        assert_relative_eq!(restored.position, transform.position, epsilon = EPSILON);
        assert_relative_eq!(restored.scale, transform.scale, epsilon = EPSILON);
        assert_relative_eq!(restored.rotation.angle_to(&transform.rotation), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_translation_of_matrix() {
        let matrix = Transform::from_position(Vec3::new(10.0, -2.0, 4.0)).to_matrix();
        assert_relative_eq!(translation_of(&matrix), Vec3::new(10.0, -2.0, 4.0), epsilon = EPSILON);
    }

    #[test]
    fn test_from_matrix_with_collapsed_axis() {
        let flat = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::identity(),
            scale: Vec3::new(0.0, 1.0, 1.0),
        };
        let recovered = Transform::from_matrix(&flat.to_matrix());

        assert!(recovered.rotation.coords.iter().all(|c| c.is_finite()));
        assert_relative_eq!(recovered.scale, flat.scale, epsilon = EPSILON);
        assert_relative_eq!(recovered.position, flat.position, epsilon = EPSILON);
    }
}
