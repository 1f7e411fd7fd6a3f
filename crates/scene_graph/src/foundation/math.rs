//! Math utilities and types
//!
//! Provides fundamental math types for 3D scene description.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Rigid-body transform (rotation + translation)
pub type Isometry3 = nalgebra::Isometry3<f32>;

/// General affine transform
pub type Affine3 = nalgebra::Affine3<f32>;

/// Convert a rigid transform into a general affine transform
pub fn affine_from_isometry(isometry: &Isometry3) -> Affine3 {
    Affine3::from_matrix_unchecked(isometry.to_homogeneous())
}

/// Build the affine transform scaling each axis independently
pub fn affine_from_scale(scale: &Vec3) -> Affine3 {
    Affine3::from_matrix_unchecked(Mat4::new_nonuniform_scaling(scale))
}
