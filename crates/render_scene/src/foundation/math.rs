//! Math utilities and types
//!
//! Provides the fundamental math types used by the scene and the
//! avatar-hold constraint.

pub use nalgebra::{Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;
