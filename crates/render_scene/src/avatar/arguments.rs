//! Named-argument configuration maps
//!
//! Constraint configuration arrives as a loose name→value map. The
//! extractors return `None` on a missing or mistyped entry so that
//! callers can fall back to their previous value instead of failing the
//! whole update.

use std::collections::HashMap;

use log::warn;

use crate::foundation::math::{Quat, Vec3};

/// One argument value
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// 3D vector
    Vec3(Vec3),
    /// Rotation quaternion
    Quat(Quat),
    /// Scalar
    Float(f32),
    /// String
    Str(String),
    /// Identity handle
    Id(u64),
}

/// Loose name→value configuration map
pub type ArgumentMap = HashMap<String, ArgValue>;

/// Extract a vector argument, logging a mismatch
pub fn extract_vec3(action: &str, args: &ArgumentMap, name: &str) -> Option<Vec3> {
    match args.get(name) {
        Some(ArgValue::Vec3(value)) => Some(*value),
        Some(_) => {
            warn!("{action}: argument {name} is not a vec3, keeping previous value");
            None
        }
        None => None,
    }
}

/// Extract a quaternion argument, logging a mismatch
pub fn extract_quat(action: &str, args: &ArgumentMap, name: &str) -> Option<Quat> {
    match args.get(name) {
        Some(ArgValue::Quat(value)) => Some(*value),
        Some(_) => {
            warn!("{action}: argument {name} is not a quat, keeping previous value");
            None
        }
        None => None,
    }
}

/// Extract a scalar argument, logging a mismatch
pub fn extract_float(action: &str, args: &ArgumentMap, name: &str) -> Option<f32> {
    match args.get(name) {
        Some(ArgValue::Float(value)) => Some(*value),
        Some(_) => {
            warn!("{action}: argument {name} is not a float, keeping previous value");
            None
        }
        None => None,
    }
}

/// Extract a string argument, logging a mismatch
pub fn extract_str<'a>(action: &str, args: &'a ArgumentMap, name: &str) -> Option<&'a str> {
    match args.get(name) {
        Some(ArgValue::Str(value)) => Some(value),
        Some(_) => {
            warn!("{action}: argument {name} is not a string, keeping previous value");
            None
        }
        None => None,
    }
}
