//! Avatar collaborators of the scene
//!
//! The scene core never reaches into avatar state directly; the hold
//! constraint consumes avatar pose data through the [`AvatarRoster`]
//! trait, injected by the caller instead of resolved through a global
//! locator.

pub mod arguments;
pub mod hold;

use crate::foundation::math::{Quat, Vec3};

/// Stable integer identity of an avatar
pub type AvatarId = u64;

/// Sentinel for "no avatar"
pub const INVALID_AVATAR_ID: AvatarId = 0;

/// Which hand holds the object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hand {
    /// Left hand
    Left,
    /// Right hand
    #[default]
    Right,
}

impl Hand {
    /// Parse a hand from an argument value; only `"left"` and `"right"`
    /// are valid
    pub fn from_arg(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Canonical argument spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Read access to avatar pose data
///
/// Implementations are expected to be shared with the avatar simulation;
/// lookups may be answered from internally locked state.
pub trait AvatarRoster: Send + Sync {
    /// Current palm position and orientation of the holder's hand;
    /// `None` when the avatar is unknown
    fn palm_pose(&self, holder: AvatarId, hand: Hand) -> Option<(Vec3, Quat)>;

    /// Identity of the local user's avatar
    fn local_avatar(&self) -> AvatarId;
}
