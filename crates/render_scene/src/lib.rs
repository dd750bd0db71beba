//! # Render Scene
//!
//! Thread-safe, versioned render scene graph with batched transaction
//! commits.
//!
//! ## Features
//!
//! - **Transactional Edits**: Producers batch structural edits on any
//!   thread; one consumer applies them atomically per tick
//! - **Dynamic Classification**: Items move between the spatial index
//!   and the flat non-spatial set as their key changes
//! - **Transitions**: Timed visual-state changes attached to items and
//!   propagated through their sub-item trees
//! - **Pluggable Stages**: Named per-domain registries looked up
//!   independently of item storage
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_scene::prelude::*;
//!
//! let scene = Scene::new();
//! let id = scene.allocate_id();
//!
//! let mut txn = Transaction::new();
//! txn.remove_item(id);
//! scene.enqueue_transaction(txn);
//!
//! // On the consumer thread, once per frame:
//! scene.process_transaction_queue();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod avatar;
pub mod config;
pub mod foundation;
pub mod scene;
pub mod spatial;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        avatar::{
            hold::{HoldAction, SpringConstraint},
            AvatarRoster, Hand,
        },
        config::{Config, ConfigError, SceneConfig},
        foundation::math::{Quat, Vec3},
        scene::{
            ItemId, ItemKey, ItemPayload, Scene, Selection, Transaction, TransitionStage,
            TransitionType,
        },
        spatial::{Aabb, FlatCellIndex, SpatialIndex},
    };
}
