//! Pluggable per-domain scene registries

use std::any::Any;
use std::sync::Arc;

/// A named pluggable registry of auxiliary per-domain state
///
/// Stages are registered on the scene by name and looked up independently
/// of items and selections. Implementations that are mutated while the
/// scene applies a transaction (the transition stage, for instance) use
/// interior mutability, since they are reached through a shared handle.
pub trait SceneStage: Send + Sync + 'static {
    /// Upcast to `Any` for typed lookup through the registry
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
