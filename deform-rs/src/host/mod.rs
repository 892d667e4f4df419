//! Interfaces of the systems the deform system plugs into, along with simple
//! implementations of them.
//!
//! The deform system never owns transforms or meshes. It installs callbacks
//! on a [TransformSystem] and a [RenderSystem], and those systems decide when
//! to call them. Both kinds of callback receive a [TransformView] so they can
//! look up other entities' transforms at call time.

mod mesh_registry;
mod scene;

use std::fmt;

use glam::Mat4;

use crate::math::Sqt;

pub use mesh_registry::MeshRegistry;
pub use scene::SceneGraph;

/// Identifier of an object in the host scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(pub u32);

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Computes an entity's world-from-local matrix from its local SQT and its
/// parent's world matrix, if it has a parent.
pub type WorldFromEntityFn = Box<dyn Fn(&dyn TransformView, &Sqt, Option<&Mat4>) -> Mat4>;

/// Mutates the positions of a vertex buffer in place. Arguments are the vertex
/// data, the vertex count, and the stride between vertexes in floats.
pub type DeformMeshFn = Box<dyn Fn(&dyn TransformView, &mut [f32], usize, usize) -> bool>;

/// Sent whenever an entity is attached to a different parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentChangedEvent {
    pub target: Entity,
    pub old_parent: Option<Entity>,
    pub new_parent: Option<Entity>,
}

/// Read access to the transform hierarchy.
pub trait TransformView {
    fn parent(&self, entity: Entity) -> Option<Entity>;

    /// The most recently computed world matrix of `entity`.
    fn world_from_entity(&self, entity: Entity) -> Option<Mat4>;

    fn local_sqt(&self, entity: Entity) -> Option<Sqt>;
}

pub trait TransformSystem: TransformView {
    fn children(&self, entity: Entity) -> Vec<Entity>;

    /// Replaces the function used to compute the world matrix of `entity`.
    /// `None` restores standard parent composition.
    fn set_world_from_entity_fn(&mut self, entity: Entity, function: Option<WorldFromEntityFn>);
}

pub trait RenderSystem {
    /// Replaces the function run over `entity`'s vertexes when its mesh is
    /// built. `None` removes it.
    fn set_deformation_fn(&mut self, entity: Entity, function: Option<DeformMeshFn>);
}
