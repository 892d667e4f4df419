//! Non-destructive deformation of entity hierarchies.
//!
//! A deformer entity bends the transforms and meshes of the deformed entities
//! below it, either around a vertical cylinder or along authored waypoint
//! paths. Authored transforms are never touched: the [DeformSystem] installs
//! callbacks on the host's transform and render systems and computes the bent
//! results on demand.

use thiserror::Error;

pub mod data;
pub mod host;
pub mod math;
pub mod system;

pub use data::{ComponentDef, DeformMode, DeformedDef, DeformerDef, WaypointDef, WaypointPathDef};
pub use host::{
    Entity, MeshRegistry, ParentChangedEvent, RenderSystem, SceneGraph, TransformSystem,
    TransformView,
};
pub use math::{Aabb, Sqt};
pub use system::{DeformSystem, PathId, WaypointPath};

/// Rejected deformer or path definitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("waypoint deformations must have at least one path")]
    MissingWaypointPaths,
    #[error("waypoint path {0:?} has no waypoints")]
    EmptyPath(String),
    #[error("waypoint path {0:?} needs two distinct end points to define its axis")]
    DegenerateAxis(String),
    #[error("waypoint path {0:?} is defined more than once")]
    DuplicatePath(String),
    #[error("entity {0} already has a deformer")]
    DuplicateDeformer(Entity),
}
