use std::collections::HashMap;
use std::fmt;

use glam::{Mat4, Vec3};

use crate::{data::DeformMode, host::Entity, math::Aabb};

/// Fixed width key of a waypoint path identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PathId(pub u32);

impl PathId {
    /// 32 bit FNV-1a of `name`. The empty name maps to 0.
    pub fn from_name(name: &str) -> Self {
        if name.is_empty() {
            return PathId(0);
        }

        let mut hash: u32 = 0x811c_9dc5;
        for byte in name.bytes() {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(0x0100_0193);
        }
        PathId(hash)
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub remapped_position: Vec3,
    /// Euler angles in degrees.
    pub remapped_rotation: Vec3,
    /// Authored position projected onto the path's parameterization axis.
    pub parameter_value: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaypointPath {
    pub path_id: PathId,
    pub parameterization_axis: Vec3,
    pub waypoints: Vec<Waypoint>,
    /// `parameter_value` of every waypoint, in waypoint order.
    pub parameterization_values: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct Deformer {
    pub mode: DeformMode,
    pub radius: f32,
    pub clamp_angle: f32,
    pub paths: HashMap<PathId, WaypointPath>,
}

#[derive(Debug, Clone)]
pub struct Deformed {
    /// The deformer currently affecting this entity, possibly the entity itself.
    pub deformer: Option<Entity>,
    pub path_id: PathId,
    /// Undeformed transform from this entity's local frame to its deformer's
    /// frame. Only meaningful while `chain_dirty` is false.
    pub deformer_from_entity_undeformed: Mat4,
    /// Set whenever the deformer assignment or parent changes, cleared once
    /// the chain has been recomputed.
    pub chain_dirty: bool,
    pub undeformed_aabb: Aabb,
}

impl Deformed {
    pub fn new(path_id: PathId) -> Self {
        Deformed {
            deformer: None,
            path_id,
            deformer_from_entity_undeformed: Mat4::IDENTITY,
            chain_dirty: true,
            undeformed_aabb: Aabb::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_id_hash() {
        assert_eq!(PathId::from_name(""), PathId(0));
        // FNV-1a reference value for "a".
        assert_eq!(PathId::from_name("a"), PathId(0xe40c_292c));
        assert_ne!(PathId::from_name("left"), PathId::from_name("right"));
    }
}
