pub mod cylinder;
pub mod lerp;
pub mod vertex;

use glam::{Mat4, Quat, Vec3};

pub use cylinder::{
    cylinder_bend_matrix, cylinder_deform_matrix, cylinder_radius, cylinder_wrap_point,
};
pub use lerp::{find_bracket, Bracket};
pub use vertex::{apply_per_vertex, compute_bounding_box, Aabb};

/// Scale, rotation and translation of a local frame relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sqt {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Sqt {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Sqt {
    pub const IDENTITY: Self = Sqt {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Sqt {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Sqt {
            translation,
            ..Self::IDENTITY
        }
    }
}

pub fn matrix_from_sqt(sqt: &Sqt) -> Mat4 {
    Mat4::from_scale_rotation_translation(sqt.scale, sqt.rotation, sqt.translation)
}

pub fn sqt_from_matrix(matrix: &Mat4) -> Sqt {
    let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
    Sqt {
        translation,
        rotation,
        scale,
    }
}

/// Composes `sqt` under an optional parent world matrix.
pub fn compose_with_parent(sqt: &Sqt, world_from_parent: Option<&Mat4>) -> Mat4 {
    let parent_from_local = matrix_from_sqt(sqt);
    match world_from_parent {
        Some(parent) => *parent * parent_from_local,
        None => parent_from_local,
    }
}
