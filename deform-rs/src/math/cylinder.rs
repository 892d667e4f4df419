use glam::{Mat4, Quat, Vec3};

use super::{matrix_from_sqt, sqt_from_matrix, Sqt};

// All the functions here assume this coordinate system.
//        +Y  (cylinder axis)
//         |
//         |______ +X  (arc length)
//        /
//       /
//     +Z  (towards the axis, away from the sheet)
//
// In root space the axis passes through the origin and the flat sheet lies on
// the plane z = -radius, so a deformer frame sits on the sheet once it is
// offset by -radius along Z.

/// Returns the distance of the coordinate transform from the Y axis.
pub fn cylinder_radius(matrix: &Mat4) -> f32 {
    let translation = matrix.w_axis;
    (translation.x * translation.x + translation.z * translation.z).sqrt()
}

/// Maps a flat root space point onto a cylinder of `radius` around the Y axis.
///
/// `x` is treated as arc length measured at `radius`, and `-z` as the distance
/// from the axis, so points on the sheet land exactly on the cylinder.
pub fn cylinder_wrap_point(position: Vec3, radius: f32) -> Vec3 {
    if radius <= 0.0 {
        return position;
    }

    let distance = -position.z;
    let (sin, cos) = (position.x / radius).sin_cos();
    Vec3::new(distance * sin, position.y, -distance * cos)
}

// Places a root space translation on the cylinder, continuing along the tangent
// once the arc passes the clamp angle. Returns the position and the bend angle.
fn wrap_clamped(root: Vec3, radius: f32, clamp_angle: f32) -> (Vec3, f32) {
    let unclamped = root.x / radius;
    let theta = if clamp_angle > 0.0 {
        unclamped.clamp(-clamp_angle, clamp_angle)
    } else {
        unclamped
    };
    let overflow = root.x - theta * radius;

    let distance = -root.z;
    let (sin, cos) = theta.sin_cos();
    let on_cylinder = Vec3::new(distance * sin, root.y, -distance * cos);
    let tangent = Vec3::new(cos, 0.0, sin);

    (on_cylinder + tangent * overflow, theta)
}

/// Places a local frame on a cylinder of `radius`, given that its parent sits
/// `parent_radius` away from the axis. The result is relative to the parent.
pub fn cylinder_deform_matrix(local_sqt: &Sqt, parent_radius: f32, radius: f32) -> Mat4 {
    if radius <= 0.0 {
        return matrix_from_sqt(local_sqt);
    }

    let offset = Vec3::Z * parent_radius;
    let (position, theta) = wrap_clamped(local_sqt.translation - offset, radius, 0.0);

    matrix_from_sqt(&Sqt {
        translation: position + offset,
        rotation: Quat::from_rotation_y(-theta) * local_sqt.rotation,
        scale: local_sqt.scale,
    })
}

/// Bends an undeformed deformer-from-entity transform around the cylinder of
/// `radius`, returning the deformed deformer-from-entity transform.
///
/// Bend angles past `clamp_angle` (radians) continue flat along the tangent.
/// A non-positive clamp angle disables clamping.
pub fn cylinder_bend_matrix(deformer_from_entity: &Mat4, radius: f32, clamp_angle: f32) -> Mat4 {
    if radius <= 0.0 {
        return *deformer_from_entity;
    }

    let sqt = sqt_from_matrix(deformer_from_entity);
    let offset = Vec3::Z * radius;
    let (position, theta) = wrap_clamped(sqt.translation - offset, radius, clamp_angle);

    matrix_from_sqt(&Sqt {
        translation: position + offset,
        rotation: Quat::from_rotation_y(-theta) * sqt.rotation,
        scale: sqt.scale,
    })
}
