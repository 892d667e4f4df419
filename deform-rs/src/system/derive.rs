use glam::{EulerRot, Mat4, Quat, Vec3};

use super::DeformState;
use crate::{
    data::DeformMode,
    host::{Entity, TransformView},
    math::{
        apply_per_vertex, compose_with_parent, compute_bounding_box, cylinder_bend_matrix,
        cylinder_deform_matrix, cylinder_radius, cylinder_wrap_point, find_bracket,
        matrix_from_sqt, Sqt,
    },
};

// Returns the cached undeformed chain of `entity`, recomputing it (and any
// dirty ancestors) from local transforms first if needed.
//
// The chain starts at the deformer with identity and multiplies in the local
// transform of every entity down to `entity`.
pub(crate) fn resolve_undeformed_chain(
    state: &mut DeformState,
    transforms: &dyn TransformView,
    entity: Entity,
) -> Option<Mat4> {
    let mut pending = Vec::new();
    let mut current = entity;

    let mut chain = loop {
        let record = state.deformed.get(current)?;
        let deformer = record.deformer?;
        if current == deformer {
            break Mat4::IDENTITY;
        }
        if !record.chain_dirty {
            break record.deformer_from_entity_undeformed;
        }

        pending.push(current);
        // Can only happen if the host hierarchy loops.
        if pending.len() > state.deformed.len() {
            return None;
        }
        current = transforms.parent(current)?;
    };

    for entity in pending.into_iter().rev() {
        chain *= matrix_from_sqt(&transforms.local_sqt(entity)?);
        if let Some(record) = state.deformed.get_mut(entity) {
            record.deformer_from_entity_undeformed = chain;
            record.chain_dirty = false;
        }
    }

    Some(chain)
}

// Updates the undeformed chain of `entity` for the given local transform.
//
// The parent world matrix handed to a world-from-entity function has already
// been bent, so it can't be used here. The chain is built from the parent's own
// cached chain instead, which stays in undeformed space.
//
// Returns the deformer and the new chain, or `None` if the entity should not be
// deformed. An entity that is its own deformer gets an identity chain but is
// never deformed itself.
fn prepare_undeformed_chain(
    state: &mut DeformState,
    transforms: &dyn TransformView,
    entity: Entity,
    local_sqt: &Sqt,
) -> Option<(Entity, Mat4)> {
    let Some(record) = state.deformed.get_mut(entity) else {
        log::error!("Missing deformed, skipping deformation for entity: {}", entity);
        return None;
    };
    let Some(deformer) = record.deformer.filter(|&d| state.deformers.contains(d)) else {
        log::error!("Missing deformer, skipping deformation for entity: {}", entity);
        return None;
    };

    if entity == deformer {
        record.deformer_from_entity_undeformed = Mat4::IDENTITY;
        record.chain_dirty = false;
        return None;
    }

    let parent = transforms.parent(entity);
    let parent_chain =
        parent.and_then(|parent| resolve_undeformed_chain(state, transforms, parent));
    let Some(parent_chain) = parent_chain else {
        log::error!(
            "A deformed entity {} has non deformed parent {:?}. It will not deform.",
            entity,
            parent
        );
        return None;
    };

    let chain = parent_chain * matrix_from_sqt(local_sqt);
    let record = state.deformed.get_mut(entity)?;
    record.deformer_from_entity_undeformed = chain;
    record.chain_dirty = false;

    Some((deformer, chain))
}

/// World matrix of an entity under a legacy global cylinder deformer.
pub(crate) fn global_cylinder_matrix(
    state: &DeformState,
    entity: Entity,
    local_sqt: &Sqt,
    world_from_parent: Option<&Mat4>,
) -> Mat4 {
    let deformer = state
        .deformed
        .get(entity)
        .and_then(|deformed| deformed.deformer)
        .and_then(|deformer| state.deformers.get(deformer))
        .or_else(|| state.deformers.get(entity));
    let Some(deformer) = deformer else {
        return compose_with_parent(local_sqt, world_from_parent);
    };

    let parent_radius = world_from_parent.map(cylinder_radius).unwrap_or(0.0);
    let parent_from_entity = cylinder_deform_matrix(local_sqt, parent_radius, deformer.radius);
    match world_from_parent {
        Some(parent) => *parent * parent_from_entity,
        None => parent_from_entity,
    }
}

/// World matrix of an entity bent around the cylinder in front of its deformer.
pub(crate) fn cylinder_bend_world_matrix(
    state: &mut DeformState,
    transforms: &dyn TransformView,
    entity: Entity,
    local_sqt: &Sqt,
    world_from_parent: Option<&Mat4>,
) -> Mat4 {
    let Some((deformer_entity, chain)) =
        prepare_undeformed_chain(state, transforms, entity, local_sqt)
    else {
        return compose_with_parent(local_sqt, world_from_parent);
    };
    let (Some(deformer), Some(world_from_deformer)) = (
        state.deformers.get(deformer_entity),
        transforms.world_from_entity(deformer_entity),
    ) else {
        return compose_with_parent(local_sqt, world_from_parent);
    };

    world_from_deformer * cylinder_bend_matrix(&chain, deformer.radius, deformer.clamp_angle)
}

/// World matrix of an entity remapped along its deformer's waypoint path.
pub(crate) fn waypoint_world_matrix(
    state: &mut DeformState,
    transforms: &dyn TransformView,
    entity: Entity,
    local_sqt: &Sqt,
    world_from_parent: Option<&Mat4>,
) -> Mat4 {
    let Some((deformer_entity, chain)) =
        prepare_undeformed_chain(state, transforms, entity, local_sqt)
    else {
        return compose_with_parent(local_sqt, world_from_parent);
    };
    let Some(deformer) = state.deformers.get(deformer_entity) else {
        return compose_with_parent(local_sqt, world_from_parent);
    };
    let Some(path_id) = state.deformed.get(entity).map(|deformed| deformed.path_id) else {
        return compose_with_parent(local_sqt, world_from_parent);
    };
    let Some(path) = deformer.paths.get(&path_id) else {
        log::error!("Missing deformation path: {} for entity: {}", path_id, entity);
        return compose_with_parent(local_sqt, world_from_parent);
    };
    let Some(world_from_deformer) = transforms.world_from_entity(deformer_entity) else {
        return compose_with_parent(local_sqt, world_from_parent);
    };

    let current_point = chain.w_axis.truncate().dot(path.parameterization_axis);
    let Some(bracket) = find_bracket(current_point, &path.parameterization_values) else {
        return compose_with_parent(local_sqt, world_from_parent);
    };
    let lower = &path.waypoints[bracket.min_index];
    let upper = &path.waypoints[bracket.max_index];

    let translation = lower
        .remapped_position
        .lerp(upper.remapped_position, bracket.fraction);
    let euler = lower
        .remapped_rotation
        .lerp(upper.remapped_rotation, bracket.fraction);
    let rotation = Quat::from_euler(
        EulerRot::XYZ,
        euler.x.to_radians(),
        euler.y.to_radians(),
        euler.z.to_radians(),
    );

    let deformed_sqt = Sqt::new(translation, rotation * local_sqt.rotation, local_sqt.scale);
    compose_with_parent(&deformed_sqt, Some(&world_from_deformer))
}

// Wraps the vertexes around the cylinder of the deformer. Vertexes go from the
// entity's frame into the undeformed root space of the deformer, get wrapped,
// and come back out through the deformed transforms the transform system has
// already computed.
fn cylinder_bend_mesh(
    state: &mut DeformState,
    transforms: &dyn TransformView,
    entity: Entity,
    deformer_entity: Entity,
    data: &mut [f32],
    count: usize,
    stride: usize,
) -> bool {
    let Some(radius) = state.deformers.get(deformer_entity).map(|d| d.radius) else {
        return false;
    };
    let (Some(world_from_entity), Some(world_from_deformer)) = (
        transforms.world_from_entity(entity),
        transforms.world_from_entity(deformer_entity),
    ) else {
        return false;
    };
    let Some(chain) = resolve_undeformed_chain(state, transforms, entity) else {
        log::error!("No undeformed chain, skipping deformation for entity: {}", entity);
        return false;
    };

    let root_offset = Vec3::Z * radius;
    let root_from_entity_undeformed = Mat4::from_translation(-root_offset) * chain;
    let entity_from_root_deformed =
        world_from_entity.inverse() * world_from_deformer * Mat4::from_translation(root_offset);

    apply_per_vertex(data, count, stride, |position| {
        let root = root_from_entity_undeformed.transform_point3(position);
        entity_from_root_deformed.transform_point3(cylinder_wrap_point(root, radius))
    });
    true
}

// Wraps vertexes around the global cylinder relative to the entity's own
// distance from the axis.
fn global_cylinder_mesh(
    transforms: &dyn TransformView,
    entity: Entity,
    radius: f32,
    data: &mut [f32],
    count: usize,
    stride: usize,
) -> bool {
    let Some(world_from_entity) = transforms.world_from_entity(entity) else {
        return false;
    };

    let translation = Vec3::Z * cylinder_radius(&world_from_entity);
    apply_per_vertex(data, count, stride, |position| {
        cylinder_wrap_point(position - translation, radius) + translation
    });
    true
}

/// Deforms the vertex buffer of `entity` according to its deformer. Returns
/// whether the buffer was handled.
pub(crate) fn deform_mesh(
    state: &mut DeformState,
    transforms: &dyn TransformView,
    entity: Entity,
    data: &mut [f32],
    count: usize,
    stride: usize,
) -> bool {
    // The nominal case is an entity with a deformed record. The legacy case has
    // no deformed record, only a global cylinder deformer on the entity itself.
    if let Some(deformed) = state.deformed.get(entity) {
        let deformer_entity = deformed.deformer;
        let deformer = deformer_entity.and_then(|d| state.deformers.get(d));

        match (deformer_entity, deformer.map(|d| d.mode)) {
            (Some(deformer_entity), Some(DeformMode::CylinderBend)) => {
                let aabb = compute_bounding_box(data, count, stride);
                if let Some(deformed) = state.deformed.get_mut(entity) {
                    deformed.undeformed_aabb = aabb;
                }
                cylinder_bend_mesh(state, transforms, entity, deformer_entity, data, count, stride)
            }
            // Waypoint deformation deliberately does not deform the mesh.
            (_, Some(DeformMode::Waypoint)) => true,
            _ => {
                log::error!("Invalid deformer, skipping deformation for entity: {}", entity);
                false
            }
        }
    } else {
        match state.deformers.get(entity) {
            Some(deformer) if deformer.mode == DeformMode::GlobalCylinder => {
                global_cylinder_mesh(transforms, entity, deformer.radius, data, count, stride)
            }
            _ => {
                log::error!("Invalid deformer, skipping deformation for entity: {}", entity);
                false
            }
        }
    }
}
