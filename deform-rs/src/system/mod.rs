mod derive;
mod node;
mod path;
mod store;

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use glam::Mat4;

use crate::{
    data::{ComponentDef, DeformMode, DeformedDef, DeformerDef},
    host::{
        DeformMeshFn, Entity, ParentChangedEvent, RenderSystem, TransformSystem, TransformView,
        WorldFromEntityFn,
    },
    math::{compose_with_parent, Aabb, Sqt},
    DefinitionError,
};

use self::derive::{
    cylinder_bend_world_matrix, deform_mesh, global_cylinder_matrix, waypoint_world_matrix,
};

pub use self::{
    node::{Deformed, Deformer, PathId, Waypoint, WaypointPath},
    path::build_waypoint_path,
    store::ComponentPool,
};

#[derive(Debug, Default)]
pub(crate) struct DeformState {
    pub deformers: ComponentPool<Deformer>,
    pub deformed: ComponentPool<Deformed>,
}

/// Non-destructively bends entity hierarchies around cylinders or along
/// waypoint paths.
///
/// The system keeps two transforms per deformed entity: the authored,
/// undeformed one (cached as a chain up to the deformer) and the deformed one
/// the transform system computes through the function installed here. Meshes
/// are deformed once, when the render system first builds them.
///
/// Installed callbacks look records up by entity on every call, so the system
/// can be moved freely and records can be created and destroyed between
/// calls. Everything runs on the caller's thread.
#[derive(Debug, Default)]
pub struct DeformSystem {
    state: Rc<RefCell<DeformState>>,
}

impl DeformSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the component described by `def` on `entity`.
    pub fn create(
        &mut self,
        entity: Entity,
        def: &ComponentDef,
        transforms: &mut impl TransformSystem,
        render: &mut impl RenderSystem,
    ) -> Result<(), DefinitionError> {
        match def {
            ComponentDef::Deformer(def) => self.create_deformer(entity, def, transforms, render),
            ComponentDef::Deformed(def) => {
                self.create_deformed(entity, def, transforms, render);
                Ok(())
            }
        }
    }

    /// Makes `entity` a deformer. The entity is also marked as deformed, since
    /// a deformer may itself sit below another deformer.
    ///
    /// Paths that fail to build are logged and skipped; the rest of the
    /// deformer is still created.
    pub fn create_deformer(
        &mut self,
        entity: Entity,
        def: &DeformerDef,
        transforms: &mut impl TransformSystem,
        render: &mut impl RenderSystem,
    ) -> Result<(), DefinitionError> {
        if def.deform_mode == DeformMode::Waypoint && def.waypoint_paths.is_empty() {
            let err = DefinitionError::MissingWaypointPaths;
            log::error!("Cannot create deformer on {}: {}", entity, err);
            return Err(err);
        }

        let mut paths = HashMap::new();
        if def.deform_mode == DeformMode::Waypoint {
            for path_def in &def.waypoint_paths {
                let path = match build_waypoint_path(path_def) {
                    Ok(path) => path,
                    Err(err) => {
                        log::error!("Skipping path on deformer {}: {}", entity, err);
                        continue;
                    }
                };

                if paths.contains_key(&path.path_id) {
                    let err = DefinitionError::DuplicatePath(path_def.path_id.clone());
                    log::error!("Skipping path on deformer {}: {}", entity, err);
                    continue;
                }
                paths.insert(path.path_id, path);
            }
        }

        {
            let mut state = self.state.borrow_mut();
            let deformer = Deformer {
                mode: def.deform_mode,
                radius: def.horizontal_radius,
                clamp_angle: def.clamp_angle,
                paths,
            };
            if state.deformers.emplace(entity, deformer).is_none() {
                let err = DefinitionError::DuplicateDeformer(entity);
                log::error!("{}", err);
                return Err(err);
            }
            state.deformed.emplace(entity, Deformed::new(PathId::default()));
        }

        self.assign_deformer(entity, Some(entity), transforms);
        self.set_deformation_fn(entity, render);
        Ok(())
    }

    pub fn create_deformed(
        &mut self,
        entity: Entity,
        def: &DeformedDef,
        transforms: &mut impl TransformSystem,
        render: &mut impl RenderSystem,
    ) {
        let path_id = def.waypoint_path_id.as_deref().unwrap_or_default();
        self.set_as_deformed(entity, path_id, transforms, render);
    }

    /// Marks `entity` as deformed by whatever deforms its parent, following
    /// the path named `path_id` under waypoint deformers. If `entity` is
    /// already deformed only its path is updated.
    pub fn set_as_deformed(
        &mut self,
        entity: Entity,
        path_id: &str,
        transforms: &mut impl TransformSystem,
        render: &mut impl RenderSystem,
    ) {
        let path_id = PathId::from_name(path_id);
        let parent_deformer = {
            let mut state = self.state.borrow_mut();
            if state.deformed.emplace(entity, Deformed::new(path_id)).is_none() {
                if let Some(deformed) = state.deformed.get_mut(entity) {
                    deformed.path_id = path_id;
                }
                return;
            }

            transforms
                .parent(entity)
                .and_then(|parent| state.deformed.get(parent))
                .map(|parent_deformed| parent_deformed.deformer)
        };

        if let Some(deformer) = parent_deformer {
            self.assign_deformer(entity, deformer, transforms);
        }
        self.set_deformation_fn(entity, render);
    }

    /// Removes both components from `entity`, first clearing the deformer of
    /// its whole deformed subtree.
    pub fn destroy(
        &mut self,
        entity: Entity,
        transforms: &mut impl TransformSystem,
        render: &mut impl RenderSystem,
    ) {
        if self.is_set_as_deformed(entity) {
            self.assign_deformer(entity, None, transforms);
        }
        render.set_deformation_fn(entity, None);

        let mut state = self.state.borrow_mut();
        state.deformers.destroy(entity);
        state.deformed.destroy(entity);
    }

    /// Reassigns deformers after `event.target` moved to a new parent.
    pub fn on_parent_changed(
        &mut self,
        event: &ParentChangedEvent,
        transforms: &mut impl TransformSystem,
    ) {
        let deformer = {
            let state = self.state.borrow();
            if !state.deformed.contains(event.target) {
                return;
            }

            // A deformer keeps deforming its own subtree, anything else takes
            // on the deformer of its new parent.
            if state.deformers.contains(event.target) {
                Some(event.target)
            } else {
                event
                    .new_parent
                    .and_then(|parent| state.deformed.get(parent))
                    .and_then(|parent_deformed| parent_deformed.deformer)
            }
        };

        if !self.assign_deformer(event.target, deformer, transforms) {
            // Same deformer, but the undeformed chain now runs through a
            // different parent.
            self.mark_chains_dirty(event.target, &*transforms);
        }
    }

    pub fn is_set_as_deformed(&self, entity: Entity) -> bool {
        self.state.borrow().deformed.contains(entity)
    }

    /// Whether `entity` is deformed and its deformer still exists.
    pub fn is_deformed(&self, entity: Entity) -> bool {
        self.effective_deformer(entity, |_| ()).is_some()
    }

    /// Radius of the deformer affecting `entity`, 0 if there is none.
    pub fn deform_radius(&self, entity: Entity) -> f32 {
        self.effective_deformer(entity, |deformer| deformer.radius)
            .unwrap_or(0.0)
    }

    pub fn deform_mode(&self, entity: Entity) -> DeformMode {
        self.effective_deformer(entity, |deformer| deformer.mode)
            .unwrap_or_default()
    }

    /// Bounds of the mesh of `entity` before it was bent. Only filled in once
    /// the mesh has been built under a cylinder bend deformer.
    pub fn undeformed_bounding_box(&self, entity: Entity) -> Option<Aabb> {
        self.state
            .borrow()
            .deformed
            .get(entity)
            .map(|deformed| deformed.undeformed_aabb)
    }

    /// The path named `path_id` on the deformer component of `entity`.
    pub fn waypoint_path(&self, entity: Entity, path_id: &str) -> Option<WaypointPath> {
        self.state
            .borrow()
            .deformers
            .get(entity)
            .and_then(|deformer| deformer.paths.get(&PathId::from_name(path_id)))
            .cloned()
    }

    fn effective_deformer<T>(&self, entity: Entity, f: impl FnOnce(&Deformer) -> T) -> Option<T> {
        let state = self.state.borrow();
        let deformer = state.deformed.get(entity)?.deformer?;
        state.deformers.get(deformer).map(f)
    }

    // Assigns `deformer` to `entity` and to every deformed descendant reachable
    // through deformed children. Parents are always handled before their
    // children, and the walk stops wherever the assignment is already in place.
    // Returns whether `entity` itself changed.
    fn assign_deformer(
        &self,
        entity: Entity,
        deformer: Option<Entity>,
        transforms: &mut impl TransformSystem,
    ) -> bool {
        let (deformer, mode) = {
            let state = self.state.borrow();
            match deformer.and_then(|d| state.deformers.get(d).map(|record| (d, record.mode))) {
                Some((d, mode)) => (Some(d), mode),
                None => (None, DeformMode::None),
            }
        };

        let mut changed_root = false;
        let mut stack = vec![entity];
        while let Some(current) = stack.pop() {
            {
                let mut state = self.state.borrow_mut();
                let Some(deformed) = state.deformed.get_mut(current) else {
                    continue;
                };
                if deformed.deformer == deformer {
                    continue;
                }
                deformed.deformer = deformer;
                deformed.chain_dirty = true;
            }

            changed_root |= current == entity;
            log::trace!("Assigning deformer {:?} to {}", deformer, current);
            transforms.set_world_from_entity_fn(current, self.world_from_entity_fn(current, mode));

            let state = self.state.borrow();
            let children = transforms.children(current);
            // Reversed so the first child is handled first.
            stack.extend(
                children
                    .into_iter()
                    .rev()
                    .filter(|&child| state.deformed.contains(child)),
            );
        }

        changed_root
    }

    fn mark_chains_dirty(&self, entity: Entity, transforms: &impl TransformSystem) {
        let mut state = self.state.borrow_mut();
        let mut stack = vec![entity];
        let mut visited = 0;
        while let Some(current) = stack.pop() {
            let Some(deformed) = state.deformed.get_mut(current) else {
                continue;
            };
            deformed.chain_dirty = true;

            visited += 1;
            if visited > state.deformed.len() {
                log::error!("Deformed hierarchy below {} loops", entity);
                return;
            }
            stack.extend(transforms.children(current));
        }
    }

    fn world_from_entity_fn(&self, entity: Entity, mode: DeformMode) -> Option<WorldFromEntityFn> {
        let state = Rc::clone(&self.state);
        let function: WorldFromEntityFn = match mode {
            DeformMode::None => return None,
            DeformMode::GlobalCylinder => Box::new(
                move |_: &dyn TransformView, local_sqt: &Sqt, world_from_parent: Option<&Mat4>| {
                    match state.try_borrow() {
                        Ok(state) => {
                            global_cylinder_matrix(&state, entity, local_sqt, world_from_parent)
                        }
                        Err(_) => busy_fallback(entity, local_sqt, world_from_parent),
                    }
                },
            ),
            DeformMode::CylinderBend => Box::new(
                move |transforms: &dyn TransformView,
                      local_sqt: &Sqt,
                      world_from_parent: Option<&Mat4>| {
                    match state.try_borrow_mut() {
                        Ok(mut state) => cylinder_bend_world_matrix(
                            &mut state,
                            transforms,
                            entity,
                            local_sqt,
                            world_from_parent,
                        ),
                        Err(_) => busy_fallback(entity, local_sqt, world_from_parent),
                    }
                },
            ),
            DeformMode::Waypoint => Box::new(
                move |transforms: &dyn TransformView,
                      local_sqt: &Sqt,
                      world_from_parent: Option<&Mat4>| {
                    match state.try_borrow_mut() {
                        Ok(mut state) => waypoint_world_matrix(
                            &mut state,
                            transforms,
                            entity,
                            local_sqt,
                            world_from_parent,
                        ),
                        Err(_) => busy_fallback(entity, local_sqt, world_from_parent),
                    }
                },
            ),
        };
        Some(function)
    }

    // Whether or not the entity ends up with a valid deformer, the function is
    // set so the render system defers building the mesh until it is first
    // drawn. It only needs to be set once per entity.
    fn set_deformation_fn(&self, entity: Entity, render: &mut impl RenderSystem) {
        let state = Rc::clone(&self.state);
        let function: DeformMeshFn = Box::new(
            move |transforms: &dyn TransformView, data: &mut [f32], count: usize, stride: usize| {
                match state.try_borrow_mut() {
                    Ok(mut state) => {
                        deform_mesh(&mut state, transforms, entity, data, count, stride)
                    }
                    Err(_) => {
                        log::error!("Deform state busy, skipping mesh deformation of {}", entity);
                        false
                    }
                }
            },
        );
        render.set_deformation_fn(entity, Some(function));
    }
}

fn busy_fallback(entity: Entity, local_sqt: &Sqt, world_from_parent: Option<&Mat4>) -> Mat4 {
    log::error!("Deform state busy, skipping deformation of {}", entity);
    compose_with_parent(local_sqt, world_from_parent)
}
