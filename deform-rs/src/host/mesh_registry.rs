use std::collections::HashMap;

use super::{DeformMeshFn, Entity, RenderSystem, TransformView};

struct Mesh {
    vertices: Vec<f32>,
    stride: usize,
    built: bool,
}

impl Mesh {
    fn vertex_count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.vertices.len() / self.stride
        }
    }
}

/// A minimal render system holding one vertex buffer per entity.
///
/// Meshes are built lazily: the first [MeshRegistry::build_mesh] runs the
/// entity's deformation function over the buffer, later builds return the
/// already built buffer.
#[derive(Default)]
pub struct MeshRegistry {
    meshes: HashMap<Entity, Mesh>,
    deformation_fns: HashMap<Entity, DeformMeshFn>,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the authored vertex buffer of `entity`, with `stride` floats per
    /// vertex and the position in the first three.
    pub fn set_mesh(&mut self, entity: Entity, vertices: Vec<f32>, stride: usize) {
        self.meshes.insert(
            entity,
            Mesh {
                vertices,
                stride,
                built: false,
            },
        );
    }

    pub fn has_deformation_fn(&self, entity: Entity) -> bool {
        self.deformation_fns.contains_key(&entity)
    }

    /// Whether the mesh of `entity` is still waiting for its first build.
    pub fn is_deferred(&self, entity: Entity) -> bool {
        self.meshes.get(&entity).is_some_and(|mesh| !mesh.built)
    }

    pub fn build_mesh(&mut self, entity: Entity, transforms: &dyn TransformView) -> Option<&[f32]> {
        let mesh = self.meshes.get_mut(&entity)?;

        if !mesh.built {
            mesh.built = true;
            if let Some(deform) = self.deformation_fns.get(&entity) {
                let count = mesh.vertex_count();
                if !deform(transforms, mesh.vertices.as_mut_slice(), count, mesh.stride) {
                    log::debug!("Mesh of {} was built without deformation", entity);
                }
            }
        }

        Some(&mesh.vertices)
    }

    pub fn remove_mesh(&mut self, entity: Entity) {
        self.meshes.remove(&entity);
        self.deformation_fns.remove(&entity);
    }
}

impl RenderSystem for MeshRegistry {
    fn set_deformation_fn(&mut self, entity: Entity, function: Option<DeformMeshFn>) {
        match function {
            Some(function) => {
                self.deformation_fns.insert(entity, function);
            }
            None => {
                self.deformation_fns.remove(&entity);
            }
        }
    }
}
