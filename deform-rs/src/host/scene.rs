use std::collections::HashMap;

use glam::Mat4;
use indextree::{Arena, NodeId};

use super::{Entity, ParentChangedEvent, TransformSystem, TransformView, WorldFromEntityFn};
use crate::math::{compose_with_parent, Sqt};

struct SceneNode {
    entity: Entity,
    local: Sqt,
    world: Mat4,
    world_from_entity_fn: Option<WorldFromEntityFn>,
}

/// A minimal transform system: a forest of entities with local SQTs, whose
/// world matrices are recomputed parent-first by [SceneGraph::update].
#[derive(Default)]
pub struct SceneGraph {
    nodes: Arena<SceneNode>,
    node_ids: HashMap<Entity, NodeId>,
    next_entity: u32,
    events: Vec<ParentChangedEvent>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_entity(&mut self, local: Sqt, parent: Option<Entity>) -> Entity {
        let entity = Entity(self.next_entity);
        self.next_entity += 1;

        let node = self.nodes.new_node(SceneNode {
            entity,
            local,
            world: Mat4::IDENTITY,
            world_from_entity_fn: None,
        });
        self.node_ids.insert(entity, node);

        if let Some(parent) = parent.and_then(|parent| self.node_ids.get(&parent).copied()) {
            if let Err(err) = parent.checked_append(node, &mut self.nodes) {
                log::error!("Could not attach {} to its parent: {}", entity, err);
            }
        }

        entity
    }

    /// Moves `entity` under `new_parent` and queues a [ParentChangedEvent].
    /// Returns false if the move would create a cycle or an entity is unknown.
    pub fn set_parent(&mut self, entity: Entity, new_parent: Option<Entity>) -> bool {
        let Some(&node) = self.node_ids.get(&entity) else {
            return false;
        };
        let old_parent = self.parent(entity);
        if old_parent == new_parent {
            return true;
        }

        let parent_node = match new_parent {
            Some(parent) => match self.node_ids.get(&parent) {
                Some(&parent_node) => Some(parent_node),
                None => return false,
            },
            None => None,
        };

        if let Some(parent_node) = parent_node {
            if parent_node.ancestors(&self.nodes).any(|ancestor| ancestor == node) {
                log::error!("Cannot parent {} under its own descendant", entity);
                return false;
            }
        }

        node.detach(&mut self.nodes);
        if let Some(parent_node) = parent_node {
            if let Err(err) = parent_node.checked_append(node, &mut self.nodes) {
                log::error!("Could not attach {}: {}", entity, err);
                return false;
            }
        }

        self.events.push(ParentChangedEvent {
            target: entity,
            old_parent,
            new_parent,
        });
        true
    }

    pub fn set_local_sqt(&mut self, entity: Entity, local: Sqt) {
        if let Some(&node) = self.node_ids.get(&entity) {
            self.nodes[node].get_mut().local = local;
        }
    }

    /// Removes `entity` and all of its descendants, returning them parent-first.
    pub fn destroy_entity(&mut self, entity: Entity) -> Vec<Entity> {
        let Some(&node) = self.node_ids.get(&entity) else {
            return Vec::new();
        };

        let removed: Vec<Entity> = node
            .descendants(&self.nodes)
            .map(|id| self.nodes[id].get().entity)
            .collect();
        node.remove_subtree(&mut self.nodes);
        for entity in &removed {
            self.node_ids.remove(entity);
        }
        removed
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.node_ids.contains_key(&entity)
    }

    pub fn has_world_from_entity_fn(&self, entity: Entity) -> bool {
        self.node_ids
            .get(&entity)
            .is_some_and(|&node| self.nodes[node].get().world_from_entity_fn.is_some())
    }

    /// Takes every parent change queued since the last call.
    pub fn drain_events(&mut self) -> Vec<ParentChangedEvent> {
        std::mem::take(&mut self.events)
    }

    /// Recomputes all world matrices, visiting every parent before its children.
    pub fn update(&mut self) {
        let mut roots: Vec<(Entity, NodeId)> = self
            .node_ids
            .iter()
            .filter(|(_, node)| self.nodes[**node].parent().is_none())
            .map(|(&entity, &node)| (entity, node))
            .collect();
        roots.sort_unstable();

        let order: Vec<NodeId> = roots
            .iter()
            .flat_map(|(_, root)| root.descendants(&self.nodes))
            .collect();

        for node_id in order {
            let world = {
                let scene: &SceneGraph = self;
                let node = scene.nodes[node_id].get();
                let parent_world = scene.nodes[node_id]
                    .parent()
                    .map(|parent| scene.nodes[parent].get().world);

                match &node.world_from_entity_fn {
                    Some(function) => function(scene, &node.local, parent_world.as_ref()),
                    None => compose_with_parent(&node.local, parent_world.as_ref()),
                }
            };

            self.nodes[node_id].get_mut().world = world;
        }
    }
}

impl TransformView for SceneGraph {
    fn parent(&self, entity: Entity) -> Option<Entity> {
        let node = *self.node_ids.get(&entity)?;
        let parent = self.nodes[node].parent()?;
        Some(self.nodes[parent].get().entity)
    }

    fn world_from_entity(&self, entity: Entity) -> Option<Mat4> {
        let node = *self.node_ids.get(&entity)?;
        Some(self.nodes[node].get().world)
    }

    fn local_sqt(&self, entity: Entity) -> Option<Sqt> {
        let node = *self.node_ids.get(&entity)?;
        Some(self.nodes[node].get().local)
    }
}

impl TransformSystem for SceneGraph {
    fn children(&self, entity: Entity) -> Vec<Entity> {
        match self.node_ids.get(&entity) {
            Some(&node) => node
                .children(&self.nodes)
                .map(|child| self.nodes[child].get().entity)
                .collect(),
            None => Vec::new(),
        }
    }

    fn set_world_from_entity_fn(&mut self, entity: Entity, function: Option<WorldFromEntityFn>) {
        if let Some(&node) = self.node_ids.get(&entity) {
            self.nodes[node].get_mut().world_from_entity_fn = function;
        }
    }
}
