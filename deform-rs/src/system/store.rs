use std::collections::HashMap;

use crate::host::Entity;

/// Sparse component storage: densely packed records looked up by entity.
///
/// Records move when others are destroyed, so nothing should hold on to a
/// reference across calls. Look records up again by entity instead.
#[derive(Debug, Clone)]
pub struct ComponentPool<T> {
    components: Vec<T>,
    entities: Vec<Entity>,
    indices: HashMap<Entity, usize>,
}

impl<T> Default for ComponentPool<T> {
    fn default() -> Self {
        ComponentPool {
            components: Vec::new(),
            entities: Vec::new(),
            indices: HashMap::new(),
        }
    }
}

impl<T> ComponentPool<T> {
    /// Inserts `component` for `entity`. Returns `None`, and drops
    /// `component`, if `entity` already has one.
    pub fn emplace(&mut self, entity: Entity, component: T) -> Option<&mut T> {
        if self.indices.contains_key(&entity) {
            return None;
        }

        self.indices.insert(entity, self.components.len());
        self.entities.push(entity);
        self.components.push(component);
        self.components.last_mut()
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.indices.get(&entity).map(|&index| &self.components[index])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let index = *self.indices.get(&entity)?;
        Some(&mut self.components[index])
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.indices.contains_key(&entity)
    }

    pub fn destroy(&mut self, entity: Entity) -> Option<T> {
        let index = self.indices.remove(&entity)?;

        self.entities.swap_remove(index);
        let removed = self.components.swap_remove(index);
        // The former last record now lives at `index`.
        if let Some(&moved) = self.entities.get(index) {
            self.indices.insert(moved, index);
        }

        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emplace_reports_existing() {
        let mut pool = ComponentPool::default();
        assert!(pool.emplace(Entity(1), "first").is_some());
        assert!(pool.emplace(Entity(1), "second").is_none());
        assert_eq!(pool.get(Entity(1)), Some(&"first"));
    }

    #[test]
    fn test_destroy_keeps_lookups_valid() {
        let mut pool = ComponentPool::default();
        for i in 0..4 {
            pool.emplace(Entity(i), i * 10);
        }

        assert_eq!(pool.destroy(Entity(1)), Some(10));
        assert_eq!(pool.destroy(Entity(1)), None);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(Entity(0)), Some(&0));
        assert_eq!(pool.get(Entity(2)), Some(&20));
        assert_eq!(pool.get(Entity(3)), Some(&30));

        *pool.get_mut(Entity(3)).unwrap() += 1;
        assert_eq!(pool.get(Entity(3)), Some(&31));

        pool.destroy(Entity(3));
        pool.destroy(Entity(0));
        pool.destroy(Entity(2));
        assert!(pool.is_empty());
    }
}
