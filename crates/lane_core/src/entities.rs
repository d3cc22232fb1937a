//! Entity storage.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::components::{Entity, EntityId, Structure, StructureKind, Unit};
use crate::factions::Side;

/// Storage for all entities in a match.
///
/// Uses a `HashMap` for O(1) lookup by id, with deterministic iteration via
/// sorted keys whenever a system walks the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStore {
    entities: HashMap<EntityId, Entity>,
    next_id: EntityId,
}

impl EntityStore {
    /// Create an empty store. The first id handed out is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new entity and return its id.
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity by id. The id is never handed out again.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Get an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Id that the next insert will receive.
    #[must_use]
    pub fn next_id(&self) -> EntityId {
        self.next_id.max(1)
    }

    /// Sorted entity ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Entities in ascending id order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.entities.get(&id).map(|entity| (id, entity)))
    }

    /// Borrow a unit by id.
    #[must_use]
    pub fn unit(&self, id: EntityId) -> Option<&Unit> {
        self.get(id).and_then(Entity::as_unit)
    }

    /// Mutably borrow a unit by id.
    pub fn unit_mut(&mut self, id: EntityId) -> Option<&mut Unit> {
        self.get_mut(id).and_then(Entity::as_unit_mut)
    }

    /// Borrow a structure by id.
    #[must_use]
    pub fn structure(&self, id: EntityId) -> Option<&Structure> {
        self.get(id).and_then(Entity::as_structure)
    }

    /// Mutably borrow a structure by id.
    pub fn structure_mut(&mut self, id: EntityId) -> Option<&mut Structure> {
        self.get_mut(id).and_then(Entity::as_structure_mut)
    }

    /// Sorted ids of all units.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<EntityId> {
        self.iter_sorted()
            .filter(|(_, entity)| matches!(entity, Entity::Unit(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// Sorted ids of all structures, destroyed ones included.
    #[must_use]
    pub fn structure_ids(&self) -> Vec<EntityId> {
        self.iter_sorted()
            .filter(|(_, entity)| matches!(entity, Entity::Structure(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// Live units of a side, in id order.
    pub fn units_of(&self, side: Side) -> impl Iterator<Item = (EntityId, &Unit)> {
        self.iter_sorted().filter_map(move |(id, entity)| match entity {
            Entity::Unit(unit) if unit.side == side && !unit.health.is_dead() => Some((id, unit)),
            _ => None,
        })
    }

    /// Live structures of a side, in id order.
    pub fn structures_of(&self, side: Side) -> impl Iterator<Item = (EntityId, &Structure)> {
        self.iter_sorted().filter_map(move |(id, entity)| match entity {
            Entity::Structure(s) if s.side == side && s.is_alive() => Some((id, s)),
            _ => None,
        })
    }

    /// Whether any of a side's towers is still standing.
    #[must_use]
    pub fn has_live_tower(&self, side: Side) -> bool {
        self.entities.values().any(|entity| {
            matches!(entity, Entity::Structure(s)
                if s.side == side && s.kind == StructureKind::Tower && s.is_alive())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CardCatalog;
    use crate::math::Vec2Fixed;

    fn knight(side: Side) -> Entity {
        let catalog = CardCatalog::default_catalog();
        let card = catalog.get("knight").expect("knight");
        Entity::Unit(Unit::from_card(card, side, Vec2Fixed::from_ints(100, 500)))
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut store = EntityStore::new();
        let a = store.insert(knight(Side::Player));
        let b = store.insert(knight(Side::Player));
        assert!(store.remove(b).is_some());
        let c = store.insert(knight(Side::Opponent));
        assert_eq!((a, b, c), (1, 2, 3));
        assert!(!store.contains(b));
    }

    #[test]
    fn test_sorted_iteration() {
        let mut store = EntityStore::new();
        for _ in 0..20 {
            store.insert(knight(Side::Player));
        }
        let ids = store.sorted_ids();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(store.units_of(Side::Player).count(), 20);
        assert_eq!(store.units_of(Side::Opponent).count(), 0);
    }

    #[test]
    fn test_dead_units_are_not_listed_as_live() {
        let mut store = EntityStore::new();
        let id = store.insert(knight(Side::Player));
        if let Some(unit) = store.unit_mut(id) {
            unit.health.current = 0;
        }
        assert_eq!(store.units_of(Side::Player).count(), 0);
        assert_eq!(store.unit_ids(), vec![id]);
    }
}
