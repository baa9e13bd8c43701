//! The per-repository table cache and the list arithmetic done on it.

use docstore_types::{Entity, EntityId, FIRST_ENTITY_ID};

/// In-memory mirror of one table.
///
/// Starts `Unloaded` and moves to `Loaded` on the repository's first
/// operation. There is no way back: once loaded, the cache is the
/// authority for its table for as long as the repository lives.
#[derive(Clone, Debug, PartialEq)]
pub enum TableCache<T> {
    Unloaded,
    Loaded(Vec<T>),
}

impl<T> Default for TableCache<T> {
    fn default() -> Self {
        Self::Unloaded
    }
}

impl<T: Entity> TableCache<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Cached records in storage order, if loaded.
    pub fn entities(&self) -> Option<&[T]> {
        match self {
            Self::Loaded(entities) => Some(entities),
            Self::Unloaded => None,
        }
    }

    /// Move to `Loaded` with `entities` and hand back the list.
    pub fn insert(&mut self, entities: Vec<T>) -> &mut Vec<T> {
        *self = Self::Loaded(entities);
        match self {
            Self::Loaded(entities) => entities,
            Self::Unloaded => unreachable!("cache was just loaded"),
        }
    }

    /// Take the loaded list out, leaving the cache `Unloaded`.
    pub(crate) fn take(&mut self) -> Option<Vec<T>> {
        match std::mem::replace(self, Self::Unloaded) {
            Self::Loaded(entities) => Some(entities),
            Self::Unloaded => None,
        }
    }
}

/// Id for the next record: one past the largest id, or [`FIRST_ENTITY_ID`]
/// for an empty table.
pub fn next_id<T: Entity>(entities: &[T]) -> EntityId {
    entities
        .iter()
        .map(|e| e.id())
        .max()
        .map_or(FIRST_ENTITY_ID, |max| max + 1)
}

/// Position of the first record with `id`.
pub fn position_of<T: Entity>(entities: &[T], id: EntityId) -> Option<usize> {
    entities.iter().position(|e| e.id() == id)
}

/// Copy of `entities` ordered by ascending id. Ties keep storage order.
pub fn sorted_by_id<T: Entity>(entities: &[T]) -> Vec<T> {
    let mut sorted = entities.to_vec();
    sorted.sort_by_key(|e| e.id());
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_types::Customer;

    fn customers(ids: &[EntityId]) -> Vec<Customer> {
        ids.iter()
            .map(|&id| Customer { id, name: format!("c{id}") })
            .collect()
    }

    #[test]
    fn next_id_of_empty_table_is_seed() {
        assert_eq!(next_id::<Customer>(&[]), FIRST_ENTITY_ID);
    }

    #[test]
    fn next_id_follows_max_not_count() {
        assert_eq!(next_id(&customers(&[7, 2, 40, 3])), 41);
        assert_eq!(next_id(&customers(&[0])), 1);
    }

    #[test]
    fn position_of_finds_first_match() {
        let list = customers(&[5, 9, 9]);
        assert_eq!(position_of(&list, 9), Some(1));
        assert_eq!(position_of(&list, 4), None);
    }

    #[test]
    fn sorted_by_id_is_stable() {
        let mut list = customers(&[3, 1, 2]);
        list.push(Customer { id: 1, name: "second one".into() });

        let sorted = sorted_by_id(&list);
        let ids: Vec<_> = sorted.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 1, 2, 3]);
        assert_eq!(sorted[0].name, "c1");
        assert_eq!(sorted[1].name, "second one");
    }

    #[test]
    fn cache_transitions() {
        let mut cache = TableCache::<Customer>::default();
        assert!(!cache.is_loaded());
        assert!(cache.entities().is_none());

        cache.insert(customers(&[1])).push(Customer::new("x"));
        assert!(cache.is_loaded());
        assert_eq!(cache.entities().map(<[Customer]>::len), Some(2));

        assert_eq!(cache.take().map(|v| v.len()), Some(2));
        assert!(!cache.is_loaded());
    }
}
