//! Lookup Index: resolves an identifier to the container that owns it.
//!
//! The index keeps an item -> container map next to the board so owner
//! resolution is O(1). It is rebuilt from scratch when a snapshot is loaded
//! and updated incrementally by every snapshot mutation afterwards.

use crate::types::{Container, ContainerId, ItemId};
use indexmap::IndexMap;
use std::collections::HashMap;

/// What an arbitrary identifier names on the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The id is a container id (a drop onto the container's empty area)
    Container(ContainerId),
    /// The id is an item id, held by `container`
    Item {
        item: ItemId,
        container: ContainerId,
    },
}

impl Target {
    /// The container this target resolves to
    pub fn container(&self) -> &ContainerId {
        match self {
            Self::Container(id) => id,
            Self::Item { container, .. } => container,
        }
    }
}

/// Secondary item -> owning container map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupIndex {
    owners: HashMap<ItemId, ContainerId>,
}

impl LookupIndex {
    /// Build the index for a set of containers.
    ///
    /// Later duplicates overwrite earlier ones; callers reject duplicate ids
    /// before building.
    pub fn build(containers: &IndexMap<ContainerId, Container>) -> Self {
        let owners = containers
            .values()
            .flat_map(|container| {
                container
                    .items
                    .iter()
                    .map(|item| (item.id.clone(), container.id.clone()))
            })
            .collect();
        Self { owners }
    }

    /// Container that holds the item, if the item is known
    pub fn owner(&self, item: &str) -> Option<&ContainerId> {
        self.owners.get(item)
    }

    /// Record that `item` now lives in `container`
    pub fn relocate(&mut self, item: ItemId, container: ContainerId) {
        self.owners.insert(item, container);
    }

    pub fn contains_item(&self, item: &str) -> bool {
        self.owners.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Classify an identifier against the containers it indexes.
    ///
    /// Container ids win over item ids, which encodes a drop onto the empty
    /// area of a container. Unknown ids resolve to `None`.
    pub fn resolve(
        &self,
        containers: &IndexMap<ContainerId, Container>,
        id: &str,
    ) -> Option<Target> {
        if let Some((key, _)) = containers.get_key_value(id) {
            return Some(Target::Container(key.clone()));
        }
        self.owners
            .get_key_value(id)
            .map(|(item, container)| Target::Item {
                item: item.clone(),
                container: container.clone(),
            })
    }

    /// `resolveContainer(id)`: the owning container of any identifier
    pub fn resolve_container(
        &self,
        containers: &IndexMap<ContainerId, Container>,
        id: &str,
    ) -> Option<ContainerId> {
        self.resolve(containers, id)
            .map(|target| target.container().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;

    fn containers() -> IndexMap<ContainerId, Container> {
        [
            Container::new("todo", "To Do")
                .with_items([Item::new("a", "todo", "A"), Item::new("b", "todo", "B")]),
            Container::new("done", "Done"),
        ]
        .into_iter()
        .map(|c| (c.id.clone(), c))
        .collect()
    }

    #[test]
    fn test_resolve_container_id_directly() {
        let containers = containers();
        let index = LookupIndex::build(&containers);
        assert_eq!(
            index.resolve(&containers, "done"),
            Some(Target::Container("done".into()))
        );
        assert_eq!(
            index.resolve_container(&containers, "done"),
            Some("done".into())
        );
    }

    #[test]
    fn test_resolve_item_to_owner() {
        let containers = containers();
        let index = LookupIndex::build(&containers);
        assert_eq!(
            index.resolve(&containers, "b"),
            Some(Target::Item {
                item: "b".into(),
                container: "todo".into()
            })
        );
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_resolve_unknown_is_none() {
        let containers = containers();
        let index = LookupIndex::build(&containers);
        assert_eq!(index.resolve(&containers, "nope"), None);
        assert_eq!(index.resolve_container(&containers, ""), None);
    }

    #[test]
    fn test_relocate_updates_owner() {
        let containers = containers();
        let mut index = LookupIndex::build(&containers);
        index.relocate("a".into(), "done".into());
        assert_eq!(index.owner("a"), Some(&ContainerId::from("done")));
    }
}
