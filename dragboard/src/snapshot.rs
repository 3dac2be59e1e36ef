//! Board Snapshot: the immutable-per-version view of every container.
//!
//! A snapshot is never mutated once published. Every change produces a new
//! snapshot that callers swap in whole, usually behind an `Arc`, so a reader
//! never observes a half-applied move.

use crate::error::{BoardError, Result};
use crate::lookup::{LookupIndex, Target};
use crate::types::{Container, ContainerId, Item, ItemId, Placement};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use tracing::warn;

/// The complete state of all containers and their item orders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardSnapshot {
    containers: IndexMap<ContainerId, Container>,
    index: LookupIndex,
}

impl BoardSnapshot {
    /// A board with no containers
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from the containers returned by `fetchBoard`.
    ///
    /// The item order of each container is taken as authoritative. Duplicate
    /// container or item ids are rejected. An item whose `container_id`
    /// disagrees with the container holding it is repaired to match.
    pub fn from_containers(containers: impl IntoIterator<Item = Container>) -> Result<Self> {
        let mut map = IndexMap::new();
        let mut seen_items = HashSet::new();

        for mut container in containers {
            for item in &mut container.items {
                if !seen_items.insert(item.id.clone()) {
                    return Err(BoardError::duplicate_id("item", item.id.as_str()));
                }
                if item.container_id != container.id {
                    warn!(
                        item = %item.id,
                        claimed = %item.container_id,
                        actual = %container.id,
                        "repairing item container id"
                    );
                    item.container_id = container.id.clone();
                }
            }

            if map.contains_key(&container.id) {
                return Err(BoardError::duplicate_id("container", container.id.as_str()));
            }
            map.insert(container.id.clone(), container);
        }

        let index = LookupIndex::build(&map);
        Ok(Self {
            containers: map,
            index,
        })
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Containers in board order
    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    pub fn container(&self, id: &str) -> Option<&Container> {
        self.containers.get(id)
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Total number of items across all containers
    pub fn item_count(&self) -> usize {
        self.index.len()
    }

    /// Look up an item by id
    pub fn item(&self, id: &str) -> Option<&Item> {
        let owner = self.index.owner(id)?;
        self.containers
            .get(owner)?
            .items
            .iter()
            .find(|item| item.id == *id)
    }

    /// Classify an identifier as a container, an item, or unknown
    pub fn resolve(&self, id: &str) -> Option<Target> {
        self.index.resolve(&self.containers, id)
    }

    /// Owning container of an item id, or the id itself if it names a container
    pub fn resolve_container(&self, id: &str) -> Option<ContainerId> {
        self.index.resolve_container(&self.containers, id)
    }

    /// Current placement of an item.
    ///
    /// The owner comes from the lookup index; the index within the container
    /// is a linear scan of that one container.
    pub fn position_of(&self, item: &str) -> Option<Placement> {
        let owner = self.index.owner(item)?;
        let index = self.containers.get(owner)?.index_of(item)?;
        Some(Placement::new(owner.clone(), index))
    }

    /// Every item id, container by container, in display order
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.containers
            .values()
            .flat_map(|container| container.items.iter().map(|item| item.id.clone()))
            .collect()
    }

    // =========================================================================
    // New versions
    // =========================================================================

    /// A new snapshot with `container` added after the existing ones
    pub fn with_container(&self, container: Container) -> Result<Self> {
        if self.containers.contains_key(&container.id) {
            return Err(BoardError::duplicate_id("container", container.id.as_str()));
        }
        if let Some(item) = container
            .items
            .iter()
            .find(|item| self.index.contains_item(item.id.as_str()))
        {
            return Err(BoardError::duplicate_id("item", item.id.as_str()));
        }

        let mut next = self.clone();
        let container = Container::new(container.id.clone(), container.name.clone())
            .with_items(container.items);
        for item in &container.items {
            next.index.relocate(item.id.clone(), container.id.clone());
        }
        next.containers.insert(container.id.clone(), container);
        Ok(next)
    }

    /// A new snapshot with `item` appended to the end of its container
    pub fn with_item(&self, mut item: Item) -> Result<Self> {
        if self.index.contains_item(item.id.as_str()) {
            return Err(BoardError::duplicate_id("item", item.id.as_str()));
        }

        let mut next = self.clone();
        let container = next
            .containers
            .get_mut(item.container_id.as_str())
            .ok_or_else(|| BoardError::container_not_found(item.container_id.as_str()))?;
        item.container_id = container.id.clone();
        next.index
            .relocate(item.id.clone(), container.id.clone());
        container.items.push(item);
        Ok(next)
    }

    /// Move an item between two resolved placements.
    ///
    /// `from` must be the item's current placement and `to.index` must be
    /// valid for the destination once the item is removed from `from`.
    pub(crate) fn relocated(&self, item: &ItemId, from: &Placement, to: &Placement) -> Self {
        let mut next = self.clone();

        let mut moving = match next.containers.get_mut(from.container.as_str()) {
            Some(source) if from.index < source.items.len() => source.items.remove(from.index),
            _ => return next,
        };
        debug_assert_eq!(moving.id, *item);

        let Some(destination) = next.containers.get_mut(to.container.as_str()) else {
            return self.clone();
        };
        moving.container_id = destination.id.clone();
        let index = to.index.min(destination.items.len());
        destination.items.insert(index, moving);
        next.index.relocate(item.clone(), to.container.clone());
        next
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Verify the membership invariants:
    ///
    /// 1. every item id appears in exactly one container's sequence,
    /// 2. `item.container_id` names the container holding it,
    /// 3. the lookup index agrees with the sequences.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for container in self.containers.values() {
            for item in &container.items {
                if !seen.insert(item.id.as_str()) {
                    return Err(BoardError::invariant(format!(
                        "item {} appears more than once",
                        item.id
                    )));
                }
                if item.container_id != container.id {
                    return Err(BoardError::invariant(format!(
                        "item {} claims container {} but is held by {}",
                        item.id, item.container_id, container.id
                    )));
                }
                if self.index.owner(item.id.as_str()) != Some(&container.id) {
                    return Err(BoardError::invariant(format!(
                        "lookup index disagrees on the owner of {}",
                        item.id
                    )));
                }
            }
        }
        if seen.len() != self.index.len() {
            return Err(BoardError::invariant(format!(
                "lookup index tracks {} items but the board holds {}",
                self.index.len(),
                seen.len()
            )));
        }
        Ok(())
    }
}

impl Serialize for BoardSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.containers.values())
    }
}
