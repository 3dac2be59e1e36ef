//! Placement types: where an item sits, or should land, on the board.

use super::ids::{ContainerId, ItemId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requested slot within a container's sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetIndex {
    /// Land at this index; values past the end are treated as `Append`
    At(usize),
    /// Land after the last item
    Append,
}

impl TargetIndex {
    /// Concrete index in a sequence of `len` items, clamped to an append
    pub fn clamp(self, len: usize) -> usize {
        match self {
            Self::At(index) => index.min(len),
            Self::Append => len,
        }
    }
}

/// A resolved slot: the container and the index the item occupies there
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub container: ContainerId,
    pub index: usize,
}

impl Placement {
    pub fn new(container: impl Into<ContainerId>, index: usize) -> Self {
        Self {
            container: container.into(),
            index,
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.container, self.index)
    }
}

/// A requested destination before it is resolved against a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub container: ContainerId,
    pub index: TargetIndex,
}

impl Destination {
    pub fn new(container: impl Into<ContainerId>, index: TargetIndex) -> Self {
        Self {
            container: container.into(),
            index,
        }
    }

    /// Destination after the last item of a container
    pub fn append(container: impl Into<ContainerId>) -> Self {
        Self::new(container, TargetIndex::Append)
    }

    /// Destination at an explicit index of a container
    pub fn at(container: impl Into<ContainerId>, index: usize) -> Self {
        Self::new(container, TargetIndex::At(index))
    }
}

impl From<Placement> for Destination {
    fn from(placement: Placement) -> Self {
        Self::at(placement.container, placement.index)
    }
}

/// The remote persistence instruction: `moveItem(itemId, containerId, index)`.
///
/// Instructions are absolute, so submitting one twice has the same effect
/// as submitting it once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveInstruction {
    #[serde(rename = "id")]
    pub item: ItemId,
    #[serde(rename = "columnId")]
    pub container: ContainerId,
    #[serde(rename = "position")]
    pub index: usize,
}

impl MoveInstruction {
    pub fn new(item: impl Into<ItemId>, container: impl Into<ContainerId>, index: usize) -> Self {
        Self {
            item: item.into(),
            container: container.into(),
            index,
        }
    }

    /// The placement this instruction asks the store to reach
    pub fn placement(&self) -> Placement {
        Placement::new(self.container.clone(), self.index)
    }
}

impl fmt::Display for MoveInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "move {} -> {}[{}]", self.item, self.container, self.index)
    }
}
