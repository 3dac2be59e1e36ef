//! Reorder Engine: the pure `(snapshot, move) -> snapshot'` transition.
//!
//! Both the hover preview and the drop commit go through [`resolve_destination`]
//! and [`apply_move`], so what the user last saw is what gets committed.
//!
//! Index rules:
//! - a container id as target means [`TargetIndex::Append`](crate::types::TargetIndex::Append),
//! - an item id as target means that item's index in its container before
//!   the move; the moved item ends up at exactly that index. Within one
//!   container this is a stable array-move, so moving down lands after the
//!   target and moving up lands before it.

use crate::lookup::Target;
use crate::snapshot::BoardSnapshot;
use crate::types::{Destination, ItemId, Placement};
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of applying a move
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// The board changed
    Moved {
        snapshot: Arc<BoardSnapshot>,
        from: Placement,
        to: Placement,
    },
    /// Nothing to do: unknown ids, or the item is already there
    Unchanged,
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }

    /// The resulting snapshot, falling back to `current` when nothing moved
    pub fn snapshot_or(&self, current: &Arc<BoardSnapshot>) -> Arc<BoardSnapshot> {
        match self {
            Self::Moved { snapshot, .. } => Arc::clone(snapshot),
            Self::Unchanged => Arc::clone(current),
        }
    }
}

/// Translate a drop target identifier into a destination.
///
/// Returns `None` when the id names nothing on the board.
pub fn resolve_destination(snapshot: &BoardSnapshot, target_id: &str) -> Option<Destination> {
    match snapshot.resolve(target_id)? {
        Target::Container(container) => Some(Destination::append(container)),
        Target::Item { item, container } => {
            let index = snapshot.container(container.as_str())?.index_of(item.as_str())?;
            Some(Destination::at(container, index))
        }
    }
}

/// Where `item` would end up if moved to `destination`, or `None` if either
/// id is unknown.
pub fn resolve_placement(
    snapshot: &BoardSnapshot,
    item: &str,
    destination: &Destination,
) -> Option<Placement> {
    let from = snapshot.position_of(item)?;
    let target = snapshot.container(destination.container.as_str())?;

    // Length of the destination sequence once the item has been taken out
    let len = if from.container == destination.container {
        target.len() - 1
    } else {
        target.len()
    };
    Some(Placement::new(
        destination.container.clone(),
        destination.index.clamp(len),
    ))
}

/// Move `item` to `destination`, producing the next snapshot.
///
/// Returns [`MoveOutcome::Unchanged`] for unknown ids and for moves that
/// would leave the item where it is.
pub fn apply_move(
    snapshot: &Arc<BoardSnapshot>,
    item: &ItemId,
    destination: &Destination,
) -> MoveOutcome {
    let Some(from) = snapshot.position_of(item.as_str()) else {
        debug!(%item, "move of unknown item ignored");
        return MoveOutcome::Unchanged;
    };
    let Some(to) = resolve_placement(snapshot, item.as_str(), destination) else {
        debug!(%item, container = %destination.container, "move to unknown container ignored");
        return MoveOutcome::Unchanged;
    };
    if from == to {
        trace!(%item, placement = %from, "move is a no-op");
        return MoveOutcome::Unchanged;
    }

    let next = snapshot.relocated(item, &from, &to);
    debug_assert!(
        next.check_invariants().is_ok(),
        "reorder produced an inconsistent board: {:?}",
        next.check_invariants()
    );
    trace!(%item, %from, %to, "item moved");

    MoveOutcome::Moved {
        snapshot: Arc::new(next),
        from,
        to,
    }
}

/// Move `item` onto whatever `target_id` names: a container or a sibling item.
pub fn move_to_target(snapshot: &Arc<BoardSnapshot>, item: &ItemId, target_id: &str) -> MoveOutcome {
    match resolve_destination(snapshot, target_id) {
        Some(destination) => apply_move(snapshot, item, &destination),
        None => {
            debug!(%item, target = target_id, "move onto unknown target ignored");
            MoveOutcome::Unchanged
        }
    }
}
