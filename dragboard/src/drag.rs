//! Drag Session: the `Idle` / `Dragging` state machine.
//!
//! The session is an immutable value threaded through [`transition`]; each
//! event yields the next state, the snapshot to render, and, for a drop that
//! changed something, the persistence instruction to issue.
//!
//! Previews are always computed from the pre-drag snapshot kept in the
//! session, never from the previous preview. Hovering the same target twice
//! is therefore stable, cancel is a plain restore, and the drop commit is
//! exactly the last preview.

use crate::engine::{apply_move, resolve_destination, resolve_placement, MoveOutcome};
use crate::snapshot::BoardSnapshot;
use crate::types::{Destination, Item, ItemId, MoveInstruction, Placement};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An in-progress drag
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    item: ItemId,
    source: Placement,
    origin: Arc<BoardSnapshot>,
    last_target: Option<Placement>,
    last_destination: Option<Destination>,
}

impl DragSession {
    /// The item being dragged
    pub fn item(&self) -> &ItemId {
        &self.item
    }

    /// Where the item sat when the drag started
    pub fn source(&self) -> &Placement {
        &self.source
    }

    /// The board as it was when the drag started
    pub fn origin(&self) -> &Arc<BoardSnapshot> {
        &self.origin
    }

    /// The last speculative placement shown, if any
    pub fn last_target(&self) -> Option<&Placement> {
        self.last_target.as_ref()
    }

    /// The dragged item as it looked when the drag started
    pub fn dragged_item(&self) -> Option<&Item> {
        self.origin.item(self.item.as_str())
    }

    /// Destination and resolved placement for a pointer over `target_id`.
    ///
    /// The pointer over the dragged item itself means it is over the preview
    /// copy, so the last destination stands.
    fn aim(&self, target_id: &str) -> Option<(Destination, Placement)> {
        let destination = if self.item == *target_id {
            self.last_destination
                .clone()
                .unwrap_or_else(|| Destination::from(self.source.clone()))
        } else {
            resolve_destination(&self.origin, target_id)?
        };
        let placement = resolve_placement(&self.origin, self.item.as_str(), &destination)?;
        Some((destination, placement))
    }

    /// The board with `placement` applied on top of the origin
    fn preview(&self, placement: &Placement) -> Arc<BoardSnapshot> {
        apply_move(
            &self.origin,
            &self.item,
            &Destination::from(placement.clone()),
        )
        .snapshot_or(&self.origin)
    }

    /// Replace the origin (after an item or container was created mid-drag)
    /// and re-derive the preview from it.
    pub fn rebased(&self, origin: Arc<BoardSnapshot>) -> (Self, Arc<BoardSnapshot>) {
        let mut session = Self {
            origin,
            ..self.clone()
        };
        session.last_target = session.last_destination.as_ref().and_then(|destination| {
            resolve_placement(&session.origin, session.item.as_str(), destination)
        });
        let snapshot = match &session.last_target {
            Some(placement) => session.preview(placement),
            None => Arc::clone(&session.origin),
        };
        (session, snapshot)
    }
}

/// State of the drag state machine
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

impl DragState {
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging(_))
    }

    pub fn session(&self) -> Option<&DragSession> {
        match self {
            Self::Idle => None,
            Self::Dragging(session) => Some(session),
        }
    }
}

/// Drag lifecycle events coming from the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragEvent {
    /// Pick up an item
    Start { item: String },
    /// The pointer is over an item or a container
    Hover { target: String },
    /// Release; `None` when released over nothing
    Drop { target: Option<String> },
    /// Abort the drag
    Cancel,
}

/// A committed move: the instruction to persist and where the item came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub instruction: MoveInstruction,
    pub previous: Placement,
}

/// Result of feeding one event to the state machine
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: DragState,
    pub snapshot: Arc<BoardSnapshot>,
    pub commit: Option<Commit>,
}

impl Transition {
    fn unchanged(state: &DragState, snapshot: &Arc<BoardSnapshot>) -> Self {
        Self {
            state: state.clone(),
            snapshot: Arc::clone(snapshot),
            commit: None,
        }
    }

    fn idle(snapshot: Arc<BoardSnapshot>, commit: Option<Commit>) -> Self {
        Self {
            state: DragState::Idle,
            snapshot,
            commit,
        }
    }
}

/// Advance the drag state machine by one event.
///
/// `snapshot` is the board currently shown, which during a drag is the
/// latest preview.
pub fn transition(state: &DragState, snapshot: &Arc<BoardSnapshot>, event: &DragEvent) -> Transition {
    match (state, event) {
        (DragState::Idle, DragEvent::Start { item }) => start(state, snapshot, item),
        (DragState::Dragging(session), DragEvent::Start { item }) => {
            warn!(
                requested = %item,
                dragging = %session.item,
                "drag start rejected while another drag is active"
            );
            Transition::unchanged(state, snapshot)
        }
        (DragState::Dragging(session), DragEvent::Hover { target }) => {
            hover(session, state, snapshot, target)
        }
        (DragState::Dragging(session), DragEvent::Drop { target }) => {
            drop_on(session, target.as_deref())
        }
        (DragState::Dragging(session), DragEvent::Cancel) => {
            debug!(item = %session.item, "drag cancelled");
            Transition::idle(Arc::clone(&session.origin), None)
        }
        (DragState::Idle, _) => {
            debug!(?event, "drag event ignored while idle");
            Transition::unchanged(state, snapshot)
        }
    }
}

fn start(state: &DragState, snapshot: &Arc<BoardSnapshot>, item: &str) -> Transition {
    let Some(source) = snapshot.position_of(item) else {
        debug!(item, "drag start on unknown item ignored");
        return Transition::unchanged(state, snapshot);
    };
    debug!(item, %source, "drag started");
    let session = DragSession {
        item: ItemId::from(item),
        source,
        origin: Arc::clone(snapshot),
        last_target: None,
        last_destination: None,
    };
    Transition {
        state: DragState::Dragging(session),
        snapshot: Arc::clone(snapshot),
        commit: None,
    }
}

fn hover(
    session: &DragSession,
    state: &DragState,
    snapshot: &Arc<BoardSnapshot>,
    target: &str,
) -> Transition {
    let Some((destination, placement)) = session.aim(target) else {
        debug!(target, "hover over unknown target ignored");
        return Transition::unchanged(state, snapshot);
    };
    if session.last_target.as_ref() == Some(&placement) {
        return Transition::unchanged(state, snapshot);
    }

    let preview = session.preview(&placement);
    let session = DragSession {
        last_target: Some(placement),
        last_destination: Some(destination),
        ..session.clone()
    };
    Transition {
        state: DragState::Dragging(session),
        snapshot: preview,
        commit: None,
    }
}

fn drop_on(session: &DragSession, target: Option<&str>) -> Transition {
    let Some((_, placement)) = target.and_then(|target| session.aim(target)) else {
        debug!(item = %session.item, ?target, "drop outside any known target, restoring");
        return Transition::idle(Arc::clone(&session.origin), None);
    };

    match apply_move(
        &session.origin,
        &session.item,
        &Destination::from(placement),
    ) {
        MoveOutcome::Moved { snapshot, from, to } => {
            info!(item = %session.item, %from, %to, "move committed");
            let commit = Commit {
                instruction: MoveInstruction::new(session.item.clone(), to.container, to.index),
                previous: from,
            };
            Transition::idle(snapshot, Some(commit))
        }
        MoveOutcome::Unchanged => {
            debug!(item = %session.item, "drop left the item in place");
            Transition::idle(Arc::clone(&session.origin), None)
        }
    }
}
