//! Drag-and-drop reorder engine for boards of ordered containers
//!
//! This crate keeps a board of named containers (columns), each holding an
//! ordered list of items (cards), and reconciles drag gestures against it.
//! Every gesture produces a new immutable [`BoardSnapshot`]; every drop that
//! changed something produces exactly one absolute `moveItem` instruction
//! that is pushed to a remote [`BoardStore`] in the background.
//!
//! ## Overview
//!
//! - **Lookup Index** ([`lookup`]) - resolves any id to its owning container
//! - **Board Snapshot** ([`snapshot`]) - containers, item order, and the index
//! - **Drag Session** ([`drag`]) - the `Idle` / `Dragging` state machine
//! - **Reorder Engine** ([`engine`]) - the pure snapshot transition
//! - **Position Synchronizer** ([`sync`]) - superseding, non-blocking persistence
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use dragboard::{BoardController, MemoryStore, SyncConfig, Container, Item};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new(vec![
//!     Container::new("todo", "To Do").with_items([Item::new("a", "todo", "Write docs")]),
//!     Container::new("done", "Done"),
//! ]));
//! let mut board = BoardController::load(store, SyncConfig::default()).await?;
//!
//! board.start_drag("a");
//! board.drag_over("done");
//! let outcome = board.drop_on(Some("done"));
//! println!("issued: {:?}", outcome.ticket);
//!
//! for event in board.settle_sync().await {
//!     println!("sync: {:?}", event);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Drop rules
//!
//! - Dropping on a container appends to it.
//! - Dropping on an item puts the dragged item at that item's current index.
//! - Hover previews and the drop commit use the same resolution, computed
//!   from the board as it was when the drag started.

pub mod config;
mod controller;
pub mod drag;
pub mod engine;
mod error;
pub mod lookup;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod types;

pub use config::{DragboardConfig, FailurePolicy, SyncConfig};
pub use controller::{BoardController, EventOutcome, Update};
pub use drag::{transition, Commit, DragEvent, DragSession, DragState, Transition};
pub use engine::{apply_move, move_to_target, resolve_destination, resolve_placement, MoveOutcome};
pub use error::{BoardError, Result};
pub use lookup::{LookupIndex, Target};
pub use snapshot::BoardSnapshot;
pub use store::{parse_board, BoardStore, MemoryStore};
pub use sync::{PositionSynchronizer, SyncEvent, SyncStatus, Ticket};

// Re-export commonly used types
pub use types::{
    Container, ContainerId, Destination, Item, ItemId, MoveInstruction, Placement, TargetIndex,
};
