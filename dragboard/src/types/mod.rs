//! Core types for the board

mod board;
mod ids;
mod placement;

// Re-export all types
pub use board::{Container, Item};
pub use ids::{ContainerId, ItemId};
pub use placement::{Destination, MoveInstruction, Placement, TargetIndex};
