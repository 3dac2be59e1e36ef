//! BoardController - the entry points the UI layer calls.
//!
//! The controller owns the current snapshot, the drag state and the
//! synchronizer. All snapshot changes happen synchronously inside these
//! calls and replace the snapshot as a whole; only the remote move calls run
//! in the background.

use crate::config::{FailurePolicy, SyncConfig};
use crate::drag::{transition, DragEvent, DragSession, DragState};
use crate::engine::{apply_move, MoveOutcome};
use crate::error::{BoardError, Result};
use crate::snapshot::BoardSnapshot;
use crate::store::BoardStore;
use crate::sync::{PositionSynchronizer, SyncEvent, SyncStatus, Ticket};
use crate::types::{Container, ContainerId, Destination, Item};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of an entry point: the new snapshot, or a no-op signal
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Changed(Arc<BoardSnapshot>),
    Unchanged,
}

impl Update {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }
}

/// Result of feeding a drag event, including any instruction issued
#[derive(Debug, Clone, PartialEq)]
pub struct EventOutcome {
    pub update: Update,
    pub ticket: Option<Ticket>,
}

/// Owns the board state for one UI
pub struct BoardController {
    store: Arc<dyn BoardStore>,
    snapshot: Arc<BoardSnapshot>,
    drag: DragState,
    sync: PositionSynchronizer,
}

impl BoardController {
    /// Seed the board from `fetchBoard`
    pub async fn load(store: Arc<dyn BoardStore>, config: SyncConfig) -> Result<Self> {
        let containers = store.fetch_board().await?;
        let snapshot = BoardSnapshot::from_containers(containers)?;
        info!(
            containers = snapshot.container_count(),
            items = snapshot.item_count(),
            "board loaded"
        );
        Ok(Self::from_snapshot(store, snapshot, config))
    }

    /// Start from an already built snapshot
    pub fn from_snapshot(
        store: Arc<dyn BoardStore>,
        snapshot: BoardSnapshot,
        config: SyncConfig,
    ) -> Self {
        Self {
            sync: PositionSynchronizer::new(Arc::clone(&store), config),
            store,
            snapshot: Arc::new(snapshot),
            drag: DragState::Idle,
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// The board to render
    pub fn snapshot(&self) -> Arc<BoardSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    /// The active drag, if any
    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.session()
    }

    /// The item under the pointer, for the drag overlay
    pub fn dragged_item(&self) -> Option<&Item> {
        self.drag.session()?.dragged_item()
    }

    pub fn sync_status(&self, item: &str) -> Option<&SyncStatus> {
        self.sync.status(item)
    }

    pub fn synchronizer(&self) -> &PositionSynchronizer {
        &self.sync
    }

    // =========================================================================
    // Drag lifecycle
    // =========================================================================

    /// Feed one drag event through the state machine.
    ///
    /// A drop that changed containment or order submits exactly one
    /// instruction, returned as the ticket.
    pub fn handle(&mut self, event: &DragEvent) -> EventOutcome {
        let next = transition(&self.drag, &self.snapshot, event);
        self.drag = next.state;
        let update = self.replace(next.snapshot);
        let ticket = next.commit.map(|commit| self.sync.submit(commit));
        EventOutcome { update, ticket }
    }

    pub fn start_drag(&mut self, item: &str) -> Update {
        self.handle(&DragEvent::Start { item: item.into() }).update
    }

    pub fn drag_over(&mut self, target: &str) -> Update {
        self.handle(&DragEvent::Hover {
            target: target.into(),
        })
        .update
    }

    pub fn drop_on(&mut self, target: Option<&str>) -> EventOutcome {
        self.handle(&DragEvent::Drop {
            target: target.map(str::to_string),
        })
    }

    pub fn cancel_drag(&mut self) -> Update {
        self.handle(&DragEvent::Cancel).update
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create an item through the store and append it to its container
    pub async fn add_item(&mut self, name: &str, container: &ContainerId) -> Result<Update> {
        if self.snapshot.container(container.as_str()).is_none() {
            return Err(BoardError::container_not_found(container.as_str()));
        }
        let item = self.store.create_item(name, container).await?;
        info!(item = %item.id, container = %item.container_id, "item added");
        self.rewrite(|snapshot| snapshot.with_item(item.clone()).map(Arc::new))
    }

    /// Create an empty container through the store and add it to the board
    pub async fn add_container(&mut self, name: &str) -> Result<Update> {
        let container = self.store.create_container(name).await?;
        info!(container = %container.id, "container added");
        let container = Container::new(container.id, container.name);
        self.rewrite(|snapshot| snapshot.with_container(container.clone()).map(Arc::new))
    }

    // =========================================================================
    // Synchronization
    // =========================================================================

    /// Process sync responses that have already arrived
    pub fn poll_sync(&mut self) -> Vec<SyncEvent> {
        self.sync
            .poll()
            .into_iter()
            .map(|event| self.reconcile(event))
            .collect()
    }

    /// Wait for the next sync response; `None` when nothing is in flight
    pub async fn next_sync_event(&mut self) -> Option<SyncEvent> {
        let event = self.sync.next_event().await?;
        Some(self.reconcile(event))
    }

    /// Wait until every submitted instruction has been answered
    pub async fn settle_sync(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_sync_event().await {
            events.push(event);
        }
        events
    }

    /// Apply the failure policy to a sync event
    fn reconcile(&mut self, event: SyncEvent) -> SyncEvent {
        let SyncEvent::Failed {
            ticket,
            error,
            attempts,
        } = event
        else {
            return event;
        };
        if self.sync.config().failure_policy != FailurePolicy::Rollback {
            return SyncEvent::Failed {
                ticket,
                error,
                attempts,
            };
        }

        let item = ticket.instruction.item.clone();
        if self
            .drag_session()
            .is_some_and(|session| *session.item() == item)
        {
            debug!(%item, "not rolling back an item that is being dragged");
            return SyncEvent::Failed {
                ticket,
                error,
                attempts,
            };
        }

        let destination = Destination::from(ticket.previous.clone());
        let rolled_back = self.rewrite(|snapshot| {
            Ok(match apply_move(snapshot, &item, &destination) {
                MoveOutcome::Moved { snapshot, .. } => snapshot,
                MoveOutcome::Unchanged => Arc::clone(snapshot),
            })
        });

        match (rolled_back, self.snapshot.position_of(item.as_str())) {
            (Ok(Update::Changed(_)), Some(restored)) => {
                info!(%item, %restored, "move rolled back after sync failure");
                self.sync.mark_rolled_back(&ticket, error.clone());
                SyncEvent::RolledBack {
                    ticket,
                    error,
                    restored,
                }
            }
            _ => SyncEvent::Failed {
                ticket,
                error,
                attempts,
            },
        }
    }

    // =========================================================================
    // Snapshot replacement
    // =========================================================================

    /// Swap in a new snapshot as a whole
    fn replace(&mut self, next: Arc<BoardSnapshot>) -> Update {
        if Arc::ptr_eq(&next, &self.snapshot) {
            return Update::Unchanged;
        }
        self.snapshot = Arc::clone(&next);
        Update::Changed(next)
    }

    /// Apply a change outside the drag lifecycle.
    ///
    /// During a drag the change goes to the session's pre-drag snapshot and
    /// the preview is re-derived from it, so the eventual drop keeps it.
    fn rewrite<F>(&mut self, change: F) -> Result<Update>
    where
        F: Fn(&Arc<BoardSnapshot>) -> Result<Arc<BoardSnapshot>>,
    {
        match &self.drag {
            DragState::Idle => {
                let next = change(&self.snapshot)?;
                Ok(self.replace(next))
            }
            DragState::Dragging(session) => {
                let origin = change(session.origin())?;
                let (session, preview) = session.rebased(origin);
                self.drag = DragState::Dragging(session);
                Ok(self.replace(preview))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::MoveInstruction;
    use std::time::Duration;

    fn containers() -> Vec<Container> {
        vec![
            Container::new("todo", "To Do").with_items([
                Item::new("a", "todo", "A"),
                Item::new("b", "todo", "B"),
                Item::new("c", "todo", "C"),
            ]),
            Container::new("done", "Done"),
        ]
    }

    async fn setup(config: SyncConfig) -> (Arc<MemoryStore>, BoardController) {
        let store = Arc::new(MemoryStore::new(containers()));
        let controller = BoardController::load(store.clone(), config).await.unwrap();
        (store, controller)
    }

    fn order(controller: &BoardController, container: &str) -> Vec<String> {
        controller
            .snapshot()
            .container(container)
            .unwrap()
            .items
            .iter()
            .map(|item| item.id.to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_drag_lifecycle_issues_one_instruction() {
        let (store, mut controller) = setup(SyncConfig::default()).await;

        assert_eq!(controller.start_drag("b"), Update::Unchanged);
        assert_eq!(controller.dragged_item().unwrap().name, "B");
        assert!(controller.drag_over("done").is_changed());

        let outcome = controller.drop_on(Some("done"));
        assert!(controller.drag_session().is_none());
        let ticket = outcome.ticket.unwrap();
        assert_eq!(ticket.instruction, MoveInstruction::new("b", "done", 0));

        let events = controller.settle_sync().await;
        assert!(matches!(&events[..], [SyncEvent::Confirmed { .. }]));
        assert_eq!(store.journal().await, vec![MoveInstruction::new("b", "done", 0)]);
        assert!(matches!(controller.sync_status("b"), Some(SyncStatus::Confirmed { .. })));
    }

    #[tokio::test]
    async fn test_noop_drop_issues_nothing() {
        let (store, mut controller) = setup(SyncConfig::default()).await;
        let before = controller.snapshot();

        controller.start_drag("a");
        let outcome = controller.drop_on(Some("a"));

        assert_eq!(outcome.update, Update::Unchanged);
        assert!(outcome.ticket.is_none());
        assert!(Arc::ptr_eq(&before, &controller.snapshot()));
        assert!(controller.settle_sync().await.is_empty());
        assert!(store.journal().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_restores_pre_drag_board() {
        let (_store, mut controller) = setup(SyncConfig::default()).await;
        let before = controller.snapshot();

        controller.start_drag("a");
        controller.drag_over("done");
        assert_eq!(order(&controller, "done"), vec!["a"]);

        assert!(controller.cancel_drag().is_changed());
        assert_eq!(*controller.snapshot(), *before);
        assert!(controller.drag_session().is_none());
    }

    #[tokio::test]
    async fn test_add_item_appends() {
        let (store, mut controller) = setup(SyncConfig::default()).await;

        let update = controller.add_item("Write Docs", &"done".into()).await.unwrap();
        assert!(update.is_changed());
        assert_eq!(order(&controller, "done"), vec!["write-docs"]);
        assert_eq!(store.containers().await[1].items.len(), 1);
    }

    #[tokio::test]
    async fn test_add_item_unknown_container_skips_store() {
        let (store, mut controller) = setup(SyncConfig::default()).await;
        let result = controller.add_item("X", &"nowhere".into()).await;
        assert!(matches!(result, Err(BoardError::ContainerNotFound { .. })));
        assert_eq!(store.containers().await.len(), 2);
    }

    #[tokio::test]
    async fn test_add_container() {
        let (_store, mut controller) = setup(SyncConfig::default()).await;
        controller.add_container("In Review").await.unwrap();
        let snapshot = controller.snapshot();
        assert!(snapshot.container("in-review").unwrap().is_empty());
        assert_eq!(snapshot.container_count(), 3);
    }

    #[tokio::test]
    async fn test_creation_during_drag_survives_drop() {
        let (_store, mut controller) = setup(SyncConfig::default()).await;

        controller.start_drag("a");
        controller.drag_over("done");
        controller.add_item("D", &"done".into()).await.unwrap();
        assert_eq!(order(&controller, "done"), vec!["d", "a"]);

        let outcome = controller.drop_on(Some("done"));
        assert_eq!(order(&controller, "done"), vec!["d", "a"]);
        assert_eq!(
            outcome.ticket.unwrap().instruction,
            MoveInstruction::new("a", "done", 1)
        );
        controller.snapshot().check_invariants().unwrap();
    }

    #[tokio::test]
    async fn test_failure_keeps_local_move_by_default() {
        let (store, mut controller) = setup(SyncConfig::default()).await;
        store.fail_next(1, BoardError::rejected("nope")).await;

        controller.start_drag("b");
        controller.drop_on(Some("done"));
        let events = controller.settle_sync().await;

        assert!(matches!(&events[..], [SyncEvent::Failed { .. }]));
        assert_eq!(order(&controller, "done"), vec!["b"]);
        assert!(matches!(controller.sync_status("b"), Some(SyncStatus::Failed { .. })));
    }

    #[tokio::test]
    async fn test_rollback_policy_restores_item() {
        let config = SyncConfig::default().with_failure_policy(FailurePolicy::Rollback);
        let (store, mut controller) = setup(config).await;
        store.fail_next(1, BoardError::rejected("nope")).await;

        controller.start_drag("b");
        controller.drop_on(Some("done"));
        let events = controller.settle_sync().await;

        match &events[..] {
            [SyncEvent::RolledBack { restored, .. }] => {
                assert_eq!(restored.container, "todo");
                assert_eq!(restored.index, 1);
            }
            other => panic!("expected a rollback, got {other:?}"),
        }
        assert_eq!(order(&controller, "todo"), vec!["a", "b", "c"]);
        assert!(matches!(controller.sync_status("b"), Some(SyncStatus::RolledBack { .. })));
        controller.snapshot().check_invariants().unwrap();
    }

    #[tokio::test]
    async fn test_rollback_skips_item_being_dragged() {
        let config = SyncConfig::default().with_failure_policy(FailurePolicy::Rollback);
        let store = Arc::new(MemoryStore::new(containers()).with_latency(Duration::from_millis(20)));
        let mut controller = BoardController::load(store.clone(), config).await.unwrap();
        store.fail_next(1, BoardError::rejected("nope")).await;

        controller.start_drag("b");
        controller.drop_on(Some("done"));
        controller.start_drag("b");
        let events = controller.settle_sync().await;

        assert!(matches!(&events[..], [SyncEvent::Failed { .. }]));
        assert!(controller.drag_session().is_some());
        assert_eq!(order(&controller, "done"), vec!["b"]);
    }
}
