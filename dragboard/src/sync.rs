//! Position Synchronizer: pushes committed moves to the remote store.
//!
//! Every submitted instruction gets a ticket with a monotonically increasing
//! sequence number. Remote calls run on spawned tokio tasks so the board
//! stays responsive, and their responses come back over a channel.
//!
//! Each item has at most one call outstanding. An instruction submitted while
//! its item still has a call pending is held, and a newer submission replaces
//! the held one. When the pending call answers, the held instruction is sent,
//! unless it is exactly what the store just confirmed. The store therefore
//! always ends on the last submission for every item. Responses for tickets
//! that were replaced are reported as superseded and change nothing.

use crate::config::SyncConfig;
use crate::drag::Commit;
use crate::error::{BoardError, Result};
use crate::store::BoardStore;
use crate::types::{Item, ItemId, MoveInstruction, Placement};
use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A submitted instruction and the placement it replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub instruction: MoveInstruction,
    pub previous: Placement,
}

/// Synchronization state of one item
#[derive(Debug, Clone)]
pub enum SyncStatus {
    /// The latest instruction is in flight or waiting for its turn
    Pending { seq: u64 },
    /// The store acknowledged the latest instruction
    Confirmed { seq: u64 },
    /// The latest instruction failed; the optimistic local state was kept
    Failed { seq: u64, error: BoardError },
    /// The latest instruction failed and the item was moved back locally
    RolledBack { seq: u64, error: BoardError },
}

impl SyncStatus {
    pub fn seq(&self) -> u64 {
        match self {
            Self::Pending { seq }
            | Self::Confirmed { seq }
            | Self::Failed { seq, .. }
            | Self::RolledBack { seq, .. } => *seq,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// Outcome of a remote call, reported upward to the presentation layer
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The store applied the latest instruction for the item
    Confirmed { ticket: Ticket, item: Item },
    /// The latest instruction for the item failed; the local move stands
    Failed {
        ticket: Ticket,
        error: BoardError,
        attempts: u32,
    },
    /// The latest instruction failed and the item was moved back locally
    RolledBack {
        ticket: Ticket,
        error: BoardError,
        restored: Placement,
    },
    /// An instruction that a newer one replaced; ignored
    Superseded { ticket: Ticket },
}

impl SyncEvent {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Self::Confirmed { ticket, .. }
            | Self::Failed { ticket, .. }
            | Self::RolledBack { ticket, .. }
            | Self::Superseded { ticket } => ticket,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::RolledBack { .. })
    }
}

#[derive(Debug)]
struct SyncResponse {
    ticket: Ticket,
    result: Result<Item>,
    attempts: u32,
}

/// Issues persistence instructions without blocking local interaction
pub struct PositionSynchronizer {
    store: Arc<dyn BoardStore>,
    config: SyncConfig,
    next_seq: u64,
    /// Latest ticket per item, shared with running calls so retries can stop
    latest: Arc<DashMap<ItemId, u64>>,
    status: HashMap<ItemId, SyncStatus>,
    /// The one call outstanding per item
    active: HashMap<ItemId, Ticket>,
    /// Newest instruction waiting for the item's outstanding call
    held: HashMap<ItemId, Ticket>,
    /// Events produced but not handed out yet
    ready: VecDeque<SyncEvent>,
    tx: mpsc::UnboundedSender<SyncResponse>,
    rx: mpsc::UnboundedReceiver<SyncResponse>,
}

impl PositionSynchronizer {
    pub fn new(store: Arc<dyn BoardStore>, config: SyncConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            config,
            next_seq: 0,
            latest: Arc::new(DashMap::new()),
            status: HashMap::new(),
            active: HashMap::new(),
            held: HashMap::new(),
            ready: VecDeque::new(),
            tx,
            rx,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Issue the instruction for a committed move and return its ticket.
    ///
    /// Must be called from within a tokio runtime. The new ticket supersedes
    /// any earlier one for the same item; if that item still has a call
    /// outstanding, the instruction waits for it.
    pub fn submit(&mut self, commit: Commit) -> Ticket {
        self.next_seq += 1;
        let ticket = Ticket {
            seq: self.next_seq,
            instruction: commit.instruction,
            previous: commit.previous,
        };
        let item = ticket.instruction.item.clone();

        self.latest.insert(item.clone(), ticket.seq);
        self.status
            .insert(item.clone(), SyncStatus::Pending { seq: ticket.seq });

        if self.active.contains_key(&item) {
            debug!(instruction = %ticket.instruction, seq = ticket.seq, "call outstanding for item, holding instruction");
            if let Some(replaced) = self.held.insert(item, ticket.clone()) {
                debug!(seq = replaced.seq, "held instruction replaced before it was sent");
                self.ready.push_back(SyncEvent::Superseded { ticket: replaced });
            }
        } else {
            self.dispatch(ticket.clone());
        }
        ticket
    }

    /// Sync status of an item, if it was ever submitted
    pub fn status(&self, item: &str) -> Option<&SyncStatus> {
        self.status.get(item)
    }

    /// Sequence number of the latest ticket issued for an item
    pub fn latest_seq(&self, item: &str) -> Option<u64> {
        self.latest.get(item).map(|seq| *seq)
    }

    /// Number of remote calls currently outstanding
    pub fn in_flight(&self) -> usize {
        self.active.len()
    }

    /// Instruction waiting for the item's outstanding call, if any
    pub fn held(&self, item: &str) -> Option<&Ticket> {
        self.held.get(item)
    }

    /// Whether `ticket` is still the latest for its item
    pub fn is_latest(&self, ticket: &Ticket) -> bool {
        self.latest_seq(ticket.instruction.item.as_str()) == Some(ticket.seq)
    }

    /// Process every response that has already arrived, without waiting
    pub fn poll(&mut self) -> Vec<SyncEvent> {
        while let Ok(response) = self.rx.try_recv() {
            self.handle(response);
        }
        self.ready.drain(..).collect()
    }

    /// Wait for the next event; `None` when nothing is outstanding
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Some(event);
            }
            if self.active.is_empty() {
                return None;
            }
            let response = self.rx.recv().await?;
            self.handle(response);
        }
    }

    /// Wait until every submitted instruction has been answered
    pub async fn settle(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    /// Mark a failed ticket as rolled back
    pub(crate) fn mark_rolled_back(&mut self, ticket: &Ticket, error: BoardError) {
        self.status.insert(
            ticket.instruction.item.clone(),
            SyncStatus::RolledBack {
                seq: ticket.seq,
                error,
            },
        );
    }

    fn dispatch(&mut self, ticket: Ticket) {
        info!(instruction = %ticket.instruction, seq = ticket.seq, "submitting move");
        self.active
            .insert(ticket.instruction.item.clone(), ticket.clone());
        tokio::spawn(run_ticket(
            Arc::clone(&self.store),
            self.config.clone(),
            Arc::clone(&self.latest),
            ticket,
            self.tx.clone(),
        ));
    }

    fn handle(&mut self, response: SyncResponse) {
        let SyncResponse {
            ticket,
            result,
            attempts,
        } = response;
        let item_id = ticket.instruction.item.clone();
        self.active.remove(&item_id);

        if let Some(next) = self.held.remove(&item_id) {
            debug!(
                instruction = %ticket.instruction,
                seq = ticket.seq,
                "response for superseded instruction"
            );
            let applied = match &result {
                Ok(item) if next.instruction == ticket.instruction => Some(item.clone()),
                _ => None,
            };
            self.ready.push_back(SyncEvent::Superseded { ticket });
            match applied {
                Some(item) => {
                    debug!(seq = next.seq, "held instruction already applied by the store");
                    self.status
                        .insert(item_id, SyncStatus::Confirmed { seq: next.seq });
                    self.ready
                        .push_back(SyncEvent::Confirmed { ticket: next, item });
                }
                None => self.dispatch(next),
            }
            return;
        }

        debug_assert!(self.is_latest(&ticket), "unheld response must be the latest");
        match result {
            Ok(item) => {
                debug!(instruction = %ticket.instruction, seq = ticket.seq, "move confirmed");
                self.status
                    .insert(item_id, SyncStatus::Confirmed { seq: ticket.seq });
                self.ready.push_back(SyncEvent::Confirmed { ticket, item });
            }
            Err(error) => {
                warn!(
                    instruction = %ticket.instruction,
                    seq = ticket.seq,
                    attempts,
                    %error,
                    "move failed to synchronize"
                );
                self.status.insert(
                    item_id,
                    SyncStatus::Failed {
                        seq: ticket.seq,
                        error: error.clone(),
                    },
                );
                self.ready.push_back(SyncEvent::Failed {
                    ticket,
                    error,
                    attempts,
                });
            }
        }
    }
}

/// Drive one ticket to completion and report back
async fn run_ticket(
    store: Arc<dyn BoardStore>,
    config: SyncConfig,
    latest: Arc<DashMap<ItemId, u64>>,
    ticket: Ticket,
    tx: mpsc::UnboundedSender<SyncResponse>,
) {
    let max_attempts = config.attempts().max(1);
    let mut attempts = 0;

    let result = loop {
        attempts += 1;
        let result = attempt(store.as_ref(), &config, &ticket.instruction).await;

        let Err(error) = &result else {
            break result;
        };
        if attempts >= max_attempts || !error.is_retryable() {
            break result;
        }
        debug!(
            instruction = %ticket.instruction,
            attempt = attempts,
            %error,
            "retrying move"
        );
        tokio::time::sleep(config.retry_backoff()).await;

        let superseded = latest
            .get(&ticket.instruction.item)
            .is_some_and(|seq| *seq != ticket.seq);
        if superseded {
            debug!(seq = ticket.seq, "retry abandoned, instruction superseded");
            break result;
        }
    };

    // The receiver only goes away with the synchronizer itself
    let _ = tx.send(SyncResponse {
        ticket,
        result,
        attempts,
    });
}

async fn attempt(
    store: &dyn BoardStore,
    config: &SyncConfig,
    instruction: &MoveInstruction,
) -> Result<Item> {
    match tokio::time::timeout(config.request_timeout(), store.move_item(instruction)).await {
        Ok(result) => result,
        Err(_) => Err(BoardError::Timeout {
            elapsed_ms: config.request_timeout_ms,
        }),
    }
}
