//! Remote store contract and an in-memory reference implementation.
//!
//! The core only talks to persistence through [`BoardStore`]. Transport,
//! authentication and real storage belong to the implementor.

use crate::error::{BoardError, Result};
use crate::types::{Container, ContainerId, Item, ItemId, MoveInstruction};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// The external collaborators the board core relies on
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// Every container with its items in authoritative order
    async fn fetch_board(&self) -> Result<Vec<Container>>;

    /// Create an item at the end of `container`
    async fn create_item(&self, name: &str, container: &ContainerId) -> Result<Item>;

    /// Create an empty container
    async fn create_container(&self, name: &str) -> Result<Container>;

    /// Place an item at an absolute slot. Must be idempotent.
    async fn move_item(&self, instruction: &MoveInstruction) -> Result<Item>;
}

#[derive(Debug, Default)]
struct MemoryState {
    containers: Vec<Container>,
    journal: Vec<MoveInstruction>,
    failures: VecDeque<BoardError>,
}

impl MemoryState {
    fn taken_ids(&self) -> HashSet<String> {
        self.containers
            .iter()
            .flat_map(|container| {
                std::iter::once(container.id.to_string())
                    .chain(container.items.iter().map(|item| item.id.to_string()))
            })
            .collect()
    }

    /// A readable id derived from `name`, or a ULID when that is taken
    fn mint_id(&self, name: &str) -> String {
        let slug = slugify(name);
        if slug.is_empty() || self.taken_ids().contains(&slug) {
            ulid::Ulid::new().to_string()
        } else {
            slug
        }
    }
}

/// Parse a board in the `fetchBoard` shape; `null` stands for an empty board
pub fn parse_board(json: &str) -> Result<Vec<Container>> {
    let containers: Option<Vec<Container>> = serde_json::from_str(json)?;
    Ok(containers.unwrap_or_default())
}

/// In-memory [`BoardStore`] with latency and failure injection.
///
/// Moves are recorded in a journal so tests can check exactly which
/// instructions reached the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl MemoryStore {
    /// A store seeded with `containers`
    pub fn new(containers: Vec<Container>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                containers,
                ..Default::default()
            }),
            latency: None,
        }
    }

    /// A store seeded from a JSON board file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading board file");
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(parse_board(&text)?))
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next `count` move calls with `error`
    pub async fn fail_next(&self, count: usize, error: BoardError) {
        let mut state = self.state.lock().await;
        state
            .failures
            .extend(std::iter::repeat(error).take(count));
    }

    /// Every move instruction applied or rejected so far, oldest first
    pub async fn journal(&self) -> Vec<MoveInstruction> {
        self.state.lock().await.journal.clone()
    }

    /// Current stored board
    pub async fn containers(&self) -> Vec<Container> {
        self.state.lock().await.containers.clone()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl BoardStore for MemoryStore {
    async fn fetch_board(&self) -> Result<Vec<Container>> {
        self.delay().await;
        Ok(self.containers().await)
    }

    async fn create_item(&self, name: &str, container: &ContainerId) -> Result<Item> {
        self.delay().await;
        let mut state = self.state.lock().await;
        let id = ItemId::from_string(state.mint_id(name));
        let column = state
            .containers
            .iter_mut()
            .find(|c| c.id == *container)
            .ok_or_else(|| BoardError::container_not_found(container.as_str()))?;
        let item = Item::new(id, column.id.clone(), name);
        column.items.push(item.clone());
        debug!(item = %item.id, container = %column.id, "item created");
        Ok(item)
    }

    async fn create_container(&self, name: &str) -> Result<Container> {
        self.delay().await;
        let mut state = self.state.lock().await;
        let container = Container::new(state.mint_id(name), name);
        state.containers.push(container.clone());
        debug!(container = %container.id, "container created");
        Ok(container)
    }

    async fn move_item(&self, instruction: &MoveInstruction) -> Result<Item> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.journal.push(instruction.clone());

        if let Some(error) = state.failures.pop_front() {
            debug!(%instruction, %error, "injected move failure");
            return Err(error);
        }

        let destination = state
            .containers
            .iter()
            .position(|c| c.id == instruction.container)
            .ok_or_else(|| BoardError::container_not_found(instruction.container.as_str()))?;

        let mut item = None;
        for container in &mut state.containers {
            if let Some(index) = container.index_of(instruction.item.as_str()) {
                item = Some(container.items.remove(index));
                break;
            }
        }
        let mut item = item.ok_or_else(|| BoardError::item_not_found(instruction.item.as_str()))?;

        let column = &mut state.containers[destination];
        item.container_id = column.id.clone();
        let index = instruction.index.min(column.items.len());
        column.items.insert(index, item.clone());
        trace!(%instruction, "move applied");
        Ok(item)
    }
}

/// Lowercase, dash-separated form of a display name
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
