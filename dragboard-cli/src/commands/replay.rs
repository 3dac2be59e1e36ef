//! Replay a scripted drag session against an in-memory store

use super::{read_board, render};
use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use dragboard::{
    BoardController, BoardError, BoardSnapshot, BoardStore, ContainerId, DragEvent, MemoryStore,
    MoveInstruction, Placement, SyncConfig, SyncEvent,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// One line of a replay script
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Start(String),
    Hover(String),
    Drop(Option<String>),
    Cancel,
    AddItem { name: String, container: String },
    AddContainer(String),
    FailNext(usize),
    Settle,
}

/// Sync outcome as it appears in a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub seq: u64,
    pub item: String,
    pub outcome: &'static str,
    pub instruction: MoveInstruction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restored: Option<Placement>,
}

impl From<&SyncEvent> for EventRecord {
    fn from(event: &SyncEvent) -> Self {
        let ticket = event.ticket();
        let (outcome, error, restored) = match event {
            SyncEvent::Confirmed { .. } => ("confirmed", None, None),
            SyncEvent::Failed { error, .. } => ("failed", Some(error.to_string()), None),
            SyncEvent::RolledBack {
                error, restored, ..
            } => (
                "rolled_back",
                Some(error.to_string()),
                Some(restored.clone()),
            ),
            SyncEvent::Superseded { .. } => ("superseded", None, None),
        };
        Self {
            seq: ticket.seq,
            item: ticket.instruction.item.to_string(),
            outcome,
            instruction: ticket.instruction.clone(),
            error,
            restored,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub board: BoardSnapshot,
    pub instructions: Vec<MoveInstruction>,
    pub events: Vec<EventRecord>,
}

/// Parse a YAML or JSON step list
pub fn parse_script(text: &str) -> Result<Vec<Step>> {
    Ok(serde_yaml_ng::from_str::<Option<Vec<Step>>>(text)?.unwrap_or_default())
}

/// Run `steps` against `containers` and collect the report
pub async fn replay(
    containers: Vec<dragboard::Container>,
    steps: &[Step],
    config: SyncConfig,
) -> Result<ReplayReport> {
    let store = Arc::new(MemoryStore::new(containers));
    let mut controller =
        BoardController::load(Arc::clone(&store) as Arc<dyn BoardStore>, config).await?;
    let mut events = Vec::new();

    for (line, step) in steps.iter().enumerate() {
        debug!(line = line + 1, ?step, "replaying step");
        match step {
            Step::Start(item) => {
                controller.handle(&DragEvent::Start { item: item.clone() });
            }
            Step::Hover(target) => {
                controller.handle(&DragEvent::Hover {
                    target: target.clone(),
                });
            }
            Step::Drop(target) => {
                let outcome = controller.handle(&DragEvent::Drop {
                    target: target.clone(),
                });
                if let Some(ticket) = outcome.ticket {
                    info!(seq = ticket.seq, instruction = %ticket.instruction, "instruction issued");
                }
            }
            Step::Cancel => {
                controller.handle(&DragEvent::Cancel);
            }
            Step::AddItem { name, container } => {
                controller
                    .add_item(name, &ContainerId::from(container.as_str()))
                    .await
                    .with_context(|| format!("step {}: add_item {name}", line + 1))?;
            }
            Step::AddContainer(name) => {
                controller
                    .add_container(name)
                    .await
                    .with_context(|| format!("step {}: add_container {name}", line + 1))?;
            }
            Step::FailNext(count) => {
                store
                    .fail_next(*count, BoardError::unavailable("injected failure"))
                    .await;
            }
            Step::Settle => {
                events.extend(controller.settle_sync().await.iter().map(EventRecord::from));
            }
        }
    }
    events.extend(controller.settle_sync().await.iter().map(EventRecord::from));

    Ok(ReplayReport {
        board: (*controller.snapshot()).clone(),
        instructions: store.journal().await,
        events,
    })
}

pub async fn run(board: &Path, script: &Path, config: SyncConfig, format: OutputFormat) -> Result<()> {
    let containers = read_board(board)?;
    let text = std::fs::read_to_string(script)
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let steps = parse_script(&text)
        .with_context(|| format!("failed to parse script {}", script.display()))?;

    let report = replay(containers, &steps, config).await?;
    println!("{}", render(&report, format)?);
    Ok(())
}
