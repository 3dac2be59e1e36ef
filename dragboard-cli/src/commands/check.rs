use super::{read_board, render};
use crate::cli::OutputFormat;
use anyhow::{bail, Result};
use dragboard::BoardSnapshot;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub valid: bool,
    pub containers: usize,
    pub items: usize,
    /// Items whose `containerId` named a different container than the one holding them
    pub repaired: usize,
}

/// Load a board and verify its membership invariants.
///
/// Duplicate ids fail outright. Items claiming the wrong container are
/// counted in `repaired` and make the board invalid.
pub fn check(board: &Path) -> Result<CheckReport> {
    let containers = read_board(board)?;
    let repaired = containers
        .iter()
        .flat_map(|container| {
            container
                .items
                .iter()
                .filter(move |item| item.container_id != container.id)
        })
        .inspect(|item| warn!(item = %item.id, claimed = %item.container_id, "item claims the wrong container"))
        .count();

    let snapshot = BoardSnapshot::from_containers(containers)?;
    snapshot.check_invariants()?;
    info!(
        containers = snapshot.container_count(),
        items = snapshot.item_count(),
        repaired,
        "board checked"
    );
    Ok(CheckReport {
        valid: repaired == 0,
        containers: snapshot.container_count(),
        items: snapshot.item_count(),
        repaired,
    })
}

pub fn run(board: &Path, format: OutputFormat) -> Result<()> {
    let report = check(board)?;
    println!("{}", render(&report, format)?);
    if !report.valid {
        bail!(
            "{} item(s) claim a container that does not hold them",
            report.repaired
        );
    }
    Ok(())
}
