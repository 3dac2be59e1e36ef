use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
#[command(name = "dragboard")]
#[command(version)]
#[command(about = "Replay drag-and-drop sessions against a kanban board")]
#[command(long_about = "
dragboard loads a board in the fetchBoard shape (a JSON array of containers,
each with its items), replays drag and creation events against it, and
reports the resulting board together with every move instruction that
reached the store.

Global arguments:
  --verbose     Trace every state transition
  --debug       Debug logging
  --quiet       Only log errors
  --config      Load synchronization settings from a TOML, YAML or JSON file
  --format      Report format (json, yaml)

Example usage:
  dragboard replay board.json script.yaml
  dragboard --format yaml replay board.json script.yaml
  dragboard check board.json
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a script of drag events against a board
    #[command(long_about = "
Replay a script of drag events against a board.

The script is a YAML (or JSON) list of steps:

  - start: <item id>
  - hover: <item or container id>
  - drop: <item or container id>     # or `drop: null` to release over nothing
  - cancel
  - add_item: { name: <name>, container: <container id> }
  - add_container: <name>
  - fail_next: <n>                    # the next n remote moves fail
  - settle                            # wait for outstanding sync responses

Outstanding synchronization is awaited after the last step.
")]
    Replay {
        /// Board file (JSON array of containers)
        board: PathBuf,
        /// Script file (YAML or JSON list of steps)
        script: PathBuf,
    },
    /// Load a board and check its membership invariants
    Check {
        /// Board file (JSON array of containers)
        board: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_replay_with_globals() {
        let cli = Cli::try_parse_from([
            "dragboard",
            "replay",
            "board.json",
            "script.yaml",
            "--format",
            "yaml",
            "--quiet",
        ])
        .unwrap();

        assert!(cli.quiet);
        assert_eq!(cli.format, OutputFormat::Yaml);
        match cli.command {
            Commands::Replay { board, script } => {
                assert_eq!(board, PathBuf::from("board.json"));
                assert_eq!(script, PathBuf::from("script.yaml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_format_defaults_to_json() {
        let cli = Cli::try_parse_from(["dragboard", "check", "board.json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_replay_requires_script() {
        assert!(Cli::try_parse_from(["dragboard", "replay", "board.json"]).is_err());
    }
}
