//! Command-line surface.
//!
//! With no subcommand the binary runs as a prompt hook: it reads the hook
//! payload from stdin and prints the context block to stdout.

mod inspect;

use std::io::Read;

use clap::{Parser, Subcommand};
use tracing::{debug, error};

use crate::config::Config;
use crate::session::{reset, HookInput, Session};
use crate::storage::JsonFileStore;

pub use inspect::{dry_run_json, dry_run_text, inspect_json, inspect_text};

/// Prompt intent tracker for AI coding assistants.
#[derive(Parser, Debug)]
#[command(name = "intent-gate", version, about)]
pub struct Cli {
    /// Command to run; hook mode when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Read a hook payload from stdin and print the updated context
    Hook,

    /// Print the current context without changing anything
    Status,

    /// Delete all tracked state
    Reset,

    /// Dump config, forest, corpus, guide and transitions
    Inspect {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show how a prompt would be classified without storing it
    DryRun {
        /// Prompt to classify
        prompt: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Execute a command against the state described by `config`.
///
/// `stdin` is only read in hook mode.
pub fn execute_command<R: Read>(command: Commands, config: &Config, stdin: &mut R) -> CliResult {
    match command {
        Commands::Hook => execute_hook(config, stdin),
        Commands::Status => CliResult::success(Session::open(config).status()),
        Commands::Reset => CliResult::success(reset(&JsonFileStore::new(), &config.paths)),
        Commands::Inspect { json } => execute_inspect(config, json),
        Commands::DryRun { prompt, json } => execute_dry_run(config, &prompt, json),
    }
}

fn execute_hook<R: Read>(config: &Config, stdin: &mut R) -> CliResult {
    let mut data = String::new();
    if let Err(e) = stdin.read_to_string(&mut data) {
        error!(error = %e, "Failed to read stdin");
        return CliResult::error(format!("read stdin: {}", e));
    }

    let input = match HookInput::parse(&data) {
        Ok(Some(input)) => input,
        Ok(None) => {
            debug!("Empty stdin, nothing to do");
            return CliResult::success("");
        }
        Err(e) => {
            error!(error = %e, "Invalid hook payload");
            return CliResult::error(e.to_string());
        }
    };

    let mut session = Session::open(config);
    CliResult::success(session.run_hook(&input).unwrap_or_default())
}

fn execute_inspect(config: &Config, json: bool) -> CliResult {
    let session = Session::open(config);
    if json {
        match inspect_json(&session, &config.gate) {
            Ok(out) => CliResult::success(out),
            Err(e) => CliResult::error(format!("serialize inspect: {}", e)),
        }
    } else {
        CliResult::success(inspect_text(&session, &config.gate))
    }
}

fn execute_dry_run(config: &Config, prompt: &str, json: bool) -> CliResult {
    let mut session = Session::open(config);
    let result = session.dry_run(prompt);
    if result.prompt.is_empty() {
        return CliResult::error("prompt is empty after cleaning");
    }

    if json {
        match dry_run_json(&result) {
            Ok(out) => CliResult::success(out),
            Err(e) => CliResult::error(format!("serialize dry-run: {}", e)),
        }
    } else {
        CliResult::success(dry_run_text(&result, &config.gate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_subcommand_is_hook_mode() {
        let cli = Cli::try_parse_from(["intent-gate"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["intent-gate", "inspect", "--json"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Inspect { json: true }));

        let cli = Cli::try_parse_from(["intent-gate", "dry-run", "fix the login bug"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::DryRun {
                prompt: "fix the login bug".to_string(),
                json: false
            })
        );

        assert!(Cli::try_parse_from(["intent-gate", "dry-run"]).is_err());
    }

    #[test]
    fn test_cli_result() {
        assert_eq!(CliResult::success("ok").exit_code, 0);
        assert_eq!(CliResult::error("bad").exit_code, 1);
    }
}
