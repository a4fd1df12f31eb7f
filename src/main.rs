use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use intent_gate::{
    cli::{execute_command, Cli, Commands},
    config::{Config, LogFormat, LoggingConfig},
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging first, so configuration warnings are visible.
    init_logging(&LoggingConfig::from_env());

    let config = Config::from_env();

    debug!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.paths.data_dir.display(),
        "intent-gate starting"
    );

    let command = cli.command.unwrap_or(Commands::Hook);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        execute_command(command, &config, &mut io::stdin().lock())
    }));

    let result = match outcome {
        Ok(result) => result,
        Err(_) => {
            // The hook must never break the host; swallow the fault and print nothing.
            error!("Unexpected fault, output suppressed");
            return Ok(());
        }
    };

    if result.exit_code != 0 {
        eprintln!("intent-gate: {}", result.message);
        std::process::exit(result.exit_code);
    }

    let mut stdout = io::stdout().lock();
    stdout.write_all(result.message.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Initialize tracing/logging on stderr; stdout carries the context block.
fn init_logging(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}
