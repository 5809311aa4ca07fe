//! ironaudit -- vulnerability scan orchestration CLI
//!
//! Entry point: parses arguments, initialises logging, dispatches to a
//! command handler and maps errors to exit codes.

use clap::Parser;

use ironaudit_cli::cli::{Cli, Commands};
use ironaudit_cli::commands;
use ironaudit_cli::logging;
use ironaudit_cli::output::OutputWriter;
use ironaudit_core::config::IronauditConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging needs a config before the command validates it; fall back to defaults.
    let general = IronauditConfig::load_or_default(&cli.config)
        .await
        .map(|c| c.general)
        .unwrap_or_default();
    if let Err(e) = logging::init_tracing(&general, cli.log_level.as_deref()) {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    ironaudit_core::metrics::describe_all();
    tracing::debug!(config = %cli.config.display(), "ironaudit starting");

    let writer = OutputWriter::new(cli.output);
    let result = match cli.command {
        Commands::Scan(args) => commands::scan::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}
