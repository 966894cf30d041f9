use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use ingest_gateway::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.get_command();

    // The server configures tracing from its config file once loaded
    if !matches!(command, cli::Commands::Start) {
        init_tracing("warn", false);
    }

    match command {
        cli::Commands::Start => {
            commands::start::execute(&args.config).await?;
        }
        cli::Commands::Test => {
            commands::test::execute(&args.config)?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
        cli::Commands::Version => {
            println!("Ingest Gateway v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
