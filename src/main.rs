//! ndefence - access-log analyser and adaptive blocklist builder.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use ndefence::cli::{Cli, Commands};
use ndefence::commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Version = cli.command {
        println!("ndefence {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = commands::load_config(&cli.config, cli.server_type.as_deref())?;

    match cli.command {
        Commands::Run { daemon, json } => commands::run::run(daemon, json, &config).await,
        Commands::Whois { ip } => commands::whois::run(&ip, &config).await,
        Commands::Blocklist { action } => commands::blocklist::run(action, &config).await,
        Commands::Config { write } => commands::config::run(&config, write.as_deref()).await,
        Commands::Version => Ok(()),
    }
}
