use anyhow::Context;
use clap::Parser;
use iou_contract::{config::Config, validate, ContractError, ProposedTransaction};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Validate a proposed IOU transaction
#[derive(Parser, Debug)]
#[command(name = "iou-contract")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Path to the proposed transaction (JSON)
    transaction: PathBuf,
}

/// Loads the configuration, installs logging, then validates the
/// transaction file and prints the verdict.
fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let identity = config.node.identity();
    info!("Validating as {} ({})", identity, identity.owning_key);

    let content = fs::read_to_string(&cli.transaction)
        .with_context(|| format!("failed to read {}", cli.transaction.display()))?;
    let tx: ProposedTransaction = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", cli.transaction.display()))?;

    let relevant = tx.is_relevant_to(&BTreeSet::from([identity.owning_key.clone()]));

    let code = match validate(&tx) {
        Ok(()) => {
            println!("VALID");
            ExitCode::SUCCESS
        }
        Err(ContractError::Rejected(violation)) => {
            println!("INVALID: {}", violation);
            ExitCode::FAILURE
        }
        // Malformed input is a caller error, not a verdict.
        Err(e) => return Err(e.into()),
    };

    if relevant {
        println!("Transaction {} involves {}", tx.id, identity);
    } else {
        println!("Transaction {} does not involve {}", tx.id, identity);
    }

    Ok(code)
}
