//! Command-line interface for mnemonic recovery
//!
//! Recovers a BIP-39 seed phrase with missing (`*`) or prefix-only words by
//! enumerating wordlist completions and matching derived addresses against a
//! known target or on-chain balances.

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use mnemonic_recovery::config::{Chain, RecoveryConfig};
use mnemonic_recovery::coordinator::Coordinator;
use mnemonic_recovery::error::{ConfigError, RecoveryError, Result};
use mnemonic_recovery::monitor::utils::format_number;
use mnemonic_recovery::progress::RunStatus;
use mnemonic_recovery::resolver::ResolvedPhrase;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let code = match run() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let matches = cli().get_matches();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if matches.get_flag("verbose") {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(&matches)?;
    config.validate()?;

    let resolved = ResolvedPhrase::resolve(&config.mnemonic)?;
    let total = resolved.search_space(config.repeating_words);

    info!(
        length = resolved.len(),
        unknown = resolved.unknown_count(),
        prefix = resolved.prefix_count(),
        fixed = resolved.fixed_count(),
        "resolved partial phrase"
    );
    info!(
        chain = config.chain.name(),
        combinations = %format_number(total),
        workers = config.workers,
        chunk_size = config.chunk_size,
        repeating_words = config.repeating_words,
        "starting scan"
    );
    if config.public_key.is_none() && !config.query_balances {
        warn!("no target address and no balance checks: the scan will only count valid candidates");
    }

    let coordinator = Coordinator::new(config, resolved);
    install_interrupt_handler(&coordinator)?;

    let outcome = coordinator.run()?;

    match &outcome.win {
        Some(win) => {
            println!("recovered mnemonic: {}", win.phrase);
            println!("matching address:   {}", win.address);
            println!("combination index:  {}", win.index);
            if let Some(balance) = win.balance {
                println!("balance:            {balance}");
            }
        }
        None if outcome.status == RunStatus::Paused => {
            info!(
                committed = %format_number(outcome.committed),
                "scan paused; rerun with --resume to continue"
            );
        }
        None => {
            info!(
                checked = %format_number(outcome.committed),
                valid = outcome.valid_candidates,
                "scan complete, no matching wallet found"
            );
        }
    }

    Ok(())
}

fn cli() -> Command {
    Command::new("mnemonic-recovery")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Recover a BIP-39 mnemonic with missing or prefix-only words")
        .arg(
            Arg::new("mnemonic")
                .long("mnemonic")
                .value_name("PHRASE")
                .help("Partial phrase, space separated, * for unknown words"),
        )
        .arg(
            Arg::new("chain")
                .long("chain")
                .value_name("CHAIN")
                .help("Target chain: bitcoin, an EVM chain id, or all"),
        )
        .arg(
            Arg::new("public-key")
                .long("public-key")
                .value_name("ADDRESS")
                .help("Known wallet address for exact-match termination"),
        )
        .arg(
            Arg::new("query-balances")
                .long("query-balances")
                .help("Check on-chain balances for every derived address")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("repeating-words")
                .long("repeating-words")
                .help("Allow the same word to fill more than one position")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .value_name("N")
                .default_value("4")
                .value_parser(clap::value_parser!(usize))
                .help("Worker thread count"),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .value_name("N")
                .default_value("1000")
                .value_parser(clap::value_parser!(usize))
                .help("Tuples per dispatched chunk"),
        )
        .arg(
            Arg::new("resume")
                .long("resume")
                .help("Continue from the persisted progress file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("progress-file")
                .long("progress-file")
                .value_name("FILE")
                .default_value(mnemonic_recovery::DEFAULT_PROGRESS_FILE)
                .help("Progress file location"),
        )
        .arg(
            Arg::new("esplora-url")
                .long("esplora-url")
                .value_name("URL")
                .help("Esplora-compatible block explorer API base URL"),
        )
        .arg(
            Arg::new("rpc-url")
                .long("rpc-url")
                .value_name("URL")
                .help("JSON-RPC endpoint override for EVM balance queries"),
        )
        .arg(
            Arg::new("min-request-interval-ms")
                .long("min-request-interval-ms")
                .value_name("MS")
                .value_parser(clap::value_parser!(u64))
                .help("Minimum spacing between balance requests"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue),
        )
}

/// Build the run configuration from CLI arguments, falling back to
/// environment variables when no `--mnemonic` is given.
fn build_config(matches: &clap::ArgMatches) -> Result<RecoveryConfig> {
    let mut config = match matches.get_one::<String>("mnemonic") {
        Some(mnemonic) => {
            let chain_id = matches.get_one::<String>("chain").ok_or_else(|| {
                ConfigError::InvalidInput("--chain is required with --mnemonic".to_string())
            })?;
            RecoveryConfig::new(mnemonic.clone(), Chain::from_id(chain_id)?)
        }
        None => RecoveryConfig::from_env()
            .context("no --mnemonic given and environment configuration incomplete")?,
    };

    if let Some(public_key) = matches.get_one::<String>("public-key") {
        config.public_key = Some(public_key.clone());
    }
    if matches.get_flag("query-balances") {
        config.query_balances = true;
    }
    if matches.get_flag("repeating-words") {
        config.repeating_words = true;
    }
    config.workers = *matches.get_one::<usize>("workers").unwrap();
    config.chunk_size = *matches.get_one::<usize>("chunk-size").unwrap();
    config.resume = matches.get_flag("resume");
    config.progress_path = matches.get_one::<String>("progress-file").unwrap().into();
    if let Some(url) = matches.get_one::<String>("esplora-url") {
        config.esplora_url = url.clone();
    }
    if let Some(url) = matches.get_one::<String>("rpc-url") {
        config.rpc_url = Some(url.clone());
    }
    if let Some(ms) = matches.get_one::<u64>("min-request-interval-ms") {
        config.min_request_interval = Duration::from_millis(*ms);
    }

    Ok(config)
}

/// First interrupt requests a graceful stop with a progress flush; a second
/// one exits immediately.
fn install_interrupt_handler(coordinator: &Coordinator) -> Result<()> {
    let signal = coordinator.stop_signal();
    let seen = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler(move || {
        if seen.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        eprintln!("interrupt received, finishing in-flight chunks (press again to abort)");
        signal.request_stop();
    })
    .map_err(|e| RecoveryError::Internal(format!("failed to install signal handler: {e}")))?;
    Ok(())
}
