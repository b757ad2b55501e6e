//! Run configuration and chain dispatch
//!
//! Options come from the command line or, when no `--mnemonic` is given,
//! from environment variables. Validation fails fast at startup; nothing in
//! the hot path revalidates.

use crate::error::{ConfigError, Result};
use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_PROGRESS_FILE, DEFAULT_WORKERS};
use bitcoin::Network;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default esplora-compatible block explorer API
pub const DEFAULT_ESPLORA_URL: &str = "https://blockstream.info/api";

/// Default minimum spacing between balance requests per client
pub const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1000);

/// An EVM-compatible chain with its default public RPC endpoint
#[derive(Debug, PartialEq, Eq)]
pub struct EvmChain {
    pub name: &'static str,
    pub default_rpc_url: &'static str,
}

/// Supported EVM chain ids and their public endpoints
pub const EVM_CHAINS: &[EvmChain] = &[
    EvmChain {
        name: "mainnet",
        default_rpc_url: "https://eth.llamarpc.com",
    },
    EvmChain {
        name: "polygon",
        default_rpc_url: "https://polygon-rpc.com",
    },
    EvmChain {
        name: "bsc",
        default_rpc_url: "https://bsc-dataseed.binance.org",
    },
    EvmChain {
        name: "arbitrum",
        default_rpc_url: "https://arb1.arbitrum.io/rpc",
    },
    EvmChain {
        name: "optimism",
        default_rpc_url: "https://mainnet.optimism.io",
    },
    EvmChain {
        name: "base",
        default_rpc_url: "https://mainnet.base.org",
    },
    EvmChain {
        name: "avalanche",
        default_rpc_url: "https://api.avax.network/ext/bc/C/rpc",
    },
];

/// Derivation and balance target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Bitcoin,
    Evm(&'static EvmChain),
    /// Derive both Bitcoin and Ethereum addresses per candidate
    All,
}

impl Chain {
    /// Resolve a chain id string
    pub fn from_id(id: &str) -> Result<Self> {
        let id = id.to_ascii_lowercase();
        match id.as_str() {
            "bitcoin" | "btc" => Ok(Chain::Bitcoin),
            "all" => Ok(Chain::All),
            _ => Self::evm(&id),
        }
    }

    /// Resolve an EVM chain by name
    pub fn evm(name: &str) -> Result<Self> {
        EVM_CHAINS
            .iter()
            .find(|c| c.name == name)
            .map(Chain::Evm)
            .ok_or_else(|| ConfigError::UnknownChain(name.to_string()).into())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "bitcoin",
            Chain::Evm(chain) => chain.name,
            Chain::All => "all",
        }
    }

    pub fn derives_bitcoin(&self) -> bool {
        matches!(self, Chain::Bitcoin | Chain::All)
    }

    pub fn derives_ethereum(&self) -> bool {
        matches!(self, Chain::Evm(_) | Chain::All)
    }

    /// The chain's default JSON-RPC endpoint, where one exists
    pub fn default_rpc_url(&self) -> Option<&'static str> {
        match self {
            Chain::Evm(chain) => Some(chain.default_rpc_url),
            Chain::All => Some(EVM_CHAINS[0].default_rpc_url),
            Chain::Bitcoin => None,
        }
    }
}

/// Main configuration structure for a recovery run
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Partial mnemonic with `*` for unknown positions
    pub mnemonic: String,

    /// Target chain for derivation and balance checks
    pub chain: Chain,

    /// Known wallet address enabling exact-match early termination
    pub public_key: Option<String>,

    /// Query on-chain balances for every derived address
    pub query_balances: bool,

    /// Allow the same word to fill more than one position
    pub repeating_words: bool,

    /// Worker thread count
    pub workers: usize,

    /// Tuples per dispatched chunk
    pub chunk_size: usize,

    /// Continue from the persisted progress file
    pub resume: bool,

    /// Progress file location
    pub progress_path: PathBuf,

    /// Esplora-compatible block explorer base URL
    pub esplora_url: String,

    /// JSON-RPC endpoint override for EVM balance queries
    pub rpc_url: Option<String>,

    /// Minimum spacing between balance requests per client
    pub min_request_interval: Duration,
}

impl RecoveryConfig {
    /// Create a configuration with default knobs
    pub fn new(mnemonic: String, chain: Chain) -> Self {
        Self {
            mnemonic,
            chain,
            public_key: None,
            query_balances: false,
            repeating_words: false,
            workers: DEFAULT_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            resume: false,
            progress_path: PathBuf::from(DEFAULT_PROGRESS_FILE),
            esplora_url: DEFAULT_ESPLORA_URL.to_string(),
            rpc_url: None,
            min_request_interval: DEFAULT_MIN_REQUEST_INTERVAL,
        }
    }

    /// Build a configuration from environment variables, for running
    /// without CLI arguments.
    pub fn from_env() -> Result<Self> {
        let mnemonic = std::env::var("MNEMONIC").map_err(|_| ConfigError::MissingMnemonic)?;
        let chain_id = std::env::var("CHAIN")
            .map_err(|_| ConfigError::InvalidInput("CHAIN not set".to_string()))?;

        let mut config = Self::new(mnemonic, Chain::from_id(&chain_id)?);
        if let Ok(public_key) = std::env::var("PUBLIC_KEY") {
            if !public_key.is_empty() {
                config.public_key = Some(public_key);
            }
        }
        config.repeating_words = env_flag("REPEATING_WORDS");
        config.query_balances = env_flag("CHECK_BALANCES");
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkerCount(self.workers).into());
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size).into());
        }
        if let Some(target) = &self.public_key {
            self.validate_target(target)?;
        }
        Ok(())
    }

    /// The JSON-RPC endpoint to use for EVM balance queries
    pub fn effective_rpc_url(&self) -> Option<String> {
        self.rpc_url
            .clone()
            .or_else(|| self.chain.default_rpc_url().map(str::to_string))
    }

    fn validate_target(&self, target: &str) -> Result<()> {
        let bitcoin_ok = is_valid_bitcoin_address(target);
        let ethereum_ok = is_valid_ethereum_address(target);
        let valid = match self.chain {
            Chain::Bitcoin => bitcoin_ok,
            Chain::Evm(_) => ethereum_ok,
            Chain::All => bitcoin_ok || ethereum_ok,
        };
        if !valid {
            return Err(ConfigError::InvalidTargetAddress(target.to_string()).into());
        }
        Ok(())
    }
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("true") | Ok("TRUE") | Ok("1")
    )
}

/// Check that an address parses as a mainnet Bitcoin address
fn is_valid_bitcoin_address(address: &str) -> bool {
    bitcoin::Address::from_str(address)
        .map(|a| a.is_valid_for_network(Network::Bitcoin))
        .unwrap_or(false)
}

/// Check that an address is 0x-prefixed 20-byte hex
fn is_valid_ethereum_address(address: &str) -> bool {
    if !address.starts_with("0x") || address.len() != 42 {
        return false;
    }
    address[2..].chars().all(|c| c.is_ascii_hexdigit())
}
