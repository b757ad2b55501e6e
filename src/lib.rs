//! BIP-39 Mnemonic Recovery Engine
//!
//! Recovers a mnemonic seed phrase when words are missing (`*`) or known only
//! by prefix, by enumerating wordlist completions, deriving candidate wallet
//! addresses (Bitcoin P2WPKH, Ethereum EOA) and matching a target address or
//! checking on-chain balances.

pub mod balance;
pub mod config;
pub mod coordinator;
pub mod derive;
pub mod enumerator;
pub mod error;
pub mod monitor;
pub mod progress;
pub mod resolver;
pub mod wordlist;

pub use config::{Chain, EvmChain, RecoveryConfig};
pub use coordinator::{ChunkOutcome, Coordinator, RunOutcome, StopSignal, Win};
pub use derive::{AddressDeriver, DerivedAddresses, EthereumAddress};
pub use enumerator::{Chunk, CombinationEnumerator};
pub use error::*;
pub use progress::{ProgressState, ProgressTracker, RunStatus};
pub use resolver::{ResolvedPhrase, UnknownSlot, WordSlot};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Chain, EvmChain, RecoveryConfig};
    pub use crate::coordinator::{ChunkOutcome, Coordinator, RunOutcome, StopSignal, Win};
    pub use crate::derive::{AddressDeriver, DerivedAddresses, EthereumAddress};
    pub use crate::enumerator::{Chunk, CombinationEnumerator};
    pub use crate::error::*;
    pub use crate::progress::{ProgressState, ProgressTracker, RunStatus};
    pub use crate::resolver::{ResolvedPhrase, UnknownSlot, WordSlot};
}

#[cfg(test)]
mod tests;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of tuples per dispatched chunk
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default number of worker threads
pub const DEFAULT_WORKERS: usize = 4;

/// Default progress file location, relative to the working directory
pub const DEFAULT_PROGRESS_FILE: &str = "recovery-progress.json";

/// Legal BIP-39 phrase lengths
pub const VALID_PHRASE_LENGTHS: &[usize] = &[12, 15, 18, 21, 24];
