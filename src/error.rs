//! Error types for the mnemonic recovery engine

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Enumeration error: {0}")]
    Enumerator(#[from] EnumeratorError),

    #[error("Derivation error: {0}")]
    Derive(#[from] DeriveError),

    #[error("Balance query error: {0}")]
    Balance(#[from] BalanceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid phrase length: {0}. Must be 12, 15, 18, 21 or 24 words")]
    InvalidPhraseLength(usize),

    #[error("No wordlist entry starts with \"{0}\"")]
    InvalidWord(String),

    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("Invalid target address: {0}")]
    InvalidTargetAddress(String),

    #[error("Invalid worker count: {0}. Must be greater than 0")]
    InvalidWorkerCount(usize),

    #[error("Invalid chunk size: {0}. Must be greater than 0")]
    InvalidChunkSize(usize),

    #[error("No mnemonic provided (use --mnemonic or the MNEMONIC environment variable)")]
    MissingMnemonic,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Combination enumeration errors
#[derive(Error, Debug)]
pub enum EnumeratorError {
    #[error("Index {index} outside the enumerable range of {total} combinations")]
    IndexOutOfRange { index: u128, total: u128 },
}

/// Address derivation errors
#[derive(Error, Debug)]
pub enum DeriveError {
    /// Candidate failed the BIP-39 checksum; expected for most candidates
    /// and silently skipped by callers.
    #[error("Invalid mnemonic (checksum mismatch)")]
    InvalidMnemonic,

    #[error("PBKDF2 error: {0}")]
    Pbkdf2(String),

    #[error("BIP32 derivation error: {0}")]
    Bip32(String),

    #[error("Secp256k1 error: {0}")]
    Secp256k1(#[from] bitcoin::secp256k1::Error),

    #[error("Invalid address format: {0}")]
    InvalidAddress(String),
}

/// Balance query errors, absorbed into a zero balance by the client
#[derive(Error, Debug)]
pub enum BalanceError {
    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Endpoint returned status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("No RPC endpoint configured for chain {0}")]
    NoEndpoint(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RecoveryError>;

/// Convert bitcoin bip32 errors to our derivation error type
impl From<bitcoin::bip32::Error> for DeriveError {
    fn from(err: bitcoin::bip32::Error) -> Self {
        DeriveError::Bip32(err.to_string())
    }
}

impl From<reqwest::Error> for BalanceError {
    fn from(err: reqwest::Error) -> Self {
        BalanceError::Http(err.to_string())
    }
}

/// Convert anyhow::Error to RecoveryError
impl From<anyhow::Error> for RecoveryError {
    fn from(err: anyhow::Error) -> Self {
        RecoveryError::Internal(err.to_string())
    }
}
