//! Candidate validation and address derivation
//!
//! The pipeline per candidate phrase: BIP-39 checksum validation (the cheap
//! gate that discards most of the search space), PBKDF2 seed derivation,
//! BIP-32 master key, then a BIP-84 P2WPKH address and/or a BIP-44 Ethereum
//! address depending on the selected chain.

use crate::config::Chain;
use crate::error::DeriveError;
use bip39::{Language, Mnemonic};
use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::secp256k1::{All, PublicKey, Secp256k1};
use bitcoin::{Address, CompressedPublicKey, Network};
use hmac::Hmac;
use keccak_hash::keccak;
use pbkdf2::pbkdf2;
use sha2::Sha512;
use std::fmt;
use std::str::FromStr;

/// PBKDF2 iteration count for BIP39 seed derivation
const BIP39_PBKDF2_ROUNDS: u32 = 2048;

/// BIP39 salt prefix
const BIP39_SALT_PREFIX: &str = "mnemonic";

/// BIP-84 account external chain for native segwit
pub const BITCOIN_DERIVATION_PATH: &str = "m/84'/0'/0'/0";

/// BIP-44 first external address for Ethereum
pub const ETHEREUM_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

type DeriveResult<T> = std::result::Result<T, DeriveError>;

/// Ethereum address (20 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EthereumAddress {
    address: [u8; 20],
}

/// Addresses derived from one candidate phrase
#[derive(Debug, Clone)]
pub struct DerivedAddresses {
    pub bitcoin: Option<String>,
    pub ethereum: Option<EthereumAddress>,
}

/// Derivation engine, one per worker.
///
/// Holds a secp256k1 context and the derivation paths parsed once at
/// construction.
#[derive(Debug)]
pub struct AddressDeriver {
    secp: Secp256k1<All>,
    bitcoin_path: DerivationPath,
    ethereum_path: DerivationPath,
    derive_bitcoin: bool,
    derive_ethereum: bool,
}

impl AddressDeriver {
    /// Create a deriver producing the address kinds the chain calls for
    pub fn new(chain: &Chain) -> Self {
        Self {
            secp: Secp256k1::new(),
            bitcoin_path: DerivationPath::from_str(BITCOIN_DERIVATION_PATH)
                .expect("static derivation path"),
            ethereum_path: DerivationPath::from_str(ETHEREUM_DERIVATION_PATH)
                .expect("static derivation path"),
            derive_bitcoin: chain.derives_bitcoin(),
            derive_ethereum: chain.derives_ethereum(),
        }
    }

    /// Validate a candidate phrase and derive its addresses.
    ///
    /// `DeriveError::InvalidMnemonic` marks an expected checksum failure;
    /// any other error is a genuine fault.
    pub fn derive(&self, phrase: &str) -> DeriveResult<DerivedAddresses> {
        Mnemonic::parse_in(Language::English, phrase).map_err(|_| DeriveError::InvalidMnemonic)?;

        let seed = derive_seed(phrase, "")?;
        let master = Xpriv::new_master(Network::Bitcoin, &seed)?;

        let bitcoin = if self.derive_bitcoin {
            let child = master.derive_priv(&self.secp, &self.bitcoin_path)?;
            let pubkey = CompressedPublicKey(child.private_key.public_key(&self.secp));
            Some(Address::p2wpkh(&pubkey, Network::Bitcoin).to_string())
        } else {
            None
        };

        let ethereum = if self.derive_ethereum {
            let child = master.derive_priv(&self.secp, &self.ethereum_path)?;
            let pubkey = PublicKey::from_secret_key(&self.secp, &child.private_key);
            Some(EthereumAddress::from_public_key(&pubkey))
        } else {
            None
        };

        Ok(DerivedAddresses { bitcoin, ethereum })
    }
}

/// Derive the 64-byte BIP-39 seed from a validated phrase
fn derive_seed(phrase: &str, passphrase: &str) -> DeriveResult<[u8; 64]> {
    let salt = format!("{BIP39_SALT_PREFIX}{passphrase}");
    let mut seed = [0u8; 64];
    pbkdf2::<Hmac<Sha512>>(
        phrase.as_bytes(),
        salt.as_bytes(),
        BIP39_PBKDF2_ROUNDS,
        &mut seed,
    )
    .map_err(|_| DeriveError::Pbkdf2("PBKDF2 operation failed".to_string()))?;
    Ok(seed)
}

impl DerivedAddresses {
    /// Whether any derived address equals the target.
    ///
    /// Ethereum targets compare case-insensitively (EIP-55 casing carries
    /// no identity); bech32 is defined lowercase. Returns the matching
    /// address in display form.
    pub fn matches(&self, target: &str) -> Option<String> {
        if target.to_ascii_lowercase().starts_with("0x") {
            let eth = self.ethereum.as_ref()?;
            if eth.to_hex() == target.to_ascii_lowercase() {
                return Some(eth.to_checksum());
            }
            return None;
        }
        let btc = self.bitcoin.as_ref()?;
        if btc == &target.to_ascii_lowercase() {
            return Some(btc.clone());
        }
        None
    }

    /// All derived addresses in display form, for balance queries
    pub fn rendered(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(2);
        if let Some(btc) = &self.bitcoin {
            out.push(btc.clone());
        }
        if let Some(eth) = &self.ethereum {
            out.push(eth.to_checksum());
        }
        out
    }
}

impl EthereumAddress {
    /// Keccak-256 of the uncompressed public key, last 20 bytes
    pub fn from_public_key(pubkey: &PublicKey) -> Self {
        let uncompressed = pubkey.serialize_uncompressed();
        let hash = keccak(&uncompressed[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash.as_bytes()[12..]);
        Self { address }
    }

    /// Parse a 0x-prefixed or bare 40-hex-character address
    pub fn from_hex(hex_str: &str) -> DeriveResult<Self> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str)
            .map_err(|e| DeriveError::InvalidAddress(format!("invalid hex: {e}")))?;
        if bytes.len() != 20 {
            return Err(DeriveError::InvalidAddress(
                "address must be 20 bytes".to_string(),
            ));
        }
        let mut address = [0u8; 20];
        address.copy_from_slice(&bytes);
        Ok(Self { address })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.address
    }

    /// Lowercase hex with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.address))
    }

    /// Checksummed address (EIP-55)
    pub fn to_checksum(&self) -> String {
        let address_hex = hex::encode(self.address);
        let hash = keccak(address_hex.as_bytes());

        let mut checksum = String::with_capacity(42);
        checksum.push_str("0x");
        for (i, c) in address_hex.chars().enumerate() {
            if c.is_ascii_digit() {
                checksum.push(c);
            } else {
                let hash_byte = hash.as_bytes()[i / 2];
                let nibble = if i % 2 == 0 {
                    hash_byte >> 4
                } else {
                    hash_byte & 0x0f
                };
                if nibble >= 8 {
                    checksum.push(c.to_ascii_uppercase());
                } else {
                    checksum.push(c.to_ascii_lowercase());
                }
            }
        }
        checksum
    }
}

impl fmt::Display for EthereumAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}
