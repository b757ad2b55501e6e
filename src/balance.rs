//! On-chain balance queries
//!
//! Best-effort: a transient transport or decoding failure maps to a zero
//! balance with a warning, and the scan continues. Requests through one
//! client are serialized and spaced by a configurable minimum interval to
//! stay under public endpoint rate ceilings.

use crate::config::RecoveryConfig;
use crate::error::BalanceError;
use serde::Deserialize;
use serde_json::json;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// Request timeout for balance lookups
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

type BalanceResult<T> = std::result::Result<T, BalanceError>;

/// Confirmed UTXO stats from an esplora-compatible explorer
#[derive(Debug, Deserialize)]
pub struct AddressStats {
    pub funded_txo_sum: u64,
    pub spent_txo_sum: u64,
}

/// Response from `GET /address/{addr}`
#[derive(Debug, Deserialize)]
pub struct AddressInfo {
    pub chain_stats: AddressStats,
}

/// Blocking balance client, one per worker
#[derive(Debug)]
pub struct BalanceClient {
    http: reqwest::blocking::Client,
    esplora_url: String,
    rpc_url: Option<String>,
    chain_name: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl BalanceClient {
    pub fn new(config: &RecoveryConfig) -> BalanceResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            esplora_url: config.esplora_url.trim_end_matches('/').to_string(),
            rpc_url: config.effective_rpc_url(),
            chain_name: config.chain.name().to_string(),
            min_interval: config.min_request_interval,
            last_request: Mutex::new(None),
        })
    }

    /// Balance of an address in its chain's base unit (satoshis or wei).
    ///
    /// Never fails: errors are logged at warning level and reported as 0.
    pub fn balance(&self, address: &str) -> u128 {
        let result = if address.starts_with("0x") {
            self.fetch_evm(address)
        } else {
            self.fetch_bitcoin(address)
        };
        match result {
            Ok(balance) => balance,
            Err(err) => {
                warn!(address, %err, "balance query failed, assuming 0");
                0
            }
        }
    }

    /// Confirmed balance in satoshis via the esplora API
    fn fetch_bitcoin(&self, address: &str) -> BalanceResult<u128> {
        self.pace();
        let url = format!("{}/address/{}", self.esplora_url, address);
        let response = self.http.get(&url).send()?;
        if !response.status().is_success() {
            return Err(BalanceError::Status(response.status().as_u16()));
        }
        let info: AddressInfo = response
            .json()
            .map_err(|e| BalanceError::Malformed(e.to_string()))?;
        Ok(bitcoin_balance(&info))
    }

    /// Balance in wei via JSON-RPC `eth_getBalance`
    fn fetch_evm(&self, address: &str) -> BalanceResult<u128> {
        let rpc_url = self
            .rpc_url
            .as_ref()
            .ok_or_else(|| BalanceError::NoEndpoint(self.chain_name.clone()))?;
        self.pace();
        let body = json!({
            "jsonrpc": "2.0",
            "method": "eth_getBalance",
            "params": [address, "latest"],
            "id": 1,
        });
        let response = self.http.post(rpc_url).json(&body).send()?;
        if !response.status().is_success() {
            return Err(BalanceError::Status(response.status().as_u16()));
        }
        let value: serde_json::Value = response
            .json()
            .map_err(|e| BalanceError::Malformed(e.to_string()))?;
        parse_rpc_balance(&value)
    }

    /// Honor the minimum spacing between requests
    fn pace(&self) {
        let mut last = self.last_request.lock().unwrap();
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

/// Confirmed balance: funded minus spent output sums
pub fn bitcoin_balance(info: &AddressInfo) -> u128 {
    info.chain_stats
        .funded_txo_sum
        .saturating_sub(info.chain_stats.spent_txo_sum) as u128
}

/// Extract the hex balance from an `eth_getBalance` response
pub fn parse_rpc_balance(value: &serde_json::Value) -> BalanceResult<u128> {
    let result = value
        .get("result")
        .and_then(|r| r.as_str())
        .ok_or_else(|| BalanceError::Malformed("missing result field".to_string()))?;
    u128::from_str_radix(result.trim_start_matches("0x"), 16)
        .map_err(|e| BalanceError::Malformed(format!("bad hex balance: {e}")))
}
