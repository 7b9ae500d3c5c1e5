//! Block explorer REST clients for the Bitcoin family
//!
//! One client per chain. Each answers three questions: which outputs are
//! unspent, what the balance is, and where to post a raw transaction.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::{debug, info};

use crate::blockchain::traits::UtxoExplorer;
use crate::core::domain::UnspentOutput;
use crate::core::errors::WalletError;

fn network_error(context: &str, e: impl std::fmt::Display) -> WalletError {
    WalletError::NetworkError(format!("{}: {}", context, e))
}

async fn ensure_success(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, WalletError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(WalletError::NetworkError(format!("{} returned {}: {}", context, status, body.trim())))
}

/// Esplora (blockstream.info) client for BTC.
#[derive(Clone)]
pub struct EsploraExplorer {
    base_url: String,
    http_client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
}

#[derive(Debug, Deserialize)]
struct EsploraStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

#[derive(Debug, Deserialize)]
struct EsploraAddress {
    chain_stats: EsploraStats,
    mempool_stats: EsploraStats,
}

impl EsploraExplorer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), http_client: HttpClient::new() }
    }
}

#[async_trait]
impl UtxoExplorer for EsploraExplorer {
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<UnspentOutput>, WalletError> {
        let url = format!("{}/address/{}/utxo", self.base_url, address);
        debug!("GET {}", url);
        let response = self.http_client.get(&url).send().await.map_err(|e| network_error("esplora utxo", e))?;
        let utxos: Vec<EsploraUtxo> = ensure_success(response, "esplora utxo")
            .await?
            .json()
            .await
            .map_err(|e| network_error("esplora utxo", e))?;
        Ok(utxos
            .into_iter()
            .map(|u| UnspentOutput { txid: u.txid, vout: u.vout, satoshis: u.value })
            .collect())
    }

    async fn fetch_balance(&self, address: &str) -> Result<u64, WalletError> {
        let url = format!("{}/address/{}", self.base_url, address);
        let response = self.http_client.get(&url).send().await.map_err(|e| network_error("esplora address", e))?;
        let info: EsploraAddress = ensure_success(response, "esplora address")
            .await?
            .json()
            .await
            .map_err(|e| network_error("esplora address", e))?;
        let funded = info.chain_stats.funded_txo_sum + info.mempool_stats.funded_txo_sum;
        let spent = info.chain_stats.spent_txo_sum + info.mempool_stats.spent_txo_sum;
        Ok(funded.saturating_sub(spent))
    }

    async fn broadcast(&self, raw_tx: &str) -> Result<String, WalletError> {
        let url = format!("{}/tx", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .body(raw_tx.to_string())
            .send()
            .await
            .map_err(|e| network_error("esplora broadcast", e))?;
        let txid = ensure_success(response, "esplora broadcast")
            .await?
            .text()
            .await
            .map_err(|e| network_error("esplora broadcast", e))?;
        info!("broadcast BTC transaction {}", txid.trim());
        Ok(txid.trim().to_string())
    }
}

/// rest.bitcoin.com v2 client for BCH.
#[derive(Clone)]
pub struct BitcoinComExplorer {
    base_url: String,
    http_client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct BitcoinComUtxo {
    txid: String,
    vout: u32,
    satoshis: u64,
}

#[derive(Debug, Deserialize)]
struct BitcoinComUtxoResponse {
    utxos: Vec<BitcoinComUtxo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitcoinComDetails {
    balance_sat: u64,
    #[serde(default)]
    unconfirmed_balance_sat: i64,
}

impl BitcoinComExplorer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), http_client: HttpClient::new() }
    }
}

#[async_trait]
impl UtxoExplorer for BitcoinComExplorer {
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<UnspentOutput>, WalletError> {
        let url = format!("{}/address/utxo/{}", self.base_url, address);
        debug!("GET {}", url);
        let response = self.http_client.get(&url).send().await.map_err(|e| network_error("bitcoin.com utxo", e))?;
        let body: BitcoinComUtxoResponse = ensure_success(response, "bitcoin.com utxo")
            .await?
            .json()
            .await
            .map_err(|e| network_error("bitcoin.com utxo", e))?;
        Ok(body
            .utxos
            .into_iter()
            .map(|u| UnspentOutput { txid: u.txid, vout: u.vout, satoshis: u.satoshis })
            .collect())
    }

    async fn fetch_balance(&self, address: &str) -> Result<u64, WalletError> {
        let url = format!("{}/address/details/{}", self.base_url, address);
        let response = self.http_client.get(&url).send().await.map_err(|e| network_error("bitcoin.com details", e))?;
        let details: BitcoinComDetails = ensure_success(response, "bitcoin.com details")
            .await?
            .json()
            .await
            .map_err(|e| network_error("bitcoin.com details", e))?;
        let total = details.balance_sat as i64 + details.unconfirmed_balance_sat;
        Ok(total.max(0) as u64)
    }

    async fn broadcast(&self, raw_tx: &str) -> Result<String, WalletError> {
        let url = format!("{}/rawtransactions/sendRawTransaction", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&serde_json::json!({ "hexes": [raw_tx] }))
            .send()
            .await
            .map_err(|e| network_error("bitcoin.com broadcast", e))?;
        let txids: Vec<String> = ensure_success(response, "bitcoin.com broadcast")
            .await?
            .json()
            .await
            .map_err(|e| network_error("bitcoin.com broadcast", e))?;
        let txid = txids
            .into_iter()
            .next()
            .ok_or_else(|| WalletError::BlockchainError("bitcoin.com broadcast returned no txid".into()))?;
        info!("broadcast BCH transaction {}", txid);
        Ok(txid)
    }
}

/// WhatsOnChain client for BSV.
#[derive(Clone)]
pub struct WhatsOnChainExplorer {
    base_url: String,
    http_client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct WocUnspent {
    tx_hash: String,
    tx_pos: u32,
    value: u64,
}

#[derive(Debug, Deserialize)]
struct WocBalance {
    confirmed: i64,
    unconfirmed: i64,
}

impl WhatsOnChainExplorer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), http_client: HttpClient::new() }
    }
}

#[async_trait]
impl UtxoExplorer for WhatsOnChainExplorer {
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<UnspentOutput>, WalletError> {
        let url = format!("{}/address/{}/unspent", self.base_url, address);
        debug!("GET {}", url);
        let response = self.http_client.get(&url).send().await.map_err(|e| network_error("whatsonchain unspent", e))?;
        let utxos: Vec<WocUnspent> = ensure_success(response, "whatsonchain unspent")
            .await?
            .json()
            .await
            .map_err(|e| network_error("whatsonchain unspent", e))?;
        Ok(utxos
            .into_iter()
            .map(|u| UnspentOutput { txid: u.tx_hash, vout: u.tx_pos, satoshis: u.value })
            .collect())
    }

    async fn fetch_balance(&self, address: &str) -> Result<u64, WalletError> {
        let url = format!("{}/address/{}/balance", self.base_url, address);
        let response = self.http_client.get(&url).send().await.map_err(|e| network_error("whatsonchain balance", e))?;
        let balance: WocBalance = ensure_success(response, "whatsonchain balance")
            .await?
            .json()
            .await
            .map_err(|e| network_error("whatsonchain balance", e))?;
        Ok((balance.confirmed + balance.unconfirmed).max(0) as u64)
    }

    async fn broadcast(&self, raw_tx: &str) -> Result<String, WalletError> {
        let url = format!("{}/tx/raw", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&serde_json::json!({ "txhex": raw_tx }))
            .send()
            .await
            .map_err(|e| network_error("whatsonchain broadcast", e))?;
        let txid: String = ensure_success(response, "whatsonchain broadcast")
            .await?
            .json()
            .await
            .map_err(|e| network_error("whatsonchain broadcast", e))?;
        info!("broadcast BSV transaction {}", txid);
        Ok(txid)
    }
}
