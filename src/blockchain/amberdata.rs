//! Amberdata web3 API client
//!
//! Lists every ERC-20 token held by an Ethereum address.

use ethers::{types::U256, utils::format_units};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Amberdata API client
pub struct AmberdataClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

/// Amberdata API response
#[derive(Debug, Deserialize)]
struct AmberdataResponse {
    status: u16,
    title: String,
    payload: TokenPayload,
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    records: Vec<TokenRecord>,
}

/// One token holding
#[derive(Debug, Deserialize)]
struct TokenRecord {
    symbol: String,
    amount: String,
    decimals: String,
}

impl TokenRecord {
    fn balance(&self) -> Option<f64> {
        let units = U256::from_dec_str(&self.amount).ok()?;
        let decimals: u32 = self.decimals.parse().ok()?;
        format_units(units, decimals).ok()?.parse().ok()
    }
}

impl AmberdataClient {
    /// Creates a new Amberdata client
    ///
    /// # Arguments
    /// * `api_key` - value sent as `x-api-key`
    /// * `base_url` - API root, `https://web3api.io/api/v2` in production
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), base_url: base_url.into(), client: reqwest::Client::new() }
    }

    /// Balances of every ERC-20 token held by `address`, keyed by symbol.
    ///
    /// Any transport or API failure yields an empty map.
    pub async fn all_token_balances(&self, address: &str, size: u32) -> BTreeMap<String, f64> {
        let url = format!(
            "{}/addresses/{}/tokens?sortType=amount&direction=descending&page=0&size={}",
            self.base_url, address, size
        );
        let response = self
            .client
            .get(&url)
            .header("x-amberdata-blockchain-id", "ethereum-mainnet")
            .header("x-api-key", &self.api_key)
            .send()
            .await;

        let body: AmberdataResponse = match response {
            Ok(r) if r.status().is_success() => match r.json().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Amberdata response could not be parsed: {}", e);
                    return BTreeMap::new();
                }
            },
            Ok(r) => {
                warn!("Amberdata returned {}", r.status());
                return BTreeMap::new();
            }
            Err(e) => {
                warn!("Amberdata request failed: {}", e);
                return BTreeMap::new();
            }
        };
        if body.status != 200 || body.title != "OK" {
            warn!(status = body.status, title = %body.title, "Amberdata API error");
            return BTreeMap::new();
        }

        let mut result = BTreeMap::new();
        for record in &body.payload.records {
            match record.balance() {
                Some(balance) => {
                    result.insert(record.symbol.clone(), balance);
                }
                None => debug!("skipping unparsable token record {}", record.symbol),
            }
        }
        result
    }
}
