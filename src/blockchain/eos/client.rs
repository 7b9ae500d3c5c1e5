//! dfuse-backed EOS chain access
//!
//! Authentication issues a short-lived bearer token from the API key; every
//! chain call after that carries it.

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::core::errors::WalletError;

const PUSH_GUARANTEE_HEADER: &str = "X-Eos-Push-Guarantee";
const PUSH_GUARANTEE: &str = "in-block";

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
    Err(WalletError::BlockchainError(format!("{} returned {}: {}", context, status, body.trim())))
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainInfo {
    pub chain_id: String,
    pub head_block_num: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockInfo {
    pub id: String,
    pub block_num: u32,
    /// `YYYY-MM-DDTHH:MM:SS.sss`, UTC without offset.
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct PushTransaction {
    pub signatures: Vec<String>,
    pub compression: u8,
    pub packed_context_free_data: String,
    pub packed_trx: String,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    transaction_id: String,
}

#[derive(Debug, Deserialize)]
struct StateTableResponse {
    #[serde(default)]
    rows: Vec<StateRow>,
}

#[derive(Debug, Deserialize)]
struct StateRow {
    json: Option<AccountRow>,
}

#[derive(Debug, Deserialize)]
struct AccountRow {
    balance: String,
}

pub struct DfuseClient {
    api_key: String,
    auth_url: String,
    api_url: String,
    http_client: HttpClient,
    token: OnceCell<String>,
}

impl DfuseClient {
    pub fn new(api_key: impl Into<String>, auth_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            auth_url: auth_url.into(),
            api_url: api_url.into(),
            http_client: HttpClient::new(),
            token: OnceCell::new(),
        }
    }

    async fn token(&self) -> Result<&str, WalletError> {
        let token = self
            .token
            .get_or_try_init(|| async {
                let url = format!("{}/v1/auth/issue", self.auth_url);
                debug!("POST {}", url);
                let response = self
                    .http_client
                    .post(&url)
                    .json(&json!({ "api_key": self.api_key }))
                    .send()
                    .await
                    .map_err(|e| network_error("dfuse auth", e))?;
                let auth: AuthResponse = ensure_success(response, "dfuse auth")
                    .await?
                    .json()
                    .await
                    .map_err(|e| network_error("dfuse auth", e))?;
                Ok::<_, WalletError>(auth.token)
            })
            .await?;
        Ok(token.as_str())
    }

    async fn post_chain<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, WalletError> {
        let token = self.token().await?;
        let url = format!("{}{}", self.api_url, path);
        debug!("POST {}", url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(path, e))?;
        ensure_success(response, path).await?.json().await.map_err(|e| network_error(path, e))
    }

    pub async fn get_info(&self) -> Result<ChainInfo, WalletError> {
        self.post_chain("/v1/chain/get_info", &json!({})).await
    }

    pub async fn get_block(&self, block_num: u32) -> Result<BlockInfo, WalletError> {
        self.post_chain("/v1/chain/get_block", &json!({ "block_num_or_id": block_num })).await
    }

    /// Pushes a signed transaction and waits until it is included in a block.
    pub async fn push_transaction(&self, tx: &PushTransaction) -> Result<String, WalletError> {
        let token = self.token().await?;
        let url = format!("{}/v1/chain/push_transaction", self.api_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .header(PUSH_GUARANTEE_HEADER, PUSH_GUARANTEE)
            .json(tx)
            .send()
            .await
            .map_err(|e| network_error("push_transaction", e))?;
        let pushed: PushResponse = ensure_success(response, "push_transaction")
            .await?
            .json()
            .await
            .map_err(|e| network_error("push_transaction", e))?;
        info!("pushed EOS transaction {}", pushed.transaction_id);
        Ok(pushed.transaction_id)
    }

    /// Raw `balance` strings from `contract`'s `accounts` table scoped to `account`.
    pub async fn account_balances(&self, contract: &str, account: &str) -> Result<Vec<String>, WalletError> {
        let token = self.token().await?;
        let url = format!("{}/v0/state/table", self.api_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&[("account", contract), ("scope", account), ("table", "accounts"), ("json", "true")])
            .send()
            .await
            .map_err(|e| network_error("state table", e))?;
        let table: StateTableResponse = ensure_success(response, "state table")
            .await?
            .json()
            .await
            .map_err(|e| network_error("state table", e))?;
        Ok(table.rows.into_iter().filter_map(|r| r.json).map(|r| r.balance).collect())
    }
}
