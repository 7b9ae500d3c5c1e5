//! EOS integration
//!
//! Keys are derived locally; the account itself must already exist on chain
//! and be configured as `eosAccount`. Chain reads and pushes go through dfuse.

pub mod client;
pub mod keys;
pub mod serialize;

use chrono::NaiveDateTime;
use secrecy::SecretString;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub use client::{BlockInfo, ChainInfo, DfuseClient, PushTransaction};
pub use keys::EosKeypair;
pub use serialize::{is_valid_account_name, Action, Asset, PermissionLevel, Transaction};

use crate::core::config::WalletConfig;
use crate::core::domain::{Address, Chain, PrivateKeyRecord, SendReceipt};
use crate::core::errors::WalletError;
use crate::core::validation::calc_decimals;

/// TAPoS reference block distance from head.
pub const BLOCKS_BEHIND: u32 = 360;
pub const EXPIRE_SECONDS: i64 = 3600;

const REGISTER_KEY_COMMENT: &str = "Remember to register the publicKey to your EOS account";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EosToken {
    pub symbol: &'static str,
    pub contract: &'static str,
    pub decimals: usize,
}

const TOKENS: &[EosToken] = &[
    EosToken { symbol: "EOS", contract: "eosio.token", decimals: 4 },
    EosToken { symbol: "DICE", contract: "betdicetoken", decimals: 4 },
    EosToken { symbol: "EIDOS", contract: "eidosonecoin", decimals: 4 },
    EosToken { symbol: "KEY", contract: "everipediaiq", decimals: 3 },
    EosToken { symbol: "USDT", contract: "tethertether", decimals: 4 },
];

pub fn token_info(symbol: &str) -> Option<&'static EosToken> {
    TOKENS.iter().find(|t| t.symbol == symbol)
}

impl EosToken {
    /// Parses `quantity` as an asset of this token. The precision must match exactly.
    pub fn asset(&self, quantity: &str) -> Result<Asset, WalletError> {
        if calc_decimals(quantity) != self.decimals {
            return Err(WalletError::PrecisionMismatch(format!(
                "The quantity {} precision is NOT equal to {}",
                quantity, self.decimals
            )));
        }
        Asset::parse(&format!("{} {}", quantity, self.symbol))
    }
}

/// Builds the unsigned `transfer` transaction referencing `ref_block`.
pub fn build_transfer(
    from: &str,
    to: &str,
    token: &EosToken,
    asset: &Asset,
    memo: &str,
    ref_block: &BlockInfo,
) -> Result<Transaction, WalletError> {
    let data = serialize::transfer_data(from, to, asset, memo)?;

    let block_time = NaiveDateTime::parse_from_str(&ref_block.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| WalletError::BlockchainError(format!("block timestamp {}: {}", ref_block.timestamp, e)))?;
    let expiration = u32::try_from(block_time.and_utc().timestamp() + EXPIRE_SECONDS)
        .map_err(|_| WalletError::BlockchainError(format!("expiration out of range: {}", ref_block.timestamp)))?;

    let block_id = hex::decode(&ref_block.id)
        .map_err(|e| WalletError::BlockchainError(format!("block id {}: {}", ref_block.id, e)))?;
    if block_id.len() < 12 {
        return Err(WalletError::BlockchainError(format!("block id too short: {}", ref_block.id)));
    }
    let ref_block_prefix = u32::from_le_bytes([block_id[8], block_id[9], block_id[10], block_id[11]]);

    Ok(Transaction {
        expiration,
        ref_block_num: (ref_block.block_num & 0xffff) as u16,
        ref_block_prefix,
        actions: vec![Action {
            account: token.contract.to_string(),
            name: "transfer".to_string(),
            authorization: vec![PermissionLevel { actor: from.to_string(), permission: "active".to_string() }],
            data,
        }],
    })
}

/// `sha256(chain_id || packed_trx || 32 zero bytes)`.
pub fn signing_digest(chain_id: &str, packed_trx: &[u8]) -> Result<[u8; 32], WalletError> {
    let chain_id = hex::decode(chain_id)
        .map_err(|e| WalletError::BlockchainError(format!("chain id {}: {}", chain_id, e)))?;
    let mut hasher = Sha256::new();
    hasher.update(&chain_id);
    hasher.update(packed_trx);
    hasher.update([0u8; 32]);
    Ok(hasher.finalize().into())
}

/// Picks the row for `symbol` out of an `accounts` table; a missing row means zero.
pub fn parse_balance(rows: &[String], symbol: &str) -> f64 {
    rows.iter()
        .filter_map(|row| row.split_once(' '))
        .find(|(_, sym)| *sym == symbol)
        .and_then(|(amount, _)| amount.parse::<f64>().ok())
        .unwrap_or(0.0)
}

pub struct EosClient {
    dfuse: DfuseClient,
    account: Option<String>,
}

impl EosClient {
    pub fn new(dfuse: DfuseClient, account: Option<String>) -> Self {
        Self { dfuse, account }
    }

    pub fn from_config(config: &WalletConfig) -> Result<Self, WalletError> {
        let api_key = config.user.require_dfuse_key()?;
        let dfuse = DfuseClient::new(api_key, &config.endpoints.dfuse_auth, &config.endpoints.eos_api);
        Ok(Self::new(dfuse, config.user.eos_account.clone()))
    }

    fn account(&self) -> Result<&str, WalletError> {
        self.account
            .as_deref()
            .ok_or_else(|| WalletError::ConfigError("eosAccount is missing in .env".to_string()))
    }

    pub fn address(&self) -> Result<Address, WalletError> {
        Ok(Address::new(Chain::Eos.symbol(), self.account()?))
    }

    pub fn private_key(&self, mnemonic: &SecretString) -> Result<PrivateKeyRecord, WalletError> {
        let keypair = EosKeypair::from_mnemonic(mnemonic)?;
        let mut record = PrivateKeyRecord::new(self.address()?, keypair.private_key_wif());
        record.public_key = Some(keypair.public_key());
        record.comment = Some(REGISTER_KEY_COMMENT.to_string());
        Ok(record)
    }

    pub async fn balance(&self, symbol: &str) -> Result<f64, WalletError> {
        let account = self.account()?.to_string();
        self.balance_of(&account, symbol).await
    }

    /// Token balance of `account`; `-1` when the token is not listed.
    pub async fn balance_of(&self, account: &str, symbol: &str) -> Result<f64, WalletError> {
        let Some(token) = token_info(symbol) else {
            warn!("unknown EOS token {}", symbol);
            return Ok(-1.0);
        };
        let rows = self.dfuse.account_balances(token.contract, account).await?;
        debug!(account, symbol, ?rows, "accounts table");
        Ok(parse_balance(&rows, symbol))
    }

    pub async fn transfer(
        &self,
        mnemonic: &SecretString,
        to: &str,
        symbol: &str,
        quantity: &str,
        memo: &str,
    ) -> Result<SendReceipt, WalletError> {
        let from = self.account()?;
        if !is_valid_account_name(to) {
            return Err(WalletError::InvalidAddress(format!("{} is not a valid EOS account name", to)));
        }
        let token = token_info(symbol)
            .ok_or_else(|| WalletError::UnsupportedSymbol(format!("{} (no EOS token contract known)", symbol)))?;
        let asset = token.asset(quantity)?;
        let keypair = EosKeypair::from_mnemonic(mnemonic)?;

        let chain = self.dfuse.get_info().await?;
        let ref_block = self.dfuse.get_block(chain.head_block_num.saturating_sub(BLOCKS_BEHIND).max(1)).await?;
        let tx = build_transfer(from, to, token, &asset, memo, &ref_block)?;
        let packed = serialize::pack_transaction(&tx)?;
        let signature = keypair.sign_digest(&signing_digest(&chain.chain_id, &packed)?)?;

        info!(from, to, symbol, quantity, "Pushing EOS transfer");
        let txid = self
            .dfuse
            .push_transaction(&PushTransaction {
                signatures: vec![signature],
                compression: 0,
                packed_context_free_data: String::new(),
                packed_trx: hex::encode(&packed),
            })
            .await?;
        Ok(SendReceipt { txid })
    }
}
