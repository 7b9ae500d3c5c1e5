use async_trait::async_trait;

use crate::core::domain::UnspentOutput;
use crate::core::errors::WalletError;

/// Defines the REST surface the Bitcoin-family builder needs from a block explorer.
#[async_trait]
pub trait UtxoExplorer: Send + Sync {
    /// Lists the unspent outputs locked to `address`.
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<UnspentOutput>, WalletError>;

    /// Returns the balance of `address` in satoshis, unconfirmed included.
    async fn fetch_balance(&self, address: &str) -> Result<u64, WalletError>;

    /// Posts a raw hex transaction and returns its txid.
    async fn broadcast(&self, raw_tx: &str) -> Result<String, WalletError>;
}
