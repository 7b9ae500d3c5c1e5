//! ERC-20 balances and transfers on Ethereum mainnet.

use ethers::{
    contract::abigen,
    prelude::{JsonRpcClient, SignerMiddleware},
    providers::Provider,
    signers::Signer,
    types::{Address as EthAddress, U256},
    utils::format_units,
};
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use super::ethereum::{gas_price, parse_address, wallet_from_mnemonic, EthereumClient, EvmChain};
use crate::core::domain::{FeeSpeed, SendReceipt};
use crate::core::errors::WalletError;
use crate::core::validation::{ensure_precision, to_base_units};

abigen!(
    Erc20Token,
    r#"[
        function balanceOf(address owner) external view returns (uint256)
        function transfer(address to, uint256 amount) external returns (bool)
    ]"#
);

/// Gas limit for a plain token transfer.
pub const TOKEN_TRANSFER_GAS_LIMIT: u64 = 100_000;

/// Tokens merged into the `balance` listing.
pub const SUPPORTED_ERC20_TOKENS: &[&str] = &["USDT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: &'static str,
    pub contract: &'static str,
    pub decimals: u32,
}

const TOKENS: &[TokenInfo] = &[
    TokenInfo { symbol: "USDT", contract: "0xdAC17F958D2ee523a2206206994597C13D831ec7", decimals: 6 },
    TokenInfo { symbol: "USDC", contract: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", decimals: 6 },
    TokenInfo { symbol: "DAI", contract: "0x6B175474E89094C44Da98b954EedeAC495271d0F", decimals: 18 },
];

pub fn token_info(symbol: &str) -> Result<&'static TokenInfo, WalletError> {
    TOKENS
        .iter()
        .find(|t| t.symbol == symbol)
        .ok_or_else(|| WalletError::UnsupportedSymbol(format!("{} (no ERC20 contract known)", symbol)))
}

fn contract_address(info: &TokenInfo) -> Result<EthAddress, WalletError> {
    EthAddress::from_str(info.contract)
        .map_err(|e| WalletError::InternalError(format!("bad contract for {}: {}", info.symbol, e)))
}

/// ERC-20 operations over an Ethereum mainnet client.
pub struct Erc20Client<P: JsonRpcClient + Clone> {
    eth: EthereumClient<P>,
}

impl<P> Erc20Client<P>
where
    P: JsonRpcClient + Clone + Send + Sync + 'static,
{
    pub fn new(eth: EthereumClient<P>) -> Self {
        Self { eth }
    }

    fn provider(&self) -> Arc<Provider<P>> {
        Arc::new(self.eth.provider().clone())
    }

    pub async fn balance_units(&self, symbol: &str, owner: EthAddress) -> Result<U256, WalletError> {
        let info = token_info(symbol)?;
        let token = Erc20Token::new(contract_address(info)?, self.provider());
        token
            .balance_of(owner)
            .call()
            .await
            .map_err(|e| WalletError::NetworkError(format!("{} balanceOf failed: {}", symbol, e)))
    }

    /// Token balance of `owner` in whole tokens.
    pub async fn balance_of(&self, symbol: &str, owner: &str) -> Result<f64, WalletError> {
        let info = token_info(symbol)?;
        let owner = parse_address(owner)?;
        let units = self.balance_units(symbol, owner).await?;
        let formatted = format_units(units, info.decimals)
            .map_err(|e| WalletError::SerializationError(format!("{}: {}", symbol, e)))?;
        debug!("{} balance of {:?}: {}", symbol, owner, formatted);
        formatted
            .parse::<f64>()
            .map_err(|e| WalletError::SerializationError(format!("{}: {}", formatted, e)))
    }

    /// Balances of several tokens, queried one after another.
    pub async fn balances(&self, owner: &str, symbols: &[&str]) -> Result<BTreeMap<String, f64>, WalletError> {
        let mut result = BTreeMap::new();
        for symbol in symbols {
            let balance = self.balance_of(symbol, owner).await?;
            result.insert(symbol.to_string(), balance);
        }
        Ok(result)
    }

    /// Calls `transfer(to, amount)` on the token contract from the wallet's ETH account.
    pub async fn transfer(
        &self,
        mnemonic: &SecretString,
        symbol: &str,
        to: &str,
        quantity: &str,
        speed: FeeSpeed,
    ) -> Result<SendReceipt, WalletError> {
        let info = token_info(symbol)?;
        let to_address = parse_address(to)?;
        ensure_precision(quantity, info.decimals as usize)?;
        let amount = U256::from(to_base_units(quantity, info.decimals)?);

        let wallet = wallet_from_mnemonic(mnemonic, EvmChain::Eth)?;
        let balance = self.balance_units(symbol, wallet.address()).await?;
        if amount > balance {
            return Err(WalletError::InsufficientFunds(format!(
                "quantity {} is greater than {} balance {}",
                quantity,
                symbol,
                format_units(balance, info.decimals).unwrap_or_default()
            )));
        }

        let signer = Arc::new(SignerMiddleware::new(self.eth.provider().clone(), wallet));
        let token = Erc20Token::new(contract_address(info)?, signer);
        let call = token
            .transfer(to_address, amount)
            .legacy()
            .gas(TOKEN_TRANSFER_GAS_LIMIT)
            .gas_price(gas_price(speed));

        info!(symbol, to, quantity, "Sending ERC20 transfer");
        let pending_tx = call
            .send()
            .await
            .map_err(|e| WalletError::BlockchainError(format!("Failed to send {} transfer: {}", symbol, e)))?;
        let tx_hash = format!("0x{}", hex::encode(pending_tx.tx_hash().as_bytes()));
        info!(tx_hash = %tx_hash, "Token transfer sent");
        Ok(SendReceipt { txid: tx_hash })
    }
}
