use ethers::{
    prelude::{JsonRpcClient, Middleware, SignerMiddleware},
    providers::{Http, Provider},
    signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer},
    types::{Address as EthAddress, TransactionRequest, U256},
    utils::{format_ether, to_checksum},
};
use secrecy::{ExposeSecret, SecretString};
use std::{str::FromStr, time::Duration};
use tracing::{debug, info};

use crate::core::derivation::{parse_mnemonic, paths};
use crate::core::domain::{Address, Chain, FeeSpeed, PrivateKeyRecord, SendReceipt};
use crate::core::errors::WalletError;
use crate::core::validation::{ensure_precision, to_base_units, validate_ethereum_address};

pub const ETH_DECIMALS: u32 = 18;
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Account-model chains sharing Ethereum's key and transaction format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvmChain {
    Eth,
    Etc,
}

impl EvmChain {
    pub fn chain(&self) -> Chain {
        match self {
            EvmChain::Eth => Chain::Eth,
            EvmChain::Etc => Chain::Etc,
        }
    }

    pub fn symbol(&self) -> &'static str {
        self.chain().symbol()
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            EvmChain::Eth => 1,
            EvmChain::Etc => 61,
        }
    }

    pub fn derivation_path(&self) -> &'static str {
        match self {
            EvmChain::Eth => paths::ETHEREUM,
            EvmChain::Etc => paths::ETHEREUM_CLASSIC,
        }
    }
}

/// Legacy gas price for a speed tier, in wei.
pub fn gas_price(speed: FeeSpeed) -> U256 {
    match speed {
        FeeSpeed::Slow => U256::from(300_000_000u64),
        FeeSpeed::Average => U256::from(1_000_000_000u64),
        FeeSpeed::Fast => U256::from(2_000_000_000u64),
    }
}

/// Builds the signing wallet for `chain` from the mnemonic. Never logs key material.
pub fn wallet_from_mnemonic(mnemonic: &SecretString, chain: EvmChain) -> Result<LocalWallet, WalletError> {
    parse_mnemonic(mnemonic.expose_secret())?;
    let wallet = MnemonicBuilder::<English>::default()
        .phrase(mnemonic.expose_secret().trim())
        .derivation_path(chain.derivation_path())
        .map_err(|e| WalletError::KeyDerivationError(format!("Failed to set derivation path: {}", e)))?
        .build()
        .map_err(|e| WalletError::KeyDerivationError(format!("Failed to build wallet: {}", e)))?;
    Ok(wallet.with_chain_id(chain.chain_id()))
}

pub fn parse_address(address: &str) -> Result<EthAddress, WalletError> {
    validate_ethereum_address(address)?;
    EthAddress::from_str(address)
        .map_err(|e| WalletError::InvalidAddress(format!("Invalid Ethereum address: {}", e)))
}

#[derive(Clone)]
pub struct EthereumClient<P: JsonRpcClient + Clone = Http> {
    provider: Provider<P>,
    chain: EvmChain,
}

impl EthereumClient<Http> {
    pub fn new(rpc_url: &str, chain: EvmChain) -> Result<Self, WalletError> {
        let rpc_url_clean = rpc_url.trim();
        let parsed_url = reqwest::Url::parse(rpc_url_clean).map_err(|e| {
            WalletError::ConfigError(format!("Invalid {} RPC URL '{}': {}", chain.symbol(), rpc_url_clean, e))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WalletError::InternalError(format!("Failed to build HTTP client: {}", e)))?;
        debug!("Using {} RPC {}", chain.symbol(), parsed_url);
        let provider = Provider::new(Http::new_with_client(parsed_url, client));
        Ok(Self { provider, chain })
    }
}

impl<P> EthereumClient<P>
where
    P: JsonRpcClient + Clone + Send + Sync + 'static,
{
    /// Creates a new EthereumClient with a given provider.
    pub fn new_with_provider(provider: Provider<P>, chain: EvmChain) -> EthereumClient<P> {
        EthereumClient { provider, chain }
    }

    pub fn chain(&self) -> EvmChain {
        self.chain
    }

    pub fn provider(&self) -> &Provider<P> {
        &self.provider
    }

    pub fn address(&self, mnemonic: &SecretString) -> Result<Address, WalletError> {
        let wallet = wallet_from_mnemonic(mnemonic, self.chain)?;
        Ok(Address::new(self.chain.symbol(), to_checksum(&wallet.address(), None)))
    }

    pub fn private_key(&self, mnemonic: &SecretString) -> Result<PrivateKeyRecord, WalletError> {
        let wallet = wallet_from_mnemonic(mnemonic, self.chain)?;
        let address = Address::new(self.chain.symbol(), to_checksum(&wallet.address(), None));
        let key = format!("0x{}", hex::encode(wallet.signer().to_bytes()));
        Ok(PrivateKeyRecord::new(address, key))
    }

    pub async fn balance_wei(&self, address: EthAddress) -> Result<U256, WalletError> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| WalletError::NetworkError(format!("Failed to get balance: {}", e)))
    }

    /// Balance of `address` in whole coins.
    pub async fn balance_of(&self, address: &str) -> Result<f64, WalletError> {
        let address = parse_address(address)?;
        let balance = self.balance_wei(address).await?;
        let balance_eth = format_ether(balance);
        debug!("Balance: {} {}", balance_eth, self.chain.symbol());
        balance_eth
            .parse::<f64>()
            .map_err(|e| WalletError::SerializationError(format!("balance {}: {}", balance_eth, e)))
    }

    pub async fn balance(&self, mnemonic: &SecretString) -> Result<f64, WalletError> {
        let address = self.address(mnemonic)?;
        self.balance_of(&address.address).await
    }

    /// Sends `quantity` coins to `to` as a legacy transaction with a fixed 21000 gas limit.
    pub async fn send(
        &self,
        mnemonic: &SecretString,
        to: &str,
        quantity: &str,
        speed: FeeSpeed,
    ) -> Result<SendReceipt, WalletError> {
        let to_address = parse_address(to)?;
        ensure_precision(quantity, ETH_DECIMALS as usize)?;
        let amount_wei = U256::from(to_base_units(quantity, ETH_DECIMALS)?);

        let wallet = wallet_from_mnemonic(mnemonic, self.chain)?;
        let balance = self.balance_wei(wallet.address()).await?;
        if amount_wei > balance {
            return Err(WalletError::InsufficientFunds(format!(
                "quantity {} is greater than balance {}",
                quantity,
                format_ether(balance)
            )));
        }

        let tx = TransactionRequest::new()
            .to(to_address)
            .value(amount_wei)
            .gas(TRANSFER_GAS_LIMIT)
            .gas_price(gas_price(speed))
            .chain_id(self.chain.chain_id());

        info!(chain = self.chain.symbol(), to, quantity, "Sending native transfer");
        let client = SignerMiddleware::new(self.provider.clone(), wallet);
        let pending_tx = client.send_transaction(tx, None).await.map_err(|e| {
            WalletError::BlockchainError(format!("Failed to send transaction: {}", e))
        })?;

        let tx_hash = format!("0x{}", hex::encode(pending_tx.tx_hash().as_bytes()));
        info!(tx_hash = %tx_hash, "Transaction sent");
        Ok(SendReceipt { txid: tx_hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn make_local_client(chain: EvmChain) -> EthereumClient<Http> {
        EthereumClient::new("http://127.0.0.1:8545", chain).expect("provider url ok")
    }

    #[test]
    fn test_known_eth_address() {
        let client = make_local_client(EvmChain::Eth);
        let address = client.address(&SecretString::new(PHRASE.into())).unwrap();
        assert_eq!(address.address, "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
        assert_eq!(address.symbol, "ETH");
    }

    #[test]
    fn test_etc_uses_its_own_path() {
        let m = SecretString::new(PHRASE.into());
        let eth = make_local_client(EvmChain::Eth).address(&m).unwrap();
        let etc = make_local_client(EvmChain::Etc).address(&m).unwrap();
        assert_ne!(eth.address, etc.address);
        assert_eq!(wallet_from_mnemonic(&m, EvmChain::Etc).unwrap().chain_id(), 61);
    }

    #[test]
    fn test_private_key_rebuilds_address() {
        let m = SecretString::new(PHRASE.into());
        let record = make_local_client(EvmChain::Eth).private_key(&m).unwrap();
        let key = record.private_key.expose_secret();
        assert!(key.starts_with("0x") && key.len() == 66);
        let rebuilt = LocalWallet::from_str(&key[2..]).unwrap();
        assert_eq!(to_checksum(&rebuilt.address(), None), record.address.address);
    }

    #[test]
    fn test_gas_price_table() {
        assert_eq!(gas_price(FeeSpeed::Slow), U256::from(300_000_000u64));
        assert_eq!(gas_price(FeeSpeed::Average), U256::exp10(9));
        assert_eq!(gas_price(FeeSpeed::Fast), U256::from(2) * U256::exp10(9));
    }

    #[test]
    fn test_invalid_rpc_url() {
        assert!(matches!(
            EthereumClient::new("not a url", EvmChain::Eth),
            Err(WalletError::ConfigError(_))
        ));
    }
}
