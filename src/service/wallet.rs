//! Symbol-level wallet operations
//!
//! Validates a request once and routes it to the chain module that owns the
//! symbol. Chain clients are built per call from the read-only config.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::blockchain::amberdata::AmberdataClient;
use crate::blockchain::bitcoin::{BitcoinClient, BtcFamily};
use crate::blockchain::detector::detect_token_protocol;
use crate::blockchain::eos::EosClient;
use crate::blockchain::erc20::{Erc20Client, SUPPORTED_ERC20_TOKENS};
use crate::blockchain::ethereum::{EthereumClient, EvmChain};
use crate::core::config::WalletConfig;
use crate::core::domain::{
    Address, Chain, PrivateKeyRecord, SendReceipt, TokenProtocol, SUPPORTED_SYMBOLS,
    SYMBOLS_REQUIRE_MEMO, SYMBOLS_REQUIRE_PROTOCOL,
};
use crate::core::errors::WalletError;
use crate::core::validation::validate_quantity;

/// Page size of the Amberdata token listing.
const AMBERDATA_PAGE_SIZE: u32 = 100;

/// What a symbol resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Native(Chain),
    Erc20Token,
}

fn route(symbol: &str) -> Result<Route, WalletError> {
    if let Ok(chain) = symbol.parse::<Chain>() {
        return Ok(Route::Native(chain));
    }
    if SUPPORTED_ERC20_TOKENS.contains(&symbol) {
        return Ok(Route::Erc20Token);
    }
    Err(WalletError::UnsupportedSymbol(symbol.to_string()))
}

fn btc_family(chain: Chain) -> Option<BtcFamily> {
    match chain {
        Chain::Btc => Some(BtcFamily::Btc),
        Chain::Bch => Some(BtcFamily::Bch),
        Chain::Bsv => Some(BtcFamily::Bsv),
        _ => None,
    }
}

fn evm_chain(chain: Chain) -> Option<EvmChain> {
    match chain {
        Chain::Eth => Some(EvmChain::Eth),
        Chain::Etc => Some(EvmChain::Etc),
        _ => None,
    }
}

fn describe(to: &Address) -> String {
    serde_json::to_string(to).unwrap_or_else(|_| format!("{:?}", to))
}

/// Checks a multi-protocol destination against the protocol the caller asked for.
pub fn check_protocol(to: &Address) -> Result<TokenProtocol, WalletError> {
    let requested = to
        .protocol
        .ok_or_else(|| WalletError::MissingProtocol(describe(to)))?;
    let deployments = TokenProtocol::deployments(&to.symbol);
    let detected = detect_token_protocol(&to.address);
    match detected {
        Some(protocol) if deployments.contains(&protocol) && protocol == requested => Ok(protocol),
        Some(protocol) => Err(WalletError::ProtocolMismatch(format!(
            "{} address {} belongs to {}, not {}",
            to.symbol, to.address, protocol, requested
        ))),
        None => Err(WalletError::ProtocolMismatch(format!(
            "cannot detect the {} protocol of {}",
            to.symbol, to.address
        ))),
    }
}

pub struct WalletService {
    config: WalletConfig,
}

impl WalletService {
    pub fn new(config: WalletConfig) -> Self {
        Self { config }
    }

    /// Symbols listed when no symbol is given. EOS needs a configured account.
    pub fn symbols(&self) -> Vec<&'static str> {
        SUPPORTED_SYMBOLS
            .iter()
            .copied()
            .filter(|s| *s != "EOS" || self.config.user.eos_account.is_some())
            .collect()
    }

    fn bitcoin(&self, family: BtcFamily) -> BitcoinClient {
        BitcoinClient::new(family, &self.config.endpoints)
    }

    fn ethereum(&self, chain: EvmChain) -> Result<EthereumClient, WalletError> {
        let url = match chain {
            EvmChain::Eth => &self.config.endpoints.eth_rpc,
            EvmChain::Etc => &self.config.endpoints.etc_rpc,
        };
        EthereumClient::new(url, chain)
    }

    fn erc20(&self) -> Result<Erc20Client<ethers::providers::Http>, WalletError> {
        Ok(Erc20Client::new(self.ethereum(EvmChain::Eth)?))
    }

    fn eos(&self) -> Result<EosClient, WalletError> {
        self.config.user.require_eos_account()?;
        EosClient::from_config(&self.config)
    }

    pub fn address(&self, symbol: &str) -> Result<Address, WalletError> {
        let mnemonic = &self.config.user.mnemonic;
        match route(symbol)? {
            Route::Native(Chain::Eos) => self.eos()?.address(),
            Route::Native(chain) => match (btc_family(chain), evm_chain(chain)) {
                (Some(family), _) => self.bitcoin(family).address(mnemonic),
                (_, Some(evm)) => self.ethereum(evm)?.address(mnemonic),
                _ => Err(WalletError::UnsupportedSymbol(symbol.to_string())),
            },
            Route::Erc20Token => {
                let eth = self.ethereum(EvmChain::Eth)?.address(mnemonic)?;
                Ok(Address::new(symbol, eth.address).with_protocol(Some(TokenProtocol::Erc20)))
            }
        }
    }

    pub fn addresses(&self, symbol: Option<&str>) -> Result<BTreeMap<String, Address>, WalletError> {
        let symbols = symbol.map(|s| vec![s]).unwrap_or_else(|| self.symbols());
        symbols
            .into_iter()
            .map(|s| self.address(s).map(|a| (s.to_string(), a)))
            .collect()
    }

    pub fn private_key(&self, symbol: &str) -> Result<PrivateKeyRecord, WalletError> {
        let mnemonic = &self.config.user.mnemonic;
        match route(symbol)? {
            Route::Native(Chain::Eos) => self.eos()?.private_key(mnemonic),
            Route::Native(chain) => match (btc_family(chain), evm_chain(chain)) {
                (Some(family), _) => self.bitcoin(family).private_key(mnemonic),
                (_, Some(evm)) => self.ethereum(evm)?.private_key(mnemonic),
                _ => Err(WalletError::UnsupportedSymbol(symbol.to_string())),
            },
            Route::Erc20Token => {
                let mut record = self.ethereum(EvmChain::Eth)?.private_key(mnemonic)?;
                record.address.symbol = symbol.to_string();
                record.address.protocol = Some(TokenProtocol::Erc20);
                Ok(record)
            }
        }
    }

    pub fn private_keys(
        &self,
        symbol: Option<&str>,
    ) -> Result<BTreeMap<String, PrivateKeyRecord>, WalletError> {
        let symbols = symbol.map(|s| vec![s]).unwrap_or_else(|| self.symbols());
        symbols
            .into_iter()
            .map(|s| self.private_key(s).map(|k| (s.to_string(), k)))
            .collect()
    }

    /// Balance of the wallet's own address for `symbol`, in whole units.
    pub async fn balance(&self, symbol: &str) -> Result<f64, WalletError> {
        let mnemonic = &self.config.user.mnemonic;
        match route(symbol)? {
            Route::Native(Chain::Eos) => self.eos()?.balance(symbol).await,
            Route::Native(chain) => match (btc_family(chain), evm_chain(chain)) {
                (Some(family), _) => self.bitcoin(family).balance(mnemonic).await,
                (_, Some(evm)) => self.ethereum(evm)?.balance(mnemonic).await,
                _ => Err(WalletError::UnsupportedSymbol(symbol.to_string())),
            },
            Route::Erc20Token => {
                let owner = self.ethereum(EvmChain::Eth)?.address(mnemonic)?;
                self.erc20()?.balance_of(symbol, &owner.address).await
            }
        }
    }

    /// Balances of one symbol or of every listed symbol, queried in order,
    /// with the supported ERC-20 tokens merged in.
    pub async fn balances(&self, symbol: Option<&str>) -> Result<BTreeMap<String, f64>, WalletError> {
        let symbols = symbol.map(|s| vec![s]).unwrap_or_else(|| self.symbols());
        let mut result = BTreeMap::new();
        for s in symbols {
            let balance = self.balance(s).await?;
            debug!(symbol = s, balance, "balance");
            result.insert(s.to_string(), balance);
        }
        let owner = self.ethereum(EvmChain::Eth)?.address(&self.config.user.mnemonic)?;
        let tokens = self.erc20()?.balances(&owner.address, SUPPORTED_ERC20_TOKENS).await?;
        result.extend(tokens);
        Ok(result)
    }

    /// Every ERC-20 token held by the ETH address, as listed by Amberdata.
    pub async fn all_erc20_balances(&self) -> Result<BTreeMap<String, f64>, WalletError> {
        let api_key = self.config.user.require_amberdata_key()?;
        let owner = self.ethereum(EvmChain::Eth)?.address(&self.config.user.mnemonic)?;
        let client = AmberdataClient::new(api_key, self.config.endpoints.amberdata_api.clone());
        Ok(client.all_token_balances(&owner.address, AMBERDATA_PAGE_SIZE).await)
    }

    /// Sends `quantity` of `to.symbol` to `to.address`.
    pub async fn send(&self, to: &Address, quantity: &str) -> Result<SendReceipt, WalletError> {
        validate_quantity(quantity)?;
        if SYMBOLS_REQUIRE_MEMO.contains(&to.symbol.as_str())
            && to.memo.as_deref().map_or(true, str::is_empty)
        {
            return Err(WalletError::MissingMemo(describe(to)));
        }
        if SYMBOLS_REQUIRE_PROTOCOL.contains(&to.symbol.as_str()) && to.protocol.is_none() {
            return Err(WalletError::MissingProtocol(describe(to)));
        }

        let mnemonic = &self.config.user.mnemonic;
        let speed = self.config.speed;
        info!(symbol = %to.symbol, address = %to.address, quantity, "send");
        match route(&to.symbol)? {
            Route::Native(Chain::Eos) => {
                let memo = to.memo.as_deref().unwrap_or_default();
                self.eos()?.transfer(mnemonic, &to.address, &to.symbol, quantity, memo).await
            }
            Route::Native(chain) => match (btc_family(chain), evm_chain(chain)) {
                (Some(family), _) => self.bitcoin(family).send(mnemonic, &to.address, quantity, speed).await,
                (_, Some(evm)) => self.ethereum(evm)?.send(mnemonic, &to.address, quantity, speed).await,
                _ => Err(WalletError::UnsupportedSymbol(to.symbol.clone())),
            },
            Route::Erc20Token => match check_protocol(to)? {
                TokenProtocol::Erc20 => {
                    self.erc20()?.transfer(mnemonic, &to.symbol, &to.address, quantity, speed).await
                }
                other => {
                    warn!(symbol = %to.symbol, protocol = %other, "no signer for protocol");
                    Err(WalletError::UnsupportedProtocol(format!("{} over {}", to.symbol, other)))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn service(extra: &[(&str, &str)]) -> WalletService {
        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert("MNEMONIC".into(), PHRASE.into());
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        WalletService::new(WalletConfig::from_map(&vars).unwrap())
    }

    fn usdt(address: &str, protocol: Option<TokenProtocol>) -> Address {
        Address::new("USDT", address).with_protocol(protocol)
    }

    #[test]
    fn test_symbols_skip_eos_without_account() {
        assert!(!service(&[]).symbols().contains(&"EOS"));
        let with_eos = service(&[("eosAccount", "alice"), ("DFUSE_API_KEY", "k")]);
        assert!(with_eos.symbols().contains(&"EOS"));
    }

    #[test]
    fn test_usdt_address_is_eth_address() {
        let svc = service(&[]);
        assert_eq!(svc.address("USDT").unwrap().address, svc.address("ETH").unwrap().address);
        assert!(matches!(svc.address("DOGE"), Err(WalletError::UnsupportedSymbol(_))));
    }

    #[test]
    fn test_check_protocol() {
        let eth = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";
        assert_eq!(check_protocol(&usdt(eth, Some(TokenProtocol::Erc20))).unwrap(), TokenProtocol::Erc20);
        assert!(matches!(
            check_protocol(&usdt(eth, Some(TokenProtocol::Trc20))),
            Err(WalletError::ProtocolMismatch(_))
        ));
        assert!(matches!(
            check_protocol(&usdt("eosio.token", Some(TokenProtocol::Eos))),
            Err(WalletError::ProtocolMismatch(_))
        ));
        assert!(matches!(check_protocol(&usdt(eth, None)), Err(WalletError::MissingProtocol(_))));
    }

    #[tokio::test]
    async fn test_send_validation_order() {
        let svc = service(&[]);
        let err = svc.send(&Address::new("EOS", "bob"), "abc").await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidQuantity(_)));
        assert!(!err.is_fatal());

        let err = svc.send(&Address::new("EOS", "bob"), "1.0000").await.unwrap_err();
        assert!(matches!(err, WalletError::MissingMemo(_)));
        assert!(err.is_fatal());

        let err = svc.send(&usdt("0x9858EfFD232B4033E47d90003D41EC34EcaEda94", None), "1").await.unwrap_err();
        assert!(matches!(err, WalletError::MissingProtocol(_)));

        let err = svc.send(&Address::new("DOGE", "D8"), "1").await.unwrap_err();
        assert!(matches!(err, WalletError::UnsupportedSymbol(_)));
    }

    #[tokio::test]
    async fn test_omni_usdt_has_no_signer() {
        let svc = service(&[]);
        let to = usdt("1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA", Some(TokenProtocol::Omni));
        assert!(matches!(svc.send(&to, "1").await, Err(WalletError::UnsupportedProtocol(_))));
    }
}
