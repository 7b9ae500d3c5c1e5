use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::core::errors::WalletError;

/// Symbols that cannot be sent without a memo.
pub const SYMBOLS_REQUIRE_MEMO: &[&str] = &["ATOM", "EOS", "XLM", "XRP"];

/// Symbols deployed on more than one token protocol.
pub const SYMBOLS_REQUIRE_PROTOCOL: &[&str] = &["USDT"];

/// Native chains the wallet derives keys for.
pub const SUPPORTED_SYMBOLS: &[&str] = &["BCH", "BSV", "BTC", "EOS", "ETC", "ETH"];

/// Native chains handled by the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Bch,
    Bsv,
    Btc,
    Eos,
    Etc,
    Eth,
}

impl Chain {
    pub const ALL: [Chain; 6] = [Chain::Bch, Chain::Bsv, Chain::Btc, Chain::Eos, Chain::Etc, Chain::Eth];

    pub fn symbol(&self) -> &'static str {
        match self {
            Chain::Bch => "BCH",
            Chain::Bsv => "BSV",
            Chain::Btc => "BTC",
            Chain::Eos => "EOS",
            Chain::Etc => "ETC",
            Chain::Eth => "ETH",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Chain {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BCH" => Ok(Chain::Bch),
            "BSV" => Ok(Chain::Bsv),
            "BTC" => Ok(Chain::Btc),
            "EOS" => Ok(Chain::Eos),
            "ETC" => Ok(Chain::Etc),
            "ETH" => Ok(Chain::Eth),
            other => Err(WalletError::UnsupportedSymbol(other.to_string())),
        }
    }
}

/// Token standards a multi-protocol symbol may be deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenProtocol {
    #[serde(rename = "EOS")]
    Eos,
    #[serde(rename = "ERC20")]
    Erc20,
    #[serde(rename = "IRC20")]
    Irc20,
    #[serde(rename = "NEP5")]
    Nep5,
    #[serde(rename = "NRC20")]
    Nrc20,
    #[serde(rename = "OMNI")]
    Omni,
    #[serde(rename = "TRC20")]
    Trc20,
}

impl TokenProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenProtocol::Eos => "EOS",
            TokenProtocol::Erc20 => "ERC20",
            TokenProtocol::Irc20 => "IRC20",
            TokenProtocol::Nep5 => "NEP5",
            TokenProtocol::Nrc20 => "NRC20",
            TokenProtocol::Omni => "OMNI",
            TokenProtocol::Trc20 => "TRC20",
        }
    }

    /// Protocols a multi-protocol symbol is deployed on. Empty for everything else.
    pub fn deployments(symbol: &str) -> &'static [TokenProtocol] {
        match symbol {
            "USDT" => &[TokenProtocol::Erc20, TokenProtocol::Omni, TokenProtocol::Trc20],
            _ => &[],
        }
    }
}

impl fmt::Display for TokenProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenProtocol {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EOS" => Ok(TokenProtocol::Eos),
            "ERC20" => Ok(TokenProtocol::Erc20),
            "IRC20" => Ok(TokenProtocol::Irc20),
            "NEP5" => Ok(TokenProtocol::Nep5),
            "NRC20" => Ok(TokenProtocol::Nrc20),
            "OMNI" => Ok(TokenProtocol::Omni),
            "TRC20" => Ok(TokenProtocol::Trc20),
            other => Err(WalletError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// Transaction fee tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FeeSpeed {
    Slow,
    #[default]
    Average,
    Fast,
}

/// A destination or an owned address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub symbol: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<TokenProtocol>,
    /// BCH only: base58 P2PKH form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_address: Option<String>,
    /// BCH only: CashAddr form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_address: Option<String>,
}

impl Address {
    pub fn new(symbol: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            address: address.into(),
            memo: None,
            protocol: None,
            legacy_address: None,
            cash_address: None,
        }
    }

    pub fn with_memo(mut self, memo: Option<String>) -> Self {
        self.memo = memo;
        self
    }

    pub fn with_protocol(mut self, protocol: Option<TokenProtocol>) -> Self {
        self.protocol = protocol;
        self
    }
}

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// An owned address together with its private key.
///
/// Only ever built on demand for the `private_keys` command or for signing; never written to disk.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateKeyRecord {
    #[serde(flatten)]
    pub address: Address,
    /// WIF for BTC/BCH/BSV/EOS, 0x-prefixed hex for ETH/ETC.
    #[serde(serialize_with = "serialize_secret")]
    pub private_key: SecretString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl fmt::Debug for PrivateKeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyRecord")
            .field("address", &self.address)
            .field("private_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl PrivateKeyRecord {
    pub fn new(address: Address, private_key: String) -> Self {
        Self { address, private_key: SecretString::new(private_key), public_key: None, comment: None }
    }
}

/// An unspent output as returned by a block explorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub txid: String,
    pub vout: u32,
    pub satoshis: u64,
}

/// Normalized result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    pub txid: String,
}
