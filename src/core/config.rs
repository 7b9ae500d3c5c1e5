use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::core::derivation::parse_mnemonic;
use crate::core::domain::FeeSpeed;
use crate::core::errors::WalletError;

/// Secrets and account names read from `.env`.
#[derive(Debug)]
pub struct UserConfig {
    pub mnemonic: SecretString,
    pub dfuse_api_key: Option<SecretString>,
    pub amberdata_api_key: Option<SecretString>,
    pub eos_account: Option<String>,
}

impl UserConfig {
    /// Builds and validates the user config from parsed key/value pairs.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, WalletError> {
        let non_empty = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let mnemonic = non_empty("MNEMONIC")
            .ok_or_else(|| WalletError::ConfigError("MNEMONIC is missing in .env".to_string()))?;
        parse_mnemonic(mnemonic)?;

        let dfuse_api_key = non_empty("DFUSE_API_KEY").map(|v| SecretString::new(v.to_string()));
        let eos_account = non_empty("eosAccount").map(str::to_string);
        if eos_account.is_some() && dfuse_api_key.is_none() {
            return Err(WalletError::ConfigError(
                "eosAccount requires DFUSE_API_KEY".to_string(),
            ));
        }

        Ok(Self {
            mnemonic: SecretString::new(mnemonic.to_string()),
            dfuse_api_key,
            amberdata_api_key: non_empty("AMBERDATA_API_KEY")
                .map(|v| SecretString::new(v.to_string())),
            eos_account,
        })
    }

    pub fn require_eos_account(&self) -> Result<&str, WalletError> {
        self.eos_account
            .as_deref()
            .ok_or_else(|| WalletError::ConfigError("eosAccount is missing in .env".to_string()))
    }

    pub fn require_dfuse_key(&self) -> Result<&str, WalletError> {
        self.dfuse_api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .ok_or_else(|| WalletError::ConfigError("DFUSE_API_KEY is missing in .env".to_string()))
    }

    pub fn require_amberdata_key(&self) -> Result<&str, WalletError> {
        self.amberdata_api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .ok_or_else(|| {
                WalletError::ConfigError("AMBERDATA_API_KEY is missing in .env".to_string())
            })
    }
}

/// Base URLs of every explorer and RPC the wallet talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub btc_api: String,
    pub bch_api: String,
    pub bsv_api: String,
    pub eth_rpc: String,
    pub etc_rpc: String,
    pub amberdata_api: String,
    pub dfuse_auth: String,
    pub eos_api: String,
}

impl EndpointConfig {
    fn default_btc_api() -> &'static str { "https://blockstream.info/api" }
    fn default_bch_api() -> &'static str { "https://rest.bitcoin.com/v2" }
    fn default_bsv_api() -> &'static str { "https://api.whatsonchain.com/v1/bsv/main" }
    fn default_eth_rpc() -> &'static str { "https://eth.llamarpc.com" }
    fn default_etc_rpc() -> &'static str { "https://www.ethercluster.com/etc" }
    fn default_amberdata_api() -> &'static str { "https://web3api.io/api/v2" }
    fn default_dfuse_auth() -> &'static str { "https://auth.dfuse.io" }
    fn default_eos_api() -> &'static str { "https://mainnet.eos.dfuse.io" }

    /// Applies `*_API_URL` / `*_RPC_URL` overrides on top of the public defaults.
    pub fn from_map(vars: &HashMap<String, String>) -> Self {
        let pick = |key: &str, default: &str| {
            vars.get(key)
                .map(|v| v.trim().trim_end_matches('/'))
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        Self {
            btc_api: pick("BTC_API_URL", Self::default_btc_api()),
            bch_api: pick("BCH_API_URL", Self::default_bch_api()),
            bsv_api: pick("BSV_API_URL", Self::default_bsv_api()),
            eth_rpc: pick("ETH_RPC_URL", Self::default_eth_rpc()),
            etc_rpc: pick("ETC_RPC_URL", Self::default_etc_rpc()),
            amberdata_api: pick("AMBERDATA_API_URL", Self::default_amberdata_api()),
            dfuse_auth: pick("DFUSE_AUTH_URL", Self::default_dfuse_auth()),
            eos_api: pick("EOS_API_URL", Self::default_eos_api()),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::from_map(&HashMap::new())
    }
}

/// Everything a command needs, built once at startup and then read-only.
#[derive(Debug)]
pub struct WalletConfig {
    pub user: UserConfig,
    pub endpoints: EndpointConfig,
    pub speed: FeeSpeed,
}

impl WalletConfig {
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, WalletError> {
        Ok(Self {
            user: UserConfig::from_map(vars)?,
            endpoints: EndpointConfig::from_map(vars),
            speed: FeeSpeed::default(),
        })
    }

    /// Reads a dotenv file without touching the process environment.
    pub fn from_env_file(path: &Path) -> Result<Self, WalletError> {
        if !path.exists() {
            return Err(WalletError::ConfigError(format!(
                "Please put a .env file at {}",
                path.display()
            )));
        }
        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| WalletError::ConfigError(format!("{}: {}", path.display(), e)))?;
        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) =
                item.map_err(|e| WalletError::ConfigError(format!("{}: {}", path.display(), e)))?;
            vars.insert(key, value);
        }
        debug!(path = %path.display(), keys = vars.len(), "loaded env file");
        Self::from_map(&vars)
    }

    pub fn with_speed(mut self, speed: FeeSpeed) -> Self {
        self.speed = speed;
        self
    }
}
