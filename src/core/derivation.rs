//! BIP-39/BIP-32 key derivation shared by every chain module.
//!
//! The same mnemonic and path always yield the same key. Seeds live only
//! inside a `Zeroizing` buffer for the duration of one derivation.

use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::Network;
use bip39::{Language, Mnemonic};
use secrecy::{ExposeSecret, SecretString};
use std::str::FromStr;
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::errors::WalletError;

/// BIP44 derivation paths, account 0, external chain, index 0.
pub mod paths {
    pub const BITCOIN: &str = "m/44'/0'/0'/0/0";
    pub const BITCOIN_CASH: &str = "m/44'/145'/0'/0/0";
    pub const BITCOIN_SV: &str = "m/44'/236'/0'/0/0";
    pub const ETHEREUM: &str = "m/44'/60'/0'/0/0";
    pub const ETHEREUM_CLASSIC: &str = "m/44'/61'/0'/0/0";
    pub const EOS: &str = "m/44'/194'/0'/0/0";
}

/// Parses an English BIP-39 phrase, checksum included.
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, WalletError> {
    if phrase.trim().is_empty() {
        return Err(WalletError::MnemonicError("mnemonic is empty".to_string()));
    }
    Mnemonic::parse_in_normalized(Language::English, phrase.trim())
        .map_err(|e| WalletError::MnemonicError(format!("Invalid mnemonic: {}", e)))
}

/// Derives the secp256k1 secret key at `path`.
pub fn derive_secret_key(mnemonic: &SecretString, path: &str) -> Result<SecretKey, WalletError> {
    debug!("Using derivation path: {}", path);
    let mnemonic = parse_mnemonic(mnemonic.expose_secret())?;
    let seed = Zeroizing::new(mnemonic.to_seed(""));

    let secp = Secp256k1::new();
    let master = Xpriv::new_master(Network::Bitcoin, &seed[..])
        .map_err(|e| WalletError::KeyDerivationError(format!("master key: {}", e)))?;
    let path = DerivationPath::from_str(path)
        .map_err(|e| WalletError::KeyDerivationError(format!("path {}: {}", path, e)))?;
    let child = master
        .derive_priv(&secp, &path)
        .map_err(|e| WalletError::KeyDerivationError(format!("child key: {}", e)))?;
    Ok(child.private_key)
}
