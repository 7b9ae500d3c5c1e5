//! Bitcoin-family accounts derived from the wallet mnemonic.

use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::{Address, Network, PrivateKey, PublicKey, ScriptBuf};
use secrecy::SecretString;
use tracing::debug;

use super::params::BtcFamily;
use crate::core::derivation::derive_secret_key;
use crate::core::errors::WalletError;

/// Compressed secp256k1 key pair at the family's BIP44 path.
pub struct BitcoinKeypair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl BitcoinKeypair {
    pub fn from_mnemonic(mnemonic: &SecretString, family: BtcFamily) -> Result<Self, WalletError> {
        let secret_key = derive_secret_key(mnemonic, family.derivation_path())?;
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let public_key = PublicKey::new(secret_key.public_key(&secp));
        Self { secret_key, public_key }
    }

    /// Rebuilds a key pair from a mainnet WIF string.
    pub fn from_wif(wif: &str) -> Result<Self, WalletError> {
        let key = PrivateKey::from_wif(wif)
            .map_err(|e| WalletError::KeyDerivationError(format!("invalid WIF: {}", e)))?;
        Ok(Self::from_secret_key(key.inner))
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key.to_bytes()
    }

    /// Compressed mainnet WIF. The same encoding is valid on BCH and BSV.
    pub fn to_wif(&self) -> String {
        PrivateKey::new(self.secret_key, Network::Bitcoin).to_wif()
    }

    /// Base58 P2PKH address with version byte 0x00.
    pub fn legacy_address(&self) -> String {
        let address = Address::p2pkh(&self.public_key, Network::Bitcoin).to_string();
        debug!("derived P2PKH address {}", address);
        address
    }

    pub fn pubkey_hash(&self) -> [u8; 20] {
        use bitcoin::hashes::Hash;
        self.public_key.pubkey_hash().to_byte_array()
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        ScriptBuf::new_p2pkh(&self.public_key.pubkey_hash())
    }
}
