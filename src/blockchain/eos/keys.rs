//! EOS key formats and canonical K1 signatures.

use bitcoin::hashes::{ripemd160, Hash};
use bitcoin::secp256k1::SecretKey;
use bitcoin::{Network, PrivateKey};
use k256::ecdsa::signature::hazmat::RandomizedPrehashSigner;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use secrecy::SecretString;
use tracing::debug;

use crate::core::derivation::{derive_secret_key, paths};
use crate::core::errors::WalletError;

const PUBLIC_KEY_PREFIX: &str = "EOS";
const SIGNATURE_PREFIX: &str = "SIG_K1_";
const MAX_SIGNING_ATTEMPTS: usize = 64;

fn ripemd_checksum(data: &[u8]) -> [u8; 4] {
    let digest = ripemd160::Hash::hash(data).to_byte_array();
    [digest[0], digest[1], digest[2], digest[3]]
}

/// EOS uses canonical signatures: neither r nor s may need a leading zero byte in DER.
pub fn is_canonical(sig: &[u8; 65]) -> bool {
    sig[1] & 0x80 == 0
        && !(sig[1] == 0 && sig[2] & 0x80 == 0)
        && sig[33] & 0x80 == 0
        && !(sig[33] == 0 && sig[34] & 0x80 == 0)
}

/// secp256k1 key pair at `m/44'/194'/0'/0/0`.
pub struct EosKeypair {
    secret_key: SecretKey,
    signing_key: SigningKey,
}

impl EosKeypair {
    pub fn from_mnemonic(mnemonic: &SecretString) -> Result<Self, WalletError> {
        Self::from_secret_key(derive_secret_key(mnemonic, paths::EOS)?)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Result<Self, WalletError> {
        let signing_key = SigningKey::from_slice(&secret_key.secret_bytes())
            .map_err(|e| WalletError::KeyDerivationError(format!("invalid EOS key: {}", e)))?;
        Ok(Self { secret_key, signing_key })
    }

    /// Legacy WIF: base58check of 0x80 and the raw key, uncompressed.
    pub fn private_key_wif(&self) -> String {
        PrivateKey::new_uncompressed(self.secret_key, Network::Bitcoin).to_wif()
    }

    /// `EOS` followed by base58 of the compressed key and a ripemd160 checksum.
    pub fn public_key(&self) -> String {
        let compressed = self.verifying_key().to_encoded_point(true);
        let key = compressed.as_bytes();
        let mut payload = key.to_vec();
        payload.extend_from_slice(&ripemd_checksum(key));
        format!("{}{}", PUBLIC_KEY_PREFIX, bs58::encode(payload).into_string())
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Signs a 32-byte digest, retrying with fresh nonces until the signature is canonical.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<String, WalletError> {
        for attempt in 1..=MAX_SIGNING_ATTEMPTS {
            let signature: Signature = self
                .signing_key
                .sign_prehash_with_rng(&mut OsRng, digest)
                .map_err(|e| WalletError::SigningFailed(format!("EOS signing: {}", e)))?;
            let signature = signature.normalize_s().unwrap_or(signature);
            let recovery_id = RecoveryId::trial_recovery_from_prehash(self.verifying_key(), digest, &signature)
                .map_err(|e| WalletError::SigningFailed(format!("EOS recovery id: {}", e)))?;

            let mut compact = [0u8; 65];
            compact[0] = recovery_id.to_byte() + 27 + 4;
            compact[1..].copy_from_slice(&signature.to_bytes());
            if is_canonical(&compact) {
                debug!(attempt, "canonical EOS signature");
                return Ok(encode_signature(&compact));
            }
        }
        Err(WalletError::SigningFailed("no canonical EOS signature found".to_string()))
    }
}

fn encode_signature(compact: &[u8; 65]) -> String {
    let mut check_input = compact.to_vec();
    check_input.extend_from_slice(b"K1");
    let mut payload = compact.to_vec();
    payload.extend_from_slice(&ripemd_checksum(&check_input));
    format!("{}{}", SIGNATURE_PREFIX, bs58::encode(payload).into_string())
}

/// Decodes a `SIG_K1_` string back to its 65 bytes, checking the checksum.
pub fn decode_signature(sig: &str) -> Result<[u8; 65], WalletError> {
    let body = sig
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| WalletError::SerializationError(format!("not a K1 signature: {}", sig)))?;
    let bytes = bs58::decode(body)
        .into_vec()
        .map_err(|e| WalletError::SerializationError(format!("signature base58: {}", e)))?;
    if bytes.len() != 69 {
        return Err(WalletError::SerializationError("signature length".to_string()));
    }
    let mut compact = [0u8; 65];
    compact.copy_from_slice(&bytes[..65]);
    let mut check_input = compact.to_vec();
    check_input.extend_from_slice(b"K1");
    if ripemd_checksum(&check_input) != bytes[65..] {
        return Err(WalletError::SerializationError("signature checksum".to_string()));
    }
    Ok(compact)
}
