//! Bitcoin-family address encoding and destination validation
//!
//! - BTC: base58 P2PKH/P2SH and bech32 segwit destinations
//! - BCH: CashAddr (own address) plus base58 legacy form
//! - BSV: base58 only

use bitcoin::address::{Address, AddressType};
use bitcoin::hashes::Hash;
use bitcoin::{Network, PubkeyHash, ScriptBuf, ScriptHash};
use std::str::FromStr;
use tracing::debug;

use super::account::BitcoinKeypair;
use super::cashaddr::{self, HashType};
use super::params::BtcFamily;
use crate::core::domain;
use crate::core::errors::WalletError;

/// Bitcoin-family address helpers
pub struct BitcoinAddress;

impl BitcoinAddress {
    /// Address record of the wallet's own key on `family`.
    pub fn own_address(family: BtcFamily, keypair: &BitcoinKeypair) -> domain::Address {
        let legacy = keypair.legacy_address();
        match family {
            BtcFamily::Bch => {
                let cash = cashaddr::encode(HashType::P2pkh, &keypair.pubkey_hash());
                let mut record = domain::Address::new(family.symbol(), cash.clone());
                record.legacy_address = Some(legacy);
                record.cash_address = Some(cash);
                record
            }
            _ => domain::Address::new(family.symbol(), legacy),
        }
    }

    /// Parses a destination and returns the locking script it pays to.
    pub fn destination_script(family: BtcFamily, to: &str) -> Result<ScriptBuf, WalletError> {
        let to = to.trim();
        if family == BtcFamily::Bch && !Self::looks_like_base58(to) {
            let (hash_type, hash) = cashaddr::decode(to)?;
            debug!("CashAddr destination {:?}", hash_type);
            return Ok(match hash_type {
                HashType::P2pkh => ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash)),
                HashType::P2sh => ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(hash)),
            });
        }

        let address = Address::from_str(to)
            .map_err(|e| WalletError::InvalidAddress(format!("{} is not a valid {} address: {}", to, family.symbol(), e)))?
            .require_network(Network::Bitcoin)
            .map_err(|_| {
                WalletError::InvalidAddress(format!("{} is not a mainnet {} address", to, family.symbol()))
            })?;
        if family != BtcFamily::Btc
            && !matches!(address.address_type(), Some(AddressType::P2pkh) | Some(AddressType::P2sh))
        {
            return Err(WalletError::InvalidAddress(format!(
                "{} has no {} equivalent",
                to,
                family.symbol()
            )));
        }
        Ok(address.script_pubkey())
    }

    fn looks_like_base58(s: &str) -> bool {
        s.starts_with('1') || s.starts_with('3')
    }
}
