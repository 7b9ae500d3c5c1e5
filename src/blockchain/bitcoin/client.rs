//! Bitcoin-family chain client
//!
//! Ties key derivation, the explorer, fee planning and signing together
//! behind the four wallet operations.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tracing::{debug, info};

use super::account::BitcoinKeypair;
use super::address::BitcoinAddress;
use super::explorer::{BitcoinComExplorer, EsploraExplorer, WhatsOnChainExplorer};
use super::params::{BtcFamily, DECIMALS, DUST_LIMIT};
use super::transaction::BitcoinTransaction;
use super::utxo::{estimate_fee, plan_outputs, total_value};
use crate::blockchain::traits::UtxoExplorer;
use crate::core::config::EndpointConfig;
use crate::core::domain::{Address, FeeSpeed, PrivateKeyRecord, SendReceipt};
use crate::core::errors::WalletError;
use crate::core::validation::{ensure_precision, to_base_units};

/// Client for one of BTC, BCH or BSV.
pub struct BitcoinClient {
    family: BtcFamily,
    explorer: Box<dyn UtxoExplorer>,
}

impl BitcoinClient {
    /// Creates a client backed by the family's default explorer.
    pub fn new(family: BtcFamily, endpoints: &EndpointConfig) -> Self {
        let explorer: Box<dyn UtxoExplorer> = match family {
            BtcFamily::Btc => Box::new(EsploraExplorer::new(endpoints.btc_api.clone())),
            BtcFamily::Bch => Box::new(BitcoinComExplorer::new(endpoints.bch_api.clone())),
            BtcFamily::Bsv => Box::new(WhatsOnChainExplorer::new(endpoints.bsv_api.clone())),
        };
        Self { family, explorer }
    }

    pub fn with_explorer(family: BtcFamily, explorer: Box<dyn UtxoExplorer>) -> Self {
        Self { family, explorer }
    }

    pub fn address(&self, mnemonic: &SecretString) -> Result<Address, WalletError> {
        let keypair = BitcoinKeypair::from_mnemonic(mnemonic, self.family)?;
        Ok(BitcoinAddress::own_address(self.family, &keypair))
    }

    pub fn private_key(&self, mnemonic: &SecretString) -> Result<PrivateKeyRecord, WalletError> {
        let keypair = BitcoinKeypair::from_mnemonic(mnemonic, self.family)?;
        Ok(PrivateKeyRecord::new(BitcoinAddress::own_address(self.family, &keypair), keypair.to_wif()))
    }

    /// Balance of the wallet address in whole coins.
    pub async fn balance(&self, mnemonic: &SecretString) -> Result<f64, WalletError> {
        let address = self.address(mnemonic)?;
        self.balance_of(&address.address).await
    }

    pub async fn balance_of(&self, address: &str) -> Result<f64, WalletError> {
        let sats = self.explorer.fetch_balance(address).await?;
        debug!(chain = self.family.symbol(), address, sats, "fetched balance");
        Ok(Decimal::from(sats)
            .checked_div(Decimal::from(10u64.pow(DECIMALS)))
            .and_then(|d| d.to_f64())
            .unwrap_or_default())
    }

    /// Validates, plans, signs and broadcasts a payment of `quantity` coins to `to`.
    pub async fn send(
        &self,
        mnemonic: &SecretString,
        to: &str,
        quantity: &str,
        speed: FeeSpeed,
    ) -> Result<SendReceipt, WalletError> {
        let destination = BitcoinAddress::destination_script(self.family, to)?;
        ensure_precision(quantity, DECIMALS as usize)?;
        let amount = u64::try_from(to_base_units(quantity, DECIMALS)?)
            .map_err(|_| WalletError::InvalidQuantity(format!("{} is out of range", quantity)))?;
        if amount < DUST_LIMIT {
            return Err(WalletError::DustLimit(format!(
                "The quantity {} {} is below the dust limit of {} satoshis",
                quantity,
                self.family.symbol(),
                DUST_LIMIT
            )));
        }

        let keypair = BitcoinKeypair::from_mnemonic(mnemonic, self.family)?;
        let own = BitcoinAddress::own_address(self.family, &keypair);
        let utxos = self.explorer.fetch_utxos(&own.address).await?;
        let balance = total_value(&utxos);

        let rate = self.family.fee_per_byte(speed);
        let fee_one = estimate_fee(utxos.len(), 1, rate);
        let fee_two = estimate_fee(utxos.len(), 2, rate);
        let to_self = destination == keypair.script_pubkey();
        info!(
            chain = self.family.symbol(),
            to,
            amount,
            balance,
            fee_one,
            fee_two,
            "preparing payment"
        );
        let plan = plan_outputs(balance, amount, fee_one, fee_two, DUST_LIMIT, to_self)?;

        let tx = BitcoinTransaction::build_signed(self.family, &keypair, &utxos, &destination, plan)?;
        let txid = self.explorer.broadcast(&BitcoinTransaction::to_hex(&tx)).await?;
        Ok(SendReceipt { txid })
    }
}
