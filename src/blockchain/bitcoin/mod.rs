//! Bitcoin-family integration (BTC, BCH, BSV)
//!
//! - P2PKH keys at each chain's BIP44 path
//! - CashAddr for BCH
//! - explorer-backed UTXO lookup and broadcast
//! - legacy and FORKID signing

pub mod account;
pub mod address;
pub mod cashaddr;
pub mod client;
pub mod explorer;
pub mod params;
pub mod transaction;
pub mod utxo;

pub use account::BitcoinKeypair;
pub use address::BitcoinAddress;
pub use client::BitcoinClient;
pub use explorer::{BitcoinComExplorer, EsploraExplorer, WhatsOnChainExplorer};
pub use params::BtcFamily;
pub use transaction::BitcoinTransaction;
pub use utxo::{estimate_fee, plan_outputs, OutputPlan};
