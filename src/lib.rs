//! Multi-chain HD wallet
//!
//! Derives BTC, BCH, BSV, ETH, ETC and EOS keys from one BIP-39 mnemonic,
//! queries balances and signs payments locally before broadcasting them
//! through public explorers and RPC endpoints.

pub mod blockchain;
pub mod cli;
pub mod core;
pub mod service;
pub mod utils;
