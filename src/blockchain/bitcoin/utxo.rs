//! UTXO fee estimation and output planning
//!
//! Every send spends all UTXOs of the wallet address, so the plan only has
//! to decide how many outputs to create and where the remainder goes.

use bitcoin::Txid;
use std::str::FromStr;
use tracing::debug;

use crate::core::domain::UnspentOutput;
use crate::core::errors::WalletError;

/// Size estimates of a P2PKH transaction, in bytes.
const INPUT_SIZE: u64 = 149;
const OUTPUT_SIZE: u64 = 34;
const OVERHEAD_SIZE: u64 = 10;

/// Fee in satoshis for `n_in` inputs and `n_out` outputs at `fee_per_byte`.
pub fn estimate_fee(n_in: usize, n_out: usize, fee_per_byte: u64) -> u64 {
    let size = n_in as u64 * INPUT_SIZE + n_out as u64 * OUTPUT_SIZE + OVERHEAD_SIZE;
    fee_per_byte * size
}

pub fn total_value(utxos: &[UnspentOutput]) -> u64 {
    utxos.iter().map(|u| u.satoshis).sum()
}

pub fn parse_txid(utxo: &UnspentOutput) -> Result<Txid, WalletError> {
    Txid::from_str(&utxo.txid)
        .map_err(|e| WalletError::BlockchainError(format!("invalid txid {}: {}", utxo.txid, e)))
}

/// Outputs to create for one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPlan {
    /// Pay exactly the quantity; the remainder is too small to keep and goes to miners.
    Single { amount: u64 },
    /// Destination is the wallet itself: sweep everything minus a one-output fee.
    Consolidate { amount: u64 },
    /// Pay the quantity and return the change.
    WithChange { amount: u64, change: u64 },
}

impl OutputPlan {
    pub fn output_count(&self) -> usize {
        match self {
            OutputPlan::Single { .. } | OutputPlan::Consolidate { .. } => 1,
            OutputPlan::WithChange { .. } => 2,
        }
    }
}

/// Decides the outputs of a send.
///
/// `fee_one` and `fee_two` are the fees for one and two outputs over the
/// same input set. The balance check runs first, then the dust remainder
/// rule, then the self-send rule.
pub fn plan_outputs(
    balance: u64,
    quantity: u64,
    fee_one: u64,
    fee_two: u64,
    dust: u64,
    to_self: bool,
) -> Result<OutputPlan, WalletError> {
    let balance = i128::from(balance);
    let qty = i128::from(quantity);

    if balance - qty < i128::from(fee_one) {
        return Err(WalletError::InsufficientFunds(format!(
            "balance {} sat cannot cover {} sat plus fee {} sat",
            balance, quantity, fee_one
        )));
    }

    let remainder = balance - qty - i128::from(fee_two);
    let plan = if remainder < i128::from(dust) {
        OutputPlan::Single { amount: quantity }
    } else if to_self {
        OutputPlan::Consolidate { amount: (balance - i128::from(fee_one)) as u64 }
    } else {
        OutputPlan::WithChange { amount: quantity, change: remainder as u64 }
    };
    debug!(?plan, "planned outputs");
    Ok(plan)
}
