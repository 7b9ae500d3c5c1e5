//! Per-chain constants of the Bitcoin family.

use crate::core::derivation::paths;
use crate::core::domain::{Chain, FeeSpeed};

/// Outputs below this many satoshis are not relayed.
pub const DUST_LIMIT: u64 = 546;

/// Satoshis per coin, as a power of ten.
pub const DECIMALS: u32 = 8;

/// SIGHASH_ALL | SIGHASH_FORKID, used by BCH and BSV.
pub const SIGHASH_ALL_FORKID: u32 = 0x41;

/// The three P2PKH chains that share Bitcoin's key and script format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BtcFamily {
    Btc,
    Bch,
    Bsv,
}

impl BtcFamily {
    pub fn chain(&self) -> Chain {
        match self {
            BtcFamily::Btc => Chain::Btc,
            BtcFamily::Bch => Chain::Bch,
            BtcFamily::Bsv => Chain::Bsv,
        }
    }

    pub fn symbol(&self) -> &'static str {
        self.chain().symbol()
    }

    pub fn derivation_path(&self) -> &'static str {
        match self {
            BtcFamily::Btc => paths::BITCOIN,
            BtcFamily::Bch => paths::BITCOIN_CASH,
            BtcFamily::Bsv => paths::BITCOIN_SV,
        }
    }

    /// Fee rate in satoshis per byte.
    pub fn fee_per_byte(&self, speed: FeeSpeed) -> u64 {
        match (self, speed) {
            (BtcFamily::Btc, FeeSpeed::Slow) => 10,
            (BtcFamily::Btc, FeeSpeed::Average) => 20,
            (BtcFamily::Btc, FeeSpeed::Fast) => 40,
            (BtcFamily::Bch, FeeSpeed::Slow) => 1,
            (BtcFamily::Bch, FeeSpeed::Average) => 2,
            (BtcFamily::Bch, FeeSpeed::Fast) => 4,
            (BtcFamily::Bsv, FeeSpeed::Slow) => 1,
            (BtcFamily::Bsv, FeeSpeed::Average) => 1,
            (BtcFamily::Bsv, FeeSpeed::Fast) => 2,
        }
    }

    /// BCH and BSV commit to input amounts with the BIP143 digest plus FORKID.
    pub fn uses_fork_id(&self) -> bool {
        !matches!(self, BtcFamily::Btc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_rates_increase_with_speed() {
        for family in [BtcFamily::Btc, BtcFamily::Bch, BtcFamily::Bsv] {
            let slow = family.fee_per_byte(FeeSpeed::Slow);
            let avg = family.fee_per_byte(FeeSpeed::Average);
            let fast = family.fee_per_byte(FeeSpeed::Fast);
            assert!(slow <= avg && avg <= fast, "{:?}", family);
        }
    }

    #[test]
    fn test_fork_id_only_for_forks() {
        assert!(!BtcFamily::Btc.uses_fork_id());
        assert!(BtcFamily::Bch.uses_fork_id());
        assert!(BtcFamily::Bsv.uses_fork_id());
    }
}
