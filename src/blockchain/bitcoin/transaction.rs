//! Bitcoin-family transaction building and signing
//!
//! BTC inputs are signed with the legacy P2PKH digest. BCH and BSV use the
//! BIP143 digest with SIGHASH_ALL|FORKID, which also commits to input amounts.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::{serialize, serialize_hex};
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};
use tracing::{debug, info};

use super::account::BitcoinKeypair;
use super::params::{BtcFamily, SIGHASH_ALL_FORKID};
use super::utxo::{parse_txid, OutputPlan};
use crate::core::domain::UnspentOutput;
use crate::core::errors::WalletError;

/// Bitcoin-family transaction builder
pub struct BitcoinTransaction;

impl BitcoinTransaction {
    /// Builds and signs a transaction spending every `utxo` into the planned outputs.
    pub fn build_signed(
        family: BtcFamily,
        keypair: &BitcoinKeypair,
        utxos: &[UnspentOutput],
        destination: &ScriptBuf,
        plan: OutputPlan,
    ) -> Result<Transaction, WalletError> {
        if utxos.is_empty() {
            return Err(WalletError::InsufficientFunds("no spendable outputs".to_string()));
        }
        let own_script = keypair.script_pubkey();

        let mut inputs = Vec::with_capacity(utxos.len());
        for utxo in utxos {
            inputs.push(TxIn {
                previous_output: OutPoint { txid: parse_txid(utxo)?, vout: utxo.vout },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            });
        }

        let outputs = match plan {
            OutputPlan::Single { amount } => vec![Self::output(amount, destination.clone())],
            OutputPlan::Consolidate { amount } => vec![Self::output(amount, own_script.clone())],
            OutputPlan::WithChange { amount, change } => vec![
                Self::output(amount, destination.clone()),
                Self::output(change, own_script.clone()),
            ],
        };

        let mut tx = Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: inputs,
            output: outputs,
        };

        let sighash_type =
            if family.uses_fork_id() { SIGHASH_ALL_FORKID } else { EcdsaSighashType::All.to_u32() };
        let secp = Secp256k1::signing_only();
        let mut script_sigs = Vec::with_capacity(utxos.len());
        for (i, utxo) in utxos.iter().enumerate() {
            let digest = if family.uses_fork_id() {
                Self::forkid_sighash(&tx, i, &own_script, utxo.satoshis, sighash_type)
            } else {
                let cache = SighashCache::new(&tx);
                cache
                    .legacy_signature_hash(i, &own_script, sighash_type)
                    .map(|h| h.to_byte_array())
                    .map_err(|e| WalletError::SigningFailed(format!("sighash input {}: {}", i, e)))?
            };

            let message = Message::from_digest(digest);
            let signature = secp.sign_ecdsa(&message, keypair.secret_key());

            let mut sig_bytes = signature.serialize_der().to_vec();
            sig_bytes.push(sighash_type as u8);
            let sig_push = PushBytesBuf::try_from(sig_bytes)
                .map_err(|e| WalletError::SigningFailed(format!("signature push: {:?}", e)))?;
            let pk_push = PushBytesBuf::try_from(keypair.public_key_bytes())
                .map_err(|e| WalletError::SigningFailed(format!("pubkey push: {:?}", e)))?;
            script_sigs.push(Builder::new().push_slice(sig_push).push_slice(pk_push).into_script());
        }
        for (input, script_sig) in tx.input.iter_mut().zip(script_sigs) {
            input.script_sig = script_sig;
        }

        info!(
            chain = family.symbol(),
            inputs = tx.input.len(),
            outputs = tx.output.len(),
            "signed transaction {}",
            tx.txid()
        );
        Ok(tx)
    }

    pub fn to_hex(tx: &Transaction) -> String {
        serialize_hex(tx)
    }

    fn output(value: u64, script_pubkey: ScriptBuf) -> TxOut {
        TxOut { value: Amount::from_sat(value), script_pubkey }
    }

    /// BIP143 digest with the fork id bit set in the sighash type.
    pub fn forkid_sighash(
        tx: &Transaction,
        input_index: usize,
        script_code: &ScriptBuf,
        value: u64,
        sighash_type: u32,
    ) -> [u8; 32] {
        let mut prevouts = Vec::with_capacity(tx.input.len() * 36);
        let mut sequences = Vec::with_capacity(tx.input.len() * 4);
        for input in &tx.input {
            prevouts.extend_from_slice(&serialize(&input.previous_output));
            sequences.extend_from_slice(&input.sequence.0.to_le_bytes());
        }
        let mut outputs = Vec::new();
        for output in &tx.output {
            outputs.extend_from_slice(&serialize(output));
        }

        let input = &tx.input[input_index];
        let mut preimage = Vec::with_capacity(4 + 32 * 3 + 36 + 26 + 8 + 4 + 4 + 4);
        preimage.extend_from_slice(&tx.version.0.to_le_bytes());
        preimage.extend_from_slice(&sha256d::Hash::hash(&prevouts).to_byte_array());
        preimage.extend_from_slice(&sha256d::Hash::hash(&sequences).to_byte_array());
        preimage.extend_from_slice(&serialize(&input.previous_output));
        preimage.extend_from_slice(&serialize(script_code));
        preimage.extend_from_slice(&value.to_le_bytes());
        preimage.extend_from_slice(&input.sequence.0.to_le_bytes());
        preimage.extend_from_slice(&sha256d::Hash::hash(&outputs).to_byte_array());
        preimage.extend_from_slice(&tx.lock_time.to_consensus_u32().to_le_bytes());
        preimage.extend_from_slice(&sighash_type.to_le_bytes());

        debug!(input_index, preimage_len = preimage.len(), "forkid preimage");
        sha256d::Hash::hash(&preimage).to_byte_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::ecdsa::Signature;
    use bitcoin::secp256k1::PublicKey;
    use secrecy::SecretString;

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn utxos() -> Vec<UnspentOutput> {
        vec![
            UnspentOutput {
                txid: "a".repeat(64),
                vout: 0,
                satoshis: 60_000,
            },
            UnspentOutput {
                txid: "b".repeat(64),
                vout: 1,
                satoshis: 40_000,
            },
        ]
    }

    fn split_script_sig(script: &ScriptBuf) -> (Vec<u8>, Vec<u8>) {
        let pushes: Vec<Vec<u8>> = script
            .instructions()
            .filter_map(|i| i.ok()?.push_bytes().map(|b| b.as_bytes().to_vec()))
            .collect();
        (pushes[0].clone(), pushes[1].clone())
    }

    fn verify_all(family: BtcFamily, tx: &Transaction, kp: &BitcoinKeypair, utxos: &[UnspentOutput]) {
        let secp = Secp256k1::verification_only();
        for (i, input) in tx.input.iter().enumerate() {
            let (sig, pk) = split_script_sig(&input.script_sig);
            let hashtype = *sig.last().unwrap() as u32;
            let digest = if family.uses_fork_id() {
                assert_eq!(hashtype, 0x41);
                BitcoinTransaction::forkid_sighash(tx, i, &kp.script_pubkey(), utxos[i].satoshis, hashtype)
            } else {
                assert_eq!(hashtype, 0x01);
                SighashCache::new(tx)
                    .legacy_signature_hash(i, &kp.script_pubkey(), hashtype)
                    .unwrap()
                    .to_byte_array()
            };
            let sig = Signature::from_der(&sig[..sig.len() - 1]).unwrap();
            let pk = PublicKey::from_slice(&pk).unwrap();
            secp.verify_ecdsa(&Message::from_digest(digest), &sig, &pk).unwrap();
        }
    }

    #[test]
    fn test_btc_legacy_signatures_verify() {
        let kp = BitcoinKeypair::from_mnemonic(&SecretString::new(PHRASE.into()), BtcFamily::Btc).unwrap();
        let dest = kp.script_pubkey();
        let plan = OutputPlan::WithChange { amount: 50_000, change: 45_000 };
        let tx = BitcoinTransaction::build_signed(BtcFamily::Btc, &kp, &utxos(), &dest, plan).unwrap();
        assert_eq!(tx.input.len(), 2);
        assert_eq!(tx.output.len(), 2);
        assert_eq!(tx.output[0].value.to_sat(), 50_000);
        verify_all(BtcFamily::Btc, &tx, &kp, &utxos());
    }

    #[test]
    fn test_forkid_signatures_verify() {
        for family in [BtcFamily::Bch, BtcFamily::Bsv] {
            let kp = BitcoinKeypair::from_mnemonic(&SecretString::new(PHRASE.into()), family).unwrap();
            let dest = kp.script_pubkey();
            let tx = BitcoinTransaction::build_signed(
                family,
                &kp,
                &utxos(),
                &dest,
                OutputPlan::Consolidate { amount: 99_000 },
            )
            .unwrap();
            assert_eq!(tx.output.len(), 1);
            verify_all(family, &tx, &kp, &utxos());
        }
    }

    #[test]
    fn test_forkid_digest_commits_to_amount() {
        let kp = BitcoinKeypair::from_mnemonic(&SecretString::new(PHRASE.into()), BtcFamily::Bch).unwrap();
        let tx = BitcoinTransaction::build_signed(
            BtcFamily::Bch,
            &kp,
            &utxos(),
            &kp.script_pubkey(),
            OutputPlan::Single { amount: 1_000 },
        )
        .unwrap();
        let a = BitcoinTransaction::forkid_sighash(&tx, 0, &kp.script_pubkey(), 60_000, 0x41);
        let b = BitcoinTransaction::forkid_sighash(&tx, 0, &kp.script_pubkey(), 60_001, 0x41);
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_utxo_set() {
        let kp = BitcoinKeypair::from_mnemonic(&SecretString::new(PHRASE.into()), BtcFamily::Btc).unwrap();
        let err = BitcoinTransaction::build_signed(
            BtcFamily::Btc,
            &kp,
            &[],
            &kp.script_pubkey(),
            OutputPlan::Single { amount: 1_000 },
        )
        .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds(_)));
    }
}
