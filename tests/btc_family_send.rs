//! End-to-end payment flow for the Bitcoin family against mocked explorers.

use async_trait::async_trait;
use bitcoin::consensus::deserialize;
use bitcoin::Transaction;
use httpmock::prelude::*;
use multichain_wallet::blockchain::bitcoin::{BitcoinAddress, BitcoinClient, BitcoinKeypair, BtcFamily};
use multichain_wallet::blockchain::traits::UtxoExplorer;
use multichain_wallet::core::config::WalletConfig;
use multichain_wallet::core::domain::{Address, FeeSpeed, UnspentOutput};
use multichain_wallet::core::errors::WalletError;
use multichain_wallet::service::WalletService;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const PHRASE: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const BTC_ADDRESS: &str = "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA";
const DESTINATION: &str = "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy";

fn service(server: &MockServer) -> WalletService {
    let vars: HashMap<String, String> = [
        ("MNEMONIC", PHRASE.to_string()),
        ("BTC_API_URL", server.base_url()),
        ("BCH_API_URL", server.base_url()),
        ("BSV_API_URL", server.base_url()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    WalletService::new(WalletConfig::from_map(&vars).unwrap())
}

fn funding_txid() -> String {
    "ab".repeat(32)
}

fn mnemonic() -> SecretString {
    SecretString::new(PHRASE.into())
}

/// Serves a fixed UTXO set and keeps every raw transaction it is asked to broadcast.
struct RecordingExplorer {
    utxos: Vec<UnspentOutput>,
    broadcasts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl UtxoExplorer for RecordingExplorer {
    async fn fetch_utxos(&self, _address: &str) -> Result<Vec<UnspentOutput>, WalletError> {
        Ok(self.utxos.clone())
    }

    async fn fetch_balance(&self, _address: &str) -> Result<u64, WalletError> {
        Ok(self.utxos.iter().map(|u| u.satoshis).sum())
    }

    async fn broadcast(&self, raw_tx: &str) -> Result<String, WalletError> {
        self.broadcasts.lock().unwrap().push(raw_tx.to_string());
        Ok("recorded".to_string())
    }
}

/// Sends `quantity` to `to` at average speed from a single 100 000 sat output and
/// returns the decoded broadcast transaction.
async fn send_and_decode(family: BtcFamily, to: &str, quantity: &str) -> Transaction {
    let broadcasts = Arc::new(Mutex::new(Vec::new()));
    let explorer = RecordingExplorer {
        utxos: vec![UnspentOutput { txid: funding_txid(), vout: 0, satoshis: 100_000 }],
        broadcasts: Arc::clone(&broadcasts),
    };
    let client = BitcoinClient::with_explorer(family, Box::new(explorer));
    let receipt = client.send(&mnemonic(), to, quantity, FeeSpeed::Average).await.unwrap();
    assert_eq!(receipt.txid, "recorded");

    let sent = broadcasts.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    deserialize(&hex::decode(&sent[0]).unwrap()).unwrap()
}

#[tokio::test]
async fn test_btc_payment_outputs_destination_then_change() {
    let tx = send_and_decode(BtcFamily::Btc, DESTINATION, "0.0005").await;
    let own = BitcoinKeypair::from_mnemonic(&mnemonic(), BtcFamily::Btc).unwrap().script_pubkey();
    let destination = BitcoinAddress::destination_script(BtcFamily::Btc, DESTINATION).unwrap();

    assert_eq!(tx.input.len(), 1);
    assert_eq!(tx.output.len(), 2);
    assert_eq!(tx.output[0].script_pubkey, destination);
    assert_eq!(tx.output[0].value.to_sat(), 50_000);
    assert_eq!(tx.output[1].script_pubkey, own);
    // 100 000 - 50 000 - 20 sat/byte * (149 + 2 * 34 + 10)
    assert_eq!(tx.output[1].value.to_sat(), 45_460);
}

#[tokio::test]
async fn test_btc_send_to_own_address_consolidates() {
    let tx = send_and_decode(BtcFamily::Btc, BTC_ADDRESS, "0.0005").await;
    let own = BitcoinKeypair::from_mnemonic(&mnemonic(), BtcFamily::Btc).unwrap().script_pubkey();

    assert_eq!(tx.output.len(), 1);
    assert_eq!(tx.output[0].script_pubkey, own);
    // balance minus the one-output fee of 20 * (149 + 34 + 10)
    assert_eq!(tx.output[0].value.to_sat(), 96_140);
}

#[tokio::test]
async fn test_bch_send_to_own_legacy_address_consolidates() {
    let keypair = BitcoinKeypair::from_mnemonic(&mnemonic(), BtcFamily::Bch).unwrap();
    let tx = send_and_decode(BtcFamily::Bch, &keypair.legacy_address(), "0.0001").await;

    assert_eq!(tx.output.len(), 1);
    assert_eq!(tx.output[0].script_pubkey, keypair.script_pubkey());
    // 2 sat/byte * (149 + 34 + 10)
    assert_eq!(tx.output[0].value.to_sat(), 100_000 - 386);
}

#[tokio::test]
async fn test_btc_send_with_change() {
    let server = MockServer::start();
    let utxos = server.mock(|when, then| {
        when.method(GET).path(format!("/address/{}/utxo", BTC_ADDRESS));
        then.status(200).json_body(json!([
            {"txid": funding_txid(), "vout": 1, "value": 100_000, "status": {"confirmed": true}}
        ]));
    });
    let broadcast = server.mock(|when, then| {
        when.method(POST).path("/tx");
        then.status(200).body("c0ffee");
    });

    let receipt = service(&server).send(&Address::new("BTC", DESTINATION), "0.0005").await.unwrap();
    assert_eq!(receipt.txid, "c0ffee");
    utxos.assert_hits(1);
    broadcast.assert_hits(1);
}

#[tokio::test]
async fn test_btc_insufficient_funds_never_broadcasts() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/address/{}/utxo", BTC_ADDRESS));
        then.status(200).json_body(json!([{"txid": funding_txid(), "vout": 0, "value": 1_000}]));
    });
    let broadcast = server.mock(|when, then| {
        when.method(POST).path("/tx");
        then.status(200).body("never");
    });

    let err = service(&server).send(&Address::new("BTC", DESTINATION), "0.001").await.unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds(_)), "{:?}", err);
    assert!(!err.is_fatal());
    broadcast.assert_hits(0);
}

#[tokio::test]
async fn test_dust_and_bad_quantities_make_no_requests() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.path_contains("/");
        then.status(500);
    });
    let svc = service(&server);

    let err = svc.send(&Address::new("BTC", DESTINATION), "0.000001").await.unwrap_err();
    assert!(matches!(err, WalletError::DustLimit(_)));
    for quantity in ["-1", "0", "abc"] {
        let err = svc.send(&Address::new("BTC", DESTINATION), quantity).await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidQuantity(_)), "{}: {:?}", quantity, err);
    }
    let err = svc.send(&Address::new("BTC", DESTINATION), "0.123456789").await.unwrap_err();
    assert!(matches!(err, WalletError::PrecisionMismatch(_)));
    let err = svc.send(&Address::new("BTC", "not-an-address"), "0.01").await.unwrap_err();
    assert!(matches!(err, WalletError::InvalidAddress(_)));
    any.assert_hits(0);
}

#[tokio::test]
async fn test_bsv_send_posts_signed_forkid_transaction() {
    let server = MockServer::start();
    let svc = service(&server);
    let own = svc.address("BSV").unwrap().address;

    server.mock(|when, then| {
        when.method(GET).path(format!("/address/{}/unspent", own));
        then.status(200).json_body(json!([{"tx_hash": funding_txid(), "tx_pos": 0, "value": 50_000, "height": 1}]));
    });
    let broadcast = server.mock(|when, then| {
        when.method(POST).path("/tx/raw").body_contains("txhex");
        then.status(200).json_body(json!("beef"));
    });

    let receipt = svc.send(&Address::new("BSV", BTC_ADDRESS), "0.0002").await.unwrap();
    assert_eq!(receipt.txid, "beef");
    broadcast.assert_hits(1);
}

#[tokio::test]
async fn test_bch_accepts_cashaddr_destination() {
    let server = MockServer::start();
    let svc = service(&server);
    let own = svc.address("BCH").unwrap();
    assert!(own.address.starts_with("bitcoincash:"));
    assert_eq!(own.cash_address.as_deref(), Some(own.address.as_str()));
    let legacy = own.legacy_address.clone().unwrap();

    server.mock(|when, then| {
        when.method(GET).path(format!("/address/utxo/{}", own.address));
        then.status(200).json_body(json!({
            "utxos": [{"txid": funding_txid(), "vout": 0, "satoshis": 10_000, "amount": 0.0001}],
            "legacyAddress": legacy,
            "cashAddress": own.address,
            "scriptPubKey": ""
        }));
    });
    let broadcast = server.mock(|when, then| {
        when.method(POST).path("/rawtransactions/sendRawTransaction").body_contains("\"hexes\"");
        then.status(200).json_body(json!(["bchtx"]));
    });

    let to = "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a";
    let receipt = svc.send(&Address::new("BCH", to), "0.00005").await.unwrap();
    assert_eq!(receipt.txid, "bchtx");
    broadcast.assert_hits(1);
}

#[test]
fn test_signed_btc_transaction_decodes() {
    use multichain_wallet::blockchain::bitcoin::{BitcoinTransaction, OutputPlan};

    let kp = BitcoinKeypair::from_mnemonic(&mnemonic(), BtcFamily::Btc).unwrap();
    let destination = BitcoinAddress::destination_script(BtcFamily::Btc, DESTINATION).unwrap();
    let utxos = vec![UnspentOutput { txid: funding_txid(), vout: 0, satoshis: 20_000 }];
    let tx = BitcoinTransaction::build_signed(
        BtcFamily::Btc,
        &kp,
        &utxos,
        &destination,
        OutputPlan::WithChange { amount: 10_000, change: 5_000 },
    )
    .unwrap();
    let raw = hex::decode(BitcoinTransaction::to_hex(&tx)).unwrap();
    let decoded: Transaction = deserialize(&raw).unwrap();
    assert_eq!(decoded.output.len(), 2);
    assert_eq!(decoded.output[0].script_pubkey, destination);
    assert_eq!(decoded.output[1].script_pubkey, kp.script_pubkey());
}
