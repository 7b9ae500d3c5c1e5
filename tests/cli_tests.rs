use assert_cmd::Command;
use serde_json::Value;
use std::io::Write;
use tempfile::NamedTempFile;

const PHRASE: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn env_file(extra: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp env file");
    writeln!(file, "MNEMONIC=\"{}\"", PHRASE).unwrap();
    write!(file, "{}", extra).unwrap();
    file
}

fn wallet_cli(env: &NamedTempFile) -> Command {
    let mut cmd = Command::cargo_bin("wallet-cli").unwrap();
    cmd.env_remove("RUST_LOG").arg("--env-file").arg(env.path());
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn test_cli_help_command() {
    let output = Command::cargo_bin("wallet-cli").unwrap().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("addresses"));
    assert!(stdout.contains("private_keys"));
}

#[test]
fn test_missing_env_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::cargo_bin("wallet-cli")
        .unwrap()
        .arg("--env-file")
        .arg(dir.path().join(".env"))
        .arg("addresses")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Please put a .env file"));
}

#[test]
fn test_addresses_for_one_symbol() {
    let env = env_file("");
    let output = wallet_cli(&env).args(["addresses", "--symbol", "BTC"]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["BTC"]["address"], "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");
    assert_eq!(json["BTC"]["symbol"], "BTC");
}

#[test]
fn test_addresses_skip_eos_without_account() {
    let env = env_file("");
    let output = wallet_cli(&env).arg("addresses").output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["BCH", "BSV", "BTC", "ETC", "ETH"]);
    assert_eq!(json["ETH"]["address"], "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
    assert!(json["BCH"]["legacyAddress"].is_string());
}

#[test]
fn test_output_is_sorted_pretty_json() {
    let env = env_file("");
    let output = wallet_cli(&env).args(["addresses", "--symbol", "BCH"]).output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("{\n  \"BCH\": {\n    \"address\""));
    let address = stdout.find("\"address\"").unwrap();
    let cash = stdout.find("\"cashAddress\"").unwrap();
    let legacy = stdout.find("\"legacyAddress\"").unwrap();
    assert!(address < cash && cash < legacy);
}

#[test]
fn test_private_keys_eth() {
    let env = env_file("");
    let output = wallet_cli(&env).args(["private_keys", "--symbol", "ETH"]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    let key = json["ETH"]["privateKey"].as_str().unwrap();
    assert!(key.starts_with("0x"));
    assert_eq!(key.len(), 66);
}

#[test]
fn test_bad_quantity_is_reported_not_fatal() {
    let env = env_file("");
    for amount in ["abc", "-1"] {
        let output = wallet_cli(&env)
            .args(["send", "BTC", "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA", amount])
            .output()
            .unwrap();
        assert!(output.status.success(), "{} should exit 0", amount);
        let json = stdout_json(&output);
        assert!(json["error"].as_str().unwrap().contains(amount));
    }
}

#[test]
fn test_missing_memo_is_fatal() {
    let env = env_file("eosAccount=walletowner1\nDFUSE_API_KEY=key\n");
    let output = wallet_cli(&env).args(["send", "EOS", "receiver1234", "1.0000"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("memo is missing"));
}

#[test]
fn test_eos_account_without_dfuse_key_is_fatal() {
    let env = env_file("eosAccount=walletowner1\n");
    let output = wallet_cli(&env).arg("addresses").output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_unknown_protocol_is_fatal() {
    let env = env_file("");
    let output = wallet_cli(&env)
        .args(["send", "USDT", "0x9858EfFD232B4033E47d90003D41EC34EcaEda94", "1", "--protocol", "BEP2"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
