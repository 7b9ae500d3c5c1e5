use multichain_wallet::blockchain::detector::{detect_platform, detect_token_protocol, Platform};
use multichain_wallet::core::domain::TokenProtocol;
use proptest::prelude::*;

#[test]
fn test_prefix_beats_base58() {
    // base58-decodable, but the literal prefix decides first
    assert_eq!(detect_platform("bnb1grpf0955h0ykzq3ar5nmum7y6gdfl6lxfn46h2"), Some(Platform::Bnb));
    assert_eq!(detect_platform("zil1fwh4ltdguhde9s7nysnp33d5wye6uqpugufkz7"), Some(Platform::Zil));
    assert_eq!(
        detect_platform("nano_3t6k35gi95xu6tergt6p69ck76ogmitsa8mnijtpxm9fkcm736xtoncuohr3"),
        Some(Platform::Nano)
    );
}

#[test]
fn test_base58_version_table() {
    assert_eq!(detect_platform("DH5yaieqoZN36fDVciNyRueRGvGLR3mr7L"), Some(Platform::Doge));
    assert_eq!(detect_platform("TN3W4H6rK2ce4vX9YnFQHwKENnHjoxb3m9"), Some(Platform::Trc20));
}

#[test]
fn test_heuristics_then_ethereum() {
    assert_eq!(detect_platform("walletowner1"), Some(Platform::Eos));
    assert_eq!(detect_platform("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"), Some(Platform::Xrp));
    assert_eq!(detect_platform("0xdAC17F958D2ee523a2206206994597C13D831ec7"), Some(Platform::Erc20));
}

#[test]
fn test_usdt_protocols() {
    assert_eq!(detect_token_protocol("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy"), Some(TokenProtocol::Omni));
    assert_eq!(detect_token_protocol("DH5yaieqoZN36fDVciNyRueRGvGLR3mr7L"), None);
    assert_eq!(Platform::Trc20.to_string(), "TRC20");
}

proptest! {
    #[test]
    fn detect_never_panics(s in "\\PC{0,80}") {
        let _ = detect_platform(&s);
    }
}
