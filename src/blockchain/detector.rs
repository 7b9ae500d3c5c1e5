//! Best-effort guess of which chain an address string belongs to.
//!
//! Formats collide across chains, so the checks run in a fixed order and the
//! first match wins: literal prefixes, base58 version bytes, string
//! heuristics, and finally an EIP-55 checksummed Ethereum address.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::core::domain::TokenProtocol;
use crate::core::validation::is_checksummed_ethereum_address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    Ada,
    Algo,
    Atom,
    Bch,
    Bnb,
    Btc,
    Btg,
    Dash,
    Dcr,
    Doge,
    Eos,
    Erc20,
    Hbar,
    Irc20,
    Lsk,
    Ltc,
    Nano,
    Nep5,
    Nrc20,
    Qtum,
    Rvn,
    Sc,
    Trc20,
    Waves,
    Xlm,
    Xmr,
    Xrp,
    Xtz,
    Zec,
    Zil,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ada => "ADA",
            Platform::Algo => "ALGO",
            Platform::Atom => "ATOM",
            Platform::Bch => "BCH",
            Platform::Bnb => "BNB",
            Platform::Btc => "BTC",
            Platform::Btg => "BTG",
            Platform::Dash => "DASH",
            Platform::Dcr => "DCR",
            Platform::Doge => "DOGE",
            Platform::Eos => "EOS",
            Platform::Erc20 => "ERC20",
            Platform::Hbar => "HBAR",
            Platform::Irc20 => "IRC20",
            Platform::Lsk => "LSK",
            Platform::Ltc => "LTC",
            Platform::Nano => "NANO",
            Platform::Nep5 => "NEP5",
            Platform::Nrc20 => "NRC20",
            Platform::Qtum => "QTUM",
            Platform::Rvn => "RVN",
            Platform::Sc => "SC",
            Platform::Trc20 => "TRC20",
            Platform::Waves => "WAVES",
            Platform::Xlm => "XLM",
            Platform::Xmr => "XMR",
            Platform::Xrp => "XRP",
            Platform::Xtz => "XTZ",
            Platform::Zec => "ZEC",
            Platform::Zil => "ZIL",
        }
    }

    /// Token standard whose tokens live at addresses of this platform.
    ///
    /// OMNI tokens are held by plain bitcoin addresses.
    pub fn token_protocol(&self) -> Option<TokenProtocol> {
        match self {
            Platform::Btc => Some(TokenProtocol::Omni),
            Platform::Eos => Some(TokenProtocol::Eos),
            Platform::Erc20 => Some(TokenProtocol::Erc20),
            Platform::Irc20 => Some(TokenProtocol::Irc20),
            Platform::Nep5 => Some(TokenProtocol::Nep5),
            Platform::Nrc20 => Some(TokenProtocol::Nrc20),
            Platform::Trc20 => Some(TokenProtocol::Trc20),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const PREFIXES: &[(&str, Platform)] = &[
    ("bc1", Platform::Btc),
    ("bitcoincash:", Platform::Bch),
    ("cosmos1", Platform::Atom),
    ("bnb1", Platform::Bnb),
    ("zil1", Platform::Zil),
    ("addr1", Platform::Ada),
    ("xrb_", Platform::Nano),
    ("nano_", Platform::Nano),
];

/// (decoded length, leading version bytes, platform)
const BASE58_VERSIONS: &[(usize, &[u8], Platform)] = &[
    (25, &[0x00], Platform::Btc),
    (25, &[0x05], Platform::Btc),
    (25, &[0x41], Platform::Trc20),
    (25, &[0x30], Platform::Ltc),
    (25, &[0x32], Platform::Ltc),
    (25, &[0x1e], Platform::Doge),
    (25, &[0x16], Platform::Doge),
    (25, &[0x4c], Platform::Dash),
    (25, &[0x10], Platform::Dash),
    (25, &[0x17], Platform::Nep5),
    (25, &[0x3c], Platform::Rvn),
    (25, &[0x3a], Platform::Qtum),
    (25, &[0x26], Platform::Btg),
    (26, &[0x1c, 0xb8], Platform::Zec),
    (26, &[0x07, 0x3f], Platform::Dcr),
    (26, &[0x01, 0x57], Platform::Waves),
    (27, &[0x06, 0xa1, 0x9f], Platform::Xtz),
];

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Hardcoded regex should always compile")
}

static HEURISTICS: Lazy<Vec<(Regex, Platform)>> = Lazy::new(|| {
    vec![
        (regex(r"^NULSd[1-9A-HJ-NP-Za-km-z]{20,40}$"), Platform::Nrc20),
        (regex(r"^4[0-9AB][1-9A-HJ-NP-Za-km-z]{93}$"), Platform::Xmr),
        (regex(r"^[a-z1-5.]{1,12}$"), Platform::Eos),
        (regex(r"^[a-z0-9_]{5,11}$"), Platform::Irc20),
        (regex(r"^\d{1,20}L$"), Platform::Lsk),
        (regex(r"^G[A-Z2-7]{55}$"), Platform::Xlm),
        (regex(r"^[A-Z2-7]{58}$"), Platform::Algo),
        (regex(r"^[0-9a-f]{76}$"), Platform::Sc),
        (regex(r"^r[1-9A-HJ-NP-Za-km-z]{24,34}$"), Platform::Xrp),
        (regex(r"^0\.0\.\d+$"), Platform::Hbar),
    ]
});

fn detect_by_base58(address: &str) -> Option<Platform> {
    let decoded = bs58::decode(address).into_vec().ok()?;
    BASE58_VERSIONS
        .iter()
        .find(|(len, version, _)| decoded.len() == *len && decoded.starts_with(version))
        .map(|(_, _, platform)| *platform)
}

/// Guesses the platform of `address`; `None` when nothing matches.
pub fn detect_platform(address: &str) -> Option<Platform> {
    let address = address.trim();
    if address.is_empty() {
        return None;
    }
    if let Some((_, platform)) = PREFIXES.iter().find(|(prefix, _)| address.starts_with(prefix)) {
        return Some(*platform);
    }
    if let Some(platform) = detect_by_base58(address) {
        return Some(platform);
    }
    if let Some((_, platform)) = HEURISTICS.iter().find(|(re, _)| re.is_match(address)) {
        return Some(*platform);
    }
    if is_checksummed_ethereum_address(address) {
        return Some(Platform::Erc20);
    }
    None
}

/// Token protocol implied by the destination address, if any.
pub fn detect_token_protocol(address: &str) -> Option<TokenProtocol> {
    detect_platform(address).and_then(|p| p.token_protocol())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4", Platform::Btc; "segwit prefix")]
    #[test_case("1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA", Platform::Btc; "p2pkh")]
    #[test_case("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy", Platform::Btc; "p2sh")]
    #[test_case("TN3W4H6rK2ce4vX9YnFQHwKENnHjoxb3m9", Platform::Trc20; "tron")]
    #[test_case("LVg2kJoFNg45Nbpy53h7Fe1wKyeXVRhMH9", Platform::Ltc; "litecoin")]
    #[test_case("bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a", Platform::Bch; "cashaddr")]
    #[test_case("cosmos1xxkueklal9vejv9unqu80w9vptyepfa95pd53u", Platform::Atom; "cosmos")]
    #[test_case("eosio.token", Platform::Eos; "eos account")]
    #[test_case("1234567890123456789L", Platform::Lsk; "lisk")]
    #[test_case("GA7QYNF7SOWQ3GLR2BGMZEHXAVIRZA4KVWLTJJFC7MGXUA74P7UJVSGZ", Platform::Xlm; "stellar")]
    #[test_case("0.0.12345", Platform::Hbar; "hedera")]
    #[test_case("0x9858EfFD232B4033E47d90003D41EC34EcaEda94", Platform::Erc20; "checksummed eth")]
    fn test_detects(address: &str, expected: Platform) {
        assert_eq!(detect_platform(address), Some(expected));
    }

    #[test]
    fn test_undetected() {
        assert_eq!(detect_platform(""), None);
        assert_eq!(detect_platform("0x9858effd232b4033e47d90003d41ec34ecaeda94"), None);
        assert_eq!(detect_platform("not an address!"), None);
    }

    #[test]
    fn test_token_protocols() {
        assert_eq!(detect_token_protocol("1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA"), Some(TokenProtocol::Omni));
        assert_eq!(detect_token_protocol("TN3W4H6rK2ce4vX9YnFQHwKENnHjoxb3m9"), Some(TokenProtocol::Trc20));
        assert_eq!(
            detect_token_protocol("0x9858EfFD232B4033E47d90003D41EC34EcaEda94"),
            Some(TokenProtocol::Erc20)
        );
        assert_eq!(Platform::Ltc.token_protocol(), None);
    }
}
