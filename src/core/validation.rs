use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sha3::{Digest, Keccak256};
use std::str::FromStr;

use crate::core::errors::WalletError;

static ETH_HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("Hardcoded regex should always compile"));

/// Validates an Ethereum address.
///
/// All-lowercase and all-uppercase bodies are accepted as-is; mixed case must carry a valid
/// EIP-55 checksum.
pub fn validate_ethereum_address(address: &str) -> Result<(), WalletError> {
    if !address.starts_with("0x") || address.len() != 42 {
        return Err(WalletError::InvalidAddress(format!("{} is not an Ethereum address", address)));
    }
    if !ETH_HEX.is_match(address) {
        return Err(WalletError::InvalidAddress(format!(
            "{} contains invalid Ethereum address characters",
            address
        )));
    }
    let body = &address[2..];
    let is_all_lower = body.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = body.chars().all(|c| !c.is_ascii_lowercase());
    if is_all_lower || is_all_upper {
        return Ok(());
    }
    if !is_eip55_checksum_valid(address) {
        return Err(WalletError::InvalidAddress(format!(
            "{} has an invalid EIP-55 checksum",
            address
        )));
    }
    Ok(())
}

/// Strict form used by the protocol detector: mixed case is mandatory.
pub fn is_checksummed_ethereum_address(address: &str) -> bool {
    if !ETH_HEX.is_match(address) {
        return false;
    }
    let body = &address[2..];
    body.chars().any(|c| c.is_ascii_uppercase())
        && body.chars().any(|c| c.is_ascii_lowercase())
        && is_eip55_checksum_valid(address)
}

fn is_eip55_checksum_valid(addr: &str) -> bool {
    if addr.len() != 42 || !addr.starts_with("0x") {
        return false;
    }
    let body = &addr[2..];
    let lower = body.to_lowercase();
    let mut keccak = Keccak256::new();
    keccak.update(lower.as_bytes());
    let hash = keccak.finalize();
    for (i, ch) in body.chars().enumerate() {
        let nibble = (hash[i / 2] >> (4 * (1 - (i % 2)))) & 0x0f;
        match ch {
            'a'..='f' => {
                if nibble >= 8 {
                    return false;
                }
            }
            'A'..='F' => {
                if nibble < 8 {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

/// Number of fractional digits in a quantity string.
///
/// Only the first whitespace-separated token counts, so `"1.2345 EOS"` has four.
pub fn calc_decimals(quantity: &str) -> usize {
    let number = quantity.split(' ').next().unwrap_or_default();
    match number.split_once('.') {
        Some((_, fraction)) => fraction.split('.').next().map(str::len).unwrap_or(0),
        None => 0,
    }
}

/// Rejects quantities that do not parse as a finite number or are not strictly positive.
///
/// Only plain decimal notation is a number here, since every chain converts the quantity to
/// base units as a decimal. Hex or binary literals such as `0x10` are "not a number". A blank
/// quantity reads as zero.
pub fn validate_quantity(quantity: &str) -> Result<f64, WalletError> {
    let trimmed = quantity.trim();
    let value: f64 = if trimmed.is_empty() {
        0.0
    } else {
        trimmed
            .parse()
            .map_err(|_| WalletError::InvalidQuantity(format!("{} is not a number", quantity)))?
    };
    if !value.is_finite() {
        return Err(WalletError::InvalidQuantity(format!("{} is not a number", quantity)));
    }
    if value <= 0.0 {
        return Err(WalletError::InvalidQuantity(format!(
            "The quantity {} is not greater than 0",
            quantity
        )));
    }
    Ok(value)
}

/// Rejects a quantity with more fractional digits than `max_decimals`.
pub fn ensure_precision(quantity: &str, max_decimals: usize) -> Result<(), WalletError> {
    let decimals = calc_decimals(quantity);
    if decimals > max_decimals {
        return Err(WalletError::PrecisionMismatch(format!(
            "Precision mismatch: {} has {} decimals, at most {} allowed",
            quantity, decimals, max_decimals
        )));
    }
    Ok(())
}

/// Converts a decimal quantity string to an integer amount of base units.
pub fn to_base_units(quantity: &str, decimals: u32) -> Result<u128, WalletError> {
    let amount = Decimal::from_str(quantity.trim())
        .map_err(|_| WalletError::InvalidQuantity(format!("{} is not a number", quantity)))?;
    let scale = Decimal::from_i128_with_scale(10_i128.pow(decimals), 0);
    amount
        .checked_mul(scale)
        .map(|v| v.trunc())
        .and_then(|v| v.to_u128())
        .ok_or_else(|| WalletError::InvalidQuantity(format!("{} is out of range", quantity)))
}
