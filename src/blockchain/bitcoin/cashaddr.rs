//! CashAddr encoding for Bitcoin Cash.
//!
//! Base32 with a 40-bit BCH checksum over the prefix and payload. Only the
//! 160-bit hash size is supported, which covers P2PKH and P2SH.

use crate::core::errors::WalletError;

pub const MAINNET_PREFIX: &str = "bitcoincash";

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Kind of hash carried in the version byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashType {
    P2pkh,
    P2sh,
}

impl HashType {
    fn version_byte(&self) -> u8 {
        // size bits 000 = 160-bit hash
        match self {
            HashType::P2pkh => 0x00,
            HashType::P2sh => 0x08,
        }
    }
}

fn polymod(values: &[u8]) -> u64 {
    const GENERATORS: [u64; 5] =
        [0x98f2bc8e61, 0x79b76d99e2, 0xf33e5fb3c4, 0xae2eabe2a8, 0x1e4f43e470];
    let mut c: u64 = 1;
    for &d in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x07_ffff_ffff) << 5) ^ u64::from(d);
        for (bit, generator) in GENERATORS.iter().enumerate() {
            if c0 & (1 << bit) != 0 {
                c ^= generator;
            }
        }
    }
    c ^ 1
}

fn prefix_values(prefix: &str) -> Vec<u8> {
    let mut v: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
    v.push(0);
    v
}

fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max_v: u32 = (1 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);
    for &value in data {
        let v = u32::from(value);
        if v >> from != 0 {
            return None;
        }
        acc = (acc << from) | v;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max_v) as u8);
        }
    }
    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & max_v) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & max_v) != 0 {
        return None;
    }
    Some(out)
}

/// Encodes a 20-byte hash as `bitcoincash:q...` / `bitcoincash:p...`.
pub fn encode(hash_type: HashType, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(hash_type.version_byte());
    payload.extend_from_slice(hash);
    // 8-to-5 with padding cannot fail
    let data = convert_bits(&payload, 8, 5, true).unwrap_or_default();

    let mut checksum_input = prefix_values(MAINNET_PREFIX);
    checksum_input.extend_from_slice(&data);
    checksum_input.extend_from_slice(&[0u8; 8]);
    let poly = polymod(&checksum_input);

    let mut out = String::with_capacity(MAINNET_PREFIX.len() + 1 + data.len() + 8);
    out.push_str(MAINNET_PREFIX);
    out.push(':');
    for d in &data {
        out.push(CHARSET[*d as usize] as char);
    }
    for i in 0..8 {
        let d = ((poly >> (5 * (7 - i))) & 0x1f) as usize;
        out.push(CHARSET[d] as char);
    }
    out
}

/// Decodes a mainnet CashAddr; the `bitcoincash:` prefix is optional.
pub fn decode(address: &str) -> Result<(HashType, [u8; 20]), WalletError> {
    let invalid = |why: &str| WalletError::InvalidAddress(format!("{} ({})", address, why));

    let has_lower = address.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = address.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(invalid("mixed case"));
    }
    let lowered = address.to_ascii_lowercase();
    let (prefix, body) = match lowered.split_once(':') {
        Some((p, b)) => (p, b),
        None => (MAINNET_PREFIX, lowered.as_str()),
    };
    if prefix != MAINNET_PREFIX {
        return Err(invalid("not a bitcoincash address"));
    }
    if body.len() < 9 {
        return Err(invalid("too short"));
    }

    let mut data = Vec::with_capacity(body.len());
    for b in body.bytes() {
        let pos = CHARSET
            .iter()
            .position(|&c| c == b)
            .ok_or_else(|| invalid("invalid character"))?;
        data.push(pos as u8);
    }

    let mut checksum_input = prefix_values(prefix);
    checksum_input.extend_from_slice(&data);
    if polymod(&checksum_input) != 0 {
        return Err(invalid("bad checksum"));
    }

    let payload = convert_bits(&data[..data.len() - 8], 5, 8, false)
        .ok_or_else(|| invalid("bad padding"))?;
    if payload.len() != 21 {
        return Err(invalid("unsupported hash size"));
    }
    let hash_type = match payload[0] {
        0x00 => HashType::P2pkh,
        0x08 => HashType::P2sh,
        _ => return Err(invalid("unsupported version byte")),
    };
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);
    Ok((hash_type, hash))
}
