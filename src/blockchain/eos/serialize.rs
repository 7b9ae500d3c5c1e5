//! eosio binary serialization for token transfers.
//!
//! Covers only the types a `transfer` transaction needs: names, assets,
//! strings, permission levels, actions and the transaction header.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::errors::WalletError;

static ACCOUNT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z1-5.]{1,12}$").expect("Hardcoded regex should always compile"));

pub fn is_valid_account_name(name: &str) -> bool {
    ACCOUNT_NAME.is_match(name) && !name.ends_with('.')
}

fn char_to_symbol(c: u8) -> u64 {
    match c {
        b'a'..=b'z' => u64::from(c - b'a') + 6,
        b'1'..=b'5' => u64::from(c - b'1') + 1,
        _ => 0,
    }
}

/// Packs an account or action name into its 64-bit form.
pub fn name_to_u64(name: &str) -> Result<u64, WalletError> {
    if !is_valid_account_name(name) {
        return Err(WalletError::InvalidAddress(format!("{} is not a valid EOS account name", name)));
    }
    let bytes = name.as_bytes();
    let mut value: u64 = 0;
    for i in 0..=12 {
        let mut c = if i < bytes.len() { char_to_symbol(bytes[i]) } else { 0 };
        if i < 12 {
            c &= 0x1f;
            c <<= 64 - 5 * (i + 1);
        } else {
            c &= 0x0f;
        }
        value |= c;
    }
    Ok(value)
}

/// Token amount with its symbol, e.g. `1.0000 EOS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub amount: i64,
    pub precision: u8,
    pub symbol: String,
}

impl Asset {
    /// Parses `<quantity> <SYMBOL>`; the precision is taken from the quantity as written.
    pub fn parse(text: &str) -> Result<Self, WalletError> {
        let invalid = || WalletError::InvalidQuantity(format!("{} is not a valid asset", text));
        let (quantity, symbol) = text.trim().split_once(' ').ok_or_else(invalid)?;
        if symbol.is_empty() || symbol.len() > 7 || !symbol.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(invalid());
        }
        let (int_part, frac_part) = quantity.split_once('.').unwrap_or((quantity, ""));
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let precision = u8::try_from(frac_part.len()).map_err(|_| invalid())?;
        if precision > 18 {
            return Err(invalid());
        }
        let amount = format!("{}{}", int_part, frac_part).parse::<i64>().map_err(|_| invalid())?;
        Ok(Self { amount, precision, symbol: symbol.to_string() })
    }

    pub fn symbol_code(&self) -> u64 {
        let mut value = u64::from(self.precision);
        for (i, b) in self.symbol.bytes().enumerate() {
            value |= u64::from(b) << (8 * (i + 1));
        }
        value
    }
}

#[derive(Debug, Clone)]
pub struct PermissionLevel {
    pub actor: String,
    pub permission: String,
}

#[derive(Debug, Clone)]
pub struct Action {
    pub account: String,
    pub name: String,
    pub authorization: Vec<PermissionLevel>,
    pub data: Vec<u8>,
}

/// Header fields plus actions; context-free actions and extensions are always empty.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub expiration: u32,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub actions: Vec<Action>,
}

/// Little-endian byte writer.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn varuint32(&mut self, mut v: u32) {
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.buf.push(byte);
            if v == 0 {
                break;
            }
        }
    }

    pub fn bytes(&mut self, data: &[u8]) {
        self.varuint32(data.len() as u32);
        self.buf.extend_from_slice(data);
    }

    pub fn string(&mut self, s: &str) {
        self.bytes(s.as_bytes());
    }

    pub fn name(&mut self, name: &str) -> Result<(), WalletError> {
        self.u64(name_to_u64(name)?);
        Ok(())
    }

    pub fn asset(&mut self, asset: &Asset) {
        self.i64(asset.amount);
        self.u64(asset.symbol_code());
    }
}

/// ABI encoding of `eosio.token::transfer(from, to, quantity, memo)`.
pub fn transfer_data(from: &str, to: &str, quantity: &Asset, memo: &str) -> Result<Vec<u8>, WalletError> {
    let mut w = Writer::new();
    w.name(from)?;
    w.name(to)?;
    w.asset(quantity);
    w.string(memo);
    Ok(w.into_bytes())
}

pub fn pack_transaction(tx: &Transaction) -> Result<Vec<u8>, WalletError> {
    let mut w = Writer::new();
    w.u32(tx.expiration);
    w.u16(tx.ref_block_num);
    w.u32(tx.ref_block_prefix);
    w.varuint32(0); // max_net_usage_words
    w.u8(0); // max_cpu_usage_ms
    w.varuint32(0); // delay_sec
    w.varuint32(0); // context_free_actions
    w.varuint32(tx.actions.len() as u32);
    for action in &tx.actions {
        w.name(&action.account)?;
        w.name(&action.name)?;
        w.varuint32(action.authorization.len() as u32);
        for auth in &action.authorization {
            w.name(&auth.actor)?;
            w.name(&auth.permission)?;
        }
        w.bytes(&action.data);
    }
    w.varuint32(0); // transaction_extensions
    Ok(w.into_bytes())
}
