pub mod wallet;

pub use wallet::{check_protocol, WalletService};
