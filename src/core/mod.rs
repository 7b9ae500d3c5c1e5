pub mod config;
pub mod derivation;
pub mod domain;
pub mod errors;
pub mod validation;

pub use config::{EndpointConfig, UserConfig, WalletConfig};
pub use domain::{Address, Chain, FeeSpeed, PrivateKeyRecord, SendReceipt, TokenProtocol, UnspentOutput};
pub use errors::{Severity, WalletError};
