use thiserror::Error;

/// How a failure should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Expected failure the CLI reports and moves on from (bad input, network hiccup).
    Recoverable,
    /// Misuse or broken setup; the current command is aborted with a non-zero exit.
    Fatal,
}

/// Custom error type for wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Mnemonic parsing errors.
    #[error("Mnemonic error: {0}")]
    MnemonicError(String),
    /// Key derivation errors.
    #[error("Key derivation error: {0}")]
    KeyDerivationError(String),
    /// Symbol the wallet does not know how to route.
    #[error("Unsupported symbol {0}")]
    UnsupportedSymbol(String),
    /// Token protocol that is detected but cannot be sent from here.
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),
    /// Required memo missing for memo-based chains.
    #[error("memo is missing in {0}")]
    MissingMemo(String),
    /// Required protocol missing for multi-protocol tokens.
    #[error("protocol is missing in {0}")]
    MissingProtocol(String),
    /// Destination address belongs to another protocol than requested.
    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),
    /// Quantity is not a number or not greater than zero.
    #[error("{0}")]
    InvalidQuantity(String),
    /// Quantity has more decimals than the chain supports.
    #[error("{0}")]
    PrecisionMismatch(String),
    /// Output amount under the relay dust limit.
    #[error("{0}")]
    DustLimit(String),
    /// Invalid address errors.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    /// Insufficient funds errors.
    #[error("Insufficient balance: {0}")]
    InsufficientFunds(String),
    /// Network errors.
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Explorer or RPC answered with something unusable.
    #[error("Blockchain error: {0}")]
    BlockchainError(String),
    /// Signing failed errors.
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// Internal errors.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl WalletError {
    /// Classifies the error into the recoverable or fatal channel.
    pub fn severity(&self) -> Severity {
        match self {
            WalletError::InvalidQuantity(_)
            | WalletError::PrecisionMismatch(_)
            | WalletError::DustLimit(_)
            | WalletError::InvalidAddress(_)
            | WalletError::InsufficientFunds(_)
            | WalletError::NetworkError(_)
            | WalletError::BlockchainError(_) => Severity::Recoverable,
            WalletError::ConfigError(_)
            | WalletError::MnemonicError(_)
            | WalletError::KeyDerivationError(_)
            | WalletError::UnsupportedSymbol(_)
            | WalletError::UnsupportedProtocol(_)
            | WalletError::MissingMemo(_)
            | WalletError::MissingProtocol(_)
            | WalletError::ProtocolMismatch(_)
            | WalletError::SigningFailed(_)
            | WalletError::SerializationError(_)
            | WalletError::InternalError(_) => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl From<anyhow::Error> for WalletError {
    fn from(err: anyhow::Error) -> Self {
        WalletError::InternalError(err.to_string())
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        WalletError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        WalletError::NetworkError(err.to_string())
    }
}
