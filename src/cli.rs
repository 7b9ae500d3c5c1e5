use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::core::domain::{Address, FeeSpeed, TokenProtocol};
use crate::core::errors::WalletError;
use crate::service::WalletService;

/// Multi-chain wallet CLI (library-facing definitions)
#[derive(Debug, Parser)]
#[command(name = "wallet-cli", about = "Multi-chain HD wallet CLI", version, disable_help_subcommand = true)]
pub struct Cli {
    /// dotenv file holding MNEMONIC and the API keys
    #[arg(long, global = true, default_value = ".env")]
    pub env_file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List all addresses.
    Addresses {
        /// The currency symbol to query, empty means all
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Query balance.
    Balance {
        /// The currency symbol to query, empty means all
        symbol: Option<String>,
        /// List every ERC20 token held by the ETH address instead
        #[arg(long, conflicts_with = "symbol")]
        all_erc20: bool,
    },
    /// List all private keys.
    #[command(name = "private_keys", alias = "private-keys")]
    PrivateKeys {
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Send currencies.
    Send {
        /// The currency symbol
        symbol: String,
        /// The destination address
        address: String,
        /// How many to send
        amount: String,
        /// Some currencies require a memo, such as ATOM, EOS, XLM, XRP
        #[arg(long)]
        memo: Option<String>,
        /// Token protocol for multi-protocol symbols such as USDT
        #[arg(long)]
        protocol: Option<String>,
        #[arg(long, value_enum, default_value_t = FeeSpeed::Average)]
        speed: FeeSpeed,
    },
}

impl Commands {
    pub fn speed(&self) -> FeeSpeed {
        match self {
            Commands::Send { speed, .. } => *speed,
            _ => FeeSpeed::default(),
        }
    }

    /// Runs the command and returns the JSON document to print.
    pub async fn execute(&self, service: &WalletService) -> Result<Value, WalletError> {
        match self {
            Commands::Addresses { symbol } => Ok(serde_json::to_value(service.addresses(symbol.as_deref())?)?),
            Commands::Balance { all_erc20: true, .. } => Ok(serde_json::to_value(service.all_erc20_balances().await?)?),
            Commands::Balance { symbol, .. } => Ok(serde_json::to_value(service.balances(symbol.as_deref()).await?)?),
            Commands::PrivateKeys { symbol } => Ok(serde_json::to_value(service.private_keys(symbol.as_deref())?)?),
            Commands::Send { symbol, address, amount, memo, protocol, .. } => {
                let protocol = protocol.as_deref().map(str::parse::<TokenProtocol>).transpose()?;
                let to = Address::new(symbol.as_str(), address.as_str())
                    .with_memo(memo.clone())
                    .with_protocol(protocol);
                let receipt = service.send(&to, amount).await?;
                Ok(json!({ "txid": receipt.txid }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send() {
        let cli = Cli::parse_from([
            "wallet-cli", "send", "EOS", "bob", "1.0000", "--memo", "hi", "--speed", "fast",
        ]);
        assert_eq!(cli.env_file, PathBuf::from(".env"));
        match &cli.command {
            Commands::Send { symbol, memo, protocol, .. } => {
                assert_eq!(symbol, "EOS");
                assert_eq!(memo.as_deref(), Some("hi"));
                assert!(protocol.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(cli.command.speed(), FeeSpeed::Fast);
    }

    #[test]
    fn test_parse_private_keys_and_env_file() {
        let cli = Cli::parse_from(["wallet-cli", "private_keys", "--symbol", "BTC", "--env-file", "/tmp/x.env"]);
        assert!(matches!(cli.command, Commands::PrivateKeys { symbol: Some(ref s) } if s == "BTC"));
        assert_eq!(cli.env_file, PathBuf::from("/tmp/x.env"));
    }

    #[test]
    fn test_balance_all_erc20_conflicts_with_symbol() {
        assert!(Cli::try_parse_from(["wallet-cli", "balance", "BTC", "--all-erc20"]).is_err());
        let cli = Cli::parse_from(["wallet-cli", "balance"]);
        assert!(matches!(cli.command, Commands::Balance { symbol: None, all_erc20: false }));
    }
}
