pub mod amberdata;
pub mod bitcoin;
pub mod detector;
pub mod eos;
pub mod erc20;
pub mod ethereum;
pub mod traits;

pub use detector::{detect_platform, Platform};
pub use traits::UtxoExplorer;
