#[cfg(target_arch = "wasm32")]
mod browser;
pub mod clock;
pub mod config;
pub mod eip1193;
pub mod jsonrpc;
pub mod token;

pub use clock::SystemClockAdapter;
pub use config::{ConfigError, RuntimeProfile, WalletAdapterConfig};
pub use eip1193::Eip1193Adapter;
#[cfg(not(target_arch = "wasm32"))]
pub use jsonrpc::JsonRpcClient;
pub use token::Erc20BalanceAdapter;
