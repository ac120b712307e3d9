use alloy::primitives::hex;
use alloy::primitives::utils::format_units;
use alloy::primitives::{keccak256, Address, U256};
use serde_json::{json, Value};

use filmchain_wallet_core::{PortError, TokenBalancePort};

#[cfg(target_arch = "wasm32")]
use crate::browser;
#[cfg(not(target_arch = "wasm32"))]
use crate::jsonrpc::JsonRpcClient;
use crate::WalletAdapterConfig;

/// Application token balance via ERC-20 `balanceOf`.
#[derive(Debug, Clone)]
pub struct Erc20BalanceAdapter {
    mode: BalanceMode,
    token: Option<Address>,
    decimals: u8,
}

#[derive(Debug, Clone)]
enum BalanceMode {
    Disabled(String),
    Fixed(String),
    #[cfg(not(target_arch = "wasm32"))]
    Proxy(JsonRpcClient),
    #[cfg(target_arch = "wasm32")]
    Browser,
}

impl Default for Erc20BalanceAdapter {
    fn default() -> Self {
        Self::with_config(WalletAdapterConfig::from_env())
    }
}

impl Erc20BalanceAdapter {
    pub fn with_config(config: WalletAdapterConfig) -> Self {
        Self {
            mode: select_mode(&config),
            token: config.token_address,
            decimals: config.token_decimals,
        }
    }

    /// Always reports `balance`, for development and tests.
    pub fn fixed(balance: impl Into<String>, decimals: u8) -> Self {
        Self {
            mode: BalanceMode::Fixed(balance.into()),
            token: None,
            decimals,
        }
    }

    fn token(&self) -> Result<Address, PortError> {
        self.token
            .ok_or_else(|| PortError::Validation("token contract address not configured".to_owned()))
    }

    #[cfg(target_arch = "wasm32")]
    pub async fn wasm_balance_of_async(&self, account: Address) -> Result<String, PortError> {
        match &self.mode {
            BalanceMode::Browser => {
                let call = balance_of_call(self.token()?, account);
                let result = browser::request("eth_call", json!([call, "latest"])).await?;
                format_balance(decode_uint256(&result)?, self.decimals)
            }
            _ => self.balance_of(account),
        }
    }
}

impl TokenBalancePort for Erc20BalanceAdapter {
    fn balance_of(&self, account: Address) -> Result<String, PortError> {
        match &self.mode {
            BalanceMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            BalanceMode::Fixed(balance) => Ok(balance.clone()),
            #[cfg(not(target_arch = "wasm32"))]
            BalanceMode::Proxy(rpc) => {
                let call = balance_of_call(self.token()?, account);
                let result = rpc.call("eth_call", json!([call, "latest"]))?;
                let balance = format_balance(decode_uint256(&result)?, self.decimals)?;
                tracing::debug!(%account, %balance, "token balance fetched");
                Ok(balance)
            }
            #[cfg(target_arch = "wasm32")]
            BalanceMode::Browser => Err(PortError::NotImplemented(
                "wasm sync balance_of is unavailable; use wasm_balance_of_async",
            )),
        }
    }

    fn is_configured(&self) -> bool {
        match &self.mode {
            BalanceMode::Disabled(_) => false,
            BalanceMode::Fixed(_) => true,
            #[cfg(not(target_arch = "wasm32"))]
            BalanceMode::Proxy(_) => self.token.is_some(),
            #[cfg(target_arch = "wasm32")]
            BalanceMode::Browser => self.token.is_some(),
        }
    }
}

/// First four bytes of `keccak256("balanceOf(address)")`.
pub fn balance_of_selector() -> [u8; 4] {
    let hash = keccak256("balanceOf(address)");
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn balance_of_calldata(account: Address) -> String {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&balance_of_selector());
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(account.as_slice());
    format!("0x{}", hex::encode(data))
}

fn balance_of_call(token: Address, account: Address) -> Value {
    json!({
        "to": token.to_string(),
        "data": balance_of_calldata(account),
    })
}

pub fn decode_uint256(value: &Value) -> Result<U256, PortError> {
    let raw = value
        .as_str()
        .ok_or_else(|| PortError::Transport("eth_call must return hex string".to_owned()))?;
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Err(PortError::Validation(
            "eth_call returned no data; is the token address a contract?".to_owned(),
        ));
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| PortError::Validation(format!("invalid uint256 {raw}: {e}")))
}

pub fn format_balance(units: U256, decimals: u8) -> Result<String, PortError> {
    format_units(units, decimals)
        .map_err(|e| PortError::Validation(format!("cannot format balance: {e}")))
}

fn select_mode(config: &WalletAdapterConfig) -> BalanceMode {
    #[cfg(target_arch = "wasm32")]
    {
        let _ = config;
        return BalanceMode::Browser;
    }

    #[cfg(not(target_arch = "wasm32"))]
    match config.eip1193_proxy_url {
        Some(ref url) => match JsonRpcClient::new(url.clone(), config.rpc_timeout_ms) {
            Ok(client) => BalanceMode::Proxy(client),
            Err(e) => BalanceMode::Disabled(format!("token balance client unavailable: {e}")),
        },
        None if config.strict_runtime_required() => BalanceMode::Disabled(
            "token balance runtime not configured in production runtime profile".to_owned(),
        ),
        None => BalanceMode::Fixed(config.dev_token_balance.clone()),
    }
}
