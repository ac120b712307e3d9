use alloy::primitives::{address, Address};
use thiserror::Error;

use filmchain_wallet_core::SessionConfig;

pub const ENV_RUNTIME_PROFILE: &str = "FILMCHAIN_RUNTIME_PROFILE";
pub const ENV_EIP1193_PROXY_URL: &str = "FILMCHAIN_EIP1193_PROXY_URL";
pub const ENV_RPC_TIMEOUT_MS: &str = "FILMCHAIN_RPC_TIMEOUT_MS";
pub const ENV_EVENT_POLL_INTERVAL_MS: &str = "FILMCHAIN_EVENT_POLL_INTERVAL_MS";
pub const ENV_DETECTION_DELAY_MS: &str = "FILMCHAIN_DETECTION_DELAY_MS";
pub const ENV_TOKEN_ADDRESS: &str = "FILMCHAIN_TOKEN_ADDRESS";
pub const ENV_TOKEN_DECIMALS: &str = "FILMCHAIN_TOKEN_DECIMALS";
pub const ENV_TOKEN_SYMBOL: &str = "FILMCHAIN_TOKEN_SYMBOL";
pub const ENV_DEV_TOKEN_BALANCE: &str = "FILMCHAIN_DEV_TOKEN_BALANCE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeProfile {
    /// Falls back to the deterministic provider when no real runtime exists.
    #[default]
    Development,
    /// Requires a real provider runtime; otherwise adapters are disabled.
    Production,
}

impl RuntimeProfile {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(RuntimeProfile::Development),
            "production" | "prod" => Some(RuntimeProfile::Production),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct WalletAdapterConfig {
    pub runtime_profile: RuntimeProfile,
    /// JSON-RPC endpoint that forwards EIP-1193 calls to a wallet (native runtime).
    pub eip1193_proxy_url: Option<String>,
    pub rpc_timeout_ms: u64,
    pub event_poll_interval_ms: u64,
    pub detection_delay_ms: u64,
    pub token_address: Option<Address>,
    pub token_decimals: u8,
    pub token_symbol: String,
    pub dev_account: Address,
    pub dev_token_balance: String,
}

impl Default for WalletAdapterConfig {
    fn default() -> Self {
        Self {
            runtime_profile: RuntimeProfile::Development,
            eip1193_proxy_url: None,
            rpc_timeout_ms: 15_000,
            event_poll_interval_ms: 2_000,
            detection_delay_ms: 1_000,
            token_address: None,
            token_decimals: 18,
            token_symbol: "FILM".to_owned(),
            dev_account: address!("1000000000000000000000000000000000000001"),
            dev_token_balance: "1250".to_owned(),
        }
    }
}

impl WalletAdapterConfig {
    /// Defaults overridden by `FILMCHAIN_*` environment variables, falling
    /// back to values compiled in with the same names (the only source on
    /// wasm32). Each invalid value is logged and only that key keeps its
    /// default; an unreadable profile selects `Production`.
    pub fn from_env() -> Self {
        let (cfg, errors) =
            Self::resolve(|key| std::env::var(key).ok().or_else(|| compiled_in(key)));
        for e in &errors {
            tracing::warn!(error = %e, "ignoring invalid wallet configuration value");
        }
        cfg
    }

    /// Strict form of [`Self::resolve`]: the first invalid value is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (cfg, mut errors) = Self::resolve(lookup);
        if errors.is_empty() {
            Ok(cfg)
        } else {
            Err(errors.swap_remove(0))
        }
    }

    /// Apply every valid value and collect one error per invalid key.
    pub fn resolve<F>(lookup: F) -> (Self, Vec<ConfigError>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let mut errors = Vec::new();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get(ENV_RUNTIME_PROFILE) {
            match RuntimeProfile::parse(&raw) {
                Some(profile) => cfg.runtime_profile = profile,
                None => {
                    cfg.runtime_profile = RuntimeProfile::Production;
                    errors.push(ConfigError::InvalidValue {
                        key: ENV_RUNTIME_PROFILE,
                        value: raw,
                        reason: "expected development or production".to_owned(),
                    });
                }
            }
        }
        if let Some(raw) = get(ENV_EIP1193_PROXY_URL) {
            cfg.eip1193_proxy_url = Some(raw.trim().to_owned());
        }
        if let Some(raw) = get(ENV_RPC_TIMEOUT_MS) {
            apply(&mut cfg.rpc_timeout_ms, parse_value(ENV_RPC_TIMEOUT_MS, &raw), &mut errors);
        }
        if let Some(raw) = get(ENV_EVENT_POLL_INTERVAL_MS) {
            apply(
                &mut cfg.event_poll_interval_ms,
                parse_value(ENV_EVENT_POLL_INTERVAL_MS, &raw),
                &mut errors,
            );
        }
        if let Some(raw) = get(ENV_DETECTION_DELAY_MS) {
            apply(
                &mut cfg.detection_delay_ms,
                parse_value(ENV_DETECTION_DELAY_MS, &raw),
                &mut errors,
            );
        }
        if let Some(raw) = get(ENV_TOKEN_ADDRESS) {
            apply(
                &mut cfg.token_address,
                parse_value(ENV_TOKEN_ADDRESS, &raw).map(Some),
                &mut errors,
            );
        }
        if let Some(raw) = get(ENV_TOKEN_DECIMALS) {
            apply(&mut cfg.token_decimals, parse_value(ENV_TOKEN_DECIMALS, &raw), &mut errors);
        }
        if let Some(raw) = get(ENV_TOKEN_SYMBOL) {
            cfg.token_symbol = raw.trim().to_owned();
        }
        if let Some(raw) = get(ENV_DEV_TOKEN_BALANCE) {
            cfg.dev_token_balance = raw.trim().to_owned();
        }
        (cfg, errors)
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            detection_delay_ms: self.detection_delay_ms,
            token_decimals: self.token_decimals,
            ..SessionConfig::default()
        }
    }
}

fn apply<T>(slot: &mut T, parsed: Result<T, ConfigError>, errors: &mut Vec<ConfigError>) {
    match parsed {
        Ok(value) => *slot = value,
        Err(e) => errors.push(e),
    }
}

/// Values baked in at build time, e.g. `FILMCHAIN_TOKEN_ADDRESS=0x.. trunk build`.
fn compiled_in(key: &str) -> Option<String> {
    let value = match key {
        ENV_RUNTIME_PROFILE => option_env!("FILMCHAIN_RUNTIME_PROFILE"),
        ENV_EIP1193_PROXY_URL => option_env!("FILMCHAIN_EIP1193_PROXY_URL"),
        ENV_RPC_TIMEOUT_MS => option_env!("FILMCHAIN_RPC_TIMEOUT_MS"),
        ENV_EVENT_POLL_INTERVAL_MS => option_env!("FILMCHAIN_EVENT_POLL_INTERVAL_MS"),
        ENV_DETECTION_DELAY_MS => option_env!("FILMCHAIN_DETECTION_DELAY_MS"),
        ENV_TOKEN_ADDRESS => option_env!("FILMCHAIN_TOKEN_ADDRESS"),
        ENV_TOKEN_DECIMALS => option_env!("FILMCHAIN_TOKEN_DECIMALS"),
        ENV_TOKEN_SYMBOL => option_env!("FILMCHAIN_TOKEN_SYMBOL"),
        ENV_DEV_TOKEN_BALANCE => option_env!("FILMCHAIN_DEV_TOKEN_BALANCE"),
        _ => None,
    };
    value.map(str::to_owned)
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: raw.to_owned(),
        reason: e.to_string(),
    })
}
