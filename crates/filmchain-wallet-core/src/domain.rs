use std::fmt;

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampMs(pub u64);

/// Result of probing the page for an injected wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderDetection {
    pub present: bool,
    /// Vendor marker flag (`isMetaMask`).
    pub vendor_marker: bool,
}

impl ProviderDetection {
    pub const fn absent() -> Self {
        Self {
            present: false,
            vendor_marker: false,
        }
    }

    pub const fn compatible() -> Self {
        Self {
            present: true,
            vendor_marker: true,
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.present && self.vendor_marker
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderEventKind {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub sequence: u64,
    pub kind: ProviderEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceParseError {
    #[error("invalid fixed-point amount {raw:?}: {reason}")]
    Invalid { raw: String, reason: String },
    #[error("negative balance {0:?}")]
    Negative(String),
}

impl From<BalanceParseError> for SessionError {
    fn from(err: BalanceParseError) -> Self {
        SessionError::BalanceQueryFailed(err.to_string())
    }
}

/// Fixed-point token amount: raw integer units scaled by `10^decimals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    units: U256,
    decimals: u8,
}

impl TokenBalance {
    pub const fn zero(decimals: u8) -> Self {
        Self {
            units: U256::ZERO,
            decimals,
        }
    }

    pub const fn from_units(units: U256, decimals: u8) -> Self {
        Self { units, decimals }
    }

    /// Parse a decimal string such as `"1250.5"` into token units.
    pub fn parse_decimal(raw: &str, decimals: u8) -> Result<Self, BalanceParseError> {
        let trimmed = raw.trim();
        let parsed = parse_units(trimmed, decimals).map_err(|e| BalanceParseError::Invalid {
            raw: raw.to_owned(),
            reason: e.to_string(),
        })?;
        if parsed.is_negative() {
            return Err(BalanceParseError::Negative(raw.to_owned()));
        }
        Ok(Self {
            units: parsed.get_absolute(),
            decimals,
        })
    }

    pub fn units(&self) -> U256 {
        self.units
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.units.is_zero()
    }

    /// Decimal rendering without trailing fractional zeros.
    pub fn to_decimal_string(&self) -> String {
        match format_units(self.units, self.decimals) {
            Ok(s) if s.contains('.') => s.trim_end_matches('0').trim_end_matches('.').to_owned(),
            Ok(s) => s,
            Err(_) => self.units.to_string(),
        }
    }
}

impl fmt::Display for TokenBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

/// Handle for one in-flight connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectTicket(pub(crate) u64);

impl ConnectTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Handle for one in-flight balance query, bound to the account it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceTicket {
    pub(crate) account: Address,
}

impl BalanceTicket {
    pub fn account(&self) -> Address {
        self.account
    }
}

/// Wallet connection state as rendered by views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub account: Option<Address>,
    pub is_provider_installed: bool,
    pub is_initializing: bool,
    #[serde(serialize_with = "serialize_error")]
    pub connection_error: Option<SessionError>,
    pub token_balance: TokenBalance,
    pub chain_id: Option<u64>,
    pub connect_pending: bool,
}

impl SessionState {
    pub fn initial(token_decimals: u8) -> Self {
        Self {
            account: None,
            is_provider_installed: false,
            is_initializing: true,
            connection_error: None,
            token_balance: TokenBalance::zero(token_decimals),
            chain_id: None,
            connect_pending: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }
}

fn serialize_error<S>(err: &Option<SessionError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match err {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}
